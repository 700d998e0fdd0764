use std::path::PathBuf;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::Instrument;

use crate::AppState;
use crate::error::AppResult;
use crate::model::{FileRef, GenerationRequest, QuestionsRequest, SwotRequest, WorkflowKind};
use crate::pipeline::SessionSnapshot;

/// Missing fields deserialize as empty so validation can name them.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct QuestionsBody {
    pub csv_path: Option<PathBuf>,
    pub business_name: String,
    pub credential: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SwotBody {
    pub csv_path: Option<PathBuf>,
    pub pdf_path: Option<PathBuf>,
    pub business_name: String,
    pub credential: String,
}

impl From<QuestionsBody> for GenerationRequest {
    fn from(body: QuestionsBody) -> Self {
        GenerationRequest::Questions(QuestionsRequest {
            input_csv: body.csv_path.map(FileRef::Path),
            business_name: body.business_name,
            credential: body.credential,
        })
    }
}

impl From<SwotBody> for GenerationRequest {
    fn from(body: SwotBody) -> Self {
        GenerationRequest::Swot(SwotRequest {
            input_csv: body.csv_path.map(FileRef::Path),
            input_pdf: body.pdf_path.map(FileRef::Path),
            business_name: body.business_name,
            credential: body.credential,
        })
    }
}

/// Admits the request synchronously, then lets the job run on its own task so
/// a dropped HTTP connection never cancels it.
fn start(
    state: &AppState,
    request: GenerationRequest,
) -> AppResult<(StatusCode, Json<SessionSnapshot>)> {
    let kind = request.kind();
    let job = state.orchestrator.prepare(request)?;

    tracing::info!(workflow = %kind, job.id = %job.job_id(), "Job accepted");
    tokio::spawn(job.run().in_current_span());

    Ok((StatusCode::ACCEPTED, Json(state.orchestrator.snapshot(kind))))
}

pub async fn submit_questions(
    State(state): State<AppState>,
    Json(body): Json<QuestionsBody>,
) -> AppResult<(StatusCode, Json<SessionSnapshot>)> {
    start(&state, body.into())
}

pub async fn submit_swot(
    State(state): State<AppState>,
    Json(body): Json<SwotBody>,
) -> AppResult<(StatusCode, Json<SessionSnapshot>)> {
    start(&state, body.into())
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> AppResult<Json<SessionSnapshot>> {
    let kind: WorkflowKind = kind.parse()?;
    Ok(Json(state.orchestrator.snapshot(kind)))
}
