use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::model::{WorkflowKind, suggested_file_name};
use crate::pipeline::DownloadOutcome;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DownloadBody {
    pub file_name: Option<String>,
}

/// Saves the artifact of the workflow's last successful job.
pub async fn download_artifact(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Json(body): Json<DownloadBody>,
) -> AppResult<Json<DownloadOutcome>> {
    let kind: WorkflowKind = kind.parse()?;
    let completion = state
        .orchestrator
        .last_completion(kind)
        .ok_or_else(|| AppError::NotFound(format!("no completed {kind} job to download")))?;

    let file_name = body
        .file_name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| suggested_file_name(&completion.result));

    let outcome = state
        .downloader
        .download(completion.result.artifact(), &file_name)
        .await?;
    Ok(Json(outcome))
}
