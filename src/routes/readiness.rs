use axum::{Json, extract::State};

use crate::AppState;
use crate::pipeline::ReadinessStatus;

pub async fn get_readiness(State(state): State<AppState>) -> Json<ReadinessStatus> {
    Json(state.orchestrator.readiness())
}

/// Re-runs the check. An unready backend is a normal answer, not an error.
pub async fn retry_readiness(State(state): State<AppState>) -> Json<ReadinessStatus> {
    Json(state.orchestrator.check_readiness().await)
}
