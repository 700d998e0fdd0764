pub mod artifacts;
pub mod health;
pub mod readiness;
pub mod workflows;

use std::time::Duration;

use axum::{
    Router,
    http::StatusCode,
    routing::{get, post},
};
use tower_http::timeout::TimeoutLayer;

use crate::AppState;

const STATUS_TIMEOUT: Duration = Duration::from_secs(30);

/// Workflow and download routes carry no timeout: a job ends only when its
/// backend answers.
pub fn create_router(state: AppState) -> Router {
    let status = Router::new()
        .route("/api/health", get(health::health))
        .route("/api/readiness", get(readiness::get_readiness))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            STATUS_TIMEOUT,
        ));

    Router::new()
        .merge(status)
        .route("/api/readiness/retry", post(readiness::retry_readiness))
        .route("/api/workflows/questions", post(workflows::submit_questions))
        .route("/api/workflows/swot", post(workflows::submit_swot))
        .route("/api/workflows/{kind}", get(workflows::get_session))
        .route(
            "/api/workflows/{kind}/download",
            post(artifacts::download_artifact),
        )
        .with_state(state)
}
