use std::fmt;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use opentelemetry::trace::TraceContextExt;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde_json::json;
use thiserror::Error;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::model::WorkflowKind;

/// Request fields checked before any transport call, in validation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredField {
    InputCsv,
    InputPdf,
    BusinessName,
    Credential,
}

impl RequiredField {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequiredField::InputCsv => "inputCsv",
            RequiredField::InputPdf => "inputPdf",
            RequiredField::BusinessName => "businessName",
            RequiredField::Credential => "credential",
        }
    }
}

impl fmt::Display for RequiredField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("Validation error: missing required field {field}")]
    Validation { field: RequiredField },

    #[error("Generation engine is not ready")]
    NotReady,

    #[error("A {0} job is already in flight")]
    SessionBusy(WorkflowKind),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Download error: {0}")]
    Download(String),

    #[error("Generation succeeded but produced no questions")]
    EmptyResult,

    #[error("Not found: {0}")]
    NotFound(String),
}

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => "validation_error",
            AppError::NotReady => "not_ready",
            AppError::SessionBusy(_) => "session_busy",
            AppError::Transport(_) => "transport_error",
            AppError::Backend(_) => "backend_error",
            AppError::Download(_) => "download_error",
            AppError::EmptyResult => "empty_result",
            AppError::NotFound(_) => "not_found",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::SessionBusy(_) => StatusCode::CONFLICT,
            AppError::Backend(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotReady => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Transport(_) | AppError::Download(_) => StatusCode::BAD_GATEWAY,
            AppError::EmptyResult => StatusCode::OK,
        }
    }
}

impl Serialize for AppError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("AppError", 2)?;
        state.serialize_field("kind", self.kind())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

fn get_trace_id() -> Option<String> {
    let span = Span::current();
    let context = span.context();
    let span_ref = context.span();
    let span_context = span_ref.span_context();

    if span_context.is_valid() {
        Some(span_context.trace_id().to_string())
    } else {
        None
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            AppError::Transport(msg) | AppError::Download(msg) => {
                tracing::error!(error = %msg, kind = self.kind(), "Upstream failure");
            }
            AppError::Backend(msg) => {
                tracing::warn!(error = %msg, "Backend rejected the request");
            }
            _ => {}
        }

        // Errors are surfaced verbatim so the UI can display them.
        let body = if let Some(trace_id) = get_trace_id() {
            json!({
                "error": self.to_string(),
                "kind": self.kind(),
                "status": status.as_u16(),
                "trace_id": trace_id,
            })
        } else {
            json!({
                "error": self.to_string(),
                "kind": self.kind(),
                "status": status.as_u16(),
            })
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
