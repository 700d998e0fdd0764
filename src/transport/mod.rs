pub mod engine;
pub mod local;
pub mod remote;

use std::path::Path;
use std::sync::Arc;

use crate::error::AppResult;
use crate::model::{ArtifactRef, GenerationRequest, GenerationResult};

pub use local::{LocalCommands, LocalTransport};
pub use remote::RemoteTransport;

/// Named backend operations, shared by both transports for spans and routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CheckReadiness,
    GenerateQuestions,
    GenerateSwot,
    DownloadArtifact,
}

impl Operation {
    pub fn for_request(request: &GenerationRequest) -> Self {
        match request {
            GenerationRequest::Questions(_) => Operation::GenerateQuestions,
            GenerationRequest::Swot(_) => Operation::GenerateSwot,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::CheckReadiness => "check-readiness",
            Operation::GenerateQuestions => "generate-questions",
            Operation::GenerateSwot => "generate-swot",
            Operation::DownloadArtifact => "download-pdf",
        }
    }
}

/// Uniform seam over the hosted backend and the local engine.
///
/// Implementations never retry: a repeated generation is a new billable call
/// and only the user may trigger it. Every failure is mapped into
/// [`crate::error::AppError`] here, so callers never inspect wire shapes.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Verifies the backend is reachable, returning a human-readable status.
    async fn check_readiness(&self) -> AppResult<String>;

    /// Runs one generation operation to completion.
    async fn invoke(&self, request: &GenerationRequest) -> AppResult<GenerationResult>;

    /// Writes the artifact to `destination`, returning the number of bytes saved.
    async fn redeem(&self, artifact: &ArtifactRef, destination: &Path) -> AppResult<u64>;

    fn name(&self) -> &str;
}

pub type SharedTransport = Arc<dyn Transport>;
