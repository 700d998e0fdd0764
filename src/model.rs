use std::fmt;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Number of questions the hosted backend returns as a preview.
pub const PREVIEW_SIZE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowKind {
    Questions,
    Swot,
}

impl WorkflowKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowKind::Questions => "questions",
            WorkflowKind::Swot => "swot",
        }
    }
}

impl fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WorkflowKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "questions" => Ok(WorkflowKind::Questions),
            "swot" => Ok(WorkflowKind::Swot),
            other => Err(AppError::NotFound(format!("unknown workflow '{other}'"))),
        }
    }
}

/// Handle to an input document. Blobs share their buffer, so cloning a
/// request never copies file contents.
#[derive(Debug, Clone, PartialEq)]
pub enum FileRef {
    Path(PathBuf),
    Blob { file_name: String, content: Bytes },
}

impl FileRef {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        FileRef::Path(path.into())
    }

    pub fn blob(file_name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        FileRef::Blob {
            file_name: file_name.into(),
            content: content.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            FileRef::Path(path) => path.as_os_str().to_string_lossy().trim().is_empty(),
            FileRef::Blob { file_name, content } => {
                file_name.trim().is_empty() || content.is_empty()
            }
        }
    }

    pub fn file_name(&self) -> String {
        match self {
            FileRef::Path(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            FileRef::Blob { file_name, .. } => file_name.clone(),
        }
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            FileRef::Path(path) => Some(path),
            FileRef::Blob { .. } => None,
        }
    }
}

#[derive(Clone, PartialEq)]
pub struct QuestionsRequest {
    pub input_csv: Option<FileRef>,
    pub business_name: String,
    pub credential: String,
}

#[derive(Clone, PartialEq)]
pub struct SwotRequest {
    pub input_csv: Option<FileRef>,
    pub input_pdf: Option<FileRef>,
    pub business_name: String,
    pub credential: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationRequest {
    Questions(QuestionsRequest),
    Swot(SwotRequest),
}

impl GenerationRequest {
    pub fn kind(&self) -> WorkflowKind {
        match self {
            GenerationRequest::Questions(_) => WorkflowKind::Questions,
            GenerationRequest::Swot(_) => WorkflowKind::Swot,
        }
    }

    pub fn business_name(&self) -> &str {
        match self {
            GenerationRequest::Questions(req) => &req.business_name,
            GenerationRequest::Swot(req) => &req.business_name,
        }
    }
}

// The credential never reaches logs.
impl fmt::Debug for QuestionsRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuestionsRequest")
            .field("input_csv", &self.input_csv)
            .field("business_name", &self.business_name)
            .field("credential", &"<redacted>")
            .finish()
    }
}

impl fmt::Debug for SwotRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwotRequest")
            .field("input_csv", &self.input_csv)
            .field("input_pdf", &self.input_pdf)
            .field("business_name", &self.business_name)
            .field("credential", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArtifactRef {
    /// Identifier held by the hosted backend, redeemable while it keeps the file.
    Remote { id: String },
    /// Generated content the local engine renders straight to a path.
    Local(LocalArtifact),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalArtifact {
    pub business_name: String,
    pub content: LocalContent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LocalContent {
    Questions(Vec<String>),
    Swot(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionsResult {
    pub business_name: String,
    pub questions: Vec<String>,
    pub question_count: usize,
    pub preview_count: usize,
    pub artifact: ArtifactRef,
}

impl QuestionsResult {
    pub fn preview(&self) -> &[String] {
        &self.questions[..self.preview_count.min(self.questions.len())]
    }

    /// Questions not shown in the preview; zero when the total is below the preview size.
    pub fn additional_count(&self) -> usize {
        self.question_count.saturating_sub(self.preview_count)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwotResult {
    pub business_name: String,
    pub analysis_text: String,
    pub artifact: ArtifactRef,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "workflow", rename_all = "snake_case")]
pub enum GenerationResult {
    Questions(QuestionsResult),
    Swot(SwotResult),
}

impl GenerationResult {
    pub fn kind(&self) -> WorkflowKind {
        match self {
            GenerationResult::Questions(_) => WorkflowKind::Questions,
            GenerationResult::Swot(_) => WorkflowKind::Swot,
        }
    }

    pub fn business_name(&self) -> &str {
        match self {
            GenerationResult::Questions(r) => &r.business_name,
            GenerationResult::Swot(r) => &r.business_name,
        }
    }

    pub fn artifact(&self) -> &ArtifactRef {
        match self {
            GenerationResult::Questions(r) => &r.artifact,
            GenerationResult::Swot(r) => &r.artifact,
        }
    }
}

/// A finished job. `warning` carries non-fatal conditions such as an empty
/// question list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Completion {
    pub job_id: Uuid,
    pub result: GenerationResult,
    pub warning: Option<AppError>,
}

/// File name offered to the save dialog for a result.
pub fn suggested_file_name(result: &GenerationResult) -> String {
    let business: String = result
        .business_name()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");
    match result {
        GenerationResult::Questions(_) => format!("{business}_questions.pdf"),
        GenerationResult::Swot(_) => format!("{business}_swot_analysis.pdf"),
    }
}
