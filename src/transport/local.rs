use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{Operation, Transport};
use crate::error::{AppError, AppResult};
use crate::model::{
    ArtifactRef, FileRef, GenerationRequest, GenerationResult, LocalArtifact, LocalContent,
    PREVIEW_SIZE, QuestionsResult, SwotResult,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionsArgs {
    pub csv_path: PathBuf,
    pub business_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwotArgs {
    pub csv_path: PathBuf,
    pub pdf_path: PathBuf,
    pub business_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveQuestionsArgs {
    pub questions: Vec<String>,
    pub business_name: String,
    pub output_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveSwotArgs {
    pub text: String,
    pub business_name: String,
    pub output_path: PathBuf,
}

/// The local generation engine's command surface. Errors are opaque strings.
#[async_trait::async_trait]
pub trait LocalCommands: Send + Sync {
    async fn check_readiness(&self) -> Result<String, String>;
    async fn generate_questions(&self, args: &QuestionsArgs) -> Result<Vec<String>, String>;
    async fn generate_swot(&self, args: &SwotArgs) -> Result<String, String>;
    async fn save_questions_as_artifact(&self, args: &SaveQuestionsArgs) -> Result<(), String>;
    async fn save_swot_as_artifact(&self, args: &SaveSwotArgs) -> Result<(), String>;
}

/// Adapts [`LocalCommands`] to the [`Transport`] contract.
pub struct LocalTransport {
    commands: Arc<dyn LocalCommands>,
}

impl LocalTransport {
    pub fn new(commands: Arc<dyn LocalCommands>) -> Self {
        Self { commands }
    }
}

/// Sorts an opaque command failure into transport vs. backend failures.
pub fn classify_command_error(message: String) -> AppError {
    let msg = message.to_lowercase();
    let transport = [
        "failed to start",
        "failed to spawn",
        "failed to connect",
        "failed to parse",
        "failed to write",
        "not running",
        "please install",
        "broken pipe",
        "timed out",
        "timeout",
        "connection",
    ];
    if transport.iter().any(|needle| msg.contains(needle)) {
        AppError::Transport(message)
    } else {
        AppError::Backend(message)
    }
}

fn local_path(file: &Option<FileRef>) -> AppResult<PathBuf> {
    match file {
        Some(FileRef::Path(path)) => Ok(path.clone()),
        Some(FileRef::Blob { file_name, .. }) => Err(AppError::Transport(format!(
            "the local engine reads files from disk; '{file_name}' was supplied in memory"
        ))),
        None => Err(AppError::Transport(
            "request is missing an input document".into(),
        )),
    }
}

#[async_trait::async_trait]
impl Transport for LocalTransport {
    async fn check_readiness(&self) -> AppResult<String> {
        self.commands
            .check_readiness()
            .await
            .map_err(AppError::Transport)
    }

    async fn invoke(&self, request: &GenerationRequest) -> AppResult<GenerationResult> {
        tracing::debug!(
            operation = Operation::for_request(request).name(),
            "Invoking local engine"
        );

        match request {
            GenerationRequest::Questions(req) => {
                let args = QuestionsArgs {
                    csv_path: local_path(&req.input_csv)?,
                    business_name: req.business_name.clone(),
                };
                let questions: Vec<String> = self
                    .commands
                    .generate_questions(&args)
                    .await
                    .map_err(classify_command_error)?
                    .into_iter()
                    .map(|q| q.trim().to_string())
                    .filter(|q| !q.is_empty())
                    .collect();

                Ok(GenerationResult::Questions(QuestionsResult {
                    business_name: req.business_name.clone(),
                    question_count: questions.len(),
                    preview_count: questions.len().min(PREVIEW_SIZE),
                    artifact: ArtifactRef::Local(LocalArtifact {
                        business_name: req.business_name.clone(),
                        content: LocalContent::Questions(questions.clone()),
                    }),
                    questions,
                }))
            }
            GenerationRequest::Swot(req) => {
                let args = SwotArgs {
                    csv_path: local_path(&req.input_csv)?,
                    pdf_path: local_path(&req.input_pdf)?,
                    business_name: req.business_name.clone(),
                };
                let text = self
                    .commands
                    .generate_swot(&args)
                    .await
                    .map_err(classify_command_error)?;

                Ok(GenerationResult::Swot(SwotResult {
                    business_name: req.business_name.clone(),
                    artifact: ArtifactRef::Local(LocalArtifact {
                        business_name: req.business_name.clone(),
                        content: LocalContent::Swot(text.clone()),
                    }),
                    analysis_text: text,
                }))
            }
        }
    }

    async fn redeem(&self, artifact: &ArtifactRef, destination: &Path) -> AppResult<u64> {
        let ArtifactRef::Local(local) = artifact else {
            return Err(AppError::Download(
                "artifact is held by the hosted backend, not the local engine".into(),
            ));
        };

        let saved = match &local.content {
            LocalContent::Questions(questions) => {
                self.commands
                    .save_questions_as_artifact(&SaveQuestionsArgs {
                        questions: questions.clone(),
                        business_name: local.business_name.clone(),
                        output_path: destination.to_path_buf(),
                    })
                    .await
            }
            LocalContent::Swot(text) => {
                self.commands
                    .save_swot_as_artifact(&SaveSwotArgs {
                        text: text.clone(),
                        business_name: local.business_name.clone(),
                        output_path: destination.to_path_buf(),
                    })
                    .await
            }
        };
        saved.map_err(AppError::Download)?;

        let metadata = tokio::fs::metadata(destination).await.map_err(|e| {
            AppError::Download(format!(
                "engine reported success but {} is unreadable: {e}",
                destination.display()
            ))
        })?;
        Ok(metadata.len())
    }

    fn name(&self) -> &str {
        "local"
    }
}
