use std::path::{Path, PathBuf};

use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tokio::io::AsyncWriteExt;

use super::{Operation, Transport};
use crate::error::{AppError, AppResult};
use crate::model::{
    ArtifactRef, FileRef, GenerationRequest, GenerationResult, QuestionsResult, SwotResult,
};

/// Talks to the hosted analysis backend over multipart HTTP.
pub struct RemoteTransport {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteTransport {
    pub fn new(base_url: &str) -> Self {
        // No request timeout: a job runs until the backend answers.
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[derive(Deserialize)]
struct QuestionsBody {
    business_name: String,
    questions_count: usize,
    #[serde(default)]
    questions_preview: Vec<String>,
    pdf_id: String,
}

#[derive(Deserialize)]
struct SwotBody {
    business_name: String,
    swot_analysis: String,
    pdf_id: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: Detail,
}

/// FastAPI-style `detail`: a bare string or an object with a message.
#[derive(Deserialize)]
#[serde(untagged)]
enum Detail {
    Text(String),
    Structured { message: String },
}

impl Detail {
    fn into_message(self) -> String {
        match self {
            Detail::Text(message) | Detail::Structured { message } => message,
        }
    }
}

/// Maps a non-2xx response body to the error taxonomy.
fn classify_failure(status: reqwest::StatusCode, body: &str) -> AppError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(err) => AppError::Backend(err.detail.into_message()),
        Err(_) => AppError::Transport(format!("{}: {}", status, excerpt(body, 200))),
    }
}

fn excerpt(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        s.char_indices()
            .take_while(|&(i, _)| i < max)
            .map(|(_, c)| c)
            .collect()
    }
}

async fn file_part(file: &FileRef, mime: &str) -> AppResult<Part> {
    let part = match file {
        FileRef::Path(path) => {
            let content = tokio::fs::read(path).await.map_err(|e| {
                AppError::Transport(format!("failed to read {}: {e}", path.display()))
            })?;
            Part::bytes(content)
        }
        FileRef::Blob { content, .. } => Part::stream(reqwest::Body::from(content.clone())),
    };

    part.file_name(file.file_name())
        .mime_str(mime)
        .map_err(|e| AppError::Transport(format!("invalid content type {mime}: {e}")))
}

fn required(file: &Option<FileRef>) -> AppResult<&FileRef> {
    file.as_ref()
        .ok_or_else(|| AppError::Transport("request is missing an input document".into()))
}

impl RemoteTransport {
    async fn build_form(&self, request: &GenerationRequest) -> AppResult<Form> {
        let form = match request {
            GenerationRequest::Questions(req) => Form::new()
                .part("csv_file", file_part(required(&req.input_csv)?, "text/csv").await?)
                .text("business_name", req.business_name.clone())
                .text("api_key", req.credential.clone()),
            GenerationRequest::Swot(req) => Form::new()
                .part("csv_file", file_part(required(&req.input_csv)?, "text/csv").await?)
                .part(
                    "pdf_file",
                    file_part(required(&req.input_pdf)?, "application/pdf").await?,
                )
                .text("business_name", req.business_name.clone())
                .text("api_key", req.credential.clone()),
        };
        Ok(form)
    }

    async fn download_to(&self, id: &str, destination: &Path) -> AppResult<u64> {
        let response = self
            .client
            .get(self.url(&format!("/api/{}/{id}", Operation::DownloadArtifact.name())))
            .send()
            .await
            .map_err(|e| AppError::Download(format!("failed to reach backend: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ErrorBody>(&body) {
                Ok(err) => err.detail.into_message(),
                Err(_) => format!("backend returned {status}"),
            };
            return Err(AppError::Download(message));
        }

        // Chunks land in a sibling file that only replaces the destination
        // once the whole body has arrived.
        let partial = partial_path(destination);
        match write_stream(response, &partial).await {
            Ok(written) => {
                tokio::fs::rename(&partial, destination).await.map_err(|e| {
                    AppError::Download(format!(
                        "failed to move download into {}: {e}",
                        destination.display()
                    ))
                })?;
                Ok(written)
            }
            Err(err) => {
                if let Err(e) = tokio::fs::remove_file(&partial).await {
                    tracing::debug!(
                        path = %partial.display(),
                        error = %e,
                        "No partial download to remove"
                    );
                }
                Err(err)
            }
        }
    }
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    destination.with_file_name(name)
}

async fn write_stream(response: reqwest::Response, path: &Path) -> AppResult<u64> {
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| AppError::Download(format!("failed to create {}: {e}", path.display())))?;

    let mut written: u64 = 0;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| AppError::Download(format!("stream interrupted: {e}")))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| AppError::Download(format!("write failed: {e}")))?;
        written += chunk.len() as u64;
    }
    file.flush()
        .await
        .map_err(|e| AppError::Download(format!("write failed: {e}")))?;

    Ok(written)
}

#[async_trait::async_trait]
impl Transport for RemoteTransport {
    async fn check_readiness(&self) -> AppResult<String> {
        let response = self
            .client
            .get(self.url("/"))
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("backend unreachable: {e}")))?;

        if response.status().is_success() {
            Ok(format!("Analysis backend at {} is reachable", self.base_url))
        } else {
            Err(AppError::Transport(format!(
                "backend health check returned {}",
                response.status()
            )))
        }
    }

    async fn invoke(&self, request: &GenerationRequest) -> AppResult<GenerationResult> {
        let operation = Operation::for_request(request);
        let form = self.build_form(request).await?;

        let response = self
            .client
            .post(self.url(&format!("/api/{}", operation.name())))
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("failed to reach backend: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Transport(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(classify_failure(status, &body));
        }

        let malformed = |e: serde_json::Error| {
            AppError::Transport(format!("malformed {} response: {e}", operation.name()))
        };

        match request {
            GenerationRequest::Questions(_) => {
                let parsed: QuestionsBody = serde_json::from_str(&body).map_err(malformed)?;
                Ok(GenerationResult::Questions(QuestionsResult {
                    business_name: parsed.business_name,
                    preview_count: parsed.questions_preview.len(),
                    question_count: parsed.questions_count,
                    questions: parsed.questions_preview,
                    artifact: ArtifactRef::Remote { id: parsed.pdf_id },
                }))
            }
            GenerationRequest::Swot(_) => {
                let parsed: SwotBody = serde_json::from_str(&body).map_err(malformed)?;
                Ok(GenerationResult::Swot(SwotResult {
                    business_name: parsed.business_name,
                    analysis_text: parsed.swot_analysis,
                    artifact: ArtifactRef::Remote { id: parsed.pdf_id },
                }))
            }
        }
    }

    async fn redeem(&self, artifact: &ArtifactRef, destination: &Path) -> AppResult<u64> {
        match artifact {
            ArtifactRef::Remote { id } => self.download_to(id, destination).await,
            ArtifactRef::Local(_) => Err(AppError::Download(
                "artifact was produced by the local engine, not the hosted backend".into(),
            )),
        }
    }

    fn name(&self) -> &str {
        "remote"
    }
}
