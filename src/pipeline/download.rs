use std::path::{Path, PathBuf};
use std::sync::Arc;

use opentelemetry::KeyValue;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::model::ArtifactRef;
use crate::telemetry::metrics::ARTIFACT_DOWNLOADS;
use crate::transport::{Operation, SharedTransport};

/// Asks the user where to save an artifact. `Ok(None)` means the user
/// cancelled; an unusable choice is an error.
#[async_trait::async_trait]
pub trait DestinationPicker: Send + Sync {
    async fn choose(&self, suggested_file_name: &str) -> AppResult<Option<PathBuf>>;
}

/// Saves every artifact into one directory under its suggested name.
#[derive(Debug, Clone)]
pub struct OutputDirectory {
    root: PathBuf,
}

impl OutputDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait::async_trait]
impl DestinationPicker for OutputDirectory {
    async fn choose(&self, suggested_file_name: &str) -> AppResult<Option<PathBuf>> {
        // Only the final component is kept so a name cannot escape the root.
        let file_name = Path::new(suggested_file_name.trim())
            .file_name()
            .ok_or_else(|| {
                AppError::Download(format!("invalid file name '{suggested_file_name}'"))
            })?;
        Ok(Some(self.root.join(file_name)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedFile {
    pub path: PathBuf,
    pub bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DownloadOutcome {
    Saved(SavedFile),
    Cancelled,
}

/// Redeems artifacts through the transport that produced them. An artifact
/// can be redeemed any number of times; nothing here mutates a session.
#[derive(Clone)]
pub struct ArtifactDownloader {
    transport: SharedTransport,
    picker: Arc<dyn DestinationPicker>,
}

impl ArtifactDownloader {
    pub fn new(transport: SharedTransport, picker: Arc<dyn DestinationPicker>) -> Self {
        Self { transport, picker }
    }

    #[tracing::instrument(
        name = "artifact download",
        skip(self, artifact),
        fields(
            transport = self.transport.name(),
            operation = Operation::DownloadArtifact.name(),
            download.bytes = tracing::field::Empty,
        )
    )]
    pub async fn download(
        &self,
        artifact: &ArtifactRef,
        suggested_file_name: &str,
    ) -> AppResult<DownloadOutcome> {
        let destination = match self.picker.choose(suggested_file_name).await {
            Ok(Some(destination)) => destination,
            Ok(None) => {
                tracing::info!("Save cancelled, nothing written");
                ARTIFACT_DOWNLOADS.add(1, &[KeyValue::new("outcome", "cancelled")]);
                return Ok(DownloadOutcome::Cancelled);
            }
            Err(err) => return Err(failed(err, Path::new(suggested_file_name))),
        };

        match self.save(artifact, &destination).await {
            Ok(bytes) => {
                tracing::Span::current().record("download.bytes", bytes as i64);
                tracing::info!(path = %destination.display(), bytes, "Artifact saved");
                ARTIFACT_DOWNLOADS.add(1, &[KeyValue::new("outcome", "saved")]);
                Ok(DownloadOutcome::Saved(SavedFile {
                    path: destination,
                    bytes,
                }))
            }
            Err(err) => Err(failed(err, &destination)),
        }
    }

    async fn save(&self, artifact: &ArtifactRef, destination: &Path) -> AppResult<u64> {
        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AppError::Download(format!("cannot create {}: {e}", parent.display()))
            })?;
        }
        self.transport.redeem(artifact, destination).await
    }
}

fn failed(err: AppError, destination: &Path) -> AppError {
    tracing::warn!(path = %destination.display(), error = %err, "Artifact download failed");
    ARTIFACT_DOWNLOADS.add(1, &[KeyValue::new("outcome", "failed")]);
    err
}
