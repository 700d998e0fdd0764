pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod routes;
pub mod telemetry;
pub mod transport;

pub use config::Config;

use pipeline::{ArtifactDownloader, Orchestrator};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub orchestrator: Orchestrator,
    pub downloader: ArtifactDownloader,
}
