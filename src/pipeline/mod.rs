pub mod download;
pub mod orchestrator;
pub mod progress;
pub mod session;
pub mod validate;

pub use download::{ArtifactDownloader, DestinationPicker, DownloadOutcome, OutputDirectory};
pub use orchestrator::{Orchestrator, PendingJob, ReadinessStatus};
pub use progress::{ProgressEvent, ProgressState};
pub use session::{Outcome, SessionSnapshot, SessionState};
pub use validate::validate;
