use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::progress::{ProgressEvent, ProgressReporter, ProgressState, Stage};
use crate::error::AppError;
use crate::model::{Completion, WorkflowKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Validating,
    Submitting,
    AwaitingResult,
    Completed,
    Failed,
}

impl SessionState {
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Idle, Validating)
                | (Validating, Submitting)
                | (Validating, Failed)
                | (Submitting, AwaitingResult)
                | (Submitting, Failed)
                | (AwaitingResult, Completed)
                | (AwaitingResult, Failed)
                | (Completed, Idle)
                | (Failed, Idle)
        )
    }

    /// Any non-idle state holds the slot.
    pub fn is_occupied(self) -> bool {
        self != SessionState::Idle
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Completed(Completion),
    Failed { error: AppError },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub workflow: WorkflowKind,
    pub state: SessionState,
    pub job_id: Option<Uuid>,
    pub progress: ProgressState,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub last_outcome: Option<Outcome>,
}

/// One workflow slot. Holds at most one job between `Idle` and its release.
pub struct OrchestratorSession {
    kind: WorkflowKind,
    state: SessionState,
    job_id: Option<Uuid>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    last_outcome: Option<Outcome>,
    last_completion: Option<Completion>,
    reporter: ProgressReporter,
}

impl OrchestratorSession {
    pub fn new(kind: WorkflowKind) -> Self {
        Self {
            kind,
            state: SessionState::Idle,
            job_id: None,
            started_at: None,
            finished_at: None,
            last_outcome: None,
            last_completion: None,
            reporter: ProgressReporter::new(kind),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn job_id(&self) -> Option<Uuid> {
        self.job_id
    }

    pub fn is_occupied(&self) -> bool {
        self.state.is_occupied()
    }

    pub fn holds(&self, job_id: Uuid) -> bool {
        self.job_id == Some(job_id) && self.is_occupied()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.reporter.subscribe()
    }

    fn advance(&mut self, next: SessionState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal session transition {:?} -> {:?}",
            self.state,
            next
        );
        tracing::debug!(
            workflow = %self.kind,
            from = ?self.state,
            to = ?next,
            "Session transition"
        );
        self.state = next;
    }

    /// `Idle -> Validating` for a fresh job.
    pub fn occupy(&mut self, job_id: Uuid) {
        self.job_id = Some(job_id);
        self.started_at = Some(Utc::now());
        self.finished_at = None;
        self.reporter.begin(job_id);
        self.advance(SessionState::Validating);
        self.reporter.enter(Stage::Validating);
    }

    pub fn submitting(&mut self) {
        self.advance(SessionState::Submitting);
        self.reporter.enter(Stage::Submitting);
    }

    pub fn awaiting_result(&mut self) {
        self.advance(SessionState::AwaitingResult);
        self.reporter.enter(Stage::AwaitingResult);
    }

    pub fn complete(&mut self, completion: Completion) {
        self.reporter.enter(Stage::ResultReceived);
        self.advance(SessionState::Completed);
        self.reporter.complete();
        self.finished_at = Some(Utc::now());
        self.last_completion = Some(completion.clone());
        self.last_outcome = Some(Outcome::Completed(completion));
    }

    /// Most recent successful job, kept across later failures so its
    /// artifact stays redeemable.
    pub fn last_completion(&self) -> Option<&Completion> {
        self.last_completion.as_ref()
    }

    pub fn fail(&mut self, error: AppError) {
        self.advance(SessionState::Failed);
        self.reporter.fail(&error.to_string());
        self.finished_at = Some(Utc::now());
        self.last_outcome = Some(Outcome::Failed { error });
    }

    /// Records a failure for a request that never occupied the slot.
    pub fn reject(&mut self, error: AppError) {
        self.finished_at = Some(Utc::now());
        self.last_outcome = Some(Outcome::Failed { error });
    }

    /// Terminal state back to `Idle`; the slot becomes reusable.
    pub fn release(&mut self) {
        if matches!(self.state, SessionState::Completed | SessionState::Failed) {
            self.advance(SessionState::Idle);
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            workflow: self.kind,
            state: self.state,
            job_id: self.job_id,
            progress: self.reporter.current().clone(),
            started_at: self.started_at,
            finished_at: self.finished_at,
            last_outcome: self.last_outcome.clone(),
        }
    }
}
