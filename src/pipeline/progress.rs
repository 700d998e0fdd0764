//! Phase-table progress reporting.
//!
//! The transports report nothing until they finish, so phases are tied to
//! orchestrator stages rather than to real backend work: entering a stage
//! emits every phase registered for it, some of them ahead of the backend.
//! The guarantees are ordering ones only: percentages never decrease while a
//! job runs, and each job ends in exactly one terminal state. The failure
//! terminal drops back to zero instead of holding the last percentage.

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::model::WorkflowKind;

const EVENT_CAPACITY: usize = 64;

/// Orchestrator stage that triggers a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validating,
    Submitting,
    AwaitingResult,
    ResultReceived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Phase {
    pub stage: Stage,
    pub percent: u8,
    pub label: &'static str,
}

const fn phase(stage: Stage, percent: u8, label: &'static str) -> Phase {
    Phase {
        stage,
        percent,
        label,
    }
}

pub const QUESTIONS_PHASES: &[Phase] = &[
    phase(Stage::Validating, 0, "Reading profiling data"),
    phase(Stage::Submitting, 20, "Locating business record"),
    phase(Stage::Submitting, 40, "Preparing prompt"),
    phase(Stage::AwaitingResult, 60, "Generating questions"),
    phase(Stage::ResultReceived, 90, "Finalizing questionnaire"),
];

pub const SWOT_PHASES: &[Phase] = &[
    phase(Stage::Validating, 0, "Reading profiling data"),
    phase(Stage::Submitting, 15, "Extracting Q&A document"),
    phase(Stage::Submitting, 30, "Locating business record"),
    phase(Stage::Submitting, 45, "Preparing analysis prompt"),
    phase(Stage::AwaitingResult, 60, "Generating SWOT analysis"),
    phase(Stage::ResultReceived, 90, "Finalizing report"),
];

pub const COMPLETE_LABEL: &str = "Complete";

pub fn phases(kind: WorkflowKind) -> &'static [Phase] {
    match kind {
        WorkflowKind::Questions => QUESTIONS_PHASES,
        WorkflowKind::Swot => SWOT_PHASES,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressState {
    pub percent: u8,
    pub label: String,
    pub terminal: bool,
    /// Set only on the error terminal.
    pub failed: bool,
}

impl ProgressState {
    pub fn idle() -> Self {
        Self {
            percent: 0,
            label: "Idle".to_string(),
            terminal: false,
            failed: false,
        }
    }

    fn running(phase: &Phase) -> Self {
        Self {
            percent: phase.percent,
            label: phase.label.to_string(),
            terminal: false,
            failed: false,
        }
    }

    fn complete() -> Self {
        Self {
            percent: 100,
            label: COMPLETE_LABEL.to_string(),
            terminal: true,
            failed: false,
        }
    }

    fn failed(message: &str) -> Self {
        Self {
            percent: 0,
            label: format!("Failed: {message}"),
            terminal: true,
            failed: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub job_id: Uuid,
    pub workflow: WorkflowKind,
    pub state: ProgressState,
}

pub struct ProgressReporter {
    kind: WorkflowKind,
    job_id: Option<Uuid>,
    current: ProgressState,
    tx: broadcast::Sender<ProgressEvent>,
}

impl ProgressReporter {
    pub fn new(kind: WorkflowKind) -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            kind,
            job_id: None,
            current: ProgressState::idle(),
            tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> &ProgressState {
        &self.current
    }

    /// Starts a new job lifetime; percentages may start over from zero.
    pub fn begin(&mut self, job_id: Uuid) {
        self.job_id = Some(job_id);
        self.current = ProgressState {
            percent: 0,
            label: String::new(),
            terminal: false,
            failed: false,
        };
    }

    pub fn enter(&mut self, stage: Stage) {
        for phase in phases(self.kind).iter().filter(|p| p.stage == stage) {
            self.emit(ProgressState::running(phase));
        }
    }

    /// Emitted only once the transport call has returned successfully.
    pub fn complete(&mut self) {
        self.emit(ProgressState::complete());
    }

    pub fn fail(&mut self, message: &str) {
        self.emit(ProgressState::failed(message));
    }

    fn emit(&mut self, mut state: ProgressState) {
        let Some(job_id) = self.job_id else {
            return;
        };
        if self.current.terminal {
            return;
        }
        if !state.failed {
            state.percent = state.percent.max(self.current.percent);
        }
        self.current = state.clone();

        tracing::info!(
            workflow = %self.kind,
            job.id = %job_id,
            progress.percent = state.percent,
            progress.label = %state.label,
            progress.terminal = state.terminal,
            "Progress"
        );

        // No subscribers is fine; the latest state stays readable via `current`.
        let _ = self.tx.send(ProgressEvent {
            job_id,
            workflow: self.kind,
            state,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &mut broadcast::Receiver<ProgressEvent>) -> Vec<ProgressState> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event.state);
        }
        out
    }

    fn run_stages(reporter: &mut ProgressReporter) {
        reporter.enter(Stage::Validating);
        reporter.enter(Stage::Submitting);
        reporter.enter(Stage::AwaitingResult);
        reporter.enter(Stage::ResultReceived);
    }

    #[test]
    fn test_phase_tables_are_increasing_and_below_complete() {
        for kind in [WorkflowKind::Questions, WorkflowKind::Swot] {
            let table = phases(kind);
            assert_eq!(table.first().unwrap().percent, 0);
            assert!(table.windows(2).all(|w| w[0].percent < w[1].percent));
            assert!(table.iter().all(|p| p.percent < 100));
        }
        assert_eq!(QUESTIONS_PHASES.len(), 5);
        assert_eq!(SWOT_PHASES.len(), 6);
    }

    #[test]
    fn test_successful_job_sequence() {
        let mut reporter = ProgressReporter::new(WorkflowKind::Questions);
        let mut rx = reporter.subscribe();
        reporter.begin(Uuid::new_v4());
        run_stages(&mut reporter);
        reporter.complete();

        let states = drain(&mut rx);
        let percents: Vec<u8> = states.iter().map(|s| s.percent).collect();
        assert_eq!(percents, vec![0, 20, 40, 60, 90, 100]);
        assert_eq!(states.iter().filter(|s| s.terminal).count(), 1);
        assert_eq!(states.last().unwrap().label, COMPLETE_LABEL);
    }

    #[test]
    fn test_failure_is_distinct_terminal() {
        let mut reporter = ProgressReporter::new(WorkflowKind::Swot);
        let mut rx = reporter.subscribe();
        reporter.begin(Uuid::new_v4());
        reporter.enter(Stage::Validating);
        reporter.enter(Stage::Submitting);
        reporter.enter(Stage::AwaitingResult);
        reporter.fail("Business name not found");

        let states = drain(&mut rx);
        let last = states.last().unwrap();
        assert!(last.terminal);
        assert!(last.failed);
        assert_eq!(last.percent, 0);
        assert_eq!(last.label, "Failed: Business name not found");

        let running = &states[..states.len() - 1];
        assert_eq!(running.last().unwrap().percent, 60);
        assert!(running.windows(2).all(|w| w[0].percent <= w[1].percent));
    }

    #[test]
    fn test_nothing_after_terminal() {
        let mut reporter = ProgressReporter::new(WorkflowKind::Questions);
        let mut rx = reporter.subscribe();
        reporter.begin(Uuid::new_v4());
        reporter.enter(Stage::Validating);
        reporter.fail("boom");
        reporter.complete();
        reporter.enter(Stage::AwaitingResult);

        let states = drain(&mut rx);
        assert_eq!(states.len(), 2);
        assert!(reporter.current().failed);
    }

    #[test]
    fn test_begin_resets_for_next_job() {
        let mut reporter = ProgressReporter::new(WorkflowKind::Questions);
        reporter.begin(Uuid::new_v4());
        run_stages(&mut reporter);
        reporter.complete();
        assert_eq!(reporter.current().percent, 100);

        reporter.begin(Uuid::new_v4());
        reporter.enter(Stage::Validating);
        assert_eq!(reporter.current().percent, 0);
        assert!(!reporter.current().terminal);
    }

    #[test]
    fn test_no_emission_without_job() {
        let mut reporter = ProgressReporter::new(WorkflowKind::Swot);
        let mut rx = reporter.subscribe();
        reporter.enter(Stage::Validating);
        assert!(drain(&mut rx).is_empty());
        assert_eq!(reporter.current(), &ProgressState::idle());
    }
}
