use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use opentelemetry::KeyValue;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::Instrument;
use uuid::Uuid;

use super::progress::ProgressEvent;
use super::session::{OrchestratorSession, SessionSnapshot, SessionState};
use super::validate::validate;
use crate::error::{AppError, AppResult};
use crate::model::{Completion, GenerationRequest, GenerationResult, WorkflowKind};
use crate::telemetry::metrics::{
    READINESS_CHECKS, SESSION_BUSY_REJECTIONS, WORKFLOW_JOB_DURATION, WORKFLOW_JOBS,
};
use crate::transport::{Operation, SharedTransport};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum ReadinessStatus {
    Unchecked,
    Ready(String),
    NotReady(String),
}

struct Readiness {
    ever_ready: bool,
    last: ReadinessStatus,
}

struct Inner {
    transport: SharedTransport,
    questions: Mutex<OrchestratorSession>,
    swot: Mutex<OrchestratorSession>,
    readiness: Mutex<Readiness>,
    settle_delay: Duration,
}

impl Inner {
    // Guards are never held across an await, so a poisoned lock still holds
    // a consistent session.
    fn session(&self, kind: WorkflowKind) -> MutexGuard<'_, OrchestratorSession> {
        let slot = match kind {
            WorkflowKind::Questions => &self.questions,
            WorkflowKind::Swot => &self.swot,
        };
        slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn readiness(&self) -> MutexGuard<'_, Readiness> {
        self.readiness.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Drives validation, the transport call and progress for the two workflow
/// slots. Cheap to clone; clones share the same sessions.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    pub fn new(transport: SharedTransport, settle_delay: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                questions: Mutex::new(OrchestratorSession::new(WorkflowKind::Questions)),
                swot: Mutex::new(OrchestratorSession::new(WorkflowKind::Swot)),
                readiness: Mutex::new(Readiness {
                    ever_ready: false,
                    last: ReadinessStatus::Unchecked,
                }),
                settle_delay,
            }),
        }
    }

    pub fn transport(&self) -> SharedTransport {
        self.inner.transport.clone()
    }

    /// Runs the backend readiness check. Never fails: an unready backend is
    /// reported as [`ReadinessStatus::NotReady`]. One success unlocks the
    /// workflows for the rest of the process lifetime.
    #[tracing::instrument(
        name = "readiness check",
        skip(self),
        fields(
            transport = self.inner.transport.name(),
            operation = Operation::CheckReadiness.name(),
        )
    )]
    pub async fn check_readiness(&self) -> ReadinessStatus {
        let status = match self.inner.transport.check_readiness().await {
            Ok(message) => {
                tracing::info!(%message, "Backend ready");
                ReadinessStatus::Ready(message)
            }
            Err(err) => {
                tracing::warn!(error = %err, "Backend not ready");
                ReadinessStatus::NotReady(err.to_string())
            }
        };

        let ready = matches!(status, ReadinessStatus::Ready(_));
        READINESS_CHECKS.add(
            1,
            &[KeyValue::new("result", if ready { "ready" } else { "not_ready" })],
        );

        let mut readiness = self.inner.readiness();
        readiness.ever_ready |= ready;
        readiness.last = status.clone();
        status
    }

    pub fn readiness(&self) -> ReadinessStatus {
        self.inner.readiness().last.clone()
    }

    pub fn is_ready(&self) -> bool {
        self.inner.readiness().ever_ready
    }

    pub fn subscribe(&self, kind: WorkflowKind) -> broadcast::Receiver<ProgressEvent> {
        self.inner.session(kind).subscribe()
    }

    pub fn snapshot(&self, kind: WorkflowKind) -> SessionSnapshot {
        self.inner.session(kind).snapshot()
    }

    pub fn last_completion(&self, kind: WorkflowKind) -> Option<Completion> {
        self.inner.session(kind).last_completion().cloned()
    }

    /// Admits a request into its workflow slot: readiness gate, busy gate,
    /// validation. On success the slot is in `Submitting` and the returned job
    /// must be run.
    pub fn prepare(&self, request: GenerationRequest) -> AppResult<PendingJob> {
        let kind = request.kind();
        let ready = self.is_ready();
        let mut session = self.inner.session(kind);

        if session.is_occupied() {
            SESSION_BUSY_REJECTIONS.add(1, &[KeyValue::new("workflow", kind.as_str())]);
            tracing::warn!(
                workflow = %kind,
                in_flight = ?session.job_id(),
                "Rejecting submission, slot occupied"
            );
            return Err(AppError::SessionBusy(kind));
        }

        if !ready {
            tracing::warn!(workflow = %kind, "Rejecting submission, backend not ready");
            session.reject(AppError::NotReady);
            record_outcome(kind, &Err(AppError::NotReady), Duration::ZERO);
            return Err(AppError::NotReady);
        }

        let job_id = Uuid::new_v4();
        session.occupy(job_id);

        if let Err(error) = validate(&request) {
            tracing::info!(workflow = %kind, job.id = %job_id, error = %error, "Validation failed");
            session.fail(error.clone());
            session.release();
            record_outcome(kind, &Err(error.clone()), Duration::ZERO);
            return Err(error);
        }

        session.submitting();

        Ok(PendingJob {
            orchestrator: self.clone(),
            kind,
            job_id,
            request: Some(request),
            admitted_at: Instant::now(),
            released: false,
        })
    }

    /// Admits and runs a request to its terminal state.
    #[tracing::instrument(
        name = "orchestrator submit",
        skip(self, request),
        fields(workflow.kind = %request.kind(), business_name = %request.business_name())
    )]
    pub async fn submit(&self, request: GenerationRequest) -> AppResult<Completion> {
        self.prepare(request)?.run().await
    }
}

/// A request admitted into its slot, waiting for its single transport call.
/// Dropping it before the slot is released, whether unrun or mid-run, fails
/// and releases the slot.
pub struct PendingJob {
    orchestrator: Orchestrator,
    kind: WorkflowKind,
    job_id: Uuid,
    request: Option<GenerationRequest>,
    admitted_at: Instant,
    released: bool,
}

impl PendingJob {
    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    pub fn kind(&self) -> WorkflowKind {
        self.kind
    }

    /// Issues exactly one transport call. There is no timeout and no
    /// cancellation: the job ends when the transport answers.
    #[tracing::instrument(
        name = "orchestrator job",
        skip(self),
        fields(workflow.kind = %self.kind, job.id = %self.job_id, job.duration_ms)
    )]
    pub async fn run(mut self) -> AppResult<Completion> {
        let Some(request) = self.request.take() else {
            return Err(AppError::Transport("job was already run".into()));
        };
        let inner = self.orchestrator.inner.clone();
        let (kind, job_id) = (self.kind, self.job_id);

        inner.session(kind).awaiting_result();

        let span = tracing::info_span!(
            "transport invoke",
            otel.name = %format!("transport {}", Operation::for_request(&request).name()),
            transport = inner.transport.name(),
            operation = Operation::for_request(&request).name(),
            otel.status_code = tracing::field::Empty,
            error.type = tracing::field::Empty,
        );
        let outcome = inner
            .transport
            .invoke(&request)
            .instrument(span.clone())
            .await;

        let result = match outcome {
            Ok(result) => {
                let warning = empty_result_warning(&result);
                if let Some(warning) = &warning {
                    tracing::warn!(
                        job.id = %job_id,
                        warning = %warning,
                        "Job completed with a warning"
                    );
                }
                let completion = Completion {
                    job_id,
                    result,
                    warning,
                };
                inner.session(kind).complete(completion.clone());
                Ok(completion)
            }
            Err(error) => {
                span.record("otel.status_code", "ERROR");
                span.record("error.type", error.kind());
                tracing::warn!(job.id = %job_id, error = %error, "Job failed");
                let mut session = inner.session(kind);
                session.fail(error.clone());
                session.release();
                self.released = true;
                Err(error)
            }
        };

        let duration = self.admitted_at.elapsed();
        tracing::Span::current().record("job.duration_ms", duration.as_millis() as i64);
        record_outcome(kind, &result, duration);

        if result.is_ok() {
            // Keep the completed state visible before the slot is reusable.
            if !inner.settle_delay.is_zero() {
                tokio::time::sleep(inner.settle_delay).await;
            }
            let mut session = inner.session(kind);
            if session.holds(job_id) {
                session.release();
            }
            self.released = true;
        }

        result
    }
}

impl Drop for PendingJob {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let mut session = self.orchestrator.inner.session(self.kind);
        if !session.holds(self.job_id) {
            return;
        }
        if session.state() == SessionState::Completed {
            tracing::debug!(job.id = %self.job_id, "Job dropped during settle delay");
        } else {
            tracing::warn!(
                job.id = %self.job_id,
                state = ?session.state(),
                "Admitted job dropped before reaching a terminal state"
            );
            session.fail(AppError::Transport(
                "job was abandoned before the backend answered".into(),
            ));
        }
        session.release();
    }
}

fn empty_result_warning(result: &GenerationResult) -> Option<AppError> {
    match result {
        GenerationResult::Questions(q) if q.question_count == 0 => Some(AppError::EmptyResult),
        _ => None,
    }
}

fn record_outcome(kind: WorkflowKind, result: &AppResult<Completion>, duration: Duration) {
    let outcome = match result {
        Ok(completion) if completion.warning.is_some() => "completed_with_warning",
        Ok(_) => "completed",
        Err(err) => err.kind(),
    };
    let attrs = [
        KeyValue::new("workflow", kind.as_str()),
        KeyValue::new("outcome", outcome),
    ];
    WORKFLOW_JOBS.add(1, &attrs);
    WORKFLOW_JOB_DURATION.record(duration.as_secs_f64(), &attrs);
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::sync::Notify;

    use super::*;
    use crate::error::RequiredField;
    use crate::model::{ArtifactRef, FileRef, QuestionsRequest, QuestionsResult, SwotRequest};
    use crate::pipeline::session::Outcome;
    use crate::transport::Transport;

    struct FakeTransport {
        readiness: Mutex<VecDeque<AppResult<String>>>,
        response: AppResult<GenerationResult>,
        gate: Option<Arc<Notify>>,
        delay: Duration,
        invocations: AtomicUsize,
    }

    impl FakeTransport {
        fn new(response: AppResult<GenerationResult>) -> Self {
            Self {
                readiness: Mutex::new(VecDeque::new()),
                response,
                gate: None,
                delay: Duration::ZERO,
                invocations: AtomicUsize::new(0),
            }
        }

        fn with_readiness(self, checks: Vec<AppResult<String>>) -> Self {
            *self.readiness.lock().unwrap() = checks.into();
            self
        }

        fn gated(mut self, gate: Arc<Notify>) -> Self {
            self.gate = Some(gate);
            self
        }

        fn slow(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn calls(&self) -> usize {
            self.invocations.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl Transport for FakeTransport {
        async fn check_readiness(&self) -> AppResult<String> {
            self.readiness
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok("ready".into()))
        }

        async fn invoke(&self, _request: &GenerationRequest) -> AppResult<GenerationResult> {
            self.invocations.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.response.clone()
        }

        async fn redeem(&self, _artifact: &ArtifactRef, _destination: &Path) -> AppResult<u64> {
            Ok(0)
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    fn acme_questions() -> GenerationResult {
        GenerationResult::Questions(QuestionsResult {
            business_name: "Acme Corp".into(),
            questions: vec!["Q1", "Q2", "Q3", "Q4", "Q5"]
                .into_iter()
                .map(String::from)
                .collect(),
            question_count: 62,
            preview_count: 5,
            artifact: ArtifactRef::Remote {
                id: "abc123".into(),
            },
        })
    }

    fn questions_request() -> GenerationRequest {
        GenerationRequest::Questions(QuestionsRequest {
            input_csv: Some(FileRef::path("acme.csv")),
            business_name: "Acme Corp".into(),
            credential: "sk-test".into(),
        })
    }

    async fn ready_orchestrator(transport: Arc<FakeTransport>) -> Orchestrator {
        let orchestrator = Orchestrator::new(transport, Duration::ZERO);
        assert!(matches!(
            orchestrator.check_readiness().await,
            ReadinessStatus::Ready(_)
        ));
        orchestrator
    }

    fn percents(rx: &mut broadcast::Receiver<ProgressEvent>) -> Vec<(u8, bool, bool)> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push((event.state.percent, event.state.terminal, event.state.failed));
        }
        out
    }

    #[tokio::test]
    async fn test_questions_success_scenario() {
        let transport = Arc::new(FakeTransport::new(Ok(acme_questions())));
        let orchestrator = ready_orchestrator(transport.clone()).await;
        let mut rx = orchestrator.subscribe(WorkflowKind::Questions);

        let completion = orchestrator.submit(questions_request()).await.unwrap();
        let GenerationResult::Questions(result) = &completion.result else {
            panic!("expected questions");
        };
        assert_eq!(result.question_count, 62);
        assert_eq!(result.preview().len(), 5);
        assert!(completion.warning.is_none());
        assert_eq!(transport.calls(), 1);

        let snapshot = orchestrator.snapshot(WorkflowKind::Questions);
        assert_eq!(snapshot.state, SessionState::Idle);
        assert_eq!(snapshot.progress.percent, 100);
        assert_eq!(
            snapshot.last_outcome,
            Some(Outcome::Completed(completion.clone()))
        );

        let seen = percents(&mut rx);
        assert!(seen.windows(2).all(|w| w[0].0 <= w[1].0));
        assert_eq!(seen.iter().filter(|(_, terminal, _)| *terminal).count(), 1);
        assert_eq!(seen.last(), Some(&(100, true, false)));
    }

    #[tokio::test]
    async fn test_backend_failure_scenario() {
        let transport = Arc::new(FakeTransport::new(Err(AppError::Backend(
            "Business name not found".into(),
        ))));
        let orchestrator = ready_orchestrator(transport.clone()).await;
        let mut rx = orchestrator.subscribe(WorkflowKind::Questions);

        let err = orchestrator.submit(questions_request()).await.unwrap_err();
        assert_eq!(err, AppError::Backend("Business name not found".into()));

        let snapshot = orchestrator.snapshot(WorkflowKind::Questions);
        assert_eq!(snapshot.state, SessionState::Idle);
        assert!(snapshot.progress.failed);
        assert_eq!(
            snapshot.last_outcome,
            Some(Outcome::Failed {
                error: AppError::Backend("Business name not found".into())
            })
        );

        let seen = percents(&mut rx);
        assert_eq!(seen.iter().filter(|(_, terminal, _)| *terminal).count(), 1);
        assert!(seen.last().unwrap().2);
        assert!(seen.iter().all(|(p, _, _)| *p < 100));
    }

    #[tokio::test]
    async fn test_validation_failure_makes_no_transport_call() {
        let transport = Arc::new(FakeTransport::new(Ok(acme_questions())));
        let orchestrator = ready_orchestrator(transport.clone()).await;

        let request = GenerationRequest::Swot(SwotRequest {
            input_csv: Some(FileRef::path("acme.csv")),
            input_pdf: None,
            business_name: "Acme Corp".into(),
            credential: "sk-test".into(),
        });
        let err = orchestrator.submit(request).await.unwrap_err();

        assert_eq!(
            err,
            AppError::Validation {
                field: RequiredField::InputPdf
            }
        );
        assert_eq!(transport.calls(), 0);
        assert_eq!(
            orchestrator.snapshot(WorkflowKind::Swot).state,
            SessionState::Idle
        );
    }

    #[tokio::test]
    async fn test_not_ready_short_circuits_until_retry_succeeds() {
        let transport = Arc::new(
            FakeTransport::new(Ok(acme_questions()))
                .with_readiness(vec![Err(AppError::Transport("Ollama is not running".into()))]),
        );
        let orchestrator = Orchestrator::new(transport.clone(), Duration::ZERO);

        assert_eq!(orchestrator.readiness(), ReadinessStatus::Unchecked);
        let err = orchestrator.submit(questions_request()).await.unwrap_err();
        assert_eq!(err, AppError::NotReady);

        let status = orchestrator.check_readiness().await;
        assert!(
            matches!(status, ReadinessStatus::NotReady(ref msg) if msg.contains("not running"))
        );
        let err = orchestrator.submit(questions_request()).await.unwrap_err();
        assert_eq!(err, AppError::NotReady);
        assert_eq!(transport.calls(), 0);

        assert!(matches!(
            orchestrator.check_readiness().await,
            ReadinessStatus::Ready(_)
        ));
        tokio_test::assert_ok!(orchestrator.submit(questions_request()).await);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_readiness_is_sticky() {
        let transport = Arc::new(FakeTransport::new(Ok(acme_questions())).with_readiness(vec![
            Ok("ready".into()),
            Err(AppError::Transport("gone".into())),
        ]));
        let orchestrator = Orchestrator::new(transport, Duration::ZERO);
        orchestrator.check_readiness().await;
        orchestrator.check_readiness().await;

        assert!(matches!(
            orchestrator.readiness(),
            ReadinessStatus::NotReady(_)
        ));
        assert!(orchestrator.is_ready());
        tokio_test::assert_ok!(orchestrator.submit(questions_request()).await);
    }

    #[tokio::test]
    async fn test_busy_session_rejects_without_disturbing_job() {
        let gate = Arc::new(Notify::new());
        let transport =
            Arc::new(FakeTransport::new(Ok(acme_questions())).gated(gate.clone()));
        let orchestrator = ready_orchestrator(transport.clone()).await;
        let mut rx = orchestrator.subscribe(WorkflowKind::Questions);

        let first = tokio::spawn({
            let orchestrator = orchestrator.clone();
            async move { orchestrator.submit(questions_request()).await }
        });

        loop {
            let event = rx.recv().await.unwrap();
            if event.state.label == "Generating questions" {
                break;
            }
        }
        assert_eq!(
            orchestrator.snapshot(WorkflowKind::Questions).state,
            SessionState::AwaitingResult
        );

        let err = orchestrator.submit(questions_request()).await.unwrap_err();
        assert_eq!(err, AppError::SessionBusy(WorkflowKind::Questions));
        assert_eq!(
            orchestrator.snapshot(WorkflowKind::Questions).state,
            SessionState::AwaitingResult
        );

        // The other workflow has its own slot.
        let swot_err = orchestrator
            .submit(GenerationRequest::Swot(SwotRequest {
                input_csv: None,
                input_pdf: None,
                business_name: String::new(),
                credential: String::new(),
            }))
            .await
            .unwrap_err();
        assert_eq!(swot_err.kind(), "validation_error");

        gate.notify_one();
        let completion = first.await.unwrap().unwrap();
        assert_eq!(completion.result, acme_questions());
        assert_eq!(transport.calls(), 1);
        assert_eq!(
            orchestrator.snapshot(WorkflowKind::Questions).state,
            SessionState::Idle
        );
    }

    #[tokio::test]
    async fn test_settle_delay_holds_completed_state() {
        let transport = Arc::new(FakeTransport::new(Ok(acme_questions())));
        let orchestrator = Orchestrator::new(transport, Duration::from_millis(500));
        orchestrator.check_readiness().await;
        let mut rx = orchestrator.subscribe(WorkflowKind::Questions);

        let job = tokio::spawn({
            let orchestrator = orchestrator.clone();
            async move { orchestrator.submit(questions_request()).await }
        });

        loop {
            if rx.recv().await.unwrap().state.terminal {
                break;
            }
        }
        assert_eq!(
            orchestrator.snapshot(WorkflowKind::Questions).state,
            SessionState::Completed
        );
        assert_eq!(
            orchestrator.submit(questions_request()).await.unwrap_err(),
            AppError::SessionBusy(WorkflowKind::Questions)
        );

        tokio_test::assert_ok!(job.await.unwrap());
        assert_eq!(
            orchestrator.snapshot(WorkflowKind::Questions).state,
            SessionState::Idle
        );
    }

    #[tokio::test]
    async fn test_empty_question_list_completes_with_warning() {
        let empty = GenerationResult::Questions(QuestionsResult {
            business_name: "Acme Corp".into(),
            questions: vec![],
            question_count: 0,
            preview_count: 0,
            artifact: ArtifactRef::Remote { id: "e".into() },
        });
        let transport = Arc::new(FakeTransport::new(Ok(empty)));
        let orchestrator = ready_orchestrator(transport).await;

        let completion = orchestrator.submit(questions_request()).await.unwrap();
        assert_eq!(completion.warning, Some(AppError::EmptyResult));
        assert!(orchestrator.snapshot(WorkflowKind::Questions).progress.terminal);
    }

    #[tokio::test]
    async fn test_dropped_pending_job_releases_slot() {
        let transport = Arc::new(FakeTransport::new(Ok(acme_questions())));
        let orchestrator = ready_orchestrator(transport.clone()).await;

        let job = orchestrator.prepare(questions_request()).unwrap();
        assert_eq!(
            orchestrator.snapshot(WorkflowKind::Questions).state,
            SessionState::Submitting
        );
        drop(job);

        assert_eq!(
            orchestrator.snapshot(WorkflowKind::Questions).state,
            SessionState::Idle
        );
        assert_eq!(transport.calls(), 0);
        tokio_test::assert_ok!(orchestrator.submit(questions_request()).await);
    }

    #[tokio::test]
    async fn test_submit_dropped_mid_call_frees_slot() {
        let transport =
            Arc::new(FakeTransport::new(Ok(acme_questions())).slow(Duration::from_millis(200)));
        let orchestrator = ready_orchestrator(transport.clone()).await;

        let submit = orchestrator.submit(questions_request());
        let timed_out = tokio::time::timeout(Duration::from_millis(20), submit).await;
        assert!(timed_out.is_err());

        let snapshot = orchestrator.snapshot(WorkflowKind::Questions);
        assert_eq!(snapshot.state, SessionState::Idle);
        assert!(snapshot.progress.failed);
        assert!(matches!(
            snapshot.last_outcome,
            Some(Outcome::Failed {
                error: AppError::Transport(_)
            })
        ));

        let completion = orchestrator.submit(questions_request()).await.unwrap();
        assert_eq!(completion.result, acme_questions());
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_submit_dropped_during_settle_keeps_completion() {
        let transport = Arc::new(FakeTransport::new(Ok(acme_questions())));
        let orchestrator = Orchestrator::new(transport, Duration::from_millis(500));
        orchestrator.check_readiness().await;

        let submit = orchestrator.submit(questions_request());
        let timed_out = tokio::time::timeout(Duration::from_millis(50), submit).await;
        assert!(timed_out.is_err());

        let snapshot = orchestrator.snapshot(WorkflowKind::Questions);
        assert_eq!(snapshot.state, SessionState::Idle);
        assert!(matches!(snapshot.last_outcome, Some(Outcome::Completed(_))));
        assert!(orchestrator.last_completion(WorkflowKind::Questions).is_some());
    }

    #[tokio::test]
    async fn test_questions_round_trip_over_hosted_backend() {
        use crate::pipeline::download::{ArtifactDownloader, DownloadOutcome, OutputDirectory};
        use crate::transport::RemoteTransport;
        use crate::transport::remote::tests::{PDF_BYTES, spawn_backend};

        let (base, hits) = spawn_backend().await;
        let transport: SharedTransport = Arc::new(RemoteTransport::new(&base));
        let orchestrator = Orchestrator::new(transport.clone(), Duration::ZERO);
        assert!(matches!(
            orchestrator.check_readiness().await,
            ReadinessStatus::Ready(_)
        ));

        let request = GenerationRequest::Questions(QuestionsRequest {
            input_csv: Some(FileRef::blob("acme.csv", b"name\nAcme Corp\n".to_vec())),
            business_name: "Acme Corp".into(),
            credential: "sk-test".into(),
        });
        let completion = orchestrator.submit(request).await.unwrap();
        let GenerationResult::Questions(result) = &completion.result else {
            panic!("expected questions");
        };
        assert_eq!(result.question_count, 62);
        assert_eq!(result.preview().len(), 5);
        assert!(matches!(
            orchestrator.snapshot(WorkflowKind::Questions).last_outcome,
            Some(Outcome::Completed(_))
        ));

        let dir = tempfile::tempdir().unwrap();
        let downloader =
            ArtifactDownloader::new(transport, Arc::new(OutputDirectory::new(dir.path())));
        let mut saved = Vec::new();
        for name in ["first.pdf", "second.pdf"] {
            match downloader.download(&result.artifact, name).await.unwrap() {
                DownloadOutcome::Saved(file) => saved.push(std::fs::read(&file.path).unwrap()),
                DownloadOutcome::Cancelled => panic!("expected a saved file"),
            }
        }
        assert_eq!(saved[0], PDF_BYTES);
        assert_eq!(saved[0], saved[1]);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}
