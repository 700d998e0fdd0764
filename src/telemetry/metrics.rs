use opentelemetry::{
    global,
    metrics::{Counter, Histogram, Meter},
};
use std::sync::LazyLock;

pub static METER: LazyLock<Meter> = LazyLock::new(|| global::meter("swot-orchestrator"));

// --- Workflow Metrics ---

pub static WORKFLOW_JOBS: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("workflow.jobs")
        .with_description("Generation jobs by workflow and outcome")
        .with_unit("{job}")
        .build()
});

pub static WORKFLOW_JOB_DURATION: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("workflow.job.duration")
        .with_description("Time from submission to terminal state in seconds")
        .with_unit("s")
        .build()
});

pub static SESSION_BUSY_REJECTIONS: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("workflow.session.busy_rejections")
        .with_description("Submissions rejected because the workflow slot was occupied")
        .with_unit("{request}")
        .build()
});

pub static READINESS_CHECKS: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("workflow.readiness.checks")
        .with_description("Readiness checks by result")
        .with_unit("{check}")
        .build()
});

pub static ARTIFACT_DOWNLOADS: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("artifact.downloads")
        .with_description("Artifact save attempts by outcome")
        .with_unit("{download}")
        .build()
});

// --- HTTP Metrics ---

pub static HTTP_REQUESTS_TOTAL: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("http.requests.total")
        .with_description("Total number of HTTP requests")
        .with_unit("{request}")
        .build()
});

pub static HTTP_REQUEST_DURATION: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("http.request.duration")
        .with_description("HTTP request duration in milliseconds")
        .with_unit("ms")
        .with_boundaries(vec![
            1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0,
        ])
        .build()
});
