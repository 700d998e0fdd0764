use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{Request, Response};
use opentelemetry::KeyValue;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{MakeSpan, OnResponse, TraceLayer},
};
use tracing::Span;

use swot_orchestrator::config::{Config, DeploymentTarget};
use swot_orchestrator::pipeline::{
    ArtifactDownloader, OutputDirectory, Orchestrator, ReadinessStatus,
};
use swot_orchestrator::telemetry::{HTTP_REQUEST_DURATION, HTTP_REQUESTS_TOTAL, init_telemetry};
use swot_orchestrator::transport::engine::ProcessEngine;
use swot_orchestrator::transport::{LocalTransport, RemoteTransport, SharedTransport};
use swot_orchestrator::{AppState, routes};

const X_REQUEST_ID: &str = "x-request-id";

#[derive(Clone)]
struct HttpMakeSpan;

impl<B> MakeSpan<B> for HttpMakeSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        let method = request.method().as_str();
        let path = request.uri().path();

        let request_id = request
            .headers()
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        tracing::info_span!(
            "HTTP request",
            otel.name = %format!("{} {}", method, path),
            http.method = %method,
            http.route = %path,
            http.target = %request.uri(),
            http.scheme = "http",
            http.flavor = ?request.version(),
            http.user_agent = request.headers()
                .get("user-agent")
                .and_then(|v| v.to_str().ok())
                .unwrap_or(""),
            http.request_id = %request_id,
            http.response.status_code = tracing::field::Empty,
            otel.status_code = tracing::field::Empty,
        )
    }
}

#[derive(Clone)]
struct HttpOnResponse;

impl<B> OnResponse<B> for HttpOnResponse {
    fn on_response(self, response: &Response<B>, latency: Duration, span: &Span) {
        let status = response.status().as_u16();

        span.record("http.response.status_code", status as i64);
        span.record("otel.status_code", if status >= 500 { "ERROR" } else { "OK" });

        let latency_ms = latency.as_secs_f64() * 1000.0;
        let attrs = [
            KeyValue::new("http.status_code", status.to_string()),
            KeyValue::new("http.status_class", format!("{}xx", status / 100)),
        ];

        HTTP_REQUESTS_TOTAL.add(1, &attrs);
        HTTP_REQUEST_DURATION.record(latency_ms, &attrs);

        tracing::info!(
            http.response.status_code = status,
            latency_ms = latency_ms,
            "finished processing request"
        );
    }
}

fn build_transport(config: &Config) -> SharedTransport {
    match config.deployment_target {
        DeploymentTarget::Hosted => Arc::new(RemoteTransport::new(&config.backend_url)),
        DeploymentTarget::Local => {
            let engine = ProcessEngine::new(
                &config.engine_command,
                &config.readiness_command,
                &config.required_model,
            );
            Arc::new(LocalTransport::new(Arc::new(engine)))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    let telemetry_guard = init_telemetry(&config)?;

    tracing::info!(
        port = config.port,
        environment = %config.environment,
        deployment_target = %config.deployment_target,
        "Starting swot-orchestrator"
    );

    let transport = build_transport(&config);
    let orchestrator = Orchestrator::new(transport.clone(), config.settle_delay);
    let downloader =
        ArtifactDownloader::new(transport, Arc::new(OutputDirectory::new(&config.output_dir)));

    // Workflows stay locked until a check succeeds; a failure here is retried
    // through the readiness route.
    if let ReadinessStatus::NotReady(message) = orchestrator.check_readiness().await {
        tracing::warn!(%message, "Backend not ready at startup, workflows locked");
    }

    let state = AppState {
        config: config.clone(),
        orchestrator,
        downloader,
    };

    let app = routes::create_router(state)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(HttpMakeSpan)
                .on_response(HttpOnResponse),
        )
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(%addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    telemetry_guard.shutdown();

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
