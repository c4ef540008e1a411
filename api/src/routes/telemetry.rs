//! Synthetic telemetry generators.
//!
//! Each endpoint exercises one signal so a collector pipeline can be checked
//! end to end.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, routing::get, Router};
use chrono::{SecondsFormat, Utc};
use shared::models::SpanKind;
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// Creates the telemetry test routes.
pub fn telemetry_routes(state: AppState) -> Router {
    Router::new()
        .route("/telemetry/test/trace", get(test_trace))
        .route("/telemetry/test/metric", get(test_metric))
        .route("/telemetry/test/log", get(test_log))
        .route("/telemetry/test/exception", get(test_exception))
        .with_state(state)
}

/// Emits a `TestOperation` span under the request span.
async fn test_trace(State(state): State<AppState>) -> &'static str {
    let parent = tracing::Span::current().context();

    let mut span = state.instrumentation().start_span(
        "TestOperation",
        SpanKind::Internal,
        Some(&parent),
    );
    span.set_tag("test.tag", "test value");
    span.set_tag(
        "test.timestamp",
        Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
    );
    span.set_tag("test.environment", state.environment());
    span.set_tag("test.method", "GET");
    span.set_tag("test.endpoint", "/telemetry/test/trace");

    tracing::info!(
        trace_id = %span.span_context().trace_id(),
        span_id = %span.span_context().span_id(),
        "Test trace operation executed"
    );
    "Trace test completed"
}

/// Adds one to the test counter.
async fn test_metric(State(state): State<AppState>) -> &'static str {
    let counter = state.instrumentation().counter();
    counter.add(1);

    tracing::info!(
        counter = counter.name(),
        total = counter.value(),
        "Incremented test counter"
    );
    "Metric test completed"
}

/// Logs once at each of info, warn and error.
async fn test_log() -> &'static str {
    tracing::info!(test = "log", "This is a test log message");
    tracing::warn!(test = "log", "This is a test warning message");
    tracing::error!(test = "log", "This is a test error message");
    "Log test completed"
}

/// Fails on purpose, logs the failure with its causes and answers 500.
async fn test_exception(State(state): State<AppState>) -> (StatusCode, &'static str) {
    if let Err(err) = raise_test_exception() {
        let mut span = state
            .instrumentation()
            .start_span("TestException", SpanKind::Internal, None);
        span.record_error(&*err);

        tracing::error!(
            error = %format!("{err:#}"),
            "An error occurred during the exception test"
        );
    }
    (StatusCode::INTERNAL_SERVER_ERROR, "Exception test completed")
}

fn raise_test_exception() -> anyhow::Result<()> {
    let cause = std::io::Error::other("simulated downstream failure");
    Err(anyhow::Error::new(cause).context("This is a test exception"))
}
