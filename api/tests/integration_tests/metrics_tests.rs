//! Integration tests for the metrics query proxy.
//!
//! Tests cover:
//! - Raw pass-through of the store's body
//! - Parameter defaults and forwarding
//! - Validation failures
//! - Store failures surfacing as generic 500s
//! - Trace context on the outgoing request

use axum::http::StatusCode;
use opentelemetry::global;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use tracing_test::traced_test;

use super::common::{get, get_text, test_app, test_app_with_store, FakeStore};

const STORE_BODY: &str = r#"{"status":"success","data":{"resultType":"matrix","result":[{"metric":{"__name__":"up"},"values":[[1714564800,"1"]]}]}}"#;

#[tokio::test]
async fn test_query_returns_store_body_verbatim() {
    let store = FakeStore::new(StatusCode::OK, STORE_BODY);
    let (app, _state) = test_app_with_store(&store.spawn().await);

    let (status, content_type, body) = get_text(app, "/metrics/query?query=up").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, STORE_BODY);
    assert!(content_type.is_some_and(|ct| ct.contains("application/json")));
}

#[tokio::test]
async fn test_query_parameters_are_forwarded() {
    let store = FakeStore::new(StatusCode::OK, "{}");
    let (app, _state) = test_app_with_store(&store.spawn().await);

    let query = urlencoding::encode("rate(http_requests_total[5m])");
    let uri = format!(
        "/metrics/query?query={query}&start=2024-05-01T10:00:00Z&end=2024-05-01T11:00:00Z&step=30s"
    );
    let (status, _, _) = get_text(app, &uri).await;
    assert_eq!(status, StatusCode::OK);

    let seen = store.last_query().unwrap();
    assert_eq!(
        seen,
        "query=rate%28http_requests_total%5B5m%5D%29\
         &start=2024-05-01T10:00:00Z&end=2024-05-01T11:00:00Z&step=30s"
    );
}

#[tokio::test]
async fn test_query_defaults_step_and_range() {
    let store = FakeStore::new(StatusCode::OK, "{}");
    let (app, _state) = test_app_with_store(&store.spawn().await);

    let (status, _, _) = get_text(app, "/metrics/query?query=up").await;
    assert_eq!(status, StatusCode::OK);

    let seen = store.last_query().unwrap();
    assert!(seen.starts_with("query=up&start="));
    assert!(seen.contains("&end="));
    assert!(seen.ends_with("&step=1m"));
}

#[tokio::test]
async fn test_test_counter_queries_the_counter() {
    let store = FakeStore::new(StatusCode::OK, STORE_BODY);
    let (app, _state) = test_app_with_store(&store.spawn().await);

    let (status, _, body) = get_text(app, "/metrics/test-counter?step=5m").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, STORE_BODY);

    let seen = store.last_query().unwrap();
    assert!(seen.starts_with("query=test_counter_total&start="));
    assert!(seen.ends_with("&step=5m"));
}

#[tokio::test]
async fn test_store_request_carries_trace_context() {
    global::set_text_map_propagator(TraceContextPropagator::new());
    let store = FakeStore::new(StatusCode::OK, "{}");
    let (app, _state) = test_app_with_store(&store.spawn().await);

    let (status, _, _) = get_text(app, "/metrics/query?query=up").await;
    assert_eq!(status, StatusCode::OK);

    let traceparent = store.last_traceparent().unwrap();
    let parts: Vec<_> = traceparent.split('-').collect();
    assert_eq!(parts.len(), 4, "{traceparent}");
    assert_eq!(parts[0], "00");
    assert_eq!(parts[1].len(), 32);
    assert_ne!(parts[1], "0".repeat(32));
    assert_eq!(parts[2].len(), 16);
}

#[tokio::test]
async fn test_missing_query_is_a_bad_request() {
    let (app, _state) = test_app();

    let (status, response) = get(app, "/metrics/query").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "invalid_query");
}

#[tokio::test]
async fn test_invalid_timestamp_is_a_bad_request() {
    let (app, _state) = test_app();

    let (status, _) = get(app, "/metrics/query?query=up&end=not-a-date").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[traced_test]
async fn test_store_error_status_becomes_generic_500() {
    let store = FakeStore::new(StatusCode::SERVICE_UNAVAILABLE, "store overloaded");
    let (app, _state) = test_app_with_store(&store.spawn().await);

    let (status, _, body) = get_text(app, "/metrics/query?query=up").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "Error fetching metrics data");
    assert!(!body.contains("503"));

    logs_assert(|lines: &[&str]| {
        let errors: Vec<_> = lines
            .iter()
            .filter(|line| line.contains("ERROR") && line.contains("Error fetching metrics"))
            .collect();
        match errors.as_slice() {
            [line] if line.contains("503") && line.contains("store overloaded") => Ok(()),
            [line] => Err(format!("error entry lacks the store status: {line}")),
            other => Err(format!("expected one error entry, got {}", other.len())),
        }
    });
}

#[tokio::test]
async fn test_malformed_store_body_becomes_generic_500() {
    let store = FakeStore::new(StatusCode::OK, "not json");
    let (app, _state) = test_app_with_store(&store.spawn().await);

    let (status, _, body) = get_text(app, "/metrics/query?query=up").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "Error fetching metrics data");
}

#[tokio::test]
#[traced_test]
async fn test_unreachable_store_logs_one_error_with_cause() {
    let (app, _state) = test_app();

    let (status, _, body) = get_text(app, "/metrics/query?query=up").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "Error fetching metrics data");
    assert!(!body.contains("unreachable"));

    logs_assert(|lines: &[&str]| {
        let errors: Vec<_> = lines
            .iter()
            .filter(|line| line.contains("ERROR") && line.contains("Error fetching metrics"))
            .collect();
        match errors.as_slice() {
            [line]
                if line.contains("Metrics store unreachable")
                    && line.to_lowercase().contains("connection refused") =>
            {
                Ok(())
            }
            [line] => Err(format!("error entry lacks the root cause: {line}")),
            other => Err(format!("expected one error entry, got {}", other.len())),
        }
    });
}
