//! Integration tests for the synthetic telemetry endpoints.

use axum::http::StatusCode;

use super::common::{get_text, test_app};

#[tokio::test]
async fn test_trace_endpoint() {
    let (app, _state) = test_app();

    let (status, _, body) = get_text(app, "/telemetry/test/trace").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Trace test completed");
}

#[tokio::test]
async fn test_concurrent_metric_requests_are_all_counted() {
    let (app, state) = test_app();

    let (a, b, c) = tokio::join!(
        get_text(app.clone(), "/telemetry/test/metric"),
        get_text(app.clone(), "/telemetry/test/metric"),
        get_text(app, "/telemetry/test/metric"),
    );

    for (status, _, body) in [a, b, c] {
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Metric test completed");
    }
    assert_eq!(state.instrumentation().counter().value(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_metric_requests_on_separate_tasks() {
    let (app, state) = test_app();

    let handles: Vec<_> = (0..16)
        .map(|_| tokio::spawn(get_text(app.clone(), "/telemetry/test/metric")))
        .collect();
    for handle in handles {
        let (status, _, _) = handle.await.unwrap();
        assert_eq!(status, StatusCode::OK);
    }

    assert_eq!(state.instrumentation().counter().value(), 16);
}

#[tokio::test]
async fn test_log_endpoint() {
    let (app, _state) = test_app();

    let (status, _, body) = get_text(app, "/telemetry/test/log").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Log test completed");
}

#[tokio::test]
async fn test_exception_endpoint_returns_500_without_details() {
    let (app, _state) = test_app();

    let (status, _, body) = get_text(app, "/telemetry/test/exception").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "Exception test completed");
    assert!(!body.contains("simulated downstream failure"));
}

#[tokio::test]
async fn test_every_request_records_its_duration() {
    let (app, state) = test_app();

    let (a, b, c) = tokio::join!(
        get_text(app.clone(), "/telemetry/test/trace"),
        get_text(app.clone(), "/telemetry/test/exception"),
        get_text(app, "/health"),
    );

    assert_eq!(a.0, StatusCode::OK);
    assert_eq!(b.0, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(c.0, StatusCode::OK);
    assert_eq!(state.instrumentation().request_duration().count(), 3);
}
