//! Integration tests for health check and general API functionality.

use axum::http::StatusCode;

use super::common::{get, test_app};

#[tokio::test]
async fn test_health_check() {
    let (app, _state) = test_app();

    let (status, response) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["status"], "healthy");
    assert_eq!(response["service"], "otel-demo-api");
    assert_eq!(response["version"], "1.0.0");
}

#[tokio::test]
async fn test_health_does_not_touch_the_metrics_store() {
    // The store is unreachable; health must not depend on it.
    let (app, _state) = test_app();

    let (status, _) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
}
