//! Metrics query endpoints.
//!
//! Read-through proxy to the remote metrics store. Successful responses carry
//! the store's JSON body unchanged.

use crate::state::AppState;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::metrics_proxy::RangeQuery;
use validator::Validate;

/// Body returned when a metrics query cannot be fetched.
const QUERY_FAILURE_BODY: &str = "Error fetching metrics data";

/// Body returned when the test counter cannot be fetched.
const TEST_COUNTER_FAILURE_BODY: &str = "Error fetching test counter data";

/// Query parameters for `/metrics/query`.
#[derive(Debug, Deserialize)]
pub struct MetricQueryParams {
    /// Query expression, forwarded verbatim.
    pub query: Option<String>,
    /// Start of the range, RFC 3339. Defaults to one hour ago.
    pub start: Option<DateTime<Utc>>,
    /// End of the range, RFC 3339. Defaults to now.
    pub end: Option<DateTime<Utc>>,
    /// Resolution step. Defaults to `1m`.
    pub step: Option<String>,
}

/// Query parameters for `/metrics/test-counter`.
#[derive(Debug, Deserialize)]
pub struct RangeParams {
    /// Start of the range, RFC 3339. Defaults to one hour ago.
    pub start: Option<DateTime<Utc>>,
    /// End of the range, RFC 3339. Defaults to now.
    pub end: Option<DateTime<Utc>>,
    /// Resolution step. Defaults to `1m`.
    pub step: Option<String>,
}

/// Error response for rejected queries.
#[derive(Debug, Serialize, Deserialize)]
pub struct MetricError {
    /// Machine readable error kind.
    pub error: String,
    /// Human readable description.
    pub message: String,
}

/// Creates the metrics query routes.
pub fn metrics_routes(state: AppState) -> Router {
    Router::new()
        .route("/metrics/query", get(query_metrics))
        .route("/metrics/test-counter", get(query_test_counter))
        .with_state(state)
}

async fn query_metrics(
    State(state): State<AppState>,
    Query(params): Query<MetricQueryParams>,
) -> Response {
    let query = RangeQuery::resolve_now(
        params.query.unwrap_or_default(),
        params.start,
        params.end,
        params.step,
    );

    if let Err(errors) = query.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(MetricError {
                error: "invalid_query".to_string(),
                message: errors.to_string(),
            }),
        )
            .into_response();
    }

    fetch(&state, &query, QUERY_FAILURE_BODY).await
}

async fn query_test_counter(
    State(state): State<AppState>,
    Query(params): Query<RangeParams>,
) -> Response {
    let query = RangeQuery::resolve_now(
        state.instrumentation().counter().name(),
        params.start,
        params.end,
        params.step,
    );

    fetch(&state, &query, TEST_COUNTER_FAILURE_BODY).await
}

/// Runs the query and maps the outcome to a response.
///
/// Failures are logged here, once, with every cause in the chain. The caller
/// only sees `failure_body`.
async fn fetch(state: &AppState, query: &RangeQuery, failure_body: &'static str) -> Response {
    match state
        .metrics_client()
        .query_range(state.instrumentation(), query)
        .await
    {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response(),
        Err(err) => {
            tracing::error!(
                error = %err.chain(),
                kind = err.kind(),
                query = %query.query,
                "Error fetching metrics"
            );
            (StatusCode::INTERNAL_SERVER_ERROR, failure_body).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    /// Nothing listens on the discard port, so any fetch fails fast.
    fn create_test_router() -> Router {
        metrics_routes(AppState::with_disabled_telemetry("http://127.0.0.1:9").unwrap())
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_missing_query_is_rejected() {
        let (status, body) = get(create_test_router(), "/metrics/query").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error: MetricError = serde_json::from_str(&body).unwrap();
        assert_eq!(error.error, "invalid_query");
    }

    #[tokio::test]
    async fn test_empty_query_is_rejected() {
        let (status, _) = get(create_test_router(), "/metrics/query?query=").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unparsable_timestamp_is_rejected() {
        let (status, _) = get(
            create_test_router(),
            "/metrics/query?query=up&start=yesterday",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unreachable_store_returns_generic_500() {
        let (status, body) = get(create_test_router(), "/metrics/query?query=up").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "Error fetching metrics data");
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn test_fetch_failure_logs_transport_cause() {
        let (status, _) = get(create_test_router(), "/metrics/query?query=up").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        logs_assert(|lines: &[&str]| {
            lines
                .iter()
                .find(|line| line.contains("Error fetching metrics"))
                .filter(|line| line.contains("kind=\"unreachable\""))
                .filter(|line| line.to_lowercase().contains("refused"))
                .map(|_| ())
                .ok_or_else(|| "no error entry naming the refused connection".to_string())
        });
    }

    #[tokio::test]
    async fn test_test_counter_failure_body() {
        let (status, body) = get(create_test_router(), "/metrics/test-counter").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "Error fetching test counter data");
    }
}
