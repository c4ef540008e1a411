//! Common test utilities and helpers for integration tests.
//!
//! This module provides shared functionality used across all integration tests,
//! including test app setup, a fake metrics store and HTTP request helpers.

use api::{create_router, AppState};
use axum::body::Body;
use axum::extract::{RawQuery, State};
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::routing::get as get_route;
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

/// Base URL nothing listens on.
pub const UNREACHABLE_STORE: &str = "http://127.0.0.1:9";

/// Creates a test router whose metrics store is unreachable.
///
/// # Returns
///
/// A tuple containing the configured router and the app state.
pub fn test_app() -> (Router, AppState) {
    test_app_with_store(UNREACHABLE_STORE)
}

/// Creates a test router talking to the metrics store at `base_url`.
pub fn test_app_with_store(base_url: &str) -> (Router, AppState) {
    let state = AppState::with_disabled_telemetry(base_url).unwrap();
    let router = create_router(state.clone());
    (router, state)
}

/// A Prometheus-compatible store answering every range query the same way.
#[derive(Clone)]
pub struct FakeStore {
    status: StatusCode,
    body: &'static str,
    last_query: Arc<Mutex<Option<String>>>,
    last_traceparent: Arc<Mutex<Option<String>>>,
}

impl FakeStore {
    /// A store answering `status` with `body`.
    pub fn new(status: StatusCode, body: &'static str) -> Self {
        Self {
            status,
            body,
            last_query: Arc::new(Mutex::new(None)),
            last_traceparent: Arc::new(Mutex::new(None)),
        }
    }

    /// The raw query string of the last request.
    pub fn last_query(&self) -> Option<String> {
        self.last_query.lock().unwrap().clone()
    }

    /// The `traceparent` header of the last request.
    pub fn last_traceparent(&self) -> Option<String> {
        self.last_traceparent.lock().unwrap().clone()
    }

    /// Binds to a free local port and returns the base URL.
    pub async fn spawn(&self) -> String {
        async fn handler(
            State(store): State<FakeStore>,
            headers: HeaderMap,
            RawQuery(query): RawQuery,
        ) -> (StatusCode, [(header::HeaderName, &'static str); 1], &'static str) {
            *store.last_query.lock().unwrap() = query;
            *store.last_traceparent.lock().unwrap() = headers
                .get("traceparent")
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string);
            (
                store.status,
                [(header::CONTENT_TYPE, "application/json")],
                store.body,
            )
        }

        let app = Router::new()
            .route("/prometheus/api/v1/query_range", get_route(handler))
            .with_state(self.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }
}

/// Helper to make a GET request and read the body as text.
///
/// # Returns
///
/// A tuple containing the response status code, content type and body.
pub async fn get_text(app: Router, uri: &str) -> (StatusCode, Option<String>, String) {
    let response = tower::ServiceExt::oneshot(
        app,
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap();

    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string);
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();

    (status, content_type, String::from_utf8(body_bytes.to_vec()).unwrap())
}

/// Helper to make a GET request.
///
/// # Arguments
///
/// * `app` - The Axum router to send the request to
/// * `uri` - The URI path to GET from
///
/// # Returns
///
/// A tuple containing the response status code and parsed JSON response body.
pub async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let (status, _, body) = get_text(app, uri).await;
    let json: Value = serde_json::from_str(&body).unwrap_or(Value::Null);

    (status, json)
}
