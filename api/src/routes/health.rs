//! Liveness endpoint.
//!
//! Reports the service identity the process was configured with. Never
//! touches the metrics store or the exporters.

use crate::state::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `"healthy"` when the process answers.
    pub status: &'static str,
    /// Configured service name (`OTEL_SERVICE_NAME`).
    pub service: String,
    /// Configured service version (`OTEL_SERVICE_VERSION`).
    pub version: String,
}

/// Creates the health route.
pub fn health_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let settings = state.instrumentation().settings();
    Json(HealthResponse {
        status: "healthy",
        service: settings.source_name.clone(),
        version: settings.source_version.clone(),
    })
}
