//! `http.server.request.duration` for every request the router answers.

use crate::state::AppState;
use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use std::time::Instant;

/// Times the request and records it with method, route template and status.
///
/// Unmatched requests are recorded without `http.route`.
pub async fn record_request_duration(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned());

    let started = Instant::now();
    let response = next.run(request).await;

    state.instrumentation().request_duration().record(
        started.elapsed(),
        method.as_str(),
        route.as_deref(),
        response.status().as_u16(),
    );
    response
}
