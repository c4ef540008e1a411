//! HTTP client for the remote metrics store.
//!
//! Every request runs inside a Client span and carries the W3C `traceparent`
//! of that span, produced by the global text map propagator.

use super::error::MetricsFetchError;
use super::query::RangeQuery;
use crate::instrumentation::{Instrumentation, ScopedSpan};
use crate::models::SpanKind;
use opentelemetry::global;
use opentelemetry::propagation::Injector;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::IgnoredAny;
use std::time::Duration;

/// Default timeout for a range query.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Read-through proxy to a Prometheus-compatible range-query API.
///
/// Cloning is cheap: the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct MetricsClient {
    http: reqwest::Client,
    base_url: String,
}

impl MetricsClient {
    /// Creates a client for the store at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsFetchError::Request`] if the HTTP client cannot be
    /// built (e.g. TLS backend initialisation failure).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, MetricsFetchError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| MetricsFetchError::Request { source })?;

        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    /// The store's base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The URL a query would be sent to.
    #[must_use]
    pub fn query_url(&self, query: &RangeQuery) -> String {
        query.url(&self.base_url)
    }

    /// Runs a range query and returns the response body unparsed.
    ///
    /// The body is checked to be well-formed JSON but otherwise passed
    /// through untouched. The request is traced as a Client span from
    /// `instrumentation`, parented to the current context.
    ///
    /// # Errors
    ///
    /// Returns a [`MetricsFetchError`] if the store is unreachable, times
    /// out, answers with a non-success status, or returns a body that is not
    /// JSON. Nothing is retried.
    pub async fn query_range(
        &self,
        instrumentation: &Instrumentation,
        query: &RangeQuery,
    ) -> Result<String, MetricsFetchError> {
        let url = self.query_url(query);
        tracing::info!(%url, "Fetching metrics from remote store");

        let mut span = instrumentation.start_span("GET", SpanKind::Client, None);
        span.set_tag("http.request.method", "GET");
        span.set_tag("url.full", url.as_str());

        let result = self.send(&url, &mut span).await;
        if let Err(err) = &result {
            span.record_error(err);
        }
        result
    }

    async fn send(&self, url: &str, span: &mut ScopedSpan) -> Result<String, MetricsFetchError> {
        let mut headers = HeaderMap::new();
        global::get_text_map_propagator(|propagator| {
            propagator.inject_context(&span.context(), &mut HeaderInjector(&mut headers));
        });

        let response = self
            .http
            .get(url)
            .headers(headers)
            .send()
            .await
            .map_err(MetricsFetchError::from_transport)?;

        let status = response.status();
        span.set_tag("http.response.status_code", u32::from(status.as_u16()));

        let body = response
            .text()
            .await
            .map_err(MetricsFetchError::from_transport)?;

        if !status.is_success() {
            return Err(MetricsFetchError::Status { status, body });
        }

        serde_json::from_str::<IgnoredAny>(&body)
            .map_err(|source| MetricsFetchError::MalformedBody { source })?;

        tracing::debug!(%status, bytes = body.len(), "Metrics store responded");
        Ok(body)
    }
}

/// Writes propagation fields into outgoing request headers.
struct HeaderInjector<'a>(&'a mut HeaderMap);

impl Injector for HeaderInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            self.0.insert(name, value);
        }
    }
}
