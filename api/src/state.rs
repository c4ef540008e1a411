//! Application state module.
//!
//! Defines the shared application state that is passed to route handlers.

use shared::instrumentation::{Instrumentation, InstrumentationSettings};
use shared::metrics_proxy::{MetricsClient, DEFAULT_TIMEOUT};
use shared::weather::WeatherService;
use std::sync::Arc;

/// Application state shared across all request handlers.
///
/// Cloned per request; every field is a cheap handle onto shared data.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Span source and counter.
    instrumentation: Arc<Instrumentation>,
    /// Client for the remote metrics store.
    metrics_client: MetricsClient,
    /// Forecast generator.
    weather: WeatherService,
    /// Deployment environment, reported on test spans.
    environment: Arc<str>,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(
        instrumentation: Arc<Instrumentation>,
        metrics_client: MetricsClient,
        environment: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            instrumentation,
            metrics_client,
            weather: WeatherService,
            environment: environment.into(),
        }
    }

    /// Creates a state whose instruments export nothing, talking to the
    /// metrics store at `metrics_base_url`.
    ///
    /// This is useful for development and testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the instruments or the HTTP client cannot be built.
    pub fn with_disabled_telemetry(metrics_base_url: impl Into<String>) -> anyhow::Result<Self> {
        let instrumentation = Instrumentation::disabled(InstrumentationSettings::default())?;
        let metrics_client = MetricsClient::new(metrics_base_url, DEFAULT_TIMEOUT)?;
        Ok(Self::new(
            Arc::new(instrumentation),
            metrics_client,
            "test",
        ))
    }

    /// Returns the instrumentation.
    #[must_use]
    pub fn instrumentation(&self) -> &Instrumentation {
        self.instrumentation.as_ref()
    }

    /// Returns the metrics store client.
    #[must_use]
    pub fn metrics_client(&self) -> &MetricsClient {
        &self.metrics_client
    }

    /// Returns the forecast generator.
    #[must_use]
    pub fn weather(&self) -> &WeatherService {
        &self.weather
    }

    /// Returns the deployment environment.
    #[must_use]
    pub fn environment(&self) -> &str {
        &self.environment
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_with_disabled_telemetry() {
        let state = AppState::with_disabled_telemetry("http://localhost:9090").unwrap();

        assert_eq!(state.metrics_client().base_url(), "http://localhost:9090");
        assert_eq!(state.environment(), "test");
        assert_eq!(state.instrumentation().counter().value(), 0);
    }

    #[test]
    fn test_app_state_is_clone() {
        let state = AppState::with_disabled_telemetry("http://localhost:9090").unwrap();
        let state2 = state.clone();

        // Both share the same counter
        state.instrumentation().increment_counter(1);

        assert_eq!(state2.instrumentation().counter().value(), 1);
    }
}
