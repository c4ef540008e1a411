//! Span emitter and counter shared by every request handler.

use super::names::{validate_instrument_name, validate_source_name, InstrumentationError};
use crate::models::{Scalar, SpanKind};
use opentelemetry::metrics::{Histogram, MeterProvider as _};
use opentelemetry::trace::{
    Span as _, SpanContext, Status, TraceContextExt as _, Tracer as _, TracerProvider as _,
};
use opentelemetry::{Context, InstrumentationScope, KeyValue};
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::{SdkTracer, SdkTracerProvider, Span};
use std::borrow::Cow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Name of the demo counter.
pub const TEST_COUNTER_NAME: &str = "test_counter_total";

/// Description of the demo counter.
pub const TEST_COUNTER_DESCRIPTION: &str = "Test counter for OpenTelemetry demo";

/// Name of the server request duration histogram.
pub const REQUEST_DURATION_NAME: &str = "http.server.request.duration";

/// Bucket boundaries for [`REQUEST_DURATION_NAME`], in seconds.
pub const REQUEST_DURATION_BOUNDARIES: [f64; 14] = [
    0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0, 7.5, 10.0,
];

/// Names used when creating the instruments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentationSettings {
    /// Name of the span source and meter.
    pub source_name: String,
    /// Version reported on the instrumentation scope.
    pub source_version: String,
    /// Name of the counter instrument.
    pub counter_name: String,
    /// Optional description of the counter instrument.
    pub counter_description: Option<String>,
}

impl InstrumentationSettings {
    /// Settings for `source_name` with the demo counter.
    pub fn new(source_name: impl Into<String>, source_version: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            source_version: source_version.into(),
            counter_name: TEST_COUNTER_NAME.to_string(),
            counter_description: Some(TEST_COUNTER_DESCRIPTION.to_string()),
        }
    }
}

impl Default for InstrumentationSettings {
    fn default() -> Self {
        Self::new("otel-demo-api", "1.0.0")
    }
}

/// A monotonically increasing counter.
///
/// Every increment goes to the SDK instrument (exported asynchronously) and
/// to a process-local atomic tally readable with [`Counter::value`].
pub struct Counter {
    name: String,
    instrument: opentelemetry::metrics::Counter<u64>,
    total: AtomicU64,
}

impl std::fmt::Debug for Counter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Counter")
            .field("name", &self.name)
            .field("total", &self.value())
            .finish_non_exhaustive()
    }
}

impl Counter {
    /// Adds `delta`. Safe to call concurrently; never fails.
    pub fn add(&self, delta: u64) {
        self.instrument.add(delta, &[]);
        self.total.fetch_add(delta, Ordering::Relaxed);
    }

    /// Sum of all increments made through this process.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// The instrument name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Duration of handled HTTP requests, in seconds.
pub struct RequestDuration {
    instrument: Histogram<f64>,
    recorded: AtomicU64,
}

impl std::fmt::Debug for RequestDuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestDuration")
            .field("recorded", &self.count())
            .finish_non_exhaustive()
    }
}

impl RequestDuration {
    /// Records one request. `route` is the matched route template, if any.
    pub fn record(&self, elapsed: Duration, method: &str, route: Option<&str>, status: u16) {
        let mut attributes = vec![
            KeyValue::new("http.request.method", method.to_string()),
            KeyValue::new("http.response.status_code", i64::from(status)),
        ];
        if let Some(route) = route {
            attributes.push(KeyValue::new("http.route", route.to_string()));
        }

        self.instrument.record(elapsed.as_secs_f64(), &attributes);
        self.recorded.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of requests recorded by this process.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.recorded.load(Ordering::Relaxed)
    }
}

/// Process-wide instrumentation handles.
///
/// Construct once at startup and pass by reference (typically inside an
/// `Arc`) to whatever needs to emit spans or count.
///
/// # Example
///
/// ```
/// use shared::instrumentation::{Instrumentation, InstrumentationSettings};
/// use shared::models::SpanKind;
///
/// let instrumentation = Instrumentation::disabled(InstrumentationSettings::default()).unwrap();
///
/// {
///     let mut span = instrumentation.start_span("TestOperation", SpanKind::Internal, None);
///     span.set_tag("test.tag", "test value");
/// } // span ends here
///
/// instrumentation.increment_counter(1);
/// assert_eq!(instrumentation.counter().value(), 1);
/// ```
pub struct Instrumentation {
    settings: InstrumentationSettings,
    tracer: SdkTracer,
    counter: Counter,
    request_duration: RequestDuration,
    // Held so the providers outlive the handles created from them.
    _tracer_provider: SdkTracerProvider,
    _meter_provider: SdkMeterProvider,
}

impl std::fmt::Debug for Instrumentation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instrumentation")
            .field("settings", &self.settings)
            .field("counter", &self.counter)
            .finish_non_exhaustive()
    }
}

impl Instrumentation {
    /// Creates the span source and counter from the given providers.
    ///
    /// # Errors
    ///
    /// Returns an [`InstrumentationError`] if the source or counter name is
    /// invalid.
    pub fn new(
        tracer_provider: &SdkTracerProvider,
        meter_provider: &SdkMeterProvider,
        settings: InstrumentationSettings,
    ) -> Result<Self, InstrumentationError> {
        validate_source_name(&settings.source_name)?;
        validate_instrument_name(&settings.counter_name)?;

        let scope = InstrumentationScope::builder(settings.source_name.clone())
            .with_version(settings.source_version.clone())
            .build();

        let tracer = tracer_provider.tracer_with_scope(scope.clone());
        let meter = meter_provider.meter_with_scope(scope);

        let builder = meter.u64_counter(settings.counter_name.clone());
        let instrument = match settings.counter_description.clone() {
            Some(description) => builder.with_description(description).build(),
            None => builder.build(),
        };

        let request_duration = meter
            .f64_histogram(REQUEST_DURATION_NAME)
            .with_unit("s")
            .with_description("Duration of HTTP server requests")
            .with_boundaries(REQUEST_DURATION_BOUNDARIES.to_vec())
            .build();

        tracing::debug!(
            source = %settings.source_name,
            counter = %settings.counter_name,
            "Instrumentation created"
        );

        Ok(Self {
            counter: Counter {
                name: settings.counter_name.clone(),
                instrument,
                total: AtomicU64::new(0),
            },
            request_duration: RequestDuration {
                instrument: request_duration,
                recorded: AtomicU64::new(0),
            },
            settings,
            tracer,
            _tracer_provider: tracer_provider.clone(),
            _meter_provider: meter_provider.clone(),
        })
    }

    /// Creates instruments backed by providers without exporters.
    ///
    /// Everything works; nothing leaves the process.
    ///
    /// # Errors
    ///
    /// Returns an [`InstrumentationError`] if a name is invalid.
    pub fn disabled(settings: InstrumentationSettings) -> Result<Self, InstrumentationError> {
        let tracer_provider = SdkTracerProvider::builder().build();
        let meter_provider = SdkMeterProvider::builder().build();
        Self::new(&tracer_provider, &meter_provider, settings)
    }

    /// The settings the instruments were created with.
    #[must_use]
    pub fn settings(&self) -> &InstrumentationSettings {
        &self.settings
    }

    /// Starts a span. It ends when the returned [`ScopedSpan`] is dropped.
    ///
    /// With `parent` set to `None` the span is parented to the current
    /// OpenTelemetry context.
    pub fn start_span(
        &self,
        name: impl Into<Cow<'static, str>>,
        kind: SpanKind,
        parent: Option<&Context>,
    ) -> ScopedSpan {
        let builder = self.tracer.span_builder(name).with_kind(kind.into());
        let span = match parent {
            Some(cx) => builder.start_with_context(&self.tracer, cx),
            None => builder.start_with_context(&self.tracer, &Context::current()),
        };
        ScopedSpan { span }
    }

    /// The shared counter.
    #[must_use]
    pub fn counter(&self) -> &Counter {
        &self.counter
    }

    /// Adds `delta` to the shared counter.
    pub fn increment_counter(&self, delta: u64) {
        self.counter.add(delta);
    }

    /// The server request duration histogram.
    #[must_use]
    pub fn request_duration(&self) -> &RequestDuration {
        &self.request_duration
    }
}

/// A span that ends when dropped.
pub struct ScopedSpan {
    span: Span,
}

impl std::fmt::Debug for ScopedSpan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedSpan")
            .field("span_context", self.span.span_context())
            .finish()
    }
}

impl ScopedSpan {
    /// Sets a tag. A no-op when the span is not recording.
    pub fn set_tag(&mut self, key: impl Into<opentelemetry::Key>, value: impl Into<Scalar>) {
        let value: opentelemetry::Value = value.into().into();
        self.span.set_attribute(KeyValue::new(key, value));
    }

    /// Records `err` on the span and marks it failed.
    pub fn record_error(&mut self, err: &dyn std::error::Error) {
        self.span.record_error(err);
        self.span.set_status(Status::error(err.to_string()));
    }

    /// Identity of the span, for correlation.
    #[must_use]
    pub fn span_context(&self) -> &SpanContext {
        self.span.span_context()
    }

    /// A context whose active span is this one, for injecting into outgoing
    /// requests.
    #[must_use]
    pub fn context(&self) -> Context {
        Context::current().with_remote_span_context(self.span.span_context().clone())
    }

    /// Returns true if the span will be exported.
    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.span.is_recording()
    }
}

impl Drop for ScopedSpan {
    fn drop(&mut self) {
        self.span.end();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::trace::{SpanKind as OtelKind, TraceContextExt};
    use opentelemetry::Value;
    use opentelemetry_sdk::trace::InMemorySpanExporter;
    use std::sync::Arc;

    fn recording_instrumentation() -> (Instrumentation, InMemorySpanExporter) {
        let exporter = InMemorySpanExporter::default();
        let tracer_provider = SdkTracerProvider::builder()
            .with_simple_exporter(exporter.clone())
            .build();
        let meter_provider = SdkMeterProvider::builder().build();
        let instrumentation = Instrumentation::new(
            &tracer_provider,
            &meter_provider,
            InstrumentationSettings::default(),
        )
        .unwrap();
        (instrumentation, exporter)
    }

    fn attribute(span: &opentelemetry_sdk::trace::SpanData, key: &str) -> Option<Value> {
        span.attributes
            .iter()
            .find(|kv| kv.key.as_str() == key)
            .map(|kv| kv.value.clone())
    }

    #[test]
    fn test_span_is_exported_with_tags_when_scope_ends() {
        let (instrumentation, exporter) = recording_instrumentation();

        {
            let mut span = instrumentation.start_span("TestOperation", SpanKind::Internal, None);
            span.set_tag("test.tag", "test value");
            span.set_tag("forecast.days", 5);
            assert!(exporter.get_finished_spans().unwrap().is_empty());
        }

        let spans = exporter.get_finished_spans().unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].name, "TestOperation");
        assert_eq!(spans[0].span_kind, OtelKind::Internal);
        assert_eq!(attribute(&spans[0], "test.tag"), Some(Value::from("test value")));
        assert_eq!(attribute(&spans[0], "forecast.days"), Some(Value::I64(5)));
    }

    #[test]
    fn test_span_ends_on_error_path() {
        fn failing(instrumentation: &Instrumentation) -> Result<(), std::io::Error> {
            let mut span = instrumentation.start_span("Failing", SpanKind::Client, None);
            let err = std::io::Error::other("boom");
            span.record_error(&err);
            Err(err)
        }

        let (instrumentation, exporter) = recording_instrumentation();
        assert!(failing(&instrumentation).is_err());

        let spans = exporter.get_finished_spans().unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].span_kind, OtelKind::Client);
        assert!(matches!(spans[0].status, Status::Error { .. }));
    }

    #[test]
    fn test_span_uses_explicit_parent() {
        let (instrumentation, exporter) = recording_instrumentation();

        let parent = instrumentation.start_span("Parent", SpanKind::Server, None);
        let parent_cx = Context::new().with_remote_span_context(parent.span_context().clone());
        drop(instrumentation.start_span("Child", SpanKind::Internal, Some(&parent_cx)));
        let parent_id = parent.span_context().span_id();
        drop(parent);

        let spans = exporter.get_finished_spans().unwrap();
        let child = spans.iter().find(|s| s.name == "Child").unwrap();
        assert_eq!(child.parent_span_id, parent_id);
        assert_eq!(
            child.span_context.trace_id(),
            spans.iter().find(|s| s.name == "Parent").unwrap().span_context.trace_id()
        );
    }

    #[test]
    fn test_span_context_carries_the_span() {
        let (instrumentation, _exporter) = recording_instrumentation();

        let span = instrumentation.start_span("Outgoing", SpanKind::Client, None);
        let cx = span.context();

        assert_eq!(cx.span().span_context(), span.span_context());
        assert!(cx.has_active_span());
    }

    #[test]
    fn test_request_duration_counts_recordings() {
        let instrumentation = Instrumentation::disabled(InstrumentationSettings::default()).unwrap();
        let durations = instrumentation.request_duration();

        durations.record(Duration::from_millis(12), "GET", Some("/health"), 200);
        durations.record(Duration::from_millis(3), "GET", None, 404);

        assert_eq!(durations.count(), 2);
    }

    #[test]
    fn test_disabled_instrumentation_accepts_everything() {
        let instrumentation = Instrumentation::disabled(InstrumentationSettings::default()).unwrap();

        let mut span = instrumentation.start_span("Noop", SpanKind::Internal, None);
        span.set_tag("key", "value");
        span.set_tag("flag", true);
        span.record_error(&std::io::Error::other("ignored"));
        drop(span);

        instrumentation.increment_counter(2);
        assert_eq!(instrumentation.counter().value(), 2);
        assert_eq!(instrumentation.counter().name(), TEST_COUNTER_NAME);
    }

    #[test]
    fn test_invalid_counter_name_is_rejected() {
        let mut settings = InstrumentationSettings::default();
        settings.counter_name = "0bad name".to_string();

        assert!(matches!(
            Instrumentation::disabled(settings),
            Err(InstrumentationError::InvalidName { .. })
        ));
    }

    #[test]
    fn test_empty_source_name_is_rejected() {
        let settings = InstrumentationSettings::new("", "1.0.0");
        assert!(matches!(
            Instrumentation::disabled(settings),
            Err(InstrumentationError::EmptyName { kind: "source" })
        ));
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let instrumentation =
            Arc::new(Instrumentation::disabled(InstrumentationSettings::default()).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let instrumentation = Arc::clone(&instrumentation);
                std::thread::spawn(move || {
                    for _ in 0..1_000 {
                        instrumentation.increment_counter(1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(instrumentation.counter().value(), 8_000);
    }
}
