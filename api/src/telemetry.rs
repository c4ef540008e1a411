//! OpenTelemetry provider wiring and `tracing` subscriber setup.
//!
//! [`init_telemetry`] builds the tracer, meter and logger providers, installs
//! the global subscriber and activates the diagnostic bridge. The returned
//! [`TelemetryHandle`] owns all of it and must be shut down before exit so the
//! last batches are flushed.
//!
//! Subscriber layout:
//!
//! - `EnvFilter` from `RUST_LOG` (default `info`)
//! - console `fmt` layer, text or JSON
//! - `tracing-opentelemetry` span layer
//! - OTLP log bridge
//! - [`SdkDiagnosticsLayer`], which feeds the SDK's own diagnostics to the
//!   bridge
//!
//! Raw SDK and transport targets are kept off the console and out of the
//! exporters. SDK diagnostics reach the console only through the bridge, under
//! [`DIAGNOSTICS_TARGET`], and are never exported over OTLP.

use crate::config::{Config, LogFormat, OtlpProtocol, TelemetryConfig};
use anyhow::{Context as _, Result};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{global, KeyValue};
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_otlp::{LogExporter, MetricExporter, Protocol, SpanExporter, WithExportConfig};
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::{SdkTracer, SdkTracerProvider};
use opentelemetry_sdk::Resource;
use shared::diagnostics::{
    BridgeGuard, DiagnosticBridge, DiagnosticHub, SdkDiagnosticsLayer, TracingLogSink,
    DIAGNOSTICS_TARGET,
};
use shared::instrumentation::Instrumentation;
use std::sync::Arc;
use tracing::{Metadata, Subscriber};
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

/// Targets whose events never reach the console or the exporters directly.
const TRANSPORT_TARGETS: [&str; 5] = ["opentelemetry", "hyper", "h2", "tonic", "reqwest"];

/// Tracer, meter and logger providers sharing one resource.
#[derive(Debug, Clone)]
pub struct Providers {
    /// Span pipeline.
    pub tracer: SdkTracerProvider,
    /// Metric pipeline.
    pub meter: SdkMeterProvider,
    /// Log pipeline.
    pub logger: SdkLoggerProvider,
}

/// Owns everything [`init_telemetry`] set up.
///
/// Dropping the handle without calling [`TelemetryHandle::shutdown`] may lose
/// the final batches.
pub struct TelemetryHandle {
    providers: Providers,
    instrumentation: Arc<Instrumentation>,
    bridge: BridgeGuard,
}

impl std::fmt::Debug for TelemetryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryHandle")
            .field("instrumentation", &self.instrumentation)
            .field("bridge", &self.bridge)
            .finish_non_exhaustive()
    }
}

impl TelemetryHandle {
    /// The instrumentation to inject into the application state.
    #[must_use]
    pub fn instrumentation(&self) -> Arc<Instrumentation> {
        Arc::clone(&self.instrumentation)
    }

    /// Flushes and shuts down every provider, then releases the bridge.
    ///
    /// # Errors
    ///
    /// Returns a combined error naming each provider that failed to shut down.
    pub fn shutdown(self) -> Result<()> {
        let mut errs = Vec::new();
        if let Err(e) = self.providers.tracer.shutdown() {
            errs.push(format!("tracer: {e}"));
        }
        if let Err(e) = self.providers.meter.shutdown() {
            errs.push(format!("meter: {e}"));
        }
        if let Err(e) = self.providers.logger.shutdown() {
            errs.push(format!("logger: {e}"));
        }

        // Diagnostics raised while flushing are still forwarded.
        self.bridge.release();

        if errs.is_empty() {
            Ok(())
        } else {
            anyhow::bail!(errs.join(", "))
        }
    }
}

/// Resource attributes shared by all signals.
#[must_use]
pub fn resource(config: &TelemetryConfig) -> Resource {
    Resource::builder()
        .with_service_name(config.service_name.clone())
        .with_attributes([
            KeyValue::new("service.version", config.service_version.clone()),
            KeyValue::new("service.instance.id", config.instance_id.clone()),
            KeyValue::new("deployment.environment", config.environment.clone()),
        ])
        .build()
}

/// Builds the three providers.
///
/// With `sdk_disabled` the providers have no exporters: instruments work but
/// nothing leaves the process.
///
/// # Errors
///
/// Returns an error if an exporter cannot be built (e.g. invalid endpoint).
pub fn build_providers(config: &TelemetryConfig) -> Result<Providers> {
    let resource = resource(config);

    if config.sdk_disabled {
        return Ok(Providers {
            tracer: SdkTracerProvider::builder()
                .with_resource(resource.clone())
                .build(),
            meter: SdkMeterProvider::builder()
                .with_resource(resource.clone())
                .build(),
            logger: SdkLoggerProvider::builder().with_resource(resource).build(),
        });
    }

    let base = config.otlp_endpoint.trim_end_matches('/');

    let span_exporter = match config.otlp_protocol {
        OtlpProtocol::Grpc => SpanExporter::builder()
            .with_tonic()
            .with_endpoint(base)
            .build(),
        OtlpProtocol::HttpProtobuf => SpanExporter::builder()
            .with_http()
            .with_protocol(Protocol::HttpBinary)
            .with_endpoint(format!("{base}/v1/traces"))
            .build(),
    }
    .context("Failed to build OTLP span exporter")?;

    let metric_exporter = match config.otlp_protocol {
        OtlpProtocol::Grpc => MetricExporter::builder()
            .with_tonic()
            .with_endpoint(base)
            .build(),
        OtlpProtocol::HttpProtobuf => MetricExporter::builder()
            .with_http()
            .with_protocol(Protocol::HttpBinary)
            .with_endpoint(format!("{base}/v1/metrics"))
            .build(),
    }
    .context("Failed to build OTLP metric exporter")?;

    let log_exporter = match config.otlp_protocol {
        OtlpProtocol::Grpc => LogExporter::builder()
            .with_tonic()
            .with_endpoint(base)
            .build(),
        OtlpProtocol::HttpProtobuf => LogExporter::builder()
            .with_http()
            .with_protocol(Protocol::HttpBinary)
            .with_endpoint(format!("{base}/v1/logs"))
            .build(),
    }
    .context("Failed to build OTLP log exporter")?;

    Ok(Providers {
        tracer: SdkTracerProvider::builder()
            .with_batch_exporter(span_exporter)
            .with_resource(resource.clone())
            .build(),
        meter: SdkMeterProvider::builder()
            .with_periodic_exporter(metric_exporter)
            .with_resource(resource.clone())
            .build(),
        logger: SdkLoggerProvider::builder()
            .with_batch_exporter(log_exporter)
            .with_resource(resource)
            .build(),
    })
}

/// Initializes telemetry for the process.
///
/// Installs the global tracer and meter providers, the W3C trace context
/// propagator and the global `tracing` subscriber, creates the shared
/// [`Instrumentation`] and activates the diagnostic bridge. Call once, inside
/// the Tokio runtime.
///
/// # Errors
///
/// Returns an error if an exporter cannot be built, the instrument names are
/// invalid, or a global subscriber is already installed.
pub fn init_telemetry(config: &Config) -> Result<TelemetryHandle> {
    let providers = build_providers(&config.telemetry)?;
    global::set_tracer_provider(providers.tracer.clone());
    global::set_meter_provider(providers.meter.clone());
    global::set_text_map_propagator(TraceContextPropagator::new());

    let instrumentation = Instrumentation::new(
        &providers.tracer,
        &providers.meter,
        config.telemetry.instrumentation_settings(),
    )
    .context("Failed to create instrumentation")?;

    let hub = DiagnosticHub::new();
    let bridge = Arc::new(DiagnosticBridge::new(
        config.diagnostics.clone(),
        TracingLogSink,
    ));
    let bridge_guard = bridge
        .activate(&hub)
        .context("Failed to activate diagnostic bridge")?;
    let diagnostics_layer =
        SdkDiagnosticsLayer::new(&hub).context("Failed to start diagnostics publisher")?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let tracer = providers.tracer.tracer(config.telemetry.service_name.clone());

    subscriber(
        env_filter,
        config.log_format,
        tracer,
        &providers.logger,
        diagnostics_layer,
    )
    .try_init()
    .context("Failed to install tracing subscriber")?;

    tracing::info!(
        service = %config.telemetry.service_name,
        version = %config.telemetry.service_version,
        environment = %config.telemetry.environment,
        endpoint = %config.telemetry.otlp_endpoint,
        protocol = %config.telemetry.otlp_protocol,
        sdk_disabled = config.telemetry.sdk_disabled,
        "Telemetry initialized"
    );

    Ok(TelemetryHandle {
        providers,
        instrumentation: Arc::new(instrumentation),
        bridge: bridge_guard,
    })
}

/// The layer stack installed by [`init_telemetry`].
fn subscriber(
    env_filter: EnvFilter,
    log_format: LogFormat,
    tracer: SdkTracer,
    logger: &SdkLoggerProvider,
    diagnostics: SdkDiagnosticsLayer,
) -> impl Subscriber + Send + Sync + 'static {
    let (text_layer, json_layer) = match log_format {
        LogFormat::Text => (Some(fmt::layer()), None),
        LogFormat::Json => (None, Some(fmt::layer().json())),
    };

    Registry::default()
        .with(env_filter)
        .with(text_layer.with_filter(filter_fn(is_console_event)))
        .with(json_layer.with_filter(filter_fn(is_console_event)))
        .with(OpenTelemetryLayer::new(tracer).with_filter(filter_fn(is_console_event)))
        .with(OpenTelemetryTracingBridge::new(logger).with_filter(filter_fn(is_exported_event)))
        .with(diagnostics)
}

fn is_transport_target(target: &str) -> bool {
    TRANSPORT_TARGETS
        .iter()
        .any(|prefix| target.starts_with(prefix))
}

fn is_console_event(metadata: &Metadata<'_>) -> bool {
    !is_transport_target(metadata.target())
}

fn is_exported_event(metadata: &Metadata<'_>) -> bool {
    is_console_event(metadata) && metadata.target() != DIAGNOSTICS_TARGET
}
