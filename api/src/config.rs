//! Server configuration module.
//!
//! Handles loading configuration from environment variables with sensible defaults.
//! A `.env` file is honoured by the binary before [`Config::from_env`] runs.

use shared::diagnostics::{BridgeSettings, DEFAULT_SOURCE_PREFIX};
use shared::instrumentation::InstrumentationSettings;
use shared::models::DiagnosticSeverity;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading configuration. All of them are fatal at startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("Missing required configuration: {0}")]
    Missing(&'static str),

    /// A variable is set but cannot be used.
    #[error("Invalid value '{value}' for {var}: {reason}")]
    Invalid {
        /// Name of the variable.
        var: &'static str,
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Transport used by the OTLP exporters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OtlpProtocol {
    /// OTLP/gRPC (tonic).
    #[default]
    Grpc,
    /// OTLP/HTTP with protobuf payloads.
    HttpProtobuf,
}

impl FromStr for OtlpProtocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "grpc" => Ok(Self::Grpc),
            "http/protobuf" | "http" => Ok(Self::HttpProtobuf),
            other => Err(format!("unknown OTLP protocol '{other}'")),
        }
    }
}

impl fmt::Display for OtlpProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Grpc => write!(f, "grpc"),
            Self::HttpProtobuf => write!(f, "http/protobuf"),
        }
    }
}

/// Console log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Resource identity and exporter settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// `service.name` resource attribute, also the instrumentation scope name.
    pub service_name: String,
    /// `service.version` resource attribute.
    pub service_version: String,
    /// `service.instance.id` resource attribute.
    pub instance_id: String,
    /// `deployment.environment` resource attribute.
    pub environment: String,
    /// Collector endpoint, without per-signal suffix.
    pub otlp_endpoint: String,
    /// Exporter transport.
    pub otlp_protocol: OtlpProtocol,
    /// When set, providers are built without exporters.
    pub sdk_disabled: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "otel-demo-api".to_string(),
            service_version: "1.0.0".to_string(),
            instance_id: "instance-1".to_string(),
            environment: "production".to_string(),
            otlp_endpoint: "http://localhost:4317".to_string(),
            otlp_protocol: OtlpProtocol::Grpc,
            sdk_disabled: false,
        }
    }
}

impl TelemetryConfig {
    /// Instrument settings named after this service.
    #[must_use]
    pub fn instrumentation_settings(&self) -> InstrumentationSettings {
        InstrumentationSettings::new(self.service_name.clone(), self.service_version.clone())
    }
}

/// Remote metrics store settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsStoreConfig {
    /// Base URL of the Prometheus-compatible store.
    pub endpoint: String,
    /// Upper bound for a single range query.
    pub timeout: Duration,
}

/// Server configuration.
///
/// Configuration values can be set via environment variables:
/// - `OTEL_DEMO_HOST`: The host address to bind to (default: "0.0.0.0")
/// - `OTEL_DEMO_PORT`: The port to listen on (default: 8080)
/// - `OTEL_SERVICE_NAME`, `OTEL_SERVICE_VERSION`, `OTEL_SERVICE_INSTANCE_ID`,
///   `OTEL_DEMO_ENVIRONMENT`: resource identity
/// - `OTEL_EXPORTER_OTLP_ENDPOINT` (default: `http://localhost:4317`) and
///   `OTEL_EXPORTER_OTLP_PROTOCOL` (`grpc` or `http/protobuf`)
/// - `OTEL_SDK_DISABLED`: build providers without exporters
/// - `METRICS_STORE_ENDPOINT`: base URL of the metrics store (required)
/// - `METRICS_STORE_TIMEOUT_SECS`: range query timeout (default: 30)
/// - `OTEL_DIAGNOSTICS_MIN_SEVERITY`: lowest forwarded SDK diagnostic (default: warning)
/// - `OTEL_DIAGNOSTICS_SOURCE_PREFIX`: forwarded SDK sources (default: opentelemetry)
/// - `LOG_FORMAT`: `text` or `json` (default: text)
#[derive(Debug, Clone)]
pub struct Config {
    /// The host address to bind to.
    pub host: String,
    /// The port to listen on.
    pub port: u16,
    /// Telemetry identity and export.
    pub telemetry: TelemetryConfig,
    /// Remote metrics store.
    pub metrics_store: MetricsStoreConfig,
    /// SDK diagnostics forwarding.
    pub diagnostics: BridgeSettings,
    /// Console log format.
    pub log_format: LogFormat,
}

impl Config {
    /// Creates a new configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `METRICS_STORE_ENDPOINT` is not set
    /// - a numeric, boolean or enumerated variable cannot be parsed
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    ///
    /// Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Same as [`Config::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = TelemetryConfig::default();

        let host = get("OTEL_DEMO_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_var::<u16, _>(&get, "OTEL_DEMO_PORT")?.unwrap_or(8080);

        let telemetry = TelemetryConfig {
            service_name: get("OTEL_SERVICE_NAME").unwrap_or(defaults.service_name),
            service_version: get("OTEL_SERVICE_VERSION").unwrap_or(defaults.service_version),
            instance_id: get("OTEL_SERVICE_INSTANCE_ID").unwrap_or(defaults.instance_id),
            environment: get("OTEL_DEMO_ENVIRONMENT").unwrap_or(defaults.environment),
            otlp_endpoint: get("OTEL_EXPORTER_OTLP_ENDPOINT").unwrap_or(defaults.otlp_endpoint),
            otlp_protocol: parse_var::<OtlpProtocol, _>(&get, "OTEL_EXPORTER_OTLP_PROTOCOL")?
                .unwrap_or(defaults.otlp_protocol),
            sdk_disabled: parse_var::<bool, _>(&get, "OTEL_SDK_DISABLED")?.unwrap_or(false),
        };

        let endpoint =
            get("METRICS_STORE_ENDPOINT").ok_or(ConfigError::Missing("METRICS_STORE_ENDPOINT"))?;
        let timeout_secs = parse_var::<u64, _>(&get, "METRICS_STORE_TIMEOUT_SECS")?.unwrap_or(30);
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "METRICS_STORE_TIMEOUT_SECS",
                value: "0".to_string(),
                reason: "timeout must be positive".to_string(),
            });
        }

        let diagnostics = BridgeSettings {
            source_prefix: get("OTEL_DIAGNOSTICS_SOURCE_PREFIX")
                .unwrap_or_else(|| DEFAULT_SOURCE_PREFIX.to_string()),
            min_severity: parse_var::<DiagnosticSeverity, _>(&get, "OTEL_DIAGNOSTICS_MIN_SEVERITY")?
                .unwrap_or(DiagnosticSeverity::Warning),
        };

        Ok(Self {
            host,
            port,
            telemetry,
            metrics_store: MetricsStoreConfig {
                endpoint,
                timeout: Duration::from_secs(timeout_secs),
            },
            diagnostics,
            log_format: parse_var::<LogFormat, _>(&get, "LOG_FORMAT")?.unwrap_or_default(),
        })
    }

    /// Returns the socket address for binding.
    ///
    /// # Errors
    ///
    /// Returns an error if the host is not an IP address.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                var: "OTEL_DEMO_HOST",
                value: self.host.clone(),
                reason: e.to_string(),
            })
    }
}

impl Default for Config {
    /// Defaults for local development. The metrics store points at a local
    /// Prometheus; [`Config::from_env`] never falls back to it.
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            telemetry: TelemetryConfig::default(),
            metrics_store: MetricsStoreConfig {
                endpoint: "http://localhost:9090".to_string(),
                timeout: shared::metrics_proxy::DEFAULT_TIMEOUT,
            },
            diagnostics: BridgeSettings::default(),
            log_format: LogFormat::Text,
        }
    }
}

fn parse_var<T, G>(get: &G, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    get(var)
        .map(|value| {
            value.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
                var,
                reason: e.to_string(),
                value,
            })
        })
        .transpose()
}
