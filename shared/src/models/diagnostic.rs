//! Diagnostic event model.
//!
//! A [`DiagnosticEvent`] is what the telemetry SDK reports about its own
//! operation (export failures, retries, dropped data). A [`ForwardedLogRecord`]
//! is the structured log line the bridge produces from one of those events.

use super::Scalar;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Severity on the SDK's diagnostic scale.
///
/// Variants are declared from least to most severe so that the derived `Ord`
/// reads naturally: `event.severity >= minimum` means "at or above".
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    /// Chatty internal detail.
    Verbose,
    /// Normal operational notices.
    Informational,
    /// Something degraded but the SDK carried on.
    #[default]
    Warning,
    /// An operation failed.
    Error,
    /// The SDK cannot continue doing its job.
    Critical,
}

impl DiagnosticSeverity {
    /// All severities, least severe first.
    pub const ALL: [Self; 5] = [
        Self::Verbose,
        Self::Informational,
        Self::Warning,
        Self::Error,
        Self::Critical,
    ];
}

impl std::fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Verbose => write!(f, "verbose"),
            Self::Informational => write!(f, "informational"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Error returned when a severity name cannot be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown diagnostic severity: '{0}'")]
pub struct ParseSeverityError(pub String);

impl FromStr for DiagnosticSeverity {
    type Err = ParseSeverityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "verbose" | "debug" | "trace" => Ok(Self::Verbose),
            "informational" | "info" => Ok(Self::Informational),
            "warning" | "warn" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            "critical" | "fatal" => Ok(Self::Critical),
            _ => Err(ParseSeverityError(s.to_string())),
        }
    }
}

/// An event produced by the telemetry SDK about itself.
///
/// # Example
///
/// ```
/// use shared::models::{DiagnosticEvent, DiagnosticSeverity};
///
/// let event = DiagnosticEvent::new("opentelemetry_sdk", DiagnosticSeverity::Error)
///     .with_message("Export failed after {0} ms: {1}")
///     .with_payload_value(1500_u64)
///     .with_payload_value("connection refused");
///
/// assert_eq!(event.payload.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticEvent {
    /// Name of the diagnostic source that emitted the event.
    pub source: String,
    /// Severity on the SDK scale.
    pub severity: DiagnosticSeverity,
    /// Message template with positional `{N}` placeholders.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Positional values used to fill the template.
    #[serde(default)]
    pub payload: Vec<Scalar>,
}

impl DiagnosticEvent {
    /// Creates an event with no message and an empty payload.
    pub fn new(source: impl Into<String>, severity: DiagnosticSeverity) -> Self {
        Self {
            source: source.into(),
            severity,
            message: None,
            payload: Vec::new(),
        }
    }

    /// Sets the message template.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Appends one positional payload value.
    #[must_use]
    pub fn with_payload_value(mut self, value: impl Into<Scalar>) -> Self {
        self.payload.push(value.into());
        self
    }

    /// Replaces the whole payload.
    #[must_use]
    pub fn with_payload(mut self, payload: Vec<Scalar>) -> Self {
        self.payload = payload;
        self
    }
}

/// A diagnostic event translated into the application's log vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardedLogRecord {
    /// Level on the log sink's scale.
    pub level: tracing::Level,
    /// Name of the diagnostic source the event came from.
    pub source: String,
    /// Fully formatted message.
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(DiagnosticSeverity::Critical > DiagnosticSeverity::Error);
        assert!(DiagnosticSeverity::Error > DiagnosticSeverity::Warning);
        assert!(DiagnosticSeverity::Warning > DiagnosticSeverity::Informational);
        assert!(DiagnosticSeverity::Informational > DiagnosticSeverity::Verbose);

        let mut sorted = DiagnosticSeverity::ALL;
        sorted.sort();
        assert_eq!(sorted, DiagnosticSeverity::ALL);
    }

    #[test]
    fn test_severity_from_str() {
        assert_eq!("warning".parse::<DiagnosticSeverity>(), Ok(DiagnosticSeverity::Warning));
        assert_eq!("WARN".parse::<DiagnosticSeverity>(), Ok(DiagnosticSeverity::Warning));
        assert_eq!(" error ".parse::<DiagnosticSeverity>(), Ok(DiagnosticSeverity::Error));
        assert_eq!("fatal".parse::<DiagnosticSeverity>(), Ok(DiagnosticSeverity::Critical));
        assert_eq!("verbose".parse::<DiagnosticSeverity>(), Ok(DiagnosticSeverity::Verbose));
        assert_eq!("info".parse::<DiagnosticSeverity>(), Ok(DiagnosticSeverity::Informational));
        assert!("loud".parse::<DiagnosticSeverity>().is_err());
    }

    #[test]
    fn test_default_severity_is_warning() {
        assert_eq!(DiagnosticSeverity::default(), DiagnosticSeverity::Warning);
    }

    #[test]
    fn test_severity_display_round_trips() {
        for severity in DiagnosticSeverity::ALL {
            assert_eq!(severity.to_string().parse::<DiagnosticSeverity>(), Ok(severity));
        }
    }

    #[test]
    fn test_event_builder() {
        let event = DiagnosticEvent::new("opentelemetry_sdk", DiagnosticSeverity::Warning)
            .with_message("retry {0}")
            .with_payload_value(3_u64);

        assert_eq!(event.source, "opentelemetry_sdk");
        assert_eq!(event.message.as_deref(), Some("retry {0}"));
        assert_eq!(event.payload, vec![Scalar::U64(3)]);
    }
}
