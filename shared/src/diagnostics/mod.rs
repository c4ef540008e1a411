//! Relays the telemetry SDK's own diagnostics into the application log.
//!
//! The pieces, from source to sink:
//!
//! - [`SdkDiagnosticsLayer`] observes the SDK's internal `tracing` events and
//!   publishes them as [`DiagnosticEvent`](crate::models::DiagnosticEvent)s.
//! - [`DiagnosticHub`] routes events from named sources to subscribed
//!   listeners.
//! - [`DiagnosticBridge`] is the listener: it filters by source prefix and
//!   severity, formats the message and writes a
//!   [`ForwardedLogRecord`](crate::models::ForwardedLogRecord) to a [`LogSink`].

pub mod bridge;
pub mod format;
pub mod hub;
pub mod layer;
pub mod severity;
pub mod sink;

pub use bridge::{
    BridgeError, BridgeGuard, BridgeSettings, BridgeState, DiagnosticBridge, DEFAULT_SOURCE_PREFIX,
};
pub use format::{FormatError, MessageFormatter, PositionalFormatter, FORMAT_ERROR_MARKER};
pub use hub::{DiagnosticHub, DiagnosticListener, DiagnosticSource, Subscription};
pub use layer::{SdkDiagnosticsLayer, SDK_NAMESPACE};
pub use severity::{from_log_level, to_log_level};
pub use sink::{LogSink, TracingLogSink, DIAGNOSTICS_TARGET};
