//! Destinations for forwarded diagnostic records.

use crate::models::ForwardedLogRecord;
use tracing::Level;

/// Target used for every record re-emitted through `tracing`.
///
/// Deliberately outside the SDK namespace so re-emitted records are never
/// captured again as SDK diagnostics.
pub const DIAGNOSTICS_TARGET: &str = "otel_demo::diagnostics";

/// Where the bridge writes forwarded records.
pub trait LogSink: Send + Sync {
    /// Returns true if a record at `level` from `source` would be written.
    fn enabled(&self, level: Level, source: &str) -> bool;

    /// Writes one record.
    fn record(&self, record: ForwardedLogRecord);
}

/// Writes records as `tracing` events under [`DIAGNOSTICS_TARGET`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn enabled(&self, level: Level, _source: &str) -> bool {
        match level {
            Level::ERROR => tracing::enabled!(target: DIAGNOSTICS_TARGET, Level::ERROR),
            Level::WARN => tracing::enabled!(target: DIAGNOSTICS_TARGET, Level::WARN),
            Level::INFO => tracing::enabled!(target: DIAGNOSTICS_TARGET, Level::INFO),
            Level::DEBUG => tracing::enabled!(target: DIAGNOSTICS_TARGET, Level::DEBUG),
            _ => tracing::enabled!(target: DIAGNOSTICS_TARGET, Level::TRACE),
        }
    }

    fn record(&self, record: ForwardedLogRecord) {
        let ForwardedLogRecord {
            level,
            source,
            message,
        } = record;

        match level {
            Level::ERROR => tracing::error!(target: DIAGNOSTICS_TARGET, %source, "{message}"),
            Level::WARN => tracing::warn!(target: DIAGNOSTICS_TARGET, %source, "{message}"),
            Level::INFO => tracing::info!(target: DIAGNOSTICS_TARGET, %source, "{message}"),
            Level::DEBUG => tracing::debug!(target: DIAGNOSTICS_TARGET, %source, "{message}"),
            _ => tracing::trace!(target: DIAGNOSTICS_TARGET, %source, "{message}"),
        }
    }
}
