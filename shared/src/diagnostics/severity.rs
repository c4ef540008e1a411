//! Mapping between the SDK's diagnostic scale and `tracing` levels.
//!
//! Both directions are written out as explicit tables. The two scales do not
//! share a numeric representation and must never be cast into each other.

use crate::models::DiagnosticSeverity;
use tracing::Level;

/// Maps a diagnostic severity onto the level used for the forwarded log line.
///
/// The mapping is total and order preserving: a more severe diagnostic never
/// lands on a less severe log level.
#[must_use]
pub const fn to_log_level(severity: DiagnosticSeverity) -> Level {
    match severity {
        DiagnosticSeverity::Critical | DiagnosticSeverity::Error => Level::ERROR,
        DiagnosticSeverity::Warning => Level::WARN,
        DiagnosticSeverity::Informational => Level::INFO,
        DiagnosticSeverity::Verbose => Level::DEBUG,
    }
}

/// Maps a `tracing` level emitted by the SDK back onto the diagnostic scale.
#[must_use]
pub fn from_log_level(level: Level) -> DiagnosticSeverity {
    match level {
        Level::ERROR => DiagnosticSeverity::Error,
        Level::WARN => DiagnosticSeverity::Warning,
        Level::INFO => DiagnosticSeverity::Informational,
        _ => DiagnosticSeverity::Verbose,
    }
}
