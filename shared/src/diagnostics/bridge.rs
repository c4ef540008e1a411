//! Forwards SDK diagnostics into the application log.
//!
//! The bridge starts [`BridgeState::Inactive`], becomes
//! [`BridgeState::Active`] once subscribed to a [`DiagnosticHub`], and ends
//! [`BridgeState::Disposed`] when the returned [`BridgeGuard`] is released or
//! dropped. A disposed bridge never delivers again.

use super::format::{MessageFormatter, PositionalFormatter};
use super::hub::{DiagnosticHub, DiagnosticListener, Subscription};
use super::severity::to_log_level;
use super::sink::LogSink;
use crate::models::{DiagnosticEvent, DiagnosticSeverity, ForwardedLogRecord};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

/// Default source prefix: the OpenTelemetry SDK's crate namespace.
pub const DEFAULT_SOURCE_PREFIX: &str = "opentelemetry";

/// Lifecycle of a [`DiagnosticBridge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    /// Not subscribed yet.
    Inactive,
    /// Subscribed and forwarding.
    Active,
    /// Released; terminal.
    Disposed,
}

impl std::fmt::Display for BridgeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inactive => write!(f, "inactive"),
            Self::Active => write!(f, "active"),
            Self::Disposed => write!(f, "disposed"),
        }
    }
}

/// Errors from bridge state transitions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BridgeError {
    /// `activate` was called on an active bridge.
    #[error("Diagnostic bridge is already active")]
    AlreadyActive,

    /// `activate` was called after the bridge was released.
    #[error("Diagnostic bridge has been disposed")]
    Disposed,
}

/// Which diagnostics get forwarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeSettings {
    /// Only sources whose name starts with this prefix are subscribed.
    pub source_prefix: String,
    /// Events below this severity are dropped.
    pub min_severity: DiagnosticSeverity,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            source_prefix: DEFAULT_SOURCE_PREFIX.to_string(),
            min_severity: DiagnosticSeverity::Warning,
        }
    }
}

/// Translates [`DiagnosticEvent`]s into [`ForwardedLogRecord`]s and writes
/// them to a [`LogSink`].
///
/// # Example
///
/// ```
/// use shared::diagnostics::{BridgeSettings, DiagnosticBridge, TracingLogSink};
/// use shared::models::{DiagnosticEvent, DiagnosticSeverity};
///
/// let bridge = DiagnosticBridge::new(BridgeSettings::default(), TracingLogSink);
///
/// let ignored = DiagnosticEvent::new("hyper", DiagnosticSeverity::Critical);
/// assert!(bridge.translate(&ignored).is_none());
/// ```
pub struct DiagnosticBridge<S, F = PositionalFormatter> {
    settings: BridgeSettings,
    sink: S,
    formatter: F,
    state: Arc<Mutex<BridgeState>>,
}

impl<S: LogSink> DiagnosticBridge<S> {
    /// Creates an inactive bridge with the default formatter.
    pub fn new(settings: BridgeSettings, sink: S) -> Self {
        Self::with_formatter(settings, sink, PositionalFormatter)
    }
}

impl<S: LogSink, F: MessageFormatter> DiagnosticBridge<S, F> {
    /// Creates an inactive bridge with a custom formatter.
    pub fn with_formatter(settings: BridgeSettings, sink: S, formatter: F) -> Self {
        Self {
            settings,
            sink,
            formatter,
            state: Arc::new(Mutex::new(BridgeState::Inactive)),
        }
    }

    /// The bridge's settings.
    pub fn settings(&self) -> &BridgeSettings {
        &self.settings
    }

    /// The sink records are written to.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Current lifecycle state.
    pub fn state(&self) -> BridgeState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Translates one event.
    ///
    /// Returns `None` when the source does not match the prefix, the event is
    /// below the minimum severity, or the sink would not record the mapped
    /// level. Formatting only happens when a record is produced.
    pub fn translate(&self, event: &DiagnosticEvent) -> Option<ForwardedLogRecord> {
        if !event.source.starts_with(&self.settings.source_prefix) {
            return None;
        }
        if event.severity < self.settings.min_severity {
            return None;
        }

        let level = to_log_level(event.severity);
        if !self.sink.enabled(level, &event.source) {
            return None;
        }

        let message = self
            .formatter
            .format(event.message.as_deref(), &event.payload);

        Some(ForwardedLogRecord {
            level,
            source: event.source.clone(),
            message,
        })
    }
}

impl<S, F> DiagnosticBridge<S, F>
where
    S: LogSink + 'static,
    F: MessageFormatter + 'static,
{
    /// Subscribes the bridge to `hub`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::AlreadyActive`] or [`BridgeError::Disposed`] if
    /// the bridge is not [`BridgeState::Inactive`].
    pub fn activate(self: &Arc<Self>, hub: &DiagnosticHub) -> Result<BridgeGuard, BridgeError> {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            match *state {
                BridgeState::Inactive => *state = BridgeState::Active,
                BridgeState::Active => return Err(BridgeError::AlreadyActive),
                BridgeState::Disposed => return Err(BridgeError::Disposed),
            }
        }

        let subscription = hub.subscribe(Arc::clone(self) as Arc<dyn DiagnosticListener>);
        tracing::debug!(
            prefix = %self.settings.source_prefix,
            min_severity = %self.settings.min_severity,
            "Diagnostic bridge active"
        );

        Ok(BridgeGuard {
            subscription: Some(subscription),
            state: Arc::clone(&self.state),
        })
    }
}

impl<S: LogSink, F: MessageFormatter> DiagnosticListener for DiagnosticBridge<S, F> {
    fn source_enabled(&self, source: &str) -> Option<DiagnosticSeverity> {
        (self.state() == BridgeState::Active && source.starts_with(&self.settings.source_prefix))
            .then_some(self.settings.min_severity)
    }

    fn on_event(&self, event: &DiagnosticEvent) {
        if self.state() != BridgeState::Active {
            return;
        }
        if let Some(record) = self.translate(event) {
            self.sink.record(record);
        }
    }
}

/// Keeps a bridge subscribed. Releasing or dropping it disposes the bridge.
#[must_use = "dropping a BridgeGuard immediately disposes the bridge"]
pub struct BridgeGuard {
    subscription: Option<Subscription>,
    state: Arc<Mutex<BridgeState>>,
}

impl std::fmt::Debug for BridgeGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeGuard")
            .field("subscription", &self.subscription)
            .finish_non_exhaustive()
    }
}

impl BridgeGuard {
    /// Unsubscribes and disposes the bridge now.
    pub fn release(mut self) {
        self.dispose();
    }

    fn dispose(&mut self) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = BridgeState::Disposed;
        if let Some(subscription) = self.subscription.take() {
            subscription.release();
        }
    }
}

impl Drop for BridgeGuard {
    fn drop(&mut self) {
        self.dispose();
    }
}
