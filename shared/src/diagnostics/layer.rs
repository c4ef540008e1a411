//! Captures the OpenTelemetry SDK's internal `tracing` events.
//!
//! With the `internal-logs` feature the SDK crates report their own problems
//! as `tracing` events targeted at their crate names. [`SdkDiagnosticsLayer`]
//! turns each of those into a [`DiagnosticEvent`] and publishes it on a
//! [`DiagnosticHub`] source named after the event's target.
//!
//! Publication happens on a dedicated thread: listeners typically write to
//! `tracing` again, which must not happen from inside a subscriber callback.

use super::hub::{DiagnosticHub, DiagnosticSource};
use super::severity::from_log_level;
use crate::models::{DiagnosticEvent, DiagnosticSeverity, Scalar};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::mpsc::{self, Sender};
use std::sync::{PoisonError, RwLock};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// Target prefix shared by every OpenTelemetry crate.
pub const SDK_NAMESPACE: &str = "opentelemetry";

/// A `tracing_subscriber` layer that feeds SDK events into a hub.
pub struct SdkDiagnosticsLayer {
    hub: DiagnosticHub,
    namespace: String,
    sources: RwLock<HashMap<String, DiagnosticSource>>,
    sender: Sender<(DiagnosticSource, DiagnosticEvent)>,
}

impl std::fmt::Debug for SdkDiagnosticsLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SdkDiagnosticsLayer")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl SdkDiagnosticsLayer {
    /// Creates a layer capturing targets under [`SDK_NAMESPACE`].
    ///
    /// # Errors
    ///
    /// Returns an error if the publishing thread cannot be spawned.
    pub fn new(hub: &DiagnosticHub) -> std::io::Result<Self> {
        Self::with_namespace(hub, SDK_NAMESPACE)
    }

    /// Creates a layer capturing targets starting with `namespace`.
    ///
    /// # Errors
    ///
    /// Returns an error if the publishing thread cannot be spawned.
    pub fn with_namespace(hub: &DiagnosticHub, namespace: &str) -> std::io::Result<Self> {
        let (sender, receiver) = mpsc::channel::<(DiagnosticSource, DiagnosticEvent)>();

        std::thread::Builder::new()
            .name("otel-diagnostics".to_string())
            .spawn(move || {
                for (source, event) in receiver {
                    source.emit(event);
                }
            })?;

        Ok(Self {
            hub: hub.clone(),
            namespace: namespace.to_string(),
            sources: RwLock::new(HashMap::new()),
            sender,
        })
    }

    fn source_for(&self, target: &str) -> DiagnosticSource {
        if let Some(source) = self
            .sources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(target)
        {
            return source.clone();
        }

        let source = self.hub.register_source(target);
        self.sources
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(target.to_string(), source.clone());
        source
    }
}

impl<S: Subscriber> Layer<S> for SdkDiagnosticsLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let target = metadata.target();
        if !target.starts_with(&self.namespace) {
            return;
        }

        let source = self.source_for(target);
        let severity = from_log_level(*metadata.level());
        if !source.is_enabled(severity) {
            return;
        }

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);
        let diagnostic = visitor.into_event(target, severity);

        // The receiver only goes away with the process.
        let _ = self.sender.send((source, diagnostic));
    }
}

/// Collects an event's fields into a template and a positional payload.
#[derive(Default)]
struct EventVisitor {
    message: Option<String>,
    name: Option<String>,
    keys: Vec<&'static str>,
    payload: Vec<Scalar>,
}

impl EventVisitor {
    fn push(&mut self, field: &Field, value: Scalar) {
        match field.name() {
            "message" => self.message = Some(value.to_string()).filter(|m| !m.is_empty()),
            "name" if self.name.is_none() => self.name = Some(value.to_string()),
            key => {
                self.keys.push(key);
                self.payload.push(value);
            }
        }
    }

    /// Builds `"<message or name>: key0={0}, key1={1}"`, escaping braces in
    /// the literal parts so only the generated placeholders are substituted.
    fn into_event(self, target: &str, severity: DiagnosticSeverity) -> DiagnosticEvent {
        let head = self.message.or(self.name).map(|h| escape_braces(&h));

        let mut template = head.unwrap_or_default();
        for (index, key) in self.keys.iter().enumerate() {
            template.push_str(match (index, template.is_empty()) {
                (_, true) => "",
                (0, false) => ": ",
                _ => ", ",
            });
            let _ = write!(template, "{}={{{index}}}", escape_braces(key));
        }

        let event = DiagnosticEvent::new(target, severity).with_payload(self.payload);
        if template.is_empty() {
            event
        } else {
            event.with_message(template)
        }
    }
}

impl Visit for EventVisitor {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.push(field, Scalar::F64(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.push(field, Scalar::I64(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.push(field, Scalar::U64(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.push(field, Scalar::Bool(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.push(field, Scalar::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.push(field, Scalar::Str(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.push(field, Scalar::Str(format!("{value:?}")));
    }
}

fn escape_braces(text: &str) -> String {
    text.replace('{', "{{").replace('}', "}}")
}
