//! A small publish/subscribe hub for diagnostic sources.
//!
//! Sources register by name; listeners subscribe once and are asked, for every
//! source (already registered or registered later), whether they want its
//! events and from which severity on. Delivery is synchronous on the emitting
//! thread.

use crate::models::{DiagnosticEvent, DiagnosticSeverity};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

/// Receives diagnostic events from a [`DiagnosticHub`].
pub trait DiagnosticListener: Send + Sync {
    /// Decides whether events from `source` should be delivered.
    ///
    /// Returns the minimum severity to deliver, or `None` to ignore the source.
    /// Asked once per source per subscription.
    fn source_enabled(&self, source: &str) -> Option<DiagnosticSeverity>;

    /// Handles one event. Called on the emitting thread.
    fn on_event(&self, event: &DiagnosticEvent);
}

type ListenerRef = Arc<dyn DiagnosticListener>;

struct Enabled {
    subscription: u64,
    min_severity: DiagnosticSeverity,
    listener: ListenerRef,
}

struct SourceState {
    name: String,
    enabled: RwLock<Vec<Enabled>>,
}

impl SourceState {
    fn enable(&self, subscription: u64, listener: &ListenerRef) {
        if let Some(min_severity) = listener.source_enabled(&self.name) {
            self.enabled
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .push(Enabled {
                    subscription,
                    min_severity,
                    listener: Arc::clone(listener),
                });
        }
    }

    fn disable(&self, subscription: u64) {
        self.enabled
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|e| e.subscription != subscription);
    }
}

#[derive(Default)]
struct HubState {
    sources: HashMap<String, Arc<SourceState>>,
    listeners: Vec<(u64, ListenerRef)>,
}

#[derive(Default)]
struct HubInner {
    state: RwLock<HubState>,
    next_id: AtomicU64,
}

impl HubInner {
    fn unsubscribe(&self, id: u64) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.listeners.retain(|(listener_id, _)| *listener_id != id);
        for source in state.sources.values() {
            source.disable(id);
        }
    }
}

/// Registry of diagnostic sources and their listeners.
///
/// Cloning is cheap and every clone refers to the same registry.
///
/// # Example
///
/// ```
/// use shared::diagnostics::{DiagnosticHub, DiagnosticListener};
/// use shared::models::{DiagnosticEvent, DiagnosticSeverity};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// #[derive(Default)]
/// struct Count(AtomicUsize);
///
/// impl DiagnosticListener for Count {
///     fn source_enabled(&self, _source: &str) -> Option<DiagnosticSeverity> {
///         Some(DiagnosticSeverity::Verbose)
///     }
///     fn on_event(&self, _event: &DiagnosticEvent) {
///         self.0.fetch_add(1, Ordering::SeqCst);
///     }
/// }
///
/// let hub = DiagnosticHub::new();
/// let listener = Arc::new(Count::default());
/// let subscription = hub.subscribe(listener.clone());
///
/// let source = hub.register_source("opentelemetry_sdk");
/// source.emit(DiagnosticEvent::new("opentelemetry_sdk", DiagnosticSeverity::Error));
/// assert_eq!(listener.0.load(Ordering::SeqCst), 1);
///
/// subscription.release();
/// source.emit(DiagnosticEvent::new("opentelemetry_sdk", DiagnosticSeverity::Error));
/// assert_eq!(listener.0.load(Ordering::SeqCst), 1);
/// ```
#[derive(Clone, Default)]
pub struct DiagnosticHub {
    inner: Arc<HubInner>,
}

impl std::fmt::Debug for DiagnosticHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("DiagnosticHub")
            .field("sources", &state.sources.len())
            .field("listeners", &state.listeners.len())
            .finish()
    }
}

impl DiagnosticHub {
    /// Creates an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a source, or returns the existing one with the same name.
    ///
    /// Every current listener is asked whether it wants this source.
    pub fn register_source(&self, name: &str) -> DiagnosticSource {
        let mut state = self.inner.state.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = state.sources.get(name) {
            return DiagnosticSource {
                state: Arc::clone(existing),
            };
        }

        let source = Arc::new(SourceState {
            name: name.to_string(),
            enabled: RwLock::new(Vec::new()),
        });
        for (id, listener) in &state.listeners {
            source.enable(*id, listener);
        }
        state.sources.insert(name.to_string(), Arc::clone(&source));

        DiagnosticSource { state: source }
    }

    /// Subscribes a listener to all current and future sources it enables.
    ///
    /// Events stop flowing once the returned [`Subscription`] is released or
    /// dropped.
    pub fn subscribe(&self, listener: Arc<dyn DiagnosticListener>) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let mut state = self.inner.state.write().unwrap_or_else(PoisonError::into_inner);
        for source in state.sources.values() {
            source.enable(id, &listener);
        }
        state.listeners.push((id, listener));

        Subscription {
            hub: Some(Arc::downgrade(&self.inner)),
            id,
        }
    }

    /// Number of active subscriptions.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .listeners
            .len()
    }

    /// Names of all registered sources, sorted.
    #[must_use]
    pub fn source_names(&self) -> Vec<String> {
        let state = self.inner.state.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = state.sources.keys().cloned().collect();
        names.sort();
        names
    }
}

/// A named emitter registered with a [`DiagnosticHub`].
#[derive(Clone)]
pub struct DiagnosticSource {
    state: Arc<SourceState>,
}

impl std::fmt::Debug for DiagnosticSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagnosticSource")
            .field("name", &self.state.name)
            .finish_non_exhaustive()
    }
}

impl DiagnosticSource {
    /// The source's registered name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.state.name
    }

    /// Returns true if at least one listener wants events at `severity`.
    ///
    /// Emitters can use this to skip building events nobody will see.
    #[must_use]
    pub fn is_enabled(&self, severity: DiagnosticSeverity) -> bool {
        self.state
            .enabled
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|e| severity >= e.min_severity)
    }

    /// Delivers `event` to every listener enabled for it.
    pub fn emit(&self, event: DiagnosticEvent) {
        // Snapshot so listeners may (un)subscribe from inside the callback.
        let targets: Vec<ListenerRef> = self
            .state
            .enabled
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| event.severity >= e.min_severity)
            .map(|e| Arc::clone(&e.listener))
            .collect();

        for listener in targets {
            listener.on_event(&event);
        }
    }
}

/// Scoped handle for a hub subscription.
///
/// Dropping the handle unsubscribes. [`Subscription::release`] does the same
/// explicitly; releasing twice is harmless.
#[must_use = "dropping a Subscription immediately unsubscribes the listener"]
pub struct Subscription {
    hub: Option<Weak<HubInner>>,
    id: u64,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

impl Subscription {
    /// Returns true until the subscription is released.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.hub.as_ref().is_some_and(|hub| hub.strong_count() > 0)
    }

    /// Unsubscribes now.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if let Some(hub) = self.hub.take().and_then(|weak| weak.upgrade()) {
            hub.unsubscribe(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_inner();
    }
}
