//! Per-event-type handler registration and inbound frame routing

use crate::protocol::{EventEnvelope, EventType};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Opaque handler registration id
pub type HandlerId = u64;

type Handler = Arc<dyn Fn(&EventEnvelope) + Send + Sync>;

/// Registry of event handlers
///
/// One handler list per event type plus a wildcard list invoked for every
/// dispatched event. Cheap to clone; clones share the same registrations.
#[derive(Clone, Default)]
pub struct EventRegistry {
    inner: Arc<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    next_id: AtomicU64,
    typed: DashMap<EventType, Vec<(HandlerId, Handler)>>,
    wildcard: RwLock<Vec<(HandlerId, Handler)>>,
}

impl EventRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one event type
    ///
    /// Multiple handlers per type are permitted; they run in registration
    /// order. The returned guard removes exactly this registration.
    pub fn on<F>(&self, event: EventType, handler: F) -> HandlerGuard
    where
        F: Fn(&EventEnvelope) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .typed
            .entry(event.clone())
            .or_default()
            .push((id, Arc::new(handler)));

        tracing::trace!(event = %event, id, "Handler registered");

        HandlerGuard {
            registry: Arc::downgrade(&self.inner),
            event: Some(event),
            id,
        }
    }

    /// Register a wildcard handler invoked for every dispatched event
    pub fn on_any<F>(&self, handler: F) -> HandlerGuard
    where
        F: Fn(&EventEnvelope) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.wildcard.write().push((id, Arc::new(handler)));

        tracing::trace!(id, "Wildcard handler registered");

        HandlerGuard {
            registry: Arc::downgrade(&self.inner),
            event: None,
            id,
        }
    }

    /// Parse and dispatch one raw text frame
    ///
    /// A malformed frame is logged and discarded; it must never take the
    /// channel down.
    pub fn dispatch_raw(&self, raw: &str) {
        let envelope: EventEnvelope = match serde_json::from_str(raw) {
            Ok(envelope) => envelope,
            Err(err) => {
                tracing::warn!(error = %err, "Discarding malformed inbound frame");
                return;
            }
        };

        self.dispatch(&envelope);
    }

    /// Dispatch a parsed envelope to typed handlers, then wildcard handlers
    pub fn dispatch(&self, envelope: &EventEnvelope) {
        if envelope.event == EventType::Heartbeat {
            tracing::trace!("Heartbeat frame; no handlers invoked");
            return;
        }

        // Snapshot both lists so handlers may register or unsubscribe
        // (including themselves) while dispatch is running.
        let typed: Vec<Handler> = self
            .inner
            .typed
            .get(&envelope.event)
            .map(|entry| entry.value().iter().map(|(_, h)| h.clone()).collect())
            .unwrap_or_default();
        let wildcard: Vec<Handler> = self
            .inner
            .wildcard
            .read()
            .iter()
            .map(|(_, h)| h.clone())
            .collect();

        tracing::trace!(
            event = %envelope.event,
            typed = typed.len(),
            wildcard = wildcard.len(),
            "Dispatching event"
        );

        for handler in typed.iter().chain(wildcard.iter()) {
            Self::invoke(envelope, handler);
        }
    }

    // One faulty handler must not suppress delivery to the rest.
    fn invoke(envelope: &EventEnvelope, handler: &Handler) {
        if catch_unwind(AssertUnwindSafe(|| handler(envelope))).is_err() {
            tracing::error!(event = %envelope.event, "Event handler panicked; continuing dispatch");
        }
    }

    /// Number of handlers registered for one event type
    #[must_use]
    pub fn handler_count(&self, event: &EventType) -> usize {
        self.inner.typed.get(event).map_or(0, |entry| entry.len())
    }

    /// Number of wildcard handlers
    #[must_use]
    pub fn wildcard_count(&self) -> usize {
        self.inner.wildcard.read().len()
    }
}

impl std::fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRegistry")
            .field("types", &self.inner.typed.len())
            .field("wildcard", &self.inner.wildcard.read().len())
            .finish()
    }
}

/// Disposer for one handler registration
///
/// Removal is explicit via [`HandlerGuard::unsubscribe`]; dropping the guard
/// leaves the handler registered. Safe to call from inside the handler it
/// guards.
#[derive(Clone)]
pub struct HandlerGuard {
    registry: Weak<RegistryInner>,
    event: Option<EventType>,
    id: HandlerId,
}

impl HandlerGuard {
    /// Remove the handler this guard was returned for
    ///
    /// Idempotent; a second call is a no-op.
    pub fn unsubscribe(&self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };

        match &self.event {
            Some(event) => {
                if let Some(mut entry) = registry.typed.get_mut(event) {
                    entry.retain(|(id, _)| *id != self.id);
                }
            }
            None => {
                registry.wildcard.write().retain(|(id, _)| *id != self.id);
            }
        }
    }
}

impl std::fmt::Debug for HandlerGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerGuard")
            .field("event", &self.event)
            .field("id", &self.id)
            .finish()
    }
}
