//! In-process publish/subscribe keyed by event name.
//!
//! The bus is an owned registry: build one per session, hand clones of it to
//! whoever needs to publish or subscribe, and call [`EventBus::shutdown`] to
//! tear it down. There is no process-wide instance.
//!
//! Dispatch is synchronous on the caller's thread, in registration order per
//! event name. The handler list is snapshotted before dispatch, so handlers
//! may subscribe, unsubscribe or emit again without deadlocking.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::events::{EventKind, SimEvent};

type Handler = Arc<dyn Fn(&SimEvent) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    handlers: HashMap<EventKind, Vec<(u64, Handler)>>,
    closed: bool,
}

/// Handle returned by [`EventBus::on`].
///
/// Dropping it leaves the handler registered; call
/// [`Subscription::unsubscribe`] to remove it.
#[derive(Debug)]
pub struct Subscription {
    registry: Weak<Mutex<Registry>>,
    kind: EventKind,
    id: u64,
}

impl Subscription {
    /// The event name this subscription listens to.
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Remove the handler. Returns false if it was already gone (bus shut
    /// down or dropped).
    pub fn unsubscribe(self) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            return false;
        };
        let mut registry = registry.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(list) = registry.handlers.get_mut(&self.kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|(id, _)| *id != self.id);
        before != list.len()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("next_id", &self.next_id)
            .field("kinds", &self.handlers.len())
            .field("closed", &self.closed)
            .finish()
    }
}

/// The event bus. Cloning yields another handle to the same registry.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    registry: Arc<Mutex<Registry>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a handler for one event name.
    pub fn on<F>(&self, kind: EventKind, handler: F) -> Subscription
    where
        F: Fn(&SimEvent) + Send + Sync + 'static,
    {
        let mut registry = self.registry();
        let id = registry.next_id;
        registry.next_id += 1;
        if !registry.closed {
            registry
                .handlers
                .entry(kind)
                .or_default()
                .push((id, Arc::new(handler)));
        }
        Subscription {
            registry: Arc::downgrade(&self.registry),
            kind,
            id,
        }
    }

    /// Invoke every handler registered for the event's name, then return.
    ///
    /// Emitting with no subscribers is a no-op.
    pub fn emit(&self, event: SimEvent) {
        let kind = event.kind();
        let handlers: Vec<Handler> = {
            let registry = self.registry();
            match registry.handlers.get(&kind) {
                Some(list) => list.iter().map(|(_, h)| Arc::clone(h)).collect(),
                None => return,
            }
        };

        tracing::trace!(event = kind.name(), subscribers = handlers.len(), "emit");
        for handler in handlers {
            handler(&event);
        }
    }

    /// Number of handlers currently registered for a name.
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.registry().handlers.get(&kind).map_or(0, Vec::len)
    }

    /// Drop every handler and refuse new ones.
    pub fn shutdown(&self) {
        let mut registry = self.registry();
        registry.handlers.clear();
        registry.closed = true;
        tracing::debug!("event bus shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.registry().closed
    }
}

/// Records every event emitted on a bus, in order.
///
/// Handy for tests and for headless tools that dump a run's event stream.
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    events: Arc<Mutex<Vec<SimEvent>>>,
}

impl EventRecorder {
    /// Subscribe to every event name on `bus`.
    pub fn attach(bus: &EventBus) -> Self {
        let recorder = Self::default();
        for kind in EventKind::ALL {
            let sink = Arc::clone(&recorder.events);
            let _ = bus.on(kind, move |event| {
                sink.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(event.clone());
            });
        }
        recorder
    }

    pub fn events(&self) -> Vec<SimEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.events().iter().map(SimEvent::kind).collect()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.events().iter().filter(|e| e.kind() == kind).count()
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
