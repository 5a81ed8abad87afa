//! Typed in-process pub/sub with last-event replay.
//!
//! Screens subscribe by event kind and may mount after the event they care
//! about has already fired, so the registry keeps the single latest payload
//! per kind for on-demand replay.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, Weak};

use log::warn;
use serde_json::Value;

use super::event::EventKind;

/// Subscriber callback. Held behind an `Arc` so the same handle subscribed
/// twice can be recognized and delivered once.
pub type ListenerFn = Arc<dyn Fn(&Value) + Send + Sync>;

#[derive(Default)]
struct RegistryState {
    listeners: HashMap<EventKind, Vec<ListenerFn>>,
    last_events: HashMap<EventKind, Value>,
}

/// Guard returned by [`ListenerRegistry::subscribe`]. The subscription stays
/// active until `unsubscribe` is called; dropping the guard without calling
/// it leaves the listener registered for the process lifetime.
pub struct Subscription {
    kind: EventKind,
    listener: ListenerFn,
    state: Weak<Mutex<RegistryState>>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        let Some(state) = self.state.upgrade() else { return };
        let mut state = state.lock().unwrap();
        if let Some(set) = state.listeners.get_mut(&self.kind) {
            set.retain(|l| !same_listener(l, &self.listener));
            if set.is_empty() {
                state.listeners.remove(&self.kind);
            }
        }
    }
}

#[derive(Clone, Default)]
pub struct ListenerRegistry {
    state: Arc<Mutex<RegistryState>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for a kind. Set semantics: subscribing the same
    /// handle twice for the same kind does not duplicate delivery.
    pub fn subscribe(&self, kind: EventKind, listener: ListenerFn) -> Subscription {
        let mut state = self.state.lock().unwrap();
        let set = state.listeners.entry(kind.clone()).or_default();
        if !set.iter().any(|l| same_listener(l, &listener)) {
            set.push(Arc::clone(&listener));
        }
        Subscription { kind, listener, state: Arc::downgrade(&self.state) }
    }

    /// Deliver a payload to every listener currently registered for `kind`.
    ///
    /// The last-event cache is updated before delivery, so a subscriber can
    /// never observe a cache state older than the event it was just handed.
    /// A panicking listener is logged and skipped; the rest of the fan-out
    /// still runs. Listeners added during delivery do not receive the
    /// in-flight event.
    pub fn emit(&self, kind: &EventKind, payload: Value) {
        let snapshot: Vec<ListenerFn> = {
            let mut state = self.state.lock().unwrap();
            state.last_events.insert(kind.clone(), payload.clone());
            state.listeners.get(kind).cloned().unwrap_or_default()
        };

        for listener in snapshot {
            if catch_unwind(AssertUnwindSafe(|| listener(&payload))).is_err() {
                warn!("listener for '{kind}' panicked; continuing fan-out");
            }
        }
    }

    /// Most recent payload emitted for `kind`, if any.
    pub fn last_event(&self, kind: &EventKind) -> Option<Value> {
        self.state.lock().unwrap().last_events.get(kind).cloned()
    }

    /// Consume the cached payload for `kind`.
    pub fn clear_last_event(&self, kind: &EventKind) {
        self.state.lock().unwrap().last_events.remove(kind);
    }

    #[cfg(test)]
    fn listener_count(&self, kind: &EventKind) -> usize {
        self.state.lock().unwrap().listeners.get(kind).map_or(0, Vec::len)
    }
}

/// Identity comparison on the closure allocation, ignoring the vtable half
/// of the fat pointer.
fn same_listener(a: &ListenerFn, b: &ListenerFn) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const u8, Arc::as_ptr(b) as *const u8)
}
