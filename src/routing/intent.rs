use std::sync::Mutex;

use serde_json::Value;

use super::event::EventKind;
use super::rules::Destination;

/// A deferred navigation+event action, queued when a notification could not
/// be routed immediately (no navigation surface, no user, or wrong role).
#[derive(Debug, Clone, PartialEq)]
pub struct PendingIntent {
    pub destination: Destination,
    pub params: Value,
    pub kind: EventKind,
    pub payload: Value,
}

/// Single-slot holder for the most recent undeliverable routing attempt.
///
/// Last-write-wins on purpose: only the latest notification context is
/// actionable, and navigating with a stale trip or driver id would be worse
/// than dropping the older intent.
#[derive(Default)]
pub struct IntentSlot {
    slot: Mutex<Option<PendingIntent>>,
}

impl IntentSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unconditional overwrite; any previously stored intent is dropped.
    pub fn store(&self, intent: PendingIntent) {
        *self.slot.lock().unwrap() = Some(intent);
    }

    /// Remove and return the stored intent, if any.
    pub fn take(&self) -> Option<PendingIntent> {
        self.slot.lock().unwrap().take()
    }

    /// Idempotent.
    pub fn clear(&self) {
        *self.slot.lock().unwrap() = None;
    }

    /// Read-only view for diagnostics.
    pub fn peek(&self) -> Option<PendingIntent> {
        self.slot.lock().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn intent(dest: Destination, trip: &str) -> PendingIntent {
        PendingIntent {
            destination: dest,
            params: json!({"tripId": trip}),
            kind: EventKind::DbsArrival,
            payload: json!({"tripId": trip}),
        }
    }

    #[test]
    fn later_intent_overwrites_earlier() {
        let slot = IntentSlot::new();
        slot.store(intent(Destination::Decanting, "T1"));
        slot.store(intent(Destination::Operations, "T2"));

        let stored = slot.peek().unwrap();
        assert_eq!(stored.destination, Destination::Operations);
        assert_eq!(stored.params["tripId"], json!("T2"));
    }

    #[test]
    fn take_empties_the_slot() {
        let slot = IntentSlot::new();
        slot.store(intent(Destination::Decanting, "T1"));
        assert!(slot.take().is_some());
        assert!(slot.take().is_none());
        assert!(slot.peek().is_none());
    }

    #[test]
    fn clear_is_idempotent() {
        let slot = IntentSlot::new();
        slot.clear();
        slot.store(intent(Destination::StockRequests, "T3"));
        slot.clear();
        slot.clear();
        assert!(slot.peek().is_none());
    }

    #[test]
    fn peek_does_not_consume() {
        let slot = IntentSlot::new();
        slot.store(intent(Destination::Decanting, "T1"));
        assert!(slot.peek().is_some());
        assert!(slot.peek().is_some());
    }
}
