//! Ordered event-listener registry with handle-based removal.

use crate::bridge::protocol::ChannelEventKind;

/// Payload delivered to event listeners: either a bare channel lifecycle
/// notification or the transported data object that matched.
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    Lifecycle(ChannelEventKind),
    Data(serde_json::Value),
}

impl ChannelEvent {
    pub fn as_data(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Data(value) => Some(value),
            Self::Lifecycle(_) => None,
        }
    }
}

/// Callback invoked for every broadcast whose event type matches.
pub type EventCallback = Box<dyn FnMut(&ChannelEvent) + Send + 'static>;

/// Handle identifying one registration.
///
/// Every `add` returns a fresh handle, so registering the same closure
/// source twice yields two independent entries and takes two removals to
/// fully detach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

struct ListenerEntry {
    id: Subscription,
    event: String,
    callback: EventCallback,
}

/// Ordered collection of (event type, callback) registrations.
#[derive(Default)]
pub struct ListenerRegistry {
    entries: Vec<ListenerEntry>,
    next_id: u64,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a listener for `event`. No deduplication.
    pub fn add(&mut self, event: impl Into<String>, callback: EventCallback) -> Subscription {
        let id = Subscription(self.next_id);
        self.next_id += 1;
        self.entries.push(ListenerEntry {
            id,
            event: event.into(),
            callback,
        });
        id
    }

    /// Remove the entry registered under `subscription`.
    ///
    /// Returns `false` when no such entry exists; a removal miss is not an
    /// error.
    pub fn remove(&mut self, subscription: Subscription) -> bool {
        match self.entries.iter().position(|e| e.id == subscription) {
            Some(index) => {
                let _ = self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Invoke every listener registered for `event`, in registration order,
    /// passing `payload`.
    pub fn broadcast(&mut self, event: &str, payload: &ChannelEvent) {
        for entry in self.entries.iter_mut().filter(|e| e.event == event) {
            (entry.callback)(payload);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recording_callback(log: &Arc<Mutex<Vec<String>>>, tag: &str) -> EventCallback {
        let log = Arc::clone(log);
        let tag = tag.to_string();
        Box::new(move |_| {
            log.lock().unwrap().push(tag.clone());
        })
    }

    #[test]
    fn broadcast_matches_type_in_registration_order() {
        let mut registry = ListenerRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let _ = registry.add("status", recording_callback(&log, "first"));
        let _ = registry.add("crash", recording_callback(&log, "other"));
        let _ = registry.add("status", recording_callback(&log, "second"));

        registry.broadcast(
            "status",
            &ChannelEvent::Data(serde_json::json!({"type": "status"})),
        );

        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn broadcast_without_match_invokes_nothing() {
        let mut registry = ListenerRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let _ = registry.add("status", recording_callback(&log, "status"));

        registry.broadcast("load", &ChannelEvent::Lifecycle(ChannelEventKind::Load));

        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn duplicate_registrations_both_fire() {
        let mut registry = ListenerRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let first = registry.add("status", recording_callback(&log, "dup"));
        let second = registry.add("status", recording_callback(&log, "dup"));
        assert_ne!(first, second);

        registry.broadcast("status", &ChannelEvent::Lifecycle(ChannelEventKind::Message));
        assert_eq!(log.lock().unwrap().len(), 2);
    }

    #[test]
    fn remove_detaches_one_entry_per_call() {
        let mut registry = ListenerRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let first = registry.add("status", recording_callback(&log, "a"));
        let second = registry.add("status", recording_callback(&log, "b"));

        assert!(registry.remove(first));
        registry.broadcast("status", &ChannelEvent::Lifecycle(ChannelEventKind::Message));
        assert_eq!(*log.lock().unwrap(), vec!["b"]);

        assert!(registry.remove(second));
        assert!(registry.is_empty());
    }

    #[test]
    fn remove_miss_is_silent_noop() {
        let mut registry = ListenerRegistry::new();
        let subscription = registry.add("status", Box::new(|_| {}));
        assert!(registry.remove(subscription));
        assert!(!registry.remove(subscription));
    }

    #[test]
    fn clear_empties_registry() {
        let mut registry = ListenerRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let _ = registry.add("status", recording_callback(&log, "gone"));
        let _ = registry.add("load", recording_callback(&log, "gone"));

        registry.clear();
        assert!(registry.is_empty());

        registry.broadcast("status", &ChannelEvent::Lifecycle(ChannelEventKind::Message));
        assert!(log.lock().unwrap().is_empty());
    }
}
