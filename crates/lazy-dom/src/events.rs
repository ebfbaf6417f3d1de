//! Custom events dispatched on the document

use std::collections::HashMap;

/// Event listener callback
pub type EventListener = Box<dyn FnMut(&CustomEvent)>;

/// A `CustomEvent` with a JSON detail payload
#[derive(Debug, Clone, PartialEq)]
pub struct CustomEvent {
    pub event_type: String,
    pub detail: serde_json::Value,
}

impl CustomEvent {
    pub fn new(event_type: &str, detail: serde_json::Value) -> Self {
        Self {
            event_type: event_type.to_string(),
            detail,
        }
    }
}

/// Listener registry keyed by event type
#[derive(Default)]
pub(crate) struct EventListeners {
    listeners: HashMap<String, Vec<EventListener>>,
}

impl EventListeners {
    pub(crate) fn add(&mut self, event_type: &str, listener: EventListener) {
        self.listeners
            .entry(event_type.to_string())
            .or_default()
            .push(listener);
    }

    /// Invoke listeners in registration order, returns how many ran
    pub(crate) fn dispatch(&mut self, event: &CustomEvent) -> usize {
        match self.listeners.get_mut(&event.event_type) {
            Some(list) => {
                for listener in list.iter_mut() {
                    listener(event);
                }
                list.len()
            }
            None => 0,
        }
    }

    pub(crate) fn count(&self) -> usize {
        self.listeners.values().map(Vec::len).sum()
    }
}

impl std::fmt::Debug for EventListeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventListeners")
            .field("count", &self.count())
            .finish()
    }
}
