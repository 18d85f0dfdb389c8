use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::Result;
use crate::dom::NodeId;
use crate::page::Page;

/// Where a listener is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTarget {
    Window,
    Node(NodeId),
}

#[derive(Debug, Clone)]
pub struct Event {
    pub event_type: String,
    pub target: EventTarget,
    pub current_target: EventTarget,
    /// Key name for keyboard events (`"Enter"`, `" "`, `"Escape"`).
    pub key: Option<String>,
    /// Error message or rejection reason for `error` / `unhandledrejection`.
    pub detail: Option<String>,
    pub(crate) default_prevented: bool,
    pub(crate) propagation_stopped: bool,
    pub(crate) immediate_propagation_stopped: bool,
}

impl Event {
    pub(crate) fn new(event_type: &str, target: EventTarget) -> Self {
        Self {
            event_type: event_type.to_string(),
            target,
            current_target: target,
            key: None,
            detail: None,
            default_prevented: false,
            propagation_stopped: false,
            immediate_propagation_stopped: false,
        }
    }

    pub(crate) fn with_key(mut self, key: &str) -> Self {
        self.key = Some(key.to_string());
        self
    }

    pub(crate) fn with_detail(mut self, detail: &str) -> Self {
        self.detail = Some(detail.to_string());
        self
    }

    /// Target element, `None` when the event was dispatched on the window.
    pub fn target_node(&self) -> Option<NodeId> {
        match self.target {
            EventTarget::Node(node) => Some(node),
            EventTarget::Window => None,
        }
    }

    pub fn key_is(&self, key: &str) -> bool {
        self.key.as_deref() == Some(key)
    }

    /// Enter or Space, the keys that activate buttons and links.
    pub fn is_activation_key(&self) -> bool {
        self.key_is("Enter") || self.key_is(" ")
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn stop_immediate_propagation(&mut self) {
        self.propagation_stopped = true;
        self.immediate_propagation_stopped = true;
    }
}

/// Events that only fire at their target.
pub(crate) fn bubbles(event_type: &str) -> bool {
    !matches!(
        event_type,
        "mouseenter" | "mouseleave" | "focus" | "blur" | "load"
    )
}

pub(crate) type ListenerFn = Rc<dyn Fn(&mut Page, &mut Event) -> Result<()>>;

#[derive(Clone)]
pub(crate) struct Listener {
    pub(crate) capture: bool,
    pub(crate) callback: ListenerFn,
}

#[derive(Default, Clone)]
pub(crate) struct ListenerStore {
    map: HashMap<EventTarget, HashMap<String, Vec<Listener>>>,
}

impl ListenerStore {
    pub(crate) fn add(&mut self, target: EventTarget, event: String, listener: Listener) {
        self.map
            .entry(target)
            .or_default()
            .entry(event)
            .or_default()
            .push(listener);
    }

    /// Snapshot in registration order, so listeners added during dispatch
    /// wait for the next event.
    pub(crate) fn get(&self, target: EventTarget, event: &str, capture: bool) -> Vec<Listener> {
        self.map
            .get(&target)
            .and_then(|events| events.get(event))
            .map(|listeners| {
                listeners
                    .iter()
                    .filter(|listener| listener.capture == capture)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn count(&self, target: EventTarget, event: &str) -> usize {
        self.map
            .get(&target)
            .and_then(|events| events.get(event))
            .map_or(0, Vec::len)
    }
}

impl fmt::Debug for ListenerStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total: usize = self
            .map
            .values()
            .flat_map(|events| events.values())
            .map(Vec::len)
            .sum();
        f.debug_struct("ListenerStore")
            .field("targets", &self.map.len())
            .field("listeners", &total)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_immediate_propagation_also_stops_propagation() {
        let mut event = Event::new("click", EventTarget::Window);
        event.stop_propagation();
        assert!(event.propagation_stopped);
        assert!(!event.immediate_propagation_stopped);

        let mut event = Event::new("click", EventTarget::Window);
        event.stop_immediate_propagation();
        assert!(event.propagation_stopped);
        assert!(event.immediate_propagation_stopped);
        assert!(!event.default_prevented());
    }
}
