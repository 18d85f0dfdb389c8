use std::rc::Rc;

use super::Page;
use crate::Result;
use crate::dom::NodeId;
use crate::events::{Event, EventTarget, Listener, bubbles};

/// How an uncaught failure is reported on the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UncaughtKind {
    Error,
    Rejection,
}

impl UncaughtKind {
    fn event_type(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Rejection => "unhandledrejection",
        }
    }
}

impl Page {
    pub fn document(&self) -> EventTarget {
        EventTarget::Node(self.dom.root)
    }

    pub fn add_event_listener<F>(&mut self, target: EventTarget, event_type: &str, callback: F)
    where
        F: Fn(&mut Page, &mut Event) -> Result<()> + 'static,
    {
        self.add_event_listener_with_capture(target, event_type, false, callback);
    }

    pub fn add_event_listener_with_capture<F>(
        &mut self,
        target: EventTarget,
        event_type: &str,
        capture: bool,
        callback: F,
    ) where
        F: Fn(&mut Page, &mut Event) -> Result<()> + 'static,
    {
        self.listeners.add(
            target,
            event_type.to_string(),
            Listener {
                capture,
                callback: Rc::new(callback),
            },
        );
    }

    pub fn listener_count(&self, target: EventTarget, event_type: &str) -> usize {
        self.listeners.count(target, event_type)
    }

    pub(crate) fn dispatch_on(&mut self, node: NodeId, event_type: &str) -> Result<Event> {
        self.dispatch_event(Event::new(event_type, EventTarget::Node(node)))
    }

    /// Runs capture, target and bubble phases. Listener failures are reported
    /// as uncaught errors and do not stop the dispatch.
    pub(crate) fn dispatch_event(&mut self, mut event: Event) -> Result<Event> {
        let node = match event.target {
            EventTarget::Window => {
                self.invoke_listeners(EventTarget::Window, &mut event, false)?;
                self.invoke_listeners(EventTarget::Window, &mut event, true)?;
                self.trace_event_done(&event, "completed");
                return Ok(event);
            }
            EventTarget::Node(node) => node,
        };

        let mut path = Vec::new();
        let mut cursor = self.dom.parent(node);
        while let Some(ancestor) = cursor {
            path.push(ancestor);
            cursor = self.dom.parent(ancestor);
        }
        path.reverse();

        for ancestor in &path {
            self.invoke_listeners(EventTarget::Node(*ancestor), &mut event, true)?;
            if event.propagation_stopped {
                self.trace_event_done(&event, "propagation_stopped");
                return Ok(event);
            }
        }

        for capture in [true, false] {
            self.invoke_listeners(EventTarget::Node(node), &mut event, capture)?;
            if event.propagation_stopped {
                self.trace_event_done(&event, "propagation_stopped");
                return Ok(event);
            }
        }

        if bubbles(&event.event_type) {
            for ancestor in path.iter().rev() {
                self.invoke_listeners(EventTarget::Node(*ancestor), &mut event, false)?;
                if event.propagation_stopped {
                    self.trace_event_done(&event, "propagation_stopped");
                    return Ok(event);
                }
            }
        }

        self.trace_event_done(&event, "completed");
        Ok(event)
    }

    fn invoke_listeners(
        &mut self,
        current: EventTarget,
        event: &mut Event,
        capture: bool,
    ) -> Result<()> {
        event.current_target = current;
        for listener in self.listeners.get(current, &event.event_type, capture) {
            if self.trace_state.enabled && self.trace_state.events {
                let phase = if capture { "capture" } else { "bubble" };
                let line = format!(
                    "[event] {} target={} current={} phase={} default_prevented={}",
                    event.event_type,
                    self.target_label(event.target),
                    self.target_label(current),
                    phase,
                    event.default_prevented
                );
                self.trace_event_line(line);
            }
            if let Err(err) = (listener.callback)(self, event) {
                self.report_uncaught(UncaughtKind::Error, &err.to_string())?;
            }
            if event.immediate_propagation_stopped {
                break;
            }
        }
        Ok(())
    }

    /// Surfaces a failure nobody handled as a window `error` or
    /// `unhandledrejection` event. Failures raised while reporting are only
    /// recorded.
    pub(crate) fn report_uncaught(&mut self, kind: UncaughtKind, message: &str) -> Result<()> {
        tracing::warn!(kind = kind.event_type(), %message, "uncaught failure");
        self.platform_mocks
            .uncaught
            .push(format!("{}: {message}", kind.event_type()));
        if self.platform_mocks.reporting_uncaught {
            return Ok(());
        }
        self.platform_mocks.reporting_uncaught = true;
        let event = Event::new(kind.event_type(), EventTarget::Window).with_detail(message);
        let outcome = self.dispatch_event(event);
        self.platform_mocks.reporting_uncaught = false;
        outcome.map(|_| ())
    }

    /// Failures that reached the window since the last call.
    pub fn take_uncaught_errors(&mut self) -> Vec<String> {
        std::mem::take(&mut self.platform_mocks.uncaught)
    }

    pub(crate) fn focus_node(&mut self, node: NodeId) -> Result<()> {
        if self.dom.disabled(node) || self.active_element == Some(node) {
            return Ok(());
        }
        if let Some(current) = self.active_element {
            self.blur_node(current)?;
        }
        self.active_element = Some(node);
        self.dispatch_on(node, "focus")?;
        self.dispatch_on(node, "focusin")?;
        Ok(())
    }

    pub(crate) fn blur_node(&mut self, node: NodeId) -> Result<()> {
        if self.active_element != Some(node) {
            return Ok(());
        }
        self.dispatch_on(node, "blur")?;
        self.dispatch_on(node, "focusout")?;
        self.active_element = None;
        Ok(())
    }

    pub fn active_element(&self) -> Option<NodeId> {
        self.active_element
    }

    fn trace_event_done(&mut self, event: &Event, outcome: &str) {
        if !(self.trace_state.enabled && self.trace_state.events) {
            return;
        }
        let line = format!(
            "[event] done {} target={} outcome={} default_prevented={}",
            event.event_type,
            self.target_label(event.target),
            outcome,
            event.default_prevented
        );
        self.trace_event_line(line);
    }
}
