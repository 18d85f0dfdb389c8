use std::collections::HashMap;
use std::fmt;

use crate::dom::{Dom, NodeId, truncate_chars};
use crate::events::{Event, EventTarget, ListenerStore};
use crate::html::parse_html;
use crate::rng::DeterministicRng;
use crate::scheduler::SchedulerState;
use crate::{Error, Result};

mod access;
mod actions;
mod assertions;
mod dispatch;
mod observers;
mod platform;
mod timers;

pub use observers::{IntersectionEntry, IntersectionOptions, ObserverId};
pub use platform::{ConsoleLevel, ConsoleMessage, ScrollBehavior, ScrollRequest};

use observers::ObserverRegistry;
use platform::{LayoutBox, PlatformMockState, TraceState, Viewport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Loading,
    Interactive,
    Complete,
}

/// A loaded document plus the browser surface the site behaviors use:
/// events, a virtual clock, viewport/layout, media queries, intersection
/// observers and a console.
pub struct Page {
    pub(crate) dom: Dom,
    pub(crate) listeners: ListenerStore,
    pub(crate) scheduler: SchedulerState,
    pub(crate) document_url: String,
    pub(crate) ready_state: ReadyState,
    pub(crate) active_element: Option<NodeId>,
    pub(crate) viewport: Viewport,
    pub(crate) layout: HashMap<NodeId, LayoutBox>,
    pub(crate) platform_mocks: PlatformMockState,
    pub(crate) observers: ObserverRegistry,
    pub(crate) rng: DeterministicRng,
    pub(crate) trace_state: TraceState,
}

impl Page {
    pub fn from_html(html: &str) -> Result<Self> {
        Self::from_html_with_url("http://localhost/", html)
    }

    pub fn from_html_with_url(url: &str, html: &str) -> Result<Self> {
        let dom = parse_html(html)?;
        Ok(Self {
            dom,
            listeners: ListenerStore::default(),
            scheduler: SchedulerState::default(),
            document_url: url.to_string(),
            ready_state: ReadyState::Loading,
            active_element: None,
            viewport: Viewport::default(),
            layout: HashMap::new(),
            platform_mocks: PlatformMockState::default(),
            observers: ObserverRegistry::default(),
            rng: DeterministicRng::default(),
            trace_state: TraceState::default(),
        })
    }

    pub fn url(&self) -> &str {
        &self.document_url
    }

    /// Path component of the document URL (`/` when absent).
    pub fn location_path(&self) -> String {
        let without_scheme = self
            .document_url
            .split_once("://")
            .map_or(self.document_url.as_str(), |(_, rest)| rest);
        let path = without_scheme
            .find('/')
            .map_or("/", |pos| &without_scheme[pos..]);
        let end = path.find(['?', '#']).unwrap_or(path.len());
        path[..end].to_string()
    }

    pub fn ready_state(&self) -> ReadyState {
        self.ready_state
    }

    /// Parsing done: fires `DOMContentLoaded` on the document, then `load` on
    /// the window. Calling it again is a no-op.
    pub fn finish_loading(&mut self) -> Result<()> {
        if self.ready_state != ReadyState::Loading {
            return Ok(());
        }
        self.ready_state = ReadyState::Interactive;
        let document = EventTarget::Node(self.dom.root);
        self.dispatch_event(Event::new("DOMContentLoaded", document))?;
        self.ready_state = ReadyState::Complete;
        self.dispatch_event(Event::new("load", EventTarget::Window))?;
        Ok(())
    }

    pub(crate) fn select_one(&self, selector: &str) -> Result<NodeId> {
        self.dom
            .query_selector(selector)?
            .ok_or_else(|| Error::SelectorNotFound(selector.to_string()))
    }

    pub(crate) fn node_snippet(&self, node_id: NodeId) -> String {
        truncate_chars(&self.dom.dump_node(node_id), 200)
    }

    pub(crate) fn node_label(&self, node_id: NodeId) -> String {
        let Some(tag) = self.dom.tag_name(node_id) else {
            return "#document".into();
        };
        match self.dom.attr(node_id, "id") {
            Some(id) if !id.is_empty() => format!("{tag}#{id}"),
            _ => match self.dom.attr(node_id, "class") {
                Some(class) if !class.is_empty() => {
                    format!("{tag}.{}", class.split_whitespace().collect::<Vec<_>>().join("."))
                }
                _ => tag.to_string(),
            },
        }
    }

    pub(crate) fn target_label(&self, target: EventTarget) -> String {
        match target {
            EventTarget::Window => "window".into(),
            EventTarget::Node(node) => self.node_label(node),
        }
    }
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("url", &self.document_url)
            .field("ready_state", &self.ready_state)
            .field("now_ms", &self.scheduler.now_ms)
            .field("pending_timers", &self.scheduler.task_queue.len())
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}
