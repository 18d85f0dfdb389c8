use std::rc::Rc;

use super::Page;
use super::dispatch::UncaughtKind;
use crate::Result;
use crate::dom::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(usize);

/// Observer configuration relative to the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionOptions {
    /// Visible fraction of the target required to count as intersecting.
    /// `0.0` means any visible pixel.
    pub threshold: f64,
    /// Grows (positive) or shrinks (negative) the viewport at the bottom edge.
    pub root_margin_bottom: i64,
}

impl Default for IntersectionOptions {
    fn default() -> Self {
        Self {
            threshold: 0.0,
            root_margin_bottom: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionEntry {
    pub target: NodeId,
    pub is_intersecting: bool,
    pub intersection_ratio: f64,
}

pub(crate) type ObserverCallback =
    Rc<dyn Fn(&mut Page, ObserverId, &[IntersectionEntry]) -> Result<()>>;

struct ObservedTarget {
    node: NodeId,
    last_intersecting: Option<bool>,
}

struct IntersectionObserverState {
    id: ObserverId,
    options: IntersectionOptions,
    callback: ObserverCallback,
    targets: Vec<ObservedTarget>,
}

#[derive(Default)]
pub(crate) struct ObserverRegistry {
    observers: Vec<IntersectionObserverState>,
    next_id: usize,
}

impl ObserverRegistry {
    fn get_mut(&mut self, id: ObserverId) -> Option<&mut IntersectionObserverState> {
        self.observers.iter_mut().find(|observer| observer.id == id)
    }
}

impl Page {
    pub fn create_intersection_observer<F>(
        &mut self,
        options: IntersectionOptions,
        callback: F,
    ) -> ObserverId
    where
        F: Fn(&mut Page, ObserverId, &[IntersectionEntry]) -> Result<()> + 'static,
    {
        let id = ObserverId(self.observers.next_id);
        self.observers.next_id += 1;
        self.observers.observers.push(IntersectionObserverState {
            id,
            options,
            callback: Rc::new(callback),
            targets: Vec::new(),
        });
        id
    }

    /// Starts observing `node`; its initial entry is delivered right away.
    pub fn observe_intersection(&mut self, observer: ObserverId, node: NodeId) -> Result<()> {
        let Some(state) = self.observers.get_mut(observer) else {
            return Ok(());
        };
        if state.targets.iter().any(|target| target.node == node) {
            return Ok(());
        }
        state.targets.push(ObservedTarget {
            node,
            last_intersecting: None,
        });
        self.deliver_intersections(observer)
    }

    pub fn unobserve(&mut self, observer: ObserverId, node: NodeId) {
        if let Some(state) = self.observers.get_mut(observer) {
            state.targets.retain(|target| target.node != node);
        }
    }

    pub fn disconnect_observer(&mut self, observer: ObserverId) {
        self.observers
            .observers
            .retain(|state| state.id != observer);
    }

    pub fn observed_count(&self, observer: ObserverId) -> usize {
        self.observers
            .observers
            .iter()
            .find(|state| state.id == observer)
            .map_or(0, |state| state.targets.len())
    }

    pub(crate) fn evaluate_intersections(&mut self) -> Result<()> {
        let ids = self
            .observers
            .observers
            .iter()
            .map(|state| state.id)
            .collect::<Vec<_>>();
        for id in ids {
            self.deliver_intersections(id)?;
        }
        Ok(())
    }

    fn deliver_intersections(&mut self, observer: ObserverId) -> Result<()> {
        let Some(state) = self.observers.observers.iter().find(|s| s.id == observer) else {
            return Ok(());
        };
        let options = state.options;
        let callback = state.callback.clone();
        let candidates = state
            .targets
            .iter()
            .map(|target| (target.node, target.last_intersecting))
            .collect::<Vec<_>>();

        let mut entries = Vec::new();
        for (node, last) in candidates {
            if !self.dom.is_connected(node) {
                continue;
            }
            let entry = self.intersection_entry(node, options);
            if last != Some(entry.is_intersecting) {
                entries.push(entry);
            }
        }
        if entries.is_empty() {
            return Ok(());
        }
        if let Some(state) = self.observers.get_mut(observer) {
            for entry in &entries {
                if let Some(target) = state.targets.iter_mut().find(|t| t.node == entry.target) {
                    target.last_intersecting = Some(entry.is_intersecting);
                }
            }
        }
        if let Err(err) = callback(self, observer, &entries) {
            self.report_uncaught(UncaughtKind::Error, &err.to_string())?;
        }
        Ok(())
    }

    fn intersection_entry(&self, node: NodeId, options: IntersectionOptions) -> IntersectionEntry {
        let layout = self.layout_of(node);
        let view_top = self.viewport.scroll_y;
        let view_bottom = view_top + self.viewport.height + options.root_margin_bottom;
        let (is_intersecting, ratio) = if layout.height == 0 {
            let inside = layout.top >= view_top && layout.top < view_bottom;
            (inside, if inside { 1.0 } else { 0.0 })
        } else {
            let visible = (layout.top + layout.height).min(view_bottom) - layout.top.max(view_top);
            let ratio = visible.max(0) as f64 / layout.height as f64;
            let intersecting = if options.threshold <= 0.0 {
                visible > 0
            } else {
                ratio >= options.threshold
            };
            (intersecting, ratio)
        };
        IntersectionEntry {
            target: node,
            is_intersecting,
            intersection_ratio: ratio,
        }
    }
}
