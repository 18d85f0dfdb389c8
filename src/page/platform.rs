use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use super::Page;
use super::dispatch::UncaughtKind;
use crate::dom::NodeId;
use crate::events::{Event, EventTarget};
use crate::rng::DeterministicRng;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Viewport {
    pub(crate) scroll_y: i64,
    pub(crate) height: i64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            scroll_y: 0,
            height: 800,
        }
    }
}

/// Document-relative vertical box of an element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct LayoutBox {
    pub(crate) top: i64,
    pub(crate) height: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleLevel {
    Log,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleMessage {
    pub level: ConsoleLevel,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBehavior {
    Auto,
    Smooth,
}

/// A `window.scrollTo` issued by page behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollRequest {
    pub top: i64,
    pub behavior: ScrollBehavior,
}

pub(crate) type MediaListener = Rc<dyn Fn(&mut Page, bool) -> Result<()>>;

#[derive(Default)]
pub(crate) struct PlatformMockState {
    pub(crate) media_features: HashMap<String, bool>,
    pub(crate) media_listeners: Vec<(String, MediaListener)>,
    pub(crate) console: Vec<ConsoleMessage>,
    pub(crate) scroll_requests: Vec<ScrollRequest>,
    pub(crate) uncaught: Vec<String>,
    pub(crate) reporting_uncaught: bool,
}

#[derive(Debug)]
pub(crate) struct TraceState {
    pub(crate) enabled: bool,
    pub(crate) events: bool,
    pub(crate) timers: bool,
    pub(crate) logs: VecDeque<String>,
    pub(crate) log_limit: usize,
}

impl Default for TraceState {
    fn default() -> Self {
        Self {
            enabled: false,
            events: true,
            timers: true,
            logs: VecDeque::new(),
            log_limit: 10_000,
        }
    }
}

fn normalize_media_query(query: &str) -> String {
    query
        .trim()
        .trim_start_matches('(')
        .trim_end_matches(')')
        .split(':')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(": ")
}

impl Page {
    pub fn set_viewport_height(&mut self, height: i64) -> Result<()> {
        if height <= 0 {
            return Err(Error::Runtime(
                "set_viewport_height requires a positive height".into(),
            ));
        }
        self.viewport.height = height;
        self.evaluate_intersections()
    }

    pub fn viewport_height(&self) -> i64 {
        self.viewport.height
    }

    pub fn scroll_y(&self) -> i64 {
        self.viewport.scroll_y
    }

    /// Places every element matching `selector` at `top` (document
    /// coordinates) with the given height.
    pub fn set_layout(&mut self, selector: &str, top: i64, height: i64) -> Result<()> {
        let nodes = self.dom.query_selector_all(selector)?;
        if nodes.is_empty() {
            return Err(Error::SelectorNotFound(selector.to_string()));
        }
        for node in nodes {
            self.layout.insert(
                node,
                LayoutBox {
                    top,
                    height: height.max(0),
                },
            );
        }
        self.evaluate_intersections()
    }

    pub(crate) fn layout_of(&self, node: NodeId) -> LayoutBox {
        self.layout.get(&node).copied().unwrap_or_default()
    }

    pub(crate) fn offset_height(&self, node: NodeId) -> i64 {
        self.layout_of(node).height
    }

    /// Script-initiated scroll: recorded, applied, then `scroll` fires.
    pub(crate) fn scroll_window_to(&mut self, top: i64, behavior: ScrollBehavior) -> Result<()> {
        let top = top.max(0);
        self.platform_mocks
            .scroll_requests
            .push(ScrollRequest { top, behavior });
        self.apply_scroll(top)
    }

    pub(crate) fn apply_scroll(&mut self, top: i64) -> Result<()> {
        self.viewport.scroll_y = top.max(0);
        self.dispatch_event(Event::new("scroll", EventTarget::Window))?;
        self.evaluate_intersections()
    }

    pub fn take_scroll_requests(&mut self) -> Vec<ScrollRequest> {
        std::mem::take(&mut self.platform_mocks.scroll_requests)
    }

    /// `matchMedia(query).matches`; unknown features do not match.
    pub fn match_media(&self, query: &str) -> bool {
        self.platform_mocks
            .media_features
            .get(&normalize_media_query(query))
            .copied()
            .unwrap_or(false)
    }

    /// Changes a media feature; live listeners for it run when the value flips.
    pub fn set_media_feature(&mut self, query: &str, matches: bool) -> Result<()> {
        let key = normalize_media_query(query);
        let previous = self
            .platform_mocks
            .media_features
            .insert(key.clone(), matches)
            .unwrap_or(false);
        if previous == matches {
            return Ok(());
        }
        let listeners = self
            .platform_mocks
            .media_listeners
            .iter()
            .filter(|(query, _)| *query == key)
            .map(|(_, listener)| listener.clone())
            .collect::<Vec<_>>();
        for listener in listeners {
            if let Err(err) = listener(self, matches) {
                self.report_uncaught(UncaughtKind::Error, &err.to_string())?;
            }
        }
        Ok(())
    }

    pub fn on_media_change<F>(&mut self, query: &str, callback: F)
    where
        F: Fn(&mut Page, bool) -> Result<()> + 'static,
    {
        self.platform_mocks
            .media_listeners
            .push((normalize_media_query(query), Rc::new(callback)));
    }

    pub fn console_log(&mut self, text: &str) {
        tracing::info!(target: "site_interactions::console", "{text}");
        self.push_console(ConsoleLevel::Log, text);
    }

    pub fn console_warn(&mut self, text: &str) {
        tracing::warn!(target: "site_interactions::console", "{text}");
        self.push_console(ConsoleLevel::Warn, text);
    }

    pub fn console_error(&mut self, text: &str) {
        tracing::error!(target: "site_interactions::console", "{text}");
        self.push_console(ConsoleLevel::Error, text);
    }

    fn push_console(&mut self, level: ConsoleLevel, text: &str) {
        self.platform_mocks.console.push(ConsoleMessage {
            level,
            text: text.to_string(),
        });
    }

    pub fn take_console_messages(&mut self) -> Vec<ConsoleMessage> {
        std::mem::take(&mut self.platform_mocks.console)
    }

    pub fn set_random_seed(&mut self, seed: u64) {
        self.rng = DeterministicRng::new(seed);
    }

    /// Uniform integer in `min..=max`.
    pub fn random_in_range(&mut self, min: i64, max: i64) -> i64 {
        self.rng.next_in_range(min, max)
    }

    pub fn enable_trace(&mut self, enabled: bool) {
        self.trace_state.enabled = enabled;
    }

    pub fn set_trace_events(&mut self, enabled: bool) {
        self.trace_state.events = enabled;
    }

    pub fn set_trace_timers(&mut self, enabled: bool) {
        self.trace_state.timers = enabled;
    }

    pub fn set_trace_log_limit(&mut self, max_entries: usize) -> Result<()> {
        if max_entries == 0 {
            return Err(Error::Runtime(
                "set_trace_log_limit requires at least 1 entry".into(),
            ));
        }
        self.trace_state.log_limit = max_entries;
        while self.trace_state.logs.len() > max_entries {
            self.trace_state.logs.pop_front();
        }
        Ok(())
    }

    pub fn take_trace_logs(&mut self) -> Vec<String> {
        std::mem::take(&mut self.trace_state.logs).into()
    }

    pub(crate) fn trace_event_line(&mut self, line: String) {
        if self.trace_state.enabled && self.trace_state.events {
            self.trace_line(line);
        }
    }

    pub(crate) fn trace_timer_line(&mut self, line: String) {
        if self.trace_state.enabled && self.trace_state.timers {
            self.trace_line(line);
        }
    }

    fn trace_line(&mut self, line: String) {
        tracing::trace!(target: "site_interactions::trace", "{line}");
        if self.trace_state.logs.len() >= self.trace_state.log_limit {
            self.trace_state.logs.pop_front();
        }
        self.trace_state.logs.push_back(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_queries_match_regardless_of_spacing() -> Result<()> {
        let mut page = Page::from_html("")?;
        assert!(!page.match_media("(prefers-reduced-motion: reduce)"));
        page.set_media_feature("(prefers-reduced-motion:reduce)", true)?;
        assert!(page.match_media("( prefers-reduced-motion : reduce )"));
        Ok(())
    }

    #[test]
    fn media_listeners_run_only_on_change() -> Result<()> {
        let mut page = Page::from_html("<p id='log'></p>")?;
        page.on_media_change("(prefers-contrast: high)", |page, matches| {
            let log = page.select_one("#log")?;
            let text = page.text(log);
            page.set_text(log, &format!("{text}{matches};"))
        });
        page.set_media_feature("(prefers-contrast: high)", true)?;
        page.set_media_feature("(prefers-contrast: high)", true)?;
        page.set_media_feature("(prefers-contrast: high)", false)?;
        page.assert_text("#log", "true;false;")?;
        Ok(())
    }

    #[test]
    fn script_scroll_is_recorded_and_applied() -> Result<()> {
        let mut page = Page::from_html("")?;
        page.scroll_window_to(-40, ScrollBehavior::Smooth)?;
        page.scroll_window_to(250, ScrollBehavior::Auto)?;
        assert_eq!(page.scroll_y(), 250);
        assert_eq!(
            page.take_scroll_requests(),
            vec![
                ScrollRequest {
                    top: 0,
                    behavior: ScrollBehavior::Smooth
                },
                ScrollRequest {
                    top: 250,
                    behavior: ScrollBehavior::Auto
                },
            ]
        );
        assert!(page.take_scroll_requests().is_empty());
        Ok(())
    }

    #[test]
    fn console_messages_are_captured_in_order() -> Result<()> {
        let mut page = Page::from_html("")?;
        page.console_log("one");
        page.console_error("two");
        let messages = page.take_console_messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].level, ConsoleLevel::Log);
        assert_eq!(messages[1].text, "two");
        Ok(())
    }

    #[test]
    fn trace_log_limit_keeps_newest_entries() -> Result<()> {
        let mut page = Page::from_html("<button id='b'>x</button>")?;
        assert!(page.set_trace_log_limit(0).is_err());
        page.enable_trace(true);
        page.set_trace_log_limit(2)?;
        page.set_timeout(10, |_| Ok(()));
        page.set_timeout(20, |_| Ok(()));
        page.advance_time(30)?;
        let logs = page.take_trace_logs();
        assert_eq!(logs.len(), 2);
        assert!(logs[1].starts_with("[timer] advance"));
        Ok(())
    }

    #[test]
    fn warnings_are_captured_with_their_level() -> Result<()> {
        let mut page = Page::from_html("")?;
        page.console_warn("slow resource");
        assert_eq!(
            page.take_console_messages(),
            vec![ConsoleMessage {
                level: ConsoleLevel::Warn,
                text: "slow resource".to_string(),
            }]
        );
        Ok(())
    }

    #[test]
    fn viewport_height_tracks_updates() -> Result<()> {
        let mut page = Page::from_html("")?;
        assert_eq!(page.viewport_height(), 800);
        page.set_viewport_height(640)?;
        assert_eq!(page.viewport_height(), 640);
        assert!(page.set_viewport_height(0).is_err());
        assert_eq!(page.viewport_height(), 640);
        Ok(())
    }

    #[test]
    fn trace_categories_can_be_muted_separately() -> Result<()> {
        let mut page = Page::from_html("<button id='b'>x</button>")?;
        page.enable_trace(true);

        page.set_trace_timers(false);
        page.set_timeout(10, |_| Ok(()));
        page.click("#b")?;
        let logs = page.take_trace_logs();
        assert!(!logs.is_empty());
        assert!(logs.iter().all(|line| !line.starts_with("[timer]")));

        page.set_trace_timers(true);
        page.set_trace_events(false);
        page.click("#b")?;
        page.advance_time(10)?;
        let logs = page.take_trace_logs();
        assert!(!logs.is_empty());
        assert!(logs.iter().all(|line| line.starts_with("[timer]")));
        Ok(())
    }
}
