//! Leaf helpers shared by every component: element lookup, timing wrappers,
//! transient animation classes, live-region announcements and the small
//! string checks used by forms and the audio player.

use std::cell::Cell;
use std::rc::Rc;
use std::sync::LazyLock;

use fancy_regex::Regex;

use crate::{NodeId, Page, Result, TimerId};

pub type Action = Rc<dyn Fn(&mut Page) -> Result<()>>;

pub const ANNOUNCER_ID: &str = "announcements";
pub const ANNOUNCE_CLEAR_MS: i64 = 1_000;
pub const DEFAULT_ANIMATION_MS: i64 = 300;

/// First match of `selector`, optionally within `scope`.
pub fn select(page: &Page, selector: &str, scope: Option<NodeId>) -> Result<Option<NodeId>> {
    match scope {
        Some(root) => page.query_within(root, selector),
        None => page.query_selector(selector),
    }
}

/// Every match of `selector`; empty when nothing matches.
pub fn select_all(page: &Page, selector: &str, scope: Option<NodeId>) -> Result<Vec<NodeId>> {
    match scope {
        Some(root) => page.query_all_within(root, selector),
        None => page.query_selector_all(selector),
    }
}

/// Trailing-edge debounce: each call cancels the pending run and schedules a
/// new one `wait_ms` later.
#[derive(Clone)]
pub struct Debounced {
    wait_ms: i64,
    pending: Rc<Cell<Option<TimerId>>>,
    action: Action,
}

pub fn debounce<F>(wait_ms: i64, action: F) -> Debounced
where
    F: Fn(&mut Page) -> Result<()> + 'static,
{
    Debounced {
        wait_ms,
        pending: Rc::default(),
        action: Rc::new(action),
    }
}

impl Debounced {
    pub fn call(&self, page: &mut Page) -> Result<()> {
        if let Some(timer) = self.pending.take() {
            page.clear_timer(timer);
        }
        let pending = self.pending.clone();
        let action = self.action.clone();
        let timer = page.set_timeout(self.wait_ms, move |page| {
            pending.set(None);
            action(page)
        });
        self.pending.set(Some(timer));
        Ok(())
    }

    pub fn is_pending(&self) -> bool {
        self.pending.get().is_some()
    }
}

/// Leading-edge throttle with a fixed window: the first call runs at once,
/// calls during the next `limit_ms` are dropped.
#[derive(Clone)]
pub struct Throttled {
    limit_ms: i64,
    window_end: Rc<Cell<Option<i64>>>,
    action: Action,
}

pub fn throttle<F>(limit_ms: i64, action: F) -> Throttled
where
    F: Fn(&mut Page) -> Result<()> + 'static,
{
    Throttled {
        limit_ms,
        window_end: Rc::default(),
        action: Rc::new(action),
    }
}

impl Throttled {
    pub fn call(&self, page: &mut Page) -> Result<()> {
        let now = page.now_ms();
        if self.window_end.get().is_some_and(|end| now < end) {
            return Ok(());
        }
        self.window_end.set(Some(now.saturating_add(self.limit_ms)));
        (self.action)(page)
    }
}

/// Adds `class_name` for `duration_ms`, then removes it. The returned timer
/// is the removal itself; clearing it leaves the class on.
pub fn animate(
    page: &mut Page,
    node: NodeId,
    class_name: &str,
    duration_ms: i64,
) -> Result<TimerId> {
    animate_then(page, node, class_name, duration_ms, |_| Ok(()))
}

/// [`animate`], then `on_done` once the class is gone. Sequences chain by
/// starting the next animation from `on_done`.
pub fn animate_then<F>(
    page: &mut Page,
    node: NodeId,
    class_name: &str,
    duration_ms: i64,
    on_done: F,
) -> Result<TimerId>
where
    F: FnOnce(&mut Page) -> Result<()> + 'static,
{
    page.add_class(node, class_name)?;
    let class_name = class_name.to_string();
    Ok(page.set_timeout(duration_ms, move |page| {
        page.remove_class(node, &class_name)?;
        on_done(page)
    }))
}

/// Writes `message` into the live region and clears it after a second.
/// Does nothing when the page has no region.
pub fn announce(page: &mut Page, message: &str) -> Result<()> {
    let Some(region) = page.by_id(ANNOUNCER_ID) else {
        return Ok(());
    };
    page.set_text(region, message)?;
    let message = message.to_string();
    page.set_timeout(ANNOUNCE_CLEAR_MS, move |page| {
        // A newer announcement owns the region now.
        if page.text(region) == message {
            page.set_text(region, "")?;
        }
        Ok(())
    });
    Ok(())
}

static EMAIL_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok());

/// Permissive shape check: `local@domain.tld` without whitespace.
pub fn is_valid_email(value: &str) -> bool {
    EMAIL_PATTERN
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(value).unwrap_or(false))
}

/// `m:ss`, minutes unpadded.
pub fn format_time(total_seconds: u32) -> String {
    format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
}

/// Inverse of [`format_time`]; `None` for anything but `m:ss`.
pub fn parse_time(text: &str) -> Option<u32> {
    let (minutes, seconds) = text.trim().split_once(':')?;
    let minutes = minutes.parse::<u32>().ok()?;
    let seconds = seconds.parse::<u32>().ok()?;
    if seconds >= 60 {
        return None;
    }
    minutes.checked_mul(60)?.checked_add(seconds)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use proptest::prelude::*;

    use super::*;

    fn counter() -> (Rc<RefCell<Vec<i64>>>, impl Fn(&mut Page) -> Result<()> + 'static) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let sink = calls.clone();
        (calls, move |page: &mut Page| {
            sink.borrow_mut().push(page.now_ms());
            Ok(())
        })
    }

    #[test]
    fn email_check_matches_reference_cases() {
        assert!(is_valid_email("a@b.co"));
        assert!(is_valid_email("first.last+tag@sub.example.org"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.com"));
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("a@@b.co"));
    }

    #[test]
    fn format_time_pads_seconds() {
        assert_eq!(format_time(65), "1:05");
        assert_eq!(format_time(5), "0:05");
        assert_eq!(format_time(0), "0:00");
        assert_eq!(format_time(3_600), "60:00");
    }

    #[test]
    fn parse_time_rejects_malformed_text() {
        assert_eq!(parse_time(" 3:45 "), Some(225));
        assert_eq!(parse_time("3:75"), None);
        assert_eq!(parse_time("345"), None);
        assert_eq!(parse_time("-1:00"), None);
    }

    #[test]
    fn select_all_is_empty_when_nothing_matches() -> Result<()> {
        let page = Page::from_html("<ul id='l'><li>a</li></ul><li>outside</li>")?;
        assert!(select_all(&page, ".missing", None)?.is_empty());
        let list = page.select_one("#l")?;
        assert_eq!(select_all(&page, "li", Some(list))?.len(), 1);
        assert_eq!(select_all(&page, "li", None)?.len(), 2);
        Ok(())
    }

    #[test]
    fn announce_clears_after_a_second_and_tolerates_missing_region() -> Result<()> {
        let mut page = Page::from_html("<div id='announcements'></div>")?;
        announce(&mut page, "Menu opened")?;
        page.assert_text("#announcements", "Menu opened")?;
        page.advance_time(999)?;
        page.assert_text("#announcements", "Menu opened")?;
        page.advance_time(1)?;
        page.assert_text("#announcements", "")?;

        let mut bare = Page::from_html("<p></p>")?;
        announce(&mut bare, "ignored")?;
        assert!(bare.pending_timers().is_empty());
        Ok(())
    }

    #[test]
    fn newer_announcement_is_not_cut_short() -> Result<()> {
        let mut page = Page::from_html("<div id='announcements'></div>")?;
        announce(&mut page, "first")?;
        page.advance_time(600)?;
        announce(&mut page, "second")?;
        page.advance_time(400)?;
        page.assert_text("#announcements", "second")?;
        page.advance_time(600)?;
        page.assert_text("#announcements", "")?;
        Ok(())
    }

    #[test]
    fn animate_removes_class_after_duration() -> Result<()> {
        let mut page = Page::from_html("<div id='card'></div>")?;
        let card = page.select_one("#card")?;
        animate(&mut page, card, "lift", DEFAULT_ANIMATION_MS)?;
        page.assert_class("#card", "lift", true)?;
        page.advance_time(DEFAULT_ANIMATION_MS)?;
        page.assert_class("#card", "lift", false)?;
        Ok(())
    }

    #[test]
    fn animations_chain_through_completion() -> Result<()> {
        let mut page = Page::from_html("<div id='card'></div>")?;
        let card = page.select_one("#card")?;
        animate_then(&mut page, card, "lift", 300, move |page| {
            animate(page, card, "glow", 200).map(|_| ())
        })?;
        page.advance_time(299)?;
        page.assert_class("#card", "glow", false)?;
        page.advance_time(1)?;
        page.assert_class("#card", "lift", false)?;
        page.assert_class("#card", "glow", true)?;
        page.advance_time(200)?;
        page.assert_class("#card", "glow", false)?;
        Ok(())
    }

    #[test]
    fn clearing_the_animation_timer_keeps_the_class() -> Result<()> {
        let mut page = Page::from_html("<div id='card'></div>")?;
        let card = page.select_one("#card")?;
        let removal = animate(&mut page, card, "pulse", 300)?;
        assert!(page.clear_timer(removal));
        page.advance_time(1_000)?;
        page.assert_class("#card", "pulse", true)?;
        Ok(())
    }

    proptest! {
        #[test]
        fn debounce_fires_once_after_last_call(
            gaps in proptest::collection::vec(0i64..300, 1..12),
            wait in 301i64..1_000,
        ) {
            let mut page = Page::from_html("").map_err(|e| TestCaseError::fail(e.to_string()))?;
            let (calls, action) = counter();
            let debounced = debounce(wait, action);
            let mut last_call = 0;
            for gap in gaps {
                page.advance_time(gap).map_err(|e| TestCaseError::fail(e.to_string()))?;
                debounced.call(&mut page).map_err(|e| TestCaseError::fail(e.to_string()))?;
                last_call = page.now_ms();
            }
            page.flush().map_err(|e| TestCaseError::fail(e.to_string()))?;
            prop_assert_eq!(calls.borrow().clone(), vec![last_call + wait]);
            prop_assert!(!debounced.is_pending());
        }

        #[test]
        fn throttle_fires_on_first_call_of_each_window(
            gaps in proptest::collection::vec(0i64..200, 1..20),
            limit in 1i64..500,
        ) {
            let mut page = Page::from_html("").map_err(|e| TestCaseError::fail(e.to_string()))?;
            let (calls, action) = counter();
            let throttled = throttle(limit, action);
            let mut expected = Vec::new();
            let mut window_end: Option<i64> = None;
            for gap in gaps {
                page.advance_time(gap).map_err(|e| TestCaseError::fail(e.to_string()))?;
                let now = page.now_ms();
                if window_end.is_none_or(|end| now >= end) {
                    expected.push(now);
                    window_end = Some(now + limit);
                }
                throttled.call(&mut page).map_err(|e| TestCaseError::fail(e.to_string()))?;
            }
            prop_assert_eq!(calls.borrow().clone(), expected);
        }

        #[test]
        fn format_time_parses_back(seconds in 0u32..1_000_000) {
            prop_assert_eq!(parse_time(&format_time(seconds)), Some(seconds));
        }
    }

    #[test]
    fn throttle_burst_runs_once_then_again_after_window() -> Result<()> {
        let mut page = Page::from_html("")?;
        let (calls, action) = counter();
        let throttled = throttle(100, action);
        for _ in 0..5 {
            throttled.call(&mut page)?;
            page.advance_time(10)?;
        }
        page.advance_time(60)?;
        throttled.call(&mut page)?;
        assert_eq!(*calls.borrow(), vec![0, 110]);
        Ok(())
    }
}
