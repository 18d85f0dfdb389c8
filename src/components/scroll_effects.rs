use std::cell::Cell;
use std::rc::Rc;

use super::Component;
use crate::config::SiteConfig;
use crate::util::{select_all, throttle};
use crate::{EventTarget, IntersectionOptions, Page, Result, ScrollBehavior};

pub const REVEAL_SELECTOR: &str = ".episode-card, .feature-card, .section-header, .animate-on-scroll";

/// Reveal-on-scroll, the scroll-to-top button and the hiding header.
pub struct ScrollEffects {
    config: Rc<SiteConfig>,
}

impl ScrollEffects {
    pub fn new(config: Rc<SiteConfig>) -> Self {
        Self { config }
    }
}

impl Default for ScrollEffects {
    fn default() -> Self {
        Self::new(Rc::default())
    }
}

impl Component for ScrollEffects {
    fn name(&self) -> &'static str {
        "ScrollEffects"
    }

    fn init(&self, page: &mut Page) -> Result<()> {
        self.init_reveal(page)?;
        self.init_scroll_to_top(page)?;
        self.init_header(page)?;
        tracing::debug!("scroll effects initialized");
        Ok(())
    }
}

impl ScrollEffects {
    fn init_reveal(&self, page: &mut Page) -> Result<()> {
        let targets = select_all(page, REVEAL_SELECTOR, None)?;
        if targets.is_empty() {
            return Ok(());
        }
        let options = IntersectionOptions {
            threshold: self.config.reveal.threshold,
            root_margin_bottom: self.config.reveal.root_margin_bottom,
        };
        let observer = page.create_intersection_observer(options, |page, observer, entries| {
            for entry in entries.iter().filter(|entry| entry.is_intersecting) {
                page.add_class(entry.target, "animate-in")?;
                page.unobserve(observer, entry.target);
            }
            Ok(())
        });
        for target in targets {
            page.observe_intersection(observer, target)?;
        }
        Ok(())
    }

    fn init_scroll_to_top(&self, page: &mut Page) -> Result<()> {
        let buttons = select_all(page, ".scroll-to-top, [data-action=\"scroll-top\"]", None)?;
        if buttons.is_empty() {
            return Ok(());
        }
        let threshold = self.config.scroll.scroll_top_threshold;
        let visibility_buttons = buttons.clone();
        let update = throttle(self.config.scroll.scroll_top_throttle_ms, move |page| {
            let visible = page.scroll_y() > threshold;
            for &button in &visibility_buttons {
                page.set_class(button, "visible", visible)?;
            }
            Ok(())
        });
        page.add_event_listener(EventTarget::Window, "scroll", move |page, _| update.call(page));

        for button in buttons {
            page.add_event_listener(EventTarget::Node(button), "click", |page, event| {
                event.prevent_default();
                page.scroll_window_to(0, ScrollBehavior::Smooth)
            });
        }
        Ok(())
    }

    fn init_header(&self, page: &mut Page) -> Result<()> {
        let Some(header) = page.query_selector(".site-header")? else {
            return Ok(());
        };
        let scrolled_offset = self.config.scroll.header_scrolled_offset;
        let hide_offset = self.config.scroll.header_hide_offset;
        let last_offset = Rc::new(Cell::new(page.scroll_y()));
        let update = throttle(self.config.scroll.header_throttle_ms, move |page| {
            let offset = page.scroll_y();
            page.set_class(header, "scrolled", offset > scrolled_offset)?;
            let previous = last_offset.replace(offset);
            if offset > previous && offset > hide_offset {
                page.add_class(header, "header-hidden")?;
            } else if offset < previous {
                page.remove_class(header, "header-hidden")?;
            }
            Ok(())
        });
        page.add_event_listener(EventTarget::Window, "scroll", move |page, _| update.call(page));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScrollRequest;

    const LAYOUT: &str = r#"
        <header class="site-header">Logo</header>
        <section class="section-header" id="intro">Intro</section>
        <article class="episode-card" id="ep1">One</article>
        <article class="episode-card" id="ep2">Two</article>
        <button class="scroll-to-top">Top</button>
    "#;

    fn page() -> Result<Page> {
        let mut page = Page::from_html(LAYOUT)?;
        page.set_layout(".site-header", 0, 80)?;
        page.set_layout("#intro", 100, 200)?;
        page.set_layout("#ep1", 900, 300)?;
        page.set_layout("#ep2", 2_000, 300)?;
        ScrollEffects::default().init(&mut page)?;
        Ok(page)
    }

    #[test]
    fn reveal_adds_class_once_target_crosses_threshold() -> Result<()> {
        let mut page = page()?;
        page.assert_class("#intro", "animate-in", true)?;
        page.assert_class("#ep1", "animate-in", false)?;

        // ep1 needs 30px visible above the 750px trigger line.
        page.scroll_to(179)?;
        page.assert_class("#ep1", "animate-in", false)?;
        page.scroll_to(180)?;
        page.assert_class("#ep1", "animate-in", true)?;

        page.scroll_to(0)?;
        page.assert_class("#ep1", "animate-in", true)?;
        page.assert_class("#ep2", "animate-in", false)?;
        Ok(())
    }

    #[test]
    fn scroll_to_top_button_tracks_offset_and_scrolls_home() -> Result<()> {
        let mut page = page()?;
        page.scroll_to(301)?;
        page.assert_class(".scroll-to-top", "visible", true)?;
        page.advance_time(100)?;
        page.scroll_to(300)?;
        page.assert_class(".scroll-to-top", "visible", false)?;

        page.advance_time(100)?;
        page.scroll_to(900)?;
        page.click(".scroll-to-top")?;
        assert_eq!(
            page.take_scroll_requests(),
            vec![ScrollRequest {
                top: 0,
                behavior: ScrollBehavior::Smooth
            }]
        );
        assert_eq!(page.scroll_y(), 0);
        Ok(())
    }

    #[test]
    fn scroll_to_top_updates_are_throttled() -> Result<()> {
        let mut page = page()?;
        page.scroll_to(400)?;
        page.advance_time(50)?;
        page.scroll_to(10)?;
        page.assert_class(".scroll-to-top", "visible", true)?;
        Ok(())
    }

    #[test]
    fn header_hides_scrolling_down_and_returns_scrolling_up() -> Result<()> {
        let mut page = page()?;
        page.scroll_to(150)?;
        page.assert_class(".site-header", "scrolled", true)?;
        page.assert_class(".site-header", "header-hidden", false)?;

        page.advance_time(10)?;
        page.scroll_to(260)?;
        page.assert_class(".site-header", "header-hidden", true)?;

        page.advance_time(10)?;
        page.scroll_to(240)?;
        page.assert_class(".site-header", "header-hidden", false)?;
        page.assert_class(".site-header", "scrolled", true)?;

        page.advance_time(10)?;
        page.scroll_to(50)?;
        page.assert_class(".site-header", "scrolled", false)?;
        Ok(())
    }
}
