use std::rc::Rc;

use super::Component;
use crate::config::SiteConfig;
use crate::util::{animate, select_all};
use crate::{EventTarget, Page, Result};

/// Hover pulses on cards and buttons, and the placeholder deferred-load swap.
pub struct Animations {
    config: Rc<SiteConfig>,
}

impl Animations {
    pub fn new(config: Rc<SiteConfig>) -> Self {
        Self { config }
    }
}

impl Default for Animations {
    fn default() -> Self {
        Self::new(Rc::default())
    }
}

impl Component for Animations {
    fn name(&self) -> &'static str {
        "Animations"
    }

    fn init(&self, page: &mut Page) -> Result<()> {
        let duration = self.config.timing.hover_animation_ms;
        for (selector, class_name) in [(".episode-card, .feature-card", "lift"), (".btn", "glow")] {
            for node in select_all(page, selector, None)? {
                page.add_event_listener(EventTarget::Node(node), "mouseenter", move |page, _| {
                    animate(page, node, class_name, duration).map(|_| ())
                });
            }
        }

        let min = self.config.timing.deferred_load_min_ms;
        let max = self.config.timing.deferred_load_max_ms;
        for node in select_all(page, "[data-loading]", None)? {
            page.add_class(node, "loading")?;
            let delay = page.random_in_range(min, max);
            page.set_timeout(delay, move |page| {
                page.remove_class(node, "loading")?;
                page.add_class(node, "loaded")
            });
        }
        tracing::debug!("animations initialized");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hover_applies_transient_classes() -> Result<()> {
        let mut page = Page::from_html(
            "<div class='feature-card' id='f'></div><a class='btn' id='b'>Listen</a>",
        )?;
        Animations::default().init(&mut page)?;
        page.hover("#f")?;
        page.hover("#b")?;
        page.assert_class("#f", "lift", true)?;
        page.assert_class("#b", "glow", true)?;
        page.advance_time(300)?;
        page.assert_class("#f", "lift", false)?;
        page.assert_class("#b", "glow", false)?;
        Ok(())
    }

    #[test]
    fn deferred_content_loads_within_window() -> Result<()> {
        for seed in [1, 7, 42, 9_001] {
            let mut page = Page::from_html("<section data-loading id='s'></section>")?;
            page.set_random_seed(seed);
            Animations::default().init(&mut page)?;
            page.assert_class("#s", "loading", true)?;
            page.advance_time(499)?;
            page.assert_class("#s", "loaded", false)?;
            page.advance_time(1_001)?;
            page.assert_class("#s", "loading", false)?;
            page.assert_class("#s", "loaded", true)?;
        }
        Ok(())
    }
}
