use super::Component;
use crate::util::select_all;
use crate::{EventTarget, IntersectionOptions, Page, ReadyState, Result};

/// Load-time reporting and lazy image loading.
#[derive(Debug, Default)]
pub struct Performance;

fn report_load_time(page: &mut Page) {
    let elapsed = page.now_ms();
    tracing::info!(elapsed_ms = elapsed, "page loaded");
    page.console_log(&format!("Page load time: {elapsed}ms"));
}

impl Component for Performance {
    fn name(&self) -> &'static str {
        "Performance"
    }

    fn init(&self, page: &mut Page) -> Result<()> {
        if page.ready_state() == ReadyState::Complete {
            report_load_time(page);
        } else {
            page.add_event_listener(EventTarget::Window, "load", |page, _| {
                report_load_time(page);
                Ok(())
            });
        }

        let images = select_all(page, "img[data-src]", None)?;
        if images.is_empty() {
            return Ok(());
        }
        let observer = page.create_intersection_observer(
            IntersectionOptions::default(),
            |page, observer, entries| {
                for entry in entries.iter().filter(|entry| entry.is_intersecting) {
                    let image = entry.target;
                    if let Some(source) = page.attr(image, "data-src") {
                        page.set_attr(image, "src", &source)?;
                        page.remove_attr(image, "data-src")?;
                    }
                    page.add_class(image, "loaded")?;
                    page.unobserve(observer, image);
                }
                Ok(())
            },
        );
        for image in images {
            page.observe_intersection(observer, image)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConsoleLevel;

    #[test]
    fn load_time_is_logged_once_on_load() -> Result<()> {
        let mut page = Page::from_html("")?;
        Performance.init(&mut page)?;
        page.advance_time(42)?;
        page.finish_loading()?;
        let messages = page.take_console_messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].level, ConsoleLevel::Log);
        assert_eq!(messages[0].text, "Page load time: 42ms");
        Ok(())
    }

    #[test]
    fn load_time_is_logged_immediately_when_already_loaded() -> Result<()> {
        let mut page = Page::from_html("")?;
        page.finish_loading()?;
        Performance.init(&mut page)?;
        assert_eq!(page.take_console_messages()[0].text, "Page load time: 0ms");
        Ok(())
    }

    #[test]
    fn lazy_images_swap_source_when_visible() -> Result<()> {
        let mut page = Page::from_html(
            r#"<img id="top" data-src="/a.jpg"><img id="below" data-src="/b.jpg">"#,
        )?;
        page.set_layout("#top", 0, 100)?;
        page.set_layout("#below", 1_500, 100)?;
        Performance.init(&mut page)?;

        page.assert_attr("#top", "src", Some("/a.jpg"))?;
        page.assert_attr("#top", "data-src", None)?;
        page.assert_class("#top", "loaded", true)?;
        page.assert_attr("#below", "src", None)?;

        page.scroll_to(800)?;
        page.assert_attr("#below", "src", Some("/b.jpg"))?;
        page.assert_class("#below", "loaded", true)?;
        Ok(())
    }
}
