use super::Component;
use crate::{Page, Result};

pub const REDUCED_MOTION_QUERY: &str = "(prefers-reduced-motion: reduce)";
pub const HIGH_CONTRAST_QUERY: &str = "(prefers-contrast: high)";

/// Mirrors OS motion and contrast preferences as classes on `<html>`.
#[derive(Debug, Default)]
pub struct Theme;

impl Component for Theme {
    fn name(&self) -> &'static str {
        "Theme"
    }

    fn init(&self, page: &mut Page) -> Result<()> {
        let root = page.document_element();
        if page.tag_name(root).is_none() {
            tracing::debug!("no <html> element, theme classes skipped");
            return Ok(());
        }
        let reduced = page.match_media(REDUCED_MOTION_QUERY);
        page.set_class(root, "reduced-motion", reduced)?;
        page.on_media_change(REDUCED_MOTION_QUERY, move |page, matches| {
            page.set_class(root, "reduced-motion", matches)
        });

        // Contrast is read once; later changes are not followed.
        let high_contrast = page.match_media(HIGH_CONTRAST_QUERY);
        page.set_class(root, "high-contrast", high_contrast)?;
        tracing::debug!(reduced, high_contrast, "theme preferences applied");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduced_motion_follows_live_changes_but_contrast_does_not() -> Result<()> {
        let mut page = Page::from_html("<html><body></body></html>")?;
        page.set_media_feature(HIGH_CONTRAST_QUERY, true)?;
        Theme.init(&mut page)?;
        page.assert_class("html", "reduced-motion", false)?;
        page.assert_class("html", "high-contrast", true)?;

        page.set_media_feature(REDUCED_MOTION_QUERY, true)?;
        page.assert_class("html", "reduced-motion", true)?;
        page.set_media_feature(REDUCED_MOTION_QUERY, false)?;
        page.assert_class("html", "reduced-motion", false)?;

        page.set_media_feature(HIGH_CONTRAST_QUERY, false)?;
        page.assert_class("html", "high-contrast", true)?;
        Ok(())
    }

    #[test]
    fn fragment_without_html_element_is_left_alone() -> Result<()> {
        let mut page = Page::from_html("<p>fragment</p>")?;
        page.set_media_feature(REDUCED_MOTION_QUERY, true)?;
        Theme.init(&mut page)?;
        Ok(())
    }
}
