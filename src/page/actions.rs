use super::Page;
use crate::dom::NodeId;
use crate::events::{Event, EventTarget};
use crate::{Error, Result};

impl Page {
    /// Clicks the first match. Disabled controls ignore the click; submit
    /// controls submit their form unless the click was prevented.
    pub fn click(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        self.click_node(target)
    }

    pub fn click_node(&mut self, target: NodeId) -> Result<()> {
        if self.dom.disabled(target) {
            return Ok(());
        }
        let is_checkbox = self.dom.is_tag(target, "input")
            && matches!(
                self.dom.attr(target, "type").as_deref(),
                Some("checkbox" | "radio")
            );
        if is_checkbox {
            let checked = self.dom.checked(target)?;
            self.dom.set_checked(target, !checked)?;
        }

        let event = self.dispatch_on(target, "click")?;
        if event.default_prevented() {
            return Ok(());
        }
        if is_checkbox {
            self.dispatch_on(target, "input")?;
            self.dispatch_on(target, "change")?;
        }
        if self.is_submit_control(target) {
            if let Some(form) = self.dom.find_ancestor_by_tag(target, "form") {
                self.dispatch_on(form, "submit")?;
            }
        }
        Ok(())
    }

    fn is_submit_control(&self, node: NodeId) -> bool {
        let kind = self
            .dom
            .attr(node, "type")
            .map(|value| value.to_ascii_lowercase());
        if self.dom.is_tag(node, "button") {
            return kind.is_none_or(|kind| kind == "submit");
        }
        self.dom.is_tag(node, "input") && kind.as_deref() == Some("submit")
    }

    /// Focuses a text control, replaces its value and fires `input`.
    pub fn type_text(&mut self, selector: &str, text: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        if !(self.dom.is_tag(target, "input") || self.dom.is_tag(target, "textarea")) {
            return Err(Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "input or textarea".into(),
                actual: self.dom.tag_name(target).unwrap_or("#node").to_string(),
            });
        }
        if self.dom.disabled(target) {
            return Ok(());
        }
        self.focus_node(target)?;
        self.dom.set_value(target, text)?;
        self.dispatch_on(target, "input")?;
        Ok(())
    }

    pub fn select_option(&mut self, selector: &str, value: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        if !self.dom.is_tag(target, "select") {
            return Err(Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "select".into(),
                actual: self.dom.tag_name(target).unwrap_or("#node").to_string(),
            });
        }
        if self.dom.disabled(target) {
            return Ok(());
        }
        self.dom.set_value(target, value)?;
        self.dispatch_on(target, "input")?;
        self.dispatch_on(target, "change")?;
        Ok(())
    }

    pub fn focus(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        self.focus_node(target)
    }

    pub fn blur(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        self.blur_node(target)
    }

    /// Fires `keydown` with `key` (`"Enter"`, `" "`, `"Escape"`) at the match.
    pub fn press_key(&mut self, selector: &str, key: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        self.dispatch_event(Event::new("keydown", EventTarget::Node(target)).with_key(key))?;
        Ok(())
    }

    pub fn hover(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        self.dispatch_on(target, "mouseenter")?;
        Ok(())
    }

    pub fn unhover(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        self.dispatch_on(target, "mouseleave")?;
        Ok(())
    }

    /// Submits the matched form, or the form owning the matched element.
    pub fn submit(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let form = if self.dom.is_tag(target, "form") {
            target
        } else {
            self.dom
                .find_ancestor_by_tag(target, "form")
                .ok_or_else(|| Error::TypeMismatch {
                    selector: selector.to_string(),
                    expected: "form or form control".into(),
                    actual: self.dom.tag_name(target).unwrap_or("#node").to_string(),
                })?
        };
        self.dispatch_on(form, "submit")?;
        Ok(())
    }

    /// User scroll to vertical offset `y`.
    pub fn scroll_to(&mut self, y: i64) -> Result<()> {
        self.apply_scroll(y)
    }

    /// Detaches the first match from the document.
    pub fn remove(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        if self
            .active_element
            .is_some_and(|active| active == target || self.dom.is_descendant_of(active, target))
        {
            self.active_element = None;
        }
        self.dom.remove_node(target)?;
        self.evaluate_intersections()
    }
}
