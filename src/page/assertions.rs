use super::Page;
use crate::dom::NodeId;
use crate::{Error, Result};

impl Page {
    fn assertion_failed(
        &self,
        selector: &str,
        target: NodeId,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Error {
        Error::AssertionFailed {
            selector: selector.to_string(),
            expected: expected.into(),
            actual: actual.into(),
            dom_snippet: self.node_snippet(target),
        }
    }

    pub fn assert_text(&self, selector: &str, expected: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.text_content(target);
        if actual != expected {
            return Err(self.assertion_failed(selector, target, expected, actual));
        }
        Ok(())
    }

    pub fn assert_value(&self, selector: &str, expected: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.value(target)?;
        if actual != expected {
            return Err(self.assertion_failed(selector, target, expected, actual));
        }
        Ok(())
    }

    /// `None` asserts the attribute is absent.
    pub fn assert_attr(&self, selector: &str, name: &str, expected: Option<&str>) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.attr(target, name);
        if actual.as_deref() != expected {
            let describe = |value: Option<&str>| {
                value.map_or_else(|| "<absent>".to_string(), |v| format!("{name}={v:?}"))
            };
            return Err(self.assertion_failed(
                selector,
                target,
                describe(expected),
                describe(actual.as_deref()),
            ));
        }
        Ok(())
    }

    pub fn assert_class(&self, selector: &str, class_name: &str, expected: bool) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.class_contains(target, class_name);
        if actual != expected {
            let describe = |present: bool| {
                if present {
                    format!("class {class_name}")
                } else {
                    format!("no class {class_name}")
                }
            };
            return Err(self.assertion_failed(
                selector,
                target,
                describe(expected),
                describe(actual),
            ));
        }
        Ok(())
    }

    pub fn assert_style(&self, selector: &str, property: &str, expected: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.style_get(target, property)?;
        if actual != expected {
            return Err(self.assertion_failed(
                selector,
                target,
                format!("{property}: {expected}"),
                format!("{property}: {actual}"),
            ));
        }
        Ok(())
    }

    pub fn assert_focused(&self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        if self.active_element != Some(target) {
            let actual = self
                .active_element
                .map_or_else(|| "none".to_string(), |node| self.node_label(node));
            return Err(self.assertion_failed(
                selector,
                target,
                "focused",
                format!("focus on {actual}"),
            ));
        }
        Ok(())
    }

    pub fn assert_exists(&self, selector: &str) -> Result<()> {
        let _ = self.select_one(selector)?;
        Ok(())
    }

    pub fn dump_dom(&self, selector: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        Ok(self.dom.dump_node(target))
    }
}
