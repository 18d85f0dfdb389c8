use super::Page;
use crate::Result;
use crate::backend::FormData;
use crate::dom::NodeId;

impl Page {
    pub fn query_selector(&self, selector: &str) -> Result<Option<NodeId>> {
        self.dom.query_selector(selector)
    }

    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        self.dom.query_selector_all(selector)
    }

    /// Descendants of `root` matching `selector`, in document order.
    pub fn query_all_within(&self, root: NodeId, selector: &str) -> Result<Vec<NodeId>> {
        self.dom.query_selector_all_from(root, selector)
    }

    pub fn query_within(&self, root: NodeId, selector: &str) -> Result<Option<NodeId>> {
        Ok(self.query_all_within(root, selector)?.into_iter().next())
    }

    pub fn matches(&self, node: NodeId, selector: &str) -> Result<bool> {
        self.dom.matches_selector(node, selector)
    }

    pub fn closest(&self, node: NodeId, selector: &str) -> Result<Option<NodeId>> {
        self.dom.closest(node, selector)
    }

    pub fn by_id(&self, id: &str) -> Option<NodeId> {
        self.dom.by_id(id)
    }

    pub fn document_element(&self) -> NodeId {
        self.dom.document_element()
    }

    pub fn body(&self) -> Option<NodeId> {
        self.dom.body()
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.dom.parent(node)
    }

    pub fn next_element_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.dom.next_element_sibling(node)
    }

    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.dom.contains(ancestor, node)
    }

    pub fn is_connected(&self, node: NodeId) -> bool {
        self.dom.is_connected(node)
    }

    pub fn tag_name(&self, node: NodeId) -> Option<String> {
        self.dom.tag_name(node).map(str::to_string)
    }

    /// Short label such as `div#hero` or `button.play-btn`.
    pub fn describe(&self, node: NodeId) -> String {
        self.node_label(node)
    }

    pub fn text(&self, node: NodeId) -> String {
        self.dom.text_content(node)
    }

    pub fn set_text(&mut self, node: NodeId, text: &str) -> Result<()> {
        self.dom.set_text_content(node, text)
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<String> {
        self.dom.attr(node, name)
    }

    pub fn has_attr(&self, node: NodeId, name: &str) -> bool {
        self.dom.has_attr(node, name)
    }

    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) -> Result<()> {
        self.dom.set_attr(node, name, value)
    }

    pub fn remove_attr(&mut self, node: NodeId, name: &str) -> Result<()> {
        self.dom.remove_attr(node, name)
    }

    pub fn has_class(&self, node: NodeId, class_name: &str) -> bool {
        self.dom.class_contains(node, class_name)
    }

    pub fn add_class(&mut self, node: NodeId, class_name: &str) -> Result<()> {
        self.dom.class_add(node, class_name)
    }

    pub fn remove_class(&mut self, node: NodeId, class_name: &str) -> Result<()> {
        self.dom.class_remove(node, class_name)
    }

    /// Returns whether the class is present afterwards.
    pub fn toggle_class(&mut self, node: NodeId, class_name: &str) -> Result<bool> {
        self.dom.class_toggle(node, class_name)
    }

    pub fn set_class(&mut self, node: NodeId, class_name: &str, on: bool) -> Result<()> {
        if on {
            self.add_class(node, class_name)
        } else {
            self.remove_class(node, class_name)
        }
    }

    /// Inline style property by CSS name (`overflow`, `width`).
    pub fn style(&self, node: NodeId, property: &str) -> Result<String> {
        self.dom.style_get(node, property)
    }

    pub fn set_style(&mut self, node: NodeId, property: &str, value: &str) -> Result<()> {
        self.dom.style_set(node, property, value)
    }

    pub fn value(&self, node: NodeId) -> Result<String> {
        self.dom.value(node)
    }

    pub fn set_value(&mut self, node: NodeId, value: &str) -> Result<()> {
        self.dom.set_value(node, value)
    }

    pub fn checked(&self, node: NodeId) -> Result<bool> {
        self.dom.checked(node)
    }

    pub fn is_disabled(&self, node: NodeId) -> bool {
        self.dom.disabled(node)
    }

    pub fn is_required(&self, node: NodeId) -> bool {
        self.dom.required(node)
    }

    pub fn set_disabled(&mut self, node: NodeId, disabled: bool) -> Result<()> {
        if disabled {
            self.dom.set_attr(node, "disabled", "")
        } else {
            self.dom.remove_attr(node, "disabled")
        }
    }

    /// `form.reset()`: every control returns to its parsed default.
    pub fn reset_form(&mut self, form: NodeId) -> Result<()> {
        self.dom.reset_form_controls(form)
    }

    /// Successful controls of `form` in document order, as `new FormData(form)`.
    pub fn form_data(&self, form: NodeId) -> Result<FormData> {
        let mut data = FormData::default();
        for control in self.dom.query_selector_all_from(form, "input, select, textarea")? {
            let Some(name) = self.dom.attr(control, "name").filter(|name| !name.is_empty()) else {
                continue;
            };
            if self.dom.disabled(control) {
                continue;
            }
            let input_type = self
                .dom
                .attr(control, "type")
                .unwrap_or_default()
                .to_ascii_lowercase();
            match input_type.as_str() {
                "submit" | "button" | "reset" | "image" | "file" => continue,
                "checkbox" | "radio" => {
                    if !self.dom.checked(control)? {
                        continue;
                    }
                    let value = self.dom.attr(control, "value").unwrap_or_else(|| "on".into());
                    data.append(&name, &value);
                }
                _ => data.append(&name, &self.dom.value(control)?),
            }
        }
        Ok(data)
    }

    /// First focusable descendant of `root`, as used for dialog focus.
    pub fn first_focusable_within(&self, root: NodeId) -> Result<Option<NodeId>> {
        let candidates = self.dom.query_selector_all_from(
            root,
            "button, [href], input, select, textarea, [tabindex]:not([tabindex=\"-1\"])",
        )?;
        Ok(candidates
            .into_iter()
            .find(|node| !self.dom.disabled(*node)))
    }

    /// Elements that take focus without a `tabindex`.
    pub fn is_natively_focusable(&self, node: NodeId) -> bool {
        match self.dom.tag_name(node) {
            Some("button" | "input" | "select" | "textarea") => true,
            Some("a") => self.dom.has_attr(node, "href"),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{Page, Result};

    #[test]
    fn form_data_skips_unnamed_disabled_and_unchecked_controls() -> Result<()> {
        let mut page = Page::from_html(
            r#"
            <form id='f'>
              <input name='name' value='Ada'>
              <input value='anonymous'>
              <input name='nick' value='x' disabled>
              <input type='checkbox' name='subscribe'>
              <input type='checkbox' name='terms' checked value='yes'>
              <select name='topic'><option>general</option><option selected>press</option></select>
              <textarea name='message'>Hello there</textarea>
              <button type='submit' name='go'>Send</button>
            </form>
            "#,
        )?;
        let form = page.select_one("#f")?;
        let name = page.select_one("[name=\"name\"]")?;
        page.set_value(name, "Ada L")?;

        let data = page.form_data(form)?;
        assert_eq!(
            data.entries(),
            &[
                ("name".to_string(), "Ada L".to_string()),
                ("terms".to_string(), "yes".to_string()),
                ("topic".to_string(), "press".to_string()),
                ("message".to_string(), "Hello there".to_string()),
            ]
        );
        Ok(())
    }

    #[test]
    fn first_focusable_skips_disabled_and_negative_tabindex() -> Result<()> {
        let page = Page::from_html(
            r#"
            <div id='dialog'>
              <p>Intro</p>
              <span tabindex="-1">skip</span>
              <button disabled>Off</button>
              <input id='email' type='email'>
            </div>
            "#,
        )?;
        let dialog = page.select_one("#dialog")?;
        let email = page.select_one("#email")?;
        assert_eq!(page.first_focusable_within(dialog)?, Some(email));
        Ok(())
    }

    #[test]
    fn toggle_class_reports_resulting_state() -> Result<()> {
        let mut page = Page::from_html("<nav id='menu' class='main-nav'></nav>")?;
        let menu = page.select_one("#menu")?;
        assert!(page.toggle_class(menu, "active")?);
        page.assert_class("#menu", "active", true)?;
        assert!(!page.toggle_class(menu, "active")?);
        page.assert_class("#menu", "active", false)?;
        page.assert_class("#menu", "main-nav", true)?;
        Ok(())
    }

    #[test]
    fn is_disabled_follows_the_attribute() -> Result<()> {
        let mut page =
            Page::from_html("<button id='go'>Go</button><button id='off' disabled>x</button>")?;
        let go = page.select_one("#go")?;
        assert!(!page.is_disabled(go));
        assert!(page.is_disabled(page.select_one("#off")?));
        page.set_disabled(go, true)?;
        assert!(page.is_disabled(go));
        page.set_disabled(go, false)?;
        assert!(!page.is_disabled(go));
        Ok(())
    }
}
