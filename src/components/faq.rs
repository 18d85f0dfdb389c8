use std::cell::Cell;
use std::rc::Rc;

use super::{Component, bool_attr, required_part};
use crate::util::select_all;
use crate::{EventTarget, NodeId, Page, Result};

/// Accordion where opening one question closes every other.
#[derive(Debug, Default)]
pub struct Faq;

#[derive(Debug, Clone, Copy)]
struct FaqItem {
    question: NodeId,
    answer: NodeId,
}

fn render(page: &mut Page, items: &[FaqItem], open: Option<usize>) -> Result<()> {
    for (index, item) in items.iter().enumerate() {
        let expanded = open == Some(index);
        page.set_attr(item.question, "aria-expanded", bool_attr(expanded))?;
        if expanded {
            page.remove_attr(item.answer, "hidden")?;
        } else {
            page.set_attr(item.answer, "hidden", "")?;
        }
    }
    Ok(())
}

impl Component for Faq {
    fn name(&self) -> &'static str {
        "FAQ"
    }

    fn init(&self, page: &mut Page) -> Result<()> {
        let mut items = Vec::new();
        for item in select_all(page, ".faq-item", None)? {
            items.push(FaqItem {
                question: required_part(page, self.name(), item, ".faq-question")?,
                answer: required_part(page, self.name(), item, ".faq-answer")?,
            });
        }
        let items: Rc<[FaqItem]> = items.into();
        let open = Rc::new(Cell::new(items.iter().position(|item| {
            page.attr(item.question, "aria-expanded").as_deref() == Some("true")
        })));

        for (index, item) in items.iter().enumerate() {
            let question = item.question;
            let click_items = items.clone();
            let click_open = open.clone();
            page.add_event_listener(EventTarget::Node(question), "click", move |page, event| {
                event.prevent_default();
                let next = if click_open.get() == Some(index) {
                    None
                } else {
                    Some(index)
                };
                click_open.set(next);
                render(page, &click_items, next)
            });
            page.add_event_listener(EventTarget::Node(question), "keydown", move |page, event| {
                if event.is_activation_key() {
                    event.prevent_default();
                    page.click_node(question)?;
                }
                Ok(())
            });
        }
        tracing::debug!(items = items.len(), "faq initialized");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    const FAQ: &str = r#"
        <div class="faq-item" id="a">
          <button class="faq-question" aria-expanded="false">How often?</button>
          <div class="faq-answer" hidden>Weekly.</div>
        </div>
        <div class="faq-item" id="b">
          <button class="faq-question" aria-expanded="false">Where?</button>
          <div class="faq-answer" hidden>Everywhere.</div>
        </div>
        <div class="faq-item" id="c">
          <button class="faq-question" aria-expanded="false">Cost?</button>
          <div class="faq-answer" hidden>Free.</div>
        </div>
    "#;

    fn expanded_count(page: &Page) -> Result<usize> {
        Ok(page
            .query_selector_all(".faq-question[aria-expanded=\"true\"]")?
            .len())
    }

    #[test]
    fn opening_one_item_collapses_the_other() -> Result<()> {
        let mut page = Page::from_html(FAQ)?;
        Faq.init(&mut page)?;
        page.click("#a .faq-question")?;
        page.assert_attr("#a .faq-question", "aria-expanded", Some("true"))?;
        page.assert_attr("#a .faq-answer", "hidden", None)?;

        page.click("#b .faq-question")?;
        page.assert_attr("#a .faq-question", "aria-expanded", Some("false"))?;
        page.assert_attr("#a .faq-answer", "hidden", Some(""))?;
        page.assert_attr("#b .faq-question", "aria-expanded", Some("true"))?;
        assert_eq!(expanded_count(&page)?, 1);

        page.click("#b .faq-question")?;
        assert_eq!(expanded_count(&page)?, 0);
        Ok(())
    }

    #[test]
    fn keyboard_activation_matches_click() -> Result<()> {
        let mut page = Page::from_html(FAQ)?;
        Faq.init(&mut page)?;
        page.press_key("#c .faq-question", "Enter")?;
        page.assert_attr("#c .faq-question", "aria-expanded", Some("true"))?;
        page.press_key("#a .faq-question", " ")?;
        page.assert_attr("#c .faq-question", "aria-expanded", Some("false"))?;
        page.press_key("#a .faq-question", "Tab")?;
        page.assert_attr("#a .faq-question", "aria-expanded", Some("true"))?;
        Ok(())
    }

    #[test]
    fn never_more_than_one_expanded_for_any_click_sequence() -> Result<()> {
        let mut page = Page::from_html(FAQ)?;
        Faq.init(&mut page)?;
        for id in ["a", "a", "b", "c", "c", "b", "a", "c"] {
            page.click(&format!("#{id} .faq-question"))?;
            assert!(expanded_count(&page)? <= 1);
        }
        Ok(())
    }

    #[test]
    fn item_without_answer_is_an_init_error() -> Result<()> {
        let mut page =
            Page::from_html("<div class='faq-item'><button class='faq-question'>Q</button></div>")?;
        assert!(matches!(Faq.init(&mut page), Err(Error::Init { .. })));
        Ok(())
    }
}
