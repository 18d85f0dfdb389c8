use std::cell::Cell;
use std::rc::Rc;

use super::{Component, bool_attr, lock_scroll, required_part, target_of};
use crate::config::SiteConfig;
use crate::util::{announce, select_all};
use crate::{EventTarget, NodeId, Page, Result, ScrollBehavior, TimerId};

/// Mobile menu, dropdowns, active-link marking and in-page smooth scrolling.
pub struct Navigation {
    config: Rc<SiteConfig>,
}

impl Navigation {
    pub fn new(config: Rc<SiteConfig>) -> Self {
        Self { config }
    }
}

impl Default for Navigation {
    fn default() -> Self {
        Self::new(Rc::default())
    }
}

#[derive(Clone)]
struct MobileMenu {
    toggle: NodeId,
    menu: NodeId,
    open: Rc<Cell<bool>>,
}

impl MobileMenu {
    fn set_open(&self, page: &mut Page, open: bool) -> Result<()> {
        self.open.set(open);
        for node in [self.toggle, self.menu] {
            page.set_attr(node, "aria-expanded", bool_attr(open))?;
            page.set_class(node, "active", open)?;
        }
        lock_scroll(page, open)?;
        announce(
            page,
            if open {
                "Navigation menu opened"
            } else {
                "Navigation menu closed"
            },
        )
    }
}

impl Component for Navigation {
    fn name(&self) -> &'static str {
        "Navigation"
    }

    fn init(&self, page: &mut Page) -> Result<()> {
        let menu = self.init_mobile_menu(page)?;
        self.init_dropdowns(page)?;
        mark_active_links(page)?;
        self.init_smooth_scroll(page, menu)?;
        tracing::debug!("navigation initialized");
        Ok(())
    }
}

impl Navigation {
    fn init_mobile_menu(&self, page: &mut Page) -> Result<Option<MobileMenu>> {
        let (Some(toggle), Some(menu)) = (
            page.query_selector(".nav-toggle")?,
            page.query_selector(".nav-menu")?,
        ) else {
            return Ok(None);
        };
        let state = MobileMenu {
            toggle,
            menu,
            open: Rc::new(Cell::new(
                page.attr(toggle, "aria-expanded").as_deref() == Some("true"),
            )),
        };

        let on_toggle = state.clone();
        page.add_event_listener(EventTarget::Node(toggle), "click", move |page, event| {
            event.prevent_default();
            let open = !on_toggle.open.get();
            on_toggle.set_open(page, open)
        });

        let on_outside = state.clone();
        let document = page.document();
        page.add_event_listener(document, "click", move |page, event| {
            if !on_outside.open.get() {
                return Ok(());
            }
            let target = target_of(event)?;
            if page.contains(on_outside.menu, target) || page.contains(on_outside.toggle, target) {
                return Ok(());
            }
            on_outside.set_open(page, false)
        });

        let on_escape = state.clone();
        page.add_event_listener(document, "keydown", move |page, event| {
            if !event.key_is("Escape") || !on_escape.open.get() {
                return Ok(());
            }
            on_escape.set_open(page, false)?;
            page.focus_node(on_escape.toggle)
        });

        for link in select_all(page, ".nav-link", Some(menu))? {
            page.add_event_listener(EventTarget::Node(link), "keydown", move |page, event| {
                if event.is_activation_key() {
                    event.prevent_default();
                    page.click_node(link)?;
                }
                Ok(())
            });
        }
        Ok(Some(state))
    }

    fn init_dropdowns(&self, page: &mut Page) -> Result<()> {
        let hide_delay = self.config.timing.dropdown_hide_delay_ms;
        for dropdown in select_all(page, ".dropdown", None)? {
            let toggle = required_part(page, self.name(), dropdown, ".dropdown-toggle")?;
            let menu = required_part(page, self.name(), dropdown, ".dropdown-menu")?;
            let hide_timer: Rc<Cell<Option<TimerId>>> = Rc::default();

            let show = move |page: &mut Page, open: bool| -> Result<()> {
                page.set_class(menu, "show", open)?;
                page.set_attr(toggle, "aria-expanded", bool_attr(open))
            };

            let enter_timer = hide_timer.clone();
            page.add_event_listener(EventTarget::Node(dropdown), "mouseenter", move |page, _| {
                if let Some(timer) = enter_timer.take() {
                    page.clear_timer(timer);
                }
                show(page, true)
            });

            let leave_timer = hide_timer.clone();
            page.add_event_listener(EventTarget::Node(dropdown), "mouseleave", move |page, _| {
                if let Some(timer) = leave_timer.take() {
                    page.clear_timer(timer);
                }
                let pending = leave_timer.clone();
                let timer = page.set_timeout(hide_delay, move |page| {
                    pending.set(None);
                    show(page, false)
                });
                leave_timer.set(Some(timer));
                Ok(())
            });

            page.add_event_listener(EventTarget::Node(toggle), "keydown", move |page, event| {
                if !event.is_activation_key() {
                    return Ok(());
                }
                event.prevent_default();
                let open = !page.has_class(menu, "show");
                show(page, open)
            });
        }
        Ok(())
    }

    fn init_smooth_scroll(&self, page: &mut Page, menu: Option<MobileMenu>) -> Result<()> {
        let buffer = self.config.scroll.anchor_buffer_px;
        let focus_delay = self.config.timing.anchor_focus_delay_ms;
        for link in select_all(page, "a[href^=\"#\"]", None)? {
            let menu = menu.clone();
            page.add_event_listener(EventTarget::Node(link), "click", move |page, event| {
                let href = page.attr(link, "href").unwrap_or_default();
                let Some(target) = href
                    .strip_prefix('#')
                    .filter(|id| !id.is_empty())
                    .and_then(|id| page.by_id(id))
                else {
                    return Ok(());
                };
                event.prevent_default();

                let header_height = page
                    .query_selector(".site-header")?
                    .map_or(0, |header| page.offset_height(header));
                let top = page.layout_of(target).top - header_height - buffer;
                page.scroll_window_to(top, ScrollBehavior::Smooth)?;

                if let Some(menu) = menu.as_ref().filter(|menu| menu.open.get()) {
                    menu.set_open(page, false)?;
                }

                page.set_timeout(focus_delay, move |page| {
                    if !page.is_connected(target) {
                        return Ok(());
                    }
                    if !page.is_natively_focusable(target) && !page.has_attr(target, "tabindex") {
                        page.set_attr(target, "tabindex", "-1")?;
                    }
                    page.focus_node(target)
                });
                Ok(())
            });
        }
        Ok(())
    }
}

fn link_path(href: &str) -> Option<String> {
    if href.starts_with('#') || href.starts_with("mailto:") || href.starts_with("tel:") {
        return None;
    }
    let without_origin = match href.split_once("://") {
        Some((_, rest)) => rest.find('/').map_or("/", |pos| &rest[pos..]),
        None => href,
    };
    let end = without_origin
        .find(['?', '#'])
        .unwrap_or(without_origin.len());
    Some(without_origin[..end].to_string())
}

fn is_root_path(path: &str) -> bool {
    matches!(path, "/" | "/index.html")
}

/// Marks the links that point at the current location.
fn mark_active_links(page: &mut Page) -> Result<()> {
    let current = page.location_path();
    for link in select_all(page, ".nav-link", None)? {
        let Some(path) = page.attr(link, "href").as_deref().and_then(link_path) else {
            continue;
        };
        if path == current || (is_root_path(&path) && is_root_path(&current)) {
            page.add_class(link, "active")?;
            page.set_attr(link, "aria-current", "page")?;
        }
    }
    Ok(())
}
