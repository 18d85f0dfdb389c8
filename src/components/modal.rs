use std::rc::Rc;

use super::forms::{EMAIL_MESSAGE, SubmitFlow, clear_field_error, show_field_error};
use super::{Component, lock_scroll, target_of};
use crate::backend::{SubmissionBackend, await_submission};
use crate::config::SiteConfig;
use crate::util::{announce, is_valid_email, select_all};
use crate::{EventTarget, NodeId, Page, Result};

const SUBMIT_FAILED_MESSAGE: &str = "Something went wrong. Please try again.";

/// Dialog lifecycle for every `.modal` plus the email-capture flow.
pub struct Modal {
    config: Rc<SiteConfig>,
    backend: Rc<dyn SubmissionBackend>,
}

#[derive(Debug, Clone, Copy)]
struct DialogTiming {
    focus_delay_ms: i64,
    exit_ms: i64,
}

impl Modal {
    pub fn new(config: Rc<SiteConfig>, backend: Rc<dyn SubmissionBackend>) -> Self {
        Self { config, backend }
    }

    fn timing(&self) -> DialogTiming {
        DialogTiming {
            focus_delay_ms: self.config.timing.modal_focus_delay_ms,
            exit_ms: self.config.timing.modal_exit_ms,
        }
    }
}

fn is_open(page: &Page, modal: NodeId) -> bool {
    page.attr(modal, "aria-hidden").as_deref() == Some("false")
}

fn open_modal(page: &mut Page, modal: NodeId, timing: DialogTiming) -> Result<()> {
    page.set_attr(modal, "aria-hidden", "false")?;
    page.set_style(modal, "display", "flex")?;
    lock_scroll(page, true)?;
    page.set_timeout(timing.focus_delay_ms, move |page| {
        if !is_open(page, modal) {
            return Ok(());
        }
        match page.first_focusable_within(modal)? {
            Some(first) => page.focus_node(first),
            None => Ok(()),
        }
    });
    announce(page, "Dialog opened")
}

fn close_modal(page: &mut Page, modal: NodeId, timing: DialogTiming) -> Result<()> {
    if !is_open(page, modal) {
        return Ok(());
    }
    page.set_attr(modal, "aria-hidden", "true")?;
    page.set_timeout(timing.exit_ms, move |page| {
        // Reopened during the exit animation.
        if is_open(page, modal) {
            return Ok(());
        }
        page.set_style(modal, "display", "")
    });
    lock_scroll(page, false)?;
    announce(page, "Dialog closed")
}

impl Component for Modal {
    fn name(&self) -> &'static str {
        "Modal"
    }

    fn init(&self, page: &mut Page) -> Result<()> {
        let timing = self.timing();
        for trigger in select_all(page, "[data-modal]", None)? {
            page.add_event_listener(EventTarget::Node(trigger), "click", move |page, event| {
                let id = page.attr(trigger, "data-modal").unwrap_or_default();
                let Some(modal) = page.by_id(&id) else {
                    tracing::warn!(%id, "modal trigger points at a missing dialog");
                    return Ok(());
                };
                event.prevent_default();
                open_modal(page, modal, timing)
            });
        }

        let modals = select_all(page, ".modal", None)?;
        for &modal in &modals {
            for close in select_all(page, ".modal-close, .modal-overlay", Some(modal))? {
                page.add_event_listener(EventTarget::Node(close), "click", move |page, event| {
                    // Clicks inside dialog content bubble through the overlay.
                    if page.has_class(close, "modal-overlay") && target_of(event)? != close {
                        return Ok(());
                    }
                    event.prevent_default();
                    close_modal(page, modal, timing)
                });
            }
        }

        let document = page.document();
        page.add_event_listener(document, "keydown", move |page, event| {
            if !event.key_is("Escape") {
                return Ok(());
            }
            for &modal in &modals {
                close_modal(page, modal, timing)?;
            }
            Ok(())
        });

        self.bind_email_capture(page)?;
        tracing::debug!("modals initialized");
        Ok(())
    }
}

impl Modal {
    fn bind_email_capture(&self, page: &mut Page) -> Result<()> {
        let Some(form) =
            page.query_selector("#email-modal .email-capture-form, .email-capture-form")?
        else {
            return Ok(());
        };
        let modal = page.closest(form, ".modal")?;
        let backend = self.backend.clone();
        let timing = self.timing();
        let close_after_ms = self.config.timing.modal_success_close_ms;
        let flow = SubmitFlow::bind(page, form)?;

        page.add_event_listener(EventTarget::Node(form), "submit", move |page, event| {
            event.prevent_default();
            let Some(email) =
                page.query_within(form, "input[type=\"email\"], input[name=\"email\"]")?
            else {
                return Ok(());
            };
            clear_field_error(page, email)?;
            let address = page.value(email)?.trim().to_string();
            if !is_valid_email(&address) {
                show_field_error(page, email, EMAIL_MESSAGE)?;
                return announce(page, EMAIL_MESSAGE);
            }

            if !flow.begin(page, "Subscribing...")? {
                return Ok(());
            }
            let submission = backend.submit_email(&address);
            let pending = flow.clone();
            await_submission(page, submission, move |page, outcome| {
                pending.finish();
                match outcome {
                    Ok(()) => {
                        pending.show(page, "Subscribed!")?;
                        announce(page, "Successfully subscribed! Check your inbox.")?;
                        pending.schedule_restore(page, close_after_ms, move |page, flow| {
                            if let Some(modal) = modal {
                                close_modal(page, modal, timing)?;
                            }
                            page.reset_form(form)?;
                            flow.restore(page)
                        });
                        Ok(())
                    }
                    Err(err) => {
                        tracing::warn!(%err, "email capture failed");
                        pending.restore(page)?;
                        show_field_error(page, email, SUBMIT_FAILED_MESSAGE)?;
                        announce(page, SUBMIT_FAILED_MESSAGE)
                    }
                }
            });
            Ok(())
        });
        Ok(())
    }
}
