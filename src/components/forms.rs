use std::cell::Cell;
use std::rc::Rc;

use super::{Component, bool_attr};
use crate::backend::{NetworkError, SubmissionBackend, await_submission};
use crate::config::SiteConfig;
use crate::util::{announce, debounce, is_valid_email, select_all};
use crate::{EventTarget, NodeId, Page, Result, TimerId};

pub(crate) const REQUIRED_MESSAGE: &str = "This field is required";
pub(crate) const EMAIL_MESSAGE: &str = "Please enter a valid email address";

/// Result of checking one control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FieldValidity {
    pub(crate) valid: bool,
    pub(crate) message: String,
}

fn check_field(page: &Page, field: NodeId) -> Result<FieldValidity> {
    let value = page.value(field)?;
    let value = value.trim();
    let is_email = page
        .attr(field, "type")
        .is_some_and(|kind| kind.eq_ignore_ascii_case("email"));
    let message = if page.is_required(field) && value.is_empty() {
        REQUIRED_MESSAGE
    } else if is_email && !value.is_empty() && !is_valid_email(value) {
        EMAIL_MESSAGE
    } else {
        ""
    };
    Ok(FieldValidity {
        valid: message.is_empty(),
        message: message.to_string(),
    })
}

/// Error element paired with a field: `#<name>-error`.
fn error_element(page: &Page, field: NodeId) -> Option<NodeId> {
    let key = page
        .attr(field, "name")
        .or_else(|| page.attr(field, "id"))
        .filter(|key| !key.is_empty())?;
    page.by_id(&format!("{key}-error"))
}

pub(crate) fn show_field_state(
    page: &mut Page,
    field: NodeId,
    validity: &FieldValidity,
) -> Result<()> {
    page.set_attr(field, "aria-invalid", bool_attr(!validity.valid))?;
    page.set_class(field, "error", !validity.valid)?;
    if let Some(slot) = error_element(page, field) {
        page.set_text(slot, &validity.message)?;
    }
    Ok(())
}

/// Checks a field and projects the outcome onto the page.
pub(crate) fn validate_field(page: &mut Page, field: NodeId) -> Result<bool> {
    let validity = check_field(page, field)?;
    show_field_state(page, field, &validity)?;
    Ok(validity.valid)
}

pub(crate) fn clear_field_error(page: &mut Page, field: NodeId) -> Result<()> {
    show_field_state(
        page,
        field,
        &FieldValidity {
            valid: true,
            message: String::new(),
        },
    )
}

pub(crate) fn show_field_error(page: &mut Page, field: NodeId, message: &str) -> Result<()> {
    show_field_state(
        page,
        field,
        &FieldValidity {
            valid: false,
            message: message.to_string(),
        },
    )
}

/// Submit control of a form and its label, for the busy/restore cycle.
#[derive(Debug, Clone)]
struct SubmitButton {
    node: NodeId,
    label: String,
}

impl SubmitButton {
    fn find(page: &Page, form: NodeId) -> Result<Option<Self>> {
        let node = match page.query_within(form, "[type=\"submit\"]")? {
            Some(node) => Some(node),
            None => page.query_within(form, "button")?,
        };
        Ok(node.map(|node| Self {
            node,
            label: page.text(node),
        }))
    }

    fn busy(&self, page: &mut Page, label: &str) -> Result<()> {
        page.set_disabled(self.node, true)?;
        page.set_text(self.node, label)
    }

    fn restore(&self, page: &mut Page) -> Result<()> {
        page.set_disabled(self.node, false)?;
        page.set_text(self.node, &self.label)
    }
}

/// Submission lifecycle of one form: at most one request in flight and at
/// most one pending restore of the submit button.
#[derive(Debug)]
pub(crate) struct SubmitFlow {
    button: Option<SubmitButton>,
    in_flight: Cell<bool>,
    pending_restore: Cell<Option<TimerId>>,
}

impl SubmitFlow {
    /// Captures the submit control and its resting label.
    pub(crate) fn bind(page: &Page, form: NodeId) -> Result<Rc<Self>> {
        Ok(Rc::new(Self {
            button: SubmitButton::find(page, form)?,
            in_flight: Cell::new(false),
            pending_restore: Cell::new(None),
        }))
    }

    /// Claims the flow for a new request and marks the button busy. Returns
    /// `false` while an earlier request is still in flight. A restore left
    /// over from the previous request is cancelled.
    pub(crate) fn begin(&self, page: &mut Page, busy_label: &str) -> Result<bool> {
        if self.in_flight.replace(true) {
            return Ok(false);
        }
        if let Some(timer) = self.pending_restore.take() {
            page.clear_timer(timer);
        }
        if let Some(button) = &self.button {
            button.busy(page, busy_label)?;
        }
        Ok(true)
    }

    /// The request settled; a new one may start.
    pub(crate) fn finish(&self) {
        self.in_flight.set(false);
    }

    pub(crate) fn is_in_flight(&self) -> bool {
        self.in_flight.get()
    }

    pub(crate) fn show(&self, page: &mut Page, label: &str) -> Result<()> {
        match &self.button {
            Some(button) => page.set_text(button.node, label),
            None => Ok(()),
        }
    }

    /// Re-enables the button while keeping its current label.
    pub(crate) fn enable(&self, page: &mut Page) -> Result<()> {
        match &self.button {
            Some(button) => page.set_disabled(button.node, false),
            None => Ok(()),
        }
    }

    pub(crate) fn restore(&self, page: &mut Page) -> Result<()> {
        match &self.button {
            Some(button) => button.restore(page),
            None => Ok(()),
        }
    }

    /// Runs `then` after `delay_ms` unless a newer request begins first.
    pub(crate) fn schedule_restore<F>(self: &Rc<Self>, page: &mut Page, delay_ms: i64, then: F)
    where
        F: FnOnce(&mut Page, &SubmitFlow) -> Result<()> + 'static,
    {
        let flow = Rc::clone(self);
        let timer = page.set_timeout(delay_ms, move |page| {
            flow.pending_restore.set(None);
            then(page, &flow)
        });
        if let Some(previous) = self.pending_restore.replace(Some(timer)) {
            page.clear_timer(previous);
        }
    }
}

/// Field validation for every form plus the newsletter and contact flows.
pub struct Forms {
    config: Rc<SiteConfig>,
    backend: Rc<dyn SubmissionBackend>,
}

impl Forms {
    pub fn new(config: Rc<SiteConfig>, backend: Rc<dyn SubmissionBackend>) -> Self {
        Self { config, backend }
    }
}

impl Component for Forms {
    fn name(&self) -> &'static str {
        "Forms"
    }

    fn init(&self, page: &mut Page) -> Result<()> {
        let debounce_ms = self.config.timing.field_debounce_ms;
        let mut fields = 0usize;
        for form in select_all(page, "form", None)? {
            for field in select_all(page, "input, textarea, select", Some(form))? {
                if page.attr(field, "type").is_some_and(|kind| {
                    matches!(kind.as_str(), "submit" | "button" | "hidden" | "reset")
                }) {
                    continue;
                }
                page.add_event_listener(EventTarget::Node(field), "blur", move |page, _| {
                    validate_field(page, field).map(|_| ())
                });
                let delayed = debounce(debounce_ms, move |page| {
                    validate_field(page, field).map(|_| ())
                });
                page.add_event_listener(EventTarget::Node(field), "input", move |page, _| {
                    delayed.call(page)
                });
                fields += 1;
            }
        }

        for form in select_all(page, ".newsletter-form", None)? {
            self.bind_newsletter(page, form)?;
        }
        for form in select_all(page, ".contact-form", None)? {
            self.bind_contact(page, form)?;
        }
        tracing::debug!(fields, "form validation bound");
        Ok(())
    }
}

impl Forms {
    fn bind_newsletter(&self, page: &mut Page, form: NodeId) -> Result<()> {
        let backend = self.backend.clone();
        let flow = SubmitFlow::bind(page, form)?;
        let reset_ms = self.config.timing.form_reset_ms;
        page.add_event_listener(EventTarget::Node(form), "submit", move |page, event| {
            event.prevent_default();
            let Some(email) = page.query_within(form, "input[type=\"email\"]")? else {
                return Ok(());
            };
            if !validate_field(page, email)? {
                return Ok(());
            }
            let address = page.value(email)?.trim().to_string();
            if !flow.begin(page, "Subscribing...")? {
                return Ok(());
            }
            let submission = backend.submit_email(&address);
            let pending = flow.clone();
            await_submission(page, submission, move |page, outcome| {
                settle(page, form, &pending, outcome, reset_ms, SettleText {
                    success_label: "Subscribed!",
                    success_announcement: "Successfully subscribed to the newsletter!",
                    failure_announcement: "Subscription failed. Please try again.",
                })
            });
            Ok(())
        });
        Ok(())
    }

    fn bind_contact(&self, page: &mut Page, form: NodeId) -> Result<()> {
        let backend = self.backend.clone();
        let flow = SubmitFlow::bind(page, form)?;
        let reset_ms = self.config.timing.form_reset_ms;
        page.add_event_listener(EventTarget::Node(form), "submit", move |page, event| {
            event.prevent_default();
            if flow.is_in_flight() {
                return Ok(());
            }
            let mut all_valid = true;
            for field in select_all(page, "input, textarea, select", Some(form))? {
                if page.is_required(field) && !validate_field(page, field)? {
                    all_valid = false;
                }
            }
            if !all_valid {
                return announce(page, "Please correct the errors in the form");
            }

            let data = page.form_data(form)?;
            tracing::debug!(body = %data.to_urlencoded(), "contact form submitted");
            if !flow.begin(page, "Sending...")? {
                return Ok(());
            }
            let submission = backend.submit_contact_form(&data);
            let pending = flow.clone();
            await_submission(page, submission, move |page, outcome| {
                settle(page, form, &pending, outcome, reset_ms, SettleText {
                    success_label: "Message Sent!",
                    success_announcement:
                        "Thank you for your message! We'll get back to you within 48 hours.",
                    failure_announcement: "Message could not be sent. Please try again.",
                })
            });
            Ok(())
        });
        Ok(())
    }
}

struct SettleText {
    success_label: &'static str,
    success_announcement: &'static str,
    failure_announcement: &'static str,
}

/// Shared tail of the newsletter and contact flows.
fn settle(
    page: &mut Page,
    form: NodeId,
    flow: &Rc<SubmitFlow>,
    outcome: std::result::Result<(), NetworkError>,
    reset_ms: i64,
    text: SettleText,
) -> Result<()> {
    flow.finish();
    match outcome {
        Ok(()) => {
            flow.show(page, text.success_label)?;
            announce(page, text.success_announcement)?;
            flow.schedule_restore(page, reset_ms, move |page, flow| {
                page.reset_form(form)?;
                flow.restore(page)
            });
        }
        Err(err) => {
            tracing::warn!(%err, "form submission failed");
            flow.enable(page)?;
            flow.show(page, "Try Again")?;
            announce(page, text.failure_announcement)?;
            flow.schedule_restore(page, reset_ms, |page, flow| flow.restore(page));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{ScriptedBackend, Submission};

    const FORMS: &str = r#"
        <form class="newsletter-form">
          <input type="email" name="newsletter-email" required>
          <span id="newsletter-email-error"></span>
          <button type="submit">Subscribe</button>
        </form>
        <form class="contact-form">
          <input name="name" required value="">
          <span id="name-error"></span>
          <input type="email" name="email" required>
          <span id="email-error"></span>
          <textarea name="message" required></textarea>
          <span id="message-error"></span>
          <button type="submit">Send Message</button>
        </form>
        <div id="announcements"></div>
    "#;

    fn forms(backend: &Rc<ScriptedBackend>) -> Result<Page> {
        let mut page = Page::from_html(FORMS)?;
        let shared: Rc<dyn SubmissionBackend> = backend.clone();
        Forms::new(Rc::default(), shared).init(&mut page)?;
        Ok(page)
    }

    #[test]
    fn blur_validates_immediately_and_input_after_debounce() -> Result<()> {
        let backend = Rc::new(ScriptedBackend::new());
        let mut page = forms(&backend)?;
        page.focus("[name=\"name\"]")?;
        page.blur("[name=\"name\"]")?;
        page.assert_text("#name-error", REQUIRED_MESSAGE)?;
        page.assert_attr("[name=\"name\"]", "aria-invalid", Some("true"))?;
        page.assert_class("[name=\"name\"]", "error", true)?;

        page.type_text("[name=\"email\"]", "a@b")?;
        page.advance_time(299)?;
        page.assert_text("#email-error", "")?;
        page.advance_time(1)?;
        page.assert_text("#email-error", EMAIL_MESSAGE)?;

        page.type_text("[name=\"email\"]", "a@b.co")?;
        page.advance_time(300)?;
        page.assert_text("#email-error", "")?;
        page.assert_attr("[name=\"email\"]", "aria-invalid", Some("false"))?;
        Ok(())
    }

    #[test]
    fn contact_with_empty_required_field_never_submits() -> Result<()> {
        let backend = Rc::new(ScriptedBackend::new());
        let mut page = forms(&backend)?;
        page.type_text("[name=\"name\"]", "Ada")?;
        page.type_text("[name=\"email\"]", "ada@example.com")?;
        page.submit(".contact-form")?;

        assert!(backend.contact_calls().is_empty());
        page.assert_text("#announcements", "Please correct the errors in the form")?;
        page.assert_text("#message-error", REQUIRED_MESSAGE)?;
        Ok(())
    }

    #[test]
    fn contact_success_announces_and_resets() -> Result<()> {
        let backend = Rc::new(ScriptedBackend::new());
        let mut page = forms(&backend)?;
        page.type_text("[name=\"name\"]", "Ada")?;
        page.type_text("[name=\"email\"]", "ada@example.com")?;
        page.type_text("[name=\"message\"]", "Hi there")?;
        page.click(".contact-form button")?;

        page.assert_text(".contact-form button", "Sending...")?;
        page.assert_attr(".contact-form button", "disabled", Some(""))?;
        let calls = backend.contact_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].to_urlencoded(),
            "name=Ada&email=ada%40example.com&message=Hi+there"
        );

        page.advance_time(2_000)?;
        page.assert_text(".contact-form button", "Message Sent!")?;
        page.assert_text(
            "#announcements",
            "Thank you for your message! We'll get back to you within 48 hours.",
        )?;
        page.advance_time(3_000)?;
        page.assert_text(".contact-form button", "Send Message")?;
        page.assert_attr(".contact-form button", "disabled", None)?;
        page.assert_value("[name=\"name\"]", "")?;
        Ok(())
    }

    #[test]
    fn newsletter_failure_shows_try_again_then_restores() -> Result<()> {
        let backend = Rc::new(ScriptedBackend::new());
        backend.push_email_outcome(Submission::fail_after(1_500, "Network error"));
        let mut page = forms(&backend)?;
        page.type_text(".newsletter-form input", "fan@pod.example")?;
        page.submit(".newsletter-form")?;
        page.assert_text(".newsletter-form button", "Subscribing...")?;

        page.advance_time(1_500)?;
        page.assert_text(".newsletter-form button", "Try Again")?;
        page.assert_attr(".newsletter-form button", "disabled", None)?;
        page.assert_text("#announcements", "Subscription failed. Please try again.")?;
        page.advance_time(3_000)?;
        page.assert_text(".newsletter-form button", "Subscribe")?;
        assert_eq!(backend.email_calls(), vec!["fan@pod.example"]);
        Ok(())
    }

    #[test]
    fn retry_after_failure_restores_original_label() -> Result<()> {
        let backend = Rc::new(ScriptedBackend::new());
        backend.push_email_outcome(Submission::fail_after(1_500, "Network error"));
        let mut page = forms(&backend)?;
        page.type_text(".newsletter-form input", "fan@pod.example")?;
        page.submit(".newsletter-form")?;
        page.advance_time(1_500)?;
        page.submit(".newsletter-form")?;
        page.advance_time(1_500)?;
        page.assert_text(".newsletter-form button", "Subscribed!")?;
        page.advance_time(3_000)?;
        page.assert_text(".newsletter-form button", "Subscribe")?;
        Ok(())
    }

    #[test]
    fn retry_inside_try_again_window_stays_busy_until_it_settles() -> Result<()> {
        let backend = Rc::new(ScriptedBackend::new());
        backend.push_email_outcome(Submission::fail_after(1_500, "Network error"));
        let mut page = forms(&backend)?;
        page.type_text(".newsletter-form input", "fan@pod.example")?;
        page.submit(".newsletter-form")?;
        page.advance_time(1_500)?;
        page.assert_text(".newsletter-form button", "Try Again")?;

        page.advance_time(2_500)?;
        page.submit(".newsletter-form")?;
        page.advance_time(500)?;
        page.assert_text(".newsletter-form button", "Subscribing...")?;
        page.assert_attr(".newsletter-form button", "disabled", Some(""))?;

        page.submit(".newsletter-form")?;
        assert_eq!(backend.email_calls().len(), 2);

        page.advance_time(1_000)?;
        page.assert_text(".newsletter-form button", "Subscribed!")?;
        page.advance_time(3_000)?;
        page.assert_text(".newsletter-form button", "Subscribe")?;
        page.assert_attr(".newsletter-form button", "disabled", None)?;
        Ok(())
    }

    #[test]
    fn contact_submit_while_sending_is_ignored() -> Result<()> {
        let backend = Rc::new(ScriptedBackend::new());
        let mut page = forms(&backend)?;
        page.type_text("[name=\"name\"]", "Ada")?;
        page.type_text("[name=\"email\"]", "ada@example.com")?;
        page.type_text("[name=\"message\"]", "Hi there")?;
        page.submit(".contact-form")?;
        page.advance_time(1_000)?;
        page.submit(".contact-form")?;
        assert_eq!(backend.contact_calls().len(), 1);
        page.assert_text(".contact-form button", "Sending...")?;
        Ok(())
    }

    #[test]
    fn newsletter_with_invalid_email_only_shows_field_error() -> Result<()> {
        let backend = Rc::new(ScriptedBackend::new());
        let mut page = forms(&backend)?;
        page.type_text(".newsletter-form input", "not-an-email")?;
        page.submit(".newsletter-form")?;
        assert!(backend.email_calls().is_empty());
        page.assert_text("#newsletter-email-error", EMAIL_MESSAGE)?;
        page.assert_text(".newsletter-form button", "Subscribe")?;
        Ok(())
    }
}
