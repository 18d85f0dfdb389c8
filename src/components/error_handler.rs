use super::Component;
use crate::{EventTarget, Page, Result};

/// Logs failures that escaped every listener and continuation.
#[derive(Debug, Default)]
pub struct ErrorHandler;

impl Component for ErrorHandler {
    fn name(&self) -> &'static str {
        "ErrorHandler"
    }

    fn init(&self, page: &mut Page) -> Result<()> {
        page.add_event_listener(EventTarget::Window, "error", |page, event| {
            let detail = event.detail.clone().unwrap_or_default();
            tracing::error!(%detail, "global error");
            page.console_error(&format!("Global error: {detail}"));
            Ok(())
        });
        page.add_event_listener(EventTarget::Window, "unhandledrejection", |page, event| {
            let detail = event.detail.clone().unwrap_or_default();
            tracing::error!(%detail, "unhandled rejection");
            page.console_error(&format!("Unhandled promise rejection: {detail}"));
            Ok(())
        });
        Ok(())
    }
}
