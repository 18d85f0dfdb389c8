use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::backend::SubmissionBackend;
use crate::components::{
    Animations, AudioPlayer, Component, ErrorHandler, Faq, Forms, Modal, Navigation, Performance,
    ScrollEffects, Search, SearchActivity, Theme,
};
use crate::config::SiteConfig;
use crate::{Error, Page, ReadyState, Result};

/// Outcome of one initialization pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitReport {
    pub initialized: Vec<&'static str>,
    pub failed: Vec<(&'static str, Error)>,
}

impl InitReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Every site behavior, initialized in a fixed order once the document is
/// ready. Cloning shares the same state.
#[derive(Clone)]
pub struct Site {
    backend: Rc<dyn SubmissionBackend>,
    config: Rc<SiteConfig>,
    search: Rc<Search>,
    installed: Rc<Cell<bool>>,
    report: Rc<RefCell<Option<InitReport>>>,
}

impl Site {
    pub fn new(backend: Rc<dyn SubmissionBackend>) -> Self {
        Self::with_config(backend, SiteConfig::default())
    }

    pub fn with_config(backend: Rc<dyn SubmissionBackend>, config: SiteConfig) -> Self {
        let config = Rc::new(config);
        Self {
            search: Rc::new(Search::new(config.clone())),
            backend,
            config,
            installed: Rc::default(),
            report: Rc::default(),
        }
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// Components in initialization order.
    pub fn components(&self) -> Vec<Box<dyn Component>> {
        let config = &self.config;
        vec![
            Box::new(Navigation::new(config.clone())),
            Box::new(AudioPlayer::new(config.clone())),
            Box::new(Modal::new(config.clone(), self.backend.clone())),
            Box::new(Forms::new(config.clone(), self.backend.clone())),
            Box::new(Faq),
            Box::new(self.search.clone()),
            Box::new(ScrollEffects::new(config.clone())),
            Box::new(Animations::new(config.clone())),
            Box::new(Theme),
            Box::new(ErrorHandler),
            Box::new(Performance),
        ]
    }

    /// Initializes now when the document is parsed, otherwise on
    /// `DOMContentLoaded`. A site installs once per page.
    pub fn install(&self, page: &mut Page) -> Result<()> {
        if self.installed.replace(true) {
            return Err(Error::Runtime("site is already installed".into()));
        }
        if page.ready_state() == ReadyState::Loading {
            let site = self.clone();
            let document = page.document();
            page.add_event_listener(document, "DOMContentLoaded", move |page, _| {
                site.initialize(page);
                Ok(())
            });
            tracing::debug!("site initialization deferred until DOMContentLoaded");
            return Ok(());
        }
        self.initialize(page);
        Ok(())
    }

    /// Runs every component's init. A failure is logged and recorded without
    /// stopping the components after it.
    pub fn initialize(&self, page: &mut Page) -> InitReport {
        let mut report = InitReport::default();
        for component in self.components() {
            let name = component.name();
            match component.init(page) {
                Ok(()) => report.initialized.push(name),
                Err(err) => {
                    tracing::error!(
                        component = name,
                        error = %err,
                        "component initialization failed"
                    );
                    page.console_error(&format!("Error initializing {name}: {err}"));
                    let err = match err {
                        Error::Init { .. } => err,
                        other => Error::Init {
                            component: name.to_string(),
                            message: other.to_string(),
                        },
                    };
                    report.failed.push((name, err));
                }
            }
        }
        tracing::info!(
            initialized = report.initialized.len(),
            failed = report.failed.len(),
            "site initialized"
        );
        *self.report.borrow_mut() = Some(report.clone());
        report
    }

    /// Report of the last initialization, `None` before it ran.
    pub fn report(&self) -> Option<InitReport> {
        self.report.borrow().clone()
    }

    pub fn search_activity(&self) -> SearchActivity {
        self.search.activity()
    }
}
