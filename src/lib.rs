//! Interaction layer for a static podcast site.
//!
//! The crate wires navigation, a simulated audio player, modal dialogs, form
//! validation, an FAQ accordion, search/filter stubs, scroll effects and
//! accessibility announcements onto a [`Page`]: a deterministic page model with
//! an arena DOM, capture/bubble event dispatch, a virtual clock and mocked
//! platform features (viewport, `matchMedia`, intersection observers).
//!
//! ```no_run
//! use site_interactions::{Page, Site, backend::SimulatedBackend};
//!
//! # fn main() -> site_interactions::Result<()> {
//! let mut page = Page::from_html(r#"<div id="announcements"></div>"#)?;
//! let site = Site::new(SimulatedBackend::shared(7));
//! site.install(&mut page)?;
//! page.finish_loading()?;
//! page.advance_time(1_000)?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod components;
pub mod config;
mod dom;
mod events;
mod html;
mod page;
mod rng;
mod scheduler;
mod selector;
mod site;
pub mod util;

pub use dom::NodeId;
pub use events::{Event, EventTarget};
pub use page::{
    ConsoleLevel, ConsoleMessage, IntersectionEntry, IntersectionOptions, ObserverId, Page,
    ReadyState, ScrollBehavior, ScrollRequest,
};
pub use scheduler::{PendingTimer, TimerId};
pub use site::{InitReport, Site};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("html parse error: {0}")]
    HtmlParse(String),
    #[error("selector not found: {0}")]
    SelectorNotFound(String),
    #[error("unsupported selector: {0}")]
    UnsupportedSelector(String),
    #[error("type mismatch for {selector}: expected {expected}, actual {actual}")]
    TypeMismatch {
        selector: String,
        expected: String,
        actual: String,
    },
    #[error(
        "assertion failed for {selector}: expected {expected}, actual {actual}, snippet {dom_snippet}"
    )]
    AssertionFailed {
        selector: String,
        expected: String,
        actual: String,
        dom_snippet: String,
    },
    #[error("runtime error: {0}")]
    Runtime(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("{component} failed to initialize: {message}")]
    Init { component: String, message: String },
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Self::Config(err.to_string())
    }
}
