//! Site behaviors. Each component binds its listeners once in
//! [`Component::init`] and afterwards runs on page events and timers only.

use crate::{Error, NodeId, Page, Result};

mod animations;
mod audio_player;
mod error_handler;
mod faq;
mod forms;
mod modal;
mod navigation;
mod performance;
mod scroll_effects;
mod search;
mod theme;

pub use animations::Animations;
pub use audio_player::AudioPlayer;
pub use error_handler::ErrorHandler;
pub use faq::Faq;
pub use forms::Forms;
pub use modal::Modal;
pub use navigation::Navigation;
pub use performance::Performance;
pub use scroll_effects::ScrollEffects;
pub use search::{Search, SearchActivity};
pub use theme::Theme;

pub trait Component {
    fn name(&self) -> &'static str;
    fn init(&self, page: &mut Page) -> Result<()>;
}

impl<C: Component + ?Sized> Component for std::rc::Rc<C> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn init(&self, page: &mut Page) -> Result<()> {
        (**self).init(page)
    }
}

pub(crate) fn bool_attr(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

/// Locks or releases page scrolling through the body's `overflow`.
pub(crate) fn lock_scroll(page: &mut Page, locked: bool) -> Result<()> {
    let Some(body) = page.body() else {
        return Ok(());
    };
    page.set_style(body, "overflow", if locked { "hidden" } else { "" })
}

/// A descendant a widget cannot work without.
pub(crate) fn required_part(
    page: &Page,
    component: &str,
    root: NodeId,
    selector: &str,
) -> Result<NodeId> {
    page.query_within(root, selector)?.ok_or_else(|| Error::Init {
        component: component.to_string(),
        message: format!("{} is missing {selector}", page.describe(root)),
    })
}

pub(crate) fn target_of(event: &crate::Event) -> Result<NodeId> {
    event
        .target_node()
        .ok_or_else(|| Error::Runtime(format!("{} has no element target", event.event_type)))
}
