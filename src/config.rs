//! Timing and threshold settings for the site behaviors.
//!
//! Every value defaults to the reference behavior, so an empty TOML document
//! and [`SiteConfig::default`] are equivalent.
//!
//! # Sections
//!
//! - `[timing]` - delays for menus, dialogs, forms, search and hover effects
//! - `[scroll]` - header and scroll-to-top offsets and throttle windows
//! - `[audio]` - simulated playback tick and click animation
//! - `[reveal]` - intersection threshold and bottom margin for reveals
//!
//! ```
//! use site_interactions::config::SiteConfig;
//!
//! let config = SiteConfig::from_toml_str("[scroll]\nheader_hide_offset = 400\n")?;
//! assert_eq!(config.scroll.header_hide_offset, 400);
//! assert_eq!(config.scroll.header_scrolled_offset, 100);
//! # Ok::<(), site_interactions::Error>(())
//! ```

use serde::{Deserialize, Serialize};

use crate::Result;

// ==========================================================================
// Timing defaults
// ==========================================================================

pub const DEFAULT_DROPDOWN_HIDE_DELAY_MS: i64 = 150;
pub const DEFAULT_ANCHOR_FOCUS_DELAY_MS: i64 = 500;
pub const DEFAULT_MODAL_FOCUS_DELAY_MS: i64 = 100;
pub const DEFAULT_MODAL_EXIT_MS: i64 = 250;
pub const DEFAULT_MODAL_SUCCESS_CLOSE_MS: i64 = 2_000;
pub const DEFAULT_FORM_RESET_MS: i64 = 3_000;
pub const DEFAULT_FIELD_DEBOUNCE_MS: i64 = 300;
pub const DEFAULT_SEARCH_DEBOUNCE_MS: i64 = 500;
/// Queries must be longer than this many characters.
pub const DEFAULT_SEARCH_MIN_CHARS: usize = 2;
pub const DEFAULT_HOVER_ANIMATION_MS: i64 = 300;
pub const DEFAULT_DEFERRED_LOAD_MIN_MS: i64 = 500;
pub const DEFAULT_DEFERRED_LOAD_MAX_MS: i64 = 1_500;

// ==========================================================================
// Scroll defaults
// ==========================================================================

pub const DEFAULT_ANCHOR_BUFFER_PX: i64 = 20;
pub const DEFAULT_SCROLL_TOP_THRESHOLD: i64 = 300;
pub const DEFAULT_SCROLL_TOP_THROTTLE_MS: i64 = 100;
pub const DEFAULT_HEADER_SCROLLED_OFFSET: i64 = 100;
pub const DEFAULT_HEADER_HIDE_OFFSET: i64 = 200;
pub const DEFAULT_HEADER_THROTTLE_MS: i64 = 10;

// ==========================================================================
// Audio / reveal defaults
// ==========================================================================

pub const DEFAULT_AUDIO_TICK_MS: i64 = 1_000;
pub const DEFAULT_AUDIO_CLICK_ANIMATION_MS: i64 = 300;
pub const DEFAULT_REVEAL_THRESHOLD: f64 = 0.1;
pub const DEFAULT_REVEAL_ROOT_MARGIN_BOTTOM: i64 = -50;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimingConfig {
    /// Grace period before an un-hovered dropdown closes.
    pub dropdown_hide_delay_ms: i64,
    /// Delay between an in-page scroll and focusing its target.
    pub anchor_focus_delay_ms: i64,
    pub modal_focus_delay_ms: i64,
    /// Exit animation length; `display` is cleared afterwards.
    pub modal_exit_ms: i64,
    pub modal_success_close_ms: i64,
    /// Newsletter/contact success reset and "Try Again" label duration.
    pub form_reset_ms: i64,
    pub field_debounce_ms: i64,
    pub search_debounce_ms: i64,
    pub search_min_chars: usize,
    pub hover_animation_ms: i64,
    pub deferred_load_min_ms: i64,
    pub deferred_load_max_ms: i64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            dropdown_hide_delay_ms: DEFAULT_DROPDOWN_HIDE_DELAY_MS,
            anchor_focus_delay_ms: DEFAULT_ANCHOR_FOCUS_DELAY_MS,
            modal_focus_delay_ms: DEFAULT_MODAL_FOCUS_DELAY_MS,
            modal_exit_ms: DEFAULT_MODAL_EXIT_MS,
            modal_success_close_ms: DEFAULT_MODAL_SUCCESS_CLOSE_MS,
            form_reset_ms: DEFAULT_FORM_RESET_MS,
            field_debounce_ms: DEFAULT_FIELD_DEBOUNCE_MS,
            search_debounce_ms: DEFAULT_SEARCH_DEBOUNCE_MS,
            search_min_chars: DEFAULT_SEARCH_MIN_CHARS,
            hover_animation_ms: DEFAULT_HOVER_ANIMATION_MS,
            deferred_load_min_ms: DEFAULT_DEFERRED_LOAD_MIN_MS,
            deferred_load_max_ms: DEFAULT_DEFERRED_LOAD_MAX_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScrollConfig {
    /// Extra space left above an in-page target, below the header.
    pub anchor_buffer_px: i64,
    pub scroll_top_threshold: i64,
    pub scroll_top_throttle_ms: i64,
    pub header_scrolled_offset: i64,
    pub header_hide_offset: i64,
    pub header_throttle_ms: i64,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            anchor_buffer_px: DEFAULT_ANCHOR_BUFFER_PX,
            scroll_top_threshold: DEFAULT_SCROLL_TOP_THRESHOLD,
            scroll_top_throttle_ms: DEFAULT_SCROLL_TOP_THROTTLE_MS,
            header_scrolled_offset: DEFAULT_HEADER_SCROLLED_OFFSET,
            header_hide_offset: DEFAULT_HEADER_HIDE_OFFSET,
            header_throttle_ms: DEFAULT_HEADER_THROTTLE_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub tick_ms: i64,
    pub click_animation_ms: i64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            tick_ms: DEFAULT_AUDIO_TICK_MS,
            click_animation_ms: DEFAULT_AUDIO_CLICK_ANIMATION_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RevealConfig {
    pub threshold: f64,
    /// Negative values pull the trigger line above the viewport bottom.
    pub root_margin_bottom: i64,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_REVEAL_THRESHOLD,
            root_margin_bottom: DEFAULT_REVEAL_ROOT_MARGIN_BOTTOM,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SiteConfig {
    pub timing: TimingConfig,
    pub scroll: ScrollConfig,
    pub audio: AudioConfig,
    pub reveal: RevealConfig,
}

impl SiteConfig {
    /// Parses a possibly partial document; missing keys keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn validate(&self) -> Result<()> {
        let timing = &self.timing;
        if timing.deferred_load_min_ms > timing.deferred_load_max_ms {
            return Err(crate::Error::Config(format!(
                "timing.deferred_load_min_ms ({}) exceeds deferred_load_max_ms ({})",
                timing.deferred_load_min_ms, timing.deferred_load_max_ms
            )));
        }
        if !(0.0..=1.0).contains(&self.reveal.threshold) {
            return Err(crate::Error::Config(format!(
                "reveal.threshold must be within 0..=1, got {}",
                self.reveal.threshold
            )));
        }
        if self.audio.tick_ms <= 0 {
            return Err(crate::Error::Config("audio.tick_ms must be positive".into()));
        }
        Ok(())
    }
}
