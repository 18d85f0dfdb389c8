use std::cell::RefCell;
use std::rc::Rc;

use super::{Component, bool_attr, required_part};
use crate::config::SiteConfig;
use crate::util::{animate, format_time, parse_time, select_all};
use crate::{EventTarget, NodeId, Page, Result, TimerId};

/// Simulated episode players: play/pause with a ticking progress bar, mute
/// toggle, and at most one player playing at a time.
pub struct AudioPlayer {
    config: Rc<SiteConfig>,
}

impl AudioPlayer {
    pub fn new(config: Rc<SiteConfig>) -> Self {
        Self { config }
    }
}

impl Default for AudioPlayer {
    fn default() -> Self {
        Self::new(Rc::default())
    }
}

#[derive(Debug, Default)]
struct PlaybackState {
    playing: bool,
    progress: u32,
    duration: u32,
    ticker: Option<TimerId>,
}

#[derive(Clone)]
struct PlayerHandle {
    root: NodeId,
    play_button: NodeId,
    icon: Option<NodeId>,
    progress_fill: Option<NodeId>,
    current_time: Option<NodeId>,
    state: Rc<RefCell<PlaybackState>>,
}

type PlayerRegistry = Rc<RefCell<Vec<PlayerHandle>>>;

impl PlayerHandle {
    fn render_button(&self, page: &mut Page, playing: bool) -> Result<()> {
        if let Some(icon) = self.icon {
            page.set_class(icon, "fa-play", !playing)?;
            page.set_class(icon, "fa-pause", playing)?;
        }
        page.set_attr(
            self.play_button,
            "aria-label",
            if playing { "Pause episode" } else { "Play episode" },
        )?;
        page.set_class(self.root, "playing", playing)
    }

    fn render_progress(&self, page: &mut Page) -> Result<()> {
        let (progress, duration) = {
            let state = self.state.borrow();
            (state.progress, state.duration)
        };
        if let Some(fill) = self.progress_fill {
            page.set_style(fill, "width", &progress_width(progress, duration))?;
        }
        if let Some(current) = self.current_time {
            page.set_text(current, &format_time(progress))?;
        }
        Ok(())
    }

    /// Stops ticking and shows the play control.
    fn stop(&self, page: &mut Page) -> Result<()> {
        let ticker = {
            let mut state = self.state.borrow_mut();
            state.playing = false;
            state.ticker.take()
        };
        if let Some(ticker) = ticker {
            page.clear_timer(ticker);
        }
        self.render_button(page, false)
    }

    fn tick(&self, page: &mut Page) -> Result<()> {
        if !page.is_connected(self.root) {
            let ticker = self.state.borrow_mut().ticker.take();
            if let Some(ticker) = ticker {
                page.clear_timer(ticker);
            }
            return Ok(());
        }
        let finished = {
            let mut state = self.state.borrow_mut();
            if !state.playing {
                return Ok(());
            }
            if state.progress < state.duration {
                state.progress += 1;
            }
            state.progress >= state.duration
        };
        self.render_progress(page)?;
        if finished {
            tracing::debug!(player = %page.describe(self.root), "playback reached the end");
            self.stop(page)?;
        }
        Ok(())
    }
}

fn progress_width(progress: u32, duration: u32) -> String {
    if duration == 0 {
        return "0%".into();
    }
    let percent = f64::from(progress) * 100.0 / f64::from(duration);
    let text = format!("{percent:.2}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    format!("{text}%")
}

impl Component for AudioPlayer {
    fn name(&self) -> &'static str {
        "AudioPlayer"
    }

    fn init(&self, page: &mut Page) -> Result<()> {
        let registry: PlayerRegistry = Rc::default();
        for root in select_all(page, ".audio-player", None)? {
            let play_button = required_part(page, self.name(), root, ".play-btn")?;
            let duration = page
                .query_within(root, ".total-time")?
                .and_then(|node| parse_time(&page.text(node)))
                .unwrap_or(0);
            let handle = PlayerHandle {
                root,
                play_button,
                icon: page.query_within(play_button, "i")?,
                progress_fill: page.query_within(root, ".progress-fill")?,
                current_time: page.query_within(root, ".current-time")?,
                state: Rc::new(RefCell::new(PlaybackState {
                    duration,
                    ..PlaybackState::default()
                })),
            };
            registry.borrow_mut().push(handle.clone());
            self.bind_play(page, handle, registry.clone());

            if let Some(volume) = page.query_within(root, ".volume-btn")? {
                bind_volume(page, volume)?;
            }
        }
        tracing::debug!(players = registry.borrow().len(), "audio players initialized");
        Ok(())
    }
}

impl AudioPlayer {
    fn bind_play(&self, page: &mut Page, handle: PlayerHandle, registry: PlayerRegistry) {
        let tick_ms = self.config.audio.tick_ms;
        let click_animation_ms = self.config.audio.click_animation_ms;
        let button = handle.play_button;
        page.add_event_listener(EventTarget::Node(button), "click", move |page, event| {
            event.prevent_default();
            if handle.state.borrow().playing {
                return handle.stop(page);
            }

            let others = registry
                .borrow()
                .iter()
                .filter(|other| other.root != handle.root)
                .cloned()
                .collect::<Vec<_>>();
            for other in others {
                if other.state.borrow().playing {
                    other.stop(page)?;
                }
            }

            let restart = {
                let mut state = handle.state.borrow_mut();
                state.playing = true;
                let restart = state.progress >= state.duration;
                if restart {
                    state.progress = 0;
                }
                restart
            };
            if restart {
                handle.render_progress(page)?;
            }
            handle.render_button(page, true)?;
            animate(page, button, "pulse", click_animation_ms)?;

            let ticking = handle.clone();
            let ticker = page.set_interval(tick_ms, move |page| ticking.tick(page));
            handle.state.borrow_mut().ticker = Some(ticker);
            Ok(())
        });
    }
}

fn bind_volume(page: &mut Page, volume: NodeId) -> Result<()> {
    let icon = page.query_within(volume, "i")?;
    let muted = Rc::new(RefCell::new(page.has_class(volume, "muted")));
    page.add_event_listener(EventTarget::Node(volume), "click", move |page, event| {
        event.prevent_default();
        let now_muted = {
            let mut muted = muted.borrow_mut();
            *muted = !*muted;
            *muted
        };
        page.set_class(volume, "muted", now_muted)?;
        page.set_attr(volume, "aria-pressed", bool_attr(now_muted))?;
        page.set_attr(volume, "aria-label", if now_muted { "Unmute" } else { "Mute" })?;
        if let Some(icon) = icon {
            page.set_class(icon, "fa-volume-up", !now_muted)?;
            page.set_class(icon, "fa-volume-mute", now_muted)?;
        }
        Ok(())
    });
    Ok(())
}
