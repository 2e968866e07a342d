//! Themes
//!
//! A theme is a set of rules layered over the shared pit: what an event
//! drops, what happens on each step and contact, and how bodies are labelled.
//! The [`ThemeManager`] guarantees at most one theme is active and that the
//! outgoing theme is fully unloaded before the next one loads.

pub mod ballpit;
pub mod ducks;
pub mod manager;

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::audio::{AudioSink, SoundEffect};
use crate::event::CanonicalEvent;
use crate::persistence::SettingsError;
use crate::platform::{AssetError, AssetSource};
use crate::render::LabelSink;
use crate::settings::{SettingField, ThemeConfig};
use crate::sim::{BodyHandle, CollisionPair, PitState, ScheduledAction, SpawnDescriptor, TaskOwner};

pub use ballpit::BallpitTheme;
pub use ducks::DucksTheme;
pub use manager::ThemeManager;

/// Theme lifecycle errors
#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("no theme named '{0}' is registered")]
    UnknownTheme(String),

    #[error("theme '{theme}' failed to load: {reason}")]
    LoadFailed { theme: String, reason: String },

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Future returned by [`Theme::load`]
pub type LoadFuture<'a> = Pin<Box<dyn Future<Output = Result<(), ThemeError>> + 'a>>;

/// Which callbacks an active theme wants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HookSet {
    pub step: bool,
    pub collision: bool,
    pub render: bool,
}

impl HookSet {
    pub const NONE: HookSet = HookSet {
        step: false,
        collision: false,
        render: false,
    };

    pub const ALL: HookSet = HookSet {
        step: true,
        collision: true,
        render: true,
    };
}

/// What a theme callback may touch
pub struct ThemeContext<'a> {
    pub pit: &'a mut PitState,
    pub audio: &'a mut dyn AudioSink,
    owner: TaskOwner,
}

impl<'a> ThemeContext<'a> {
    pub fn new(pit: &'a mut PitState, audio: &'a mut dyn AudioSink, owner: TaskOwner) -> Self {
        Self { pit, audio, owner }
    }

    pub fn owner(&self) -> TaskOwner {
        self.owner
    }

    /// Spawn now, or queue under this theme if the descriptor is delayed
    pub fn spawn(&mut self, desc: SpawnDescriptor) -> Option<BodyHandle> {
        if desc.delay_ms == 0 {
            if desc.chime {
                self.audio.play(SoundEffect::Chime);
            }
            return Some(self.pit.spawn(&desc));
        }
        let due = self.pit.now_ms + desc.delay_ms as f64;
        self.pit
            .scheduler
            .schedule(self.owner, due, ScheduledAction::Spawn(Box::new(desc)));
        None
    }
}

/// A themed rule set over the pit
pub trait Theme {
    /// Display name, also the persistence key
    fn name(&self) -> &str;

    /// Ordered setting fields with defaults
    fn settings_schema(&self) -> Vec<SettingField>;

    fn config(&self) -> &ThemeConfig;

    fn set_config(&mut self, config: ThemeConfig);

    /// Prepare resources. Idempotent; completes (or fails) before `init`.
    fn load<'a>(&'a mut self, assets: &'a dyn AssetSource) -> LoadFuture<'a>;

    /// Declare the callbacks this theme needs while active
    fn init(&mut self) -> HookSet;

    /// Release whatever `load` and `init` set up
    fn unload(&mut self);

    fn handle_event(&mut self, event: &CanonicalEvent, cx: &mut ThemeContext<'_>);

    fn on_step(&mut self, _cx: &mut ThemeContext<'_>) {}

    fn on_collision(&mut self, _pair: CollisionPair, _cx: &mut ThemeContext<'_>) {}

    fn on_render(&self, _pit: &PitState, _labels: &mut dyn LabelSink) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{RecordingAudio, SilentAudio};
    use crate::sim::{PitConfig, SandboxWorld, ThemeId, Tint};
    use glam::Vec2;

    #[test]
    fn test_context_spawn_immediate_or_queued() {
        let mut pit = PitState::new(Box::new(SandboxWorld::new()), PitConfig::default());
        let mut audio = SilentAudio;
        let owner = TaskOwner::Theme(ThemeId(3));
        let mut cx = ThemeContext::new(&mut pit, &mut audio, owner);

        let desc = SpawnDescriptor::ball("A", Vec2::new(10.0, 150.0), 20.0, Tint::Palette(0));
        assert!(cx.spawn(desc.clone()).is_some());
        assert!(cx.spawn(desc.delayed(30)).is_none());
        assert_eq!(pit.live_bodies(), 1);
        assert_eq!(pit.scheduler.pending(owner), 1);
    }

    #[test]
    fn test_context_chimes_on_immediate_drop_only() {
        let mut pit = PitState::new(Box::new(SandboxWorld::new()), PitConfig::default());
        let mut audio = RecordingAudio::default();
        let owner = TaskOwner::Theme(ThemeId(1));
        let mut cx = ThemeContext::new(&mut pit, &mut audio, owner);

        let desc = SpawnDescriptor::ball("A", Vec2::new(10.0, 150.0), 20.0, Tint::Palette(0));
        cx.spawn(desc.clone());
        cx.spawn(desc.clone().chiming().delayed(30));
        assert_eq!(audio.chimes(), 0);

        let mut cx = ThemeContext::new(&mut pit, &mut audio, owner);
        cx.spawn(desc.chiming());
        assert_eq!(audio.chimes(), 1);
    }

    #[test]
    fn test_error_messages() {
        let err = ThemeError::UnknownTheme("Nope".to_string());
        assert_eq!(err.to_string(), "no theme named 'Nope' is registered");
        let err: ThemeError = AssetError::NotFound("a.png".to_string()).into();
        assert_eq!(err.to_string(), "asset not found: a.png");
        let err: ThemeError = SettingsError::NotAnObject.into();
        assert_eq!(err.to_string(), "settings document must be a JSON object");
    }
}
