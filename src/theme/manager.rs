//! Theme switching and event dispatch
//!
//! Switch protocol: unload the outgoing theme and drop its hooks, cancel
//! every task it queued, instantly clear the arena, then load and init the
//! incoming theme. Events only reach a theme that finished `init`.

use serde_json::Value;

use super::{HookSet, Theme, ThemeContext, ThemeError};
use crate::audio::{AudioSink, SoundEffect};
use crate::event::{CanonicalEvent, normalize_named};
use crate::persistence::{SettingsError, SettingsStore, load_config};
use crate::platform::AssetSource;
use crate::render::LabelSink;
use crate::sim::{
    BodyHandle, CollisionPair, PitState, SpawnDescriptor, TaskOwner, ThemeId, TickHooks, TickReport, tick,
};

pub struct ThemeManager<A: AudioSink> {
    pit: PitState,
    audio: A,
    themes: Vec<Box<dyn Theme>>,
    active: Option<usize>,
    hooks: HookSet,
}

impl<A: AudioSink> ThemeManager<A> {
    pub fn new(pit: PitState, audio: A) -> Self {
        Self {
            pit,
            audio,
            themes: Vec::new(),
            active: None,
            hooks: HookSet::NONE,
        }
    }

    /// Add a theme; a theme with the same name is replaced
    pub fn register_theme(&mut self, theme: Box<dyn Theme>) {
        match self.themes.iter().position(|t| t.name() == theme.name()) {
            Some(idx) if Some(idx) == self.active => {
                log::warn!("Not replacing active theme '{}'", theme.name());
            }
            Some(idx) => self.themes[idx] = theme,
            None => {
                log::debug!("Registered theme '{}'", theme.name());
                self.themes.push(theme);
            }
        }
    }

    pub fn theme_names(&self) -> Vec<&str> {
        self.themes.iter().map(|t| t.name()).collect()
    }

    pub fn active_theme(&self) -> Option<&dyn Theme> {
        self.active.map(|idx| self.themes[idx].as_ref())
    }

    pub fn active_name(&self) -> Option<&str> {
        self.active_theme().map(|t| t.name())
    }

    pub fn pit(&self) -> &PitState {
        &self.pit
    }

    pub fn pit_mut(&mut self) -> &mut PitState {
        &mut self.pit
    }

    pub fn audio(&self) -> &A {
        &self.audio
    }

    pub fn audio_mut(&mut self) -> &mut A {
        &mut self.audio
    }

    fn owner_of(idx: usize) -> TaskOwner {
        TaskOwner::Theme(ThemeId(idx as u32))
    }

    fn active_owner(&self) -> TaskOwner {
        self.active.map_or(TaskOwner::Engine, Self::owner_of)
    }

    /// Unload the active theme (if any), then load and activate `name`
    ///
    /// On failure the arena is left cleared and no theme is active.
    pub async fn switch_theme(&mut self, name: &str, assets: &dyn AssetSource) -> Result<(), ThemeError> {
        let idx = self
            .themes
            .iter()
            .position(|t| t.name() == name)
            .ok_or_else(|| ThemeError::UnknownTheme(name.to_string()))?;

        if let Some(old) = self.active.take() {
            self.hooks = HookSet::NONE;
            self.themes[old].unload();
            let cancelled = self.pit.scheduler.cancel_owner(Self::owner_of(old));
            log::info!("Unloaded theme '{}' ({} pending tasks cancelled)", self.themes[old].name(), cancelled);
        }
        self.pit.clear_world();

        let theme = &mut self.themes[idx];
        if let Err(e) = theme.load(assets).await {
            log::warn!("Theme '{}' failed to load: {}", name, e);
            self.pit.clear_world();
            return Err(e);
        }
        self.hooks = theme.init();
        self.active = Some(idx);
        log::info!("Theme '{}' active", name);
        Ok(())
    }

    /// Unload the active theme without loading another
    pub fn deactivate(&mut self) {
        if let Some(old) = self.active.take() {
            self.hooks = HookSet::NONE;
            self.themes[old].unload();
            self.pit.scheduler.cancel_owner(Self::owner_of(old));
            self.pit.clear_world();
            log::info!("Theme '{}' deactivated", self.themes[old].name());
        }
    }

    /// Dispatch a canonical event to the active theme; dropped if none is active
    pub fn handle_event(&mut self, event: &CanonicalEvent) {
        let Some(idx) = self.active else {
            log::debug!("No active theme, dropping {:?} from {}", event.kind, event.username);
            return;
        };
        let mut cx = ThemeContext::new(&mut self.pit, &mut self.audio, Self::owner_of(idx));
        self.themes[idx].handle_event(event, &mut cx);
    }

    /// Normalize and dispatch a raw inbound event
    pub fn handle_named_event(&mut self, name: &str, payload: &Value) {
        match normalize_named(name, payload) {
            Some(event) => self.handle_event(&event),
            None => log::debug!("Ignoring event '{}'", name),
        }
    }

    /// Advance the pit one step, driving the active theme's hooks
    pub fn tick(&mut self, dt_ms: f64) -> TickReport {
        match self.active {
            Some(idx) => {
                let mut hooks = ActiveHooks {
                    theme: &mut self.themes[idx],
                    audio: &mut self.audio,
                    hooks: self.hooks,
                    owner: Self::owner_of(idx),
                };
                tick(&mut self.pit, dt_ms, &mut hooks)
            }
            None => tick(&mut self.pit, dt_ms, &mut crate::sim::NoHooks),
        }
    }

    /// Lay out this frame's labels
    pub fn render(&self, labels: &mut dyn LabelSink) {
        if let Some(theme) = self.active_theme()
            && self.hooks.render
        {
            theme.on_render(&self.pit, labels);
        }
    }

    /// Open the pit floor; the restore is owned by the active theme
    pub fn flush_pit(&mut self) -> bool {
        let owner = self.active_owner();
        self.pit.flush(owner)
    }

    /// Replace every theme's config with its schema defaults merged with stored overrides
    pub fn restore_settings(&mut self, store: &dyn SettingsStore) {
        for theme in &mut self.themes {
            let config = load_config(store, theme.name(), theme.settings_schema());
            theme.set_config(config);
        }
    }

    /// Persist every theme's current values
    pub fn persist_settings(&self, store: &mut dyn SettingsStore) -> Result<(), SettingsError> {
        for theme in &self.themes {
            store.save(theme.name(), theme.config().values())?;
        }
        Ok(())
    }

    /// A theme's current settings as pretty JSON
    pub fn export_settings(&self, name: &str) -> Result<String, ThemeError> {
        let theme = self
            .themes
            .iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| ThemeError::UnknownTheme(name.to_string()))?;
        Ok(theme.config().export_json()?)
    }

    /// Apply a settings document to a theme by name
    pub fn import_settings(&mut self, name: &str, json: &str) -> Result<(), ThemeError> {
        let theme = self
            .themes
            .iter_mut()
            .find(|t| t.name() == name)
            .ok_or_else(|| ThemeError::UnknownTheme(name.to_string()))?;
        let mut config = theme.config().clone();
        config.import_json(json)?;
        theme.set_config(config);
        Ok(())
    }
}

/// Routes tick callbacks to the active theme
struct ActiveHooks<'a> {
    theme: &'a mut Box<dyn Theme>,
    audio: &'a mut dyn AudioSink,
    hooks: HookSet,
    owner: TaskOwner,
}

impl TickHooks for ActiveHooks<'_> {
    fn on_step(&mut self, pit: &mut PitState) {
        if self.hooks.step {
            let mut cx = ThemeContext::new(pit, &mut *self.audio, self.owner);
            self.theme.on_step(&mut cx);
        }
    }

    fn on_collision(&mut self, pit: &mut PitState, pair: CollisionPair) {
        if self.hooks.collision {
            let mut cx = ThemeContext::new(pit, &mut *self.audio, self.owner);
            self.theme.on_collision(pair, &mut cx);
        }
    }

    fn on_spawn(&mut self, _pit: &mut PitState, _handle: BodyHandle, desc: &SpawnDescriptor) {
        if desc.chime {
            self.audio.play(SoundEffect::Chime);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::RecordingAudio;
    use crate::consts::TICK_MS;
    use crate::persistence::MemoryStore;
    use crate::platform::MemoryAssets;
    use crate::render::LabelBuffer;
    use crate::settings::{SettingField, SettingValue, ThemeConfig};
    use crate::sim::{BodyKind, PitConfig, SandboxWorld};
    use crate::theme::{BallpitTheme, DucksTheme, LoadFuture};
    use serde_json::json;

    /// Theme whose load always fails
    struct BrokenTheme {
        config: ThemeConfig,
    }

    impl Theme for BrokenTheme {
        fn name(&self) -> &str {
            "Broken"
        }

        fn settings_schema(&self) -> Vec<SettingField> {
            Vec::new()
        }

        fn config(&self) -> &ThemeConfig {
            &self.config
        }

        fn set_config(&mut self, config: ThemeConfig) {
            self.config = config;
        }

        fn load<'a>(&'a mut self, _assets: &'a dyn AssetSource) -> LoadFuture<'a> {
            Box::pin(async {
                Err(ThemeError::LoadFailed {
                    theme: "Broken".to_string(),
                    reason: "no renderer".to_string(),
                })
            })
        }

        fn init(&mut self) -> HookSet {
            HookSet::ALL
        }

        fn unload(&mut self) {}

        fn handle_event(&mut self, _event: &CanonicalEvent, _cx: &mut ThemeContext<'_>) {}
    }

    fn manager() -> ThemeManager<RecordingAudio> {
        let pit = PitState::new(Box::new(SandboxWorld::new()), PitConfig::with_seed(99));
        let mut mgr = ThemeManager::new(pit, RecordingAudio::default());
        mgr.register_theme(Box::new(BallpitTheme::new()));
        mgr.register_theme(Box::new(DucksTheme::new()));
        mgr
    }

    fn switch(mgr: &mut ThemeManager<RecordingAudio>, name: &str) -> Result<(), ThemeError> {
        pollster::block_on(mgr.switch_theme(name, &MemoryAssets::new()))
    }

    #[test]
    fn test_events_dropped_without_active_theme() {
        let mut mgr = manager();
        mgr.handle_named_event("Twitch.Follow", &json!({"user": "a"}));
        assert_eq!(mgr.pit().live_bodies(), 0);
        assert!(mgr.active_name().is_none());
    }

    #[test]
    fn test_unknown_theme_leaves_state_alone() {
        let mut mgr = manager();
        switch(&mut mgr, "Ballpit").unwrap();
        mgr.handle_named_event("Twitch.Subscribe", &json!({"user": "a"}));
        let err = switch(&mut mgr, "Nope").unwrap_err();
        assert!(matches!(err, ThemeError::UnknownTheme(_)));
        assert_eq!(mgr.active_name(), Some("Ballpit"));
        assert_eq!(mgr.pit().live_bodies(), 1);
    }

    #[test]
    fn test_switch_cancels_pending_staggered_spawns() {
        let mut mgr = manager();
        switch(&mut mgr, "Ballpit").unwrap();
        // 300 bits: four balls, one now and three staggered
        mgr.handle_named_event("Twitch.Cheer", &json!({"user": "c", "bits": 300}));
        assert_eq!(mgr.pit().live_bodies(), 1);
        assert_eq!(mgr.pit().scheduler.len(), 3);

        switch(&mut mgr, "Ducks & Toasters").unwrap();
        assert_eq!(mgr.pit().live_bodies(), 0);
        assert!(mgr.pit().scheduler.is_empty());

        for _ in 0..30 {
            mgr.tick(TICK_MS);
        }
        assert!(mgr.pit().bodies.iter().all(|b| b.kind != BodyKind::Ball));
        assert_eq!(mgr.pit().live_bodies(), 0);
    }

    #[test]
    fn test_switch_mid_flush_restores_ground() {
        let mut mgr = manager();
        switch(&mut mgr, "Ballpit").unwrap();
        assert!(mgr.flush_pit());
        assert!(mgr.pit().is_open());
        switch(&mut mgr, "Ducks & Toasters").unwrap();
        assert!(!mgr.pit().is_open());
        assert!(mgr.pit().scheduler.is_empty());
    }

    #[test]
    fn test_failed_load_leaves_no_active_theme() {
        let mut mgr = manager();
        mgr.register_theme(Box::new(BrokenTheme {
            config: ThemeConfig::from_schema(Vec::new()),
        }));
        switch(&mut mgr, "Ballpit").unwrap();
        mgr.handle_named_event("Twitch.Subscribe", &json!({"user": "a"}));

        let err = switch(&mut mgr, "Broken").unwrap_err();
        assert!(matches!(err, ThemeError::LoadFailed { .. }));
        assert!(mgr.active_name().is_none());
        assert_eq!(mgr.pit().live_bodies(), 0);

        mgr.handle_named_event("Twitch.Subscribe", &json!({"user": "a"}));
        assert_eq!(mgr.pit().live_bodies(), 0);
    }

    #[test]
    fn test_ballpit_cascade_through_manager() {
        let mut mgr = manager();
        switch(&mut mgr, "Ballpit").unwrap();
        mgr.handle_named_event("Twitch.Cheer", &json!({"data": {"user_name": "whale", "bits": 20000}}));
        // Alert plus the drop itself
        assert_eq!(mgr.audio().chimes(), 2);

        // Long enough for the bomb to land, sleep, and cascade
        for _ in 0..(60 * 60) {
            mgr.tick(TICK_MS);
        }
        assert!(mgr.pit().stats.detonations >= 1);
        assert!(mgr.pit().bodies.iter().all(|b| b.tier.as_u8() <= 2));
    }

    #[test]
    fn test_every_staggered_drop_chimes() {
        let mut mgr = manager();
        switch(&mut mgr, "Ballpit").unwrap();
        mgr.handle_named_event("Twitch.Cheer", &json!({"user": "rain", "bits": 500}));
        assert_eq!(mgr.audio().chimes(), 1);
        assert_eq!(mgr.pit().live_bodies(), 1);

        for _ in 0..12 {
            mgr.tick(TICK_MS);
        }
        assert_eq!(mgr.pit().stats.spawned, 6);
        assert_eq!(mgr.audio().chimes(), 6);
    }

    #[test]
    fn test_ducks_drop_silently() {
        let mut mgr = manager();
        switch(&mut mgr, "Ducks & Toasters").unwrap();
        mgr.handle_named_event("Twitch.Follow", &json!({"user": "quack"}));
        assert_eq!(mgr.pit().live_bodies(), 1);
        assert_eq!(mgr.audio().chimes(), 0);
    }

    #[test]
    fn test_render_only_when_active() {
        let mut mgr = manager();
        let mut labels = LabelBuffer::default();
        mgr.render(&mut labels);
        assert!(labels.labels.is_empty());

        switch(&mut mgr, "Ducks & Toasters").unwrap();
        mgr.handle_named_event("Twitch.ChatMessage", &json!({"user": "Mallard", "message": "!duck"}));
        mgr.render(&mut labels);
        assert_eq!(labels.texts(), vec!["Mallard"]);
    }

    #[test]
    fn test_settings_round_trip_through_store() {
        let mut mgr = manager();
        mgr.import_settings("Ballpit", r#"{"bits_mega_threshold": 5000}"#).unwrap();
        let mut store = MemoryStore::new();
        mgr.persist_settings(&mut store).unwrap();

        let mut fresh = manager();
        fresh.restore_settings(&store);
        let ballpit = fresh.themes.iter().find(|t| t.name() == "Ballpit").unwrap();
        assert_eq!(ballpit.config().values().get("bits_mega_threshold"), Some(&SettingValue::Number(5000.0)));
        assert!(fresh.export_settings("Ballpit").unwrap().contains("\"bits_mega_threshold\": 5000"));

        assert!(matches!(
            mgr.import_settings("Ballpit", "[1, 2]"),
            Err(ThemeError::Settings(SettingsError::NotAnObject))
        ));
        assert!(matches!(
            mgr.import_settings("Ballpit", "{not json"),
            Err(ThemeError::Settings(SettingsError::Json(_)))
        ));
        assert!(matches!(mgr.export_settings("Nope"), Err(ThemeError::UnknownTheme(_))));
    }
}
