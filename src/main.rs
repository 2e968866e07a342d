//! The Pit headless driver
//!
//! Runs both themes against the sandbox backend with a scripted burst of
//! audience events and logs what happened.

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use serde_json::{Value, json};

    use thepit::audio::{AudioManager, AudioSink, SoundEffect};
    use thepit::consts::TICK_MS;
    use thepit::persistence::JsonFileStore;
    use thepit::platform::{DirAssets, init_logging};
    use thepit::render::LabelBuffer;
    use thepit::sim::SandboxWorld;
    use thepit::theme::{BallpitTheme, DucksTheme};
    use thepit::{PitConfig, PitState, ThemeManager};

    /// Ticks per simulated minute
    const MINUTE_TICKS: usize = 60 * 60;

    /// Audio sink that only logs
    struct LogAudio;

    impl AudioSink for LogAudio {
        fn play(&mut self, effect: SoundEffect) {
            log::trace!("audio: {:?}", effect);
        }
    }

    fn load_config(path: Option<&str>) -> PitConfig {
        let Some(path) = path else {
            return PitConfig::default();
        };
        match std::fs::read_to_string(path).map(|s| serde_json::from_str::<PitConfig>(&s)) {
            Ok(Ok(config)) => {
                log::info!("Loaded pit config from {}", path);
                config
            }
            Ok(Err(e)) => {
                log::warn!("Invalid pit config {}: {}; using defaults", path, e);
                PitConfig::default()
            }
            Err(e) => {
                log::warn!("Cannot read pit config {}: {}; using defaults", path, e);
                PitConfig::default()
            }
        }
    }

    fn script() -> Vec<(&'static str, Value)> {
        vec![
            ("Twitch.Follow", json!({"user_name": "first_follower"})),
            ("Twitch.Follow", json!({"data": {"displayName": "Lurker"}})),
            ("Twitch.Subscribe", json!({"user": "subby", "tier": "1000"})),
            ("Twitch.ReSubscribe", json!({"user": "resubby", "tier": "2000"})),
            ("Twitch.GiftSubscription", json!({"user": "gifter", "sub_tier": "3000"})),
            ("Twitch.Subscribe", json!({"user": "primetime", "is_prime": true})),
            ("Twitch.Cheer", json!({"user": "penny", "bits": 50})),
            ("Twitch.Cheer", json!({"user": "clustered", "bits": 500})),
            ("Twitch.Cheer", json!({"user": "boomer", "bits": "2500"})),
            ("Twitch.Cheer", json!({"data": {"user": "whale", "bits": 15000}})),
            ("Twitch.ChatMessage", json!({"user": "chatter", "message": "  !BALL "})),
            ("Twitch.ChatMessage", json!({"user": "quacker", "message": {"message": "!duck"}})),
            ("Twitch.ChatMessage", json!({"user": "breakfast", "message": "!toaster now"})),
            ("Twitch.Raid", json!({"user": "raider"})),
        ]
    }

    fn run_minute(mgr: &mut ThemeManager<AudioManager<LogAudio>>) {
        let events = script();
        let mut labels = LabelBuffer::default();
        let mut swept = 0;
        for i in 0..MINUTE_TICKS {
            // One scripted event every half second
            if i % 30 == 0
                && let Some((name, payload)) = events.get(i / 30)
            {
                mgr.handle_named_event(name, payload);
            }
            if i == MINUTE_TICKS / 2 {
                mgr.flush_pit();
            }
            swept += mgr.tick(TICK_MS).swept;
            labels.clear();
            mgr.render(&mut labels);
        }
        let pit = mgr.pit();
        log::info!(
            "[{}] alive={} spawned={} detonations={} swept={} labels={}",
            mgr.active_name().unwrap_or("none"),
            pit.live_bodies(),
            pit.stats.spawned,
            pit.stats.detonations,
            swept,
            labels.labels.len()
        );
    }

    pub fn run() {
        init_logging();
        let args: Vec<String> = std::env::args().collect();
        let config = load_config(args.get(1).map(String::as_str));
        log::info!("The Pit starting ({}x{}, seed {})", config.width, config.height, config.seed);

        let pit = PitState::new(Box::new(SandboxWorld::new()), config);
        let mut mgr = ThemeManager::new(pit, AudioManager::new(LogAudio));
        mgr.register_theme(Box::new(BallpitTheme::new()));
        mgr.register_theme(Box::new(DucksTheme::new()));

        let store = JsonFileStore::new("settings");
        mgr.restore_settings(&store);
        let assets = DirAssets::new(".");

        for name in ["Ballpit", "Ducks & Toasters"] {
            if let Err(e) = pollster::block_on(mgr.switch_theme(name, &assets)) {
                log::error!("Could not switch to '{}': {}", name, e);
                continue;
            }
            run_minute(&mut mgr);
        }
        mgr.deactivate();
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    native::run();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is thepit::web::start; the page drives a PitHandle
}
