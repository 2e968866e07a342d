//! Ducks & Toasters theme: sprite bodies that quack and clank

use std::collections::HashMap;

use glam::Vec2;
use rand::Rng;

use crate::audio::SoundEffect;
use crate::event::{CanonicalEvent, EventKind};
use crate::platform::AssetSource;
use crate::render::{Label, LabelSink};
use crate::scaled_radius;
use crate::settings::{SettingField, ThemeConfig};
use crate::sim::spawn::{BodyShape, SpawnDescriptor, keys};
use crate::sim::{ArenaBounds, BodyKind, BodyOptions, CollisionPair, PitState, Tint};

use super::{HookSet, LoadFuture, Theme, ThemeContext};

pub const NAME: &str = "Ducks & Toasters";

pub const DUCK_IMAGE: &str = "themes/ducks/assets/Rubber_Duck.png";
pub const TOASTER_IMAGE: &str = "themes/ducks/assets/Toaster.png";
const TOASTER_SAMPLE: &str = "toaster";
const DUCK_SAMPLES: usize = 6;

/// Contacts with a combined speed above this make a sound
const IMPACT_THRESHOLD: f32 = 2.0;
/// Bodies enter above the visible arena
const SPAWN_Y: f32 = -100.0;
/// Keep spawns this far from either side
const SPAWN_INSET: f32 = 50.0;
/// Duck diameter and toaster size at scale 1
const DUCK_SIZE: f32 = 60.0;
const TOASTER_SIZE: Vec2 = Vec2::new(80.0, 60.0);

pub fn schema() -> Vec<SettingField> {
    vec![
        SettingField::header("Global Settings"),
        SettingField::range(keys::GLOBAL_SCALE, "Size Multiplier (Global)", 1.0, 0.5, 2.5, 0.1),
    ]
}

fn sample_path(key: &str) -> String {
    format!("themes/ducks/assets/{key}.wav")
}

fn sample_keys() -> Vec<String> {
    std::iter::once(TOASTER_SAMPLE.to_string())
        .chain((1..=DUCK_SAMPLES).map(|i| format!("duck{i}")))
        .collect()
}

/// Pick the body an event drops, if any
pub fn decide(
    event: &CanonicalEvent,
    global_scale: f32,
    bounds: ArenaBounds,
    rng: &mut impl Rng,
) -> Option<SpawnDescriptor> {
    let forced = match event.kind {
        EventKind::Follow | EventKind::Cheer => None,
        EventKind::Subscribe => Some(BodyKind::Toaster),
        EventKind::ChatCommand => match event.raw_command.as_deref() {
            Some(cmd) if cmd.starts_with("!duck") => Some(BodyKind::Duck),
            Some(cmd) if cmd.starts_with("!toaster") => Some(BodyKind::Toaster),
            _ => return None,
        },
    };

    let span = (bounds.width - 2.0 * SPAWN_INSET).max(0.0);
    let x = SPAWN_INSET + rng.random::<f32>() * span;
    let coin_duck = rng.random::<f32>() < 0.5;
    let kind = forced.unwrap_or(if coin_duck { BodyKind::Duck } else { BodyKind::Toaster });
    let scale = 1.0 + rng.random::<f32>() * 1.5;
    let position = Vec2::new(x, SPAWN_Y);

    let desc = match kind {
        BodyKind::Toaster => {
            let size = (TOASTER_SIZE * scale * global_scale.max(0.0)).max(Vec2::ONE);
            SpawnDescriptor {
                kind: BodyKind::Toaster,
                shape: BodyShape::Rect { size },
                options: BodyOptions {
                    restitution: 0.1,
                    friction: 0.5,
                    density: 0.05,
                    is_static: false,
                },
                visual_size: size.x,
                ..SpawnDescriptor::ball(event.username.clone(), position, size.x / 2.0, Tint::Sprite)
            }
        }
        _ => {
            let radius = scaled_radius(DUCK_SIZE * scale / 2.0, global_scale);
            SpawnDescriptor {
                kind: BodyKind::Duck,
                options: BodyOptions {
                    friction: 0.05,
                    ..BodyOptions::default()
                },
                ..SpawnDescriptor::ball(event.username.clone(), position, radius, Tint::Sprite)
            }
        }
    };
    Some(SpawnDescriptor { scale, ..desc })
}

pub struct DucksTheme {
    config: ThemeConfig,
    images: HashMap<&'static str, Vec<u8>>,
    samples: HashMap<String, Vec<u8>>,
}

impl Default for DucksTheme {
    fn default() -> Self {
        Self::new()
    }
}

impl DucksTheme {
    pub fn new() -> Self {
        Self {
            config: ThemeConfig::from_schema(schema()),
            images: HashMap::new(),
            samples: HashMap::new(),
        }
    }

    pub fn has_sample(&self, key: &str) -> bool {
        self.samples.contains_key(key)
    }

    pub fn has_image(&self, path: &str) -> bool {
        self.images.contains_key(path)
    }

    fn sample_for(&self, kind: BodyKind, rng: &mut impl Rng) -> Option<String> {
        let key = match kind {
            BodyKind::Toaster => TOASTER_SAMPLE.to_string(),
            BodyKind::Duck => format!("duck{}", rng.random_range(1..=DUCK_SAMPLES)),
            BodyKind::Ball => return None,
        };
        self.has_sample(&key).then_some(key)
    }
}

impl Theme for DucksTheme {
    fn name(&self) -> &str {
        NAME
    }

    fn settings_schema(&self) -> Vec<SettingField> {
        schema()
    }

    fn config(&self) -> &ThemeConfig {
        &self.config
    }

    fn set_config(&mut self, config: ThemeConfig) {
        self.config = config;
    }

    fn load<'a>(&'a mut self, assets: &'a dyn AssetSource) -> LoadFuture<'a> {
        Box::pin(async move {
            for path in [DUCK_IMAGE, TOASTER_IMAGE] {
                if self.images.contains_key(path) {
                    continue;
                }
                match assets.fetch(path).await {
                    Ok(bytes) => {
                        self.images.insert(path, bytes);
                    }
                    Err(e) => log::warn!("Failed to load image {}: {}", path, e),
                }
            }
            for key in sample_keys() {
                if self.samples.contains_key(&key) {
                    continue;
                }
                let path = sample_path(&key);
                match assets.fetch(&path).await {
                    Ok(bytes) => {
                        self.samples.insert(key, bytes);
                    }
                    Err(e) => log::warn!("Failed to load audio {}: {}", path, e),
                }
            }
            log::info!(
                "{} ready with {} images and {} samples",
                NAME,
                self.images.len(),
                self.samples.len()
            );
            Ok(())
        })
    }

    fn init(&mut self) -> HookSet {
        HookSet {
            step: false,
            collision: true,
            render: true,
        }
    }

    fn unload(&mut self) {
        // Assets stay cached so a reload does not refetch them
    }

    fn handle_event(&mut self, event: &CanonicalEvent, cx: &mut ThemeContext<'_>) {
        let global = self.config.number(keys::GLOBAL_SCALE) as f32;
        let bounds = cx.pit.bounds();
        if let Some(desc) = decide(event, global, bounds, &mut cx.pit.rng) {
            log::debug!("{:?} from {} -> {:?}", event.kind, event.username, desc.kind);
            cx.spawn(desc);
        }
    }

    fn on_collision(&mut self, pair: CollisionPair, cx: &mut ThemeContext<'_>) {
        let (Some(a), Some(b)) = (cx.pit.world.body(pair.a), cx.pit.world.body(pair.b)) else {
            return;
        };
        if a.speed + b.speed <= IMPACT_THRESHOLD {
            return;
        }
        for handle in [pair.a, pair.b] {
            let Some((kind, scale)) = cx.pit.bodies.get(handle).map(|b| (b.kind, b.scale)) else {
                continue;
            };
            if let Some(key) = self.sample_for(kind, &mut cx.pit.rng) {
                cx.audio.play(SoundEffect::sample(key, 1.0 / scale));
            }
        }
    }

    fn on_render(&self, pit: &PitState, labels: &mut dyn LabelSink) {
        for body in pit.bodies.iter() {
            let Some(state) = pit.world.body(body.handle) else {
                continue;
            };
            labels.draw_label(Label {
                position: state.position,
                text: body.owner.clone(),
                size: (body.visual_size * 0.5).max(12.0),
                angle: state.angle,
                opacity: 1.0,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::RecordingAudio;
    use crate::event::normalize;
    use crate::platform::MemoryAssets;
    use crate::render::LabelBuffer;
    use crate::sim::{PitConfig, SandboxWorld, TaskOwner, ThemeId};
    use rand::SeedableRng;
    use rand_pcg::Pcg32;
    use serde_json::json;

    const BOUNDS: ArenaBounds = ArenaBounds {
        width: 1920.0,
        height: 1080.0,
    };

    fn event(kind: EventKind, payload: serde_json::Value) -> CanonicalEvent {
        normalize(kind, &payload)
    }

    #[test]
    fn test_decide_forced_types() {
        let mut rng = Pcg32::seed_from_u64(1);
        for _ in 0..50 {
            let sub = decide(&event(EventKind::Subscribe, json!({})), 1.0, BOUNDS, &mut rng).unwrap();
            assert_eq!(sub.kind, BodyKind::Toaster);
            let duck = decide(&event(EventKind::ChatCommand, json!({"message": "!duck please"})), 1.0, BOUNDS, &mut rng)
                .unwrap();
            assert_eq!(duck.kind, BodyKind::Duck);
        }
        let toaster = decide(&event(EventKind::ChatCommand, json!({"message": "!Toaster"})), 1.0, BOUNDS, &mut rng);
        assert_eq!(toaster.unwrap().kind, BodyKind::Toaster);
        assert!(decide(&event(EventKind::ChatCommand, json!({"message": "quack"})), 1.0, BOUNDS, &mut rng).is_none());
    }

    #[test]
    fn test_decide_geometry() {
        let mut rng = Pcg32::seed_from_u64(2);
        let mut kinds = (0, 0);
        for _ in 0..200 {
            let desc = decide(&event(EventKind::Follow, json!({"user": "Quackers"})), 1.0, BOUNDS, &mut rng).unwrap();
            assert_eq!(desc.owner, "Quackers");
            assert_eq!(desc.tint, Tint::Sprite);
            assert!(desc.position.x >= 50.0 && desc.position.x < 1870.0);
            assert_eq!(desc.position.y, -100.0);
            assert!((1.0..2.5).contains(&desc.scale));
            match desc.shape {
                BodyShape::Circle { radius } => {
                    kinds.0 += 1;
                    assert_eq!(desc.kind, BodyKind::Duck);
                    assert!((radius - 30.0 * desc.scale).abs() < 1e-3);
                }
                BodyShape::Rect { size } => {
                    kinds.1 += 1;
                    assert_eq!(desc.kind, BodyKind::Toaster);
                    assert!((size.x - 80.0 * desc.scale).abs() < 1e-3);
                    assert!((size.y - 60.0 * desc.scale).abs() < 1e-3);
                    assert_eq!(desc.visual_size, size.x);
                }
            }
        }
        assert!(kinds.0 > 50 && kinds.1 > 50);
    }

    #[test]
    fn test_load_skips_missing_assets() {
        let assets = MemoryAssets::new()
            .with(DUCK_IMAGE, vec![1, 2, 3])
            .with("themes/ducks/assets/toaster.wav", vec![9])
            .with("themes/ducks/assets/duck2.wav", Vec::<u8>::new());
        let mut theme = DucksTheme::new();
        pollster::block_on(theme.load(&assets)).unwrap();
        assert!(theme.has_image(DUCK_IMAGE));
        assert!(!theme.has_image(TOASTER_IMAGE));
        assert!(theme.has_sample("toaster"));
        assert!(!theme.has_sample("duck2"));
        assert!(!theme.has_sample("duck1"));
    }

    #[test]
    fn test_collision_plays_loaded_samples_only() {
        let assets = MemoryAssets::new().with("themes/ducks/assets/toaster.wav", vec![9]);
        let mut theme = DucksTheme::new();
        pollster::block_on(theme.load(&assets)).unwrap();

        let mut pit = PitState::new(Box::new(SandboxWorld::weightless()), PitConfig::default());
        let mut audio = RecordingAudio::default();
        let owner = TaskOwner::Theme(ThemeId(1));
        let mut rng = Pcg32::seed_from_u64(3);

        let sub = decide(&event(EventKind::Subscribe, json!({})), 1.0, BOUNDS, &mut rng).unwrap();
        let scale = sub.scale;
        let toaster = pit.spawn(&sub);
        let duck = pit.spawn(&decide(&event(EventKind::ChatCommand, json!({"message": "!duck"})), 1.0, BOUNDS, &mut rng).unwrap());
        pit.world.set_velocity(toaster, Vec2::new(0.0, 3.0));

        let mut cx = ThemeContext::new(&mut pit, &mut audio, owner);
        theme.on_collision(CollisionPair { a: toaster, b: duck }, &mut cx);
        assert_eq!(audio.played, vec![SoundEffect::sample("toaster", 1.0 / scale)]);

        // Too slow to make a sound
        pit.world.set_velocity(toaster, Vec2::new(0.0, 1.0));
        let mut cx = ThemeContext::new(&mut pit, &mut audio, owner);
        theme.on_collision(CollisionPair { a: toaster, b: duck }, &mut cx);
        assert_eq!(audio.played.len(), 1);
    }

    #[test]
    fn test_render_uses_visual_size() {
        let mut pit = PitState::new(Box::new(SandboxWorld::weightless()), PitConfig::default());
        let mut rng = Pcg32::seed_from_u64(4);
        let desc = decide(&event(EventKind::Subscribe, json!({"user": "Toasty"})), 1.0, BOUNDS, &mut rng).unwrap();
        let visual = desc.visual_size;
        pit.spawn(&desc);

        let mut labels = LabelBuffer::default();
        DucksTheme::new().on_render(&pit, &mut labels);
        assert_eq!(labels.texts(), vec!["Toasty"]);
        assert_eq!(labels.labels[0].size, (visual * 0.5).max(12.0));
    }
}
