//! Ballpit theme: labelled balls, cheer bombs and mega-bomb cascades

use crate::audio::SoundEffect;
use crate::event::CanonicalEvent;
use crate::platform::AssetSource;
use crate::render::{Label, LabelSink};
use crate::settings::{SettingField, ThemeConfig};
use crate::sim::explosion;
use crate::sim::spawn::{self, SpawnSettings, keys};
use crate::sim::{CollisionPair, PitState};
use glam::Vec2;

use super::{HookSet, LoadFuture, Theme, ThemeContext};

pub const NAME: &str = "Ballpit";

/// Contacts with a combined speed above this make a sound
const IMPACT_THRESHOLD: f32 = 3.0;
/// Detonations always play at this intensity
const DETONATION_INTENSITY: f32 = 20.0;
/// Radius assumed for bodies without one
const FALLBACK_LABEL_RADIUS: f32 = 20.0;

pub fn schema() -> Vec<SettingField> {
    vec![
        SettingField::header("Global Settings"),
        SettingField::range(keys::GLOBAL_SCALE, "Ball Size Multiplier (Global)", 1.0, 0.5, 2.5, 0.1),
        SettingField::header("Follow Events"),
        SettingField::checkbox(keys::FOLLOW_ENABLED, "Enable Follow Drops", true),
        SettingField::number(keys::FOLLOW_MIN, "Min Size", 15.0),
        SettingField::number(keys::FOLLOW_MAX, "Max Size", 85.0),
        SettingField::header("Subscription Events"),
        SettingField::checkbox(keys::SUB_ENABLED, "Enable Sub Drops", true),
        SettingField::number(keys::SUB_PRIME, "Prime/Tier 1 Size", 50.0),
        SettingField::number(keys::SUB_T2, "Tier 2 Size", 75.0),
        SettingField::number(keys::SUB_T3, "Tier 3 Size", 100.0),
        SettingField::header("Cheer (Bits) Events"),
        SettingField::checkbox(keys::BITS_ENABLED, "Enable Bit Drops", true),
        SettingField::number(keys::BITS_CLUSTER, "Cluster Threshold (Bits)", 100.0),
        SettingField::number(keys::BITS_EXPLOSION, "Explosion Threshold (Bits)", 1000.0),
        SettingField::number(keys::BITS_MEGA, "Mega Explosion Threshold (Bits)", 10000.0),
    ]
}

pub struct BallpitTheme {
    config: ThemeConfig,
    loaded: bool,
}

impl Default for BallpitTheme {
    fn default() -> Self {
        Self::new()
    }
}

impl BallpitTheme {
    pub fn new() -> Self {
        Self {
            config: ThemeConfig::from_schema(schema()),
            loaded: false,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }
}

impl Theme for BallpitTheme {
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

    fn load<'a>(&'a mut self, _assets: &'a dyn AssetSource) -> LoadFuture<'a> {
        Box::pin(async move {
            // Synthesized audio only; nothing to fetch
            self.loaded = true;
            Ok(())
        })
    }

    fn init(&mut self) -> HookSet {
        HookSet::ALL
    }

    fn unload(&mut self) {
        self.loaded = false;
    }

    fn handle_event(&mut self, event: &CanonicalEvent, cx: &mut ThemeContext<'_>) {
        let settings = SpawnSettings::from_config(&self.config);
        let bounds = cx.pit.bounds();
        let plan = spawn::decide(event, &settings, bounds, &mut cx.pit.rng);
        if plan.alert {
            cx.audio.play(SoundEffect::Chime);
        }
        for desc in plan.bodies {
            cx.spawn(desc);
        }
    }

    fn on_step(&mut self, cx: &mut ThemeContext<'_>) {
        for det in explosion::step(cx.pit) {
            cx.audio.play(SoundEffect::impact(DETONATION_INTENSITY, det.radius));
        }
    }

    fn on_collision(&mut self, pair: CollisionPair, cx: &mut ThemeContext<'_>) {
        let (Some(a), Some(b)) = (cx.pit.world.body(pair.a), cx.pit.world.body(pair.b)) else {
            return;
        };
        let impact = a.speed + b.speed;
        if impact <= IMPACT_THRESHOLD {
            return;
        }
        let radius = a.radius.unwrap_or(0.0).max(b.radius.unwrap_or(0.0));
        if radius > 0.0 {
            cx.audio.play(SoundEffect::impact(impact, radius));
        }
    }

    fn on_render(&self, pit: &PitState, labels: &mut dyn LabelSink) {
        for body in pit.bodies.iter() {
            let Some(state) = pit.world.body(body.handle) else {
                continue;
            };
            let radius = if body.radius > 0.0 { body.radius } else { FALLBACK_LABEL_RADIUS };
            let opacity = body.fade_opacity(pit.now_ms).unwrap_or(1.0);

            labels.draw_label(Label {
                position: state.position,
                text: body.owner.clone(),
                size: radius * 0.7,
                angle: 0.0,
                opacity,
            });
            if let Some(top) = &body.top_label {
                labels.draw_label(Label {
                    position: state.position - Vec2::new(0.0, radius * 0.4),
                    text: top.clone(),
                    size: (radius * 0.25).max(10.0),
                    angle: 0.0,
                    opacity,
                });
            }
            if let Some(bottom) = &body.bottom_label {
                labels.draw_label(Label {
                    position: state.position + Vec2::new(0.0, radius * 0.4),
                    text: bottom.clone(),
                    size: (radius * 0.25).max(10.0),
                    angle: 0.0,
                    opacity,
                });
            }
        }
    }
}
