//! Spawn policy: inbound events to body descriptors
//!
//! `decide` is a pure function of the event, the theme settings, the arena
//! bounds and the RNG. Staggered drops are expanded here into individual
//! descriptors with a `delay_ms`; queuing them is the caller's job.

use glam::Vec2;
use rand::Rng;

use super::state::{ArenaBounds, BodyKind, Tier, Tint};
use super::world::BodyOptions;
use crate::consts::*;
use crate::event::{CanonicalEvent, EventKind};
use crate::settings::ThemeConfig;
use crate::{cheer_radius, scaled_radius};

/// Setting ids read by the ball spawn policy
pub mod keys {
    pub const GLOBAL_SCALE: &str = "global_scale_mult";
    pub const FOLLOW_ENABLED: &str = "follow_enabled";
    pub const FOLLOW_MIN: &str = "follow_min_size";
    pub const FOLLOW_MAX: &str = "follow_max_size";
    pub const SUB_ENABLED: &str = "sub_enabled";
    pub const SUB_PRIME: &str = "sub_prime_size";
    pub const SUB_T2: &str = "sub_t2_size";
    pub const SUB_T3: &str = "sub_t3_size";
    pub const BITS_ENABLED: &str = "bits_enabled";
    pub const BITS_CLUSTER: &str = "bits_cluster_threshold";
    pub const BITS_EXPLOSION: &str = "bits_explosion_threshold";
    pub const BITS_MEGA: &str = "bits_mega_threshold";
}

/// Drop band probabilities (cumulative upper bounds)
const HUGE_BAND: f32 = 0.015;
const CLUSTER_BAND: f32 = 0.065;
const EXPLODING_BAND: f32 = 0.15;

/// Bodies in a follow cluster
const FOLLOW_CLUSTER_SIZE: u32 = 10;
/// Upper bound on a cheer cluster, whatever the thresholds are set to
const MAX_CHEER_CLUSTER: u32 = 100;
/// Bits value whose radius sizes cluster balls and bomb debris
const CLUSTER_BITS: f64 = 99.0;

/// Archetype band for follow and `!ball` drops
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropBand {
    Huge,
    Cluster,
    Exploding,
    Normal,
}

impl DropBand {
    /// Classify a uniform roll in [0, 1)
    pub fn from_roll(u: f32) -> Self {
        if u < HUGE_BAND {
            DropBand::Huge
        } else if u < CLUSTER_BAND {
            DropBand::Cluster
        } else if u < EXPLODING_BAND {
            DropBand::Exploding
        } else {
            DropBand::Normal
        }
    }

    pub fn roll(rng: &mut impl Rng) -> Self {
        Self::from_roll(rng.random::<f32>())
    }
}

/// Collision shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BodyShape {
    Circle { radius: f32 },
    /// Full width and height
    Rect { size: Vec2 },
}

impl BodyShape {
    /// Circle radius, or half the rectangle width
    pub fn radius(&self) -> f32 {
        match self {
            BodyShape::Circle { radius } => *radius,
            BodyShape::Rect { size } => size.x / 2.0,
        }
    }
}

/// Cascade data for a body that will detonate
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ExplosiveSpec {
    pub tier: Tier,
    pub debris_count: Option<u32>,
    pub debris_radius: Option<f32>,
}

/// Everything needed to put one body into the pit
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnDescriptor {
    pub kind: BodyKind,
    pub shape: BodyShape,
    pub position: Vec2,
    pub options: BodyOptions,
    pub explosive: Option<ExplosiveSpec>,
    pub fade_on_settle: bool,
    pub owner: String,
    pub top_label: Option<String>,
    pub bottom_label: Option<String>,
    pub tint: Tint,
    pub visual_size: f32,
    pub scale: f32,
    /// Delay relative to the deciding event
    pub delay_ms: u32,
    /// Ding when the body enters the pit
    pub chime: bool,
}

impl SpawnDescriptor {
    /// Plain ball at `position`
    pub fn ball(owner: impl Into<String>, position: Vec2, radius: f32, tint: Tint) -> Self {
        Self {
            kind: BodyKind::Ball,
            shape: BodyShape::Circle { radius },
            position,
            options: BodyOptions::default(),
            explosive: None,
            fade_on_settle: false,
            owner: owner.into(),
            top_label: None,
            bottom_label: None,
            tint,
            visual_size: radius * 2.0,
            scale: 1.0,
            delay_ms: 0,
            chime: false,
        }
    }

    pub fn explosive(mut self, spec: ExplosiveSpec) -> Self {
        self.explosive = Some(spec);
        self
    }

    pub fn fading(mut self) -> Self {
        self.fade_on_settle = true;
        self
    }

    pub fn with_labels(mut self, top: Option<String>, bottom: Option<String>) -> Self {
        self.top_label = top;
        self.bottom_label = bottom;
        self
    }

    pub fn delayed(mut self, delay_ms: u32) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn chiming(mut self) -> Self {
        self.chime = true;
        self
    }

    pub fn radius(&self) -> f32 {
        self.shape.radius()
    }
}

/// Result of a policy decision
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpawnPlan {
    pub bodies: Vec<SpawnDescriptor>,
    /// Extra chime up front, on top of the per-drop ones
    pub alert: bool,
}

/// Typed view of the ball spawn settings
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnSettings {
    pub scale: f32,
    pub follow_enabled: bool,
    pub follow_min: f32,
    pub follow_max: f32,
    pub sub_enabled: bool,
    pub sub_prime: f32,
    pub sub_t2: f32,
    pub sub_t3: f32,
    pub bits_enabled: bool,
    pub cluster_threshold: f64,
    pub explosion_threshold: f64,
    pub mega_threshold: f64,
}

impl Default for SpawnSettings {
    fn default() -> Self {
        Self {
            scale: 1.0,
            follow_enabled: true,
            follow_min: 15.0,
            follow_max: 85.0,
            sub_enabled: true,
            sub_prime: 50.0,
            sub_t2: 75.0,
            sub_t3: 100.0,
            bits_enabled: true,
            cluster_threshold: 100.0,
            explosion_threshold: 1000.0,
            mega_threshold: 10000.0,
        }
    }
}

impl SpawnSettings {
    pub fn from_config(config: &ThemeConfig) -> Self {
        Self {
            scale: config.number(keys::GLOBAL_SCALE) as f32,
            follow_enabled: config.flag(keys::FOLLOW_ENABLED),
            follow_min: config.number(keys::FOLLOW_MIN) as f32,
            follow_max: config.number(keys::FOLLOW_MAX) as f32,
            sub_enabled: config.flag(keys::SUB_ENABLED),
            sub_prime: config.number(keys::SUB_PRIME) as f32,
            sub_t2: config.number(keys::SUB_T2) as f32,
            sub_t3: config.number(keys::SUB_T3) as f32,
            bits_enabled: config.flag(keys::BITS_ENABLED),
            cluster_threshold: config.number(keys::BITS_CLUSTER).max(0.0),
            explosion_threshold: config.number(keys::BITS_EXPLOSION).max(0.0),
            mega_threshold: config.number(keys::BITS_MEGA).max(0.0),
        }
    }
}

/// Map one event to the bodies it drops
pub fn decide(
    event: &CanonicalEvent,
    settings: &SpawnSettings,
    bounds: ArenaBounds,
    rng: &mut impl Rng,
) -> SpawnPlan {
    let owner = event.username.to_uppercase();
    let plan = match event.kind {
        EventKind::Follow if settings.follow_enabled => {
            let (lo, hi) = ordered(settings.follow_min, settings.follow_max);
            let base = lo + rng.random::<f32>() * (hi - lo);
            let band = DropBand::roll(rng);
            drop_band(band, &owner, base, None, settings.scale, bounds, rng)
        }
        EventKind::Subscribe if settings.sub_enabled => subscribe(event, &owner, settings, bounds, rng),
        EventKind::Cheer if settings.bits_enabled => cheer(event.bits(), &owner, settings, bounds, rng),
        EventKind::ChatCommand if event.raw_command.as_deref() == Some("!ball") => {
            let band = DropBand::roll(rng);
            let base = 15.0 + rng.random::<f32>() * 70.0;
            let label = Some("!ball".to_string());
            drop_band(band, &owner, base, label, settings.scale, bounds, rng)
        }
        _ => SpawnPlan::default(),
    };
    log::debug!(
        "{:?} from {} -> {} bodies{}",
        event.kind,
        event.username,
        plan.bodies.len(),
        if plan.alert { " + alert" } else { "" }
    );
    plan
}

fn ordered(a: f32, b: f32) -> (f32, f32) {
    if a <= b { (a, b) } else { (b, a) }
}

fn drop_point(bounds: ArenaBounds, rng: &mut impl Rng) -> Vec2 {
    Vec2::new(rng.random::<f32>() * bounds.width, DROP_HEIGHT)
}

fn drop_band(
    band: DropBand,
    owner: &str,
    base: f32,
    label: Option<String>,
    scale: f32,
    bounds: ArenaBounds,
    rng: &mut impl Rng,
) -> SpawnPlan {
    let bodies = match band {
        DropBand::Cluster => (0..FOLLOW_CLUSTER_SIZE)
            .map(|i| {
                let x = rng.random::<f32>() * bounds.width;
                let y = DROP_HEIGHT + rng.random::<f32>() * 300.0;
                let radius = scaled_radius(15.0 + rng.random::<f32>() * 30.0, scale);
                SpawnDescriptor::ball(owner, Vec2::new(x, y), radius, Tint::random_palette(rng))
                    .delayed(i * CLUSTER_STAGGER_MS)
            })
            .collect(),
        DropBand::Huge => {
            let raw = base.max(100.0) + rng.random::<f32>() * 30.0;
            let pos = drop_point(bounds, rng);
            let tint = Tint::random_palette(rng);
            vec![
                SpawnDescriptor::ball(owner, pos, scaled_radius(raw, scale), tint)
                    .with_labels(None, label)
                    .chiming(),
            ]
        }
        DropBand::Exploding => {
            let pos = drop_point(bounds, rng);
            vec![
                SpawnDescriptor::ball(owner, pos, scaled_radius(base, scale), Tint::Charcoal)
                    .explosive(ExplosiveSpec::default())
                    .with_labels(None, label)
                    .chiming(),
            ]
        }
        DropBand::Normal => {
            let pos = drop_point(bounds, rng);
            let tint = Tint::random_palette(rng);
            vec![
                SpawnDescriptor::ball(owner, pos, scaled_radius(base, scale), tint)
                    .with_labels(None, label)
                    .chiming(),
            ]
        }
    };
    SpawnPlan {
        bodies,
        alert: false,
    }
}

/// Size and label for a subscription tier code; an exact tier match wins over prime
fn sub_tier(tier_code: &str, is_prime: bool, settings: &SpawnSettings) -> (f32, &'static str) {
    match tier_code {
        "3000" => (settings.sub_t3, "Tier 3"),
        "2000" => (settings.sub_t2, "Tier 2"),
        code if code.contains("prime") || is_prime => (settings.sub_prime, "Prime"),
        _ => (settings.sub_prime, "Tier 1"),
    }
}

fn subscribe(
    event: &CanonicalEvent,
    owner: &str,
    settings: &SpawnSettings,
    bounds: ArenaBounds,
    rng: &mut impl Rng,
) -> SpawnPlan {
    let code = event.tier_code.as_deref().unwrap_or("1000");
    let (size, text) = sub_tier(code, event.is_prime.unwrap_or(false), settings);
    let pos = drop_point(bounds, rng);
    let tint = Tint::random_palette(rng);
    let body = SpawnDescriptor::ball(owner, pos, scaled_radius(size, settings.scale), tint)
        .with_labels(Some("SUB".to_string()), Some(text.to_string()))
        .chiming();
    SpawnPlan {
        bodies: vec![body],
        alert: false,
    }
}

fn cheer(
    bits: f64,
    owner: &str,
    settings: &SpawnSettings,
    bounds: ArenaBounds,
    rng: &mut impl Rng,
) -> SpawnPlan {
    let label = Some(format!("{} bits", bits));
    let scale = settings.scale;
    let alert = bits >= settings.explosion_threshold;

    let bodies = if bits >= settings.mega_threshold {
        let pos = drop_point(bounds, rng);
        let spec = ExplosiveSpec {
            tier: Tier::Mega,
            ..Default::default()
        };
        vec![
            SpawnDescriptor::ball(owner, pos, scaled_radius(MAX_BODY_RADIUS, scale), Tint::Charcoal)
                .explosive(spec)
                .with_labels(None, label)
                .chiming(),
        ]
    } else if bits >= settings.explosion_threshold {
        let span = settings.mega_threshold - settings.explosion_threshold;
        let progress = if span > 0.0 {
            ((bits - settings.explosion_threshold) / span).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let spec = ExplosiveSpec {
            tier: Tier::Primary,
            debris_count: Some(11 + (progress * 9.0).floor() as u32),
            debris_radius: Some(cheer_radius(CLUSTER_BITS) * scale.max(0.0)),
        };
        let pos = drop_point(bounds, rng);
        vec![
            SpawnDescriptor::ball(owner, pos, scaled_radius(cheer_radius(bits), scale), Tint::Charcoal)
                .explosive(spec)
                .with_labels(None, label)
                .chiming(),
        ]
    } else if bits >= settings.cluster_threshold {
        let count = (1 + (bits / 100.0).floor() as u32).min(MAX_CHEER_CLUSTER);
        (0..count)
            .map(|i| {
                let raw = cheer_radius(CLUSTER_BITS) + rng.random::<f32>() * 5.0;
                let pos = drop_point(bounds, rng);
                let tint = Tint::random_palette(rng);
                let bottom = if i == 0 { label.clone() } else { None };
                SpawnDescriptor::ball(owner, pos, scaled_radius(raw, scale), tint)
                    .with_labels(None, bottom)
                    .delayed(i * CHEER_STAGGER_MS)
                    .chiming()
            })
            .collect()
    } else {
        let pos = drop_point(bounds, rng);
        let tint = Tint::random_palette(rng);
        vec![
            SpawnDescriptor::ball(owner, pos, scaled_radius(cheer_radius(bits), scale), tint)
                .with_labels(None, label)
                .chiming(),
        ]
    };

    SpawnPlan { bodies, alert }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;
    use serde_json::json;

    use crate::event::normalize;

    const BOUNDS: ArenaBounds = ArenaBounds {
        width: 1920.0,
        height: 1080.0,
    };

    fn decide_json(kind: EventKind, payload: serde_json::Value, settings: &SpawnSettings) -> SpawnPlan {
        let mut rng = Pcg32::seed_from_u64(42);
        decide(&normalize(kind, &payload), settings, BOUNDS, &mut rng)
    }

    #[test]
    fn test_drop_band_edges() {
        assert_eq!(DropBand::from_roll(0.0), DropBand::Huge);
        assert_eq!(DropBand::from_roll(0.015), DropBand::Cluster);
        assert_eq!(DropBand::from_roll(0.065), DropBand::Exploding);
        assert_eq!(DropBand::from_roll(0.15), DropBand::Normal);
        assert_eq!(DropBand::from_roll(0.999), DropBand::Normal);
    }

    #[test]
    fn test_follow_band_frequencies() {
        let mut rng = Pcg32::seed_from_u64(2024);
        let mut counts = [0u32; 4];
        const TRIALS: u32 = 100_000;
        for _ in 0..TRIALS {
            let idx = match DropBand::roll(&mut rng) {
                DropBand::Huge => 0,
                DropBand::Cluster => 1,
                DropBand::Exploding => 2,
                DropBand::Normal => 3,
            };
            counts[idx] += 1;
        }
        let expected = [0.015, 0.05, 0.085, 0.85];
        for (count, p) in counts.iter().zip(expected) {
            let observed = *count as f64 / TRIALS as f64;
            // ~5 standard deviations for the smallest band
            assert!((observed - p).abs() < 0.002 + p * 0.05, "observed {observed}, expected {p}");
        }
    }

    #[test]
    fn test_follow_respects_size_range() {
        let settings = SpawnSettings::default();
        let mut rng = Pcg32::seed_from_u64(1);
        let event = normalize(EventKind::Follow, &json!({"user_name": "bob"}));
        for _ in 0..500 {
            let plan = decide(&event, &settings, BOUNDS, &mut rng);
            assert!(!plan.alert);
            // Single drops ding, the rain cluster falls silently
            let single = plan.bodies.len() == 1;
            for body in &plan.bodies {
                assert_eq!(body.chime, single);
                assert_eq!(body.owner, "BOB");
                let r = body.radius();
                assert!((12.0..=200.0).contains(&r), "radius {r}");
                if body.explosive.is_some() {
                    assert_eq!(body.tint, Tint::Charcoal);
                }
            }
            if plan.bodies.len() > 1 {
                assert_eq!(plan.bodies.len(), 10);
                let delays: Vec<u32> = plan.bodies.iter().map(|b| b.delay_ms).collect();
                assert_eq!(delays, (0..10).map(|i| i * 50).collect::<Vec<_>>());
            }
        }
    }

    #[test]
    fn test_follow_disabled() {
        let settings = SpawnSettings {
            follow_enabled: false,
            ..Default::default()
        };
        assert!(decide_json(EventKind::Follow, json!({}), &settings).bodies.is_empty());
    }

    #[test]
    fn test_cheer_mega_bomb() {
        let settings = SpawnSettings::default();
        let plan = decide_json(EventKind::Cheer, json!({"bits": 15000}), &settings);
        assert!(plan.alert);
        assert_eq!(plan.bodies.len(), 1);
        let body = &plan.bodies[0];
        assert!(body.chime);
        assert_eq!(body.radius(), 200.0);
        assert_eq!(body.explosive.unwrap().tier, Tier::Mega);
        assert_eq!(body.bottom_label.as_deref(), Some("15000 bits"));

        let scaled = SpawnSettings {
            scale: 1.5,
            ..Default::default()
        };
        let plan = decide_json(EventKind::Cheer, json!({"bits": 15000}), &scaled);
        assert_eq!(plan.bodies[0].radius(), 300.0);
    }

    #[test]
    fn test_cheer_explosion_debris_scales_with_progress() {
        let settings = SpawnSettings::default();
        let low = decide_json(EventKind::Cheer, json!({"bits": 1000}), &settings);
        let high = decide_json(EventKind::Cheer, json!({"bits": 9999}), &settings);
        let spec_low = low.bodies[0].explosive.unwrap();
        let spec_high = high.bodies[0].explosive.unwrap();
        assert_eq!(spec_low.tier, Tier::Primary);
        assert_eq!(spec_low.debris_count, Some(11));
        assert_eq!(spec_high.debris_count, Some(19));
        assert_eq!(spec_low.debris_radius, Some(cheer_radius(99.0)));
        assert!(low.alert && high.alert);
        assert!(low.bodies[0].chime && high.bodies[0].chime);
    }

    #[test]
    fn test_cheer_cluster_staggered() {
        let settings = SpawnSettings::default();
        let plan = decide_json(EventKind::Cheer, json!({"bits": 500}), &settings);
        assert!(!plan.alert);
        assert_eq!(plan.bodies.len(), 6);
        for (i, body) in plan.bodies.iter().enumerate() {
            assert_eq!(body.delay_ms, i as u32 * 30);
            assert!(body.chime);
            assert!(body.explosive.is_none());
            let base = cheer_radius(99.0);
            assert!(body.radius() >= base && body.radius() < base + 5.0);
        }
        assert_eq!(plan.bodies[0].bottom_label.as_deref(), Some("500 bits"));
        assert!(plan.bodies[1..].iter().all(|b| b.bottom_label.is_none()));
    }

    #[test]
    fn test_cheer_small() {
        let plan = decide_json(EventKind::Cheer, json!({"bits": 50}), &SpawnSettings::default());
        assert!(!plan.alert);
        assert_eq!(plan.bodies.len(), 1);
        assert!(plan.bodies[0].chime);
        assert!((plan.bodies[0].radius() - cheer_radius(50.0)).abs() < 1e-4);
        // Missing bits counts as one
        let plan = decide_json(EventKind::Cheer, json!({}), &SpawnSettings::default());
        assert_eq!(plan.bodies[0].bottom_label.as_deref(), Some("1 bits"));
    }

    #[test]
    fn test_cheer_cluster_is_capped() {
        let settings = SpawnSettings {
            explosion_threshold: 1e9,
            mega_threshold: 2e9,
            ..Default::default()
        };
        let plan = decide_json(EventKind::Cheer, json!({"bits": 5e8}), &settings);
        assert_eq!(plan.bodies.len(), MAX_CHEER_CLUSTER as usize);
    }

    #[test]
    fn test_subscribe_tiers() {
        let settings = SpawnSettings::default();
        let t3 = decide_json(EventKind::Subscribe, json!({"tier": "3000"}), &settings);
        assert_eq!(t3.bodies[0].radius(), 100.0);
        assert_eq!(t3.bodies[0].bottom_label.as_deref(), Some("Tier 3"));
        assert_eq!(t3.bodies[0].top_label.as_deref(), Some("SUB"));
        assert!(t3.bodies[0].chime && !t3.alert);
        assert!(t3.bodies[0].explosive.is_none());

        // Tier string wins over the prime flag
        let t2 = decide_json(EventKind::Subscribe, json!({"tier": "2000", "is_prime": true}), &settings);
        assert_eq!(t2.bodies[0].bottom_label.as_deref(), Some("Tier 2"));

        let prime = decide_json(EventKind::Subscribe, json!({"sub_tier": "Prime"}), &settings);
        assert_eq!(prime.bodies[0].bottom_label.as_deref(), Some("Prime"));
        assert_eq!(prime.bodies[0].radius(), 50.0);

        let plain = decide_json(EventKind::Subscribe, json!({}), &settings);
        assert_eq!(plain.bodies[0].bottom_label.as_deref(), Some("Tier 1"));
    }

    #[test]
    fn test_chat_ball_command() {
        let settings = SpawnSettings::default();
        let mut rng = Pcg32::seed_from_u64(9);
        let event = normalize(EventKind::ChatCommand, &json!({"message": {"message": "  !BALL "}}));
        let mut labelled = 0;
        for _ in 0..50 {
            let plan = decide(&event, &settings, BOUNDS, &mut rng);
            assert!(!plan.bodies.is_empty());
            labelled += plan
                .bodies
                .iter()
                .filter(|b| b.bottom_label.as_deref() == Some("!ball"))
                .count();
        }
        assert!(labelled > 0);

        let other = normalize(EventKind::ChatCommand, &json!({"message": "hello"}));
        assert!(decide(&other, &settings, BOUNDS, &mut rng).bodies.is_empty());
    }
}
