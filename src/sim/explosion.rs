//! Tiered detonation protocol
//!
//! Explosive bodies detonate the first tick they are observed asleep.
//! Sleeping candidates are collected before anything is removed or
//! inserted, so the arena is never mutated while it is being scanned.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;

use super::blast::BlastWave;
use super::spawn::{ExplosiveSpec, SpawnDescriptor};
use super::state::{Archetype, PitBody, PitState, Tier, Tint};
use super::world::BodyHandle;
use crate::consts::*;

/// How a detonating body breaks up
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebrisPlan {
    pub count: u32,
    /// Base radius before per-piece jitter, never below the debris floor
    pub radius: f32,
    /// Tier of explosive children; `None` for inert debris
    pub child_tier: Option<Tier>,
    pub child_fades: bool,
}

impl DebrisPlan {
    pub fn for_bomb(bomb: &PitBody, rng: &mut impl Rng) -> Self {
        let parent = bomb.radius;
        let plan = match bomb.tier {
            Tier::Mega => Self {
                count: 2,
                radius: parent,
                child_tier: Some(Tier::Secondary),
                child_fades: false,
            },
            Tier::Secondary => Self {
                count: rng.random_range(5..=6),
                radius: (parent * 0.9).floor(),
                child_tier: None,
                child_fades: true,
            },
            Tier::Primary => Self {
                count: bomb
                    .debris_count
                    .unwrap_or_else(|| ((parent / 10.0).floor() as u32).max(5))
                    .max(1),
                radius: bomb
                    .debris_radius
                    .unwrap_or_else(|| (parent / 4.0).floor().clamp(MIN_DEBRIS_RADIUS, 35.0)),
                child_tier: None,
                child_fades: false,
            },
        };
        Self {
            radius: plan.radius.max(MIN_DEBRIS_RADIUS),
            ..plan
        }
    }
}

/// Record of one detonation
#[derive(Debug, Clone, PartialEq)]
pub struct Detonation {
    pub center: Vec2,
    pub radius: f32,
    pub tier: Tier,
    pub debris: Vec<BodyHandle>,
}

/// Advance every body's lifecycle by one observation
///
/// Sleeping fading debris settles; sleeping explosives detonate.
pub fn step(pit: &mut PitState) -> Vec<Detonation> {
    let mut bombs = Vec::new();
    let mut settled = Vec::new();
    for body in pit.bodies.iter() {
        let asleep = pit.world.body(body.handle).is_some_and(|s| s.is_sleeping);
        if !asleep {
            continue;
        }
        match body.archetype {
            Archetype::Explosive => bombs.push(body.handle),
            Archetype::DebrisFading => settled.push(body.handle),
            _ => {}
        }
    }

    for handle in settled {
        let anchor = pit.now_ms + pit.rng.random::<f64>() * SETTLED_FADE_SPREAD_MS;
        if let Some(body) = pit.bodies.get_mut(handle) {
            body.archetype = Archetype::SettledFading;
            body.fade_anchor_ms = Some(anchor);
        }
    }

    bombs
        .into_iter()
        .filter_map(|handle| detonate(pit, handle))
        .collect()
}

/// Detonate one explosive body: remove it, scatter debris, then push the neighbours
pub fn detonate(pit: &mut PitState, handle: BodyHandle) -> Option<Detonation> {
    let center = pit.world.body(handle)?.position;
    if !pit.bodies.get(handle)?.is_explosive() {
        return None;
    }
    let bomb = pit.remove_body(handle)?;
    let plan = DebrisPlan::for_bomb(&bomb, &mut pit.rng);

    let mut debris = Vec::with_capacity(plan.count as usize);
    for i in 0..plan.count {
        let angle = TAU * i as f32 / plan.count as f32;
        let dir = Vec2::new(angle.cos(), angle.sin());
        let position = center + dir * DEBRIS_NUDGE;
        let jitter = 0.8 + pit.rng.random::<f32>() * 0.4;
        let radius = plan.radius * jitter;

        let tint = match plan.child_tier {
            Some(_) => Tint::Gold,
            None => Tint::random_palette(&mut pit.rng),
        };
        let label = if i == 0 { bomb.bottom_label.clone() } else { None };
        let mut desc = SpawnDescriptor::ball(bomb.owner.clone(), position, radius, tint)
            .with_labels(None, label);
        if let Some(tier) = plan.child_tier {
            desc = desc.explosive(ExplosiveSpec {
                tier,
                ..Default::default()
            });
        }
        if plan.child_fades {
            desc = desc.fading();
        }

        let child = pit.spawn(&desc);
        pit.world.apply_force(child, position, dir * DEBRIS_KICK);
        debris.push(child);
    }

    BlastWave::from_source(center, bomb.radius).apply(pit.world.as_mut(), &mut pit.rng);
    pit.stats.detonations += 1;
    log::debug!(
        "Detonated tier {} bomb (r={:.0}) from {} into {} pieces",
        bomb.tier.as_u8(),
        bomb.radius,
        bomb.owner,
        debris.len()
    );

    Some(Detonation {
        center,
        radius: bomb.radius,
        tier: bomb.tier,
        debris,
    })
}
