//! Radial blast wave
//!
//! Pushes every dynamic body within reach of a detonation outward with a
//! force that falls off linearly to zero at the edge.

use glam::Vec2;
use rand::Rng;

use super::world::PhysicsWorld;
use crate::consts::*;

/// Blast parameters derived from the detonating body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlastWave {
    pub center: Vec2,
    pub reach: f32,
    pub force: f32,
}

impl BlastWave {
    pub fn from_source(center: Vec2, source_radius: f32) -> Self {
        let r = source_radius.max(0.0);
        Self {
            center,
            reach: r * BLAST_REACH_MULT,
            force: BLAST_FORCE_BASE + r / BLAST_FORCE_DIVISOR,
        }
    }

    /// Force on a body at `position`; `None` outside the reach
    pub fn force_at(&self, position: Vec2, rng: &mut impl Rng) -> Option<Vec2> {
        let delta = position - self.center;
        let dist = delta.length();
        if !dist.is_finite() || dist >= self.reach {
            return None;
        }
        let falloff = 1.0 - dist / self.reach;
        let dir = if dist < BLAST_DEGENERATE_DIST {
            // Coincident with the center: kick up with a random sideways lean
            Vec2::new(rng.random::<f32>() - 0.5, -1.0)
        } else {
            delta / dist
        };
        Some(dir * self.force * falloff)
    }

    /// Wake and push every dynamic body in reach; returns how many were hit
    pub fn apply(&self, world: &mut dyn PhysicsWorld, rng: &mut impl Rng) -> usize {
        let mut hit = 0;
        for handle in world.all_bodies() {
            // Bodies removed mid-pass are skipped
            let Some(state) = world.body(handle) else {
                continue;
            };
            if state.is_static {
                continue;
            }
            if let Some(force) = self.force_at(state.position, rng) {
                world.set_sleeping(handle, false);
                world.apply_force(handle, state.position, force);
                hit += 1;
            }
        }
        log::trace!("Blast at {:?} reach {:.0} hit {} bodies", self.center, self.reach, hit);
        hit
    }
}
