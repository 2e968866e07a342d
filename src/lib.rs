//! The Pit - live audience physics overlay
//!
//! Core modules:
//! - `event`: Inbound payload normalization
//! - `sim`: Spawn policy, explosion cascades, blast waves, lifecycle sweep
//! - `theme`: Theme capability set and the switching protocol
//! - `settings`: Per-theme setting schemas and values
//! - `persistence`: Settings storage backends
//! - `platform`: Asset loading abstraction
//! - `audio` / `render`: Collaborator interfaces for sound and labels
//! - `web`: wasm-bindgen surface for the browser overlay

pub mod audio;
pub mod event;
pub mod persistence;
pub mod platform;
pub mod render;
pub mod settings;
pub mod sim;
pub mod theme;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use event::{CanonicalEvent, EventKind, normalize};
pub use settings::{SettingField, SettingKind, SettingValue, ThemeConfig};
pub use sim::{PitConfig, PitState};
pub use theme::{Theme, ThemeError, ThemeManager};

/// Engine configuration constants
pub mod consts {
    /// Fixed simulation step (60 Hz, milliseconds)
    pub const TICK_MS: f64 = 1000.0 / 60.0;

    /// Lifecycle sweep cadence
    pub const SWEEP_INTERVAL_MS: f64 = 2000.0;
    /// Bodies this far below the arena floor are swept
    pub const SWEEP_MARGIN: f32 = 2000.0;
    /// Ground restore delay after a flush
    pub const RESTORE_DELAY_MS: f64 = 5000.0;

    /// Body radius bounds (before the theme scale is applied)
    pub const MIN_BODY_RADIUS: f32 = 12.0;
    pub const MAX_BODY_RADIUS: f32 = 200.0;
    /// Absolute floor after scaling, so nothing spawns zero-sized
    pub const MIN_SCALED_RADIUS: f32 = 1.0;

    /// Debris never gets smaller than this
    pub const MIN_DEBRIS_RADIUS: f32 = 12.0;
    /// Radial offset of debris from the detonation center
    pub const DEBRIS_NUDGE: f32 = 10.0;
    /// Outward kick applied to each debris body
    pub const DEBRIS_KICK: f32 = 0.005;

    /// Blast wave reach as a multiple of the bomb radius
    pub const BLAST_REACH_MULT: f32 = 6.0;
    /// Blast wave base force: `BLAST_FORCE_BASE + radius / BLAST_FORCE_DIVISOR`
    pub const BLAST_FORCE_BASE: f32 = 0.05;
    pub const BLAST_FORCE_DIVISOR: f32 = 200.0;
    /// Below this distance the blast direction is randomized
    pub const BLAST_DEGENERATE_DIST: f32 = 0.1;

    /// Stagger between follow-cluster drops
    pub const CLUSTER_STAGGER_MS: u32 = 50;
    /// Stagger between cheer-cluster drops
    pub const CHEER_STAGGER_MS: u32 = 30;

    /// Y coordinate new balls drop from
    pub const DROP_HEIGHT: f32 = 150.0;
    /// Settled-fading oscillation anchors are spread over this window
    pub const SETTLED_FADE_SPREAD_MS: f64 = 8000.0;
    /// Fade oscillation cycle lengths
    pub const FADING_CYCLE_MS: f64 = 6000.0;
    pub const SETTLED_CYCLE_MS: f64 = 8000.0;

    /// Wall thickness for the pit boundary
    pub const WALL_THICKNESS: f32 = 200.0;
}

/// Radius a cheer of `bits` produces before scaling: `15 + sqrt(bits) * 2.5`, capped at 200
#[inline]
pub fn cheer_radius(bits: f64) -> f32 {
    let bits = bits.max(0.0);
    ((15.0 + bits.sqrt() * 2.5) as f32).min(consts::MAX_BODY_RADIUS)
}

/// Clamp a raw radius into body bounds, then apply the theme scale
#[inline]
pub fn scaled_radius(raw: f32, scale: f32) -> f32 {
    let raw = if raw.is_finite() { raw } else { consts::MIN_BODY_RADIUS };
    let clamped = raw.clamp(consts::MIN_BODY_RADIUS, consts::MAX_BODY_RADIUS);
    (clamped * scale.max(0.0)).max(consts::MIN_SCALED_RADIUS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_cheer_radius_known_values() {
        assert!((cheer_radius(0.0) - 15.0).abs() < 1e-4);
        assert!((cheer_radius(100.0) - 40.0).abs() < 1e-4);
        assert_eq!(cheer_radius(1_000_000.0), 200.0);
    }

    #[test]
    fn test_scaled_radius_clamps_before_scaling() {
        assert_eq!(scaled_radius(500.0, 1.0), 200.0);
        assert_eq!(scaled_radius(500.0, 2.0), 400.0);
        assert_eq!(scaled_radius(1.0, 1.0), 12.0);
        assert_eq!(scaled_radius(f32::NAN, 1.0), 12.0);
        assert_eq!(scaled_radius(50.0, 0.0), 1.0);
    }

    proptest! {
        #[test]
        fn cheer_radius_is_monotonic(a in 0.0f64..1e7, b in 0.0f64..1e7) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(cheer_radius(lo) <= cheer_radius(hi));
            prop_assert!(cheer_radius(hi) <= 200.0);
        }
    }
}
