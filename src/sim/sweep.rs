//! Lifecycle sweep: drop bodies that have fallen out of the pit

use super::state::PitState;
use super::world::BodyHandle;

/// Whether a body at `y` is past the sweep line
#[inline]
pub fn is_out_of_bounds(y: f32, height: f32, margin: f32) -> bool {
    y > height + margin
}

/// Remove every non-static body below `height + margin`; returns how many went
pub fn sweep(pit: &mut PitState) -> usize {
    let height = pit.config().height;
    let margin = pit.config().sweep_margin;

    let doomed: Vec<BodyHandle> = pit
        .world
        .all_bodies()
        .into_iter()
        .filter(|h| {
            pit.world
                .body(*h)
                .is_some_and(|s| !s.is_static && is_out_of_bounds(s.position.y, height, margin))
        })
        .collect();
    for handle in &doomed {
        pit.remove_body(*handle);
    }

    // Metadata for bodies the backend no longer knows about
    let stale: Vec<BodyHandle> = pit
        .bodies
        .handles()
        .into_iter()
        .filter(|h| pit.world.body(*h).is_none())
        .collect();
    for handle in stale {
        pit.bodies.remove(handle);
    }

    if !doomed.is_empty() {
        log::debug!("Swept {} bodies below the pit", doomed.len());
    }
    pit.stats.swept += doomed.len() as u64;
    doomed.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::sandbox::SandboxWorld;
    use crate::sim::spawn::SpawnDescriptor;
    use crate::sim::state::{PitConfig, Tint};
    use glam::Vec2;
    use proptest::prelude::*;

    fn pit() -> PitState {
        PitState::new(Box::new(SandboxWorld::weightless()), PitConfig::default())
    }

    #[test]
    fn test_sweep_keeps_walls_and_visible_bodies() {
        let mut pit = pit();
        let keep = pit.spawn(&SpawnDescriptor::ball("A", Vec2::new(100.0, 500.0), 20.0, Tint::Palette(0)));
        let lost = pit.spawn(&SpawnDescriptor::ball("B", Vec2::new(100.0, 3081.0), 20.0, Tint::Palette(0)));
        assert_eq!(sweep(&mut pit), 1);
        assert!(pit.bodies.get(keep).is_some());
        assert!(pit.bodies.get(lost).is_none());
        assert!(pit.world.body(lost).is_none());
        assert_eq!(pit.world.all_bodies().len(), 5);
        assert_eq!(pit.stats.swept, 1);
    }

    #[test]
    fn test_sweep_drops_stale_metadata() {
        let mut pit = pit();
        let h = pit.spawn(&SpawnDescriptor::ball("A", Vec2::new(100.0, 500.0), 20.0, Tint::Palette(0)));
        pit.world.remove(h);
        assert_eq!(sweep(&mut pit), 0);
        assert!(pit.bodies.is_empty());
    }

    proptest! {
        #[test]
        fn removed_iff_below_line(y in -5000.0f32..10000.0) {
            let mut pit = pit();
            let h = pit.spawn(&SpawnDescriptor::ball("A", Vec2::new(100.0, y), 20.0, Tint::Palette(0)));
            sweep(&mut pit);
            let expect_removed = y > 1080.0 + 2000.0;
            prop_assert_eq!(pit.world.body(h).is_none(), expect_removed);
            prop_assert_eq!(pit.bodies.get(h).is_none(), expect_removed);
        }
    }
}
