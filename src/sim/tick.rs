//! Fixed timestep simulation tick
//!
//! Order within one tick:
//! 1. physics step
//! 2. step hook (theme lifecycle work, e.g. detonations)
//! 3. collision hooks, one per newly begun contact
//! 4. due timer tasks (staggered spawns, ground restore), with a spawn hook per drop
//! 5. lifecycle sweep, when its interval has elapsed

use super::schedule::ScheduledAction;
use super::spawn::SpawnDescriptor;
use super::state::PitState;
use super::sweep::sweep;
use super::world::{BodyHandle, CollisionPair};

/// Callbacks a tick drives
pub trait TickHooks {
    fn on_step(&mut self, _pit: &mut PitState) {}
    fn on_collision(&mut self, _pit: &mut PitState, _pair: CollisionPair) {}
    /// A queued body just entered the pit
    fn on_spawn(&mut self, _pit: &mut PitState, _handle: BodyHandle, _desc: &SpawnDescriptor) {}
}

/// No theme attached
pub struct NoHooks;

impl TickHooks for NoHooks {}

/// What happened during one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub collisions: usize,
    pub spawned: usize,
    pub swept: usize,
    pub restored: bool,
}

/// Advance the pit by `dt_ms`
pub fn tick(pit: &mut PitState, dt_ms: f64, hooks: &mut dyn TickHooks) -> TickReport {
    let mut report = TickReport::default();
    if !dt_ms.is_finite() || dt_ms <= 0.0 {
        return report;
    }
    pit.now_ms += dt_ms;

    let pairs = pit.world.step(dt_ms);
    report.collisions = pairs.len();

    hooks.on_step(pit);
    for pair in pairs {
        hooks.on_collision(pit, pair);
    }

    for task in pit.scheduler.take_due(pit.now_ms) {
        match task.action {
            ScheduledAction::Spawn(desc) => {
                let handle = pit.spawn(&desc);
                hooks.on_spawn(pit, handle, &desc);
                report.spawned += 1;
            }
            ScheduledAction::RestoreGround => {
                pit.restore_ground();
                report.restored = true;
            }
        }
    }

    if pit.take_sweep_due() {
        report.swept = sweep(pit);
    }
    report
}
