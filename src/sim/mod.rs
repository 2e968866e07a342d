//! Deterministic simulation module
//!
//! Everything between an inbound event and the bodies in the pit:
//! - Seeded RNG only (`PitState::rng`)
//! - Stable iteration order (by body handle)
//! - Arena mutation happens after a scan, never during it
//! - No rendering or platform dependencies

pub mod blast;
pub mod explosion;
pub mod sandbox;
pub mod schedule;
pub mod spawn;
pub mod state;
pub mod sweep;
pub mod tick;
pub mod world;

pub use blast::BlastWave;
pub use explosion::{DebrisPlan, Detonation};
pub use sandbox::SandboxWorld;
pub use schedule::{ScheduledAction, Scheduler, TaskOwner, ThemeId};
pub use spawn::{BodyShape, DropBand, ExplosiveSpec, SpawnDescriptor, SpawnPlan, SpawnSettings};
pub use state::{
    Archetype, ArenaBounds, BodyKind, BodyRegistry, PitBody, PitConfig, PitState, PitStats, Tier,
    Tint,
};
pub use tick::{NoHooks, TickHooks, TickReport, tick};
pub use world::{BodyHandle, BodyOptions, BodyState, CollisionPair, PhysicsWorld};
