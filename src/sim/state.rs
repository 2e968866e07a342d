//! Pit state and body metadata
//!
//! The physics backend owns body storage. The pit keeps a side table of
//! policy metadata (archetype, cascade tier, owner, labels) keyed by handle,
//! plus the RNG, clock, timers, and the static walls.

use std::collections::BTreeMap;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::schedule::{ScheduledAction, Scheduler, TaskOwner};
use super::spawn::{BodyShape, SpawnDescriptor};
use super::world::{BodyHandle, BodyOptions, PhysicsWorld};
use crate::consts::*;

/// Number of colours in the ball palette
pub const PALETTE_SIZE: u8 = 4;

/// Behavioral category of a body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Archetype {
    Normal,
    /// Detonates the first tick it is seen asleep
    Explosive,
    /// Debris that oscillates until it settles
    DebrisFading,
    /// Terminal visual state
    SettledFading,
}

impl Archetype {
    pub fn is_fading(&self) -> bool {
        matches!(self, Archetype::DebrisFading | Archetype::SettledFading)
    }
}

/// Cascade depth marker. Only three values exist, which bounds any cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Tier {
    /// Not part of a cascade (plain cheer bombs and all leaf debris)
    #[default]
    Primary = 0,
    /// Mega-bomb: splits into two secondary bombs
    Mega = 1,
    /// Secondary bomb: splits into fading debris
    Secondary = 2,
}

impl Tier {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Fill colour tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tint {
    Palette(u8),
    /// Live bombs
    Charcoal,
    /// Secondary bombs from a mega detonation
    Gold,
    /// Textured body (duck or toaster sprite)
    Sprite,
}

impl Tint {
    pub fn random_palette(rng: &mut impl Rng) -> Self {
        Tint::Palette(rng.random_range(0..PALETTE_SIZE))
    }
}

/// What a body depicts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyKind {
    Ball,
    Duck,
    Toaster,
}

/// Policy metadata for one body in the pit
#[derive(Debug, Clone, PartialEq)]
pub struct PitBody {
    pub handle: BodyHandle,
    pub kind: BodyKind,
    pub archetype: Archetype,
    pub tier: Tier,
    /// Circle radius, or half width for rectangles
    pub radius: f32,
    /// Width used for label layout
    pub visual_size: f32,
    /// Per-body size multiplier (sample pitch for ducks/toasters)
    pub scale: f32,
    pub owner: String,
    pub top_label: Option<String>,
    pub bottom_label: Option<String>,
    /// Oscillation anchor (ms) once fading
    pub fade_anchor_ms: Option<f64>,
    pub tint: Tint,
    /// Debris overrides carried from the spawn descriptor
    pub debris_count: Option<u32>,
    pub debris_radius: Option<f32>,
}

impl PitBody {
    pub fn is_explosive(&self) -> bool {
        self.archetype == Archetype::Explosive
    }

    /// Render opacity for fading bodies; `None` when the body does not fade
    pub fn fade_opacity(&self, now_ms: f64) -> Option<f32> {
        let cycle = match self.archetype {
            Archetype::DebrisFading => FADING_CYCLE_MS,
            Archetype::SettledFading => SETTLED_CYCLE_MS,
            _ => return None,
        };
        let anchor = self.fade_anchor_ms.unwrap_or(now_ms);
        let phase = (now_ms - anchor) * std::f64::consts::TAU / cycle;
        Some((0.5 + 0.5 * phase.sin()) as f32)
    }
}

/// Side table of body metadata, iterated in handle order
#[derive(Debug, Clone, Default)]
pub struct BodyRegistry {
    bodies: BTreeMap<BodyHandle, PitBody>,
}

impl BodyRegistry {
    pub fn insert(&mut self, body: PitBody) {
        self.bodies.insert(body.handle, body);
    }

    pub fn remove(&mut self, handle: BodyHandle) -> Option<PitBody> {
        self.bodies.remove(&handle)
    }

    pub fn get(&self, handle: BodyHandle) -> Option<&PitBody> {
        self.bodies.get(&handle)
    }

    pub fn get_mut(&mut self, handle: BodyHandle) -> Option<&mut PitBody> {
        self.bodies.get_mut(&handle)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PitBody> {
        self.bodies.values()
    }

    pub fn handles(&self) -> Vec<BodyHandle> {
        self.bodies.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn clear(&mut self) {
        self.bodies.clear();
    }

    pub fn count_where(&self, f: impl Fn(&PitBody) -> bool) -> usize {
        self.bodies.values().filter(|b| f(b)).count()
    }
}

/// Runtime engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PitConfig {
    /// Visible arena width in pixels
    pub width: f32,
    /// Visible arena height in pixels
    pub height: f32,
    /// RNG seed
    pub seed: u64,
    pub sweep_interval_ms: f64,
    pub sweep_margin: f32,
    pub restore_delay_ms: f64,
}

impl Default for PitConfig {
    fn default() -> Self {
        Self {
            width: 1920.0,
            height: 1080.0,
            seed: 0,
            sweep_interval_ms: SWEEP_INTERVAL_MS,
            sweep_margin: SWEEP_MARGIN,
            restore_delay_ms: RESTORE_DELAY_MS,
        }
    }
}

impl PitConfig {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }
}

/// Visible arena extent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArenaBounds {
    pub width: f32,
    pub height: f32,
}

/// Static boundary bodies
#[derive(Debug, Clone, Copy)]
struct Walls {
    ground: BodyHandle,
    left: BodyHandle,
    right: BodyHandle,
    ceiling: BodyHandle,
}

/// Running counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PitStats {
    pub spawned: u64,
    pub detonations: u64,
    pub swept: u64,
}

/// Center and size of the floor under the pit
fn ground_rect(config: &PitConfig) -> (Vec2, Vec2) {
    (
        Vec2::new(config.width / 2.0, config.height + WALL_THICKNESS / 2.0),
        Vec2::new(config.width, WALL_THICKNESS),
    )
}

/// The shared arena: backend world plus everything the pit tracks about it
pub struct PitState {
    pub world: Box<dyn PhysicsWorld>,
    pub bodies: BodyRegistry,
    pub scheduler: Scheduler,
    pub rng: Pcg32,
    /// Simulation clock in milliseconds
    pub now_ms: f64,
    pub stats: PitStats,
    config: PitConfig,
    walls: Walls,
    /// Ground removed by a flush and not yet restored
    pit_open: bool,
    next_sweep_ms: f64,
}

impl PitState {
    /// Build the pit and its walls inside `world`
    pub fn new(mut world: Box<dyn PhysicsWorld>, config: PitConfig) -> Self {
        let (w, h) = (config.width, config.height);
        let t = WALL_THICKNESS;
        let mut wall = |pos: Vec2, size: Vec2| {
            let handle = world.create_rect(pos, size, BodyOptions::wall());
            world.insert(handle);
            handle
        };
        let (ground_pos, ground_size) = ground_rect(&config);
        let walls = Walls {
            ground: wall(ground_pos, ground_size),
            left: wall(Vec2::new(-t / 2.0, h / 2.0), Vec2::new(t, h * 5.0)),
            right: wall(Vec2::new(w + t / 2.0, h / 2.0), Vec2::new(t, h * 5.0)),
            ceiling: wall(Vec2::new(w / 2.0, -1000.0), Vec2::new(w, t)),
        };

        Self {
            world,
            bodies: BodyRegistry::default(),
            scheduler: Scheduler::default(),
            rng: Pcg32::seed_from_u64(config.seed),
            now_ms: 0.0,
            stats: PitStats::default(),
            next_sweep_ms: config.sweep_interval_ms,
            config,
            walls,
            pit_open: false,
        }
    }

    pub fn config(&self) -> &PitConfig {
        &self.config
    }

    pub fn bounds(&self) -> ArenaBounds {
        ArenaBounds {
            width: self.config.width,
            height: self.config.height,
        }
    }

    pub fn is_open(&self) -> bool {
        self.pit_open
    }

    /// Ground, left, right, ceiling
    pub fn wall_handles(&self) -> [BodyHandle; 4] {
        let w = &self.walls;
        [w.ground, w.left, w.right, w.ceiling]
    }

    /// Whether the lifecycle sweep is due, advancing its schedule if so
    pub(crate) fn take_sweep_due(&mut self) -> bool {
        if self.now_ms < self.next_sweep_ms {
            return false;
        }
        let interval = self.config.sweep_interval_ms.max(1.0);
        while self.next_sweep_ms <= self.now_ms {
            self.next_sweep_ms += interval;
        }
        true
    }

    /// Create and insert the body a descriptor describes
    pub fn spawn(&mut self, desc: &SpawnDescriptor) -> BodyHandle {
        let handle = match desc.shape {
            BodyShape::Circle { radius } => {
                self.world.create_circle(desc.position, radius, desc.options)
            }
            BodyShape::Rect { size } => self.world.create_rect(desc.position, size, desc.options),
        };
        self.world.insert(handle);

        let archetype = if desc.explosive.is_some() {
            Archetype::Explosive
        } else if desc.fade_on_settle {
            Archetype::DebrisFading
        } else {
            Archetype::Normal
        };
        let explosive = desc.explosive.unwrap_or_default();

        self.bodies.insert(PitBody {
            handle,
            kind: desc.kind,
            archetype,
            tier: explosive.tier,
            radius: desc.shape.radius(),
            visual_size: desc.visual_size,
            scale: desc.scale,
            owner: desc.owner.clone(),
            top_label: desc.top_label.clone(),
            bottom_label: desc.bottom_label.clone(),
            fade_anchor_ms: (archetype == Archetype::DebrisFading).then_some(self.now_ms),
            tint: desc.tint,
            debris_count: explosive.debris_count,
            debris_radius: explosive.debris_radius,
        });
        self.stats.spawned += 1;
        handle
    }

    /// Remove a body from both the world and the registry
    pub fn remove_body(&mut self, handle: BodyHandle) -> Option<PitBody> {
        self.world.remove(handle);
        self.bodies.remove(handle)
    }

    /// Instantly remove every non-static body, keeping the walls
    pub fn clear_world(&mut self) -> usize {
        let doomed: Vec<BodyHandle> = self
            .world
            .all_bodies()
            .into_iter()
            .filter(|h| self.world.body(*h).is_some_and(|s| !s.is_static))
            .collect();
        for handle in &doomed {
            self.world.remove(*handle);
        }
        self.bodies.clear();
        if self.pit_open {
            self.restore_ground();
        }
        log::info!("Cleared {} bodies from the pit", doomed.len());
        doomed.len()
    }

    /// Drop the floor and push everything out; the ground returns after the restore delay
    pub fn flush(&mut self, owner: TaskOwner) -> bool {
        if self.pit_open {
            return false;
        }
        self.pit_open = true;
        self.world.remove(self.walls.ground);

        for handle in self.world.all_bodies() {
            if self.world.body(handle).is_some_and(|s| !s.is_static) {
                let vx = (self.rng.random::<f32>() - 0.5) * 5.0;
                self.world.set_sleeping(handle, false);
                self.world.set_velocity(handle, Vec2::new(vx, 15.0));
            }
        }

        let due = self.now_ms + self.config.restore_delay_ms;
        self.scheduler
            .schedule(owner, due, ScheduledAction::RestoreGround);
        log::info!("Pit flushed, ground returns at {:.0}ms", due);
        true
    }

    /// Put the ground back under the pit
    pub fn restore_ground(&mut self) {
        if !self.pit_open {
            return;
        }
        // The old ground was destroyed by the flush
        let (pos, size) = ground_rect(&self.config);
        let ground = self.world.create_rect(pos, size, BodyOptions::wall());
        self.world.insert(ground);
        self.walls.ground = ground;
        self.pit_open = false;
        log::info!("Pit ground restored");
    }

    /// Number of bodies a theme put in the pit (walls excluded)
    pub fn live_bodies(&self) -> usize {
        self.bodies.len()
    }
}
