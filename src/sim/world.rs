//! Physics backend contract
//!
//! The pit never integrates, collides, or detects sleep itself. It drives a
//! backend through this trait and keeps only policy metadata on the side.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Opaque handle to a backend body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyHandle(pub u32);

/// Material options at creation time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyOptions {
    pub restitution: f32,
    pub friction: f32,
    pub density: f32,
    pub is_static: bool,
}

impl Default for BodyOptions {
    fn default() -> Self {
        Self {
            restitution: 0.9,
            friction: 0.001,
            density: 0.001,
            is_static: false,
        }
    }
}

impl BodyOptions {
    /// Immovable wall
    pub fn wall() -> Self {
        Self {
            is_static: true,
            ..Self::default()
        }
    }
}

/// Read-only snapshot of a body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyState {
    pub position: Vec2,
    pub velocity: Vec2,
    pub angle: f32,
    pub is_sleeping: bool,
    pub is_static: bool,
    pub speed: f32,
    /// Circle radius; `None` for rectangles
    pub radius: Option<f32>,
}

/// Two bodies that started touching this step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionPair {
    pub a: BodyHandle,
    pub b: BodyHandle,
}

/// Rigid-body backend operations the pit relies on
pub trait PhysicsWorld {
    /// Create a circle (not yet in the world)
    fn create_circle(&mut self, pos: Vec2, radius: f32, options: BodyOptions) -> BodyHandle;
    /// Create an axis-aligned rectangle of full `size` (not yet in the world)
    fn create_rect(&mut self, pos: Vec2, size: Vec2, options: BodyOptions) -> BodyHandle;

    fn insert(&mut self, body: BodyHandle);
    /// Remove and destroy a body; returns false if it was not in the world
    fn remove(&mut self, body: BodyHandle) -> bool;
    /// Bodies currently in the world, ascending by handle
    fn all_bodies(&self) -> Vec<BodyHandle>;
    /// Snapshot of a body in the world
    fn body(&self, body: BodyHandle) -> Option<BodyState>;

    fn set_position(&mut self, body: BodyHandle, pos: Vec2);
    fn set_velocity(&mut self, body: BodyHandle, vel: Vec2);
    fn apply_force(&mut self, body: BodyHandle, point: Vec2, force: Vec2);
    fn set_sleeping(&mut self, body: BodyHandle, sleeping: bool);

    /// Advance the simulation; returns pairs whose contact began this step
    fn step(&mut self, dt_ms: f64) -> Vec<CollisionPair>;
}
