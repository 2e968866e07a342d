//! Headless reference backend
//!
//! Just enough physics to drive the pit without a real engine: gravity,
//! contact against static rectangles, rough circle-circle contact between
//! dynamic bodies, and sleep detection. Velocities are in pixels per step
//! and forces follow the `force / mass * dt^2` convention.

use std::collections::{BTreeMap, BTreeSet};

use glam::Vec2;

use super::world::{BodyHandle, BodyOptions, BodyState, CollisionPair, PhysicsWorld};

/// Gravity acceleration scale (per ms^2)
const GRAVITY_SCALE: f32 = 0.001;
/// Velocity retained each step
const AIR_DAMPING: f32 = 0.99;
/// Normal speeds below this do not bounce
const REST_SPEED: f32 = 2.0;
/// Squared speed under which a body counts as still
const SLEEP_MOTION: f32 = 0.08;
/// Consecutive still steps before a body sleeps
const SLEEP_STEPS: u32 = 60;
/// Speed a contact must exceed to wake a sleeping body
const WAKE_SPEED: f32 = 1.0;

#[derive(Debug, Clone, Copy)]
enum Shape {
    Circle(f32),
    Rect(Vec2),
}

impl Shape {
    fn half_extents(&self) -> Vec2 {
        match *self {
            Shape::Circle(r) => Vec2::splat(r),
            Shape::Rect(half) => half,
        }
    }

    fn bounding_radius(&self) -> f32 {
        match *self {
            Shape::Circle(r) => r,
            Shape::Rect(half) => half.x.max(half.y),
        }
    }
}

#[derive(Debug, Clone)]
struct SandboxBody {
    shape: Shape,
    pos: Vec2,
    vel: Vec2,
    force: Vec2,
    mass: f32,
    options: BodyOptions,
    sleeping: bool,
    still_steps: u32,
    in_world: bool,
}

impl SandboxBody {
    fn is_dynamic(&self) -> bool {
        self.in_world && !self.options.is_static
    }

    fn wake(&mut self) {
        self.sleeping = false;
        self.still_steps = 0;
    }
}

/// Minimal physics world for headless runs and tests
#[derive(Debug, Clone)]
pub struct SandboxWorld {
    bodies: BTreeMap<u32, SandboxBody>,
    next_id: u32,
    gravity: Vec2,
    /// Pairs touching at the end of the previous step
    contacts: BTreeSet<(u32, u32)>,
}

impl Default for SandboxWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl SandboxWorld {
    pub fn new() -> Self {
        Self {
            bodies: BTreeMap::new(),
            next_id: 1,
            gravity: Vec2::new(0.0, 1.0),
            contacts: BTreeSet::new(),
        }
    }

    /// World without gravity (bodies only move when pushed)
    pub fn weightless() -> Self {
        Self {
            gravity: Vec2::ZERO,
            ..Self::new()
        }
    }

    /// Number of bodies in the world
    pub fn len(&self) -> usize {
        self.bodies.values().filter(|b| b.in_world).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Accumulated, not yet integrated force on a body
    pub fn pending_force(&self, body: BodyHandle) -> Option<Vec2> {
        self.bodies.get(&body.0).map(|b| b.force)
    }

    fn create(&mut self, shape: Shape, pos: Vec2, options: BodyOptions) -> BodyHandle {
        let id = self.next_id;
        self.next_id += 1;
        let area = match shape {
            Shape::Circle(r) => std::f32::consts::PI * r * r,
            Shape::Rect(half) => 4.0 * half.x * half.y,
        };
        self.bodies.insert(
            id,
            SandboxBody {
                shape,
                pos,
                vel: Vec2::ZERO,
                force: Vec2::ZERO,
                mass: (area * options.density).max(1e-4),
                options,
                sleeping: false,
                still_steps: 0,
                in_world: false,
            },
        );
        BodyHandle(id)
    }

    fn integrate(&mut self, dt: f32) {
        let gravity = self.gravity * GRAVITY_SCALE * dt * dt;
        for body in self.bodies.values_mut() {
            if !body.is_dynamic() || body.sleeping {
                body.force = Vec2::ZERO;
                continue;
            }
            body.vel = body.vel * AIR_DAMPING + gravity + body.force / body.mass * dt * dt;
            body.pos += body.vel;
            body.force = Vec2::ZERO;
        }
    }

    /// Push dynamic bodies out of static rectangles
    fn resolve_static(&mut self, touching: &mut BTreeSet<(u32, u32)>) {
        let walls: Vec<(u32, Vec2, Vec2)> = self
            .bodies
            .iter()
            .filter(|(_, b)| b.in_world && b.options.is_static)
            .map(|(id, b)| (*id, b.pos, b.shape.half_extents()))
            .collect();

        for (&id, body) in self.bodies.iter_mut() {
            if !body.is_dynamic() || body.sleeping {
                continue;
            }
            let half = body.shape.half_extents();
            for &(wall_id, wall_pos, wall_half) in &walls {
                let delta = body.pos - wall_pos;
                let overlap = half + wall_half - delta.abs();
                if overlap.x <= 0.0 || overlap.y <= 0.0 {
                    continue;
                }
                let normal = if overlap.x < overlap.y {
                    Vec2::new(delta.x.signum(), 0.0)
                } else {
                    Vec2::new(0.0, delta.y.signum())
                };
                body.pos += normal * overlap.min_element();

                let vn = body.vel.dot(normal);
                if vn < 0.0 {
                    let tangent = body.vel - normal * vn;
                    let bounce = if -vn < REST_SPEED {
                        0.0
                    } else {
                        -vn * body.options.restitution
                    };
                    body.vel = tangent * (1.0 - body.options.friction) + normal * bounce;
                }
                touching.insert((id.min(wall_id), id.max(wall_id)));
            }
        }
    }

    /// Rough circle-circle contact between dynamic bodies
    fn resolve_dynamic(&mut self, touching: &mut BTreeSet<(u32, u32)>) {
        let ids: Vec<u32> = self
            .bodies
            .iter()
            .filter(|(_, b)| b.is_dynamic())
            .map(|(id, _)| *id)
            .collect();

        for (i, &a) in ids.iter().enumerate() {
            for &b in &ids[i + 1..] {
                let (Some(ba), Some(bb)) = (self.bodies.get(&a), self.bodies.get(&b)) else {
                    continue;
                };
                if ba.sleeping && bb.sleeping {
                    continue;
                }
                let delta = bb.pos - ba.pos;
                let dist = delta.length();
                let reach = ba.shape.bounding_radius() + bb.shape.bounding_radius();
                if dist >= reach {
                    continue;
                }
                let normal = if dist > 1e-4 { delta / dist } else { Vec2::Y };
                let push = (reach - dist) * 0.5;
                let rel = (bb.vel - ba.vel).dot(normal);
                let (ma, mb) = (ba.mass, bb.mass);
                let restitution = ba.options.restitution.min(bb.options.restitution);
                let wake_a = bb.vel.length() > WAKE_SPEED;
                let wake_b = ba.vel.length() > WAKE_SPEED;

                let impulse = if rel < 0.0 {
                    -(1.0 + restitution) * rel / (1.0 / ma + 1.0 / mb)
                } else {
                    0.0
                };

                if let Some(body) = self.bodies.get_mut(&a) {
                    if wake_a {
                        body.wake();
                    }
                    if !body.sleeping {
                        body.pos -= normal * push;
                        body.vel -= normal * impulse / ma;
                    }
                }
                if let Some(body) = self.bodies.get_mut(&b) {
                    if wake_b {
                        body.wake();
                    }
                    if !body.sleeping {
                        body.pos += normal * push;
                        body.vel += normal * impulse / mb;
                    }
                }
                touching.insert((a, b));
            }
        }
    }

    fn update_sleep(&mut self) {
        for body in self.bodies.values_mut() {
            if !body.is_dynamic() || body.sleeping {
                continue;
            }
            if body.vel.length_squared() < SLEEP_MOTION {
                body.still_steps += 1;
                if body.still_steps >= SLEEP_STEPS {
                    body.sleeping = true;
                    body.vel = Vec2::ZERO;
                }
            } else {
                body.still_steps = 0;
            }
        }
    }
}

impl PhysicsWorld for SandboxWorld {
    fn create_circle(&mut self, pos: Vec2, radius: f32, options: BodyOptions) -> BodyHandle {
        self.create(Shape::Circle(radius.max(0.0)), pos, options)
    }

    fn create_rect(&mut self, pos: Vec2, size: Vec2, options: BodyOptions) -> BodyHandle {
        self.create(Shape::Rect((size * 0.5).max(Vec2::ZERO)), pos, options)
    }

    fn insert(&mut self, body: BodyHandle) {
        if let Some(b) = self.bodies.get_mut(&body.0) {
            b.in_world = true;
        }
    }

    fn remove(&mut self, body: BodyHandle) -> bool {
        if !self.bodies.get(&body.0).is_some_and(|b| b.in_world) {
            return false;
        }
        self.bodies.remove(&body.0);
        self.contacts.retain(|&(x, y)| x != body.0 && y != body.0);
        true
    }

    fn all_bodies(&self) -> Vec<BodyHandle> {
        self.bodies
            .iter()
            .filter(|(_, b)| b.in_world)
            .map(|(id, _)| BodyHandle(*id))
            .collect()
    }

    fn body(&self, body: BodyHandle) -> Option<BodyState> {
        let b = self.bodies.get(&body.0).filter(|b| b.in_world)?;
        Some(BodyState {
            position: b.pos,
            velocity: b.vel,
            angle: 0.0,
            is_sleeping: b.sleeping,
            is_static: b.options.is_static,
            speed: b.vel.length(),
            radius: match b.shape {
                Shape::Circle(r) => Some(r),
                Shape::Rect(_) => None,
            },
        })
    }

    fn set_position(&mut self, body: BodyHandle, pos: Vec2) {
        if let Some(b) = self.bodies.get_mut(&body.0) {
            b.pos = pos;
        }
    }

    fn set_velocity(&mut self, body: BodyHandle, vel: Vec2) {
        if let Some(b) = self.bodies.get_mut(&body.0) {
            b.vel = vel;
        }
    }

    fn apply_force(&mut self, body: BodyHandle, _point: Vec2, force: Vec2) {
        if let Some(b) = self.bodies.get_mut(&body.0) {
            b.force += force;
        }
    }

    fn set_sleeping(&mut self, body: BodyHandle, sleeping: bool) {
        if let Some(b) = self.bodies.get_mut(&body.0) {
            if sleeping {
                b.sleeping = true;
                b.vel = Vec2::ZERO;
            } else {
                b.wake();
            }
        }
    }

    fn step(&mut self, dt_ms: f64) -> Vec<CollisionPair> {
        let dt = dt_ms as f32;
        self.integrate(dt);

        let mut touching = BTreeSet::new();
        self.resolve_static(&mut touching);
        self.resolve_dynamic(&mut touching);
        self.update_sleep();

        let started = touching
            .difference(&self.contacts)
            .map(|&(a, b)| CollisionPair {
                a: BodyHandle(a),
                b: BodyHandle(b),
            })
            .collect();
        // Sleeping bodies skip resolution, so keep their old contacts alive
        let sleeping: BTreeSet<u32> = self
            .bodies
            .iter()
            .filter(|(_, b)| b.sleeping)
            .map(|(id, _)| *id)
            .collect();
        let kept: Vec<(u32, u32)> = self
            .contacts
            .iter()
            .filter(|(a, b)| sleeping.contains(a) || sleeping.contains(b))
            .copied()
            .collect();
        touching.extend(kept);
        self.contacts = touching;
        started
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::TICK_MS;

    fn world_with_floor() -> (SandboxWorld, BodyHandle) {
        let mut world = SandboxWorld::new();
        let floor = world.create_rect(
            Vec2::new(500.0, 1100.0),
            Vec2::new(1000.0, 200.0),
            BodyOptions::wall(),
        );
        world.insert(floor);
        (world, floor)
    }

    #[test]
    fn test_create_then_insert() {
        let mut world = SandboxWorld::new();
        let h = world.create_circle(Vec2::ZERO, 10.0, BodyOptions::default());
        assert!(world.body(h).is_none());
        world.insert(h);
        assert_eq!(world.all_bodies(), vec![h]);
        assert!(world.remove(h));
        assert!(!world.remove(h));
        assert!(world.is_empty());
        // Removed bodies are gone for good
        world.insert(h);
        assert!(world.body(h).is_none());
    }

    #[test]
    fn test_removed_bodies_free_storage() {
        let (mut world, floor) = world_with_floor();
        for i in 0..1000 {
            let h = world.create_circle(Vec2::new(i as f32, 0.0), 10.0, BodyOptions::default());
            world.insert(h);
            world.step(TICK_MS);
            assert!(world.remove(h));
        }
        assert_eq!(world.len(), 1);
        assert_eq!(world.bodies.len(), world.len());
        assert_eq!(world.all_bodies(), vec![floor]);
    }

    #[test]
    fn test_body_falls_lands_and_sleeps() {
        let (mut world, floor) = world_with_floor();
        let ball = world.create_circle(Vec2::new(500.0, 900.0), 20.0, BodyOptions::default());
        world.insert(ball);

        let mut hit_floor = false;
        for _ in 0..2000 {
            for pair in world.step(TICK_MS) {
                if pair.a == floor || pair.b == floor {
                    hit_floor = true;
                }
            }
        }
        let state = world.body(ball).unwrap();
        assert!(hit_floor);
        assert!(state.is_sleeping);
        // Resting on top of the floor (floor top is y = 1000)
        assert!((state.position.y - 980.0).abs() < 1.0);
    }

    #[test]
    fn test_force_and_wake() {
        let mut world = SandboxWorld::weightless();
        let ball = world.create_circle(Vec2::ZERO, 10.0, BodyOptions::default());
        world.insert(ball);
        world.set_sleeping(ball, true);
        assert!(world.body(ball).unwrap().is_sleeping);

        world.set_sleeping(ball, false);
        world.apply_force(ball, Vec2::ZERO, Vec2::new(0.01, 0.0));
        world.step(TICK_MS);
        let state = world.body(ball).unwrap();
        assert!(state.velocity.x > 0.0);
        assert!(state.position.x > 0.0);
        assert_eq!(world.pending_force(ball), Some(Vec2::ZERO));
    }
}
