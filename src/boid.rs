/*
 * Boid Module
 *
 * This module defines the Boid struct and its behavior.
 * Each boid follows three main rules:
 * 1. Separation: Avoid crowding neighbors
 * 2. Alignment: Steer towards the average heading of neighbors
 * 3. Cohesion: Steer towards the average position of neighbors
 *
 * On top of those, a boid can flee from predators, steer around obstacles,
 * avoid the predator's fear trail, panic after witnessing a kill, carry
 * per-agent genes for evolution mode and record a short trail of its
 * recent positions.
 */

use nannou::prelude::Vec2;
use rand::Rng;
use std::collections::VecDeque;
use std::f32::consts::{PI, TAU};

use crate::obstacle::Obstacle;
use crate::params::{BoundaryMode, SimulationParams};
use crate::vecmath::{angle_between, is_valid_extent, limit, normalize_or_zero, set_mag};

pub const MAX_FORCE: f32 = 0.2;
// 60 degree half-angle, 120 degrees total
pub const PERCEPTION_CONE_ANGLE: f32 = PI / 3.0;
// Separation only reacts to neighbors closer than this fraction of the radius
pub const SEPARATION_FRACTION: f32 = 0.4;
pub const TRAIL_LIFETIME_MS: f64 = 1000.0;
pub const TRAIL_RECORD_INTERVAL_MS: f64 = 50.0;
pub const BASELINE_FITNESS: f32 = 50.0;
pub const PANIC_DURATION_MS: f32 = 2000.0;
pub const PANIC_SPEED_BOOST: f32 = 1.5;
pub const BOUNCE_MARGIN: f32 = 5.0;

// Stable handle that survives removals and reordering of the flock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Species {
    Blue,
    Red,
}

// Heritable traits used in evolution mode
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Genes {
    pub separation: f32,
    pub alignment: f32,
    pub cohesion: f32,
    pub max_speed: f32,
    pub perception_radius: f32,
}

impl Genes {
    pub fn from_params(params: &SimulationParams) -> Self {
        Self {
            separation: params.separation_weight,
            alignment: params.alignment_weight,
            cohesion: params.cohesion_weight,
            max_speed: params.max_speed,
            perception_radius: params.perception_radius,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights {
    pub separation: f32,
    pub alignment: f32,
    pub cohesion: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailPoint {
    pub position: Vec2,
    pub time_ms: f64,
}

// A neighbor as seen from the boid doing the steering. `offset` points from
// the boid to the neighbor (minimum-image in a wrapped world).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub offset: Vec2,
    pub velocity: Vec2,
    pub species: Species,
}

// Whether a neighbor at `offset` lies inside the forward perception cone
#[inline]
pub fn in_perception_cone(velocity: Vec2, offset: Vec2) -> bool {
    angle_between(velocity, offset) < PERCEPTION_CONE_ANGLE
}

#[derive(Debug, Clone)]
pub struct Boid {
    pub id: AgentId,
    pub position: Vec2,
    pub velocity: Vec2,
    pub acceleration: Vec2,
    pub species: Species,
    pub genes: Genes,
    pub fitness: f32,
    // Remaining panic time in milliseconds
    pub panic_timer: f32,
    pub trail: VecDeque<TrailPoint>,
    last_trail_time: f64,
    pub neighbor_count: usize,
}

impl Boid {
    pub fn new<R: Rng + ?Sized>(
        id: AgentId,
        position: Vec2,
        species: Species,
        params: &SimulationParams,
        rng: &mut R,
    ) -> Self {
        let max_speed = params.max_speed;
        let speed = if max_speed.is_finite() && max_speed > 0.0 {
            rng.gen_range(max_speed.min(1.0)..=max_speed)
        } else {
            0.0
        };
        Self {
            id,
            position,
            velocity: random_direction(rng) * speed,
            acceleration: Vec2::ZERO,
            species,
            genes: Genes::from_params(params),
            fitness: BASELINE_FITNESS,
            panic_timer: 0.0,
            trail: VecDeque::new(),
            last_trail_time: f64::NEG_INFINITY,
            neighbor_count: 0,
        }
    }

    // Apply a force to the boid
    #[inline]
    pub fn apply_force(&mut self, force: Vec2) {
        self.acceleration += force;
    }

    pub fn heading(&self) -> f32 {
        self.velocity.y.atan2(self.velocity.x)
    }

    pub fn is_panicking(&self) -> bool {
        self.panic_timer > 0.0
    }

    pub fn panic(&mut self) {
        self.panic_timer = PANIC_DURATION_MS;
    }

    pub fn decay_panic(&mut self, elapsed_ms: f32) {
        if self.panic_timer > 0.0 {
            self.panic_timer = (self.panic_timer - elapsed_ms).max(0.0);
        }
    }

    // Max speed after the panic boost
    pub fn effective_max_speed(&self, base_max_speed: f32) -> f32 {
        if self.is_panicking() {
            base_max_speed * PANIC_SPEED_BOOST
        } else {
            base_max_speed
        }
    }

    // Separation: steer away from neighbors closer than `desired_separation`
    pub fn separation(&self, neighbors: &[Neighbor], desired_separation: f32, max_speed: f32) -> Vec2 {
        let mut steering = Vec2::ZERO;
        let mut count = 0;

        for neighbor in neighbors {
            let d = neighbor.offset.length();
            // Coincident neighbors have no direction to flee in
            if d > 0.0 && d < desired_separation {
                // Weight by distance (closer = stronger)
                steering += (-neighbor.offset / d) / d;
                count += 1;
            }
        }

        if count == 0 {
            return Vec2::ZERO;
        }
        steering /= count as f32;
        if steering.length_squared() == 0.0 {
            // Perfectly balanced neighbors cancel out
            return Vec2::ZERO;
        }
        limit(set_mag(steering, max_speed) - self.velocity, MAX_FORCE)
    }

    // Alignment: steer toward the average heading of neighbors
    pub fn alignment(&self, neighbors: &[Neighbor], max_speed: f32) -> Vec2 {
        if neighbors.is_empty() {
            return Vec2::ZERO;
        }
        let mut average = Vec2::ZERO;
        for neighbor in neighbors {
            average += neighbor.velocity;
        }
        average /= neighbors.len() as f32;
        limit(set_mag(average, max_speed) - self.velocity, MAX_FORCE)
    }

    // Cohesion: steer toward the average position of neighbors
    pub fn cohesion(&self, neighbors: &[Neighbor], max_speed: f32) -> Vec2 {
        if neighbors.is_empty() {
            return Vec2::ZERO;
        }
        let mut center_offset = Vec2::ZERO;
        for neighbor in neighbors {
            center_offset += neighbor.offset;
        }
        center_offset /= neighbors.len() as f32;
        self.seek(self.position + center_offset, max_speed)
    }

    // Seek: steer toward a target position
    pub fn seek(&self, target: Vec2, max_speed: f32) -> Vec2 {
        let desired = set_mag(target - self.position, max_speed);
        limit(desired - self.velocity, MAX_FORCE)
    }

    // Combined, weighted flocking force. With species partitioning, other
    // species only contribute a doubled separation.
    pub fn flocking_force(
        &self,
        neighbors: &[Neighbor],
        weights: Weights,
        perception_radius: f32,
        max_speed: f32,
        partition_species: bool,
    ) -> Vec2 {
        let desired_separation = perception_radius * SEPARATION_FRACTION;

        let (same, other): (Vec<Neighbor>, Vec<Neighbor>) = if partition_species {
            neighbors.iter().partition(|n| n.species == self.species)
        } else {
            (neighbors.to_vec(), Vec::new())
        };

        let mut force = self.separation(&same, desired_separation, max_speed) * weights.separation
            + self.alignment(&same, max_speed) * weights.alignment
            + self.cohesion(&same, max_speed) * weights.cohesion;

        if !other.is_empty() {
            force += self.separation(&other, desired_separation, max_speed) * (weights.separation * 2.0);
        }
        force
    }

    // Flee from a threat inside `radius`: desired velocity points away at
    // boosted speed, with three times the usual force budget
    pub fn flee_force(&self, threat: Vec2, radius: f32, max_speed: f32) -> Vec2 {
        let away = self.position - threat;
        if away.length() >= radius {
            return Vec2::ZERO;
        }
        let desired = set_mag(away, max_speed * PANIC_SPEED_BOOST);
        limit(desired - self.velocity, MAX_FORCE * 3.0)
    }

    // Repulsion from every obstacle within its radius plus the perception radius
    pub fn avoid_obstacles(&self, obstacles: &[Obstacle], perception_radius: f32, separation_weight: f32) -> Vec2 {
        let mut steering = Vec2::ZERO;
        for obstacle in obstacles {
            let away = self.position - obstacle.position;
            let d = away.length();
            if d < obstacle.radius + perception_radius {
                let push = normalize_or_zero(away) / (d - obstacle.radius).max(1.0);
                steering += push * (separation_weight * obstacle.kind.avoidance_multiplier());
            }
        }
        limit(steering, MAX_FORCE * 3.0)
    }

    // Mild repulsion from each point closer than `radius`
    pub fn avoid_points<I>(&self, points: I, radius: f32) -> Vec2
    where
        I: IntoIterator<Item = Vec2>,
    {
        let mut steering = Vec2::ZERO;
        for point in points {
            let away = self.position - point;
            if away.length() < radius {
                steering += normalize_or_zero(away) * (MAX_FORCE * 0.5);
            }
        }
        steering
    }

    // Update the boid's position based on its velocity and acceleration
    pub fn update(&mut self, base_max_speed: f32) {
        self.velocity += self.acceleration;

        // Limit speed
        self.velocity = limit(self.velocity, self.effective_max_speed(base_max_speed));

        self.position += self.velocity;

        // Reset acceleration
        self.acceleration = Vec2::ZERO;
    }

    // Wrap around or bounce off the world edges
    pub fn edges(&mut self, mode: BoundaryMode, width: f32, height: f32) {
        match mode {
            BoundaryMode::Wrap => {
                if self.position.x > width {
                    self.position.x = 0.0;
                } else if self.position.x < 0.0 {
                    self.position.x = width;
                }
                if self.position.y > height {
                    self.position.y = 0.0;
                } else if self.position.y < 0.0 {
                    self.position.y = height;
                }
            }
            BoundaryMode::Bounce => {
                if self.position.x < BOUNCE_MARGIN {
                    self.position.x = BOUNCE_MARGIN;
                    self.velocity.x = -self.velocity.x;
                } else if self.position.x > width - BOUNCE_MARGIN {
                    self.position.x = width - BOUNCE_MARGIN;
                    self.velocity.x = -self.velocity.x;
                }
                if self.position.y < BOUNCE_MARGIN {
                    self.position.y = BOUNCE_MARGIN;
                    self.velocity.y = -self.velocity.y;
                } else if self.position.y > height - BOUNCE_MARGIN {
                    self.position.y = height - BOUNCE_MARGIN;
                    self.velocity.y = -self.velocity.y;
                }
            }
        }
    }

    // Sample the trail at a fixed interval and expire old samples
    pub fn record_trail(&mut self, now_ms: f64, enabled: bool) {
        if !enabled {
            self.trail.clear();
            return;
        }
        if now_ms - self.last_trail_time > TRAIL_RECORD_INTERVAL_MS {
            self.trail.push_back(TrailPoint {
                position: self.position,
                time_ms: now_ms,
            });
            self.last_trail_time = now_ms;
        }
        while let Some(oldest) = self.trail.front() {
            if now_ms - oldest.time_ms > TRAIL_LIFETIME_MS {
                self.trail.pop_front();
            } else {
                break;
            }
        }
    }

    // Put the boid back in the world as a fresh offspring
    pub fn respawn_at<R: Rng + ?Sized>(&mut self, position: Vec2, rng: &mut R) {
        self.position = position;
        self.velocity = random_direction(rng) * 2.0;
        self.acceleration = Vec2::ZERO;
        self.fitness = BASELINE_FITNESS;
        self.panic_timer = 0.0;
        self.trail.clear();
    }
}

// Uniform position in a width x height world. A degenerate extent pins that
// axis to zero instead of sampling an empty range.
pub fn random_position<R: Rng + ?Sized>(rng: &mut R, width: f32, height: f32) -> Vec2 {
    let mut axis = |extent: f32| {
        if is_valid_extent(extent) {
            rng.gen_range(0.0..extent)
        } else {
            0.0
        }
    };
    let x = axis(width);
    let y = axis(height);
    Vec2::new(x, y)
}

// Random unit vector
pub fn random_direction<R: Rng + ?Sized>(rng: &mut R) -> Vec2 {
    let angle: f32 = rng.gen_range(0.0..TAU);
    Vec2::new(angle.cos(), angle.sin())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obstacle::{ObstacleId, ObstacleKind};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn boid_at(x: f32, y: f32, velocity: Vec2) -> Boid {
        let mut rng = StdRng::seed_from_u64(7);
        let mut boid = Boid::new(AgentId(0), Vec2::new(x, y), Species::Blue, &SimulationParams::default(), &mut rng);
        boid.velocity = velocity;
        boid
    }

    fn neighbor(dx: f32, dy: f32) -> Neighbor {
        Neighbor {
            offset: Vec2::new(dx, dy),
            velocity: Vec2::new(1.0, 0.0),
            species: Species::Blue,
        }
    }

    #[test]
    fn no_neighbors_means_no_steering() {
        let boid = boid_at(100.0, 100.0, Vec2::new(2.0, 1.0));
        assert_eq!(boid.separation(&[], 32.0, 4.0), Vec2::ZERO);
        assert_eq!(boid.alignment(&[], 4.0), Vec2::ZERO);
        assert_eq!(boid.cohesion(&[], 4.0), Vec2::ZERO);
        let weights = Weights { separation: 1.5, alignment: 1.0, cohesion: 1.0 };
        assert_eq!(boid.flocking_force(&[], weights, 80.0, 4.0, true), Vec2::ZERO);
    }

    #[test]
    fn coincident_neighbor_is_ignored_by_separation() {
        let boid = boid_at(100.0, 100.0, Vec2::new(1.0, 0.0));
        assert_eq!(boid.separation(&[neighbor(0.0, 0.0)], 32.0, 4.0), Vec2::ZERO);
    }

    #[test]
    fn symmetric_neighbors_cancel_separation() {
        let boid = boid_at(100.0, 100.0, Vec2::ZERO);
        let d = 31.9;
        let ring = [neighbor(d, 0.0), neighbor(-d, 0.0), neighbor(0.0, d), neighbor(0.0, -d)];
        assert!(boid.separation(&ring, 32.0, 4.0).length() < 1e-5);
    }

    #[test]
    fn separation_points_away_and_is_bounded() {
        let boid = boid_at(100.0, 100.0, Vec2::ZERO);
        let force = boid.separation(&[neighbor(5.0, 0.0)], 32.0, 4.0);
        assert!(force.x < 0.0);
        assert!(force.length() <= MAX_FORCE + 1e-6);
    }

    #[test]
    fn other_species_only_repels() {
        let boid = boid_at(100.0, 100.0, Vec2::ZERO);
        let mut red = neighbor(10.0, 0.0);
        red.species = Species::Red;
        let weights = Weights { separation: 1.0, alignment: 1.0, cohesion: 1.0 };
        let force = boid.flocking_force(&[red], weights, 80.0, 4.0, true);
        // Cohesion would pull toward +x; doubled separation pushes to -x
        assert!(force.x < 0.0);
        assert!((force.length() - 2.0 * MAX_FORCE).abs() < 1e-5);
    }

    #[test]
    fn perception_cone_is_sixty_degrees_each_side() {
        let forward = Vec2::new(1.0, 0.0);
        assert!(in_perception_cone(forward, Vec2::new(10.0, 5.0)));
        assert!(!in_perception_cone(forward, Vec2::new(-10.0, 0.0)));
        assert!(!in_perception_cone(forward, Vec2::new(1.0, 10.0)));
    }

    #[test]
    fn update_clamps_speed_and_resets_acceleration() {
        let mut boid = boid_at(100.0, 100.0, Vec2::new(3.0, 0.0));
        boid.apply_force(Vec2::new(10.0, 10.0));
        boid.update(4.0);
        assert!(boid.velocity.length() <= 4.0 + 1e-5);
        assert_eq!(boid.acceleration, Vec2::ZERO);

        boid.panic();
        boid.apply_force(Vec2::new(10.0, 10.0));
        boid.update(4.0);
        assert!(boid.velocity.length() > 4.0);
        assert!(boid.velocity.length() <= 6.0 + 1e-5);
    }

    #[test]
    fn panic_decays_to_zero() {
        let mut boid = boid_at(0.0, 0.0, Vec2::ZERO);
        boid.panic();
        boid.decay_panic(1500.0);
        assert!(boid.is_panicking());
        boid.decay_panic(1500.0);
        assert!(!boid.is_panicking());
        assert_eq!(boid.panic_timer, 0.0);
    }

    #[test]
    fn wrap_and_bounce_edges() {
        let mut boid = boid_at(801.0, -1.0, Vec2::new(1.0, -1.0));
        boid.edges(BoundaryMode::Wrap, 800.0, 600.0);
        assert_eq!(boid.position, Vec2::new(0.0, 600.0));

        let mut boid = boid_at(2.0, 599.0, Vec2::new(-1.0, 1.0));
        boid.edges(BoundaryMode::Bounce, 800.0, 600.0);
        assert_eq!(boid.position, Vec2::new(BOUNCE_MARGIN, 600.0 - BOUNCE_MARGIN));
        assert_eq!(boid.velocity, Vec2::new(1.0, -1.0));
    }

    #[test]
    fn flee_only_inside_radius() {
        let boid = boid_at(100.0, 100.0, Vec2::ZERO);
        assert_eq!(boid.flee_force(Vec2::new(400.0, 100.0), 150.0, 4.0), Vec2::ZERO);
        let force = boid.flee_force(Vec2::new(120.0, 100.0), 150.0, 4.0);
        assert!(force.x < 0.0);
        assert!((force.length() - MAX_FORCE * 3.0).abs() < 1e-5);
    }

    #[test]
    fn repel_obstacles_push_harder() {
        let mut rng = StdRng::seed_from_u64(3);
        let boid = boid_at(100.0, 100.0, Vec2::ZERO);
        let still = [Obstacle::new(ObstacleId(0), Vec2::new(130.0, 100.0), 20.0, ObstacleKind::Static, &mut rng)];
        let repel = [Obstacle::new(ObstacleId(1), Vec2::new(130.0, 100.0), 20.0, ObstacleKind::Repel, &mut rng)];
        let soft = boid.avoid_obstacles(&still, 80.0, 0.01);
        let hard = boid.avoid_obstacles(&repel, 80.0, 0.01);
        assert!(soft.x < 0.0);
        assert!(hard.x < soft.x);
    }

    #[test]
    fn trail_samples_at_interval_and_expires() {
        let mut boid = boid_at(0.0, 0.0, Vec2::ZERO);
        boid.record_trail(0.0, true);
        boid.record_trail(20.0, true);
        assert_eq!(boid.trail.len(), 1);
        boid.record_trail(60.0, true);
        assert_eq!(boid.trail.len(), 2);
        boid.record_trail(1030.0, true);
        assert_eq!(boid.trail.front().map(|p| p.time_ms), Some(60.0));
        boid.record_trail(1100.0, false);
        assert!(boid.trail.is_empty());
    }
}
