/*
 * Obstacle Module
 *
 * Obstacles are circles placed by the user in painter mode (or generated as
 * a maze). Boids steer around every obstacle; repelling obstacles push
 * twice as hard and drifting obstacles wander and bounce off the edges.
 */

use nannou::prelude::Vec2;
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObstacleId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObstacleKind {
    Static,
    Drift,
    Repel,
}

impl ObstacleKind {
    pub const ALL: [ObstacleKind; 3] = [ObstacleKind::Static, ObstacleKind::Drift, ObstacleKind::Repel];

    pub fn label(self) -> &'static str {
        match self {
            ObstacleKind::Static => "Static",
            ObstacleKind::Drift => "Drift",
            ObstacleKind::Repel => "Repel",
        }
    }

    // Multiplier applied on top of the separation weight when avoiding
    pub fn avoidance_multiplier(self) -> f32 {
        match self {
            ObstacleKind::Repel => 4.0,
            ObstacleKind::Static | ObstacleKind::Drift => 2.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Obstacle {
    pub id: ObstacleId,
    pub position: Vec2,
    pub radius: f32,
    pub kind: ObstacleKind,
    pub velocity: Vec2,
}

impl Obstacle {
    pub fn new<R: Rng + ?Sized>(id: ObstacleId, position: Vec2, radius: f32, kind: ObstacleKind, rng: &mut R) -> Self {
        let velocity = match kind {
            ObstacleKind::Drift => Vec2::new(rng.gen_range(-0.5..0.5), rng.gen_range(-0.5..0.5)),
            ObstacleKind::Static | ObstacleKind::Repel => Vec2::ZERO,
        };
        Self {
            id,
            position,
            radius,
            kind,
            velocity,
        }
    }

    pub fn contains(&self, point: Vec2) -> bool {
        self.position.distance(point) < self.radius
    }

    // Move a drifting obstacle one tick, bouncing off the world edges
    pub fn drift(&mut self, width: f32, height: f32) {
        if self.kind != ObstacleKind::Drift {
            return;
        }
        self.position += self.velocity;

        if self.position.x < self.radius || self.position.x > width - self.radius {
            self.velocity.x = -self.velocity.x;
        }
        if self.position.y < self.radius || self.position.y > height - self.radius {
            self.velocity.y = -self.velocity.y;
        }
        // max/min rather than clamp: an obstacle wider than the world must not panic
        self.position.x = self.position.x.max(self.radius).min(width - self.radius);
        self.position.y = self.position.y.max(self.radius).min(height - self.radius);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn only_drift_obstacles_move() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut still = Obstacle::new(ObstacleId(0), Vec2::new(100.0, 100.0), 20.0, ObstacleKind::Repel, &mut rng);
        still.drift(800.0, 600.0);
        assert_eq!(still.position, Vec2::new(100.0, 100.0));
        assert_eq!(still.velocity, Vec2::ZERO);
    }

    #[test]
    fn drift_bounces_off_edges() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut obstacle = Obstacle::new(ObstacleId(0), Vec2::new(21.0, 300.0), 20.0, ObstacleKind::Drift, &mut rng);
        obstacle.velocity = Vec2::new(-2.0, 0.0);
        obstacle.drift(800.0, 600.0);
        assert_eq!(obstacle.position.x, 20.0);
        assert_eq!(obstacle.velocity.x, 2.0);
    }
}
