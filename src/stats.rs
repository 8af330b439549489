/*
 * Statistics Module
 *
 * Aggregate flock metrics computed every tick, plus a throttled history
 * suitable for drawing a live chart.
 */

use nannou::prelude::Vec2;
use std::collections::VecDeque;

use crate::boid::Boid;

pub const STATS_SAMPLE_INTERVAL_MS: f64 = 500.0;
// About a minute of history at two samples per second
pub const STATS_HISTORY_LEN: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FlockStats {
    pub population: usize,
    pub mean_speed: f32,
    pub mean_neighbors: f32,
    // Mean distance of agents to the flock centroid
    pub compactness: f32,
}

impl FlockStats {
    pub fn from_boids(boids: &[Boid]) -> Self {
        if boids.is_empty() {
            return Self::default();
        }
        let n = boids.len() as f32;
        let mut total_speed = 0.0;
        let mut total_neighbors = 0usize;
        let mut centroid = Vec2::ZERO;
        for boid in boids {
            total_speed += boid.velocity.length();
            total_neighbors += boid.neighbor_count;
            centroid += boid.position;
        }
        centroid /= n;
        let spread: f32 = boids.iter().map(|boid| boid.position.distance(centroid)).sum();

        Self {
            population: boids.len(),
            mean_speed: total_speed / n,
            mean_neighbors: total_neighbors as f32 / n,
            compactness: spread / n,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StatsHistory {
    samples: VecDeque<FlockStats>,
    last_sample_ms: Option<f64>,
}

impl StatsHistory {
    // Record `stats` if at least the sample interval has elapsed
    pub fn observe(&mut self, stats: FlockStats, now_ms: f64) -> bool {
        if let Some(last) = self.last_sample_ms {
            if now_ms - last <= STATS_SAMPLE_INTERVAL_MS {
                return false;
            }
        }
        self.last_sample_ms = Some(now_ms);
        self.samples.push_back(stats);
        while self.samples.len() > STATS_HISTORY_LEN {
            self.samples.pop_front();
        }
        true
    }

    pub fn samples(&self) -> impl Iterator<Item = &FlockStats> {
        self.samples.iter()
    }

    pub fn latest(&self) -> Option<&FlockStats> {
        self.samples.back()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.last_sample_ms = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boid::{AgentId, Species};
    use crate::params::SimulationParams;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn stats_of_two_agents() {
        let params = SimulationParams::default();
        let mut rng = StdRng::seed_from_u64(4);
        let mut a = Boid::new(AgentId(0), Vec2::new(0.0, 0.0), Species::Blue, &params, &mut rng);
        let mut b = Boid::new(AgentId(1), Vec2::new(10.0, 0.0), Species::Blue, &params, &mut rng);
        a.velocity = Vec2::new(3.0, 4.0);
        b.velocity = Vec2::new(1.0, 0.0);
        a.neighbor_count = 1;
        b.neighbor_count = 2;

        let stats = FlockStats::from_boids(&[a, b]);
        assert_eq!(stats.population, 2);
        assert!((stats.mean_speed - 3.0).abs() < 1e-6);
        assert!((stats.mean_neighbors - 1.5).abs() < 1e-6);
        assert!((stats.compactness - 5.0).abs() < 1e-6);
        assert_eq!(FlockStats::from_boids(&[]), FlockStats::default());
    }

    #[test]
    fn history_is_throttled_and_bounded() {
        let mut history = StatsHistory::default();
        assert!(history.observe(FlockStats::default(), 0.0));
        assert!(!history.observe(FlockStats::default(), 400.0));
        assert!(history.observe(FlockStats::default(), 501.0));
        for i in 0..500 {
            history.observe(FlockStats::default(), 1_000.0 + i as f64 * 600.0);
        }
        assert_eq!(history.len(), STATS_HISTORY_LEN);
    }
}
