/*
 * Evolution Module
 *
 * Evolution mode lets a handful of autonomous predators roam the world.
 * Boids accrue fitness for every tick they spend near a predator and
 * survive, and on a fixed interval the flock goes through truncation
 * selection: the worst fifth is replaced by perturbed copies of the best
 * fifth's average genes. There is no crossover.
 */

use nannou::prelude::Vec2;
use rand::Rng;

use crate::boid::{random_position, Boid, Genes};
use crate::vecmath::limit;

pub const EVOLUTION_PREDATOR_COUNT: usize = 3;
pub const EVOLUTION_FLEE_RADIUS: f32 = 150.0;
pub const FITNESS_RADIUS: f32 = 200.0;
// Roughly one point per second at 60 ticks per second
pub const FITNESS_PER_TICK: f32 = 0.02;
pub const SELECTION_FRACTION: f32 = 0.2;
// Selection only runs with strictly more agents than this
pub const MIN_SELECTION_POPULATION: usize = 10;
pub const MUTATION_RANGE: std::ops::Range<f32> = 0.9..1.1;
pub const GENE_MAX_SPEED_RANGE: (f32, f32) = (1.0, 10.0);
pub const GENE_RADIUS_RANGE: (f32, f32) = (20.0, 200.0);

const PREDATOR_MAX_SPEED: f32 = 2.0;
const PREDATOR_TURN_CHANCE: f64 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvolutionPredator {
    pub position: Vec2,
    pub velocity: Vec2,
}

impl EvolutionPredator {
    fn random<R: Rng + ?Sized>(width: f32, height: f32, rng: &mut R) -> Self {
        Self {
            position: random_position(rng, width, height),
            velocity: limit(Vec2::new(rng.gen_range(-1.5..1.5), rng.gen_range(-1.5..1.5)), PREDATOR_MAX_SPEED),
        }
    }

    // Bounce around the world with an occasional random turn
    fn advance<R: Rng + ?Sized>(&mut self, width: f32, height: f32, rng: &mut R) {
        self.position += self.velocity;

        if self.position.x < 0.0 || self.position.x > width {
            self.velocity.x = -self.velocity.x;
        }
        if self.position.y < 0.0 || self.position.y > height {
            self.velocity.y = -self.velocity.y;
        }
        self.position.x = self.position.x.min(width).max(0.0);
        self.position.y = self.position.y.min(height).max(0.0);

        if rng.gen_bool(PREDATOR_TURN_CHANCE) {
            self.velocity += Vec2::new(rng.gen_range(-0.5..0.5), rng.gen_range(-0.5..0.5));
            self.velocity = limit(self.velocity, PREDATOR_MAX_SPEED);
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EvolutionState {
    pub generation: u32,
    pub last_selection_ms: f64,
    pub predators: Vec<EvolutionPredator>,
}

impl EvolutionState {
    pub fn reset(&mut self, now_ms: f64) {
        self.generation = 0;
        self.last_selection_ms = now_ms;
        self.predators.clear();
    }

    pub fn spawn_predators<R: Rng + ?Sized>(&mut self, width: f32, height: f32, rng: &mut R) {
        self.predators = (0..EVOLUTION_PREDATOR_COUNT)
            .map(|_| EvolutionPredator::random(width, height, rng))
            .collect();
    }

    pub fn advance_predators<R: Rng + ?Sized>(&mut self, width: f32, height: f32, rng: &mut R) {
        for predator in &mut self.predators {
            predator.advance(width, height, rng);
        }
    }

    pub fn is_selection_due(&self, now_ms: f64, interval_ms: f64, population: usize) -> bool {
        now_ms - self.last_selection_ms > interval_ms && population > MIN_SELECTION_POPULATION
    }

    // Run one selection event and advance the generation counter
    pub fn run_selection<R: Rng + ?Sized>(
        &mut self,
        boids: &mut [Boid],
        now_ms: f64,
        width: f32,
        height: f32,
        rng: &mut R,
    ) -> Option<Genes> {
        self.last_selection_ms = now_ms;
        self.generation += 1;
        let parent_genes = truncation_selection(boids, width, height, rng);
        if let Some(genes) = parent_genes {
            log::info!(
                "Generation {}: replaced bottom {:.0}% with offspring of {:?}",
                self.generation,
                SELECTION_FRACTION * 100.0,
                genes
            );
        }
        parent_genes
    }
}

/// Sorts `boids` by fitness (best first), then overwrites the bottom 20%
/// with the top 20%'s average genes, each gene perturbed by a factor drawn
/// from `[0.9, 1.1)`. Replaced boids get a random position, a speed-2
/// velocity and baseline fitness.
///
/// Returns the averaged parent genes, or `None` when the population is too
/// small for a fifth to contain anyone.
pub fn truncation_selection<R: Rng + ?Sized>(
    boids: &mut [Boid],
    width: f32,
    height: f32,
    rng: &mut R,
) -> Option<Genes> {
    boids.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));

    let total = boids.len();
    let count = (total as f32 * SELECTION_FRACTION).floor() as usize;
    if count == 0 {
        return None;
    }

    let parents = average_genes(&boids[..count]);

    for boid in &mut boids[total - count..] {
        let position = random_position(rng, width, height);
        boid.respawn_at(position, rng);
        boid.genes = Genes {
            separation: parents.separation * rng.gen_range(MUTATION_RANGE),
            alignment: parents.alignment * rng.gen_range(MUTATION_RANGE),
            cohesion: parents.cohesion * rng.gen_range(MUTATION_RANGE),
            max_speed: (parents.max_speed * rng.gen_range(MUTATION_RANGE))
                .clamp(GENE_MAX_SPEED_RANGE.0, GENE_MAX_SPEED_RANGE.1),
            perception_radius: (parents.perception_radius * rng.gen_range(MUTATION_RANGE))
                .clamp(GENE_RADIUS_RANGE.0, GENE_RADIUS_RANGE.1),
        };
    }

    Some(parents)
}

fn average_genes(boids: &[Boid]) -> Genes {
    let mut sum = Genes {
        separation: 0.0,
        alignment: 0.0,
        cohesion: 0.0,
        max_speed: 0.0,
        perception_radius: 0.0,
    };
    for boid in boids {
        sum.separation += boid.genes.separation;
        sum.alignment += boid.genes.alignment;
        sum.cohesion += boid.genes.cohesion;
        sum.max_speed += boid.genes.max_speed;
        sum.perception_radius += boid.genes.perception_radius;
    }
    let n = boids.len().max(1) as f32;
    Genes {
        separation: sum.separation / n,
        alignment: sum.alignment / n,
        cohesion: sum.cohesion / n,
        max_speed: sum.max_speed / n,
        perception_radius: sum.perception_radius / n,
    }
}

// Fitness readout for the UI: best, mean and a 10-bin histogram
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FitnessSummary {
    pub top: f32,
    pub mean: f32,
    pub histogram: [usize; 10],
}

pub fn fitness_summary(boids: &[Boid]) -> FitnessSummary {
    if boids.is_empty() {
        return FitnessSummary::default();
    }
    let mut summary = FitnessSummary {
        top: f32::MIN,
        ..FitnessSummary::default()
    };
    let mut total = 0.0;
    for boid in boids {
        summary.top = summary.top.max(boid.fitness);
        total += boid.fitness;
        let bin = (boid.fitness / 10.0).floor().clamp(0.0, 9.0) as usize;
        summary.histogram[bin] += 1;
    }
    summary.mean = total / boids.len() as f32;
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boid::{AgentId, Species, BASELINE_FITNESS};
    use crate::params::SimulationParams;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn population(n: usize, rng: &mut StdRng) -> Vec<Boid> {
        let params = SimulationParams::default();
        (0..n)
            .map(|i| {
                let mut boid = Boid::new(AgentId(i as u64), Vec2::new(10.0, 10.0), Species::Blue, &params, rng);
                boid.fitness = i as f32;
                boid
            })
            .collect()
    }

    #[test]
    fn tiny_population_is_left_alone() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut boids = population(4, &mut rng);
        assert!(truncation_selection(&mut boids, 800.0, 600.0, &mut rng).is_none());
        assert_eq!(boids[0].fitness, 3.0);
    }

    #[test]
    fn predators_stay_inside_and_below_speed_cap() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut state = EvolutionState::default();
        state.spawn_predators(800.0, 600.0, &mut rng);
        assert_eq!(state.predators.len(), EVOLUTION_PREDATOR_COUNT);
        for _ in 0..5_000 {
            state.advance_predators(800.0, 600.0, &mut rng);
        }
        for predator in &state.predators {
            assert!((0.0..=800.0).contains(&predator.position.x));
            assert!((0.0..=600.0).contains(&predator.position.y));
            assert!(predator.velocity.length() <= PREDATOR_MAX_SPEED + 1e-5);
        }
    }

    #[test]
    fn selection_waits_for_interval_and_population() {
        let state = EvolutionState {
            last_selection_ms: 1_000.0,
            ..EvolutionState::default()
        };
        assert!(!state.is_selection_due(5_000.0, 10_000.0, 50));
        assert!(state.is_selection_due(11_001.0, 10_000.0, 50));
        assert!(!state.is_selection_due(11_001.0, 10_000.0, 10));
    }

    #[test]
    fn summary_bins_fitness() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut boids = population(3, &mut rng);
        boids[0].fitness = BASELINE_FITNESS;
        boids[1].fitness = 95.0;
        boids[2].fitness = 150.0;
        let summary = fitness_summary(&boids);
        assert_eq!(summary.top, 150.0);
        assert_eq!(summary.histogram[5], 1);
        assert_eq!(summary.histogram[9], 2);
        assert!((summary.mean - 295.0 / 3.0).abs() < 1e-4);
    }
}
