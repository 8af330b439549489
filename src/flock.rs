/*
 * Flock Module
 *
 * The Flock is the simulation context: it owns the agents, the spatial
 * grid, the obstacles, the mode state and the random number generator, and
 * advances all of them one tick at a time.
 *
 * A tick runs in a fixed order:
 * 1. Rebuild the spatial grid from the current positions
 * 2. Advance mode state (predator, evolution predators and selection,
 *    drifting and followed obstacles)
 * 3. Compute every agent's steering from a start-of-tick snapshot, then
 *    integrate, apply the boundary policy and record trails
 * 4. Sweep: remove killed agents, panic their neighbors, schedule and
 *    perform respawns
 * 5. Aggregate statistics
 *
 * Nothing is removed from the agent list while it is being iterated;
 * kills are collected during step 3 and applied in step 4.
 */

use nannou::prelude::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::time::Duration;

use crate::boid::{in_perception_cone, random_position, AgentId, Boid, Genes, Neighbor, Species, Weights};
use crate::error::ConfigError;
use crate::evolution::{fitness_summary, FitnessSummary, EVOLUTION_FLEE_RADIUS, FITNESS_PER_TICK, FITNESS_RADIUS};
use crate::mode::{
    AudioFeed, AudioLevels, Mode, ModeController, PendingRespawn, FEAR_TRAIL_RADIUS, KILL_DISTANCE,
    RESPAWN_DELAY_MS,
};
use crate::obstacle::{Obstacle, ObstacleId, ObstacleKind};
use crate::params::{BoundaryMode, SimulationParams, VisionMode};
use crate::spatial_grid::SpatialGrid;
use crate::stats::{FlockStats, StatsHistory};
use crate::vecmath::{is_valid_extent, lerp, wrapped_delta};

pub const SELECTION_RADIUS: f32 = 20.0;
pub const FOLLOW_OBSTACLE_RADIUS: f32 = 30.0;
pub const FOLLOW_OBSTACLE_LERP: f32 = 0.1;
pub const MAZE_SPACING: f32 = 80.0;
pub const MAZE_OBSTACLE_RADIUS: f32 = 20.0;
pub const MAZE_DENSITY: f64 = 0.35;

pub struct Flock {
    params: SimulationParams,
    boids: Vec<Boid>,
    grid: SpatialGrid,
    obstacles: Vec<Obstacle>,
    modes: ModeController,
    rng: StdRng,
    next_agent_id: u64,
    next_obstacle_id: u64,
    clock_ms: f64,
    tick: u64,
    pointer: Option<Vec2>,
    selected: Option<AgentId>,
    stats: FlockStats,
    history: StatsHistory,
    // Reused between agents to avoid an allocation per query
    neighbor_buffer: Vec<usize>,
}

impl Flock {
    /// Creates a flock with `params.num_boids` agents at random positions.
    /// The same seed and inputs always produce the same run.
    pub fn new(params: SimulationParams, seed: u64) -> Result<Self, ConfigError> {
        params.validate()?;
        let grid = SpatialGrid::new(params.perception_radius, params.world_width, params.world_height)?;

        let mut flock = Self {
            params,
            boids: Vec::new(),
            grid,
            obstacles: Vec::new(),
            modes: ModeController::new(),
            rng: StdRng::seed_from_u64(seed),
            next_agent_id: 0,
            next_obstacle_id: 0,
            clock_ms: 0.0,
            tick: 0,
            pointer: None,
            selected: None,
            stats: FlockStats::default(),
            history: StatsHistory::default(),
            neighbor_buffer: Vec::new(),
        };
        flock.spawn_initial();
        log::info!(
            "Created flock of {} boids in a {}x{} world (seed {})",
            flock.boids.len(),
            flock.params.world_width,
            flock.params.world_height,
            seed
        );
        Ok(flock)
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    // Parameter changes take effect on the next tick
    pub fn params_mut(&mut self) -> &mut SimulationParams {
        &mut self.params
    }

    pub fn boids(&self) -> &[Boid] {
        &self.boids
    }

    pub fn boids_mut(&mut self) -> &mut [Boid] {
        &mut self.boids
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn mode(&self) -> Mode {
        self.modes.mode()
    }

    pub fn modes(&self) -> &ModeController {
        &self.modes
    }

    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    pub fn stats(&self) -> FlockStats {
        self.stats
    }

    pub fn history(&self) -> &StatsHistory {
        &self.history
    }

    pub fn clock_ms(&self) -> f64 {
        self.clock_ms
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn kill_count(&self) -> u64 {
        self.modes.predator.kill_count
    }

    pub fn generation(&self) -> u32 {
        self.modes.evolution.generation
    }

    pub fn pending_respawns(&self) -> &[PendingRespawn] {
        &self.modes.respawn_queue
    }

    pub fn fitness_summary(&self) -> FitnessSummary {
        fitness_summary(&self.boids)
    }

    pub fn predator_position(&self) -> Option<Vec2> {
        self.modes.predator.position
    }

    // Pointer position in world coordinates, `None` when outside the world
    pub fn set_pointer(&mut self, pointer: Option<Vec2>) {
        self.pointer = pointer;
    }

    pub fn set_audio_levels(&mut self, levels: Option<AudioLevels>) {
        self.modes.set_audio_levels(levels);
    }

    pub fn attach_audio_feed(&mut self, feed: Box<dyn AudioFeed>) {
        self.modes.attach_audio_feed(feed);
    }

    // Degenerate sizes are ignored and the current world is kept
    pub fn set_world_size(&mut self, width: f32, height: f32) -> bool {
        if !is_valid_extent(width) || !is_valid_extent(height) {
            log::warn!("Ignoring world size {width}x{height}");
            return false;
        }
        self.params.world_width = width;
        self.params.world_height = height;
        true
    }

    fn random_position(&mut self) -> Vec2 {
        random_position(&mut self.rng, self.params.world_width, self.params.world_height)
    }

    pub fn spawn_boid(&mut self, position: Vec2, species: Species) -> AgentId {
        let id = AgentId(self.next_agent_id);
        self.next_agent_id += 1;
        let boid = Boid::new(id, position, species, &self.params, &mut self.rng);
        self.boids.push(boid);
        id
    }

    fn spawn_initial(&mut self) {
        let count = self.params.num_boids;
        for i in 0..count {
            let species = if self.params.two_species && i >= count / 2 {
                Species::Red
            } else {
                Species::Blue
            };
            let position = self.random_position();
            self.spawn_boid(position, species);
        }
    }

    // Grow or shrink the population to `count`; removals come off the end
    pub fn set_target_population(&mut self, count: usize) {
        self.params.num_boids = count;
        self.adjust_population();
    }

    pub fn adjust_population(&mut self) {
        let target = self.params.num_boids;
        let current = self.boids.len();
        if target > current {
            for _ in current..target {
                let species = if self.params.two_species && self.rng.gen_bool(0.5) {
                    Species::Red
                } else {
                    Species::Blue
                };
                let position = self.random_position();
                self.spawn_boid(position, species);
            }
            log::debug!("Spawned {} boids", target - current);
        } else if target < current {
            self.boids.truncate(target);
            self.forget_missing_selection();
            log::debug!("Removed {} boids", current - target);
        }
    }

    // Selection

    pub fn selected(&self) -> Option<&Boid> {
        let id = self.selected?;
        self.boids.iter().find(|boid| boid.id == id)
    }

    pub fn selected_id(&self) -> Option<AgentId> {
        self.selected
    }

    // Select the boid closest to `point`, if any is within reach
    pub fn select_nearest(&mut self, point: Vec2) -> Option<AgentId> {
        let mut closest = None;
        let mut closest_distance = SELECTION_RADIUS;
        for boid in &self.boids {
            let d = boid.position.distance(point);
            if d < closest_distance {
                closest = Some(boid.id);
                closest_distance = d;
            }
        }
        self.selected = closest;
        closest
    }

    fn forget_missing_selection(&mut self) {
        if let Some(id) = self.selected {
            if !self.boids.iter().any(|boid| boid.id == id) {
                self.selected = None;
            }
        }
    }

    // Modes

    pub fn switch_mode(&mut self, mode: Mode) {
        self.modes
            .switch_mode(mode, &mut self.boids, &self.params, self.clock_ms, &mut self.rng);
    }

    // Obstacles

    pub fn add_obstacle(&mut self, position: Vec2, radius: f32, kind: ObstacleKind) -> ObstacleId {
        let id = ObstacleId(self.next_obstacle_id);
        self.next_obstacle_id += 1;
        self.obstacles
            .push(Obstacle::new(id, position, radius, kind, &mut self.rng));
        id
    }

    // Brush-style placement: only place when clear of the last obstacle
    pub fn paint_obstacle(&mut self, position: Vec2, radius: f32, kind: ObstacleKind) -> Option<ObstacleId> {
        if let Some(last) = self.obstacles.last() {
            if last.position.distance(position) <= radius {
                return None;
            }
        }
        Some(self.add_obstacle(position, radius, kind))
    }

    // Remove the most recently placed obstacle under `point`
    pub fn remove_obstacle_at(&mut self, point: Vec2) -> bool {
        let Some(index) = self.obstacles.iter().rposition(|obstacle| obstacle.contains(point)) else {
            return false;
        };
        let removed = self.obstacles.remove(index);
        if self.modes.follow_obstacle == Some(removed.id) {
            self.modes.follow_obstacle = None;
        }
        true
    }

    pub fn clear_obstacles(&mut self) {
        self.obstacles.clear();
        self.modes.follow_obstacle = None;
    }

    pub fn set_follow_obstacle(&mut self, enabled: bool) {
        match (enabled, self.modes.follow_obstacle) {
            (true, None) => {
                let center = Vec2::new(self.params.world_width / 2.0, self.params.world_height / 2.0);
                let id = self.add_obstacle(center, FOLLOW_OBSTACLE_RADIUS, ObstacleKind::Static);
                self.modes.follow_obstacle = Some(id);
            }
            (false, Some(id)) => {
                self.obstacles.retain(|obstacle| obstacle.id != id);
                self.modes.follow_obstacle = None;
            }
            _ => {}
        }
    }

    pub fn follow_obstacle(&self) -> Option<ObstacleId> {
        self.modes.follow_obstacle
    }

    // Replace all obstacles with a random lattice
    pub fn generate_maze(&mut self) {
        self.clear_obstacles();
        let (width, height) = (self.params.world_width, self.params.world_height);
        if !is_valid_extent(width) || !is_valid_extent(height) {
            log::warn!("Cannot lay out a maze in a {width}x{height} world");
            return;
        }
        let mut x = MAZE_SPACING;
        while x < width - MAZE_SPACING {
            let mut y = MAZE_SPACING;
            while y < height - MAZE_SPACING {
                if self.rng.gen_bool(MAZE_DENSITY) {
                    self.add_obstacle(Vec2::new(x, y), MAZE_OBSTACLE_RADIUS, ObstacleKind::Static);
                }
                y += MAZE_SPACING;
            }
            x += MAZE_SPACING;
        }
        log::debug!("Generated maze with {} obstacles", self.obstacles.len());
    }

    // Back to defaults: parameters, population, obstacles and mode state
    pub fn reset(&mut self) {
        let (width, height) = (self.params.world_width, self.params.world_height);
        let mut params = SimulationParams::default();
        params.world_width = width;
        params.world_height = height;
        self.params = params;
        self.boids.clear();
        self.obstacles.clear();
        self.selected = None;
        self.history.clear();
        self.modes.reset(&self.params, self.clock_ms, &mut self.rng);
        self.spawn_initial();
        self.stats = FlockStats::from_boids(&self.boids);
        log::info!("Simulation reset with {} boids", self.boids.len());
    }

    // Simulation

    /// Advances the simulation by one tick of `dt` wall time.
    pub fn step(&mut self, dt: Duration) {
        let dt_ms = dt.as_micros() as f64 / 1000.0;
        self.clock_ms += dt_ms;
        self.tick += 1;
        let now_ms = self.clock_ms;

        self.modes.poll_audio();

        if self.params.enable_spatial_grid {
            self.rebuild_grid();
        }

        if self.advance_mode_state(now_ms) && self.params.enable_spatial_grid {
            // Selection reordered and relocated agents
            self.rebuild_grid();
        }

        let kills = self.apply_forces(now_ms, dt_ms as f32);
        self.integrate(now_ms);

        self.sweep(&kills, now_ms);
        self.process_respawns(now_ms);

        self.stats = FlockStats::from_boids(&self.boids);
        self.history.observe(self.stats, now_ms);
        log::trace!("Tick {} at {:.0} ms: {:?}", self.tick, now_ms, self.stats);
    }

    fn rebuild_grid(&mut self) {
        if let Err(err) = self.grid.resize(
            self.params.perception_radius,
            self.params.world_width,
            self.params.world_height,
        )
        {
            log::warn!("Keeping previous grid geometry: {err}");
        }
        self.grid.clear();
        for (i, boid) in self.boids.iter().enumerate() {
            self.grid.insert(i, boid.position);
        }
    }

    // Returns true when agents were reordered or relocated
    fn advance_mode_state(&mut self, now_ms: f64) -> bool {
        let (width, height) = (self.params.world_width, self.params.world_height);
        let mut reshuffled = false;

        match self.modes.mode() {
            Mode::Predator => {
                self.modes
                    .predator
                    .advance(self.pointer, &self.params, self.tick, now_ms);
            }
            Mode::Evolution => {
                self.modes
                    .evolution
                    .advance_predators(width, height, &mut self.rng);
                let interval_ms = self.params.evolution_interval_secs as f64 * 1000.0;
                if self
                    .modes
                    .evolution
                    .is_selection_due(now_ms, interval_ms, self.boids.len())
                {
                    self.modes
                        .evolution
                        .run_selection(&mut self.boids, now_ms, width, height, &mut self.rng);
                    reshuffled = true;
                }
            }
            Mode::Painter => {
                if let (Some(target), Some(id)) = (self.pointer, self.modes.follow_obstacle) {
                    if let Some(obstacle) = self.obstacles.iter_mut().find(|obstacle| obstacle.id == id) {
                        obstacle.position = lerp(obstacle.position, target, FOLLOW_OBSTACLE_LERP);
                    }
                }
            }
            Mode::Normal | Mode::Sound => {}
        }

        for obstacle in &mut self.obstacles {
            obstacle.drift(width, height);
        }
        reshuffled
    }

    // Steering for every agent, computed from a start-of-tick snapshot.
    // Returns the indices of agents caught by the predator.
    fn apply_forces(&mut self, now_ms: f64, dt_ms: f32) -> Vec<usize> {
        let Flock {
            params,
            boids,
            grid,
            obstacles,
            modes,
            neighbor_buffer,
            ..
        } = self;

        let mode = modes.mode();
        let global_weights = modes.weights(params);
        let wrap = params.boundary_mode == BoundaryMode::Wrap;
        let (width, height) = (params.world_width, params.world_height);

        let snapshot: Vec<(Vec2, Vec2, Species)> = boids
            .iter()
            .map(|boid| (boid.position, boid.velocity, boid.species))
            .collect();

        let predator = match mode {
            Mode::Predator => modes.predator.position,
            _ => None,
        };
        let fear_points: Vec<Vec2> = if mode == Mode::Predator && params.predator_fear_trail {
            modes.predator.fresh_fear_points(now_ms).collect()
        } else {
            Vec::new()
        };

        let mut kills = Vec::new();
        let mut neighbors: Vec<Neighbor> = Vec::new();

        // Queries and steering magnitudes use the global radius and speed in
        // every mode; genes only scale the forces and cap the speed
        let radius = params.perception_radius;
        let max_speed = params.max_speed;

        for (i, boid) in boids.iter_mut().enumerate() {
            let weights = match mode {
                Mode::Evolution => gene_weights(&boid.genes),
                Mode::Normal | Mode::Predator | Mode::Painter | Mode::Sound => global_weights,
            };
            let position = snapshot[i].0;

            neighbor_buffer.clear();
            match (params.enable_spatial_grid, wrap) {
                (true, true) => grid.query_neighbors_wrapped_into(i, position, radius, neighbor_buffer),
                (true, false) => grid.query_neighbors_into(i, position, radius, neighbor_buffer),
                (false, _) => brute_force_neighbors(i, position, radius, &snapshot, wrap, width, height, neighbor_buffer),
            }

            neighbors.clear();
            for &j in neighbor_buffer.iter() {
                let (other_position, other_velocity, other_species) = snapshot[j];
                let offset = if wrap {
                    wrapped_delta(position, other_position, width, height)
                } else {
                    other_position - position
                };
                if params.vision_mode == VisionMode::Cone && !in_perception_cone(boid.velocity, offset) {
                    continue;
                }
                neighbors.push(Neighbor {
                    offset,
                    velocity: other_velocity,
                    species: other_species,
                });
            }
            boid.neighbor_count = neighbors.len();

            let force = boid.flocking_force(&neighbors, weights, radius, max_speed, params.two_species);
            boid.apply_force(force);

            if !obstacles.is_empty() {
                let avoid = boid.avoid_obstacles(obstacles, params.perception_radius, params.separation_weight);
                boid.apply_force(avoid);
            }

            match mode {
                Mode::Predator => {
                    if let Some(predator) = predator {
                        let flee = boid.flee_force(predator, params.predator_radius, max_speed);
                        boid.apply_force(flee);
                        if boid.position.distance(predator) < KILL_DISTANCE {
                            kills.push(i);
                        }
                    }
                    if !fear_points.is_empty() {
                        let avoid = boid.avoid_points(fear_points.iter().copied(), FEAR_TRAIL_RADIUS);
                        boid.apply_force(avoid);
                    }
                }
                Mode::Evolution => {
                    for predator in &modes.evolution.predators {
                        let flee = boid.flee_force(predator.position, EVOLUTION_FLEE_RADIUS, max_speed);
                        boid.apply_force(flee);
                        if boid.position.distance(predator.position) < FITNESS_RADIUS {
                            boid.fitness += FITNESS_PER_TICK;
                        }
                    }
                }
                Mode::Normal | Mode::Painter | Mode::Sound => {}
            }

            boid.decay_panic(dt_ms);
        }

        kills
    }

    fn integrate(&mut self, now_ms: f64) {
        let evolving = self.modes.mode() == Mode::Evolution;
        let params = &self.params;
        for boid in &mut self.boids {
            let max_speed = if evolving { boid.genes.max_speed } else { params.max_speed };
            boid.update(max_speed);
            boid.edges(params.boundary_mode, params.world_width, params.world_height);
            boid.record_trail(now_ms, params.trails_enabled);
        }
    }

    // Apply the kills collected during the tick
    fn sweep(&mut self, kills: &[usize], now_ms: f64) {
        if kills.is_empty() {
            return;
        }
        let panic_radius = self.params.perception_radius;
        let mut dead = HashSet::with_capacity(kills.len());

        for &victim in kills {
            let (victim_id, victim_position, species) = {
                let boid = &self.boids[victim];
                (boid.id, boid.position, boid.species)
            };
            for (j, other) in self.boids.iter_mut().enumerate() {
                if j != victim && other.position.distance(victim_position) < panic_radius {
                    other.panic();
                }
            }
            self.modes.predator.kill_count += 1;
            self.modes.respawn_queue.push(PendingRespawn {
                species,
                respawn_at_ms: now_ms + RESPAWN_DELAY_MS,
            });
            dead.insert(victim_id);
            log::debug!("Boid {:?} caught at ({:.0}, {:.0})", victim_id, victim_position.x, victim_position.y);
        }

        self.boids.retain(|boid| !dead.contains(&boid.id));
        self.forget_missing_selection();
    }

    fn process_respawns(&mut self, now_ms: f64) {
        let mut due = Vec::new();
        self.modes.respawn_queue.retain(|pending| {
            if now_ms >= pending.respawn_at_ms {
                due.push(*pending);
                false
            } else {
                true
            }
        });
        for pending in due {
            let position = self.random_position();
            let id = self.spawn_boid(position, pending.species);
            log::debug!("Respawned {:?} as {:?}", pending.species, id);
        }
    }
}

fn gene_weights(genes: &Genes) -> Weights {
    Weights {
        separation: genes.separation,
        alignment: genes.alignment,
        cohesion: genes.cohesion,
    }
}

// O(n) scan over every other agent
#[allow(clippy::too_many_arguments)]
fn brute_force_neighbors(
    index: usize,
    position: Vec2,
    radius: f32,
    snapshot: &[(Vec2, Vec2, Species)],
    wrap: bool,
    width: f32,
    height: f32,
    out: &mut Vec<usize>,
) {
    let radius_sq = radius * radius;
    for (j, &(other, _, _)) in snapshot.iter().enumerate() {
        if j == index {
            continue;
        }
        let delta = if wrap {
            wrapped_delta(position, other, width, height)
        } else {
            other - position
        };
        if delta.length_squared() < radius_sq {
            out.push(j);
        }
    }
}
