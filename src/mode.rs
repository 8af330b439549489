/*
 * Mode Module
 *
 * The flock runs in exactly one interaction mode at a time. This module
 * owns the mode tag, the state each mode carries between ticks (predator
 * position and fear trail, respawn queue, evolution predators, audio
 * levels) and the side effects of switching modes.
 */

use nannou::prelude::Vec2;
use rand::Rng;
use std::collections::VecDeque;
use std::fmt;

use crate::boid::{Boid, Genes, Species, Weights, BASELINE_FITNESS};
use crate::evolution::EvolutionState;
use crate::obstacle::ObstacleId;
use crate::params::SimulationParams;
use crate::vecmath::lerp;

pub const KILL_DISTANCE: f32 = 10.0;
pub const RESPAWN_DELAY_MS: f64 = 3000.0;
pub const FEAR_POINT_LIFETIME_MS: f64 = 5000.0;
pub const FEAR_TRAIL_RADIUS: f32 = 60.0;
// A fear point is dropped every this many ticks
pub const FEAR_POINT_INTERVAL_TICKS: u64 = 10;
pub const PREDATOR_FOLLOW_LERP: f32 = 0.05;
pub const AUDIO_SENSITIVITY: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    #[default]
    Normal,
    Predator,
    Painter,
    Evolution,
    Sound,
}

impl Mode {
    pub const ALL: [Mode; 5] = [Mode::Normal, Mode::Predator, Mode::Painter, Mode::Evolution, Mode::Sound];

    pub fn label(self) -> &'static str {
        match self {
            Mode::Normal => "Normal",
            Mode::Predator => "Predator",
            Mode::Painter => "Painter",
            Mode::Evolution => "Evolution",
            Mode::Sound => "Sound",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mode::ALL
            .into_iter()
            .find(|mode| mode.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown mode '{s}'"))
    }
}

// Smoothed band intensities in [0, 1] supplied by an audio analyser
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AudioLevels {
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
}

impl AudioLevels {
    // Bass drives cohesion, mids alignment, treble separation
    pub fn modulate(&self, base: Weights) -> Weights {
        Weights {
            separation: base.separation + self.treble * AUDIO_SENSITIVITY,
            alignment: base.alignment + self.mid * AUDIO_SENSITIVITY,
            cohesion: base.cohesion + self.bass * AUDIO_SENSITIVITY,
        }
    }

    pub fn intensity(&self) -> f32 {
        (self.bass + self.mid + self.treble) / 3.0
    }
}

/// An external source of audio levels, polled once per tick in sound mode.
///
/// `shutdown` is called when the flock leaves sound mode so the source can
/// release whatever capture device it holds.
pub trait AudioFeed {
    fn levels(&mut self) -> Option<AudioLevels>;
    fn shutdown(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FearPoint {
    pub position: Vec2,
    pub time_ms: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingRespawn {
    pub species: Species,
    pub respawn_at_ms: f64,
}

#[derive(Debug, Clone, Default)]
pub struct PredatorState {
    // Where the pointer is; the predator chases it
    pub target: Option<Vec2>,
    // Where the predator actually is this tick
    pub position: Option<Vec2>,
    pub fear_points: VecDeque<FearPoint>,
    pub kill_count: u64,
}

impl PredatorState {
    pub fn advance(&mut self, pointer: Option<Vec2>, params: &SimulationParams, tick: u64, now_ms: f64) {
        self.target = pointer;
        match pointer {
            None => self.position = None,
            Some(target) => {
                self.position = Some(match self.position {
                    Some(current) if params.predator_follow => lerp(current, target, PREDATOR_FOLLOW_LERP),
                    _ => target,
                });
            }
        }

        if !params.predator_fear_trail {
            self.fear_points.clear();
        }
        if let Some(position) = self.position {
            if params.predator_fear_trail && tick % FEAR_POINT_INTERVAL_TICKS == 0 {
                self.fear_points.push_back(FearPoint { position, time_ms: now_ms });
            }
        }
        self.expire_fear_points(now_ms);
    }

    pub fn expire_fear_points(&mut self, now_ms: f64) {
        while let Some(oldest) = self.fear_points.front() {
            if now_ms - oldest.time_ms >= FEAR_POINT_LIFETIME_MS {
                self.fear_points.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn fresh_fear_points(&self, now_ms: f64) -> impl Iterator<Item = Vec2> + '_ {
        self.fear_points
            .iter()
            .filter(move |point| now_ms - point.time_ms <= FEAR_POINT_LIFETIME_MS)
            .map(|point| point.position)
    }
}

pub struct ModeController {
    mode: Mode,
    pub predator: PredatorState,
    pub evolution: EvolutionState,
    pub respawn_queue: Vec<PendingRespawn>,
    pub follow_obstacle: Option<ObstacleId>,
    audio_feed: Option<Box<dyn AudioFeed>>,
    audio_levels: Option<AudioLevels>,
}

impl fmt::Debug for ModeController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModeController")
            .field("mode", &self.mode)
            .field("predator", &self.predator)
            .field("evolution", &self.evolution)
            .field("respawn_queue", &self.respawn_queue)
            .field("follow_obstacle", &self.follow_obstacle)
            .field("audio_feed", &self.audio_feed.is_some())
            .field("audio_levels", &self.audio_levels)
            .finish()
    }
}

impl Default for ModeController {
    fn default() -> Self {
        Self::new()
    }
}

impl ModeController {
    pub fn new() -> Self {
        Self {
            mode: Mode::Normal,
            predator: PredatorState::default(),
            evolution: EvolutionState::default(),
            respawn_queue: Vec::new(),
            follow_obstacle: None,
            audio_feed: None,
            audio_levels: None,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn audio_levels(&self) -> Option<AudioLevels> {
        self.audio_levels
    }

    pub fn set_audio_levels(&mut self, levels: Option<AudioLevels>) {
        self.audio_levels = levels;
    }

    pub fn attach_audio_feed(&mut self, feed: Box<dyn AudioFeed>) {
        if let Some(mut previous) = self.audio_feed.replace(feed) {
            previous.shutdown();
        }
    }

    pub fn has_audio_feed(&self) -> bool {
        self.audio_feed.is_some()
    }

    // Pull fresh levels from the attached feed while in sound mode
    pub fn poll_audio(&mut self) {
        if self.mode != Mode::Sound {
            return;
        }
        if let Some(feed) = self.audio_feed.as_mut() {
            self.audio_levels = feed.levels();
        }
    }

    fn shutdown_audio(&mut self) {
        if let Some(mut feed) = self.audio_feed.take() {
            log::info!("Leaving sound mode, shutting down audio feed");
            feed.shutdown();
        }
        self.audio_levels = None;
    }

    // Global flocking weights for this tick, audio-modulated in sound mode
    pub fn weights(&self, params: &SimulationParams) -> Weights {
        let base = Weights {
            separation: params.separation_weight,
            alignment: params.alignment_weight,
            cohesion: params.cohesion_weight,
        };
        match (self.mode, self.audio_levels) {
            (Mode::Sound, Some(levels)) => levels.modulate(base),
            _ => base,
        }
    }

    /// Switch modes, tearing down the previous mode's state and preparing
    /// the new one.
    pub fn switch_mode<R: Rng + ?Sized>(
        &mut self,
        mode: Mode,
        boids: &mut [Boid],
        params: &SimulationParams,
        now_ms: f64,
        rng: &mut R,
    ) {
        log::info!("Switching mode: {} -> {}", self.mode, mode);
        let previous = self.mode;
        self.mode = mode;

        self.predator.position = None;
        self.predator.target = None;
        self.predator.fear_points.clear();
        self.follow_obstacle = None;

        if previous == Mode::Sound && mode != Mode::Sound {
            self.shutdown_audio();
        }

        match mode {
            Mode::Evolution => {
                self.evolution.reset(now_ms);
                let genes = Genes::from_params(params);
                for boid in boids.iter_mut() {
                    boid.fitness = BASELINE_FITNESS;
                    boid.genes = genes;
                }
                self.evolution
                    .spawn_predators(params.world_width, params.world_height, rng);
            }
            Mode::Normal | Mode::Predator | Mode::Painter | Mode::Sound => {
                self.evolution.predators.clear();
            }
        }
    }

    // Forget everything mode-specific, keeping the current mode
    pub fn reset<R: Rng + ?Sized>(&mut self, params: &SimulationParams, now_ms: f64, rng: &mut R) {
        self.predator = PredatorState::default();
        self.respawn_queue.clear();
        self.follow_obstacle = None;
        self.evolution.reset(now_ms);
        if self.mode == Mode::Evolution {
            self.evolution
                .spawn_predators(params.world_width, params.world_height, rng);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boid::AgentId;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::cell::Cell;
    use std::rc::Rc;

    struct FixedFeed {
        levels: AudioLevels,
        shut_down: Rc<Cell<bool>>,
    }

    impl AudioFeed for FixedFeed {
        fn levels(&mut self) -> Option<AudioLevels> {
            Some(self.levels)
        }

        fn shutdown(&mut self) {
            self.shut_down.set(true);
        }
    }

    #[test]
    fn mode_names_round_trip() {
        for mode in Mode::ALL {
            assert_eq!(mode.label().parse::<Mode>(), Ok(mode));
        }
        assert!("disco".parse::<Mode>().is_err());
    }

    #[test]
    fn audio_modulates_weights_only_in_sound_mode() {
        let params = SimulationParams::default();
        let mut rng = StdRng::seed_from_u64(1);
        let mut controller = ModeController::new();
        let shut_down = Rc::new(Cell::new(false));
        controller.attach_audio_feed(Box::new(FixedFeed {
            levels: AudioLevels { bass: 0.5, mid: 0.25, treble: 0.1 },
            shut_down: shut_down.clone(),
        }));

        controller.poll_audio();
        assert_eq!(controller.weights(&params).cohesion, params.cohesion_weight);

        controller.switch_mode(Mode::Sound, &mut [], &params, 0.0, &mut rng);
        controller.poll_audio();
        let weights = controller.weights(&params);
        assert!((weights.cohesion - (params.cohesion_weight + 1.0)).abs() < 1e-6);
        assert!((weights.alignment - (params.alignment_weight + 0.5)).abs() < 1e-6);
        assert!((weights.separation - (params.separation_weight + 0.2)).abs() < 1e-6);

        controller.switch_mode(Mode::Normal, &mut [], &params, 0.0, &mut rng);
        assert!(shut_down.get());
        assert!(!controller.has_audio_feed());
        assert_eq!(controller.weights(&params).separation, params.separation_weight);
    }

    #[test]
    fn entering_evolution_resets_genes_and_spawns_predators() {
        let mut params = SimulationParams::default();
        let mut rng = StdRng::seed_from_u64(2);
        let mut boids = vec![Boid::new(AgentId(0), Vec2::new(5.0, 5.0), Species::Blue, &params, &mut rng)];
        boids[0].fitness = 80.0;
        boids[0].genes.cohesion = 9.0;
        params.cohesion_weight = 2.5;

        let mut controller = ModeController::new();
        controller.switch_mode(Mode::Evolution, &mut boids, &params, 100.0, &mut rng);
        assert_eq!(boids[0].fitness, BASELINE_FITNESS);
        assert_eq!(boids[0].genes.cohesion, 2.5);
        assert_eq!(controller.evolution.predators.len(), 3);
        assert_eq!(controller.evolution.last_selection_ms, 100.0);

        controller.switch_mode(Mode::Predator, &mut boids, &params, 200.0, &mut rng);
        assert!(controller.evolution.predators.is_empty());
    }

    #[test]
    fn predator_follows_pointer_and_drops_fear_points() {
        let mut params = SimulationParams::default();
        params.predator_follow = true;
        let mut predator = PredatorState::default();

        predator.advance(Some(Vec2::new(100.0, 100.0)), &params, 0, 0.0);
        assert_eq!(predator.position, Some(Vec2::new(100.0, 100.0)));
        assert_eq!(predator.fear_points.len(), 1);

        predator.advance(Some(Vec2::new(200.0, 100.0)), &params, 1, 16.0);
        assert_eq!(predator.position, Some(Vec2::new(105.0, 100.0)));
        assert_eq!(predator.fear_points.len(), 1);

        predator.advance(None, &params, 10, 6_000.0);
        assert_eq!(predator.position, None);
        assert!(predator.fear_points.is_empty());
    }
}
