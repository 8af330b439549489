/*
 * Simulation Parameters Module
 *
 * This module defines the SimulationParams struct that contains all the
 * adjustable parameters for the flock. These parameters can be modified
 * through the UI at any time between ticks, loaded from a TOML file, or
 * replaced wholesale by a named preset. It also provides parameter change
 * detection so the UI can tell population changes apart from tuning.
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::ConfigError;

pub const DEFAULT_SEPARATION: f32 = 1.5;
pub const DEFAULT_ALIGNMENT: f32 = 1.0;
pub const DEFAULT_COHESION: f32 = 1.0;
pub const DEFAULT_RADIUS: f32 = 80.0;
pub const DEFAULT_MAX_SPEED: f32 = 4.0;
pub const DEFAULT_BOID_COUNT: usize = 200;

// How agents interact with the world edges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryMode {
    Wrap,
    Bounce,
}

// Which neighbours an agent can see
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisionMode {
    Omni,
    Cone,
}

// Parameters for the simulation that can be adjusted via UI
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParams {
    pub num_boids: usize,
    pub separation_weight: f32,
    pub alignment_weight: f32,
    pub cohesion_weight: f32,
    pub perception_radius: f32,
    pub max_speed: f32,
    pub boundary_mode: BoundaryMode,
    pub vision_mode: VisionMode,
    pub two_species: bool,
    pub enable_spatial_grid: bool,
    pub trails_enabled: bool,
    // Predator mode
    pub predator_radius: f32,
    pub predator_follow: bool,
    pub predator_fear_trail: bool,
    // Evolution mode
    pub evolution_interval_secs: f32,
    // World extents
    pub world_width: f32,
    pub world_height: f32,
    pub pause_simulation: bool,
    pub show_debug: bool,

    // Internal state for tracking changes
    #[serde(skip)]
    previous_values: Option<ParamSnapshot>,
}

// A snapshot of parameter values used for change detection
#[derive(Debug, Clone, PartialEq)]
struct ParamSnapshot {
    num_boids: usize,
    separation_weight: f32,
    alignment_weight: f32,
    cohesion_weight: f32,
    perception_radius: f32,
    max_speed: f32,
    boundary_mode: BoundaryMode,
    vision_mode: VisionMode,
    two_species: bool,
    enable_spatial_grid: bool,
    trails_enabled: bool,
    predator_radius: f32,
    predator_follow: bool,
    predator_fear_trail: bool,
    evolution_interval_secs: f32,
    pause_simulation: bool,
    show_debug: bool,
}

// What changed since the last snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParamChanges {
    pub population: bool,
    pub fear_trail_disabled: bool,
    pub any: bool,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            num_boids: DEFAULT_BOID_COUNT,
            separation_weight: DEFAULT_SEPARATION,
            alignment_weight: DEFAULT_ALIGNMENT,
            cohesion_weight: DEFAULT_COHESION,
            perception_radius: DEFAULT_RADIUS,
            max_speed: DEFAULT_MAX_SPEED,
            boundary_mode: BoundaryMode::Wrap,
            vision_mode: VisionMode::Omni,
            two_species: false,
            enable_spatial_grid: true,
            trails_enabled: false,
            predator_radius: 150.0,
            predator_follow: false,
            predator_fear_trail: true,
            evolution_interval_secs: 10.0,
            world_width: 800.0,
            world_height: 600.0,
            pause_simulation: false,
            show_debug: false,
            previous_values: None,
        }
    }
}

impl SimulationParams {
    /// Loads parameters from a TOML file. Missing keys fall back to defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let text = std::fs::read_to_string(path_ref).map_err(|source| ConfigError::Io {
            path: path_ref.to_path_buf(),
            source,
        })?;
        let params: SimulationParams = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path_ref.to_path_buf(),
            source,
        })?;
        params.validate()?;
        log::info!("Loaded simulation parameters from {}", path_ref.display());
        Ok(params)
    }

    /// Rejects values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let weights = [
            ("separation_weight", self.separation_weight),
            ("alignment_weight", self.alignment_weight),
            ("cohesion_weight", self.cohesion_weight),
        ];
        for (name, value) in weights {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!("{name} must be a non-negative number, got {value}")));
            }
        }
        let positives = [
            ("perception_radius", self.perception_radius),
            ("max_speed", self.max_speed),
            ("predator_radius", self.predator_radius),
            ("evolution_interval_secs", self.evolution_interval_secs),
            ("world_width", self.world_width),
            ("world_height", self.world_height),
        ];
        for (name, value) in positives {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid(format!("{name} must be positive, got {value}")));
            }
        }
        if !Self::get_num_boids_range().contains(&self.num_boids) {
            return Err(ConfigError::Invalid(format!(
                "num_boids must be within {:?}, got {}",
                Self::get_num_boids_range(),
                self.num_boids
            )));
        }
        Ok(())
    }

    // Take a snapshot of current parameter values for change detection
    pub fn take_snapshot(&mut self) {
        self.previous_values = Some(self.snapshot());
    }

    fn snapshot(&self) -> ParamSnapshot {
        ParamSnapshot {
            num_boids: self.num_boids,
            separation_weight: self.separation_weight,
            alignment_weight: self.alignment_weight,
            cohesion_weight: self.cohesion_weight,
            perception_radius: self.perception_radius,
            max_speed: self.max_speed,
            boundary_mode: self.boundary_mode,
            vision_mode: self.vision_mode,
            two_species: self.two_species,
            enable_spatial_grid: self.enable_spatial_grid,
            trails_enabled: self.trails_enabled,
            predator_radius: self.predator_radius,
            predator_follow: self.predator_follow,
            predator_fear_trail: self.predator_fear_trail,
            evolution_interval_secs: self.evolution_interval_secs,
            pause_simulation: self.pause_simulation,
            show_debug: self.show_debug,
        }
    }

    // Check which parameters changed since the last snapshot
    pub fn detect_changes(&self) -> ParamChanges {
        // If we don't have previous values, nothing has changed
        let Some(prev) = &self.previous_values else {
            return ParamChanges::default();
        };

        ParamChanges {
            population: self.num_boids != prev.num_boids,
            fear_trail_disabled: prev.predator_fear_trail && !self.predator_fear_trail,
            any: self.snapshot() != *prev,
        }
    }

    // Get parameter ranges for UI sliders
    pub fn get_num_boids_range() -> std::ops::RangeInclusive<usize> {
        0..=1000
    }

    pub fn get_max_speed_range() -> std::ops::RangeInclusive<f32> {
        1.0..=10.0
    }

    pub fn get_weight_range() -> std::ops::RangeInclusive<f32> {
        0.0..=5.0
    }

    pub fn get_radius_range() -> std::ops::RangeInclusive<f32> {
        20.0..=200.0
    }

    pub fn get_predator_radius_range() -> std::ops::RangeInclusive<f32> {
        50.0..=300.0
    }

    pub fn get_evolution_interval_range() -> std::ops::RangeInclusive<f32> {
        5.0..=60.0
    }

    // Replace the flocking parameters with a named preset
    pub fn apply_preset(&mut self, preset: Preset) {
        let (separation, alignment, cohesion, radius, speed) = preset.values();
        self.separation_weight = separation;
        self.alignment_weight = alignment;
        self.cohesion_weight = cohesion;
        self.perception_radius = radius;
        self.max_speed = speed;
    }
}

// Named parameter sets reproducing recognisable flock behaviours
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    Schooling,
    Chaotic,
    Tight,
}

impl Preset {
    pub const ALL: [Preset; 3] = [Preset::Schooling, Preset::Chaotic, Preset::Tight];

    // (separation, alignment, cohesion, radius, max speed)
    fn values(self) -> (f32, f32, f32, f32, f32) {
        match self {
            Preset::Schooling => (1.0, 2.5, 1.2, 100.0, 3.0),
            Preset::Chaotic => (0.5, 0.3, 0.8, 40.0, 6.0),
            Preset::Tight => (0.8, 1.0, 3.0, 120.0, 2.0),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Preset::Schooling => "schooling",
            Preset::Chaotic => "chaotic",
            Preset::Tight => "tight",
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Preset::ALL
            .into_iter()
            .find(|preset| preset.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConfigError::UnknownPreset(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(SimulationParams::default().validate().is_ok());
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let params: SimulationParams = toml::from_str(
            r#"
            num_boids = 50
            boundary_mode = "bounce"
            vision_mode = "cone"
            "#,
        )
        .unwrap();
        assert_eq!(params.num_boids, 50);
        assert_eq!(params.boundary_mode, BoundaryMode::Bounce);
        assert_eq!(params.vision_mode, VisionMode::Cone);
        assert_eq!(params.perception_radius, DEFAULT_RADIUS);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut params = SimulationParams::default();
        params.max_speed = 0.0;
        assert!(matches!(params.validate(), Err(ConfigError::Invalid(_))));

        let mut params = SimulationParams::default();
        params.cohesion_weight = f32::NAN;
        assert!(params.validate().is_err());

        let mut params = SimulationParams::default();
        params.num_boids = 1_000_000;
        assert!(params.validate().is_err());
    }

    #[test]
    fn missing_file_reports_io_error() {
        let err = SimulationParams::load("definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn change_detection_distinguishes_population() {
        let mut params = SimulationParams::default();
        assert_eq!(params.detect_changes(), ParamChanges::default());

        params.take_snapshot();
        params.cohesion_weight = 2.0;
        let changes = params.detect_changes();
        assert!(changes.any);
        assert!(!changes.population);

        params.take_snapshot();
        params.num_boids = 10;
        params.predator_fear_trail = false;
        let changes = params.detect_changes();
        assert!(changes.population);
        assert!(changes.fear_trail_disabled);
    }

    #[test]
    fn presets_parse_and_apply() {
        let preset: Preset = "Tight".parse().unwrap();
        let mut params = SimulationParams::default();
        params.apply_preset(preset);
        assert_eq!(params.cohesion_weight, 3.0);
        assert_eq!(params.perception_radius, 120.0);
        assert_eq!(params.max_speed, 2.0);
        assert!("swarm".parse::<Preset>().is_err());
    }
}
