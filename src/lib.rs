/*
 * Murmuration - Module Definitions
 *
 * This file defines the module structure for the flocking simulation.
 * The simulation core (flock and everything below it) has no dependency on
 * a window and can be driven headless; app, ui, input, renderer and debug
 * make up the interactive viewer.
 */

// Re-export key components for easier access
pub use boid::{AgentId, Boid, Genes, Species};
pub use error::{ConfigError, GridError};
pub use flock::Flock;
pub use mode::{AudioFeed, AudioLevels, Mode};
pub use obstacle::{Obstacle, ObstacleId, ObstacleKind};
pub use params::{BoundaryMode, Preset, SimulationParams, VisionMode};
pub use spatial_grid::SpatialGrid;
pub use stats::{FlockStats, StatsHistory};

// Simulation core
pub mod boid;
pub mod error;
pub mod evolution;
pub mod flock;
pub mod mode;
pub mod obstacle;
pub mod params;
pub mod spatial_grid;
pub mod stats;
pub mod vecmath;

// Viewer
pub mod app;
pub mod debug;
pub mod input;
pub mod renderer;
pub mod ui;
