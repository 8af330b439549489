/*
 * Error Module
 *
 * Typed errors for the fallible edges of the engine: grid geometry and
 * parameter loading. The tick itself never fails.
 */

use std::path::PathBuf;
use thiserror::Error;

/// Errors emitted by the spatial grid.
#[derive(Debug, Error, PartialEq)]
pub enum GridError {
    /// Cell size or world extent that cannot be bucketed.
    #[error("invalid grid geometry: cell size {cell_size}, world {width}x{height}")]
    InvalidGeometry {
        cell_size: f32,
        width: f32,
        height: f32,
    },
}

/// Errors raised while loading or validating simulation parameters.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read parameter file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse parameter file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid parameter: {0}")]
    Invalid(String),
    #[error("unknown preset '{0}'")]
    UnknownPreset(String),
    #[error(transparent)]
    Grid(#[from] GridError),
}
