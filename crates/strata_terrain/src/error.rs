//! # Terrain Errors
//!
//! Construction and configuration failures.
//!
//! Sampling itself never fails: once a generator exists, every tile
//! coordinate yields a sample. Errors are confined to the seed and the
//! configuration that feed the generator.

use std::path::PathBuf;
use thiserror::Error;

/// Terrain error types.
#[derive(Error, Debug)]
pub enum TerrainError {
    /// No seed was supplied.
    #[error("Terrain generator requires a seed")]
    MissingSeed,

    /// The seed is NaN or infinite.
    #[error("Seed must be a finite number, got {0}")]
    InvalidSeed(f64),

    /// A config value is out of range.
    #[error("Invalid terrain config: {field} {reason}")]
    InvalidConfig {
        /// Dotted path of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// The config file could not be read.
    #[error("Failed to read terrain config {}: {source}", .path.display())]
    ConfigRead {
        /// File that was being read.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`crate::TerrainConfig`].
    #[error("Failed to parse terrain config: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

/// Result type for terrain operations.
pub type TerrainResult<T> = Result<T, TerrainError>;
