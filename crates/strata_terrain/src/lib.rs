//! # STRATA Terrain Synthesis
//!
//! Deterministic terrain and biome generation for an infinite tile plane.
//!
//! ## Design Principles
//!
//! 1. **Deterministic**: Same seed and config always produce the same tile
//! 2. **Addressable**: Any tile can be sampled in any order, no neighbours needed
//! 3. **Bounded**: Every cache and memo has a fixed capacity
//! 4. **Shareable**: One generator serves many threads
//!
//! ## Core Components
//!
//! - `SimplexNoise`: seeded 2D simplex noise
//! - `FractalSynthesizer`: FBM, ridged FBM and the continent mask
//! - `TerrainFieldSampler`: elevation, moisture, anomalies and slope
//! - `HydrologyNetwork`: rivers, lakes, capillary streams, water channels
//! - `VolcanicSystem`: lava and scorched ground
//! - `BiomeClassifier`: ordered rule chain, elevation bands, rarity
//! - `TerrainGenerator`: the tile pipeline plus the viewport tile cache
//!
//! ## Example
//!
//! ```rust,ignore
//! use strata_terrain::TerrainGenerator;
//!
//! let generator = TerrainGenerator::new(42.0, 4096)?;
//! generator.resize_cache_for_viewport(80, 45);
//!
//! let tile = generator.sample(100, -200);
//! println!("{} at height {:.2}", tile.biome, tile.height);
//!
//! // Terrain edited in chunk (5, -10): drop its tiles.
//! generator.invalidate_chunk(5, -10);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod biome;
pub mod chunk;
pub mod classifier;
pub mod config;
pub mod error;
pub mod field;
pub mod fractal;
pub mod generator;
pub mod hydrology;
pub mod memo;
pub mod noise;
pub mod volcanic;

pub use biome::{Biome, Rarity, Rgb};
pub use chunk::{ChunkBounds, ChunkCoord, CHUNK_SIZE};
pub use classifier::{BiomeClassifier, Classification, ClassifyInput};
pub use config::TerrainConfig;
pub use error::{TerrainError, TerrainResult};
pub use field::{AnomalyKind, ContinentSource, HeightMap, TerrainFieldSampler};
pub use fractal::{FbmOptions, FractalSynthesizer, MemoStats};
pub use generator::{CacheStats, TerrainGenerator, TerrainSample};
pub use hydrology::{HydrologyNetwork, RiverSample, WaterFeatures};
pub use memo::BoundedCache;
pub use noise::{NoiseChannel, SimplexNoise, WorldSeed};
pub use volcanic::{VolcanicFeatures, VolcanicSystem};
