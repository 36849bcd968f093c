//! # Terrain Generator
//!
//! Public entry point: one generator per world seed.
//!
//! A tile is produced by running the field sampler, hydrology, volcanic
//! system, slope detection and classifier in that order. Results go into a
//! bounded tile cache sized to the viewport. The cache drops the oldest
//! quarter of its entries when full and can be invalidated one chunk at a
//! time.
//!
//! ## Thread Safety
//!
//! `TerrainGenerator` is `Send + Sync`. Tile computation takes no lock; the
//! tile cache and the FBM memos are locked only around lookups and inserts.
//! [`TerrainGenerator::prewarm_region`] fills the cache in parallel with rayon.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rayon::prelude::*;
use serde::Serialize;

use crate::biome::catalog::ocean;
use crate::biome::{Biome, Rarity};
use crate::chunk::{ChunkCoord, CHUNK_SIZE};
use crate::classifier::{BiomeClassifier, ClassifyInput};
use crate::config::TerrainConfig;
use crate::error::{TerrainError, TerrainResult};
use crate::field::{AnomalyKind, ContinentSource, TerrainFieldSampler};
use crate::fractal::MemoStats;
use crate::hydrology::HydrologyNetwork;
use crate::memo::BoundedCache;
use crate::noise::WorldSeed;
use crate::volcanic::VolcanicSystem;

/// Everything known about one tile.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TerrainSample {
    /// Elevation in `[0, 1]`.
    pub height: f64,
    /// Moisture in `[0, 1]`.
    pub moisture: f64,
    /// Continent mask in `[0, 1]`.
    pub continent: f64,
    /// Gradient magnitude.
    pub slope: f64,
    /// River intensity.
    pub river_value: f64,
    /// Lake or pond intensity.
    pub lake_value: f64,
    /// Capillary stream intensity.
    pub capillary_value: f64,
    /// Lava intensity.
    pub lava_value: f64,
    /// Scorched ground intensity.
    pub scorched_value: f64,
    /// Water channel intensity.
    pub water_network_value: f64,
    /// Slope exceeds the cliff threshold.
    pub is_cliff: bool,
    /// Cliff on high ground. Implies `is_cliff`.
    pub is_high_cliff: bool,
    /// Anomaly kind, if any.
    pub anomaly_type: Option<AnomalyKind>,
    /// Anomaly strength, zero without an anomaly.
    pub anomaly_strength: f64,
    /// Classified biome.
    pub biome: Biome,
    /// Rarity tier.
    pub rarity: Rarity,
}

impl TerrainSample {
    /// The fixed sample for open ocean.
    #[must_use]
    pub fn deep_ocean(continent: f64) -> Self {
        Self {
            height: crate::field::DEEP_OCEAN_HEIGHT,
            moisture: 1.0,
            continent: continent.clamp(0.0, 1.0),
            slope: 0.0,
            river_value: 0.0,
            lake_value: 0.0,
            capillary_value: 0.0,
            lava_value: 0.0,
            scorched_value: 0.0,
            water_network_value: 0.0,
            is_cliff: false,
            is_high_cliff: false,
            anomaly_type: None,
            anomaly_strength: 0.0,
            biome: ocean::DEEP_OCEAN,
            rarity: Rarity::Common,
        }
    }

    /// Display colour of the biome.
    #[must_use]
    pub fn color(&self) -> crate::biome::Rgb {
        self.biome.color
    }

    /// Returns true for water biomes.
    #[must_use]
    pub fn is_water(&self) -> bool {
        self.biome.water
    }
}

/// Tile cache counters since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Calls to [`TerrainGenerator::sample`].
    pub lookups: u64,
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that computed a tile.
    pub misses: u64,
    /// Tiles dropped to stay within capacity.
    pub evictions: u64,
    /// Tiles dropped by chunk invalidation or a full clear.
    pub invalidated: u64,
}

#[derive(Default)]
struct CacheCounters {
    lookups: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    invalidated: AtomicU64,
}

impl CacheCounters {
    fn snapshot(&self) -> CacheStats {
        CacheStats {
            lookups: self.lookups.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            invalidated: self.invalidated.load(Ordering::Relaxed),
        }
    }
}

type TileKey = (i32, i32);

/// Deterministic tile terrain generator.
///
/// # Example
///
/// ```rust,ignore
/// let generator = TerrainGenerator::new(42.0, 4096)?;
/// let tile = generator.sample(120, -35);
/// println!("{} ({})", tile.biome, tile.rarity.as_str());
/// ```
pub struct TerrainGenerator {
    seed: WorldSeed,
    config: Arc<TerrainConfig>,
    fields: TerrainFieldSampler,
    hydrology: HydrologyNetwork,
    volcanic: VolcanicSystem,
    classifier: BiomeClassifier,
    cache: Mutex<BoundedCache<TileKey, TerrainSample>>,
    counters: CacheCounters,
}

impl TerrainGenerator {
    /// Creates a generator with the default config.
    ///
    /// # Errors
    ///
    /// Returns [`TerrainError::InvalidSeed`] if the seed is NaN or infinite.
    pub fn new(seed: f64, cache_capacity: usize) -> TerrainResult<Self> {
        Self::with_config(seed, cache_capacity, TerrainConfig::default())
    }

    /// Creates a generator from a seed that may be absent.
    ///
    /// # Errors
    ///
    /// Returns [`TerrainError::MissingSeed`] if no seed is given.
    pub fn from_optional_seed(seed: Option<f64>, cache_capacity: usize) -> TerrainResult<Self> {
        let seed = seed.ok_or(TerrainError::MissingSeed)?;
        Self::new(seed, cache_capacity)
    }

    /// Creates a generator with a custom config.
    ///
    /// # Errors
    ///
    /// Returns an error if the seed is not finite or the config is invalid.
    pub fn with_config(
        seed: f64,
        cache_capacity: usize,
        config: TerrainConfig,
    ) -> TerrainResult<Self> {
        let world_seed = checked_seed(seed)?;
        config.validate()?;
        let config = Arc::new(config);
        let fields = TerrainFieldSampler::new(world_seed, Arc::clone(&config));
        Ok(Self::assemble(world_seed, cache_capacity, config, fields))
    }

    /// Creates a generator with a custom continent source.
    ///
    /// # Errors
    ///
    /// Returns an error if the seed is not finite or the config is invalid.
    pub fn with_continent_source(
        seed: f64,
        cache_capacity: usize,
        config: TerrainConfig,
        continent: Box<dyn ContinentSource>,
    ) -> TerrainResult<Self> {
        let world_seed = checked_seed(seed)?;
        config.validate()?;
        let config = Arc::new(config);
        let fields =
            TerrainFieldSampler::with_continent_source(world_seed, Arc::clone(&config), continent);
        Ok(Self::assemble(world_seed, cache_capacity, config, fields))
    }

    fn assemble(
        seed: WorldSeed,
        cache_capacity: usize,
        config: Arc<TerrainConfig>,
        fields: TerrainFieldSampler,
    ) -> Self {
        tracing::info!(
            "Terrain generator ready: seed {}, cache capacity {}",
            seed.value(),
            cache_capacity
        );
        Self {
            hydrology: HydrologyNetwork::new(seed, Arc::clone(&config)),
            volcanic: VolcanicSystem::new(seed, Arc::clone(&config)),
            classifier: BiomeClassifier::new(Arc::clone(&config)),
            cache: Mutex::new(BoundedCache::with_eviction(
                cache_capacity,
                config.cache.eviction_fraction,
            )),
            counters: CacheCounters::default(),
            seed,
            config,
            fields,
        }
    }

    /// The world seed.
    #[must_use]
    pub fn seed(&self) -> WorldSeed {
        self.seed
    }

    /// The active config.
    #[must_use]
    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    /// The tile at `(x, y)`, from the cache when possible.
    #[must_use]
    pub fn sample(&self, x: i32, y: i32) -> TerrainSample {
        self.counters.lookups.fetch_add(1, Ordering::Relaxed);
        if let Some(&tile) = self.cache.lock().get(&(x, y)) {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            return tile;
        }
        self.counters.misses.fetch_add(1, Ordering::Relaxed);

        let tile = self.compute(x, y);
        self.store(x, y, tile);
        tile
    }

    /// Computes a tile without reading or writing the tile cache.
    #[must_use]
    pub fn compute(&self, x: i32, y: i32) -> TerrainSample {
        let (tx, ty) = (i64::from(x), i64::from(y));
        let heights = self.fields.height_map(tx, ty);
        let fields = self.fields.sample(tx, ty, &heights);
        if fields.deep_ocean {
            return TerrainSample::deep_ocean(fields.continent);
        }

        let water = self
            .hydrology
            .evaluate(tx, ty, fields.continent, fields.height, &heights);
        let volcanic = self.volcanic.evaluate(
            tx,
            ty,
            fields.height,
            &heights,
            water.river,
            water.river.max(water.capillary),
        );
        let slope = self.fields.slope(tx, ty, fields.height, &heights);

        let input = ClassifyInput {
            height: unit(fields.height),
            moisture: unit(fields.moisture),
            continent: unit(fields.continent),
            slope: slope.slope.max(0.0),
            river: unit(water.river),
            lake: unit(water.lake),
            capillary: unit(water.capillary),
            water_network: unit(water.network),
            lava: unit(volcanic.lava),
            scorched: unit(volcanic.scorched),
            is_cliff: slope.is_cliff,
            is_high_cliff: slope.is_high_cliff && slope.is_cliff,
            coast_jitter: self.fields.coast_jitter(tx, ty),
            has_anomaly: fields.anomaly.is_some(),
        };

        TerrainSample {
            height: input.height,
            moisture: input.moisture,
            continent: input.continent,
            slope: input.slope,
            river_value: input.river,
            lake_value: input.lake,
            capillary_value: input.capillary,
            lava_value: input.lava,
            scorched_value: input.scorched,
            water_network_value: input.water_network,
            is_cliff: input.is_cliff,
            is_high_cliff: input.is_high_cliff,
            anomaly_type: fields.anomaly.map(|a| a.kind),
            anomaly_strength: fields.anomaly.map_or(0.0, |a| a.strength),
            biome: self.classifier.classify(&input),
            rarity: self.classifier.rarity(&input),
        }
    }

    fn store(&self, x: i32, y: i32, tile: TerrainSample) {
        let evicted = self.cache.lock().insert((x, y), tile);
        if evicted > 0 {
            self.counters
                .evictions
                .fetch_add(evicted as u64, Ordering::Relaxed);
            tracing::debug!("Tile cache full, evicted {} oldest tiles", evicted);
        }
    }

    /// Fills the cache for a rectangle of tiles in parallel.
    ///
    /// # Returns
    /// Number of tiles that were computed.
    pub fn prewarm_region(&self, x: i32, y: i32, width: u32, height: u32) -> usize {
        let missing: Vec<TileKey> = {
            let cache = self.cache.lock();
            (0..height)
                .filter_map(|dy| y.checked_add_unsigned(dy))
                .flat_map(|ty| {
                    (0..width)
                        .filter_map(move |dx| x.checked_add_unsigned(dx))
                        .map(move |tx| (tx, ty))
                })
                .filter(|key| !cache.contains_key(key))
                .collect()
        };

        let computed: Vec<(TileKey, TerrainSample)> = missing
            .into_par_iter()
            .map(|(tx, ty)| ((tx, ty), self.compute(tx, ty)))
            .collect();

        let count = computed.len();
        for ((tx, ty), tile) in computed {
            self.store(tx, ty, tile);
        }
        tracing::debug!("Prewarmed {} tiles at ({}, {})", count, x, y);
        count
    }

    /// Resizes the tile cache for a viewport, using the default chunk size.
    pub fn resize_cache_for_viewport(&self, cols: u32, rows: u32) {
        self.resize_cache_for_viewport_sized(cols, rows, CHUNK_SIZE);
    }

    /// Resizes the tile cache for a viewport.
    ///
    /// Capacity becomes the visible tile count times the buffer factor, but
    /// never less than one chunk. Shrinking trims the oldest tiles.
    pub fn resize_cache_for_viewport_sized(&self, cols: u32, rows: u32, chunk_size: u32) {
        let visible = f64::from(cols) * f64::from(rows) * self.config.cache.viewport_buffer_factor;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let buffered = visible.ceil() as usize;
        let chunk = chunk_size as usize;
        let capacity = buffered.max(chunk * chunk);

        let evicted = self.cache.lock().set_capacity(capacity);
        if evicted > 0 {
            self.counters
                .evictions
                .fetch_add(evicted as u64, Ordering::Relaxed);
        }
        tracing::debug!(
            "Tile cache resized to {} for {}x{} viewport, {} tiles evicted",
            capacity,
            cols,
            rows,
            evicted
        );
    }

    /// Drops every cached tile in a chunk, using the default chunk size.
    ///
    /// # Returns
    /// Number of tiles dropped.
    pub fn invalidate_chunk(&self, chunk_x: i32, chunk_y: i32) -> usize {
        self.invalidate_chunk_sized(chunk_x, chunk_y, CHUNK_SIZE)
    }

    /// Drops every cached tile in a chunk.
    ///
    /// # Returns
    /// Number of tiles dropped.
    pub fn invalidate_chunk_sized(&self, chunk_x: i32, chunk_y: i32, chunk_size: u32) -> usize {
        let bounds = ChunkCoord::new(chunk_x, chunk_y).bounds(chunk_size);
        let removed = {
            let mut cache = self.cache.lock();
            bounds
                .tiles()
                .filter(|key| cache.remove(key).is_some())
                .count()
        };
        self.counters
            .invalidated
            .fetch_add(removed as u64, Ordering::Relaxed);
        tracing::debug!(
            "Invalidated chunk {},{}: {} tiles dropped",
            chunk_x,
            chunk_y,
            removed
        );
        removed
    }

    /// Drops every cached tile and every FBM memo.
    pub fn clear_all(&self) {
        let removed = {
            let mut cache = self.cache.lock();
            let len = cache.len();
            cache.clear();
            len
        };
        self.counters
            .invalidated
            .fetch_add(removed as u64, Ordering::Relaxed);
        self.fields.clear_memos();
        self.hydrology.clear_memos();
        self.volcanic.clear_memos();
        tracing::info!("Terrain caches cleared ({} tiles)", removed);
    }

    /// Chunk containing a tile, for the default chunk size.
    #[must_use]
    pub fn chunk_key(x: i32, y: i32) -> ChunkCoord {
        ChunkCoord::from_tile_pos(x, y)
    }

    /// Returns true if any of the four neighbours is water.
    #[must_use]
    pub fn has_adjacent_water(&self, x: i32, y: i32) -> bool {
        [(0, -1), (0, 1), (1, 0), (-1, 0)]
            .into_iter()
            .filter_map(|(dx, dy)| Some((x.checked_add(dx)?, y.checked_add(dy)?)))
            .any(|(nx, ny)| self.sample(nx, ny).is_water())
    }

    /// Tile cache counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }

    /// Number of cached tiles.
    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.cache.lock().len()
    }

    /// Tile cache capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.cache.lock().capacity()
    }

    /// Combined FBM memo counters across every noise channel.
    #[must_use]
    pub fn memo_stats(&self) -> MemoStats {
        self.fields
            .memo_stats()
            .merged(self.hydrology.memo_stats())
            .merged(self.volcanic.memo_stats())
    }
}

fn checked_seed(seed: f64) -> TerrainResult<WorldSeed> {
    if seed.is_finite() {
        Ok(WorldSeed::new(seed))
    } else {
        Err(TerrainError::InvalidSeed(seed))
    }
}

#[inline]
fn unit(v: f64) -> f64 {
    debug_assert!(!v.is_nan(), "terrain field produced NaN");
    v.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_validation() {
        assert!(matches!(
            TerrainGenerator::from_optional_seed(None, 16),
            Err(TerrainError::MissingSeed)
        ));
        assert!(matches!(
            TerrainGenerator::new(f64::NAN, 16),
            Err(TerrainError::InvalidSeed(_))
        ));
        assert!(TerrainGenerator::from_optional_seed(Some(7.0), 16).is_ok());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = TerrainConfig::default();
        config.cache.fbm_memo_capacity = 0;
        assert!(matches!(
            TerrainGenerator::with_config(1.0, 16, config),
            Err(TerrainError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_cache_hit_returns_same_tile() {
        let generator = TerrainGenerator::new(42.0, 64).expect("valid seed");
        let first = generator.sample(10, 10);
        let second = generator.sample(10, 10);
        assert_eq!(first, second);

        let stats = generator.stats();
        assert_eq!(stats.lookups, 2);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_compute_matches_sample() {
        let generator = TerrainGenerator::new(3.0, 64).expect("valid seed");
        assert_eq!(generator.sample(-4, 9), generator.compute(-4, 9));
    }

    #[test]
    fn test_generator_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TerrainGenerator>();
    }

    #[test]
    fn test_resize_floors_at_one_chunk() {
        let generator = TerrainGenerator::new(1.0, 10).expect("valid seed");
        generator.resize_cache_for_viewport(2, 2);
        assert_eq!(generator.capacity(), 400);
        generator.resize_cache_for_viewport(40, 30);
        assert_eq!(generator.capacity(), 1800);
        generator.resize_cache_for_viewport_sized(1, 1, 8);
        assert_eq!(generator.capacity(), 64);
    }

    #[test]
    fn test_clear_all_empties_cache() {
        let generator = TerrainGenerator::new(5.0, 64).expect("valid seed");
        for i in 0..5 {
            let _ = generator.sample(i, 0);
        }
        assert_eq!(generator.cached_len(), 5);
        generator.clear_all();
        assert_eq!(generator.cached_len(), 0);
        assert_eq!(generator.stats().invalidated, 5);
    }
}
