//! # Terrain Field Sampling
//!
//! Turns noise channels into the continuous per-tile fields: continent,
//! elevation, moisture, anomalies and slope.
//!
//! ## Height Map Proxy
//!
//! Hydrology and moisture need the elevation of neighbouring tiles. Running
//! the full elevation pipeline for every neighbour would be recursive, so
//! neighbours read a cheap proxy (base FBM blended with the continent mask)
//! through the [`HeightMap`] trait. Tests substitute their own height maps
//! through the same trait.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::config::{ContinentOptions, TerrainConfig};
use crate::fractal::{FbmOptions, FractalSynthesizer, MemoStats};
use crate::noise::{NoiseChannel, WorldSeed};

/// Elevation lookup for neighbour scans.
pub trait HeightMap {
    /// Height of the tile at `(x, y)`, in `[0, 1]`.
    fn height_at(&self, x: i64, y: i64) -> f64;
}

impl<F> HeightMap for F
where
    F: Fn(i64, i64) -> f64,
{
    #[inline]
    fn height_at(&self, x: i64, y: i64) -> f64 {
        self(x, y)
    }
}

/// Source of the continent mask.
///
/// The production source is [`ContinentField`]. Tests inject fixed values
/// to force specific regions such as open ocean.
pub trait ContinentSource: Send + Sync {
    /// Continent value at `(x, y)`, in `[0, 1]`.
    fn continent_at(&self, x: f64, y: f64) -> f64;

    /// Drops any memoized values.
    fn clear_memo(&self) {}

    /// Memo counters, if the source memoizes.
    fn memo_stats(&self) -> MemoStats {
        MemoStats::default()
    }
}

/// Noise-driven continent mask.
pub struct ContinentField {
    synth: FractalSynthesizer,
    options: ContinentOptions,
}

impl ContinentField {
    /// Creates the continent mask for a world.
    #[must_use]
    pub fn new(seed: WorldSeed, config: &TerrainConfig) -> Self {
        Self {
            synth: channel_synth(seed, NoiseChannel::Continent, config),
            options: config.continent,
        }
    }
}

impl ContinentSource for ContinentField {
    fn continent_at(&self, x: f64, y: f64) -> f64 {
        self.synth.continent_value(x, y, &self.options)
    }

    fn clear_memo(&self) {
        self.synth.clear_memo();
    }

    fn memo_stats(&self) -> MemoStats {
        self.synth.memo_stats()
    }
}

/// Builds the synthesizer for one channel using the configured memo size.
pub(crate) fn channel_synth(
    seed: WorldSeed,
    channel: NoiseChannel,
    config: &TerrainConfig,
) -> FractalSynthesizer {
    FractalSynthesizer::with_memo(
        seed.derive(channel),
        config.cache.fbm_memo_capacity,
        config.cache.eviction_fraction,
    )
}

/// Kind of local terrain anomaly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    /// Exposed rock.
    RockyOutcrop,
    /// Isolated peak.
    LoneMountain,
    /// Stacked rock formation.
    RockFormation,
    /// Flat-topped mesa.
    MesaFormation,
}

impl AnomalyKind {
    /// Picks a kind from a type noise value in `[0, 1]`.
    #[must_use]
    pub fn from_noise(value: f64) -> Self {
        if value < 0.3 {
            Self::RockyOutcrop
        } else if value < 0.5 {
            Self::LoneMountain
        } else if value < 0.7 {
            Self::RockFormation
        } else {
            Self::MesaFormation
        }
    }
}

/// An anomaly present at a tile.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Anomaly {
    /// What kind of anomaly.
    pub kind: AnomalyKind,
    /// Strength in `[0, 1]`.
    pub strength: f64,
}

/// Continuous fields at one tile.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldSample {
    /// Continent mask.
    pub continent: f64,
    /// Final elevation.
    pub height: f64,
    /// Final moisture.
    pub moisture: f64,
    /// Anomaly, if any.
    pub anomaly: Option<Anomaly>,
    /// The tile is open ocean and skipped the rest of the pipeline.
    pub deep_ocean: bool,
}

/// Slope and cliff flags at one tile.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SlopeSample {
    /// Gradient magnitude.
    pub slope: f64,
    /// Slope exceeds the cliff threshold.
    pub is_cliff: bool,
    /// Cliff on high ground.
    pub is_high_cliff: bool,
}

/// Continent value below which a tile is deep ocean.
pub const DEEP_OCEAN_CONTINENT: f64 = crate::classifier::DEEP_OCEAN_THRESHOLD;
/// Height reported for deep ocean tiles.
pub const DEEP_OCEAN_HEIGHT: f64 = 0.2;

/// Neighbours within this Chebyshev distance share the proxy memo.
const PROXY_WINDOW: i64 = 10;
/// Radius of the water-proximity moisture scan.
const WATER_PROXIMITY_RADIUS: i64 = 7;
/// Upwind steps checked for rain shadow.
const RAIN_SHADOW_STEPS: i32 = 5;
/// Prevailing wind direction, not normalized.
const WIND: (f64, f64) = (1.0, 0.2);

/// Samples the continuous fields of a world.
pub struct TerrainFieldSampler {
    config: Arc<TerrainConfig>,
    continent: Box<dyn ContinentSource>,
    height: FractalSynthesizer,
    moisture: FractalSynthesizer,
    detail: FractalSynthesizer,
    coast: FractalSynthesizer,
}

impl TerrainFieldSampler {
    /// Creates a sampler with the noise-driven continent mask.
    #[must_use]
    pub fn new(seed: WorldSeed, config: Arc<TerrainConfig>) -> Self {
        let continent = Box::new(ContinentField::new(seed, &config));
        Self::with_continent_source(seed, config, continent)
    }

    /// Creates a sampler with a custom continent source.
    #[must_use]
    pub fn with_continent_source(
        seed: WorldSeed,
        config: Arc<TerrainConfig>,
        continent: Box<dyn ContinentSource>,
    ) -> Self {
        Self {
            height: channel_synth(seed, NoiseChannel::Height, &config),
            moisture: channel_synth(seed, NoiseChannel::Moisture, &config),
            detail: channel_synth(seed, NoiseChannel::Detail, &config),
            coast: channel_synth(seed, NoiseChannel::Continent, &config),
            continent,
            config,
        }
    }

    /// Continent value at a tile.
    #[inline]
    #[must_use]
    pub fn continent(&self, x: i64, y: i64) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let value = self.continent.continent_at(x as f64, y as f64);
        value
    }

    /// Height map proxy for neighbour scans around `(x, y)`.
    #[must_use]
    pub fn height_map(&self, x: i64, y: i64) -> ElevationProxy<'_> {
        ElevationProxy {
            sampler: self,
            origin: (x, y),
            local: RefCell::new(HashMap::new()),
        }
    }

    /// Proxy elevation: base FBM blended with the continent mask.
    #[must_use]
    pub fn proxy_height(&self, x: i64, y: i64) -> f64 {
        let continent = self.continent(x, y);
        let (fx, fy) = to_f64(x, y);
        let base = self.height.fbm(fx, fy, &self.config.height.fbm());
        let influence = self.config.constants.continent_influence;
        (base * (1.0 - influence) + continent * influence + self.config.constants.height_bias)
            .clamp(0.0, 1.0)
    }

    /// Anomaly at a tile, if the anomaly field crosses its threshold.
    #[must_use]
    pub fn anomaly_at(&self, x: i64, y: i64) -> Option<Anomaly> {
        let options = &self.config.anomaly;
        let (fx, fy) = to_f64(x, y);
        let noise = self.height.fbm(
            fx + 45_000.0,
            fy + 45_000.0,
            &FbmOptions {
                scale: options.frequency,
                octaves: 2,
                persistence: 0.6,
                lacunarity: 2.0,
                ..FbmOptions::DEFAULT
            },
        );
        if noise <= options.threshold {
            return None;
        }

        let strength = ((noise - options.threshold) / (1.0 - options.threshold)).clamp(0.0, 1.0);
        let kind_noise = self.height.fbm(
            fx * 0.7 + 55_000.0,
            fy * 0.7 + 55_000.0,
            &FbmOptions {
                octaves: 1,
                ..FbmOptions::DEFAULT
            },
        );
        Some(Anomaly {
            kind: AnomalyKind::from_noise(kind_noise),
            strength,
        })
    }

    /// Elevation and moisture at a tile.
    pub fn sample<H: HeightMap>(&self, x: i64, y: i64, heights: &H) -> FieldSample {
        let continent = self.continent(x, y);
        if continent < DEEP_OCEAN_CONTINENT {
            tracing::trace!("Tile ({}, {}) is deep ocean", x, y);
            return FieldSample {
                continent,
                height: DEEP_OCEAN_HEIGHT,
                moisture: 1.0,
                anomaly: None,
                deep_ocean: true,
            };
        }

        let config = &self.config;
        let (fx, fy) = to_f64(x, y);

        let region = self.height.fbm(
            fx * config.region.scale,
            fy * config.region.scale,
            &FbmOptions {
                octaves: config.region.octaves,
                persistence: 0.5,
                lacunarity: 2.5,
                ..FbmOptions::DEFAULT
            },
        );
        let anomaly = self.anomaly_at(x, y);

        let mut height = self.base_height(fx, fy, continent, region);
        if let Some(anomaly) = anomaly {
            height = self.apply_anomaly(height, anomaly);
        }
        height = self.apply_mountains(fx, fy, height);

        let constants = &config.constants;
        height = (height + constants.height_bias).min(1.0);
        height = height.powf(constants.height_exponent);
        let detail = self.detail.fbm(fx, fy, &config.detail.fbm()) * constants.detail_amplitude;
        height = (height + detail - constants.detail_amplitude / 2.0).clamp(0.0, 1.0);

        let mut moisture = self.moisture.fbm(fx, fy, &config.moisture.fbm());
        moisture = (moisture + (region - 0.5) * config.region.moisture_influence).clamp(0.0, 1.0);
        let proximity = self.water_proximity(x, y, heights);
        let shadow = self.rain_shadow(x, y, heights);
        let elevation = self.elevation_moisture_factor(height);
        moisture = (moisture * (1.0 + proximity * 0.5) * shadow * elevation).clamp(0.0, 1.0);
        moisture = moisture.powf(constants.moisture_contrast);

        if moisture > 0.65 && height > 0.45 && height < 0.75 {
            height = self.apply_forest_uplift(fx, fy, height);
        }

        FieldSample {
            continent,
            height,
            moisture,
            anomaly,
            deep_ocean: false,
        }
    }

    fn base_height(&self, fx: f64, fy: f64, continent: f64, region: f64) -> f64 {
        let config = &self.config;
        let base = self.height.fbm(fx, fy, &config.height.fbm());
        let influence = config.constants.continent_influence;
        let height = base * (1.0 - influence) + continent * influence;

        let region_influence = config.region.influence;
        (height * (1.0 - region_influence)
            + region * region * region_influence
            + region * region_influence * 0.2)
            .clamp(0.0, 1.0)
    }

    fn apply_anomaly(&self, height: f64, anomaly: Anomaly) -> f64 {
        let options = &self.config.anomaly;
        match anomaly.kind {
            AnomalyKind::LoneMountain if height > 0.35 && height < 0.7 => (height
                + options.mountain_height_boost * anomaly.strength * (height / 0.6).min(1.0))
            .min(0.95),
            AnomalyKind::RockFormation => {
                (height + options.rock_height_boost * (0.7 + anomaly.strength * 0.6)).min(0.9)
            }
            AnomalyKind::MesaFormation if height > 0.4 && height < 0.7 => {
                (height + options.mesa_height_boost * anomaly.strength).min(0.85)
            }
            _ => height,
        }
    }

    fn apply_mountains(&self, fx: f64, fy: f64, height: f64) -> f64 {
        let constants = &self.config.constants;
        let mut height = height;

        let mountain = self.height.fbm(
            fx + 12_000.0,
            fy + 12_000.0,
            &FbmOptions {
                scale: 0.003,
                octaves: 3,
                persistence: 0.7,
                lacunarity: 2.3,
                ..FbmOptions::DEFAULT
            },
        );
        if mountain > 0.58 {
            height = (height + constants.mountain_boost * (mountain - 0.58) * 3.2).min(1.0);
        }

        let range = self.height.fbm(
            fx * constants.mountain_range_scale,
            fy * constants.mountain_range_scale,
            &FbmOptions {
                scale: 1.0,
                octaves: 2,
                persistence: 0.6,
                lacunarity: 1.8,
                ..FbmOptions::DEFAULT
            },
        );
        if range > 0.65 {
            height = (height + constants.mountain_boost * (range - 0.65) * 2.5).min(1.0);
        }
        height
    }

    fn apply_forest_uplift(&self, fx: f64, fy: f64, height: f64) -> f64 {
        let forest = self.height.fbm(
            fx * 1.5 + 25_000.0,
            fy * 1.5 + 25_000.0,
            &FbmOptions {
                scale: 0.004,
                octaves: 2,
                persistence: 0.6,
                ..FbmOptions::DEFAULT
            },
        );
        if forest > 0.7 {
            (height + (forest - 0.7) * self.config.constants.forest_mountain_transition).min(1.0)
        } else {
            height
        }
    }

    /// Moisture gained from standing water within seven tiles, in `[0, 1]`.
    pub fn water_proximity<H: HeightMap>(&self, x: i64, y: i64, heights: &H) -> f64 {
        let water_level = self.config.constants.water_level;
        let radius = WATER_PROXIMITY_RADIUS;
        #[allow(clippy::cast_precision_loss)]
        let radius_f = radius as f64;
        let mut total = 0.0;

        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx == 0 && dy == 0 {
                    continue;
                }
                #[allow(clippy::cast_precision_loss)]
                let distance = ((dx * dx + dy * dy) as f64).sqrt();
                if distance > radius_f {
                    continue;
                }
                let neighbour = heights.height_at(x + dx, y + dy);
                if neighbour < water_level {
                    let falloff = ((radius_f - distance) / radius_f).powi(2);
                    let body = if neighbour < water_level - 0.05 { 1.5 } else { 1.0 };
                    total += falloff * body * 0.2;
                }
            }
        }
        total.min(1.0)
    }

    /// Moisture multiplier in `[0.4, 1]` from terrain rising upwind.
    pub fn rain_shadow<H: HeightMap>(&self, x: i64, y: i64, heights: &H) -> f64 {
        let length = WIND.0.hypot(WIND.1);
        let (wx, wy) = (WIND.0 / length, WIND.1 / length);
        let current = heights.height_at(x, y);

        let mut max_rise: f64 = 0.0;
        for step in 1..=RAIN_SHADOW_STEPS {
            let d = f64::from(step);
            let upwind = heights.height_at(x - round_half_up(wx * d), y - round_half_up(wy * d));
            max_rise = max_rise.max(upwind - current);
        }
        (1.0 - max_rise * 1.5).clamp(0.4, 1.0)
    }

    /// Moisture multiplier by elevation band.
    #[must_use]
    pub fn elevation_moisture_factor(&self, height: f64) -> f64 {
        let water_level = self.config.constants.water_level;
        if height > 0.8 {
            0.8
        } else if height > 0.5 && height < 0.7 {
            1.1
        } else if height > water_level && height < water_level + 0.15 {
            1.2
        } else {
            1.0
        }
    }

    /// Slope from the four neighbours, refined with diagonals near cliffs.
    pub fn slope<H: HeightMap>(&self, x: i64, y: i64, height: f64, heights: &H) -> SlopeSample {
        let cliffs = &self.config.cliffs;
        let n = heights.height_at(x, y - 1);
        let s = heights.height_at(x, y + 1);
        let e = heights.height_at(x + 1, y);
        let w = heights.height_at(x - 1, y);

        let mut slope = (e - w).hypot(n - s);
        if slope > cliffs.threshold * 0.8 {
            let ne = heights.height_at(x + 1, y - 1);
            let nw = heights.height_at(x - 1, y - 1);
            let se = heights.height_at(x + 1, y + 1);
            let sw = heights.height_at(x - 1, y + 1);
            let dx = (e - w) * 0.6 + (ne - nw + se - sw) * 0.2;
            let dy = (n - s) * 0.6 + (nw - sw + ne - se) * 0.2;
            slope = dx.hypot(dy);
        }

        let is_cliff = slope > cliffs.threshold;
        SlopeSample {
            slope,
            is_cliff,
            is_high_cliff: is_cliff && height > cliffs.high_elevation,
        }
    }

    /// Shoreline jitter widening the coastal zones.
    #[must_use]
    pub fn coast_jitter(&self, x: i64, y: i64) -> f64 {
        let (fx, fy) = to_f64(x, y);
        self.coast.fbm(
            fx * 3.0 + 7000.0,
            fy * 3.0 + 7000.0,
            &FbmOptions {
                octaves: 2,
                ..FbmOptions::DEFAULT
            },
        ) * self.config.coastal.jitter_amount
    }

    /// Drops every memoized value.
    pub fn clear_memos(&self) {
        self.continent.clear_memo();
        self.height.clear_memo();
        self.moisture.clear_memo();
        self.detail.clear_memo();
        self.coast.clear_memo();
    }

    /// Combined memo counters.
    #[must_use]
    pub fn memo_stats(&self) -> MemoStats {
        [&self.height, &self.moisture, &self.detail, &self.coast]
            .iter()
            .fold(self.continent.memo_stats(), |acc, s| acc.merged(s.memo_stats()))
    }
}

/// Per-sample height map backed by [`TerrainFieldSampler::proxy_height`].
///
/// Tiles within ten tiles of the origin are memoized for the life of the
/// proxy, which is one tile computation.
pub struct ElevationProxy<'a> {
    sampler: &'a TerrainFieldSampler,
    origin: (i64, i64),
    local: RefCell<HashMap<(i64, i64), f64>>,
}

impl HeightMap for ElevationProxy<'_> {
    fn height_at(&self, x: i64, y: i64) -> f64 {
        let near = (x - self.origin.0).abs() <= PROXY_WINDOW
            && (y - self.origin.1).abs() <= PROXY_WINDOW;
        if !near {
            return self.sampler.proxy_height(x, y);
        }
        if let Some(&h) = self.local.borrow().get(&(x, y)) {
            return h;
        }
        let h = self.sampler.proxy_height(x, y);
        self.local.borrow_mut().insert((x, y), h);
        h
    }
}

/// Rounds half up to a tile offset.
#[inline]
pub(crate) fn round_half_up(v: f64) -> i64 {
    #[allow(clippy::cast_possible_truncation)]
    let rounded = (v + 0.5).floor() as i64;
    rounded
}

#[inline]
pub(crate) fn to_f64(x: i64, y: i64) -> (f64, f64) {
    #[allow(clippy::cast_precision_loss)]
    let pair = (x as f64, y as f64);
    pair
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedContinent(f64);

    impl ContinentSource for FixedContinent {
        fn continent_at(&self, _x: f64, _y: f64) -> f64 {
            self.0
        }
    }

    fn sampler() -> TerrainFieldSampler {
        TerrainFieldSampler::new(WorldSeed::new(42.0), Arc::new(TerrainConfig::default()))
    }

    #[test]
    fn test_deep_ocean_short_circuits() {
        let sampler = TerrainFieldSampler::with_continent_source(
            WorldSeed::new(42.0),
            Arc::new(TerrainConfig::default()),
            Box::new(FixedContinent(0.05)),
        );
        let heights = sampler.height_map(3, 4);
        let fields = sampler.sample(3, 4, &heights);
        assert!(fields.deep_ocean);
        assert_eq!(fields.height, DEEP_OCEAN_HEIGHT);
        assert_eq!(fields.moisture, 1.0);
    }

    #[test]
    fn test_fields_in_range() {
        let sampler = sampler();
        for i in -15..15 {
            let (x, y) = (i64::from(i) * 613, i64::from(i) * -287);
            let heights = sampler.height_map(x, y);
            let fields = sampler.sample(x, y, &heights);
            assert!((0.0..=1.0).contains(&fields.height));
            assert!((0.0..=1.0).contains(&fields.moisture));
            assert!((0.0..=1.0).contains(&fields.continent));
        }
    }

    #[test]
    fn test_rain_shadow_behind_ridge() {
        let sampler = sampler();
        let ridge = |x: i64, _y: i64| if x < 0 { 0.9 } else { 0.4 };
        let flat = |_x: i64, _y: i64| 0.4;

        let shadowed = sampler.rain_shadow(2, 0, &ridge);
        assert!((shadowed - 0.4).abs() < 1e-12, "got {shadowed}");
        assert_eq!(sampler.rain_shadow(2, 0, &flat), 1.0);
    }

    #[test]
    fn test_water_proximity_needs_water() {
        let sampler = sampler();
        let dry = |_x: i64, _y: i64| 0.6;
        let lakeside = |x: i64, _y: i64| if x > 2 { 0.1 } else { 0.6 };

        assert_eq!(sampler.water_proximity(0, 0, &dry), 0.0);
        let wet = sampler.water_proximity(0, 0, &lakeside);
        assert!(wet > 0.0 && wet <= 1.0);
    }

    #[test]
    fn test_cliff_detection() {
        let sampler = sampler();
        let step = |x: i64, _y: i64| if x > 0 { 0.95 } else { 0.5 };
        let flat = |_x: i64, _y: i64| 0.5;

        let cliff = sampler.slope(0, 0, 0.8, &step);
        assert!(cliff.is_cliff && cliff.is_high_cliff);

        let level = sampler.slope(0, 0, 0.8, &flat);
        assert_eq!(level.slope, 0.0);
        assert!(!level.is_cliff && !level.is_high_cliff);
    }

    #[test]
    fn test_proxy_is_stable_inside_window() {
        let sampler = sampler();
        let heights = sampler.height_map(100, 100);
        let first = heights.height_at(105, 95);
        assert_eq!(first.to_bits(), heights.height_at(105, 95).to_bits());
        assert_eq!(
            first.to_bits(),
            sampler.proxy_height(105, 95).to_bits(),
            "memoized value matches a fresh proxy read"
        );
    }

    #[test]
    fn test_anomaly_kind_bands() {
        assert_eq!(AnomalyKind::from_noise(0.1), AnomalyKind::RockyOutcrop);
        assert_eq!(AnomalyKind::from_noise(0.4), AnomalyKind::LoneMountain);
        assert_eq!(AnomalyKind::from_noise(0.6), AnomalyKind::RockFormation);
        assert_eq!(AnomalyKind::from_noise(0.9), AnomalyKind::MesaFormation);
    }
}
