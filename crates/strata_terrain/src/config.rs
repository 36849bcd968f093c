//! # Terrain Configuration
//!
//! Every tuning constant of the generator, grouped by subsystem.
//!
//! The defaults are the shipped world parameters. A config can be loaded
//! from TOML with only the fields being overridden; everything else falls
//! back to its default through `#[serde(default)]`.
//!
//! ```toml
//! [river]
//! river_density = 2.5
//!
//! [cache]
//! fbm_memo_capacity = 4096
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::classifier::{MOUNTAIN_FLOOR, UPLANDS_FLOOR};
use crate::error::{TerrainError, TerrainResult};
use crate::fractal::FbmOptions;

/// Complete generator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TerrainConfig {
    /// Continent sigmoid mask.
    pub continent: ContinentOptions,
    /// Very low frequency regional variation.
    pub region: RegionOptions,
    /// Base elevation FBM.
    pub height: HeightOptions,
    /// Raw moisture FBM.
    pub moisture: MoistureOptions,
    /// Small-scale elevation detail FBM.
    pub detail: DetailOptions,
    /// River network.
    pub river: RiverOptions,
    /// Capillary streams.
    pub capillary: CapillaryOptions,
    /// Lakes and ponds.
    pub lake: LakeOptions,
    /// Lava fields.
    pub lava: LavaOptions,
    /// Scorched ground around volcanic terrain.
    pub scorched: ScorchedOptions,
    /// Snow moisture cutoffs for the high elevation bands.
    pub snow: SnowOptions,
    /// Cliff detection.
    pub cliffs: CliffOptions,
    /// Global shaping constants.
    pub constants: TerrainConstants,
    /// Coastal zone widths.
    pub coastal: CoastalOptions,
    /// Connecting water channels.
    pub water_network: WaterNetworkOptions,
    /// Terrain anomalies.
    pub anomaly: AnomalyOptions,
    /// Tile cache and FBM memo sizing.
    pub cache: CacheOptions,
}

/// Declares a plain FBM section with its own defaults.
///
/// Each section needs a distinct type so a partially specified TOML table
/// falls back to that section's defaults rather than generic FBM ones.
macro_rules! fbm_section {
    ($(#[$doc:meta])* $name:ident { $scale:expr, $octaves:expr, $persistence:expr, $lacunarity:expr }) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
        #[serde(default)]
        pub struct $name {
            /// Base frequency.
            pub scale: f64,
            /// Octave count.
            pub octaves: u32,
            /// Amplitude decay per octave.
            pub persistence: f64,
            /// Frequency growth per octave.
            pub lacunarity: f64,
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    scale: $scale,
                    octaves: $octaves,
                    persistence: $persistence,
                    lacunarity: $lacunarity,
                }
            }
        }

        impl $name {
            /// FBM parameters for this section.
            #[must_use]
            pub const fn fbm(&self) -> FbmOptions {
                FbmOptions {
                    scale: self.scale,
                    octaves: self.octaves,
                    persistence: self.persistence,
                    lacunarity: self.lacunarity,
                    ..FbmOptions::DEFAULT
                }
            }
        }
    };
}

fbm_section!(
    /// Base elevation FBM.
    HeightOptions { 0.0038, 5, 0.68, 2.2 }
);

fbm_section!(
    /// Raw moisture FBM.
    MoistureOptions { 0.0048, 4, 0.7, 2.4 }
);

fbm_section!(
    /// Small-scale elevation detail FBM.
    DetailOptions { 0.04, 2, 0.5, 2.0 }
);

/// Continent sigmoid mask.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContinentOptions {
    /// Base FBM scale.
    pub scale: f64,
    /// Sigmoid midpoint.
    pub threshold: f64,
    /// Coastline edge FBM scale.
    pub edge_scale: f64,
    /// Edge noise amplitude.
    pub edge_amount: f64,
    /// Sigmoid steepness.
    pub sharpness: f64,
}

impl Default for ContinentOptions {
    fn default() -> Self {
        Self {
            scale: 0.0003,
            threshold: 0.66,
            edge_scale: 0.0025,
            edge_amount: 0.45,
            sharpness: 2.2,
        }
    }
}

/// Region FBM blended into elevation and moisture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionOptions {
    /// Coordinate pre-scale applied before sampling.
    pub scale: f64,
    /// Octave count.
    pub octaves: u32,
    /// Weight of the region term in elevation.
    pub influence: f64,
    /// Weight of the region term in moisture.
    pub moisture_influence: f64,
}

impl Default for RegionOptions {
    fn default() -> Self {
        Self {
            scale: 0.0003,
            octaves: 2,
            influence: 0.30,
            moisture_influence: 0.4,
        }
    }
}

/// River network shaping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiverOptions {
    /// Base FBM scale.
    pub scale: f64,
    /// Overall intensity multiplier.
    pub river_density: f64,
    /// Intensity needed before a river appears.
    pub river_threshold: f64,
    /// Output width multiplier.
    pub river_width: f64,
    /// Weight of the downhill drop.
    pub flow_directionality: f64,
    /// Arterial river strength.
    pub arterial_river_factor: f64,
    /// Height below which a tile counts as standing water.
    pub water_level: f64,
    /// Weight of the inverted ridge channel.
    pub ridge_sharpness: f64,
    /// Pull toward nearby water bodies.
    pub lake_influence: f64,
    /// Branch strength.
    pub branching_factor: f64,
    /// How strongly flat ground suppresses rivers.
    pub flow_constraint: f64,
    /// Mountain source bonus.
    pub mountain_source_factor: f64,
    /// Tributary bonus on arterial rivers.
    pub tributary_factor: f64,
    /// Highland spring frequency and bonus.
    pub highland_spring_factor: f64,
    /// Network noise boost.
    pub network_connectivity: f64,
}

impl Default for RiverOptions {
    fn default() -> Self {
        Self {
            scale: 0.0022,
            river_density: 2.2,
            river_threshold: 0.52,
            river_width: 0.75,
            flow_directionality: 0.85,
            arterial_river_factor: 0.85,
            water_level: 0.31,
            ridge_sharpness: 2.5,
            lake_influence: 0.7,
            branching_factor: 0.9,
            flow_constraint: 0.75,
            mountain_source_factor: 0.9,
            tributary_factor: 0.85,
            highland_spring_factor: 0.75,
            network_connectivity: 0.7,
        }
    }
}

/// Thin capillary streams.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapillaryOptions {
    /// Base FBM scale.
    pub scale: f64,
    /// Intensity multiplier.
    pub density: f64,
    /// Intensity needed before a stream appears.
    pub threshold: f64,
    /// Lowest height carrying capillaries.
    pub min_height: f64,
    /// Highest height carrying capillaries.
    pub max_height: f64,
    /// Standing water height.
    pub water_level: f64,
    /// How much the connection noise lowers the threshold.
    pub connectivity_factor: f64,
    /// Output width multiplier.
    pub thinness_factor: f64,
}

impl Default for CapillaryOptions {
    fn default() -> Self {
        Self {
            scale: 0.006,
            density: 1.6,
            threshold: 0.78,
            min_height: 0.33,
            max_height: 0.85,
            water_level: 0.31,
            connectivity_factor: 0.85,
            thinness_factor: 0.08,
        }
    }
}

/// Lakes and ponds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LakeOptions {
    /// Base FBM scale.
    pub scale: f64,
    /// Intensity needed before a lake appears.
    pub lake_threshold: f64,
    /// Lowest lake height.
    pub min_height: f64,
    /// Highest lake height.
    pub max_height: f64,
    /// River intensity that counts as feeding a lake.
    pub min_river_influence: f64,
    /// Blend between shape noise and a flat shape.
    pub lake_smoothness: f64,
    /// Pond frequency.
    pub small_pond_frequency: f64,
    /// Pond intensity multiplier.
    pub pond_size: f64,
    /// Lowest pond height.
    pub pond_min_height: f64,
    /// Highest pond height.
    pub pond_max_height: f64,
    /// Radius that must be free of rivers for a pond.
    pub avoid_water_distance: u32,
}

impl Default for LakeOptions {
    fn default() -> Self {
        Self {
            scale: 0.0015,
            lake_threshold: 0.85,
            min_height: 0.35,
            max_height: 0.65,
            min_river_influence: 0.25,
            lake_smoothness: 0.7,
            small_pond_frequency: 0.95,
            pond_size: 0.1,
            pond_min_height: 0.42,
            pond_max_height: 0.7,
            avoid_water_distance: 4,
        }
    }
}

/// Lava fields.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LavaOptions {
    /// Base FBM scale.
    pub scale: f64,
    /// Noise needed before lava appears.
    pub lava_threshold: f64,
    /// Lowest lava height.
    pub min_height: f64,
    /// Intensity multiplier.
    pub lava_concentration: f64,
    /// Second intensity multiplier.
    pub flow_intensity: f64,
    /// Height above which lava is evaluated at all.
    pub gate_height: f64,
}

impl Default for LavaOptions {
    fn default() -> Self {
        Self {
            scale: 0.002,
            lava_threshold: 0.89,
            min_height: 0.67,
            lava_concentration: 0.95,
            flow_intensity: 1.8,
            gate_height: 0.65,
        }
    }
}

/// Scorched ground.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorchedOptions {
    /// Height above which high ground may scorch without lava.
    pub min_height: f64,
    /// Trigger noise needed on high ground.
    pub trigger_threshold: f64,
    /// Intensity noise floor.
    pub intensity_floor: f64,
    /// Intensity gain above the floor.
    pub intensity_gain: f64,
    /// Water intensity that suppresses scorching.
    pub max_water: f64,
}

impl Default for ScorchedOptions {
    fn default() -> Self {
        Self {
            min_height: 0.65,
            trigger_threshold: 0.75,
            intensity_floor: 0.45,
            intensity_gain: 1.65,
            max_water: 0.1,
        }
    }
}

/// Snow moisture cutoffs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnowOptions {
    /// Lower edge of the high hills band.
    pub elevation_threshold: f64,
    /// Moisture for snow on peaks.
    pub high_moisture_threshold: f64,
    /// Moisture for snow on mountains.
    pub mid_moisture_threshold: f64,
    /// Moisture for snow on high hills.
    pub low_moisture_threshold: f64,
}

impl Default for SnowOptions {
    fn default() -> Self {
        Self {
            elevation_threshold: 0.78,
            high_moisture_threshold: 0.5,
            mid_moisture_threshold: 0.6,
            low_moisture_threshold: 0.75,
        }
    }
}

/// Cliff detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliffOptions {
    /// Slope above which a tile is a cliff.
    pub threshold: f64,
    /// Height above which a cliff is a high cliff.
    pub high_elevation: f64,
}

impl Default for CliffOptions {
    fn default() -> Self {
        Self {
            threshold: 0.18,
            high_elevation: 0.7,
        }
    }
}

/// Global shaping constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConstants {
    /// Weight of the continent mask in elevation.
    pub continent_influence: f64,
    /// Standing water height.
    pub water_level: f64,
    /// Uplift added before the peak exponent.
    pub height_bias: f64,
    /// Exponent exaggerating peaks.
    pub height_exponent: f64,
    /// Amplitude of the detail layer.
    pub detail_amplitude: f64,
    /// Strength of mountain uplift.
    pub mountain_boost: f64,
    /// Coordinate pre-scale of the mountain range field.
    pub mountain_range_scale: f64,
    /// Scorched intensity multiplier.
    pub scorched_frequency: f64,
    /// Moisture contrast exponent.
    pub moisture_contrast: f64,
    /// River intensity multiplier.
    pub river_network_factor: f64,
    /// Forest uplift gain.
    pub forest_mountain_transition: f64,
}

impl Default for TerrainConstants {
    fn default() -> Self {
        Self {
            continent_influence: 0.70,
            water_level: 0.31,
            height_bias: 0.10,
            height_exponent: 1.15,
            detail_amplitude: 0.08,
            mountain_boost: 0.25,
            mountain_range_scale: 0.0015,
            scorched_frequency: 0.7,
            moisture_contrast: 1.2,
            river_network_factor: 0.9,
            forest_mountain_transition: 0.55,
        }
    }
}

/// Coastal zone widths above the water level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoastalOptions {
    /// Beach zone width.
    pub primary_zone_width: f64,
    /// Dune zone width.
    pub secondary_zone_width: f64,
    /// Inland coastal zone width.
    pub tertiary_zone_width: f64,
    /// Slope above which the beach zone is a sea cliff.
    pub cliff_threshold: f64,
    /// Amplitude of the shoreline jitter.
    pub jitter_amount: f64,
}

impl Default for CoastalOptions {
    fn default() -> Self {
        Self {
            primary_zone_width: 0.03,
            secondary_zone_width: 0.05,
            tertiary_zone_width: 0.07,
            cliff_threshold: 0.10,
            jitter_amount: 0.015,
        }
    }
}

/// Connecting water channels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaterNetworkOptions {
    /// Base FBM scale.
    pub scale: f64,
    /// Intensity needed before a channel appears.
    pub channel_threshold: f64,
    /// Output width multiplier.
    pub connection_width: f64,
    /// Weight of the ridged network noise.
    pub connection_factor: f64,
    /// How quickly channels fade with height.
    pub avoid_mountains_strength: f64,
    /// Highest height carrying channels.
    pub max_height: f64,
}

impl Default for WaterNetworkOptions {
    fn default() -> Self {
        Self {
            scale: 0.002,
            channel_threshold: 0.65,
            connection_width: 0.8,
            connection_factor: 0.85,
            avoid_mountains_strength: 0.8,
            max_height: 0.85,
        }
    }
}

/// Terrain anomalies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyOptions {
    /// Noise needed before an anomaly appears.
    pub threshold: f64,
    /// Lone mountain uplift.
    pub mountain_height_boost: f64,
    /// Rock formation uplift.
    pub rock_height_boost: f64,
    /// Mesa uplift.
    pub mesa_height_boost: f64,
    /// FBM scale of the anomaly field.
    pub frequency: f64,
}

impl Default for AnomalyOptions {
    fn default() -> Self {
        Self {
            threshold: 0.88,
            mountain_height_boost: 0.25,
            rock_height_boost: 0.08,
            mesa_height_boost: 0.15,
            frequency: 0.012,
        }
    }
}

/// Tile cache and FBM memo sizing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheOptions {
    /// Viewport capacity multiplier.
    pub viewport_buffer_factor: f64,
    /// Entries per FBM memo.
    pub fbm_memo_capacity: usize,
    /// Fraction of capacity evicted when a cache is full.
    pub eviction_fraction: f64,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            viewport_buffer_factor: 1.5,
            fbm_memo_capacity: 2048,
            eviction_fraction: 0.25,
        }
    }
}

impl TerrainConfig {
    /// Parses a config from TOML text and validates it.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML or a value is out of range.
    pub fn from_toml_str(text: &str) -> TerrainResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or fails validation.
    pub fn load(path: impl AsRef<Path>) -> TerrainResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| TerrainError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::info!("Loaded terrain config from {}", path.display());
        Ok(config)
    }

    /// Checks that every value is usable by the generator.
    ///
    /// # Errors
    ///
    /// Returns [`TerrainError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> TerrainResult<()> {
        positive("continent.scale", self.continent.scale)?;
        positive("continent.edge_scale", self.continent.edge_scale)?;
        positive("continent.sharpness", self.continent.sharpness)?;
        finite("continent.threshold", self.continent.threshold)?;
        finite("continent.edge_amount", self.continent.edge_amount)?;

        positive("region.scale", self.region.scale)?;
        at_least_one("region.octaves", self.region.octaves)?;
        unit("region.influence", self.region.influence)?;
        finite("region.moisture_influence", self.region.moisture_influence)?;

        fbm_fields(
            ["height.scale", "height.octaves", "height.persistence", "height.lacunarity"],
            &self.height.fbm(),
        )?;
        fbm_fields(
            ["moisture.scale", "moisture.octaves", "moisture.persistence", "moisture.lacunarity"],
            &self.moisture.fbm(),
        )?;
        fbm_fields(
            ["detail.scale", "detail.octaves", "detail.persistence", "detail.lacunarity"],
            &self.detail.fbm(),
        )?;

        positive("river.scale", self.river.scale)?;
        positive("river.river_density", self.river.river_density)?;
        finite("river.river_threshold", self.river.river_threshold)?;
        positive("river.river_width", self.river.river_width)?;
        unit("river.water_level", self.river.water_level)?;
        unit("river.flow_constraint", self.river.flow_constraint)?;

        positive("capillary.scale", self.capillary.scale)?;
        ordered(
            "capillary.max_height",
            self.capillary.min_height,
            self.capillary.max_height,
        )?;
        positive("capillary.thinness_factor", self.capillary.thinness_factor)?;

        positive("lake.scale", self.lake.scale)?;
        ordered("lake.max_height", self.lake.min_height, self.lake.max_height)?;
        ordered(
            "lake.pond_max_height",
            self.lake.pond_min_height,
            self.lake.pond_max_height,
        )?;
        unit("lake.lake_smoothness", self.lake.lake_smoothness)?;

        positive("lava.scale", self.lava.scale)?;
        finite("lava.lava_threshold", self.lava.lava_threshold)?;
        finite("scorched.intensity_gain", self.scorched.intensity_gain)?;

        unit("constants.water_level", self.constants.water_level)?;
        unit("constants.continent_influence", self.constants.continent_influence)?;
        positive("constants.height_exponent", self.constants.height_exponent)?;
        positive("constants.moisture_contrast", self.constants.moisture_contrast)?;
        positive("constants.mountain_range_scale", self.constants.mountain_range_scale)?;

        positive("cliffs.threshold", self.cliffs.threshold)?;
        positive("water_network.scale", self.water_network.scale)?;
        positive("anomaly.frequency", self.anomaly.frequency)?;
        if !(self.anomaly.threshold > 0.0 && self.anomaly.threshold < 1.0) {
            return Err(invalid("anomaly.threshold", "must be inside (0, 1)"));
        }

        let snow = &self.snow;
        if !(snow.elevation_threshold > UPLANDS_FLOOR && snow.elevation_threshold < MOUNTAIN_FLOOR) {
            return Err(invalid(
                "snow.elevation_threshold",
                "must lie between the uplands and mountain band floors",
            ));
        }

        let constants = &self.constants;
        let river = &self.river;
        let capillary = &self.capillary;
        let lake = &self.lake;
        let lava = &self.lava;
        let scorched = &self.scorched;
        let coastal = &self.coastal;
        let network = &self.water_network;
        let anomaly = &self.anomaly;
        all_finite(&[
            ("constants.height_bias", constants.height_bias),
            ("constants.detail_amplitude", constants.detail_amplitude),
            ("constants.mountain_boost", constants.mountain_boost),
            ("constants.scorched_frequency", constants.scorched_frequency),
            ("constants.river_network_factor", constants.river_network_factor),
            ("constants.forest_mountain_transition", constants.forest_mountain_transition),
            ("river.flow_directionality", river.flow_directionality),
            ("river.arterial_river_factor", river.arterial_river_factor),
            ("river.ridge_sharpness", river.ridge_sharpness),
            ("river.lake_influence", river.lake_influence),
            ("river.branching_factor", river.branching_factor),
            ("river.mountain_source_factor", river.mountain_source_factor),
            ("river.tributary_factor", river.tributary_factor),
            ("river.highland_spring_factor", river.highland_spring_factor),
            ("river.network_connectivity", river.network_connectivity),
            ("capillary.density", capillary.density),
            ("capillary.threshold", capillary.threshold),
            ("capillary.water_level", capillary.water_level),
            ("capillary.connectivity_factor", capillary.connectivity_factor),
            ("lake.lake_threshold", lake.lake_threshold),
            ("lake.min_river_influence", lake.min_river_influence),
            ("lake.small_pond_frequency", lake.small_pond_frequency),
            ("lake.pond_size", lake.pond_size),
            ("lava.min_height", lava.min_height),
            ("lava.lava_concentration", lava.lava_concentration),
            ("lava.flow_intensity", lava.flow_intensity),
            ("lava.gate_height", lava.gate_height),
            ("scorched.min_height", scorched.min_height),
            ("scorched.trigger_threshold", scorched.trigger_threshold),
            ("scorched.intensity_floor", scorched.intensity_floor),
            ("scorched.max_water", scorched.max_water),
            ("snow.high_moisture_threshold", snow.high_moisture_threshold),
            ("snow.mid_moisture_threshold", snow.mid_moisture_threshold),
            ("snow.low_moisture_threshold", snow.low_moisture_threshold),
            ("cliffs.high_elevation", self.cliffs.high_elevation),
            ("coastal.primary_zone_width", coastal.primary_zone_width),
            ("coastal.secondary_zone_width", coastal.secondary_zone_width),
            ("coastal.tertiary_zone_width", coastal.tertiary_zone_width),
            ("coastal.cliff_threshold", coastal.cliff_threshold),
            ("coastal.jitter_amount", coastal.jitter_amount),
            ("water_network.channel_threshold", network.channel_threshold),
            ("water_network.connection_width", network.connection_width),
            ("water_network.connection_factor", network.connection_factor),
            ("water_network.avoid_mountains_strength", network.avoid_mountains_strength),
            ("water_network.max_height", network.max_height),
            ("anomaly.mountain_height_boost", anomaly.mountain_height_boost),
            ("anomaly.rock_height_boost", anomaly.rock_height_boost),
            ("anomaly.mesa_height_boost", anomaly.mesa_height_boost),
        ])?;

        if self.cache.fbm_memo_capacity == 0 {
            return Err(invalid("cache.fbm_memo_capacity", "must be at least 1"));
        }
        if !(self.cache.viewport_buffer_factor.is_finite() && self.cache.viewport_buffer_factor >= 1.0)
        {
            return Err(invalid("cache.viewport_buffer_factor", "must be at least 1"));
        }
        if !(self.cache.eviction_fraction > 0.0 && self.cache.eviction_fraction <= 1.0) {
            return Err(invalid("cache.eviction_fraction", "must be inside (0, 1]"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &'static str) -> TerrainError {
    TerrainError::InvalidConfig { field, reason }
}

fn finite(field: &'static str, value: f64) -> TerrainResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(invalid(field, "must be finite"))
    }
}

fn positive(field: &'static str, value: f64) -> TerrainResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, "must be positive"))
    }
}

fn unit(field: &'static str, value: f64) -> TerrainResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(field, "must be inside [0, 1]"))
    }
}

fn at_least_one(field: &'static str, value: u32) -> TerrainResult<()> {
    if value >= 1 {
        Ok(())
    } else {
        Err(invalid(field, "must be at least 1"))
    }
}

fn ordered(field: &'static str, min: f64, max: f64) -> TerrainResult<()> {
    if min.is_finite() && max.is_finite() && min < max {
        Ok(())
    } else {
        Err(invalid(field, "must be above the matching minimum"))
    }
}

fn fbm_fields(fields: [&'static str; 4], options: &FbmOptions) -> TerrainResult<()> {
    let [scale, octaves, persistence, lacunarity] = fields;
    positive(scale, options.scale)?;
    at_least_one(octaves, options.octaves)?;
    finite(persistence, options.persistence)?;
    positive(lacunarity, options.lacunarity)
}

fn all_finite(fields: &[(&'static str, f64)]) -> TerrainResult<()> {
    fields
        .iter()
        .try_for_each(|&(field, value)| finite(field, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        TerrainConfig::default()
            .validate()
            .expect("shipped defaults must validate");
    }

    #[test]
    fn test_default_fbm_sections() {
        let config = TerrainConfig::default();
        assert_eq!(config.height.octaves, 5);
        assert!((config.height.persistence - 0.68).abs() < 1e-12);
        assert_eq!(config.moisture.octaves, 4);
        assert!((config.detail.scale - 0.04).abs() < 1e-12);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = TerrainConfig::from_toml_str(
            r"
            [river]
            river_density = 3.0

            [cache]
            fbm_memo_capacity = 64
            ",
        )
        .expect("valid partial config");

        assert!((config.river.river_density - 3.0).abs() < 1e-12);
        assert!((config.river.river_threshold - 0.52).abs() < 1e-12);
        assert_eq!(config.cache.fbm_memo_capacity, 64);
        assert_eq!(config.lake, LakeOptions::default());
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        let err = TerrainConfig::from_toml_str("[lake]\nmin_height = 0.9\n")
            .expect_err("min above max");
        assert!(matches!(
            err,
            TerrainError::InvalidConfig { field: "lake.max_height", .. }
        ));

        let err = TerrainConfig::from_toml_str("[height]\noctaves = 0\n").expect_err("no octaves");
        assert!(matches!(
            err,
            TerrainError::InvalidConfig { field: "height.octaves", .. }
        ));
    }

    #[test]
    fn test_rejects_non_finite_values() {
        for text in [
            "[constants]\nheight_bias = nan\n",
            "[constants]\nmountain_boost = inf\n",
            "[height]\npersistence = nan\n",
            "[scorched]\nintensity_floor = -inf\n",
            "[anomaly]\nrock_height_boost = nan\n",
        ] {
            let err = TerrainConfig::from_toml_str(text).expect_err(text);
            assert!(
                matches!(err, TerrainError::InvalidConfig { reason: "must be finite", .. }),
                "{text}: {err}"
            );
        }
    }

    #[test]
    fn test_snow_threshold_stays_between_bands() {
        for text in [
            "[snow]\nelevation_threshold = nan\n",
            "[snow]\nelevation_threshold = 0.5\n",
            "[snow]\nelevation_threshold = 0.9\n",
        ] {
            let err = TerrainConfig::from_toml_str(text).expect_err(text);
            assert!(matches!(
                err,
                TerrainError::InvalidConfig { field: "snow.elevation_threshold", .. }
            ));
        }
        assert!(TerrainConfig::from_toml_str("[snow]\nelevation_threshold = 0.7\n").is_ok());
    }

    #[test]
    fn test_rejects_malformed_toml() {
        let err = TerrainConfig::from_toml_str("[river\n").expect_err("broken table header");
        assert!(matches!(err, TerrainError::ConfigParse(_)));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = TerrainConfig::load("/definitely/not/here/terrain.toml").expect_err("missing");
        assert!(err.to_string().contains("terrain.toml"));
    }
}
