//! # Biome Classification
//!
//! Maps a tile's fields to a [`Biome`] and a [`Rarity`].
//!
//! ## Priority
//!
//! Classification walks [`PRIORITY_RULES`] in order and takes the first
//! biome produced:
//!
//! 1. Lava
//! 2. Ocean and shallows
//! 3. Coastal zones
//! 4. Lakes, rivers, streams, rivulets, water channels
//! 5. Scorched ground
//! 6. Cliffs
//!
//! Tiles no rule claims fall through to the elevation band table, which
//! picks a biome by moisture within the tile's height band.

use std::sync::Arc;

use crate::biome::catalog::{
    basins, cliff, coastal, high_hills, lava, lowlands, midlands, mountain, ocean, peaks, plains,
    scorched, uplands, water,
};
use crate::biome::{Biome, Rarity};
use crate::config::{SnowOptions, TerrainConfig};

/// Lava intensity that claims a tile.
pub const LAVA_THRESHOLD: f64 = 0.1;
/// Continent value below which a tile is deep ocean.
pub const DEEP_OCEAN_THRESHOLD: f64 = 0.08;
/// Continent value below which a tile is ocean.
pub const OCEAN_THRESHOLD: f64 = 0.19;
/// Continent value below which a tile is sea.
pub const SEA_THRESHOLD: f64 = 0.30;
/// Lake intensity that claims a tile.
pub const LAKE_THRESHOLD: f64 = 0.25;
/// River intensity for a full river.
pub const RIVER_THRESHOLD: f64 = 0.30;
/// River intensity for a stream.
pub const STREAM_THRESHOLD: f64 = 0.20;
/// Continent value rivers and streams need.
pub const RIVER_MIN_CONTINENT: f64 = 0.2;
/// Capillary intensity for a rivulet.
pub const RIVULET_THRESHOLD: f64 = 0.04;
/// Channel intensity for a water channel.
pub const WATER_CHANNEL_THRESHOLD: f64 = 0.2;
/// Scorched intensity that claims a tile.
pub const SCORCHED_THRESHOLD: f64 = 0.2;
/// Lower edge of the mountain band. Snowy high hills must start below it.
pub const MOUNTAIN_FLOOR: f64 = 0.85;
/// Lower edge of the uplands band. Snowy high hills must start above it.
pub const UPLANDS_FLOOR: f64 = 0.58;

/// Slope above which steepness adds rarity.
const RARITY_SLOPE_THRESHOLD: f64 = 0.08;
/// Rarity bonus for cliffs and for anomalies.
const RARITY_FEATURE_BONUS: f64 = 8.0;

/// Everything the classifier looks at for one tile.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ClassifyInput {
    /// Elevation.
    pub height: f64,
    /// Moisture.
    pub moisture: f64,
    /// Continent mask.
    pub continent: f64,
    /// Gradient magnitude.
    pub slope: f64,
    /// River intensity.
    pub river: f64,
    /// Lake intensity.
    pub lake: f64,
    /// Capillary intensity.
    pub capillary: f64,
    /// Water channel intensity.
    pub water_network: f64,
    /// Lava intensity.
    pub lava: f64,
    /// Scorched intensity.
    pub scorched: f64,
    /// Slope exceeds the cliff threshold.
    pub is_cliff: bool,
    /// Cliff on high ground.
    pub is_high_cliff: bool,
    /// Shoreline jitter added to the coastal zone bounds.
    pub coast_jitter: f64,
    /// The tile carries a terrain anomaly.
    pub has_anomaly: bool,
}

impl ClassifyInput {
    /// Inland dry ground with only height and moisture set.
    #[must_use]
    pub fn dry_land(height: f64, moisture: f64) -> Self {
        Self {
            height,
            moisture,
            continent: 1.0,
            ..Self::default()
        }
    }
}

/// One step of the priority chain.
#[derive(Clone, Copy)]
pub struct ClassifierRule {
    /// Rule name, reported by [`BiomeClassifier::explain`].
    pub name: &'static str,
    /// Returns a biome if the rule claims the tile.
    pub apply: fn(&ClassifyInput, &TerrainConfig) -> Option<Biome>,
}

/// The priority chain, highest priority first.
pub const PRIORITY_RULES: &[ClassifierRule] = &[
    ClassifierRule { name: "lava", apply: lava_rule },
    ClassifierRule { name: "ocean", apply: ocean_rule },
    ClassifierRule { name: "coastal", apply: coastal_rule },
    ClassifierRule { name: "lake", apply: lake_rule },
    ClassifierRule { name: "river", apply: river_rule },
    ClassifierRule { name: "rivulet", apply: rivulet_rule },
    ClassifierRule { name: "water_channel", apply: water_channel_rule },
    ClassifierRule { name: "scorched", apply: scorched_rule },
    ClassifierRule { name: "cliff", apply: cliff_rule },
];

fn lava_rule(input: &ClassifyInput, _: &TerrainConfig) -> Option<Biome> {
    let v = input.lava;
    (v > LAVA_THRESHOLD).then(|| match v {
        v if v > 0.85 => lava::MAGMA_FLOW,
        v if v > 0.65 => lava::LAVA_FLOW,
        v if v > 0.4 => lava::VOLCANIC_ROCK,
        _ => lava::VOLCANIC_SOIL,
    })
}

fn ocean_rule(input: &ClassifyInput, config: &TerrainConfig) -> Option<Biome> {
    if input.continent < DEEP_OCEAN_THRESHOLD {
        Some(ocean::DEEP_OCEAN)
    } else if input.continent < OCEAN_THRESHOLD {
        Some(ocean::OCEAN)
    } else if input.continent < SEA_THRESHOLD {
        Some(ocean::SEA)
    } else if input.height < config.constants.water_level {
        Some(ocean::SHALLOWS)
    } else {
        None
    }
}

fn coastal_rule(input: &ClassifyInput, config: &TerrainConfig) -> Option<Biome> {
    let zones = &config.coastal;
    let shore = config.constants.water_level + input.coast_jitter;
    let primary = shore + zones.primary_zone_width;
    let secondary = primary + zones.secondary_zone_width;
    let tertiary = secondary + zones.tertiary_zone_width;
    let (h, m) = (input.height, input.moisture);

    if h < primary {
        Some(if input.slope > zones.cliff_threshold {
            coastal::SEA_CLIFF
        } else if m < 0.4 {
            coastal::SANDY_BEACH
        } else if m < 0.7 {
            coastal::ROCKY_SHORE
        } else {
            coastal::MARSHY_SHORE
        })
    } else if h < secondary {
        Some(if m < 0.35 {
            coastal::DUNES
        } else if m < 0.65 {
            coastal::LITTORAL_SCRUB
        } else {
            coastal::SALT_MEADOW
        })
    } else if h < tertiary {
        Some(if m < 0.3 {
            coastal::FLATS
        } else if m < 0.6 {
            coastal::THICKET
        } else {
            coastal::GROVE
        })
    } else {
        None
    }
}

fn lake_rule(input: &ClassifyInput, _: &TerrainConfig) -> Option<Biome> {
    (input.lake > LAKE_THRESHOLD).then(|| {
        if input.height > 0.7 {
            water::MOUNTAIN_LAKE
        } else {
            water::LAKE
        }
    })
}

fn river_rule(input: &ClassifyInput, _: &TerrainConfig) -> Option<Biome> {
    if input.continent <= RIVER_MIN_CONTINENT {
        return None;
    }
    if input.river > RIVER_THRESHOLD {
        Some(if input.height > 0.75 {
            water::MOUNTAIN_RIVER
        } else {
            water::RIVER
        })
    } else if input.river > STREAM_THRESHOLD {
        Some(water::STREAM)
    } else {
        None
    }
}

fn rivulet_rule(input: &ClassifyInput, _: &TerrainConfig) -> Option<Biome> {
    (input.capillary > RIVULET_THRESHOLD).then_some(water::RIVULET)
}

fn water_channel_rule(input: &ClassifyInput, _: &TerrainConfig) -> Option<Biome> {
    (input.water_network > WATER_CHANNEL_THRESHOLD)
        .then(|| Biome::water_channel(input.water_network))
}

fn scorched_rule(input: &ClassifyInput, _: &TerrainConfig) -> Option<Biome> {
    let v = input.scorched;
    (v > SCORCHED_THRESHOLD).then(|| match v {
        v if v > 0.7 => scorched::ACTIVE_VOLCANO,
        v if v > 0.55 => scorched::VOLCANIC_CALDERA,
        v if v > 0.4 => scorched::VOLCANIC_ASH,
        _ => scorched::LAVA_FIELDS,
    })
}

fn cliff_rule(input: &ClassifyInput, _: &TerrainConfig) -> Option<Biome> {
    let (h, m) = (input.height, input.moisture);
    if input.is_high_cliff {
        Some(if h > 0.9 {
            cliff::SHEER_CLIFF
        } else if m > 0.6 {
            cliff::MOSS_CLIFF
        } else {
            cliff::ROCKY_CLIFF
        })
    } else if input.is_cliff && h > 0.5 {
        Some(if h > 0.75 {
            cliff::STEEP_SLOPE
        } else {
            cliff::RUGGED_SLOPE
        })
    } else {
        None
    }
}

/// A moisture test inside an elevation band.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MoistureRule {
    /// Matches moisture strictly above the cutoff.
    Above(f64, Biome),
    /// Matches moisture strictly below the cutoff.
    Below(f64, Biome),
}

impl MoistureRule {
    /// Biome if the moisture matches.
    #[must_use]
    pub fn matches(&self, moisture: f64) -> Option<Biome> {
        match *self {
            Self::Above(cutoff, biome) if moisture > cutoff => Some(biome),
            Self::Below(cutoff, biome) if moisture < cutoff => Some(biome),
            _ => None,
        }
    }
}

/// One height band of the fallback table.
#[derive(Clone, Debug, PartialEq)]
pub struct ElevationBand {
    /// Band name.
    pub name: &'static str,
    /// Heights strictly above this belong to the band.
    pub floor: f64,
    /// Moisture tests, first match wins.
    pub rules: Vec<MoistureRule>,
    /// Biome when no moisture test matches.
    pub fallback: Biome,
}

impl ElevationBand {
    /// Picks the biome for a moisture value.
    #[must_use]
    pub fn select(&self, moisture: f64) -> Biome {
        self.rules
            .iter()
            .find_map(|rule| rule.matches(moisture))
            .unwrap_or(self.fallback)
    }
}

/// Builds the elevation band table, highest band first.
///
/// Snow cutoffs come from config. A snowy sub-biome only appears where the
/// moisture clears both its own cutoff and the band's snow cutoff.
#[must_use]
pub fn elevation_bands(snow: &SnowOptions) -> Vec<ElevationBand> {
    use MoistureRule::{Above, Below};

    let high = snow.high_moisture_threshold;
    let mid = snow.mid_moisture_threshold;
    let low = snow.low_moisture_threshold;

    vec![
        ElevationBand {
            name: "peaks",
            floor: 0.92,
            rules: vec![
                Above(high.max(0.8), peaks::SNOW_CAP),
                Above(high.max(0.7), peaks::GLACIAL_PEAK),
                Above(high, peaks::ALPINE_SNOW),
                Above(0.5, peaks::SNOWY_PEAKS),
                Above(0.4, peaks::ROCKY_PEAKS),
                Below(0.15, peaks::VOLCANIC_PEAK),
                Below(0.25, peaks::OBSIDIAN_RIDGE),
                Below(0.35, peaks::CRAGGY_PEAKS),
            ],
            fallback: peaks::RUGGED_PEAKS,
        },
        ElevationBand {
            name: "mountain",
            floor: MOUNTAIN_FLOOR,
            rules: vec![
                Above(mid.max(0.85), mountain::GLACIER),
                Above(mid.max(0.75), mountain::SNOW_FIELD),
                Above(mid, mountain::SNOWY_FOREST),
                Above(0.5, mountain::MOUNTAIN_FOREST),
                Above(0.45, mountain::ROCKY_FOREST),
                Above(0.4, mountain::ALPINE_SHRUBS),
                Below(0.2, mountain::VOLCANIC_SLOPES),
                Below(0.3, mountain::BARREN_SLOPES),
                Below(0.4, mountain::MOUNTAIN_SCRUB),
            ],
            fallback: mountain::BARE_MOUNTAIN,
        },
        ElevationBand {
            name: "high_hills",
            floor: snow.elevation_threshold,
            rules: vec![
                Above(low, high_hills::SNOW_PATCHED_HILLS),
                Above(0.7, high_hills::FOGGY_PEAKS),
                Below(0.25, high_hills::ROCKY_SLOPES),
                Above(0.8, high_hills::ALPINE_MEADOW),
                Above(0.65, high_hills::HIGHLAND_FOREST),
                Above(0.5, high_hills::HIGHLAND),
                Above(0.35, high_hills::ROCKY_HIGHLAND),
            ],
            fallback: high_hills::MESA,
        },
        ElevationBand {
            name: "uplands",
            floor: UPLANDS_FLOOR,
            rules: vec![
                Above(0.92, uplands::MOUNTAIN_FROST),
                Above(0.85, uplands::ANCIENT_FOREST),
                Above(0.75, uplands::TROPICAL_RAINFOREST),
                Above(0.62, uplands::TEMPERATE_FOREST),
                Above(0.58, uplands::MOUNTAIN_TRANSITION),
                Above(0.5, uplands::ENCHANTED_GROVE),
                Above(0.4, uplands::WOODLAND),
                Above(0.3, uplands::SHRUBLAND),
                Above(0.2, uplands::DRY_SHRUBLAND),
                Above(0.12, uplands::SCRUBLAND),
            ],
            fallback: uplands::BADLANDS,
        },
        ElevationBand {
            name: "midlands",
            floor: 0.5,
            rules: vec![
                Above(0.85, midlands::FEY_FOREST),
                Above(0.75, midlands::DEEP_FOREST),
                Above(0.65, midlands::DENSE_FOREST),
                Above(0.55, midlands::FOREST),
                Above(0.45, midlands::LIGHT_FOREST),
                Above(0.35, midlands::SCATTERED_TREES),
                Above(0.25, midlands::PRAIRIE),
                Above(0.15, midlands::SAVANNA),
            ],
            fallback: midlands::DRY_SAVANNA,
        },
        ElevationBand {
            name: "lowlands",
            floor: 0.4,
            rules: vec![
                Above(0.8, lowlands::SWAMP),
                Above(0.7, lowlands::MARSH),
                Above(0.6, lowlands::WET_GRASSLAND),
                Above(0.5, lowlands::GRASSLAND),
                Above(0.4, lowlands::MEADOW),
                Above(0.3, lowlands::PLAINS),
                Above(0.2, lowlands::DRY_GRASSLAND),
                Above(0.12, lowlands::ARID_PLAINS),
            ],
            fallback: lowlands::DESERT_SCRUB,
        },
        ElevationBand {
            name: "plains",
            floor: 0.32,
            rules: vec![
                Above(0.8, plains::BOG),
                Above(0.7, plains::WETLAND),
                Above(0.6, plains::MOOR),
                Above(0.5, plains::LOWLAND),
                Above(0.4, plains::DRY_PLAINS),
                Above(0.3, plains::STEPPE),
                Above(0.2, plains::CHALKY_PLAINS),
                Above(0.1, plains::DESERT),
            ],
            fallback: plains::BARREN_DESERT,
        },
        ElevationBand {
            name: "basins",
            floor: f64::NEG_INFINITY,
            rules: vec![
                Above(0.7, basins::MUDFLATS),
                Above(0.5, basins::DELTA),
                Above(0.3, basins::SALT_FLAT),
            ],
            fallback: basins::DRY_BASIN,
        },
    ]
}

/// Which rule produced a biome.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Classification {
    /// Priority rule or elevation band name.
    pub rule: &'static str,
    /// The chosen biome.
    pub biome: Biome,
}

/// Rarity score before banding.
///
/// Extreme height and moisture, steepness, lava, scorching, cliffs and
/// anomalies all raise it.
#[must_use]
pub fn rarity_score(input: &ClassifyInput) -> f64 {
    let mut score = ((input.height - 0.5).abs() * 2.0).powf(1.5) * 10.0
        + ((input.moisture - 0.5).abs() * 2.0).powf(1.5) * 8.0;
    if input.slope > RARITY_SLOPE_THRESHOLD {
        score += (input.slope - RARITY_SLOPE_THRESHOLD) * 40.0;
    }
    score += input.lava * 20.0 + input.scorched * 15.0;
    if input.is_cliff || input.is_high_cliff {
        score += RARITY_FEATURE_BONUS;
    }
    if input.has_anomaly {
        score += RARITY_FEATURE_BONUS;
    }
    score
}

/// Biome classifier for one world config.
pub struct BiomeClassifier {
    config: Arc<TerrainConfig>,
    bands: Vec<ElevationBand>,
}

impl BiomeClassifier {
    /// Creates a classifier.
    #[must_use]
    pub fn new(config: Arc<TerrainConfig>) -> Self {
        let bands = elevation_bands(&config.snow);
        Self { config, bands }
    }

    /// The elevation band table, highest band first.
    #[must_use]
    pub fn bands(&self) -> &[ElevationBand] {
        &self.bands
    }

    /// Classifies a tile.
    #[must_use]
    pub fn classify(&self, input: &ClassifyInput) -> Biome {
        self.explain(input).biome
    }

    /// Classifies a tile and reports the deciding rule.
    #[must_use]
    pub fn explain(&self, input: &ClassifyInput) -> Classification {
        if let Some(c) = PRIORITY_RULES.iter().find_map(|rule| {
            (rule.apply)(input, &self.config).map(|biome| Classification {
                rule: rule.name,
                biome,
            })
        }) {
            return c;
        }

        let band = self
            .bands
            .iter()
            .find(|band| input.height > band.floor)
            .or_else(|| self.bands.last());
        match band {
            Some(band) => Classification {
                rule: band.name,
                biome: band.select(input.moisture),
            },
            None => Classification {
                rule: "basins",
                biome: basins::DRY_BASIN,
            },
        }
    }

    /// Rarity tier of a tile.
    #[must_use]
    pub fn rarity(&self, input: &ClassifyInput) -> Rarity {
        Rarity::from_score(rarity_score(input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> BiomeClassifier {
        BiomeClassifier::new(Arc::new(TerrainConfig::default()))
    }

    #[test]
    fn test_lava_beats_everything() {
        let c = classifier();
        let input = ClassifyInput {
            lava: 0.9,
            continent: 0.0,
            river: 0.8,
            lake: 0.8,
            scorched: 0.9,
            is_high_cliff: true,
            is_cliff: true,
            ..ClassifyInput::dry_land(0.2, 0.5)
        };
        assert_eq!(c.classify(&input), lava::MAGMA_FLOW);
        assert_eq!(c.explain(&input).rule, "lava");
    }

    #[test]
    fn test_ocean_by_continent() {
        let c = classifier();
        let at = |continent: f64| {
            c.classify(&ClassifyInput {
                continent,
                ..ClassifyInput::dry_land(0.6, 0.5)
            })
        };
        assert_eq!(at(0.05), ocean::DEEP_OCEAN);
        assert_eq!(at(0.1), ocean::OCEAN);
        assert_eq!(at(0.25), ocean::SEA);
        assert_eq!(
            c.classify(&ClassifyInput::dry_land(0.2, 0.5)),
            ocean::SHALLOWS
        );
    }

    #[test]
    fn test_coastal_zones_widen_inland() {
        let c = classifier();
        assert_eq!(c.classify(&ClassifyInput::dry_land(0.32, 0.2)), coastal::SANDY_BEACH);
        assert_eq!(c.classify(&ClassifyInput::dry_land(0.37, 0.2)), coastal::DUNES);
        assert_eq!(c.classify(&ClassifyInput::dry_land(0.42, 0.2)), coastal::FLATS);
        assert_eq!(c.explain(&ClassifyInput::dry_land(0.47, 0.2)).rule, "lowlands");

        let steep = ClassifyInput {
            slope: 0.2,
            ..ClassifyInput::dry_land(0.32, 0.5)
        };
        assert_eq!(c.classify(&steep), coastal::SEA_CLIFF);
    }

    #[test]
    fn test_water_features_in_priority_order() {
        let c = classifier();
        let base = ClassifyInput::dry_land(0.6, 0.5);
        let lake = ClassifyInput { lake: 0.5, river: 0.5, ..base };
        assert_eq!(c.classify(&lake), water::LAKE);

        let river = ClassifyInput { river: 0.5, ..base };
        assert_eq!(c.classify(&river), water::RIVER);

        let stream = ClassifyInput { river: 0.25, ..base };
        assert_eq!(c.classify(&stream), water::STREAM);

        let rivulet = ClassifyInput { capillary: 0.1, ..base };
        assert_eq!(c.classify(&rivulet), water::RIVULET);

        let channel = c.classify(&ClassifyInput { water_network: 0.5, ..base });
        assert_eq!(channel.name, "water_channel");
        assert!(channel.water);
    }

    #[test]
    fn test_scorched_before_cliffs() {
        let c = classifier();
        let input = ClassifyInput {
            scorched: 0.8,
            is_cliff: true,
            is_high_cliff: true,
            ..ClassifyInput::dry_land(0.8, 0.5)
        };
        assert_eq!(c.classify(&input), scorched::ACTIVE_VOLCANO);
        let cliffside = ClassifyInput { scorched: 0.0, ..input };
        assert_eq!(c.classify(&cliffside), cliff::ROCKY_CLIFF);
    }

    #[test]
    fn test_elevation_bands() {
        let c = classifier();
        let at = |h: f64, m: f64| c.classify(&ClassifyInput::dry_land(h, m));
        assert_eq!(at(0.95, 0.9), peaks::SNOW_CAP);
        assert_eq!(at(0.95, 0.45), peaks::ROCKY_PEAKS);
        assert_eq!(at(0.95, 0.1), peaks::VOLCANIC_PEAK);
        assert_eq!(at(0.9, 0.8), mountain::SNOW_FIELD);
        assert_eq!(at(0.8, 0.9), high_hills::SNOW_PATCHED_HILLS);
        assert_eq!(at(0.8, 0.3), high_hills::MESA);
        assert_eq!(at(0.65, 0.7), uplands::TEMPERATE_FOREST);
        assert_eq!(at(0.55, 0.6), midlands::FOREST);
        assert_eq!(at(0.47, 0.9), lowlands::SWAMP);
    }

    #[test]
    fn test_snow_cutoff_comes_from_config() {
        let mut config = TerrainConfig::default();
        config.snow.high_moisture_threshold = 0.95;
        let c = BiomeClassifier::new(Arc::new(config));
        assert_eq!(c.classify(&ClassifyInput::dry_land(0.95, 0.9)), peaks::SNOWY_PEAKS);
    }

    #[test]
    fn test_rarity_rises_with_extremes() {
        let c = classifier();
        let plain = ClassifyInput::dry_land(0.5, 0.5);
        assert_eq!(c.rarity(&plain), Rarity::Common);

        let extreme = ClassifyInput {
            lava: 0.9,
            is_cliff: true,
            has_anomaly: true,
            slope: 0.4,
            ..ClassifyInput::dry_land(0.98, 0.02)
        };
        assert_eq!(c.rarity(&extreme), Rarity::Mythic);
    }

    #[test]
    fn test_every_band_has_a_floor_below_the_one_above() {
        let bands = elevation_bands(&SnowOptions::default());
        for pair in bands.windows(2) {
            assert!(pair[0].floor > pair[1].floor, "{} vs {}", pair[0].name, pair[1].name);
        }
    }
}
