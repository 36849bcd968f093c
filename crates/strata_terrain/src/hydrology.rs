//! # Hydrology
//!
//! Rivers, lakes, ponds, capillary streams and connecting water channels.
//!
//! Every value here is a local function of noise and neighbouring heights.
//! There is no flow simulation: rivers emerge where ridged channel noise,
//! downhill drop and nearby water agree.
//!
//! ## Gating
//!
//! Water features are only evaluated inland (continent > 0.4) between
//! heights 0.3 and 0.92. Inside that region the features are evaluated in
//! order and each one suppresses the next: a strong river rules out a
//! lake, and either rules out capillaries and channels.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::TerrainConfig;
use crate::field::{channel_synth, round_half_up, to_f64, HeightMap};
use crate::fractal::{FbmOptions, FractalSynthesizer, MemoStats};
use crate::noise::{NoiseChannel, WorldSeed};

/// River intensity cap.
const MAX_RIVER: f64 = 0.95;
/// Tiles above this height are summits and never carry rivers.
const RIVER_SUMMIT_HEIGHT: f64 = 0.95;
/// Capillary intensity cap.
const MAX_CAPILLARY: f64 = 0.15;
/// Radius of the water-body scan around a river tile.
const RIVER_WATER_SCAN: i64 = 5;
/// Radius of the river scan around a lake tile.
const LAKE_RIVER_SCAN: i64 = 3;
/// Radius of the water-body scan around a channel tile.
const NETWORK_WATER_SCAN: i64 = 10;
/// Rivers further than this from the sampled tile read as zero.
const RIVER_MAP_WINDOW: i64 = 10;

/// Water feature intensities at one tile.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WaterFeatures {
    /// River intensity.
    pub river: f64,
    /// Lake or pond intensity.
    pub lake: f64,
    /// Capillary stream intensity.
    pub capillary: f64,
    /// Connecting channel intensity.
    pub network: f64,
}

/// River intensity with its flow direction.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RiverSample {
    /// Intensity in `[0, 0.95]`.
    pub intensity: f64,
    /// Unit downhill direction, bent toward nearby water. Zero on flat ground.
    pub flow: (f64, f64),
}

/// Heights of the eight neighbours.
struct Neighbourhood {
    n: f64,
    s: f64,
    e: f64,
    w: f64,
    ne: f64,
    nw: f64,
    se: f64,
    sw: f64,
}

impl Neighbourhood {
    fn read<H: HeightMap>(x: i64, y: i64, heights: &H) -> Self {
        Self {
            n: heights.height_at(x, y - 1),
            s: heights.height_at(x, y + 1),
            e: heights.height_at(x + 1, y),
            w: heights.height_at(x - 1, y),
            ne: heights.height_at(x + 1, y - 1),
            nw: heights.height_at(x - 1, y - 1),
            se: heights.height_at(x + 1, y + 1),
            sw: heights.height_at(x - 1, y + 1),
        }
    }

    /// Weighted gradient pointing downhill.
    fn gradient(&self) -> (f64, f64) {
        let dx = (self.w - self.e) * 0.6 + (self.nw - self.ne + self.sw - self.se) * 0.2;
        let dy = (self.n - self.s) * 0.6 + (self.nw - self.sw + self.ne - self.se) * 0.2;
        (dx, dy)
    }

    fn lowest(&self) -> f64 {
        [
            self.n, self.s, self.e, self.w, self.ne, self.nw, self.se, self.sw,
        ]
        .into_iter()
        .fold(f64::INFINITY, f64::min)
    }
}

/// Standing water found by a radial scan.
#[derive(Default)]
struct NearbyWater {
    found: bool,
    ocean: bool,
    /// Sum of weighted directions toward the water.
    pull: (f64, f64),
    /// Accumulated network strength.
    network: f64,
}

/// River, lake, capillary and water-network fields.
pub struct HydrologyNetwork {
    config: Arc<TerrainConfig>,
    river: FractalSynthesizer,
    lake: FractalSynthesizer,
    network: FractalSynthesizer,
}

impl HydrologyNetwork {
    /// Creates the hydrology fields for a world.
    #[must_use]
    pub fn new(seed: WorldSeed, config: Arc<TerrainConfig>) -> Self {
        Self {
            river: channel_synth(seed, NoiseChannel::River, &config),
            lake: channel_synth(seed, NoiseChannel::Lake, &config),
            network: channel_synth(seed, NoiseChannel::Continent, &config),
            config,
        }
    }

    /// Returns true if water features are evaluated for this tile.
    #[must_use]
    pub fn in_water_region(continent: f64, height: f64) -> bool {
        continent > 0.4 && height > 0.3 && height < 0.92
    }

    /// All water features at a tile, with gating and mutual suppression.
    pub fn evaluate<H: HeightMap>(
        &self,
        x: i64,
        y: i64,
        continent: f64,
        height: f64,
        heights: &H,
    ) -> WaterFeatures {
        if !Self::in_water_region(continent, height) {
            return WaterFeatures::default();
        }

        let river = self.river_value(x, y, heights);

        let lake = if river < 0.1 {
            let rivers = WindowedRiverMap::new(self, heights, (x, y));
            self.lake_value(x, y, heights, &|rx: i64, ry: i64| rivers.value_at(rx, ry))
        } else {
            0.0
        };

        let capillary = if river < 0.05 && lake < 0.05 {
            self.capillary_value(x, y, heights)
        } else {
            0.0
        };

        let network = if river < 0.15 && lake < 0.15 {
            self.water_network_value(x, y, heights)
        } else {
            0.0
        };

        WaterFeatures {
            river,
            lake,
            capillary,
            network,
        }
    }

    /// River intensity at a tile.
    pub fn river_value<H: HeightMap>(&self, x: i64, y: i64, heights: &H) -> f64 {
        self.river_sample(x, y, heights).intensity
    }

    /// River intensity and flow direction at a tile.
    pub fn river_sample<H: HeightMap>(&self, x: i64, y: i64, heights: &H) -> RiverSample {
        let opts = &self.config.river;
        let height = heights.height_at(x, y);
        if height > RIVER_SUMMIT_HEIGHT {
            return RiverSample::default();
        }
        let (fx, fy) = to_f64(x, y);

        let ridge = self.river.fbm(
            fx + 5000.0,
            fy + 5000.0,
            &FbmOptions {
                scale: opts.scale,
                octaves: 3,
                persistence: 0.5,
                lacunarity: 2.2,
                ridged: true,
                ..FbmOptions::DEFAULT
            },
        );
        let tributary = self.river.fbm(
            fx * 2.2 + 10_500.0,
            fy * 2.2 + 10_500.0,
            &FbmOptions {
                scale: opts.scale * 1.2,
                octaves: 2,
                persistence: 0.5,
                lacunarity: 2.0,
                ..FbmOptions::DEFAULT
            },
        );

        let around = Neighbourhood::read(x, y, heights);
        let (dx, dy) = around.gradient();
        let gradient = dx.hypot(dy);
        let drop = height - around.lowest();

        let mountain_source = height > 0.82 && gradient > 0.025;
        let highland_spring = !mountain_source
            && height > 0.65
            && height < 0.82
            && tributary > 1.0 - opts.highland_spring_factor;
        let sourced = mountain_source || highland_spring;

        if gradient < 0.015 && ridge > 0.55 && drop < 0.01 && !sourced {
            return RiverSample::default();
        }
        if drop <= 0.0 && height > opts.water_level + 0.05 && !sourced && gradient < 0.03 {
            return RiverSample::default();
        }

        let water = self.scan_river_water(x, y, heights);
        let flow = flow_direction((dx, dy), &water, opts.lake_influence);

        let mut value = (1.0 - ridge) * opts.ridge_sharpness;
        if water.found {
            let ocean_boost = if water.ocean { 1.3 } else { 1.0 };
            value += opts.lake_influence * water.network.min(0.3) * ocean_boost;
        }
        value += drop * opts.flow_directionality * 2.8;
        if mountain_source {
            value += (height - 0.82) * 5.0 * opts.mountain_source_factor * (gradient * 10.0).min(1.0);
        }
        if highland_spring {
            value += (height - 0.65) * 2.0 * opts.highland_spring_factor * (gradient * 12.0).min(0.8);
        }

        let branching = self.river.fbm(
            fx * 1.7 + 9000.0,
            fy * 1.7 + 9000.0,
            &FbmOptions {
                scale: opts.scale * 1.2,
                octaves: 2,
                persistence: 0.6,
                ..FbmOptions::DEFAULT
            },
        );
        if branching > 1.0 - opts.branching_factor && (drop > 0.015 || sourced) {
            value += branching * opts.branching_factor * 0.7;
        }

        let arterial = self.river.fbm(
            fx * 0.4 + 8000.0,
            fy * 0.4 + 8000.0,
            &FbmOptions {
                scale: opts.scale * 0.4,
                octaves: 2,
                persistence: 0.6,
                lacunarity: 1.6,
                ..FbmOptions::DEFAULT
            },
        );
        let is_arterial = arterial > 1.0 - opts.arterial_river_factor;
        if is_arterial {
            value += opts.arterial_river_factor * 0.8;
            if tributary > 1.0 - opts.tributary_factor && height > opts.water_level + 0.05 {
                value += opts.arterial_river_factor * opts.tributary_factor * 0.3;
            }
        }

        let flow_factor = (gradient * 10.0).min(1.0);
        value *= (flow_factor * opts.flow_constraint + (1.0 - opts.flow_constraint)).min(1.0);
        value *= opts.river_density * self.config.constants.river_network_factor;

        let threshold = if water.found {
            opts.river_threshold * 0.75
        } else if mountain_source {
            opts.river_threshold * 0.8
        } else if highland_spring {
            opts.river_threshold * 0.85
        } else {
            opts.river_threshold
        };

        let connectivity = self.river.fbm(
            fx * 0.75 + 12_500.0,
            fy * 0.75 + 12_500.0,
            &FbmOptions {
                scale: 0.003,
                octaves: 2,
                persistence: 0.6,
                lacunarity: 1.8,
                ..FbmOptions::DEFAULT
            },
        );
        let network_boost = if connectivity > 0.6 {
            (connectivity - 0.6) * opts.network_connectivity * 0.6
        } else {
            0.0
        };
        value += network_boost;

        if value <= threshold {
            return RiverSample { intensity: 0.0, flow };
        }

        let mut width_factor = if water.ocean
            && height > opts.water_level - 0.05
            && height < opts.water_level + 0.1
        {
            // Deltas fan out where rivers meet the sea.
            (0.8 - gradient * 4.0).max(0.35)
        } else {
            let base = if mountain_source {
                (1.0 - height) * 0.2 + 0.15
            } else {
                (1.0 - height) * 0.25 + 0.2
            };
            if value <= threshold + 0.10 {
                base * 0.3
            } else if value <= threshold + 0.18 {
                base * 0.5
            } else {
                base
            }
        };
        if network_boost > 0.0 {
            width_factor *= 1.0 + network_boost * 0.8;
        }

        let near_water_widening = if water.found { 1.2 } else { 1.0 };
        let arterial_widening = if is_arterial { 1.4 } else { 1.0 };
        let width = opts.river_width * width_factor * near_water_widening * arterial_widening;

        RiverSample {
            intensity: ((value - threshold) * width).clamp(0.0, MAX_RIVER),
            flow,
        }
    }

    fn scan_river_water<H: HeightMap>(&self, x: i64, y: i64, heights: &H) -> NearbyWater {
        let water_level = self.config.river.water_level;
        let mut water = NearbyWater::default();
        #[allow(clippy::cast_precision_loss)]
        let radius = RIVER_WATER_SCAN as f64;

        for dy in -RIVER_WATER_SCAN..=RIVER_WATER_SCAN {
            for dx in -RIVER_WATER_SCAN..=RIVER_WATER_SCAN {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let (fdx, fdy) = to_f64(dx, dy);
                let distance = fdx.hypot(fdy);
                if distance > radius {
                    continue;
                }
                let neighbour = heights.height_at(x + dx, y + dy);
                if neighbour >= water_level {
                    continue;
                }

                water.found = true;
                let ocean = neighbour < water_level - 0.1;
                water.ocean |= ocean;
                let ocean_factor = if ocean { 1.5 } else { 1.0 };
                let weight = (1.0 / distance.max(0.7)).powf(1.5) * ocean_factor;
                water.pull.0 += fdx * weight;
                water.pull.1 += fdy * weight;
                water.network += (1.0 / (distance * 1.2)) * 0.2 * ocean_factor;
            }
        }
        water
    }

    /// Lake or pond intensity at a tile.
    ///
    /// `rivers` reports river intensity at nearby tiles. Lakes favour flat
    /// depressions fed by rivers; ponds need a dry neighbourhood.
    pub fn lake_value<H: HeightMap>(
        &self,
        x: i64,
        y: i64,
        heights: &H,
        rivers: &dyn Fn(i64, i64) -> f64,
    ) -> f64 {
        let opts = &self.config.lake;
        let height = heights.height_at(x, y);
        if height < opts.min_height || height > opts.max_height {
            return 0.0;
        }
        let (fx, fy) = to_f64(x, y);

        let lake_noise = self.lake.fbm(
            fx + 3000.0,
            fy + 3000.0,
            &FbmOptions {
                scale: opts.scale,
                octaves: 2,
                persistence: 0.5,
                ..FbmOptions::DEFAULT
            },
        );
        let pond_noise = self.lake.fbm(
            fx * 2.2 + 7500.0,
            fy * 2.2 + 7500.0,
            &FbmOptions {
                scale: opts.scale * 2.2,
                octaves: 1,
                persistence: 0.4,
                ..FbmOptions::DEFAULT
            },
        );
        let shape = self.lake.fbm(
            fx + 4000.0,
            fy + 4000.0,
            &FbmOptions {
                scale: opts.scale * 2.0,
                octaves: 1,
                persistence: 0.3,
                ..FbmOptions::DEFAULT
            },
        );

        let cardinal = [
            heights.height_at(x, y - 1),
            heights.height_at(x, y + 1),
            heights.height_at(x + 1, y),
            heights.height_at(x - 1, y),
        ];
        let average_slope = cardinal.iter().map(|h| (h - height).abs()).sum::<f64>() / 4.0;
        let flatness = 1.0 - average_slope * 10.0;
        let depression = height < cardinal.iter().copied().fold(f64::INFINITY, f64::min);

        let river_here = rivers(x, y);
        let mut river_nearby = 0.0;
        #[allow(clippy::cast_precision_loss)]
        let scan = LAKE_RIVER_SCAN as f64;
        for dy in -LAKE_RIVER_SCAN..=LAKE_RIVER_SCAN {
            for dx in -LAKE_RIVER_SCAN..=LAKE_RIVER_SCAN {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let (fdx, fdy) = to_f64(dx, dy);
                let distance = fdx.hypot(fdy);
                if distance > scan {
                    continue;
                }
                let river = rivers(x + dx, y + dy);
                if river > 0.15 {
                    river_nearby += river * (1.0 - distance / scan) * 1.5;
                }
            }
        }

        let in_pond_band = height >= opts.pond_min_height && height <= opts.pond_max_height;
        let pond = if in_pond_band
            && pond_noise > 0.8
            && !Self::river_within(x, y, i64::from(opts.avoid_water_distance), rivers)
        {
            (pond_noise - 0.8) * 1.5 * opts.small_pond_frequency * opts.pond_size
        } else {
            0.0
        };

        let fed = river_here > opts.min_river_influence || river_nearby > 0.3;
        let lake = (shape * opts.lake_smoothness + (1.0 - opts.lake_smoothness))
            * if depression { 1.5 } else { 0.5 }
            * flatness.max(0.0)
            * if fed { 1.4 } else { 0.8 }
            * lake_noise;
        let lake = if lake > opts.lake_threshold {
            (lake - opts.lake_threshold) * 6.0
        } else {
            0.0
        };

        lake.max(pond).clamp(0.0, 1.0)
    }

    fn river_within(x: i64, y: i64, radius: i64, rivers: &dyn Fn(i64, i64) -> f64) -> bool {
        #[allow(clippy::cast_precision_loss)]
        let limit = radius as f64;
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let (fdx, fdy) = to_f64(dx, dy);
                if fdx.hypot(fdy) <= limit && rivers(x + dx, y + dy) > 0.05 {
                    return true;
                }
            }
        }
        false
    }

    /// Capillary stream intensity at a tile, in `[0, 0.15]`.
    pub fn capillary_value<H: HeightMap>(&self, x: i64, y: i64, heights: &H) -> f64 {
        let opts = &self.config.capillary;
        let height = heights.height_at(x, y);
        if height < opts.min_height || height > opts.max_height || height < opts.water_level {
            return 0.0;
        }
        let (fx, fy) = to_f64(x, y);

        let channel = self.river.fbm(
            fx * 1.5 + 15_000.0,
            fy * 1.5 + 15_000.0,
            &FbmOptions {
                scale: opts.scale * 1.3,
                octaves: 2,
                persistence: 0.5,
                lacunarity: 2.3,
                ridged: true,
                ..FbmOptions::DEFAULT
            },
        );

        let n = heights.height_at(x, y - 1);
        let s = heights.height_at(x, y + 1);
        let e = heights.height_at(x + 1, y);
        let w = heights.height_at(x - 1, y);
        let gradient = (w - e).hypot(n - s);
        let drop = height - n.min(s).min(e).min(w);
        if drop <= 0.0 && height > opts.water_level + 0.03 {
            return 0.0;
        }

        let connection = self.river.fbm(
            fx * 2.5 + 20_000.0,
            fy * 2.5 + 20_000.0,
            &FbmOptions {
                scale: opts.scale * 2.0,
                octaves: 1,
                persistence: 0.5,
                ..FbmOptions::DEFAULT
            },
        );

        let value =
            ((1.0 - channel) * (1.0 + gradient * 5.0) * connection + drop * 1.5) * opts.density;
        let threshold = opts.threshold * (1.0 - opts.connectivity_factor * (connection - 0.5));
        if value <= threshold {
            return 0.0;
        }

        let thinness = opts.thinness_factor * (0.8 + (height - opts.min_height) * 0.4);
        ((value - threshold) * thinness).clamp(0.0, MAX_CAPILLARY)
    }

    /// Connecting channel intensity at a tile.
    pub fn water_network_value<H: HeightMap>(&self, x: i64, y: i64, heights: &H) -> f64 {
        let opts = &self.config.water_network;
        let water_level = self.config.constants.water_level;
        let height = heights.height_at(x, y);
        if height < water_level || height > opts.max_height {
            return 0.0;
        }
        let (fx, fy) = to_f64(x, y);

        let network = self.network.fbm(
            fx * 0.6 + 30_000.0,
            fy * 0.6 + 30_000.0,
            &FbmOptions {
                scale: opts.scale * 0.5,
                octaves: 2,
                persistence: 0.7,
                lacunarity: 2.0,
                ridged: true,
                ..FbmOptions::DEFAULT
            },
        );
        let flow_options = FbmOptions {
            scale: opts.scale * 0.7,
            octaves: 1,
            persistence: 0.5,
            ..FbmOptions::DEFAULT
        };
        let flow_x = self.network.fbm(fx * 0.7 + 40_000.0, fy * 0.7 + 40_000.0, &flow_options) * 2.0 - 1.0;
        let flow_y = self.network.fbm(fx * 0.7 + 50_000.0, fy * 0.7 + 50_000.0, &flow_options) * 2.0 - 1.0;
        let strength = flow_x.hypot(flow_y).max(0.01);

        let mut nearest: Option<f64> = None;
        for dy in -NETWORK_WATER_SCAN..=NETWORK_WATER_SCAN {
            for dx in -NETWORK_WATER_SCAN..=NETWORK_WATER_SCAN {
                if dx == 0 && dy == 0 {
                    continue;
                }
                if heights.height_at(x + dx, y + dy) < water_level {
                    let (fdx, fdy) = to_f64(dx, dy);
                    let distance = fdx.hypot(fdy);
                    nearest = Some(nearest.map_or(distance, |d| d.min(distance)));
                }
            }
        }
        #[allow(clippy::cast_precision_loss)]
        let scan = NETWORK_WATER_SCAN as f64;
        let proximity = nearest.map_or(0.0, |d| ((scan - d) / scan).max(0.0));

        let (dir_x, dir_y) = (flow_x / strength, flow_y / strength);
        let leads_downhill = (1..=3).any(|step| {
            let d = f64::from(step);
            let probe = heights.height_at(
                round_half_up(fx + dir_x * d),
                round_half_up(fy + dir_y * d),
            );
            probe < height - 0.02
        });

        let terrain = (1.0 - (height - water_level) * opts.avoid_mountains_strength).max(0.0);
        let channel = ((1.0 - network) * opts.connection_factor
            + proximity * 0.3
            + if leads_downhill { 0.2 } else { 0.0 })
            * terrain;

        if channel > opts.channel_threshold {
            ((channel - opts.channel_threshold) * opts.connection_width).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Drops every memoized value.
    pub fn clear_memos(&self) {
        self.river.clear_memo();
        self.lake.clear_memo();
        self.network.clear_memo();
    }

    /// Combined memo counters.
    #[must_use]
    pub fn memo_stats(&self) -> MemoStats {
        self.river
            .memo_stats()
            .merged(self.lake.memo_stats())
            .merged(self.network.memo_stats())
    }
}

/// Blends the downhill direction with the pull of nearby water.
fn flow_direction(gradient: (f64, f64), water: &NearbyWater, lake_influence: f64) -> (f64, f64) {
    let (mut fx, mut fy) = normalized(gradient);
    if water.found {
        let pull = normalized(water.pull);
        let weight = if water.ocean {
            lake_influence * 1.2
        } else {
            lake_influence * 0.7
        };
        fx = fx * (1.0 - weight) + pull.0 * weight;
        fy = fy * (1.0 - weight) + pull.1 * weight;
    }
    normalized((fx, fy))
}

fn normalized((x, y): (f64, f64)) -> (f64, f64) {
    let length = x.hypot(y);
    if length > 0.0 {
        (x / length, y / length)
    } else {
        (0.0, 0.0)
    }
}

/// River intensities around one tile, memoized for one lake evaluation.
struct WindowedRiverMap<'a, H: HeightMap> {
    hydrology: &'a HydrologyNetwork,
    heights: &'a H,
    origin: (i64, i64),
    local: RefCell<HashMap<(i64, i64), f64>>,
}

impl<'a, H: HeightMap> WindowedRiverMap<'a, H> {
    fn new(hydrology: &'a HydrologyNetwork, heights: &'a H, origin: (i64, i64)) -> Self {
        Self {
            hydrology,
            heights,
            origin,
            local: RefCell::new(HashMap::new()),
        }
    }

    fn value_at(&self, x: i64, y: i64) -> f64 {
        if (x - self.origin.0).abs() > RIVER_MAP_WINDOW || (y - self.origin.1).abs() > RIVER_MAP_WINDOW
        {
            return 0.0;
        }
        if let Some(&v) = self.local.borrow().get(&(x, y)) {
            return v;
        }
        let v = self.hydrology.river_value(x, y, self.heights);
        self.local.borrow_mut().insert((x, y), v);
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hydrology() -> HydrologyNetwork {
        HydrologyNetwork::new(WorldSeed::new(42.0), Arc::new(TerrainConfig::default()))
    }

    /// Steep east-facing slope passing 0.9 at x = 0.
    fn mountainside(x: i64, _y: i64) -> f64 {
        (0.9 - f64::from(i32::try_from(x).unwrap_or(0)) * 0.1).clamp(0.0, 1.0)
    }

    #[test]
    fn test_mountain_source_always_flows() {
        let hydrology = hydrology();
        for seed_shift in 0..5 {
            let shifted = |x: i64, y: i64| mountainside(x - seed_shift * 1000, y);
            let river = hydrology.river_value(seed_shift * 1000, 0, &shifted);
            assert!(river > 0.0, "mountain source at shift {seed_shift} gave {river}");
            assert!(river <= MAX_RIVER);
        }
    }

    #[test]
    fn test_flat_high_ground_has_no_river() {
        let hydrology = hydrology();
        let plateau = |_x: i64, _y: i64| 0.6;
        for i in 0..20 {
            assert_eq!(hydrology.river_value(i * 37, i * 11, &plateau), 0.0);
        }
    }

    #[test]
    fn test_summit_has_no_river() {
        let hydrology = hydrology();
        let summit = |_x: i64, _y: i64| RIVER_SUMMIT_HEIGHT + 0.01;
        assert_eq!(hydrology.river_value(0, 0, &summit), 0.0);
        assert_eq!(hydrology.river_sample(0, 0, &summit), RiverSample::default());
    }

    #[test]
    fn test_flow_bends_toward_water() {
        let hydrology = hydrology();
        // Slope falls east, lake lies to the south.
        let terrain = |x: i64, y: i64| {
            if y >= 3 {
                0.1
            } else {
                0.9 - f64::from(i32::try_from(x).unwrap_or(0)) * 0.03
            }
        };
        let sample = hydrology.river_sample(0, 0, &terrain);
        assert!(sample.flow.1 > 0.0, "flow {:?} should lean south", sample.flow);
    }

    #[test]
    fn test_gate_blocks_ocean_and_peaks() {
        let hydrology = hydrology();
        let heights = |_x: i64, _y: i64| 0.5;
        assert_eq!(
            hydrology.evaluate(0, 0, 0.3, 0.5, &heights),
            WaterFeatures::default()
        );
        assert_eq!(
            hydrology.evaluate(0, 0, 0.9, 0.95, &heights),
            WaterFeatures::default()
        );
    }

    #[test]
    fn test_lake_limits() {
        let hydrology = hydrology();
        let no_rivers = |_x: i64, _y: i64| 0.0;
        let too_high = |_x: i64, _y: i64| 0.8;
        assert_eq!(hydrology.lake_value(0, 0, &too_high, &no_rivers), 0.0);

        let basin = |x: i64, y: i64| if x == 0 && y == 0 { 0.45 } else { 0.46 };
        for i in 0..50 {
            let v = hydrology.lake_value(i * 97, i * -53, &basin, &no_rivers);
            assert!((0.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn test_pond_ignores_own_trickle() {
        let trickle = |x: i64, y: i64| if x == 0 && y == 0 { 0.07 } else { 0.0 };
        let beside = |x: i64, y: i64| if x == 2 && y == 1 { 0.07 } else { 0.0 };
        assert!(!HydrologyNetwork::river_within(0, 0, 4, &trickle));
        assert!(HydrologyNetwork::river_within(0, 0, 4, &beside));

        let hydrology = hydrology();
        let no_rivers = |_x: i64, _y: i64| 0.0;
        let meadow = |_x: i64, _y: i64| 0.5;
        for i in 0..400 {
            let (x, y) = (i * 131, i * -59);
            let own = move |rx: i64, ry: i64| if rx == x && ry == y { 0.07 } else { 0.0 };
            assert_eq!(
                hydrology.lake_value(x, y, &meadow, &own),
                hydrology.lake_value(x, y, &meadow, &no_rivers),
                "pond at ({x}, {y}) lost to its own trickle"
            );
        }
    }

    #[test]
    fn test_capillary_bounds() {
        let hydrology = hydrology();
        let below_water = |_x: i64, _y: i64| 0.2;
        assert_eq!(hydrology.capillary_value(0, 0, &below_water), 0.0);

        let slope = |x: i64, _y: i64| 0.6 - f64::from(i32::try_from(x).unwrap_or(0)) * 0.01;
        for i in 0..50 {
            let v = hydrology.capillary_value(i * 13, 0, &slope);
            assert!((0.0..=MAX_CAPILLARY).contains(&v));
        }
    }

    #[test]
    fn test_water_network_needs_land() {
        let hydrology = hydrology();
        let submerged = |_x: i64, _y: i64| 0.2;
        let alpine = |_x: i64, _y: i64| 0.9;
        assert_eq!(hydrology.water_network_value(0, 0, &submerged), 0.0);
        assert_eq!(hydrology.water_network_value(0, 0, &alpine), 0.0);
    }
}
