//! # Volcanic System
//!
//! Lava fields on high ground and the scorched terrain around them.

use std::sync::Arc;

use crate::config::TerrainConfig;
use crate::field::{channel_synth, to_f64, HeightMap};
use crate::fractal::{FbmOptions, FractalSynthesizer, MemoStats};
use crate::noise::{NoiseChannel, WorldSeed};

/// Lava and scorched intensities at one tile.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VolcanicFeatures {
    /// Lava intensity.
    pub lava: f64,
    /// Scorched ground intensity.
    pub scorched: f64,
}

/// Lava and scorched-ground fields.
pub struct VolcanicSystem {
    config: Arc<TerrainConfig>,
    lava: FractalSynthesizer,
    scorched: FractalSynthesizer,
}

impl VolcanicSystem {
    /// Creates the volcanic fields for a world.
    ///
    /// Scorched ground reads the river lattice so burnt terrain lines up
    /// with dry channels.
    #[must_use]
    pub fn new(seed: WorldSeed, config: Arc<TerrainConfig>) -> Self {
        Self {
            lava: channel_synth(seed, NoiseChannel::Lava, &config),
            scorched: channel_synth(seed, NoiseChannel::River, &config),
            config,
        }
    }

    /// Lava and scorched ground at a tile.
    ///
    /// `water` is the strongest flowing water at the tile; wet tiles never
    /// scorch.
    pub fn evaluate<H: HeightMap>(
        &self,
        x: i64,
        y: i64,
        height: f64,
        heights: &H,
        river: f64,
        water: f64,
    ) -> VolcanicFeatures {
        let lava = if height > self.config.lava.gate_height {
            self.lava_value(x, y, heights)
        } else {
            0.0
        };

        let scorched = if (lava > 0.05 || height > self.config.scorched.min_height)
            && river < self.config.scorched.max_water
        {
            self.scorched_value(x, y, heights, lava, water)
        } else {
            0.0
        };

        VolcanicFeatures { lava, scorched }
    }

    /// Lava intensity at a tile.
    pub fn lava_value<H: HeightMap>(&self, x: i64, y: i64, heights: &H) -> f64 {
        let opts = &self.config.lava;
        if heights.height_at(x, y) < opts.min_height {
            return 0.0;
        }
        let (fx, fy) = to_f64(x, y);
        let noise = self.lava.fbm(
            fx + 2000.0,
            fy + 2000.0,
            &FbmOptions {
                scale: opts.scale,
                octaves: 3,
                persistence: 0.5,
                ..FbmOptions::DEFAULT
            },
        );
        if noise > opts.lava_threshold {
            ((noise - opts.lava_threshold) * opts.lava_concentration * opts.flow_intensity)
                .clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Scorched ground intensity at a tile.
    pub fn scorched_value<H: HeightMap>(
        &self,
        x: i64,
        y: i64,
        heights: &H,
        lava: f64,
        water: f64,
    ) -> f64 {
        let opts = &self.config.scorched;
        if water > opts.max_water {
            return 0.0;
        }
        let height = heights.height_at(x, y);
        let (fx, fy) = to_f64(x, y);

        let triggered = lava > 0.05
            || (height > opts.min_height
                && self.scorched.fbm(
                    fx * 2.5,
                    fy * 2.5,
                    &FbmOptions {
                        scale: 0.008,
                        octaves: 2,
                        persistence: 0.5,
                        ..FbmOptions::DEFAULT
                    },
                ) > opts.trigger_threshold);
        if !triggered {
            return 0.0;
        }

        let intensity = self.scorched.fbm(
            fx * 3.0 + 15_000.0,
            fy * 3.0 + 15_000.0,
            &FbmOptions {
                scale: 0.006,
                octaves: 2,
                persistence: 0.6,
                ..FbmOptions::DEFAULT
            },
        );
        ((intensity - opts.intensity_floor).max(0.0)
            * opts.intensity_gain
            * self.config.constants.scorched_frequency)
            .clamp(0.0, 1.0)
    }

    /// Drops every memoized value.
    pub fn clear_memos(&self) {
        self.lava.clear_memo();
        self.scorched.clear_memo();
    }

    /// Combined memo counters.
    #[must_use]
    pub fn memo_stats(&self) -> MemoStats {
        self.lava.memo_stats().merged(self.scorched.memo_stats())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn volcanic() -> VolcanicSystem {
        VolcanicSystem::new(WorldSeed::new(42.0), Arc::new(TerrainConfig::default()))
    }

    #[test]
    fn test_no_lava_on_low_ground() {
        let volcanic = volcanic();
        let lowland = |_x: i64, _y: i64| 0.4;
        for i in 0..100 {
            assert_eq!(volcanic.lava_value(i * 71, i * 29, &lowland), 0.0);
        }
    }

    #[test]
    fn test_water_prevents_scorching() {
        let volcanic = volcanic();
        let peak = |_x: i64, _y: i64| 0.9;
        for i in 0..50 {
            assert_eq!(volcanic.scorched_value(i * 41, i * 7, &peak, 0.5, 0.3), 0.0);
        }
    }

    #[test]
    fn test_lava_triggers_scorching_noise() {
        let volcanic = volcanic();
        let peak = |_x: i64, _y: i64| 0.9;
        let scorched = (0..200)
            .map(|i| volcanic.scorched_value(i * 53, i * 19, &peak, 0.5, 0.0))
            .filter(|&v| v > 0.0)
            .count();
        assert!(scorched > 0, "active lava should scorch some tiles");
    }

    #[test]
    fn test_values_in_range() {
        let volcanic = volcanic();
        let peak = |_x: i64, _y: i64| 0.95;
        for i in 0..100 {
            let v = volcanic.evaluate(i * 311, i * -97, 0.95, &peak, 0.0, 0.0);
            assert!((0.0..=1.0).contains(&v.lava));
            assert!((0.0..=1.0).contains(&v.scorched));
        }
    }
}
