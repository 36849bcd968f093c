//! # Fractal Synthesis
//!
//! Fractal Brownian motion over [`SimplexNoise`], plus the continent mask.
//!
//! ## Memoization
//!
//! Neighbour scans in the hydrology stage sample the same coordinates many
//! times. Each synthesizer keeps a bounded memo keyed by the coordinate
//! rounded to two decimals together with every parameter that changes the
//! result. Sampling always happens at the rounded coordinate, so a memo hit
//! and a fresh computation return identical values.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::config::ContinentOptions;
use crate::memo::{BoundedCache, DEFAULT_EVICTION_FRACTION};
use crate::noise::{SimplexNoise, WorldSeed};

/// Default number of entries in each FBM memo.
pub const DEFAULT_MEMO_CAPACITY: usize = 2048;

/// Parameters for one FBM evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FbmOptions {
    /// Base frequency applied to the input coordinate.
    pub scale: f64,
    /// Number of noise layers.
    pub octaves: u32,
    /// Amplitude decay per octave.
    pub persistence: f64,
    /// Frequency growth per octave.
    pub lacunarity: f64,
    /// Starting amplitude.
    pub amplitude: f64,
    /// Starting frequency.
    pub frequency: f64,
    /// Use the `(1 - |n|)^2` ridge transform.
    pub ridged: bool,
}

impl FbmOptions {
    /// Default parameters.
    pub const DEFAULT: Self = Self {
        scale: 0.005,
        octaves: 6,
        persistence: 0.5,
        lacunarity: 2.0,
        amplitude: 1.0,
        frequency: 1.0,
        ridged: false,
    };

    /// Layers at or below this count take the unrolled path.
    const FAST_PATH_OCTAVES: u32 = 3;
}

impl Default for FbmOptions {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Memo counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoStats {
    /// Lookups answered from the memo.
    pub hits: u64,
    /// Lookups that had to compute.
    pub misses: u64,
    /// Entries dropped to stay within capacity.
    pub evictions: u64,
}

impl MemoStats {
    /// Combines two sets of counters.
    #[must_use]
    pub const fn merged(self, other: Self) -> Self {
        Self {
            hits: self.hits + other.hits,
            misses: self.misses + other.misses,
            evictions: self.evictions + other.evictions,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct FbmKey {
    x: i64,
    y: i64,
    scale: u64,
    octaves: u32,
    persistence: u64,
    lacunarity: u64,
    frequency: u64,
    ridged: bool,
}

/// Rounds to two decimals, half up.
#[inline]
fn centi(v: f64) -> i64 {
    #[allow(clippy::cast_possible_truncation)]
    let rounded = (v * 100.0 + 0.5).floor() as i64;
    rounded
}

/// Seeded FBM generator with bounded memoization.
///
/// One synthesizer exists per noise channel. All methods take `&self`;
/// the memos sit behind [`parking_lot::Mutex`] and the lock is only held
/// for the lookup or the insert, never while computing.
pub struct FractalSynthesizer {
    noise: SimplexNoise,
    memo: Mutex<BoundedCache<FbmKey, f64>>,
    continent_memo: Mutex<BoundedCache<(u64, u64), f64>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl FractalSynthesizer {
    /// Creates a synthesizer with the default memo capacity.
    #[must_use]
    pub fn new(seed: WorldSeed) -> Self {
        Self::with_memo(seed, DEFAULT_MEMO_CAPACITY, DEFAULT_EVICTION_FRACTION)
    }

    /// Creates a synthesizer with a custom memo capacity and eviction batch.
    #[must_use]
    pub fn with_memo(seed: WorldSeed, capacity: usize, eviction_fraction: f64) -> Self {
        Self {
            noise: SimplexNoise::new(seed),
            memo: Mutex::new(BoundedCache::with_eviction(capacity, eviction_fraction)),
            continent_memo: Mutex::new(BoundedCache::with_eviction(capacity, eviction_fraction)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// The underlying noise lattice.
    #[inline]
    #[must_use]
    pub fn noise(&self) -> &SimplexNoise {
        &self.noise
    }

    /// Memoized FBM in `[0, 1]`.
    #[must_use]
    pub fn fbm(&self, x: f64, y: f64, options: &FbmOptions) -> f64 {
        let key = FbmKey {
            x: centi(x),
            y: centi(y),
            scale: options.scale.to_bits(),
            octaves: options.octaves,
            persistence: options.persistence.to_bits(),
            lacunarity: options.lacunarity.to_bits(),
            frequency: options.frequency.to_bits(),
            ridged: options.ridged,
        };

        if let Some(&value) = self.memo.lock().get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return value;
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        #[allow(clippy::cast_precision_loss)]
        let value = self.compute(key.x as f64 / 100.0, key.y as f64 / 100.0, options);

        let evicted = self.memo.lock().insert(key, value);
        self.record_evictions(evicted);
        value
    }

    /// FBM without touching the memo.
    ///
    /// Coordinates are still rounded to two decimals so the result matches
    /// [`FractalSynthesizer::fbm`].
    #[must_use]
    pub fn fbm_uncached(&self, x: f64, y: f64, options: &FbmOptions) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let (rx, ry) = (centi(x) as f64 / 100.0, centi(y) as f64 / 100.0);
        self.compute(rx, ry, options)
    }

    fn compute(&self, x: f64, y: f64, options: &FbmOptions) -> f64 {
        if options.octaves <= FbmOptions::FAST_PATH_OCTAVES && !options.ridged {
            return self.fbm_shallow(x, y, options);
        }

        let mut value = 0.0;
        let mut amplitude = options.amplitude;
        let mut frequency = options.frequency;
        let mut max_value = 0.0;

        for _ in 0..options.octaves {
            let n = self
                .noise
                .sample(x * frequency * options.scale, y * frequency * options.scale);
            let layer = if options.ridged {
                let ridge = 1.0 - n.abs();
                ridge * ridge
            } else {
                (n + 1.0) * 0.5
            };
            value += layer * amplitude;
            max_value += amplitude;
            amplitude *= options.persistence;
            frequency *= options.lacunarity;
        }

        normalize(value, max_value)
    }

    /// Unrolled path for 1-3 non-ridged octaves.
    fn fbm_shallow(&self, x: f64, y: f64, options: &FbmOptions) -> f64 {
        let (sx, sy) = (x * options.scale, y * options.scale);
        let f0 = options.frequency;
        let a0 = options.amplitude;

        let mut value = (self.noise.sample(sx * f0, sy * f0) + 1.0) * 0.5 * a0;
        let mut max_value = a0;

        if options.octaves >= 2 {
            let f1 = f0 * options.lacunarity;
            let a1 = a0 * options.persistence;
            value += (self.noise.sample(sx * f1, sy * f1) + 1.0) * 0.5 * a1;
            max_value += a1;

            if options.octaves >= 3 {
                let f2 = f1 * options.lacunarity;
                let a2 = a1 * options.persistence;
                value += (self.noise.sample(sx * f2, sy * f2) + 1.0) * 0.5 * a2;
                max_value += a2;
            }
        }

        normalize(value, max_value)
    }

    /// Continent mask in `(0, 1)`.
    ///
    /// A 3-octave base FBM is perturbed by an offset edge FBM, then pushed
    /// through a sigmoid so land and ocean separate sharply.
    #[must_use]
    pub fn continent_value(&self, x: f64, y: f64, options: &ContinentOptions) -> f64 {
        let key = (x.to_bits(), y.to_bits());
        if let Some(&value) = self.continent_memo.lock().get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return value;
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let base = self.fbm(
            x,
            y,
            &FbmOptions {
                scale: options.scale,
                octaves: 3,
                persistence: 0.5,
                lacunarity: 2.0,
                ..FbmOptions::DEFAULT
            },
        );
        let edge = self.fbm(
            x + 1000.0,
            y + 1000.0,
            &FbmOptions {
                scale: options.edge_scale,
                octaves: 2,
                persistence: 0.6,
                lacunarity: 2.0,
                ..FbmOptions::DEFAULT
            },
        );

        let combined = base + edge * options.edge_amount - options.edge_amount / 2.0;
        let value = 1.0 / (1.0 + (-options.sharpness * (combined - options.threshold)).exp());

        let evicted = self.continent_memo.lock().insert(key, value);
        self.record_evictions(evicted);
        value
    }

    /// Drops every memoized value.
    pub fn clear_memo(&self) {
        self.memo.lock().clear();
        self.continent_memo.lock().clear();
    }

    /// Number of memoized FBM and continent values.
    #[must_use]
    pub fn memo_len(&self) -> usize {
        self.memo.lock().len() + self.continent_memo.lock().len()
    }

    /// Hit, miss and eviction counters since construction.
    #[must_use]
    pub fn memo_stats(&self) -> MemoStats {
        MemoStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    fn record_evictions(&self, evicted: usize) {
        if evicted > 0 {
            self.evictions.fetch_add(evicted as u64, Ordering::Relaxed);
            tracing::trace!("FBM memo evicted {} entries", evicted);
        }
    }
}

/// Divides by the amplitude sum and clamps to `[0, 1]`.
#[inline]
fn normalize(value: f64, max_value: f64) -> f64 {
    if max_value > 0.0 {
        (value / max_value).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synth() -> FractalSynthesizer {
        FractalSynthesizer::new(WorldSeed::new(42.0))
    }

    #[test]
    fn test_fbm_range() {
        let s = synth();
        let ridged = FbmOptions {
            ridged: true,
            octaves: 4,
            ..FbmOptions::DEFAULT
        };
        for i in -50..50 {
            let (x, y) = (f64::from(i) * 37.1, f64::from(i) * -11.3);
            let v = s.fbm(x, y, &FbmOptions::DEFAULT);
            assert!((0.0..=1.0).contains(&v), "fbm {v} out of range");
            let r = s.fbm(x, y, &ridged);
            assert!((0.0..=1.0).contains(&r), "ridged {r} out of range");
        }
    }

    #[test]
    fn test_memo_hit_matches_fresh_value() {
        let s = synth();
        let options = FbmOptions {
            octaves: 5,
            ..FbmOptions::DEFAULT
        };
        let first = s.fbm(123.456, -78.9, &options);
        let second = s.fbm(123.456, -78.9, &options);
        let fresh = s.fbm_uncached(123.456, -78.9, &options);

        assert_eq!(first.to_bits(), second.to_bits());
        assert_eq!(first.to_bits(), fresh.to_bits());
        assert_eq!(s.memo_stats().hits, 1);
    }

    #[test]
    fn test_coordinates_round_to_two_decimals() {
        let s = synth();
        let a = s.fbm(10.001, 20.004, &FbmOptions::DEFAULT);
        let b = s.fbm(10.0, 20.0, &FbmOptions::DEFAULT);
        assert_eq!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn test_fast_path_agrees_with_general_loop() {
        let s = synth();
        let options = FbmOptions {
            octaves: 3,
            persistence: 0.6,
            lacunarity: 2.3,
            ..FbmOptions::DEFAULT
        };
        for i in 0..20 {
            let (x, y) = (f64::from(i) * 91.0, f64::from(i) * 53.0);
            let fast = s.fbm_shallow(x, y, &options);

            let mut value = 0.0;
            let mut max_value = 0.0;
            let (mut amp, mut freq) = (1.0, 1.0);
            for _ in 0..3 {
                let n = s.noise().sample(x * freq * options.scale, y * freq * options.scale);
                value += (n + 1.0) * 0.5 * amp;
                max_value += amp;
                amp *= options.persistence;
                freq *= options.lacunarity;
            }
            assert!((fast - value / max_value).abs() < 1e-12);
        }
    }

    #[test]
    fn test_memo_is_bounded() {
        let s = FractalSynthesizer::with_memo(WorldSeed::new(1.0), 16, 0.25);
        for i in 0..200 {
            let _ = s.fbm(f64::from(i), 0.0, &FbmOptions::DEFAULT);
        }
        assert!(s.memo_len() <= 16);
        assert!(s.memo_stats().evictions > 0);
    }

    #[test]
    fn test_continent_is_a_sigmoid() {
        let s = synth();
        let options = ContinentOptions::default();
        for i in -20..20 {
            let c = s.continent_value(f64::from(i) * 1500.0, f64::from(i) * 700.0, &options);
            assert!(c > 0.0 && c < 1.0, "continent {c} outside (0, 1)");
        }
    }

    #[test]
    fn test_clear_memo_empties_both_memos() {
        let s = synth();
        let _ = s.continent_value(5.0, 5.0, &ContinentOptions::default());
        assert!(s.memo_len() > 0);
        s.clear_memo();
        assert_eq!(s.memo_len(), 0);
    }
}
