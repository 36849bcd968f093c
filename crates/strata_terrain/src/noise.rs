//! # Simplex Noise Implementation
//!
//! Deterministic 2D simplex noise keyed by a floating-point world seed.
//!
//! ## Determinism Guarantee
//!
//! The permutation table is shuffled by a sine-driven generator seeded
//! from the `WorldSeed`. Given the same seed, every instance produces
//! **exactly** the same lattice and therefore the same values.
//!
//! ## Failure Model
//!
//! Sampling never fails. A gradient index outside the gradient table
//! contributes zero instead of panicking.

/// World seed for deterministic generation.
///
/// Every noise channel of a world derives from this single value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldSeed(f64);

impl WorldSeed {
    /// Creates a new world seed.
    #[inline]
    #[must_use]
    pub const fn new(seed: f64) -> Self {
        Self(seed)
    }

    /// Returns the raw seed value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }

    /// Derives the seed for one noise channel.
    ///
    /// Channels sit at fixed additive offsets from the world seed so each
    /// field samples an independent lattice.
    #[inline]
    #[must_use]
    pub fn derive(self, channel: NoiseChannel) -> Self {
        Self(self.0 + channel.seed_offset())
    }
}

impl Default for WorldSeed {
    fn default() -> Self {
        Self(42.0)
    }
}

/// Independent noise lattices used by the terrain pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NoiseChannel {
    /// Continent mask, coastline jitter and water-network channels.
    Continent,
    /// Base elevation, region, anomaly, mountain and forest fields.
    Height,
    /// Raw moisture field.
    Moisture,
    /// Small-scale elevation detail.
    Detail,
    /// Rivers, capillaries and scorched ground.
    River,
    /// Lakes and ponds.
    Lake,
    /// Lava.
    Lava,
}

impl NoiseChannel {
    /// All channels in offset order.
    pub const ALL: [Self; 7] = [
        Self::Continent,
        Self::Height,
        Self::Moisture,
        Self::Detail,
        Self::River,
        Self::Lake,
        Self::Lava,
    ];

    /// Offset added to the world seed for this channel.
    #[must_use]
    pub const fn seed_offset(self) -> f64 {
        match self {
            Self::Continent => 0.0,
            Self::Height => 10_000.0,
            Self::Moisture => 20_000.0,
            Self::Detail => 30_000.0,
            Self::River => 40_000.0,
            Self::Lake => 50_000.0,
            Self::Lava => 60_000.0,
        }
    }
}

/// Sine-hash generator used only to shuffle the permutation table.
struct SineShuffle {
    state: f64,
    scale: f64,
}

impl SineShuffle {
    fn new(seed: WorldSeed) -> Self {
        Self {
            state: seed.value(),
            scale: seed.value().sin() * 10_000.0,
        }
    }

    /// Next value in `[0, 1)`.
    fn next_unit(&mut self) -> f64 {
        let x = self.state.sin() * self.scale;
        self.state += 1.0;
        x - x.floor()
    }
}

/// 8 gradient directions: 4 diagonals then 4 axes.
const GRADIENTS: [[i8; 2]; 8] = [
    [1, 1],
    [-1, 1],
    [1, -1],
    [-1, -1],
    [1, 0],
    [-1, 0],
    [0, 1],
    [0, -1],
];

/// Pre-computed permutation table for noise.
///
/// This is computed once from the seed and reused.
struct PermutationTable {
    /// 512-entry permutation table (256 entries, doubled for overflow handling).
    perm: [u8; 512],
    /// `perm` reduced modulo 12.
    perm12: [u8; 512],
}

impl PermutationTable {
    fn new(seed: WorldSeed) -> Self {
        let mut base = [0u8; 256];
        for (i, slot) in base.iter_mut().enumerate() {
            *slot = i as u8;
        }

        // Fisher-Yates from the top down
        let mut rng = SineShuffle::new(seed);
        for i in (1..256usize).rev() {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
            let j = (rng.next_unit() * (i + 1) as f64).floor() as usize;
            base.swap(i, j.min(i));
        }

        let mut perm = [0u8; 512];
        let mut perm12 = [0u8; 512];
        for i in 0..512 {
            perm[i] = base[i & 255];
            perm12[i] = perm[i] % 12;
        }

        Self { perm, perm12 }
    }

    /// Gradient slot for a lattice corner.
    #[inline]
    fn gradient_index(&self, ii: usize, jj: usize) -> usize {
        let hashed = (ii + usize::from(self.perm[jj])) & 255;
        usize::from(self.perm12[hashed] % 8)
    }
}

/// 2D Simplex noise generator.
///
/// Produces smooth, continuous noise values in the range [-1, 1].
///
/// # Example
///
/// ```rust,ignore
/// let noise = SimplexNoise::new(WorldSeed::new(42.0));
/// let value = noise.sample(100.5, 200.3);
/// assert!((-1.0..=1.0).contains(&value));
/// ```
pub struct SimplexNoise {
    perm_table: PermutationTable,
}

impl SimplexNoise {
    /// Skewing factor for 2D simplex grid.
    const F2: f64 = 0.366_025_403_784_438_6; // (sqrt(3) - 1) / 2
    /// Unskewing factor for 2D simplex grid.
    const G2: f64 = 0.211_324_865_405_187_1; // (3 - sqrt(3)) / 6

    /// Creates a new simplex noise generator from a seed.
    #[must_use]
    pub fn new(seed: WorldSeed) -> Self {
        Self {
            perm_table: PermutationTable::new(seed),
        }
    }

    /// Samples 2D simplex noise at the given coordinates.
    ///
    /// # Returns
    ///
    /// A value in the range [-1, 1].
    #[must_use]
    pub fn sample(&self, x: f64, y: f64) -> f64 {
        let skew = (x + y) * Self::F2;
        let i = fast_floor(x + skew);
        let j = fast_floor(y + skew);

        #[allow(clippy::cast_precision_loss)]
        let unskew = (i + j) as f64 * Self::G2;
        #[allow(clippy::cast_precision_loss)]
        let (x0, y0) = (x - (i as f64 - unskew), y - (j as f64 - unskew));

        let (i1, j1) = if x0 > y0 { (1usize, 0usize) } else { (0, 1) };

        #[allow(clippy::cast_precision_loss)]
        let (x1, y1) = (x0 - i1 as f64 + Self::G2, y0 - j1 as f64 + Self::G2);
        let x2 = x0 - 1.0 + 2.0 * Self::G2;
        let y2 = y0 - 1.0 + 2.0 * Self::G2;

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let (ii, jj) = ((i & 255) as usize, (j & 255) as usize);

        let table = &self.perm_table;
        let gi0 = table.gradient_index(ii, jj);
        let gi1 = table.gradient_index(ii + i1, jj + j1);
        let gi2 = table.gradient_index(ii + 1, jj + 1);

        let n0 = contribution(x0, y0, gi0);
        let n1 = contribution(x1, y1, gi1);
        let n2 = contribution(x2, y2, gi2);

        (70.0 * (n0 + n1 + n2)).clamp(-1.0, 1.0)
    }
}

/// Contribution from one corner of the simplex.
#[inline]
fn contribution(x: f64, y: f64, gradient_index: usize) -> f64 {
    let t = 0.5 - x * x - y * y;
    if t <= 0.0 {
        return 0.0;
    }
    let Some(grad) = GRADIENTS.get(gradient_index) else {
        return 0.0;
    };
    let t2 = t * t;
    t2 * t2 * (x * f64::from(grad[0]) + y * f64::from(grad[1]))
}

/// Floor to a lattice index.
///
/// Non-finite input lands on lattice cell 0.
#[inline]
fn fast_floor(x: f64) -> i64 {
    if !x.is_finite() {
        return 0;
    }
    #[allow(clippy::cast_possible_truncation)]
    let xi = x as i64;
    #[allow(clippy::cast_precision_loss)]
    let truncated = xi as f64;
    if x < truncated {
        xi - 1
    } else {
        xi
    }
}
