//! # Biomes
//!
//! Named biome identities with display colours, grouped into families.
//!
//! The [`catalog`] is fixed data. Classification logic lives in
//! [`crate::classifier`].

use std::fmt;

use serde::{Serialize, Serializer};

/// 24-bit display colour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb {
    /// Creates a colour from its channels.
    #[inline]
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Creates a colour from `0xRRGGBB`.
    #[inline]
    #[must_use]
    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xFF) as u8,
            g: ((hex >> 8) & 0xFF) as u8,
            b: (hex & 0xFF) as u8,
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A biome identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Biome {
    /// Stable identifier, e.g. `"temperate_forest"`.
    pub name: &'static str,
    /// Display colour.
    pub color: Rgb,
    /// Open water rather than land.
    pub water: bool,
}

impl Biome {
    /// A land biome.
    #[must_use]
    pub const fn land(name: &'static str, hex: u32) -> Self {
        Self {
            name,
            color: Rgb::from_hex(hex),
            water: false,
        }
    }

    /// A water biome.
    #[must_use]
    pub const fn water(name: &'static str, hex: u32) -> Self {
        Self {
            name,
            color: Rgb::from_hex(hex),
            water: true,
        }
    }

    /// Connecting water channel, shaded by intensity.
    ///
    /// Stronger channels are brighter blue.
    #[must_use]
    pub fn water_channel(intensity: f64) -> Self {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let c = (170.0 + intensity.clamp(0.0, 1.0) * 40.0).floor() as u8;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let color = Rgb::new(
            (f64::from(c) * 0.3).floor() as u8,
            (f64::from(c) * 0.6).floor() as u8,
            c,
        );
        Self {
            color,
            ..catalog::water::WATER_CHANNEL
        }
    }
}

impl fmt::Display for Biome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Rarity tier of a tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Rarity {
    /// Ordinary terrain.
    Common = 0,
    /// Slightly unusual terrain.
    Uncommon = 1,
    /// Rare terrain.
    Rare = 2,
    /// Epic terrain.
    Epic = 3,
    /// Legendary terrain.
    Legendary = 4,
    /// The most extreme terrain.
    Mythic = 5,
}

impl Rarity {
    /// Every tier from most to least common.
    pub const ALL: [Self; 6] = [
        Self::Common,
        Self::Uncommon,
        Self::Rare,
        Self::Epic,
        Self::Legendary,
        Self::Mythic,
    ];

    /// Maps a rarity score onto a tier.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score > 25.0 {
            Self::Mythic
        } else if score > 18.0 {
            Self::Legendary
        } else if score > 13.0 {
            Self::Epic
        } else if score > 8.0 {
            Self::Rare
        } else if score > 4.0 {
            Self::Uncommon
        } else {
            Self::Common
        }
    }

    /// Lowercase tier name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Common => "common",
            Self::Uncommon => "uncommon",
            Self::Rare => "rare",
            Self::Epic => "epic",
            Self::Legendary => "legendary",
            Self::Mythic => "mythic",
        }
    }
}

macro_rules! biome_family {
    ($(#[$doc:meta])* $family:ident, $kind:ident { $($konst:ident = $name:literal, $hex:literal;)+ }) => {
        $(#[$doc])*
        pub mod $family {
            use $crate::biome::Biome;

            $(
                #[doc = concat!("`", $name, "`")]
                pub const $konst: Biome = Biome::$kind($name, $hex);
            )+

            /// Every biome in this family.
            pub const ALL: &[Biome] = &[$($konst),+];
        }
    };
}

/// The fixed biome table.
pub mod catalog {
    use super::Biome;

    biome_family!(
        /// Active lava, highest priority.
        lava, land {
            MAGMA_FLOW = "magma_flow", 0xFF2200;
            LAVA_FLOW = "lava_flow", 0xFF5000;
            VOLCANIC_ROCK = "volcanic_rock", 0x6A3A28;
            VOLCANIC_SOIL = "volcanic_soil", 0x7D4B3A;
        }
    );

    biome_family!(
        /// Open and shallow sea.
        ocean, water {
            DEEP_OCEAN = "deep_ocean", 0x0E3B59;
            OCEAN = "ocean", 0x1A4F76;
            SEA = "sea", 0x2D6693;
            SHALLOWS = "shallows", 0x5D99B8;
        }
    );

    biome_family!(
        /// Shoreline zones just above the water level.
        coastal, land {
            SEA_CLIFF = "sea_cliff", 0x7A736B;
            SANDY_BEACH = "sandy_beach", 0xE8D7A7;
            ROCKY_SHORE = "rocky_shore", 0xA8A095;
            MARSHY_SHORE = "marshy_shore", 0x607A63;
            DUNES = "dunes", 0xD8CBA0;
            LITTORAL_SCRUB = "littoral_scrub", 0xA8AA80;
            SALT_MEADOW = "salt_meadow", 0x75A080;
            FLATS = "flats", 0xC0B990;
            THICKET = "thicket", 0x94A078;
            GROVE = "grove", 0x5B8A65;
        }
    );

    biome_family!(
        /// Inland water features.
        water, water {
            MOUNTAIN_LAKE = "mountain_lake", 0x3A7FA0;
            LAKE = "lake", 0x4A91AA;
            MOUNTAIN_RIVER = "mountain_river", 0x4A8FA0;
            RIVER = "river", 0x55AAC5;
            STREAM = "stream", 0x65B2C0;
            RIVULET = "rivulet", 0x6AADB6;
            WATER_CHANNEL = "water_channel", 0x4A80AA;
        }
    );

    biome_family!(
        /// Burnt volcanic ground.
        scorched, land {
            ACTIVE_VOLCANO = "active_volcano", 0x9A2A20;
            VOLCANIC_CALDERA = "volcanic_caldera", 0xB54A30;
            VOLCANIC_ASH = "volcanic_ash", 0x706055;
            LAVA_FIELDS = "lava_fields", 0x9D5A40;
        }
    );

    biome_family!(
        /// Steep terrain.
        cliff, land {
            SHEER_CLIFF = "sheer_cliff", 0x706860;
            MOSS_CLIFF = "moss_cliff", 0x5A6855;
            ROCKY_CLIFF = "rocky_cliff", 0x7A736B;
            STEEP_SLOPE = "steep_slope", 0x7D7468;
            RUGGED_SLOPE = "rugged_slope", 0x82796D;
        }
    );

    biome_family!(
        /// Height above 0.92.
        peaks, land {
            SNOW_CAP = "snow_cap", 0xFFFFFF;
            GLACIAL_PEAK = "glacial_peak", 0xF0FFFF;
            ALPINE_SNOW = "alpine_snow", 0xE8F0FF;
            SNOWY_PEAKS = "snowy_peaks", 0xD8E0EA;
            ROCKY_PEAKS = "rocky_peaks", 0xC0C0C8;
            VOLCANIC_PEAK = "volcanic_peak", 0xA03A25;
            OBSIDIAN_RIDGE = "obsidian_ridge", 0x55352F;
            CRAGGY_PEAKS = "craggy_peaks", 0x83756A;
            RUGGED_PEAKS = "rugged_peaks", 0xAAA0B5;
        }
    );

    biome_family!(
        /// Height above 0.85.
        mountain, land {
            GLACIER = "glacier", 0xCCEEFF;
            SNOW_FIELD = "snow_field", 0xE0F0FF;
            SNOWY_FOREST = "snowy_forest", 0xA5B5C5;
            MOUNTAIN_FOREST = "mountain_forest", 0x607D55;
            ROCKY_FOREST = "rocky_forest", 0x6D7A60;
            ALPINE_SHRUBS = "alpine_shrubs", 0x747C63;
            VOLCANIC_SLOPES = "volcanic_slopes", 0x8A4B3C;
            BARREN_SLOPES = "barren_slopes", 0x8E7F6E;
            MOUNTAIN_SCRUB = "mountain_scrub", 0x7D8766;
            BARE_MOUNTAIN = "bare_mountain", 0xA09085;
        }
    );

    biome_family!(
        /// High hills above the snow elevation threshold.
        high_hills, land {
            SNOW_PATCHED_HILLS = "snow_patched_hills", 0xD5E5F5;
            FOGGY_PEAKS = "foggy_peaks", 0xB0C0D0;
            ROCKY_SLOPES = "rocky_slopes", 0xA58775;
            ALPINE_MEADOW = "alpine_meadow", 0x8DAD70;
            HIGHLAND_FOREST = "highland_forest", 0x5D7B4A;
            HIGHLAND = "highland", 0x7B8F5D;
            ROCKY_HIGHLAND = "rocky_highland", 0x8D9075;
            MESA = "mesa", 0xB09579;
        }
    );

    biome_family!(
        /// Height above 0.58.
        uplands, land {
            MOUNTAIN_FROST = "mountain_frost", 0xC5D5E5;
            ANCIENT_FOREST = "ancient_forest", 0x29543A;
            TROPICAL_RAINFOREST = "tropical_rainforest", 0x306B44;
            TEMPERATE_FOREST = "temperate_forest", 0x3D7A4D;
            MOUNTAIN_TRANSITION = "mountain_transition", 0x5A7B59;
            ENCHANTED_GROVE = "enchanted_grove", 0x4E8956;
            WOODLAND = "woodland", 0x5D9555;
            SHRUBLAND = "shrubland", 0x8BA662;
            DRY_SHRUBLAND = "dry_shrubland", 0xA8A76C;
            SCRUBLAND = "scrubland", 0xB9A77C;
            BADLANDS = "badlands", 0xBC9668;
        }
    );

    biome_family!(
        /// Height above 0.5.
        midlands, land {
            FEY_FOREST = "fey_forest", 0x2E5D40;
            DEEP_FOREST = "deep_forest", 0x356848;
            DENSE_FOREST = "dense_forest", 0x3A7446;
            FOREST = "forest", 0x407B4C;
            LIGHT_FOREST = "light_forest", 0x558759;
            SCATTERED_TREES = "scattered_trees", 0x6A9861;
            PRAIRIE = "prairie", 0x91A86E;
            SAVANNA = "savanna", 0xB4A878;
            DRY_SAVANNA = "dry_savanna", 0xC2AA71;
        }
    );

    biome_family!(
        /// Height above 0.4.
        lowlands, land {
            SWAMP = "swamp", 0x4E6855;
            MARSH = "marsh", 0x5E7959;
            WET_GRASSLAND = "wet_grassland", 0x5F864A;
            GRASSLAND = "grassland", 0x6B9850;
            MEADOW = "meadow", 0x7BA758;
            PLAINS = "plains", 0x9CB568;
            DRY_GRASSLAND = "dry_grassland", 0xB1B173;
            ARID_PLAINS = "arid_plains", 0xC0A97A;
            DESERT_SCRUB = "desert_scrub", 0xCCAD6E;
        }
    );

    biome_family!(
        /// Height above 0.32.
        plains, land {
            BOG = "bog", 0x4D5E50;
            WETLAND = "wetland", 0x5A6A55;
            MOOR = "moor", 0x657355;
            LOWLAND = "lowland", 0x768355;
            DRY_PLAINS = "dry_plains", 0x8D9565;
            STEPPE = "steppe", 0xA6A072;
            CHALKY_PLAINS = "chalky_plains", 0xC8BC90;
            DESERT = "desert", 0xE8D7A7;
            BARREN_DESERT = "barren_desert", 0xF0E3B2;
        }
    );

    biome_family!(
        /// Lowest dry land.
        basins, land {
            MUDFLATS = "mudflats", 0x5F6855;
            DELTA = "delta", 0x6A7355;
            SALT_FLAT = "salt_flat", 0xD0C9AA;
            DRY_BASIN = "dry_basin", 0xE5D6A9;
        }
    );

    /// Every family, in classification order.
    pub const FAMILIES: &[&[Biome]] = &[
        lava::ALL,
        ocean::ALL,
        coastal::ALL,
        water::ALL,
        scorched::ALL,
        cliff::ALL,
        peaks::ALL,
        mountain::ALL,
        high_hills::ALL,
        uplands::ALL,
        midlands::ALL,
        lowlands::ALL,
        plains::ALL,
        basins::ALL,
    ];

    /// Iterates over every catalogued biome.
    pub fn all() -> impl Iterator<Item = &'static Biome> {
        FAMILIES.iter().flat_map(|family| family.iter())
    }

    /// Looks a biome up by name.
    #[must_use]
    pub fn by_name(name: &str) -> Option<Biome> {
        all().find(|b| b.name == name).copied()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_names_are_unique() {
        let mut seen = HashSet::new();
        for biome in catalog::all() {
            assert!(seen.insert(biome.name), "duplicate biome {}", biome.name);
        }
        assert_eq!(seen.len(), 103);
    }

    #[test]
    fn test_only_sea_and_inland_water_are_water() {
        for biome in catalog::all() {
            let expected = catalog::ocean::ALL.contains(biome) || catalog::water::ALL.contains(biome);
            assert_eq!(biome.water, expected, "{}", biome.name);
        }
    }

    #[test]
    fn test_hex_display() {
        assert_eq!(catalog::ocean::SHALLOWS.color.to_string(), "#5D99B8");
        assert_eq!(catalog::peaks::SNOW_CAP.color, Rgb::new(255, 255, 255));
    }

    #[test]
    fn test_water_channel_shading() {
        let faint = Biome::water_channel(0.0);
        let strong = Biome::water_channel(1.0);
        assert_eq!(faint.name, "water_channel");
        assert!(faint.water);
        assert_eq!(faint.color, Rgb::new(51, 102, 170));
        assert_eq!(strong.color, Rgb::new(63, 126, 210));
    }

    #[test]
    fn test_rarity_bands() {
        assert_eq!(Rarity::from_score(0.0), Rarity::Common);
        assert_eq!(Rarity::from_score(4.0), Rarity::Common);
        assert_eq!(Rarity::from_score(4.1), Rarity::Uncommon);
        assert_eq!(Rarity::from_score(12.0), Rarity::Rare);
        assert_eq!(Rarity::from_score(15.0), Rarity::Epic);
        assert_eq!(Rarity::from_score(20.0), Rarity::Legendary);
        assert_eq!(Rarity::from_score(40.0), Rarity::Mythic);
        assert!(Rarity::Mythic > Rarity::Common);
    }

    #[test]
    fn test_lookup_by_name() {
        assert_eq!(catalog::by_name("delta"), Some(catalog::basins::DELTA));
        assert_eq!(catalog::by_name("atlantis"), None);
    }
}
