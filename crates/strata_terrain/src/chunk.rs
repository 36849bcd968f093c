//! # Chunk Addressing
//!
//! The tile plane is divided into square chunks so callers can invalidate
//! cached terrain one region at a time.
//!
//! Chunk size is a parameter of every operation; [`CHUNK_SIZE`] is the
//! default. Negative tile coordinates floor toward negative infinity, so
//! tile `-1` belongs to chunk `-1`, not chunk `0`.

use std::fmt;

/// Default chunk width and height in tiles.
pub const CHUNK_SIZE: u32 = 20;

/// Chunk coordinate (identifies a chunk in the tile grid).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    /// X coordinate (in chunks, not tiles).
    pub x: i32,
    /// Y coordinate (in chunks, not tiles).
    pub y: i32,
}

impl ChunkCoord {
    /// Creates a new chunk coordinate.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Chunk containing a tile, for the default chunk size.
    #[inline]
    #[must_use]
    pub const fn from_tile_pos(tile_x: i32, tile_y: i32) -> Self {
        Self::from_tile_pos_sized(tile_x, tile_y, CHUNK_SIZE)
    }

    /// Chunk containing a tile, for a given chunk size.
    ///
    /// A size of zero is treated as one.
    #[inline]
    #[must_use]
    pub const fn from_tile_pos_sized(tile_x: i32, tile_y: i32, chunk_size: u32) -> Self {
        let size = if chunk_size == 0 { 1 } else { chunk_size as i64 };
        Self {
            x: (tile_x as i64).div_euclid(size) as i32,
            y: (tile_y as i64).div_euclid(size) as i32,
        }
    }

    /// Tile rectangle covered by this chunk.
    #[must_use]
    pub fn bounds(self, chunk_size: u32) -> ChunkBounds {
        let size = i64::from(chunk_size.max(1));
        let min_x = i64::from(self.x) * size;
        let min_y = i64::from(self.y) * size;
        ChunkBounds {
            min_x,
            min_y,
            max_x: min_x + size - 1,
            max_y: min_y + size - 1,
        }
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// Inclusive tile rectangle of one chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkBounds {
    /// Lowest tile x.
    pub min_x: i64,
    /// Lowest tile y.
    pub min_y: i64,
    /// Highest tile x.
    pub max_x: i64,
    /// Highest tile y.
    pub max_y: i64,
}

impl ChunkBounds {
    /// Returns true if the tile lies inside.
    #[inline]
    #[must_use]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        let (x, y) = (i64::from(x), i64::from(y));
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Every tile inside that fits in `i32` coordinates, row by row.
    pub fn tiles(&self) -> impl Iterator<Item = (i32, i32)> {
        let (min_x, max_x) = (self.min_x, self.max_x);
        (self.min_y..=self.max_y)
            .filter_map(|y| i32::try_from(y).ok())
            .flat_map(move |y| {
                (min_x..=max_x)
                    .filter_map(|x| i32::try_from(x).ok())
                    .map(move |x| (x, y))
            })
    }
}

/// String key of the chunk containing a tile, e.g. `"-1,0"`.
#[must_use]
pub fn chunk_key_string(tile_x: i32, tile_y: i32) -> String {
    ChunkCoord::from_tile_pos(tile_x, tile_y).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_coord_from_tile() {
        assert_eq!(ChunkCoord::from_tile_pos(0, 0), ChunkCoord::new(0, 0));
        assert_eq!(ChunkCoord::from_tile_pos(19, 19), ChunkCoord::new(0, 0));
        assert_eq!(ChunkCoord::from_tile_pos(20, 20), ChunkCoord::new(1, 1));
        assert_eq!(ChunkCoord::from_tile_pos(-1, -1), ChunkCoord::new(-1, -1));
        assert_eq!(ChunkCoord::from_tile_pos(-20, -20), ChunkCoord::new(-1, -1));
        assert_eq!(ChunkCoord::from_tile_pos(-21, 5), ChunkCoord::new(-2, 0));
    }

    #[test]
    fn test_chunk_key_string() {
        assert_eq!(chunk_key_string(45, -3), "2,-1");
        assert_eq!(ChunkCoord::new(0, 7).to_string(), "0,7");
    }

    #[test]
    fn test_bounds_cover_exactly_one_chunk() {
        let bounds = ChunkCoord::new(-1, 2).bounds(20);
        assert_eq!(bounds.min_x, -20);
        assert_eq!(bounds.max_x, -1);
        assert_eq!(bounds.min_y, 40);
        assert_eq!(bounds.max_y, 59);
        assert_eq!(bounds.tiles().count(), 400);
        assert!(bounds.tiles().all(|(x, y)| bounds.contains(x, y)));
        assert!(!bounds.contains(0, 40));
    }

    #[test]
    fn test_custom_sizes() {
        assert_eq!(ChunkCoord::from_tile_pos_sized(31, -1, 16), ChunkCoord::new(1, -1));
        assert_eq!(ChunkCoord::from_tile_pos_sized(5, 5, 0), ChunkCoord::new(5, 5));
    }
}
