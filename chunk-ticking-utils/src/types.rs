// Wrapper types making it harder to accidentaly mix up chunk and dimension coordinates.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::math::{Vector2, Vector3};

/// Bit width of a chunk edge. Chunks are `1 << CHUNK_SHIFT` blocks wide.
pub const CHUNK_SHIFT: u32 = 4;

/// Identifier of an independently simulated world instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DimensionId(pub i32);

impl DimensionId {
    /// The overworld.
    pub const OVERWORLD: Self = Self(0);
    /// The nether.
    pub const NETHER: Self = Self(1);
    /// The end.
    pub const THE_END: Self = Self(2);

    /// Returns a readable name for well known dimensions.
    #[must_use]
    pub const fn name(self) -> Option<&'static str> {
        match self.0 {
            0 => Some("overworld"),
            1 => Some("nether"),
            2 => Some("the_end"),
            _ => None,
        }
    }
}

impl Display for DimensionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "dimension#{}", self.0),
        }
    }
}

/// A chunk position. `y` of the inner vector is the world z axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkPos(pub Vector2<i32>);

impl ChunkPos {
    /// Creates a chunk position from grid coordinates.
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self(Vector2::new(x, z))
    }

    /// The grid x coordinate.
    #[must_use]
    pub const fn x(self) -> i32 {
        self.0.x
    }

    /// The grid z coordinate.
    #[must_use]
    pub const fn z(self) -> i32 {
        self.0.y
    }

    /// Returns the chunk containing a world-space position.
    ///
    /// The position is floored before shifting, so `-0.5` lands in chunk `-1`.
    /// Non-finite values saturate instead of panicking.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_world(pos: Vector3<f64>) -> Self {
        let block_x = pos.x.floor() as i32;
        let block_z = pos.z.floor() as i32;
        Self::new(block_x >> CHUNK_SHIFT, block_z >> CHUNK_SHIFT)
    }

    /// Returns the chunk at the given offset, or `None` if it falls off the grid.
    #[must_use]
    pub fn offset(self, dx: i64, dz: i64) -> Option<Self> {
        let x = i32::try_from(i64::from(self.x()) + dx).ok()?;
        let z = i32::try_from(i64::from(self.z()) + dz).ok()?;
        Some(Self::new(x, z))
    }

    /// Chebyshev distance between two chunks, in chunks.
    #[must_use]
    pub fn chebyshev_distance(self, other: Self) -> u32 {
        let dx = self.x().abs_diff(other.x());
        let dz = self.z().abs_diff(other.z());
        dx.max(dz)
    }
}

impl Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.x(), self.z())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_world_floors_before_shifting() {
        assert_eq!(
            ChunkPos::from_world(Vector3::new(0.0, 64.0, 0.0)),
            ChunkPos::new(0, 0)
        );
        assert_eq!(
            ChunkPos::from_world(Vector3::new(15.99, 0.0, 16.0)),
            ChunkPos::new(0, 1)
        );
        assert_eq!(
            ChunkPos::from_world(Vector3::new(-0.5, 0.0, -16.0)),
            ChunkPos::new(-1, -1)
        );
        assert_eq!(
            ChunkPos::from_world(Vector3::new(-16.5, 0.0, -17.0)),
            ChunkPos::new(-2, -2)
        );
    }

    #[test]
    fn test_from_world_non_finite() {
        let pos = ChunkPos::from_world(Vector3::new(f64::NAN, 0.0, f64::INFINITY));
        assert_eq!(pos, ChunkPos::new(0, i32::MAX >> CHUNK_SHIFT));

        let pos = ChunkPos::from_world(Vector3::new(f64::NEG_INFINITY, 0.0, -1e300));
        assert_eq!(
            pos,
            ChunkPos::new(i32::MIN >> CHUNK_SHIFT, i32::MIN >> CHUNK_SHIFT)
        );
    }

    #[test]
    fn test_offset_stays_on_grid() {
        let pos = ChunkPos::new(i32::MAX, i32::MIN);
        assert_eq!(pos.offset(0, 0), Some(pos));
        assert_eq!(pos.offset(1, 0), None);
        assert_eq!(pos.offset(0, -1), None);
        assert_eq!(pos.offset(-1, 1), Some(ChunkPos::new(i32::MAX - 1, i32::MIN + 1)));
    }

    #[test]
    fn test_chebyshev_distance() {
        let origin = ChunkPos::new(0, 0);
        assert_eq!(origin.chebyshev_distance(ChunkPos::new(2, -1)), 2);
        assert_eq!(origin.chebyshev_distance(ChunkPos::new(-3, 3)), 3);
        assert_eq!(
            ChunkPos::new(i32::MIN, 0).chebyshev_distance(ChunkPos::new(i32::MAX, 0)),
            u32::MAX
        );
    }

    #[test]
    fn test_dimension_display() {
        assert_eq!(DimensionId::OVERWORLD.to_string(), "overworld");
        assert_eq!(DimensionId(7).to_string(), "dimension#7");
    }
}
