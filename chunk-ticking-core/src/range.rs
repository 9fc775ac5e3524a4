//! Simulation range around an actor, in chunks.

use std::fmt::{self, Display};

use thiserror::Error;

/// Error produced when building a [`SimulationRange`] from a signed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("simulation range must not be negative, got {0}")]
pub struct RangeError(pub i32);

/// Chebyshev radius, in chunks, kept simulated around each actor.
///
/// A range of `R` covers the closed square `[-R, R]` on both axes around the
/// actor's own chunk, `(2R + 1)^2` chunks in total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SimulationRange(u32);

impl SimulationRange {
    /// Only the actor's own chunk.
    pub const ZERO: Self = Self(0);

    /// Creates a range from a chunk radius.
    #[must_use]
    pub const fn new(radius: u32) -> Self {
        Self(radius)
    }

    /// The radius in chunks.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// The radius widened for offset arithmetic.
    #[must_use]
    pub const fn radius(self) -> i64 {
        self.0 as i64
    }

    /// Number of chunks in the square neighbourhood.
    #[must_use]
    pub const fn area(self) -> u64 {
        let side = 2 * self.0 as u64 + 1;
        side * side
    }
}

impl TryFrom<i32> for SimulationRange {
    type Error = RangeError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        u32::try_from(value).map(Self).map_err(|_| RangeError(value))
    }
}

impl Display for SimulationRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} chunks", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_range_rejected() {
        assert_eq!(SimulationRange::try_from(-1), Err(RangeError(-1)));
        assert_eq!(
            SimulationRange::try_from(i32::MIN),
            Err(RangeError(i32::MIN))
        );
    }

    #[test]
    fn test_area() {
        assert_eq!(SimulationRange::ZERO.area(), 1);
        assert_eq!(SimulationRange::new(1).area(), 9);
        assert_eq!(SimulationRange::try_from(4).map(SimulationRange::area), Ok(81));
    }
}
