//! Viewport coordinates and their canonical map-key encoding.

use core::fmt;
use core::str::FromStr;
use thiserror::Error;

/// A viewport pixel position. Both components are non-negative.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct Coordinate {
    pub x: u32,
    pub y: u32,
}

/// Lossless `u64` encoding of a `Coordinate`: `x` in the high 32 bits, `y` in the low.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct CoordinateKey(u64);

/// Why a textual coordinate could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinateParseError {
    #[error("expected `x,y`, got {0:?}")]
    MissingSeparator(String),
    #[error("invalid {axis} component {value:?}")]
    InvalidComponent { axis: &'static str, value: String },
}

impl Coordinate {
    #[inline]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub const fn encode(self) -> CoordinateKey {
        CoordinateKey(((self.x as u64) << 32) | self.y as u64)
    }

    /// Convert floating-point input (e.g. from a pointer event) into a coordinate.
    ///
    /// Returns `None` for non-finite, negative or out-of-range components.
    /// Fractional parts are truncated towards zero.
    pub fn from_f64(x: f64, y: f64) -> Option<Self> {
        let in_range = |value: f64| (0.0..=f64::from(u32::MAX)).contains(&value);
        (is_valid(x, y) && in_range(x) && in_range(y)).then(|| Self::new(x as u32, y as u32))
    }

    /// Ordering key for row-major traversal (`y` first, then `x`).
    #[inline]
    pub const fn row_major(self) -> (u32, u32) {
        (self.y, self.x)
    }
}

impl CoordinateKey {
    #[inline]
    pub const fn decode(self) -> Coordinate {
        Coordinate::new((self.0 >> 32) as u32, self.0 as u32)
    }

    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<Coordinate> for CoordinateKey {
    fn from(coord: Coordinate) -> Self {
        coord.encode()
    }
}

impl From<CoordinateKey> for Coordinate {
    fn from(key: CoordinateKey) -> Self {
        key.decode()
    }
}

/// Whether both components are finite numbers (not NaN, not infinite).
#[inline]
pub fn is_valid(x: f64, y: f64) -> bool {
    x.is_finite() && y.is_finite()
}

impl fmt::Display for Coordinate {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{},{}", self.x, self.y)
    }
}

impl FromStr for Coordinate {
    type Err = CoordinateParseError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        let (raw_x, raw_y) = source
            .split_once(',')
            .ok_or_else(|| CoordinateParseError::MissingSeparator(source.to_owned()))?;
        let component = |axis: &'static str, value: &str| {
            value
                .trim()
                .parse::<u32>()
                .map_err(|_| CoordinateParseError::InvalidComponent {
                    axis,
                    value: value.to_owned(),
                })
        };
        Ok(Self::new(component("x", raw_x)?, component("y", raw_y)?))
    }
}
