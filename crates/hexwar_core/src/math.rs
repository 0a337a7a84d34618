//! Fixed-point math utilities for the territory simulation.
//!
//! Positions, control levels, health and timers are all fixed-point so two
//! worlds built from the same seed stay bit-identical on every platform.

use fixed::traits::ToFixed;
use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
pub type Fixed = I32F32;

/// √3, used by hex geometry.
pub const SQRT_3: f64 = 1.732_050_807_568_877_2;

/// Fixed-point 2D vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec2Fixed {
    /// X coordinate.
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Y coordinate.
    #[serde(with = "fixed_serde")]
    pub y: Fixed,
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

/// Cosine/sine pairs for 16 evenly spaced headings, starting at +X and
/// turning towards +Y in 22.5 degree steps.
const HEADINGS: [(f64, f64); 16] = [
    (1.0, 0.0),
    (0.923_879_532_5, 0.382_683_432_4),
    (0.707_106_781_2, 0.707_106_781_2),
    (0.382_683_432_4, 0.923_879_532_5),
    (0.0, 1.0),
    (-0.382_683_432_4, 0.923_879_532_5),
    (-0.707_106_781_2, 0.707_106_781_2),
    (-0.923_879_532_5, 0.382_683_432_4),
    (-1.0, 0.0),
    (-0.923_879_532_5, -0.382_683_432_4),
    (-0.707_106_781_2, -0.707_106_781_2),
    (-0.382_683_432_4, -0.923_879_532_5),
    (0.0, -1.0),
    (0.382_683_432_4, -0.923_879_532_5),
    (0.707_106_781_2, -0.707_106_781_2),
    (0.923_879_532_5, -0.382_683_432_4),
];

/// Number of discrete headings returned by [`heading`].
pub const HEADING_COUNT: usize = HEADINGS.len();

/// Unit vector for heading `index` (wraps modulo [`HEADING_COUNT`]).
#[must_use]
pub fn heading(index: i64) -> Vec2Fixed {
    let wrapped = index.rem_euclid(HEADING_COUNT as i64) as usize;
    let (cos, sin) = HEADINGS[wrapped];
    Vec2Fixed::from_num(cos, sin)
}

impl Vec2Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Create a vector from any numeric pair.
    #[must_use]
    pub fn from_num<T: ToFixed>(x: T, y: T) -> Self {
        Self::new(Fixed::from_num(x), Fixed::from_num(y))
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
    };

    /// Calculate squared distance (avoids sqrt for comparisons).
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Euclidean distance.
    #[must_use]
    pub fn distance(self, other: Self) -> Fixed {
        fixed_sqrt(self.distance_squared(other))
    }

    /// Vector length.
    #[must_use]
    pub fn length(self) -> Fixed {
        fixed_sqrt(self.dot(self))
    }

    /// Multiply both components by a scalar.
    #[must_use]
    pub fn scale(self, factor: Fixed) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    /// Clamp both components into the rectangle `[0, max.x] x [0, max.y]`.
    #[must_use]
    pub fn clamp_to(self, max: Self) -> Self {
        Self::new(
            self.x.clamp(Fixed::ZERO, max.x),
            self.y.clamp(Fixed::ZERO, max.y),
        )
    }

    /// Dot product of two vectors.
    #[must_use]
    pub fn dot(self, other: Self) -> Fixed {
        self.x * other.x + self.y * other.y
    }

    /// Linearly interpolate between two vectors.
    #[must_use]
    pub fn lerp(self, other: Self, t: Fixed) -> Self {
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }

    /// Normalize vector using fixed-point math.
    #[must_use]
    pub fn normalize(self) -> Self {
        let len_sq = self.dot(self);

        if len_sq == Fixed::ZERO {
            return Self::ZERO;
        }

        let len = fixed_sqrt(len_sq);
        if len == Fixed::ZERO {
            return Self::ZERO;
        }

        Self::new(self.x / len, self.y / len)
    }
}

/// Computes the square root of a fixed-point number using binary search.
#[must_use]
pub fn fixed_sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    let mut low = Fixed::ZERO;
    let mut high = if value > Fixed::from_num(1) {
        value
    } else {
        Fixed::from_num(1)
    };

    for _ in 0..48 {
        let mid = (low + high) / Fixed::from_num(2);
        let mid_sq = mid.saturating_mul(mid);

        if mid_sq <= value {
            low = mid;
        } else {
            high = mid;
        }
    }

    low
}

impl std::ops::Add for Vec2Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::Sub for Vec2Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl std::ops::Neg for Vec2Fixed {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn epsilon() -> Fixed {
        Fixed::from_num(1) / Fixed::from_num(10000)
    }

    #[test]
    fn test_distance_three_four_five() {
        let a = Vec2Fixed::from_num(3, 0);
        let b = Vec2Fixed::from_num(0, 4);
        assert_eq!(a.distance_squared(b), Fixed::from_num(25));
        assert!((a.distance(b) - Fixed::from_num(5)).abs() < epsilon());
    }

    #[test]
    fn test_headings_are_unit_length() {
        for i in 0..HEADING_COUNT as i64 {
            let len_sq = heading(i).dot(heading(i));
            assert!(
                (len_sq - Fixed::from_num(1)).abs() < epsilon(),
                "heading {i} has length² {len_sq}"
            );
        }
    }

    #[test]
    fn test_heading_wraps_negative_indices() {
        assert_eq!(heading(-1), heading(15));
        assert_eq!(heading(16), heading(0));
        assert_eq!(heading(8), -heading(0));
    }

    #[test]
    fn test_clamp_to_world_rect() {
        let max = Vec2Fixed::from_num(100, 50);
        assert_eq!(Vec2Fixed::from_num(-5, 70).clamp_to(max), Vec2Fixed::from_num(0, 50));
        assert_eq!(Vec2Fixed::from_num(40, 10).clamp_to(max), Vec2Fixed::from_num(40, 10));
    }

    #[test]
    fn test_normalize_preserves_direction() {
        let norm = Vec2Fixed::from_num(3, 4).normalize();
        assert!((norm.dot(norm) - Fixed::from_num(1)).abs() < epsilon());
        let ratio_diff = norm.x * Fixed::from_num(4) - norm.y * Fixed::from_num(3);
        assert!(ratio_diff.abs() < epsilon());
        assert_eq!(Vec2Fixed::ZERO.normalize(), Vec2Fixed::ZERO);
    }

    #[test]
    fn test_scale_and_lerp() {
        let v = Vec2Fixed::from_num(2, -3).scale(Fixed::from_num(2));
        assert_eq!(v, Vec2Fixed::from_num(4, -6));
        let mid = Vec2Fixed::ZERO.lerp(Vec2Fixed::from_num(10, 20), Fixed::from_num(0.5));
        assert_eq!(mid, Vec2Fixed::from_num(5, 10));
    }
}
