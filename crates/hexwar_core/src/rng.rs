//! Seeded random source for the simulation.
//!
//! Every roll the world makes (pattern geometry, engagement chance, resource
//! spawns, obstacle placement, rule-based decisions) comes from one
//! [`SimRng`], so identical seeds give identical matches.

use serde::{Deserialize, Serialize};

use crate::math::Fixed;

/// Simple deterministic RNG (64-bit LCG).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SimRng {
    state: u64,
}

impl SimRng {
    /// Create a generator from a seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            state: seed.wrapping_add(0x9E37_79B9_7F4A_7C15),
        }
    }

    /// Advance and return the raw state.
    pub fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(0x5851_F42D_4C95_7F2D)
            .wrapping_add(0x1405_7B7E_F767_814F);
        self.state
    }

    /// Next 32 random bits (taken from the high half, the low bits of an LCG
    /// have short periods).
    pub fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    /// Uniform value in `[0, 1)`.
    pub fn next_fixed(&mut self) -> Fixed {
        Fixed::from_bits(i64::from(self.next_u32()))
    }

    /// Uniform value in `[min, max)`.
    pub fn range_fixed(&mut self, min: Fixed, max: Fixed) -> Fixed {
        if max <= min {
            return min;
        }
        min + (max - min) * self.next_fixed()
    }

    /// Uniform integer in `[min, max]` (inclusive).
    pub fn range_inclusive(&mut self, min: u32, max: u32) -> u32 {
        if max <= min {
            return min;
        }
        let span = u64::from(max - min) + 1;
        min + (u64::from(self.next_u32()) % span) as u32
    }

    /// Uniform index in `[0, len)`. Returns 0 for an empty range.
    pub fn index(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        (u64::from(self.next_u32()) % len as u64) as usize
    }

    /// Returns true with probability `p`.
    pub fn chance(&mut self, p: Fixed) -> bool {
        self.next_fixed() < p
    }
}

impl Default for SimRng {
    fn default() -> Self {
        Self::new(0)
    }
}
