//! Morph pad: bilinear blending across the four banks
//!
//! Bank layout on the pad:
//!
//! ```text
//!   y=1  C ──── D
//!        │      │
//!   y=0  A ──── B
//!       x=0    x=1
//! ```
//!
//! Continuous settings are blended with the weights. Boolean settings
//! (delay log scale, shift/multiply order) cannot be meaningfully averaged
//! and are decided by a weighted vote instead.

use crate::types::NUM_BANKS;

/// Vote threshold: a flag wins when its banks carry more than this weight
const VOTE_THRESHOLD: f32 = 0.5;

/// Position on the morph pad, both axes in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MorphPosition {
    pub x: f32,
    pub y: f32,
}

impl MorphPosition {
    /// Create a position, clamping both axes
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x: x.clamp(0.0, 1.0),
            y: y.clamp(0.0, 1.0),
        }
    }

    pub fn weights(&self) -> MorphWeights {
        MorphWeights::from_position(*self)
    }
}

/// Per-bank blend weights for A, B, C, D (sum to 1)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MorphWeights([f32; NUM_BANKS]);

impl MorphWeights {
    pub fn from_position(pos: MorphPosition) -> Self {
        let (x, y) = (pos.x.clamp(0.0, 1.0), pos.y.clamp(0.0, 1.0));
        Self([
            (1.0 - x) * (1.0 - y),
            x * (1.0 - y),
            (1.0 - x) * y,
            x * y,
        ])
    }

    /// All weight on one bank
    pub fn solo(bank: usize) -> Self {
        let mut w = [0.0; NUM_BANKS];
        if let Some(slot) = w.get_mut(bank) {
            *slot = 1.0;
        }
        Self(w)
    }

    #[inline]
    pub fn as_array(&self) -> &[f32; NUM_BANKS] {
        &self.0
    }

    #[inline]
    pub fn get(&self, bank: usize) -> f32 {
        self.0[bank]
    }

    /// Weighted sum of one value per bank
    #[inline]
    pub fn blend(&self, values: [f32; NUM_BANKS]) -> f32 {
        self.0[0] * values[0] + self.0[1] * values[1] + self.0[2] * values[2] + self.0[3] * values[3]
    }

    /// Weighted vote: true when the banks with the flag set carry more than
    /// half the weight
    ///
    /// An exact 0.5 split resolves to false.
    pub fn vote(&self, flags: [bool; NUM_BANKS]) -> bool {
        let total: f32 = self
            .0
            .iter()
            .zip(flags)
            .filter(|(_, flag)| *flag)
            .map(|(w, _)| w)
            .sum();
        total > VOTE_THRESHOLD
    }
}

impl Default for MorphWeights {
    fn default() -> Self {
        Self::solo(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_partition_unity() {
        for i in 0..=10 {
            for j in 0..=10 {
                let w = MorphPosition::new(i as f32 / 10.0, j as f32 / 10.0).weights();
                let sum: f32 = w.as_array().iter().sum();
                assert!((sum - 1.0).abs() < 1e-6, "sum {} at ({}, {})", sum, i, j);
            }
        }
    }

    #[test]
    fn test_corner_weights_are_exact() {
        let corners = [((0.0, 0.0), 0), ((1.0, 0.0), 1), ((0.0, 1.0), 2), ((1.0, 1.0), 3)];
        for ((x, y), bank) in corners {
            let w = MorphPosition::new(x, y).weights();
            for b in 0..NUM_BANKS {
                let expected = if b == bank { 1.0 } else { 0.0 };
                assert_eq!(w.get(b), expected, "corner ({}, {}) bank {}", x, y, b);
            }
        }
    }

    #[test]
    fn test_position_clamped() {
        let pos = MorphPosition::new(-1.0, 2.0);
        assert_eq!(pos, MorphPosition { x: 0.0, y: 1.0 });
    }

    #[test]
    fn test_blend() {
        let w = MorphPosition::new(0.5, 0.0).weights();
        assert!((w.blend([0.0, 1.0, 5.0, 5.0]) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_vote_majority_and_tie() {
        let w = MorphPosition::new(0.75, 0.0).weights();
        assert!(w.vote([false, true, false, false]));
        assert!(!w.vote([true, false, false, false]));

        let tie = MorphPosition::new(0.5, 0.0).weights();
        assert!(!tie.vote([true, false, false, false]), "exact tie resolves to false");
        assert!(!tie.vote([false, true, false, false]), "exact tie resolves to false");
        assert!(tie.vote([true, true, false, false]));
    }
}
