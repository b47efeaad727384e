use crate::error::{DecodeError, Result};
use crate::models::BitMatrix;

/// Mask pattern (0-7) XORed over the data modules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskPattern {
    /// (i + j) % 2 == 0
    Pattern0 = 0,
    /// i % 2 == 0
    Pattern1 = 1,
    /// j % 3 == 0
    Pattern2 = 2,
    /// (i + j) % 3 == 0
    Pattern3 = 3,
    /// (i/2 + j/3) % 2 == 0
    Pattern4 = 4,
    /// (i*j)%2 + (i*j)%3 == 0
    Pattern5 = 5,
    /// ((i*j)%2 + (i*j)%3) % 2 == 0
    Pattern6 = 6,
    /// ((i+j)%2 + (i*j)%3) % 2 == 0
    Pattern7 = 7,
}

impl MaskPattern {
    /// Every pattern, in reference order
    pub const ALL: [MaskPattern; 8] = [
        MaskPattern::Pattern0,
        MaskPattern::Pattern1,
        MaskPattern::Pattern2,
        MaskPattern::Pattern3,
        MaskPattern::Pattern4,
        MaskPattern::Pattern5,
        MaskPattern::Pattern6,
        MaskPattern::Pattern7,
    ];

    /// Pattern from its 3-bit reference
    pub fn from_bits(bits: u8) -> Result<Self> {
        Self::ALL
            .get(bits as usize)
            .copied()
            .ok_or(DecodeError::Format("invalid mask pattern"))
    }

    /// True if the module at row `i`, column `j` is flipped
    pub fn is_masked(&self, i: usize, j: usize) -> bool {
        match self {
            MaskPattern::Pattern0 => (i + j) % 2 == 0,
            MaskPattern::Pattern1 => i % 2 == 0,
            MaskPattern::Pattern2 => j % 3 == 0,
            MaskPattern::Pattern3 => (i + j) % 3 == 0,
            MaskPattern::Pattern4 => (i / 2 + j / 3) % 2 == 0,
            MaskPattern::Pattern5 => ((i * j) % 2 + (i * j) % 3) == 0,
            MaskPattern::Pattern6 => (((i * j) % 2) + ((i * j) % 3)) % 2 == 0,
            MaskPattern::Pattern7 => (((i + j) % 2) + ((i * j) % 3)) % 2 == 0,
        }
    }

    /// Flip every masked module of a `dimension`-square matrix, skipping
    /// modules set in `function_pattern`
    pub fn unmask(&self, bits: &mut BitMatrix, dimension: usize, function_pattern: &BitMatrix) {
        for i in 0..dimension {
            for j in 0..dimension {
                if self.is_masked(i, j) && !function_pattern.get(j, i) {
                    bits.flip(j, i);
                }
            }
        }
    }
}
