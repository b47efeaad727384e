//! QR versions 1-40: dimensions, alignment pattern centers, EC block layout
//! and the BCH-protected version information.

use super::ErrorCorrectionLevel;
use crate::error::{DecodeError, Result};
use crate::models::BitMatrix;

// Tables from the QR Code specification (Model 2). Index: [ec_level][version]
const ECC_CODEWORDS_PER_BLOCK: [[i8; 41]; 4] = [
    [
        -1, 7, 10, 15, 20, 26, 18, 20, 24, 30, 18, 20, 24, 26, 30, 22, 24, 28, 30, 28, 28, 28, 28, 30, 30, 26, 28,
        30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // Low
    [
        -1, 10, 16, 26, 18, 24, 16, 18, 22, 22, 26, 30, 22, 22, 24, 24, 28, 28, 26, 26, 26, 26, 28, 28, 28, 28,
        28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28,
    ], // Medium
    [
        -1, 13, 22, 18, 26, 18, 24, 18, 22, 20, 24, 28, 26, 24, 20, 30, 24, 28, 28, 26, 30, 28, 30, 30, 30, 30,
        28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // Quartile
    [
        -1, 17, 28, 22, 16, 22, 28, 26, 26, 24, 28, 24, 28, 22, 24, 24, 30, 28, 28, 26, 28, 30, 24, 30, 30, 30,
        30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // High
];

const NUM_ERROR_CORRECTION_BLOCKS: [[i8; 41]; 4] = [
    [
        -1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 4, 4, 4, 4, 4, 6, 6, 6, 6, 7, 8, 8, 9, 9, 10, 12, 12, 12, 13, 14, 15, 16,
        17, 18, 19, 19, 20, 21, 22, 24, 25,
    ], // Low
    [
        -1, 1, 1, 1, 2, 2, 4, 4, 4, 5, 5, 5, 8, 9, 9, 10, 10, 11, 13, 14, 16, 17, 17, 18, 20, 21, 23, 25, 26, 28,
        29, 31, 33, 35, 37, 38, 40, 43, 45, 47, 49,
    ], // Medium
    [
        -1, 1, 1, 2, 2, 4, 4, 6, 6, 8, 8, 8, 10, 12, 16, 12, 17, 16, 18, 21, 20, 23, 23, 25, 27, 29, 34, 34, 35,
        38, 40, 43, 45, 48, 51, 53, 56, 59, 62, 65, 68,
    ], // Quartile
    [
        -1, 1, 1, 2, 4, 4, 4, 5, 6, 8, 8, 11, 11, 16, 16, 18, 16, 19, 21, 25, 25, 25, 34, 30, 32, 35, 37, 40, 42,
        45, 48, 51, 54, 57, 60, 63, 66, 70, 74, 77, 81,
    ], // High
];

/// BCH(18,6) generator for version information
const VERSION_INFO_POLY: u32 = 0x1F25;

/// Version information codewords for versions 7 to 40
const VERSION_DECODE_INFO: [u32; 34] = build_version_decode_info();

const fn build_version_decode_info() -> [u32; 34] {
    let mut table = [0u32; 34];
    let mut i = 0;
    while i < 34 {
        let version = (i + 7) as u32;
        let mut rem = version << 12;
        let mut bit = 17;
        while bit >= 12 {
            if rem & (1 << bit) != 0 {
                rem ^= VERSION_INFO_POLY << (bit - 12);
            }
            bit -= 1;
        }
        table[i] = (version << 12) | rem;
        i += 1;
    }
    table
}

/// Error correction block group: `count` blocks of `data_codewords` each
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EcBlock {
    /// Blocks in the group
    pub count: usize,
    /// Data codewords per block
    pub data_codewords: usize,
}

/// Block layout of one version at one error correction level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EcBlocks {
    /// EC codewords in every block
    pub ec_codewords_per_block: usize,
    /// Short blocks first, then long blocks
    pub blocks: Vec<EcBlock>,
}

impl EcBlocks {
    /// Total number of blocks
    pub fn num_blocks(&self) -> usize {
        self.blocks.iter().map(|b| b.count).sum()
    }

    /// Total EC codewords across all blocks
    pub fn total_ec_codewords(&self) -> usize {
        self.ec_codewords_per_block * self.num_blocks()
    }
}

/// A QR Code version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version {
    number: u32,
}

impl Version {
    /// Version 1 to 40
    pub fn for_number(number: u32) -> Result<Self> {
        if !(1..=40).contains(&number) {
            return Err(DecodeError::Format("version out of range"));
        }
        Ok(Self { number })
    }

    /// Version implied by a symbol dimension, without reading version info
    pub fn provisional_for_dimension(dimension: usize) -> Result<Self> {
        if dimension % 4 != 1 || dimension < 21 {
            return Err(DecodeError::Format("dimension is not 1 mod 4"));
        }
        Self::for_number(((dimension - 17) / 4) as u32)
    }

    /// Version number
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Modules per side
    pub fn dimension(&self) -> usize {
        17 + 4 * self.number as usize
    }

    /// Centers of alignment patterns along one axis
    pub fn alignment_pattern_centers(&self) -> Vec<usize> {
        let version = self.number as usize;
        if version == 1 {
            return Vec::new();
        }
        let num_align = version / 7 + 2;
        let step = if version == 32 {
            26
        } else {
            (version * 4 + num_align * 2 + 1) / (num_align * 2 - 2) * 2
        };
        let mut positions = vec![0usize; num_align];
        positions[0] = 6;
        let mut pos = self.dimension() - 7;
        for i in (1..num_align).rev() {
            positions[i] = pos;
            pos -= step;
        }
        positions
    }

    /// Codewords (data and EC) the symbol holds
    pub fn total_codewords(&self) -> usize {
        let v = self.number as usize;
        let mut modules = (16 * v + 128) * v + 64;
        if v >= 2 {
            let num_align = v / 7 + 2;
            modules -= (25 * num_align - 10) * num_align - 55;
            if v >= 7 {
                modules -= 36;
            }
        }
        modules / 8
    }

    /// Block layout at `level`
    pub fn ec_blocks(&self, level: ErrorCorrectionLevel) -> EcBlocks {
        let idx = level.ordinal();
        let v = self.number as usize;
        let ec_per_block = ECC_CODEWORDS_PER_BLOCK[idx][v] as usize;
        let num_blocks = NUM_ERROR_CORRECTION_BLOCKS[idx][v] as usize;
        let total = self.total_codewords();
        let num_long = total % num_blocks;
        let short_data = total / num_blocks - ec_per_block;

        let mut blocks = vec![EcBlock {
            count: num_blocks - num_long,
            data_codewords: short_data,
        }];
        if num_long > 0 {
            blocks.push(EcBlock {
                count: num_long,
                data_codewords: short_data + 1,
            });
        }
        EcBlocks {
            ec_codewords_per_block: ec_per_block,
            blocks,
        }
    }

    /// Data codewords available at `level`
    pub fn data_codewords(&self, level: ErrorCorrectionLevel) -> usize {
        self.total_codewords() - self.ec_blocks(level).total_ec_codewords()
    }

    /// Decode 18 version information bits, tolerating up to 3 bit errors
    pub fn decode_version_information(version_bits: u32) -> Result<Self> {
        let mut best_difference = u32::MAX;
        let mut best_version = 0;
        for (i, &target) in VERSION_DECODE_INFO.iter().enumerate() {
            if target == version_bits {
                return Self::for_number(i as u32 + 7);
            }
            let difference = (version_bits ^ target).count_ones();
            if difference < best_difference {
                best_version = i as u32 + 7;
                best_difference = difference;
            }
        }
        if best_difference <= 3 {
            return Self::for_number(best_version);
        }
        Err(DecodeError::Format("unreadable version information"))
    }

    /// 18-bit version information word, for versions 7 and up
    pub fn version_info_bits(&self) -> Option<u32> {
        (self.number >= 7).then(|| VERSION_DECODE_INFO[self.number as usize - 7])
    }

    /// Matrix marking finder, separator, timing, alignment, format and
    /// version modules
    pub fn build_function_pattern(&self) -> BitMatrix {
        let dimension = self.dimension();
        let mut bits = BitMatrix::square(dimension);

        // Finder patterns plus separators and format information
        let _ = bits.set_region(0, 0, 9, 9);
        let _ = bits.set_region(dimension - 8, 0, 8, 9);
        let _ = bits.set_region(0, dimension - 8, 9, 8);

        let centers = self.alignment_pattern_centers();
        let max = centers.len();
        for x in 0..max {
            let i = centers[x] - 2;
            for y in 0..max {
                if (x == 0 && (y == 0 || y == max - 1)) || (x == max - 1 && y == 0) {
                    continue;
                }
                let _ = bits.set_region(centers[y] - 2, i, 5, 5);
            }
        }

        // Timing patterns
        let _ = bits.set_region(6, 9, 1, dimension - 17);
        let _ = bits.set_region(9, 6, dimension - 17, 1);

        if self.number > 6 {
            let _ = bits.set_region(dimension - 11, 0, 3, 6);
            let _ = bits.set_region(0, dimension - 11, 6, 3);
        }
        bits
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.number)
    }
}
