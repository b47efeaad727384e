//! The 48 Data Matrix symbol sizes: 24 square, 6 rectangular and 18 DMRE.

use crate::error::{DecodeError, Result};

/// `count` RS blocks of `data_codewords` each
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EcBlock {
    /// Blocks in the group
    pub count: usize,
    /// Data codewords per block
    pub data_codewords: usize,
}

/// One symbol size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    /// 1 to 48
    pub number: u32,
    /// Symbol rows including finder and timing edges
    pub symbol_rows: usize,
    /// Symbol columns including finder and timing edges
    pub symbol_columns: usize,
    /// Rows of one data region
    pub region_rows: usize,
    /// Columns of one data region
    pub region_columns: usize,
    /// EC codewords in every block
    pub ec_codewords: usize,
    /// Block groups; only 144×144 has two
    pub blocks: &'static [EcBlock],
}

const fn v(
    number: u32,
    symbol_rows: usize,
    symbol_columns: usize,
    region_rows: usize,
    region_columns: usize,
    ec_codewords: usize,
    blocks: &'static [EcBlock],
) -> Version {
    Version {
        number,
        symbol_rows,
        symbol_columns,
        region_rows,
        region_columns,
        ec_codewords,
        blocks,
    }
}

/// ISO 16022 table 7 followed by the ISO 21471 rectangular extensions
pub static VERSIONS: [Version; 48] = [
    v(1, 10, 10, 8, 8, 5, &[EcBlock { count: 1, data_codewords: 3 }]),
    v(2, 12, 12, 10, 10, 7, &[EcBlock { count: 1, data_codewords: 5 }]),
    v(3, 14, 14, 12, 12, 10, &[EcBlock { count: 1, data_codewords: 8 }]),
    v(4, 16, 16, 14, 14, 12, &[EcBlock { count: 1, data_codewords: 12 }]),
    v(5, 18, 18, 16, 16, 14, &[EcBlock { count: 1, data_codewords: 18 }]),
    v(6, 20, 20, 18, 18, 18, &[EcBlock { count: 1, data_codewords: 22 }]),
    v(7, 22, 22, 20, 20, 20, &[EcBlock { count: 1, data_codewords: 30 }]),
    v(8, 24, 24, 22, 22, 24, &[EcBlock { count: 1, data_codewords: 36 }]),
    v(9, 26, 26, 24, 24, 28, &[EcBlock { count: 1, data_codewords: 44 }]),
    v(10, 32, 32, 14, 14, 36, &[EcBlock { count: 1, data_codewords: 62 }]),
    v(11, 36, 36, 16, 16, 42, &[EcBlock { count: 1, data_codewords: 86 }]),
    v(12, 40, 40, 18, 18, 48, &[EcBlock { count: 1, data_codewords: 114 }]),
    v(13, 44, 44, 20, 20, 56, &[EcBlock { count: 1, data_codewords: 144 }]),
    v(14, 48, 48, 22, 22, 68, &[EcBlock { count: 1, data_codewords: 174 }]),
    v(15, 52, 52, 24, 24, 42, &[EcBlock { count: 2, data_codewords: 102 }]),
    v(16, 64, 64, 14, 14, 56, &[EcBlock { count: 2, data_codewords: 140 }]),
    v(17, 72, 72, 16, 16, 36, &[EcBlock { count: 4, data_codewords: 92 }]),
    v(18, 80, 80, 18, 18, 48, &[EcBlock { count: 4, data_codewords: 114 }]),
    v(19, 88, 88, 20, 20, 56, &[EcBlock { count: 4, data_codewords: 144 }]),
    v(20, 96, 96, 22, 22, 68, &[EcBlock { count: 4, data_codewords: 174 }]),
    v(21, 104, 104, 24, 24, 56, &[EcBlock { count: 6, data_codewords: 136 }]),
    v(22, 120, 120, 18, 18, 68, &[EcBlock { count: 6, data_codewords: 175 }]),
    v(23, 132, 132, 20, 20, 62, &[EcBlock { count: 8, data_codewords: 163 }]),
    v(24, 144, 144, 22, 22, 62, &[EcBlock { count: 8, data_codewords: 156 }, EcBlock { count: 2, data_codewords: 155 }]),
    v(25, 8, 18, 6, 16, 7, &[EcBlock { count: 1, data_codewords: 5 }]),
    v(26, 8, 32, 6, 14, 11, &[EcBlock { count: 1, data_codewords: 10 }]),
    v(27, 12, 26, 10, 24, 14, &[EcBlock { count: 1, data_codewords: 16 }]),
    v(28, 12, 36, 10, 16, 18, &[EcBlock { count: 1, data_codewords: 22 }]),
    v(29, 16, 36, 14, 16, 24, &[EcBlock { count: 1, data_codewords: 32 }]),
    v(30, 16, 48, 14, 22, 28, &[EcBlock { count: 1, data_codewords: 49 }]),
    v(31, 8, 48, 6, 22, 15, &[EcBlock { count: 1, data_codewords: 18 }]),
    v(32, 8, 64, 6, 14, 18, &[EcBlock { count: 1, data_codewords: 24 }]),
    v(33, 8, 80, 6, 18, 22, &[EcBlock { count: 1, data_codewords: 32 }]),
    v(34, 8, 96, 6, 22, 28, &[EcBlock { count: 1, data_codewords: 38 }]),
    v(35, 8, 120, 6, 18, 32, &[EcBlock { count: 1, data_codewords: 49 }]),
    v(36, 8, 144, 6, 22, 36, &[EcBlock { count: 1, data_codewords: 63 }]),
    v(37, 12, 64, 10, 14, 27, &[EcBlock { count: 1, data_codewords: 43 }]),
    v(38, 12, 88, 10, 20, 36, &[EcBlock { count: 1, data_codewords: 64 }]),
    v(39, 16, 64, 14, 14, 36, &[EcBlock { count: 1, data_codewords: 62 }]),
    v(40, 20, 36, 18, 16, 28, &[EcBlock { count: 1, data_codewords: 44 }]),
    v(41, 20, 44, 18, 20, 34, &[EcBlock { count: 1, data_codewords: 56 }]),
    v(42, 20, 64, 18, 14, 42, &[EcBlock { count: 1, data_codewords: 84 }]),
    v(43, 22, 48, 20, 22, 38, &[EcBlock { count: 1, data_codewords: 72 }]),
    v(44, 24, 48, 22, 22, 41, &[EcBlock { count: 1, data_codewords: 80 }]),
    v(45, 24, 64, 22, 14, 46, &[EcBlock { count: 1, data_codewords: 108 }]),
    v(46, 26, 40, 24, 18, 38, &[EcBlock { count: 1, data_codewords: 70 }]),
    v(47, 26, 48, 24, 22, 42, &[EcBlock { count: 1, data_codewords: 90 }]),
    v(48, 26, 64, 24, 14, 50, &[EcBlock { count: 1, data_codewords: 118 }]),
];

impl Version {
    /// Version with exactly these dimensions
    pub fn for_dimensions(rows: usize, columns: usize) -> Result<&'static Version> {
        if rows & 1 != 0 || columns & 1 != 0 {
            return Err(DecodeError::Format("odd Data Matrix dimension"));
        }
        VERSIONS
            .iter()
            .find(|v| v.symbol_rows == rows && v.symbol_columns == columns)
            .ok_or(DecodeError::Format("unknown Data Matrix size"))
    }

    /// Number of RS blocks
    pub fn num_blocks(&self) -> usize {
        self.blocks.iter().map(|b| b.count).sum()
    }

    /// Data codewords over all blocks
    pub fn data_codewords(&self) -> usize {
        self.blocks.iter().map(|b| b.count * b.data_codewords).sum()
    }

    /// Data plus EC codewords
    pub fn total_codewords(&self) -> usize {
        self.data_codewords() + self.num_blocks() * self.ec_codewords
    }

    /// Data regions across and down
    pub fn regions(&self) -> (usize, usize) {
        (
            self.symbol_columns / self.region_columns,
            self.symbol_rows / self.region_rows,
        )
    }

    /// Size of the mapping matrix once finder and alignment edges are removed
    pub fn mapping_size(&self) -> (usize, usize) {
        let (across, down) = self.regions();
        (across * self.region_columns, down * self.region_rows)
    }

    /// True for square symbols
    pub fn is_square(&self) -> bool {
        self.symbol_rows == self.symbol_columns
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let version = Version::for_dimensions(10, 10).unwrap();
        assert_eq!(version.number, 1);
        assert_eq!(version.total_codewords(), 8);
        let version = Version::for_dimensions(16, 48).unwrap();
        assert_eq!(version.number, 30);
        assert!(Version::for_dimensions(11, 11).is_err());
        assert!(Version::for_dimensions(12, 14).is_err());
    }

    #[test]
    fn test_capacities() {
        let version = Version::for_dimensions(144, 144).unwrap();
        assert_eq!(version.num_blocks(), 10);
        assert_eq!(version.data_codewords(), 1558);
        assert_eq!(version.total_codewords(), 2178);
        assert_eq!(version.mapping_size(), (132, 132));
        for version in &VERSIONS {
            let (w, h) = version.mapping_size();
            // Every mapping module holds one codeword bit, bar at most four corner modules
            let bits = version.total_codewords() * 8;
            assert!(w * h >= bits && w * h - bits <= 4, "version {}", version.number);
        }
    }
}
