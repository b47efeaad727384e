use super::version::Version;
use crate::datamatrix::placement::Placement;
use crate::error::{DecodeError, Result};
use crate::models::BitMatrix;

/// Reads codewords out of a sampled Data Matrix symbol
pub struct BitMatrixParser {
    mapping: BitMatrix,
    version: &'static Version,
}

impl BitMatrixParser {
    /// Validate the symbol size and strip finder, timing and alignment edges
    pub fn new(bits: &BitMatrix) -> Result<Self> {
        let dimension = bits.height();
        if !(8..=144).contains(&dimension) || dimension & 1 != 0 {
            return Err(DecodeError::Format("bad Data Matrix dimension"));
        }
        let version = Version::for_dimensions(bits.height(), bits.width())?;
        Ok(Self {
            mapping: extract_data_region(bits, version),
            version,
        })
    }

    /// Symbol size
    pub fn version(&self) -> &'static Version {
        self.version
    }

    /// Codewords in placement order
    pub fn read_codewords(&self) -> Result<Vec<u8>> {
        let placement = Placement::new(self.mapping.height(), self.mapping.width());
        if placement.codewords.len() != self.version.total_codewords() {
            return Err(DecodeError::Format("codeword count does not match version"));
        }
        Ok(placement
            .codewords
            .iter()
            .map(|positions| {
                positions
                    .iter()
                    .fold(0u8, |byte, &(row, column)| (byte << 1) | self.mapping.get(column, row) as u8)
            })
            .collect())
    }
}

/// Concatenate the data regions, dropping the two-module border of each
fn extract_data_region(bits: &BitMatrix, version: &Version) -> BitMatrix {
    let (regions_across, regions_down) = version.regions();
    let (width, height) = version.mapping_size();
    let mut mapping = BitMatrix::new(width, height);
    for region_row in 0..regions_down {
        for region_column in 0..regions_across {
            for i in 0..version.region_rows {
                let read_row = region_row * (version.region_rows + 2) + 1 + i;
                let write_row = region_row * version.region_rows + i;
                for j in 0..version.region_columns {
                    let read_column = region_column * (version.region_columns + 2) + 1 + j;
                    if bits.get(read_column, read_row) {
                        mapping.set(region_column * version.region_columns + j, write_row);
                    }
                }
            }
        }
    }
    mapping
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_sizes() {
        assert!(BitMatrixParser::new(&BitMatrix::square(9)).is_err());
        assert!(BitMatrixParser::new(&BitMatrix::square(146)).is_err());
        assert!(BitMatrixParser::new(&BitMatrix::square(28)).is_err());
    }

    #[test]
    fn test_codeword_count() {
        let parser = BitMatrixParser::new(&BitMatrix::square(32)).unwrap();
        assert_eq!(parser.version().number, 10);
        assert_eq!(parser.read_codewords().unwrap().len(), 98);
    }

    #[test]
    fn test_region_border_skipped() {
        // Only the finder border is dark, so every codeword reads zero
        let mut bits = BitMatrix::square(10);
        for i in 0..10 {
            bits.set(0, i);
            bits.set(i, 9);
        }
        let parser = BitMatrixParser::new(&bits).unwrap();
        assert!(parser.read_codewords().unwrap().iter().all(|&c| c == 0));
    }
}
