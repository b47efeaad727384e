use super::{ErrorCorrectionLevel, Version};
use crate::error::{DecodeError, Result};

/// One Reed-Solomon block after de-interleaving
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataBlock {
    /// Data codewords at the head of `codewords`
    pub num_data_codewords: usize,
    /// Data followed by EC codewords
    pub codewords: Vec<u8>,
}

impl DataBlock {
    /// Split interleaved raw codewords into their blocks
    pub fn get_data_blocks(raw_codewords: &[u8], version: Version, ec_level: ErrorCorrectionLevel) -> Result<Vec<Self>> {
        if raw_codewords.len() != version.total_codewords() {
            return Err(DecodeError::Format("raw codeword count mismatch"));
        }
        let ec_blocks = version.ec_blocks(ec_level);
        let ec_per_block = ec_blocks.ec_codewords_per_block;

        let mut result: Vec<DataBlock> = Vec::with_capacity(ec_blocks.num_blocks());
        for block in &ec_blocks.blocks {
            for _ in 0..block.count {
                result.push(DataBlock {
                    num_data_codewords: block.data_codewords,
                    codewords: vec![0; ec_per_block + block.data_codewords],
                });
            }
        }

        // Short blocks come first; long ones carry one extra data codeword
        let shorter_total = result[0].codewords.len();
        let longer_start = result
            .iter()
            .position(|b| b.codewords.len() != shorter_total)
            .unwrap_or(result.len());
        let shorter_data = shorter_total - ec_per_block;
        let num_blocks = result.len();

        let mut raw = raw_codewords.iter().copied();
        let mut next = || raw.next().ok_or(DecodeError::Format("raw codewords exhausted"));
        for i in 0..shorter_data {
            for block in result.iter_mut() {
                block.codewords[i] = next()?;
            }
        }
        for block in result[longer_start..].iter_mut() {
            block.codewords[shorter_data] = next()?;
        }
        for i in shorter_data..shorter_total {
            for (j, block) in result.iter_mut().enumerate().take(num_blocks) {
                let offset = if j < longer_start { i } else { i + 1 };
                block.codewords[offset] = next()?;
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_block() {
        let version = Version::for_number(1).unwrap();
        let raw: Vec<u8> = (0..26).collect();
        let blocks = DataBlock::get_data_blocks(&raw, version, ErrorCorrectionLevel::M).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].num_data_codewords, 16);
        assert_eq!(blocks[0].codewords, raw);
    }

    #[test]
    fn test_interleaved_short_and_long_blocks() {
        // 5-Q: two blocks of 15+18 then two of 16+18
        let version = Version::for_number(5).unwrap();
        let raw: Vec<u8> = (0..134).map(|i| i as u8).collect();
        let blocks = DataBlock::get_data_blocks(&raw, version, ErrorCorrectionLevel::Q).unwrap();
        assert_eq!(blocks.len(), 4);
        assert_eq!(blocks[0].codewords[..3], [0, 4, 8]);
        assert_eq!(blocks[3].codewords[..3], [3, 7, 11]);
        // the extra data codeword of the long blocks follows the shared columns
        assert_eq!(blocks[2].codewords[15], 60);
        assert_eq!(blocks[3].codewords[15], 61);
        // EC codewords start right after
        assert_eq!(blocks[0].codewords[15], 62);
        assert_eq!(blocks[2].codewords[16], 64);
    }
}
