use super::version::Version;
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
    /// Split interleaved raw codewords into their blocks. In the 144×144
    /// symbol the last two blocks carry one data codeword less.
    pub fn get_data_blocks(raw_codewords: &[u8], version: &Version) -> Result<Vec<Self>> {
        if raw_codewords.len() != version.total_codewords() {
            return Err(DecodeError::Format("raw codeword count mismatch"));
        }
        let ec = version.ec_codewords;
        let mut result: Vec<DataBlock> = Vec::with_capacity(version.num_blocks());
        for block in version.blocks {
            for _ in 0..block.count {
                result.push(DataBlock {
                    num_data_codewords: block.data_codewords,
                    codewords: vec![0; ec + block.data_codewords],
                });
            }
        }
        let num_blocks = result.len();

        let longer_total = result[0].codewords.len();
        let longer_data = longer_total - ec;
        let shorter_data = longer_data - 1;
        let special = version.blocks.len() > 1;
        let num_longer_blocks = if special { version.blocks[0].count } else { num_blocks };

        let mut raw = raw_codewords.iter().copied();
        let mut next = || raw.next().ok_or(DecodeError::Format("raw codewords exhausted"));
        for i in 0..shorter_data {
            for block in result.iter_mut() {
                block.codewords[i] = next()?;
            }
        }
        for block in result.iter_mut().take(num_longer_blocks) {
            block.codewords[longer_data - 1] = next()?;
        }
        for i in longer_data..longer_total {
            for j in 0..num_blocks {
                let j_offset = if special { (j + num_longer_blocks) % num_blocks } else { j };
                let i_offset = if special && j_offset >= num_longer_blocks { i - 1 } else { i };
                result[j_offset].codewords[i_offset] = next()?;
            }
        }
        Ok(result)
    }

    /// Inverse of [`DataBlock::get_data_blocks`]: interleave blocks into
    /// symbol order
    pub fn interleave(blocks: &[DataBlock], version: &Version) -> Vec<u8> {
        let ec = version.ec_codewords;
        let num_blocks = blocks.len();
        let mut raw = Vec::with_capacity(version.total_codewords());
        let Some(first) = blocks.first() else {
            return raw;
        };
        let longer_total = first.codewords.len();
        let longer_data = longer_total - ec;
        let special = version.blocks.len() > 1;
        let num_longer_blocks = if special { version.blocks[0].count } else { num_blocks };

        for i in 0..longer_data - 1 {
            raw.extend(blocks.iter().map(|b| b.codewords[i]));
        }
        raw.extend(blocks.iter().take(num_longer_blocks).map(|b| b.codewords[longer_data - 1]));
        for i in longer_data..longer_total {
            for j in 0..num_blocks {
                let j_offset = if special { (j + num_longer_blocks) % num_blocks } else { j };
                let i_offset = if special && j_offset >= num_longer_blocks { i - 1 } else { i };
                raw.push(blocks[j_offset].codewords[i_offset]);
            }
        }
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_block() {
        let version = Version::for_dimensions(10, 10).unwrap();
        let raw: Vec<u8> = (0..8).collect();
        let blocks = DataBlock::get_data_blocks(&raw, version).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].codewords, raw);
    }

    #[test]
    fn test_two_interleaved_blocks() {
        let version = Version::for_dimensions(52, 52).unwrap();
        let raw: Vec<u8> = (0..version.total_codewords()).map(|i| i as u8).collect();
        let blocks = DataBlock::get_data_blocks(&raw, version).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(&blocks[0].codewords[..3], &[0, 2, 4]);
        assert_eq!(&blocks[1].codewords[..3], &[1, 3, 5]);
        assert_eq!(blocks[1].codewords[102], 205);
    }

    #[test]
    fn test_largest_symbol_block_sizes() {
        let version = Version::for_dimensions(144, 144).unwrap();
        let raw: Vec<u8> = vec![0; version.total_codewords()];
        let blocks = DataBlock::get_data_blocks(&raw, version).unwrap();
        assert_eq!(blocks.len(), 10);
        assert_eq!(blocks[0].codewords.len(), 218);
        assert_eq!(blocks[9].codewords.len(), 217);
        assert_eq!(blocks[9].num_data_codewords, 155);
    }

    #[test]
    fn test_interleave_inverts_split() {
        for size in [10, 52, 144] {
            let version = Version::for_dimensions(size, size).unwrap();
            let raw: Vec<u8> = (0..version.total_codewords()).map(|i| (i * 7) as u8).collect();
            let blocks = DataBlock::get_data_blocks(&raw, version).unwrap();
            assert_eq!(DataBlock::interleave(&blocks, version), raw, "{size}");
        }
    }
}
