//! Data Matrix decoding after detection
//!
//! - Size lookup and data region extraction
//! - Utah placement read-out
//! - Block de-interleaving and Reed-Solomon correction over GF(256)
//! - High-level segment decoding

/// Codeword read-out
pub mod bit_matrix_parser;
/// High-level decoding
pub mod bitstream;
/// De-interleaving of RS blocks
pub mod data_block;
/// Symbol sizes
pub mod version;

pub use bit_matrix_parser::BitMatrixParser;
pub use data_block::DataBlock;
pub use version::Version;

use crate::decoder::ReedSolomonDecoder;
use crate::decoder::galois::DATA_MATRIX_FIELD_256;
use crate::error::Result;
use crate::models::{BitMatrix, DecoderResult};

/// Decodes a sampled Data Matrix module grid
pub struct DataMatrixDecoder {
    rs_decoder: ReedSolomonDecoder,
}

impl Default for DataMatrixDecoder {
    fn default() -> Self {
        Self {
            rs_decoder: ReedSolomonDecoder::new(&DATA_MATRIX_FIELD_256),
        }
    }
}

impl DataMatrixDecoder {
    /// Decode a grid where `true` is a dark module
    pub fn decode(&self, bits: &BitMatrix) -> Result<DecoderResult> {
        let parser = BitMatrixParser::new(bits)?;
        let version = parser.version();
        let codewords = parser.read_codewords()?;
        let blocks = DataBlock::get_data_blocks(&codewords, version)?;
        tracing::trace!(%version, blocks = blocks.len(), "Data Matrix layout");

        let mut result_bytes = Vec::with_capacity(version.data_codewords());
        let mut errors_corrected = 0;
        for block in &blocks {
            let mut codewords: Vec<u32> = block.codewords.iter().map(|&b| b as u32).collect();
            errors_corrected += self.rs_decoder.decode(&mut codewords, version.ec_codewords)?;
            result_bytes.extend(codewords[..block.num_data_codewords].iter().map(|&c| c as u8));
        }

        // Data codewords are interleaved across blocks
        let num_blocks = blocks.len();
        let mut data = vec![0u8; result_bytes.len()];
        let mut offset = 0;
        for (j, block) in blocks.iter().enumerate() {
            for i in 0..block.num_data_codewords {
                data[i * num_blocks + j] = result_bytes[offset + i];
            }
            offset += block.num_data_codewords;
        }

        let mut result = bitstream::decode(&data)?;
        result.errors_corrected = errors_corrected;
        Ok(result)
    }
}
