//! QR Code decoding after detection
//!
//! - Format and version information (BCH protected)
//! - Unmasking and codeword extraction
//! - Block de-interleaving and Reed-Solomon correction
//! - Segment decoding (numeric, alphanumeric, byte, kanji, hanzi, ECI)

/// Codeword extraction from the module grid
pub mod bit_matrix_parser;
/// Segment decoding state machine
pub mod bitstream;
/// De-interleaving of RS blocks
pub mod data_block;
/// The eight data mask patterns
pub mod data_mask;
/// Format information and error correction levels
pub mod format;
/// Segment modes
pub mod mode;
/// Version tables
pub mod version;

pub use bit_matrix_parser::BitMatrixParser;
pub use data_block::DataBlock;
pub use data_mask::MaskPattern;
pub use format::{ErrorCorrectionLevel, FormatInformation};
pub use mode::Mode;
pub use version::Version;

use crate::decoder::ReedSolomonDecoder;
use crate::decoder::galois::QR_CODE_FIELD_256;
use crate::error::Result;
use crate::models::{BitMatrix, DecoderResult};
use crate::utils::charset::CharacterSet;

/// Output of [`QrDecoder::decode`]
#[derive(Debug, Clone)]
pub struct QrDecoded {
    /// Decoded payload
    pub result: DecoderResult,
    /// Symbol was read from the transposed grid
    pub mirrored: bool,
}

/// Decodes a sampled QR module grid
pub struct QrDecoder {
    rs_decoder: ReedSolomonDecoder,
}

impl Default for QrDecoder {
    fn default() -> Self {
        Self {
            rs_decoder: ReedSolomonDecoder::new(&QR_CODE_FIELD_256),
        }
    }
}

impl QrDecoder {
    /// Decode a grid where `true` is a dark module. Mirrored symbols are
    /// retried on the transposed grid.
    pub fn decode(&self, bits: &BitMatrix, charset: Option<CharacterSet>) -> Result<QrDecoded> {
        let mut parser = BitMatrixParser::new(bits.clone())?;
        let error = match self.decode_parser(&mut parser, charset) {
            Ok(result) => return Ok(QrDecoded { result, mirrored: false }),
            Err(e) => e,
        };

        let mut mirrored = parser.mirrored();
        match self.decode_parser(&mut mirrored, charset) {
            Ok(result) => {
                tracing::debug!("decoded mirrored QR symbol");
                Ok(QrDecoded { result, mirrored: true })
            }
            Err(_) => Err(error),
        }
    }

    fn decode_parser(&self, parser: &mut BitMatrixParser, charset: Option<CharacterSet>) -> Result<DecoderResult> {
        let version = parser.read_version()?;
        let ec_level = parser.read_format_information()?.ec_level;
        let codewords = parser.read_codewords()?;
        let blocks = DataBlock::get_data_blocks(&codewords, version, ec_level)?;
        tracing::trace!(version = version.number(), %ec_level, blocks = blocks.len(), "QR layout");

        let total_bytes: usize = blocks.iter().map(|b| b.num_data_codewords).sum();
        let mut result_bytes = Vec::with_capacity(total_bytes);
        let mut errors_corrected = 0;
        for block in blocks {
            let mut codewords: Vec<u32> = block.codewords.iter().map(|&b| b as u32).collect();
            let ec_count = codewords.len() - block.num_data_codewords;
            errors_corrected += self.rs_decoder.decode(&mut codewords, ec_count)?;
            result_bytes.extend(codewords[..block.num_data_codewords].iter().map(|&c| c as u8));
        }

        let mut result = bitstream::decode(&result_bytes, version, ec_level, charset)?;
        result.errors_corrected = errors_corrected;
        Ok(result)
    }
}
