//! PDF417 decoding after guard detection
//!
//! - Row scanning and codeword voting
//! - GF(929) correction with unreadable cells as erasures
//! - Compaction mode decoding

/// Compaction modes and macro blocks
pub mod bitstream;
mod scanning;

pub use bitstream::Pdf417Metadata;
pub use scanning::{ScannedSymbol, scan};

use crate::decoder::modulus::ModulusDecoder;
use crate::error::{DecodeError, Result};
use crate::models::{BitMatrix, DecoderResult, Point};

/// Decodes a located PDF417 symbol
#[derive(Default)]
pub struct Pdf417Decoder {
    ec: ModulusDecoder,
}

impl Pdf417Decoder {
    /// Read and decode the symbol between guard `vertices` in `image`
    pub fn decode(&self, image: &BitMatrix, vertices: &[Point; 8]) -> Result<DecoderResult> {
        let scanned = scan(image, vertices)?;
        tracing::trace!(
            columns = scanned.columns,
            rows = scanned.rows,
            erasures = scanned.erasures.len(),
            "PDF417 codewords scanned"
        );
        self.decode_codewords(scanned.codewords, scanned.ec_level, &scanned.erasures)
    }

    /// Correct and decode a full codeword sequence: length descriptor, data,
    /// padding, then `2^(ec_level + 1)` error correction codewords
    pub fn decode_codewords(&self, mut codewords: Vec<u32>, ec_level: u32, erasures: &[usize]) -> Result<DecoderResult> {
        if ec_level > 8 {
            return Err(DecodeError::Format("invalid PDF417 error correction level"));
        }
        let ec_count = 1usize << (ec_level + 1);
        let corrected = self.ec.decode(&mut codewords, ec_count, erasures)?;
        let data_length = verify_codeword_count(&mut codewords, ec_count)?;

        let mut result = bitstream::decode(&codewords[..data_length], &ec_level.to_string())?;
        result.erasures = erasures.len();
        result.errors_corrected = corrected.saturating_sub(erasures.len());
        Ok(result)
    }
}

/// Check the length descriptor against the symbol and fill it in when it
/// was lost; returns the number of data codewords including the descriptor
fn verify_codeword_count(codewords: &mut [u32], ec_count: usize) -> Result<usize> {
    if codewords.len() < 4 {
        return Err(DecodeError::Format("PDF417 symbol too small"));
    }
    let available = codewords.len().saturating_sub(ec_count);
    let declared = codewords[0] as usize;
    if declared > available {
        return Err(DecodeError::Format("PDF417 length descriptor exceeds symbol"));
    }
    if declared == 0 {
        if available == 0 {
            return Err(DecodeError::Format("PDF417 symbol holds no data"));
        }
        codewords[0] = available as u32;
        return Ok(available);
    }
    Ok(declared)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf417::encoder::{self, DEFAULT_EC_LEVEL};

    #[test]
    fn test_decode_codewords() {
        let code = encoder::encode("Codewords 0123456789012345", None, DEFAULT_EC_LEVEL).unwrap();
        let result = Pdf417Decoder::default()
            .decode_codewords(code.codewords, DEFAULT_EC_LEVEL, &[])
            .unwrap();
        assert_eq!(result.text, "Codewords 0123456789012345");
        assert_eq!(result.errors_corrected, 0);
        assert_eq!(result.ec_level.as_deref(), Some("2"));
    }

    #[test]
    fn test_corrects_errors_and_erasures() {
        let code = encoder::encode("error correction", None, 3).unwrap();
        let mut codewords = code.codewords.clone();
        codewords[2] = (codewords[2] + 7) % 929;
        codewords[5] = 0;
        codewords[6] = 0;
        let result = Pdf417Decoder::default().decode_codewords(codewords, 3, &[5, 6]).unwrap();
        assert_eq!(result.text, "error correction");
        assert_eq!(result.erasures, 2);
        assert!(result.errors_corrected >= 1);
    }

    #[test]
    fn test_lost_length_descriptor() {
        let mut codewords = vec![0, 1, 89];
        codewords.extend(crate::decoder::modulus::pdf417_ec_codewords(&[3, 1, 89], 4));
        codewords[0] = 0;
        // Zeroed descriptor is corrected back by error correction
        let result = Pdf417Decoder::default().decode_codewords(codewords, 1, &[]).unwrap();
        assert_eq!(result.text, "ABC");
    }

    #[test]
    fn test_verify_codeword_count() {
        let mut codewords = vec![0, 1, 89, 900, 5, 6];
        assert_eq!(verify_codeword_count(&mut codewords, 2), Ok(4));
        assert_eq!(codewords[0], 4);
        let mut codewords = vec![9, 1, 89, 900, 5, 6];
        assert!(matches!(verify_codeword_count(&mut codewords, 2), Err(DecodeError::Format(_))));
        assert!(matches!(verify_codeword_count(&mut [1, 2, 3], 2), Err(DecodeError::Format(_))));
    }
}
