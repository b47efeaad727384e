//! Text to ECC 200 module grid
//!
//! Contents are encoded in ASCII mode with digit pairs compacted and
//! Latin-1 reached through upper shift. Text outside Latin-1 is sent as
//! UTF-8 behind an ECI designator. The smallest square symbol that fits is
//! chosen.

use super::decoder::{DataBlock, Version, version::VERSIONS};
use super::placement::Placement;
use crate::decoder::ReedSolomonEncoder;
use crate::decoder::galois::DATA_MATRIX_FIELD_256;
use crate::error::EncodeError;
use crate::models::BitMatrix;

const PAD: u8 = 129;
const UPPER_SHIFT: u8 = 235;
const ECI: u8 = 241;
const ECI_UTF8: u8 = 26;

/// Encode `contents` into a symbol without quiet zone
pub fn encode(contents: &str) -> Result<BitMatrix, EncodeError> {
    let mut codewords = encode_high_level(contents);
    let version = VERSIONS
        .iter()
        .filter(|v| v.is_square())
        .find(|v| v.data_codewords() >= codewords.len())
        .ok_or(EncodeError::TooLong)?;
    tracing::debug!(%version, data = codewords.len(), "Data Matrix symbol chosen");

    pad(&mut codewords, version.data_codewords());
    let raw = add_error_correction(&codewords, version)?;
    Ok(render_symbol(&raw, version))
}

/// ASCII-mode codewords for `contents`
pub(crate) fn encode_high_level(contents: &str) -> Vec<u8> {
    let mut codewords = Vec::with_capacity(contents.len() + 2);
    let bytes: Vec<u8> = if contents.chars().all(|c| (c as u32) < 256) {
        contents.chars().map(|c| c as u8).collect()
    } else {
        codewords.extend([ECI, ECI_UTF8 + 1]);
        contents.as_bytes().to_vec()
    };

    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b.is_ascii_digit() && bytes.get(i + 1).is_some_and(u8::is_ascii_digit) {
            codewords.push(130 + (b - b'0') * 10 + (bytes[i + 1] - b'0'));
            i += 2;
            continue;
        }
        if b < 128 {
            codewords.push(b + 1);
        } else {
            codewords.extend([UPPER_SHIFT, b - 127]);
        }
        i += 1;
    }
    codewords
}

/// First pad is 129, the rest are scrambled with the 253-state algorithm
fn pad(codewords: &mut Vec<u8>, capacity: usize) {
    if codewords.len() < capacity {
        codewords.push(PAD);
    }
    while codewords.len() < capacity {
        let position = codewords.len() + 1;
        let pseudo_random = (149 * position) % 253 + 1;
        let value = PAD as usize + pseudo_random;
        codewords.push(if value <= 254 { value as u8 } else { (value - 254) as u8 });
    }
}

/// Split data round-robin into blocks, append RS codewords and interleave
fn add_error_correction(data: &[u8], version: &'static Version) -> Result<Vec<u8>, EncodeError> {
    let num_blocks = version.num_blocks();
    let mut encoder = ReedSolomonEncoder::new(&DATA_MATRIX_FIELD_256);
    let mut blocks = Vec::with_capacity(num_blocks);
    for j in 0..num_blocks {
        let mut codewords: Vec<u32> = data.iter().skip(j).step_by(num_blocks).map(|&b| b as u32).collect();
        let num_data_codewords = codewords.len();
        codewords.resize(num_data_codewords + version.ec_codewords, 0);
        encoder.encode(&mut codewords, version.ec_codewords)?;
        blocks.push(DataBlock {
            num_data_codewords,
            codewords: codewords.into_iter().map(|c| c as u8).collect(),
        });
    }
    Ok(DataBlock::interleave(&blocks, version))
}

/// Place codewords in the mapping matrix and surround every data region
/// with its finder and timing edges
fn render_symbol(raw: &[u8], version: &Version) -> BitMatrix {
    let (mapping_width, mapping_height) = version.mapping_size();
    let placement = Placement::new(mapping_height, mapping_width);
    let mut mapping = BitMatrix::new(mapping_width, mapping_height);
    for (codeword, positions) in raw.iter().zip(&placement.codewords) {
        for (bit, &(row, column)) in positions.iter().enumerate() {
            if codeword & (0x80 >> bit) != 0 {
                mapping.set(column, row);
            }
        }
    }
    if placement.fill_corner {
        mapping.set(mapping_width - 1, mapping_height - 1);
        mapping.set(mapping_width - 2, mapping_height - 2);
    }

    let mut symbol = BitMatrix::new(version.symbol_columns, version.symbol_rows);
    let (region_width, region_height) = (version.region_columns + 2, version.region_rows + 2);
    for y in 0..version.symbol_rows {
        let local_y = y % region_height;
        for x in 0..version.symbol_columns {
            let local_x = x % region_width;
            let dark = if local_y == region_height - 1 || local_x == 0 {
                true
            } else if local_y == 0 {
                x % 2 == 0
            } else if local_x == region_width - 1 {
                local_y % 2 == 1
            } else {
                let mapping_x = x / region_width * version.region_columns + local_x - 1;
                let mapping_y = y / region_height * version.region_rows + local_y - 1;
                mapping.get(mapping_x, mapping_y)
            };
            if dark {
                symbol.set(x, y);
            }
        }
    }
    symbol
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datamatrix::decoder::DataMatrixDecoder;

    #[test]
    fn test_high_level_ascii() {
        assert_eq!(encode_high_level("A1"), vec![66, 50]);
        assert_eq!(encode_high_level("123456"), vec![142, 164, 186]);
        assert_eq!(encode_high_level("é"), vec![UPPER_SHIFT, 0xE9 - 127]);
    }

    #[test]
    fn test_high_level_utf8_eci() {
        let codewords = encode_high_level("€");
        assert_eq!(&codewords[..2], &[ECI, ECI_UTF8 + 1]);
        // Three UTF-8 bytes, each above 127
        assert_eq!(codewords.len(), 2 + 6);
    }

    #[test]
    fn test_pad_sequence() {
        let mut codewords = vec![66];
        pad(&mut codewords, 5);
        assert_eq!(codewords, vec![66, 129, 70, 220, 115]);
    }

    #[test]
    fn test_smallest_symbol() {
        let symbol = encode("A").unwrap();
        assert_eq!((symbol.width(), symbol.height()), (10, 10));
        // Solid left edge and bottom edge
        assert!((0..10).all(|i| symbol.get(0, i) && symbol.get(i, 9)));
        // Alternating top edge and right edge
        assert!((0..10).all(|i| symbol.get(i, 0) == (i % 2 == 0)));
        assert!((0..10).all(|i| symbol.get(9, i) == (i % 2 == 1)));
    }

    #[test]
    fn test_multi_region_symbol_round_trip() {
        let text = "Data Matrix symbols above 26 modules carry several data regions";
        let symbol = encode(text).unwrap();
        assert!(symbol.width() > 26);
        let result = DataMatrixDecoder::default().decode(&symbol).unwrap();
        assert_eq!(result.text, text);
    }

    #[test]
    fn test_round_trip_with_errors() {
        let symbol = encode("0123456789").unwrap();
        let mut damaged = symbol.clone();
        damaged.flip(3, 3);
        damaged.flip(4, 5);
        let result = DataMatrixDecoder::default().decode(&damaged).unwrap();
        assert_eq!(result.text, "0123456789");
        assert!(result.errors_corrected > 0);
    }

    #[test]
    fn test_too_long() {
        let text = "x".repeat(2000);
        assert_eq!(encode(&text), Err(EncodeError::TooLong));
    }
}
