//! PDF417: guard detection, row scanning, GF(929) correction, compaction
//! modes and encoding.

/// Codeword scanning and bitstream decoding
pub mod decoder;
/// Start and stop guard search
pub mod detector;
/// Text to codeword rows
pub mod encoder;
mod reader;
mod tables;
mod writer;

pub use reader::Pdf417Reader;
pub use writer::Pdf417Writer;

use tables::{CODEWORD_TABLE, SYMBOL_TABLE};

pub(crate) const NUMBER_OF_CODEWORDS: u32 = 929;
pub(crate) const MIN_ROWS: usize = 3;
pub(crate) const MAX_ROWS: usize = 90;
pub(crate) const MAX_COLUMNS: usize = 30;
pub(crate) const MODULES_IN_CODEWORD: usize = 17;
pub(crate) const BARS_IN_MODULE: usize = 8;

/// Bar and space widths of the start guard
pub(crate) const START_PATTERN: [u32; 8] = [8, 1, 1, 1, 1, 1, 1, 3];
/// Bar and space widths of the stop guard
pub(crate) const STOP_PATTERN: [u32; 9] = [7, 1, 1, 3, 1, 1, 1, 2, 1];

/// Text compaction Mixed sub-mode characters, by value
pub(crate) const MIXED_CHARS: &[u8; 25] = b"0123456789&\r\t,:#-.$/+%*=^";
/// Text compaction Punctuation sub-mode characters, by value
pub(crate) const PUNCT_CHARS: &[u8; 29] = b";<>@[\\]_`~!\r\t,:\n-.$/\"|*()?{}'";

/// Module patterns indexed by cluster (0, 1, 2 for buckets 0, 3, 6) and
/// codeword value
pub(crate) static PATTERNS: [[u32; 929]; 3] = build_patterns();

const fn build_patterns() -> [[u32; 929]; 3] {
    let mut patterns = [[0u32; 929]; 3];
    let mut i = 0;
    while i < SYMBOL_TABLE.len() {
        let entry = CODEWORD_TABLE[i] as usize - 1;
        patterns[entry / 929][entry % 929] = SYMBOL_TABLE[i];
        i += 1;
    }
    patterns
}

/// Codeword value and cluster (0, 1 or 2) of a 17-module pattern
pub(crate) fn codeword_for(symbol: u32) -> Option<(u32, usize)> {
    let index = SYMBOL_TABLE.binary_search(&(symbol & 0x3FFFF)).ok()?;
    let entry = CODEWORD_TABLE[index] as u32 - 1;
    Some((entry % NUMBER_OF_CODEWORDS, (entry / NUMBER_OF_CODEWORDS) as usize))
}

/// Resample eight measured element widths to whole modules summing to 17
pub(crate) fn sample_bit_counts(widths: &[u32; BARS_IN_MODULE]) -> [u32; BARS_IN_MODULE] {
    let total: u32 = widths.iter().sum();
    let mut result = [0u32; BARS_IN_MODULE];
    let mut index = 0;
    let mut previous = 0u32;
    for i in 0..MODULES_IN_CODEWORD {
        let sample = total as f32 / (2 * MODULES_IN_CODEWORD) as f32
            + (i as f32 * total as f32) / MODULES_IN_CODEWORD as f32;
        if index + 1 < BARS_IN_MODULE && (previous + widths[index]) as f32 <= sample {
            previous += widths[index];
            index += 1;
        }
        result[index] += 1;
    }
    result
}

/// Pack module counts into a bar-first 17-bit pattern
pub(crate) fn bit_value(module_counts: &[u32; BARS_IN_MODULE]) -> u32 {
    let mut value = 0u32;
    for (i, &count) in module_counts.iter().enumerate() {
        for _ in 0..count {
            value = (value << 1) | u32::from(i % 2 == 0);
        }
    }
    value
}
