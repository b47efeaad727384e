use super::{OneDReader, record_pattern};
use crate::error::{DecodeError, Result};
use crate::models::{BarcodeFormat, BitArray, DecodeHints, MetadataValue, Point, ResultMetadataType, ScanResult};

const ALPHABET: &[u8; 43] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ-. $/+%";

/// Wide/narrow bit patterns of `ALPHABET`, nine elements each, first
/// element in the most significant bit
const CHARACTER_ENCODINGS: [u16; 43] = [
    0x034, 0x121, 0x061, 0x160, 0x031, 0x130, 0x070, 0x025, 0x124, 0x064, 0x109, 0x049, 0x148, 0x019, 0x118, 0x058,
    0x00D, 0x10C, 0x04C, 0x01C, 0x103, 0x043, 0x142, 0x013, 0x112, 0x052, 0x007, 0x106, 0x046, 0x016, 0x181, 0x0C1,
    0x1C0, 0x091, 0x190, 0x0D0, 0x085, 0x184, 0x0C4, 0x0A8, 0x0A2, 0x08A, 0x02A,
];

const ASTERISK_ENCODING: u16 = 0x094;

/// Code 39 with an optional mod-43 check digit
#[derive(Debug, Clone, Copy, Default)]
pub struct Code39Reader;

impl OneDReader for Code39Reader {
    fn decode_row(&mut self, row_number: usize, row: &BitArray, hints: &DecodeHints) -> Result<ScanResult> {
        let mut counters = [0u32; 9];
        let (start_begin, start_end) = find_asterisk_pattern(row, &mut counters)?;
        let mut next_start = row.get_next_set(start_end);
        let end = row.size();

        let mut decoded = String::with_capacity(20);
        let mut last_start;
        loop {
            record_pattern(row, next_start, &mut counters)?;
            let pattern = to_narrow_wide_pattern(&counters).ok_or(DecodeError::NotFound)?;
            let c = pattern_to_char(pattern).ok_or(DecodeError::NotFound)?;
            last_start = next_start;
            next_start = row.get_next_set(next_start + counters.iter().sum::<u32>() as usize);
            if c == '*' {
                break;
            }
            decoded.push(c);
        }

        // Trailing quiet zone of at least half a character
        let last_pattern_size = counters.iter().sum::<u32>() as usize;
        let white_after = next_start - last_start - last_pattern_size;
        if next_start != end && white_after * 2 < last_pattern_size {
            return Err(DecodeError::NotFound);
        }

        if hints.assume_code_39_check_digit {
            let check = decoded.pop().ok_or(DecodeError::NotFound)?;
            let total: usize = decoded
                .bytes()
                .filter_map(|b| ALPHABET.iter().position(|&a| a == b))
                .sum();
            if check as u8 != ALPHABET[total % 43] {
                return Err(DecodeError::Checksum);
            }
        }
        if decoded.is_empty() {
            return Err(DecodeError::NotFound);
        }

        let left = (start_begin + start_end) as f32 / 2.0;
        let right = last_start as f32 + last_pattern_size as f32 / 2.0;
        let mut result = ScanResult::new(
            decoded,
            Vec::new(),
            vec![Point::new(left, row_number as f32), Point::new(right, row_number as f32)],
            BarcodeFormat::Code39,
        );
        result.put_metadata(
            ResultMetadataType::SymbologyIdentifier,
            MetadataValue::Text("]A0".to_string()),
        );
        Ok(result)
    }
}

fn find_asterisk_pattern(row: &BitArray, counters: &mut [u32; 9]) -> Result<(usize, usize)> {
    let width = row.size();
    let offset = row.get_next_set(0);
    counters.fill(0);
    let last = counters.len() - 1;
    let mut position = 0;
    let mut pattern_start = offset;
    let mut is_white = false;

    for i in offset..width {
        if row.get(i) != is_white {
            counters[position] += 1;
            continue;
        }
        if position == last {
            if to_narrow_wide_pattern(counters) == Some(ASTERISK_ENCODING) {
                let quiet_start = pattern_start.saturating_sub((i - pattern_start) / 2);
                if row.is_range(quiet_start, pattern_start, false) {
                    return Ok((pattern_start, i));
                }
            }
            pattern_start += (counters[0] + counters[1]) as usize;
            counters.copy_within(2.., 0);
            counters[last - 1] = 0;
            counters[last] = 0;
            position -= 1;
        } else {
            position += 1;
        }
        counters[position] = 1;
        is_white = !is_white;
    }
    Err(DecodeError::NotFound)
}

/// Classify nine runs as narrow or wide; exactly three must be wide and no
/// wide run may take half of the total wide width
fn to_narrow_wide_pattern(counters: &[u32]) -> Option<u16> {
    let n = counters.len();
    let mut max_narrow = 0;
    loop {
        max_narrow = counters.iter().copied().filter(|&c| c > max_narrow).min()?;
        let mut pattern = 0u16;
        let mut wide_count = 0;
        let mut wide_total = 0;
        for (i, &counter) in counters.iter().enumerate() {
            if counter > max_narrow {
                pattern |= 1 << (n - 1 - i);
                wide_count += 1;
                wide_total += counter;
            }
        }
        if wide_count == 3 {
            let balanced = counters
                .iter()
                .filter(|&&c| c > max_narrow)
                .all(|&c| c * 2 < wide_total);
            return balanced.then_some(pattern);
        }
        if wide_count < 3 {
            return None;
        }
    }
}

fn pattern_to_char(pattern: u16) -> Option<char> {
    if pattern == ASTERISK_ENCODING {
        return Some('*');
    }
    CHARACTER_ENCODINGS
        .iter()
        .position(|&p| p == pattern)
        .map(|i| ALPHABET[i] as char)
}
