//! Code 128 reader and the shared symbol table.

use super::{OneDReader, pattern_match_variance, record_pattern};
use crate::error::{DecodeError, Result};
use crate::models::{BarcodeFormat, BitArray, DecodeHints, MetadataValue, Point, ResultMetadataType, ScanResult};

/// Bar and space widths of every symbol value; 106 is the stop pattern
pub(crate) const CODE_PATTERNS: [&[u32]; 107] = [
    &[2, 1, 2, 2, 2, 2],
    &[2, 2, 2, 1, 2, 2],
    &[2, 2, 2, 2, 2, 1],
    &[1, 2, 1, 2, 2, 3],
    &[1, 2, 1, 3, 2, 2],
    &[1, 3, 1, 2, 2, 2],
    &[1, 2, 2, 2, 1, 3],
    &[1, 2, 2, 3, 1, 2],
    &[1, 3, 2, 2, 1, 2],
    &[2, 2, 1, 2, 1, 3],
    &[2, 2, 1, 3, 1, 2],
    &[2, 3, 1, 2, 1, 2],
    &[1, 1, 2, 2, 3, 2],
    &[1, 2, 2, 1, 3, 2],
    &[1, 2, 2, 2, 3, 1],
    &[1, 1, 3, 2, 2, 2],
    &[1, 2, 3, 1, 2, 2],
    &[1, 2, 3, 2, 2, 1],
    &[2, 2, 3, 2, 1, 1],
    &[2, 2, 1, 1, 3, 2],
    &[2, 2, 1, 2, 3, 1],
    &[2, 1, 3, 2, 1, 2],
    &[2, 2, 3, 1, 1, 2],
    &[3, 1, 2, 1, 3, 1],
    &[3, 1, 1, 2, 2, 2],
    &[3, 2, 1, 1, 2, 2],
    &[3, 2, 1, 2, 2, 1],
    &[3, 1, 2, 2, 1, 2],
    &[3, 2, 2, 1, 1, 2],
    &[3, 2, 2, 2, 1, 1],
    &[2, 1, 2, 1, 2, 3],
    &[2, 1, 2, 3, 2, 1],
    &[2, 3, 2, 1, 2, 1],
    &[1, 1, 1, 3, 2, 3],
    &[1, 3, 1, 1, 2, 3],
    &[1, 3, 1, 3, 2, 1],
    &[1, 1, 2, 3, 1, 3],
    &[1, 3, 2, 1, 1, 3],
    &[1, 3, 2, 3, 1, 1],
    &[2, 1, 1, 3, 1, 3],
    &[2, 3, 1, 1, 1, 3],
    &[2, 3, 1, 3, 1, 1],
    &[1, 1, 2, 1, 3, 3],
    &[1, 1, 2, 3, 3, 1],
    &[1, 3, 2, 1, 3, 1],
    &[1, 1, 3, 1, 2, 3],
    &[1, 1, 3, 3, 2, 1],
    &[1, 3, 3, 1, 2, 1],
    &[3, 1, 3, 1, 2, 1],
    &[2, 1, 1, 3, 3, 1],
    &[2, 3, 1, 1, 3, 1],
    &[2, 1, 3, 1, 1, 3],
    &[2, 1, 3, 3, 1, 1],
    &[2, 1, 3, 1, 3, 1],
    &[3, 1, 1, 1, 2, 3],
    &[3, 1, 1, 3, 2, 1],
    &[3, 3, 1, 1, 2, 1],
    &[3, 1, 2, 1, 1, 3],
    &[3, 1, 2, 3, 1, 1],
    &[3, 3, 2, 1, 1, 1],
    &[3, 1, 4, 1, 1, 1],
    &[2, 2, 1, 4, 1, 1],
    &[4, 3, 1, 1, 1, 1],
    &[1, 1, 1, 2, 2, 4],
    &[1, 1, 1, 4, 2, 2],
    &[1, 2, 1, 1, 2, 4],
    &[1, 2, 1, 4, 2, 1],
    &[1, 4, 1, 1, 2, 2],
    &[1, 4, 1, 2, 2, 1],
    &[1, 1, 2, 2, 1, 4],
    &[1, 1, 2, 4, 1, 2],
    &[1, 2, 2, 1, 1, 4],
    &[1, 2, 2, 4, 1, 1],
    &[1, 4, 2, 1, 1, 2],
    &[1, 4, 2, 2, 1, 1],
    &[2, 4, 1, 2, 1, 1],
    &[2, 2, 1, 1, 1, 4],
    &[4, 1, 3, 1, 1, 1],
    &[2, 4, 1, 1, 1, 2],
    &[1, 3, 4, 1, 1, 1],
    &[1, 1, 1, 2, 4, 2],
    &[1, 2, 1, 1, 4, 2],
    &[1, 2, 1, 2, 4, 1],
    &[1, 1, 4, 2, 1, 2],
    &[1, 2, 4, 1, 1, 2],
    &[1, 2, 4, 2, 1, 1],
    &[4, 1, 1, 2, 1, 2],
    &[4, 2, 1, 1, 1, 2],
    &[4, 2, 1, 2, 1, 1],
    &[2, 1, 2, 1, 4, 1],
    &[2, 1, 4, 1, 2, 1],
    &[4, 1, 2, 1, 2, 1],
    &[1, 1, 1, 1, 4, 3],
    &[1, 1, 1, 3, 4, 1],
    &[1, 3, 1, 1, 4, 1],
    &[1, 1, 4, 1, 1, 3],
    &[1, 1, 4, 3, 1, 1],
    &[4, 1, 1, 1, 1, 3],
    &[4, 1, 1, 3, 1, 1],
    &[1, 1, 3, 1, 4, 1],
    &[1, 1, 4, 1, 3, 1],
    &[3, 1, 1, 1, 4, 1],
    &[4, 1, 1, 1, 3, 1],
    &[2, 1, 1, 4, 1, 2],
    &[2, 1, 1, 2, 1, 4],
    &[2, 1, 1, 2, 3, 2],
    &[2, 3, 3, 1, 1, 1, 2],
];

const MAX_AVG_VARIANCE: f32 = 0.25;
const MAX_INDIVIDUAL_VARIANCE: f32 = 0.7;

pub(crate) const CODE_SHIFT: u8 = 98;
pub(crate) const CODE_CODE_C: u8 = 99;
pub(crate) const CODE_CODE_B: u8 = 100;
pub(crate) const CODE_CODE_A: u8 = 101;
pub(crate) const CODE_FNC_1: u8 = 102;
pub(crate) const CODE_FNC_2: u8 = 97;
pub(crate) const CODE_FNC_3: u8 = 96;
const CODE_FNC_4_A: u8 = 101;
const CODE_FNC_4_B: u8 = 100;
pub(crate) const CODE_START_A: u8 = 103;
pub(crate) const CODE_START_B: u8 = 104;
pub(crate) const CODE_START_C: u8 = 105;
pub(crate) const CODE_STOP: u8 = 106;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CodeSet {
    A,
    B,
    C,
}

/// Code 128 with code sets A, B and C, SHIFT, FNC1 to FNC4 and the mod-103
/// checksum
#[derive(Debug, Clone, Copy, Default)]
pub struct Code128Reader;

/// Extended ASCII toggling by FNC4
#[derive(Debug, Default)]
struct UpperMode {
    latched: bool,
    shifted: bool,
}

impl UpperMode {
    fn fnc4(&mut self) {
        if self.shifted {
            self.latched = !self.latched;
            self.shifted = false;
        } else {
            self.shifted = true;
        }
    }

    fn push(&mut self, text: &mut String, value: u8) {
        let upper = self.shifted != self.latched;
        text.push(char::from(if upper { value.wrapping_add(128) } else { value }));
        self.shifted = false;
    }
}

impl OneDReader for Code128Reader {
    fn decode_row(&mut self, row_number: usize, row: &BitArray, _hints: &DecodeHints) -> Result<ScanResult> {
        let (start_begin, start_end, start_code) = find_start_pattern(row)?;
        let mut code_set = match start_code {
            CODE_START_A => CodeSet::A,
            CODE_START_B => CodeSet::B,
            _ => CodeSet::C,
        };

        let mut raw_codes = vec![start_code];
        let mut text = String::with_capacity(20);
        let mut symbology_modifier = 0;
        let mut upper = UpperMode::default();
        let mut counters = [0u32; 6];

        let mut last_start;
        let mut next_start = start_end;
        let mut code = 0u8;
        let mut last_code;
        let mut checksum_total = start_code as usize;
        let mut multiplier = 0usize;
        let mut last_character_was_printable = true;
        let mut is_next_shifted = false;

        loop {
            let unshift = is_next_shifted;
            is_next_shifted = false;
            last_code = code;
            code = decode_code(row, &mut counters, next_start)?;
            raw_codes.push(code);
            if code != CODE_STOP {
                last_character_was_printable = true;
                multiplier += 1;
                checksum_total += multiplier * code as usize;
            }
            last_start = next_start;
            next_start += counters.iter().sum::<u32>() as usize;
            if matches!(code, CODE_START_A | CODE_START_B | CODE_START_C) {
                return Err(DecodeError::Format("Code 128 start code inside symbol"));
            }

            let mut done = false;
            match code_set {
                CodeSet::A | CodeSet::B if code < 64 || (code_set == CodeSet::B && code < 96) => {
                    upper.push(&mut text, b' ' + code);
                }
                CodeSet::A if code < 96 => upper.push(&mut text, code - 64),
                CodeSet::C if code < 100 => {
                    text.push_str(&format!("{code:02}"));
                }
                _ => {
                    if code != CODE_STOP {
                        last_character_was_printable = false;
                    }
                    match code {
                        CODE_FNC_1 => match text.chars().count() {
                            0 => symbology_modifier = 1,
                            1 => symbology_modifier = 2,
                            _ => {}
                        },
                        CODE_FNC_2 if code_set != CodeSet::C => symbology_modifier = 4,
                        CODE_FNC_3 if code_set != CodeSet::C => {}
                        CODE_FNC_4_A if code_set == CodeSet::A => upper.fnc4(),
                        CODE_FNC_4_B if code_set == CodeSet::B => upper.fnc4(),
                        CODE_SHIFT if code_set != CodeSet::C => {
                            is_next_shifted = true;
                            code_set = if code_set == CodeSet::A { CodeSet::B } else { CodeSet::A };
                        }
                        CODE_CODE_A => code_set = CodeSet::A,
                        CODE_CODE_B => code_set = CodeSet::B,
                        CODE_CODE_C => code_set = CodeSet::C,
                        CODE_STOP => done = true,
                        _ => {}
                    }
                }
            }
            if unshift {
                code_set = if code_set == CodeSet::A { CodeSet::B } else { CodeSet::A };
            }
            if done {
                break;
            }
        }

        let last_pattern_size = next_start - last_start;
        let quiet_start = row.get_next_unset(next_start);
        let quiet_end = row.size().min(quiet_start + (quiet_start - last_start) / 2);
        if !row.is_range(quiet_start, quiet_end, false) {
            return Err(DecodeError::NotFound);
        }

        checksum_total -= multiplier * last_code as usize;
        if checksum_total % 103 != last_code as usize {
            return Err(DecodeError::Checksum);
        }

        // The checksum character was decoded as text
        let length = text.chars().count();
        if length == 0 {
            return Err(DecodeError::NotFound);
        }
        if last_character_was_printable {
            let trim = if code_set == CodeSet::C { 2 } else { 1 };
            text = text.chars().take(length.saturating_sub(trim)).collect();
        }

        let left = (start_begin + start_end) as f32 / 2.0;
        let right = last_start as f32 + last_pattern_size as f32 / 2.0;
        let mut result = ScanResult::new(
            text,
            raw_codes,
            vec![Point::new(left, row_number as f32), Point::new(right, row_number as f32)],
            BarcodeFormat::Code128,
        );
        result.put_metadata(
            ResultMetadataType::SymbologyIdentifier,
            MetadataValue::Text(format!("]C{symbology_modifier}")),
        );
        Ok(result)
    }
}

/// Start offset, end offset and start code of the first start pattern with
/// a quiet zone before it
fn find_start_pattern(row: &BitArray) -> Result<(usize, usize, u8)> {
    let width = row.size();
    let offset = row.get_next_set(0);
    let mut counters = [0u32; 6];
    let mut position = 0;
    let mut pattern_start = offset;
    let mut is_white = false;

    for i in offset..width {
        if row.get(i) != is_white {
            counters[position] += 1;
            continue;
        }
        if position == counters.len() - 1 {
            let mut best_variance = MAX_AVG_VARIANCE;
            let mut best_match = None;
            for start_code in CODE_START_A..=CODE_START_C {
                let variance =
                    pattern_match_variance(&counters, CODE_PATTERNS[start_code as usize], MAX_INDIVIDUAL_VARIANCE);
                if variance < best_variance {
                    best_variance = variance;
                    best_match = Some(start_code);
                }
            }
            if let Some(start_code) = best_match {
                let quiet_start = pattern_start.saturating_sub((i - pattern_start) / 2);
                if row.is_range(quiet_start, pattern_start, false) {
                    return Ok((pattern_start, i, start_code));
                }
            }
            pattern_start += (counters[0] + counters[1]) as usize;
            counters.copy_within(2.., 0);
            counters[position - 1] = 0;
            counters[position] = 0;
            position -= 1;
        } else {
            position += 1;
        }
        counters[position] = 1;
        is_white = !is_white;
    }
    Err(DecodeError::NotFound)
}

fn decode_code(row: &BitArray, counters: &mut [u32; 6], offset: usize) -> Result<u8> {
    record_pattern(row, offset, counters)?;
    let mut best_variance = MAX_AVG_VARIANCE;
    let mut best_match = None;
    for (value, pattern) in CODE_PATTERNS.iter().enumerate() {
        let variance = pattern_match_variance(counters, pattern, MAX_INDIVIDUAL_VARIANCE);
        if variance < best_variance {
            best_variance = variance;
            best_match = Some(value as u8);
        }
    }
    best_match.ok_or(DecodeError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oned::append_widths;
    use crate::oned::test_rows::row_from_modules;

    fn row_of(values: &[u8]) -> BitArray {
        let mut modules = Vec::new();
        for &value in values {
            append_widths(&mut modules, CODE_PATTERNS[value as usize], true);
        }
        row_from_modules(&modules, 2, 30)
    }

    /// Start code, data, checksum and stop
    fn symbol(values: &[u8]) -> Vec<u8> {
        let mut checksum = values[0] as usize;
        for (i, &v) in values.iter().enumerate().skip(1) {
            checksum += i * v as usize;
        }
        let mut all = values.to_vec();
        all.push((checksum % 103) as u8);
        all.push(CODE_STOP);
        all
    }

    #[test]
    fn test_code_set_b() {
        // "Hi!"
        let row = row_of(&symbol(&[CODE_START_B, 40, 73, 1]));
        let result = Code128Reader.decode_row(0, &row, &DecodeHints::default()).unwrap();
        assert_eq!(result.text, "Hi!");
        assert_eq!(result.metadata_text(ResultMetadataType::SymbologyIdentifier), Some("]C0"));
    }

    #[test]
    fn test_code_set_c_and_switch() {
        // "123456" in C, then B for "A"
        let row = row_of(&symbol(&[CODE_START_C, 12, 34, 56, CODE_CODE_B, 33]));
        let result = Code128Reader.decode_row(0, &row, &DecodeHints::default()).unwrap();
        assert_eq!(result.text, "123456A");
    }

    #[test]
    fn test_shift_and_control() {
        // A: "\t" then SHIFT to B for "a", back in A for "B"
        let row = row_of(&symbol(&[CODE_START_A, 73, CODE_SHIFT, 65, 34]));
        let result = Code128Reader.decode_row(0, &row, &DecodeHints::default()).unwrap();
        assert_eq!(result.text, "\taB");
    }

    #[test]
    fn test_fnc1_modifier() {
        let row = row_of(&symbol(&[CODE_START_C, CODE_FNC_1, 1, 23]));
        let result = Code128Reader.decode_row(0, &row, &DecodeHints::default()).unwrap();
        assert_eq!(result.text, "0123");
        assert_eq!(result.metadata_text(ResultMetadataType::SymbologyIdentifier), Some("]C1"));
    }

    #[test]
    fn test_fnc4_extended() {
        // FNC4 then "A" reads as 'A' + 128
        let row = row_of(&symbol(&[CODE_START_B, CODE_FNC_4_B, 33]));
        let result = Code128Reader.decode_row(0, &row, &DecodeHints::default()).unwrap();
        assert_eq!(result.text, "\u{c1}");
    }

    #[test]
    fn test_bad_checksum() {
        let mut values = symbol(&[CODE_START_B, 40, 73]);
        let n = values.len();
        values[n - 2] = (values[n - 2] + 1) % 103;
        let row = row_of(&values);
        assert_eq!(
            Code128Reader.decode_row(0, &row, &DecodeHints::default()),
            Err(DecodeError::Checksum)
        );
    }
}
