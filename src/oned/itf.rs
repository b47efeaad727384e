use super::{OneDReader, pattern_match_variance, record_pattern};
use crate::error::{DecodeError, Result};
use crate::models::{BarcodeFormat, BitArray, DecodeHints, MetadataValue, Point, ResultMetadataType, ScanResult};

const MAX_AVG_VARIANCE: f32 = 0.38;
const MAX_INDIVIDUAL_VARIANCE: f32 = 0.5;

const W: u32 = 3;
const W_LOWER: u32 = 2;
const N: u32 = 1;

const DEFAULT_ALLOWED_LENGTHS: [usize; 5] = [6, 8, 10, 12, 14];

const START_PATTERN: [u32; 4] = [N, N, N, N];
const END_PATTERN_REVERSED: [[u32; 3]; 2] = [[N, N, W_LOWER], [N, N, W]];

/// Digit widths with 2:1 and then 3:1 wide elements
const PATTERNS: [[u32; 5]; 20] = [
    [N, N, W_LOWER, W_LOWER, N],
    [W_LOWER, N, N, N, W_LOWER],
    [N, W_LOWER, N, N, W_LOWER],
    [W_LOWER, W_LOWER, N, N, N],
    [N, N, W_LOWER, N, W_LOWER],
    [W_LOWER, N, W_LOWER, N, N],
    [N, W_LOWER, W_LOWER, N, N],
    [N, N, N, W_LOWER, W_LOWER],
    [W_LOWER, N, N, W_LOWER, N],
    [N, W_LOWER, N, W_LOWER, N],
    [N, N, W, W, N],
    [W, N, N, N, W],
    [N, W, N, N, W],
    [W, W, N, N, N],
    [N, N, W, N, W],
    [W, N, W, N, N],
    [N, W, W, N, N],
    [N, N, N, W, W],
    [W, N, N, W, N],
    [N, W, N, W, N],
];

/// Interleaved 2 of 5, restricted to the allowed lengths
#[derive(Debug, Clone, Copy, Default)]
pub struct ItfReader;

impl OneDReader for ItfReader {
    fn decode_row(&mut self, row_number: usize, row: &BitArray, hints: &DecodeHints) -> Result<ScanResult> {
        let (start, narrow) = decode_start(row)?;
        let end = decode_end(row, narrow)?;
        let text = decode_middle(row, start.1, end.0)?;

        let allowed: &[usize] = if hints.allowed_lengths.is_empty() {
            &DEFAULT_ALLOWED_LENGTHS
        } else {
            &hints.allowed_lengths
        };
        // Anything longer than every allowed length is accepted too
        let length = text.len();
        let max_allowed = allowed.iter().copied().max().unwrap_or(0);
        if !allowed.contains(&length) && length <= max_allowed {
            return Err(DecodeError::Format("ITF length not allowed"));
        }

        let mut result = ScanResult::new(
            text,
            Vec::new(),
            vec![
                Point::new(start.1 as f32, row_number as f32),
                Point::new(end.0 as f32, row_number as f32),
            ],
            BarcodeFormat::Itf,
        );
        result.put_metadata(
            ResultMetadataType::SymbologyIdentifier,
            MetadataValue::Text("]I0".to_string()),
        );
        Ok(result)
    }
}

fn decode_middle(row: &BitArray, mut payload_start: usize, payload_end: usize) -> Result<String> {
    let mut text = String::with_capacity(20);
    let mut pair = [0u32; 10];
    while payload_start < payload_end {
        record_pattern(row, payload_start, &mut pair)?;
        let black: [u32; 5] = std::array::from_fn(|k| pair[2 * k]);
        let white: [u32; 5] = std::array::from_fn(|k| pair[2 * k + 1]);
        text.push(char::from(b'0' + decode_digit(&black)?));
        text.push(char::from(b'0' + decode_digit(&white)?));
        payload_start += pair.iter().sum::<u32>() as usize;
    }
    Ok(text)
}

/// Start guard range and the narrow line width it implies
fn decode_start(row: &BitArray) -> Result<((usize, usize), usize)> {
    let offset = skip_white_space(row)?;
    let start = find_guard_pattern(row, offset, &START_PATTERN)?;
    let narrow = (start.1 - start.0) / 4;
    validate_quiet_zone(row, start.0, narrow)?;
    Ok((start, narrow))
}

/// End guard range, found by searching the reversed row
fn decode_end(row: &BitArray, narrow: usize) -> Result<(usize, usize)> {
    let mut reversed = row.clone();
    reversed.reverse();
    let offset = skip_white_space(&reversed)?;
    let end = find_guard_pattern(&reversed, offset, &END_PATTERN_REVERSED[0])
        .or_else(|_| find_guard_pattern(&reversed, offset, &END_PATTERN_REVERSED[1]))?;
    validate_quiet_zone(&reversed, end.0, narrow)?;
    let size = row.size();
    Ok((size - end.1, size - end.0))
}

/// Ten narrow widths of white before `start`, or up to the row edge
fn validate_quiet_zone(row: &BitArray, start: usize, narrow: usize) -> Result<()> {
    let quiet = (narrow * 10).min(start);
    if row.is_range(start - quiet, start, false) {
        Ok(())
    } else {
        Err(DecodeError::NotFound)
    }
}

fn skip_white_space(row: &BitArray) -> Result<usize> {
    let offset = row.get_next_set(0);
    if offset == row.size() {
        return Err(DecodeError::NotFound);
    }
    Ok(offset)
}

fn find_guard_pattern(row: &BitArray, offset: usize, pattern: &[u32]) -> Result<(usize, usize)> {
    super::find_guard_pattern(row, offset, false, pattern, MAX_AVG_VARIANCE, MAX_INDIVIDUAL_VARIANCE)
}

fn decode_digit(counters: &[u32; 5]) -> Result<u8> {
    let mut best_variance = MAX_AVG_VARIANCE;
    let mut best_match = None;
    for (i, pattern) in PATTERNS.iter().enumerate() {
        let variance = pattern_match_variance(counters, pattern, MAX_INDIVIDUAL_VARIANCE);
        if variance < best_variance {
            best_variance = variance;
            best_match = Some(i);
        } else if variance == best_variance {
            best_match = None;
        }
    }
    best_match.map(|i| (i % 10) as u8).ok_or(DecodeError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oned::test_rows::row_from_modules;

    fn itf_row(digits: &str) -> BitArray {
        let mut modules = vec![true, false, true, false];
        let values: Vec<usize> = digits.bytes().map(|b| (b - b'0') as usize).collect();
        for pair in values.chunks(2) {
            let (bars, spaces) = (PATTERNS[pair[0] + 10], PATTERNS[pair[1] + 10]);
            for k in 0..5 {
                modules.extend(std::iter::repeat_n(true, bars[k] as usize));
                modules.extend(std::iter::repeat_n(false, spaces[k] as usize));
            }
        }
        modules.extend([true, true, true, false, true]);
        row_from_modules(&modules, 2, 30)
    }

    #[test]
    fn test_decode() {
        let result = ItfReader.decode_row(0, &itf_row("30712345000010"), &DecodeHints::default()).unwrap();
        assert_eq!(result.text, "30712345000010");
        assert_eq!(result.format, BarcodeFormat::Itf);
    }

    #[test]
    fn test_allowed_lengths() {
        let row = itf_row("1234");
        assert!(matches!(
            ItfReader.decode_row(0, &row, &DecodeHints::default()),
            Err(DecodeError::Format(_))
        ));
        let hints = DecodeHints {
            allowed_lengths: vec![4],
            ..DecodeHints::default()
        };
        assert_eq!(ItfReader.decode_row(0, &row, &hints).unwrap().text, "1234");
    }
}
