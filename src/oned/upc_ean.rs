//! EAN-13, EAN-8 and UPC-A reading.
//!
//! UPC-A is an EAN-13 whose first digit is 0, so both come from the same
//! decode and the format is settled afterwards from the requested formats.

use super::{OneDReader, find_guard_pattern, pattern_match_variance, record_pattern};
use crate::error::{DecodeError, Result};
use crate::models::{BarcodeFormat, BitArray, DecodeHints, MetadataValue, Point, ResultMetadataType, ScanResult};

const MAX_AVG_VARIANCE: f32 = 0.48;
const MAX_INDIVIDUAL_VARIANCE: f32 = 0.7;

pub(crate) const START_END_PATTERN: [u32; 3] = [1, 1, 1];
pub(crate) const MIDDLE_PATTERN: [u32; 5] = [1, 1, 1, 1, 1];

/// Odd-parity ("L") digit widths, space first
pub(crate) const L_PATTERNS: [[u32; 4]; 10] = [
    [3, 2, 1, 1],
    [2, 2, 2, 1],
    [2, 1, 2, 2],
    [1, 4, 1, 1],
    [1, 1, 3, 2],
    [1, 2, 3, 1],
    [1, 1, 1, 4],
    [1, 3, 1, 2],
    [1, 2, 1, 3],
    [3, 1, 1, 2],
];

/// L patterns followed by their mirror images, the even-parity ("G") set
const L_AND_G_PATTERNS: [[u32; 4]; 20] = {
    let mut patterns = [[0u32; 4]; 20];
    let mut i = 0;
    while i < 10 {
        patterns[i] = L_PATTERNS[i];
        let l = L_PATTERNS[i];
        patterns[i + 10] = [l[3], l[2], l[1], l[0]];
        i += 1;
    }
    patterns
};

/// Parity of the six left-hand EAN-13 digits, G as 1, for each first digit
pub(crate) const FIRST_DIGIT_ENCODINGS: [u8; 10] = [0x00, 0x0B, 0x0D, 0x0E, 0x13, 0x19, 0x1C, 0x15, 0x16, 0x1A];

/// EAN-13, UPC-A and EAN-8, restricted by the requested formats
#[derive(Debug, Clone, Copy, Default)]
pub struct UpcEanReader;

impl OneDReader for UpcEanReader {
    fn decode_row(&mut self, row_number: usize, row: &BitArray, hints: &DecodeHints) -> Result<ScanResult> {
        let start = find_start_guard_pattern(row)?;
        let ean13 = hints.allows(BarcodeFormat::Ean13) || hints.allows(BarcodeFormat::UpcA);
        let mut last_error = DecodeError::NotFound;

        if ean13 {
            match decode_with_guard(row_number, row, start, Symbol::Ean13) {
                Ok(result) => return settle_upc_a(result, hints),
                Err(err) => last_error = err,
            }
        }
        if hints.allows(BarcodeFormat::Ean8) {
            match decode_with_guard(row_number, row, start, Symbol::Ean8) {
                Ok(result) => return Ok(result),
                Err(err) => last_error = err,
            }
        }
        Err(last_error)
    }
}

/// Report an EAN-13 with a leading 0 as UPC-A when UPC-A may be returned
fn settle_upc_a(mut result: ScanResult, hints: &DecodeHints) -> Result<ScanResult> {
    let may_be_upc_a = result.text.starts_with('0');
    let can_return_upc_a = hints.allows(BarcodeFormat::UpcA);
    if may_be_upc_a && can_return_upc_a {
        result.text.remove(0);
        result.format = BarcodeFormat::UpcA;
        return Ok(result);
    }
    if !hints.allows(BarcodeFormat::Ean13) {
        return Err(DecodeError::Format("EAN-13 is not a UPC-A"));
    }
    Ok(result)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Symbol {
    Ean13,
    Ean8,
}

fn find_start_guard_pattern(row: &BitArray) -> Result<(usize, usize)> {
    let mut next_start = 0;
    loop {
        let (start, end) = find_guard_pattern(
            row,
            next_start,
            false,
            &START_END_PATTERN,
            MAX_AVG_VARIANCE,
            MAX_INDIVIDUAL_VARIANCE,
        )?;
        next_start = end;
        // Quiet zone as wide as the guard itself
        if let Some(quiet_start) = start.checked_sub(end - start)
            && row.is_range(quiet_start, start, false)
        {
            return Ok((start, end));
        }
    }
}

fn decode_with_guard(row_number: usize, row: &BitArray, start: (usize, usize), symbol: Symbol) -> Result<ScanResult> {
    let mut digits = String::with_capacity(13);
    let end_start = match symbol {
        Symbol::Ean13 => decode_middle_ean13(row, start.1, &mut digits)?,
        Symbol::Ean8 => decode_middle_ean8(row, start.1, &mut digits)?,
    };
    let end = find_guard_pattern(
        row,
        end_start,
        false,
        &START_END_PATTERN,
        MAX_AVG_VARIANCE,
        MAX_INDIVIDUAL_VARIANCE,
    )?;

    let quiet_end = end.1 + (end.1 - end.0);
    if quiet_end >= row.size() || !row.is_range(end.1, quiet_end, false) {
        return Err(DecodeError::NotFound);
    }
    if digits.len() < 8 {
        return Err(DecodeError::Format("too few UPC/EAN digits"));
    }
    if !check_standard_checksum(&digits) {
        return Err(DecodeError::Checksum);
    }

    let left = (start.0 + start.1) as f32 / 2.0;
    let right = (end.0 + end.1) as f32 / 2.0;
    let (format, modifier) = match symbol {
        Symbol::Ean13 => (BarcodeFormat::Ean13, 0),
        Symbol::Ean8 => (BarcodeFormat::Ean8, 4),
    };
    let mut result = ScanResult::new(
        digits,
        Vec::new(),
        vec![Point::new(left, row_number as f32), Point::new(right, row_number as f32)],
        format,
    );
    result.put_metadata(
        ResultMetadataType::SymbologyIdentifier,
        MetadataValue::Text(format!("]E{modifier}")),
    );
    Ok(result)
}

fn decode_middle_ean13(row: &BitArray, mut offset: usize, digits: &mut String) -> Result<usize> {
    let mut counters = [0u32; 4];
    let mut lg_pattern = 0u8;
    for x in 0..6 {
        let best = decode_digit(row, &mut counters, offset, &L_AND_G_PATTERNS)?;
        digits.push(char::from(b'0' + (best % 10) as u8));
        offset += counters.iter().sum::<u32>() as usize;
        if best >= 10 {
            lg_pattern |= 1 << (5 - x);
        }
    }
    let first = FIRST_DIGIT_ENCODINGS
        .iter()
        .position(|&p| p == lg_pattern)
        .ok_or(DecodeError::NotFound)?;
    digits.insert(0, char::from(b'0' + first as u8));

    let (_, middle_end) = find_guard_pattern(row, offset, true, &MIDDLE_PATTERN, MAX_AVG_VARIANCE, MAX_INDIVIDUAL_VARIANCE)?;
    offset = middle_end;
    for _ in 0..6 {
        let best = decode_digit(row, &mut counters, offset, &L_PATTERNS)?;
        digits.push(char::from(b'0' + best as u8));
        offset += counters.iter().sum::<u32>() as usize;
    }
    Ok(offset)
}

fn decode_middle_ean8(row: &BitArray, mut offset: usize, digits: &mut String) -> Result<usize> {
    let mut counters = [0u32; 4];
    for _ in 0..4 {
        let best = decode_digit(row, &mut counters, offset, &L_PATTERNS)?;
        digits.push(char::from(b'0' + best as u8));
        offset += counters.iter().sum::<u32>() as usize;
    }
    let (_, middle_end) = find_guard_pattern(row, offset, true, &MIDDLE_PATTERN, MAX_AVG_VARIANCE, MAX_INDIVIDUAL_VARIANCE)?;
    offset = middle_end;
    for _ in 0..4 {
        let best = decode_digit(row, &mut counters, offset, &L_PATTERNS)?;
        digits.push(char::from(b'0' + best as u8));
        offset += counters.iter().sum::<u32>() as usize;
    }
    Ok(offset)
}

fn decode_digit(row: &BitArray, counters: &mut [u32; 4], offset: usize, patterns: &[[u32; 4]]) -> Result<usize> {
    record_pattern(row, offset, counters)?;
    let mut best_variance = MAX_AVG_VARIANCE;
    let mut best_match = None;
    for (i, pattern) in patterns.iter().enumerate() {
        let variance = pattern_match_variance(counters, pattern, MAX_INDIVIDUAL_VARIANCE);
        if variance < best_variance {
            best_variance = variance;
            best_match = Some(i);
        }
    }
    best_match.ok_or(DecodeError::NotFound)
}

/// Check digit over all digits of `digits`: weight 3 on every other digit
/// counting from the right
pub(crate) fn standard_checksum(digits: &str) -> Option<u32> {
    let mut sum = 0;
    for (i, c) in digits.chars().rev().enumerate() {
        let digit = c.to_digit(10)?;
        sum += if i % 2 == 0 { digit * 3 } else { digit };
    }
    Some((10 - sum % 10) % 10)
}

fn check_standard_checksum(digits: &str) -> bool {
    let Some((body, check)) = digits.len().checked_sub(1).map(|n| digits.split_at(n)) else {
        return false;
    };
    match (standard_checksum(body), check.chars().next().and_then(|c| c.to_digit(10))) {
        (Some(expected), Some(found)) => expected == found,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oned::append_widths;
    use crate::oned::test_rows::row_from_modules;

    fn ean8_row(digits: &str) -> BitArray {
        let mut modules = Vec::new();
        append_widths(&mut modules, &START_END_PATTERN, true);
        for (i, c) in digits.bytes().enumerate() {
            if i == 4 {
                append_widths(&mut modules, &MIDDLE_PATTERN, false);
            }
            append_widths(&mut modules, &L_PATTERNS[(c - b'0') as usize], i >= 4);
        }
        append_widths(&mut modules, &START_END_PATTERN, true);
        row_from_modules(&modules, 2, 20)
    }

    fn ean13_row(digits: &str) -> BitArray {
        let code = crate::oned::ean13_writer::encode(digits).unwrap();
        row_from_modules(&code, 2, 20)
    }

    #[test]
    fn test_checksum() {
        assert_eq!(standard_checksum("400638133393"), Some(1));
        assert_eq!(standard_checksum("9638507"), Some(4));
        assert!(check_standard_checksum("4006381333931"));
        assert!(!check_standard_checksum("4006381333932"));
        assert_eq!(standard_checksum("12a"), None);
    }

    #[test]
    fn test_ean8() {
        let result = UpcEanReader.decode_row(0, &ean8_row("96385074"), &DecodeHints::default()).unwrap();
        assert_eq!(result.text, "96385074");
        assert_eq!(result.format, BarcodeFormat::Ean8);
        assert_eq!(result.metadata_text(ResultMetadataType::SymbologyIdentifier), Some("]E4"));
    }

    #[test]
    fn test_ean13() {
        let result = UpcEanReader
            .decode_row(0, &ean13_row("4006381333931"), &DecodeHints::default())
            .unwrap();
        assert_eq!(result.text, "4006381333931");
        assert_eq!(result.format, BarcodeFormat::Ean13);
    }

    #[test]
    fn test_upc_a_from_leading_zero() {
        let row = ean13_row("0036000291452");
        let result = UpcEanReader.decode_row(0, &row, &DecodeHints::default()).unwrap();
        assert_eq!(result.text, "036000291452");
        assert_eq!(result.format, BarcodeFormat::UpcA);

        let hints = DecodeHints::default().with_formats([BarcodeFormat::Ean13]);
        let result = UpcEanReader.decode_row(0, &row, &hints).unwrap();
        assert_eq!(result.format, BarcodeFormat::Ean13);
    }

    #[test]
    fn test_upc_a_only_rejects_ean13() {
        let hints = DecodeHints::default().with_formats([BarcodeFormat::UpcA]);
        assert!(matches!(
            UpcEanReader.decode_row(0, &ean13_row("4006381333931"), &hints),
            Err(DecodeError::Format(_))
        ));
    }
}
