//! Linear symbologies: row scanning, shared run-length matching, readers
//! and writers.
//!
//! Every reader here decodes a single binarized row. The shared scanning
//! loop walks rows outward from the middle of the image and retries each row
//! reversed to catch upside-down symbols. Under TRY_HARDER the whole image
//! is scanned and, failing that, scanned again rotated by 90°.

mod code128;
mod code128_writer;
mod code39;
mod ean13_writer;
mod itf;
mod multi_format;
mod upc_ean;

pub use code39::Code39Reader;
pub use code128::Code128Reader;
pub use code128_writer::Code128Writer;
pub use ean13_writer::Ean13Writer;
pub use itf::ItfReader;
pub use multi_format::MultiFormatOneDReader;
pub use upc_ean::UpcEanReader;

use crate::binary_bitmap::BinaryBitmap;
use crate::config;
use crate::error::{DecodeError, Result};
use crate::models::{BitArray, DecodeHints, MetadataValue, Point, ResultMetadataType, ScanResult};
use crate::reader::Reader;

/// Decodes one symbology from a single image row
pub trait OneDReader {
    /// Decode the symbol crossing `row`, which is row `row_number` of the image
    fn decode_row(&mut self, row_number: usize, row: &BitArray, hints: &DecodeHints) -> Result<ScanResult>;
}

impl<T: OneDReader> Reader for T {
    fn decode(&mut self, image: &BinaryBitmap, hints: &DecodeHints) -> Result<ScanResult> {
        let first = match decode_rows(self, image, hints) {
            Ok(result) => return Ok(result),
            Err(err) => err,
        };
        if !hints.try_harder {
            return Err(first);
        }
        let Some(rotated) = image.rotate_counter_clockwise() else {
            return Err(first);
        };
        tracing::debug!(error = %first, "1D retry on rotated image");
        let mut result = decode_rows(self, &rotated, hints)?;

        let orientation = (result.metadata_int(ResultMetadataType::Orientation).unwrap_or(0) + 270) % 360;
        result.put_metadata(ResultMetadataType::Orientation, MetadataValue::Int(orientation));
        let height = rotated.height() as f32;
        for point in &mut result.result_points {
            *point = Point::new(height - point.y - 1.0, point.x);
        }
        Ok(result)
    }
}

/// Try rows from the middle outward, each one forwards and then reversed
fn decode_rows<R: OneDReader + ?Sized>(reader: &mut R, image: &BinaryBitmap, hints: &DecodeHints) -> Result<ScanResult> {
    let (width, height) = (image.width(), image.height());
    let row_step = (height >> if hints.try_harder { 8 } else { 5 }).max(1);
    let max_lines = if hints.try_harder { height } else { config::oned_max_lines() };
    let reversed_hints = hints.without_callback();

    let middle = height / 2;
    for x in 0..max_lines {
        let steps = (x + 1) / 2;
        let offset = (row_step * steps) as isize;
        let row_number = middle as isize + if x % 2 == 0 { offset } else { -offset };
        if row_number < 0 || row_number >= height as isize {
            break;
        }
        let row_number = row_number as usize;
        let Ok(row) = image.black_row(row_number) else {
            continue;
        };

        if let Ok(result) = reader.decode_row(row_number, row, hints) {
            for point in &result.result_points {
                hints.report_point(*point);
            }
            return Ok(result);
        }

        let mut reversed = row.clone();
        reversed.reverse();
        if let Ok(mut result) = reader.decode_row(row_number, &reversed, &reversed_hints) {
            result.put_metadata(ResultMetadataType::Orientation, MetadataValue::Int(180));
            for point in result.result_points.iter_mut().take(2) {
                *point = Point::new(width as f32 - point.x - 1.0, point.y);
            }
            return Ok(result);
        }
    }
    Err(DecodeError::NotFound)
}

/// Average deviation of observed run lengths from `pattern`, relative to the
/// total width; infinite when one run deviates by more than
/// `max_individual_variance` units
pub(crate) fn pattern_match_variance(counters: &[u32], pattern: &[u32], max_individual_variance: f32) -> f32 {
    let total: u32 = counters.iter().sum();
    let pattern_length: u32 = pattern.iter().take(counters.len()).sum();
    if total < pattern_length {
        return f32::INFINITY;
    }
    let unit_bar_width = total as f32 / pattern_length as f32;
    let max_individual_variance = max_individual_variance * unit_bar_width;

    let mut total_variance = 0.0;
    for (&counter, &expected) in counters.iter().zip(pattern) {
        let variance = (counter as f32 - expected as f32 * unit_bar_width).abs();
        if variance > max_individual_variance {
            return f32::INFINITY;
        }
        total_variance += variance;
    }
    total_variance / total as f32
}

/// Fill `counters` with successive run lengths starting at `start`. Running
/// off the end of the row is allowed only during the last run.
pub(crate) fn record_pattern(row: &BitArray, start: usize, counters: &mut [u32]) -> Result<()> {
    counters.fill(0);
    let end = row.size();
    if start >= end {
        return Err(DecodeError::NotFound);
    }
    let num_counters = counters.len();
    let mut is_white = !row.get(start);
    let mut position = 0;
    let mut i = start;
    while i < end {
        if row.get(i) != is_white {
            counters[position] += 1;
        } else {
            position += 1;
            if position == num_counters {
                break;
            }
            counters[position] = 1;
            is_white = !is_white;
        }
        i += 1;
    }
    if position == num_counters || (position == num_counters - 1 && i == end) {
        Ok(())
    } else {
        Err(DecodeError::NotFound)
    }
}

/// Sliding search for `pattern` from `offset`, starting on a bar or, with
/// `white_first`, on a space; returns the start and end of the match
pub(crate) fn find_guard_pattern(
    row: &BitArray,
    offset: usize,
    white_first: bool,
    pattern: &[u32],
    max_avg_variance: f32,
    max_individual_variance: f32,
) -> Result<(usize, usize)> {
    let mut counters = vec![0u32; pattern.len()];
    let width = row.size();
    let offset = if white_first { row.get_next_unset(offset) } else { row.get_next_set(offset) };
    let last = pattern.len() - 1;
    let mut position = 0;
    let mut pattern_start = offset;
    let mut is_white = white_first;
    for x in offset..width {
        if row.get(x) != is_white {
            counters[position] += 1;
        } else {
            if position == last {
                if pattern_match_variance(&counters, pattern, max_individual_variance) < max_avg_variance {
                    return Ok((pattern_start, x));
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
    }
    Err(DecodeError::NotFound)
}

/// Expand alternating bar and space widths, bar first, into modules
pub(crate) fn append_widths(code: &mut Vec<bool>, widths: &[u32], start_with_bar: bool) {
    let mut bar = start_with_bar;
    for &width in widths {
        code.extend(std::iter::repeat_n(bar, width as usize));
        bar = !bar;
    }
}


#[cfg(test)]
mod tests {
    use super::test_rows::row_from_modules;
    use super::*;
    use crate::models::{BarcodeFormat, BitMatrix, EncodeHints};
    use crate::utils::luminance::GrayLuminanceSource;
    use crate::writer::Writer;

    fn bitmap(matrix: &BitMatrix) -> BinaryBitmap {
        let (width, height) = (matrix.width(), matrix.height());
        let mut pixels = vec![255u8; width * height];
        for y in 0..height {
            for x in 0..width {
                if matrix.get(x, y) {
                    pixels[y * width + x] = 0;
                }
            }
        }
        BinaryBitmap::from_luminance(GrayLuminanceSource::new(pixels, width, height))
    }

    #[test]
    fn test_pattern_match_variance() {
        assert_eq!(pattern_match_variance(&[2, 4, 2], &[1, 2, 1], 0.7), 0.0);
        assert!(pattern_match_variance(&[2, 2, 2], &[1, 3, 1], 0.2).is_infinite());
        assert!(pattern_match_variance(&[1, 1], &[2, 2], 0.7).is_infinite());
    }

    #[test]
    fn test_record_pattern() {
        let row = row_from_modules(&[true, true, false, true, false, false, false], 1, 0);
        let mut counters = [0u32; 4];
        record_pattern(&row, 0, &mut counters).unwrap();
        assert_eq!(counters, [2, 1, 1, 3]);
        let mut counters = [0u32; 5];
        assert_eq!(record_pattern(&row, 0, &mut counters), Err(DecodeError::NotFound));
    }

    #[test]
    fn test_find_guard_pattern() {
        let row = row_from_modules(&[true, false, true, false, false], 2, 4);
        assert_eq!(find_guard_pattern(&row, 0, false, &[1, 1, 1], 0.48, 0.7), Ok((4, 10)));
    }

    #[test]
    fn test_upside_down_row() {
        let mut matrix = Code128Writer
            .encode("Upside 42", BarcodeFormat::Code128, 500, 40, &EncodeHints::default())
            .unwrap();
        matrix.rotate180();
        let result = MultiFormatOneDReader::default()
            .decode(&bitmap(&matrix), &DecodeHints::default())
            .unwrap();
        assert_eq!(result.text, "Upside 42");
        assert_eq!(result.metadata_int(ResultMetadataType::Orientation), Some(180));
    }

    #[test]
    fn test_try_harder_rotates() {
        let mut matrix = Code128Writer
            .encode("Vertical", BarcodeFormat::Code128, 500, 40, &EncodeHints::default())
            .unwrap();
        matrix.rotate90();
        let image = bitmap(&matrix);
        let mut reader = MultiFormatOneDReader::default();
        assert!(reader.decode(&image, &DecodeHints::default()).is_err());
        let result = reader
            .decode(&image, &DecodeHints::default().with_try_harder(true))
            .unwrap();
        assert_eq!(result.text, "Vertical");
        let orientation = result.metadata_int(ResultMetadataType::Orientation).unwrap();
        assert!(orientation == 270 || orientation == 90);
    }
}
