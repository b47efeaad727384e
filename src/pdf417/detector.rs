//! PDF417 location from its start and stop guards
//!
//! Rows are sampled every few pixels until the start guard shows up, then
//! followed up and down to the first and last rows that still carry it. The
//! stop guard is searched the same way to the right. Symbols that are not
//! upright are found by repeating the search on rotated copies.

use std::borrow::Cow;

use super::{START_PATTERN, STOP_PATTERN};
use crate::error::{DecodeError, Result};
use crate::models::{BitMatrix, Point};

const MAX_AVG_VARIANCE: f32 = 0.42;
const MAX_INDIVIDUAL_VARIANCE: f32 = 0.8;
const MAX_PIXEL_DRIFT: usize = 3;
const MAX_PATTERN_DRIFT: usize = 5;
// Rows without the guard before the guard is considered lost
const SKIPPED_ROW_COUNT_MAX: usize = 25;
const ROW_STEP: usize = 5;
const BARCODE_MIN_HEIGHT: usize = 10;
const ROTATIONS: [u32; 4] = [0, 180, 270, 90];

/// Guard vertices in the (possibly rotated) matrix they were found in.
///
/// `vertices` holds, in order: start guard top-left and bottom-left, stop
/// guard top-right and bottom-right, start guard top-right and
/// bottom-right, stop guard top-left and bottom-left.
#[derive(Debug, Clone)]
pub struct Pdf417DetectorResult<'a> {
    /// Matrix the vertices refer to
    pub bits: Cow<'a, BitMatrix>,
    /// Guard corners
    pub vertices: [Point; 8],
    /// Counter-clockwise rotation applied to the input
    pub rotation: u32,
    source_width: usize,
    source_height: usize,
}

impl Pdf417DetectorResult<'_> {
    /// The four outer corners in input image coordinates: top-left,
    /// bottom-left, top-right, bottom-right
    pub fn corner_points(&self) -> Vec<Point> {
        self.vertices[..4]
            .iter()
            .map(|&p| unrotate(p, self.rotation, self.source_width, self.source_height))
            .collect()
    }
}

/// Undo a counter-clockwise rotation of a `width` × `height` image
fn unrotate(point: Point, rotation: u32, width: usize, height: usize) -> Point {
    let (w, h) = ((width as f32) - 1.0, (height as f32) - 1.0);
    match rotation {
        90 => Point::new(w - point.y, point.x),
        180 => Point::new(w - point.x, h - point.y),
        270 => Point::new(point.y, h - point.x),
        _ => point,
    }
}

/// Find one symbol, trying the image upright and then rotated
pub fn detect(image: &BitMatrix) -> Result<Pdf417DetectorResult<'_>> {
    for rotation in ROTATIONS {
        let bits = if rotation == 0 {
            Cow::Borrowed(image)
        } else {
            let mut rotated = image.clone();
            rotated.rotate(rotation)?;
            Cow::Owned(rotated)
        };
        if let Some(vertices) = find_vertices(&bits) {
            tracing::debug!(rotation, "PDF417 guards found");
            return Ok(Pdf417DetectorResult {
                bits,
                vertices,
                rotation,
                source_width: image.width(),
                source_height: image.height(),
            });
        }
    }
    Err(DecodeError::NotFound)
}

fn find_vertices(matrix: &BitMatrix) -> Option<[Point; 8]> {
    let start = find_rows_with_pattern(matrix, 0, 0, &START_PATTERN)?;
    let (row, column) = (start[1].y as usize, start[1].x as usize);
    let stop = find_rows_with_pattern(matrix, row, column, &STOP_PATTERN)?;
    Some([start[0], start[2], stop[1], stop[3], start[1], start[3], stop[0], stop[2]])
}

/// Top-left, top-right, bottom-left and bottom-right of a guard
fn find_rows_with_pattern(
    matrix: &BitMatrix,
    start_row: usize,
    start_column: usize,
    pattern: &[u32],
) -> Option<[Point; 4]> {
    let (width, height) = (matrix.width(), matrix.height());
    let mut counters = vec![0u32; pattern.len()];

    let mut row = start_row;
    let mut found = None;
    while row < height {
        if let Some(mut location) = find_guard_pattern(matrix, start_column, row, width, pattern, &mut counters) {
            // Back up to the first row carrying the guard
            while row > 0 {
                match find_guard_pattern(matrix, start_column, row - 1, width, pattern, &mut counters) {
                    Some(previous) => {
                        location = previous;
                        row -= 1;
                    }
                    None => break,
                }
            }
            found = Some(location);
            break;
        }
        row += ROW_STEP;
    }
    let (left, right) = found?;
    let top = row;

    let mut previous = (left, right);
    let mut stop_row = top + 1;
    let mut skipped = 0;
    while stop_row < height {
        match find_guard_pattern(matrix, previous.0, stop_row, width, pattern, &mut counters) {
            Some(location)
                if location.0.abs_diff(previous.0) < MAX_PATTERN_DRIFT
                    && location.1.abs_diff(previous.1) < MAX_PATTERN_DRIFT =>
            {
                previous = location;
                skipped = 0;
            }
            _ if skipped > SKIPPED_ROW_COUNT_MAX => break,
            _ => skipped += 1,
        }
        stop_row += 1;
    }
    let bottom = stop_row - (skipped + 1);
    if bottom - top < BARCODE_MIN_HEIGHT {
        return None;
    }
    Some([
        Point::new(left as f32, top as f32),
        Point::new(right as f32, top as f32),
        Point::new(previous.0 as f32, bottom as f32),
        Point::new(previous.1 as f32, bottom as f32),
    ])
}

/// Start and end column of `pattern` in `row`, scanning right from `column`.
///
/// The start guard is the leftmost match. Runs of data codewords can pass
/// for a stop guard, so for the stop guard the rightmost match wins.
fn find_guard_pattern(
    matrix: &BitMatrix,
    column: usize,
    row: usize,
    width: usize,
    pattern: &[u32],
    counters: &mut [u32],
) -> Option<(usize, usize)> {
    let rightmost = pattern.len() == STOP_PATTERN.len();
    let mut found = None;
    counters.fill(0);
    let mut pattern_start = column;
    let mut drift = 0;
    while matrix.get(pattern_start, row) && pattern_start > 0 && drift < MAX_PIXEL_DRIFT {
        pattern_start -= 1;
        drift += 1;
    }

    let last = pattern.len() - 1;
    let mut position = 0;
    let mut is_white = false;
    let mut x = pattern_start;
    while x < width {
        if matrix.get(x, row) != is_white {
            counters[position] += 1;
        } else {
            if position == last {
                if pattern_match_variance(counters, pattern) < MAX_AVG_VARIANCE {
                    if !rightmost {
                        return Some((pattern_start, x));
                    }
                    found = Some((pattern_start, x));
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
        x += 1;
    }
    if position == last && pattern_match_variance(counters, pattern) < MAX_AVG_VARIANCE {
        return Some((pattern_start, x));
    }
    found
}

/// Average deviation of `counters` from `pattern`, relative to the pattern
/// size; infinite when a single element is too far off
fn pattern_match_variance(counters: &[u32], pattern: &[u32]) -> f32 {
    let total: u32 = counters.iter().sum();
    let pattern_length: u32 = pattern.iter().sum();
    if total < pattern_length {
        return f32::INFINITY;
    }
    let unit_bar_width = total as f32 / pattern_length as f32;
    let max_individual_variance = MAX_INDIVIDUAL_VARIANCE * unit_bar_width;

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

#[cfg(test)]
mod tests {
    use super::*;

    /// `widths` followed by a two-module bar, as in a symbol row
    fn guard_row(prefix: usize, widths: &[u32], scale: usize) -> BitMatrix {
        let widths: Vec<u32> = widths.iter().copied().chain([2]).collect();
        let total: usize = widths.iter().map(|&w| w as usize).sum::<usize>() * scale;
        let mut matrix = BitMatrix::new(prefix + total + 10, 1);
        let mut x = prefix;
        for (i, &w) in widths.iter().enumerate() {
            for _ in 0..w as usize * scale {
                if i % 2 == 0 {
                    matrix.set(x, 0);
                }
                x += 1;
            }
        }
        matrix
    }

    #[test]
    fn test_variance() {
        assert_eq!(pattern_match_variance(&[16, 2, 2, 2, 2, 2, 2, 6], &START_PATTERN), 0.0);
        assert!(pattern_match_variance(&[4, 2, 2, 2, 2, 2, 2, 6], &START_PATTERN).is_infinite());
        assert!(pattern_match_variance(&[1, 1, 1], &[2, 2, 2]).is_infinite());
    }

    #[test]
    fn test_find_guard_pattern() {
        let matrix = guard_row(7, &START_PATTERN, 2);
        let mut counters = [0u32; 8];
        // Ends where the following bar begins
        let found = find_guard_pattern(&matrix, 0, 0, matrix.width(), &START_PATTERN, &mut counters);
        assert_eq!(found, Some((7, 7 + 34)));
    }

    #[test]
    fn test_stop_guard_not_mistaken_for_start() {
        let matrix = guard_row(3, &STOP_PATTERN, 2);
        let mut counters = [0u32; 8];
        assert_eq!(
            find_guard_pattern(&matrix, 0, 0, matrix.width(), &START_PATTERN, &mut counters),
            None
        );
    }

    #[test]
    fn test_unrotate() {
        // 10 x 6 image: rotating 90° maps (x, y) to (y, 9 - x)
        let p = Point::new(2.0, 3.0);
        let rotated = Point::new(p.y, 9.0 - p.x);
        assert_eq!(unrotate(rotated, 90, 10, 6), p);
        let rotated = Point::new(9.0 - p.x, 5.0 - p.y);
        assert_eq!(unrotate(rotated, 180, 10, 6), p);
        // 270°: (x, y) to (5 - y, x)
        let rotated = Point::new(5.0 - p.y, p.x);
        assert_eq!(unrotate(rotated, 270, 10, 6), p);
    }

    #[test]
    fn test_blank_not_found() {
        assert!(matches!(detect(&BitMatrix::new(60, 40)), Err(DecodeError::NotFound)));
    }
}
