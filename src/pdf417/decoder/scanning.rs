//! Codeword extraction from the rows between the guards.
//!
//! Every pixel row is read from the end of the start guard to the start of
//! the stop guard. The row indicators at both ends vote on the symbol's
//! row count, column count and error correction level, and tell which
//! symbol row a pixel row belongs to. Data codewords are then placed by
//! position and cluster, and every cell keeps the value seen most often.

use std::collections::BTreeMap;

use crate::error::{DecodeError, Result};
use crate::models::{BitMatrix, Point};
use crate::pdf417::{
    BARS_IN_MODULE, MAX_COLUMNS, MAX_ROWS, MIN_ROWS, MODULES_IN_CODEWORD, bit_value, codeword_for, sample_bit_counts,
};

// Allowed difference between a measured codeword width and 17 modules
const CODEWORD_SKEW_MODULES: f32 = 2.0;

/// Codewords in row-major order with unreadable cells listed as erasures
#[derive(Debug, Clone, PartialEq)]
pub struct ScannedSymbol {
    /// All codewords, data first, erasures set to 0
    pub codewords: Vec<u32>,
    /// Indexes into `codewords` that no row could read
    pub erasures: Vec<usize>,
    /// Error correction level from the row indicators
    pub ec_level: u32,
    /// Data columns
    pub columns: usize,
    /// Rows
    pub rows: usize,
}

#[derive(Debug, Clone, Copy)]
struct ScannedCodeword {
    x: f32,
    value: u32,
    cluster: usize,
}

struct PixelRow {
    left: f32,
    right: f32,
    codewords: Vec<ScannedCodeword>,
}

/// Counts how often each value was seen
#[derive(Debug, Default, Clone)]
struct Votes(BTreeMap<u32, u32>);

impl Votes {
    fn add(&mut self, value: u32) {
        *self.0.entry(value).or_default() += 1;
    }

    /// Most frequent value, the smallest one on ties
    fn best(&self) -> Option<u32> {
        let max = self.0.values().copied().max()?;
        self.0.iter().find(|&(_, &count)| count == max).map(|(&value, _)| value)
    }
}

#[derive(Debug, Default)]
struct MetadataVotes {
    columns: Votes,
    rows_upper: Votes,
    rows_lower: Votes,
    ec_level: Votes,
}

impl MetadataVotes {
    fn left_indicator(&mut self, codeword: &ScannedCodeword) {
        let value = codeword.value % 30;
        match codeword.cluster {
            0 => self.rows_upper.add(value),
            1 => {
                self.ec_level.add(value / 3);
                self.rows_lower.add(value % 3);
            }
            _ => self.columns.add(value + 1),
        }
    }

    fn right_indicator(&mut self, codeword: &ScannedCodeword) {
        let value = codeword.value % 30;
        match codeword.cluster {
            0 => self.columns.add(value + 1),
            1 => self.rows_upper.add(value),
            _ => {
                self.ec_level.add(value / 3);
                self.rows_lower.add(value % 3);
            }
        }
    }

    /// Columns, rows and EC level, when every field got a valid vote
    fn resolve(&self) -> Option<(usize, usize, u32)> {
        let columns = self.columns.best()? as usize;
        let rows = (self.rows_upper.best()? * 3 + self.rows_lower.best()? + 1) as usize;
        let ec_level = self.ec_level.best()?;
        let valid = (1..=MAX_COLUMNS).contains(&columns) && (MIN_ROWS..=MAX_ROWS).contains(&rows) && ec_level <= 8;
        valid.then_some((columns, rows, ec_level))
    }
}

/// Read the symbol whose guards are at `vertices` (see the detector)
pub fn scan(image: &BitMatrix, vertices: &[Point; 8]) -> Result<ScannedSymbol> {
    let [start_top_left, start_bottom_left, stop_top_right, stop_bottom_right, start_top_right, start_bottom_right, stop_top_left, stop_bottom_left] =
        *vertices;
    let guard_width = ((start_top_right.x - start_top_left.x) + (start_bottom_right.x - start_bottom_left.x)) / 2.0;
    let module_width = guard_width / MODULES_IN_CODEWORD as f32;
    if module_width < 1.0 {
        return Err(DecodeError::NotFound);
    }

    let top = start_top_left.y.min(stop_top_right.y).max(0.0) as usize;
    let bottom = (start_bottom_left.y.max(stop_bottom_right.y) as usize).min(image.height().saturating_sub(1));

    let mut pixel_rows = Vec::with_capacity(bottom.saturating_sub(top) + 1);
    let mut votes = MetadataVotes::default();
    let codeword_width = MODULES_IN_CODEWORD as f32 * module_width;
    for y in top..=bottom {
        let left = interpolate(start_top_right, start_bottom_right, y as f32);
        let right = interpolate(stop_top_left, stop_bottom_left, y as f32);
        if right - left < 2.0 * codeword_width {
            continue;
        }
        let codewords = scan_row(image, y, left, right, module_width);
        if let Some(first) = codewords.first().filter(|c| c.x - left < codeword_width / 2.0) {
            votes.left_indicator(first);
        }
        if let Some(last) = codewords
            .last()
            .filter(|c| (right - codeword_width - c.x).abs() < codeword_width / 2.0)
        {
            votes.right_indicator(last);
        }
        pixel_rows.push(PixelRow { left, right, codewords });
    }

    let (columns, rows, ec_level) = votes.resolve().ok_or(DecodeError::NotFound)?;
    tracing::trace!(columns, rows, ec_level, "PDF417 row indicators");

    let mut cells = vec![Votes::default(); rows * columns];
    for row in &pixel_rows {
        let width = (row.right - row.left) / (columns + 2) as f32;
        let column_of = |c: &ScannedCodeword| ((c.x - row.left) / width).round() as isize;
        let indicator_row = |c: &ScannedCodeword| (c.value / 30) as usize * 3 + c.cluster;
        let row_number = match (
            row.codewords.first().filter(|c| column_of(c) == 0),
            row.codewords.last().filter(|c| column_of(c) == columns as isize + 1),
        ) {
            (Some(l), Some(r)) if indicator_row(l) != indicator_row(r) => continue,
            (Some(c), _) | (None, Some(c)) => indicator_row(c),
            (None, None) => continue,
        };
        if row_number >= rows {
            continue;
        }
        for codeword in &row.codewords {
            let column = column_of(codeword);
            if column < 1 || column > columns as isize || codeword.cluster != row_number % 3 {
                continue;
            }
            cells[row_number * columns + column as usize - 1].add(codeword.value);
        }
    }

    let mut codewords = Vec::with_capacity(cells.len());
    let mut erasures = Vec::new();
    for (index, cell) in cells.iter().enumerate() {
        match cell.best() {
            Some(value) => codewords.push(value),
            None => {
                codewords.push(0);
                erasures.push(index);
            }
        }
    }
    Ok(ScannedSymbol {
        codewords,
        erasures,
        ec_level,
        columns,
        rows,
    })
}

fn interpolate(a: Point, b: Point, y: f32) -> f32 {
    if (b.y - a.y).abs() < f32::EPSILON {
        return a.x;
    }
    a.x + (b.x - a.x) * (y - a.y) / (b.y - a.y)
}

/// Decode consecutive codewords in pixel row `y` between `left` and `right`
fn scan_row(image: &BitMatrix, y: usize, left: f32, right: f32, module_width: f32) -> Vec<ScannedCodeword> {
    let width = image.width();
    let mut x = left.round().max(0.0) as usize;
    // Snap to the first bar of the left row indicator
    if image.get(x, y) {
        while x > 0 && image.get(x - 1, y) && left - ((x - 1) as f32) < module_width {
            x -= 1;
        }
    } else {
        while x < width && !image.get(x, y) && (x as f32) < left + module_width {
            x += 1;
        }
    }

    let codeword_width = MODULES_IN_CODEWORD as f32 * module_width;
    let limit = right - codeword_width / 2.0;
    let mut codewords = Vec::new();
    while (x as f32) < limit && x < width {
        let start = x;
        let mut widths = [0u32; BARS_IN_MODULE];
        for (i, slot) in widths.iter_mut().enumerate() {
            let bar = i % 2 == 0;
            while x < width && image.get(x, y) == bar {
                *slot += 1;
                x += 1;
            }
        }
        if x == start {
            break;
        }
        let measured = (x - start) as f32;
        if widths.contains(&0) || (measured - codeword_width).abs() > CODEWORD_SKEW_MODULES * module_width {
            continue;
        }
        if let Some((value, cluster)) = codeword_for(bit_value(&sample_bit_counts(&widths))) {
            codewords.push(ScannedCodeword {
                x: start as f32,
                value,
                cluster,
            });
        }
    }
    codewords
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf417::encoder::{self, DEFAULT_EC_LEVEL};

    /// Scale the module grid and locate the guards from the known layout
    fn rendered(text: &str, scale: usize, row_height: usize) -> (BitMatrix, [Point; 8], Vec<u32>) {
        let code = encoder::encode(text, None, DEFAULT_EC_LEVEL).unwrap();
        let grid = code.to_bit_matrix(row_height);
        let quiet = 2 * scale;
        let mut image = BitMatrix::new(grid.width() * scale + 2 * quiet, grid.height() * scale + 2 * quiet);
        for y in 0..grid.height() * scale {
            for x in 0..grid.width() * scale {
                if grid.get(x / scale, y / scale) {
                    image.set(x + quiet, y + quiet);
                }
            }
        }
        let (top, bottom) = (quiet as f32, (quiet + grid.height() * scale - 1) as f32);
        let start_left = quiet as f32;
        let start_right = (quiet + 17 * scale) as f32;
        let stop_left = (quiet + (grid.width() - 18) * scale) as f32;
        let stop_right = (quiet + grid.width() * scale) as f32;
        let vertices = [
            Point::new(start_left, top),
            Point::new(start_left, bottom),
            Point::new(stop_right, top),
            Point::new(stop_right, bottom),
            Point::new(start_right, top),
            Point::new(start_right, bottom),
            Point::new(stop_left, top),
            Point::new(stop_left, bottom),
        ];
        (image, vertices, code.codewords)
    }

    #[test]
    fn test_scan_clean_symbol() {
        let (image, vertices, expected) = rendered("PDF417 scanning test", 2, 3);
        let scanned = scan(&image, &vertices).unwrap();
        assert_eq!(scanned.ec_level, DEFAULT_EC_LEVEL);
        assert!(scanned.erasures.is_empty());
        assert_eq!(scanned.codewords, expected);
    }

    #[test]
    fn test_damaged_cell_becomes_erasure() {
        let (mut image, vertices, expected) = rendered("ERASE", 3, 2);
        // Wipe the first data codeword of symbol row 0 in every pixel row
        let x0 = vertices[4].x as usize + 17 * 3;
        for y in 0..2 * 3 {
            for x in x0..x0 + 17 * 3 {
                image.unset(x, vertices[0].y as usize + y);
            }
        }
        let scanned = scan(&image, &vertices).unwrap();
        assert_eq!(scanned.erasures, vec![0]);
        assert_eq!(&scanned.codewords[1..], &expected[1..]);
    }

    #[test]
    fn test_votes() {
        let mut votes = Votes::default();
        assert_eq!(votes.best(), None);
        for v in [5, 7, 7, 5, 9] {
            votes.add(v);
        }
        assert_eq!(votes.best(), Some(5));
        votes.add(7);
        assert_eq!(votes.best(), Some(7));
    }

    #[test]
    fn test_interpolate() {
        let a = Point::new(10.0, 0.0);
        let b = Point::new(20.0, 10.0);
        assert_eq!(interpolate(a, b, 5.0), 15.0);
        assert_eq!(interpolate(a, a, 5.0), 10.0);
    }
}
