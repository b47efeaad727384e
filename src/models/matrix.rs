use std::fmt;

use super::BitArray;
use crate::error::{DecodeError, Result};

/// Compact 2D bit grid; `true` is a black module or pixel.
///
/// Each row is packed into 32-bit words so rows can be copied and compared
/// word by word.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BitMatrix {
    width: usize,
    height: usize,
    row_size: usize,
    bits: Vec<u32>,
}

impl BitMatrix {
    /// Create a new bit matrix with given dimensions
    pub fn new(width: usize, height: usize) -> Self {
        let row_size = width.div_ceil(32);
        Self {
            width,
            height,
            row_size,
            bits: vec![0; row_size * height],
        }
    }

    /// Create a square bit matrix
    pub fn square(dimension: usize) -> Self {
        Self::new(dimension, dimension)
    }

    /// Build a matrix from rows of booleans; rows shorter than the first are padded white
    pub fn from_rows(rows: &[Vec<bool>]) -> Self {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        let mut matrix = Self::new(width, height);
        for (y, row) in rows.iter().enumerate() {
            for (x, &on) in row.iter().enumerate().take(width) {
                if on {
                    matrix.set(x, y);
                }
            }
        }
        matrix
    }

    /// Parse the textual form produced by [`BitMatrix::to_string_with`]
    pub fn parse(text: &str, set: &str, unset: &str) -> Result<Self> {
        let mut rows: Vec<Vec<bool>> = Vec::new();
        for line in text.lines() {
            let mut row = Vec::new();
            let mut rest = line;
            while !rest.is_empty() {
                if let Some(tail) = rest.strip_prefix(set) {
                    row.push(true);
                    rest = tail;
                } else if let Some(tail) = rest.strip_prefix(unset) {
                    row.push(false);
                    rest = tail;
                } else {
                    return Err(DecodeError::Format("unexpected character in matrix text"));
                }
            }
            if row.is_empty() {
                continue;
            }
            if let Some(first) = rows.first() {
                if first.len() != row.len() {
                    return Err(DecodeError::Format("row lengths do not match"));
                }
            }
            rows.push(row);
        }
        Ok(Self::from_rows(&rows))
    }

    /// Get matrix width
    pub fn width(&self) -> usize {
        self.width
    }

    /// Get matrix height
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of 32-bit words per row
    pub fn row_size(&self) -> usize {
        self.row_size
    }

    #[inline]
    fn offset(&self, x: usize, y: usize) -> usize {
        y * self.row_size + x / 32
    }

    /// Get bit at (x, y); coordinates outside the matrix read as white
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        (self.bits[self.offset(x, y)] >> (x & 0x1f)) & 1 != 0
    }

    /// Signed variant of [`BitMatrix::get`] for detectors walking off the edge
    #[inline]
    pub fn get_i(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && self.get(x as usize, y as usize)
    }

    /// Set bit at (x, y)
    #[inline]
    pub fn set(&mut self, x: usize, y: usize) {
        if x >= self.width || y >= self.height {
            return;
        }
        let offset = self.offset(x, y);
        self.bits[offset] |= 1 << (x & 0x1f);
    }

    /// Clear bit at (x, y)
    #[inline]
    pub fn unset(&mut self, x: usize, y: usize) {
        if x >= self.width || y >= self.height {
            return;
        }
        let offset = self.offset(x, y);
        self.bits[offset] &= !(1 << (x & 0x1f));
    }

    /// Set or clear bit at (x, y)
    pub fn set_value(&mut self, x: usize, y: usize, value: bool) {
        if value {
            self.set(x, y);
        } else {
            self.unset(x, y);
        }
    }

    /// Toggle bit at (x, y)
    #[inline]
    pub fn flip(&mut self, x: usize, y: usize) {
        if x >= self.width || y >= self.height {
            return;
        }
        let offset = self.offset(x, y);
        self.bits[offset] ^= 1 << (x & 0x1f);
    }

    /// Toggle every bit that is set in `mask`
    pub fn xor(&mut self, mask: &BitMatrix) -> Result<()> {
        if self.width != mask.width || self.height != mask.height {
            return Err(DecodeError::Format("mask dimensions do not match"));
        }
        for (word, &m) in self.bits.iter_mut().zip(mask.bits.iter()) {
            *word ^= m;
        }
        Ok(())
    }

    /// Clear all bits to 0
    pub fn clear(&mut self) {
        self.bits.fill(0);
    }

    /// Set every bit of a rectangular region
    pub fn set_region(&mut self, left: usize, top: usize, width: usize, height: usize) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(DecodeError::Format("region must be non-empty"));
        }
        let right = left + width;
        let bottom = top + height;
        if bottom > self.height || right > self.width {
            return Err(DecodeError::Format("region does not fit inside matrix"));
        }
        for y in top..bottom {
            for x in left..right {
                let offset = self.offset(x, y);
                self.bits[offset] |= 1 << (x & 0x1f);
            }
        }
        Ok(())
    }

    /// Copy one row into a [`BitArray`]
    pub fn row(&self, y: usize) -> BitArray {
        let mut row = BitArray::with_size(self.width);
        if y < self.height {
            let offset = y * self.row_size;
            for i in 0..self.row_size {
                row.set_bulk(i * 32, self.bits[offset + i]);
            }
        }
        row
    }

    /// Overwrite one row from a [`BitArray`] of matching width
    pub fn set_row(&mut self, y: usize, row: &BitArray) {
        if y >= self.height {
            return;
        }
        let offset = y * self.row_size;
        let words = row.words();
        for i in 0..self.row_size {
            self.bits[offset + i] = words.get(i).copied().unwrap_or(0);
        }
    }

    /// Rotate by a multiple of 90 degrees counter-clockwise
    pub fn rotate(&mut self, degrees: u32) -> Result<()> {
        match degrees % 360 {
            0 => Ok(()),
            90 => {
                self.rotate90();
                Ok(())
            }
            180 => {
                self.rotate180();
                Ok(())
            }
            270 => {
                self.rotate90();
                self.rotate180();
                Ok(())
            }
            _ => Err(DecodeError::Format("rotation must be a multiple of 90")),
        }
    }

    /// Rotate in place by 180 degrees
    pub fn rotate180(&mut self) {
        let mut out = BitMatrix::new(self.width, self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                if self.get(x, y) {
                    out.set(self.width - 1 - x, self.height - 1 - y);
                }
            }
        }
        *self = out;
    }

    /// Rotate in place by 90 degrees counter-clockwise
    pub fn rotate90(&mut self) {
        let mut out = BitMatrix::new(self.height, self.width);
        for y in 0..self.height {
            for x in 0..self.width {
                if self.get(x, y) {
                    out.set(y, self.width - 1 - x);
                }
            }
        }
        *self = out;
    }

    /// Swap rows and columns
    pub fn transpose(&self) -> BitMatrix {
        let mut out = BitMatrix::new(self.height, self.width);
        for y in 0..self.height {
            for x in 0..self.width {
                if self.get(x, y) {
                    out.set(y, x);
                }
            }
        }
        out
    }

    /// Bounding box of all set bits as `[left, top, width, height]`
    pub fn enclosing_rectangle(&self) -> Option<[usize; 4]> {
        let mut left = self.width;
        let mut top = self.height;
        let mut right = 0usize;
        let mut bottom = 0usize;
        let mut found = false;

        for y in 0..self.height {
            for x32 in 0..self.row_size {
                let word = self.bits[y * self.row_size + x32];
                if word == 0 {
                    continue;
                }
                found = true;
                top = top.min(y);
                bottom = bottom.max(y);
                let first = x32 * 32 + word.trailing_zeros() as usize;
                let last = x32 * 32 + 31 - word.leading_zeros() as usize;
                left = left.min(first);
                right = right.max(last);
            }
        }

        if !found {
            return None;
        }
        Some([left, top, right - left + 1, bottom - top + 1])
    }

    /// First set bit in row-major order
    pub fn top_left_on_bit(&self) -> Option<(usize, usize)> {
        let index = self.bits.iter().position(|&w| w != 0)?;
        let y = index / self.row_size;
        let x = (index % self.row_size) * 32 + self.bits[index].trailing_zeros() as usize;
        Some((x, y))
    }

    /// Last set bit in row-major order
    pub fn bottom_right_on_bit(&self) -> Option<(usize, usize)> {
        let index = self.bits.iter().rposition(|&w| w != 0)?;
        let y = index / self.row_size;
        let x = (index % self.row_size) * 32 + 31 - self.bits[index].leading_zeros() as usize;
        Some((x, y))
    }

    /// Render with the given strings for set and unset bits, one line per row
    pub fn to_string_with(&self, set: &str, unset: &str) -> String {
        let mut out = String::with_capacity(self.height * (self.width * set.len().max(unset.len()) + 1));
        for y in 0..self.height {
            for x in 0..self.width {
                out.push_str(if self.get(x, y) { set } else { unset });
            }
            out.push('\n');
        }
        out
    }
}

impl Default for BitMatrix {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl fmt::Display for BitMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_with("X ", "  "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_matrix() {
        let mut matrix = BitMatrix::new(40, 8);
        assert_eq!(matrix.width(), 40);
        assert_eq!(matrix.height(), 8);
        assert_eq!(matrix.row_size(), 2);

        matrix.set(33, 4);
        assert!(matrix.get(33, 4));
        assert!(!matrix.get(33, 3));

        matrix.flip(33, 4);
        assert!(!matrix.get(33, 4));

        matrix.set(1, 1);
        matrix.clear();
        assert!(!matrix.get(1, 1));
    }

    #[test]
    fn test_out_of_bounds() {
        let mut matrix = BitMatrix::new(8, 8);
        matrix.set(10, 10);
        assert!(!matrix.get(10, 10));
        assert!(!matrix.get_i(-1, 3));
    }

    #[test]
    fn test_set_region_and_enclosing_rectangle() {
        let mut matrix = BitMatrix::new(50, 20);
        matrix.set_region(10, 3, 30, 5).unwrap();
        assert_eq!(matrix.enclosing_rectangle(), Some([10, 3, 30, 5]));
        assert_eq!(matrix.top_left_on_bit(), Some((10, 3)));
        assert_eq!(matrix.bottom_right_on_bit(), Some((39, 7)));
        assert!(matrix.set_region(45, 0, 10, 1).is_err());
    }

    #[test]
    fn test_empty_enclosing_rectangle() {
        let matrix = BitMatrix::new(5, 5);
        assert_eq!(matrix.enclosing_rectangle(), None);
        assert_eq!(matrix.top_left_on_bit(), None);
    }

    #[test]
    fn test_rotate180() {
        let mut matrix = BitMatrix::new(3, 2);
        matrix.set(0, 0);
        matrix.rotate180();
        assert!(matrix.get(2, 1));
        assert!(!matrix.get(0, 0));
    }

    #[test]
    fn test_rotate90_counter_clockwise() {
        let mut matrix = BitMatrix::new(3, 2);
        matrix.set(2, 0);
        matrix.rotate90();
        assert_eq!(matrix.width(), 2);
        assert_eq!(matrix.height(), 3);
        assert!(matrix.get(0, 0));
    }

    #[test]
    fn test_xor_and_rows() {
        let mut a = BitMatrix::new(35, 2);
        let mut mask = BitMatrix::new(35, 2);
        a.set(34, 1);
        mask.set(34, 1);
        mask.set(0, 0);
        a.xor(&mask).unwrap();
        assert!(!a.get(34, 1));
        assert!(a.get(0, 0));

        let row = a.row(0);
        let mut b = BitMatrix::new(35, 2);
        b.set_row(1, &row);
        assert!(b.get(0, 1));
    }

    #[test]
    fn test_parse_round_trip() {
        let mut matrix = BitMatrix::new(4, 3);
        matrix.set(0, 0);
        matrix.set(3, 2);
        let text = matrix.to_string();
        let parsed = BitMatrix::parse(&text, "X ", "  ").unwrap();
        assert_eq!(parsed, matrix);
    }
}
