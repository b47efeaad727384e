//! Module placement for the QR encoder: function patterns, format and
//! version information, then the data bits in zig-zag order.

use crate::error::EncodeError;
use crate::models::{BitArray, BitMatrix};
use crate::qrcode::decoder::{ErrorCorrectionLevel, FormatInformation, MaskPattern, Version};

/// Module grid under construction; cells are dark, light or not yet placed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteMatrix {
    width: usize,
    height: usize,
    cells: Vec<Option<bool>>,
}

impl ByteMatrix {
    /// Empty grid
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![None; width * height],
        }
    }

    /// Width in modules
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in modules
    pub fn height(&self) -> usize {
        self.height
    }

    /// Cell at `(x, y)`
    pub fn get(&self, x: usize, y: usize) -> Option<bool> {
        self.cells[y * self.width + x]
    }

    /// True when the cell at `(x, y)` is dark
    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        self.get(x, y) == Some(true)
    }

    /// Place a module
    pub fn set(&mut self, x: usize, y: usize, value: bool) {
        self.cells[y * self.width + x] = Some(value);
    }

    fn is_empty(&self, x: usize, y: usize) -> bool {
        self.get(x, y).is_none()
    }

    /// Reset every cell to unplaced
    pub fn clear(&mut self) {
        self.cells.fill(None);
    }

    /// Dark modules as a [`BitMatrix`]
    pub fn to_bit_matrix(&self) -> BitMatrix {
        let mut bits = BitMatrix::new(self.width, self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                if self.is_dark(x, y) {
                    bits.set(x, y);
                }
            }
        }
        bits
    }
}

const POSITION_DETECTION_PATTERN: [[u8; 7]; 7] = [
    [1, 1, 1, 1, 1, 1, 1],
    [1, 0, 0, 0, 0, 0, 1],
    [1, 0, 1, 1, 1, 0, 1],
    [1, 0, 1, 1, 1, 0, 1],
    [1, 0, 1, 1, 1, 0, 1],
    [1, 0, 0, 0, 0, 0, 1],
    [1, 1, 1, 1, 1, 1, 1],
];

const POSITION_ADJUSTMENT_PATTERN: [[u8; 5]; 5] = [
    [1, 1, 1, 1, 1],
    [1, 0, 0, 0, 1],
    [1, 0, 1, 0, 1],
    [1, 0, 0, 0, 1],
    [1, 1, 1, 1, 1],
];

/// Format information positions around the top-left finder, least significant bit first
const TYPE_INFO_COORDINATES: [(usize, usize); 15] = [
    (8, 0),
    (8, 1),
    (8, 2),
    (8, 3),
    (8, 4),
    (8, 5),
    (8, 7),
    (8, 8),
    (7, 8),
    (5, 8),
    (4, 8),
    (3, 8),
    (2, 8),
    (1, 8),
    (0, 8),
];

/// Lay out every module of the symbol
pub fn build_matrix(
    data_bits: &BitArray,
    ec_level: ErrorCorrectionLevel,
    version: Version,
    mask: MaskPattern,
    matrix: &mut ByteMatrix,
) -> Result<(), EncodeError> {
    matrix.clear();
    embed_basic_patterns(version, matrix)?;
    embed_type_info(ec_level, mask, matrix);
    maybe_embed_version_info(version, matrix);
    embed_data_bits(data_bits, mask, matrix)
}

/// Finder patterns, separators, the dark module, alignment and timing patterns
pub fn embed_basic_patterns(version: Version, matrix: &mut ByteMatrix) -> Result<(), EncodeError> {
    embed_position_detection_patterns_and_separators(matrix)?;
    embed_dark_dot_at_left_bottom_corner(matrix)?;
    maybe_embed_position_adjustment_patterns(version, matrix);
    embed_timing_patterns(matrix);
    Ok(())
}

fn embed_type_info(ec_level: ErrorCorrectionLevel, mask: MaskPattern, matrix: &mut ByteMatrix) {
    let type_info = FormatInformation::encode(ec_level, mask as u8);
    let (width, height) = (matrix.width(), matrix.height());
    for (i, &(x1, y1)) in TYPE_INFO_COORDINATES.iter().enumerate() {
        let bit = (type_info >> i) & 1 == 1;
        matrix.set(x1, y1, bit);
        if i < 8 {
            matrix.set(width - i - 1, 8, bit);
        } else {
            matrix.set(8, height - 7 + (i - 8), bit);
        }
    }
}

fn maybe_embed_version_info(version: Version, matrix: &mut ByteMatrix) {
    let Some(info) = version.version_info_bits() else {
        return;
    };
    let height = matrix.height();
    let mut bit_index: u32 = 17;
    for i in 0..6 {
        for j in 0..3 {
            let bit = (info >> (17 - bit_index)) & 1 == 1;
            bit_index = bit_index.saturating_sub(1);
            matrix.set(i, height - 11 + j, bit);
            matrix.set(height - 11 + j, i, bit);
        }
    }
}

/// Place data bits in the two-column zig-zag, applying the mask
pub fn embed_data_bits(data_bits: &BitArray, mask: MaskPattern, matrix: &mut ByteMatrix) -> Result<(), EncodeError> {
    let mut bit_index = 0;
    let mut upward = true;
    let height = matrix.height();
    let mut x = matrix.width() as isize - 1;
    while x > 0 {
        if x == 6 {
            x -= 1;
        }
        for count in 0..height {
            let y = if upward { height - 1 - count } else { count };
            for i in 0..2 {
                let xx = x as usize - i;
                if !matrix.is_empty(xx, y) {
                    continue;
                }
                let mut bit = if bit_index < data_bits.size() {
                    bit_index += 1;
                    data_bits.get(bit_index - 1)
                } else {
                    false
                };
                if mask.is_masked(y, xx) {
                    bit = !bit;
                }
                matrix.set(xx, y, bit);
            }
        }
        upward = !upward;
        x -= 2;
    }
    if bit_index != data_bits.size() {
        return Err(EncodeError::InvalidArgument(format!(
            "not all bits consumed: {}/{}",
            bit_index,
            data_bits.size()
        )));
    }
    Ok(())
}

fn embed_timing_patterns(matrix: &mut ByteMatrix) {
    for i in 8..matrix.width() - 8 {
        let bit = i % 2 == 0;
        if matrix.is_empty(i, 6) {
            matrix.set(i, 6, bit);
        }
        if matrix.is_empty(6, i) {
            matrix.set(6, i, bit);
        }
    }
}

fn embed_dark_dot_at_left_bottom_corner(matrix: &mut ByteMatrix) -> Result<(), EncodeError> {
    let y = matrix.height() - 8;
    if matrix.get(8, y) == Some(false) {
        return Err(EncodeError::InvalidArgument("dark module already placed".into()));
    }
    matrix.set(8, y, true);
    Ok(())
}

fn embed_separator(matrix: &mut ByteMatrix, x_start: usize, y_start: usize, horizontal: bool) -> Result<(), EncodeError> {
    let length = if horizontal { 8 } else { 7 };
    for k in 0..length {
        let (x, y) = if horizontal { (x_start + k, y_start) } else { (x_start, y_start + k) };
        if !matrix.is_empty(x, y) {
            return Err(EncodeError::InvalidArgument("separator overlaps a placed module".into()));
        }
        matrix.set(x, y, false);
    }
    Ok(())
}

fn embed_position_detection_pattern(x_start: usize, y_start: usize, matrix: &mut ByteMatrix) {
    for (y, row) in POSITION_DETECTION_PATTERN.iter().enumerate() {
        for (x, &v) in row.iter().enumerate() {
            matrix.set(x_start + x, y_start + y, v == 1);
        }
    }
}

fn embed_position_detection_patterns_and_separators(matrix: &mut ByteMatrix) -> Result<(), EncodeError> {
    let size = matrix.width();
    embed_position_detection_pattern(0, 0, matrix);
    embed_position_detection_pattern(size - 7, 0, matrix);
    embed_position_detection_pattern(0, size - 7, matrix);

    embed_separator(matrix, 0, 7, true)?;
    embed_separator(matrix, size - 8, 7, true)?;
    embed_separator(matrix, 0, size - 8, true)?;

    embed_separator(matrix, 7, 0, false)?;
    embed_separator(matrix, size - 8, 0, false)?;
    embed_separator(matrix, 7, size - 7, false)
}

fn maybe_embed_position_adjustment_patterns(version: Version, matrix: &mut ByteMatrix) {
    let centers = version.alignment_pattern_centers();
    for &y in &centers {
        for &x in &centers {
            // Positions overlapping a finder pattern are already filled
            if matrix.is_empty(x, y) {
                for (dy, row) in POSITION_ADJUSTMENT_PATTERN.iter().enumerate() {
                    for (dx, &v) in row.iter().enumerate() {
                        matrix.set(x - 2 + dx, y - 2 + dy, v == 1);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_patterns_match_function_pattern() {
        for number in [1, 2, 7, 14] {
            let version = Version::for_number(number).unwrap();
            let dimension = version.dimension();
            let mut matrix = ByteMatrix::new(dimension, dimension);
            embed_basic_patterns(version, &mut matrix).unwrap();
            embed_type_info(ErrorCorrectionLevel::M, MaskPattern::Pattern0, &mut matrix);
            maybe_embed_version_info(version, &mut matrix);

            // Every placed module is a function module and vice versa
            let function_pattern = version.build_function_pattern();
            for y in 0..dimension {
                for x in 0..dimension {
                    assert_eq!(
                        matrix.get(x, y).is_some(),
                        function_pattern.get(x, y),
                        "version {number} at ({x}, {y})"
                    );
                }
            }
        }
    }

    #[test]
    fn test_timing_and_dark_module() {
        let version = Version::for_number(1).unwrap();
        let mut matrix = ByteMatrix::new(21, 21);
        embed_basic_patterns(version, &mut matrix).unwrap();
        assert!(matrix.is_dark(8, 13));
        assert!(matrix.is_dark(8, 6));
        assert!(!matrix.is_dark(9, 6));
        assert!(matrix.is_dark(6, 10));
    }

    #[test]
    fn test_too_many_bits() {
        let version = Version::for_number(1).unwrap();
        let mut bits = BitArray::new();
        for _ in 0..27 {
            bits.append_bits(0xAA, 8);
        }
        let mut matrix = ByteMatrix::new(21, 21);
        let result = build_matrix(&bits, ErrorCorrectionLevel::L, version, MaskPattern::Pattern0, &mut matrix);
        assert!(result.is_err());
    }
}
