//! Mask penalty rules used to choose among the eight data masks.

use super::matrix_util::ByteMatrix;

const N1: u32 = 3;
const N2: u32 = 3;
const N3: u32 = 40;
const N4: u32 = 10;

/// Sum of the four penalty rules; lower is better
pub fn mask_penalty(matrix: &ByteMatrix) -> u32 {
    penalty_rule_1(matrix) + penalty_rule_2(matrix) + penalty_rule_3(matrix) + penalty_rule_4(matrix)
}

/// Runs of five or more same-colored modules in a row or column
pub fn penalty_rule_1(matrix: &ByteMatrix) -> u32 {
    penalty_rule_1_internal(matrix, true) + penalty_rule_1_internal(matrix, false)
}

fn penalty_rule_1_internal(matrix: &ByteMatrix, horizontal: bool) -> u32 {
    let (outer, inner) = if horizontal {
        (matrix.height(), matrix.width())
    } else {
        (matrix.width(), matrix.height())
    };
    let mut penalty = 0;
    for i in 0..outer {
        let mut run = 0;
        let mut previous = None;
        for j in 0..inner {
            let bit = if horizontal { matrix.is_dark(j, i) } else { matrix.is_dark(i, j) };
            if Some(bit) == previous {
                run += 1;
            } else {
                if run >= 5 {
                    penalty += N1 + (run - 5);
                }
                run = 1;
                previous = Some(bit);
            }
        }
        if run >= 5 {
            penalty += N1 + (run - 5);
        }
    }
    penalty
}

/// Every 2×2 block of one color
pub fn penalty_rule_2(matrix: &ByteMatrix) -> u32 {
    let mut penalty = 0;
    for y in 0..matrix.height().saturating_sub(1) {
        for x in 0..matrix.width().saturating_sub(1) {
            let value = matrix.is_dark(x, y);
            if value == matrix.is_dark(x + 1, y)
                && value == matrix.is_dark(x, y + 1)
                && value == matrix.is_dark(x + 1, y + 1)
            {
                penalty += 1;
            }
        }
    }
    N2 * penalty
}

/// 1:1:3:1:1 finder-like runs with four light modules on either side
pub fn penalty_rule_3(matrix: &ByteMatrix) -> u32 {
    const PATTERN: [bool; 7] = [true, false, true, true, true, false, true];
    let (width, height) = (matrix.width(), matrix.height());
    let mut hits = 0;
    for y in 0..height {
        for x in 0..width {
            if x + 7 <= width
                && (0..7).all(|k| matrix.is_dark(x + k, y) == PATTERN[k])
                && (is_white_horizontal(matrix, y, x as isize - 4, x as isize)
                    || is_white_horizontal(matrix, y, x as isize + 7, x as isize + 11))
            {
                hits += 1;
            }
            if y + 7 <= height
                && (0..7).all(|k| matrix.is_dark(x, y + k) == PATTERN[k])
                && (is_white_vertical(matrix, x, y as isize - 4, y as isize)
                    || is_white_vertical(matrix, x, y as isize + 7, y as isize + 11))
            {
                hits += 1;
            }
        }
    }
    hits * N3
}

fn is_white_horizontal(matrix: &ByteMatrix, y: usize, from: isize, to: isize) -> bool {
    let from = from.max(0) as usize;
    let to = (to.max(0) as usize).min(matrix.width());
    (from..to).all(|x| !matrix.is_dark(x, y))
}

fn is_white_vertical(matrix: &ByteMatrix, x: usize, from: isize, to: isize) -> bool {
    let from = from.max(0) as usize;
    let to = (to.max(0) as usize).min(matrix.height());
    (from..to).all(|y| !matrix.is_dark(x, y))
}

/// Deviation of the dark-module ratio from one half, in 5% steps
pub fn penalty_rule_4(matrix: &ByteMatrix) -> u32 {
    let total = matrix.width() * matrix.height();
    if total == 0 {
        return 0;
    }
    let mut dark: usize = 0;
    for y in 0..matrix.height() {
        for x in 0..matrix.width() {
            if matrix.is_dark(x, y) {
                dark += 1;
            }
        }
    }
    let five_percent_variances = (dark * 2).abs_diff(total) * 10 / total;
    five_percent_variances as u32 * N4
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix_from(rows: &[&[u8]]) -> ByteMatrix {
        let mut matrix = ByteMatrix::new(rows[0].len(), rows.len());
        for (y, row) in rows.iter().enumerate() {
            for (x, &v) in row.iter().enumerate() {
                matrix.set(x, y, v == 1);
            }
        }
        matrix
    }

    #[test]
    fn test_rule_1() {
        let matrix = matrix_from(&[&[0, 0, 0, 0, 0, 1]]);
        assert_eq!(penalty_rule_1(&matrix), 3);
        let matrix = matrix_from(&[&[0, 0, 0, 0, 0, 0]]);
        assert_eq!(penalty_rule_1(&matrix), 4);
    }

    #[test]
    fn test_rule_2() {
        let matrix = matrix_from(&[&[0, 0], &[0, 0]]);
        assert_eq!(penalty_rule_2(&matrix), 3);
        let matrix = matrix_from(&[&[0, 0, 0], &[0, 0, 0], &[0, 0, 0]]);
        assert_eq!(penalty_rule_2(&matrix), 12);
        let matrix = matrix_from(&[&[0, 1], &[0, 0]]);
        assert_eq!(penalty_rule_2(&matrix), 0);
    }

    #[test]
    fn test_rule_3() {
        let matrix = matrix_from(&[&[0, 0, 0, 0, 1, 0, 1, 1, 1, 0, 1]]);
        assert_eq!(penalty_rule_3(&matrix), 40);
        let matrix = matrix_from(&[&[1, 0, 1, 1, 1, 0, 1, 0, 0, 0, 0]]);
        assert_eq!(penalty_rule_3(&matrix), 40);
        let matrix = matrix_from(&[&[1, 0, 1, 1, 1, 0, 1]]);
        assert_eq!(penalty_rule_3(&matrix), 40);
    }

    #[test]
    fn test_rule_4() {
        let matrix = matrix_from(&[&[0, 1]]);
        assert_eq!(penalty_rule_4(&matrix), 0);
        let matrix = matrix_from(&[&[1, 1, 1, 1, 1, 1, 0, 0, 0, 0]]);
        assert_eq!(penalty_rule_4(&matrix), 20);
        let matrix = matrix_from(&[&[0, 0, 0, 0, 0, 0]]);
        assert_eq!(penalty_rule_4(&matrix), 100);
    }
}
