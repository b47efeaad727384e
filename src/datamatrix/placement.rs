//! ECC 200 module placement ("Utah" shapes plus the four corner cases),
//! shared by the decoder and the encoder.

/// Position of each codeword's eight modules as `(row, column)` in the
/// mapping matrix, most significant bit first
#[derive(Debug, Clone)]
pub struct Placement {
    /// One entry per codeword in placement order
    pub codewords: Vec<[(usize, usize); 8]>,
    /// Bottom-right module is not covered by any codeword
    pub fill_corner: bool,
}

struct Walker {
    rows: isize,
    columns: isize,
    visited: Vec<bool>,
    codewords: Vec<[(usize, usize); 8]>,
}

impl Walker {
    fn module(&mut self, mut row: isize, mut column: isize) -> (usize, usize) {
        if row < 0 {
            row += self.rows;
            column += 4 - ((self.rows + 4) & 0x07);
        }
        if column < 0 {
            column += self.columns;
            row += 4 - ((self.columns + 4) & 0x07);
        }
        if row >= self.rows {
            row -= self.rows;
        }
        self.visited[(row * self.columns + column) as usize] = true;
        (row as usize, column as usize)
    }

    fn place(&mut self, cells: [(isize, isize); 8]) {
        let positions = cells.map(|(row, column)| self.module(row, column));
        self.codewords.push(positions);
    }

    fn is_visited(&self, row: isize, column: isize) -> bool {
        self.visited[(row * self.columns + column) as usize]
    }

    fn utah(&mut self, row: isize, column: isize) {
        self.place([
            (row - 2, column - 2),
            (row - 2, column - 1),
            (row - 1, column - 2),
            (row - 1, column - 1),
            (row - 1, column),
            (row, column - 2),
            (row, column - 1),
            (row, column),
        ]);
    }

    fn corner1(&mut self) {
        let (r, c) = (self.rows, self.columns);
        self.place([(r - 1, 0), (r - 1, 1), (r - 1, 2), (0, c - 2), (0, c - 1), (1, c - 1), (2, c - 1), (3, c - 1)]);
    }

    fn corner2(&mut self) {
        let (r, c) = (self.rows, self.columns);
        self.place([(r - 3, 0), (r - 2, 0), (r - 1, 0), (0, c - 4), (0, c - 3), (0, c - 2), (0, c - 1), (1, c - 1)]);
    }

    fn corner3(&mut self) {
        let (r, c) = (self.rows, self.columns);
        self.place([(r - 3, 0), (r - 2, 0), (r - 1, 0), (0, c - 2), (0, c - 1), (1, c - 1), (2, c - 1), (3, c - 1)]);
    }

    fn corner4(&mut self) {
        let (r, c) = (self.rows, self.columns);
        self.place([(r - 1, 0), (r - 1, c - 1), (0, c - 3), (0, c - 2), (0, c - 1), (1, c - 3), (1, c - 2), (1, c - 1)]);
    }
}

impl Placement {
    /// Walk a `rows` × `columns` mapping matrix
    pub fn new(rows: usize, columns: usize) -> Self {
        let mut walker = Walker {
            rows: rows as isize,
            columns: columns as isize,
            visited: vec![false; rows * columns],
            codewords: Vec::with_capacity(rows * columns / 8),
        };
        let (num_rows, num_columns) = (walker.rows, walker.columns);
        let mut row = 4isize;
        let mut column = 0isize;
        loop {
            if row == num_rows && column == 0 {
                walker.corner1();
            }
            if row == num_rows - 2 && column == 0 && num_columns % 4 != 0 {
                walker.corner2();
            }
            if row == num_rows - 2 && column == 0 && num_columns % 8 == 4 {
                walker.corner3();
            }
            if row == num_rows + 4 && column == 2 && num_columns % 8 == 0 {
                walker.corner4();
            }

            // Up and to the right
            loop {
                if row < num_rows && column >= 0 && !walker.is_visited(row, column) {
                    walker.utah(row, column);
                }
                row -= 2;
                column += 2;
                if !(row >= 0 && column < num_columns) {
                    break;
                }
            }
            row += 1;
            column += 3;

            // Down and to the left
            loop {
                if row >= 0 && column < num_columns && !walker.is_visited(row, column) {
                    walker.utah(row, column);
                }
                row += 2;
                column -= 2;
                if !(row < num_rows && column >= 0) {
                    break;
                }
            }
            row += 3;
            column += 1;

            if !(row < num_rows || column < num_columns) {
                break;
            }
        }

        let fill_corner = rows > 0 && columns > 0 && !walker.is_visited(num_rows - 1, num_columns - 1);
        Placement {
            codewords: walker.codewords,
            fill_corner,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_codeword_of_smallest_symbol() {
        let placement = Placement::new(8, 8);
        assert_eq!(placement.codewords.len(), 8);
        assert_eq!(
            placement.codewords[0],
            // Left-hand modules wrap to the right edge
            [(2, 6), (2, 7), (3, 6), (3, 7), (3, 0), (4, 6), (4, 7), (4, 0)]
        );
        assert!(!placement.fill_corner);
    }

    #[test]
    fn test_every_module_used_once() {
        for (rows, columns) in [(8, 8), (10, 10), (12, 12), (6, 16), (14, 44), (20, 20)] {
            let placement = Placement::new(rows, columns);
            let mut seen = vec![0u8; rows * columns];
            for positions in &placement.codewords {
                for &(r, c) in positions {
                    seen[r * columns + c] += 1;
                }
            }
            assert!(seen.iter().all(|&n| n <= 1), "{rows}x{columns}");
            let unused = seen.iter().filter(|&&n| n == 0).count();
            assert_eq!(unused, if placement.fill_corner { 4 } else { 0 }, "{rows}x{columns}");
        }
    }
}
