//! Data Matrix location from the solid "L" finder edges
//!
//! The white-rectangle search yields a rough quad around the symbol. The
//! side with the fewest transitions is a solid finder edge; its neighbour
//! with fewer transitions is the other one. The fourth corner is then
//! corrected along the timing edges before sampling.

use crate::detector::{DetectorResult, GridSampler, WhiteRectangleDetector};
use crate::error::{DecodeError, Result};
use crate::models::{BitMatrix, Point};

/// Locates a Data Matrix symbol in a binarized image
pub struct Detector<'a> {
    image: &'a BitMatrix,
}

impl<'a> Detector<'a> {
    /// Detector over `image`
    pub fn new(image: &'a BitMatrix) -> Self {
        Self { image }
    }

    /// Sample the symbol. Points are top-left, bottom-left, bottom-right and
    /// top-right module centers.
    pub fn detect(&self) -> Result<DetectorResult> {
        let mut corners = WhiteRectangleDetector::new(self.image)?.detect()?;
        // [bottom, left, right, top] to [top, left, right, bottom]
        corners.swap(0, 3);

        let mut points = self.detect_solid1(corners);
        points = self.detect_solid2(points);
        points[3] = self.correct_top_right(&points).ok_or(DecodeError::NotFound)?;
        let [top_left, bottom_left, bottom_right, top_right] = self.shift_to_module_center(points);

        let mut dimension_top = self.transitions_between(top_left, top_right) + 1;
        let mut dimension_right = self.transitions_between(bottom_right, top_right) + 1;
        if dimension_top & 1 == 1 {
            dimension_top += 1;
        }
        if dimension_right & 1 == 1 {
            dimension_right += 1;
        }
        if 4 * dimension_top < 6 * dimension_right && 4 * dimension_right < 6 * dimension_top {
            let dimension = dimension_top.max(dimension_right);
            dimension_top = dimension;
            dimension_right = dimension;
        }
        tracing::trace!(dimension_top, dimension_right, "Data Matrix dimensions");

        let (dim_x, dim_y) = (dimension_top as f32, dimension_right as f32);
        let bits = GridSampler::sample_grid(
            self.image,
            dimension_top,
            dimension_right,
            [0.5, 0.5, dim_x - 0.5, 0.5, dim_x - 0.5, dim_y - 0.5, 0.5, dim_y - 0.5],
            [
                top_left.x,
                top_left.y,
                top_right.x,
                top_right.y,
                bottom_right.x,
                bottom_right.y,
                bottom_left.x,
                bottom_left.y,
            ],
        )?;
        Ok(DetectorResult::new(
            bits,
            vec![top_left, bottom_left, bottom_right, top_right],
        ))
    }

    /// Rotate the quad so that the side with the fewest transitions runs
    /// from point 1 to point 2.
    ///
    /// ```text
    /// 0..3
    /// :  :
    /// 1--2
    /// ```
    fn detect_solid1(&self, corners: [Point; 4]) -> [Point; 4] {
        let (a, b, c, d) = (corners[0], corners[1], corners[3], corners[2]);
        let tr_ab = self.transitions_between(a, b);
        let tr_bc = self.transitions_between(b, c);
        let tr_cd = self.transitions_between(c, d);
        let tr_da = self.transitions_between(d, a);

        let mut min = tr_ab;
        let mut points = [d, a, b, c];
        if min > tr_bc {
            min = tr_bc;
            points = [a, b, c, d];
        }
        if min > tr_cd {
            min = tr_cd;
            points = [b, c, d, a];
        }
        if min > tr_da {
            points = [c, d, a, b];
        }
        points
    }

    /// Pick which neighbour of the solid side is the second solid side
    fn detect_solid2(&self, points: [Point; 4]) -> [Point; 4] {
        let [a, b, c, d] = points;
        // Edges are unstable; probe slightly inside the symbol
        let tr = self.transitions_between(a, d);
        let b_shifted = shift_point(b, c, (tr + 1) * 4);
        let c_shifted = shift_point(c, b, (tr + 1) * 4);
        let tr_ba = self.transitions_between(b_shifted, a);
        let tr_cd = self.transitions_between(c_shifted, d);
        if tr_ba < tr_cd { [a, b, c, d] } else { [b, c, d, a] }
    }

    /// Outer corner of the light top-right module
    fn correct_top_right(&self, points: &[Point; 4]) -> Option<Point> {
        let [a, b, c, d] = *points;
        let tr_top = self.transitions_between(a, d);
        let tr_right = self.transitions_between(b, d);
        let a_shifted = shift_point(a, b, (tr_right + 1) * 4);
        let c_shifted = shift_point(c, b, (tr_top + 1) * 4);
        let tr_top = self.transitions_between(a_shifted, d) as f32;
        let tr_right = self.transitions_between(c_shifted, d) as f32;

        let candidate1 = Point::new(
            d.x + (c.x - b.x) / (tr_top + 1.0),
            d.y + (c.y - b.y) / (tr_top + 1.0),
        );
        let candidate2 = Point::new(
            d.x + (a.x - b.x) / (tr_right + 1.0),
            d.y + (a.y - b.y) / (tr_right + 1.0),
        );

        match (self.is_valid(candidate1), self.is_valid(candidate2)) {
            (false, false) => None,
            (false, true) => Some(candidate2),
            (true, false) => Some(candidate1),
            (true, true) => {
                let sum1 = self.transitions_between(a_shifted, candidate1)
                    + self.transitions_between(c_shifted, candidate1);
                let sum2 = self.transitions_between(a_shifted, candidate2)
                    + self.transitions_between(c_shifted, candidate2);
                Some(if sum1 > sum2 { candidate1 } else { candidate2 })
            }
        }
    }

    /// Move the corner points from the symbol edge to the centers of the
    /// corner modules
    fn shift_to_module_center(&self, points: [Point; 4]) -> [Point; 4] {
        let [a, b, c, d] = points;

        let dim_h = self.transitions_between(a, d) + 1;
        let dim_v = self.transitions_between(c, d) + 1;
        let a_shifted = shift_point(a, b, dim_v * 4);
        let c_shifted = shift_point(c, b, dim_h * 4);
        let mut dim_h = self.transitions_between(a_shifted, d) + 1;
        let mut dim_v = self.transitions_between(c_shifted, d) + 1;
        if dim_h & 1 == 1 {
            dim_h += 1;
        }
        if dim_v & 1 == 1 {
            dim_v += 1;
        }

        // Corner points sit just inside the symbol; push them onto the edge
        let center_x = (a.x + b.x + c.x + d.x) / 4.0;
        let center_y = (a.y + b.y + c.y + d.y) / 4.0;
        let a = move_away(a, center_x, center_y);
        let b = move_away(b, center_x, center_y);
        let c = move_away(c, center_x, center_y);
        let d = move_away(d, center_x, center_y);

        [
            shift_point(shift_point(a, b, dim_v * 4), d, dim_h * 4),
            shift_point(shift_point(b, a, dim_v * 4), c, dim_h * 4),
            shift_point(shift_point(c, d, dim_v * 4), b, dim_h * 4),
            shift_point(shift_point(d, c, dim_v * 4), a, dim_h * 4),
        ]
    }

    fn is_valid(&self, p: Point) -> bool {
        p.x >= 0.0
            && p.x <= self.image.width() as f32 - 1.0
            && p.y > 0.0
            && p.y <= self.image.height() as f32 - 1.0
    }

    /// Black/white transitions along a Bresenham line
    fn transitions_between(&self, from: Point, to: Point) -> usize {
        let mut from_x = from.x.floor() as i32;
        let mut from_y = from.y.floor() as i32;
        let mut to_x = to.x.floor() as i32;
        let mut to_y = (self.image.height() as i32 - 1).min(to.y.floor() as i32);

        let steep = (to_y - from_y).abs() > (to_x - from_x).abs();
        if steep {
            std::mem::swap(&mut from_x, &mut from_y);
            std::mem::swap(&mut to_x, &mut to_y);
        }

        let dx = (to_x - from_x).abs();
        let dy = (to_y - from_y).abs();
        let mut error = -dx / 2;
        let y_step = if from_y < to_y { 1 } else { -1 };
        let x_step = if from_x < to_x { 1 } else { -1 };
        let pixel = |x: i32, y: i32| {
            if steep {
                self.image.get_i(y, x)
            } else {
                self.image.get_i(x, y)
            }
        };

        let mut transitions = 0;
        let mut in_black = pixel(from_x, from_y);
        let (mut x, mut y) = (from_x, from_y);
        while x != to_x {
            let is_black = pixel(x, y);
            if is_black != in_black {
                transitions += 1;
                in_black = is_black;
            }
            error += dy;
            if error > 0 {
                if y == to_y {
                    break;
                }
                y += y_step;
                error -= dx;
            }
            x += x_step;
        }
        transitions
    }
}

fn shift_point(p: Point, to: Point, div: usize) -> Point {
    let div = div as f32 + 1.0;
    Point::new(p.x + (to.x - p.x) / div, p.y + (to.y - p.y) / div)
}

fn move_away(p: Point, from_x: f32, from_y: f32) -> Point {
    let x = if p.x < from_x { p.x - 1.0 } else { p.x + 1.0 };
    let y = if p.y < from_y { p.y - 1.0 } else { p.y + 1.0 };
    Point::new(x, y)
}
