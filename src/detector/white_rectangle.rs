use crate::error::{DecodeError, Result};
use crate::models::{BitMatrix, Point};
use crate::utils::geometry::{distance_i, round};

const INIT_SIZE: i32 = 10;
const CORR: f32 = 1.0;

/// Finds the corners of a black region by growing a white-bordered box
/// outward from a seed point.
///
/// [`WhiteRectangleDetector::detect`] returns exactly four points in the
/// order bottom, left, right, top.
pub struct WhiteRectangleDetector<'a> {
    image: &'a BitMatrix,
    width: i32,
    height: i32,
    left_init: i32,
    right_init: i32,
    down_init: i32,
    up_init: i32,
}

impl<'a> WhiteRectangleDetector<'a> {
    /// Seed at the image center with the default box size
    pub fn new(image: &'a BitMatrix) -> Result<Self> {
        let (width, height) = (image.width() as i32, image.height() as i32);
        Self::with_seed(image, INIT_SIZE, width / 2, height / 2)
    }

    /// Seed at `(x, y)` with a box of `init_size` pixels
    pub fn with_seed(image: &'a BitMatrix, init_size: i32, x: i32, y: i32) -> Result<Self> {
        let (width, height) = (image.width() as i32, image.height() as i32);
        let half = init_size / 2;
        let detector = Self {
            image,
            width,
            height,
            left_init: x - half,
            right_init: x + half,
            up_init: y - half,
            down_init: y + half,
        };
        if detector.up_init < 0
            || detector.left_init < 0
            || detector.down_init >= height
            || detector.right_init >= width
        {
            return Err(DecodeError::NotFound);
        }
        Ok(detector)
    }

    /// Locate the four corners as `[bottom, left, right, top]`
    pub fn detect(&self) -> Result<[Point; 4]> {
        let mut left = self.left_init;
        let mut right = self.right_init;
        let mut up = self.up_init;
        let mut down = self.down_init;
        let mut size_exceeded = false;
        let mut black_on_border = true;

        let mut seen_right = false;
        let mut seen_bottom = false;
        let mut seen_left = false;
        let mut seen_top = false;

        while black_on_border {
            black_on_border = false;

            let mut not_white = true;
            while (not_white || !seen_right) && right < self.width {
                not_white = self.contains_black_point(up, down, right, false);
                if not_white {
                    right += 1;
                    black_on_border = true;
                    seen_right = true;
                } else if !seen_right {
                    right += 1;
                }
            }
            if right >= self.width {
                size_exceeded = true;
                break;
            }

            let mut not_white = true;
            while (not_white || !seen_bottom) && down < self.height {
                not_white = self.contains_black_point(left, right, down, true);
                if not_white {
                    down += 1;
                    black_on_border = true;
                    seen_bottom = true;
                } else if !seen_bottom {
                    down += 1;
                }
            }
            if down >= self.height {
                size_exceeded = true;
                break;
            }

            let mut not_white = true;
            while (not_white || !seen_left) && left >= 0 {
                not_white = self.contains_black_point(up, down, left, false);
                if not_white {
                    left -= 1;
                    black_on_border = true;
                    seen_left = true;
                } else if !seen_left {
                    left -= 1;
                }
            }
            if left < 0 {
                size_exceeded = true;
                break;
            }

            let mut not_white = true;
            while (not_white || !seen_top) && up >= 0 {
                not_white = self.contains_black_point(left, right, up, true);
                if not_white {
                    up -= 1;
                    black_on_border = true;
                    seen_top = true;
                } else if !seen_top {
                    up -= 1;
                }
            }
            if up < 0 {
                size_exceeded = true;
                break;
            }
        }

        if size_exceeded {
            return Err(DecodeError::NotFound);
        }

        let max_size = right - left;
        let z = (1..max_size)
            .find_map(|i| self.black_point_on_segment(left, down - i, left + i, down))
            .ok_or(DecodeError::NotFound)?;
        let t = (1..max_size)
            .find_map(|i| self.black_point_on_segment(left, up + i, left + i, up))
            .ok_or(DecodeError::NotFound)?;
        let x = (1..max_size)
            .find_map(|i| self.black_point_on_segment(right, up + i, right - i, up))
            .ok_or(DecodeError::NotFound)?;
        let y = (1..max_size)
            .find_map(|i| self.black_point_on_segment(right, down - i, right - i, down))
            .ok_or(DecodeError::NotFound)?;

        Ok(self.center_edges(y, z, x, t))
    }

    fn black_point_on_segment(&self, a_x: i32, a_y: i32, b_x: i32, b_y: i32) -> Option<Point> {
        let dist = round(distance_i(a_x, a_y, b_x, b_y));
        if dist <= 0 {
            return None;
        }
        let x_step = (b_x - a_x) as f32 / dist as f32;
        let y_step = (b_y - a_y) as f32 / dist as f32;
        for i in 0..dist {
            let x = round(a_x as f32 + i as f32 * x_step);
            let y = round(a_y as f32 + i as f32 * y_step);
            if self.image.get_i(x, y) {
                return Some(Point::new(x as f32, y as f32));
            }
        }
        None
    }

    /// Nudge the extreme points one pixel towards the region interior.
    ///
    /// ```text
    ///       t            t
    ///  z                      x
    ///        x    OR    z
    ///   y                    y
    /// ```
    fn center_edges(&self, y: Point, z: Point, x: Point, t: Point) -> [Point; 4] {
        if y.x < self.width as f32 / 2.0 {
            [
                Point::new(y.x + CORR, y.y - CORR),
                Point::new(z.x + CORR, z.y + CORR),
                Point::new(x.x - CORR, x.y - CORR),
                Point::new(t.x - CORR, t.y + CORR),
            ]
        } else {
            [
                Point::new(y.x - CORR, y.y - CORR),
                Point::new(z.x + CORR, z.y - CORR),
                Point::new(x.x - CORR, x.y + CORR),
                Point::new(t.x + CORR, t.y + CORR),
            ]
        }
    }

    fn contains_black_point(&self, a: i32, b: i32, fixed: i32, horizontal: bool) -> bool {
        if horizontal {
            (a..=b).any(|x| self.image.get_i(x, fixed))
        } else {
            (a..=b).any(|y| self.image.get_i(fixed, y))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_image_not_found() {
        let image = BitMatrix::square(100);
        let detector = WhiteRectangleDetector::new(&image).unwrap();
        assert_eq!(detector.detect(), Err(DecodeError::NotFound));
    }

    #[test]
    fn test_seed_outside_image() {
        let image = BitMatrix::square(8);
        assert!(WhiteRectangleDetector::new(&image).is_err());
    }

    #[test]
    fn test_centered_square() {
        let mut image = BitMatrix::square(120);
        image.set_region(40, 40, 40, 40).unwrap();
        let detector = WhiteRectangleDetector::new(&image).unwrap();
        let [bottom, left, right, top] = detector.detect().unwrap();
        let xs = [bottom.x, left.x, right.x, top.x];
        let ys = [bottom.y, left.y, right.y, top.y];
        let min_x = xs.iter().cloned().fold(f32::MAX, f32::min);
        let max_x = xs.iter().cloned().fold(f32::MIN, f32::max);
        let min_y = ys.iter().cloned().fold(f32::MAX, f32::min);
        let max_y = ys.iter().cloned().fold(f32::MIN, f32::max);
        // Outermost black pixel centers are 39 apart; corners sit one pixel inside
        assert!(((max_x - min_x) - 39.0).abs() <= 2.0);
        assert!(((max_y - min_y) - 39.0).abs() <= 2.0);
        assert!(bottom.y > top.y);
    }

    /// Square of half-side 30 centered at (100, 100), turned by `degrees`
    fn turned_square(degrees: f64) -> BitMatrix {
        let (sin, cos) = degrees.to_radians().sin_cos();
        let mut image = BitMatrix::square(200);
        for y in 0..200 {
            for x in 0..200 {
                let (dx, dy) = (x as f64 - 100.0, y as f64 - 100.0);
                if (dx * cos + dy * sin).abs() <= 30.0 && (dy * cos - dx * sin).abs() <= 30.0 {
                    image.set(x, y);
                }
            }
        }
        image
    }

    /// Mean position of the black pixels minimizing `key`
    fn extreme(image: &BitMatrix, key: impl Fn(usize, usize) -> i64) -> Point {
        let black: Vec<(usize, usize)> = (0..image.height())
            .flat_map(|y| (0..image.width()).map(move |x| (x, y)))
            .filter(|&(x, y)| image.get(x, y))
            .collect();
        let best = black.iter().map(|&(x, y)| key(x, y)).min().unwrap();
        let hits: Vec<_> = black.iter().filter(|&&(x, y)| key(x, y) == best).collect();
        let n = hits.len() as f32;
        Point::new(
            hits.iter().map(|p| p.0 as f32).sum::<f32>() / n,
            hits.iter().map(|p| p.1 as f32).sum::<f32>() / n,
        )
    }

    #[test]
    fn test_corner_order_on_turned_square() {
        for degrees in [20.0, 30.0] {
            let image = turned_square(degrees);
            let corners = WhiteRectangleDetector::new(&image).unwrap().detect().unwrap();
            let expected = [
                extreme(&image, |_, y| -(y as i64)),
                extreme(&image, |x, _| x as i64),
                extreme(&image, |x, _| -(x as i64)),
                extreme(&image, |_, y| y as i64),
            ];
            for (name, (found, want)) in ["bottom", "left", "right", "top"].iter().zip(corners.iter().zip(expected)) {
                assert!(found.distance(&want) <= 3.0, "{name} at {degrees}: {found:?} vs {want:?}");
            }
        }
    }
}
