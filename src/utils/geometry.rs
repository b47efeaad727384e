/// Geometry utilities for perspective transformations and calculations
use crate::models::Point;

/// Projective transform (homography) between two planes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveTransform {
    a11: f64,
    a12: f64,
    a13: f64,
    a21: f64,
    a22: f64,
    a23: f64,
    a31: f64,
    a32: f64,
    a33: f64,
}

impl PerspectiveTransform {
    /// Transform mapping each `src[i]` to `dst[i]`.
    ///
    /// Solves the 8 linear equations of the direct linear transform with
    /// `a33 = 1`. Returns `None` for degenerate quadrilaterals.
    pub fn from_points(src: &[Point; 4], dst: &[Point; 4]) -> Option<Self> {
        let mut a = [[0.0f64; 8]; 8];
        let mut b = [0.0f64; 8];

        for i in 0..4 {
            let (sx, sy) = (src[i].x as f64, src[i].y as f64);
            let (dx, dy) = (dst[i].x as f64, dst[i].y as f64);

            let row = i * 2;
            a[row] = [sx, sy, 1.0, 0.0, 0.0, 0.0, -dx * sx, -dx * sy];
            b[row] = dx;
            a[row + 1] = [0.0, 0.0, 0.0, sx, sy, 1.0, -dy * sx, -dy * sy];
            b[row + 1] = dy;
        }

        solve_linear_system(&a, &b).map(|s| Self {
            a11: s[0],
            a12: s[1],
            a13: s[2],
            a21: s[3],
            a22: s[4],
            a23: s[5],
            a31: s[6],
            a32: s[7],
            a33: 1.0,
        })
    }

    /// Transform mapping the quadrilateral `(x0,y0)..(x3,y3)` onto `(x0p,y0p)..(x3p,y3p)`
    #[allow(clippy::too_many_arguments)]
    pub fn quadrilateral_to_quadrilateral(
        x0: f32,
        y0: f32,
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        x3: f32,
        y3: f32,
        x0p: f32,
        y0p: f32,
        x1p: f32,
        y1p: f32,
        x2p: f32,
        y2p: f32,
        x3p: f32,
        y3p: f32,
    ) -> Option<Self> {
        Self::from_points(
            &[
                Point::new(x0, y0),
                Point::new(x1, y1),
                Point::new(x2, y2),
                Point::new(x3, y3),
            ],
            &[
                Point::new(x0p, y0p),
                Point::new(x1p, y1p),
                Point::new(x2p, y2p),
                Point::new(x3p, y3p),
            ],
        )
    }

    /// Transform a point using this perspective matrix
    pub fn transform(&self, p: &Point) -> Point {
        let (x, y) = (p.x as f64, p.y as f64);
        let denominator = self.a31 * x + self.a32 * y + self.a33;
        if denominator.abs() < 1e-12 {
            return Point::new(f32::NAN, f32::NAN);
        }
        let x_new = (self.a11 * x + self.a12 * y + self.a13) / denominator;
        let y_new = (self.a21 * x + self.a22 * y + self.a23) / denominator;
        Point::new(x_new as f32, y_new as f32)
    }

    /// Transform interleaved `x, y` pairs in place
    pub fn transform_points(&self, points: &mut [f32]) {
        for pair in points.chunks_exact_mut(2) {
            let p = self.transform(&Point::new(pair[0], pair[1]));
            pair[0] = p.x;
            pair[1] = p.y;
        }
    }
}

/// Solve 8x8 linear system using Gaussian elimination with partial pivoting
#[allow(clippy::needless_range_loop)]
fn solve_linear_system(a: &[[f64; 8]; 8], b: &[f64; 8]) -> Option<[f64; 8]> {
    let mut a = *a;
    let mut b = *b;
    let n = 8;

    for i in 0..n {
        let mut max_val = a[i][i].abs();
        let mut max_row = i;
        for k in (i + 1)..n {
            if a[k][i].abs() > max_val {
                max_val = a[k][i].abs();
                max_row = k;
            }
        }

        if max_val < 1e-12 {
            return None;
        }

        if max_row != i {
            a.swap(i, max_row);
            b.swap(i, max_row);
        }

        for k in (i + 1)..n {
            let factor = a[k][i] / a[i][i];
            b[k] -= factor * b[i];
            for j in i..n {
                a[k][j] -= factor * a[i][j];
            }
        }
    }

    let mut x = [0.0f64; 8];
    for i in (0..n).rev() {
        let mut sum = b[i];
        for j in (i + 1)..n {
            sum -= a[i][j] * x[j];
        }
        x[i] = sum / a[i][i];
    }

    Some(x)
}

/// Round half away from zero
#[inline]
pub fn round(d: f32) -> i32 {
    (d + if d < 0.0 { -0.5 } else { 0.5 }) as i32
}

/// Euclidean distance between integer coordinates
#[inline]
pub fn distance_i(ax: i32, ay: i32, bx: i32, by: i32) -> f32 {
    let dx = (ax - bx) as f64;
    let dy = (ay - by) as f64;
    (dx * dx + dy * dy).sqrt() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perspective_transform_scale() {
        let src = [
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(100.0, 100.0),
            Point::new(0.0, 100.0),
        ];
        let dst = [
            Point::new(0.0, 0.0),
            Point::new(50.0, 0.0),
            Point::new(50.0, 50.0),
            Point::new(0.0, 50.0),
        ];

        let t = PerspectiveTransform::from_points(&src, &dst).unwrap();
        let p = t.transform(&Point::new(50.0, 50.0));
        assert!((p.x - 25.0).abs() < 1e-3);
        assert!((p.y - 25.0).abs() < 1e-3);
    }

    #[test]
    fn test_perspective_transform_maps_corners() {
        let t = PerspectiveTransform::quadrilateral_to_quadrilateral(
            0.0, 0.0, 21.0, 0.0, 21.0, 21.0, 0.0, 21.0, 10.0, 12.0, 200.0, 30.0, 190.0, 220.0, 5.0, 180.0,
        )
        .unwrap();
        let mut points = [21.0, 21.0, 0.0, 21.0];
        t.transform_points(&mut points);
        assert!((points[0] - 190.0).abs() < 1e-2);
        assert!((points[1] - 220.0).abs() < 1e-2);
        assert!((points[2] - 5.0).abs() < 1e-2);
        assert!((points[3] - 180.0).abs() < 1e-2);
    }

    #[test]
    fn test_degenerate_quad() {
        let p = Point::new(1.0, 1.0);
        assert!(PerspectiveTransform::from_points(&[p; 4], &[p; 4]).is_none());
    }

    #[test]
    fn test_round() {
        assert_eq!(round(2.5), 3);
        assert_eq!(round(-2.5), -3);
        assert_eq!(round(2.49), 2);
    }
}
