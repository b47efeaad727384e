/// 2D point with floating point coordinates in image space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    /// X coordinate
    pub x: f32,
    /// Y coordinate
    pub y: f32,
}

impl Point {
    /// Create a new point
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Calculate distance to another point
    pub fn distance(&self, other: &Point) -> f32 {
        self.distance_squared(other).sqrt()
    }

    /// Calculate squared distance (faster, no sqrt)
    pub fn distance_squared(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Translate point by (dx, dy)
    pub fn translate(&self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Z component of the cross product of `a - b` and `c - b`
    pub fn cross_product_z(a: &Point, b: &Point, c: &Point) -> f32 {
        (c.x - b.x) * (a.y - b.y) - (c.y - b.y) * (a.x - b.x)
    }

    /// Order three finder-like points as `[bottom_left, top_left, top_right]`.
    ///
    /// The top-left point is opposite the longest side; the remaining two are
    /// swapped if needed so the triple turns clockwise.
    pub fn order_best_patterns<T: Copy>(patterns: [T; 3], center: impl Fn(&T) -> Point) -> [T; 3] {
        let [p0, p1, p2] = patterns;
        let (c0, c1, c2) = (center(&p0), center(&p1), center(&p2));
        let zero_one = c0.distance(&c1);
        let one_two = c1.distance(&c2);
        let zero_two = c0.distance(&c2);

        let (mut a, b, mut c) = if one_two >= zero_one && one_two >= zero_two {
            (p1, p0, p2)
        } else if zero_two >= one_two && zero_two >= zero_one {
            (p0, p1, p2)
        } else {
            (p0, p2, p1)
        };

        if Self::cross_product_z(&center(&a), &center(&b), &center(&c)) < 0.0 {
            std::mem::swap(&mut a, &mut c);
        }
        [a, b, c]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert_eq!(a.distance(&b), 5.0);
        assert_eq!(a.distance_squared(&b), 25.0);
        assert_eq!(a.translate(1.0, 2.0), Point::new(1.0, 2.0));
    }

    #[test]
    fn test_order_best_patterns() {
        let top_left = Point::new(10.0, 10.0);
        let top_right = Point::new(100.0, 10.0);
        let bottom_left = Point::new(10.0, 100.0);
        let ordered = Point::order_best_patterns([top_right, bottom_left, top_left], |p| *p);
        assert_eq!(ordered, [bottom_left, top_left, top_right]);
    }
}
