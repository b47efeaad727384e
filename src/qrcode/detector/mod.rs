//! QR Code symbol location
//!
//! - Finder pattern search with horizontal, vertical and diagonal cross checks
//! - Module size and dimension estimate from the finder triple
//! - Alignment pattern search near the expected bottom-right position
//! - Perspective sampling of the module grid

/// Alignment pattern search
pub mod alignment;
/// Finder pattern search
pub mod finder;

pub use alignment::{AlignmentPattern, AlignmentPatternFinder};
pub use finder::{FinderPattern, FinderPatternFinder, FinderPatternInfo};

use crate::detector::{DetectorResult, GridSampler};
use crate::error::{DecodeError, Result};
use crate::models::{BitMatrix, DecodeHints, Point};
use crate::qrcode::decoder::Version;
use crate::utils::geometry::PerspectiveTransform;

/// Locates a QR symbol in a binarized image and samples its grid
pub struct Detector<'a> {
    image: &'a BitMatrix,
}

impl<'a> Detector<'a> {
    /// Detector over `image`
    pub fn new(image: &'a BitMatrix) -> Self {
        Self { image }
    }

    /// Find the finder patterns and sample the symbol.
    ///
    /// A scan that stopped early is repeated over every row when its triple
    /// does not yield a symbol.
    pub fn detect(&self, hints: &DecodeHints) -> Result<DetectorResult> {
        let mut finder = FinderPatternFinder::new(self.image);
        let first = finder
            .find(hints)
            .and_then(|info| self.process_finder_pattern_info(&info, hints));
        match first {
            Err(error) if finder.cut_short() => {
                tracing::debug!(%error, "rescanning every row for finder patterns");
                self.detect_exhaustive(hints)
            }
            result => result,
        }
    }

    /// Sample the symbol from a finder search that visits every row
    pub fn detect_exhaustive(&self, hints: &DecodeHints) -> Result<DetectorResult> {
        let info = FinderPatternFinder::new(self.image).find_exhaustive(hints)?;
        self.process_finder_pattern_info(&info, hints)
    }

    /// Sample the symbol described by an already located finder triple
    pub fn process_finder_pattern_info(&self, info: &FinderPatternInfo, hints: &DecodeHints) -> Result<DetectorResult> {
        let top_left = info.top_left.center;
        let top_right = info.top_right.center;
        let bottom_left = info.bottom_left.center;

        let module_size = self.calculate_module_size(top_left, top_right, bottom_left);
        if module_size < 1.0 {
            return Err(DecodeError::NotFound);
        }
        let dimension = compute_dimension(top_left, top_right, bottom_left, module_size)?;
        let provisional = Version::provisional_for_dimension(dimension)?;
        tracing::trace!(module_size, dimension, version = provisional.number(), "QR geometry estimate");

        let mut alignment = None;
        if !provisional.alignment_pattern_centers().is_empty() {
            let modules_between_centers = (provisional.dimension() - 7) as f32;
            let bottom_right_x = top_right.x - top_left.x + bottom_left.x;
            let bottom_right_y = top_right.y - top_left.y + bottom_left.y;

            // The last alignment pattern sits 3 modules in from the bottom-right corner
            let correction = 1.0 - 3.0 / modules_between_centers;
            let est_x = (top_left.x + correction * (bottom_right_x - top_left.x)).max(0.0) as usize;
            let est_y = (top_left.y + correction * (bottom_right_y - top_left.y)).max(0.0) as usize;

            let mut factor = 4;
            while factor <= 16 {
                if let Ok(pattern) = self.find_alignment_in_region(module_size, est_x, est_y, factor as f32, hints) {
                    alignment = Some(pattern.center);
                    break;
                }
                factor <<= 1;
            }
        }

        let transform =
            create_transform(top_left, top_right, bottom_left, alignment, dimension).ok_or(DecodeError::NotFound)?;
        let bits = GridSampler::sample_grid_with_transform(self.image, dimension, dimension, &transform)?;

        let mut points = vec![bottom_left, top_left, top_right];
        points.extend(alignment);
        Ok(DetectorResult::new(bits, points))
    }

    fn calculate_module_size(&self, top_left: Point, top_right: Point, bottom_left: Point) -> f32 {
        (self.module_size_one_way(top_left, top_right) + self.module_size_one_way(top_left, bottom_left)) / 2.0
    }

    /// Module size from the black-white-black runs crossing both patterns
    fn module_size_one_way(&self, pattern: Point, other: Point) -> f32 {
        let (px, py) = (pattern.x as i32, pattern.y as i32);
        let (ox, oy) = (other.x as i32, other.y as i32);
        let est1 = self.size_of_black_white_black_run_both_ways(px, py, ox, oy);
        let est2 = self.size_of_black_white_black_run_both_ways(ox, oy, px, py);
        match (est1.is_nan(), est2.is_nan()) {
            (true, _) => est2 / 7.0,
            (_, true) => est1 / 7.0,
            _ => (est1 + est2) / 14.0,
        }
    }

    fn size_of_black_white_black_run_both_ways(&self, from_x: i32, from_y: i32, to_x: i32, to_y: i32) -> f32 {
        let mut result = self.size_of_black_white_black_run(from_x, from_y, to_x, to_y);
        let (width, height) = (self.image.width() as i32, self.image.height() as i32);

        // Then run the other way, clipping the line to the image
        let mut scale = 1.0f32;
        let mut other_to_x = from_x - (to_x - from_x);
        if other_to_x < 0 {
            scale = from_x as f32 / (from_x - other_to_x) as f32;
            other_to_x = 0;
        } else if other_to_x >= width {
            scale = (width - 1 - from_x) as f32 / (other_to_x - from_x) as f32;
            other_to_x = width - 1;
        }
        let mut other_to_y = (from_y as f32 - (to_y - from_y) as f32 * scale) as i32;

        scale = 1.0;
        if other_to_y < 0 {
            scale = from_y as f32 / (from_y - other_to_y) as f32;
            other_to_y = 0;
        } else if other_to_y >= height {
            scale = (height - 1 - from_y) as f32 / (other_to_y - from_y) as f32;
            other_to_y = height - 1;
        }
        other_to_x = (from_x as f32 + (other_to_x - from_x) as f32 * scale) as i32;

        result += self.size_of_black_white_black_run(from_x, from_y, other_to_x, other_to_y);
        // Middle pixel is counted twice
        result - 1.0
    }

    /// Bresenham walk from the pattern center to the end of the next black run
    fn size_of_black_white_black_run(&self, from_x: i32, from_y: i32, to_x: i32, to_y: i32) -> f32 {
        let steep = (to_y - from_y).abs() > (to_x - from_x).abs();
        let (from_x, from_y, to_x, to_y) = if steep {
            (from_y, from_x, to_y, to_x)
        } else {
            (from_x, from_y, to_x, to_y)
        };

        let dx = (to_x - from_x).abs();
        let dy = (to_y - from_y).abs();
        let mut error = -dx / 2;
        let x_step = if from_x < to_x { 1 } else { -1 };
        let y_step = if from_y < to_y { 1 } else { -1 };

        let mut state = 0;
        let x_limit = to_x + x_step;
        let mut x = from_x;
        let mut y = from_y;
        let from = Point::new(from_x as f32, from_y as f32);
        while x != x_limit {
            let (real_x, real_y) = if steep { (y, x) } else { (x, y) };
            // Black for states 0 and 2, white for state 1
            if (state == 1) == self.image.get_i(real_x, real_y) {
                if state == 2 {
                    return Point::new(x as f32, y as f32).distance(&from);
                }
                state += 1;
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
        if state == 2 {
            return Point::new((to_x + x_step) as f32, to_y as f32).distance(&from);
        }
        f32::NAN
    }

    fn find_alignment_in_region(
        &self,
        module_size: f32,
        est_x: usize,
        est_y: usize,
        allowance_factor: f32,
        hints: &DecodeHints,
    ) -> Result<AlignmentPattern> {
        let allowance = (allowance_factor * module_size) as usize;
        let left = est_x.saturating_sub(allowance);
        let right = (self.image.width() - 1).min(est_x + allowance);
        if right <= left || ((right - left) as f32) < module_size * 3.0 {
            return Err(DecodeError::NotFound);
        }
        let top = est_y.saturating_sub(allowance);
        let bottom = (self.image.height() - 1).min(est_y + allowance);
        if bottom <= top || ((bottom - top) as f32) < module_size * 3.0 {
            return Err(DecodeError::NotFound);
        }
        AlignmentPatternFinder::new(self.image, left, top, right - left, bottom - top, module_size).find(hints)
    }
}

/// Symbol dimension from finder distances, snapped to `1 mod 4`
fn compute_dimension(top_left: Point, top_right: Point, bottom_left: Point, module_size: f32) -> Result<usize> {
    let tltr = (top_left.distance(&top_right) / module_size).round() as i32;
    let tlbl = (top_left.distance(&bottom_left) / module_size).round() as i32;
    let mut dimension = (tltr + tlbl) / 2 + 7;
    match dimension & 0x03 {
        0 => dimension += 1,
        2 => dimension -= 1,
        3 => return Err(DecodeError::NotFound),
        _ => {}
    }
    usize::try_from(dimension).map_err(|_| DecodeError::NotFound)
}

/// Grid-to-image transform anchored on the finder centers and, when found,
/// the alignment pattern
fn create_transform(
    top_left: Point,
    top_right: Point,
    bottom_left: Point,
    alignment: Option<Point>,
    dimension: usize,
) -> Option<PerspectiveTransform> {
    let dim_minus_three = dimension as f32 - 3.5;
    let (bottom_right, source_bottom_right) = match alignment {
        Some(pattern) => (pattern, dim_minus_three - 3.0),
        None => (
            Point::new(top_right.x - top_left.x + bottom_left.x, top_right.y - top_left.y + bottom_left.y),
            dim_minus_three,
        ),
    };
    PerspectiveTransform::from_points(
        &[
            Point::new(3.5, 3.5),
            Point::new(dim_minus_three, 3.5),
            Point::new(source_bottom_right, source_bottom_right),
            Point::new(3.5, dim_minus_three),
        ],
        &[top_left, top_right, bottom_right, bottom_left],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_dimension() {
        let tl = Point::new(10.0, 10.0);
        // 14 modules between centers → dimension 21
        let tr = Point::new(10.0 + 14.0 * 4.0, 10.0);
        let bl = Point::new(10.0, 10.0 + 14.0 * 4.0);
        assert_eq!(compute_dimension(tl, tr, bl, 4.0), Ok(21));
        // 16 modules → 23, which is 3 mod 4
        let tr = Point::new(10.0 + 16.0 * 4.0, 10.0);
        let bl = Point::new(10.0, 10.0 + 16.0 * 4.0);
        assert_eq!(compute_dimension(tl, tr, bl, 4.0), Err(DecodeError::NotFound));
    }

    #[test]
    fn test_create_transform_maps_centers() {
        let tl = Point::new(20.0, 20.0);
        let tr = Point::new(76.0, 20.0);
        let bl = Point::new(20.0, 76.0);
        let transform = create_transform(tl, tr, bl, None, 21).unwrap();
        let p = transform.transform(&Point::new(3.5, 3.5));
        assert!((p.x - 20.0).abs() < 1e-3 && (p.y - 20.0).abs() < 1e-3);
        let p = transform.transform(&Point::new(17.5, 17.5));
        assert!((p.x - 76.0).abs() < 1e-3 && (p.y - 76.0).abs() < 1e-3);
    }

    #[test]
    fn test_detect_blank() {
        let image = BitMatrix::new(120, 120);
        assert!(Detector::new(&image).detect(&DecodeHints::default()).is_err());
    }
}
