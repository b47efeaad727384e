use crate::error::{DecodeError, Result};
use crate::models::BitMatrix;
use crate::utils::geometry::PerspectiveTransform;

/// Samples a binarized image along a projective grid
pub struct GridSampler;

impl GridSampler {
    /// Sample a `dim_x` × `dim_y` grid.
    ///
    /// `dst` holds the four corners in grid coordinates and `src` the same
    /// corners in image coordinates, each as `[x0, y0, x1, y1, x2, y2, x3, y3]`.
    pub fn sample_grid(image: &BitMatrix, dim_x: usize, dim_y: usize, dst: [f32; 8], src: [f32; 8]) -> Result<BitMatrix> {
        let transform = PerspectiveTransform::quadrilateral_to_quadrilateral(
            dst[0], dst[1], dst[2], dst[3], dst[4], dst[5], dst[6], dst[7], src[0], src[1], src[2], src[3], src[4],
            src[5], src[6], src[7],
        )
        .ok_or(DecodeError::NotFound)?;
        Self::sample_grid_with_transform(image, dim_x, dim_y, &transform)
    }

    /// Sample using a precomputed grid-to-image transform; module centers sit at `+0.5`
    pub fn sample_grid_with_transform(
        image: &BitMatrix,
        dim_x: usize,
        dim_y: usize,
        transform: &PerspectiveTransform,
    ) -> Result<BitMatrix> {
        if dim_x == 0 || dim_y == 0 {
            return Err(DecodeError::NotFound);
        }
        let mut bits = BitMatrix::new(dim_x, dim_y);
        let mut points = vec![0.0f32; 2 * dim_x];
        let (width, height) = (image.width() as i32, image.height() as i32);

        for y in 0..dim_y {
            let y_value = y as f32 + 0.5;
            for (x, pair) in points.chunks_exact_mut(2).enumerate() {
                pair[0] = x as f32 + 0.5;
                pair[1] = y_value;
            }
            transform.transform_points(&mut points);
            check_and_nudge_points(image, &mut points)?;

            for (x, pair) in points.chunks_exact(2).enumerate() {
                let (px, py) = (pair[0] as i32, pair[1] as i32);
                if px < 0 || py < 0 || px >= width || py >= height {
                    return Err(DecodeError::NotFound);
                }
                if image.get(px as usize, py as usize) {
                    bits.set(x, y);
                }
            }
        }
        Ok(bits)
    }
}

/// Pull end points lying at most one pixel outside the image back onto its
/// border; anything further out means the transform is wrong.
fn check_and_nudge_points(image: &BitMatrix, points: &mut [f32]) -> Result<()> {
    let width = image.width() as i32;
    let height = image.height() as i32;
    let pairs = points.len() / 2;

    let mut nudge = |offset: usize| -> Result<bool> {
        if !points[offset].is_finite() || !points[offset + 1].is_finite() {
            return Err(DecodeError::NotFound);
        }
        let x = points[offset] as i32;
        let y = points[offset + 1] as i32;
        if x < -1 || x > width || y < -1 || y > height {
            return Err(DecodeError::NotFound);
        }
        let mut nudged = false;
        if x == -1 {
            points[offset] = 0.0;
            nudged = true;
        } else if x == width {
            points[offset] = (width - 1) as f32;
            nudged = true;
        }
        if y == -1 {
            points[offset + 1] = 0.0;
            nudged = true;
        } else if y == height {
            points[offset + 1] = (height - 1) as f32;
            nudged = true;
        }
        Ok(nudged)
    };

    for i in 0..pairs {
        if !nudge(i * 2)? {
            break;
        }
    }
    for i in (0..pairs).rev() {
        if !nudge(i * 2)? {
            break;
        }
    }
    Ok(())
}
