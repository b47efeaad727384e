use crate::binary_bitmap::BinaryBitmap;
use crate::error::{DecodeError, Result};
use crate::models::{DecodeHints, ScanResult};
use crate::reader::Reader;

/// Runs a delegate on the four quadrants of the image and then on its center.
///
/// Points of a result found in a sub-region are shifted back into the
/// coordinates of the full image.
#[derive(Debug, Default)]
pub struct ByQuadrantReader<R> {
    delegate: R,
}

impl<R: Reader> ByQuadrantReader<R> {
    /// Wrap `delegate`
    pub fn new(delegate: R) -> Self {
        Self { delegate }
    }

    /// The wrapped reader
    pub fn into_inner(self) -> R {
        self.delegate
    }

    fn decode_region(
        &mut self,
        image: &BinaryBitmap,
        hints: &DecodeHints,
        left: usize,
        top: usize,
        width: usize,
        height: usize,
    ) -> Result<ScanResult> {
        let region = image.crop(left, top, width, height).ok_or(DecodeError::NotFound)?;
        let mut result = self.delegate.decode(&region, hints)?;
        result.translate_points(left as f32, top as f32);
        Ok(result)
    }
}

impl<R: Reader> Reader for ByQuadrantReader<R> {
    fn decode(&mut self, image: &BinaryBitmap, hints: &DecodeHints) -> Result<ScanResult> {
        let (half_width, half_height) = (image.width() / 2, image.height() / 2);
        if half_width == 0 || half_height == 0 {
            return Err(DecodeError::NotFound);
        }
        let quadrants = [(0, 0), (half_width, 0), (0, half_height), (half_width, half_height)];
        for (left, top) in quadrants {
            match self.decode_region(image, hints, left, top, half_width, half_height) {
                Ok(result) => return Ok(result),
                Err(error) => tracing::trace!(left, top, %error, "quadrant empty"),
            }
        }

        let (quarter_width, quarter_height) = (half_width / 2, half_height / 2);
        self.decode_region(image, hints, quarter_width, quarter_height, half_width, half_height)
    }

    fn reset(&mut self) {
        self.delegate.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BarcodeFormat, Point};
    use crate::utils::luminance::GrayLuminanceSource;

    /// Needs at least two black pixels and reports the first one; refuses
    /// images wider than `max_width`
    struct DotReader {
        max_width: usize,
        calls: usize,
    }

    impl Reader for DotReader {
        fn decode(&mut self, image: &BinaryBitmap, _hints: &DecodeHints) -> Result<ScanResult> {
            self.calls += 1;
            if image.width() > self.max_width {
                return Err(DecodeError::NotFound);
            }
            let matrix = image.black_matrix()?;
            let (x, y) = matrix.top_left_on_bit().ok_or(DecodeError::NotFound)?;
            if matrix.bottom_right_on_bit() == Some((x, y)) {
                return Err(DecodeError::NotFound);
            }
            Ok(ScanResult::new(
                "dot".into(),
                Vec::new(),
                vec![Point::new(x as f32, y as f32)],
                BarcodeFormat::QrCode,
            ))
        }
    }

    fn dotted(width: usize, height: usize, dots: &[(usize, usize)]) -> BinaryBitmap {
        let mut pixels = vec![255u8; width * height];
        for &(x, y) in dots {
            pixels[y * width + x] = 0;
        }
        BinaryBitmap::from_luminance(GrayLuminanceSource::new(pixels, width, height))
    }

    #[test]
    fn test_translates_quadrant_points() {
        let mut reader = ByQuadrantReader::new(DotReader { max_width: 60, calls: 0 });
        let result = reader.decode(&dotted(100, 80, &[(70, 65), (80, 70)]), &DecodeHints::default()).unwrap();
        assert_eq!(result.result_points, vec![Point::new(70.0, 65.0)]);
        // Three empty quadrants before the bottom-right one
        assert_eq!(reader.into_inner().calls, 4);
    }

    #[test]
    fn test_center_region() {
        let mut reader = ByQuadrantReader::new(DotReader { max_width: 60, calls: 0 });
        // The pair straddles every quadrant boundary
        let result = reader
            .decode(&dotted(100, 80, &[(40, 30), (60, 50)]), &DecodeHints::default())
            .unwrap();
        assert_eq!(result.result_points, vec![Point::new(40.0, 30.0)]);
        assert_eq!(reader.into_inner().calls, 5);
    }

    #[test]
    fn test_quadrant_order() {
        // Any reader would accept the full frame; the bottom-left quadrant still wins
        let mut reader = ByQuadrantReader::new(DotReader { max_width: 1000, calls: 0 });
        let image = dotted(100, 80, &[(10, 50), (20, 60), (60, 45), (70, 70)]);
        let result = reader.decode(&image, &DecodeHints::default()).unwrap();
        assert_eq!(result.result_points, vec![Point::new(10.0, 50.0)]);
        assert_eq!(reader.into_inner().calls, 3);
    }

    #[test]
    fn test_nothing_found() {
        let mut reader = ByQuadrantReader::new(DotReader { max_width: 60, calls: 0 });
        assert_eq!(
            reader.decode(&dotted(100, 80, &[]), &DecodeHints::default()),
            Err(DecodeError::NotFound)
        );
        assert_eq!(reader.into_inner().calls, 5);
    }
}
