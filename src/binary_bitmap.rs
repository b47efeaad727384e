use std::sync::OnceLock;

use crate::error::Result;
use crate::models::{BitArray, BitMatrix};
use crate::utils::binarization::{Binarizer, GlobalHistogramBinarizer};
use crate::utils::luminance::LuminanceSource;

/// Binarized image handed to readers.
///
/// Pairs a luminance source with a binarizer and caches the black matrix and
/// every black row the first time they are requested.
pub struct BinaryBitmap {
    binarizer: Box<dyn Binarizer>,
    matrix: OnceLock<Result<BitMatrix>>,
    rows: Vec<OnceLock<Result<BitArray>>>,
}

impl BinaryBitmap {
    /// Wrap a binarizer
    pub fn new(binarizer: Box<dyn Binarizer>) -> Self {
        let height = binarizer.height();
        Self {
            binarizer,
            matrix: OnceLock::new(),
            rows: (0..height).map(|_| OnceLock::new()).collect(),
        }
    }

    /// Binarize a luminance source with the default global-histogram binarizer
    pub fn from_luminance(source: impl LuminanceSource + 'static) -> Self {
        Self::new(Box::new(GlobalHistogramBinarizer::new(Box::new(source))))
    }

    /// Width in pixels
    pub fn width(&self) -> usize {
        self.binarizer.width()
    }

    /// Height in pixels
    pub fn height(&self) -> usize {
        self.binarizer.height()
    }

    /// Cached black row `y`
    pub fn black_row(&self, y: usize) -> Result<&BitArray> {
        let slot = self.rows.get(y).ok_or(crate::error::DecodeError::NotFound)?;
        slot.get_or_init(|| self.binarizer.black_row(y)).as_ref().map_err(Clone::clone)
    }

    /// Cached black matrix
    pub fn black_matrix(&self) -> Result<&BitMatrix> {
        self.matrix
            .get_or_init(|| self.binarizer.black_matrix())
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Sub-image with a fresh cache, or `None` if the source cannot crop
    pub fn crop(&self, left: usize, top: usize, width: usize, height: usize) -> Option<BinaryBitmap> {
        let source = self.binarizer.luminance_source().crop(left, top, width, height)?;
        Some(BinaryBitmap::new(self.binarizer.create_binarizer(source)))
    }

    /// Image rotated 90 degrees counter-clockwise, or `None` if unsupported
    pub fn rotate_counter_clockwise(&self) -> Option<BinaryBitmap> {
        let source = self.binarizer.luminance_source().rotate_counter_clockwise()?;
        Some(BinaryBitmap::new(self.binarizer.create_binarizer(source)))
    }

    /// Image with inverted luminance
    pub fn inverted(&self) -> BinaryBitmap {
        let source = self.binarizer.luminance_source().invert();
        BinaryBitmap::new(self.binarizer.create_binarizer(source))
    }
}

impl std::fmt::Debug for BinaryBitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinaryBitmap")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::luminance::GrayLuminanceSource;

    fn checker() -> BinaryBitmap {
        let mut data = vec![255u8; 16];
        data[0] = 0;
        data[15] = 0;
        BinaryBitmap::from_luminance(GrayLuminanceSource::new(data, 4, 4))
    }

    #[test]
    fn test_cached_matrix() {
        let bitmap = checker();
        let first = bitmap.black_matrix().unwrap() as *const BitMatrix;
        let second = bitmap.black_matrix().unwrap() as *const BitMatrix;
        assert_eq!(first, second);
        assert!(bitmap.black_matrix().unwrap().get(3, 3));
    }

    #[test]
    fn test_rows_crop_rotate_invert() {
        let bitmap = checker();
        assert!(bitmap.black_row(0).unwrap().get(0));
        assert!(bitmap.black_row(9).is_err());

        let crop = bitmap.crop(2, 2, 2, 2).unwrap();
        assert!(crop.black_matrix().unwrap().get(1, 1));

        let rotated = bitmap.rotate_counter_clockwise().unwrap();
        assert!(rotated.black_matrix().unwrap().get(0, 3));

        let inverted = bitmap.inverted();
        assert!(!inverted.black_matrix().unwrap().get(0, 0));
        assert!(inverted.black_matrix().unwrap().get(1, 0));
    }
}
