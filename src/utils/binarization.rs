//! Luminance to black/white conversion.

use super::luminance::LuminanceSource;
use crate::error::Result;
use crate::models::{BitArray, BitMatrix};

/// Turns a [`LuminanceSource`] into black and white bits
pub trait Binarizer: Send + Sync {
    /// Source being binarized
    fn luminance_source(&self) -> &dyn LuminanceSource;

    /// One row of black (true) and white (false) bits
    fn black_row(&self, y: usize) -> Result<BitArray>;

    /// Whole image as black and white bits
    fn black_matrix(&self) -> Result<BitMatrix>;

    /// Same algorithm applied to a different source
    fn create_binarizer(&self, source: Box<dyn LuminanceSource>) -> Box<dyn Binarizer>;

    /// Width of the source
    fn width(&self) -> usize {
        self.luminance_source().width()
    }

    /// Height of the source
    fn height(&self) -> usize {
        self.luminance_source().height()
    }
}

/// Binarizer using one Otsu threshold per row for 1D scans and one over the
/// whole image for 2D detection
pub struct GlobalHistogramBinarizer {
    source: Box<dyn LuminanceSource>,
}

impl GlobalHistogramBinarizer {
    /// Wrap a luminance source
    pub fn new(source: Box<dyn LuminanceSource>) -> Self {
        Self { source }
    }
}

impl Binarizer for GlobalHistogramBinarizer {
    fn luminance_source(&self) -> &dyn LuminanceSource {
        self.source.as_ref()
    }

    fn black_row(&self, y: usize) -> Result<BitArray> {
        let luminances = self.source.row(y);
        let threshold = calculate_otsu_threshold(&luminances);
        let mut row = BitArray::with_size(luminances.len());
        for (x, &v) in luminances.iter().enumerate() {
            if v < threshold {
                row.set(x);
            }
        }
        Ok(row)
    }

    fn black_matrix(&self) -> Result<BitMatrix> {
        let gray = self.source.matrix();
        Ok(otsu_binarize(&gray, self.source.width(), self.source.height()))
    }

    fn create_binarizer(&self, source: Box<dyn LuminanceSource>) -> Box<dyn Binarizer> {
        Box::new(GlobalHistogramBinarizer::new(source))
    }
}

/// Convert grayscale image to binary using Otsu's thresholding method
/// Returns a BitMatrix where true = black, false = white
pub fn otsu_binarize(gray: &[u8], width: usize, height: usize) -> BitMatrix {
    let threshold = calculate_otsu_threshold(gray);
    threshold_binarize(gray, width, height, threshold)
}

/// Simple global threshold binarization
pub fn threshold_binarize(gray: &[u8], width: usize, height: usize, threshold: u8) -> BitMatrix {
    let mut binary = BitMatrix::new(width, height);
    for (y, row) in gray.chunks(width.max(1)).take(height).enumerate() {
        for (x, &v) in row.iter().enumerate() {
            if v < threshold {
                binary.set(x, y);
            }
        }
    }
    binary
}

/// Calculate Otsu's optimal threshold; 128 when the histogram has a single class
pub(crate) fn calculate_otsu_threshold(gray: &[u8]) -> u8 {
    let mut histogram = [0u64; 256];
    for &pixel in gray {
        histogram[pixel as usize] += 1;
    }

    let total_pixels = gray.len() as f64;
    let total_sum: u64 = histogram.iter().enumerate().map(|(i, &c)| i as u64 * c).sum();
    let mut max_variance = 0.0;
    let mut optimal_threshold = 128u8;

    let mut class1_pixels = 0u64;
    let mut class1_sum = 0u64;
    for threshold in 1..=255usize {
        class1_pixels += histogram[threshold - 1];
        class1_sum += histogram[threshold - 1] * (threshold as u64 - 1);
        let class2_pixels = gray.len() as u64 - class1_pixels;
        if class1_pixels == 0 || class2_pixels == 0 {
            continue;
        }
        let class2_sum = total_sum - class1_sum;

        let class1_mean = class1_sum as f64 / class1_pixels as f64;
        let class2_mean = class2_sum as f64 / class2_pixels as f64;
        let weight1 = class1_pixels as f64 / total_pixels;
        let weight2 = class2_pixels as f64 / total_pixels;
        let variance = weight1 * weight2 * (class1_mean - class2_mean).powi(2);

        if variance > max_variance {
            max_variance = variance;
            optimal_threshold = threshold as u8;
        }
    }

    optimal_threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::luminance::GrayLuminanceSource;

    #[test]
    fn test_threshold_binarize() {
        let gray = vec![100, 150, 200, 50];
        let binary = threshold_binarize(&gray, 2, 2, 128);
        assert!(binary.get(0, 0));
        assert!(!binary.get(1, 0));
        assert!(!binary.get(0, 1));
        assert!(binary.get(1, 1));
    }

    #[test]
    fn test_otsu_binarize() {
        let mut gray = vec![50u8; 50];
        gray.extend(vec![200u8; 50]);
        let binary = otsu_binarize(&gray, 10, 10);
        assert!(binary.get(0, 0));
        assert!(!binary.get(0, 7));
    }

    #[test]
    fn test_uniform_image_is_white() {
        let gray = vec![255u8; 16];
        let binary = otsu_binarize(&gray, 4, 4);
        assert_eq!(binary.enclosing_rectangle(), None);
    }

    #[test]
    fn test_black_row() {
        let source = GrayLuminanceSource::new(vec![0, 255, 0, 255, 255, 255], 6, 1);
        let binarizer = GlobalHistogramBinarizer::new(Box::new(source));
        let row = binarizer.black_row(0).unwrap();
        assert!(row.get(0));
        assert!(!row.get(1));
        assert!(row.get(2));
        assert!(!row.get(5));
    }
}
