//! Luminance sources: read-only grids of brightness samples.

use std::sync::Arc;

use super::grayscale::{rgb_to_grayscale, rgba_to_grayscale};

/// Read-only grid of 8-bit brightness samples (0 = black, 255 = white)
pub trait LuminanceSource: Send + Sync {
    /// Width in pixels
    fn width(&self) -> usize;
    /// Height in pixels
    fn height(&self) -> usize;
    /// One row of samples
    fn row(&self, y: usize) -> Vec<u8>;
    /// All samples in row-major order
    fn matrix(&self) -> Vec<u8>;
    /// Owned copy behind a trait object
    fn box_clone(&self) -> Box<dyn LuminanceSource>;

    /// Sub-rectangle view, or `None` when cropping is unsupported or out of bounds
    fn crop(&self, _left: usize, _top: usize, _width: usize, _height: usize) -> Option<Box<dyn LuminanceSource>> {
        None
    }

    /// Copy rotated 90 degrees counter-clockwise, or `None` when unsupported
    fn rotate_counter_clockwise(&self) -> Option<Box<dyn LuminanceSource>> {
        None
    }

    /// Source with every sample inverted
    fn invert(&self) -> Box<dyn LuminanceSource> {
        Box::new(InvertedLuminanceSource {
            delegate: self.box_clone(),
        })
    }
}

/// In-memory 8-bit grayscale buffer with a crop window
#[derive(Debug, Clone)]
pub struct GrayLuminanceSource {
    data: Arc<[u8]>,
    data_width: usize,
    left: usize,
    top: usize,
    width: usize,
    height: usize,
}

impl GrayLuminanceSource {
    /// Wrap raw grayscale bytes; missing trailing bytes read as white
    pub fn new(mut data: Vec<u8>, width: usize, height: usize) -> Self {
        data.resize(width * height, 255);
        Self {
            data: data.into(),
            data_width: width,
            left: 0,
            top: 0,
            width,
            height,
        }
    }

    /// Convert packed RGB bytes
    pub fn from_rgb(rgb: &[u8], width: usize, height: usize) -> Self {
        Self::new(rgb_to_grayscale(rgb, width, height), width, height)
    }

    /// Convert packed RGBA bytes
    pub fn from_rgba(rgba: &[u8], width: usize, height: usize) -> Self {
        Self::new(rgba_to_grayscale(rgba, width, height), width, height)
    }

    /// Borrow an `image` crate grayscale buffer
    pub fn from_gray_image(image: &image::GrayImage) -> Self {
        let (width, height) = image.dimensions();
        Self::new(image.as_raw().clone(), width as usize, height as usize)
    }

    /// Convert any decoded image
    pub fn from_dynamic_image(image: &image::DynamicImage) -> Self {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        Self::from_rgb(rgb.as_raw(), width as usize, height as usize)
    }
}

impl LuminanceSource for GrayLuminanceSource {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn row(&self, y: usize) -> Vec<u8> {
        if y >= self.height {
            return Vec::new();
        }
        let start = (y + self.top) * self.data_width + self.left;
        self.data[start..start + self.width].to_vec()
    }

    fn matrix(&self) -> Vec<u8> {
        if self.left == 0 && self.top == 0 && self.width == self.data_width {
            return self.data[..self.width * self.height].to_vec();
        }
        let mut out = Vec::with_capacity(self.width * self.height);
        for y in 0..self.height {
            let start = (y + self.top) * self.data_width + self.left;
            out.extend_from_slice(&self.data[start..start + self.width]);
        }
        out
    }

    fn box_clone(&self) -> Box<dyn LuminanceSource> {
        Box::new(self.clone())
    }

    fn crop(&self, left: usize, top: usize, width: usize, height: usize) -> Option<Box<dyn LuminanceSource>> {
        if width == 0 || height == 0 || left + width > self.width || top + height > self.height {
            return None;
        }
        Some(Box::new(Self {
            data: self.data.clone(),
            data_width: self.data_width,
            left: self.left + left,
            top: self.top + top,
            width,
            height,
        }))
    }

    fn rotate_counter_clockwise(&self) -> Option<Box<dyn LuminanceSource>> {
        let source = self.matrix();
        let (w, h) = (self.width, self.height);
        let mut rotated = vec![0u8; w * h];
        for y in 0..h {
            for x in 0..w {
                // (x, y) moves to (y, w - 1 - x) in an h-wide image
                rotated[(w - 1 - x) * h + y] = source[y * w + x];
            }
        }
        Some(Box::new(Self::new(rotated, h, w)))
    }
}

/// View that reports `255 - v` for every sample of its delegate
pub struct InvertedLuminanceSource {
    delegate: Box<dyn LuminanceSource>,
}

impl LuminanceSource for InvertedLuminanceSource {
    fn width(&self) -> usize {
        self.delegate.width()
    }

    fn height(&self) -> usize {
        self.delegate.height()
    }

    fn row(&self, y: usize) -> Vec<u8> {
        self.delegate.row(y).into_iter().map(|v| 255 - v).collect()
    }

    fn matrix(&self) -> Vec<u8> {
        self.delegate.matrix().into_iter().map(|v| 255 - v).collect()
    }

    fn box_clone(&self) -> Box<dyn LuminanceSource> {
        Box::new(InvertedLuminanceSource {
            delegate: self.delegate.box_clone(),
        })
    }

    fn crop(&self, left: usize, top: usize, width: usize, height: usize) -> Option<Box<dyn LuminanceSource>> {
        let delegate = self.delegate.crop(left, top, width, height)?;
        Some(Box::new(InvertedLuminanceSource { delegate }))
    }

    fn rotate_counter_clockwise(&self) -> Option<Box<dyn LuminanceSource>> {
        let delegate = self.delegate.rotate_counter_clockwise()?;
        Some(Box::new(InvertedLuminanceSource { delegate }))
    }

    fn invert(&self) -> Box<dyn LuminanceSource> {
        self.delegate.box_clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> GrayLuminanceSource {
        GrayLuminanceSource::new((0u8..12).collect(), 4, 3)
    }

    #[test]
    fn test_row_and_crop() {
        let source = sample();
        assert_eq!(source.row(1), vec![4, 5, 6, 7]);
        let crop = source.crop(1, 1, 2, 2).unwrap();
        assert_eq!(crop.matrix(), vec![5, 6, 9, 10]);
        assert!(source.crop(3, 0, 2, 1).is_none());
    }

    #[test]
    fn test_rotate_counter_clockwise() {
        let source = sample();
        let rotated = source.rotate_counter_clockwise().unwrap();
        assert_eq!(rotated.width(), 3);
        assert_eq!(rotated.height(), 4);
        // Right column becomes the top row
        assert_eq!(rotated.row(0), vec![3, 7, 11]);
        assert_eq!(rotated.row(3), vec![0, 4, 8]);
    }

    #[test]
    fn test_invert() {
        let source = sample();
        let inverted = source.invert();
        assert_eq!(inverted.row(0), vec![255, 254, 253, 252]);
        assert_eq!(inverted.invert().row(0), vec![0, 1, 2, 3]);
    }
}
