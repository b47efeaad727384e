//! Searching one image for several symbols.
//!
//! [`ByQuadrantReader`] narrows the search region for a single symbol that
//! is small relative to the frame. [`GenericMultipleBarcodeReader`] keeps
//! decoding the regions left over around each found symbol.

mod by_quadrant;
mod generic;

pub use by_quadrant::ByQuadrantReader;
pub use generic::GenericMultipleBarcodeReader;

use crate::binary_bitmap::BinaryBitmap;
use crate::error::Result;
use crate::models::{DecodeHints, ScanResult};

/// Decodes every symbol it can find in an image
pub trait MultipleBarcodeReader {
    /// All distinct symbols in `image`; `NotFound` when there are none
    fn decode_multiple(&mut self, image: &BinaryBitmap, hints: &DecodeHints) -> Result<Vec<ScanResult>>;
}
