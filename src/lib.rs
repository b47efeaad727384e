//! rust_barcode - multi-format barcode detection, decoding and encoding
//!
//! Reads QR Code, Data Matrix, Aztec, PDF417 and the common linear
//! symbologies (Code 39, Code 128, EAN-13/8, UPC-A, ITF) from a luminance
//! frame, and renders QR Code, Data Matrix, Aztec, PDF417, Code 128 and
//! EAN-13 symbols.
//!
//! The usual entry point is [`MultiFormatReader`], which compiles
//! [`DecodeHints`] into a [`ReaderPlan`] and tries each format reader in turn:
//!
//! ```
//! use rust_barcode::{BarcodeFormat, BinaryBitmap, DecodeHints, EncodeHints, GrayLuminanceSource};
//! use rust_barcode::{MultiFormatReader, MultiFormatWriter, Reader, Writer};
//!
//! let hints = EncodeHints::default().with_error_correction("M");
//! let symbol = MultiFormatWriter.encode("HELLO", BarcodeFormat::QrCode, 200, 200, &hints).unwrap();
//! let pixels: Vec<u8> = (0..symbol.height())
//!     .flat_map(|y| (0..symbol.width()).map(move |x| (x, y)))
//!     .map(|(x, y)| if symbol.get(x, y) { 0 } else { 255 })
//!     .collect();
//! let image = BinaryBitmap::from_luminance(GrayLuminanceSource::new(pixels, symbol.width(), symbol.height()));
//!
//! let result = MultiFormatReader::new().decode(&image, &DecodeHints::default()).unwrap();
//! assert_eq!(result.text, "HELLO");
//! assert_eq!(result.format, BarcodeFormat::QrCode);
//! ```

#![warn(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

/// Aztec detection, decoding and encoding
pub mod aztec;
/// Cached binarized view of a luminance source
pub mod binary_bitmap;
mod config;
/// Data Matrix detection, decoding and encoding
pub mod datamatrix;
/// Galois-field arithmetic and Reed-Solomon error correction
pub mod decoder;
/// Grid sampling and shared geometric detectors
pub mod detector;
/// Decode and encode error types
pub mod error;
/// Core data structures (BitMatrix, BitArray, Point, hints, results)
pub mod models;
/// Several symbols in one image
pub mod multi;
/// Dispatch over every format reader
pub mod multi_format;
/// Linear (1D) symbologies
pub mod oned;
/// PDF417 detection, decoding and encoding
pub mod pdf417;
/// QR Code detection, decoding and encoding
pub mod qrcode;
/// Reader contract and reader plans
pub mod reader;
/// Luminance sources, binarization, character sets and bit readers
pub mod utils;
/// Writer contract and the format dispatcher
pub mod writer;

pub use binary_bitmap::BinaryBitmap;
pub use error::{DecodeError, EncodeError, Result};
pub use models::{
    BarcodeFormat, BitArray, BitMatrix, DecodeHints, EncodeHints, MetadataValue, Point, ResultMetadataType, ScanResult,
};
pub use multi::{ByQuadrantReader, GenericMultipleBarcodeReader, MultipleBarcodeReader};
pub use multi_format::MultiFormatReader;
pub use reader::{Reader, ReaderKind, ReaderPlan, compile};
pub use utils::binarization::{Binarizer, GlobalHistogramBinarizer};
pub use utils::luminance::{GrayLuminanceSource, LuminanceSource};
pub use writer::{MultiFormatWriter, Writer};

/// Decode one symbol of any allowed format from packed RGB bytes
///
/// # Arguments
/// * `image` - Raw RGB bytes (3 bytes per pixel)
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
/// * `hints` - Formats and search effort
pub fn decode_rgb(image: &[u8], width: usize, height: usize, hints: &DecodeHints) -> Result<ScanResult> {
    let bitmap = BinaryBitmap::from_luminance(GrayLuminanceSource::from_rgb(image, width, height));
    MultiFormatReader::new().decode(&bitmap, hints)
}

/// Decode one symbol from a pre-computed grayscale image (1 byte per pixel)
pub fn decode_grayscale(image: &[u8], width: usize, height: usize, hints: &DecodeHints) -> Result<ScanResult> {
    let bitmap = BinaryBitmap::from_luminance(GrayLuminanceSource::new(image.to_vec(), width, height));
    MultiFormatReader::new().decode(&bitmap, hints)
}

/// Decode every distinct symbol in a grayscale image
pub fn decode_all_grayscale(image: &[u8], width: usize, height: usize, hints: &DecodeHints) -> Result<Vec<ScanResult>> {
    let bitmap = BinaryBitmap::from_luminance(GrayLuminanceSource::new(image.to_vec(), width, height));
    GenericMultipleBarcodeReader::new(MultiFormatReader::new()).decode_multiple(&bitmap, hints)
}
