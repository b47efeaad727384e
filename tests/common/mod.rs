//! Shared helpers: render symbols into luminance frames and decode them.

#![allow(dead_code)]

use rust_barcode::{
    BarcodeFormat, BinaryBitmap, BitMatrix, DecodeHints, EncodeHints, GrayLuminanceSource, MultiFormatReader,
    MultiFormatWriter, Reader, Result, ScanResult, Writer,
};

/// Grayscale pixels of `matrix`, each module `scale` pixels square, with
/// `quiet` white modules on every side
pub fn luminance(matrix: &BitMatrix, scale: usize, quiet: usize) -> (Vec<u8>, usize, usize) {
    let width = (matrix.width() + 2 * quiet) * scale;
    let height = (matrix.height() + 2 * quiet) * scale;
    let mut pixels = vec![255u8; width * height];
    for y in 0..matrix.height() * scale {
        for x in 0..matrix.width() * scale {
            if matrix.get(x / scale, y / scale) {
                pixels[(y + quiet * scale) * width + x + quiet * scale] = 0;
            }
        }
    }
    (pixels, width, height)
}

/// Binarizable frame of `matrix`; see [`luminance`]
pub fn bitmap(matrix: &BitMatrix, scale: usize, quiet: usize) -> BinaryBitmap {
    let (pixels, width, height) = luminance(matrix, scale, quiet);
    BinaryBitmap::from_luminance(GrayLuminanceSource::new(pixels, width, height))
}

/// Place every symbol on one white canvas with its top-left corner at the
/// given offset
pub fn compose(width: usize, height: usize, symbols: &[(&BitMatrix, usize, usize)]) -> BinaryBitmap {
    let mut pixels = vec![255u8; width * height];
    for &(symbol, left, top) in symbols {
        for y in 0..symbol.height() {
            for x in 0..symbol.width() {
                if symbol.get(x, y) {
                    pixels[(top + y) * width + left + x] = 0;
                }
            }
        }
    }
    BinaryBitmap::from_luminance(GrayLuminanceSource::new(pixels, width, height))
}

/// Counter-clockwise rotation by a multiple of 90 degrees
pub fn rotated(matrix: &BitMatrix, degrees: u32) -> BitMatrix {
    let mut rotated = matrix.clone();
    rotated.rotate(degrees).unwrap();
    rotated
}

/// Writer output at its natural size
pub fn encode(text: &str, format: BarcodeFormat, hints: &EncodeHints) -> BitMatrix {
    MultiFormatWriter.encode(text, format, 0, 0, hints).unwrap()
}

/// Decode a frame allowing only `format`
pub fn decode_as(image: &BinaryBitmap, format: BarcodeFormat) -> Result<ScanResult> {
    let hints = DecodeHints::default().with_formats([format]);
    MultiFormatReader::new().decode(image, &hints)
}
