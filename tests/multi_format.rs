//! Dispatch, isolation, multi-symbol search and corner detection.

mod common;

use common::{bitmap, compose, encode};
use rust_barcode::detector::WhiteRectangleDetector;
use rust_barcode::{
    BarcodeFormat, BitMatrix, DecodeError, DecodeHints, EncodeHints, GenericMultipleBarcodeReader, MultiFormatReader,
    MultiFormatWriter, MultipleBarcodeReader, Reader, ResultMetadataType, Writer,
};

#[test]
fn test_hello_at_level_m() {
    let hints = EncodeHints::default().with_error_correction("M");
    let symbol = encode("HELLO", BarcodeFormat::QrCode, &hints);
    let result = MultiFormatReader::new()
        .decode(&bitmap(&symbol, 4, 0), &DecodeHints::default())
        .unwrap();
    assert_eq!(result.text, "HELLO");
    assert_eq!(result.format, BarcodeFormat::QrCode);
    assert_eq!(result.metadata_text(ResultMetadataType::ErrorCorrectionLevel), Some("M"));
}

#[test]
fn test_qr_only_hints_ignore_code128() {
    let symbol = MultiFormatWriter
        .encode("NOT A QR CODE", BarcodeFormat::Code128, 0, 40, &EncodeHints::default())
        .unwrap();
    let image = bitmap(&symbol, 3, 0);
    let mut reader = MultiFormatReader::new();

    let qr_only = DecodeHints::default().with_formats([BarcodeFormat::QrCode]);
    assert_eq!(reader.decode(&image, &qr_only), Err(DecodeError::NotFound));
    let try_harder = qr_only.clone().with_try_harder(true);
    assert_eq!(reader.decode(&image, &try_harder), Err(DecodeError::NotFound));

    // The same frame is readable once Code 128 is allowed
    let result = reader.decode(&image, &DecodeHints::default()).unwrap();
    assert_eq!(result.text, "NOT A QR CODE");
}

#[test]
fn test_three_distinct_qr_codes() {
    let hints = EncodeHints::default();
    let symbols: Vec<BitMatrix> = ["alpha", "bravo", "charlie"]
        .into_iter()
        .map(|text| MultiFormatWriter.encode(text, BarcodeFormat::QrCode, 116, 116, &hints).unwrap())
        .collect();
    let image = compose(
        400,
        400,
        &[(&symbols[0], 0, 0), (&symbols[1], 140, 140), (&symbols[2], 280, 280)],
    );

    let mut reader = GenericMultipleBarcodeReader::new(MultiFormatReader::new());
    let results = reader.decode_multiple(&image, &DecodeHints::default()).unwrap();
    assert_eq!(results.len(), 3);
    let mut texts: Vec<&str> = results.iter().map(|r| r.text.as_str()).collect();
    texts.sort_unstable();
    assert_eq!(texts, ["alpha", "bravo", "charlie"]);
    assert!(results.iter().all(|r| r.format == BarcodeFormat::QrCode));
}

#[test]
fn test_white_rectangle_matches_square() {
    let size = 60;
    let mut image = BitMatrix::new(200, 200);
    image.set_region(70, 70, size, size).unwrap();
    let corners = WhiteRectangleDetector::new(&image).unwrap().detect().unwrap();

    let min_x = corners.iter().map(|p| p.x).fold(f32::INFINITY, f32::min);
    let max_x = corners.iter().map(|p| p.x).fold(f32::NEG_INFINITY, f32::max);
    let min_y = corners.iter().map(|p| p.y).fold(f32::INFINITY, f32::min);
    let max_y = corners.iter().map(|p| p.y).fold(f32::NEG_INFINITY, f32::max);
    // Span between the outermost black pixel centers
    let span = (size - 1) as f32;
    assert!((max_x - min_x - span).abs() <= 2.0, "width {}", max_x - min_x);
    assert!((max_y - min_y - span).abs() <= 2.0, "height {}", max_y - min_y);
    assert!((min_x - 70.0).abs() <= 2.0 && (min_y - 70.0).abs() <= 2.0);
}

#[test]
fn test_white_rectangle_blank_not_found() {
    let image = BitMatrix::new(200, 200);
    let result = WhiteRectangleDetector::new(&image).and_then(|detector| detector.detect());
    assert_eq!(result.err(), Some(DecodeError::NotFound));
}
