//! Encode, render, optionally rotate, then decode through the public API.

mod common;

use common::{bitmap, decode_as, encode, rotated};
use proptest::prelude::*;
use rust_barcode::{BarcodeFormat, EncodeHints, MultiFormatWriter, ResultMetadataType, Writer};

const ROTATIONS: [u32; 4] = [0, 90, 180, 270];

fn round_trip_2d(text: &str, format: BarcodeFormat, degrees: u32) -> String {
    let hints = EncodeHints::default().with_margin(2);
    let symbol = rotated(&encode(text, format, &hints), degrees);
    decode_as(&bitmap(&symbol, 4, 2), format)
        .unwrap_or_else(|e| panic!("{format} {text:?} at {degrees}: {e}"))
        .text
}

#[test]
fn test_qr_code_all_rotations() {
    for degrees in ROTATIONS {
        assert_eq!(round_trip_2d("QR at every angle", BarcodeFormat::QrCode, degrees), "QR at every angle");
    }
}

#[test]
fn test_qr_with_finder_lookalike_in_data() {
    // The data region holds a 1:1:3:1:1 run between the top finders
    let text = "YC$eW/o6].fkud%ot&jd$~&0@/H=`R-:ET.**T";
    let symbol = encode(text, BarcodeFormat::QrCode, &EncodeHints::default());
    for scale in [3, 4, 5] {
        for quiet in [0, 2, 4] {
            let result = decode_as(&bitmap(&symbol, scale, quiet), BarcodeFormat::QrCode)
                .unwrap_or_else(|e| panic!("scale {scale} quiet {quiet}: {e}"));
            assert_eq!(result.text, text);
        }
    }
    for degrees in ROTATIONS {
        assert_eq!(round_trip_2d(text, BarcodeFormat::QrCode, degrees), text);
    }
}

#[test]
fn test_data_matrix_all_rotations() {
    for degrees in ROTATIONS {
        assert_eq!(round_trip_2d("DataMatrix 2024", BarcodeFormat::DataMatrix, degrees), "DataMatrix 2024");
    }
}

#[test]
fn test_aztec_all_rotations() {
    for degrees in ROTATIONS {
        assert_eq!(round_trip_2d("Aztec: bullseye!", BarcodeFormat::Aztec, degrees), "Aztec: bullseye!");
    }
}

#[test]
fn test_pdf417_upright_and_upside_down() {
    let text = "PDF417 stacks rows; 1234567890 numbers too.";
    for degrees in [0, 180] {
        let symbol = rotated(&encode(text, BarcodeFormat::Pdf417, &EncodeHints::default()), degrees);
        let result = decode_as(&bitmap(&symbol, 3, 2), BarcodeFormat::Pdf417).unwrap();
        assert_eq!(result.text, text);
        assert_eq!(result.metadata_int(ResultMetadataType::Orientation), Some(degrees as i32));
    }
}

#[test]
fn test_code128_upright_and_upside_down() {
    let text = "Code-128 #42";
    for degrees in [0, 180] {
        let symbol = MultiFormatWriter
            .encode(text, BarcodeFormat::Code128, 0, 30, &EncodeHints::default())
            .unwrap();
        let result = decode_as(&bitmap(&rotated(&symbol, degrees), 3, 0), BarcodeFormat::Code128).unwrap();
        assert_eq!(result.text, text);
        assert_eq!(result.format, BarcodeFormat::Code128);
    }
}

#[test]
fn test_ean13_upright_and_upside_down() {
    for degrees in [0, 180] {
        let symbol = MultiFormatWriter
            .encode("590123412345", BarcodeFormat::Ean13, 0, 30, &EncodeHints::default())
            .unwrap();
        let result = decode_as(&bitmap(&rotated(&symbol, degrees), 3, 0), BarcodeFormat::Ean13).unwrap();
        assert_eq!(result.text, "5901234123457");
        assert_eq!(result.format, BarcodeFormat::Ean13);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn prop_qr_round_trip(text in "[ -~]{1,40}", turn in 0usize..4) {
        prop_assert_eq!(round_trip_2d(&text, BarcodeFormat::QrCode, ROTATIONS[turn]), text);
    }

    #[test]
    fn prop_data_matrix_round_trip(text in "[ -~]{1,30}", turn in 0usize..4) {
        prop_assert_eq!(round_trip_2d(&text, BarcodeFormat::DataMatrix, ROTATIONS[turn]), text);
    }

    #[test]
    fn prop_aztec_round_trip(text in "[ -~]{1,30}", turn in 0usize..4) {
        prop_assert_eq!(round_trip_2d(&text, BarcodeFormat::Aztec, ROTATIONS[turn]), text);
    }
}
