use super::decoder::Pdf417Decoder;
use super::detector;
use crate::binary_bitmap::BinaryBitmap;
use crate::error::Result;
use crate::models::{BarcodeFormat, DecodeHints, MetadataValue, ResultMetadataType, ScanResult};
use crate::reader::Reader;

/// Detects and decodes PDF417 symbols in any of the four orientations
#[derive(Debug, Clone, Copy, Default)]
pub struct Pdf417Reader;

impl Reader for Pdf417Reader {
    fn decode(&mut self, image: &BinaryBitmap, hints: &DecodeHints) -> Result<ScanResult> {
        let matrix = image.black_matrix()?;
        let detected = detector::detect(matrix)?;
        let decoded = Pdf417Decoder::default().decode(&detected.bits, &detected.vertices)?;

        let points = detected.corner_points();
        for point in &points {
            hints.report_point(*point);
        }
        let mut result = decoded.into_scan_result(points, BarcodeFormat::Pdf417, "L");
        result.put_metadata(
            ResultMetadataType::Orientation,
            MetadataValue::Int(detected.rotation as i32),
        );
        Ok(result)
    }
}
