use std::collections::HashMap;

use super::{BarcodeFormat, Point};
use crate::pdf417::decoder::Pdf417Metadata;

/// Keys of the metadata map attached to a [`ScanResult`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultMetadataType {
    /// Unspecified format-specific data
    Other,
    /// Degrees the image was rotated counter-clockwise before decoding succeeded
    Orientation,
    /// Raw byte segments as they appeared in the symbol
    ByteSegments,
    /// Error correction level name, such as `"M"` or a PDF417 level digit
    ErrorCorrectionLevel,
    /// Number of codewords fixed by error correction
    ErrorsCorrected,
    /// Macro PDF417 fields
    Pdf417ExtraMetadata,
    /// Structured append sequence byte (index and total)
    StructuredAppendSequence,
    /// Structured append parity byte
    StructuredAppendParity,
    /// AIM symbology identifier such as `]Q1`
    SymbologyIdentifier,
}

/// Value stored under a [`ResultMetadataType`]
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    /// Integer value
    Int(i32),
    /// Text value
    Text(String),
    /// Byte segments
    ByteSegments(Vec<Vec<u8>>),
    /// Macro PDF417 block
    Pdf417(Box<Pdf417Metadata>),
}

/// Final output of a successful decode
#[derive(Debug, Clone, PartialEq)]
pub struct ScanResult {
    /// Decoded text
    pub text: String,
    /// Raw codeword bytes, when the format exposes them
    pub raw_bytes: Vec<u8>,
    /// Number of valid bits in `raw_bytes`
    pub num_bits: usize,
    /// Finder, corner or guard points in image coordinates
    pub result_points: Vec<Point>,
    /// Symbology of the decoded barcode
    pub format: BarcodeFormat,
    /// Additional format-specific data
    pub metadata: HashMap<ResultMetadataType, MetadataValue>,
}

impl ScanResult {
    /// Create a result with empty metadata
    pub fn new(text: String, raw_bytes: Vec<u8>, result_points: Vec<Point>, format: BarcodeFormat) -> Self {
        let num_bits = raw_bytes.len() * 8;
        Self {
            text,
            raw_bytes,
            num_bits,
            result_points,
            format,
            metadata: HashMap::new(),
        }
    }

    /// Insert or replace a metadata entry
    pub fn put_metadata(&mut self, key: ResultMetadataType, value: MetadataValue) {
        self.metadata.insert(key, value);
    }

    /// Merge another metadata map, replacing existing keys
    pub fn put_all_metadata(&mut self, metadata: HashMap<ResultMetadataType, MetadataValue>) {
        self.metadata.extend(metadata);
    }

    /// Integer metadata lookup
    pub fn metadata_int(&self, key: ResultMetadataType) -> Option<i32> {
        match self.metadata.get(&key) {
            Some(MetadataValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    /// Text metadata lookup
    pub fn metadata_text(&self, key: ResultMetadataType) -> Option<&str> {
        match self.metadata.get(&key) {
            Some(MetadataValue::Text(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    /// Shift every result point by `(dx, dy)`
    pub fn translate_points(&mut self, dx: f32, dy: f32) {
        for point in &mut self.result_points {
            *point = point.translate(dx, dy);
        }
    }
}

/// Output of a format decoder, before points and format are attached
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecoderResult {
    /// Corrected data codewords
    pub raw_bytes: Vec<u8>,
    /// Valid bits in `raw_bytes`
    pub num_bits: usize,
    /// Decoded text
    pub text: String,
    /// Byte-mode segments
    pub byte_segments: Vec<Vec<u8>>,
    /// Error correction level name
    pub ec_level: Option<String>,
    /// Codewords fixed by error correction
    pub errors_corrected: usize,
    /// Codewords treated as erasures
    pub erasures: usize,
    /// Structured append sequence byte, if present
    pub structured_append_sequence: Option<u8>,
    /// Structured append parity byte, if present
    pub structured_append_parity: Option<u8>,
    /// Symbology identifier modifier digit
    pub symbology_modifier: u8,
    /// Format-specific extra data
    pub other: Option<MetadataValue>,
}

impl DecoderResult {
    /// Result carrying only text and raw bytes
    pub fn new(raw_bytes: Vec<u8>, text: String) -> Self {
        let num_bits = raw_bytes.len() * 8;
        Self {
            raw_bytes,
            num_bits,
            text,
            ..Self::default()
        }
    }

    /// Convert into a [`ScanResult`], copying the diagnostic fields into metadata
    pub fn into_scan_result(self, points: Vec<Point>, format: BarcodeFormat, symbology: &str) -> ScanResult {
        let mut result = ScanResult::new(self.text, self.raw_bytes, points, format);
        result.num_bits = self.num_bits;
        if !self.byte_segments.is_empty() {
            result.put_metadata(
                ResultMetadataType::ByteSegments,
                MetadataValue::ByteSegments(self.byte_segments),
            );
        }
        if let Some(level) = self.ec_level {
            result.put_metadata(ResultMetadataType::ErrorCorrectionLevel, MetadataValue::Text(level));
        }
        result.put_metadata(
            ResultMetadataType::ErrorsCorrected,
            MetadataValue::Int((self.errors_corrected + self.erasures) as i32),
        );
        if let (Some(sequence), Some(parity)) = (self.structured_append_sequence, self.structured_append_parity) {
            result.put_metadata(ResultMetadataType::StructuredAppendSequence, MetadataValue::Int(sequence as i32));
            result.put_metadata(ResultMetadataType::StructuredAppendParity, MetadataValue::Int(parity as i32));
        }
        if let Some(MetadataValue::Pdf417(extra)) = self.other {
            result.put_metadata(ResultMetadataType::Pdf417ExtraMetadata, MetadataValue::Pdf417(extra));
        }
        result.put_metadata(
            ResultMetadataType::SymbologyIdentifier,
            MetadataValue::Text(format!("]{}{}", symbology, self.symbology_modifier)),
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_scan_result_metadata() {
        let mut decoded = DecoderResult::new(vec![0x40, 0x11], "A".to_string());
        decoded.ec_level = Some("M".to_string());
        decoded.errors_corrected = 2;
        decoded.symbology_modifier = 1;
        let result = decoded.into_scan_result(vec![Point::new(1.0, 2.0)], BarcodeFormat::QrCode, "Q");
        assert_eq!(result.text, "A");
        assert_eq!(result.num_bits, 16);
        assert_eq!(result.metadata_text(ResultMetadataType::ErrorCorrectionLevel), Some("M"));
        assert_eq!(result.metadata_int(ResultMetadataType::ErrorsCorrected), Some(2));
        assert_eq!(result.metadata_text(ResultMetadataType::SymbologyIdentifier), Some("]Q1"));
    }

    #[test]
    fn test_translate_points() {
        let mut result = ScanResult::new("x".into(), vec![], vec![Point::new(1.0, 1.0)], BarcodeFormat::Code128);
        result.translate_points(10.0, 5.0);
        assert_eq!(result.result_points[0], Point::new(11.0, 6.0));
    }
}
