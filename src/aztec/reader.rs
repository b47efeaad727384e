use super::decoder;
use super::detector::Detector;
use crate::binary_bitmap::BinaryBitmap;
use crate::error::Result;
use crate::models::{BarcodeFormat, DecodeHints, DecoderResult, Point, ScanResult};
use crate::reader::Reader;

/// Detects and decodes Aztec symbols, retrying as a mirror image
#[derive(Debug, Clone, Copy, Default)]
pub struct AztecReader;

impl Reader for AztecReader {
    fn decode(&mut self, image: &BinaryBitmap, hints: &DecodeHints) -> Result<ScanResult> {
        let matrix = image.black_matrix()?;
        let mut detector = Detector::new(matrix);
        let (points, decoded) = match detect_and_decode(&mut detector, false) {
            Ok(found) => found,
            Err(first) => {
                tracing::debug!(error = %first, "Aztec retry as mirror image");
                detect_and_decode(&mut detector, true).map_err(|_| first)?
            }
        };
        for point in &points {
            hints.report_point(*point);
        }
        Ok(decoded.into_scan_result(points, BarcodeFormat::Aztec, "z"))
    }
}

fn detect_and_decode(detector: &mut Detector<'_>, mirror: bool) -> Result<(Vec<Point>, DecoderResult)> {
    let detected = detector.detect(mirror)?;
    let decoded = decoder::decode(&detected)?;
    Ok((detected.points, decoded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aztec::encoder;
    use crate::error::DecodeError;
    use crate::models::{BitMatrix, ResultMetadataType};
    use crate::utils::luminance::GrayLuminanceSource;

    fn render(code: &BitMatrix, scale: usize, quiet: usize) -> BinaryBitmap {
        let size = (code.width() + 2 * quiet) * scale;
        let mut pixels = vec![255u8; size * size];
        for y in 0..code.height() * scale {
            for x in 0..code.width() * scale {
                if code.get(x / scale, y / scale) {
                    pixels[(y + quiet * scale) * size + x + quiet * scale] = 0;
                }
            }
        }
        BinaryBitmap::from_luminance(GrayLuminanceSource::new(pixels, size, size))
    }

    fn symbol(text: &str) -> BitMatrix {
        let bits = encoder::encode_high_level(text, None).unwrap();
        encoder::encode(&bits, encoder::DEFAULT_EC_PERCENT, 0).unwrap().matrix
    }

    #[test]
    fn test_compact_symbol() {
        let bitmap = render(&symbol("Aztec Code"), 4, 3);
        let result = AztecReader.decode(&bitmap, &DecodeHints::default()).unwrap();
        assert_eq!(result.text, "Aztec Code");
        assert_eq!(result.format, BarcodeFormat::Aztec);
        assert_eq!(result.result_points.len(), 4);
        assert_eq!(result.metadata_text(ResultMetadataType::SymbologyIdentifier), Some("]z0"));
        assert!(result.metadata_text(ResultMetadataType::ErrorCorrectionLevel).is_some());
    }

    #[test]
    fn test_full_symbol_rotated() {
        let text = "Full-range Aztec symbols carry a reference grid every 16 modules.";
        let mut code = symbol(text);
        code.rotate180();
        let bitmap = render(&code, 3, 4);
        let result = AztecReader.decode(&bitmap, &DecodeHints::default()).unwrap();
        assert_eq!(result.text, text);
    }

    #[test]
    fn test_mirrored_symbol() {
        let code = symbol("mirror").transpose();
        let bitmap = render(&code, 4, 3);
        let result = AztecReader.decode(&bitmap, &DecodeHints::default()).unwrap();
        assert_eq!(result.text, "mirror");
    }

    #[test]
    fn test_blank() {
        let bitmap = BinaryBitmap::from_luminance(GrayLuminanceSource::new(vec![255; 64 * 64], 64, 64));
        assert_eq!(
            AztecReader.decode(&bitmap, &DecodeHints::default()),
            Err(DecodeError::NotFound)
        );
    }
}
