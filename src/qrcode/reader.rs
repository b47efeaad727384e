use super::decoder::QrDecoder;
use super::detector::Detector;
use crate::binary_bitmap::BinaryBitmap;
use crate::error::{DecodeError, Result};
use crate::models::{BarcodeFormat, BitMatrix, DecodeHints, ScanResult};
use crate::reader::Reader;

/// Detects and decodes QR Codes
#[derive(Default)]
pub struct QrCodeReader {
    decoder: QrDecoder,
}

impl Reader for QrCodeReader {
    fn decode(&mut self, image: &BinaryBitmap, hints: &DecodeHints) -> Result<ScanResult> {
        let matrix = image.black_matrix()?;
        let (decoded, mut points) = if hints.pure_barcode {
            let bits = extract_pure_bits(matrix)?;
            (self.decoder.decode(&bits, hints.character_set)?, Vec::new())
        } else {
            let detector = Detector::new(matrix);
            let detected = detector.detect(hints)?;
            match self.decoder.decode(&detected.bits, hints.character_set) {
                Ok(decoded) => (decoded, detected.points),
                Err(error) => {
                    tracing::debug!(%error, "QR decode failed, retrying with every row scanned");
                    let retry = detector.detect_exhaustive(hints).map_err(|_| error.clone())?;
                    if retry.bits == detected.bits {
                        return Err(error);
                    }
                    (self.decoder.decode(&retry.bits, hints.character_set)?, retry.points)
                }
            }
        };

        // Bottom-left and top-right trade places in a mirrored symbol
        if decoded.mirrored && points.len() >= 3 {
            points.swap(0, 2);
        }
        Ok(decoded.result.into_scan_result(points, BarcodeFormat::QrCode, "Q"))
    }
}

/// Read the module grid of an unrotated symbol that is the only dark content
/// in the image
fn extract_pure_bits(image: &BitMatrix) -> Result<BitMatrix> {
    let (left_top, right_bottom) = match (image.top_left_on_bit(), image.bottom_right_on_bit()) {
        (Some(a), Some(b)) => (a, b),
        _ => return Err(DecodeError::NotFound),
    };
    let module_size = module_size(left_top, image)?;

    let (mut left, mut top) = (left_top.0 as i64, left_top.1 as i64);
    let (mut right, bottom) = (right_bottom.0 as i64, right_bottom.1 as i64);
    if left >= right || top >= bottom {
        return Err(DecodeError::NotFound);
    }
    if bottom - top != right - left {
        // Only square symbols; a stray pixel to the right is ignored
        right = left + (bottom - top);
        if right >= image.width() as i64 {
            return Err(DecodeError::NotFound);
        }
    }

    let matrix_width = ((right - left + 1) as f32 / module_size).round() as i64;
    let matrix_height = ((bottom - top + 1) as f32 / module_size).round() as i64;
    if matrix_width <= 0 || matrix_height <= 0 || matrix_width != matrix_height {
        return Err(DecodeError::NotFound);
    }

    let nudge = (module_size / 2.0) as i64;
    top += nudge;
    left += nudge;
    let too_far_right = left + ((matrix_width - 1) as f32 * module_size) as i64 - right;
    if too_far_right > 0 {
        if too_far_right > nudge {
            return Err(DecodeError::NotFound);
        }
        left -= too_far_right;
    }
    let too_far_down = top + ((matrix_height - 1) as f32 * module_size) as i64 - bottom;
    if too_far_down > 0 {
        if too_far_down > nudge {
            return Err(DecodeError::NotFound);
        }
        top -= too_far_down;
    }

    let dimension = matrix_width as usize;
    let mut bits = BitMatrix::square(dimension);
    for y in 0..dimension {
        let i_offset = top + (y as f32 * module_size) as i64;
        for x in 0..dimension {
            let j_offset = left + (x as f32 * module_size) as i64;
            if image.get_i(j_offset as i32, i_offset as i32) {
                bits.set(x, y);
            }
        }
    }
    Ok(bits)
}

/// Walk the diagonal of the top-left finder pattern across its five edges
fn module_size(left_top: (usize, usize), image: &BitMatrix) -> Result<f32> {
    let (width, height) = (image.width(), image.height());
    let (mut x, mut y) = left_top;
    let mut in_black = true;
    let mut transitions = 0;
    while x < width && y < height {
        if in_black != image.get(x, y) {
            transitions += 1;
            if transitions == 5 {
                break;
            }
            in_black = !in_black;
        }
        x += 1;
        y += 1;
    }
    if x == width || y == height {
        return Err(DecodeError::NotFound);
    }
    Ok((x - left_top.0) as f32 / 7.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EncodeHints, ResultMetadataType};
    use crate::qrcode::decoder::ErrorCorrectionLevel;
    use crate::qrcode::encoder;
    use crate::utils::luminance::GrayLuminanceSource;

    fn render(code: &BitMatrix, scale: usize, quiet: usize) -> BinaryBitmap {
        let size = (code.width() + 2 * quiet) * scale;
        let mut pixels = vec![255u8; size * size];
        for y in 0..code.height() {
            for x in 0..code.width() {
                if code.get(x, y) {
                    for dy in 0..scale {
                        for dx in 0..scale {
                            pixels[((y + quiet) * scale + dy) * size + (x + quiet) * scale + dx] = 0;
                        }
                    }
                }
            }
        }
        BinaryBitmap::from_luminance(GrayLuminanceSource::new(pixels, size, size))
    }

    fn hello_matrix() -> BitMatrix {
        encoder::encode("HELLO", ErrorCorrectionLevel::M, &EncodeHints::default())
            .unwrap()
            .matrix
            .to_bit_matrix()
    }

    #[test]
    fn test_extract_pure_bits() {
        let code = hello_matrix();
        let bitmap = render(&code, 3, 2);
        let extracted = extract_pure_bits(bitmap.black_matrix().unwrap()).unwrap();
        assert_eq!(extracted, code);
    }

    #[test]
    fn test_pure_barcode_decode() {
        let bitmap = render(&hello_matrix(), 4, 4);
        let hints = DecodeHints::default().with_pure_barcode(true);
        let result = QrCodeReader::default().decode(&bitmap, &hints).unwrap();
        assert_eq!(result.text, "HELLO");
        assert!(result.result_points.is_empty());
    }

    #[test]
    fn test_detected_decode() {
        let bitmap = render(&hello_matrix(), 4, 4);
        let result = QrCodeReader::default().decode(&bitmap, &DecodeHints::default()).unwrap();
        assert_eq!(result.text, "HELLO");
        assert_eq!(result.format, BarcodeFormat::QrCode);
        assert_eq!(result.metadata_text(ResultMetadataType::ErrorCorrectionLevel), Some("M"));
        assert_eq!(result.metadata_text(ResultMetadataType::SymbologyIdentifier), Some("]Q1"));
        assert_eq!(result.result_points.len(), 3);
        // Bottom-left finder sits below the top-left one
        assert!(result.result_points[0].y > result.result_points[1].y);
    }

    #[test]
    fn test_mirrored_points_swapped() {
        let bitmap = render(&hello_matrix().transpose(), 4, 4);
        let result = QrCodeReader::default().decode(&bitmap, &DecodeHints::default()).unwrap();
        assert_eq!(result.text, "HELLO");
        // Corners name the true symbol corners: bottom-left is now to the right
        assert!(result.result_points[0].x > result.result_points[1].x);
    }

    #[test]
    fn test_blank_not_found() {
        let bitmap = BinaryBitmap::from_luminance(GrayLuminanceSource::new(vec![255; 100 * 100], 100, 100));
        let hints = DecodeHints::default().with_pure_barcode(true);
        assert_eq!(
            QrCodeReader::default().decode(&bitmap, &hints),
            Err(DecodeError::NotFound)
        );
    }

    #[test]
    fn test_rescans_after_false_finder() {
        let text = "YC$eW/o6].fkud%ot&jd$~&0@/H=`R-:ET.**T";
        let code = encoder::encode(text, ErrorCorrectionLevel::L, &EncodeHints::default())
            .unwrap()
            .matrix
            .to_bit_matrix();
        let result = QrCodeReader::default().decode(&render(&code, 4, 2), &DecodeHints::default()).unwrap();
        assert_eq!(result.text, text);
    }
}
