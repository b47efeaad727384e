use super::decoder::DataMatrixDecoder;
use super::detector::Detector;
use crate::binary_bitmap::BinaryBitmap;
use crate::error::{DecodeError, Result};
use crate::models::{BarcodeFormat, BitMatrix, DecodeHints, ScanResult};
use crate::reader::Reader;

/// Detects and decodes Data Matrix symbols
#[derive(Default)]
pub struct DataMatrixReader {
    decoder: DataMatrixDecoder,
}

impl Reader for DataMatrixReader {
    fn decode(&mut self, image: &BinaryBitmap, hints: &DecodeHints) -> Result<ScanResult> {
        let matrix = image.black_matrix()?;
        let (bits, points) = if hints.pure_barcode {
            (extract_pure_bits(matrix)?, Vec::new())
        } else {
            let detected = Detector::new(matrix).detect()?;
            (detected.bits, detected.points)
        };
        for point in &points {
            hints.report_point(*point);
        }
        let decoded = self.decoder.decode(&bits)?;
        Ok(decoded.into_scan_result(points, BarcodeFormat::DataMatrix, "d"))
    }
}

/// Module grid of an unrotated symbol with nothing else dark in the image
fn extract_pure_bits(image: &BitMatrix) -> Result<BitMatrix> {
    let (left_top, right_bottom) = match (image.top_left_on_bit(), image.bottom_right_on_bit()) {
        (Some(a), Some(b)) => (a, b),
        _ => return Err(DecodeError::NotFound),
    };
    // The top-left module starts the solid left edge and the dark run of
    // the top timing edge is exactly one module wide
    let module_size = (left_top.0..image.width())
        .find(|&x| !image.get(x, left_top.1))
        .ok_or(DecodeError::NotFound)?
        - left_top.0;
    if module_size == 0 {
        return Err(DecodeError::NotFound);
    }

    let (left, top) = left_top;
    let (right, bottom) = right_bottom;
    if right < left || bottom < top {
        return Err(DecodeError::NotFound);
    }
    let matrix_width = (right - left + 1) / module_size;
    let matrix_height = (bottom - top + 1) / module_size;
    if matrix_width == 0 || matrix_height == 0 {
        return Err(DecodeError::NotFound);
    }

    let nudge = module_size / 2;
    let (left, top) = (left + nudge, top + nudge);
    let mut bits = BitMatrix::new(matrix_width, matrix_height);
    for y in 0..matrix_height {
        let i_offset = top + y * module_size;
        for x in 0..matrix_width {
            if image.get(left + x * module_size, i_offset) {
                bits.set(x, y);
            }
        }
    }
    Ok(bits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datamatrix::encoder;
    use crate::models::ResultMetadataType;
    use crate::utils::luminance::GrayLuminanceSource;

    fn render(code: &BitMatrix, scale: usize, quiet: usize) -> BinaryBitmap {
        let width = (code.width() + 2 * quiet) * scale;
        let height = (code.height() + 2 * quiet) * scale;
        let mut pixels = vec![255u8; width * height];
        for y in 0..code.height() * scale {
            for x in 0..code.width() * scale {
                if code.get(x / scale, y / scale) {
                    pixels[(y + quiet * scale) * width + x + quiet * scale] = 0;
                }
            }
        }
        BinaryBitmap::from_luminance(GrayLuminanceSource::new(pixels, width, height))
    }

    #[test]
    fn test_pure_barcode() {
        let code = encoder::encode("Hello, Data Matrix").unwrap();
        let bitmap = render(&code, 3, 2);
        let hints = DecodeHints::default().with_pure_barcode(true);
        let result = DataMatrixReader::default().decode(&bitmap, &hints).unwrap();
        assert_eq!(result.text, "Hello, Data Matrix");
        assert_eq!(result.format, BarcodeFormat::DataMatrix);
        assert_eq!(result.metadata_text(ResultMetadataType::SymbologyIdentifier), Some("]d1"));
    }

    #[test]
    fn test_detected() {
        let code = encoder::encode("ABC 1234567890").unwrap();
        let bitmap = render(&code, 5, 4);
        let result = DataMatrixReader::default().decode(&bitmap, &DecodeHints::default()).unwrap();
        assert_eq!(result.text, "ABC 1234567890");
        assert_eq!(result.result_points.len(), 4);
    }

    #[test]
    fn test_rotated_detected() {
        let mut code = encoder::encode("rotated symbol").unwrap();
        code.rotate90();
        let bitmap = render(&code, 4, 4);
        let result = DataMatrixReader::default().decode(&bitmap, &DecodeHints::default()).unwrap();
        assert_eq!(result.text, "rotated symbol");
    }

    #[test]
    fn test_blank() {
        let bitmap = BinaryBitmap::from_luminance(GrayLuminanceSource::new(vec![255; 80 * 80], 80, 80));
        assert_eq!(
            DataMatrixReader::default().decode(&bitmap, &DecodeHints::default()),
            Err(DecodeError::NotFound)
        );
    }
}
