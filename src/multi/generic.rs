use super::MultipleBarcodeReader;
use crate::binary_bitmap::BinaryBitmap;
use crate::config;
use crate::error::{DecodeError, Result};
use crate::models::{DecodeHints, ScanResult};
use crate::reader::Reader;

/// Finds several symbols by decoding once, then searching the regions left,
/// above, right of and below the symbol just found.
///
/// Recursion stops at `BARCODE_MULTI_MAX_DEPTH` levels or when a region is
/// smaller than `BARCODE_MULTI_MIN_DIMENSION` pixels. Results with the same
/// text are reported once.
#[derive(Debug, Default)]
pub struct GenericMultipleBarcodeReader<R> {
    delegate: R,
}

impl<R: Reader> GenericMultipleBarcodeReader<R> {
    /// Wrap `delegate`
    pub fn new(delegate: R) -> Self {
        Self { delegate }
    }

    fn decode_region(
        &mut self,
        image: &BinaryBitmap,
        hints: &DecodeHints,
        results: &mut Vec<ScanResult>,
        offset: (usize, usize),
        depth: usize,
    ) {
        if depth > config::multi_max_depth() {
            return;
        }
        let mut result = match self.delegate.decode(image, hints) {
            Ok(result) => result,
            Err(error) => {
                tracing::trace!(depth, x = offset.0, y = offset.1, %error, "region empty");
                return;
            }
        };

        let points = result.result_points.clone();
        if !results.iter().any(|found| found.text == result.text) {
            result.translate_points(offset.0 as f32, offset.1 as f32);
            tracing::debug!(depth, text = %result.text, format = %result.format, "found symbol");
            results.push(result);
        }
        if points.is_empty() {
            return;
        }

        let (width, height) = (image.width(), image.height());
        let (mut min_x, mut min_y) = (width as f32, height as f32);
        let (mut max_x, mut max_y) = (0.0f32, 0.0f32);
        for point in &points {
            min_x = min_x.min(point.x);
            min_y = min_y.min(point.y);
            max_x = max_x.max(point.x);
            max_y = max_y.max(point.y);
        }
        let (min_x, min_y) = (min_x.max(0.0) as usize, min_y.max(0.0) as usize);
        let (max_x, max_y) = (max_x.max(0.0) as usize, max_y.max(0.0) as usize);
        let min_dimension = config::multi_min_dimension();

        let regions = [
            (min_x > min_dimension).then_some((0, 0, min_x, height)),
            (min_y > min_dimension).then_some((0, 0, width, min_y)),
            (max_x + min_dimension < width).then_some((max_x, 0, width - max_x, height)),
            (max_y + min_dimension < height).then_some((0, max_y, width, height - max_y)),
        ];
        for (left, top, region_width, region_height) in regions.into_iter().flatten() {
            if let Some(region) = image.crop(left, top, region_width, region_height) {
                self.decode_region(&region, hints, results, (offset.0 + left, offset.1 + top), depth + 1);
            }
        }
    }
}

impl<R: Reader> MultipleBarcodeReader for GenericMultipleBarcodeReader<R> {
    fn decode_multiple(&mut self, image: &BinaryBitmap, hints: &DecodeHints) -> Result<Vec<ScanResult>> {
        let mut results = Vec::new();
        self.decode_region(image, hints, &mut results, (0, 0), 0);
        if results.is_empty() {
            return Err(DecodeError::NotFound);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BarcodeFormat, BitMatrix, EncodeHints};
    use crate::multi_format::MultiFormatReader;
    use crate::qrcode::QrCodeWriter;
    use crate::utils::luminance::GrayLuminanceSource;
    use crate::writer::Writer;

    /// Paste each symbol with its top-left corner at the given offset
    fn compose(width: usize, height: usize, symbols: &[(&BitMatrix, usize, usize)]) -> BinaryBitmap {
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

    fn qr(text: &str) -> BitMatrix {
        QrCodeWriter
            .encode(text, BarcodeFormat::QrCode, 116, 116, &EncodeHints::default())
            .unwrap()
    }

    #[test]
    fn test_three_symbols() {
        let (first, second, third) = (qr("FIRST"), qr("SECOND"), qr("THIRD"));
        let image = compose(400, 400, &[(&first, 0, 0), (&second, 140, 140), (&third, 280, 280)]);
        let mut reader = GenericMultipleBarcodeReader::new(MultiFormatReader::new());
        let hints = DecodeHints::default().with_formats([BarcodeFormat::QrCode]);
        let results = reader.decode_multiple(&image, &hints).unwrap();

        let mut texts: Vec<&str> = results.iter().map(|r| r.text.as_str()).collect();
        texts.sort_unstable();
        assert_eq!(texts, ["FIRST", "SECOND", "THIRD"]);
        // Points are in full-image coordinates
        let third = results.iter().find(|r| r.text == "THIRD").unwrap();
        assert!(third.result_points.iter().all(|p| p.x > 280.0 && p.y > 280.0));
    }

    #[test]
    fn test_blank_not_found() {
        let image = compose(200, 200, &[]);
        let mut reader = GenericMultipleBarcodeReader::new(MultiFormatReader::new());
        assert_eq!(
            reader.decode_multiple(&image, &DecodeHints::default()),
            Err(DecodeError::NotFound)
        );
    }
}
