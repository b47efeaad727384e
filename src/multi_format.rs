//! Hint-driven dispatch over every format reader.

use crate::binary_bitmap::BinaryBitmap;
use crate::error::{DecodeError, Result};
use crate::models::{DecodeHints, ScanResult};
use crate::reader::{Reader, ReaderKind, ReaderPlan, compile};

/// Tries each reader of a compiled plan until one decodes.
///
/// Reader instances are created on first use and kept, so state they
/// accumulate survives between calls until [`Reader::reset`].
#[derive(Default)]
pub struct MultiFormatReader {
    hints: DecodeHints,
    plan: Option<ReaderPlan>,
    readers: Vec<(ReaderKind, Box<dyn Reader + Send>)>,
}

impl MultiFormatReader {
    /// Reader with no stored plan
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile and store a plan for later [`decode_with_state`](Self::decode_with_state) calls
    pub fn set_hints(&mut self, hints: &DecodeHints) {
        self.plan = Some(compile(hints));
        self.hints = hints.clone();
    }

    /// Plan stored by the last [`set_hints`](Self::set_hints) or [`Reader::decode`]
    pub fn plan(&self) -> Option<&ReaderPlan> {
        self.plan.as_ref()
    }

    /// Decode with the stored plan, compiling one from default hints if
    /// nothing is stored yet
    pub fn decode_with_state(&mut self, image: &BinaryBitmap) -> Result<ScanResult> {
        if self.plan.is_none() {
            self.set_hints(&DecodeHints::default());
        }
        let plan = self.plan.clone().unwrap_or_default();
        let hints = self.hints.clone();
        self.decode_internal(image, &plan, &hints)
    }

    /// Decode with a plan the caller compiled and holds
    pub fn decode_with_plan(&mut self, image: &BinaryBitmap, plan: &ReaderPlan, hints: &DecodeHints) -> Result<ScanResult> {
        self.decode_internal(image, plan, hints)
    }

    fn decode_internal(&mut self, image: &BinaryBitmap, plan: &ReaderPlan, hints: &DecodeHints) -> Result<ScanResult> {
        if let Ok(result) = self.walk(image, plan, hints) {
            return Ok(result);
        }
        if hints.also_inverted {
            tracing::debug!("retrying readers on inverted image");
            return self.walk(&image.inverted(), plan, hints);
        }
        Err(DecodeError::NotFound)
    }

    fn walk(&mut self, image: &BinaryBitmap, plan: &ReaderPlan, hints: &DecodeHints) -> Result<ScanResult> {
        for &kind in plan.kinds() {
            match self.reader(kind).decode(image, hints) {
                Ok(result) => return Ok(result),
                Err(error) => tracing::debug!(reader = ?kind, %error, "reader skipped"),
            }
        }
        Err(DecodeError::NotFound)
    }

    fn reader(&mut self, kind: ReaderKind) -> &mut (dyn Reader + Send) {
        let index = match self.readers.iter().position(|(k, _)| *k == kind) {
            Some(index) => index,
            None => {
                self.readers.push((kind, kind.instantiate()));
                self.readers.len() - 1
            }
        };
        self.readers[index].1.as_mut()
    }
}

impl Reader for MultiFormatReader {
    /// Compile a plan from `hints`, store it, and decode with it
    fn decode(&mut self, image: &BinaryBitmap, hints: &DecodeHints) -> Result<ScanResult> {
        self.set_hints(hints);
        self.decode_with_state(image)
    }

    /// Reset every instantiated reader; the stored plan is kept
    fn reset(&mut self) {
        for (_, reader) in &mut self.readers {
            reader.reset();
        }
    }
}

impl std::fmt::Debug for MultiFormatReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiFormatReader")
            .field("plan", &self.plan)
            .field("readers", &self.readers.iter().map(|(kind, _)| kind).collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BarcodeFormat, BitMatrix, EncodeHints};
    use crate::utils::luminance::GrayLuminanceSource;
    use crate::writer::{MultiFormatWriter, Writer};

    fn bitmap(matrix: &BitMatrix) -> BinaryBitmap {
        let (width, height) = (matrix.width(), matrix.height());
        let mut pixels = vec![255u8; width * height];
        for y in 0..height {
            for x in 0..width {
                if matrix.get(x, y) {
                    pixels[y * width + x] = 0;
                }
            }
        }
        BinaryBitmap::from_luminance(GrayLuminanceSource::new(pixels, width, height))
    }

    fn hello_qr() -> BitMatrix {
        let hints = EncodeHints::default().with_error_correction("M");
        MultiFormatWriter
            .encode("HELLO", BarcodeFormat::QrCode, 200, 200, &hints)
            .unwrap()
    }

    #[test]
    fn test_hello_qr() {
        let result = MultiFormatReader::new()
            .decode(&bitmap(&hello_qr()), &DecodeHints::default())
            .unwrap();
        assert_eq!(result.text, "HELLO");
        assert_eq!(result.format, BarcodeFormat::QrCode);
    }

    #[test]
    fn test_format_isolation() {
        let code128 = MultiFormatWriter
            .encode("ISOLATED", BarcodeFormat::Code128, 400, 80, &EncodeHints::default())
            .unwrap();
        let image = bitmap(&code128);
        let mut reader = MultiFormatReader::new();
        let qr_only = DecodeHints::default().with_formats([BarcodeFormat::QrCode]);
        assert_eq!(reader.decode(&image, &qr_only), Err(DecodeError::NotFound));

        let result = reader.decode(&image, &DecodeHints::default()).unwrap();
        assert_eq!(result.format, BarcodeFormat::Code128);
    }

    #[test]
    fn test_decode_with_state_default_plan() {
        let mut reader = MultiFormatReader::new();
        assert!(reader.plan().is_none());
        let result = reader.decode_with_state(&bitmap(&hello_qr())).unwrap();
        assert_eq!(result.text, "HELLO");
        assert_eq!(reader.plan(), Some(&compile(&DecodeHints::default())));
    }

    #[test]
    fn test_stored_plan_survives_reset() {
        let mut reader = MultiFormatReader::new();
        reader.set_hints(&DecodeHints::default().with_formats([BarcodeFormat::Ean13]));
        reader.reset();
        assert_eq!(reader.plan().map(ReaderPlan::kinds), Some(&[ReaderKind::OneD][..]));
        assert_eq!(
            reader.decode_with_state(&bitmap(&hello_qr())),
            Err(DecodeError::NotFound)
        );
    }

    #[test]
    fn test_decode_with_plan() {
        let plan = compile(&DecodeHints::default().with_formats([BarcodeFormat::QrCode]));
        let mut reader = MultiFormatReader::new();
        let result = reader
            .decode_with_plan(&bitmap(&hello_qr()), &plan, &DecodeHints::default())
            .unwrap();
        assert_eq!(result.text, "HELLO");
        assert!(reader.plan().is_none());
    }

    #[test]
    fn test_also_inverted() {
        let mut inverted = hello_qr();
        let (width, height) = (inverted.width(), inverted.height());
        for y in 0..height {
            for x in 0..width {
                inverted.flip(x, y);
            }
        }
        let hints = DecodeHints::default()
            .with_formats([BarcodeFormat::QrCode])
            .with_also_inverted(true);
        let result = MultiFormatReader::new().decode(&bitmap(&inverted), &hints).unwrap();
        assert_eq!(result.text, "HELLO");
    }
}
