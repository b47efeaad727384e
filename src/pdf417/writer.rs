use super::encoder::{self, DEFAULT_EC_LEVEL};
use crate::error::EncodeError;
use crate::models::{BarcodeFormat, BitMatrix, EncodeHints};
use crate::writer::{Writer, check_request, render_matrix};

const QUIET_ZONE_SIZE: usize = 2;
// Module rows per symbol row
const ROW_HEIGHT: usize = 4;

/// Renders PDF417 symbols
#[derive(Debug, Clone, Copy, Default)]
pub struct Pdf417Writer;

impl Writer for Pdf417Writer {
    fn encode(
        &self,
        contents: &str,
        format: BarcodeFormat,
        width: usize,
        height: usize,
        hints: &EncodeHints,
    ) -> Result<BitMatrix, EncodeError> {
        check_request(contents, format, BarcodeFormat::Pdf417)?;
        let ec_level = match hints.error_correction.as_deref() {
            Some(value) => value
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|level| *level <= 8)
                .ok_or_else(|| EncodeError::InvalidArgument(format!("bad PDF417 error correction {value:?}")))?,
            None => DEFAULT_EC_LEVEL,
        };
        let code = encoder::encode(contents, hints.character_set, ec_level)?;
        tracing::trace!(columns = code.columns, rows = code.rows, ec_level, "PDF417 encoded");
        Ok(render_matrix(
            &code.to_bit_matrix(ROW_HEIGHT),
            width,
            height,
            hints.margin.unwrap_or(QUIET_ZONE_SIZE),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_natural_size() {
        let code = encoder::encode("PDF", None, DEFAULT_EC_LEVEL).unwrap();
        let matrix = Pdf417Writer
            .encode("PDF", BarcodeFormat::Pdf417, 0, 0, &EncodeHints::default())
            .unwrap();
        assert_eq!(matrix.width(), 17 * (code.columns + 4) + 1 + 2 * QUIET_ZONE_SIZE);
        assert_eq!(matrix.height(), code.rows * ROW_HEIGHT + 2 * QUIET_ZONE_SIZE);
        assert_eq!(matrix.top_left_on_bit(), Some((QUIET_ZONE_SIZE, QUIET_ZONE_SIZE)));
    }

    #[test]
    fn test_error_correction_hint() {
        let low = Pdf417Writer
            .encode("level", BarcodeFormat::Pdf417, 0, 0, &EncodeHints::default().with_error_correction("0"))
            .unwrap();
        let high = Pdf417Writer
            .encode("level", BarcodeFormat::Pdf417, 0, 0, &EncodeHints::default().with_error_correction("5"))
            .unwrap();
        assert!(high.width() * high.height() > low.width() * low.height());

        let bad = Pdf417Writer.encode("level", BarcodeFormat::Pdf417, 0, 0, &EncodeHints::default().with_error_correction("9"));
        assert!(matches!(bad, Err(EncodeError::InvalidArgument(_))));
    }

    #[test]
    fn test_wrong_format() {
        let result = Pdf417Writer.encode("A", BarcodeFormat::Aztec, 0, 0, &EncodeHints::default());
        assert!(matches!(result, Err(EncodeError::InvalidArgument(_))));
    }
}
