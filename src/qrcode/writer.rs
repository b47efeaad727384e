use super::decoder::ErrorCorrectionLevel;
use super::encoder;
use crate::error::EncodeError;
use crate::models::{BarcodeFormat, BitMatrix, EncodeHints};
use crate::writer::{Writer, check_request, render_matrix};

const QUIET_ZONE_SIZE: usize = 4;

/// Renders QR Codes
#[derive(Debug, Clone, Copy, Default)]
pub struct QrCodeWriter;

impl Writer for QrCodeWriter {
    fn encode(
        &self,
        contents: &str,
        format: BarcodeFormat,
        width: usize,
        height: usize,
        hints: &EncodeHints,
    ) -> Result<BitMatrix, EncodeError> {
        check_request(contents, format, BarcodeFormat::QrCode)?;
        let ec_level = match hints.error_correction.as_deref() {
            Some(name) => ErrorCorrectionLevel::from_name(name)
                .ok_or_else(|| EncodeError::InvalidArgument(format!("unknown QR error correction level {name:?}")))?,
            None => ErrorCorrectionLevel::L,
        };
        let code = encoder::encode(contents, ec_level, hints)?;
        let quiet_zone = hints.margin.unwrap_or(QUIET_ZONE_SIZE);
        Ok(render_matrix(&code.matrix.to_bit_matrix(), width, height, quiet_zone))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_quiet_zone() {
        let matrix = QrCodeWriter
            .encode("HELLO", BarcodeFormat::QrCode, 0, 0, &EncodeHints::default())
            .unwrap();
        assert_eq!(matrix.width(), 21 + 2 * QUIET_ZONE_SIZE);
        assert_eq!(matrix.top_left_on_bit(), Some((4, 4)));
    }

    #[test]
    fn test_scaled_with_margin() {
        let hints = EncodeHints::default().with_margin(1).with_error_correction("H");
        let matrix = QrCodeWriter.encode("HELLO", BarcodeFormat::QrCode, 115, 115, &hints).unwrap();
        // 23 padded modules, 5 pixels each
        assert_eq!(matrix.width(), 115);
        assert_eq!(matrix.top_left_on_bit(), Some((5, 5)));
    }

    #[test]
    fn test_rejects_bad_requests() {
        let hints = EncodeHints::default();
        assert!(QrCodeWriter.encode("", BarcodeFormat::QrCode, 10, 10, &hints).is_err());
        assert!(QrCodeWriter.encode("x", BarcodeFormat::Aztec, 10, 10, &hints).is_err());
        let hints = hints.with_error_correction("Z");
        assert!(matches!(
            QrCodeWriter.encode("x", BarcodeFormat::QrCode, 10, 10, &hints),
            Err(EncodeError::InvalidArgument(_))
        ));
    }
}
