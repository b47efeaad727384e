use super::encoder;
use crate::error::EncodeError;
use crate::models::{BarcodeFormat, BitMatrix, EncodeHints};
use crate::writer::{Writer, check_request, render_matrix};

const QUIET_ZONE_SIZE: usize = 1;

/// Renders square Data Matrix symbols
#[derive(Debug, Clone, Copy, Default)]
pub struct DataMatrixWriter;

impl Writer for DataMatrixWriter {
    fn encode(
        &self,
        contents: &str,
        format: BarcodeFormat,
        width: usize,
        height: usize,
        hints: &EncodeHints,
    ) -> Result<BitMatrix, EncodeError> {
        check_request(contents, format, BarcodeFormat::DataMatrix)?;
        let symbol = encoder::encode(contents)?;
        Ok(render_matrix(&symbol, width, height, hints.margin.unwrap_or(QUIET_ZONE_SIZE)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_size() {
        let matrix = DataMatrixWriter
            .encode("A", BarcodeFormat::DataMatrix, 24, 24, &EncodeHints::default())
            .unwrap();
        // 10 modules plus quiet zone, two pixels each
        assert_eq!(matrix.width(), 24);
        assert_eq!(matrix.top_left_on_bit(), Some((2, 2)));
    }

    #[test]
    fn test_wrong_format() {
        let result = DataMatrixWriter.encode("A", BarcodeFormat::QrCode, 0, 0, &EncodeHints::default());
        assert!(matches!(result, Err(EncodeError::InvalidArgument(_))));
    }
}
