use super::encoder::{self, DEFAULT_EC_PERCENT};
use crate::error::EncodeError;
use crate::models::{BarcodeFormat, BitMatrix, EncodeHints};
use crate::writer::{Writer, check_request, render_matrix};

const QUIET_ZONE_SIZE: usize = 1;

/// Renders Aztec symbols
#[derive(Debug, Clone, Copy, Default)]
pub struct AztecWriter;

impl Writer for AztecWriter {
    fn encode(
        &self,
        contents: &str,
        format: BarcodeFormat,
        width: usize,
        height: usize,
        hints: &EncodeHints,
    ) -> Result<BitMatrix, EncodeError> {
        check_request(contents, format, BarcodeFormat::Aztec)?;
        let ec_percent = match hints.error_correction.as_deref() {
            Some(value) => value
                .trim_end_matches('%')
                .parse::<usize>()
                .ok()
                .filter(|p| *p < 100)
                .ok_or_else(|| EncodeError::InvalidArgument(format!("bad Aztec error correction {value:?}")))?,
            None => DEFAULT_EC_PERCENT,
        };
        let bits = encoder::encode_high_level(contents, hints.character_set)?;
        let code = encoder::encode(&bits, ec_percent, hints.aztec_layers.unwrap_or(0))?;
        Ok(render_matrix(&code.matrix, width, height, hints.margin.unwrap_or(QUIET_ZONE_SIZE)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_render() {
        let matrix = AztecWriter
            .encode("AZTEC", BarcodeFormat::Aztec, 0, 0, &EncodeHints::default())
            .unwrap();
        assert_eq!(matrix.width(), 15 + 2 * QUIET_ZONE_SIZE);
    }

    #[test]
    fn test_error_correction_hint() {
        let text = "AZTEC CODE ERROR CORRECTION";
        let default = AztecWriter
            .encode(text, BarcodeFormat::Aztec, 0, 0, &EncodeHints::default())
            .unwrap();
        let hints = EncodeHints::default().with_error_correction("90%");
        let strong = AztecWriter.encode(text, BarcodeFormat::Aztec, 0, 0, &hints).unwrap();
        assert!(strong.width() > default.width());
        let hints = EncodeHints::default().with_error_correction("lots");
        assert!(AztecWriter.encode("AZTEC", BarcodeFormat::Aztec, 0, 0, &hints).is_err());
    }
}
