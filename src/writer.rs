//! Writer contract, shared rendering and the format dispatcher.

use crate::aztec::AztecWriter;
use crate::datamatrix::DataMatrixWriter;
use crate::error::EncodeError;
use crate::models::{BarcodeFormat, BitMatrix, EncodeHints};
use crate::oned::{Code128Writer, Ean13Writer};
use crate::pdf417::Pdf417Writer;
use crate::qrcode::QrCodeWriter;

/// Encodes text into a rendered symbol
pub trait Writer {
    /// Encode `contents` as `format`, scaled to at least `width` × `height`
    /// pixels with a quiet zone
    fn encode(
        &self,
        contents: &str,
        format: BarcodeFormat,
        width: usize,
        height: usize,
        hints: &EncodeHints,
    ) -> Result<BitMatrix, EncodeError>;
}

/// Dispatches to the writer of the requested format
#[derive(Debug, Clone, Copy, Default)]
pub struct MultiFormatWriter;

impl Writer for MultiFormatWriter {
    fn encode(
        &self,
        contents: &str,
        format: BarcodeFormat,
        width: usize,
        height: usize,
        hints: &EncodeHints,
    ) -> Result<BitMatrix, EncodeError> {
        let writer: &dyn Writer = match format {
            BarcodeFormat::QrCode => &QrCodeWriter,
            BarcodeFormat::DataMatrix => &DataMatrixWriter,
            BarcodeFormat::Aztec => &AztecWriter,
            BarcodeFormat::Pdf417 => &Pdf417Writer,
            BarcodeFormat::Code128 => &Code128Writer,
            BarcodeFormat::Ean13 => &Ean13Writer,
            other => {
                return Err(EncodeError::InvalidArgument(format!("no encoder for {other}")));
            }
        };
        writer.encode(contents, format, width, height, hints)
    }
}

/// Reject empty contents and a format the writer does not produce
pub(crate) fn check_request(contents: &str, format: BarcodeFormat, expected: BarcodeFormat) -> Result<(), EncodeError> {
    if contents.is_empty() {
        return Err(EncodeError::InvalidArgument("found empty contents".into()));
    }
    if format != expected {
        return Err(EncodeError::InvalidArgument(format!(
            "can only encode {expected}, but got {format}"
        )));
    }
    Ok(())
}

/// Scale a module grid by the largest whole factor that fits `width` ×
/// `height` after adding `quiet_zone` modules on every side, and center it
pub(crate) fn render_matrix(code: &BitMatrix, width: usize, height: usize, quiet_zone: usize) -> BitMatrix {
    let (input_width, input_height) = (code.width(), code.height());
    let padded_width = input_width + quiet_zone * 2;
    let padded_height = input_height + quiet_zone * 2;
    let output_width = width.max(padded_width);
    let output_height = height.max(padded_height);

    let multiple = (output_width / padded_width).min(output_height / padded_height).max(1);
    let left_padding = (output_width - input_width * multiple) / 2;
    let top_padding = (output_height - input_height * multiple) / 2;

    let mut output = BitMatrix::new(output_width, output_height);
    for y in 0..input_height {
        for x in 0..input_width {
            if code.get(x, y) {
                let (ox, oy) = (left_padding + x * multiple, top_padding + y * multiple);
                for dy in 0..multiple {
                    for dx in 0..multiple {
                        output.set(ox + dx, oy + dy);
                    }
                }
            }
        }
    }
    output
}

/// Stretch a row of bars to `width` × `height`, keeping `margin` modules of
/// white on both sides
pub(crate) fn render_row(code: &[bool], width: usize, height: usize, margin: usize) -> BitMatrix {
    let full_width = code.len() + margin * 2;
    let output_width = width.max(full_width);
    let output_height = height.max(1);
    let multiple = output_width / full_width;
    let left_padding = (output_width - code.len() * multiple) / 2;

    let mut output = BitMatrix::new(output_width, output_height);
    for (x, _) in code.iter().enumerate().filter(|(_, bar)| **bar) {
        let start = left_padding + x * multiple;
        for px in start..start + multiple {
            for y in 0..output_height {
                output.set(px, y);
            }
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_matrix_scales_and_centers() {
        let mut code = BitMatrix::new(3, 3);
        code.set(0, 0);
        code.set(2, 2);
        let output = render_matrix(&code, 20, 20, 1);
        // (20 / 5) = 4 pixels per module, 4 pixels of padding
        assert_eq!(output.width(), 20);
        assert!(output.get(4, 4));
        assert!(output.get(7, 7));
        assert!(!output.get(8, 4));
        assert!(output.get(15, 15));
        assert!(!output.get(16, 16));
    }

    #[test]
    fn test_render_matrix_grows_to_fit() {
        let code = BitMatrix::new(21, 21);
        let output = render_matrix(&code, 0, 0, 4);
        assert_eq!((output.width(), output.height()), (29, 29));
    }

    #[test]
    fn test_render_row() {
        let output = render_row(&[true, false, true], 10, 2, 1);
        // 10 / 5 = 2 pixels per module, 2 pixels of padding
        assert!(output.get(2, 0) && output.get(3, 1));
        assert!(!output.get(4, 0));
        assert!(output.get(6, 1));
        assert!(!output.get(8, 0));
    }

    #[test]
    fn test_unsupported_format() {
        let result = MultiFormatWriter.encode("123", BarcodeFormat::Itf, 10, 10, &EncodeHints::default());
        assert!(matches!(result, Err(EncodeError::InvalidArgument(_))));
    }
}
