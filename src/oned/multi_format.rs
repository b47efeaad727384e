use super::{Code39Reader, Code128Reader, ItfReader, OneDReader, UpcEanReader};
use crate::error::{DecodeError, Result};
use crate::models::{BarcodeFormat, BitArray, DecodeHints, ScanResult};

/// Every linear reader whose format the hints allow, tried in turn on each row
#[derive(Debug, Clone, Copy, Default)]
pub struct MultiFormatOneDReader {
    upc_ean: UpcEanReader,
    code39: Code39Reader,
    code128: Code128Reader,
    itf: ItfReader,
}

impl OneDReader for MultiFormatOneDReader {
    fn decode_row(&mut self, row_number: usize, row: &BitArray, hints: &DecodeHints) -> Result<ScanResult> {
        if [BarcodeFormat::Ean13, BarcodeFormat::UpcA, BarcodeFormat::Ean8]
            .into_iter()
            .any(|format| hints.allows(format))
            && let Ok(result) = self.upc_ean.decode_row(row_number, row, hints)
        {
            return Ok(result);
        }
        if hints.allows(BarcodeFormat::Code39)
            && let Ok(result) = self.code39.decode_row(row_number, row, hints)
        {
            return Ok(result);
        }
        if hints.allows(BarcodeFormat::Code128)
            && let Ok(result) = self.code128.decode_row(row_number, row, hints)
        {
            return Ok(result);
        }
        if hints.allows(BarcodeFormat::Itf)
            && let Ok(result) = self.itf.decode_row(row_number, row, hints)
        {
            return Ok(result);
        }
        Err(DecodeError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oned::code128_writer;
    use crate::oned::test_rows::row_from_modules;

    #[test]
    fn test_dispatch_by_symbology() {
        let mut reader = MultiFormatOneDReader::default();
        let code128 = row_from_modules(&code128_writer::encode("mixed 123").unwrap(), 2, 30);
        let result = reader.decode_row(0, &code128, &DecodeHints::default()).unwrap();
        assert_eq!(result.format, BarcodeFormat::Code128);

        let ean = row_from_modules(&crate::oned::ean13_writer::encode("400638133393").unwrap(), 2, 30);
        let result = reader.decode_row(0, &ean, &DecodeHints::default()).unwrap();
        assert_eq!(result.format, BarcodeFormat::Ean13);
        assert_eq!(result.text, "4006381333931");
    }

    #[test]
    fn test_respects_possible_formats() {
        let mut reader = MultiFormatOneDReader::default();
        let row = row_from_modules(&code128_writer::encode("only 128").unwrap(), 2, 30);
        let hints = DecodeHints::default().with_formats([BarcodeFormat::Itf, BarcodeFormat::Ean13]);
        assert_eq!(reader.decode_row(0, &row, &hints), Err(DecodeError::NotFound));
    }

    #[test]
    fn test_blank_row() {
        let row = BitArray::with_size(200);
        assert_eq!(
            MultiFormatOneDReader::default().decode_row(0, &row, &DecodeHints::default()),
            Err(DecodeError::NotFound)
        );
    }
}
