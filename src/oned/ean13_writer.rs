use super::append_widths;
use super::upc_ean::{FIRST_DIGIT_ENCODINGS, L_PATTERNS, MIDDLE_PATTERN, START_END_PATTERN, standard_checksum};
use crate::error::EncodeError;
use crate::models::{BarcodeFormat, BitMatrix, EncodeHints};
use crate::writer::{Writer, check_request, render_row};

const DEFAULT_MARGIN: usize = 10;
const CODE_WIDTH: usize = 3 + 7 * 6 + 5 + 7 * 6 + 3;

/// Renders EAN-13 from 12 digits, or 13 with a valid check digit
#[derive(Debug, Clone, Copy, Default)]
pub struct Ean13Writer;

impl Writer for Ean13Writer {
    fn encode(
        &self,
        contents: &str,
        format: BarcodeFormat,
        width: usize,
        height: usize,
        hints: &EncodeHints,
    ) -> Result<BitMatrix, EncodeError> {
        check_request(contents, format, BarcodeFormat::Ean13)?;
        let code = encode(contents)?;
        Ok(render_row(&code, width, height, hints.margin.unwrap_or(DEFAULT_MARGIN)))
    }
}

/// Modules of the 95-module symbol
pub(crate) fn encode(contents: &str) -> Result<Vec<bool>, EncodeError> {
    if let Some(c) = contents.chars().find(|c| !c.is_ascii_digit()) {
        return Err(EncodeError::UnsupportedChar(c));
    }
    let digits = match contents.len() {
        12 => {
            let check = standard_checksum(contents).unwrap_or(0);
            format!("{contents}{check}")
        }
        13 => {
            if standard_checksum(&contents[..12]) != contents[12..].chars().next().and_then(|c| c.to_digit(10)) {
                return Err(EncodeError::InvalidArgument("contents do not pass checksum".into()));
            }
            contents.to_string()
        }
        n => {
            return Err(EncodeError::InvalidArgument(format!(
                "requested contents should be 12 or 13 digits long, but got {n}"
            )));
        }
    };

    let digits: Vec<usize> = digits.bytes().map(|b| (b - b'0') as usize).collect();
    let parities = FIRST_DIGIT_ENCODINGS[digits[0]];
    let mut code = Vec::with_capacity(CODE_WIDTH);
    append_widths(&mut code, &START_END_PATTERN, true);
    for (i, &digit) in digits[1..7].iter().enumerate() {
        let mut widths = L_PATTERNS[digit];
        if (parities >> (5 - i)) & 1 == 1 {
            widths.reverse();
        }
        append_widths(&mut code, &widths, false);
    }
    append_widths(&mut code, &MIDDLE_PATTERN, false);
    for &digit in &digits[7..] {
        append_widths(&mut code, &L_PATTERNS[digit], true);
    }
    append_widths(&mut code, &START_END_PATTERN, true);
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode() {
        let code = encode("590123412345").unwrap();
        assert_eq!(code.len(), CODE_WIDTH);
        let expected = "10100010110100111011001100100110111101001110101010110011011011001000010101110010011101000100101";
        let actual: String = code.iter().map(|&b| if b { '1' } else { '0' }).collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_check_digit_validation() {
        assert!(encode("5901234123457").is_ok());
        assert!(matches!(encode("5901234123458"), Err(EncodeError::InvalidArgument(_))));
        assert_eq!(encode("59012341234a"), Err(EncodeError::UnsupportedChar('a')));
        assert!(matches!(encode("123"), Err(EncodeError::InvalidArgument(_))));
    }

    #[test]
    fn test_render_margin() {
        let matrix = Ean13Writer
            .encode("590123412345", BarcodeFormat::Ean13, 0, 10, &EncodeHints::default())
            .unwrap();
        assert_eq!(matrix.width(), CODE_WIDTH + 2 * DEFAULT_MARGIN);
        assert!(matrix.get(DEFAULT_MARGIN, 0));
        assert!(!matrix.get(DEFAULT_MARGIN - 1, 9));
    }
}
