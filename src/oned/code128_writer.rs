use super::append_widths;
use super::code128::{CODE_CODE_B, CODE_CODE_C, CODE_PATTERNS, CODE_START_B, CODE_START_C, CODE_STOP};
use crate::error::EncodeError;
use crate::models::{BarcodeFormat, BitMatrix, EncodeHints};
use crate::writer::{Writer, check_request, render_row};

const DEFAULT_MARGIN: usize = 10;
const MAX_LENGTH: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CodeSet {
    B,
    C,
}

/// Renders Code 128 in code set B, switching to C for runs of digits
#[derive(Debug, Clone, Copy, Default)]
pub struct Code128Writer;

impl Writer for Code128Writer {
    fn encode(
        &self,
        contents: &str,
        format: BarcodeFormat,
        width: usize,
        height: usize,
        hints: &EncodeHints,
    ) -> Result<BitMatrix, EncodeError> {
        check_request(contents, format, BarcodeFormat::Code128)?;
        let code = encode(contents)?;
        Ok(render_row(&code, width, height, hints.margin.unwrap_or(DEFAULT_MARGIN)))
    }
}

/// Modules of the full symbol, quiet zones excluded
pub(crate) fn encode(contents: &str) -> Result<Vec<bool>, EncodeError> {
    let chars: Vec<char> = contents.chars().collect();
    if chars.len() > MAX_LENGTH {
        return Err(EncodeError::TooLong);
    }
    if let Some(&c) = chars.iter().find(|c| !(' '..='\u{7f}').contains(*c)) {
        return Err(EncodeError::UnsupportedChar(c));
    }

    let mut values = Vec::with_capacity(chars.len() + 3);
    let mut code_set = None;
    let mut i = 0;
    while i < chars.len() {
        let wanted = choose_code_set(&chars, i, code_set);
        if code_set != Some(wanted) {
            values.push(match (code_set, wanted) {
                (None, CodeSet::B) => CODE_START_B,
                (None, CodeSet::C) => CODE_START_C,
                (_, CodeSet::B) => CODE_CODE_B,
                (_, CodeSet::C) => CODE_CODE_C,
            });
            code_set = Some(wanted);
        }
        match wanted {
            CodeSet::B => {
                values.push(chars[i] as u8 - b' ');
                i += 1;
            }
            CodeSet::C => {
                let tens = chars[i] as u8 - b'0';
                let ones = chars[i + 1] as u8 - b'0';
                values.push(tens * 10 + ones);
                i += 2;
            }
        }
    }

    let checksum = values
        .iter()
        .enumerate()
        .map(|(i, &v)| i.max(1) * v as usize)
        .sum::<usize>()
        % 103;
    values.push(checksum as u8);
    values.push(CODE_STOP);

    let mut code = Vec::with_capacity(values.len() * 11 + 2);
    for value in values {
        append_widths(&mut code, CODE_PATTERNS[value as usize], true);
    }
    Ok(code)
}

fn digit_run(chars: &[char], start: usize) -> usize {
    chars[start..].iter().take_while(|c| c.is_ascii_digit()).count()
}

fn choose_code_set(chars: &[char], i: usize, current: Option<CodeSet>) -> CodeSet {
    let run = digit_run(chars, i);
    match current {
        Some(CodeSet::C) if run >= 2 => CodeSet::C,
        Some(CodeSet::C) => CodeSet::B,
        // An odd leading digit goes in B so the rest pairs up
        _ if run >= 4 && run % 2 == 0 => CodeSet::C,
        None if run >= 2 && run == chars.len() && run % 2 == 0 => CodeSet::C,
        _ => CodeSet::B,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DecodeHints;
    use crate::oned::test_rows::row_from_modules;
    use crate::oned::{Code128Reader, OneDReader};

    fn round_trip(text: &str) -> String {
        let row = row_from_modules(&encode(text).unwrap(), 2, 30);
        Code128Reader.decode_row(0, &row, &DecodeHints::default()).unwrap().text
    }

    #[test]
    fn test_code_set_choice() {
        let chars: Vec<char> = "AB123456".chars().collect();
        assert_eq!(choose_code_set(&chars, 0, None), CodeSet::B);
        assert_eq!(choose_code_set(&chars, 2, Some(CodeSet::B)), CodeSet::C);
        let chars: Vec<char> = "12345".chars().collect();
        assert_eq!(choose_code_set(&chars, 0, None), CodeSet::B);
        assert_eq!(choose_code_set(&chars, 1, Some(CodeSet::B)), CodeSet::C);
    }

    #[test]
    fn test_known_symbol_width() {
        // Start, 3 data, checksum: 11 modules each, stop: 13
        assert_eq!(encode("abc").unwrap().len(), 5 * 11 + 13);
        // Start C, two digit pairs, checksum, stop
        assert_eq!(encode("1234").unwrap().len(), 4 * 11 + 13);
    }

    #[test]
    fn test_round_trips() {
        for text in ["Hello, World!", "1234567890", "AB12345CD", "x9", "~}|{"] {
            assert_eq!(round_trip(text), text);
        }
    }

    #[test]
    fn test_rejects() {
        assert_eq!(encode("tab\there"), Err(EncodeError::UnsupportedChar('\t')));
        assert_eq!(encode(&"1".repeat(81)), Err(EncodeError::TooLong));
        let wrong = Code128Writer.encode("A", BarcodeFormat::Ean13, 0, 0, &EncodeHints::default());
        assert!(matches!(wrong, Err(EncodeError::InvalidArgument(_))));
    }
}
