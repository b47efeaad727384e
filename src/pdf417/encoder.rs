//! Text to PDF417 codewords and module rows.
//!
//! Runs of 13 or more digits use numeric compaction, runs of five or more
//! text characters use text compaction, and everything else goes through
//! byte compaction (a single byte inside text uses the byte shift).

use super::decoder::bitstream::{
    BYTE_COMPACTION_MODE_LATCH, BYTE_COMPACTION_MODE_LATCH_6, ECI_CHARSET, MODE_SHIFT_TO_BYTE_COMPACTION_MODE,
    NUMERIC_COMPACTION_MODE_LATCH, TEXT_COMPACTION_MODE_LATCH,
};
use super::{MAX_COLUMNS, MAX_ROWS, MIN_ROWS, MIXED_CHARS, NUMBER_OF_CODEWORDS, PATTERNS, PUNCT_CHARS};
use super::{START_PATTERN, STOP_PATTERN};
use crate::decoder::modulus::pdf417_ec_codewords;
use crate::error::EncodeError;
use crate::models::BitMatrix;
use crate::utils::charset::{CharacterSet, encode_with_eci};

/// Error correction level used when none is requested
pub const DEFAULT_EC_LEVEL: u32 = 2;
const MAX_EC_LEVEL: u32 = 8;
const PAD_CODEWORD: u32 = 900;
const MIN_NUMERIC_RUN: usize = 13;
const MIN_TEXT_RUN: usize = 5;
const NUMERIC_GROUP_DIGITS: usize = 44;

// Width of one module and height of one row, for the aspect ratio estimate
const MODULE_WIDTH: f32 = 0.357;
const ROW_HEIGHT: f32 = 2.0;
const PREFERRED_RATIO: f32 = 3.0;

/// Encoded PDF417 symbol
#[derive(Debug, Clone, PartialEq)]
pub struct Pdf417Code {
    /// Data columns, indicators excluded
    pub columns: usize,
    /// Rows
    pub rows: usize,
    /// Error correction level, 0 to 8
    pub ec_level: u32,
    /// Length descriptor, data, padding and error correction
    pub codewords: Vec<u32>,
    /// One module per bit and one pixel row per symbol row
    pub matrix: BitMatrix,
}

impl Pdf417Code {
    /// Module grid with every row repeated `row_height` times
    pub fn to_bit_matrix(&self, row_height: usize) -> BitMatrix {
        let row_height = row_height.max(1);
        let width = self.matrix.width();
        let mut output = BitMatrix::new(width, self.rows * row_height);
        for y in 0..self.rows {
            let row = self.matrix.row(y);
            for dy in 0..row_height {
                output.set_row(y * row_height + dy, &row);
            }
        }
        output
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Compaction {
    Text,
    Byte,
    Numeric,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SubMode {
    Alpha,
    Lower,
    Mixed,
    Punct,
}

/// Encode `text` into a symbol at `ec_level`
pub fn encode(text: &str, charset: Option<CharacterSet>, ec_level: u32) -> Result<Pdf417Code, EncodeError> {
    if ec_level > MAX_EC_LEVEL {
        return Err(EncodeError::InvalidArgument(format!(
            "error correction level must be 0 to 8, got {ec_level}"
        )));
    }
    let data = encode_high_level(text, charset)?;
    let ec_count = 1usize << (ec_level + 1);
    if data.len() + ec_count + 1 > NUMBER_OF_CODEWORDS as usize {
        return Err(EncodeError::TooLong);
    }

    let (columns, rows) = determine_dimensions(data.len(), ec_count)?;
    let pad = columns * rows - (data.len() + 1 + ec_count);

    let mut codewords = Vec::with_capacity(columns * rows);
    codewords.push((data.len() + pad + 1) as u32);
    codewords.extend(&data);
    codewords.extend(std::iter::repeat_n(PAD_CODEWORD, pad));
    let ec = pdf417_ec_codewords(&codewords, ec_count);
    codewords.extend(ec);

    let matrix = encode_rows(&codewords, columns, rows, ec_level);
    Ok(Pdf417Code {
        columns,
        rows,
        ec_level,
        codewords,
        matrix,
    })
}

/// Pick the column count whose symbol shape is closest to 3:1
fn determine_dimensions(source_codewords: usize, ec_count: usize) -> Result<(usize, usize), EncodeError> {
    let needed = source_codewords + 1 + ec_count;
    let mut best: Option<(usize, usize, f32)> = None;
    for columns in 1..=MAX_COLUMNS {
        let rows = needed.div_ceil(columns);
        if rows < MIN_ROWS {
            break;
        }
        if rows > MAX_ROWS {
            continue;
        }
        let ratio = ((17 * columns + 69) as f32 * MODULE_WIDTH) / (rows as f32 * ROW_HEIGHT);
        if best.is_some_and(|(_, _, r)| (ratio - PREFERRED_RATIO).abs() > (r - PREFERRED_RATIO).abs()) {
            continue;
        }
        best = Some((columns, rows, ratio));
    }
    best.map(|(columns, rows, _)| (columns, rows)).ok_or(EncodeError::TooLong)
}

fn encode_rows(codewords: &[u32], columns: usize, rows: usize, ec_level: u32) -> BitMatrix {
    let width = 17 * (columns + 4) + 1;
    let mut matrix = BitMatrix::new(width, rows);
    for y in 0..rows {
        let cluster = y % 3;
        let base = (y / 3 * 30) as u32;
        let rows_value = ((rows - 1) / 3) as u32;
        let columns_value = (columns - 1) as u32;
        let ec_value = ec_level * 3 + ((rows - 1) % 3) as u32;
        let (left, right) = match cluster {
            0 => (base + rows_value, base + columns_value),
            1 => (base + ec_value, base + rows_value),
            _ => (base + columns_value, base + ec_value),
        };

        let mut x = put_widths(&mut matrix, 0, y, &START_PATTERN);
        x = put_symbol(&mut matrix, x, y, PATTERNS[cluster][left as usize]);
        for &codeword in &codewords[y * columns..(y + 1) * columns] {
            x = put_symbol(&mut matrix, x, y, PATTERNS[cluster][codeword as usize]);
        }
        x = put_symbol(&mut matrix, x, y, PATTERNS[cluster][right as usize]);
        put_widths(&mut matrix, x, y, &STOP_PATTERN);
    }
    matrix
}

fn put_widths(matrix: &mut BitMatrix, mut x: usize, y: usize, widths: &[u32]) -> usize {
    for (i, &width) in widths.iter().enumerate() {
        for _ in 0..width {
            if i % 2 == 0 {
                matrix.set(x, y);
            }
            x += 1;
        }
    }
    x
}

fn put_symbol(matrix: &mut BitMatrix, x: usize, y: usize, pattern: u32) -> usize {
    for bit in 0..17 {
        if pattern & (1 << (16 - bit)) != 0 {
            matrix.set(x + bit, y);
        }
    }
    x + 17
}

/// Data codewords for `text`, without length descriptor or padding
pub fn encode_high_level(text: &str, charset: Option<CharacterSet>) -> Result<Vec<u32>, EncodeError> {
    let (bytes, eci) = encode_with_eci(text, charset)?;
    let mut out = Vec::with_capacity(bytes.len());
    if let Some(eci) = eci {
        out.extend([ECI_CHARSET, eci]);
    }

    let mut compaction = Compaction::Text;
    let mut sub_mode = SubMode::Alpha;
    let mut p = 0;
    while p < bytes.len() {
        let digits = consecutive_digits(&bytes, p);
        if digits >= MIN_NUMERIC_RUN {
            out.push(NUMERIC_COMPACTION_MODE_LATCH);
            compaction = Compaction::Numeric;
            encode_numeric(&bytes[p..p + digits], &mut out);
            p += digits;
            continue;
        }

        let text_count = consecutive_text(&bytes, p);
        if text_count >= MIN_TEXT_RUN || (text_count > 0 && p + text_count == bytes.len()) {
            if compaction != Compaction::Text {
                out.push(TEXT_COMPACTION_MODE_LATCH);
                compaction = Compaction::Text;
                sub_mode = SubMode::Alpha;
            }
            sub_mode = encode_text(&bytes[p..p + text_count], sub_mode, &mut out)?;
            p += text_count;
            continue;
        }

        let count = consecutive_binary(&bytes, p).max(1);
        let run = &bytes[p..p + count];
        if count == 1 && compaction == Compaction::Text {
            out.extend([MODE_SHIFT_TO_BYTE_COMPACTION_MODE, run[0] as u32]);
        } else {
            encode_binary(run, &mut out);
            compaction = Compaction::Byte;
        }
        p += count;
    }
    Ok(out)
}

fn is_text(b: u8) -> bool {
    b == b'\t' || b == b'\n' || b == b'\r' || (32..=126).contains(&b)
}

fn mixed_value(b: u8) -> Option<u32> {
    if b == b' ' {
        return Some(26);
    }
    MIXED_CHARS.iter().position(|&c| c == b).map(|i| i as u32)
}

fn punct_value(b: u8) -> Option<u32> {
    PUNCT_CHARS.iter().position(|&c| c == b).map(|i| i as u32)
}

fn consecutive_digits(bytes: &[u8], start: usize) -> usize {
    bytes[start..].iter().take_while(|b| b.is_ascii_digit()).count()
}

/// Text-encodable run starting at `start`, stopping before a numeric run
fn consecutive_text(bytes: &[u8], start: usize) -> usize {
    let mut idx = start;
    while idx < bytes.len() {
        let digits = consecutive_digits(bytes, idx).min(MIN_NUMERIC_RUN);
        if digits >= MIN_NUMERIC_RUN {
            break;
        }
        if digits > 0 {
            idx += digits;
            continue;
        }
        if !is_text(bytes[idx]) {
            break;
        }
        idx += 1;
    }
    idx - start
}

/// Run for byte compaction, stopping before a numeric or text run
fn consecutive_binary(bytes: &[u8], start: usize) -> usize {
    let mut idx = start;
    while idx < bytes.len() {
        if consecutive_digits(bytes, idx) >= MIN_NUMERIC_RUN {
            break;
        }
        if idx > start && consecutive_text(bytes, idx) >= MIN_TEXT_RUN {
            break;
        }
        idx += 1;
    }
    idx - start
}

fn encode_text(text: &[u8], mut sub_mode: SubMode, out: &mut Vec<u32>) -> Result<SubMode, EncodeError> {
    let punct = |b: u8| punct_value(b).ok_or(EncodeError::UnsupportedChar(b as char));
    let mut values: Vec<u32> = Vec::with_capacity(text.len() * 2);
    let mut idx = 0;
    while idx < text.len() {
        let ch = text[idx];
        match sub_mode {
            SubMode::Alpha => {
                if ch == b' ' {
                    values.push(26);
                } else if ch.is_ascii_uppercase() {
                    values.push((ch - b'A') as u32);
                } else if ch.is_ascii_lowercase() {
                    sub_mode = SubMode::Lower;
                    values.push(27);
                    continue;
                } else if mixed_value(ch).is_some() {
                    sub_mode = SubMode::Mixed;
                    values.push(28);
                    continue;
                } else {
                    values.extend([29, punct(ch)?]);
                }
            }
            SubMode::Lower => {
                if ch == b' ' {
                    values.push(26);
                } else if ch.is_ascii_lowercase() {
                    values.push((ch - b'a') as u32);
                } else if ch.is_ascii_uppercase() {
                    values.extend([27, (ch - b'A') as u32]);
                } else if mixed_value(ch).is_some() {
                    sub_mode = SubMode::Mixed;
                    values.push(28);
                    continue;
                } else {
                    values.extend([29, punct(ch)?]);
                }
            }
            SubMode::Mixed => {
                if let Some(value) = mixed_value(ch) {
                    values.push(value);
                } else if ch.is_ascii_uppercase() {
                    sub_mode = SubMode::Alpha;
                    values.push(28);
                    continue;
                } else if ch.is_ascii_lowercase() {
                    sub_mode = SubMode::Lower;
                    values.push(27);
                    continue;
                } else if text.get(idx + 1).is_some_and(|&next| punct_value(next).is_some()) {
                    sub_mode = SubMode::Punct;
                    values.push(25);
                    continue;
                } else {
                    values.extend([29, punct(ch)?]);
                }
            }
            SubMode::Punct => {
                if let Some(value) = punct_value(ch) {
                    values.push(value);
                } else {
                    sub_mode = SubMode::Alpha;
                    values.push(29);
                    continue;
                }
            }
        }
        idx += 1;
    }
    if values.len() % 2 != 0 {
        values.push(29);
        // 29 is a latch back to Alpha in Punct, a shift everywhere else
        if sub_mode == SubMode::Punct {
            sub_mode = SubMode::Alpha;
        }
    }
    out.extend(values.chunks(2).map(|pair| pair[0] * 30 + pair[1]));
    Ok(sub_mode)
}

fn encode_binary(bytes: &[u8], out: &mut Vec<u32>) {
    out.push(if bytes.len() % 6 == 0 {
        BYTE_COMPACTION_MODE_LATCH_6
    } else {
        BYTE_COMPACTION_MODE_LATCH
    });
    let mut chunks = bytes.chunks_exact(6);
    for chunk in &mut chunks {
        let mut value = chunk.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64);
        let mut group = [0u32; 5];
        for slot in group.iter_mut().rev() {
            *slot = (value % 900) as u32;
            value /= 900;
        }
        out.extend(group);
    }
    out.extend(chunks.remainder().iter().map(|&b| b as u32));
}

/// Digits in groups of 44, each read as base 10 with a leading 1 and
/// rewritten in base 900
fn encode_numeric(digits: &[u8], out: &mut Vec<u32>) {
    for chunk in digits.chunks(NUMERIC_GROUP_DIGITS) {
        let mut number: Vec<u32> = std::iter::once(1)
            .chain(chunk.iter().map(|d| (d - b'0') as u32))
            .collect();
        let mut group = Vec::new();
        while !number.is_empty() {
            let mut remainder = 0u32;
            let mut quotient = Vec::with_capacity(number.len());
            for &digit in &number {
                let current = remainder * 10 + digit;
                let q = current / 900;
                remainder = current % 900;
                if !quotient.is_empty() || q != 0 {
                    quotient.push(q);
                }
            }
            group.push(remainder);
            number = quotient;
        }
        group.reverse();
        out.extend(group);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf417::codeword_for;
    use crate::pdf417::decoder::bitstream;

    fn round_trip(text: &str) -> String {
        let data = encode_high_level(text, None).unwrap();
        let mut codewords = vec![data.len() as u32 + 1];
        codewords.extend(data);
        bitstream::decode(&codewords, "2").unwrap().text
    }

    #[test]
    fn test_text_compaction() {
        assert_eq!(encode_high_level("ABC", None).unwrap(), vec![1, 2 * 30 + 29]);
        for text in ["Hello, World!", "a-b.c/d e", "MiXeD cAsE", "tab\there\r\n", "x@y{z}"] {
            assert_eq!(round_trip(text), text);
        }
    }

    #[test]
    fn test_numeric_compaction() {
        let data = encode_high_level("000213298174000", None).unwrap();
        assert_eq!(data, vec![NUMERIC_COMPACTION_MODE_LATCH, 1, 624, 434, 632, 282, 200]);
        let long: String = (0..100).map(|i| char::from(b'0' + (i % 10) as u8)).collect();
        assert_eq!(round_trip(&long), long);
        assert_eq!(round_trip("ID 12345678901234567 END"), "ID 12345678901234567 END");
    }

    #[test]
    fn test_byte_compaction() {
        let data = encode_high_level("\u{1}\u{2}\u{3}\u{4}\u{5}\u{6}", None).unwrap();
        assert_eq!(data[0], BYTE_COMPACTION_MODE_LATCH_6);
        assert_eq!(data.len(), 6);
        for text in ["äöü", "abcdefg\u{0}\u{1}hijklmnop", "é", "x\u{7f}y"] {
            assert_eq!(round_trip(text), text);
        }
    }

    #[test]
    fn test_utf8_gets_eci() {
        let data = encode_high_level("€", None).unwrap();
        assert_eq!(&data[..2], &[ECI_CHARSET, 26]);
        assert_eq!(round_trip("price: 5€"), "price: 5€");
    }

    #[test]
    fn test_punct_padding_resets_sub_mode() {
        // Ends in Punct with an odd value count, then a shifted byte and more text
        assert_eq!(round_trip("ABCD1;;\u{e9}XYZWV"), "ABCD1;;\u{e9}XYZWV");
    }

    #[test]
    fn test_dimensions() {
        assert_eq!(determine_dimensions(1, 8), Ok((2, 5)));
        let (columns, rows) = determine_dimensions(400, 64).unwrap();
        assert!(columns * rows >= 465 && rows <= MAX_ROWS);
        assert_eq!(determine_dimensions(2700, 8), Err(EncodeError::TooLong));
    }

    #[test]
    fn test_symbol_layout() {
        let code = encode("PDF417", None, DEFAULT_EC_LEVEL).unwrap();
        assert_eq!(code.codewords.len(), code.columns * code.rows);
        assert_eq!(code.matrix.width(), 17 * (code.columns + 4) + 1);
        // Start guard opens every row with eight bars
        for y in 0..code.rows {
            assert!((0..8).all(|x| code.matrix.get(x, y)));
            assert!(!code.matrix.get(8, y));
        }
        // Left row indicator of row 0 carries (rows - 1) / 3 in cluster 0
        let mut pattern = 0;
        for x in 17..34 {
            pattern = (pattern << 1) | u32::from(code.matrix.get(x, 0));
        }
        assert_eq!(codeword_for(pattern), Some((((code.rows - 1) / 3) as u32, 0)));
        assert_eq!(code.to_bit_matrix(3).height(), code.rows * 3);
    }

    #[test]
    fn test_bad_level() {
        assert!(matches!(encode("x", None, 9), Err(EncodeError::InvalidArgument(_))));
    }
}
