//! Corrected codewords to text: text, byte and numeric compaction, ECI and
//! the Macro PDF417 control block.

use crate::error::{DecodeError, Result};
use crate::models::{DecoderResult, MetadataValue};
use crate::pdf417::{MIXED_CHARS, PUNCT_CHARS};
use crate::utils::charset::EciStringBuilder;

pub(crate) const TEXT_COMPACTION_MODE_LATCH: u32 = 900;
pub(crate) const BYTE_COMPACTION_MODE_LATCH: u32 = 901;
pub(crate) const NUMERIC_COMPACTION_MODE_LATCH: u32 = 902;
pub(crate) const MODE_SHIFT_TO_BYTE_COMPACTION_MODE: u32 = 913;
pub(crate) const MACRO_PDF417_TERMINATOR: u32 = 922;
pub(crate) const BEGIN_MACRO_PDF417_OPTIONAL_FIELD: u32 = 923;
pub(crate) const BYTE_COMPACTION_MODE_LATCH_6: u32 = 924;
pub(crate) const ECI_USER_DEFINED: u32 = 925;
pub(crate) const ECI_GENERAL_PURPOSE: u32 = 926;
pub(crate) const ECI_CHARSET: u32 = 927;
pub(crate) const BEGIN_MACRO_PDF417_CONTROL_BLOCK: u32 = 928;

const MAX_NUMERIC_CODEWORDS: usize = 15;

const MACRO_FIELD_FILE_NAME: u32 = 0;
const MACRO_FIELD_SEGMENT_COUNT: u32 = 1;
const MACRO_FIELD_TIME_STAMP: u32 = 2;
const MACRO_FIELD_SENDER: u32 = 3;
const MACRO_FIELD_ADDRESSEE: u32 = 4;
const MACRO_FIELD_FILE_SIZE: u32 = 5;
const MACRO_FIELD_CHECKSUM: u32 = 6;

// Text sub-mode values
const PL: u32 = 25;
const LL: u32 = 27;
const AS: u32 = 27;
const ML: u32 = 28;
const AL: u32 = 28;
const PS: u32 = 29;
const PAL: u32 = 29;

/// Macro PDF417 control block of one segment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pdf417Metadata {
    /// Position of this segment in the file
    pub segment_index: usize,
    /// File identifier, three digits per codeword
    pub file_id: String,
    /// Raw codewords of the optional fields
    pub optional_data: Option<Vec<u32>>,
    /// Set by the terminator codeword
    pub last_segment: bool,
    /// Total number of segments
    pub segment_count: Option<usize>,
    /// Sender field
    pub sender: Option<String>,
    /// Addressee field
    pub addressee: Option<String>,
    /// File name field
    pub file_name: Option<String>,
    /// File size in bytes
    pub file_size: Option<u64>,
    /// Seconds since the epoch
    pub timestamp: Option<u64>,
    /// CRC of the whole file
    pub checksum: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Alpha,
    Lower,
    Mixed,
    Punct,
    AlphaShift,
    PunctShift,
}

/// Decode data codewords; `codewords[0]` is the symbol length descriptor
pub fn decode(codewords: &[u32], ec_level: &str) -> Result<DecoderResult> {
    let end = data_end(codewords)?;
    let mut result = EciStringBuilder::default();
    let mut metadata = None;

    let mut code_index = text_compaction(codewords, 1, &mut result)?;
    while code_index < end {
        let code = codewords[code_index];
        code_index += 1;
        code_index = match code {
            TEXT_COMPACTION_MODE_LATCH => text_compaction(codewords, code_index, &mut result)?,
            BYTE_COMPACTION_MODE_LATCH | BYTE_COMPACTION_MODE_LATCH_6 => {
                byte_compaction(code, codewords, code_index, &mut result)?
            }
            MODE_SHIFT_TO_BYTE_COMPACTION_MODE => {
                result.append_byte(codeword_at(codewords, code_index)? as u8);
                code_index + 1
            }
            NUMERIC_COMPACTION_MODE_LATCH => numeric_compaction(codewords, code_index, &mut result)?,
            ECI_CHARSET => {
                result.append_eci(codeword_at(codewords, code_index)?)?;
                code_index + 1
            }
            ECI_GENERAL_PURPOSE => code_index + 2,
            ECI_USER_DEFINED => code_index + 1,
            BEGIN_MACRO_PDF417_CONTROL_BLOCK => {
                let mut block = Pdf417Metadata::default();
                let next = decode_macro_block(codewords, code_index, &mut block)?;
                metadata = Some(block);
                next
            }
            BEGIN_MACRO_PDF417_OPTIONAL_FIELD | MACRO_PDF417_TERMINATOR => {
                return Err(DecodeError::Format("macro field outside a control block"));
            }
            _ => text_compaction(codewords, code_index - 1, &mut result)?,
        };
    }

    if result.is_empty() && metadata.is_none() {
        return Err(DecodeError::Format("empty PDF417 message"));
    }
    let mut decoded = DecoderResult::new(Vec::new(), result.finish());
    decoded.ec_level = Some(ec_level.to_string());
    decoded.symbology_modifier = 2;
    decoded.other = metadata.map(|block| MetadataValue::Pdf417(Box::new(block)));
    Ok(decoded)
}

fn data_end(codewords: &[u32]) -> Result<usize> {
    match codewords.first() {
        Some(&n) if n as usize <= codewords.len() && n > 0 => Ok(n as usize),
        _ => Err(DecodeError::Format("bad PDF417 length descriptor")),
    }
}

fn codeword_at(codewords: &[u32], index: usize) -> Result<u32> {
    codewords
        .get(index)
        .copied()
        .ok_or(DecodeError::Format("PDF417 data ends early"))
}

fn ends_text(code: u32) -> bool {
    matches!(
        code,
        BYTE_COMPACTION_MODE_LATCH
            | NUMERIC_COMPACTION_MODE_LATCH
            | BYTE_COMPACTION_MODE_LATCH_6
            | BEGIN_MACRO_PDF417_CONTROL_BLOCK
            | BEGIN_MACRO_PDF417_OPTIONAL_FIELD
            | MACRO_PDF417_TERMINATOR
            | ECI_USER_DEFINED
            | ECI_GENERAL_PURPOSE
    )
}

/// Read text compaction codewords starting at `code_index`, returning the
/// index of the first codeword that belongs to another mode
fn text_compaction(codewords: &[u32], mut code_index: usize, result: &mut EciStringBuilder) -> Result<usize> {
    let end = data_end(codewords)?;
    // Two sub-mode values per codeword; 913 is followed by its raw byte
    let mut values = Vec::with_capacity((end.saturating_sub(code_index)) * 2);
    let mut mode = Mode::Alpha;
    while code_index < end {
        let code = codewords[code_index];
        code_index += 1;
        if code < TEXT_COMPACTION_MODE_LATCH {
            values.push(code / 30);
            values.push(code % 30);
            continue;
        }
        match code {
            TEXT_COMPACTION_MODE_LATCH => values.push(TEXT_COMPACTION_MODE_LATCH),
            MODE_SHIFT_TO_BYTE_COMPACTION_MODE => {
                values.push(MODE_SHIFT_TO_BYTE_COMPACTION_MODE);
                values.push(codeword_at(codewords, code_index)?);
                code_index += 1;
            }
            ECI_CHARSET => {
                mode = decode_text_values(&values, mode, result);
                values.clear();
                result.append_eci(codeword_at(codewords, code_index)?)?;
                code_index += 1;
            }
            c if ends_text(c) => {
                code_index -= 1;
                break;
            }
            _ => {}
        }
    }
    decode_text_values(&values, mode, result);
    Ok(code_index)
}

/// Interpret sub-mode values, returning the sub-mode in effect afterwards
fn decode_text_values(values: &[u32], mut mode: Mode, result: &mut EciStringBuilder) -> Mode {
    let mut prior = mode;
    let mut i = 0;
    while i < values.len() {
        let value = values[i];
        let mut byte = None;
        if value == MODE_SHIFT_TO_BYTE_COMPACTION_MODE {
            i += 1;
            if let Some(&raw) = values.get(i) {
                result.append_byte(raw as u8);
            }
            if matches!(mode, Mode::AlphaShift | Mode::PunctShift) {
                mode = prior;
            }
            i += 1;
            continue;
        }
        if value == TEXT_COMPACTION_MODE_LATCH {
            mode = Mode::Alpha;
            i += 1;
            continue;
        }
        match mode {
            Mode::Alpha => match value {
                0..=25 => byte = Some(b'A' + value as u8),
                26 => byte = Some(b' '),
                LL => mode = Mode::Lower,
                ML => mode = Mode::Mixed,
                PS => {
                    prior = mode;
                    mode = Mode::PunctShift;
                }
                _ => {}
            },
            Mode::Lower => match value {
                0..=25 => byte = Some(b'a' + value as u8),
                26 => byte = Some(b' '),
                AS => {
                    prior = mode;
                    mode = Mode::AlphaShift;
                }
                ML => mode = Mode::Mixed,
                PS => {
                    prior = mode;
                    mode = Mode::PunctShift;
                }
                _ => {}
            },
            Mode::Mixed => match value {
                0..PL => byte = Some(MIXED_CHARS[value as usize]),
                PL => mode = Mode::Punct,
                26 => byte = Some(b' '),
                LL => mode = Mode::Lower,
                AL => mode = Mode::Alpha,
                PS => {
                    prior = mode;
                    mode = Mode::PunctShift;
                }
                _ => {}
            },
            Mode::Punct => match value {
                0..PAL => byte = Some(PUNCT_CHARS[value as usize]),
                _ => mode = Mode::Alpha,
            },
            Mode::AlphaShift => {
                mode = prior;
                match value {
                    0..=25 => byte = Some(b'A' + value as u8),
                    26 => byte = Some(b' '),
                    _ => mode = Mode::Alpha,
                }
            }
            Mode::PunctShift => {
                mode = prior;
                match value {
                    0..PAL => byte = Some(PUNCT_CHARS[value as usize]),
                    _ => mode = Mode::Alpha,
                }
            }
        }
        if let Some(b) = byte {
            result.append_byte(b);
        }
        i += 1;
    }
    mode
}

/// Byte compaction: groups of five codewords carry six bytes, the rest one
/// byte each
fn byte_compaction(
    mode: u32,
    codewords: &[u32],
    mut code_index: usize,
    result: &mut EciStringBuilder,
) -> Result<usize> {
    let end = data_end(codewords)?;
    let mut finished = false;
    while code_index < end && !finished {
        while code_index < end && codewords[code_index] == ECI_CHARSET {
            result.append_eci(codeword_at(codewords, code_index + 1)?)?;
            code_index += 2;
        }
        if code_index >= end || codewords[code_index] >= TEXT_COMPACTION_MODE_LATCH {
            break;
        }

        let mut value = 0u64;
        let mut count = 0;
        loop {
            value = 900 * value + codewords[code_index] as u64;
            code_index += 1;
            count += 1;
            if count == 5 || code_index >= end || codewords[code_index] >= TEXT_COMPACTION_MODE_LATCH {
                break;
            }
        }
        let followed_by_data = code_index < end && codewords[code_index] < TEXT_COMPACTION_MODE_LATCH;
        if count == 5 && (mode == BYTE_COMPACTION_MODE_LATCH_6 || followed_by_data) {
            for i in 0..6 {
                result.append_byte((value >> (8 * (5 - i))) as u8);
            }
        } else {
            code_index -= count;
            while code_index < end && !finished {
                let code = codewords[code_index];
                code_index += 1;
                if code < TEXT_COMPACTION_MODE_LATCH {
                    result.append_byte(code as u8);
                } else if code == ECI_CHARSET {
                    result.append_eci(codeword_at(codewords, code_index)?)?;
                    code_index += 1;
                } else {
                    code_index -= 1;
                    finished = true;
                }
            }
        }
    }
    Ok(code_index)
}

/// Numeric compaction: up to fifteen base-900 codewords per decimal group
fn numeric_compaction(codewords: &[u32], mut code_index: usize, result: &mut EciStringBuilder) -> Result<usize> {
    let end = data_end(codewords)?;
    let mut group = Vec::with_capacity(MAX_NUMERIC_CODEWORDS);
    let mut finished = false;
    while code_index < end && !finished {
        let code = codewords[code_index];
        code_index += 1;
        if code_index == end {
            finished = true;
        }
        if code < TEXT_COMPACTION_MODE_LATCH {
            group.push(code);
        } else if code != NUMERIC_COMPACTION_MODE_LATCH {
            code_index -= 1;
            finished = true;
        }
        if !group.is_empty()
            && (group.len() == MAX_NUMERIC_CODEWORDS || code == NUMERIC_COMPACTION_MODE_LATCH || finished)
        {
            result.append_str(&decode_base900_to_base10(&group)?);
            group.clear();
        }
    }
    Ok(code_index)
}

/// Base-900 digits to their decimal string, dropping the leading `1` every
/// numeric group carries
fn decode_base900_to_base10(codewords: &[u32]) -> Result<String> {
    const LIMB: u64 = 1_000_000_000;
    // Little-endian limbs of nine decimal digits
    let mut limbs: Vec<u64> = vec![0];
    for &codeword in codewords {
        let mut carry = codeword as u64;
        for limb in limbs.iter_mut() {
            let value = *limb * 900 + carry;
            *limb = value % LIMB;
            carry = value / LIMB;
        }
        while carry > 0 {
            limbs.push(carry % LIMB);
            carry /= LIMB;
        }
    }
    let mut digits = String::new();
    for (i, limb) in limbs.iter().rev().enumerate() {
        if i == 0 {
            digits.push_str(&limb.to_string());
        } else {
            digits.push_str(&format!("{limb:09}"));
        }
    }
    match digits.strip_prefix('1') {
        Some(rest) => Ok(rest.to_string()),
        None => Err(DecodeError::Format("numeric group without leading 1")),
    }
}

fn decode_macro_block(codewords: &[u32], mut code_index: usize, metadata: &mut Pdf417Metadata) -> Result<usize> {
    let end = data_end(codewords)?;
    if code_index + 2 > end {
        return Err(DecodeError::Format("truncated macro block"));
    }
    metadata.segment_index = parse_number(&decode_base900_to_base10(&codewords[code_index..code_index + 2])?)?;
    code_index += 2;

    let mut file_id = String::new();
    while code_index < end
        && codewords[code_index] != MACRO_PDF417_TERMINATOR
        && codewords[code_index] != BEGIN_MACRO_PDF417_OPTIONAL_FIELD
    {
        file_id.push_str(&format!("{:03}", codewords[code_index]));
        code_index += 1;
    }
    if file_id.is_empty() {
        return Err(DecodeError::Format("macro block without file id"));
    }
    metadata.file_id = file_id;

    let optional_start = (code_index < end && codewords[code_index] == BEGIN_MACRO_PDF417_OPTIONAL_FIELD)
        .then_some(code_index + 1);

    while code_index < end {
        match codewords[code_index] {
            BEGIN_MACRO_PDF417_OPTIONAL_FIELD => {
                let field = codeword_at(codewords, code_index + 1)?;
                code_index += 2;
                let mut value = EciStringBuilder::default();
                match field {
                    MACRO_FIELD_FILE_NAME | MACRO_FIELD_SENDER | MACRO_FIELD_ADDRESSEE => {
                        code_index = text_compaction(codewords, code_index, &mut value)?;
                        let text = Some(value.finish());
                        match field {
                            MACRO_FIELD_FILE_NAME => metadata.file_name = text,
                            MACRO_FIELD_SENDER => metadata.sender = text,
                            _ => metadata.addressee = text,
                        }
                    }
                    MACRO_FIELD_SEGMENT_COUNT
                    | MACRO_FIELD_TIME_STAMP
                    | MACRO_FIELD_FILE_SIZE
                    | MACRO_FIELD_CHECKSUM => {
                        code_index = numeric_compaction(codewords, code_index, &mut value)?;
                        let number: u64 = parse_number(&value.finish())?;
                        match field {
                            MACRO_FIELD_SEGMENT_COUNT => metadata.segment_count = Some(number as usize),
                            MACRO_FIELD_TIME_STAMP => metadata.timestamp = Some(number),
                            MACRO_FIELD_FILE_SIZE => metadata.file_size = Some(number),
                            _ => metadata.checksum = Some(number as u32),
                        }
                    }
                    _ => return Err(DecodeError::Format("unknown macro optional field")),
                }
            }
            MACRO_PDF417_TERMINATOR => {
                code_index += 1;
                metadata.last_segment = true;
            }
            _ => return Err(DecodeError::Format("unexpected codeword in macro block")),
        }
    }

    if let Some(start) = optional_start {
        let mut length = code_index - start;
        if metadata.last_segment {
            length -= 1;
        }
        if length > 0 {
            metadata.optional_data = Some(codewords[start..start + length].to_vec());
        }
    }
    Ok(code_index)
}

fn parse_number<T: std::str::FromStr>(digits: &str) -> Result<T> {
    digits
        .parse()
        .map_err(|_| DecodeError::Format("bad number in macro block"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_length(mut data: Vec<u32>) -> Vec<u32> {
        data.insert(0, data.len() as u32 + 1);
        data
    }

    fn text(codewords: Vec<u32>) -> String {
        decode(&with_length(codewords), "2").unwrap().text
    }

    #[test]
    fn test_text_sub_modes() {
        // "AB" then LL, "c", PS, "!", pad
        assert_eq!(text(vec![1, 27 * 30 + 2, 29 * 30 + 10]), "ABc!");
        // ML, "1", PL, "(" ... AL, "Z"
        assert_eq!(text(vec![28 * 30 + 1, 25 * 30 + 23, 29 * 30 + 25]), "1(Z");
    }

    #[test]
    fn test_alpha_shift_from_lower() {
        // LL "a" AS "B" "c"
        assert_eq!(text(vec![27 * 30, 27 * 30 + 1, 2 * 30 + 29]), "aBc");
    }

    #[test]
    fn test_shift_to_byte_keeps_sub_mode() {
        assert_eq!(text(vec![27 * 30, 913, 0xE9, 30 + 29]), "aéb");
    }

    #[test]
    fn test_byte_compaction_six_pack() {
        // "ABCDEF" as one group under 924
        let value: u64 = 0x41_42_43_44_45_46;
        let mut group = Vec::new();
        let mut v = value;
        for _ in 0..5 {
            group.push((v % 900) as u32);
            v /= 900;
        }
        group.reverse();
        let mut codewords = vec![924];
        codewords.extend(group);
        assert_eq!(text(codewords), "ABCDEF");
    }

    #[test]
    fn test_byte_compaction_single_bytes() {
        assert_eq!(text(vec![901, 0x31, 0xFC, 0x32]), "1ü2");
    }

    #[test]
    fn test_numeric_compaction() {
        // 1 followed by "000213298174000" in base 900
        assert_eq!(decode_base900_to_base10(&[1, 624, 434, 632, 282, 200]).unwrap(), "000213298174000");
        assert_eq!(text(vec![902, 1, 624, 434, 632, 282, 200]), "000213298174000");
    }

    #[test]
    fn test_numeric_requires_leading_one() {
        assert!(decode_base900_to_base10(&[5]).is_err());
    }

    #[test]
    fn test_eci_switches_charset() {
        // ECI 26 (UTF-8), then bytes of "€"
        assert_eq!(text(vec![927, 26, 901, 0xE2, 0x82, 0xAC]), "€");
    }

    #[test]
    fn test_macro_block() {
        let codewords = vec![
            1, // "AB"
            928, 111, 100, // segment index "1" + "00000"
            17, 53, // file id
            923, 1, 12, // segment count "1" + "2"
            922,
        ];
        let decoded = decode(&with_length(codewords), "2").unwrap();
        assert_eq!(decoded.text, "AB");
        let Some(MetadataValue::Pdf417(block)) = decoded.other else {
            panic!("missing macro metadata");
        };
        assert_eq!(block.segment_index, 0);
        assert_eq!(block.file_id, "017053");
        assert_eq!(block.segment_count, Some(2));
        assert!(block.last_segment);
        assert_eq!(block.optional_data, Some(vec![1, 12]));
    }

    #[test]
    fn test_macro_field_outside_block() {
        assert!(decode(&with_length(vec![1, 922]), "2").is_err());
    }

    #[test]
    fn test_empty_message_rejected() {
        assert!(decode(&[1], "0").is_err());
        assert!(decode(&[5, 1], "0").is_err());
    }
}
