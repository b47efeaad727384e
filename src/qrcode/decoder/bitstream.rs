//! Mode-switching parser turning corrected QR data codewords into text.

use super::mode::{ALPHANUMERIC_TABLE, Mode};
use super::{ErrorCorrectionLevel, Version};
use crate::error::{DecodeError, Result};
use crate::models::DecoderResult;
use crate::utils::bit_source::BitSource;
use crate::utils::charset::{CharacterSet, guess_encoding};

/// GB 2312 subset indicator for Hanzi segments
const GB2312_SUBSET: u32 = 1;

/// Parse data codewords into a [`DecoderResult`]
pub fn decode(
    bytes: &[u8],
    version: Version,
    ec_level: ErrorCorrectionLevel,
    charset_hint: Option<CharacterSet>,
) -> Result<DecoderResult> {
    let mut bits = BitSource::new(bytes);
    let mut result = String::with_capacity(50);
    let mut byte_segments = Vec::new();
    let mut symbol_sequence = None;
    let mut parity_data = None;
    let mut current_charset: Option<CharacterSet> = None;
    let mut fc1_in_effect = false;
    let mut has_fnc1_first = false;
    let mut has_fnc1_second = false;

    loop {
        let mode = if bits.available() < 4 {
            Mode::Terminator
        } else {
            Mode::for_bits(bits.read_bits(4)?)?
        };
        match mode {
            Mode::Terminator => break,
            Mode::Fnc1FirstPosition => {
                has_fnc1_first = true;
                fc1_in_effect = true;
            }
            Mode::Fnc1SecondPosition => {
                has_fnc1_second = true;
                fc1_in_effect = true;
            }
            Mode::StructuredAppend => {
                if bits.available() < 16 {
                    return Err(DecodeError::Format("truncated structured append header"));
                }
                symbol_sequence = Some(bits.read_bits(8)? as u8);
                parity_data = Some(bits.read_bits(8)? as u8);
            }
            Mode::Eci => {
                let value = parse_eci_value(&mut bits)?;
                current_charset =
                    Some(CharacterSet::from_eci(value).ok_or(DecodeError::Format("unknown ECI value"))?);
            }
            Mode::Hanzi => {
                let subset = bits.read_bits(4)?;
                let count = bits.read_bits(mode.character_count_bits(version))? as usize;
                if subset == GB2312_SUBSET {
                    decode_hanzi_segment(&mut bits, &mut result, count)?;
                }
            }
            _ => {
                let count = bits.read_bits(mode.character_count_bits(version))? as usize;
                match mode {
                    Mode::Numeric => decode_numeric_segment(&mut bits, &mut result, count)?,
                    Mode::Alphanumeric => decode_alphanumeric_segment(&mut bits, &mut result, count, fc1_in_effect)?,
                    Mode::Byte => {
                        let segment = read_bytes(&mut bits, count)?;
                        let charset = current_charset.unwrap_or_else(|| guess_encoding(&segment, charset_hint));
                        result.push_str(&charset.decode(&segment));
                        byte_segments.push(segment);
                    }
                    Mode::Kanji => decode_kanji_segment(&mut bits, &mut result, count)?,
                    _ => return Err(DecodeError::Format("unexpected mode")),
                }
            }
        }
    }

    let symbology_modifier = match (current_charset.is_some(), has_fnc1_first, has_fnc1_second) {
        (true, true, _) => 4,
        (true, false, true) => 6,
        (true, false, false) => 2,
        (false, true, _) => 3,
        (false, false, true) => 5,
        (false, false, false) => 1,
    };

    let mut decoded = DecoderResult::new(bytes.to_vec(), result);
    decoded.byte_segments = byte_segments;
    decoded.ec_level = Some(ec_level.to_string());
    decoded.structured_append_sequence = symbol_sequence;
    decoded.structured_append_parity = parity_data;
    decoded.symbology_modifier = symbology_modifier;
    Ok(decoded)
}

/// ECI designator: 8, 16 or 24 bits, length selected by the leading bits
pub(crate) fn parse_eci_value(bits: &mut BitSource<'_>) -> Result<u32> {
    let first = bits.read_bits(8)?;
    if first & 0x80 == 0 {
        return Ok(first & 0x7F);
    }
    if first & 0xC0 == 0x80 {
        let second = bits.read_bits(8)?;
        return Ok(((first & 0x3F) << 8) | second);
    }
    if first & 0xE0 == 0xC0 {
        let second_third = bits.read_bits(16)?;
        return Ok(((first & 0x1F) << 16) | second_third);
    }
    Err(DecodeError::Format("bad ECI designator"))
}

fn read_bytes(bits: &mut BitSource<'_>, count: usize) -> Result<Vec<u8>> {
    if 8 * count > bits.available() {
        return Err(DecodeError::Format("byte segment overruns data"));
    }
    (0..count).map(|_| Ok(bits.read_bits(8)? as u8)).collect()
}

fn decode_hanzi_segment(bits: &mut BitSource<'_>, result: &mut String, count: usize) -> Result<()> {
    if count * 13 > bits.available() {
        return Err(DecodeError::Format("hanzi segment overruns data"));
    }
    let mut buffer = Vec::with_capacity(2 * count);
    for _ in 0..count {
        let two_bytes = bits.read_bits(13)?;
        let mut assembled = ((two_bytes / 0x060) << 8) | (two_bytes % 0x060);
        assembled += if assembled < 0x00A00 { 0x0A1A1 } else { 0x0A6A1 };
        buffer.push((assembled >> 8) as u8);
        buffer.push(assembled as u8);
    }
    result.push_str(&CharacterSet::Gb18030.decode(&buffer));
    Ok(())
}

fn decode_kanji_segment(bits: &mut BitSource<'_>, result: &mut String, count: usize) -> Result<()> {
    if count * 13 > bits.available() {
        return Err(DecodeError::Format("kanji segment overruns data"));
    }
    let mut buffer = Vec::with_capacity(2 * count);
    for _ in 0..count {
        let two_bytes = bits.read_bits(13)?;
        let mut assembled = ((two_bytes / 0x0C0) << 8) | (two_bytes % 0x0C0);
        assembled += if assembled < 0x01F00 { 0x08140 } else { 0x0C140 };
        buffer.push((assembled >> 8) as u8);
        buffer.push(assembled as u8);
    }
    result.push_str(&CharacterSet::ShiftJis.decode(&buffer));
    Ok(())
}

fn to_alphanumeric_char(value: u32) -> Result<char> {
    ALPHANUMERIC_TABLE
        .get(value as usize)
        .copied()
        .ok_or(DecodeError::Format("alphanumeric value out of range"))
}

fn decode_alphanumeric_segment(
    bits: &mut BitSource<'_>,
    result: &mut String,
    mut count: usize,
    fc1_in_effect: bool,
) -> Result<()> {
    let mut segment = String::with_capacity(count);
    while count > 1 {
        if bits.available() < 11 {
            return Err(DecodeError::Format("alphanumeric segment overruns data"));
        }
        let next_two = bits.read_bits(11)?;
        segment.push(to_alphanumeric_char(next_two / 45)?);
        segment.push(to_alphanumeric_char(next_two % 45)?);
        count -= 2;
    }
    if count == 1 {
        if bits.available() < 6 {
            return Err(DecodeError::Format("alphanumeric segment overruns data"));
        }
        segment.push(to_alphanumeric_char(bits.read_bits(6)?)?);
    }

    if fc1_in_effect {
        // %% is a literal percent, a lone % is the GS separator
        let mut chars = segment.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '%' {
                if chars.peek() == Some(&'%') {
                    chars.next();
                    result.push('%');
                } else {
                    result.push('\u{1D}');
                }
            } else {
                result.push(c);
            }
        }
    } else {
        result.push_str(&segment);
    }
    Ok(())
}

fn push_digits(result: &mut String, value: u32, width: usize) {
    result.push_str(&format!("{value:0width$}"));
}

fn decode_numeric_segment(bits: &mut BitSource<'_>, result: &mut String, mut count: usize) -> Result<()> {
    while count >= 3 {
        if bits.available() < 10 {
            return Err(DecodeError::Format("numeric segment overruns data"));
        }
        let three_digits = bits.read_bits(10)?;
        if three_digits >= 1000 {
            return Err(DecodeError::Format("numeric triple out of range"));
        }
        push_digits(result, three_digits, 3);
        count -= 3;
    }
    if count == 2 {
        if bits.available() < 7 {
            return Err(DecodeError::Format("numeric segment overruns data"));
        }
        let two_digits = bits.read_bits(7)?;
        if two_digits >= 100 {
            return Err(DecodeError::Format("numeric pair out of range"));
        }
        push_digits(result, two_digits, 2);
    } else if count == 1 {
        if bits.available() < 4 {
            return Err(DecodeError::Format("numeric segment overruns data"));
        }
        let digit = bits.read_bits(4)?;
        if digit >= 10 {
            return Err(DecodeError::Format("numeric digit out of range"));
        }
        push_digits(result, digit, 1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BitArray;

    fn v1() -> Version {
        Version::for_number(1).unwrap()
    }

    fn parse(bits: &BitArray) -> Result<DecoderResult> {
        let bytes = bits.to_bytes(0, bits.size_in_bytes());
        decode(&bytes, v1(), ErrorCorrectionLevel::M, None)
    }

    #[test]
    fn test_simple_byte_mode() {
        let mut bits = BitArray::new();
        bits.append_bits(0x04, 4);
        bits.append_bits(0x03, 8);
        bits.append_bits(0xF1, 8);
        bits.append_bits(0xF2, 8);
        bits.append_bits(0xF3, 8);
        let result = parse(&bits).unwrap();
        assert_eq!(result.text, "\u{f1}\u{f2}\u{f3}");
        assert_eq!(result.byte_segments, vec![vec![0xF1, 0xF2, 0xF3]]);
        assert_eq!(result.symbology_modifier, 1);
    }

    #[test]
    fn test_numeric_and_alphanumeric() {
        let mut bits = BitArray::new();
        bits.append_bits(0x1, 4);
        bits.append_bits(8, 10);
        bits.append_bits(12, 10);
        bits.append_bits(345, 10);
        bits.append_bits(67, 7);
        bits.append_bits(0x2, 4);
        bits.append_bits(3, 9);
        bits.append_bits(10 * 45 + 36, 11);
        bits.append_bits(44, 6);
        bits.append_bits(0, 4);
        assert_eq!(parse(&bits).unwrap().text, "01234567A :");
    }

    #[test]
    fn test_eci_switches_charset() {
        let mut bits = BitArray::new();
        bits.append_bits(0x7, 4);
        bits.append_bits(26, 8); // UTF-8
        bits.append_bits(0x4, 4);
        bits.append_bits(2, 8);
        bits.append_bits(0xC3, 8);
        bits.append_bits(0xA9, 8);
        let result = parse(&bits).unwrap();
        assert_eq!(result.text, "é");
        assert_eq!(result.symbology_modifier, 2);
    }

    #[test]
    fn test_fnc1_alphanumeric_percent() {
        let mut bits = BitArray::new();
        bits.append_bits(0x5, 4);
        bits.append_bits(0x2, 4);
        bits.append_bits(5, 9);
        // "A%", "%B", "%"
        bits.append_bits(10 * 45 + 38, 11);
        bits.append_bits(38 * 45 + 11, 11);
        bits.append_bits(38, 6);
        let result = parse(&bits).unwrap();
        assert_eq!(result.text, "A%B\u{1D}");
        assert_eq!(result.symbology_modifier, 3);
    }

    #[test]
    fn test_kanji_segment() {
        let mut bits = BitArray::new();
        bits.append_bits(0x8, 4);
        bits.append_bits(1, 8);
        // 0x935F in Shift JIS is 点
        bits.append_bits(0x0D9F, 13);
        assert_eq!(parse(&bits).unwrap().text, "点");
    }

    #[test]
    fn test_hanzi_segment() {
        let mut bits = BitArray::new();
        bits.append_bits(0xD, 4);
        bits.append_bits(GB2312_SUBSET, 4);
        bits.append_bits(1, 8);
        // 0xB0A1 in GB 2312 is 啊
        bits.append_bits(0x03C0, 13);
        assert_eq!(parse(&bits).unwrap().text, "啊");
    }

    #[test]
    fn test_structured_append() {
        let mut bits = BitArray::new();
        bits.append_bits(0x3, 4);
        bits.append_bits(0x21, 8);
        bits.append_bits(0x7F, 8);
        bits.append_bits(0x4, 4);
        bits.append_bits(1, 8);
        bits.append_bits(b'x' as u32, 8);
        let result = parse(&bits).unwrap();
        assert_eq!(result.text, "x");
        assert_eq!(result.structured_append_sequence, Some(0x21));
        assert_eq!(result.structured_append_parity, Some(0x7F));
    }

    #[test]
    fn test_bad_mode_and_overrun() {
        let mut bits = BitArray::new();
        bits.append_bits(0x6, 4);
        bits.append_bits(0, 4);
        assert!(matches!(parse(&bits), Err(DecodeError::Format(_))));

        let mut bits = BitArray::new();
        bits.append_bits(0x4, 4);
        bits.append_bits(10, 8);
        bits.append_bits(0x41, 8);
        assert!(matches!(parse(&bits), Err(DecodeError::Format(_))));
    }

    #[test]
    fn test_unknown_eci() {
        let mut bits = BitArray::new();
        bits.append_bits(0x7, 4);
        bits.append_bits(0x80 | 0x3F, 8);
        bits.append_bits(0xFF, 8);
        assert!(matches!(parse(&bits), Err(DecodeError::Format(_))));
    }
}
