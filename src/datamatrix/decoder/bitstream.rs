//! Data Matrix high-level decoding: ASCII with its latches into C40, Text,
//! ANSI X12, EDIFACT and Base 256, plus ECI, FNC1 and the 05/06 macros.

use crate::error::{DecodeError, Result};
use crate::models::DecoderResult;
use crate::utils::bit_source::BitSource;
use crate::utils::charset::EciStringBuilder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Pad,
    Ascii,
    C40,
    Text,
    AnsiX12,
    Edifact,
    Base256,
    Eci,
}

const C40_BASIC_SET_CHARS: [u8; 40] = *b"*** 0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

const C40_SHIFT2_SET_CHARS: [u8; 27] = *b"!\"#$%&'()*+,-./:;<=>?@[\\]^_";

const TEXT_BASIC_SET_CHARS: [u8; 40] = *b"*** 0123456789abcdefghijklmnopqrstuvwxyz";

const TEXT_SHIFT3_SET_CHARS: [u8; 32] = *b"`ABCDEFGHIJKLMNOPQRSTUVWXYZ{|}~\x7f";

const MACRO_05_HEADER: &str = "[)>\u{1E}05\u{1D}";
const MACRO_06_HEADER: &str = "[)>\u{1E}06\u{1D}";
const MACRO_TRAILER: &str = "\u{1E}\u{04}";

const GROUP_SEPARATOR: u8 = 29;

#[derive(Default)]
struct State {
    result: EciStringBuilder,
    trailer: String,
    byte_segments: Vec<Vec<u8>>,
    fnc1_first: bool,
    fnc1_second: bool,
}

/// Parse corrected data codewords into a [`DecoderResult`]
pub fn decode(bytes: &[u8]) -> Result<DecoderResult> {
    let mut bits = BitSource::new(bytes);
    let mut state = State::default();
    let mut mode = Mode::Ascii;
    loop {
        mode = match mode {
            Mode::Ascii => decode_ascii_segment(&mut bits, &mut state)?,
            Mode::C40 => {
                decode_c40_or_text_segment(&mut bits, &mut state, false)?;
                Mode::Ascii
            }
            Mode::Text => {
                decode_c40_or_text_segment(&mut bits, &mut state, true)?;
                Mode::Ascii
            }
            Mode::AnsiX12 => {
                decode_ansi_x12_segment(&mut bits, &mut state)?;
                Mode::Ascii
            }
            Mode::Edifact => {
                decode_edifact_segment(&mut bits, &mut state)?;
                Mode::Ascii
            }
            Mode::Base256 => {
                decode_base256_segment(&mut bits, &mut state)?;
                Mode::Ascii
            }
            Mode::Eci => {
                decode_eci_segment(&mut bits, &mut state)?;
                Mode::Ascii
            }
            Mode::Pad => return Err(DecodeError::Format("unexpected pad mode")),
        };
        if mode == Mode::Pad || bits.available() == 0 {
            break;
        }
    }

    let State {
        mut result,
        trailer,
        byte_segments,
        fnc1_first,
        fnc1_second,
    } = state;
    if !trailer.is_empty() {
        result.append_str(&trailer);
    }
    let symbology_modifier = match (result.had_eci(), fnc1_first, fnc1_second) {
        (true, true, _) => 5,
        (true, false, true) => 6,
        (true, false, false) => 4,
        (false, true, _) => 2,
        (false, false, true) => 3,
        (false, false, false) => 1,
    };

    let mut decoded = DecoderResult::new(bytes.to_vec(), result.finish());
    decoded.byte_segments = byte_segments;
    decoded.symbology_modifier = symbology_modifier;
    Ok(decoded)
}

fn decode_ascii_segment(bits: &mut BitSource<'_>, state: &mut State) -> Result<Mode> {
    let mut upper_shift = false;
    let mut first_fnc1_position = 1;
    let mut first_codeword = true;
    loop {
        let one_byte = bits.read_bits(8)?;
        match one_byte {
            0 => return Err(DecodeError::Format("ASCII codeword 0")),
            1..=128 => {
                let value = if upper_shift { one_byte + 128 } else { one_byte };
                state.result.append_byte((value - 1) as u8);
                return Ok(Mode::Ascii);
            }
            129 => return Ok(Mode::Pad),
            130..=229 => state.result.append_str(&format!("{:02}", one_byte - 130)),
            230 => return Ok(Mode::C40),
            231 => return Ok(Mode::Base256),
            232 => {
                let offset = bits.byte_offset();
                if offset == first_fnc1_position {
                    state.fnc1_first = true;
                } else if offset == first_fnc1_position + 1 {
                    state.fnc1_second = true;
                } else {
                    state.result.append_byte(GROUP_SEPARATOR);
                }
            }
            233 => {
                if !first_codeword {
                    return Err(DecodeError::Format("structured append must come first"));
                }
                // Sequence indicator and two file id codewords
                bits.read_bits(8)?;
                bits.read_bits(16)?;
                first_fnc1_position = 5;
            }
            // Reader programming
            234 => {}
            235 => upper_shift = true,
            236 => {
                state.result.append_str(MACRO_05_HEADER);
                state.trailer.insert_str(0, MACRO_TRAILER);
            }
            237 => {
                state.result.append_str(MACRO_06_HEADER);
                state.trailer.insert_str(0, MACRO_TRAILER);
            }
            238 => return Ok(Mode::AnsiX12),
            239 => return Ok(Mode::Text),
            240 => return Ok(Mode::Edifact),
            241 => return Ok(Mode::Eci),
            // Some encoders end with an unlatch while already in ASCII
            254 if bits.available() == 0 => {}
            _ => return Err(DecodeError::Format("invalid ASCII codeword")),
        }
        if bits.available() == 0 {
            return Ok(Mode::Ascii);
        }
        first_codeword = false;
    }
}

/// Three values packed as `1600 * c1 + 40 * c2 + c3 + 1`
fn parse_two_bytes(first: u32, second: u32) -> Result<[u32; 3]> {
    let full = ((first << 8) + second)
        .checked_sub(1)
        .ok_or(DecodeError::Format("invalid C40 pair"))?;
    Ok([full / 1600, (full % 1600) / 40, full % 40])
}

/// Next packed triple, or `None` at an unlatch or when only one byte is left
fn next_triple(bits: &mut BitSource<'_>) -> Result<Option<[u32; 3]>> {
    if bits.available() < 16 {
        return Ok(None);
    }
    let first = bits.read_bits(8)?;
    if first == 254 {
        return Ok(None);
    }
    let second = bits.read_bits(8)?;
    parse_two_bytes(first, second).map(Some)
}

fn emit(state: &mut State, c: u32, upper_shift: &mut bool) {
    let value = if *upper_shift { c + 128 } else { c };
    *upper_shift = false;
    state.result.append_byte(value as u8);
}

fn decode_c40_or_text_segment(bits: &mut BitSource<'_>, state: &mut State, text: bool) -> Result<()> {
    let basic_set = if text { &TEXT_BASIC_SET_CHARS } else { &C40_BASIC_SET_CHARS };
    let mut upper_shift = false;
    let mut shift = 0;

    while let Some(values) = next_triple(bits)? {
        for c_value in values {
            match shift {
                0 => {
                    if c_value < 3 {
                        shift = c_value + 1;
                    } else if let Some(&c) = basic_set.get(c_value as usize) {
                        emit(state, c as u32, &mut upper_shift);
                    } else {
                        return Err(DecodeError::Format("invalid C40 value"));
                    }
                }
                1 => {
                    emit(state, c_value, &mut upper_shift);
                    shift = 0;
                }
                2 => {
                    if let Some(&c) = C40_SHIFT2_SET_CHARS.get(c_value as usize) {
                        emit(state, c as u32, &mut upper_shift);
                    } else if c_value == 27 {
                        state.result.append_byte(GROUP_SEPARATOR);
                    } else if c_value == 30 {
                        upper_shift = true;
                    } else {
                        return Err(DecodeError::Format("invalid C40 shift 2 value"));
                    }
                    shift = 0;
                }
                _ => {
                    if text {
                        let c = TEXT_SHIFT3_SET_CHARS
                            .get(c_value as usize)
                            .ok_or(DecodeError::Format("invalid Text shift 3 value"))?;
                        emit(state, *c as u32, &mut upper_shift);
                    } else {
                        emit(state, c_value + 96, &mut upper_shift);
                    }
                    shift = 0;
                }
            }
        }
    }
    Ok(())
}

fn decode_ansi_x12_segment(bits: &mut BitSource<'_>, state: &mut State) -> Result<()> {
    while let Some(values) = next_triple(bits)? {
        for c_value in values {
            let c = match c_value {
                0 => b'\r',
                1 => b'*',
                2 => b'>',
                3 => b' ',
                4..=13 => (c_value + 44) as u8,
                14..=39 => (c_value + 51) as u8,
                _ => return Err(DecodeError::Format("invalid X12 value")),
            };
            state.result.append_byte(c);
        }
    }
    Ok(())
}

fn decode_edifact_segment(bits: &mut BitSource<'_>, state: &mut State) -> Result<()> {
    // Two bytes or fewer left are ASCII
    while bits.available() > 16 {
        for _ in 0..4 {
            let value = bits.read_bits(6)?;
            if value == 0x1F {
                // Unlatch; the rest of the byte is padding
                let bits_left = 8 - bits.bit_offset();
                if bits_left != 8 {
                    bits.read_bits(bits_left)?;
                }
                return Ok(());
            }
            let value = if value & 0x20 == 0 { value | 0x40 } else { value };
            state.result.append_byte(value as u8);
        }
    }
    Ok(())
}

fn decode_base256_segment(bits: &mut BitSource<'_>, state: &mut State) -> Result<()> {
    // Codeword positions are 1-based
    let mut position = 1 + bits.byte_offset();
    let d1 = unrandomize_255_state(bits.read_bits(8)?, position);
    position += 1;
    let count = match d1 {
        0 => bits.available() / 8,
        1..=249 => d1 as usize,
        _ => {
            let d2 = unrandomize_255_state(bits.read_bits(8)?, position);
            position += 1;
            250 * (d1 as usize - 249) + d2 as usize
        }
    };

    let mut bytes = Vec::with_capacity(count);
    for _ in 0..count {
        if bits.available() < 8 {
            return Err(DecodeError::Format("Base 256 segment runs past the data"));
        }
        bytes.push(unrandomize_255_state(bits.read_bits(8)?, position) as u8);
        position += 1;
    }
    state.result.append_bytes(&bytes);
    state.byte_segments.push(bytes);
    Ok(())
}

fn decode_eci_segment(bits: &mut BitSource<'_>, state: &mut State) -> Result<()> {
    let c1 = bits.read_bits(8)?;
    let value = if c1 <= 127 {
        c1.checked_sub(1).ok_or(DecodeError::Format("invalid ECI codeword"))?
    } else if c1 <= 191 {
        let c2 = bits.read_bits(8)?;
        (c1 - 128) * 254 + 127 + c2.saturating_sub(1)
    } else {
        let c2 = bits.read_bits(8)?;
        let c3 = bits.read_bits(8)?;
        (c1 - 192) * 64516 + 16383 + c2.saturating_sub(1) * 254 + c3.saturating_sub(1)
    };
    state.result.append_eci(value)
}

/// Undo the 255-state randomizing applied to Base 256 codewords
fn unrandomize_255_state(randomized: u32, position: usize) -> u32 {
    let pseudo_random = ((149 * position as u32) % 255) + 1;
    let value = randomized as i32 - pseudo_random as i32;
    if value >= 0 { value as u32 } else { (value + 256) as u32 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_standard_decode() {
        let bytes: Vec<u8> = b"abcABC".iter().map(|b| b + 1).collect();
        assert_eq!(decode(&bytes).unwrap().text, "abcABC");
    }

    #[test]
    fn test_ascii_double_digit_decode() {
        let bytes = [130, 1 + 130, 98 + 130, 99 + 130];
        assert_eq!(decode(&bytes).unwrap().text, "00019899");
    }

    #[test]
    fn test_pad_stops_decoding() {
        let bytes = [b'A' + 1, 129, 0];
        assert_eq!(decode(&bytes).unwrap().text, "A");
    }

    #[test]
    fn test_upper_shift() {
        // 235 then 'i' + 1 gives 0xE9
        let bytes = [235, b'i' + 1];
        assert_eq!(decode(&bytes).unwrap().text, "é");
    }

    #[test]
    fn test_c40_segment() {
        // "AIM": values 14, 22, 26 → 1600*14 + 40*22 + 26 + 1 = 23307
        let bytes = [230, (23307 >> 8) as u8, (23307 & 0xFF) as u8, 254, b'!' + 1];
        assert_eq!(decode(&bytes).unwrap().text, "AIM!");
    }

    #[test]
    fn test_text_segment() {
        // "aim" in Text uses the same values as "AIM" in C40
        let bytes = [239, (23307 >> 8) as u8, (23307 & 0xFF) as u8, 254];
        assert_eq!(decode(&bytes).unwrap().text, "aim");
    }

    #[test]
    fn test_x12_segment() {
        // "A*0": 14, 1, 4 → 1600*14 + 40 + 4 + 1 = 22445
        let bytes = [238, (22445 >> 8) as u8, (22445 & 0xFF) as u8, 254];
        assert_eq!(decode(&bytes).unwrap().text, "A*0");
    }

    #[test]
    fn test_edifact_segment() {
        // "ABC" then unlatch: 000001 000010 000011 011111
        let packed: u32 = (0x01 << 18) | (0x02 << 12) | (0x03 << 6) | 0x1F;
        let bytes = [240, (packed >> 16) as u8, (packed >> 8) as u8, packed as u8, b'D' + 1];
        assert_eq!(decode(&bytes).unwrap().text, "ABCD");
    }

    #[test]
    fn test_base256_segment() {
        fn randomize(value: u32, position: usize) -> u8 {
            let pseudo_random = ((149 * position as u32) % 255) + 1;
            ((value + pseudo_random) % 256) as u8
        }
        let bytes = [231, randomize(2, 2), randomize(0xC3, 3), randomize(0x28, 4)];
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.byte_segments, vec![vec![0xC3, 0x28]]);
        assert_eq!(decoded.text, "Ã(");
    }

    #[test]
    fn test_macro_05() {
        let bytes = [236, b'X' + 1];
        assert_eq!(decode(&bytes).unwrap().text, "[)>\u{1E}05\u{1D}X\u{1E}\u{04}");
    }

    #[test]
    fn test_fnc1_first_is_gs1() {
        let bytes = [232, 130 + 1, 130 + 23];
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.text, "0123");
        assert_eq!(decoded.symbology_modifier, 2);
    }

    #[test]
    fn test_eci_switches_charset() {
        // ECI 26 (UTF-8) then the two bytes of 'é', each behind an upper shift
        let bytes = [241, 27, 235, 0xC3 - 128 + 1, 235, 0xA9 - 128 + 1];
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.text, "é");
        assert_eq!(decoded.symbology_modifier, 4);
    }

    #[test]
    fn test_invalid_codeword() {
        assert!(decode(&[0]).is_err());
        assert!(decode(&[250, 1]).is_err());
    }
}
