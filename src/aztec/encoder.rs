//! Text to Aztec module grid
//!
//! High-level encoding is greedy: characters stay in the current table when
//! possible, single punctuation and upper-case letters use shifts, letters
//! and digits in runs use latches, and anything else goes out through
//! binary shift.

use super::decoder::{field_for_layers, layer_positions, total_bits_in_layer};
use crate::decoder::ReedSolomonEncoder;
use crate::decoder::galois::{AZTEC_PARAM, GenericGf};
use crate::error::EncodeError;
use crate::models::{BitArray, BitMatrix};
use crate::utils::charset::{CharacterSet, encode_with_eci};

/// Minimal share of check words, in percent
pub const DEFAULT_EC_PERCENT: usize = 33;
const MAX_NB_LAYERS: usize = 32;
const MAX_NB_LAYERS_COMPACT: usize = 4;

/// Word size per layer count
const WORD_SIZE: [usize; 33] = [
    4, 6, 6, 8, 8, 8, 8, 8, 8, 10, 10, 10, 10, 10, 10, 10, 10, 10, 10, 10, 10, 10, 10, 12, 12, 12, 12, 12, 12, 12,
    12, 12, 12,
];

const PUNCT_CHARS: &[u8] = b"!\"#$%&'()*+,-./:;<=>?[]{}";
const PUNCT_PAIRS: [&[u8; 2]; 4] = [b"\r\n", b". ", b", ", b": "];
const MIXED_CHARS: &[u8] = b"@\\^_`|~\x7f";
const MAX_BINARY_RUN: usize = 31 + 2047;

/// Encoded Aztec symbol
#[derive(Debug, Clone, PartialEq)]
pub struct AztecCode {
    /// Compact symbol
    pub compact: bool,
    /// Modules per side
    pub size: usize,
    /// Data layers
    pub layers: usize,
    /// Data codewords
    pub code_words: usize,
    /// One bit per module
    pub matrix: BitMatrix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Upper,
    Lower,
    Mixed,
    Digit,
}

impl Mode {
    fn code_bits(self) -> usize {
        if self == Mode::Digit { 4 } else { 5 }
    }

    fn code(self, b: u8) -> Option<u32> {
        let code = match (self, b) {
            (_, b' ') => 1,
            (Mode::Upper, b'A'..=b'Z') => b - b'A' + 2,
            (Mode::Lower, b'a'..=b'z') => b - b'a' + 2,
            (Mode::Digit, b'0'..=b'9') => b - b'0' + 2,
            (Mode::Digit, b',') => 12,
            (Mode::Digit, b'.') => 13,
            (Mode::Mixed, 1..=13) => b + 1,
            (Mode::Mixed, 27..=31) => b - 27 + 15,
            (Mode::Mixed, _) => {
                let index = MIXED_CHARS.iter().position(|&c| c == b)?;
                20 + index as u8
            }
            _ => return None,
        };
        Some(code as u32)
    }

    /// Codes that latch from `self` to `to`
    fn latch(self, to: Mode) -> &'static [(u32, usize)] {
        use Mode::*;
        match (self, to) {
            (Upper, Lower) | (Mixed, Lower) => &[(28, 5)],
            (Upper, Mixed) | (Lower, Mixed) => &[(29, 5)],
            (Upper, Digit) | (Lower, Digit) => &[(30, 5)],
            (Lower, Upper) => &[(30, 5), (14, 4)],
            (Mixed, Upper) => &[(29, 5)],
            (Mixed, Digit) => &[(29, 5), (30, 5)],
            (Digit, Upper) => &[(14, 4)],
            (Digit, Lower) => &[(14, 4), (28, 5)],
            (Digit, Mixed) => &[(14, 4), (29, 5)],
            _ => &[],
        }
    }
}

fn punct_code(b: u8) -> Option<u32> {
    if b == b'\r' {
        return Some(1);
    }
    PUNCT_CHARS.iter().position(|&c| c == b).map(|i| i as u32 + 6)
}

fn punct_pair_code(pair: &[u8]) -> Option<u32> {
    PUNCT_PAIRS.iter().position(|p| &p[..] == pair).map(|i| i as u32 + 2)
}

fn home_mode(b: u8) -> Option<Mode> {
    [Mode::Upper, Mode::Lower, Mode::Digit, Mode::Mixed]
        .into_iter()
        .find(|mode| mode.code(b).is_some())
}

/// Data bits for `text`, with an ECI designator when `charset` is not
/// Latin-1 or the text needs more than Latin-1
pub fn encode_high_level(text: &str, charset: Option<CharacterSet>) -> Result<BitArray, EncodeError> {
    let (bytes, eci) = encode_with_eci(text, charset)?;

    let mut bits = BitArray::new();
    if let Some(eci) = eci {
        // P/S FLG(n) followed by n decimal digits
        let digits = eci.to_string();
        bits.append_bits(0, 5);
        bits.append_bits(0, 5);
        bits.append_bits(digits.len() as u32, 3);
        for digit in digits.bytes() {
            bits.append_bits((digit - b'0') as u32 + 2, 4);
        }
    }
    encode_bytes(&bytes, &mut bits);
    Ok(bits)
}

fn encode_bytes(bytes: &[u8], bits: &mut BitArray) {
    let mut mode = Mode::Upper;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if let Some(code) = mode.code(b) {
            bits.append_bits(code, mode.code_bits());
            i += 1;
            continue;
        }

        // Punctuation, alone or as a two-character pair, through P/S
        let pair = bytes.get(i..i + 2).and_then(punct_pair_code);
        if let Some(code) = pair.or_else(|| punct_code(b)) {
            bits.append_bits(0, mode.code_bits());
            bits.append_bits(code, 5);
            i += if pair.is_some() { 2 } else { 1 };
            continue;
        }

        match home_mode(b) {
            Some(Mode::Upper)
                if matches!(mode, Mode::Lower | Mode::Digit)
                    && !bytes.get(i + 1).is_some_and(u8::is_ascii_uppercase) =>
            {
                let shift = if mode == Mode::Lower { 28 } else { 15 };
                bits.append_bits(shift, mode.code_bits());
                bits.append_bits((b - b'A' + 2) as u32, 5);
                i += 1;
            }
            Some(target) => {
                for &(code, width) in mode.latch(target) {
                    bits.append_bits(code, width);
                }
                mode = target;
            }
            None => {
                let run = bytes[i..]
                    .iter()
                    .take_while(|&&c| home_mode(c).is_none() && punct_code(c).is_none())
                    .count()
                    .min(MAX_BINARY_RUN);
                if mode == Mode::Digit {
                    for &(code, width) in mode.latch(Mode::Upper) {
                        bits.append_bits(code, width);
                    }
                    mode = Mode::Upper;
                }
                bits.append_bits(31, 5);
                if run > 31 {
                    bits.append_bits(0, 5);
                    bits.append_bits((run - 31) as u32, 11);
                } else {
                    bits.append_bits(run as u32, 5);
                }
                for &byte in &bytes[i..i + run] {
                    bits.append_bits(byte as u32, 8);
                }
                i += run;
            }
        }
    }
}

/// Build the symbol; `user_layers` of `0` picks the smallest size, a
/// negative count forces a compact symbol
pub fn encode(bits: &BitArray, min_ec_percent: usize, user_layers: i32) -> Result<AztecCode, EncodeError> {
    let ecc_bits = bits.size() * min_ec_percent / 100 + 11;
    let total_size_bits = bits.size() + ecc_bits;

    let (compact, layers, total_bits, word_size, stuffed) = if user_layers != 0 {
        let compact = user_layers < 0;
        let layers = user_layers.unsigned_abs() as usize;
        let max = if compact { MAX_NB_LAYERS_COMPACT } else { MAX_NB_LAYERS };
        if layers > max {
            return Err(EncodeError::InvalidArgument(format!("illegal value {user_layers} for layers")));
        }
        let total_bits = total_bits_in_layer(layers, compact);
        let word_size = WORD_SIZE[layers];
        let usable_bits = total_bits - total_bits % word_size;
        let stuffed = stuff_bits(bits, word_size);
        if stuffed.size() + ecc_bits > usable_bits || compact && stuffed.size() > word_size * 64 {
            return Err(EncodeError::TooLong);
        }
        (compact, layers, total_bits, word_size, stuffed)
    } else {
        choose_size(bits, ecc_bits, total_size_bits)?
    };

    let message_bits = generate_check_words(&stuffed, total_bits, word_size)?;
    let code_words = stuffed.size() / word_size;
    let mode_message = generate_mode_message(compact, layers, code_words)?;
    tracing::debug!(compact, layers, code_words, "Aztec symbol chosen");

    let base_matrix_size = if compact { 11 } else { 14 } + layers * 4;
    let matrix_size = if compact {
        base_matrix_size
    } else {
        base_matrix_size + 1 + 2 * ((base_matrix_size / 2 - 1) / 15)
    };
    let mut matrix = BitMatrix::square(matrix_size);
    for (i, (x, y)) in layer_positions(compact, layers).into_iter().enumerate() {
        if message_bits.get(i) {
            matrix.set(x, y);
        }
    }

    draw_mode_message(&mut matrix, compact, matrix_size, &mode_message);
    let center = matrix_size / 2;
    if compact {
        draw_bulls_eye(&mut matrix, center, 5);
    } else {
        draw_bulls_eye(&mut matrix, center, 7);
        let (mut i, mut j) = (0, 0);
        while i < base_matrix_size / 2 - 1 {
            for k in ((center & 1)..matrix_size).step_by(2) {
                matrix.set(center - j, k);
                matrix.set(center + j, k);
                matrix.set(k, center - j);
                matrix.set(k, center + j);
            }
            i += 15;
            j += 16;
        }
    }

    Ok(AztecCode {
        compact,
        size: matrix_size,
        layers,
        code_words,
        matrix,
    })
}

type SizeChoice = (bool, usize, usize, usize, BitArray);

fn choose_size(bits: &BitArray, ecc_bits: usize, total_size_bits: usize) -> Result<SizeChoice, EncodeError> {
    let mut word_size = 0;
    let mut stuffed = BitArray::new();
    for i in 0..=MAX_NB_LAYERS {
        let compact = i <= 3;
        let layers = if compact { i + 1 } else { i };
        let total_bits = total_bits_in_layer(layers, compact);
        if total_size_bits > total_bits {
            continue;
        }
        if stuffed.size() == 0 || word_size != WORD_SIZE[layers] {
            word_size = WORD_SIZE[layers];
            stuffed = stuff_bits(bits, word_size);
        }
        let usable_bits = total_bits - total_bits % word_size;
        if compact && stuffed.size() > word_size * 64 {
            continue;
        }
        if stuffed.size() + ecc_bits <= usable_bits {
            return Ok((compact, layers, total_bits, word_size, stuffed));
        }
    }
    Err(EncodeError::TooLong)
}

/// Split bits into words, forcing a flipped low bit wherever a word would
/// be all zeros or all ones
fn stuff_bits(bits: &BitArray, word_size: usize) -> BitArray {
    let mut out = BitArray::new();
    let n = bits.size() as isize;
    let mask = (1u32 << word_size) - 2;
    let mut i: isize = 0;
    while i < n {
        let mut word = 0u32;
        for j in 0..word_size as isize {
            if i + j >= n || bits.get((i + j) as usize) {
                word |= 1 << (word_size as isize - 1 - j);
            }
        }
        if word & mask == mask {
            out.append_bits(word & mask, word_size);
            i -= 1;
        } else if word & mask == 0 {
            out.append_bits(word | 1, word_size);
            i -= 1;
        } else {
            out.append_bits(word, word_size);
        }
        i += word_size as isize;
    }
    out
}

fn field_for_word_size(word_size: usize) -> &'static GenericGf {
    match word_size {
        4 => &AZTEC_PARAM,
        6 => field_for_layers(1).0,
        8 => field_for_layers(3).0,
        10 => field_for_layers(9).0,
        _ => field_for_layers(23).0,
    }
}

/// Append RS check words so the result fills `total_bits`, padding at the
/// front to a whole number of words
fn generate_check_words(bits: &BitArray, total_bits: usize, word_size: usize) -> Result<BitArray, EncodeError> {
    let message_words = bits.size() / word_size;
    let total_words = total_bits / word_size;
    let mut words = vec![0u32; total_words];
    for (i, word) in words.iter_mut().enumerate().take(message_words) {
        *word = (0..word_size).fold(0, |acc, j| (acc << 1) | bits.get(i * word_size + j) as u32);
    }
    ReedSolomonEncoder::new(field_for_word_size(word_size)).encode(&mut words, total_words - message_words)?;

    let mut out = BitArray::new();
    out.append_bits(0, total_bits % word_size);
    for word in words {
        out.append_bits(word, word_size);
    }
    Ok(out)
}

/// Layer and data word counts with their GF(16) check words
pub(crate) fn generate_mode_message(compact: bool, layers: usize, code_words: usize) -> Result<BitArray, EncodeError> {
    let mut message = BitArray::new();
    if compact {
        message.append_bits(layers as u32 - 1, 2);
        message.append_bits(code_words as u32 - 1, 6);
        generate_check_words(&message, 28, 4)
    } else {
        message.append_bits(layers as u32 - 1, 5);
        message.append_bits(code_words as u32 - 1, 11);
        generate_check_words(&message, 40, 4)
    }
}

fn draw_mode_message(matrix: &mut BitMatrix, compact: bool, matrix_size: usize, message: &BitArray) {
    let center = matrix_size / 2;
    if compact {
        for i in 0..7 {
            let offset = center - 3 + i;
            if message.get(i) {
                matrix.set(offset, center - 5);
            }
            if message.get(i + 7) {
                matrix.set(center + 5, offset);
            }
            if message.get(20 - i) {
                matrix.set(offset, center + 5);
            }
            if message.get(27 - i) {
                matrix.set(center - 5, offset);
            }
        }
    } else {
        for i in 0..10 {
            let offset = center - 5 + i + i / 5;
            if message.get(i) {
                matrix.set(offset, center - 7);
            }
            if message.get(i + 10) {
                matrix.set(center + 7, offset);
            }
            if message.get(29 - i) {
                matrix.set(offset, center + 7);
            }
            if message.get(39 - i) {
                matrix.set(center - 7, offset);
            }
        }
    }
}

/// Concentric dark rings plus the orientation marks at the corners
fn draw_bulls_eye(matrix: &mut BitMatrix, center: usize, size: usize) {
    for i in (0..size).step_by(2) {
        for j in center - i..=center + i {
            matrix.set(j, center - i);
            matrix.set(j, center + i);
            matrix.set(center - i, j);
            matrix.set(center + i, j);
        }
    }
    matrix.set(center - size, center - size);
    matrix.set(center - size + 1, center - size);
    matrix.set(center - size, center - size + 1);
    matrix.set(center + size, center - size);
    matrix.set(center + size, center - size + 1);
    matrix.set(center + size, center + size - 1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aztec::decoder::{self, high_level_decode};
    use crate::aztec::detector::AztecDetectorResult;

    fn bits_of(array: &BitArray) -> Vec<bool> {
        (0..array.size()).map(|i| array.get(i)).collect()
    }

    fn round_trip_text(text: &str) -> String {
        let bits = encode_high_level(text, None).unwrap();
        high_level_decode(&bits_of(&bits)).unwrap()
    }

    #[test]
    fn test_high_level_round_trips() {
        for text in [
            "ABC",
            "abc DEF ghi",
            "Hello, World!",
            "Code 2010: 1234567890.",
            "a@b\\c~d",
            "line\r\nbreak",
            "aBc",
            "x1Y",
            "\u{e9}t\u{e9}",
        ] {
            assert_eq!(round_trip_text(text), text);
        }
    }

    #[test]
    fn test_high_level_utf8_eci() {
        assert_eq!(round_trip_text("€ 100"), "€ 100");
    }

    #[test]
    fn test_long_binary_run() {
        let text: String = std::iter::repeat_n('\u{b5}', 40).collect();
        assert_eq!(round_trip_text(&text), text);
    }

    #[test]
    fn test_stuff_bits() {
        let mut bits = BitArray::new();
        bits.append_bits(0b000000_111111, 12);
        let stuffed = stuff_bits(&bits, 6);
        // 000001 then the zero pushed into the next word, then padding with ones
        assert_eq!(
            bits_of(&stuffed),
            bits_of(&{
                let mut expected = BitArray::new();
                expected.append_bits(0b000001, 6);
                expected.append_bits(0b011111, 6);
                expected.append_bits(0b111110, 6);
                expected
            })
        );
    }

    #[test]
    fn test_mode_message_compact() {
        let message = generate_mode_message(true, 1, 1).unwrap();
        assert_eq!(message.size(), 28);
        // Layers and word count are both zero-based in the first 8 bits
        assert!((0..8).all(|i| !message.get(i)));
    }

    #[test]
    fn test_symbol_decodes_without_detection() {
        let bits = encode_high_level("AZTEC 2D", None).unwrap();
        let code = encode(&bits, DEFAULT_EC_PERCENT, 0).unwrap();
        assert!(code.compact);
        assert_eq!(code.size, 4 * code.layers + 11);
        let detected = AztecDetectorResult {
            bits: code.matrix.clone(),
            points: Vec::new(),
            compact: code.compact,
            nb_data_blocks: code.code_words,
            nb_layers: code.layers,
        };
        assert_eq!(decoder::decode(&detected).unwrap().text, "AZTEC 2D");
    }

    #[test]
    fn test_full_size_with_alignment_grid() {
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(6);
        let bits = encode_high_level(&text, None).unwrap();
        let code = encode(&bits, DEFAULT_EC_PERCENT, 0).unwrap();
        assert!(!code.compact);
        let detected = AztecDetectorResult {
            bits: code.matrix.clone(),
            points: Vec::new(),
            compact: false,
            nb_data_blocks: code.code_words,
            nb_layers: code.layers,
        };
        assert_eq!(decoder::decode(&detected).unwrap().text, text);
    }

    #[test]
    fn test_user_layers() {
        let bits = encode_high_level("A", None).unwrap();
        assert_eq!(encode(&bits, 33, -2).unwrap().size, 19);
        assert!(matches!(encode(&bits, 33, 40), Err(EncodeError::InvalidArgument(_))));
        let long = encode_high_level(&"x".repeat(200), None).unwrap();
        assert_eq!(encode(&long, 33, -1), Err(EncodeError::TooLong));
    }
}
