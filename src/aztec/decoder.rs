//! Aztec bit extraction, error correction and high-level decoding

use super::detector::AztecDetectorResult;
use crate::decoder::ReedSolomonDecoder;
use crate::decoder::galois::{AZTEC_DATA_6, AZTEC_DATA_8, AZTEC_DATA_10, AZTEC_DATA_12, GenericGf};
use crate::error::{DecodeError, Result};
use crate::models::{BitMatrix, DecoderResult};
use crate::utils::charset::EciStringBuilder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Table {
    Upper,
    Lower,
    Mixed,
    Digit,
    Punct,
    Binary,
}

/// Decoded meaning of one code in a character table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Code {
    Text(&'static str),
    Latch(Table),
    Shift(Table),
    Flag,
}

use Code::{Flag, Latch, Shift, Text};

const UPPER_TABLE: [Code; 32] = [
    Shift(Table::Punct), Text(" "), Text("A"), Text("B"), Text("C"), Text("D"), Text("E"), Text("F"),
    Text("G"), Text("H"), Text("I"), Text("J"), Text("K"), Text("L"), Text("M"), Text("N"),
    Text("O"), Text("P"), Text("Q"), Text("R"), Text("S"), Text("T"), Text("U"), Text("V"),
    Text("W"), Text("X"), Text("Y"), Text("Z"), Latch(Table::Lower), Latch(Table::Mixed), Latch(Table::Digit), Shift(Table::Binary),
];

const LOWER_TABLE: [Code; 32] = [
    Shift(Table::Punct), Text(" "), Text("a"), Text("b"), Text("c"), Text("d"), Text("e"), Text("f"),
    Text("g"), Text("h"), Text("i"), Text("j"), Text("k"), Text("l"), Text("m"), Text("n"),
    Text("o"), Text("p"), Text("q"), Text("r"), Text("s"), Text("t"), Text("u"), Text("v"),
    Text("w"), Text("x"), Text("y"), Text("z"), Shift(Table::Upper), Latch(Table::Mixed), Latch(Table::Digit), Shift(Table::Binary),
];

const MIXED_TABLE: [Code; 32] = [
    Shift(Table::Punct), Text(" "), Text("\u{1}"), Text("\u{2}"), Text("\u{3}"), Text("\u{4}"), Text("\u{5}"), Text("\u{6}"),
    Text("\u{7}"), Text("\u{8}"), Text("\t"), Text("\n"), Text("\u{b}"), Text("\u{c}"), Text("\r"), Text("\u{1b}"),
    Text("\u{1c}"), Text("\u{1d}"), Text("\u{1e}"), Text("\u{1f}"), Text("@"), Text("\\"), Text("^"), Text("_"),
    Text("`"), Text("|"), Text("~"), Text("\u{7f}"), Latch(Table::Lower), Latch(Table::Upper), Latch(Table::Punct), Shift(Table::Binary),
];

const PUNCT_TABLE: [Code; 32] = [
    Flag, Text("\r"), Text("\r\n"), Text(". "), Text(", "), Text(": "), Text("!"), Text("\""),
    Text("#"), Text("$"), Text("%"), Text("&"), Text("'"), Text("("), Text(")"), Text("*"),
    Text("+"), Text(","), Text("-"), Text("."), Text("/"), Text(":"), Text(";"), Text("<"),
    Text("="), Text(">"), Text("?"), Text("["), Text("]"), Text("{"), Text("}"), Latch(Table::Upper),
];

const DIGIT_TABLE: [Code; 16] = [
    Shift(Table::Punct), Text(" "), Text("0"), Text("1"), Text("2"), Text("3"), Text("4"), Text("5"),
    Text("6"), Text("7"), Text("8"), Text("9"), Text(","), Text("."), Latch(Table::Upper), Shift(Table::Upper),
];

/// Decode a detected symbol
pub fn decode(detected: &AztecDetectorResult) -> Result<DecoderResult> {
    let raw_bits = extract_bits(detected, &detected.bits);
    let corrected = correct_bits(detected, &raw_bits)?;
    let text = high_level_decode(&corrected.bits)?;

    let mut result = DecoderResult::new(bits_to_bytes(&corrected.bits), text);
    result.num_bits = corrected.bits.len();
    result.ec_level = Some(format!("{}%", corrected.ec_level));
    result.errors_corrected = corrected.errors_corrected;
    Ok(result)
}

/// Text from error-corrected, unstuffed data bits
pub fn high_level_decode(bits: &[bool]) -> Result<String> {
    let end = bits.len();
    let mut latch_table = Table::Upper;
    let mut shift_table = Table::Upper;
    let mut result = EciStringBuilder::default();
    let mut index = 0;

    while index < end {
        if shift_table == Table::Binary {
            if end - index < 5 {
                break;
            }
            let mut length = read_code(bits, index, 5) as usize;
            index += 5;
            if length == 0 {
                if end - index < 11 {
                    break;
                }
                length = read_code(bits, index, 11) as usize + 31;
                index += 11;
            }
            for _ in 0..length {
                if end - index < 8 {
                    return Ok(result.finish());
                }
                result.append_byte(read_code(bits, index, 8) as u8);
                index += 8;
            }
            shift_table = latch_table;
            continue;
        }

        let size = if shift_table == Table::Digit { 4 } else { 5 };
        if end - index < size {
            break;
        }
        let code = read_code(bits, index, size) as usize;
        index += size;
        match character(shift_table, code) {
            Flag => {
                if end - index < 3 {
                    break;
                }
                let n = read_code(bits, index, 3);
                index += 3;
                match n {
                    // FNC1
                    0 => result.append_byte(29),
                    7 => return Err(DecodeError::Format("reserved FLG(7)")),
                    _ => {
                        if end - index < 4 * n as usize {
                            break;
                        }
                        let mut eci = 0;
                        for _ in 0..n {
                            let digit = read_code(bits, index, 4);
                            index += 4;
                            if !(2..=11).contains(&digit) {
                                return Err(DecodeError::Format("ECI digit out of range"));
                            }
                            eci = eci * 10 + (digit - 2);
                        }
                        result.append_eci(eci)?;
                    }
                }
                shift_table = latch_table;
            }
            // A shift ends in the mode it was invoked from, even if that mode
            // is itself a shift
            Latch(table) => {
                shift_table = table;
                latch_table = table;
            }
            Shift(table) => {
                latch_table = shift_table;
                shift_table = table;
            }
            Text(text) => {
                result.append_str(text);
                shift_table = latch_table;
            }
        }
    }
    Ok(result.finish())
}

fn character(table: Table, code: usize) -> Code {
    match table {
        Table::Upper => UPPER_TABLE[code],
        Table::Lower => LOWER_TABLE[code],
        Table::Mixed => MIXED_TABLE[code],
        Table::Digit => DIGIT_TABLE[code],
        Table::Punct | Table::Binary => PUNCT_TABLE[code],
    }
}

struct CorrectedBits {
    bits: Vec<bool>,
    ec_level: usize,
    errors_corrected: usize,
}

/// Field and codeword size for a layer count
pub(crate) fn field_for_layers(layers: usize) -> (&'static GenericGf, usize) {
    match layers {
        0..=2 => (&AZTEC_DATA_6, 6),
        3..=8 => (AZTEC_DATA_8, 8),
        9..=22 => (&AZTEC_DATA_10, 10),
        _ => (&AZTEC_DATA_12, 12),
    }
}

/// RS-correct the codewords and remove stuffed bits
fn correct_bits(detected: &AztecDetectorResult, raw_bits: &[bool]) -> Result<CorrectedBits> {
    let (field, codeword_size) = field_for_layers(detected.nb_layers);
    let num_data_codewords = detected.nb_data_blocks;
    let num_codewords = raw_bits.len() / codeword_size;
    if num_codewords < num_data_codewords {
        return Err(DecodeError::Format("more data codewords than the symbol holds"));
    }

    let offset = raw_bits.len() % codeword_size;
    let mut data_words: Vec<u32> = (0..num_codewords)
        .map(|i| read_code(raw_bits, offset + i * codeword_size, codeword_size))
        .collect();
    let errors_corrected = ReedSolomonDecoder::new(field).decode(&mut data_words, num_codewords - num_data_codewords)?;

    let mask = (1u32 << codeword_size) - 1;
    let mut bits = Vec::with_capacity(num_data_codewords * codeword_size);
    for &word in &data_words[..num_data_codewords] {
        if word == 0 || word == mask {
            return Err(DecodeError::Format("all-zero or all-one data codeword"));
        }
        if word == 1 || word == mask - 1 {
            // Stuffed: the low bit only breaks a run of equal bits
            bits.extend(std::iter::repeat_n(word > 1, codeword_size - 1));
        } else {
            bits.extend((0..codeword_size).rev().map(|bit| word & (1 << bit) != 0));
        }
    }

    Ok(CorrectedBits {
        bits,
        ec_level: 100 * (num_codewords - num_data_codewords) / num_codewords,
        errors_corrected,
    })
}

/// Module coordinate for each position of the symbol without alignment
/// lines
pub(crate) fn alignment_map(compact: bool, layers: usize) -> Vec<usize> {
    let base_matrix_size = if compact { 11 } else { 14 } + layers * 4;
    if compact {
        return (0..base_matrix_size).collect();
    }
    let matrix_size = base_matrix_size + 1 + 2 * ((base_matrix_size / 2 - 1) / 15);
    let orig_center = base_matrix_size / 2;
    let center = matrix_size / 2;
    let mut map = vec![0; base_matrix_size];
    for i in 0..orig_center {
        let new_offset = i + i / 15;
        map[orig_center - i - 1] = center - new_offset - 1;
        map[orig_center + i] = center + new_offset + 1;
    }
    map
}

/// Modules of layer `i` in reading order: two-wide strips down the left,
/// along the bottom, up the right and back along the top
pub(crate) fn layer_positions(compact: bool, layers: usize) -> Vec<(usize, usize)> {
    let map = alignment_map(compact, layers);
    let base_matrix_size = map.len();
    let mut positions = vec![(0, 0); total_bits_in_layer(layers, compact)];
    let mut row_offset = 0;
    for i in 0..layers {
        let row_size = (layers - i) * 4 + if compact { 9 } else { 12 };
        let low = i * 2;
        let high = base_matrix_size - 1 - low;
        for j in 0..row_size {
            let column_offset = j * 2;
            for k in 0..2 {
                positions[row_offset + column_offset + k] = (map[low + k], map[low + j]);
                positions[row_offset + 2 * row_size + column_offset + k] = (map[low + j], map[high - k]);
                positions[row_offset + 4 * row_size + column_offset + k] = (map[high - k], map[high - j]);
                positions[row_offset + 6 * row_size + column_offset + k] = (map[high - j], map[low + k]);
            }
        }
        row_offset += row_size * 8;
    }
    positions
}

fn extract_bits(detected: &AztecDetectorResult, matrix: &BitMatrix) -> Vec<bool> {
    layer_positions(detected.compact, detected.nb_layers)
        .into_iter()
        .map(|(x, y)| matrix.get(x, y))
        .collect()
}

/// Data bits available in `layers` layers
pub(crate) fn total_bits_in_layer(layers: usize, compact: bool) -> usize {
    (if compact { 88 } else { 112 } + 16 * layers) * layers
}

fn read_code(bits: &[bool], start: usize, length: usize) -> u32 {
    bits.iter()
        .skip(start)
        .take(length)
        .fold(0, |acc, &bit| (acc << 1) | bit as u32)
}

/// Pack bits MSB first, zero-padding the last byte
fn bits_to_bytes(bits: &[bool]) -> Vec<u8> {
    bits.chunks(8)
        .map(|chunk| {
            chunk
                .iter()
                .enumerate()
                .fold(0u8, |byte, (i, &bit)| byte | ((bit as u8) << (7 - i)))
        })
        .collect()
}
