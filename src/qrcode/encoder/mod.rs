//! QR Code encoding
//!
//! Text is packed into a single segment (numeric, alphanumeric, byte or
//! kanji), the smallest version that fits is chosen, RS blocks are
//! interleaved and the mask with the lowest penalty is applied.

/// Mask penalty rules
pub mod mask_util;
/// Module placement
pub mod matrix_util;

pub use matrix_util::ByteMatrix;

use crate::decoder::ReedSolomonEncoder;
use crate::decoder::galois::QR_CODE_FIELD_256;
use crate::error::EncodeError;
use crate::models::{BitArray, EncodeHints};
use crate::qrcode::decoder::mode::ALPHANUMERIC_TABLE;
use crate::qrcode::decoder::{ErrorCorrectionLevel, MaskPattern, Mode, Version};
use crate::utils::charset::CharacterSet;

/// Byte segments without a character set hint are ISO-8859-1 when possible
const DEFAULT_BYTE_MODE_ENCODING: CharacterSet = CharacterSet::Iso8859_1;

/// A fully laid out QR symbol
#[derive(Debug, Clone)]
pub struct QrCode {
    /// Segment mode of the payload
    pub mode: Mode,
    /// Error correction level
    pub ec_level: ErrorCorrectionLevel,
    /// Symbol version
    pub version: Version,
    /// Applied data mask
    pub mask_pattern: MaskPattern,
    /// Module grid
    pub matrix: ByteMatrix,
}

/// Encode `content` at `ec_level`
pub fn encode(content: &str, ec_level: ErrorCorrectionLevel, hints: &EncodeHints) -> Result<QrCode, EncodeError> {
    let mut has_encoding_hint = hints.character_set.is_some();
    let encoding = match hints.character_set {
        Some(charset) => charset,
        None if DEFAULT_BYTE_MODE_ENCODING.encode(content).is_some() => DEFAULT_BYTE_MODE_ENCODING,
        None => {
            has_encoding_hint = true;
            CharacterSet::Utf8
        }
    };

    let mode = choose_mode(content, encoding);

    let mut header_bits = BitArray::new();
    if mode == Mode::Byte && has_encoding_hint {
        header_bits.append_bits(Mode::Eci.bits(), 4);
        header_bits.append_bits(encoding.eci_value(), 8);
    }
    header_bits.append_bits(mode.bits(), 4);

    let mut data_bits = BitArray::new();
    append_bytes(content, mode, &mut data_bits, encoding)?;

    let version = match hints.qr_version {
        Some(number) => {
            let version = Version::for_number(number)
                .map_err(|_| EncodeError::InvalidArgument(format!("invalid QR version {number}")))?;
            if !will_fit(bits_needed(mode, &header_bits, &data_bits, version), version, ec_level) {
                return Err(EncodeError::TooLong);
            }
            version
        }
        None => recommend_version(ec_level, mode, &header_bits, &data_bits)?,
    };

    let mut header_and_data_bits = header_bits;
    let num_letters = if mode == Mode::Byte {
        data_bits.size_in_bytes()
    } else {
        content.chars().count()
    };
    append_length_info(num_letters, version, mode, &mut header_and_data_bits)?;
    header_and_data_bits.append_bit_array(&data_bits);

    let ec_blocks = version.ec_blocks(ec_level);
    let num_data_bytes = version.total_codewords() - ec_blocks.total_ec_codewords();
    terminate_bits(num_data_bytes, &mut header_and_data_bits)?;

    let final_bits = interleave_with_ec_bytes(
        &header_and_data_bits,
        version.total_codewords(),
        num_data_bytes,
        ec_blocks.num_blocks(),
    )?;

    let dimension = version.dimension();
    let mut matrix = ByteMatrix::new(dimension, dimension);
    let mask_pattern = match hints.qr_mask.map(MaskPattern::from_bits) {
        Some(Ok(mask)) => mask,
        Some(Err(_)) => return Err(EncodeError::InvalidArgument("QR mask must be 0..=7".into())),
        None => choose_mask_pattern(&final_bits, ec_level, version, &mut matrix)?,
    };
    matrix_util::build_matrix(&final_bits, ec_level, version, mask_pattern, &mut matrix)?;
    tracing::trace!(version = version.number(), %ec_level, mask = mask_pattern as u8, "encoded QR symbol");

    Ok(QrCode {
        mode,
        ec_level,
        version,
        mask_pattern,
        matrix,
    })
}

/// Alphanumeric table index of `c`
fn alphanumeric_code(c: char) -> Option<u32> {
    ALPHANUMERIC_TABLE.iter().position(|&a| a == c).map(|p| p as u32)
}

/// Densest mode that can carry every character of `content`
pub fn choose_mode(content: &str, encoding: CharacterSet) -> Mode {
    if encoding == CharacterSet::ShiftJis && is_only_double_byte_kanji(content) {
        return Mode::Kanji;
    }
    let mut has_numeric = false;
    let mut has_alphanumeric = false;
    for c in content.chars() {
        if c.is_ascii_digit() {
            has_numeric = true;
        } else if alphanumeric_code(c).is_some() {
            has_alphanumeric = true;
        } else {
            return Mode::Byte;
        }
    }
    if has_alphanumeric {
        Mode::Alphanumeric
    } else if has_numeric {
        Mode::Numeric
    } else {
        Mode::Byte
    }
}

fn is_only_double_byte_kanji(content: &str) -> bool {
    let Some(bytes) = CharacterSet::ShiftJis.encode(content) else {
        return false;
    };
    if bytes.is_empty() || bytes.len() % 2 != 0 {
        return false;
    }
    bytes
        .chunks_exact(2)
        .all(|pair| (0x81..=0x9F).contains(&pair[0]) || (0xE0..=0xEB).contains(&pair[0]))
}

fn choose_mask_pattern(
    bits: &BitArray,
    ec_level: ErrorCorrectionLevel,
    version: Version,
    matrix: &mut ByteMatrix,
) -> Result<MaskPattern, EncodeError> {
    let mut min_penalty = u32::MAX;
    let mut best = MaskPattern::Pattern0;
    for mask in MaskPattern::ALL {
        matrix_util::build_matrix(bits, ec_level, version, mask, matrix)?;
        let penalty = mask_util::mask_penalty(matrix);
        if penalty < min_penalty {
            min_penalty = penalty;
            best = mask;
        }
    }
    Ok(best)
}

fn bits_needed(mode: Mode, header_bits: &BitArray, data_bits: &BitArray, version: Version) -> usize {
    header_bits.size() + mode.character_count_bits(version) + data_bits.size()
}

/// Two passes: the count field width depends on the version tier
fn recommend_version(
    ec_level: ErrorCorrectionLevel,
    mode: Mode,
    header_bits: &BitArray,
    data_bits: &BitArray,
) -> Result<Version, EncodeError> {
    let first = Version::for_number(1).map_err(|_| EncodeError::TooLong)?;
    let provisional = choose_version(bits_needed(mode, header_bits, data_bits, first), ec_level)?;
    choose_version(bits_needed(mode, header_bits, data_bits, provisional), ec_level)
}

fn choose_version(num_input_bits: usize, ec_level: ErrorCorrectionLevel) -> Result<Version, EncodeError> {
    (1..=40)
        .filter_map(|n| Version::for_number(n).ok())
        .find(|&version| will_fit(num_input_bits, version, ec_level))
        .ok_or(EncodeError::TooLong)
}

fn will_fit(num_input_bits: usize, version: Version, ec_level: ErrorCorrectionLevel) -> bool {
    version.data_codewords(ec_level) >= num_input_bits.div_ceil(8)
}

/// Terminator, byte alignment and the alternating 0xEC/0x11 pad bytes
pub fn terminate_bits(num_data_bytes: usize, bits: &mut BitArray) -> Result<(), EncodeError> {
    let capacity = num_data_bytes * 8;
    if bits.size() > capacity {
        return Err(EncodeError::TooLong);
    }
    for _ in 0..4 {
        if bits.size() >= capacity {
            break;
        }
        bits.append_bit(false);
    }
    let partial = bits.size() & 0x07;
    if partial > 0 {
        for _ in partial..8 {
            bits.append_bit(false);
        }
    }
    let num_padding_bytes = num_data_bytes.saturating_sub(bits.size_in_bytes());
    for i in 0..num_padding_bytes {
        bits.append_bits(if i & 0x01 == 0 { 0xEC } else { 0x11 }, 8);
    }
    if bits.size() != capacity {
        return Err(EncodeError::InvalidArgument("bit count does not match capacity".into()));
    }
    Ok(())
}

/// Data and EC byte counts of block `block_id`
fn data_and_ec_bytes_for_block(
    num_total_bytes: usize,
    num_data_bytes: usize,
    num_rs_blocks: usize,
    block_id: usize,
) -> (usize, usize) {
    let blocks_in_group2 = num_total_bytes % num_rs_blocks;
    let blocks_in_group1 = num_rs_blocks - blocks_in_group2;
    let total_in_group1 = num_total_bytes / num_rs_blocks;
    let data_in_group1 = num_data_bytes / num_rs_blocks;
    let ec_bytes = total_in_group1 - data_in_group1;
    if block_id < blocks_in_group1 {
        (data_in_group1, ec_bytes)
    } else {
        (data_in_group1 + 1, ec_bytes)
    }
}

/// Split into RS blocks, append EC bytes and interleave column-wise
pub fn interleave_with_ec_bytes(
    bits: &BitArray,
    num_total_bytes: usize,
    num_data_bytes: usize,
    num_rs_blocks: usize,
) -> Result<BitArray, EncodeError> {
    if bits.size_in_bytes() != num_data_bytes {
        return Err(EncodeError::InvalidArgument("data bytes do not match bit count".into()));
    }

    let mut encoder = ReedSolomonEncoder::new(&QR_CODE_FIELD_256);
    let mut data_offset = 0;
    let mut blocks: Vec<(Vec<u8>, Vec<u8>)> = Vec::with_capacity(num_rs_blocks);
    for block_id in 0..num_rs_blocks {
        let (num_data, num_ec) = data_and_ec_bytes_for_block(num_total_bytes, num_data_bytes, num_rs_blocks, block_id);
        let data = bits.to_bytes(8 * data_offset, num_data);
        let ec = generate_ec_bytes(&mut encoder, &data, num_ec)?;
        blocks.push((data, ec));
        data_offset += num_data;
    }
    if data_offset != num_data_bytes {
        return Err(EncodeError::InvalidArgument("data bytes do not match block layout".into()));
    }

    let max_data = blocks.iter().map(|(d, _)| d.len()).max().unwrap_or(0);
    let max_ec = blocks.iter().map(|(_, e)| e.len()).max().unwrap_or(0);
    let mut result = BitArray::new();
    for i in 0..max_data {
        for (data, _) in &blocks {
            if let Some(&byte) = data.get(i) {
                result.append_bits(byte as u32, 8);
            }
        }
    }
    for i in 0..max_ec {
        for (_, ec) in &blocks {
            if let Some(&byte) = ec.get(i) {
                result.append_bits(byte as u32, 8);
            }
        }
    }
    if result.size_in_bytes() != num_total_bytes {
        return Err(EncodeError::InvalidArgument("interleaving produced the wrong length".into()));
    }
    Ok(result)
}

fn generate_ec_bytes(encoder: &mut ReedSolomonEncoder, data: &[u8], num_ec: usize) -> Result<Vec<u8>, EncodeError> {
    let mut to_encode: Vec<u32> = data.iter().map(|&b| b as u32).collect();
    to_encode.resize(data.len() + num_ec, 0);
    encoder.encode(&mut to_encode, num_ec)?;
    Ok(to_encode[data.len()..].iter().map(|&c| c as u8).collect())
}

fn append_length_info(num_letters: usize, version: Version, mode: Mode, bits: &mut BitArray) -> Result<(), EncodeError> {
    let num_bits = mode.character_count_bits(version);
    if num_letters >= 1 << num_bits {
        return Err(EncodeError::TooLong);
    }
    bits.append_bits(num_letters as u32, num_bits);
    Ok(())
}

fn append_bytes(content: &str, mode: Mode, bits: &mut BitArray, encoding: CharacterSet) -> Result<(), EncodeError> {
    match mode {
        Mode::Numeric => {
            append_numeric_bytes(content, bits);
            Ok(())
        }
        Mode::Alphanumeric => append_alphanumeric_bytes(content, bits),
        Mode::Byte => {
            let bytes = encoding.encode(content).ok_or_else(|| {
                EncodeError::UnsupportedChar(
                    content
                        .chars()
                        .find(|c| encoding.encode(&c.to_string()).is_none())
                        .unwrap_or('\u{FFFD}'),
                )
            })?;
            for b in bytes {
                bits.append_bits(b as u32, 8);
            }
            Ok(())
        }
        Mode::Kanji => append_kanji_bytes(content, bits),
        _ => Err(EncodeError::InvalidArgument(format!("cannot encode in {mode:?} mode"))),
    }
}

fn append_numeric_bytes(content: &str, bits: &mut BitArray) {
    let digits: Vec<u32> = content.bytes().map(|b| (b - b'0') as u32).collect();
    for group in digits.chunks(3) {
        match *group {
            [a, b, c] => bits.append_bits(a * 100 + b * 10 + c, 10),
            [a, b] => bits.append_bits(a * 10 + b, 7),
            [a] => bits.append_bits(a, 4),
            _ => {}
        }
    }
}

fn append_alphanumeric_bytes(content: &str, bits: &mut BitArray) -> Result<(), EncodeError> {
    let codes = content
        .chars()
        .map(|c| alphanumeric_code(c).ok_or(EncodeError::UnsupportedChar(c)))
        .collect::<Result<Vec<u32>, _>>()?;
    for pair in codes.chunks(2) {
        match *pair {
            [a, b] => bits.append_bits(a * 45 + b, 11),
            [a] => bits.append_bits(a, 6),
            _ => {}
        }
    }
    Ok(())
}

fn append_kanji_bytes(content: &str, bits: &mut BitArray) -> Result<(), EncodeError> {
    let bytes = CharacterSet::ShiftJis
        .encode(content)
        .ok_or_else(|| EncodeError::InvalidArgument("content is not Shift_JIS".into()))?;
    if bytes.len() % 2 != 0 {
        return Err(EncodeError::InvalidArgument("odd Shift_JIS byte count".into()));
    }
    for pair in bytes.chunks_exact(2) {
        let code = ((pair[0] as u32) << 8) | pair[1] as u32;
        let subtracted = match code {
            0x8140..=0x9FFC => code - 0x8140,
            0xE040..=0xEBBF => code - 0xC140,
            _ => return Err(EncodeError::InvalidArgument("invalid Shift_JIS sequence".into())),
        };
        bits.append_bits((subtracted >> 8) * 0xC0 + (subtracted & 0xFF), 13);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qrcode::decoder::QrDecoder;

    #[test]
    fn test_choose_mode() {
        assert_eq!(choose_mode("0123", CharacterSet::Iso8859_1), Mode::Numeric);
        assert_eq!(choose_mode("HELLO", CharacterSet::Iso8859_1), Mode::Alphanumeric);
        assert_eq!(choose_mode("hello", CharacterSet::Iso8859_1), Mode::Byte);
        assert_eq!(choose_mode("", CharacterSet::Iso8859_1), Mode::Byte);
        assert_eq!(choose_mode("点茗", CharacterSet::ShiftJis), Mode::Kanji);
    }

    #[test]
    fn test_append_numeric_and_alphanumeric() {
        let mut bits = BitArray::new();
        append_numeric_bytes("12345", &mut bits);
        // 123 in 10 bits, 45 in 7 bits
        assert_eq!(bits.size(), 17);
        let mut bits = BitArray::new();
        append_alphanumeric_bytes("AC-", &mut bits).unwrap();
        assert_eq!(bits.size(), 17);
        assert_eq!(bits.to_bytes(0, 2), vec![0x39, 0xD4]);
        assert_eq!(
            append_alphanumeric_bytes("a", &mut BitArray::new()),
            Err(EncodeError::UnsupportedChar('a'))
        );
    }

    #[test]
    fn test_terminate_bits() {
        let mut bits = BitArray::new();
        terminate_bits(0, &mut bits).unwrap();
        assert_eq!(bits.size(), 0);

        let mut bits = BitArray::new();
        bits.append_bits(0, 3);
        terminate_bits(3, &mut bits).unwrap();
        assert_eq!(bits.to_bytes(0, 3), vec![0x00, 0xEC, 0x11]);
    }

    #[test]
    fn test_block_sizes() {
        // 5-Q: 134 total bytes, 62 data bytes, 4 blocks
        assert_eq!(data_and_ec_bytes_for_block(134, 62, 4, 0), (15, 18));
        assert_eq!(data_and_ec_bytes_for_block(134, 62, 4, 3), (16, 18));
    }

    #[test]
    fn test_encode_hello_version_1() {
        let code = encode("HELLO", ErrorCorrectionLevel::M, &EncodeHints::default()).unwrap();
        assert_eq!(code.mode, Mode::Alphanumeric);
        assert_eq!(code.version.number(), 1);
        assert_eq!(code.matrix.width(), 21);
    }

    #[test]
    fn test_forced_version_and_mask() {
        let hints = EncodeHints {
            qr_version: Some(5),
            qr_mask: Some(3),
            ..EncodeHints::default()
        };
        let code = encode("forced", ErrorCorrectionLevel::L, &hints).unwrap();
        assert_eq!(code.version.number(), 5);
        assert_eq!(code.mask_pattern, MaskPattern::Pattern3);

        let too_small = EncodeHints {
            qr_version: Some(1),
            ..EncodeHints::default()
        };
        let long = "x".repeat(40);
        assert_eq!(
            encode(&long, ErrorCorrectionLevel::H, &too_small).unwrap_err(),
            EncodeError::TooLong
        );
    }

    #[test]
    fn test_encode_decode_grid() {
        let decoder = QrDecoder::default();
        for (text, level) in [
            ("HELLO", ErrorCorrectionLevel::M),
            ("0123456789012345", ErrorCorrectionLevel::H),
            ("Grüße aus Köln", ErrorCorrectionLevel::Q),
            ("こんにちは", ErrorCorrectionLevel::L),
        ] {
            let code = encode(text, level, &EncodeHints::default()).unwrap();
            let decoded = decoder.decode(&code.matrix.to_bit_matrix(), None).unwrap();
            assert_eq!(decoded.result.text, text);
            assert_eq!(decoded.result.ec_level.as_deref(), Some(level.to_string().as_str()));
            assert!(!decoded.mirrored);
        }
    }

    #[test]
    fn test_large_version_round_trip() {
        let text: String = (0..600).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let code = encode(&text, ErrorCorrectionLevel::Q, &EncodeHints::default()).unwrap();
        assert!(code.version.number() >= 7);
        let decoded = QrDecoder::default().decode(&code.matrix.to_bit_matrix(), None).unwrap();
        assert_eq!(decoded.result.text, text);
    }

    #[test]
    fn test_mirrored_grid_decodes() {
        let code = encode("MIRROR", ErrorCorrectionLevel::L, &EncodeHints::default()).unwrap();
        let mirrored = code.matrix.to_bit_matrix().transpose();
        let decoded = QrDecoder::default().decode(&mirrored, None).unwrap();
        assert_eq!(decoded.result.text, "MIRROR");
        assert!(decoded.mirrored);
    }

    #[test]
    fn test_corrects_damaged_modules() {
        let code = encode("DAMAGE TOLERANT", ErrorCorrectionLevel::H, &EncodeHints::default()).unwrap();
        let mut bits = code.matrix.to_bit_matrix();
        // Flip a few data modules away from the function patterns
        for (x, y) in [(10, 10), (12, 14), (15, 18), (20, 20)] {
            bits.flip(x, y);
        }
        let decoded = QrDecoder::default().decode(&bits, None).unwrap();
        assert_eq!(decoded.result.text, "DAMAGE TOLERANT");
        assert!(decoded.result.errors_corrected > 0);
    }
}
