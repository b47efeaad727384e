//! Format information: error correction level and data mask, 5 data bits
//! protected by a BCH(15,5) code and XOR-masked with 0x5412
use crate::error::{DecodeError, Result};

/// XOR mask applied to the format information word
pub const FORMAT_INFO_MASK_QR: u32 = 0x5412;

/// BCH(15,5) generator: x^10 + x^8 + x^5 + x^4 + x^2 + x + 1
const FORMAT_INFO_POLY: u32 = 0x537;

/// (masked format word, 5 data bits) for all 32 data values
const FORMAT_INFO_DECODE_LOOKUP: [(u32, u32); 32] = build_format_lookup();

const fn build_format_lookup() -> [(u32, u32); 32] {
    let mut table = [(0u32, 0u32); 32];
    let mut data = 0u32;
    while data < 32 {
        table[data as usize] = (((data << 10) | bch_remainder(data << 10)) ^ FORMAT_INFO_MASK_QR, data);
        data += 1;
    }
    table
}

const fn bch_remainder(mut value: u32) -> u32 {
    let mut bit = 14;
    while bit >= 10 {
        if value & (1 << bit) != 0 {
            value ^= FORMAT_INFO_POLY << (bit - 10);
        }
        bit -= 1;
    }
    value
}

/// QR error correction level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCorrectionLevel {
    /// Low (~7% recovery capacity)
    L,
    /// Medium (~15% recovery capacity)
    M,
    /// Quartile (~25% recovery capacity)
    Q,
    /// High (~30% recovery capacity)
    H,
}

impl ErrorCorrectionLevel {
    /// Level from the two format bits (01=L, 00=M, 11=Q, 10=H)
    pub fn from_bits(bits: u32) -> Result<Self> {
        match bits {
            0 => Ok(ErrorCorrectionLevel::M),
            1 => Ok(ErrorCorrectionLevel::L),
            2 => Ok(ErrorCorrectionLevel::H),
            3 => Ok(ErrorCorrectionLevel::Q),
            _ => Err(DecodeError::Format("invalid error correction bits")),
        }
    }

    /// The two format bits
    pub fn bits(self) -> u32 {
        match self {
            ErrorCorrectionLevel::L => 1,
            ErrorCorrectionLevel::M => 0,
            ErrorCorrectionLevel::Q => 3,
            ErrorCorrectionLevel::H => 2,
        }
    }

    /// Table index, L=0 through H=3
    pub fn ordinal(self) -> usize {
        self as usize
    }

    /// Level by name, case-insensitive
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "L" => Some(ErrorCorrectionLevel::L),
            "M" => Some(ErrorCorrectionLevel::M),
            "Q" => Some(ErrorCorrectionLevel::Q),
            "H" => Some(ErrorCorrectionLevel::H),
            _ => None,
        }
    }
}

impl std::fmt::Display for ErrorCorrectionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorCorrectionLevel::L => "L",
            ErrorCorrectionLevel::M => "M",
            ErrorCorrectionLevel::Q => "Q",
            ErrorCorrectionLevel::H => "H",
        };
        f.write_str(name)
    }
}

/// Decoded format information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatInformation {
    /// Error correction level
    pub ec_level: ErrorCorrectionLevel,
    /// Data mask pattern, 0 to 7
    pub data_mask: u8,
}

impl FormatInformation {
    fn from_data(data: u32) -> Result<Self> {
        Ok(Self {
            ec_level: ErrorCorrectionLevel::from_bits((data >> 3) & 0x03)?,
            data_mask: (data & 0x07) as u8,
        })
    }

    /// Decode the two format copies read from the symbol.
    ///
    /// Tolerates up to 3 bit errors in the better copy. Some encoders forget
    /// the XOR mask, so the words are retried with the mask applied.
    pub fn decode(masked_bits1: u32, masked_bits2: u32) -> Result<Self> {
        if let Some(info) = Self::do_decode(masked_bits1, masked_bits2) {
            return info;
        }
        Self::do_decode(masked_bits1 ^ FORMAT_INFO_MASK_QR, masked_bits2 ^ FORMAT_INFO_MASK_QR)
            .unwrap_or(Err(DecodeError::Format("unreadable format information")))
    }

    fn do_decode(masked_bits1: u32, masked_bits2: u32) -> Option<Result<Self>> {
        let mut best_difference = u32::MAX;
        let mut best_data = 0;
        for &(target, data) in &FORMAT_INFO_DECODE_LOOKUP {
            if target == masked_bits1 || target == masked_bits2 {
                return Some(Self::from_data(data));
            }
            let difference = (masked_bits1 ^ target).count_ones();
            if difference < best_difference {
                best_data = data;
                best_difference = difference;
            }
            if masked_bits1 != masked_bits2 {
                let difference = (masked_bits2 ^ target).count_ones();
                if difference < best_difference {
                    best_data = data;
                    best_difference = difference;
                }
            }
        }
        (best_difference <= 3).then(|| Self::from_data(best_data))
    }

    /// Masked 15-bit format word for this level and mask
    pub fn encode(ec_level: ErrorCorrectionLevel, data_mask: u8) -> u32 {
        let data = (ec_level.bits() << 3) | data_mask as u32 & 0x07;
        FORMAT_INFO_DECODE_LOOKUP[data as usize].0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_values() {
        // M, mask 0
        assert_eq!(FORMAT_INFO_DECODE_LOOKUP[0].0, 0x5412);
        // L, mask 0
        assert_eq!(FORMAT_INFO_DECODE_LOOKUP[0x08].0, 0x77C4);
        // H, mask 7
        assert_eq!(FORMAT_INFO_DECODE_LOOKUP[0x17].0, 0x083B);
    }

    #[test]
    fn test_ec_level_bits() {
        for level in [
            ErrorCorrectionLevel::L,
            ErrorCorrectionLevel::M,
            ErrorCorrectionLevel::Q,
            ErrorCorrectionLevel::H,
        ] {
            assert_eq!(ErrorCorrectionLevel::from_bits(level.bits()).unwrap(), level);
        }
        assert_eq!(ErrorCorrectionLevel::from_bits(1).unwrap(), ErrorCorrectionLevel::L);
    }

    #[test]
    fn test_decode_with_bit_errors() {
        let word = FormatInformation::encode(ErrorCorrectionLevel::Q, 5);
        let info = FormatInformation::decode(word ^ 0b101, word ^ 0b1).unwrap();
        assert_eq!(info.ec_level, ErrorCorrectionLevel::Q);
        assert_eq!(info.data_mask, 5);
    }
}
