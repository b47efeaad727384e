use super::Version;
use crate::error::{DecodeError, Result};

/// Alphanumeric character set: 0-9, A-Z, space, $%*+-./:
pub const ALPHANUMERIC_TABLE: [char; 45] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L',
    'M', 'N', 'O', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', ' ', '$', '%', '*', '+', '-', '.', '/',
    ':',
];

/// Segment mode, selected by a 4-bit indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// End of data (0000)
    Terminator,
    /// Digits, 3 per 10 bits (0001)
    Numeric,
    /// [`ALPHANUMERIC_TABLE`], 2 per 11 bits (0010)
    Alphanumeric,
    /// Sequence and parity of a multi-symbol message (0011)
    StructuredAppend,
    /// 8-bit bytes (0100)
    Byte,
    /// GS1 data (0101)
    Fnc1FirstPosition,
    /// Extended channel interpretation (0111)
    Eci,
    /// Shift JIS double-byte, 13 bits each (1000)
    Kanji,
    /// Industry application data (1001)
    Fnc1SecondPosition,
    /// GB 2312 double-byte, 13 bits each (1101)
    Hanzi,
}

impl Mode {
    /// Mode for a 4-bit indicator
    pub fn for_bits(bits: u32) -> Result<Self> {
        Ok(match bits {
            0x0 => Mode::Terminator,
            0x1 => Mode::Numeric,
            0x2 => Mode::Alphanumeric,
            0x3 => Mode::StructuredAppend,
            0x4 => Mode::Byte,
            0x5 => Mode::Fnc1FirstPosition,
            0x7 => Mode::Eci,
            0x8 => Mode::Kanji,
            0x9 => Mode::Fnc1SecondPosition,
            0xD => Mode::Hanzi,
            _ => return Err(DecodeError::Format("invalid mode indicator")),
        })
    }

    /// The 4-bit indicator
    pub fn bits(self) -> u32 {
        match self {
            Mode::Terminator => 0x0,
            Mode::Numeric => 0x1,
            Mode::Alphanumeric => 0x2,
            Mode::StructuredAppend => 0x3,
            Mode::Byte => 0x4,
            Mode::Fnc1FirstPosition => 0x5,
            Mode::Eci => 0x7,
            Mode::Kanji => 0x8,
            Mode::Fnc1SecondPosition => 0x9,
            Mode::Hanzi => 0xD,
        }
    }

    /// Width of the character count field for versions 1-9, 10-26 and 27-40
    pub fn character_count_bits(self, version: Version) -> usize {
        let counts: [usize; 3] = match self {
            Mode::Numeric => [10, 12, 14],
            Mode::Alphanumeric => [9, 11, 13],
            Mode::Byte => [8, 16, 16],
            Mode::Kanji | Mode::Hanzi => [8, 10, 12],
            _ => [0, 0, 0],
        };
        let tier = match version.number() {
            0..=9 => 0,
            10..=26 => 1,
            _ => 2,
        };
        counts[tier]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_bits() {
        assert_eq!(Mode::for_bits(0x4).unwrap(), Mode::Byte);
        assert_eq!(Mode::for_bits(0xD).unwrap(), Mode::Hanzi);
        assert!(Mode::for_bits(0x6).is_err());
        assert!(Mode::for_bits(0xE).is_err());
    }

    #[test]
    fn test_character_count_bits() {
        let v = |n| Version::for_number(n).unwrap();
        assert_eq!(Mode::Numeric.character_count_bits(v(9)), 10);
        assert_eq!(Mode::Numeric.character_count_bits(v(10)), 12);
        assert_eq!(Mode::Alphanumeric.character_count_bits(v(27)), 13);
        assert_eq!(Mode::Byte.character_count_bits(v(40)), 16);
        assert_eq!(Mode::Kanji.character_count_bits(v(1)), 8);
        assert_eq!(Mode::Hanzi.character_count_bits(v(26)), 10);
    }
}
