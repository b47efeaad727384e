use super::{FormatInformation, MaskPattern, Version};
use crate::error::{DecodeError, Result};
use crate::models::BitMatrix;

/// Reads format information, version and codewords from a sampled QR grid
pub struct BitMatrixParser {
    bits: BitMatrix,
    parsed_version: Option<Version>,
    parsed_format: Option<FormatInformation>,
}

impl BitMatrixParser {
    /// Wrap a square matrix whose dimension is 21 or more and 1 mod 4
    pub fn new(bits: BitMatrix) -> Result<Self> {
        let dimension = bits.height();
        if dimension < 21 || dimension % 4 != 1 || bits.width() != dimension {
            return Err(DecodeError::Format("bad QR dimension"));
        }
        Ok(Self {
            bits,
            parsed_version: None,
            parsed_format: None,
        })
    }

    /// Parser over the transposed matrix, for mirrored symbols
    pub fn mirrored(&self) -> Self {
        Self {
            bits: self.bits.transpose(),
            parsed_version: None,
            parsed_format: None,
        }
    }

    fn copy_bit(&self, i: usize, j: usize, bits: u32) -> u32 {
        (bits << 1) | self.bits.get(i, j) as u32
    }

    /// Read both copies of the format information
    pub fn read_format_information(&mut self) -> Result<FormatInformation> {
        if let Some(info) = self.parsed_format {
            return Ok(info);
        }

        // Around the top-left finder
        let mut bits1 = 0;
        for i in 0..6 {
            bits1 = self.copy_bit(i, 8, bits1);
        }
        bits1 = self.copy_bit(7, 8, bits1);
        bits1 = self.copy_bit(8, 8, bits1);
        bits1 = self.copy_bit(8, 7, bits1);
        for j in (0..6).rev() {
            bits1 = self.copy_bit(8, j, bits1);
        }

        // Split between the top-right and bottom-left finders
        let dimension = self.bits.height();
        let mut bits2 = 0;
        for j in (dimension - 7..dimension).rev() {
            bits2 = self.copy_bit(8, j, bits2);
        }
        for i in dimension - 8..dimension {
            bits2 = self.copy_bit(i, 8, bits2);
        }

        let info = FormatInformation::decode(bits1, bits2)?;
        self.parsed_format = Some(info);
        Ok(info)
    }

    /// Read the version, from the dimension below version 7 and from the
    /// two version information blocks otherwise
    pub fn read_version(&mut self) -> Result<Version> {
        if let Some(version) = self.parsed_version {
            return Ok(version);
        }
        let dimension = self.bits.height();
        let provisional = Version::provisional_for_dimension(dimension)?;
        if provisional.number() <= 6 {
            self.parsed_version = Some(provisional);
            return Ok(provisional);
        }

        let ij_min = dimension - 11;
        let mut bits = 0;
        for j in (0..6).rev() {
            for i in (ij_min..dimension - 8).rev() {
                bits = self.copy_bit(i, j, bits);
            }
        }
        if let Ok(version) = Version::decode_version_information(bits) {
            if version.dimension() == dimension {
                self.parsed_version = Some(version);
                return Ok(version);
            }
        }

        let mut bits = 0;
        for i in (0..6).rev() {
            for j in (ij_min..dimension - 8).rev() {
                bits = self.copy_bit(i, j, bits);
            }
        }
        if let Ok(version) = Version::decode_version_information(bits) {
            if version.dimension() == dimension {
                self.parsed_version = Some(version);
                return Ok(version);
            }
        }
        Err(DecodeError::Format("version information mismatch"))
    }

    /// Unmask and read the codewords in the zig-zag placement order
    pub fn read_codewords(&mut self) -> Result<Vec<u8>> {
        let format = self.read_format_information()?;
        let version = self.read_version()?;
        let dimension = self.bits.height();

        let function_pattern = version.build_function_pattern();
        let mut bits = self.bits.clone();
        MaskPattern::from_bits(format.data_mask)?.unmask(&mut bits, dimension, &function_pattern);

        let total = version.total_codewords();
        let mut result = Vec::with_capacity(total);
        let mut reading_up = true;
        let mut current_byte = 0u8;
        let mut bits_read = 0;

        let mut j = dimension as isize - 1;
        while j > 0 {
            // Skip the vertical timing pattern
            if j == 6 {
                j -= 1;
            }
            let column = j as usize;
            for count in 0..dimension {
                let i = if reading_up { dimension - 1 - count } else { count };
                for col in 0..2 {
                    let x = column - col;
                    if !function_pattern.get(x, i) {
                        bits_read += 1;
                        current_byte <<= 1;
                        if bits.get(x, i) {
                            current_byte |= 1;
                        }
                        if bits_read == 8 {
                            result.push(current_byte);
                            bits_read = 0;
                            current_byte = 0;
                        }
                    }
                }
            }
            reading_up = !reading_up;
            j -= 2;
        }

        if result.len() != total {
            return Err(DecodeError::Format("codeword count mismatch"));
        }
        Ok(result)
    }
}
