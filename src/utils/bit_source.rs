use crate::error::{DecodeError, Result};

/// Sequential most-significant-bit-first reader over a byte slice
pub struct BitSource<'a> {
    bytes: &'a [u8],
    idx: usize,
}

impl<'a> BitSource<'a> {
    /// Start reading at the first bit of `bytes`
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, idx: 0 }
    }

    /// Bits left to read
    pub fn available(&self) -> usize {
        (self.bytes.len() * 8).saturating_sub(self.idx)
    }

    /// Index of the byte holding the next bit
    pub fn byte_offset(&self) -> usize {
        self.idx / 8
    }

    /// Offset of the next bit within its byte
    pub fn bit_offset(&self) -> usize {
        self.idx % 8
    }

    /// Read `n` (at most 32) bits as an unsigned value
    pub fn read_bits(&mut self, n: usize) -> Result<u32> {
        if n == 0 || n > 32 || n > self.available() {
            return Err(DecodeError::Format("bit stream exhausted"));
        }
        let mut value = 0u32;
        for _ in 0..n {
            let bit = (self.bytes[self.idx / 8] >> (7 - (self.idx % 8))) & 1;
            value = (value << 1) | bit as u32;
            self.idx += 1;
        }
        Ok(value)
    }
}
