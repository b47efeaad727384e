/// Growable packed row of bits, used for scan lines and encoder bit streams
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BitArray {
    bits: Vec<u32>,
    size: usize,
}

impl BitArray {
    /// Empty array
    pub fn new() -> Self {
        Self::default()
    }

    /// Array of `size` cleared bits
    pub fn with_size(size: usize) -> Self {
        Self {
            bits: vec![0; size.div_ceil(32)],
            size,
        }
    }

    /// Number of bits
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of whole bytes needed to hold the bits
    pub fn size_in_bytes(&self) -> usize {
        self.size.div_ceil(8)
    }

    pub(crate) fn words(&self) -> &[u32] {
        &self.bits
    }

    fn ensure_capacity(&mut self, size: usize) {
        let words = size.div_ceil(32);
        if words > self.bits.len() {
            self.bits.resize(words, 0);
        }
    }

    /// Bit at `i`; out of range reads as 0
    #[inline]
    pub fn get(&self, i: usize) -> bool {
        i < self.size && (self.bits[i / 32] >> (i & 0x1f)) & 1 != 0
    }

    /// Set bit `i`
    #[inline]
    pub fn set(&mut self, i: usize) {
        if i < self.size {
            self.bits[i / 32] |= 1 << (i & 0x1f);
        }
    }

    /// Toggle bit `i`
    pub fn flip(&mut self, i: usize) {
        if i < self.size {
            self.bits[i / 32] ^= 1 << (i & 0x1f);
        }
    }

    /// Overwrite the 32 bits starting at `i` (a multiple of 32)
    pub fn set_bulk(&mut self, i: usize, word: u32) {
        if let Some(slot) = self.bits.get_mut(i / 32) {
            *slot = word;
        }
    }

    /// Set every bit in `start..end`
    pub fn set_range(&mut self, start: usize, end: usize) {
        for i in start..end.min(self.size) {
            self.set(i);
        }
    }

    /// Clear all bits
    pub fn clear(&mut self) {
        self.bits.fill(0);
    }

    /// Index of the first set bit at or after `from`, or `size()` if none
    pub fn get_next_set(&self, from: usize) -> usize {
        self.next_matching(from, false)
    }

    /// Index of the first unset bit at or after `from`, or `size()` if none
    pub fn get_next_unset(&self, from: usize) -> usize {
        self.next_matching(from, true)
    }

    fn next_matching(&self, from: usize, invert: bool) -> usize {
        if from >= self.size {
            return self.size;
        }
        let mut word_index = from / 32;
        let word_of = |w: u32| if invert { !w } else { w };
        let mut current = word_of(self.bits[word_index]) & !((1u32 << (from & 0x1f)) - 1);
        while current == 0 {
            word_index += 1;
            if word_index == self.bits.len() {
                return self.size;
            }
            current = word_of(self.bits[word_index]);
        }
        (word_index * 32 + current.trailing_zeros() as usize).min(self.size)
    }

    /// True when every bit in `start..end` equals `value`
    pub fn is_range(&self, start: usize, end: usize, value: bool) -> bool {
        if end < start || end > self.size {
            return false;
        }
        (start..end).all(|i| self.get(i) == value)
    }

    /// Append one bit
    pub fn append_bit(&mut self, bit: bool) {
        self.ensure_capacity(self.size + 1);
        if bit {
            self.bits[self.size / 32] |= 1 << (self.size & 0x1f);
        }
        self.size += 1;
    }

    /// Append the low `num_bits` of `value`, most significant first
    pub fn append_bits(&mut self, value: u32, num_bits: usize) {
        debug_assert!(num_bits <= 32);
        self.ensure_capacity(self.size + num_bits);
        for shift in (0..num_bits).rev() {
            self.append_bit((value >> shift) & 1 == 1);
        }
    }

    /// Append every bit of another array
    pub fn append_bit_array(&mut self, other: &BitArray) {
        self.ensure_capacity(self.size + other.size);
        for i in 0..other.size {
            self.append_bit(other.get(i));
        }
    }

    /// XOR with an array of the same size
    pub fn xor(&mut self, other: &BitArray) {
        for (a, &b) in self.bits.iter_mut().zip(other.bits.iter()) {
            *a ^= b;
        }
    }

    /// Reverse bit order in place
    pub fn reverse(&mut self) {
        let mut reversed = vec![0u32; self.bits.len()];
        for i in 0..self.size {
            if self.get(i) {
                let j = self.size - 1 - i;
                reversed[j / 32] |= 1 << (j & 0x1f);
            }
        }
        self.bits = reversed;
    }

    /// Pack bits starting at `bit_offset` into bytes, most significant bit first
    pub fn to_bytes(&self, bit_offset: usize, num_bytes: usize) -> Vec<u8> {
        let mut out = vec![0u8; num_bytes];
        let mut offset = bit_offset;
        for byte in out.iter_mut() {
            let mut value = 0u8;
            for j in 0..8 {
                if self.get(offset) {
                    value |= 1 << (7 - j);
                }
                offset += 1;
            }
            *byte = value;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_bytes() {
        let mut bits = BitArray::new();
        bits.append_bits(0b1010_0001, 8);
        bits.append_bits(0x3, 2);
        assert_eq!(bits.size(), 10);
        assert_eq!(bits.to_bytes(0, 1), vec![0b1010_0001]);
        assert!(bits.get(8));
        assert!(bits.get(9));
    }

    #[test]
    fn test_next_set_unset() {
        let mut bits = BitArray::with_size(70);
        bits.set(5);
        bits.set(40);
        assert_eq!(bits.get_next_set(0), 5);
        assert_eq!(bits.get_next_set(6), 40);
        assert_eq!(bits.get_next_set(41), 70);
        assert_eq!(bits.get_next_unset(5), 6);
        bits.set_range(41, 70);
        assert_eq!(bits.get_next_unset(40), 70);
    }

    #[test]
    fn test_is_range_and_reverse() {
        let mut bits = BitArray::with_size(10);
        bits.set_range(2, 5);
        assert!(bits.is_range(2, 5, true));
        assert!(bits.is_range(5, 10, false));
        assert!(!bits.is_range(1, 5, true));
        bits.reverse();
        assert!(bits.is_range(5, 8, true));
        assert!(!bits.get(2));
    }
}
