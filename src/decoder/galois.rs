//! Binary extension fields GF(2^n) and polynomials over them.

use crate::error::{DecodeError, Result};

const MAX_FIELD_SIZE: usize = 4096;

/// GF(2^n) with exp/log tables built at compile time
pub struct GenericGf {
    exp: [u16; MAX_FIELD_SIZE],
    log: [u16; MAX_FIELD_SIZE],
    size: usize,
    primitive: u32,
    generator_base: u32,
}

/// QR Code, x^8 + x^4 + x^3 + x^2 + 1
pub static QR_CODE_FIELD_256: GenericGf = GenericGf::new(0x011D, 256, 0);
/// Data Matrix and 8-bit Aztec words, x^8 + x^5 + x^3 + x^2 + 1
pub static DATA_MATRIX_FIELD_256: GenericGf = GenericGf::new(0x012D, 256, 1);
/// Aztec 12-bit words, x^12 + x^6 + x^5 + x^3 + 1
pub static AZTEC_DATA_12: GenericGf = GenericGf::new(0x1069, 4096, 1);
/// Aztec 10-bit words, x^10 + x^3 + 1
pub static AZTEC_DATA_10: GenericGf = GenericGf::new(0x409, 1024, 1);
/// Aztec 6-bit words, x^6 + x + 1
pub static AZTEC_DATA_6: GenericGf = GenericGf::new(0x43, 64, 1);
/// Aztec mode message, x^4 + x + 1
pub static AZTEC_PARAM: GenericGf = GenericGf::new(0x13, 16, 1);
/// Aztec 8-bit words share the Data Matrix field
pub static AZTEC_DATA_8: &GenericGf = &DATA_MATRIX_FIELD_256;

impl GenericGf {
    /// Build a field from its primitive polynomial.
    ///
    /// `generator_base` is the exponent of the first root of generator
    /// polynomials over this field: 0 for QR, 1 everywhere else.
    pub const fn new(primitive: u32, size: usize, generator_base: u32) -> Self {
        let mut exp = [0u16; MAX_FIELD_SIZE];
        let mut log = [0u16; MAX_FIELD_SIZE];
        let mut x = 1u32;
        let mut i = 0;
        while i < size {
            exp[i] = x as u16;
            x <<= 1;
            if x >= size as u32 {
                x ^= primitive;
                x &= size as u32 - 1;
            }
            i += 1;
        }
        let mut i = 0;
        while i < size - 1 {
            log[exp[i] as usize] = i as u16;
            i += 1;
        }
        Self {
            exp,
            log,
            size,
            primitive,
            generator_base,
        }
    }

    /// Addition and subtraction are both XOR
    pub fn add_or_subtract(a: u32, b: u32) -> u32 {
        a ^ b
    }

    /// 2 to the power `a`
    pub fn exp(&self, a: usize) -> u32 {
        self.exp[a % (self.size - 1)] as u32
    }

    /// Base-2 logarithm of a nonzero element
    pub fn log(&self, a: u32) -> Result<usize> {
        if a == 0 || a as usize >= self.size {
            return Err(DecodeError::Checksum);
        }
        Ok(self.log[a as usize] as usize)
    }

    /// Multiplicative inverse of a nonzero element
    pub fn inverse(&self, a: u32) -> Result<u32> {
        let log = self.log(a)?;
        Ok(self.exp[self.size - 1 - log] as u32)
    }

    /// Product of two elements
    pub fn multiply(&self, a: u32, b: u32) -> u32 {
        if a == 0 || b == 0 {
            return 0;
        }
        let sum = self.log[a as usize] as usize + self.log[b as usize] as usize;
        self.exp[sum % (self.size - 1)] as u32
    }

    /// Number of elements
    pub fn size(&self) -> usize {
        self.size
    }

    /// Exponent of the first generator root
    pub fn generator_base(&self) -> u32 {
        self.generator_base
    }

    /// Primitive polynomial
    pub fn primitive(&self) -> u32 {
        self.primitive
    }

    /// `coefficient * x^degree`
    pub fn build_monomial(&'static self, degree: usize, coefficient: u32) -> GenericGfPoly {
        if coefficient == 0 {
            return GenericGfPoly::zero(self);
        }
        let mut coefficients = vec![0; degree + 1];
        coefficients[0] = coefficient;
        GenericGfPoly::new(self, coefficients)
    }
}

impl std::fmt::Debug for GenericGf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GF(0x{:x},{})", self.primitive, self.size)
    }
}

/// Polynomial over a [`GenericGf`], coefficients stored highest degree first
#[derive(Debug, Clone)]
pub struct GenericGfPoly {
    field: &'static GenericGf,
    coefficients: Vec<u32>,
}

impl GenericGfPoly {
    /// Create a polynomial, stripping leading zero coefficients
    pub fn new(field: &'static GenericGf, coefficients: Vec<u32>) -> Self {
        let first_non_zero = coefficients.iter().position(|&c| c != 0);
        let coefficients = match first_non_zero {
            None => vec![0],
            Some(0) => coefficients,
            Some(n) => coefficients[n..].to_vec(),
        };
        Self { field, coefficients }
    }

    /// The zero polynomial
    pub fn zero(field: &'static GenericGf) -> Self {
        Self {
            field,
            coefficients: vec![0],
        }
    }

    /// The constant 1
    pub fn one(field: &'static GenericGf) -> Self {
        Self {
            field,
            coefficients: vec![1],
        }
    }

    /// Coefficients, highest degree first
    pub fn coefficients(&self) -> &[u32] {
        &self.coefficients
    }

    /// Degree of the polynomial
    pub fn degree(&self) -> usize {
        self.coefficients.len() - 1
    }

    /// True for the zero polynomial
    pub fn is_zero(&self) -> bool {
        self.coefficients[0] == 0
    }

    /// Coefficient of `x^degree`
    pub fn coefficient(&self, degree: usize) -> u32 {
        if degree > self.degree() {
            return 0;
        }
        self.coefficients[self.coefficients.len() - 1 - degree]
    }

    /// Value at `a` by Horner's rule
    pub fn evaluate_at(&self, a: u32) -> u32 {
        if a == 0 {
            return self.coefficient(0);
        }
        if a == 1 {
            return self.coefficients.iter().fold(0, |acc, &c| acc ^ c);
        }
        self.coefficients
            .iter()
            .fold(0, |acc, &c| self.field.multiply(a, acc) ^ c)
    }

    /// Sum (and difference)
    pub fn add_or_subtract(&self, other: &GenericGfPoly) -> GenericGfPoly {
        if self.is_zero() {
            return other.clone();
        }
        if other.is_zero() {
            return self.clone();
        }
        let (smaller, larger) = if self.coefficients.len() > other.coefficients.len() {
            (&other.coefficients, &self.coefficients)
        } else {
            (&self.coefficients, &other.coefficients)
        };
        let diff = larger.len() - smaller.len();
        let mut sum = larger.clone();
        for (slot, &c) in sum[diff..].iter_mut().zip(smaller) {
            *slot ^= c;
        }
        GenericGfPoly::new(self.field, sum)
    }

    /// Product
    pub fn multiply(&self, other: &GenericGfPoly) -> GenericGfPoly {
        if self.is_zero() || other.is_zero() {
            return GenericGfPoly::zero(self.field);
        }
        let a = &self.coefficients;
        let b = &other.coefficients;
        let mut product = vec![0u32; a.len() + b.len() - 1];
        for (i, &ac) in a.iter().enumerate() {
            for (j, &bc) in b.iter().enumerate() {
                product[i + j] ^= self.field.multiply(ac, bc);
            }
        }
        GenericGfPoly::new(self.field, product)
    }

    /// Product with a field element
    pub fn multiply_scalar(&self, scalar: u32) -> GenericGfPoly {
        match scalar {
            0 => GenericGfPoly::zero(self.field),
            1 => self.clone(),
            _ => GenericGfPoly::new(
                self.field,
                self.coefficients.iter().map(|&c| self.field.multiply(c, scalar)).collect(),
            ),
        }
    }

    /// Product with `coefficient * x^degree`
    pub fn multiply_by_monomial(&self, degree: usize, coefficient: u32) -> GenericGfPoly {
        if coefficient == 0 {
            return GenericGfPoly::zero(self.field);
        }
        let mut product: Vec<u32> = self
            .coefficients
            .iter()
            .map(|&c| self.field.multiply(c, coefficient))
            .collect();
        product.resize(product.len() + degree, 0);
        GenericGfPoly::new(self.field, product)
    }

    /// Quotient and remainder
    pub fn divide(&self, other: &GenericGfPoly) -> Result<(GenericGfPoly, GenericGfPoly)> {
        if other.is_zero() {
            return Err(DecodeError::Checksum);
        }
        let mut quotient = GenericGfPoly::zero(self.field);
        let mut remainder = self.clone();

        let denominator_leading_term = other.coefficient(other.degree());
        let inverse_denominator_leading_term = self.field.inverse(denominator_leading_term)?;

        while remainder.degree() >= other.degree() && !remainder.is_zero() {
            let degree_difference = remainder.degree() - other.degree();
            let scale = self
                .field
                .multiply(remainder.coefficient(remainder.degree()), inverse_denominator_leading_term);
            let term = other.multiply_by_monomial(degree_difference, scale);
            let iteration_quotient = self.field.build_monomial(degree_difference, scale);
            quotient = quotient.add_or_subtract(&iteration_quotient);
            remainder = remainder.add_or_subtract(&term);
        }
        Ok((quotient, remainder))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qr_field_tables() {
        let field = &QR_CODE_FIELD_256;
        assert_eq!(field.exp(0), 1);
        assert_eq!(field.exp(8), 29);
        assert_eq!(field.exp(255), 1);
        assert_eq!(field.log(2).unwrap(), 1);
        assert!(field.log(0).is_err());
    }

    #[test]
    fn test_inverse_in_every_field() {
        for field in [&QR_CODE_FIELD_256, &DATA_MATRIX_FIELD_256, &AZTEC_DATA_12, &AZTEC_DATA_10, &AZTEC_DATA_6, &AZTEC_PARAM] {
            for a in 1..field.size() as u32 {
                let inv = field.inverse(a).unwrap();
                assert_eq!(field.multiply(a, inv), 1, "{:?} a={}", field, a);
            }
        }
    }

    #[test]
    fn test_exp_covers_field() {
        let field = &AZTEC_DATA_6;
        let mut seen: Vec<u32> = (0..63).map(|i| field.exp(i)).collect();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 63);
    }

    #[test]
    fn test_poly_divide() {
        let field = &QR_CODE_FIELD_256;
        let a = GenericGfPoly::new(field, vec![1, 2, 3, 4]);
        let b = GenericGfPoly::new(field, vec![1, 7]);
        let (q, r) = a.divide(&b).unwrap();
        let back = q.multiply(&b).add_or_subtract(&r);
        assert_eq!(back.coefficients(), a.coefficients());
        assert!(r.degree() < b.degree() || r.is_zero());
    }

    #[test]
    fn test_poly_strips_leading_zeros() {
        let field = &QR_CODE_FIELD_256;
        let p = GenericGfPoly::new(field, vec![0, 0, 5, 1]);
        assert_eq!(p.degree(), 1);
        assert_eq!(p.coefficient(1), 5);
        assert!(GenericGfPoly::new(field, vec![0, 0]).is_zero());
    }
}
