//! The prime field GF(929) used by PDF417 and Reed-Solomon coding over it.

use crate::error::{DecodeError, Result};

const MODULUS: usize = 929;

/// Integers modulo a prime, with exp/log tables for generator 3
#[derive(Debug)]
pub struct ModulusGf {
    exp: [u16; MODULUS],
    log: [u16; MODULUS],
    modulus: u32,
}

/// PDF417 codeword field
pub static PDF417_FIELD: ModulusGf = ModulusGf::new(3);

impl ModulusGf {
    const fn new(generator: u32) -> Self {
        let mut exp = [0u16; MODULUS];
        let mut log = [0u16; MODULUS];
        let mut x = 1u32;
        let mut i = 0;
        while i < MODULUS {
            exp[i] = x as u16;
            x = (x * generator) % MODULUS as u32;
            i += 1;
        }
        let mut i = 0;
        while i < MODULUS - 1 {
            log[exp[i] as usize] = i as u16;
            i += 1;
        }
        Self {
            exp,
            log,
            modulus: MODULUS as u32,
        }
    }

    /// Sum
    pub fn add(&self, a: u32, b: u32) -> u32 {
        (a + b) % self.modulus
    }

    /// Difference
    pub fn subtract(&self, a: u32, b: u32) -> u32 {
        (self.modulus + a - b) % self.modulus
    }

    /// Generator to the power `a`
    pub fn exp(&self, a: usize) -> u32 {
        self.exp[a % (MODULUS - 1)] as u32
    }

    /// Discrete logarithm of a nonzero element
    pub fn log(&self, a: u32) -> Result<usize> {
        if a == 0 || a >= self.modulus {
            return Err(DecodeError::Checksum);
        }
        Ok(self.log[a as usize] as usize)
    }

    /// Multiplicative inverse of a nonzero element
    pub fn inverse(&self, a: u32) -> Result<u32> {
        let log = self.log(a)?;
        Ok(self.exp[MODULUS - 1 - log] as u32)
    }

    /// Product
    pub fn multiply(&self, a: u32, b: u32) -> u32 {
        if a == 0 || b == 0 {
            return 0;
        }
        let sum = self.log[a as usize] as usize + self.log[b as usize] as usize;
        self.exp[sum % (MODULUS - 1)] as u32
    }

    /// Number of elements
    pub fn size(&self) -> usize {
        MODULUS
    }
}

/// Polynomial over [`ModulusGf`], coefficients highest degree first
#[derive(Debug, Clone)]
pub struct ModulusPoly {
    field: &'static ModulusGf,
    coefficients: Vec<u32>,
}

impl ModulusPoly {
    /// Create a polynomial, stripping leading zeros
    pub fn new(field: &'static ModulusGf, coefficients: Vec<u32>) -> Self {
        let coefficients = match coefficients.iter().position(|&c| c != 0) {
            None => vec![0],
            Some(0) => coefficients,
            Some(n) => coefficients[n..].to_vec(),
        };
        Self { field, coefficients }
    }

    fn zero(field: &'static ModulusGf) -> Self {
        Self {
            field,
            coefficients: vec![0],
        }
    }

    fn one(field: &'static ModulusGf) -> Self {
        Self {
            field,
            coefficients: vec![1],
        }
    }

    fn monomial(field: &'static ModulusGf, degree: usize, coefficient: u32) -> Self {
        if coefficient == 0 {
            return Self::zero(field);
        }
        let mut coefficients = vec![0; degree + 1];
        coefficients[0] = coefficient;
        Self::new(field, coefficients)
    }

    /// Degree
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

    /// Value at `a`
    pub fn evaluate_at(&self, a: u32) -> u32 {
        if a == 0 {
            return self.coefficient(0);
        }
        let field = self.field;
        if a == 1 {
            return self.coefficients.iter().fold(0, |acc, &c| field.add(acc, c));
        }
        self.coefficients
            .iter()
            .fold(0, |acc, &c| field.add(field.multiply(a, acc), c))
    }

    /// Sum
    pub fn add(&self, other: &ModulusPoly) -> ModulusPoly {
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
            *slot = self.field.add(*slot, c);
        }
        ModulusPoly::new(self.field, sum)
    }

    /// Difference
    pub fn subtract(&self, other: &ModulusPoly) -> ModulusPoly {
        if other.is_zero() {
            return self.clone();
        }
        self.add(&other.negative())
    }

    /// Additive inverse
    pub fn negative(&self) -> ModulusPoly {
        ModulusPoly::new(
            self.field,
            self.coefficients.iter().map(|&c| self.field.subtract(0, c)).collect(),
        )
    }

    /// Product
    pub fn multiply(&self, other: &ModulusPoly) -> ModulusPoly {
        if self.is_zero() || other.is_zero() {
            return ModulusPoly::zero(self.field);
        }
        let mut product = vec![0u32; self.coefficients.len() + other.coefficients.len() - 1];
        for (i, &a) in self.coefficients.iter().enumerate() {
            for (j, &b) in other.coefficients.iter().enumerate() {
                product[i + j] = self.field.add(product[i + j], self.field.multiply(a, b));
            }
        }
        ModulusPoly::new(self.field, product)
    }

    /// Product with a field element
    pub fn multiply_scalar(&self, scalar: u32) -> ModulusPoly {
        match scalar {
            0 => ModulusPoly::zero(self.field),
            1 => self.clone(),
            _ => ModulusPoly::new(
                self.field,
                self.coefficients.iter().map(|&c| self.field.multiply(c, scalar)).collect(),
            ),
        }
    }

    /// Product with `coefficient * x^degree`
    pub fn multiply_by_monomial(&self, degree: usize, coefficient: u32) -> ModulusPoly {
        if coefficient == 0 {
            return ModulusPoly::zero(self.field);
        }
        let mut product: Vec<u32> = self
            .coefficients
            .iter()
            .map(|&c| self.field.multiply(c, coefficient))
            .collect();
        product.resize(product.len() + degree, 0);
        ModulusPoly::new(self.field, product)
    }
}

/// Reed-Solomon decoder over GF(929)
pub struct ModulusDecoder {
    field: &'static ModulusGf,
}

impl Default for ModulusDecoder {
    fn default() -> Self {
        Self { field: &PDF417_FIELD }
    }
}

impl ModulusDecoder {
    /// Correct `received` in place; its last `num_ec` codewords are error
    /// correction. `erasures` lists positions already known to be unreadable.
    ///
    /// Returns the number of corrected codewords.
    pub fn decode(&self, received: &mut [u32], num_ec: usize, erasures: &[usize]) -> Result<usize> {
        if num_ec == 0 {
            return Ok(0);
        }
        if erasures.len() > num_ec / 2 + 3 {
            return Err(DecodeError::Checksum);
        }
        let Some(syndromes) = self.syndromes(received, num_ec) else {
            return Ok(0);
        };
        let syndrome = ModulusPoly::new(self.field, syndromes);

        let (sigma, omega) = self.run_euclidean(&ModulusPoly::monomial(self.field, num_ec, 1), &syndrome, num_ec)?;
        let locations = self.find_error_locations(&sigma)?;
        let magnitudes = self.find_error_magnitudes(&omega, &sigma, &locations)?;

        for (&location, &magnitude) in locations.iter().zip(&magnitudes) {
            let log = self.field.log(location)?;
            if log >= received.len() {
                return Err(DecodeError::Checksum);
            }
            let position = received.len() - 1 - log;
            received[position] = self.field.subtract(received[position], magnitude);
        }

        if self.syndromes(received, num_ec).is_some() {
            return Err(DecodeError::Checksum);
        }
        Ok(locations.len())
    }

    fn syndromes(&self, received: &[u32], num_ec: usize) -> Option<Vec<u32>> {
        let poly = ModulusPoly::new(self.field, received.to_vec());
        let mut syndromes = vec![0u32; num_ec];
        let mut error = false;
        for i in (1..=num_ec).rev() {
            let eval = poly.evaluate_at(self.field.exp(i));
            syndromes[num_ec - i] = eval;
            if eval != 0 {
                error = true;
            }
        }
        error.then_some(syndromes)
    }

    fn run_euclidean(&self, a: &ModulusPoly, b: &ModulusPoly, r_degree: usize) -> Result<(ModulusPoly, ModulusPoly)> {
        let (a, b) = if a.degree() < b.degree() { (b, a) } else { (a, b) };

        let mut r_last = a.clone();
        let mut r = b.clone();
        let mut t_last = ModulusPoly::zero(self.field);
        let mut t = ModulusPoly::one(self.field);

        while r.degree() >= r_degree / 2 {
            let r_last_last = r_last;
            let t_last_last = t_last;
            r_last = r;
            t_last = t;

            if r_last.is_zero() {
                return Err(DecodeError::Checksum);
            }
            r = r_last_last;
            let mut q = ModulusPoly::zero(self.field);
            let dlt_inverse = self.field.inverse(r_last.coefficient(r_last.degree()))?;
            while r.degree() >= r_last.degree() && !r.is_zero() {
                let degree_diff = r.degree() - r_last.degree();
                let scale = self.field.multiply(r.coefficient(r.degree()), dlt_inverse);
                q = q.add(&ModulusPoly::monomial(self.field, degree_diff, scale));
                r = r.subtract(&r_last.multiply_by_monomial(degree_diff, scale));
            }

            t = q.multiply(&t_last).subtract(&t_last_last).negative();
        }

        let sigma_tilde_at_zero = t.coefficient(0);
        if sigma_tilde_at_zero == 0 {
            return Err(DecodeError::Checksum);
        }
        let inverse = self.field.inverse(sigma_tilde_at_zero)?;
        Ok((t.multiply_scalar(inverse), r.multiply_scalar(inverse)))
    }

    fn find_error_locations(&self, error_locator: &ModulusPoly) -> Result<Vec<u32>> {
        let num_errors = error_locator.degree();
        if num_errors == 0 {
            return Err(DecodeError::Checksum);
        }
        let mut result = Vec::with_capacity(num_errors);
        for i in 1..self.field.size() as u32 {
            if result.len() >= num_errors {
                break;
            }
            if error_locator.evaluate_at(i) == 0 {
                result.push(self.field.inverse(i)?);
            }
        }
        if result.len() != num_errors {
            return Err(DecodeError::Checksum);
        }
        Ok(result)
    }

    fn find_error_magnitudes(
        &self,
        error_evaluator: &ModulusPoly,
        error_locator: &ModulusPoly,
        locations: &[u32],
    ) -> Result<Vec<u32>> {
        let degree = error_locator.degree();
        let mut derivative = vec![0u32; degree];
        for i in 1..=degree {
            derivative[degree - i] = self.field.multiply(i as u32, error_locator.coefficient(i));
        }
        let derivative = ModulusPoly::new(self.field, derivative);

        locations
            .iter()
            .map(|&location| {
                let xi_inverse = self.field.inverse(location)?;
                let numerator = self.field.subtract(0, error_evaluator.evaluate_at(xi_inverse));
                let denominator = self.field.inverse(derivative.evaluate_at(xi_inverse))?;
                Ok(self.field.multiply(numerator, denominator))
            })
            .collect()
    }
}

/// Error correction codewords for PDF417 data, by LFSR division with the
/// generator `(x - 3)(x - 3^2)...(x - 3^k)`
pub fn pdf417_ec_codewords(data: &[u32], ec_count: usize) -> Vec<u32> {
    let field = &PDF417_FIELD;
    let mut generator = ModulusPoly::one(field);
    for i in 1..=ec_count {
        let factor = ModulusPoly::new(field, vec![1, field.subtract(0, field.exp(i))]);
        generator = generator.multiply(&factor);
    }
    // coefficients below the leading 1, lowest degree first
    let coefficients: Vec<u32> = (0..ec_count).map(|k| generator.coefficient(k)).collect();

    let mut e = vec![0u32; ec_count];
    for &d in data {
        let t1 = field.add(d, e[ec_count - 1]);
        for j in (1..ec_count).rev() {
            let t2 = field.multiply(t1, coefficients[j]);
            e[j] = field.subtract(e[j - 1], t2);
        }
        let t2 = field.multiply(t1, coefficients[0]);
        e[0] = field.subtract(0, t2);
    }
    e.iter().rev().map(|&v| field.subtract(0, v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_basics() {
        let field = &PDF417_FIELD;
        assert_eq!(field.exp(0), 1);
        assert_eq!(field.exp(1), 3);
        assert_eq!(field.exp(2), 9);
        for a in 1..929 {
            assert_eq!(field.multiply(a, field.inverse(a).unwrap()), 1);
        }
        assert_eq!(field.subtract(3, 5), 927);
    }

    #[test]
    fn test_ec_codewords_have_zero_syndromes() {
        let data = vec![5, 453, 178, 121, 239];
        let ec = pdf417_ec_codewords(&data, 8);
        let mut codewords = data.clone();
        codewords.extend(&ec);
        let decoder = ModulusDecoder::default();
        assert!(decoder.syndromes(&codewords, 8).is_none());
        assert_eq!(decoder.decode(&mut codewords, 8, &[]), Ok(0));
    }

    #[test]
    fn test_correct_errors() {
        let data: Vec<u32> = vec![14, 900, 1, 2, 3, 928, 0, 77, 500, 41];
        let mut codewords = data.clone();
        codewords.extend(pdf417_ec_codewords(&data, 16));
        codewords[0] = 100;
        codewords[3] = 0;
        codewords[9] = 800;
        codewords[20] = 7;
        let decoder = ModulusDecoder::default();
        assert_eq!(decoder.decode(&mut codewords, 16, &[]), Ok(4));
        assert_eq!(&codewords[..data.len()], &data[..]);
    }

    #[test]
    fn test_too_many_erasures() {
        let mut codewords = vec![0u32; 12];
        let erasures: Vec<usize> = (0..8).collect();
        assert_eq!(
            ModulusDecoder::default().decode(&mut codewords, 4, &erasures),
            Err(DecodeError::Checksum)
        );
    }
}
