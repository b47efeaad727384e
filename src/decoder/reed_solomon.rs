//! Reed-Solomon coding over the binary fields in [`super::galois`].
//!
//! Decoding follows the classic pipeline: syndromes, the extended Euclidean
//! algorithm for the locator and evaluator, a Chien search for the roots and
//! Forney's formula for the magnitudes.

use super::galois::{GenericGf, GenericGfPoly};
use crate::error::{DecodeError, EncodeError, Result};

/// Corrects symbol errors in received codewords
pub struct ReedSolomonDecoder {
    field: &'static GenericGf,
}

impl ReedSolomonDecoder {
    /// Decoder over `field`
    pub fn new(field: &'static GenericGf) -> Self {
        Self { field }
    }

    /// Correct `received` in place, given that its last `two_s` symbols are
    /// error correction codewords.
    ///
    /// Returns the number of corrected symbols, or [`DecodeError::Checksum`]
    /// if more than `two_s / 2` symbols are wrong.
    pub fn decode(&self, received: &mut [u32], two_s: usize) -> Result<usize> {
        if two_s == 0 {
            return Ok(0);
        }
        let Some(syndrome) = self.syndromes(received, two_s) else {
            return Ok(0);
        };
        let syndrome = GenericGfPoly::new(self.field, syndrome);

        let (sigma, omega) = self.run_euclidean(&self.field.build_monomial(two_s, 1), &syndrome, two_s)?;
        let locations = self.find_error_locations(&sigma)?;
        let magnitudes = self.find_error_magnitudes(&omega, &sigma, &locations)?;

        for (&location, &magnitude) in locations.iter().zip(&magnitudes) {
            let log = self.field.log(location)?;
            if log >= received.len() {
                return Err(DecodeError::Checksum);
            }
            let position = received.len() - 1 - log;
            received[position] = GenericGf::add_or_subtract(received[position], magnitude);
        }

        if self.syndromes(received, two_s).is_some() {
            return Err(DecodeError::Checksum);
        }
        Ok(locations.len())
    }

    /// Syndrome coefficients, or `None` when they are all zero
    fn syndromes(&self, received: &[u32], two_s: usize) -> Option<Vec<u32>> {
        let poly = GenericGfPoly::new(self.field, received.to_vec());
        let base = self.field.generator_base() as usize;
        let mut syndrome = vec![0u32; two_s];
        let mut no_error = true;
        for i in 0..two_s {
            let eval = poly.evaluate_at(self.field.exp(i + base));
            syndrome[two_s - 1 - i] = eval;
            if eval != 0 {
                no_error = false;
            }
        }
        if no_error { None } else { Some(syndrome) }
    }

    fn run_euclidean(
        &self,
        a: &GenericGfPoly,
        b: &GenericGfPoly,
        r_degree: usize,
    ) -> Result<(GenericGfPoly, GenericGfPoly)> {
        let (a, b) = if a.degree() < b.degree() { (b, a) } else { (a, b) };

        let mut r_last = a.clone();
        let mut r = b.clone();
        let mut t_last = GenericGfPoly::zero(self.field);
        let mut t = GenericGfPoly::one(self.field);

        while r.degree() >= r_degree / 2 {
            let r_last_last = r_last;
            let t_last_last = t_last;
            r_last = r;
            t_last = t;

            if r_last.is_zero() {
                return Err(DecodeError::Checksum);
            }
            r = r_last_last;
            let mut q = GenericGfPoly::zero(self.field);
            let denominator_leading_term = r_last.coefficient(r_last.degree());
            let dlt_inverse = self.field.inverse(denominator_leading_term)?;
            while r.degree() >= r_last.degree() && !r.is_zero() {
                let degree_diff = r.degree() - r_last.degree();
                let scale = self.field.multiply(r.coefficient(r.degree()), dlt_inverse);
                q = q.add_or_subtract(&self.field.build_monomial(degree_diff, scale));
                r = r.add_or_subtract(&r_last.multiply_by_monomial(degree_diff, scale));
            }

            t = q.multiply(&t_last).add_or_subtract(&t_last_last);

            if r.degree() >= r_last.degree() && !r.is_zero() {
                return Err(DecodeError::Checksum);
            }
        }

        let sigma_tilde_at_zero = t.coefficient(0);
        if sigma_tilde_at_zero == 0 {
            return Err(DecodeError::Checksum);
        }
        let inverse = self.field.inverse(sigma_tilde_at_zero)?;
        Ok((t.multiply_scalar(inverse), r.multiply_scalar(inverse)))
    }

    /// Chien search over every nonzero field element
    fn find_error_locations(&self, error_locator: &GenericGfPoly) -> Result<Vec<u32>> {
        let num_errors = error_locator.degree();
        if num_errors == 0 {
            return Err(DecodeError::Checksum);
        }
        if num_errors == 1 {
            return Ok(vec![error_locator.coefficient(1)]);
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

    /// Forney's formula with the formal derivative of the locator
    fn find_error_magnitudes(
        &self,
        error_evaluator: &GenericGfPoly,
        error_locator: &GenericGfPoly,
        locations: &[u32],
    ) -> Result<Vec<u32>> {
        // In characteristic 2 only odd-degree terms survive differentiation
        let degree = error_locator.degree();
        let mut derivative = vec![0u32; degree];
        for i in (1..=degree).step_by(2) {
            derivative[degree - i] = error_locator.coefficient(i);
        }
        let derivative = GenericGfPoly::new(self.field, derivative);

        locations
            .iter()
            .map(|&location| {
                let xi_inverse = self.field.inverse(location)?;
                let denominator = derivative.evaluate_at(xi_inverse);
                if denominator == 0 {
                    return Err(DecodeError::Checksum);
                }
                let magnitude = self
                    .field
                    .multiply(error_evaluator.evaluate_at(xi_inverse), self.field.inverse(denominator)?);
                Ok(if self.field.generator_base() == 0 {
                    self.field.multiply(magnitude, location)
                } else {
                    magnitude
                })
            })
            .collect()
    }
}

/// Appends error correction codewords to data codewords
pub struct ReedSolomonEncoder {
    field: &'static GenericGf,
    cached_generators: Vec<GenericGfPoly>,
}

impl ReedSolomonEncoder {
    /// Encoder over `field`
    pub fn new(field: &'static GenericGf) -> Self {
        Self {
            field,
            cached_generators: vec![GenericGfPoly::one(field)],
        }
    }

    fn build_generator(&mut self, degree: usize) -> &GenericGfPoly {
        while self.cached_generators.len() <= degree {
            let d = self.cached_generators.len() - 1;
            let last = &self.cached_generators[d];
            let factor = GenericGfPoly::new(
                self.field,
                vec![1, self.field.exp(d + self.field.generator_base() as usize)],
            );
            let next = last.multiply(&factor);
            self.cached_generators.push(next);
        }
        &self.cached_generators[degree]
    }

    /// Fill the last `ec_count` entries of `to_encode` with error correction
    /// codewords computed over the leading data codewords
    pub fn encode(&mut self, to_encode: &mut [u32], ec_count: usize) -> Result<(), EncodeError> {
        if ec_count == 0 {
            return Err(EncodeError::InvalidArgument("no error correction codewords".into()));
        }
        if ec_count >= to_encode.len() {
            return Err(EncodeError::InvalidArgument("no data codewords".into()));
        }
        let data_count = to_encode.len() - ec_count;
        let field = self.field;
        let generator = self.build_generator(ec_count).clone();
        let info = GenericGfPoly::new(field, to_encode[..data_count].to_vec()).multiply_by_monomial(ec_count, 1);
        let (_, remainder) = info
            .divide(&generator)
            .map_err(|_| EncodeError::InvalidArgument("degenerate generator".into()))?;
        let coefficients = if remainder.is_zero() { &[][..] } else { remainder.coefficients() };
        let num_zero = ec_count - coefficients.len();
        to_encode[data_count..data_count + num_zero].fill(0);
        to_encode[data_count + num_zero..].copy_from_slice(coefficients);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::galois::{AZTEC_DATA_10, AZTEC_PARAM, DATA_MATRIX_FIELD_256, QR_CODE_FIELD_256};

    fn encode(field: &'static GenericGf, data: &[u32], ec: usize) -> Vec<u32> {
        let mut codewords = data.to_vec();
        codewords.resize(data.len() + ec, 0);
        ReedSolomonEncoder::new(field).encode(&mut codewords, ec).unwrap();
        codewords
    }

    #[test]
    fn test_qr_version1_m_ec_bytes() {
        // "01234567" at 1-M, from the QR Code standard annex
        let data = [
            0x10, 0x20, 0x0C, 0x56, 0x61, 0x80, 0xEC, 0x11, 0xEC, 0x11, 0xEC, 0x11, 0xEC, 0x11, 0xEC, 0x11,
        ];
        let codewords = encode(&QR_CODE_FIELD_256, &data, 10);
        assert_eq!(
            &codewords[16..],
            &[0xA5, 0x24, 0xD4, 0xC1, 0xED, 0x36, 0xC7, 0x87, 0x2C, 0x55]
        );
    }

    #[test]
    fn test_rs_encode_decode_no_errors() {
        let data = [0x10, 0x20, 0x30, 0x40, 0x50, 0x60];
        let mut codewords = encode(&QR_CODE_FIELD_256, &data, 10);
        let decoder = ReedSolomonDecoder::new(&QR_CODE_FIELD_256);
        assert_eq!(decoder.decode(&mut codewords, 10), Ok(0));
        assert_eq!(&codewords[..data.len()], &data);
    }

    #[test]
    fn test_rs_correct_multiple_errors() {
        let data = [0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88];
        let mut codewords = encode(&QR_CODE_FIELD_256, &data, 10);
        codewords[0] ^= 0xFF;
        codewords[4] ^= 0x42;
        codewords[7] ^= 0x13;
        codewords[12] ^= 0x01;
        codewords[17] ^= 0x80;

        let decoder = ReedSolomonDecoder::new(&QR_CODE_FIELD_256);
        assert_eq!(decoder.decode(&mut codewords, 10), Ok(5));
        assert_eq!(&codewords[..data.len()], &data);
    }

    #[test]
    fn test_rs_correct_errors_at_end() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05];
        let mut codewords = encode(&DATA_MATRIX_FIELD_256, &data, 8);
        let total = codewords.len();
        codewords[total - 1] ^= 0xFF;
        codewords[total - 2] ^= 0x33;

        let decoder = ReedSolomonDecoder::new(&DATA_MATRIX_FIELD_256);
        assert_eq!(decoder.decode(&mut codewords, 8), Ok(2));
        assert_eq!(&codewords[..data.len()], &data);
    }

    #[test]
    fn test_uncorrectable_errors() {
        let data: Vec<u32> = (1..=12).collect();
        let original = encode(&QR_CODE_FIELD_256, &data, 6);
        let mut codewords = original.clone();
        for (i, flip) in [3usize, 5, 8, 11].iter().enumerate() {
            codewords[*flip] ^= 0x5A + i as u32;
        }
        let decoder = ReedSolomonDecoder::new(&QR_CODE_FIELD_256);
        match decoder.decode(&mut codewords, 6) {
            Err(DecodeError::Checksum) => {}
            Ok(_) => assert_ne!(codewords, original),
            Err(e) => panic!("unexpected error {e:?}"),
        }
    }

    #[test]
    fn test_small_fields() {
        let data = [5, 9, 1, 0, 7];
        let mut codewords = encode(&AZTEC_PARAM, &data, 6);
        codewords[1] ^= 3;
        codewords[9] ^= 12;
        assert_eq!(ReedSolomonDecoder::new(&AZTEC_PARAM).decode(&mut codewords, 6), Ok(2));
        assert_eq!(&codewords[..5], &data);

        let data: Vec<u32> = (0..40).map(|i| (i * 37) % 1024).collect();
        let mut codewords = encode(&AZTEC_DATA_10, &data, 12);
        codewords[0] ^= 1023;
        codewords[20] ^= 77;
        assert_eq!(ReedSolomonDecoder::new(&AZTEC_DATA_10).decode(&mut codewords, 12), Ok(2));
        assert_eq!(&codewords[..40], &data[..]);
    }
}
