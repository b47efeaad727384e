//! Finite-field error correction shared by every 2D format
//!
//! - GF(2^n) arithmetic and polynomials (QR, Data Matrix, Aztec)
//! - Reed-Solomon decoder and encoder over those fields
//! - GF(929) arithmetic and its Reed-Solomon decoder (PDF417)

/// GF(2^n) fields with compile-time tables
pub mod galois;
/// GF(929) field, decoder and PDF417 EC generation
pub mod modulus;
/// Reed-Solomon decoder and encoder
pub mod reed_solomon;

pub use galois::GenericGf;
pub use modulus::ModulusDecoder;
pub use reed_solomon::{ReedSolomonDecoder, ReedSolomonEncoder};
