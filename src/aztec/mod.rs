//! Aztec: bullseye detection, decoding and encoding

/// Bit extraction and high-level decoding
pub mod decoder;
/// Bullseye and mode message location
pub mod detector;
/// Text to module grid
pub mod encoder;
mod reader;
mod writer;

pub use reader::AztecReader;
pub use writer::AztecWriter;
