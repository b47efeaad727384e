//! QR Code: detection, decoding and encoding

/// Grid decoding
pub mod decoder;
/// Symbol location
pub mod detector;
/// Text to module grid
pub mod encoder;
mod reader;
mod writer;

pub use reader::QrCodeReader;
pub use writer::QrCodeWriter;
