//! Data Matrix (ECC 200): detection, decoding and encoding

/// Grid decoding
pub mod decoder;
/// Symbol location
pub mod detector;
/// Text to module grid
pub mod encoder;
/// Module placement
pub mod placement;
mod reader;
mod writer;

pub use reader::DataMatrixReader;
pub use writer::DataMatrixWriter;
