//! Core data structures shared by every reader and writer

/// Packed row of bits
pub mod bit_array;
/// Barcode format enumeration
pub mod format;
/// Decode and encode hints
pub mod hints;
/// Two-dimensional bit grid
pub mod matrix;
/// Image-space points
pub mod point;
/// Decode results and metadata
pub mod result;

pub use bit_array::BitArray;
pub use format::BarcodeFormat;
pub use hints::{DecodeHints, EncodeHints, ResultPointCallback};
pub use matrix::BitMatrix;
pub use point::Point;
pub use result::{DecoderResult, MetadataValue, ResultMetadataType, ScanResult};
