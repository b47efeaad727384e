//! Utility functions and shared building blocks
//!
//! This module provides helpers used across formats:
//! - Grayscale conversion and luminance sources
//! - Binarization (Otsu's method)
//! - Geometry (perspective transforms, rounding)
//! - Bit readers and character set handling

/// Luminance to bit matrix conversion
pub mod binarization;
/// Bit-level reader over byte slices
pub mod bit_source;
/// Character set guessing and decoding
pub mod charset;
/// Perspective transforms and rounding helpers
pub mod geometry;
/// RGB and RGBA to luminance
pub mod grayscale;
/// Luminance sources
pub mod luminance;
