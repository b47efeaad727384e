//! Detection building blocks shared across formats
//!
//! - Projective grid sampling
//! - White-rectangle corner search

/// Perspective grid sampling
pub mod grid_sampler;
/// Bounding quad search around a seed point
pub mod white_rectangle;

pub use grid_sampler::GridSampler;
pub use white_rectangle::WhiteRectangleDetector;

use crate::models::{BitMatrix, Point};

/// Sampled symbol grid plus the image points it was located from
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorResult {
    /// One bit per module
    pub bits: BitMatrix,
    /// Corner, finder or guard points in image coordinates
    pub points: Vec<Point>,
}

impl DetectorResult {
    /// Bundle a sampled grid with its points
    pub fn new(bits: BitMatrix, points: Vec<Point>) -> Self {
        Self { bits, points }
    }
}
