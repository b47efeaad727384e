//! Aztec location from the central bullseye
//!
//! The bullseye rings are walked outward along the diagonals until the ring
//! ratio breaks, which yields compact (5 rings) or full (7 rings) symbols.
//! The ring just outside holds the orientation marks and the RS-protected
//! mode message with the layer and data word counts.

use crate::decoder::ReedSolomonDecoder;
use crate::decoder::galois::AZTEC_PARAM;
use crate::detector::{GridSampler, WhiteRectangleDetector};
use crate::error::{DecodeError, Result};
use crate::models::{BitMatrix, Point};
use crate::utils::geometry::round;

/// Orientation mark bits read clockwise from each of the four corners
const EXPECTED_CORNER_BITS: [u32; 4] = [0xee0, 0x1dc, 0x83b, 0x707];

/// Sampled symbol plus the parameters read from its mode message
#[derive(Debug, Clone, PartialEq)]
pub struct AztecDetectorResult {
    /// One bit per module, full symbol
    pub bits: BitMatrix,
    /// Symbol corners in image coordinates
    pub points: Vec<Point>,
    /// Compact symbol (one ring less around the bullseye)
    pub compact: bool,
    /// Data codewords before the check words
    pub nb_data_blocks: usize,
    /// Number of data layers
    pub nb_layers: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct IntPoint {
    x: i32,
    y: i32,
}

impl IntPoint {
    fn to_point(self) -> Point {
        Point::new(self.x as f32, self.y as f32)
    }

    fn distance(self, other: IntPoint) -> f32 {
        self.to_point().distance(&other.to_point())
    }
}

/// Locates an Aztec symbol in a binarized image
pub struct Detector<'a> {
    image: &'a BitMatrix,
    compact: bool,
    nb_layers: usize,
    nb_data_blocks: usize,
    nb_center_layers: usize,
    shift: usize,
}

impl<'a> Detector<'a> {
    /// Detector over `image`
    pub fn new(image: &'a BitMatrix) -> Self {
        Self {
            image,
            compact: false,
            nb_layers: 0,
            nb_data_blocks: 0,
            nb_center_layers: 0,
            shift: 0,
        }
    }

    /// Detect a symbol; `is_mirror` reads the image as its mirror image
    pub fn detect(&mut self, is_mirror: bool) -> Result<AztecDetectorResult> {
        let center = self.matrix_center();
        let mut corners = self.bulls_eye_corners(center)?;
        if is_mirror {
            corners.swap(0, 2);
        }
        self.extract_parameters(&corners)?;
        tracing::trace!(
            compact = self.compact,
            layers = self.nb_layers,
            data_blocks = self.nb_data_blocks,
            "Aztec mode message"
        );

        let quad = [0, 1, 2, 3].map(|i| corners[(self.shift + i) % 4]);
        let bits = self.sample_grid(&quad)?;
        let points = self.expand_to_symbol(&corners);
        Ok(AztecDetectorResult {
            bits,
            points: points.to_vec(),
            compact: self.compact,
            nb_data_blocks: self.nb_data_blocks,
            nb_layers: self.nb_layers,
        })
    }

    fn extract_parameters(&mut self, corners: &[Point; 4]) -> Result<()> {
        if !corners.iter().all(|p| self.is_valid(round(p.x), round(p.y))) {
            return Err(DecodeError::NotFound);
        }
        let length = 2 * self.nb_center_layers;
        let sides = [
            self.sample_line(corners[0], corners[1], length),
            self.sample_line(corners[1], corners[2], length),
            self.sample_line(corners[2], corners[3], length),
            self.sample_line(corners[3], corners[0], length),
        ];
        self.shift = rotation(&sides, length)?;

        let mut parameter_data: u64 = 0;
        for i in 0..4 {
            let side = sides[(self.shift + i) % 4] as u64;
            if self.compact {
                parameter_data = (parameter_data << 7) + ((side >> 1) & 0x7F);
            } else {
                parameter_data = (parameter_data << 10) + ((side >> 2) & (0x1F << 5)) + ((side >> 1) & 0x1F);
            }
        }
        let corrected = corrected_parameter_data(parameter_data, self.compact)?;
        if self.compact {
            self.nb_layers = (corrected >> 6) as usize + 1;
            self.nb_data_blocks = (corrected & 0x3F) as usize + 1;
        } else {
            self.nb_layers = (corrected >> 11) as usize + 1;
            self.nb_data_blocks = (corrected & 0x7FF) as usize + 1;
        }
        Ok(())
    }

    /// Centers of the diagonal modules just outside the bullseye, clockwise
    /// from top-right
    fn bulls_eye_corners(&mut self, center: IntPoint) -> Result<[Point; 4]> {
        let (mut pina, mut pinb, mut pinc, mut pind) = (center, center, center, center);
        let mut color = true;

        self.nb_center_layers = 1;
        while self.nb_center_layers < 9 {
            let pouta = self.first_different(pina, color, 1, -1);
            let poutb = self.first_different(pinb, color, 1, 1);
            let poutc = self.first_different(pinc, color, -1, 1);
            let poutd = self.first_different(pind, color, -1, -1);

            if self.nb_center_layers > 2 {
                let q = poutd.distance(pouta) * self.nb_center_layers as f32
                    / (pind.distance(pina) * (self.nb_center_layers + 2) as f32);
                if !(0.75..=1.25).contains(&q) || !self.is_white_or_black_rectangle(pouta, poutb, poutc, poutd) {
                    break;
                }
            }

            pina = pouta;
            pinb = poutb;
            pinc = poutc;
            pind = poutd;
            color = !color;
            self.nb_center_layers += 1;
        }

        if self.nb_center_layers != 5 && self.nb_center_layers != 7 {
            return Err(DecodeError::NotFound);
        }
        self.compact = self.nb_center_layers == 5;

        let corners = [
            Point::new(pina.x as f32 + 0.5, pina.y as f32 - 0.5),
            Point::new(pinb.x as f32 + 0.5, pinb.y as f32 + 0.5),
            Point::new(pinc.x as f32 - 0.5, pinc.y as f32 + 0.5),
            Point::new(pind.x as f32 - 0.5, pind.y as f32 - 0.5),
        ];
        Ok(expand_square(
            &corners,
            2 * self.nb_center_layers - 3,
            2 * self.nb_center_layers,
        ))
    }

    /// Rough center from two rounds of white-rectangle search, falling back
    /// to diagonal walks from the image center
    fn matrix_center(&self) -> IntPoint {
        let (width, height) = (self.image.width() as i32, self.image.height() as i32);
        let quad = WhiteRectangleDetector::new(self.image)
            .and_then(|detector| detector.detect())
            .unwrap_or_else(|_| self.diagonal_quad(width / 2, height / 2));
        let (cx, cy) = quad_center(&quad);

        let quad = WhiteRectangleDetector::with_seed(self.image, 15, cx, cy)
            .and_then(|detector| detector.detect())
            .unwrap_or_else(|_| self.diagonal_quad(cx, cy));
        let (x, y) = quad_center(&quad);
        IntPoint { x, y }
    }

    fn diagonal_quad(&self, cx: i32, cy: i32) -> [Point; 4] {
        [
            self.first_different(IntPoint { x: cx + 7, y: cy - 7 }, false, 1, -1),
            self.first_different(IntPoint { x: cx + 7, y: cy + 7 }, false, 1, 1),
            self.first_different(IntPoint { x: cx - 7, y: cy + 7 }, false, -1, 1),
            self.first_different(IntPoint { x: cx - 7, y: cy - 7 }, false, -1, -1),
        ]
        .map(IntPoint::to_point)
    }

    fn expand_to_symbol(&self, corners: &[Point; 4]) -> [Point; 4] {
        expand_square(corners, 2 * self.nb_center_layers, self.dimension())
    }

    fn sample_grid(&self, quad: &[Point; 4]) -> Result<BitMatrix> {
        let dimension = self.dimension();
        let low = dimension as f32 / 2.0 - self.nb_center_layers as f32;
        let high = dimension as f32 / 2.0 + self.nb_center_layers as f32;
        GridSampler::sample_grid(
            self.image,
            dimension,
            dimension,
            [low, low, high, low, high, high, low, high],
            [
                quad[0].x, quad[0].y, quad[1].x, quad[1].y, quad[2].x, quad[2].y, quad[3].x, quad[3].y,
            ],
        )
    }

    /// `size` bits from `p1` (inclusive) towards `p2` (exclusive), first bit
    /// in the high position
    fn sample_line(&self, p1: Point, p2: Point, size: usize) -> u32 {
        let d = p1.distance(&p2);
        let module_size = d / size as f32;
        let dx = module_size * (p2.x - p1.x) / d;
        let dy = module_size * (p2.y - p1.y) / d;
        (0..size).fold(0, |result, i| {
            let dark = self
                .image
                .get_i(round(p1.x + i as f32 * dx), round(p1.y + i as f32 * dy));
            if dark { result | 1 << (size - i - 1) } else { result }
        })
    }

    /// Whether the border just outside the four points is uniformly one color
    fn is_white_or_black_rectangle(&self, p1: IntPoint, p2: IntPoint, p3: IntPoint, p4: IntPoint) -> bool {
        const CORR: i32 = 3;
        let (max_x, max_y) = (self.image.width() as i32 - 1, self.image.height() as i32 - 1);
        let p1 = IntPoint { x: (p1.x - CORR).max(0), y: (p1.y + CORR).min(max_y) };
        let p2 = IntPoint { x: (p2.x - CORR).max(0), y: (p2.y - CORR).max(0) };
        let p3 = IntPoint { x: (p3.x + CORR).min(max_x), y: (p3.y - CORR).min(max_y).max(0) };
        let p4 = IntPoint { x: (p4.x + CORR).min(max_x), y: (p4.y + CORR).min(max_y) };

        let c_init = self.color(p4, p1);
        c_init != 0 && self.color(p1, p2) == c_init && self.color(p2, p3) == c_init && self.color(p3, p4) == c_init
    }

    /// 1 when the segment is over 90% black, -1 when over 90% white, else 0
    fn color(&self, p1: IntPoint, p2: IntPoint) -> i32 {
        let d = p1.distance(p2);
        if d == 0.0 {
            return 0;
        }
        let dx = (p2.x - p1.x) as f32 / d;
        let dy = (p2.y - p1.y) as f32 / d;
        let color_model = self.image.get_i(p1.x, p1.y);

        let (mut px, mut py) = (p1.x as f32, p1.y as f32);
        let mut error = 0;
        for _ in 0..d.floor() as usize {
            if self.image.get_i(round(px), round(py)) != color_model {
                error += 1;
            }
            px += dx;
            py += dy;
        }

        let err_ratio = error as f32 / d;
        if err_ratio > 0.1 && err_ratio < 0.9 {
            return 0;
        }
        if (err_ratio <= 0.1) == color_model { 1 } else { -1 }
    }

    /// Last point of `color` walking from `init` along `(dx, dy)`, then
    /// pushed along each axis separately
    fn first_different(&self, init: IntPoint, color: bool, dx: i32, dy: i32) -> IntPoint {
        let same = |x: i32, y: i32| self.is_valid(x, y) && self.image.get_i(x, y) == color;
        let (mut x, mut y) = (init.x + dx, init.y + dy);
        while same(x, y) {
            x += dx;
            y += dy;
        }
        x -= dx;
        y -= dy;
        while same(x, y) {
            x += dx;
        }
        x -= dx;
        while same(x, y) {
            y += dy;
        }
        y -= dy;
        IntPoint { x, y }
    }

    fn is_valid(&self, x: i32, y: i32) -> bool {
        x >= 0 && x < self.image.width() as i32 && y >= 0 && y < self.image.height() as i32
    }

    fn dimension(&self) -> usize {
        if self.compact {
            4 * self.nb_layers + 11
        } else {
            4 * self.nb_layers + 2 * ((2 * self.nb_layers + 6) / 15) + 15
        }
    }
}

fn quad_center(quad: &[Point; 4]) -> (i32, i32) {
    (
        round((quad[0].x + quad[1].x + quad[2].x + quad[3].x) / 4.0),
        round((quad[0].y + quad[1].y + quad[2].y + quad[3].y) / 4.0),
    )
}

/// Index of the corner whose orientation marks match, allowing two bit errors
fn rotation(sides: &[u32; 4], length: usize) -> Result<usize> {
    let mut corner_bits: u32 = 0;
    for &side in sides {
        let t = ((side >> (length - 2)) << 1) + (side & 1);
        corner_bits = (corner_bits << 3) + t;
    }
    // The last bit belongs in front
    corner_bits = ((corner_bits & 1) << 11) + (corner_bits >> 1);
    EXPECTED_CORNER_BITS
        .iter()
        .position(|&expected| (corner_bits ^ expected).count_ones() <= 2)
        .ok_or(DecodeError::NotFound)
}

/// RS-correct the mode message over GF(16)
fn corrected_parameter_data(mut parameter_data: u64, compact: bool) -> Result<u32> {
    let (num_codewords, num_data_codewords) = if compact { (7, 2) } else { (10, 4) };
    let mut words = vec![0u32; num_codewords];
    for word in words.iter_mut().rev() {
        *word = (parameter_data & 0xF) as u32;
        parameter_data >>= 4;
    }
    ReedSolomonDecoder::new(&AZTEC_PARAM)
        .decode(&mut words, num_codewords - num_data_codewords)
        .map_err(|_| DecodeError::NotFound)?;
    Ok(words[..num_data_codewords].iter().fold(0, |acc, &w| (acc << 4) + w))
}

/// Grow a square about its center so a side of `old_side` modules becomes
/// `new_side`
fn expand_square(corners: &[Point; 4], old_side: usize, new_side: usize) -> [Point; 4] {
    let ratio = new_side as f32 / (2.0 * old_side as f32);
    let expand = |a: Point, b: Point| {
        let (dx, dy) = (a.x - b.x, a.y - b.y);
        let (cx, cy) = ((a.x + b.x) / 2.0, (a.y + b.y) / 2.0);
        (
            Point::new(cx + ratio * dx, cy + ratio * dy),
            Point::new(cx - ratio * dx, cy - ratio * dy),
        )
    };
    let (r0, r2) = expand(corners[0], corners[2]);
    let (r1, r3) = expand(corners[1], corners[3]);
    [r0, r1, r2, r3]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_square() {
        let corners = [
            Point::new(6.0, 4.0),
            Point::new(6.0, 6.0),
            Point::new(4.0, 6.0),
            Point::new(4.0, 4.0),
        ];
        let expanded = expand_square(&corners, 2, 4);
        assert_eq!(expanded[0], Point::new(7.0, 3.0));
        assert_eq!(expanded[2], Point::new(3.0, 7.0));
    }

    #[test]
    fn test_rotation() {
        let length = 10;
        let sides = [0b11_0000_0000, 0b11_0000_0001, 0, 0b00_0000_0001];
        assert_eq!(rotation(&sides, length), Ok(0));
        let turned = [sides[1], sides[2], sides[3], sides[0]];
        assert_eq!(rotation(&turned, length), Ok(3));
        // One flipped mark is tolerated
        let noisy = [sides[0] | 1, sides[1], sides[2], sides[3]];
        assert_eq!(rotation(&noisy, length), Ok(0));
        assert_eq!(rotation(&[0, 0, 0, 0], length), Err(DecodeError::NotFound));
    }

    #[test]
    fn test_blank_not_found() {
        let image = BitMatrix::square(60);
        assert!(Detector::new(&image).detect(false).is_err());
    }
}
