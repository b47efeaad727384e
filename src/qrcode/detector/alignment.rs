/// Alignment pattern detection
/// Alignment patterns appear in QR codes version 2 and above
/// They have a similar structure to finder patterns but with 1:1:1 ratios
use crate::error::{DecodeError, Result};
use crate::models::{BitMatrix, DecodeHints, Point};

/// A candidate alignment pattern center
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignmentPattern {
    /// Center in image coordinates
    pub center: Point,
    /// Estimated module size
    pub module_size: f32,
}

impl AlignmentPattern {
    fn about_equals(&self, module_size: f32, i: f32, j: f32) -> bool {
        if (i - self.center.y).abs() <= module_size && (j - self.center.x).abs() <= module_size {
            let diff = (module_size - self.module_size).abs();
            diff <= 1.0 || diff <= self.module_size
        } else {
            false
        }
    }

    fn combine_estimate(&self, i: f32, j: f32, module_size: f32) -> Self {
        Self {
            center: Point::new((self.center.x + j) / 2.0, (self.center.y + i) / 2.0),
            module_size: (self.module_size + module_size) / 2.0,
        }
    }
}

/// Searches a rectangular window for a white-black-white 1:1:1 run
pub struct AlignmentPatternFinder<'a> {
    image: &'a BitMatrix,
    possible_centers: Vec<AlignmentPattern>,
    start_x: usize,
    start_y: usize,
    width: usize,
    height: usize,
    module_size: f32,
}

impl<'a> AlignmentPatternFinder<'a> {
    /// Finder over the window `(start_x, start_y, width, height)`
    pub fn new(image: &'a BitMatrix, start_x: usize, start_y: usize, width: usize, height: usize, module_size: f32) -> Self {
        Self {
            image,
            possible_centers: Vec::with_capacity(5),
            start_x,
            start_y,
            width,
            height,
            module_size,
        }
    }

    /// Scan rows from the middle of the window outward. A pattern seen twice
    /// wins; otherwise the first one seen is returned.
    pub fn find(&mut self, hints: &DecodeHints) -> Result<AlignmentPattern> {
        let max_j = self.start_x + self.width;
        let middle_i = self.start_y + self.height / 2;

        for i_gen in 0..self.height {
            let offset = (i_gen + 1) / 2;
            let i = if i_gen & 1 == 0 {
                middle_i + offset
            } else {
                match middle_i.checked_sub(offset) {
                    Some(i) => i,
                    None => continue,
                }
            };
            if i >= self.image.height() {
                continue;
            }

            let mut state_count = [0usize; 3];
            let mut j = self.start_x;
            // Skip leading white so the first run is black
            while j < max_j && !self.image.get(j, i) {
                j += 1;
            }
            let mut current_state = 0;
            while j < max_j {
                if self.image.get(j, i) {
                    if current_state == 1 {
                        state_count[1] += 1;
                    } else if current_state == 2 {
                        if self.found_pattern_cross(&state_count) {
                            if let Some(confirmed) = self.handle_possible_center(&state_count, i, j, hints) {
                                return Ok(confirmed);
                            }
                        }
                        state_count[0] = state_count[2];
                        state_count[1] = 1;
                        state_count[2] = 0;
                        current_state = 1;
                    } else {
                        current_state += 1;
                        state_count[current_state] += 1;
                    }
                } else {
                    if current_state == 1 {
                        current_state += 1;
                    }
                    state_count[current_state] += 1;
                }
                j += 1;
            }
            if self.found_pattern_cross(&state_count) {
                if let Some(confirmed) = self.handle_possible_center(&state_count, i, max_j, hints) {
                    return Ok(confirmed);
                }
            }
        }

        self.possible_centers.first().copied().ok_or(DecodeError::NotFound)
    }

    fn found_pattern_cross(&self, state_count: &[usize; 3]) -> bool {
        let max_variance = self.module_size / 2.0;
        state_count
            .iter()
            .all(|&count| (self.module_size - count as f32).abs() < max_variance)
    }

    fn cross_check_vertical(&self, start_i: usize, center_j: usize, max_count: usize, original_total: usize) -> Option<f32> {
        let image = self.image;
        let max_i = image.height();
        let mut state_count = [0usize; 3];

        let mut i = start_i as isize;
        while i >= 0 && image.get(center_j, i as usize) && state_count[1] <= max_count {
            state_count[1] += 1;
            i -= 1;
        }
        if i < 0 || state_count[1] > max_count {
            return None;
        }
        while i >= 0 && !image.get(center_j, i as usize) && state_count[0] <= max_count {
            state_count[0] += 1;
            i -= 1;
        }
        if state_count[0] > max_count {
            return None;
        }

        let mut i = start_i + 1;
        while i < max_i && image.get(center_j, i) && state_count[1] <= max_count {
            state_count[1] += 1;
            i += 1;
        }
        if i == max_i || state_count[1] > max_count {
            return None;
        }
        while i < max_i && !image.get(center_j, i) && state_count[2] <= max_count {
            state_count[2] += 1;
            i += 1;
        }
        if state_count[2] > max_count {
            return None;
        }

        let total: usize = state_count.iter().sum();
        if 5 * total.abs_diff(original_total) >= 2 * original_total {
            return None;
        }
        self.found_pattern_cross(&state_count)
            .then(|| center_from_end(&state_count, i))
    }

    fn handle_possible_center(
        &mut self,
        state_count: &[usize; 3],
        i: usize,
        j: usize,
        hints: &DecodeHints,
    ) -> Option<AlignmentPattern> {
        let total: usize = state_count.iter().sum();
        let center_j = center_from_end(state_count, j);
        let center_i = self.cross_check_vertical(i, center_j as usize, 2 * state_count[1], total)?;

        let module_size = total as f32 / 3.0;
        if let Some(existing) = self
            .possible_centers
            .iter()
            .find(|c| c.about_equals(module_size, center_i, center_j))
        {
            return Some(existing.combine_estimate(center_i, center_j, module_size));
        }
        let pattern = AlignmentPattern {
            center: Point::new(center_j, center_i),
            module_size,
        };
        hints.report_point(pattern.center);
        self.possible_centers.push(pattern);
        None
    }
}

fn center_from_end(state_count: &[usize; 3], end: usize) -> f32 {
    (end - state_count[2]) as f32 - state_count[1] as f32 / 2.0
}
