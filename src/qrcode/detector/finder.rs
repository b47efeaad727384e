//! Finder pattern detection using 1:1:3:1:1 ratio scanning with cross checks

use crate::error::{DecodeError, Result};
use crate::models::{BitMatrix, DecodeHints, Point};

/// Rows that must confirm a center before it counts
const CENTER_QUORUM: usize = 2;
/// 1 pixel per module times 3 modules per center
const MIN_SKIP: usize = 3;
/// Densest symbol the default row skip is sized for (version 20)
const MAX_MODULES: usize = 97;

/// A candidate finder pattern center
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinderPattern {
    /// Center in image coordinates
    pub center: Point,
    /// Estimated width of one module in pixels
    pub module_size: f32,
    /// Number of scans that confirmed this center
    pub count: usize,
}

impl FinderPattern {
    /// New candidate seen once
    pub fn new(x: f32, y: f32, module_size: f32) -> Self {
        Self {
            center: Point::new(x, y),
            module_size,
            count: 1,
        }
    }

    /// True when `(j, i)` with `module_size` plausibly names this same pattern
    pub fn about_equals(&self, module_size: f32, i: f32, j: f32) -> bool {
        if (i - self.center.y).abs() <= module_size && (j - self.center.x).abs() <= module_size {
            let diff = (module_size - self.module_size).abs();
            diff <= 1.0 || diff <= self.module_size
        } else {
            false
        }
    }

    /// Running average with a new observation
    pub fn combine_estimate(&self, i: f32, j: f32, module_size: f32) -> Self {
        let count = self.count as f32;
        let combined = count + 1.0;
        Self {
            center: Point::new((count * self.center.x + j) / combined, (count * self.center.y + i) / combined),
            module_size: (count * self.module_size + module_size) / combined,
            count: self.count + 1,
        }
    }
}

/// The three finder patterns of one symbol
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinderPatternInfo {
    /// Bottom-left pattern
    pub bottom_left: FinderPattern,
    /// Top-left pattern
    pub top_left: FinderPattern,
    /// Top-right pattern
    pub top_right: FinderPattern,
}

impl FinderPatternInfo {
    /// Order three patterns into their corners
    pub fn from_patterns(patterns: [FinderPattern; 3]) -> Self {
        let [bottom_left, top_left, top_right] = Point::order_best_patterns(patterns, |p| p.center);
        Self {
            bottom_left,
            top_left,
            top_right,
        }
    }
}

/// True when the five runs are close enough to 1:1:3:1:1
pub fn found_pattern_cross(state_count: &[usize; 5]) -> bool {
    check_ratios(state_count, 2.0)
}

/// Looser ratio test for the diagonal cross check
fn found_pattern_diagonal(state_count: &[usize; 5]) -> bool {
    check_ratios(state_count, 1.333)
}

fn check_ratios(state_count: &[usize; 5], divisor: f64) -> bool {
    if state_count.contains(&0) {
        return false;
    }
    let total: usize = state_count.iter().sum();
    if total < 7 {
        return false;
    }
    let module_size = total as f64 / 7.0;
    let max_variance = module_size / divisor;
    (module_size - state_count[0] as f64).abs() < max_variance
        && (module_size - state_count[1] as f64).abs() < max_variance
        && (3.0 * module_size - state_count[2] as f64).abs() < 3.0 * max_variance
        && (module_size - state_count[3] as f64).abs() < max_variance
        && (module_size - state_count[4] as f64).abs() < max_variance
}

fn center_from_end(state_count: &[usize; 5], end: usize) -> f32 {
    (end - state_count[4] - state_count[3]) as f32 - state_count[2] as f32 / 2.0
}

fn shift_counts_2(state_count: &mut [usize; 5]) {
    state_count[0] = state_count[2];
    state_count[1] = state_count[3];
    state_count[2] = state_count[4];
    state_count[3] = 1;
    state_count[4] = 0;
}

/// Scans a binarized image for QR finder patterns
pub struct FinderPatternFinder<'a> {
    image: &'a BitMatrix,
    possible_centers: Vec<FinderPattern>,
    has_skipped: bool,
    cut_short: bool,
}

impl<'a> FinderPatternFinder<'a> {
    /// Finder over `image`
    pub fn new(image: &'a BitMatrix) -> Self {
        Self {
            image,
            possible_centers: Vec::new(),
            has_skipped: false,
            cut_short: false,
        }
    }

    /// All candidate centers seen so far
    pub fn possible_centers(&self) -> &[FinderPattern] {
        &self.possible_centers
    }

    /// Find the three finder patterns of a single symbol
    pub fn find(&mut self, hints: &DecodeHints) -> Result<FinderPatternInfo> {
        self.scan(hints, true);
        let best = self.select_best_patterns()?;
        Ok(FinderPatternInfo::from_patterns(best))
    }

    /// Like [`find`](Self::find), but every row is visited
    pub fn find_exhaustive(&mut self, hints: &DecodeHints) -> Result<FinderPatternInfo> {
        self.scan(hints, false);
        let best = self.select_best_patterns()?;
        Ok(FinderPatternInfo::from_patterns(best))
    }

    /// Whether the last scan jumped over rows or stopped before the bottom
    pub fn cut_short(&self) -> bool {
        self.cut_short
    }

    /// Row scan collecting candidates. With `stop_early` the scan ends once
    /// three confirmed centers agree on module size.
    pub fn scan(&mut self, hints: &DecodeHints, stop_early: bool) {
        self.possible_centers.clear();
        self.has_skipped = false;
        self.cut_short = false;
        let max_i = self.image.height();
        let max_j = self.image.width();

        // The largest symbol is assumed to span a quarter of the height
        let mut i_skip = (3 * max_i) / (4 * MAX_MODULES);
        if i_skip < MIN_SKIP || hints.try_harder {
            i_skip = MIN_SKIP;
        }

        let mut done = false;
        let mut i = i_skip - 1;
        while i < max_i && !done {
            let mut state_count = [0usize; 5];
            let mut current_state = 0;
            let mut j = 0;
            while j < max_j {
                if self.image.get(j, i) {
                    if current_state & 1 == 1 {
                        current_state += 1;
                    }
                    state_count[current_state] += 1;
                } else if current_state & 1 == 0 {
                    if current_state == 4 {
                        if found_pattern_cross(&state_count) {
                            if self.handle_possible_center(&state_count, i, j, hints) {
                                i_skip = 2;
                                if self.has_skipped {
                                    done = stop_early && self.have_multiply_confirmed_centers();
                                } else if stop_early {
                                    let row_skip = self.find_row_skip();
                                    if row_skip > state_count[2] {
                                        // Jump towards the third center, backing off by one pattern
                                        i = (i + row_skip).saturating_sub(state_count[2] + i_skip);
                                        j = max_j - 1;
                                        self.cut_short = true;
                                    }
                                }
                            } else {
                                shift_counts_2(&mut state_count);
                                current_state = 3;
                                j += 1;
                                continue;
                            }
                            current_state = 0;
                            state_count = [0; 5];
                        } else {
                            shift_counts_2(&mut state_count);
                            current_state = 3;
                        }
                    } else {
                        current_state += 1;
                        state_count[current_state] += 1;
                    }
                } else {
                    state_count[current_state] += 1;
                }
                j += 1;
            }
            if found_pattern_cross(&state_count) && self.handle_possible_center(&state_count, i, max_j, hints) {
                i_skip = state_count[0];
                if self.has_skipped {
                    done = stop_early && self.have_multiply_confirmed_centers();
                }
            }
            i += i_skip.max(1);
        }
        self.cut_short |= done;
        tracing::trace!(candidates = self.possible_centers.len(), "finder pattern scan");
    }

    fn cross_check_diagonal(&self, center_i: usize, center_j: usize) -> bool {
        let image = self.image;
        let mut state_count = [0usize; 5];

        let mut i = 0;
        while center_i >= i && center_j >= i && image.get(center_j - i, center_i - i) {
            state_count[2] += 1;
            i += 1;
        }
        if state_count[2] == 0 {
            return false;
        }
        while center_i >= i && center_j >= i && !image.get(center_j - i, center_i - i) {
            state_count[1] += 1;
            i += 1;
        }
        if state_count[1] == 0 {
            return false;
        }
        while center_i >= i && center_j >= i && image.get(center_j - i, center_i - i) {
            state_count[0] += 1;
            i += 1;
        }
        if state_count[0] == 0 {
            return false;
        }

        let (max_i, max_j) = (image.height(), image.width());
        i = 1;
        while center_i + i < max_i && center_j + i < max_j && image.get(center_j + i, center_i + i) {
            state_count[2] += 1;
            i += 1;
        }
        while center_i + i < max_i && center_j + i < max_j && !image.get(center_j + i, center_i + i) {
            state_count[3] += 1;
            i += 1;
        }
        if state_count[3] == 0 {
            return false;
        }
        while center_i + i < max_i && center_j + i < max_j && image.get(center_j + i, center_i + i) {
            state_count[4] += 1;
            i += 1;
        }
        if state_count[4] == 0 {
            return false;
        }
        found_pattern_diagonal(&state_count)
    }

    /// Re-measure the pattern along `get(pos)` from `start`; returns the
    /// refined center coordinate on that axis
    fn cross_check_axis(
        &self,
        start: usize,
        max: usize,
        max_count: usize,
        original_total: usize,
        total_factor: usize,
        get: impl Fn(usize) -> bool,
    ) -> Option<f32> {
        let mut state_count = [0usize; 5];

        let mut pos = start as isize;
        while pos >= 0 && get(pos as usize) {
            state_count[2] += 1;
            pos -= 1;
        }
        if pos < 0 {
            return None;
        }
        while pos >= 0 && !get(pos as usize) && state_count[1] <= max_count {
            state_count[1] += 1;
            pos -= 1;
        }
        if pos < 0 || state_count[1] > max_count {
            return None;
        }
        while pos >= 0 && get(pos as usize) && state_count[0] <= max_count {
            state_count[0] += 1;
            pos -= 1;
        }
        if state_count[0] > max_count {
            return None;
        }

        let mut pos = start + 1;
        while pos < max && get(pos) {
            state_count[2] += 1;
            pos += 1;
        }
        if pos == max {
            return None;
        }
        while pos < max && !get(pos) && state_count[3] < max_count {
            state_count[3] += 1;
            pos += 1;
        }
        if pos == max || state_count[3] >= max_count {
            return None;
        }
        while pos < max && get(pos) && state_count[4] < max_count {
            state_count[4] += 1;
            pos += 1;
        }
        if state_count[4] >= max_count {
            return None;
        }

        // Reject when the cross run is much longer than the original
        let total: usize = state_count.iter().sum();
        if 5 * total.abs_diff(original_total) >= total_factor * original_total {
            return None;
        }
        found_pattern_cross(&state_count).then(|| center_from_end(&state_count, pos))
    }

    fn handle_possible_center(&mut self, state_count: &[usize; 5], i: usize, j: usize, hints: &DecodeHints) -> bool {
        let total: usize = state_count.iter().sum();
        let center_j = center_from_end(state_count, j);
        let image = self.image;

        let column = center_j as usize;
        let Some(center_i) =
            self.cross_check_axis(i, image.height(), state_count[2], total, 2, |y| image.get(column, y))
        else {
            return false;
        };
        let row = center_i as usize;
        let Some(center_j) =
            self.cross_check_axis(column, image.width(), state_count[2], total, 1, |x| image.get(x, row))
        else {
            return false;
        };
        if !self.cross_check_diagonal(center_i as usize, center_j as usize) {
            return false;
        }

        let module_size = total as f32 / 7.0;
        match self
            .possible_centers
            .iter()
            .position(|c| c.about_equals(module_size, center_i, center_j))
        {
            Some(index) => {
                self.possible_centers[index] =
                    self.possible_centers[index].combine_estimate(center_i, center_j, module_size);
            }
            None => {
                let pattern = FinderPattern::new(center_j, center_i, module_size);
                tracing::trace!(x = center_j, y = center_i, module_size, "finder pattern candidate");
                hints.report_point(pattern.center);
                self.possible_centers.push(pattern);
            }
        }
        true
    }

    /// Rows that can be skipped once two confirmed centers are known
    fn find_row_skip(&mut self) -> usize {
        let mut confirmed = self.possible_centers.iter().filter(|c| c.count >= CENTER_QUORUM);
        let (Some(first), Some(second)) = (confirmed.next(), confirmed.next()) else {
            return 0;
        };
        self.has_skipped = true;
        // Half the difference of the x and y offsets between the two
        let dx = (first.center.x - second.center.x).abs();
        let dy = (first.center.y - second.center.y).abs();
        ((dx - dy) / 2.0).max(0.0) as usize
    }

    fn have_multiply_confirmed_centers(&self) -> bool {
        let confirmed: Vec<&FinderPattern> = self
            .possible_centers
            .iter()
            .filter(|c| c.count >= CENTER_QUORUM)
            .collect();
        if confirmed.len() < 3 {
            return false;
        }
        let total_module_size: f32 = confirmed.iter().map(|c| c.module_size).sum();
        let average = total_module_size / self.possible_centers.len() as f32;
        let total_deviation: f32 = self
            .possible_centers
            .iter()
            .map(|c| (c.module_size - average).abs())
            .sum();
        total_deviation <= 0.05 * total_module_size
    }

    /// Pick the triple whose distances best fit an isosceles right triangle
    fn select_best_patterns(&mut self) -> Result<[FinderPattern; 3]> {
        if self.possible_centers.len() < 3 {
            return Err(DecodeError::NotFound);
        }
        let mut centers = self.possible_centers.clone();
        centers.sort_by(|a, b| a.module_size.total_cmp(&b.module_size));
        best_triple(&centers).ok_or(DecodeError::NotFound)
    }
}

/// Lowest-distortion triple among module-size-sorted `centers`
pub(crate) fn best_triple(centers: &[FinderPattern]) -> Option<[FinderPattern; 3]> {
    let mut distortion = f64::MAX;
    let mut best = None;
    let sq = |a: &FinderPattern, b: &FinderPattern| a.center.distance_squared(&b.center) as f64;

    for (i, fpi) in centers.iter().enumerate() {
        let min_module_size = fpi.module_size;
        for (j, fpj) in centers.iter().enumerate().skip(i + 1) {
            let squares0 = sq(fpi, fpj);
            for fpk in centers.iter().skip(j + 1) {
                if fpk.module_size > min_module_size * 1.4 {
                    continue;
                }
                let mut sides = [squares0, sq(fpj, fpk), sq(fpi, fpk)];
                sides.sort_by(f64::total_cmp);
                let [a, b, c] = sides;
                // For a right isosceles triangle c = 2a = 2b
                let d = (c - 2.0 * b).abs() + (c - 2.0 * a).abs();
                if d < distortion {
                    distortion = d;
                    best = Some([*fpi, *fpj, *fpk]);
                }
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Draw a 7×7 finder pattern with its top-left module at `(x, y)`
    fn draw_finder(matrix: &mut BitMatrix, x: usize, y: usize, unit: usize) {
        for dy in 0..7 * unit {
            for dx in 0..7 * unit {
                let (mx, my) = (dx / unit, dy / unit);
                let ring = mx.min(my).min(6 - mx).min(6 - my);
                if ring != 1 {
                    matrix.set(x + dx, y + dy);
                }
            }
        }
    }

    #[test]
    fn test_found_pattern_cross() {
        assert!(found_pattern_cross(&[3, 3, 9, 3, 3]));
        assert!(!found_pattern_cross(&[1, 1, 3, 1, 0]));
        assert!(!found_pattern_cross(&[3, 3, 3, 3, 3]));
        assert!(!found_pattern_cross(&[1, 1, 2, 1, 1]));
    }

    #[test]
    fn test_combine_estimate() {
        let p = FinderPattern::new(10.0, 10.0, 3.0);
        assert!(p.about_equals(3.0, 11.0, 12.0));
        assert!(!p.about_equals(3.0, 20.0, 10.0));
        let combined = p.combine_estimate(12.0, 12.0, 5.0);
        assert_eq!(combined.count, 2);
        assert_eq!(combined.center, Point::new(11.0, 11.0));
        assert_eq!(combined.module_size, 4.0);
    }

    #[test]
    fn test_find_three_patterns() {
        let unit = 4;
        let mut matrix = BitMatrix::new(200, 200);
        draw_finder(&mut matrix, 20, 20, unit);
        draw_finder(&mut matrix, 140, 20, unit);
        draw_finder(&mut matrix, 20, 140, unit);

        let info = FinderPatternFinder::new(&matrix).find(&DecodeHints::default()).unwrap();
        let near = |p: Point, x: f32, y: f32| (p.x - x).abs() < 2.0 && (p.y - y).abs() < 2.0;
        assert!(near(info.top_left.center, 34.0, 34.0), "{:?}", info.top_left);
        assert!(near(info.top_right.center, 154.0, 34.0), "{:?}", info.top_right);
        assert!(near(info.bottom_left.center, 34.0, 154.0), "{:?}", info.bottom_left);
        assert!((info.top_left.module_size - 4.0).abs() < 0.5);
    }

    #[test]
    fn test_blank_image_not_found() {
        let matrix = BitMatrix::new(100, 100);
        let result = FinderPatternFinder::new(&matrix).find(&DecodeHints::default());
        assert_eq!(result.unwrap_err(), DecodeError::NotFound);
    }

    #[test]
    fn test_selection_includes_unconfirmed_centers() {
        let matrix = BitMatrix::new(150, 150);
        let mut finder = FinderPatternFinder::new(&matrix);
        let confirmed = |x, y| FinderPattern::new(x, y, 4.0).combine_estimate(y, x, 4.0);
        finder.possible_centers = vec![
            confirmed(30.0, 30.0),
            confirmed(118.0, 30.0),
            // Data-region lookalike seen twice
            confirmed(66.0, 64.0),
            FinderPattern::new(30.0, 118.0, 4.0),
        ];
        let best = finder.select_best_patterns().unwrap();
        assert!(best.iter().any(|p| p.center == Point::new(30.0, 118.0)));
        assert!(best.iter().all(|p| p.center != Point::new(66.0, 64.0)));
    }

    #[test]
    fn test_exhaustive_scan_visits_every_row() {
        let mut matrix = BitMatrix::new(200, 200);
        for (x, y) in [(20, 20), (140, 20), (20, 140)] {
            draw_finder(&mut matrix, x, y, 4);
        }
        let mut finder = FinderPatternFinder::new(&matrix);
        let info = finder.find_exhaustive(&DecodeHints::default()).unwrap();
        assert!(!finder.cut_short());
        assert!(info.bottom_left.count > 1);
    }
}
