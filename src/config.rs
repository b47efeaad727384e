//! Process-wide tuning knobs read once from the environment.

use std::sync::OnceLock;

fn parse_env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|&v| v > 0)
        .unwrap_or(default)
}

static MULTI_MAX_DEPTH: OnceLock<usize> = OnceLock::new();

/// Maximum recursion depth of the generic multiple-barcode search
pub(crate) fn multi_max_depth() -> usize {
    *MULTI_MAX_DEPTH.get_or_init(|| parse_env_usize("BARCODE_MULTI_MAX_DEPTH", 4).clamp(1, 16))
}

static MULTI_MIN_DIMENSION: OnceLock<usize> = OnceLock::new();

/// Sub-images narrower or shorter than this are not searched again
pub(crate) fn multi_min_dimension() -> usize {
    *MULTI_MIN_DIMENSION.get_or_init(|| parse_env_usize("BARCODE_MULTI_MIN_DIMENSION", 100))
}

static ONED_MAX_LINES: OnceLock<usize> = OnceLock::new();

/// Rows scanned by the 1D readers when not trying harder
pub(crate) fn oned_max_lines() -> usize {
    *ONED_MAX_LINES.get_or_init(|| parse_env_usize("BARCODE_ONED_MAX_LINES", 15))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_usize_default() {
        assert_eq!(parse_env_usize("BARCODE_TEST_UNSET_KNOB", 7), 7);
    }

    #[test]
    fn test_defaults_are_positive() {
        assert!(multi_max_depth() >= 1);
        assert!(multi_min_dimension() >= 1);
        assert!(oned_max_lines() >= 1);
    }
}
