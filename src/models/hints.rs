use std::fmt;
use std::sync::Arc;

use super::{BarcodeFormat, Point};
use crate::utils::charset::CharacterSet;

/// Callback invoked with interesting points while a detector runs
pub type ResultPointCallback = Arc<dyn Fn(Point) + Send + Sync>;

/// Per-call decoding hints
#[derive(Clone, Default)]
pub struct DecodeHints {
    /// Spend more time for better recall
    pub try_harder: bool,
    /// Restrict decoding to these formats; empty means all
    pub possible_formats: Vec<BarcodeFormat>,
    /// Image is a perfectly aligned symbol with a quiet zone and nothing else
    pub pure_barcode: bool,
    /// Character set for byte content without an ECI
    pub character_set: Option<CharacterSet>,
    /// Receives finder and guard points as they are found
    pub result_point_callback: Option<ResultPointCallback>,
    /// Code 39 symbols end with a mod-43 check digit
    pub assume_code_39_check_digit: bool,
    /// Allowed ITF lengths; empty selects the defaults
    pub allowed_lengths: Vec<usize>,
    /// Retry on the inverted image when nothing was found
    pub also_inverted: bool,
}

impl DecodeHints {
    /// Enable exhaustive search
    pub fn with_try_harder(mut self, try_harder: bool) -> Self {
        self.try_harder = try_harder;
        self
    }

    /// Restrict formats
    pub fn with_formats(mut self, formats: impl IntoIterator<Item = BarcodeFormat>) -> Self {
        self.possible_formats = formats.into_iter().collect();
        self
    }

    /// Enable the pure-barcode fast path
    pub fn with_pure_barcode(mut self, pure: bool) -> Self {
        self.pure_barcode = pure;
        self
    }

    /// Override the default character set
    pub fn with_character_set(mut self, charset: CharacterSet) -> Self {
        self.character_set = Some(charset);
        self
    }

    /// Register a point callback
    pub fn with_result_point_callback(mut self, callback: ResultPointCallback) -> Self {
        self.result_point_callback = Some(callback);
        self
    }

    /// Expect a Code 39 check digit
    pub fn with_code_39_check_digit(mut self, assume: bool) -> Self {
        self.assume_code_39_check_digit = assume;
        self
    }

    /// Retry inverted images
    pub fn with_also_inverted(mut self, also_inverted: bool) -> Self {
        self.also_inverted = also_inverted;
        self
    }

    /// True when `format` is allowed by `possible_formats`
    pub fn allows(&self, format: BarcodeFormat) -> bool {
        self.possible_formats.is_empty() || self.possible_formats.contains(&format)
    }

    pub(crate) fn report_point(&self, point: Point) {
        if let Some(callback) = &self.result_point_callback {
            callback(point);
        }
    }

    pub(crate) fn without_callback(&self) -> Self {
        Self {
            result_point_callback: None,
            ..self.clone()
        }
    }
}

impl fmt::Debug for DecodeHints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodeHints")
            .field("try_harder", &self.try_harder)
            .field("possible_formats", &self.possible_formats)
            .field("pure_barcode", &self.pure_barcode)
            .field("character_set", &self.character_set)
            .field("result_point_callback", &self.result_point_callback.is_some())
            .field("assume_code_39_check_digit", &self.assume_code_39_check_digit)
            .field("allowed_lengths", &self.allowed_lengths)
            .field("also_inverted", &self.also_inverted)
            .finish()
    }
}

/// Per-call encoding hints
#[derive(Debug, Clone, Default)]
pub struct EncodeHints {
    /// Format-specific error correction: `L`/`M`/`Q`/`H` for QR, a percentage
    /// for Aztec, a level `0..=8` for PDF417
    pub error_correction: Option<String>,
    /// Character set for byte content
    pub character_set: Option<CharacterSet>,
    /// Quiet zone in modules
    pub margin: Option<usize>,
    /// Force a QR version
    pub qr_version: Option<u32>,
    /// Force a QR mask pattern
    pub qr_mask: Option<u8>,
    /// Force an Aztec layer count; negative selects compact symbols
    pub aztec_layers: Option<i32>,
}

impl EncodeHints {
    /// Set the error correction parameter
    pub fn with_error_correction(mut self, level: impl Into<String>) -> Self {
        self.error_correction = Some(level.into());
        self
    }

    /// Set the quiet zone
    pub fn with_margin(mut self, margin: usize) -> Self {
        self.margin = Some(margin);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_allows() {
        let hints = DecodeHints::default();
        assert!(hints.allows(BarcodeFormat::Aztec));
        let hints = hints.with_formats([BarcodeFormat::QrCode]);
        assert!(hints.allows(BarcodeFormat::QrCode));
        assert!(!hints.allows(BarcodeFormat::Code128));
    }

    #[test]
    fn test_callback_and_debug() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        let hints = DecodeHints::default().with_result_point_callback(Arc::new(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        }));
        hints.report_point(Point::new(1.0, 1.0));
        hints.without_callback().report_point(Point::new(1.0, 1.0));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(format!("{hints:?}").contains("result_point_callback: true"));
    }
}
