//! Reader contract and the hint-compiled reader plan.

use crate::aztec::AztecReader;
use crate::binary_bitmap::BinaryBitmap;
use crate::datamatrix::DataMatrixReader;
use crate::error::Result;
use crate::models::{BarcodeFormat, DecodeHints, ScanResult};
use crate::oned::MultiFormatOneDReader;
use crate::pdf417::Pdf417Reader;
use crate::qrcode::QrCodeReader;

/// Locates and decodes one symbol of a given family
pub trait Reader {
    /// Decode a single symbol from `image`
    fn decode(&mut self, image: &BinaryBitmap, hints: &DecodeHints) -> Result<ScanResult>;

    /// Drop state accumulated across calls
    fn reset(&mut self) {}
}

/// Reader families a plan can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReaderKind {
    /// Composite of every linear symbology
    OneD,
    /// QR Code
    QrCode,
    /// Data Matrix
    DataMatrix,
    /// Aztec
    Aztec,
    /// PDF417
    Pdf417,
}

impl ReaderKind {
    /// Formats this reader can report
    pub fn formats(self) -> &'static [BarcodeFormat] {
        match self {
            ReaderKind::OneD => &[
                BarcodeFormat::Code39,
                BarcodeFormat::Code128,
                BarcodeFormat::Ean8,
                BarcodeFormat::Ean13,
                BarcodeFormat::Itf,
                BarcodeFormat::UpcA,
            ],
            ReaderKind::QrCode => &[BarcodeFormat::QrCode],
            ReaderKind::DataMatrix => &[BarcodeFormat::DataMatrix],
            ReaderKind::Aztec => &[BarcodeFormat::Aztec],
            ReaderKind::Pdf417 => &[BarcodeFormat::Pdf417],
        }
    }

    /// Fresh reader instance
    pub fn instantiate(self) -> Box<dyn Reader + Send> {
        match self {
            ReaderKind::OneD => Box::new(MultiFormatOneDReader::default()),
            ReaderKind::QrCode => Box::new(QrCodeReader::default()),
            ReaderKind::DataMatrix => Box::new(DataMatrixReader::default()),
            ReaderKind::Aztec => Box::new(AztecReader),
            ReaderKind::Pdf417 => Box::new(Pdf417Reader),
        }
    }
}

const TWO_D_ORDER: [ReaderKind; 4] = [
    ReaderKind::QrCode,
    ReaderKind::DataMatrix,
    ReaderKind::Aztec,
    ReaderKind::Pdf417,
];

/// Ordered list of reader families to try
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReaderPlan {
    kinds: Vec<ReaderKind>,
}

impl ReaderPlan {
    /// Build the plan for `hints`; see [`compile`]
    pub fn compile(hints: &DecodeHints) -> Self {
        compile(hints)
    }

    /// Reader families in try order
    pub fn kinds(&self) -> &[ReaderKind] {
        &self.kinds
    }

    /// True when the plan holds no readers
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

/// Pure plan compilation.
///
/// The 1D composite goes first normally and last under `try_harder`. 2D
/// readers follow in the order QR, Data Matrix, Aztec, PDF417. Requested
/// formats restrict the list; if none of them maps to a reader the full
/// default list is used.
pub fn compile(hints: &DecodeHints) -> ReaderPlan {
    let mut kinds = Vec::with_capacity(5);
    if !hints.possible_formats.is_empty() {
        let add_one_d = hints.possible_formats.iter().any(|f| f.is_one_d());
        if add_one_d && !hints.try_harder {
            kinds.push(ReaderKind::OneD);
        }
        kinds.extend(
            TWO_D_ORDER
                .iter()
                .copied()
                .filter(|kind| kind.formats().iter().any(|f| hints.possible_formats.contains(f))),
        );
        if add_one_d && hints.try_harder {
            kinds.push(ReaderKind::OneD);
        }
    }
    if kinds.is_empty() {
        if !hints.try_harder {
            kinds.push(ReaderKind::OneD);
        }
        kinds.extend(TWO_D_ORDER);
        if hints.try_harder {
            kinds.push(ReaderKind::OneD);
        }
    }
    ReaderPlan { kinds }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_plan_order() {
        let plan = compile(&DecodeHints::default());
        assert_eq!(
            plan.kinds(),
            &[
                ReaderKind::OneD,
                ReaderKind::QrCode,
                ReaderKind::DataMatrix,
                ReaderKind::Aztec,
                ReaderKind::Pdf417
            ]
        );
    }

    #[test]
    fn test_try_harder_moves_one_d_last() {
        let plan = compile(&DecodeHints::default().with_try_harder(true));
        assert_eq!(plan.kinds().first(), Some(&ReaderKind::QrCode));
        assert_eq!(plan.kinds().last(), Some(&ReaderKind::OneD));
    }

    #[test]
    fn test_restricted_formats() {
        let hints = DecodeHints::default().with_formats([BarcodeFormat::QrCode]);
        assert_eq!(compile(&hints).kinds(), &[ReaderKind::QrCode]);

        let hints = DecodeHints::default().with_formats([BarcodeFormat::Pdf417, BarcodeFormat::Ean13]);
        assert_eq!(compile(&hints).kinds(), &[ReaderKind::OneD, ReaderKind::Pdf417]);

        let hints = hints.with_try_harder(true);
        assert_eq!(compile(&hints).kinds(), &[ReaderKind::Pdf417, ReaderKind::OneD]);
    }

    #[test]
    fn test_plan_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ReaderPlan>();
        assert_eq!(ReaderPlan::compile(&DecodeHints::default()), compile(&DecodeHints::default()));
    }
}
