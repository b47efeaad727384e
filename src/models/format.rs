use std::fmt;

/// Symbologies the crate can read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BarcodeFormat {
    /// Aztec 2D
    Aztec,
    /// Code 39 1D
    Code39,
    /// Code 128 1D
    Code128,
    /// Data Matrix 2D
    DataMatrix,
    /// EAN-8 1D
    Ean8,
    /// EAN-13 1D
    Ean13,
    /// Interleaved 2 of 5 1D
    Itf,
    /// PDF417 stacked
    Pdf417,
    /// QR Code 2D
    QrCode,
    /// UPC-A 1D
    UpcA,
}

impl BarcodeFormat {
    /// Every supported format
    pub const ALL: [BarcodeFormat; 10] = [
        BarcodeFormat::Aztec,
        BarcodeFormat::Code39,
        BarcodeFormat::Code128,
        BarcodeFormat::DataMatrix,
        BarcodeFormat::Ean8,
        BarcodeFormat::Ean13,
        BarcodeFormat::Itf,
        BarcodeFormat::Pdf417,
        BarcodeFormat::QrCode,
        BarcodeFormat::UpcA,
    ];

    /// True for linear symbologies handled by the 1D composite reader
    pub fn is_one_d(self) -> bool {
        matches!(
            self,
            BarcodeFormat::Code39
                | BarcodeFormat::Code128
                | BarcodeFormat::Ean8
                | BarcodeFormat::Ean13
                | BarcodeFormat::Itf
                | BarcodeFormat::UpcA
        )
    }
}

impl fmt::Display for BarcodeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BarcodeFormat::Aztec => "AZTEC",
            BarcodeFormat::Code39 => "CODE_39",
            BarcodeFormat::Code128 => "CODE_128",
            BarcodeFormat::DataMatrix => "DATA_MATRIX",
            BarcodeFormat::Ean8 => "EAN_8",
            BarcodeFormat::Ean13 => "EAN_13",
            BarcodeFormat::Itf => "ITF",
            BarcodeFormat::Pdf417 => "PDF_417",
            BarcodeFormat::QrCode => "QR_CODE",
            BarcodeFormat::UpcA => "UPC_A",
        };
        f.write_str(name)
    }
}
