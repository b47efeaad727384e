use thiserror::Error;

/// Recoverable failures raised while locating or decoding a symbol.
///
/// Orchestration layers treat every variant the same way: the candidate is
/// dropped and the next reader (or region) is tried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// No plausible symbol geometry in the searched region
    #[error("no barcode found")]
    NotFound,
    /// Geometry was located but the bit content is structurally invalid
    #[error("invalid barcode format: {0}")]
    Format(&'static str),
    /// Error correction or a check digit could not validate the content
    #[error("checksum or error correction failure")]
    Checksum,
}

/// Failures raised while turning text into a symbol
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// Payload does not fit in the largest symbol of the format
    #[error("contents too long for the requested format")]
    TooLong,
    /// Character cannot be represented by the format
    #[error("unsupported character {0:?}")]
    UnsupportedChar(char),
    /// Caller supplied an impossible parameter combination
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Crate-wide result alias, defaulting to [`DecodeError`]
pub type Result<T, E = DecodeError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(DecodeError::NotFound.to_string(), "no barcode found");
        assert_eq!(
            DecodeError::Format("bad mode").to_string(),
            "invalid barcode format: bad mode"
        );
        assert_eq!(
            EncodeError::UnsupportedChar('é').to_string(),
            "unsupported character 'é'"
        );
    }
}
