use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid base32 string: {0}")]
    InvalidBase32(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("invalid store path name: {0:?}")]
    InvalidName(String),

    #[error("invalid store path: {0}")]
    InvalidPath(String),

    #[error("negative {field}: {value}")]
    NegativeSize { field: &'static str, value: i64 },

    #[error("narinfo parse error: {0}")]
    NarInfoParse(String),
}
