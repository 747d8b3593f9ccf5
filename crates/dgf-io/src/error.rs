//! Error types for dgf-io.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, IoError>;

#[derive(Error, Debug)]
pub enum IoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("checkpoint payload is {actual} bytes, layout expects {expected}")]
    PayloadSizeMismatch { expected: usize, actual: usize },

    #[error("checkpoint file is truncated (missing size header)")]
    TruncatedHeader,

    #[error("compressed frame does not decode to the declared size")]
    CorruptFrame,
}
