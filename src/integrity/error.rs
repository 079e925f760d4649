use crate::integrity::types::ChecksumType;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IntegrityError {
    #[error("{algorithm} mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch {
        algorithm: ChecksumType,
        expected: String,
        actual: String,
    },

    #[error("File not found: {0}")]
    FileNotFound(String),

    /// The stream broke part way through hashing.
    #[error("Reading '{path}' failed: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown checksum algorithm: {0}")]
    UnknownAlgorithm(String),
}

pub type IntegrityResult<T> = Result<T, IntegrityError>;
