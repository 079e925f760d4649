use crate::rpc::{ErrorCode, RpcError};
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FsError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    PermissionDenied(String),

    #[error("{0}")]
    AlreadyExists(String),

    #[error("{0}")]
    Unsupported(String),

    #[error("{0}")]
    OperationFailed(String),

    #[error("Host not found: {0}")]
    HostNotFound(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Checksum of '{path}' failed: {message}")]
    Checksum { path: String, message: String },

    #[error("Operation cancelled")]
    Cancelled,

    /// Failure reported as bare text by a remote collaborator.
    #[error("{0}")]
    Remote(String),
}

impl FsError {
    /// Wrap an I/O error with the operation and path that produced it.
    pub fn from_io(op: &str, path: &str, err: io::Error) -> Self {
        let message = format!("{op} '{path}': {err}");
        match err.kind() {
            io::ErrorKind::NotFound => FsError::NotFound(message),
            io::ErrorKind::PermissionDenied => FsError::PermissionDenied(message),
            io::ErrorKind::AlreadyExists => FsError::AlreadyExists(message),
            io::ErrorKind::Unsupported => FsError::Unsupported(message),
            _ => FsError::OperationFailed(message),
        }
    }

    pub fn error_code(&self) -> ErrorCode {
        match self {
            FsError::NotFound(_) => ErrorCode::FileNotFound,
            FsError::PermissionDenied(_) => ErrorCode::PermissionDenied,
            FsError::HostNotFound(_) => ErrorCode::HostNotFound,
            FsError::ConnectionFailed(_) => ErrorCode::ConnectionFailed,
            FsError::InvalidPath(_) => ErrorCode::InvalidParams,
            FsError::Remote(message) => ErrorCode::classify(message),
            FsError::AlreadyExists(_)
            | FsError::Unsupported(_)
            | FsError::OperationFailed(_)
            | FsError::Checksum { .. }
            | FsError::Cancelled => ErrorCode::OperationFailed,
        }
    }

    pub fn code(&self) -> i32 {
        self.error_code().code()
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FsError::NotFound(_))
    }
}

impl From<FsError> for RpcError {
    fn from(err: FsError) -> Self {
        RpcError::failed(err.error_code(), err.to_string())
    }
}

pub type FsResult<T> = Result<T, FsError>;
