use crate::fs::FsError;
use crate::rpc::{ErrorCode, RpcError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RoutingError {
    #[error(transparent)]
    Fs(#[from] FsError),

    #[error("Cannot {action} directly between hosts '{from}' and '{to}'")]
    CrossHost {
        action: &'static str,
        from: String,
        to: String,
    },

    #[error("Invalid source path: {0}")]
    InvalidSource(String),
}

impl RoutingError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            RoutingError::Fs(e) => e.error_code(),
            RoutingError::CrossHost { .. } => ErrorCode::OperationFailed,
            RoutingError::InvalidSource(_) => ErrorCode::InvalidParams,
        }
    }

    pub fn code(&self) -> i32 {
        self.error_code().code()
    }
}

impl From<RoutingError> for RpcError {
    fn from(err: RoutingError) -> Self {
        RpcError::failed(err.error_code(), err.to_string())
    }
}

pub type RoutingResult<T> = Result<T, RoutingError>;
