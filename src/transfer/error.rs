use crate::fs::FsError;
use crate::rpc::{ErrorCode, RpcError};
use crate::transfer::types::TransferStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Transfer not found: {0}")]
    JobNotFound(String),

    #[error("Invalid job: {0}")]
    InvalidJob(String),

    #[error("Invalid state transition: cannot {event} a {from} job")]
    InvalidTransition {
        from: TransferStatus,
        event: &'static str,
    },

    #[error("Transfer {0} is not waiting on a conflict")]
    NotInConflict(String),

    #[error(transparent)]
    Fs(#[from] FsError),
}

impl QueueError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            QueueError::JobNotFound(_) => ErrorCode::HostNotFound,
            QueueError::InvalidJob(_) => ErrorCode::InvalidParams,
            QueueError::InvalidTransition { .. } | QueueError::NotInConflict(_) => {
                ErrorCode::OperationFailed
            }
            QueueError::Fs(e) => e.error_code(),
        }
    }

    pub fn code(&self) -> i32 {
        self.error_code().code()
    }
}

impl From<QueueError> for RpcError {
    fn from(err: QueueError) -> Self {
        RpcError::failed(err.error_code(), err.to_string())
    }
}

pub type QueueResult<T> = Result<T, QueueError>;
