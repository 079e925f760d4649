use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::rpc::types::RpcErrorBody;

/// Numeric error codes carried in `rpc-response` envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    HostNotFound,
    CredentialNotFound,
    ConnectionFailed,
    PermissionDenied,
    FileNotFound,
    OperationFailed,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 11] = [
        ErrorCode::ParseError,
        ErrorCode::InvalidRequest,
        ErrorCode::MethodNotFound,
        ErrorCode::InvalidParams,
        ErrorCode::InternalError,
        ErrorCode::HostNotFound,
        ErrorCode::CredentialNotFound,
        ErrorCode::ConnectionFailed,
        ErrorCode::PermissionDenied,
        ErrorCode::FileNotFound,
        ErrorCode::OperationFailed,
    ];

    pub fn code(self) -> i32 {
        match self {
            ErrorCode::ParseError => -32700,
            ErrorCode::InvalidRequest => -32600,
            ErrorCode::MethodNotFound => -32601,
            ErrorCode::InvalidParams => -32602,
            ErrorCode::InternalError => -32603,
            ErrorCode::HostNotFound => -32001,
            ErrorCode::CredentialNotFound => -32002,
            ErrorCode::ConnectionFailed => -32003,
            ErrorCode::PermissionDenied => -32004,
            ErrorCode::FileNotFound => -32005,
            ErrorCode::OperationFailed => -32006,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }

    /// Best-effort classification of an error that arrived as bare text.
    ///
    /// Typed errors carry their code directly; this is only used for messages
    /// from collaborators that report nothing but a string.
    pub fn classify(message: &str) -> Self {
        let msg = message.to_ascii_lowercase();

        if msg.contains("method not found") || msg.contains("unknown method") {
            ErrorCode::MethodNotFound
        } else if msg.contains("credential") {
            ErrorCode::CredentialNotFound
        } else if msg.contains("host not found") || msg.contains("no such host") {
            ErrorCode::HostNotFound
        } else if msg.contains("permission denied")
            || msg.contains("access denied")
            || msg.contains("eacces")
            || msg.contains("eperm")
        {
            ErrorCode::PermissionDenied
        } else if msg.contains("not found")
            || msg.contains("no such file")
            || msg.contains("enoent")
        {
            ErrorCode::FileNotFound
        } else if msg.contains("connection")
            || msg.contains("timed out")
            || msg.contains("econnrefused")
            || msg.contains("ehostunreach")
        {
            ErrorCode::ConnectionFailed
        } else if msg.contains("internal") {
            ErrorCode::InternalError
        } else {
            ErrorCode::OperationFailed
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(Error, Debug)]
pub enum RpcError {
    #[error("Request '{method}' timed out after {timeout:?}")]
    Timeout { method: String, timeout: Duration },

    #[error("Request cancelled: {0}")]
    Cancelled(String),

    #[error("Channel closed")]
    ChannelClosed,

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Internal error: {0}")]
    Internal(String),

    /// A failure with a code assigned at its source.
    #[error("{message}")]
    Failed { code: ErrorCode, message: String },

    /// An error response received from the other side of the channel.
    #[error("{message} (code {code})")]
    Remote {
        code: i32,
        message: String,
        data: Option<Value>,
    },
}

impl RpcError {
    pub fn failed(code: ErrorCode, message: impl Into<String>) -> Self {
        RpcError::Failed {
            code,
            message: message.into(),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            RpcError::Timeout { .. } | RpcError::ChannelClosed => {
                ErrorCode::ConnectionFailed.code()
            }
            RpcError::Cancelled(_) | RpcError::Internal(_) => ErrorCode::InternalError.code(),
            RpcError::Parse(_) => ErrorCode::ParseError.code(),
            RpcError::InvalidRequest(_) => ErrorCode::InvalidRequest.code(),
            RpcError::MethodNotFound(_) => ErrorCode::MethodNotFound.code(),
            RpcError::InvalidParams(_) => ErrorCode::InvalidParams.code(),
            RpcError::Failed { code, .. } => code.code(),
            RpcError::Remote { code, .. } => *code,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, RpcError::Timeout { .. })
    }

    /// Whether the UI should offer a retry (connectivity, not logic, failure).
    pub fn is_retryable(&self) -> bool {
        self.code() == ErrorCode::ConnectionFailed.code()
    }

    pub fn to_body(&self) -> RpcErrorBody {
        let data = match self {
            RpcError::Timeout { timeout, .. } => Some(json!({
                "timeout": true,
                "timeoutMs": timeout.as_millis() as u64,
            })),
            RpcError::Remote { data, .. } => data.clone(),
            _ => None,
        };

        let message = match self {
            // Relayed as received so the code is not appended once per hop.
            RpcError::Remote { message, .. } => message.clone(),
            other => other.to_string(),
        };

        RpcErrorBody {
            code: self.code(),
            message,
            data,
        }
    }

    pub fn from_body(body: RpcErrorBody) -> Self {
        RpcError::Remote {
            code: body.code,
            message: body.message,
            data: body.data,
        }
    }
}

pub type RpcResult<T> = Result<T, RpcError>;
