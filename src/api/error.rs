use crate::rpc::RegistryError;
use crate::transfer::QueueError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Router setup failed: {0}")]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("Transfer not found: {0}")]
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Registry(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotFound(_) | ApiError::Queue(QueueError::JobNotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            ApiError::Queue(QueueError::InvalidJob(_)) => StatusCode::BAD_REQUEST,
            ApiError::Queue(_) => StatusCode::CONFLICT,
        };
        // Same numeric codes as the message channel.
        let code = match &self {
            ApiError::Registry(_) => crate::rpc::ErrorCode::InternalError.code(),
            ApiError::Queue(e) => e.code(),
            ApiError::NotFound(_) => crate::rpc::ErrorCode::HostNotFound.code(),
        };

        let body = Json(json!({
            "error": self.to_string(),
            "code": code,
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
