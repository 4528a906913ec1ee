use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use stash_storage::StorageError;
use std::borrow::Cow;
use tracing::error;

/// Failures surfaced by request handlers.
#[stash_derive::stash_error]
pub enum ApiError {
    #[error("Storage error{}: {source}", format_context(.context))]
    Storage { source: StorageError, context: Option<Cow<'static, str>> },
}

impl ApiError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Storage { source: StorageError::TooLarge { .. }, .. } => {
                StatusCode::PAYLOAD_TOO_LARGE
            },
            Self::Storage { source: StorageError::InvalidIdentifier { .. }, .. } => {
                StatusCode::BAD_REQUEST
            },
            Self::Storage { source: StorageError::Io { .. }, .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Storage { source: StorageError::TooLarge { limit, .. }, .. } => {
                format!("Payload Too Large: limit is {limit} bytes\n")
            },
            Self::Storage { source: source @ StorageError::InvalidIdentifier { .. }, .. } => {
                format!("{source}\n")
            },
            Self::Storage { .. } => {
                error!(error = %self, "Request failed");
                "Internal Server Error\n".to_owned()
            },
        };
        (status, body).into_response()
    }
}
