use std::io;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::api::error_response;

/// Failures reported by the host library behind the capability traits.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("{kind} with ID {id} not found")]
    NotFound { kind: &'static str, id: i64 },
    #[error("unsupported search operator: {0}")]
    UnsupportedOperator(String),
    #[error("{0}")]
    Backend(String),
}

impl HostError {
    pub fn collection_not_found(id: i64) -> Self {
        HostError::NotFound {
            kind: "Collection",
            id,
        }
    }

    pub fn item_not_found(id: i64) -> Self {
        HostError::NotFound { kind: "Item", id }
    }
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("file exceeds the maximum upload size of {limit} bytes")]
    TooLarge { limit: u64 },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Everything a handler can fail with. Rendered as `{"error": "..."}`.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("file exceeds the maximum upload size of {0} bytes")]
    TooLarge(u64),
    #[error(transparent)]
    Host(HostError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl HandlerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        HandlerError::Validation(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        use HandlerError::*;
        match self {
            Validation(_) => StatusCode::BAD_REQUEST,
            // Lookup misses share the server-error class with other host failures.
            NotFound(_) => StatusCode::INTERNAL_SERVER_ERROR,
            TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Host(_) | Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<HostError> for HandlerError {
    fn from(error: HostError) -> Self {
        match error {
            e @ HostError::NotFound { .. } => HandlerError::NotFound(e.to_string()),
            e => HandlerError::Host(e),
        }
    }
}

impl From<UploadError> for HandlerError {
    fn from(error: UploadError) -> Self {
        match error {
            UploadError::TooLarge { limit } => HandlerError::TooLarge(limit),
            UploadError::Io(e) => HandlerError::Io(e),
        }
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = crate::unpack_error(&self);
        if status.is_server_error() {
            tracing::error!(error = %message, "request failed");
        } else {
            tracing::info!(status = status.as_u16(), error = %message, "request rejected");
        }
        error_response(status, &message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_keeps_message_and_server_status() {
        let err: HandlerError = HostError::collection_not_found(99).into();
        assert_eq!(err.to_string(), "Collection with ID 99 not found");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn upload_limit_maps_to_payload_too_large() {
        let err: HandlerError = UploadError::TooLarge { limit: 10 }.into();
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            err.to_string(),
            "file exceeds the maximum upload size of 10 bytes"
        );
    }

    #[test]
    fn validation_is_bad_request() {
        let err = HandlerError::validation("itemID must be a number");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
