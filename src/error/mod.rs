//! Error types for the embedding service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Result type alias for service operations
pub type Result<T> = std::result::Result<T, EmbedderError>;

/// Main error type for the embedding service
#[derive(Error, Debug)]
pub enum EmbedderError {
    /// Client input was missing or malformed (400)
    #[error(transparent)]
    InvalidRequest(#[from] crate::middleware::ValidationError),

    /// Bearer token mismatch (401)
    #[error(transparent)]
    Unauthorized(#[from] crate::middleware::AuthError),

    /// The embedding delegate failed (500). The message is the delegate's own.
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors raised by an embedding delegate
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EmbeddingError {
    #[error("Unsupported embedding model: {0}")]
    UnsupportedModel(String),

    #[error("Failed to load model {model}: {reason}")]
    ModelLoad { model: String, reason: String },

    #[error("Invalid chunk at index {index}: {reason}")]
    InvalidChunk { index: usize, reason: String },

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Cleanup failed: {0}")]
    Cleanup(String),
}

/// Coarse classification used for status codes and metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidRequest,
    Unauthorized,
    Internal,
}

impl EmbedderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EmbedderError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            EmbedderError::Unauthorized(_) => ErrorKind::Unauthorized,
            EmbedderError::Embedding(_)
            | EmbedderError::Config(_)
            | EmbedderError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Generic error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for EmbedderError {
    fn into_response(self) -> Response {
        (
            self.status_code(),
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

impl From<config::ConfigError> for EmbedderError {
    fn from(err: config::ConfigError) -> Self {
        EmbedderError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{AuthError, ValidationError};

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            EmbedderError::from(ValidationError::MissingChunks).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            EmbedderError::from(AuthError::InvalidToken).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            EmbedderError::from(EmbeddingError::Inference("oom".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_delegate_message_is_passed_verbatim() {
        let inner = EmbeddingError::UnsupportedModel("nope".into());
        let err = EmbedderError::from(inner.clone());
        assert_eq!(err.to_string(), inner.to_string());
    }
}
