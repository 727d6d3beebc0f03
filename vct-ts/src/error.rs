//! Error types for vct-ts
//!
//! One variant per failure kind of a transcription request. Client errors
//! carry a fixed message; stage failures carry a stage-tagged message with
//! the underlying tool diagnostics.

use axum::http::StatusCode;
use thiserror::Error;

/// Failure of a single transcription request
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Non-POST request (405)
    #[error("only POST is supported")]
    MethodNotAllowed,

    /// Unparseable form or missing `audio` field (400)
    #[error("{0}")]
    RequestMalformed(String),

    /// Working directory or upload write failed (500)
    #[error("storage failure: {0}")]
    Storage(String),

    /// Audio converter failed (500)
    #[error("audio conversion failed: {0}")]
    Conversion(String),

    /// Speech recognizer failed (500)
    #[error("transcription failed: {0}")]
    Transcription(String),

    /// Conversion table could not be initialized (500)
    #[error("script normalization failed: {0}")]
    Normalization(String),

    /// Remote classification failed (500)
    #[error("classification failed: {0}")]
    Classification(String),
}

impl ServiceError {
    /// HTTP status for this failure
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ServiceError::RequestMalformed(_) => StatusCode::BAD_REQUEST,
            ServiceError::Storage(_)
            | ServiceError::Conversion(_)
            | ServiceError::Transcription(_)
            | ServiceError::Normalization(_)
            | ServiceError::Classification(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::MethodNotAllowed | ServiceError::RequestMalformed(_) => {
                "request_malformed"
            }
            ServiceError::Storage(_) => "storage",
            ServiceError::Conversion(_) => "conversion",
            ServiceError::Transcription(_) => "transcription",
            ServiceError::Normalization(_) => "normalization",
            ServiceError::Classification(_) => "classification",
        }
    }
}

/// Result type for a transcription request
pub type ServiceResult<T> = Result<T, ServiceError>;
