use async_openai::error::OpenAIError;
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinError;

use crate::storage::content_store::StorageError;

/// Failures while turning a stored file into text.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Unsupported file extension '{0}'. Allowed: .md, .pdf, .txt")]
    UnsupportedType(String),
    #[error("Unable to parse PDF content")]
    UnparsablePdf,
    #[error("Failed to read stored file: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure categories of a remote text-generation call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("{backend} request timed out")]
    Timeout { backend: &'static str },
    #[error("Failed to reach {backend} service")]
    Unreachable { backend: &'static str },
    #[error("{backend} returned HTTP {status}")]
    UpstreamStatus { backend: &'static str, status: u16 },
    #[error("Invalid response from {backend} service")]
    Malformed { backend: &'static str },
}

/// Machine-distinguishable failure classes exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InputValidation,
    ExtractionFailure,
    PipelineInvariantViolation,
    BackendUnavailable,
    Internal,
}

// Core internal errors
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] surrealdb::Error),
    #[error("OpenAI error: {0}")]
    OpenAI(#[from] OpenAIError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("Vector store is unavailable: {0}")]
    IndexUnavailable(String),
    #[error("{0}")]
    Validation(String),
    #[error("No extractable text found in the uploaded file")]
    NoExtractableText,
    #[error("{0}")]
    InvariantViolation(String),
    #[error("Task join error: {0}")]
    Join(#[from] JoinError),
    #[error("IoError: {0}")]
    Io(#[from] std::io::Error),
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
    #[error("Internal service error: {0}")]
    InternalError(String),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::NoExtractableText => ErrorKind::InputValidation,
            Self::Storage(err) if err.is_input_error() => ErrorKind::InputValidation,
            Self::Extraction(ExtractionError::Io(_)) | Self::Storage(_) => ErrorKind::Internal,
            Self::Extraction(_) => ErrorKind::ExtractionFailure,
            Self::InvariantViolation(_) => ErrorKind::PipelineInvariantViolation,
            Self::Generation(_) | Self::IndexUnavailable(_) => ErrorKind::BackendUnavailable,
            Self::Database(_)
            | Self::OpenAI(_)
            | Self::Join(_)
            | Self::Io(_)
            | Self::Anyhow(_)
            | Self::InternalError(_) => ErrorKind::Internal,
        }
    }

    /// Human-readable detail that is safe to hand back to a caller.
    pub fn public_detail(&self) -> String {
        match self {
            Self::IndexUnavailable(_) => "Vector store is unavailable".to_string(),
            other if other.kind() == ErrorKind::Internal => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}
