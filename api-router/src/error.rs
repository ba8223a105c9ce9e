use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::{
    error::{AppError, ErrorKind, GenerationError},
    storage::content_store::StorageError,
    utils::ingest_limits::IngestValidationError,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Serialize, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Internal server error")]
    InternalError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Pipeline invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Bad gateway: {0}")]
    BadGateway(String),

    #[error("Gateway timeout: {0}")]
    GatewayTimeout(String),
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        let detail = err.public_detail();
        match (&err, err.kind()) {
            (AppError::Storage(StorageError::TooLarge(_)), _) => Self::PayloadTooLarge(detail),
            (AppError::Generation(GenerationError::Timeout { .. }), _) => {
                Self::GatewayTimeout(detail)
            }
            (
                AppError::Generation(
                    GenerationError::UpstreamStatus { .. } | GenerationError::Malformed { .. },
                ),
                _,
            ) => Self::BadGateway(detail),
            (_, ErrorKind::BackendUnavailable) => Self::ServiceUnavailable(detail),
            (_, ErrorKind::InputValidation | ErrorKind::ExtractionFailure) => {
                Self::ValidationError(detail)
            }
            (_, ErrorKind::PipelineInvariantViolation) => {
                tracing::error!(error = %err, "ingestion invariant violated");
                Self::InvariantViolation(detail)
            }
            (_, ErrorKind::Internal) => {
                tracing::error!("Internal error: {:?}", err);
                Self::InternalError(detail)
            }
        }
    }
}

impl From<IngestValidationError> for ApiError {
    fn from(err: IngestValidationError) -> Self {
        match err {
            IngestValidationError::BadRequest(message) => Self::ValidationError(message),
        }
    }
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, ErrorKind) {
        match self {
            Self::InternalError(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::Internal),
            Self::ValidationError(_) => (StatusCode::BAD_REQUEST, ErrorKind::InputValidation),
            Self::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, ErrorKind::InputValidation),
            Self::InvariantViolation(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorKind::PipelineInvariantViolation,
            ),
            Self::ServiceUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, ErrorKind::BackendUnavailable)
            }
            Self::BadGateway(_) => (StatusCode::BAD_GATEWAY, ErrorKind::BackendUnavailable),
            Self::GatewayTimeout(_) => (StatusCode::GATEWAY_TIMEOUT, ErrorKind::BackendUnavailable),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = match self {
            Self::InternalError(message)
            | Self::ValidationError(message)
            | Self::PayloadTooLarge(message)
            | Self::InvariantViolation(message)
            | Self::ServiceUnavailable(message)
            | Self::BadGateway(message)
            | Self::GatewayTimeout(message) => message,
        };

        (
            status,
            Json(ErrorResponse {
                error: message,
                status: "error".to_string(),
                code,
            }),
        )
            .into_response()
    }
}

#[derive(Serialize, Debug)]
struct ErrorResponse {
    error: String,
    status: String,
    code: ErrorKind,
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::error::ExtractionError;
    use std::fmt::Debug;

    fn assert_status_code<T: IntoResponse + Debug>(response: T, expected_status: StatusCode) {
        let response = response.into_response();
        assert_eq!(response.status(), expected_status);
    }

    #[test]
    fn test_app_error_to_api_error_conversion() {
        let validation = AppError::Validation("Message must not be empty".to_string());
        assert_eq!(
            ApiError::from(validation),
            ApiError::ValidationError("Message must not be empty".into())
        );

        let pdf = AppError::from(ExtractionError::UnparsablePdf);
        assert_eq!(
            ApiError::from(pdf),
            ApiError::ValidationError("Unable to parse PDF content".into())
        );

        let too_large = AppError::from(StorageError::TooLarge(10));
        assert_eq!(
            ApiError::from(too_large),
            ApiError::PayloadTooLarge("Uploaded file exceeds size limit (10 bytes)".into())
        );

        let zero_chunks = AppError::InvariantViolation("Chunking produced zero chunks".into());
        assert!(matches!(
            ApiError::from(zero_chunks),
            ApiError::InvariantViolation(_)
        ));

        let internal_error = AppError::Io(std::io::Error::other("io error"));
        assert_eq!(
            ApiError::from(internal_error),
            ApiError::InternalError("Internal server error".into())
        );
    }

    #[test]
    fn test_backend_failures_map_to_gateway_statuses() {
        let cases = [
            (
                AppError::IndexUnavailable("refused".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                AppError::from(GenerationError::Unreachable { backend: "Ollama" }),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                AppError::from(GenerationError::UpstreamStatus {
                    backend: "Ollama",
                    status: 500,
                }),
                StatusCode::BAD_GATEWAY,
            ),
            (
                AppError::from(GenerationError::Malformed { backend: "Ollama" }),
                StatusCode::BAD_GATEWAY,
            ),
            (
                AppError::from(GenerationError::Timeout { backend: "Ollama" }),
                StatusCode::GATEWAY_TIMEOUT,
            ),
        ];

        for (err, status) in cases {
            assert_status_code(ApiError::from(err), status);
        }
    }

    #[test]
    fn test_index_detail_is_generic() {
        let api_error = ApiError::from(AppError::IndexUnavailable("socket closed".into()));
        assert_eq!(
            api_error,
            ApiError::ServiceUnavailable("Vector store is unavailable".into())
        );
    }

    #[test]
    fn test_internal_error_sanitization() {
        let api_error = ApiError::InternalError("db password incorrect".to_string());
        assert_eq!(api_error.to_string(), "Internal server error");
        assert_status_code(api_error, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let response = ApiError::ValidationError("No files provided".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let value: serde_json::Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(
            value,
            serde_json::json!({
                "error": "No files provided",
                "status": "error",
                "code": "input_validation"
            })
        );
    }
}
