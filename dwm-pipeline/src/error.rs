//! Error types for dwm-pipeline
//!
//! Input validation errors are raised before any network call. Transport and
//! backend errors come from the collaborators. `WorkflowError` is what the
//! state machine records and returns; `ApiError` maps it onto HTTP.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use dwm_common::events::WorkflowState;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// Synchronous input validation failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("File too large: {size_bytes} bytes exceeds the {max_size_bytes} byte limit")]
    FileTooLarge { size_bytes: u64, max_size_bytes: u64 },

    #[error("File name has no extension: {file_name}")]
    MissingExtension { file_name: String },

    #[error("Unsupported file type '.{extension}' (allowed: {allowed})")]
    UnsupportedType { extension: String, allowed: String },

    #[error("A policy must be selected before embedding")]
    MissingPolicy,

    #[error("Watermark text must not be empty")]
    MissingWatermarkText,
}

/// File transport failures
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Transport rejected upload ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Invalid transport response: {0}")]
    InvalidResponse(String),
}

/// Job backend and policy store failures
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid backend response: {0}")]
    InvalidResponse(String),
}

/// Errors surfaced by the workflow state machine
#[derive(Debug, Clone, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Submission failed: {0}")]
    SubmissionFailed(String),

    #[error("Could not load policies: {0}")]
    PolicyStore(String),

    #[error("Cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: WorkflowState,
    },

    /// The operation finished after a reset or a new selection and was discarded
    #[error("Operation superseded by a newer selection or reset")]
    Superseded,
}

impl WorkflowError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            WorkflowError::Validation(ValidationError::FileTooLarge { .. }) => "FILE_TOO_LARGE",
            WorkflowError::Validation(ValidationError::MissingExtension { .. }) => {
                "MISSING_EXTENSION"
            }
            WorkflowError::Validation(ValidationError::UnsupportedType { .. }) => {
                "UNSUPPORTED_TYPE"
            }
            WorkflowError::Validation(ValidationError::MissingPolicy) => "MISSING_POLICY",
            WorkflowError::Validation(ValidationError::MissingWatermarkText) => {
                "MISSING_WATERMARK_TEXT"
            }
            WorkflowError::UploadFailed(_) => "UPLOAD_FAILED",
            WorkflowError::SubmissionFailed(_) => "SUBMISSION_FAILED",
            WorkflowError::PolicyStore(_) => "POLICY_STORE_ERROR",
            WorkflowError::InvalidState { .. } => "INVALID_STATE",
            WorkflowError::Superseded => "SUPERSEDED",
        }
    }

    pub fn summary(&self) -> ErrorSummary {
        ErrorSummary {
            code: self.code().to_string(),
            message: self.to_string(),
        }
    }
}

impl From<TransportError> for WorkflowError {
    fn from(err: TransportError) -> Self {
        WorkflowError::UploadFailed(err.to_string())
    }
}

/// Error as exposed in workflow snapshots
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorSummary {
    pub code: String,
    pub message: String,
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Workflow error carried with its own code
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Workflow(ref err) => {
                let status = match err {
                    WorkflowError::Validation(_) => StatusCode::BAD_REQUEST,
                    WorkflowError::InvalidState { .. } | WorkflowError::Superseded => {
                        StatusCode::CONFLICT
                    }
                    WorkflowError::UploadFailed(_)
                    | WorkflowError::SubmissionFailed(_)
                    | WorkflowError::PolicyStore(_) => StatusCode::BAD_GATEWAY,
                };
                (status, err.code(), err.to_string())
            }
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_codes() {
        let err: WorkflowError = ValidationError::MissingExtension {
            file_name: "report".to_string(),
        }
        .into();
        assert_eq!(err.code(), "MISSING_EXTENSION");
        assert!(err.to_string().contains("report"));
    }

    #[test]
    fn test_transport_error_becomes_upload_failed() {
        let err: WorkflowError = TransportError::Network("connection reset".to_string()).into();
        assert!(matches!(err, WorkflowError::UploadFailed(_)));
        assert_eq!(err.summary().code, "UPLOAD_FAILED");
    }

    #[test]
    fn test_api_status_mapping() {
        let response = ApiError::from(WorkflowError::Validation(ValidationError::MissingPolicy))
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = ApiError::from(WorkflowError::InvalidState {
            action: "upload",
            state: WorkflowState::Idle,
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response =
            ApiError::from(WorkflowError::UploadFailed("boom".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
