//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps domain errors from cgw-state, cgw-governance and cgw-core to HTTP
//! status codes with a JSON body. Internal details are never returned.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use cgw_governance::GovernanceError;
use cgw_state::StageError;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "CONFLICT").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request validation failed (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The session's stage does not allow the operation (409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        if matches!(&self, Self::Internal(_)) {
            tracing::error!(error = %self, "internal server error");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<cgw_core::ValidationError> for AppError {
    fn from(err: cgw_core::ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<StageError> for AppError {
    fn from(err: StageError) -> Self {
        match &err {
            StageError::Validation(_) | StageError::MissingApprover => {
                Self::Validation(err.to_string())
            }
            StageError::WrongStage { .. }
            | StageError::ConfigLocked { .. }
            | StageError::StaleScan { .. }
            | StageError::UnknownCheck(_)
            | StageError::NotPending(_)
            | StageError::AlreadySettled(_)
            | StageError::FailedChecks { .. } => Self::Conflict(err.to_string()),
        }
    }
}

impl From<GovernanceError> for AppError {
    fn from(err: GovernanceError) -> Self {
        match &err {
            GovernanceError::Validation(_) | GovernanceError::ReviewOutOfOrder { .. } => {
                Self::Validation(err.to_string())
            }
            GovernanceError::DuplicateApproval(_) => Self::Conflict(err.to_string()),
            GovernanceError::ApprovalIdsExhausted { .. }
            | GovernanceError::Canonicalization(_) => Self::Internal(err.to_string()),
        }
    }
}
