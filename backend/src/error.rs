//! Error handling for the ERP backend
//!
//! Every failure leaves the server as `{ "error": { code, message, field? } }`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::{PlanError, TransitionError, UnknownVariant, ValidationError};
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    // Validation errors
    #[error("Validation error: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Referenced record not found: {0}")]
    ReferenceNotFound(String),

    // Business logic errors
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Insufficient inventory: {0}")]
    InsufficientInventory(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize, Debug)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorDetail {
    fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            field: None,
        }
    }

    fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

/// Map a Postgres constraint error code onto a client error
fn constraint_violation(code: &str) -> Option<(StatusCode, &'static str, &'static str)> {
    match code {
        "23505" => Some((
            StatusCode::CONFLICT,
            "DUPLICATE_ENTRY",
            "A record with the same key already exists",
        )),
        "23503" => Some((
            StatusCode::UNPROCESSABLE_ENTITY,
            "REFERENCE_NOT_FOUND",
            "A referenced record does not exist",
        )),
        _ => None,
    }
}

impl AppError {
    /// Report a unique violation as a duplicate of `field`
    pub fn on_duplicate(self, field: &str) -> Self {
        let duplicate = matches!(
            &self,
            AppError::DatabaseError(sqlx::Error::Database(db_err))
                if db_err.code().as_deref() == Some("23505")
        );
        if duplicate {
            AppError::DuplicateEntry(field.to_string())
        } else {
            self
        }
    }

    /// Status code and body for this error
    pub fn to_response_parts(&self) -> (StatusCode, ErrorDetail) {
        match self {
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("INVALID_CREDENTIALS", "Invalid username or password"),
            ),
            AppError::Unauthorized(message) => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("UNAUTHORIZED", message.clone()),
            ),
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new("VALIDATION_ERROR", message.clone()).with_field(field.clone()),
            ),
            AppError::ValidationError(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new("VALIDATION_ERROR", msg.clone()),
            ),
            AppError::DuplicateEntry(field) => (
                StatusCode::CONFLICT,
                ErrorDetail::new(
                    "DUPLICATE_ENTRY",
                    format!("A record with this {} already exists", field),
                )
                .with_field(field.clone()),
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail::new("NOT_FOUND", format!("{} not found", resource)),
            ),
            AppError::ReferenceNotFound(resource) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail::new(
                    "REFERENCE_NOT_FOUND",
                    format!("Referenced {} does not exist", resource),
                ),
            ),
            AppError::InvalidStateTransition(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail::new("INVALID_STATE_TRANSITION", msg.clone()),
            ),
            AppError::InsufficientInventory(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail::new("INSUFFICIENT_INVENTORY", msg.clone()),
            ),
            AppError::DatabaseError(sqlx::Error::RowNotFound) => (
                StatusCode::NOT_FOUND,
                ErrorDetail::new("NOT_FOUND", "Record not found"),
            ),
            AppError::DatabaseError(sqlx::Error::Database(db_err)) => {
                match db_err.code().as_deref().and_then(constraint_violation) {
                    Some((status, code, message)) => (status, ErrorDetail::new(code, message)),
                    None => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ErrorDetail::new("DATABASE_ERROR", "A database error occurred"),
                    ),
                }
            }
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("DATABASE_ERROR", "A database error occurred"),
            ),
            AppError::Internal(_) | AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("INTERNAL_ERROR", "An internal server error occurred"),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = self.to_response_parts();

        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        } else {
            tracing::debug!(error = %self, code = %error_detail.code, "request rejected");
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation {
            field: err.field.to_string(),
            message: err.message.to_string(),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<&str> = errors.errors().keys().copied().collect();
        fields.sort_unstable();
        match fields.as_slice() {
            [field] => AppError::Validation {
                field: field.to_string(),
                message: "is invalid".to_string(),
            },
            _ => AppError::ValidationError(format!("invalid fields: {}", fields.join(", "))),
        }
    }
}

impl From<TransitionError> for AppError {
    fn from(err: TransitionError) -> Self {
        AppError::InvalidStateTransition(err.to_string())
    }
}

impl From<PlanError> for AppError {
    fn from(err: PlanError) -> Self {
        match err {
            PlanError::Transition(err) => err.into(),
            PlanError::MissingPaymentAccount => AppError::Validation {
                field: "payment_account_id".to_string(),
                message: PlanError::MissingPaymentAccount.to_string(),
            },
            mismatch @ PlanError::PaymentAccountMismatch { .. } => AppError::Validation {
                field: "payment_account_id".to_string(),
                message: mismatch.to_string(),
            },
        }
    }
}

/// A stored enum column holds a value this build does not know
impl From<UnknownVariant> for AppError {
    fn from(err: UnknownVariant) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
