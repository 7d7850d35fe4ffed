// crates/backend-lib/src/error.rs

//! Central error type + Axum integration.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sample_app_common::{ErrorBody, ErrorDetail};
use thiserror::Error;

use crate::config::ConfigError;
use crate::storage::StorageError;
use crate::validation::{ValidationErrors, MSG_TAKEN};

/// Application error types with error codes and context
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Invalid email/password combination")]
    InvalidCredentials,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Auth(_) | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Auth(_) => "AUTH_001",
            AppError::InvalidCredentials => "AUTH_002",
            AppError::Forbidden(_) => "AUTH_003",
            AppError::Validation(_) => "VAL_001",
            AppError::NotFound(_) => "NF_001",
            AppError::Internal(_) => "INT_001",
            AppError::Config(_) => "CFG_001",
            AppError::Io(_) => "IO_001",
            AppError::Json(_) => "JSON_001",
        }
    }

    /// Get a sanitized message suitable for production use
    pub fn sanitized_message(&self) -> String {
        match self {
            AppError::Auth(_) => "Authentication required".to_string(),
            AppError::InvalidCredentials => "Invalid email/password combination".to_string(),
            AppError::Forbidden(_) => "Not allowed".to_string(),
            AppError::Validation(_) => "Validation failed".to_string(),
            AppError::NotFound(_) => "Resource not found".to_string(),
            AppError::Internal(_) | AppError::Config(_) => {
                "An internal server error occurred".to_string()
            },
            AppError::Io(_) => "Internal server error".to_string(),
            AppError::Json(_) => "Invalid request format".to_string(),
        }
    }

    /// Field errors, when this is a validation failure
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            AppError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(errors)
    }
}

/// Storage failures surface as application errors; a unique-index hit becomes a
/// validation error on `email` rather than a raw storage error.
impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::DuplicateEmail(_) => {
                let mut errors = ValidationErrors::new();
                errors.add("email", MSG_TAKEN);
                AppError::Validation(errors)
            },
            StorageError::NotFound(id) => AppError::NotFound(format!("user {id}")),
            StorageError::Io(e) => AppError::Io(e),
            StorageError::Json(e) => AppError::Json(e),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code().to_string();

        // Use detailed messages in development, sanitized in production
        let message = if cfg!(debug_assertions) {
            self.to_string()
        } else {
            self.sanitized_message()
        };

        if status.is_server_error() {
            tracing::error!(error = %self, code = %code, "request failed");
        }

        let fields = match self {
            AppError::Validation(errors) => errors.into_errors(),
            _ => Vec::new(),
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code,
                message,
                fields,
            },
        };

        (status, axum::Json(body)).into_response()
    }
}
