/// Error types for blog-service
///
/// Every failure surfaced by a service is an `AppError`; actix turns it into a
/// JSON body of the form `{"error": ..., "code": ..., "status": ...}`.
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use thiserror::Error;

use crate::db::StoreError;

/// Result type for blog-service operations
pub type Result<T> = std::result::Result<T, AppError>;

/// Validation codes reported in the `code` field of a 400 response.
pub mod codes {
    pub const SELF_FOLLOW: &str = "self-follow";
    pub const DUPLICATE_FOLLOW: &str = "duplicate-follow";
    pub const REQUIRED: &str = "required";
    pub const BLANK: &str = "blank";
    pub const INVALID: &str = "invalid";
}

/// Application error types
#[derive(Error, Debug, Clone)]
pub enum AppError {
    /// No identity, or a credential that failed verification
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated caller is not the owner of the resource
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Unknown id, or an id outside the caller's or the path's scope
    #[error("Not found: {0}")]
    NotFound(String),

    /// A field or relationship rule was violated
    #[error("{message}")]
    ValidationError { code: &'static str, message: String },

    /// Storage failed
    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(code: &'static str, message: impl Into<String>) -> Self {
        AppError::ValidationError {
            code,
            message: message.into(),
        }
    }

    pub fn self_follow() -> Self {
        Self::validation(codes::SELF_FOLLOW, "You cannot follow yourself")
    }

    pub fn duplicate_follow() -> Self {
        Self::validation(
            codes::DUPLICATE_FOLLOW,
            "You are already following this user",
        )
    }

    /// Validation code, if this is a validation failure.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            AppError::ValidationError { code, .. } => Some(code),
            _ => None,
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ValidationError { .. } => StatusCode::BAD_REQUEST,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        // Storage details stay in the logs.
        let error_msg = match self {
            AppError::Database(_) | AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        let mut body = serde_json::json!({
            "error": error_msg,
            "status": status.as_u16(),
        });
        if let Some(code) = self.code() {
            body["code"] = serde_json::Value::from(code);
        }

        HttpResponse::build(status).json(body)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::MissingReference(what) => {
                AppError::NotFound(format!("{} does not exist", what))
            }
            other => {
                tracing::error!(error = %other, "store operation failed");
                AppError::Database(other.to_string())
            }
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        match fields.first().and_then(|(field, errs)| errs.first().map(|e| (field, e))) {
            Some((field, err)) => {
                let code = if err.code == codes::BLANK {
                    codes::BLANK
                } else {
                    codes::INVALID
                };
                let message = err
                    .message
                    .as_ref()
                    .map(|m| format!("{}: {}", field, m))
                    .unwrap_or_else(|| format!("{}: invalid value", field));
                AppError::validation(code, message)
            }
            None => AppError::validation(codes::INVALID, "Invalid request body"),
        }
    }
}
