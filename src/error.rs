/// Unified error types for Bloodlink
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Main error type for the server
#[derive(Error, Debug)]
pub enum AppError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration errors
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Malformed or missing input
    #[error("{message}")]
    Validation {
        message: String,
        errors: Vec<FieldError>,
    },

    /// Missing or unusable credentials
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Wrong email/password or inactive account
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Bad signature, malformed or expired bearer token
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Authenticated but not allowed to touch the resource
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Email already registered
    #[error("Email is already registered")]
    DuplicateEmail,

    /// Other uniqueness or state conflicts
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid blood type: {0}")]
    InvalidBloodType(String),

    #[error("Invalid date range: {0}")]
    InvalidDateRange(String),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Cannot change status from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Event has reached maximum capacity")]
    EventFull,

    #[error("Already registered for this event")]
    AlreadyRegistered,

    #[error("Not registered for this event")]
    NotRegistered,

    #[error("Registration closed: {0}")]
    RegistrationClosed(String),

    /// Rate limiting errors
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Validation failure without field details
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            errors: Vec::new(),
        }
    }

    /// Validation failure for a single field
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        AppError::Validation {
            message: message.clone(),
            errors: vec![FieldError::new(field, message)],
        }
    }

    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation { .. }
            | AppError::InvalidBloodType(_)
            | AppError::InvalidDateRange(_)
            | AppError::InvalidStatus(_)
            | AppError::InvalidTransition { .. }
            | AppError::RegistrationClosed(_)
            | AppError::EventFull
            | AppError::AlreadyRegistered
            | AppError::NotRegistered => StatusCode::BAD_REQUEST,
            AppError::Authentication(_) | AppError::InvalidCredentials | AppError::InvalidToken(_) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DuplicateEmail | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            AppError::Database(_)
            | AppError::Migration(_)
            | AppError::Internal(_)
            | AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Map a unique-index violation onto a domain error, pass everything else through
    pub fn on_unique_violation(err: sqlx::Error, conflict: AppError) -> AppError {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => conflict,
            _ => AppError::Database(err),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                let field = field.to_string();
                errs.iter().map(move |e| {
                    let message = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{} is invalid ({})", field, e.code));
                    FieldError::new(field.clone(), message)
                })
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field));

        AppError::Validation {
            message: "Validation failed".to_string(),
            errors: fields,
        }
    }
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

/// Detail of a redacted internal error, attached to the response for the
/// development-mode middleware
#[derive(Debug, Clone)]
pub struct InternalErrorDetail(pub String);

/// Convert AppError to HTTP response
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed with internal error");
            let body = Json(ErrorBody {
                success: false,
                message: "Internal server error".to_string(), // Don't leak details
                errors: None,
            });
            let mut response = (status, body).into_response();
            response
                .extensions_mut()
                .insert(InternalErrorDetail(self.to_string()));
            return response;
        }

        let (message, errors) = match self {
            AppError::Validation { message, errors } => {
                let errors = if errors.is_empty() { None } else { Some(errors) };
                (message, errors)
            }
            other => (other.to_string(), None),
        };

        (
            status,
            Json(ErrorBody {
                success: false,
                message,
                errors,
            }),
        )
            .into_response()
    }
}

/// Result type alias for Bloodlink operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Probe {
        #[validate(length(min = 5, message = "Subject must be at least 5 characters"))]
        subject: String,
        #[validate(email)]
        email: String,
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::EventFull.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::InvalidCredentials.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::Authorization("nope".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(AppError::DuplicateEmail.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::Internal("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_validator_errors_become_field_list() {
        let probe = Probe {
            subject: "abc".into(),
            email: "not-an-email".into(),
        };
        let err: AppError = probe.validate().unwrap_err().into();

        match err {
            AppError::Validation { errors, .. } => {
                let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, vec!["email", "subject"]);
                assert_eq!(errors[1].message, "Subject must be at least 5 characters");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_internal_error_is_redacted() {
        let response = AppError::Internal("db password is hunter2".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let detail = response.extensions().get::<InternalErrorDetail>().cloned();
        assert!(detail.unwrap().0.contains("hunter2"));
    }
}
