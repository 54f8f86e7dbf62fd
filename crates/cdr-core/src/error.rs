//! Application error type and its HTTP rendering

use crate::validation::ValidationError;
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

/// Error type shared by every crate in the workspace
///
/// Handlers return it directly; [`ResponseError`] turns it into a JSON body
/// of the form `{"error": code, "message": text, "status": n}`.
#[derive(Error, Debug)]
pub enum AppError {
    // storage
    #[error("Database error: {0}")]
    Database(String),

    #[error("Could not connect to database: {0}")]
    Pool(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    // callers
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Forbidden: admin role required")]
    Forbidden,

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    // call records and users
    #[error("Call record not found: {0}")]
    RecordNotFound(String),

    #[error("Invalid call record: {0}")]
    InvalidRecord(ValidationError),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    // request shape
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Payload too large: limit is {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("Not found: {0}")]
    NotFound(String),

    // everything else is a 500
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AppError {
    /// HTTP status this error is reported with
    pub fn status_code(&self) -> StatusCode {
        use AppError::*;

        match self {
            Validation(_) | InvalidInput(_) | MissingField(_) | InvalidRecord(_)
            | PayloadTooLarge { .. } => StatusCode::BAD_REQUEST,
            InvalidCredentials | InvalidToken(_) | TokenExpired => StatusCode::UNAUTHORIZED,
            Forbidden => StatusCode::FORBIDDEN,
            RecordNotFound(_) | UserNotFound(_) | NotFound(_) => StatusCode::NOT_FOUND,
            AlreadyExists(_) => StatusCode::CONFLICT,
            Database(_) | Pool(_) | Migration(_) | PasswordHash(_) | Internal(_) | Config(_)
            | Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for the `error` field
    pub fn error_code(&self) -> &'static str {
        use AppError::*;

        match self {
            Database(_) => "database_error",
            Pool(_) => "pool_error",
            Migration(_) => "migration_error",
            InvalidCredentials => "invalid_credentials",
            TokenExpired => "token_expired",
            InvalidToken(_) => "invalid_token",
            Forbidden => "forbidden",
            PasswordHash(_) => "password_error",
            RecordNotFound(_) => "record_not_found",
            InvalidRecord(_) => "invalid_record",
            UserNotFound(_) => "user_not_found",
            AlreadyExists(_) => "already_exists",
            Validation(_) => "validation_error",
            InvalidInput(_) => "invalid_input",
            MissingField(_) => "missing_field",
            PayloadTooLarge { .. } => "payload_too_large",
            NotFound(_) => "not_found",
            Internal(_) => "internal_error",
            Config(_) => "config_error",
            Serialization(_) => "serialization_error",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        AppError::status_code(self)
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let mut body = json!({
            "error": self.error_code(),
            "message": self.to_string(),
            "status": status.as_u16(),
        });

        if let AppError::InvalidRecord(validation) = self {
            body["fields"] = json!(validation.by_field());
        }

        HttpResponse::build(status).json(body)
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::InvalidRecord(err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::Migration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::{FieldError, CALLING_NUMBER, DURATION};
    use actix_web::body::MessageBody;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            AppError::InvalidCredentials.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::RecordNotFound("42".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::AlreadyExists("A1".to_string()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::PayloadTooLarge { limit: 1024 }.status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            AppError::InvalidCredentials.error_code(),
            "invalid_credentials"
        );
        assert_eq!(AppError::Forbidden.error_code(), "forbidden");
    }

    #[test]
    fn test_invalid_record_lists_fields() {
        let err = AppError::from(ValidationError::new(vec![
            FieldError::format(CALLING_NUMBER, "bad number"),
            FieldError::inconsistent(DURATION, "off by one"),
        ]));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let response = err.error_response();
        let bytes = response.into_body().try_into_bytes().unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(body["error"], "invalid_record");
        assert_eq!(body["status"], 400);
        assert_eq!(body["fields"][CALLING_NUMBER][0], "bad number");
        assert_eq!(body["fields"][DURATION][0], "off by one");
    }
}
