/// Error types for geo-post-service
///
/// Every failure a handler can return is an [`AppError`]. Client errors carry
/// a descriptive message; server errors are logged in full and answered with a
/// generic message.
use crate::models::{DistanceError, LocationError};
use crate::services::{CredentialError, IndexError, IngestionError};
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use error_types::{error_codes, error_types as kinds, ErrorResponse};
use std::fmt;

/// Result type for geo-post-service operations
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Debug)]
pub enum AppError {
    /// Signup input failed validation
    InvalidSignup(String),

    /// Username already registered
    Conflict(String),

    /// Login failed; identical for unknown users and wrong passwords
    InvalidCredentials,

    /// Post has no image attached
    MissingImage,

    /// Image exceeds the configured upload limit
    UploadTooLarge(usize),

    /// Missing, malformed or out-of-range coordinates
    InvalidLocation(String),

    /// Unparsable or non-positive search radius
    InvalidRange(String),

    /// Undecodable request body
    BadRequest(String),

    /// Blob store failure
    Storage(String),

    /// Search index failure
    Index(String),

    /// Internal server error
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::InvalidSignup(msg) => write!(f, "Invalid username or password: {}", msg),
            AppError::Conflict(msg) => write!(f, "User already exists: {}", msg),
            AppError::InvalidCredentials => write!(f, "Wrong username or password"),
            AppError::MissingImage => write!(f, "Image is not available"),
            AppError::UploadTooLarge(limit) => {
                write!(f, "Image exceeds the {} byte upload limit", limit)
            }
            AppError::InvalidLocation(msg) => write!(f, "Invalid location: {}", msg),
            AppError::InvalidRange(msg) => write!(f, "Invalid range: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::Index(msg) => write!(f, "Index error: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl AppError {
    fn kind_and_code(&self) -> (&'static str, &'static str) {
        match self {
            AppError::InvalidSignup(_) => (
                kinds::VALIDATION_ERROR,
                error_codes::INVALID_USERNAME_OR_PASSWORD,
            ),
            AppError::Conflict(_) => (kinds::CONFLICT_ERROR, error_codes::USER_ALREADY_EXISTS),
            AppError::InvalidCredentials => (
                kinds::AUTHENTICATION_ERROR,
                error_codes::INVALID_CREDENTIALS,
            ),
            AppError::MissingImage => (kinds::VALIDATION_ERROR, error_codes::IMAGE_MISSING),
            AppError::UploadTooLarge(_) => (kinds::VALIDATION_ERROR, error_codes::UPLOAD_TOO_LARGE),
            AppError::InvalidLocation(_) => (kinds::VALIDATION_ERROR, error_codes::INVALID_LOCATION),
            AppError::InvalidRange(_) => (kinds::VALIDATION_ERROR, error_codes::INVALID_RANGE),
            AppError::BadRequest(_) => (kinds::VALIDATION_ERROR, error_codes::INVALID_REQUEST),
            AppError::Storage(_) => (kinds::SERVER_ERROR, error_codes::MEDIA_STORAGE_ERROR),
            AppError::Index(_) => (kinds::SERVER_ERROR, error_codes::SEARCH_INDEX_ERROR),
            AppError::Internal(_) => (kinds::SERVER_ERROR, error_codes::INTERNAL_SERVER_ERROR),
        }
    }

    /// Message sent to the client
    fn public_message(&self) -> String {
        match self {
            AppError::Storage(_) => "Failed to save image to blob storage".to_string(),
            AppError::Index(_) => "Search index is unavailable".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidSignup(_)
            | AppError::Conflict(_)
            | AppError::MissingImage
            | AppError::UploadTooLarge(_)
            | AppError::InvalidLocation(_)
            | AppError::InvalidRange(_)
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Storage(_) | AppError::Index(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let (error_type, code) = self.kind_and_code();
        let response = ErrorResponse::new(
            match status {
                StatusCode::BAD_REQUEST => "Bad Request",
                StatusCode::UNAUTHORIZED => "Unauthorized",
                StatusCode::INTERNAL_SERVER_ERROR => "Internal Server Error",
                _ => "Error",
            },
            &self.public_message(),
            status.as_u16(),
            error_type,
            code,
        );

        HttpResponse::build(status).json(response)
    }
}

impl From<CredentialError> for AppError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::InvalidInput => {
                AppError::InvalidSignup("username must match ^[a-z0-9_]+$ and password must not be empty".into())
            }
            CredentialError::AlreadyExists(username) => AppError::Conflict(username),
            CredentialError::InvalidCredentials => AppError::InvalidCredentials,
            CredentialError::Hashing(msg) => AppError::Internal(msg),
            CredentialError::Backend(msg) => AppError::Index(msg),
        }
    }
}

impl From<IngestionError> for AppError {
    fn from(err: IngestionError) -> Self {
        match err {
            IngestionError::InvalidLocation(e) => AppError::InvalidLocation(e.to_string()),
            IngestionError::MissingMedia => AppError::MissingImage,
            IngestionError::Upload(e) => AppError::Storage(e.to_string()),
            IngestionError::Index(e) => AppError::Index(e.to_string()),
        }
    }
}

impl From<IndexError> for AppError {
    fn from(err: IndexError) -> Self {
        AppError::Index(err.to_string())
    }
}

impl From<LocationError> for AppError {
    fn from(err: LocationError) -> Self {
        AppError::InvalidLocation(err.to_string())
    }
}

impl From<DistanceError> for AppError {
    fn from(err: DistanceError) -> Self {
        AppError::InvalidRange(err.to_string())
    }
}

impl From<actix_multipart::MultipartError> for AppError {
    fn from(err: actix_multipart::MultipartError) -> Self {
        AppError::BadRequest(format!("Malformed multipart body: {err}"))
    }
}
