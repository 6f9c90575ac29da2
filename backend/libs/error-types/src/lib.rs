//! Shared API error body and code constants.
//!
//! Every HTTP error produced by the services renders as an [`ErrorResponse`],
//! so clients can branch on `error_type` and `code` instead of parsing text.

use serde::{Deserialize, Serialize};

/// JSON body returned for every failed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Reason phrase of the HTTP status, e.g. "Bad Request".
    pub error: String,

    /// Client-facing message. Never carries backend internals for 5xx.
    pub message: String,

    /// HTTP status code.
    pub status: u16,

    /// Coarse category, one of the constants in [`error_types`].
    pub error_type: String,

    /// Stable machine-readable code, one of the constants in [`error_codes`].
    pub code: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,

    /// Request id from the logging middleware, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,

    /// RFC 3339 timestamp.
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error: &str, message: &str, status: u16, error_type: &str, code: &str) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
            status,
            error_type: error_type.to_string(),
            code: code.to_string(),
            details: None,
            trace_id: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn with_details(mut self, details: String) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_trace_id(mut self, trace_id: String) -> Self {
        self.trace_id = Some(trace_id);
        self
    }
}

/// Stable error codes.
pub mod error_codes {
    // Accounts
    pub const INVALID_USERNAME_OR_PASSWORD: &str = "INVALID_USERNAME_OR_PASSWORD";
    pub const USER_ALREADY_EXISTS: &str = "USER_ALREADY_EXISTS";
    pub const INVALID_CREDENTIALS: &str = "INVALID_CREDENTIALS";

    // Session tokens
    pub const TOKEN_EXPIRED: &str = "TOKEN_EXPIRED";
    pub const TOKEN_INVALID: &str = "TOKEN_INVALID";
    pub const TOKEN_MISSING: &str = "TOKEN_MISSING";

    // Posts
    pub const IMAGE_MISSING: &str = "IMAGE_MISSING";
    pub const UPLOAD_TOO_LARGE: &str = "UPLOAD_TOO_LARGE";
    pub const INVALID_LOCATION: &str = "INVALID_LOCATION";
    pub const INVALID_RANGE: &str = "INVALID_RANGE";
    pub const INVALID_REQUEST: &str = "INVALID_REQUEST";

    // Backends
    pub const MEDIA_STORAGE_ERROR: &str = "MEDIA_STORAGE_ERROR";
    pub const SEARCH_INDEX_ERROR: &str = "SEARCH_INDEX_ERROR";
    pub const INTERNAL_SERVER_ERROR: &str = "INTERNAL_SERVER_ERROR";
}

/// Error categories.
pub mod error_types {
    pub const VALIDATION_ERROR: &str = "validation_error";
    pub const AUTHENTICATION_ERROR: &str = "authentication_error";
    pub const CONFLICT_ERROR: &str = "conflict_error";
    pub const SERVER_ERROR: &str = "server_error";
}
