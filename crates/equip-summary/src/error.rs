//! Error types for the equipment summary service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for service operations
pub type Result<T> = std::result::Result<T, Error>;

/// Service errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Uploaded bytes are not well-formed tabular text
    #[error("Failed to parse '{filename}': {message}")]
    Parse { filename: String, message: String },

    /// A required column is absent from the header row
    #[error("Missing required column '{column}' in '{filename}'")]
    MissingColumn { filename: String, column: String },

    /// Missing or invalid credentials
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Backing store unavailable or failed
    #[error("Store error: {0}")]
    Store(String),

    /// PDF rendering error
    #[error("PDF rendering failed: {0}")]
    Pdf(String),

    /// Malformed request (e.g. no file field)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Request body over the configured upload limit
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error (client side)
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response from the API (client side)
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a parse error
    pub fn parse(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create a missing column error
    pub fn missing_column(filename: impl Into<String>, column: impl Into<String>) -> Self {
        Self::MissingColumn {
            filename: filename.into(),
            column: column.into(),
        }
    }

    /// Create an authentication error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Authentication(message.into())
    }

    /// Create a store error
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether the caller may retry the same request unchanged
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Store(_) => true,
            Error::Http(e) => e.is_timeout() || e.is_connect(),
            Error::Api { status, .. } => *status == 503,
            _ => false,
        }
    }

    /// Whether a non-idempotent request can be resent without risk of applying it twice
    ///
    /// Only failures where the server cannot have committed anything qualify:
    /// a refused connection or a 503 from a rolled-back store write.
    pub fn is_safe_to_resend(&self) -> bool {
        match self {
            Error::Http(e) => e.is_connect(),
            Error::Api { status, .. } => *status == 503,
            _ => false,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Store(err.to_string())
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        Error::Pdf(err.to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            Error::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            Error::Parse { .. } => (StatusCode::BAD_REQUEST, "parse_error"),
            Error::MissingColumn { .. } => (StatusCode::BAD_REQUEST, "missing_column"),
            Error::Authentication(_) => (StatusCode::UNAUTHORIZED, "authentication_error"),
            Error::Store(_) => (StatusCode::SERVICE_UNAVAILABLE, "store_error"),
            Error::Pdf(_) => (StatusCode::INTERNAL_SERVER_ERROR, "pdf_error"),
            Error::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            Error::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large"),
            Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
            Error::Json(_) => (StatusCode::BAD_REQUEST, "json_error"),
            Error::Http(_) => (StatusCode::BAD_GATEWAY, "http_error"),
            Error::Api { .. } => (StatusCode::BAD_GATEWAY, "api_error"),
            Error::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_map_to_bad_request() {
        let resp = Error::parse("a.csv", "bad row").into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = Error::missing_column("a.csv", "Type").into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = Error::PayloadTooLarge("limit 1024".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_auth_and_store_status() {
        assert_eq!(
            Error::auth("no token").into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        let store = Error::store("locked");
        assert!(store.is_retryable());
        assert!(!store.is_safe_to_resend());
        assert_eq!(store.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_resend_only_when_nothing_was_applied() {
        let unavailable = Error::Api {
            status: 503,
            message: "store_error".to_string(),
        };
        assert!(unavailable.is_safe_to_resend());

        for status in [400, 401, 500, 502] {
            let err = Error::Api {
                status,
                message: String::new(),
            };
            assert!(!err.is_safe_to_resend(), "{}", status);
        }
    }
}
