//! Error types for Consul operations.
//!
//! This module provides the error type shared by every Consul endpoint
//! binding, including HTTP status code mapping.

use reqwest::StatusCode;
use thiserror::Error;

/// Main error type for Consul operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Consul agent is unreachable or shedding load
    #[error("Consul agent unavailable: {0}")]
    ServiceUnavailable(String),

    /// Failed to parse a Consul response
    #[error("Failed to parse Consul response: {0}")]
    ParseError(String),

    /// Query or session ID is not a UUID
    #[error("Invalid UUID: {0}")]
    InvalidUuid(String),

    /// Connection settings are unusable
    #[error("Invalid Consul connection settings: {0}")]
    ConfigError(String),

    /// TLS material could not be loaded
    #[error("TLS configuration error: {0}")]
    TlsError(String),

    /// Transport failure or unexpected status
    #[error("Consul request failed: {0}")]
    HttpError(String),

    /// Operation timed out
    #[error("Timeout talking to Consul: {0}")]
    Timeout(String),

    /// Object absent (HTTP 404)
    #[error("Not found in Consul: {0}")]
    NotFound(String),

    /// Consul rejected the request body or parameters
    #[error("Consul rejected request: {0}")]
    BadRequest(String),

    /// ACL token missing or lacking privileges
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Connection settings failed validation
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Write lost a check-and-set race
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Any other 5xx response
    #[error("Consul server error: {0}")]
    InternalError(String),

    /// Agent address does not form a URL
    #[error("Invalid Consul address: {0}")]
    InvalidEndpoint(String),
}

/// Specialized result type for Consul operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the error code for this error type.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            Self::ParseError(_) => "PARSE_ERROR",
            Self::InvalidUuid(_) => "INVALID_UUID",
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::TlsError(_) => "TLS_ERROR",
            Self::HttpError(_) => "HTTP_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::PermissionDenied(_) => "PERMISSION_DENIED",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::InternalError(_) => "INTERNAL_ERROR",
            Self::InvalidEndpoint(_) => "INVALID_ENDPOINT",
        }
    }

    /// Returns true when the error means the addressed object does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Maps a non-success HTTP status and its body to an [`Error`].
///
/// Consul answers most failures with a plain-text body, which is kept as the
/// error message.
#[must_use]
pub fn map_status_to_error(status: StatusCode, text: String) -> Error {
    match status {
        StatusCode::NOT_FOUND => Error::NotFound(text),
        StatusCode::BAD_REQUEST => Error::BadRequest(text),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::PermissionDenied(text),
        StatusCode::CONFLICT => Error::Conflict(text),
        StatusCode::TOO_MANY_REQUESTS
        | StatusCode::BAD_GATEWAY
        | StatusCode::SERVICE_UNAVAILABLE
        | StatusCode::GATEWAY_TIMEOUT => {
            Error::ServiceUnavailable(format!("Consul temporarily unavailable: {text}"))
        }
        status if status.is_server_error() => {
            Error::InternalError(format!("Consul server error {status}: {text}"))
        }
        _ => Error::HttpError(format!("Consul error {status}: {text}")),
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::ServiceUnavailable(err.to_string())
        } else if err.is_decode() {
            Self::ParseError(err.to_string())
        } else {
            Self::HttpError(err.to_string())
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidEndpoint(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::ValidationError(err.to_string())
    }
}

impl From<uuid::Error> for Error {
    fn from(err: uuid::Error) -> Self {
        Self::InvalidUuid(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::TlsError(err.to_string())
    }
}
