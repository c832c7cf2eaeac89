//! Error types for mpx-client
//!
//! This module provides the error type shared by every Mathpix operation.

use std::path::PathBuf;
use std::time::Duration;

use crate::client::MpxBuilderError;

/// Result type for all Mathpix operations in this crate.
///
/// This is a convenience type alias that defaults to using [`Error`] as the error type.
/// Most functions in this crate return this type for consistent error handling.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Unified error type for Mathpix operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP client/connection errors
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization errors when sending or receiving data
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Reading a local input file failed
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Mathpix API error response
    #[error("Mathpix API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Missing or rejected credentials
    #[error("Authentication failed: {reason}")]
    Authentication { reason: String },

    /// Invalid arguments supplied by the caller
    #[error("Validation failed: {reason}")]
    Validation { reason: String },

    /// Local input file does not exist
    #[error("File path not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// Writing a downloaded output to disk failed
    #[error("Failed to save file to '{}': {reason}", path.display())]
    Filesystem { path: PathBuf, reason: String },

    /// Requested output is not ready yet
    #[error("Conversion not complete: {format} is {state}")]
    ConversionIncomplete {
        format: String,
        state: String,
        status: Option<serde_json::Value>,
    },

    /// Feature is not enabled on the configured API deployment
    #[error("{feature} are not yet available in the production API")]
    Unavailable { feature: String },

    /// Response body is missing an expected field or is malformed
    #[error("Invalid response: {reason}")]
    InvalidResponse { reason: String },

    /// Rate limit exceeded
    #[error("Rate limit exceeded: {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// Operation timeout
    #[error("Operation timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    /// Invalid configuration
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl Error {
    /// Create an API error
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create an authentication error
    pub fn authentication(reason: impl Into<String>) -> Self {
        Self::Authentication {
            reason: reason.into(),
        }
    }

    /// Create a validation error
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    /// Create a file not found error
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a filesystem error
    pub fn filesystem(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Filesystem {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a conversion incomplete error
    pub fn conversion_incomplete(
        format: impl Into<String>,
        state: impl Into<String>,
        status: Option<serde_json::Value>,
    ) -> Self {
        Self::ConversionIncomplete {
            format: format.into(),
            state: state.into(),
            status,
        }
    }

    /// Create an unavailable feature error
    pub fn unavailable(feature: impl Into<String>) -> Self {
        Self::Unavailable {
            feature: feature.into(),
        }
    }

    /// Create an invalid response error
    pub fn invalid_response(reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            reason: reason.into(),
        }
    }

    /// Create a rate limited error
    pub fn rate_limited(retry_after: Option<Duration>) -> Self {
        Self::RateLimited { retry_after }
    }

    /// Create a timeout error with the given duration
    pub fn timeout(duration: Duration) -> Self {
        Self::Timeout { timeout: duration }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(err) => err.is_timeout() || err.is_connect(),
            Error::Timeout { .. } | Error::RateLimited { .. } => true,
            Error::Api { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Get suggested retry delay for retryable errors
    pub fn retry_delay(&self) -> Option<Duration> {
        match self {
            Error::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Get the HTTP status code if this is an HTTP/API error
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::Http(err) => err.status().map(|s| s.as_u16()),
            Error::RateLimited { .. } => Some(429),
            _ => None,
        }
    }

    /// Get the error category for metrics/logging
    pub fn category(&self) -> &'static str {
        match self {
            Error::Http(_) => "http",
            Error::Serialization(_) => "serialization",
            Error::UrlParse(_) => "url_parse",
            Error::Io(_) => "io",
            Error::Api { .. } => "api",
            Error::Authentication { .. } => "authentication",
            Error::Validation { .. } => "validation",
            Error::FileNotFound { .. } => "file_not_found",
            Error::Filesystem { .. } => "filesystem",
            Error::ConversionIncomplete { .. } => "conversion_incomplete",
            Error::Unavailable { .. } => "unavailable",
            Error::InvalidResponse { .. } => "invalid_response",
            Error::RateLimited { .. } => "rate_limit",
            Error::Timeout { .. } => "timeout",
            Error::InvalidConfig { .. } => "config",
        }
    }

    /// Check if this is a client-side error (programming/configuration issue)
    pub fn is_client_error(&self) -> bool {
        match self {
            Error::Validation { .. }
            | Error::InvalidConfig { .. }
            | Error::FileNotFound { .. }
            | Error::Unavailable { .. }
            | Error::Authentication { .. } => true,
            Error::Api { status, .. } => (400..500).contains(status) && *status != 429,
            _ => false,
        }
    }

    /// Get a user-friendly error message suitable for display
    pub fn user_message(&self) -> String {
        match self {
            Error::Http(_) => {
                "Network connection failed. Please check your internet connection.".to_string()
            }
            Error::Authentication { .. } => {
                "Authentication failed. Please check MATHPIX_APP_ID and MATHPIX_APP_KEY."
                    .to_string()
            }
            Error::RateLimited { retry_after } => match retry_after {
                Some(duration) => format!(
                    "Rate limit exceeded. Please wait {:?} before trying again.",
                    duration
                ),
                None => "Rate limit exceeded. Please try again later.".to_string(),
            },
            Error::ConversionIncomplete { format, .. } => {
                format!(
                    "The '{}' output is not ready yet. Wait for processing to complete.",
                    format
                )
            }
            Error::Api { status, message } => {
                format!("Mathpix service error ({}): {}", status, message)
            }
            Error::Validation { reason } => format!("Invalid input: {}", reason),
            Error::FileNotFound { path } => format!("File not found: {}", path.display()),
            Error::InvalidConfig { reason } => format!("Configuration error: {}", reason),
            Error::Unavailable { .. } => self.to_string(),
            _ => "An unexpected error occurred. Please try again.".to_string(),
        }
    }
}

impl From<MpxBuilderError> for Error {
    fn from(err: MpxBuilderError) -> Self {
        Error::InvalidConfig {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        let api_err = Error::api(500, "Internal server error");
        assert_eq!(api_err.category(), "api");
        assert!(api_err.is_retryable());

        let validation_err = Error::validation("Exactly one of file_path or file_url");
        assert_eq!(validation_err.category(), "validation");
        assert!(!validation_err.is_retryable());
        assert!(validation_err.is_client_error());
    }

    #[test]
    fn test_retryable_errors() {
        assert!(Error::rate_limited(None).is_retryable());
        assert!(Error::timeout(Duration::from_secs(5)).is_retryable());
        assert!(Error::api(503, "Service unavailable").is_retryable());
        assert!(Error::api(429, "Too many requests").is_retryable());

        assert!(!Error::api(400, "Bad request").is_retryable());
        assert!(!Error::authentication("missing app_key").is_retryable());
        assert!(!Error::conversion_incomplete("docx", "processing", None).is_retryable());
    }

    #[test]
    fn test_retry_delay() {
        let delay = Duration::from_secs(7);
        assert_eq!(Error::rate_limited(Some(delay)).retry_delay(), Some(delay));
        assert_eq!(Error::api(502, "Bad gateway").retry_delay(), None);
    }

    #[test]
    fn test_status_code() {
        assert_eq!(Error::api(404, "Not found").status_code(), Some(404));
        assert_eq!(Error::rate_limited(None).status_code(), Some(429));
        assert_eq!(Error::validation("bad").status_code(), None);
    }

    #[test]
    fn test_display_messages() {
        let err = Error::unavailable("File batches");
        assert_eq!(
            err.to_string(),
            "File batches are not yet available in the production API"
        );

        let err = Error::file_not_found("missing.pdf");
        assert_eq!(err.to_string(), "File path not found: missing.pdf");

        let err = Error::conversion_incomplete("docx", "processing", None);
        assert_eq!(err.to_string(), "Conversion not complete: docx is processing");
    }
}
