//! Sheets error types.

use ltc_storage::StorageError;
use thiserror::Error;

/// Result type for table operations.
pub type SheetsResult<T> = Result<T, SheetsError>;

/// Errors that can occur during table operations.
#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Sheet not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Request failed ({status}): {message}")]
    RequestFailed { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Rate limited, retry after {0}ms")]
    RateLimited(u64),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<StorageError> for SheetsError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Network(e) => SheetsError::Network(e),
            other => SheetsError::AuthError(other.to_string()),
        }
    }
}

impl SheetsError {
    pub fn auth_error(msg: impl Into<String>) -> Self {
        Self::AuthError(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Map a non-success HTTP status to an error.
    pub fn from_http_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 => Self::AuthError(message),
            403 => Self::PermissionDenied(message),
            404 => Self::NotFound(message),
            429 => Self::RateLimited(1000),
            _ => Self::RequestFailed { status, message },
        }
    }

    /// HTTP status for metrics, when the error came from a response.
    pub fn http_status(&self) -> u16 {
        match self {
            SheetsError::AuthError(_) => 401,
            SheetsError::PermissionDenied(_) => 403,
            SheetsError::NotFound(_) => 404,
            SheetsError::RateLimited(_) => 429,
            SheetsError::RequestFailed { status, .. } => *status,
            SheetsError::InvalidResponse(_) | SheetsError::Json(_) => 502,
            SheetsError::Network(e) => e.status().map(|s| s.as_u16()).unwrap_or(0),
        }
    }

    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            SheetsError::RateLimited(ms) => Some(*ms),
            _ => None,
        }
    }

    /// Network errors, 429 and 5xx are retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            SheetsError::Network(_) | SheetsError::RateLimited(_) => true,
            SheetsError::RequestFailed { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
