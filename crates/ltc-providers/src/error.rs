//! Provider error types.
//!
//! Every adapter call returns [`ProviderResult`]. The failure says whether
//! another attempt (or another provider) could reasonably succeed.

use thiserror::Error;

pub type ProviderResult<T> = Result<T, ProviderFailure>;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProviderError {
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Body is truncated to keep log lines bounded.
    pub fn status(status: u16, body: &str) -> Self {
        Self::Status {
            status,
            body: body.chars().take(500).collect(),
        }
    }

    /// HTTP status code for usage logs, 0 when no response was received.
    pub fn status_code(&self) -> u16 {
        match self {
            ProviderError::Status { status, .. } => *status,
            ProviderError::Network(e) => e.status().map(|s| s.as_u16()).unwrap_or(0),
            _ => 0,
        }
    }
}

/// Outcome class of a failed provider call.
#[derive(Debug, Error)]
pub enum ProviderFailure {
    /// Timeouts, connection errors, 429 and 5xx.
    #[error("retryable: {0}")]
    Retryable(ProviderError),

    /// Anything a repeat of the same request would not fix.
    #[error("fatal: {0}")]
    Fatal(ProviderError),
}

impl ProviderFailure {
    pub fn classify(error: ProviderError) -> Self {
        let retryable = match &error {
            ProviderError::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            ProviderError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        };
        if retryable {
            Self::Retryable(error)
        } else {
            Self::Fatal(error)
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderFailure::Retryable(_))
    }

    pub fn error(&self) -> &ProviderError {
        match self {
            ProviderFailure::Retryable(e) | ProviderFailure::Fatal(e) => e,
        }
    }
}

impl From<ProviderError> for ProviderFailure {
    fn from(e: ProviderError) -> Self {
        Self::classify(e)
    }
}

impl From<reqwest::Error> for ProviderFailure {
    fn from(e: reqwest::Error) -> Self {
        Self::classify(ProviderError::Network(e))
    }
}

impl From<std::io::Error> for ProviderFailure {
    fn from(e: std::io::Error) -> Self {
        Self::classify(ProviderError::Io(e))
    }
}
