//! Pipeline error types.

use thiserror::Error;

use ltc_models::InvalidTransition;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Unauthorized - Invalid webhook secret")]
    Unauthorized,

    #[error("{0}")]
    Validation(String),

    #[error("Script generation failed: {0}")]
    ScriptFailed(String),

    #[error("Audio generation failed: {0}")]
    AudioFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Provider error: {0}")]
    Provider(#[from] ltc_providers::ProviderFailure),

    #[error("Media error: {0}")]
    Media(#[from] ltc_media::MediaError),

    #[error("Sheets error: {0}")]
    Sheets(#[from] ltc_sheets::SheetsError),

    #[error("Storage error: {0}")]
    Storage(#[from] ltc_storage::StorageError),

    #[error(transparent)]
    Transition(#[from] InvalidTransition),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn script_failed(msg: impl Into<String>) -> Self {
        Self::ScriptFailed(msg.into())
    }

    pub fn audio_failed(msg: impl Into<String>) -> Self {
        Self::AudioFailed(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// HTTP status the coordinator answers with for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            PipelineError::Unauthorized => 401,
            PipelineError::Validation(_) => 400,
            _ => 500,
        }
    }
}
