//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found: {0}")]
    FfmpegNotFound(String),

    #[error("FFprobe not found: {0}")]
    FfprobeNotFound(String),

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("Download failed: {message}")]
    DownloadFailed { message: String },

    #[error("Invalid {kind} file {path}: {reason}")]
    InvalidMedia {
        kind: &'static str,
        path: PathBuf,
        reason: String,
    },

    #[error("No images provided for video generation")]
    NoImages,

    #[error("Invalid media reference: {0}")]
    InvalidReference(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Output file missing or empty: {0}")]
    EmptyOutput(PathBuf),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create a download failure error.
    pub fn download_failed(message: impl Into<String>) -> Self {
        Self::DownloadFailed {
            message: message.into(),
        }
    }

    pub fn invalid_media(kind: &'static str, path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidMedia {
            kind,
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether the encoder binary is unavailable on this host.
    pub fn is_encoder_missing(&self) -> bool {
        matches!(self, MediaError::FfmpegNotFound(_))
    }
}
