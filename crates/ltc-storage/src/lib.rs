//! Storage for generated assets.
//!
//! Provides:
//! - `AssetUploader`, the upload collaborator with local-path fallback
//! - Google Drive uploads with public sharing
//! - Local per-topic folders under `generated_content`
//! - Cached Google access tokens shared by the Sheets, Drive and TTS clients

pub mod auth;
pub mod drive;
pub mod error;
pub mod local;
pub mod uploader;

pub use auth::{AccessTokenSource, StaticToken, TokenCache};
pub use drive::{drive_view_link, DriveConfig, DriveUploader};
pub use error::{StorageError, StorageResult};
pub use local::LocalStore;
pub use uploader::{upload_or_local, AssetKind, AssetUploader, LocalOnlyUploader};
