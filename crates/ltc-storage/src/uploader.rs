//! Upload collaborator used by the image chain and the video assembler.

use std::path::Path;

use async_trait::async_trait;
use tracing::warn;

use crate::error::StorageResult;

/// Kind of generated asset, selecting the destination folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Audio,
    Image,
    Video,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Audio => "audio",
            AssetKind::Image => "image",
            AssetKind::Video => "video",
        }
    }

    /// MIME type for the file, by extension when known.
    pub fn mime_type(&self, path: &Path) -> &'static str {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match (self, ext.as_deref()) {
            (_, Some("txt")) => "text/plain",
            (AssetKind::Audio, Some("wav")) => "audio/wav",
            (AssetKind::Audio, _) => "audio/mpeg",
            (AssetKind::Image, Some("jpg")) | (AssetKind::Image, Some("jpeg")) => "image/jpeg",
            (AssetKind::Image, _) => "image/png",
            (AssetKind::Video, _) => "video/mp4",
        }
    }
}

/// Uploads a local file and returns a shareable reference.
#[async_trait]
pub trait AssetUploader: Send + Sync {
    async fn upload(&self, local_path: &Path, kind: AssetKind) -> StorageResult<String>;
}

/// Uploader that keeps files where they are.
#[derive(Debug, Clone, Default)]
pub struct LocalOnlyUploader;

#[async_trait]
impl AssetUploader for LocalOnlyUploader {
    async fn upload(&self, local_path: &Path, _kind: AssetKind) -> StorageResult<String> {
        Ok(local_path.display().to_string())
    }
}

/// Upload, falling back to the local path on any failure.
pub async fn upload_or_local(uploader: &dyn AssetUploader, local_path: &Path, kind: AssetKind) -> String {
    match uploader.upload(local_path, kind).await {
        Ok(link) => link,
        Err(e) => {
            warn!(
                path = %local_path.display(),
                kind = kind.as_str(),
                "Upload failed, keeping local path: {}",
                e
            );
            local_path.display().to_string()
        }
    }
}
