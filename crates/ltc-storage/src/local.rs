//! Local `generated_content` store: one folder per topic.

use std::path::{Path, PathBuf};

use ltc_models::topic_folder_name;
use tracing::debug;

use crate::error::StorageResult;

/// Default root for generated files.
pub const DEFAULT_ROOT: &str = "generated_content";

#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store rooted at `GENERATED_CONTENT_DIR`, or `generated_content`.
    pub fn from_env() -> Self {
        Self::new(std::env::var("GENERATED_CONTENT_DIR").unwrap_or_else(|_| DEFAULT_ROOT.into()))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create (if needed) and return the folder for a topic.
    pub async fn topic_folder(&self, topic_id: &str, title: &str) -> StorageResult<PathBuf> {
        let folder = self.root.join(topic_folder_name(topic_id, title));
        tokio::fs::create_dir_all(&folder).await?;
        Ok(folder)
    }

    /// Write `bytes` into `folder/name` and return the full path.
    pub async fn write_file(&self, folder: &Path, name: &str, bytes: &[u8]) -> StorageResult<PathBuf> {
        tokio::fs::create_dir_all(folder).await?;
        let path = folder.join(name);
        tokio::fs::write(&path, bytes).await?;
        debug!(path = %path.display(), size = bytes.len(), "Wrote generated file");
        Ok(path)
    }
}

impl Default for LocalStore {
    fn default() -> Self {
        Self::new(DEFAULT_ROOT)
    }
}
