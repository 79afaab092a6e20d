//! Google Drive uploader (REST v3).
//!
//! Files go into a per-kind folder and are shared as `anyone:reader`, so the
//! returned `/file/d/{id}/view` link is readable without credentials.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, info_span, Instrument};

use crate::auth::AccessTokenSource;
use crate::error::{StorageError, StorageResult};
use crate::uploader::{AssetKind, AssetUploader};

const DEFAULT_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";
const DEFAULT_API_BASE: &str = "https://www.googleapis.com/drive/v3";
const MULTIPART_BOUNDARY: &str = "ltc_drive_upload_boundary";

/// Drive uploader configuration.
#[derive(Debug, Clone)]
pub struct DriveConfig {
    pub audio_folder_id: Option<String>,
    pub images_folder_id: Option<String>,
    pub videos_folder_id: Option<String>,
    pub upload_base_url: String,
    pub api_base_url: String,
    pub timeout: Duration,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            audio_folder_id: None,
            images_folder_id: None,
            videos_folder_id: None,
            upload_base_url: DEFAULT_UPLOAD_BASE.to_string(),
            api_base_url: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl DriveConfig {
    pub fn from_env() -> Self {
        let folder = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
        Self {
            audio_folder_id: folder("AUDIO_FOLDER_ID"),
            images_folder_id: folder("IMAGES_FOLDER_ID"),
            videos_folder_id: folder("VIDEOS_FOLDER_ID"),
            ..Self::default()
        }
    }

    /// Whether any destination folder is configured.
    pub fn is_configured(&self) -> bool {
        self.audio_folder_id.is_some()
            || self.images_folder_id.is_some()
            || self.videos_folder_id.is_some()
    }

    pub fn folder_for(&self, kind: AssetKind) -> Option<&str> {
        match kind {
            AssetKind::Audio => self.audio_folder_id.as_deref(),
            AssetKind::Image => self.images_folder_id.as_deref(),
            AssetKind::Video => self.videos_folder_id.as_deref(),
        }
    }
}

/// Shareable view link for a Drive file.
pub fn drive_view_link(file_id: &str) -> String {
    format!("https://drive.google.com/file/d/{}/view", file_id)
}

#[derive(Debug, Deserialize)]
struct CreatedFile {
    id: String,
}

pub struct DriveUploader {
    http: Client,
    config: DriveConfig,
    tokens: Arc<dyn AccessTokenSource>,
}

impl DriveUploader {
    pub fn new(config: DriveConfig, tokens: Arc<dyn AccessTokenSource>) -> StorageResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("ltc-storage/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(StorageError::Network)?;

        Ok(Self {
            http,
            config,
            tokens,
        })
    }

    fn related_body(name: &str, folder_id: &str, mime: &str, bytes: &[u8]) -> Vec<u8> {
        let metadata = json!({ "name": name, "parents": [folder_id] });
        let mut body = Vec::with_capacity(bytes.len() + 512);
        body.extend_from_slice(
            format!(
                "--{b}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{m}\r\n--{b}\r\nContent-Type: {mime}\r\n\r\n",
                b = MULTIPART_BOUNDARY,
                m = metadata,
                mime = mime
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());
        body
    }

    async fn create_file(&self, token: &str, body: Vec<u8>) -> StorageResult<String> {
        let url = format!(
            "{}/files?uploadType=multipart&fields=id",
            self.config.upload_base_url
        );
        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", MULTIPART_BOUNDARY),
            )
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            self.tokens.invalidate().await;
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(StorageError::upload_failed(format!(
                "Drive upload returned {}: {}",
                status, text
            )));
        }
        let created: CreatedFile = response.json().await?;
        Ok(created.id)
    }

    async fn share_publicly(&self, token: &str, file_id: &str) -> StorageResult<()> {
        let url = format!("{}/files/{}/permissions", self.config.api_base_url, file_id);
        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&json!({ "role": "reader", "type": "anyone" }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(StorageError::PermissionFailed(format!("{}: {}", status, text)));
        }
        Ok(())
    }
}

#[async_trait]
impl AssetUploader for DriveUploader {
    async fn upload(&self, local_path: &Path, kind: AssetKind) -> StorageResult<String> {
        let folder_id = self.config.folder_for(kind).ok_or_else(|| {
            StorageError::config_error(format!("no Drive folder configured for {}", kind.as_str()))
        })?;
        if !local_path.is_file() {
            return Err(StorageError::not_found(local_path.display().to_string()));
        }

        let name = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.bin")
            .to_string();
        let span = info_span!("drive_upload", kind = kind.as_str(), file = %name);

        async {
            let bytes = tokio::fs::read(local_path).await?;
            let body = Self::related_body(&name, folder_id, kind.mime_type(local_path), &bytes);
            let token = self.tokens.access_token().await?;

            let file_id = self.create_file(&token, body).await?;
            self.share_publicly(&token, &file_id).await?;

            let link = drive_view_link(&file_id);
            info!(link = %link, size = bytes.len(), "Uploaded to Drive");
            Ok::<_, StorageError>(link)
        }
        .instrument(span)
        .await
    }
}
