//! Image generation over the provider fallback chain.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use tracing::{info, warn};

use ltc_media::download_to;
use ltc_models::ImageSlot;
use ltc_providers::{GeneratedImage, ImageProvider};
use ltc_storage::{upload_or_local, AssetKind, AssetUploader, LocalStore};

use crate::metrics::{record_image, record_image_fallback_exhausted};

/// One provider call, kept for the API-usage log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderAttempt {
    pub provider: &'static str,
    /// 200 on success, the provider's HTTP status (or 0) on failure.
    pub status_code: u16,
}

/// Terminal outcome of one slot.
#[derive(Debug, Clone)]
pub struct SlotOutcome {
    pub slot: ImageSlot,
    pub attempts: Vec<ProviderAttempt>,
}

/// What one slot needs.
#[derive(Debug, Clone, Copy)]
pub struct SlotRequest<'a> {
    pub topic_id: &'a str,
    /// 1-based slot number.
    pub slot: usize,
    pub prompt: &'a str,
    pub width: u32,
    pub height: u32,
    pub folder: &'a Path,
}

pub struct ImageGenerator {
    providers: Vec<Arc<dyn ImageProvider>>,
    uploader: Arc<dyn AssetUploader>,
    local: LocalStore,
    http: Client,
    download_timeout: Duration,
}

impl ImageGenerator {
    pub fn new(
        providers: Vec<Arc<dyn ImageProvider>>,
        uploader: Arc<dyn AssetUploader>,
        local: LocalStore,
        download_timeout: Duration,
    ) -> Self {
        Self {
            providers,
            uploader,
            local,
            http: Client::new(),
            download_timeout,
        }
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Try each provider in order until one yields a stored image.
    ///
    /// Never fails: when every provider fails the slot holds the placeholder
    /// link and the `Failed` tag.
    pub async fn generate_slot(&self, request: SlotRequest<'_>) -> SlotOutcome {
        let mut attempts = Vec::with_capacity(self.providers.len());

        for provider in &self.providers {
            let name = provider.name();
            let result = provider
                .generate(request.prompt, request.width, request.height)
                .await;

            let stored = match result {
                Ok(image) => self.store(&request, image).await.map_err(|e| (0, e)),
                Err(failure) => Err((failure.error().status_code(), failure.to_string())),
            };

            match stored {
                Ok(path) => {
                    attempts.push(ProviderAttempt {
                        provider: name,
                        status_code: 200,
                    });
                    let link = upload_or_local(self.uploader.as_ref(), &path, AssetKind::Image).await;
                    info!(
                        topic_id = %request.topic_id,
                        slot = request.slot,
                        provider = name,
                        "Image generated"
                    );
                    record_image(name);
                    return SlotOutcome {
                        slot: ImageSlot::generated(link, name),
                        attempts,
                    };
                }
                Err((status_code, message)) => {
                    warn!(
                        topic_id = %request.topic_id,
                        slot = request.slot,
                        provider = name,
                        "Image provider failed, trying next: {}",
                        message
                    );
                    attempts.push(ProviderAttempt {
                        provider: name,
                        status_code,
                    });
                }
            }
        }

        warn!(
            topic_id = %request.topic_id,
            slot = request.slot,
            "All image providers failed, using placeholder"
        );
        record_image_fallback_exhausted();
        SlotOutcome {
            slot: ImageSlot::failed(request.slot),
            attempts,
        }
    }

    /// Persist the provider's image in the topic folder.
    async fn store(&self, request: &SlotRequest<'_>, image: GeneratedImage) -> Result<PathBuf, String> {
        let name = format!(
            "image_{}_{}_{}.png",
            request.topic_id,
            request.slot,
            Utc::now().timestamp()
        );
        match image {
            GeneratedImage::Bytes(bytes) => self
                .local
                .write_file(request.folder, &name, &bytes)
                .await
                .map_err(|e| e.to_string()),
            GeneratedImage::Remote(url) => {
                let dest = request.folder.join(&name);
                download_to(&self.http, &url, &dest, self.download_timeout)
                    .await
                    .map(|_| dest)
                    .map_err(|e| e.to_string())
            }
        }
    }
}
