//! Image-generation providers.
//!
//! Each provider is tried independently by the caller's fallback chain.
//! Providers without credentials are left out of the chain entirely.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{ProviderError, ProviderFailure, ProviderResult};
use crate::http::{build_client, check_status, instrumented};

/// Appended to every image prompt.
pub const PROMPT_SUFFIX: &str = ", high quality, professional, educational";

pub const CLOUDFLARE: &str = "Cloudflare";
pub const TOGETHER: &str = "Together";
pub const HUGGINGFACE: &str = "HuggingFace";

const SDXL_MODEL: &str = "stabilityai/stable-diffusion-xl-base-1.0";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratedImage {
    Bytes(Vec<u8>),
    /// Hosted by the provider; the caller downloads it.
    Remote(String),
}

#[async_trait]
pub trait ImageProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn generate(&self, prompt: &str, width: u32, height: u32) -> ProviderResult<GeneratedImage>;
}

pub fn decorated_prompt(prompt: &str) -> String {
    format!("{}{}", prompt, PROMPT_SUFFIX)
}

#[derive(Debug, Clone)]
pub struct ImageProviderConfig {
    pub cloudflare_account_id: Option<String>,
    pub cloudflare_api_token: Option<String>,
    pub together_api_key: Option<String>,
    pub huggingface_api_key: Option<String>,
    pub cloudflare_base_url: String,
    pub together_base_url: String,
    pub huggingface_base_url: String,
    pub timeout: Duration,
}

impl Default for ImageProviderConfig {
    fn default() -> Self {
        Self {
            cloudflare_account_id: None,
            cloudflare_api_token: None,
            together_api_key: None,
            huggingface_api_key: None,
            cloudflare_base_url: "https://api.cloudflare.com".to_string(),
            together_base_url: "https://api.together.xyz".to_string(),
            huggingface_base_url: "https://api-inference.huggingface.co".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl ImageProviderConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cloudflare_account_id: non_empty_env("CLOUDFLARE_ACCOUNT_ID"),
            cloudflare_api_token: non_empty_env("CLOUDFLARE_API_TOKEN"),
            together_api_key: non_empty_env("TOGETHER_API_KEY"),
            huggingface_api_key: non_empty_env("HUGGINGFACE_API_KEY"),
            timeout: std::env::var("IMAGE_PROVIDER_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            ..defaults
        }
    }

    /// Configured providers in fallback order: Cloudflare, Together, HuggingFace.
    pub fn build_chain(&self) -> Result<Vec<Arc<dyn ImageProvider>>, ProviderError> {
        let http = build_client(self.timeout)?;
        let mut chain: Vec<Arc<dyn ImageProvider>> = Vec::new();

        if let (Some(account_id), Some(api_token)) = (&self.cloudflare_account_id, &self.cloudflare_api_token) {
            chain.push(Arc::new(CloudflareImageProvider {
                http: http.clone(),
                base_url: self.cloudflare_base_url.clone(),
                account_id: account_id.clone(),
                api_token: api_token.clone(),
            }));
        }
        if let Some(api_key) = &self.together_api_key {
            chain.push(Arc::new(TogetherImageProvider {
                http: http.clone(),
                base_url: self.together_base_url.clone(),
                api_key: api_key.clone(),
            }));
        }
        if let Some(api_key) = &self.huggingface_api_key {
            chain.push(Arc::new(HuggingFaceImageProvider {
                http,
                base_url: self.huggingface_base_url.clone(),
                api_key: api_key.clone(),
            }));
        }
        Ok(chain)
    }
}

fn non_empty_bytes(provider: &'static str, bytes: Vec<u8>) -> ProviderResult<GeneratedImage> {
    if bytes.is_empty() {
        return Err(ProviderError::invalid_response(format!("{} returned an empty image", provider)).into());
    }
    Ok(GeneratedImage::Bytes(bytes))
}

/// Workers AI, returning PNG bytes.
pub struct CloudflareImageProvider {
    http: Client,
    base_url: String,
    account_id: String,
    api_token: String,
}

#[async_trait]
impl ImageProvider for CloudflareImageProvider {
    fn name(&self) -> &'static str {
        CLOUDFLARE
    }

    async fn generate(&self, prompt: &str, _width: u32, _height: u32) -> ProviderResult<GeneratedImage> {
        instrumented(CLOUDFLARE, "generate_image", async {
            let url = format!(
                "{}/client/v4/accounts/{}/ai/run/@cf/{}",
                self.base_url.trim_end_matches('/'),
                self.account_id,
                SDXL_MODEL
            );
            let response = self
                .http
                .post(url)
                .bearer_auth(&self.api_token)
                .json(&json!({ "prompt": decorated_prompt(prompt) }))
                .send()
                .await?;
            let bytes = check_status(response).await?.bytes().await?;
            non_empty_bytes(CLOUDFLARE, bytes.to_vec())
        })
        .await
    }
}

/// Together images API, returning a hosted URL.
pub struct TogetherImageProvider {
    http: Client,
    base_url: String,
    api_key: String,
}

#[async_trait]
impl ImageProvider for TogetherImageProvider {
    fn name(&self) -> &'static str {
        TOGETHER
    }

    async fn generate(&self, prompt: &str, width: u32, height: u32) -> ProviderResult<GeneratedImage> {
        instrumented(TOGETHER, "generate_image", async {
            let response = self
                .http
                .post(format!("{}/v1/images/generations", self.base_url.trim_end_matches('/')))
                .bearer_auth(&self.api_key)
                .json(&json!({
                    "model": SDXL_MODEL,
                    "prompt": decorated_prompt(prompt),
                    "width": width,
                    "height": height,
                    "steps": 20,
                    "n": 1,
                }))
                .send()
                .await?;
            let body: Value = check_status(response).await?.json().await?;
            let url = body
                .pointer("/data/0/url")
                .and_then(Value::as_str)
                .filter(|u| !u.is_empty())
                .ok_or_else(|| ProviderError::invalid_response("Together response has no data[0].url"))?;
            debug!(url = %url, "Together image ready");
            Ok::<_, ProviderFailure>(GeneratedImage::Remote(url.to_string()))
        })
        .await
    }
}

/// HuggingFace inference API, returning image bytes.
pub struct HuggingFaceImageProvider {
    http: Client,
    base_url: String,
    api_key: String,
}

#[async_trait]
impl ImageProvider for HuggingFaceImageProvider {
    fn name(&self) -> &'static str {
        HUGGINGFACE
    }

    async fn generate(&self, prompt: &str, _width: u32, _height: u32) -> ProviderResult<GeneratedImage> {
        instrumented(HUGGINGFACE, "generate_image", async {
            let response = self
                .http
                .post(format!("{}/models/{}", self.base_url.trim_end_matches('/'), SDXL_MODEL))
                .bearer_auth(&self.api_key)
                .json(&json!({ "inputs": decorated_prompt(prompt) }))
                .send()
                .await?;
            let bytes = check_status(response).await?.bytes().await?;
            non_empty_bytes(HUGGINGFACE, bytes.to_vec())
        })
        .await
    }
}
