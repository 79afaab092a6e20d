//! Pipeline configuration.

use std::path::PathBuf;

use ltc_media::AssemblerConfig;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root of the per-topic folders.
    pub generated_content_dir: PathBuf,
    /// Default image size requested from providers
    pub image_width: u32,
    pub image_height: u32,
    /// Shared secret expected on webhook calls; `None` accepts every call.
    pub webhook_secret: Option<String>,
    pub assembler: AssemblerConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            generated_content_dir: PathBuf::from("generated_content"),
            image_width: 1080,
            image_height: 1920,
            webhook_secret: None,
            assembler: AssemblerConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let mut assembler = AssemblerConfig::from_env();
        assembler.default_audio_duration = std::env::var("DEFAULT_AUDIO_DURATION_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|secs: &f64| *secs > 0.0)
            .unwrap_or(assembler.default_audio_duration);

        Self {
            generated_content_dir: std::env::var("GENERATED_CONTENT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.generated_content_dir),
            image_width: std::env::var("IMAGE_WIDTH")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.image_width),
            image_height: std::env::var("IMAGE_HEIGHT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.image_height),
            webhook_secret: std::env::var("WEBHOOK_SECRET")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            assembler,
        }
    }
}
