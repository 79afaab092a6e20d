//! Application state.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use ltc_media::VideoAssembler;
use ltc_pipeline::{ImageGenerator, PipelineConfig, PipelineOrchestrator, PipelineServices, RunCoordinator};
use ltc_providers::{GeminiClient, GeminiConfig, GoogleTtsClient, ImageProviderConfig, TtsConfig};
use ltc_sheets::TopicStore;
use ltc_storage::{AccessTokenSource, AssetUploader, DriveConfig, DriveUploader, LocalOnlyUploader, LocalStore, TokenCache};

use crate::config::ApiConfig;
use crate::registry::WorkflowRegistry;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub coordinator: Arc<RunCoordinator>,
    pub store: Arc<TopicStore>,
    pub workflows: Arc<WorkflowRegistry>,
}

impl AppState {
    /// Wire the pipeline against the configured providers and backends.
    pub async fn new(config: ApiConfig) -> anyhow::Result<Self> {
        let workflows = Arc::new(WorkflowRegistry::new(
            config.workflow_retention,
            config.workflow_max_entries,
        ));

        let mut pipeline_config = PipelineConfig::from_env();
        pipeline_config.webhook_secret = config.webhook_secret.clone();
        if pipeline_config.webhook_secret.is_none() {
            warn!("WEBHOOK_SECRET not set, webhook calls are not authenticated");
        }

        let tokens: Arc<dyn AccessTokenSource> =
            Arc::new(TokenCache::from_env().context("Google service account unavailable")?);

        let llm = Arc::new(GeminiClient::new(GeminiConfig::from_env()).context("Failed to build Gemini client")?);
        let tts = Arc::new(
            GoogleTtsClient::new(TtsConfig::from_env(), Arc::clone(&tokens))
                .context("Failed to build text-to-speech client")?,
        );

        let drive = DriveConfig::from_env();
        let uploader: Arc<dyn AssetUploader> = if drive.is_configured() {
            info!("Uploading generated assets to Google Drive");
            Arc::new(DriveUploader::new(drive, Arc::clone(&tokens)).context("Failed to build Drive uploader")?)
        } else {
            info!("Drive folders not configured, keeping generated assets local");
            Arc::new(LocalOnlyUploader)
        };

        let local = LocalStore::new(pipeline_config.generated_content_dir.clone());

        let image_config = ImageProviderConfig::from_env();
        let providers = image_config
            .build_chain()
            .context("Failed to build image providers")?;
        if providers.is_empty() {
            warn!("No image provider credentials configured, every image slot will use a placeholder");
        }
        let images = Arc::new(ImageGenerator::new(
            providers,
            Arc::clone(&uploader),
            local.clone(),
            image_config.timeout,
        ));
        info!(providers = ?images.provider_names(), "Image fallback chain ready");

        let video = Arc::new(
            VideoAssembler::new(pipeline_config.assembler.clone()).context("Failed to set up video assembler")?,
        );

        let backend = ltc_sheets::backend_from_env().context("Failed to set up topic store")?;
        let store = Arc::new(TopicStore::new(backend));

        let services = PipelineServices {
            llm,
            tts,
            images,
            video,
            uploader,
            local,
            store: Arc::clone(&store),
            notifier: workflows.clone(),
        };
        let orchestrator = Arc::new(PipelineOrchestrator::new(services, pipeline_config));
        let coordinator = Arc::new(RunCoordinator::new(orchestrator));

        Ok(Self::from_parts(config, coordinator, store, workflows))
    }

    /// Assemble state from already-built collaborators.
    pub fn from_parts(
        config: ApiConfig,
        coordinator: Arc<RunCoordinator>,
        store: Arc<TopicStore>,
        workflows: Arc<WorkflowRegistry>,
    ) -> Self {
        Self {
            config,
            coordinator,
            store,
            workflows,
        }
    }
}
