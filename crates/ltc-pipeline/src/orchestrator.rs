//! Per-topic stage state machine.
//!
//! `Pending → Script Generated → Audio Generated → Images Generated →
//! Video Generated → Completed`, with `Script Too Short`, `Images Failed`,
//! `Video Failed` and `Failed` as failure exits. Every transition persists
//! the topic snapshot and notifies the run's workflow, if any.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use tracing::Instrument;

use ltc_media::AssemblyRequest;
use ltc_models::{video_link_valid, Topic, TopicStatus, IMAGE_SLOTS};
use ltc_providers::{LlmClient, ResponseFormat, SpeechPlan, SpeechSynthesizer};
use ltc_sheets::TopicStore;
use ltc_storage::{upload_or_local, AssetKind, AssetUploader, LocalStore};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::image_prompts::ImagePromptDeriver;
use crate::images::{ImageGenerator, SlotRequest};
use crate::logging::TopicLogger;
use crate::metrics::{record_stage, record_topic_outcome};
use crate::notifier::StatusNotifier;
use crate::prompts::script_prompt;
use crate::script::{extract_scene_labels, parse_script_response, DEFAULT_VOICE_STYLE};
use crate::video::VideoRenderer;

/// Collaborators of the orchestrator, injected at construction.
#[derive(Clone)]
pub struct PipelineServices {
    pub llm: Arc<dyn LlmClient>,
    pub tts: Arc<dyn SpeechSynthesizer>,
    pub images: Arc<ImageGenerator>,
    pub video: Arc<dyn VideoRenderer>,
    pub uploader: Arc<dyn AssetUploader>,
    pub local: LocalStore,
    pub store: Arc<TopicStore>,
    pub notifier: Arc<dyn StatusNotifier>,
}

/// Result of one topic's run, as reported back to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct TopicOutcome {
    pub success: bool,
    pub topic_id: String,
    pub title: String,
    pub status: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub video_link: String,
    /// Voice used for narration; empty when the audio stage never ran.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub tts_voice_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub tts_language_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub message: String,
}

pub struct PipelineOrchestrator {
    services: PipelineServices,
    deriver: ImagePromptDeriver,
    config: PipelineConfig,
}

impl PipelineOrchestrator {
    pub fn new(services: PipelineServices, config: PipelineConfig) -> Self {
        let deriver = ImagePromptDeriver::new(Some(services.llm.clone()));
        Self {
            services,
            deriver,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn services(&self) -> &PipelineServices {
        &self.services
    }

    /// Run every stage for `topic`. Never returns an error: failures end in
    /// a terminal status on the topic and a failed outcome.
    pub async fn process_topic(&self, topic: &mut Topic, workflow_id: Option<&str>) -> TopicOutcome {
        let logger = TopicLogger::new(topic, "full_pipeline");
        let span = logger.create_span();

        async {
            logger.log_start(&topic.title);
            let outcome = match self.run_stages(topic, workflow_id, &logger).await {
                Ok(()) => finished_outcome(topic),
                Err(e) => self.fail_topic(topic, workflow_id, &logger, e).await,
            };
            record_topic_outcome(topic.status.as_str());
            logger.log_completion(&format!("status={}", topic.status));
            outcome
        }
        .instrument(span)
        .await
    }

    async fn run_stages(
        &self,
        topic: &mut Topic,
        workflow_id: Option<&str>,
        logger: &TopicLogger,
    ) -> PipelineResult<()> {
        let started = Instant::now();
        self.script_stage(topic, logger).await?;
        topic.advance(TopicStatus::ScriptGenerated)?;
        record_stage("script", elapsed_ms(started));
        self.persist_and_notify(topic, workflow_id, logger).await;

        if !topic.has_script() {
            logger.log_warning("Script is empty, aborting topic");
            topic.advance(TopicStatus::ScriptTooShort)?;
            self.persist_and_notify(topic, workflow_id, logger).await;
            return Ok(());
        }

        let folder = self
            .services
            .local
            .topic_folder(topic.topic_id.as_str(), &topic.title)
            .await?;

        let started = Instant::now();
        self.audio_stage(topic, &folder, logger).await?;
        topic.advance(TopicStatus::AudioGenerated)?;
        record_stage("audio", elapsed_ms(started));
        self.persist_and_notify(topic, workflow_id, logger).await;

        let started = Instant::now();
        let generated = self.image_stage(topic, &folder).await;
        if generated == 0 {
            logger.log_warning("No images generated, still attempting video");
            topic.advance(TopicStatus::ImagesFailed)?;
        } else {
            logger.log_progress(&format!("{} of {} images generated", generated, IMAGE_SLOTS));
            topic.advance(TopicStatus::ImagesGenerated)?;
        }
        record_stage("images", elapsed_ms(started));
        self.persist_and_notify(topic, workflow_id, logger).await;

        let started = Instant::now();
        self.video_stage(topic, &folder, logger).await?;
        record_stage("video", elapsed_ms(started));
        self.persist_and_notify(topic, workflow_id, logger).await;

        if topic.status == TopicStatus::VideoGenerated {
            if video_link_valid(&topic.video_link) {
                topic.advance(TopicStatus::Completed)?;
            } else {
                logger.log_warning("Video link could not be confirmed, not marking completed");
                topic.advance(TopicStatus::VideoFailed)?;
            }
        } else {
            logger.log_warning("Video not confirmed, keeping failure status");
        }
        self.persist_and_notify(topic, workflow_id, logger).await;
        Ok(())
    }

    /// Fill script, prompts, caption and hashtags.
    async fn script_stage(&self, topic: &mut Topic, logger: &TopicLogger) -> PipelineResult<()> {
        if topic.has_script() {
            logger.log_progress("Using provided script");
            if let Some(labels) = extract_scene_labels(&topic.script) {
                topic.script = labels.cleaned_script;
                if topic.image_prompts.is_empty() {
                    topic.image_prompts = labels.prompts;
                }
            }
        } else {
            logger.log_progress("Generating script");
            let llm = &self.services.llm;
            let response = match llm.generate(&script_prompt(topic), ResponseFormat::Json).await {
                Ok(response) => response,
                Err(failure) => {
                    self.log_usage(topic, llm.name(), failure.error().status_code(), 0).await;
                    return Err(PipelineError::script_failed(failure.to_string()));
                }
            };
            self.log_usage(topic, llm.name(), 200, response.total_tokens).await;

            let content = parse_script_response(&response.text, &topic.title);
            topic.script = content.script;
            topic.voice_style = content.voice_style;
            topic.caption = content.caption;
            topic.hashtags = content.hashtags;
            if topic.image_prompts.is_empty() {
                topic.image_prompts = content.image_prompts;
            }
        }

        if topic.voice_style.trim().is_empty() {
            topic.voice_style = DEFAULT_VOICE_STYLE.to_string();
        }
        if topic.image_prompts.is_empty() && topic.has_script() {
            topic.image_prompts = self.deriver.derive(&topic.script).await;
        }
        while topic.image_prompts.len() < IMAGE_SLOTS {
            topic.image_prompts.push(format!("Educational visual about {}", topic.title));
        }
        topic.image_prompts.truncate(IMAGE_SLOTS);
        Ok(())
    }

    async fn audio_stage(&self, topic: &mut Topic, folder: &Path, logger: &TopicLogger) -> PipelineResult<()> {
        let plan = SpeechPlan::for_script(
            &topic.script,
            &topic.language,
            &topic.voice_gender,
            topic.audio_speaking_rate,
        );
        logger.log_progress(&format!("Synthesizing speech with voice {}", plan.voice.name));

        let tts = &self.services.tts;
        let audio = match tts.synthesize(&plan).await {
            Ok(audio) => audio,
            Err(failure) => {
                self.log_usage(topic, tts.name(), failure.error().status_code(), 0).await;
                return Err(PipelineError::audio_failed(failure.to_string()));
            }
        };
        self.log_usage(topic, tts.name(), 200, 0).await;

        let name = format!("audio_{}_{}.mp3", topic.topic_id, Utc::now().timestamp());
        let path = self.services.local.write_file(folder, &name, &audio).await?;
        topic.audio_link = upload_or_local(self.services.uploader.as_ref(), &path, AssetKind::Audio).await;
        topic.tts_voice_name = plan.voice.name.to_string();
        topic.tts_language_code = plan.voice.language_code.to_string();
        Ok(())
    }

    /// Fill all four slots; returns how many hold a real image.
    async fn image_stage(&self, topic: &mut Topic, folder: &Path) -> usize {
        let topic_id = topic.topic_id.to_string();
        let prompts = topic.image_prompts.clone();

        for (index, prompt) in prompts.iter().enumerate().take(IMAGE_SLOTS) {
            let outcome = self
                .services
                .images
                .generate_slot(SlotRequest {
                    topic_id: &topic_id,
                    slot: index + 1,
                    prompt,
                    width: topic.image_width,
                    height: topic.image_height,
                    folder,
                })
                .await;
            for attempt in &outcome.attempts {
                self.log_usage(topic, attempt.provider, attempt.status_code, 0).await;
            }
            topic.images[index] = outcome.slot;
        }

        topic.images.iter().filter(|slot| slot.is_generated()).count()
    }

    /// Sets `VideoGenerated` or `VideoFailed`; assembly errors never escape.
    async fn video_stage(&self, topic: &mut Topic, folder: &Path, logger: &TopicLogger) -> PipelineResult<()> {
        let topic_id = topic.topic_id.to_string();
        let images = topic.generated_image_links();
        let request = AssemblyRequest {
            topic_id: &topic_id,
            title: &topic.title,
            audio: &topic.audio_link,
            images: &images,
            output_dir: folder,
        };

        let result = self
            .services
            .video
            .render(&request, self.services.uploader.as_ref())
            .await;

        match result {
            Ok(output) if !output.is_placeholder() => {
                topic.video_link = output.link();
                logger.log_progress(&format!("Video ready at {}", topic.video_link));
                topic.advance(TopicStatus::VideoGenerated)?;
            }
            Ok(output) => {
                topic.video_link = output.link();
                logger.log_warning("Encoder unavailable, wrote placeholder instead of video");
                topic.advance(TopicStatus::VideoFailed)?;
            }
            Err(e) => {
                let message = format!("Video generation failed: {}", e);
                logger.log_warning(&message);
                self.log_error(topic, &message).await;
                topic.video_link = message;
                topic.advance(TopicStatus::VideoFailed)?;
            }
        }
        Ok(())
    }

    async fn fail_topic(
        &self,
        topic: &mut Topic,
        workflow_id: Option<&str>,
        logger: &TopicLogger,
        error: PipelineError,
    ) -> TopicOutcome {
        let message = error.to_string();
        logger.log_error(&message);
        self.log_error(topic, &message).await;

        if let Err(e) = topic.advance(TopicStatus::Failed) {
            logger.log_warning(&format!("Could not mark topic failed: {}", e));
        }
        self.persist_and_notify(topic, workflow_id, logger).await;

        TopicOutcome {
            success: false,
            topic_id: topic.topic_id.to_string(),
            title: topic.title.clone(),
            status: topic.status.as_str().to_string(),
            video_link: topic.video_link.clone(),
            tts_voice_name: topic.tts_voice_name.clone(),
            tts_language_code: topic.tts_language_code.clone(),
            error: Some(message),
            message: format!("Pipeline failed for topic: {}", topic.title),
        }
    }

    /// Store write failures are logged and never abort the topic.
    async fn persist_and_notify(&self, topic: &Topic, workflow_id: Option<&str>, logger: &TopicLogger) {
        if let Err(e) = self.services.store.update_topic(topic).await {
            logger.log_warning(&format!("Failed to persist topic snapshot: {}", e));
        }
        if let Some(workflow_id) = workflow_id {
            self.services.notifier.notify(workflow_id, topic.status.as_str()).await;
        }
    }

    async fn log_usage(&self, topic: &Topic, provider: &str, status_code: u16, tokens: u64) {
        if let Err(e) = self
            .services
            .store
            .log_api_usage(topic.run_id.as_str(), topic.topic_id.as_str(), provider, status_code, tokens)
            .await
        {
            tracing::warn!(topic_id = %topic.topic_id, provider, "Failed to log API usage: {}", e);
        }
    }

    async fn log_error(&self, topic: &Topic, message: &str) {
        if let Err(e) = self
            .services
            .store
            .log_error(topic.run_id.as_str(), topic.topic_id.as_str(), message)
            .await
        {
            tracing::warn!(topic_id = %topic.topic_id, "Failed to log error: {}", e);
        }
    }
}

fn finished_outcome(topic: &Topic) -> TopicOutcome {
    let (success, error, message) = match topic.status {
        TopicStatus::ScriptTooShort => (
            false,
            Some(TopicStatus::ScriptTooShort.as_str().to_string()),
            format!("Pipeline aborted due to empty/short script: {}", topic.title),
        ),
        _ => (
            true,
            None,
            format!("Successfully completed full pipeline for topic: {}", topic.title),
        ),
    };
    TopicOutcome {
        success,
        topic_id: topic.topic_id.to_string(),
        title: topic.title.clone(),
        status: topic.status.as_str().to_string(),
        video_link: topic.video_link.clone(),
        tts_voice_name: topic.tts_voice_name.clone(),
        tts_language_code: topic.tts_language_code.clone(),
        error,
        message,
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}
