//! Learning-to-content pipeline.
//!
//! This crate provides:
//! - Run coordination: authorisation, topic extraction and insertion
//! - Per-topic orchestration through script, audio, images and video
//! - Prompt construction and LLM response parsing
//! - The image provider fallback chain

pub mod config;
pub mod coordinator;
pub mod error;
pub mod image_prompts;
pub mod images;
pub mod logging;
pub mod metrics;
pub mod notifier;
pub mod orchestrator;
pub mod prompts;
pub mod script;
pub mod topics;
pub mod video;

#[cfg(test)]
mod testing;

pub use config::PipelineConfig;
pub use coordinator::{RunCoordinator, WEBHOOK_SECRET_HEADER};
pub use error::{PipelineError, PipelineResult};
pub use image_prompts::{genre_prefix, ImagePromptDeriver};
pub use images::{ImageGenerator, SlotOutcome, SlotRequest};
pub use logging::TopicLogger;
pub use notifier::{NoopNotifier, StatusNotifier};
pub use orchestrator::{PipelineOrchestrator, PipelineServices, TopicOutcome};
pub use script::{extract_scene_labels, parse_script_response, ScriptContent};
pub use topics::{parse_topics, TopicDraft};
pub use video::VideoRenderer;
