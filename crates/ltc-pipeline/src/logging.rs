//! Structured topic logging.
//!
//! Every line carries the topic and run identifiers plus the stage being
//! executed, so a single topic can be followed across a batch.

use tracing::{error, info, warn, Span};

use ltc_models::Topic;

#[derive(Debug, Clone)]
pub struct TopicLogger {
    topic_id: String,
    run_id: String,
    operation: String,
}

impl TopicLogger {
    pub fn new(topic: &Topic, operation: &str) -> Self {
        Self {
            topic_id: topic.topic_id.to_string(),
            run_id: topic.run_id.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn from_ids(topic_id: &str, run_id: &str, operation: &str) -> Self {
        Self {
            topic_id: topic_id.to_string(),
            run_id: run_id.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            topic_id = %self.topic_id,
            run_id = %self.run_id,
            operation = %self.operation,
            "Topic started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            topic_id = %self.topic_id,
            run_id = %self.run_id,
            operation = %self.operation,
            "Topic progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            topic_id = %self.topic_id,
            run_id = %self.run_id,
            operation = %self.operation,
            "Topic warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            topic_id = %self.topic_id,
            run_id = %self.run_id,
            operation = %self.operation,
            "Topic error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            topic_id = %self.topic_id,
            run_id = %self.run_id,
            operation = %self.operation,
            "Topic completed: {}", message
        );
    }

    pub fn topic_id(&self) -> &str {
        &self.topic_id
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Span wrapping one topic's pipeline run.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "topic_pipeline",
            topic_id = %self.topic_id,
            run_id = %self.run_id,
            operation = %self.operation
        )
    }
}
