//! Pipeline metrics collection.

use metrics::{counter, histogram};

pub mod names {
    /// Topics reaching a terminal status, by status.
    pub const TOPICS_TOTAL: &str = "ltc_pipeline_topics_total";

    /// Stage duration in seconds by stage.
    pub const STAGE_SECONDS: &str = "ltc_pipeline_stage_seconds";

    /// Image slots where every provider failed.
    pub const IMAGE_FALLBACK_EXHAUSTED_TOTAL: &str = "ltc_pipeline_image_fallback_exhausted_total";

    /// Image slots filled, by provider.
    pub const IMAGES_TOTAL: &str = "ltc_pipeline_images_total";

    /// Runs processed, by input mode and response status.
    pub const RUNS_TOTAL: &str = "ltc_pipeline_runs_total";
}

pub fn record_topic_outcome(status: &str) {
    counter!(names::TOPICS_TOTAL, "status" => status.to_string()).increment(1);
}

pub fn record_stage(stage: &'static str, duration_ms: f64) {
    histogram!(names::STAGE_SECONDS, "stage" => stage).record(duration_ms / 1000.0);
}

pub fn record_image(provider: &str) {
    counter!(names::IMAGES_TOTAL, "provider" => provider.to_string()).increment(1);
}

pub fn record_image_fallback_exhausted() {
    counter!(names::IMAGE_FALLBACK_EXHAUSTED_TOTAL).increment(1);
}

pub fn record_run(mode: &'static str, status: u16) {
    counter!(
        names::RUNS_TOTAL,
        "mode" => mode,
        "status" => status.to_string()
    )
    .increment(1);
}
