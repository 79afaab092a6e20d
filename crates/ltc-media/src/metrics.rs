//! Video assembly metrics.

use metrics::{counter, histogram};

pub mod names {
    /// Assemblies by outcome (`video`, `placeholder`, `failed`).
    pub const ASSEMBLIES_TOTAL: &str = "ltc_video_assemblies_total";

    /// Encoder wall time in seconds.
    pub const ENCODE_SECONDS: &str = "ltc_video_encode_seconds";

    /// Inputs rejected by content validation, by kind.
    pub const INVALID_INPUTS_TOTAL: &str = "ltc_media_invalid_inputs_total";
}

pub fn record_assembly(outcome: &'static str) {
    counter!(names::ASSEMBLIES_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_encode(elapsed_ms: f64, image_count: usize) {
    histogram!(
        names::ENCODE_SECONDS,
        "images" => image_count.to_string()
    )
    .record(elapsed_ms / 1000.0);
}

pub fn record_invalid_input(kind: &'static str) {
    counter!(names::INVALID_INPUTS_TOTAL, "kind" => kind).increment(1);
}
