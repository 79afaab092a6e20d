//! Provider call metrics.

use metrics::{counter, histogram};

pub mod names {
    /// Provider calls by provider and outcome (`ok`, `retryable`, `fatal`).
    pub const CALLS_TOTAL: &str = "ltc_provider_calls_total";

    /// Provider call latency in seconds.
    pub const LATENCY_SECONDS: &str = "ltc_provider_latency_seconds";
}

pub fn record_call(provider: &'static str, outcome: &'static str, latency_ms: f64) {
    counter!(
        names::CALLS_TOTAL,
        "provider" => provider,
        "outcome" => outcome
    )
    .increment(1);

    histogram!(names::LATENCY_SECONDS, "provider" => provider).record(latency_ms / 1000.0);
}
