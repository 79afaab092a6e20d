//! Prometheus metrics for the API server.

use std::sync::LazyLock;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use regex::Regex;

/// Install the Prometheus recorder and return its render handle.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "ltc_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "ltc_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "ltc_http_requests_in_flight";

    // Workflow metrics
    pub const WORKFLOWS_ACCEPTED_TOTAL: &str = "ltc_workflows_accepted_total";
    pub const WORKFLOWS_FINISHED_TOTAL: &str = "ltc_workflows_finished_total";
    pub const WORKFLOWS_TRACKED: &str = "ltc_workflows_tracked";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "ltc_rate_limit_hits_total";
}

static WORKFLOW_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/workflow_[A-Za-z0-9_]+").unwrap());

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn record_workflow_accepted(input_type: &'static str) {
    counter!(names::WORKFLOWS_ACCEPTED_TOTAL, "input_type" => input_type).increment(1);
}

pub fn record_workflow_finished(status: &str) {
    let labels = [("status", status.to_string())];
    counter!(names::WORKFLOWS_FINISHED_TOTAL, &labels).increment(1);
}

pub fn set_workflows_tracked(count: usize) {
    gauge!(names::WORKFLOWS_TRACKED).set(count as f64);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", sanitize_path(endpoint))];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Collapse workflow ids so status polls share one label.
fn sanitize_path(path: &str) -> String {
    WORKFLOW_ID.replace_all(path, "/:workflow_id").into_owned()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(
            sanitize_path("/api/workflow/status/workflow_1730000000_3fa85f64"),
            "/api/workflow/status/:workflow_id"
        );
        assert_eq!(sanitize_path("/webhook/learning-to-content"), "/webhook/learning-to-content");
    }
}
