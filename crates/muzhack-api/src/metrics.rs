//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Install the Prometheus recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "muzhack_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "muzhack_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "muzhack_http_requests_in_flight";

    // Job responses, labelled with the outcome kind
    pub const JOB_RESPONSES_TOTAL: &str = "muzhack_job_responses_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", route_label(path).to_string()),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record the outcome of one `POST /jobs`.
pub fn record_job_response(outcome: &str) {
    let labels = [("outcome", outcome.to_string())];
    counter!(names::JOB_RESPONSES_TOTAL, &labels).increment(1);
}

/// Collapse unknown paths so label cardinality stays bounded.
fn route_label(path: &str) -> &'static str {
    match path {
        "/jobs" => "/jobs",
        "/health" => "/health",
        "/healthz" => "/healthz",
        "/ready" => "/ready",
        "/metrics" => "/metrics",
        _ => "other",
    }
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
    fn test_route_label() {
        assert_eq!(route_label("/jobs"), "/jobs");
        assert_eq!(route_label("/ready"), "/ready");
        assert_eq!(route_label("/jobs/../etc/passwd"), "other");
    }
}
