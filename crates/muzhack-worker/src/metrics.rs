//! Job pipeline metrics.
//!
//! Recorded through the `metrics` facade; the API process installs the
//! Prometheus recorder that exports them.

use std::time::Duration;

use metrics::{counter, gauge, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const JOBS_STARTED_TOTAL: &str = "muzhack_jobs_started_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "muzhack_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "muzhack_jobs_failed_total";
    pub const JOBS_IN_FLIGHT: &str = "muzhack_jobs_in_flight";
    pub const JOB_DURATION_SECONDS: &str = "muzhack_job_duration_seconds";

    pub const PICTURES_PROCESSED_TOTAL: &str = "muzhack_pictures_processed_total";
    pub const RENDER_DURATION_SECONDS: &str = "muzhack_render_duration_seconds";
    pub const STALE_WORKSPACES_REMOVED_TOTAL: &str = "muzhack_stale_workspaces_removed_total";
}

pub fn record_job_started() {
    counter!(names::JOBS_STARTED_TOTAL).increment(1);
}

pub fn record_job_completed(duration: Duration) {
    counter!(names::JOBS_COMPLETED_TOTAL).increment(1);
    histogram!(names::JOB_DURATION_SECONDS).record(duration.as_secs_f64());
}

/// Record a failed job, labelled with the error kind.
pub fn record_job_failed(kind: &str) {
    let labels = [("kind", kind.to_string())];
    counter!(names::JOBS_FAILED_TOTAL, &labels).increment(1);
}

pub fn set_jobs_in_flight(count: usize) {
    gauge!(names::JOBS_IN_FLIGHT).set(count as f64);
}

pub fn record_picture_processed() {
    counter!(names::PICTURES_PROCESSED_TOTAL).increment(1);
}

pub fn record_render_duration(duration: Duration) {
    histogram!(names::RENDER_DURATION_SECONDS).record(duration.as_secs_f64());
}

pub fn record_stale_workspaces_removed(count: usize) {
    if count > 0 {
        counter!(names::STALE_WORKSPACES_REMOVED_TOTAL).increment(count as u64);
    }
}
