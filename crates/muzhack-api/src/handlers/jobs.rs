//! Job submission handler.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use tracing::{info, warn};

use muzhack_models::{Job, JobResult};
use muzhack_worker::WorkerError;

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Process one job and return its artifacts.
///
/// The request stays open until the job finishes; the job itself runs on the
/// executor, so a client that disconnects early does not cut it short.
pub async fn submit_job(
    State(state): State<AppState>,
    payload: Result<Json<Job>, JsonRejection>,
) -> ApiResult<Json<JobResult>> {
    let production = state.config.is_production();
    let Json(job) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    job.validate()
        .map_err(|e| ApiError::from(WorkerError::from(e)).redacted(production))?;

    info!(
        job_id = %job.id,
        pictures = job.pictures.len(),
        "Received job"
    );

    match state.executor.submit(job).await {
        Ok(result) => {
            metrics::record_job_response("ok");
            Ok(Json(result))
        }
        Err(e) => {
            warn!("Job failed: {} ({})", e, e.kind());
            metrics::record_job_response(e.kind());
            Err(ApiError::from(e).redacted(production))
        }
    }
}
