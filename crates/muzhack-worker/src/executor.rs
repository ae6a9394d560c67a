//! Bounded job executor.
//!
//! The front end hands jobs here. Each job runs on its own task behind a
//! semaphore permit, so the caller going away never interrupts a job halfway
//! (and never skips its workspace release).

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use muzhack_models::{Job, JobResult};

use crate::error::{WorkerError, WorkerResult};
use crate::metrics;
use crate::orchestrator::JobProcessor;

/// Runs at most `max_concurrent_jobs` jobs at a time.
#[derive(Clone)]
pub struct JobExecutor {
    processor: Arc<JobProcessor>,
    job_semaphore: Arc<Semaphore>,
    max_concurrent_jobs: usize,
}

impl JobExecutor {
    pub fn new(processor: JobProcessor, max_concurrent_jobs: usize) -> Self {
        let max_concurrent_jobs = max_concurrent_jobs.max(1);
        info!("Starting job executor with {} max concurrent jobs", max_concurrent_jobs);

        Self {
            processor: Arc::new(processor),
            job_semaphore: Arc::new(Semaphore::new(max_concurrent_jobs)),
            max_concurrent_jobs,
        }
    }

    pub fn processor(&self) -> &Arc<JobProcessor> {
        &self.processor
    }

    /// Run `job` once a slot is free and wait for its result.
    pub async fn submit(&self, job: Job) -> WorkerResult<JobResult> {
        let permit = Arc::clone(&self.job_semaphore)
            .acquire_owned()
            .await
            .map_err(|_| WorkerError::job_failed("executor is shut down"))?;
        metrics::set_jobs_in_flight(self.in_flight());

        let processor = Arc::clone(&self.processor);
        let semaphore = Arc::clone(&self.job_semaphore);
        let max = self.max_concurrent_jobs;
        let handle = tokio::spawn(async move {
            let result = processor.process(&job).await;
            drop(permit);
            metrics::set_jobs_in_flight(max - semaphore.available_permits());
            result
        });

        match handle.await {
            Ok(result) => result,
            Err(e) => {
                error!("Job task failed: {}", e);
                Err(WorkerError::job_failed(format!("job task failed: {}", e)))
            }
        }
    }

    pub fn available_slots(&self) -> usize {
        self.job_semaphore.available_permits()
    }

    pub fn in_flight(&self) -> usize {
        self.max_concurrent_jobs - self.available_slots()
    }

    /// Wait until no job is running, up to `timeout`.
    pub async fn wait_for_jobs(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let running = self.in_flight();
            if running == 0 {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                warn!("Timed out waiting for {} in-flight jobs", running);
                return false;
            }
            debug!("Waiting for {} in-flight jobs", running);
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}
