//! Job orchestrator.
//!
//! Drives one job through `Acquiring → Processing → RenderingDocument →
//! Releasing → Done`, moving to `Aborting` on the first error. The workspace
//! is released on every exit path, including a panic inside a stage.

use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt, TryStreamExt};
use futures::FutureExt;
use tracing::Instrument;

use muzhack_media::{DocumentRenderer, PandocRenderer};
use muzhack_models::{Job, JobResult, JobStage, PictureResult};
use muzhack_storage::ArtifactStore;

use crate::config::WorkerConfig;
use crate::document::DocumentPipeline;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::metrics;
use crate::picture::PicturePipeline;
use crate::registry::build_registry;
use crate::workspace::{WorkspaceError, WorkspaceManager};

const OPERATION: &str = "project_assets";

/// Processes jobs end to end.
pub struct JobProcessor {
    workspaces: WorkspaceManager,
    pictures: PicturePipeline,
    documents: DocumentPipeline,
    max_picture_parallel: usize,
}

impl JobProcessor {
    pub fn new(
        workspaces: WorkspaceManager,
        pictures: PicturePipeline,
        documents: DocumentPipeline,
        max_picture_parallel: usize,
    ) -> Self {
        Self {
            workspaces,
            pictures,
            documents,
            max_picture_parallel: max_picture_parallel.max(1),
        }
    }

    /// Wire a processor from configuration with the given collaborators.
    pub fn from_config(
        config: &WorkerConfig,
        store: Arc<dyn ArtifactStore>,
        renderer: Arc<dyn DocumentRenderer>,
    ) -> WorkerResult<Self> {
        let registry = build_registry(config)?;
        let workspaces = WorkspaceManager::new(config.work_dir.clone(), registry);
        let pictures = PicturePipeline::new(Arc::clone(&store), config.picture_urls, config.fetch_timeout)?;
        let documents = DocumentPipeline::new(renderer, store, config.document_delivery);

        Ok(Self::new(workspaces, pictures, documents, config.max_picture_parallel))
    }

    /// The renderer configured by `config`.
    pub fn renderer_from_config(config: &WorkerConfig) -> Arc<dyn DocumentRenderer> {
        Arc::new(
            PandocRenderer::new(&config.renderer_program)
                .with_args(config.renderer_args.clone())
                .with_timeout(config.render_timeout.as_secs()),
        )
    }

    pub fn workspaces(&self) -> &WorkspaceManager {
        &self.workspaces
    }

    /// Process one job. Either every artifact is produced or a single error
    /// is returned; there are no partial results.
    pub async fn process(&self, job: &Job) -> WorkerResult<JobResult> {
        let logger = JobLogger::new(&job.id, OPERATION);
        let span = logger.create_span();

        async {
            let started = Instant::now();
            metrics::record_job_started();
            logger.log_start(&format!("{} picture(s)", job.pictures.len()));

            let result = self.run(job, &logger).await;
            match &result {
                Ok(_) => {
                    metrics::record_job_completed(started.elapsed());
                    logger.log_stage(JobStage::Done);
                    logger.log_completion(&format!("in {} ms", started.elapsed().as_millis()));
                }
                Err(e) => {
                    metrics::record_job_failed(e.kind());
                    logger.log_error(&format!("{} ({})", e, e.kind()));
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run(&self, job: &Job, logger: &JobLogger) -> WorkerResult<JobResult> {
        job.validate()?;

        logger.log_stage(JobStage::Acquiring);
        let workspace = match self.workspaces.acquire(&job.id).await {
            Ok(path) => path,
            Err(WorkspaceError::Conflict(id)) => return Err(WorkerError::DuplicateJob(id)),
            Err(e) => return Err(e.into()),
        };

        let result = match AssertUnwindSafe(self.run_stages(&workspace, job, logger))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(_) => Err(WorkerError::job_failed("job stage panicked")),
        };

        if let Err(e) = &result {
            logger.log_stage(JobStage::Aborting);
            logger.log_warning(&format!("aborting: {}", e));
        }

        logger.log_stage(JobStage::Releasing);
        if let Err(e) = self.workspaces.release(&job.id).await {
            logger.log_warning(&format!("failed to release workspace: {}", e));
        }

        result
    }

    async fn run_stages(&self, workspace: &Path, job: &Job, logger: &JobLogger) -> WorkerResult<JobResult> {
        let total = job.pictures.len();

        // `buffered` keeps results in request order whatever the parallelism.
        let pictures: Vec<PictureResult> = stream::iter(0..total)
            .map(|index| {
                let picture = &job.pictures[index];
                logger.log_stage(JobStage::Processing { index, total });
                self.pictures.process(workspace, picture, logger)
            })
            .buffered(self.max_picture_parallel)
            .try_collect()
            .await?;

        logger.log_stage(JobStage::RenderingDocument);
        let document = self.documents.process(workspace, job, logger).await?;

        Ok(JobResult { pictures, document })
    }
}
