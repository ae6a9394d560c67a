//! Application state.

use std::sync::Arc;

use muzhack_media::DocumentRenderer;
use muzhack_storage::{ArtifactStore, S3ArtifactStore, StorageSettings};
use muzhack_worker::{JobExecutor, JobProcessor, WorkerConfig, WorkerResult};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub executor: JobExecutor,
    pub store: Arc<dyn ArtifactStore>,
    pub renderer: Arc<dyn DocumentRenderer>,
}

impl AppState {
    /// Create state backed by S3 storage and the configured renderer.
    pub fn new(
        config: ApiConfig,
        worker_config: &WorkerConfig,
        settings: StorageSettings,
    ) -> WorkerResult<Self> {
        let store: Arc<dyn ArtifactStore> = Arc::new(S3ArtifactStore::new(settings));
        let renderer = JobProcessor::renderer_from_config(worker_config);
        Self::with_collaborators(config, worker_config, store, renderer)
    }

    /// Create state around explicit storage and renderer implementations.
    pub fn with_collaborators(
        config: ApiConfig,
        worker_config: &WorkerConfig,
        store: Arc<dyn ArtifactStore>,
        renderer: Arc<dyn DocumentRenderer>,
    ) -> WorkerResult<Self> {
        let processor = JobProcessor::from_config(worker_config, Arc::clone(&store), Arc::clone(&renderer))?;
        let executor = JobExecutor::new(processor, worker_config.max_concurrent_jobs);

        Ok(Self {
            config,
            executor,
            store,
            renderer,
        })
    }
}
