//! Project asset job pipeline.
//!
//! This crate provides:
//! - The job registry (in-process or shared through Redis)
//! - Workspace lifecycle with stale directory reclamation
//! - Picture and document pipelines
//! - The job orchestrator and a bounded job executor

pub mod config;
pub mod document;
pub mod error;
pub mod executor;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod picture;
pub mod registry;
pub mod workspace;

pub use config::{DocumentDelivery, PictureUrlConvention, RegistryBackend, WorkerConfig};
pub use document::DocumentPipeline;
pub use error::{FetchError, WorkerError, WorkerResult};
pub use executor::JobExecutor;
pub use logging::JobLogger;
pub use orchestrator::JobProcessor;
pub use picture::PicturePipeline;
pub use registry::{build_registry, InMemoryJobRegistry, JobRegistry, RedisJobRegistry, RegistryError};
pub use workspace::{SweepReport, WorkspaceError, WorkspaceManager};
