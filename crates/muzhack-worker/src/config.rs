//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

/// How the rendered document is handed back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentDelivery {
    /// Embed the rendered bytes (base64) in the job result
    #[default]
    Inline,
    /// Upload to the artifact store and return its path and URL
    Upload,
}

impl DocumentDelivery {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inline" => Some(Self::Inline),
            "upload" => Some(Self::Upload),
            _ => None,
        }
    }
}

/// Which URLs a picture result reports for its derived variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PictureUrlConvention {
    /// Public URLs reported by the artifact store for the uploaded files
    #[default]
    Uploaded,
    /// Source URL with `-{suffix}` inserted before the extension.
    /// Only correct when the store mirrors the source URL layout.
    SourceMirror,
}

impl PictureUrlConvention {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uploaded" => Some(Self::Uploaded),
            "source-mirror" | "source_mirror" => Some(Self::SourceMirror),
            _ => None,
        }
    }
}

/// Where the set of in-flight job ids lives.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RegistryBackend {
    /// Process-local set; enough when a single process runs jobs
    #[default]
    Memory,
    /// Redis keys shared by every worker process
    Redis { url: String },
}

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum concurrent jobs
    pub max_concurrent_jobs: usize,
    /// Maximum pictures processed in parallel within a single job
    pub max_picture_parallel: usize,
    /// Base directory holding one workspace per in-flight job
    pub work_dir: PathBuf,
    /// Timeout for downloading one source picture
    pub fetch_timeout: Duration,
    /// Timeout for one renderer invocation
    pub render_timeout: Duration,
    /// Renderer executable
    pub renderer_program: String,
    /// Extra renderer arguments
    pub renderer_args: Vec<String>,
    /// Document delivery policy
    pub document_delivery: DocumentDelivery,
    /// Picture result URL policy
    pub picture_urls: PictureUrlConvention,
    /// Job registry backend
    pub registry: RegistryBackend,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 1,
            max_picture_parallel: 1,
            work_dir: PathBuf::from("/tmp/muzhack/projects"),
            fetch_timeout: Duration::from_secs(60),
            render_timeout: Duration::from_secs(120),
            renderer_program: "pandoc".to_string(),
            renderer_args: Vec::new(),
            document_delivery: DocumentDelivery::default(),
            picture_urls: PictureUrlConvention::default(),
            registry: RegistryBackend::default(),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let registry = match std::env::var("JOB_REGISTRY").ok().as_deref() {
            Some("redis") => RegistryBackend::Redis {
                url: std::env::var("REDIS_URL")
                    .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            },
            _ => RegistryBackend::Memory,
        };

        Self {
            max_concurrent_jobs: std::env::var("WORKER_MAX_JOBS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_concurrent_jobs),
            max_picture_parallel: std::env::var("WORKER_MAX_PICTURE_PARALLEL")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_picture_parallel),
            work_dir: std::env::var("WORKER_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            fetch_timeout: Duration::from_secs(
                std::env::var("WORKER_FETCH_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
            render_timeout: Duration::from_secs(
                std::env::var("WORKER_RENDER_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
            ),
            renderer_program: std::env::var("RENDERER_PROGRAM")
                .unwrap_or(defaults.renderer_program),
            renderer_args: std::env::var("RENDERER_ARGS")
                .map(|s| s.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
            document_delivery: std::env::var("DOCUMENT_DELIVERY")
                .ok()
                .and_then(|s| DocumentDelivery::parse(&s))
                .unwrap_or_default(),
            picture_urls: std::env::var("PICTURE_URL_CONVENTION")
                .ok()
                .and_then(|s| PictureUrlConvention::parse(&s))
                .unwrap_or_default(),
            registry,
        }
    }
}
