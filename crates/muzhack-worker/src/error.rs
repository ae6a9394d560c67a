//! Worker error types.

use thiserror::Error;

use muzhack_media::MediaError;
use muzhack_models::ValidationError;
use muzhack_storage::StorageError;

use crate::registry::RegistryError;
use crate::workspace::WorkspaceError;

pub type WorkerResult<T> = Result<T, WorkerError>;

/// Failure to download a source picture.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{url} not found")]
    NotFound { url: String },

    #[error("transfer of {url} failed: {message}")]
    Transfer {
        url: String,
        status: Option<u16>,
        message: String,
    },
}

impl FetchError {
    pub fn not_found(url: impl Into<String>) -> Self {
        Self::NotFound { url: url.into() }
    }

    pub fn transfer(url: impl Into<String>, status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Transfer {
            url: url.into(),
            status,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Invalid image {name}: {message}")]
    InvalidImage { name: String, message: String },

    #[error("Render failed: {0}")]
    Render(MediaError),

    #[error("Upload failed: {0}")]
    Upload(#[from] StorageError),

    #[error("Workspace already exists for job {0}")]
    WorkspaceConflict(String),

    #[error("Job {0} is already being processed")]
    DuplicateJob(String),

    #[error("Invalid job: {0}")]
    InvalidJob(#[from] ValidationError),

    #[error("Job registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Media error: {0}")]
    Media(MediaError),

    #[error("Job failed: {0}")]
    JobFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn job_failed(msg: impl Into<String>) -> Self {
        Self::JobFailed(msg.into())
    }

    pub fn invalid_image(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidImage {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Classify a media error raised while composing picture `name`.
    pub fn from_compose(name: &str, err: MediaError) -> Self {
        match err {
            MediaError::InvalidImage(message) => Self::invalid_image(name, message),
            other => Self::Media(other),
        }
    }

    /// Stable identifier of the error kind, surfaced to API clients.
    pub fn kind(&self) -> &'static str {
        match self {
            WorkerError::Fetch(FetchError::NotFound { .. }) => "FetchError.NotFound",
            WorkerError::Fetch(FetchError::Transfer { .. }) => "FetchError.TransferError",
            WorkerError::InvalidImage { .. } => "InvalidImage",
            WorkerError::Render(_) => "RenderError",
            WorkerError::Upload(_) => "UploadError",
            WorkerError::WorkspaceConflict(_) => "WorkspaceConflict",
            WorkerError::DuplicateJob(_) => "DuplicateJob",
            WorkerError::InvalidJob(_) => "InvalidJob",
            WorkerError::Registry(_)
            | WorkerError::Media(_)
            | WorkerError::JobFailed(_)
            | WorkerError::Io(_) => "InternalError",
        }
    }
}

impl From<WorkspaceError> for WorkerError {
    fn from(err: WorkspaceError) -> Self {
        match err {
            WorkspaceError::Conflict(id) => WorkerError::WorkspaceConflict(id),
            WorkspaceError::InvalidId(id) => {
                WorkerError::InvalidJob(ValidationError::InvalidJobId(id))
            }
            WorkspaceError::Registry(e) => WorkerError::Registry(e),
            WorkspaceError::Io(e) => WorkerError::Io(e),
            stale @ WorkspaceError::StaleCleanup { .. } => WorkerError::job_failed(stale.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(
            WorkerError::from(FetchError::not_found("https://x/a.png")).kind(),
            "FetchError.NotFound"
        );
        assert_eq!(
            WorkerError::from(FetchError::transfer("https://x/a.png", Some(500), "boom")).kind(),
            "FetchError.TransferError"
        );
        assert_eq!(
            WorkerError::Render(MediaError::render_failed("exit 1", None, Some(1))).kind(),
            "RenderError"
        );
        assert_eq!(
            WorkerError::from(StorageError::upload_failed("denied")).kind(),
            "UploadError"
        );
        assert_eq!(WorkerError::DuplicateJob("p1".into()).kind(), "DuplicateJob");
    }

    #[test]
    fn test_compose_classification() {
        let err = WorkerError::from_compose("a.png", MediaError::invalid_image("zero height"));
        assert_eq!(err.kind(), "InvalidImage");
        assert!(err.to_string().contains("a.png"));

        let err = WorkerError::from_compose("a.png", MediaError::UnsupportedFormat("a".into()));
        assert_eq!(err.kind(), "InternalError");
    }

    #[test]
    fn test_workspace_conflict_conversion() {
        let err = WorkerError::from(WorkspaceError::Conflict("p1".into()));
        assert_eq!(err.kind(), "WorkspaceConflict");
    }
}
