//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during picture composition or document rendering.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Renderer not found in PATH: {0}")]
    RendererNotFound(String),

    #[error("Renderer failed: {message}")]
    RenderFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("Renderer produced no output at {0}")]
    RenderOutputMissing(PathBuf),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Failed to encode image {path}: {message}")]
    ImageEncode { path: PathBuf, message: String },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    /// Create a renderer failure error.
    pub fn render_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::RenderFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create an invalid image error.
    pub fn invalid_image(message: impl Into<String>) -> Self {
        Self::InvalidImage(message.into())
    }

    /// Whether this error came from the external renderer.
    pub fn is_render_error(&self) -> bool {
        matches!(
            self,
            MediaError::RendererNotFound(_)
                | MediaError::RenderFailed { .. }
                | MediaError::RenderOutputMissing(_)
                | MediaError::Timeout(_)
        )
    }
}
