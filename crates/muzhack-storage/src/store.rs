//! Artifact store contract.

use std::path::Path;

use async_trait::async_trait;

use crate::error::StorageResult;

/// Object storage that persists and publishes derived files.
///
/// Both operations must be safe to repeat with the same arguments; callers
/// never retry on their own.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Upload a local file to `remote_path`.
    async fn upload(&self, local_path: &Path, remote_path: &str, content_type: &str) -> StorageResult<()>;

    /// Make `remote_path` publicly readable and return its public URL.
    async fn make_public(&self, remote_path: &str) -> StorageResult<String>;

    /// Check that the store is reachable.
    async fn check_connectivity(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// MIME type for an artifact, derived from its file extension.
pub fn content_type_for(path: &str) -> &'static str {
    let ext = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "pdf" => "application/pdf",
        "md" => "text/markdown",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("u/p/photo-thumb.PNG"), "image/png");
        assert_eq!(content_type_for("photo.jpeg"), "image/jpeg");
        assert_eq!(content_type_for("projects/p1/instructions.pdf"), "application/pdf");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
    }
}
