//! Per-job workspace lifecycle.
//!
//! Every in-flight job owns one directory under the base directory, named
//! after its id. Directories are not deleted on release; the next `acquire`
//! sweeps every entry whose name is not a registered job id, which also
//! reclaims workspaces orphaned by a crash.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use muzhack_models::JobId;

use crate::metrics;
use crate::registry::{JobRegistry, RegistryError};

pub type WorkspaceResult<T> = Result<T, WorkspaceError>;

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("invalid job id {0:?}")]
    InvalidId(String),

    #[error("workspace for job {0} already exists")]
    Conflict(String),

    /// Failure to remove one stale entry; logged, never returned by `acquire`.
    #[error("failed to remove stale workspace {}: {source}", path.display())]
    StaleCleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("job registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of one stale workspace sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub removed: usize,
    pub kept: usize,
    pub failed: usize,
}

/// Deletes one stale entry of the base directory.
type EntryRemover = fn(PathBuf) -> BoxFuture<'static, std::io::Result<()>>;

/// Owns the per-job directories under one base directory.
pub struct WorkspaceManager {
    base_dir: PathBuf,
    registry: Arc<dyn JobRegistry>,
    /// Serializes sweep, registration and creation within this process so a
    /// sweep never removes a directory created after its registry snapshot.
    acquire_lock: Mutex<()>,
    remove_entry: EntryRemover,
}

impl WorkspaceManager {
    pub fn new(base_dir: impl Into<PathBuf>, registry: Arc<dyn JobRegistry>) -> Self {
        Self {
            base_dir: base_dir.into(),
            registry,
            acquire_lock: Mutex::new(()),
            remove_entry: |path| remove_entry(path).boxed(),
        }
    }

    #[cfg(test)]
    fn with_remover(mut self, remove_entry: EntryRemover) -> Self {
        self.remove_entry = remove_entry;
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn registry(&self) -> &Arc<dyn JobRegistry> {
        &self.registry
    }

    /// Directory used by `job_id`, whether or not it exists.
    pub fn workspace_path(&self, job_id: &JobId) -> PathBuf {
        self.base_dir.join(job_id.as_str())
    }

    /// Sweep stale entries, register `job_id` and create its workspace.
    pub async fn acquire(&self, job_id: &JobId) -> WorkspaceResult<PathBuf> {
        if !job_id.is_valid() {
            return Err(WorkspaceError::InvalidId(job_id.to_string()));
        }

        let _guard = self.acquire_lock.lock().await;

        tokio::fs::create_dir_all(&self.base_dir).await?;

        // Sweep before registering so the new job's own leftovers are reclaimed.
        let report = self.sweep_stale().await?;
        if report.removed > 0 || report.failed > 0 {
            info!(
                removed = report.removed,
                kept = report.kept,
                failed = report.failed,
                "Swept stale workspaces"
            );
        }

        if !self.registry.try_register(job_id).await? {
            return Err(WorkspaceError::Conflict(job_id.to_string()));
        }

        let path = self.workspace_path(job_id);
        match tokio::fs::create_dir(&path).await {
            Ok(()) => {
                debug!(job_id = %job_id, "Created workspace {}", path.display());
                Ok(path)
            }
            Err(e) => {
                self.unregister_quietly(job_id).await;
                if e.kind() == ErrorKind::AlreadyExists {
                    Err(WorkspaceError::Conflict(job_id.to_string()))
                } else {
                    Err(WorkspaceError::Io(e))
                }
            }
        }
    }

    /// Mark `job_id` as finished. Its directory is reclaimed by a later sweep.
    pub async fn release(&self, job_id: &JobId) -> WorkspaceResult<()> {
        self.registry.unregister(job_id).await?;
        debug!(job_id = %job_id, "Released workspace");
        Ok(())
    }

    /// Remove every entry of the base directory that is not a registered job.
    ///
    /// Per-entry failures are logged and counted; they never fail the sweep.
    pub async fn sweep_stale(&self) -> WorkspaceResult<SweepReport> {
        let mut entries = Vec::new();
        let mut dir = match tokio::fs::read_dir(&self.base_dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(SweepReport::default()),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = dir.next_entry().await? {
            entries.push(entry);
        }

        // Snapshot after listing: any directory seen above was registered first.
        let registered: HashSet<String> = self.registry.registered().await?;

        let mut report = SweepReport::default();
        for entry in entries {
            let name = entry.file_name().to_string_lossy().into_owned();
            if registered.contains(&name) {
                report.kept += 1;
                continue;
            }

            let path = entry.path();
            match (self.remove_entry)(path.clone()).await {
                Ok(()) => {
                    debug!("Removed stale workspace {}", path.display());
                    report.removed += 1;
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(source) => {
                    let err = WorkspaceError::StaleCleanup { path, source };
                    warn!("{}", err);
                    report.failed += 1;
                }
            }
        }

        metrics::record_stale_workspaces_removed(report.removed);
        Ok(report)
    }

    /// Check that the base directory exists and accepts writes.
    pub async fn check_writable(&self) -> WorkspaceResult<()> {
        tokio::fs::create_dir_all(&self.base_dir).await?;
        let probe = self.base_dir.join(".write-probe");
        tokio::fs::write(&probe, b"ok").await?;
        let _ = tokio::fs::remove_file(&probe).await;
        Ok(())
    }

    async fn unregister_quietly(&self, job_id: &JobId) {
        if let Err(e) = self.registry.unregister(job_id).await {
            warn!(job_id = %job_id, "Failed to unregister job: {}", e);
        }
    }
}

async fn remove_entry(path: PathBuf) -> std::io::Result<()> {
    let metadata = tokio::fs::symlink_metadata(&path).await?;
    if metadata.is_dir() {
        tokio::fs::remove_dir_all(&path).await
    } else {
        tokio::fs::remove_file(&path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::InMemoryJobRegistry;
    use tempfile::TempDir;

    fn manager(dir: &TempDir) -> WorkspaceManager {
        WorkspaceManager::new(dir.path().join("projects"), Arc::new(InMemoryJobRegistry::new()))
    }

    #[tokio::test]
    async fn test_acquire_creates_workspace() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        let id = JobId::from("p1");

        let path = manager.acquire(&id).await.unwrap();
        assert!(path.is_dir());
        assert_eq!(path, dir.path().join("projects").join("p1"));
        assert!(manager.registry().registered().await.unwrap().contains("p1"));
    }

    #[tokio::test]
    async fn test_acquire_twice_conflicts() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        let id = JobId::from("p1");

        manager.acquire(&id).await.unwrap();
        let err = manager.acquire(&id).await.unwrap_err();
        assert!(matches!(err, WorkspaceError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_release_keeps_directory_until_next_sweep() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        let id = JobId::from("p1");

        let path = manager.acquire(&id).await.unwrap();
        tokio::fs::write(path.join("a.png"), b"x").await.unwrap();
        manager.release(&id).await.unwrap();
        assert!(path.exists());

        manager.acquire(&JobId::from("p2")).await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_reacquire_after_release() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        let id = JobId::from("p1");

        let path = manager.acquire(&id).await.unwrap();
        tokio::fs::write(path.join("old.png"), b"x").await.unwrap();
        manager.release(&id).await.unwrap();

        let path = manager.acquire(&id).await.unwrap();
        assert!(path.is_dir());
        assert!(!path.join("old.png").exists());
    }

    #[tokio::test]
    async fn test_sweep_removes_unregistered_entries() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        let base = manager.base_dir().to_path_buf();
        std::fs::create_dir_all(base.join("orphan/nested")).unwrap();
        std::fs::write(base.join("orphan/nested/a.png"), b"x").unwrap();
        std::fs::write(base.join("stray-file"), b"x").unwrap();

        manager.acquire(&JobId::from("live")).await.unwrap();

        let report = manager.sweep_stale().await.unwrap();
        assert_eq!(report, SweepReport { removed: 0, kept: 1, failed: 0 });
        assert!(!base.join("orphan").exists());
        assert!(!base.join("stray-file").exists());
        assert!(base.join("live").exists());
    }

    #[tokio::test]
    async fn test_sweep_missing_base_dir() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        assert_eq!(manager.sweep_stale().await.unwrap(), SweepReport::default());
    }

    #[tokio::test]
    async fn test_invalid_id_rejected() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);

        let err = manager.acquire(&JobId::from("../escape")).await.unwrap_err();
        assert!(matches!(err, WorkspaceError::InvalidId(_)));
        assert!(manager.registry().registered().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_stale_removal_does_not_block_acquire() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir).with_remover(|path| {
            async move {
                if path.ends_with("wedged") {
                    Err(std::io::Error::new(ErrorKind::PermissionDenied, "busy"))
                } else {
                    remove_entry(path).await
                }
            }
            .boxed()
        });
        let base = manager.base_dir().to_path_buf();
        tokio::fs::create_dir_all(base.join("wedged")).await.unwrap();
        tokio::fs::create_dir_all(base.join("crashed")).await.unwrap();

        let report = manager.sweep_stale().await.unwrap();
        assert_eq!(report, SweepReport { removed: 1, kept: 0, failed: 1 });
        assert!(base.join("wedged").exists());
        assert!(!base.join("crashed").exists());

        tokio::fs::create_dir_all(base.join("crashed-again")).await.unwrap();
        let path = manager.acquire(&JobId::from("p1")).await.unwrap();
        assert!(path.is_dir());
        assert!(base.join("wedged").exists());
        assert!(!base.join("crashed-again").exists());
    }

    #[tokio::test]
    async fn test_check_writable() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        manager.check_writable().await.unwrap();
        assert!(!manager.base_dir().join(".write-probe").exists());
    }
}
