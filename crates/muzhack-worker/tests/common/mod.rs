//! Shared fixtures for worker integration tests.

#![allow(dead_code)]

use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

use muzhack_media::{DocumentRenderer, MediaResult};
use muzhack_storage::{ArtifactStore, StorageResult};
use muzhack_worker::{DocumentDelivery, JobProcessor, PictureUrlConvention, WorkerConfig};

pub const FAKE_PDF: &[u8] = b"%PDF-1.4 fake";

/// One recorded upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub remote_path: String,
    pub content_type: String,
}

/// Artifact store that records uploads and reports CDN-style URLs.
#[derive(Debug, Default)]
pub struct RecordingStore {
    uploads: Mutex<Vec<Upload>>,
}

impl RecordingStore {
    pub fn uploads(&self) -> Vec<Upload> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn remote_paths(&self) -> Vec<String> {
        self.uploads().into_iter().map(|u| u.remote_path).collect()
    }
}

#[async_trait]
impl ArtifactStore for RecordingStore {
    async fn upload(&self, local_path: &Path, remote_path: &str, content_type: &str) -> StorageResult<()> {
        assert!(local_path.exists(), "uploading missing file {}", local_path.display());
        self.uploads.lock().unwrap().push(Upload {
            remote_path: remote_path.to_string(),
            content_type: content_type.to_string(),
        });
        Ok(())
    }

    async fn make_public(&self, remote_path: &str) -> StorageResult<String> {
        Ok(format!("https://cdn.test/{}", remote_path))
    }
}

/// Renderer that writes a fixed document and counts invocations.
#[derive(Debug, Default)]
pub struct FakeRenderer {
    calls: AtomicUsize,
}

impl FakeRenderer {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentRenderer for FakeRenderer {
    async fn render(&self, input: &Path, output: &Path) -> MediaResult<Duration> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(input.exists());
        tokio::fs::write(output, FAKE_PDF).await?;
        Ok(Duration::from_millis(1))
    }
}

/// Encode a solid red picture of the given size.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([200, 10, 10, 255])));
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

pub fn config(work_dir: &Path) -> WorkerConfig {
    WorkerConfig {
        work_dir: work_dir.to_path_buf(),
        fetch_timeout: Duration::from_secs(5),
        render_timeout: Duration::from_secs(5),
        document_delivery: DocumentDelivery::Inline,
        picture_urls: PictureUrlConvention::Uploaded,
        ..WorkerConfig::default()
    }
}

pub fn processor(
    config: &WorkerConfig,
    store: &Arc<RecordingStore>,
    renderer: Arc<dyn DocumentRenderer>,
) -> JobProcessor {
    let store: Arc<dyn ArtifactStore> = store.clone();
    JobProcessor::from_config(config, store, renderer).unwrap()
}
