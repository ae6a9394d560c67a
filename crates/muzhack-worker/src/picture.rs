//! Picture pipeline: fetch one source picture, derive its variants and
//! publish them.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use tracing::{debug, info};

use muzhack_media::{compose_variants, DerivedImage, SourceImage};
use muzhack_models::naming::{derive_sibling_url, derived_file_name, join_remote};
use muzhack_models::{PictureRequest, PictureResult, ValidationError, PICTURE_VARIANTS};
use muzhack_storage::{content_type_for, ArtifactStore};

use crate::config::PictureUrlConvention;
use crate::error::{FetchError, WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::metrics;

/// Public URLs of one picture's variants, keyed by suffix.
#[derive(Debug, Default)]
struct VariantUrls {
    explore: String,
    thumb: String,
    main: String,
}

impl VariantUrls {
    fn set(&mut self, suffix: &str, url: String) {
        match suffix {
            "explore" => self.explore = url,
            "thumb" => self.thumb = url,
            "main" => self.main = url,
            _ => {}
        }
    }
}

pub struct PicturePipeline {
    http: reqwest::Client,
    store: Arc<dyn ArtifactStore>,
    convention: PictureUrlConvention,
}

impl PicturePipeline {
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        convention: PictureUrlConvention,
        fetch_timeout: Duration,
    ) -> WorkerResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(fetch_timeout)
            .build()
            .map_err(|e| WorkerError::job_failed(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            store,
            convention,
        })
    }

    /// Download, letterbox and upload one picture.
    pub async fn process(
        &self,
        workspace: &Path,
        picture: &PictureRequest,
        logger: &JobLogger,
    ) -> WorkerResult<PictureResult> {
        let directory = picture
            .destination_directory()
            .ok_or_else(|| ValidationError::MissingDestination(picture.name.clone()))?
            .to_string();

        let bytes = self.fetch(&picture.url).await?;
        let source_path = workspace.join(&picture.name);
        tokio::fs::write(&source_path, &bytes).await?;
        debug!(
            picture = %picture.name,
            bytes = bytes.len(),
            "Saved source picture to {}",
            source_path.display()
        );

        let derived = compose(picture.name.clone(), source_path, bytes).await?;

        let mut urls = VariantUrls::default();
        for image in &derived {
            let remote_path = join_remote(&directory, &derived_file_name(&picture.name, image.variant.suffix));
            self.store
                .upload(&image.path, &remote_path, content_type_for(&remote_path))
                .await?;
            let public_url = self.store.make_public(&remote_path).await?;
            urls.set(image.variant.suffix, public_url);
        }

        if self.convention == PictureUrlConvention::SourceMirror {
            for variant in PICTURE_VARIANTS.iter() {
                let url = derive_sibling_url(&picture.url, variant.suffix).map_err(|e| {
                    WorkerError::job_failed(format!("cannot derive URL from {}: {}", picture.url, e))
                })?;
                urls.set(variant.suffix, url);
            }
        }

        metrics::record_picture_processed();
        logger.log_progress(&format!("published variants of {}", picture.name));
        info!(picture = %picture.name, directory = %directory, "Picture processed");

        Ok(PictureResult {
            request: picture.clone(),
            thumbnail_url: urls.thumb,
            explore_url: urls.explore,
            main_url: urls.main,
        })
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::transfer(url, None, e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::not_found(url));
        }
        if !status.is_success() {
            return Err(FetchError::transfer(
                url,
                Some(status.as_u16()),
                format!("unexpected status {}", status),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::transfer(url, Some(status.as_u16()), e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// Decode and letterbox on the blocking pool.
async fn compose(name: String, source_path: PathBuf, bytes: Vec<u8>) -> WorkerResult<Vec<DerivedImage>> {
    tokio::task::spawn_blocking(move || {
        let source = SourceImage::from_bytes(&bytes).map_err(|e| WorkerError::from_compose(&name, e))?;
        compose_variants(&source, &source_path, &PICTURE_VARIANTS)
            .map_err(|e| WorkerError::from_compose(&name, e))
    })
    .await
    .map_err(|e| WorkerError::job_failed(format!("compose task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_urls_by_suffix() {
        let mut urls = VariantUrls::default();
        urls.set("thumb", "t".into());
        urls.set("explore", "e".into());
        urls.set("main", "m".into());
        urls.set("other", "x".into());

        assert_eq!(urls.thumb, "t");
        assert_eq!(urls.explore, "e");
        assert_eq!(urls.main, "m");
    }
}
