//! S3-compatible artifact store.

use std::path::Path;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};
use crate::settings::StorageSettings;
use crate::store::ArtifactStore;

/// Artifact store backed by any S3-compatible object storage.
#[derive(Clone)]
pub struct S3ArtifactStore {
    client: Client,
    settings: StorageSettings,
}

impl S3ArtifactStore {
    /// Create a new store from settings.
    pub fn new(settings: StorageSettings) -> Self {
        let credentials = Credentials::new(
            &settings.access_key_id,
            &settings.secret_access_key,
            None,
            None,
            "muzhack-settings",
        );

        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&settings.endpoint_url)
            .region(Region::new(settings.region.clone()))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(sdk_config),
            settings,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.settings.bucket
    }

    fn validate_key(key: &str) -> StorageResult<()> {
        if key.is_empty() || key.starts_with('/') || key.split('/').any(|seg| seg == "..") {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ArtifactStore for S3ArtifactStore {
    async fn upload(&self, local_path: &Path, remote_path: &str, content_type: &str) -> StorageResult<()> {
        Self::validate_key(remote_path)?;
        debug!("Uploading {} to {}", local_path.display(), remote_path);

        let body = ByteStream::from_path(local_path)
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        self.client
            .put_object()
            .bucket(&self.settings.bucket)
            .key(remote_path)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(format!("{}: {}", remote_path, e)))?;

        info!("Uploaded {} to {}", local_path.display(), remote_path);
        Ok(())
    }

    async fn make_public(&self, remote_path: &str) -> StorageResult<String> {
        Self::validate_key(remote_path)?;

        if self.settings.set_public_acl {
            self.client
                .put_object_acl()
                .bucket(&self.settings.bucket)
                .key(remote_path)
                .acl(ObjectCannedAcl::PublicRead)
                .send()
                .await
                .map_err(|e| StorageError::publish_failed(format!("{}: {}", remote_path, e)))?;
        }

        Ok(self.settings.public_url(remote_path))
    }

    /// Head the bucket.
    async fn check_connectivity(&self) -> StorageResult<()> {
        self.client
            .head_bucket()
            .bucket(&self.settings.bucket)
            .send()
            .await
            .map_err(|e| StorageError::AwsSdk(format!("Storage connectivity check failed: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(S3ArtifactStore::validate_key("u/p/a-thumb.png").is_ok());
        assert!(S3ArtifactStore::validate_key("").is_err());
        assert!(S3ArtifactStore::validate_key("/abs.png").is_err());
        assert!(S3ArtifactStore::validate_key("u/../a.png").is_err());
    }
}
