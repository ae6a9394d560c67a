//! Artifact store client.
//!
//! This crate provides:
//! - The `ArtifactStore` contract consumed by the job pipelines
//! - An S3-compatible implementation (upload, public ACL, public URLs)
//! - Storage settings resolved from `settings.json` or the environment

pub mod client;
pub mod error;
pub mod settings;
pub mod store;

pub use client::S3ArtifactStore;
pub use error::{StorageError, StorageResult};
pub use settings::StorageSettings;
pub use store::{content_type_for, ArtifactStore};
