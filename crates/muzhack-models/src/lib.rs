//! Shared data models for the MuzHack project processor.
//!
//! This crate provides Serde-serializable types for:
//! - Jobs and their lifecycle stages
//! - Picture requests and derived picture results
//! - Rendered document references
//! - The fixed set of derived image variants
//! - Naming helpers shared by the worker and the artifact store

pub mod document;
pub mod job;
pub mod naming;
pub mod picture;
pub mod variant;

// Re-export common types
pub use document::DocumentReference;
pub use job::{Job, JobId, JobResult, JobStage, ValidationError};
pub use picture::{PictureRequest, PictureResult};
pub use variant::{ImageVariant, EXPLORE, MAIN, PICTURE_VARIANTS, THUMB};
