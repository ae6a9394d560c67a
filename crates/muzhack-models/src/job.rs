//! Job definitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use crate::document::{DocumentReference, INSTRUCTIONS_OUTPUT_NAME, INSTRUCTIONS_SOURCE_NAME};
use crate::naming::{derived_file_name, is_safe_component};
use crate::picture::{PictureRequest, PictureResult};
use crate::variant::PICTURE_VARIANTS;

/// Identifier of a job, unique among concurrently running jobs.
///
/// Doubles as the name of the job's workspace directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the id is safe to use as a directory name.
    pub fn is_valid(&self) -> bool {
        is_safe_component(&self.0)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Stage of a job in the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobStage {
    Acquiring,
    /// Working on picture `index` (zero-based) of `total`
    Processing { index: usize, total: usize },
    RenderingDocument,
    Releasing,
    Done,
    Aborting,
}

impl JobStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStage::Acquiring => "acquiring",
            JobStage::Processing { .. } => "processing",
            JobStage::RenderingDocument => "rendering_document",
            JobStage::Releasing => "releasing",
            JobStage::Done => "done",
            JobStage::Aborting => "aborting",
        }
    }
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStage::Processing { index, total } => {
                write!(f, "processing picture {} of {}", index + 1, total)
            }
            other => f.write_str(other.as_str()),
        }
    }
}

/// Reasons a job description is rejected before any work starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid job id {0:?}")]
    InvalidJobId(String),

    #[error("invalid picture name {0:?}")]
    InvalidPictureName(String),

    #[error("duplicate picture name {0:?}")]
    DuplicatePictureName(String),

    #[error("picture name {0:?} clashes with a derived or reserved workspace file")]
    ConflictingPictureName(String),

    #[error("picture {0:?} has neither cloudPath nor cloudDirectory")]
    MissingDestination(String),

    #[error("picture {0:?} has an empty url")]
    MissingUrl(String),
}

/// A request to build one project's media assets.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Job ID
    pub id: JobId,

    /// Pictures to process, in result order
    #[serde(default)]
    pub pictures: Vec<PictureRequest>,

    /// Project title
    #[serde(alias = "name", default)]
    pub title: String,

    /// Project author
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// Bill of materials (markdown)
    #[serde(default)]
    pub bom: String,

    /// Free-text build instructions (markdown)
    #[serde(default)]
    pub instructions: String,

    /// Remote directory for the rendered document when it is uploaded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_directory: Option<String>,
}

impl Job {
    pub fn new(id: impl Into<JobId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            pictures: Vec::new(),
            title: title.into(),
            author: None,
            bom: String::new(),
            instructions: String::new(),
            cloud_directory: None,
        }
    }

    pub fn with_picture(mut self, picture: PictureRequest) -> Self {
        self.pictures.push(picture);
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_bom(mut self, bom: impl Into<String>) -> Self {
        self.bom = bom.into();
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn with_cloud_directory(mut self, directory: impl Into<String>) -> Self {
        self.cloud_directory = Some(directory.into());
        self
    }

    /// Remote directory for job-level artifacts.
    pub fn document_directory(&self) -> String {
        match self.cloud_directory.as_deref() {
            Some(dir) => dir.trim_end_matches('/').to_string(),
            None => format!("projects/{}", self.id),
        }
    }

    /// Reject ids and names that cannot be mapped safely onto the workspace.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.id.is_valid() {
            return Err(ValidationError::InvalidJobId(self.id.0.clone()));
        }

        let mut names = HashSet::new();
        for picture in &self.pictures {
            if picture.url.trim().is_empty() {
                return Err(ValidationError::MissingUrl(picture.name.clone()));
            }
            if !is_safe_component(&picture.name) {
                return Err(ValidationError::InvalidPictureName(picture.name.clone()));
            }
            if !names.insert(picture.name.as_str()) {
                return Err(ValidationError::DuplicatePictureName(picture.name.clone()));
            }
            if picture.destination_directory().is_none() {
                return Err(ValidationError::MissingDestination(picture.name.clone()));
            }
        }

        // Every picture shares the workspace with the others' variants and the document.
        let mut generated: HashSet<String> = PICTURE_VARIANTS
            .iter()
            .flat_map(|variant| {
                self.pictures
                    .iter()
                    .map(move |picture| derived_file_name(&picture.name, variant.suffix))
            })
            .collect();
        generated.insert(INSTRUCTIONS_SOURCE_NAME.to_string());
        generated.insert(INSTRUCTIONS_OUTPUT_NAME.to_string());

        if let Some(picture) = self.pictures.iter().find(|p| generated.contains(&p.name)) {
            return Err(ValidationError::ConflictingPictureName(picture.name.clone()));
        }

        Ok(())
    }
}

/// Successful outcome of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct JobResult {
    /// Picture results, in request order
    pub pictures: Vec<PictureResult>,

    /// Rendered build-instructions document
    #[serde(alias = "instructions")]
    pub document: DocumentReference,
}
