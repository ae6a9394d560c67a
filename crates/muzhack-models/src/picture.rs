//! Picture requests and results.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::naming::parent_directory;

/// One source picture to download and derive variants from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PictureRequest {
    /// Source URL of the original picture
    pub url: String,

    /// Local file name inside the job workspace
    pub name: String,

    /// Remote path of the original picture; derived files go next to it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_path: Option<String>,

    /// Remote directory for derived files (takes precedence over `cloud_path`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_directory: Option<String>,
}

impl PictureRequest {
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
            cloud_path: None,
            cloud_directory: None,
        }
    }

    pub fn with_cloud_path(mut self, path: impl Into<String>) -> Self {
        self.cloud_path = Some(path.into());
        self
    }

    pub fn with_cloud_directory(mut self, directory: impl Into<String>) -> Self {
        self.cloud_directory = Some(directory.into());
        self
    }

    /// Remote directory the derived files are uploaded into.
    pub fn destination_directory(&self) -> Option<&str> {
        if let Some(dir) = self.cloud_directory.as_deref() {
            return Some(dir.trim_end_matches('/'));
        }
        self.cloud_path.as_deref().map(parent_directory)
    }
}

/// A processed picture: the request plus references to its derived variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PictureResult {
    #[serde(flatten)]
    pub request: PictureRequest,

    #[serde(rename = "thumbNailUrl")]
    pub thumbnail_url: String,

    #[serde(rename = "exploreUrl")]
    pub explore_url: String,

    #[serde(rename = "mainUrl")]
    pub main_url: String,
}
