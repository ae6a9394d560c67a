//! Rendered build-instructions document references.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// File name of the assembled document source inside a workspace.
pub const INSTRUCTIONS_SOURCE_NAME: &str = "instructions.md";
/// File name of the rendered document inside a workspace.
pub const INSTRUCTIONS_OUTPUT_NAME: &str = "instructions.pdf";

/// Where the rendered document ended up.
///
/// Which variant a job returns is decided by the configured delivery
/// policy, not by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum DocumentReference {
    /// Rendered bytes embedded as base64
    Inline { pdf: String },
    /// Rendered file uploaded to the artifact store
    Uploaded { path: String, url: String },
}

impl DocumentReference {
    pub fn is_inline(&self) -> bool {
        matches!(self, DocumentReference::Inline { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untagged_wire_format() {
        let inline = DocumentReference::Inline { pdf: "JVBERi0=".into() };
        assert_eq!(
            serde_json::to_value(&inline).unwrap(),
            serde_json::json!({ "pdf": "JVBERi0=" })
        );

        let uploaded: DocumentReference = serde_json::from_value(serde_json::json!({
            "path": "projects/p1/instructions.pdf",
            "url": "https://cdn/projects/p1/instructions.pdf"
        }))
        .unwrap();
        assert!(!uploaded.is_inline());
    }
}
