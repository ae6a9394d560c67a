//! Document pipeline: assemble, render and deliver the build instructions.

use std::path::Path;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::info;

use muzhack_media::document::{INSTRUCTIONS_OUTPUT_NAME, INSTRUCTIONS_SOURCE_NAME};
use muzhack_media::{build_instructions_markdown, DocumentRenderer, InstructionsSource};
use muzhack_models::naming::join_remote;
use muzhack_models::{DocumentReference, Job};
use muzhack_storage::{content_type_for, ArtifactStore};

use crate::config::DocumentDelivery;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::metrics;

pub struct DocumentPipeline {
    renderer: Arc<dyn DocumentRenderer>,
    store: Arc<dyn ArtifactStore>,
    delivery: DocumentDelivery,
}

impl DocumentPipeline {
    pub fn new(
        renderer: Arc<dyn DocumentRenderer>,
        store: Arc<dyn ArtifactStore>,
        delivery: DocumentDelivery,
    ) -> Self {
        Self {
            renderer,
            store,
            delivery,
        }
    }

    pub fn delivery(&self) -> DocumentDelivery {
        self.delivery
    }

    /// Render the job's build instructions inside `workspace` and deliver them.
    pub async fn process(
        &self,
        workspace: &Path,
        job: &Job,
        logger: &JobLogger,
    ) -> WorkerResult<DocumentReference> {
        let source = InstructionsSource {
            title: &job.title,
            author: job.author.as_deref(),
            bom: &job.bom,
            instructions: &job.instructions,
        };
        let input = workspace.join(INSTRUCTIONS_SOURCE_NAME);
        let output = workspace.join(INSTRUCTIONS_OUTPUT_NAME);
        tokio::fs::write(&input, build_instructions_markdown(&source)).await?;

        let elapsed = self
            .renderer
            .render(&input, &output)
            .await
            .map_err(WorkerError::Render)?;
        metrics::record_render_duration(elapsed);
        info!(
            job_id = %job.id,
            elapsed_ms = elapsed.as_millis() as u64,
            "Rendered build instructions"
        );

        match self.delivery {
            DocumentDelivery::Inline => {
                let bytes = tokio::fs::read(&output).await?;
                logger.log_progress(&format!("rendered document inline ({} bytes)", bytes.len()));
                Ok(DocumentReference::Inline {
                    pdf: STANDARD.encode(bytes),
                })
            }
            DocumentDelivery::Upload => {
                let path = join_remote(&job.document_directory(), INSTRUCTIONS_OUTPUT_NAME);
                self.store
                    .upload(&output, &path, content_type_for(&path))
                    .await?;
                let url = self.store.make_public(&path).await?;
                logger.log_progress(&format!("uploaded document to {}", path));
                Ok(DocumentReference::Uploaded { path, url })
            }
        }
    }
}
