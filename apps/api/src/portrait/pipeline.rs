//! Portrait pipeline: one strictly sequential run per request:
//! resolve prompt → submit + poll → normalise → post-process → upload.
//!
//! Either every stage succeeds and one processed URL comes back, or the run fails with
//! exactly one error. Nothing is uploaded unless generation and post-processing succeeded.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use crate::image_gen::orchestrator::{JobOrchestrator, OrchestrationError};
use crate::image_gen::GenerationRequest;
use crate::imaging::source::{to_data_uri, ImageSource};
use crate::imaging::{ImagePostProcessor, ImagingError};
use crate::portrait::resolver::PromptResolver;
use crate::portrait::selection::FeatureSelection;
use crate::storage::{StorageError, StorageGateway, UploadOptions};

/// Quality directive attached to every processed upload (lossless PNG).
pub const PROCESSED_QUALITY: u8 = 100;
pub const PROCESSED_TRANSFORMATION: &str = "fit-lanczos3,unsharpen,png-best";
const ORIGINALS_SUBFOLDER: &str = "originals";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PortraitMode {
    /// Restyle the subject according to a `FeatureSelection`.
    Portrait,
    /// Cut the subject out of its background; no selection involved.
    RemoveBackground,
}

impl PortraitMode {
    pub fn id(self) -> &'static str {
        match self {
            PortraitMode::Portrait => "portrait",
            PortraitMode::RemoveBackground => "remove-background",
        }
    }
}

impl fmt::Display for PortraitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for PortraitMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "portrait" => Ok(PortraitMode::Portrait),
            "remove-background" => Ok(PortraitMode::RemoveBackground),
            other => Err(format!(
                "unknown mode '{other}' (expected 'portrait' or 'remove-background')"
            )),
        }
    }
}

/// A validated request: everything the pipeline needs, nothing it has to check again.
#[derive(Debug, Clone)]
pub struct PortraitRequest {
    pub user_id: Uuid,
    pub mode: PortraitMode,
    pub selection: Option<FeatureSelection>,
    pub image: Bytes,
    pub content_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortraitResult {
    pub job_id: String,
    pub mode: PortraitMode,
    pub processed_image_url: String,
    pub original_image_url: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("portrait mode requires a feature selection")]
    MissingSelection,

    #[error(transparent)]
    Orchestration(#[from] OrchestrationError),

    #[error("image post-processing failed: {0}")]
    Imaging(#[from] ImagingError),

    #[error("storage upload failed: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub portrait_model: String,
    pub background_removal_model: String,
    pub storage_folder: String,
}

#[derive(Clone)]
pub struct PortraitPipeline {
    resolver: PromptResolver,
    orchestrator: JobOrchestrator,
    portrait_processor: ImagePostProcessor,
    background_processor: ImagePostProcessor,
    storage: Arc<dyn StorageGateway>,
    settings: PipelineSettings,
}

impl PortraitPipeline {
    pub fn new(
        orchestrator: JobOrchestrator,
        portrait_processor: ImagePostProcessor,
        background_processor: ImagePostProcessor,
        storage: Arc<dyn StorageGateway>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            resolver: PromptResolver,
            orchestrator,
            portrait_processor,
            background_processor,
            storage,
            settings,
        }
    }

    pub async fn run(&self, request: PortraitRequest) -> Result<PortraitResult, PipelineError> {
        let selection = request
            .selection
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());

        match self.execute(&request).await {
            Ok(result) => {
                info!(
                    user_id = %request.user_id,
                    mode = %request.mode,
                    job_id = %result.job_id,
                    url = %result.processed_image_url,
                    "Portrait pipeline completed"
                );
                Ok(result)
            }
            Err(e) => {
                let job_id = match &e {
                    PipelineError::Orchestration(inner) => inner.job_id().unwrap_or("-"),
                    _ => "-",
                };
                error!(
                    user_id = %request.user_id,
                    mode = %request.mode,
                    selection = %selection,
                    job_id = %job_id,
                    "Portrait pipeline failed: {e}"
                );
                Err(e)
            }
        }
    }

    async fn execute(&self, request: &PortraitRequest) -> Result<PortraitResult, PipelineError> {
        let generation = self.generation_request(request)?;
        let generated = self.orchestrator.run(&generation).await?;

        let processor = match request.mode {
            PortraitMode::Portrait => &self.portrait_processor,
            PortraitMode::RemoveBackground => &self.background_processor,
        };
        let processed = processor.process(generated.image).await?;
        info!(
            job_id = %generated.job_id,
            "Post-processed output to {}x{}",
            processed.width, processed.height
        );

        let processed_options = UploadOptions::in_folder(&self.settings.storage_folder)
            .content_type(processed.mime_type())
            .quality(PROCESSED_QUALITY)
            .transformation(PROCESSED_TRANSFORMATION);
        let processed_image_url = self
            .storage
            .upload(ImageSource::Bytes(processed.bytes), &processed_options)
            .await?;

        let original_options = UploadOptions::in_folder(format!(
            "{}/{}",
            self.settings.storage_folder, ORIGINALS_SUBFOLDER
        ))
        .content_type(request.content_type.clone());
        let original_image_url = self
            .storage
            .upload(ImageSource::Bytes(request.image.clone()), &original_options)
            .await?;

        Ok(PortraitResult {
            job_id: generated.job_id,
            mode: request.mode,
            processed_image_url,
            original_image_url,
            width: processed.width,
            height: processed.height,
        })
    }

    /// Builds the upstream model invocation for `request`.
    pub fn generation_request(
        &self,
        request: &PortraitRequest,
    ) -> Result<GenerationRequest, PipelineError> {
        let image_uri = to_data_uri(&request.image, &request.content_type);
        let mut input = Map::new();

        let model = match request.mode {
            PortraitMode::Portrait => {
                let selection = request.selection.ok_or(PipelineError::MissingSelection)?;
                let resolved = self.resolver.resolve(&selection);
                info!(
                    user_id = %request.user_id,
                    selection = %selection,
                    source = ?resolved.source,
                    "Resolved portrait prompt"
                );
                input.insert("prompt".to_string(), Value::String(resolved.text));
                input.insert("input_image".to_string(), Value::String(image_uri));
                input.insert("output_format".to_string(), json!("png"));
                &self.settings.portrait_model
            }
            PortraitMode::RemoveBackground => {
                input.insert("image".to_string(), Value::String(image_uri));
                &self.settings.background_removal_model
            }
        };

        Ok(GenerationRequest {
            model: model.clone(),
            input,
        })
    }
}
