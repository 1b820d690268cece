//! Two-stage generation pipeline client
//!
//! Stage one (txt2img) locks the generated portrait to the captured face; stage two
//! (img2img) refines stage one's output. Stage two only ever sees stage one's bytes.

use std::sync::Arc;
use tracing::{info, instrument};

use crate::backend::GenerationBackend;
use crate::error::Result;
use crate::preset::{GenerationMode, PresetEngine};

/// Images produced by a full pipeline run
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub txt2img: Vec<u8>,
    pub img2img: Vec<u8>,
}

/// Client that builds payloads through the preset engine and runs them on a backend
pub struct PipelineClient {
    presets: Arc<PresetEngine>,
    backend: Arc<dyn GenerationBackend>,
}

impl PipelineClient {
    pub fn new(presets: Arc<PresetEngine>, backend: Arc<dyn GenerationBackend>) -> Self {
        Self { presets, backend }
    }

    pub fn presets(&self) -> &Arc<PresetEngine> {
        &self.presets
    }

    /// Stage one: text-to-image with face lock on `input_image`
    #[instrument(skip_all, fields(backend = %self.backend.name()))]
    pub async fn text_to_image(&self, input_image: &[u8]) -> Result<Vec<u8>> {
        info!("Generating image (first stage: text to image with roop)");
        self.run_stage(GenerationMode::Txt2Img, input_image).await
    }

    /// Stage two: image-to-image refinement of `input_image`
    #[instrument(skip_all, fields(backend = %self.backend.name()))]
    pub async fn image_to_image(&self, input_image: &[u8]) -> Result<Vec<u8>> {
        info!("Generating image (second stage: image to image)");
        self.run_stage(GenerationMode::Img2Img, input_image).await
    }

    /// Run both stages in order; stage two is never issued if stage one fails
    pub async fn run(&self, input_image: &[u8]) -> Result<PipelineOutput> {
        let txt2img = self.text_to_image(input_image).await?;
        let img2img = self.image_to_image(&txt2img).await?;
        Ok(PipelineOutput { txt2img, img2img })
    }

    async fn run_stage(&self, mode: GenerationMode, input_image: &[u8]) -> Result<Vec<u8>> {
        let payload = self.presets.build_payload(mode, input_image)?;
        let response = self.backend.generate(payload).await?;
        response.first_image()
    }
}
