//! Generation backend trait

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::preset::RequestPayload;

/// Response body of the txt2img / img2img endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationResponse {
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub parameters: Option<serde_json::Value>,
    #[serde(default)]
    pub info: Option<String>,
}

impl GenerationResponse {
    /// Decode the first image; the rest of the body is ignored
    pub fn first_image(&self) -> Result<Vec<u8>> {
        let encoded = self
            .images
            .first()
            .ok_or_else(|| AppError::Generation("response contains no images".to_string()))?;

        BASE64
            .decode(encoded.trim())
            .map_err(|e| AppError::Generation(format!("invalid base64 image: {}", e)))
    }
}

/// An image generation service able to run both pipeline stages
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &str;

    /// Send a payload to the endpoint matching its mode
    async fn generate(&self, payload: RequestPayload) -> Result<GenerationResponse>;
}
