//! HTTP client for the Stable Diffusion web API

use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, CONTENT_TYPE},
    Client,
};
use std::time::Duration;
use tracing::{debug, error, info};

use crate::backend::traits::{GenerationBackend, GenerationResponse};
use crate::config::Settings;
use crate::error::{AppError, Result};
use crate::preset::{GenerationMode, RequestPayload};

/// Generation backend speaking the `/sdapi/v1/*` JSON protocol
pub struct SdWebUiBackend {
    client: Client,
    txt2img_url: String,
    img2img_url: String,
}

impl SdWebUiBackend {
    /// Create a backend from settings
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(settings.generation.timeout_ms))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            txt2img_url: settings.txt2img_url(),
            img2img_url: settings.img2img_url(),
        })
    }

    fn headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }

    fn url_for(&self, mode: GenerationMode) -> &str {
        match mode {
            GenerationMode::Txt2Img => &self.txt2img_url,
            GenerationMode::Img2Img => &self.img2img_url,
        }
    }
}

#[async_trait]
impl GenerationBackend for SdWebUiBackend {
    fn name(&self) -> &str {
        "sd-webui"
    }

    async fn generate(&self, payload: RequestPayload) -> Result<GenerationResponse> {
        let mode = payload.mode();
        let url = self.url_for(mode);

        debug!(mode = %mode, url = %url, "Sending generation request");

        let response = self
            .client
            .post(url)
            .headers(Self::headers())
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                error!(mode = %mode, error = %e, "Generation request failed");
                AppError::Generation(format!("request to {} failed: {}", url, e))
            })?;

        if response.status().is_success() {
            let result = response.json::<GenerationResponse>().await.map_err(|e| {
                error!(mode = %mode, error = %e, "Failed to parse generation response");
                AppError::Generation(format!("Failed to parse response: {}", e))
            })?;

            info!(mode = %mode, images = result.images.len(), "Success to generate image");
            Ok(result)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            error!(mode = %mode, status = %status, "Generation service returned an error");
            Err(AppError::Generation(format!(
                "Backend returned {}: {}",
                status, body
            )))
        }
    }
}
