//! Upload collaborator: publishes the final portrait and returns a shareable QR image

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::Local;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::UploadConfig;
use crate::error::{AppError, Result};

/// Uploads an image and returns an image that lets users fetch it (a QR code)
///
/// Implementations swallow their own failures and return `None`.
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload_and_get_shareable_image(&self, image: &[u8]) -> Option<Vec<u8>>;
}

#[derive(Debug, Serialize)]
struct UploadRequest {
    name: String,
    mime_type: String,
    content: String,
}

/// Upload service response
#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    /// Share link of the uploaded file
    pub link: String,
    /// QR code for `link`, base64 PNG
    #[serde(default)]
    pub qr_code: Option<String>,
}

/// Uploader posting JSON to a share service
pub struct HttpUploader {
    client: Client,
    endpoint: String,
    auth_token: Option<String>,
}

impl HttpUploader {
    pub fn new(config: &UploadConfig) -> Result<Self> {
        let endpoint = config
            .endpoint
            .clone()
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| {
                AppError::Config(config::ConfigError::Message(
                    "Upload endpoint is not configured".to_string(),
                ))
            })?;

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        let auth_token = config
            .token_env
            .as_ref()
            .and_then(|name| std::env::var(name).ok());

        Ok(Self {
            client,
            endpoint,
            auth_token,
        })
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = &self.auth_token {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", token)) {
                headers.insert(AUTHORIZATION, value);
            }
        }

        headers
    }

    /// Upload the image and return the service response
    pub async fn upload(&self, image: &[u8]) -> Result<UploadResponse> {
        let request = UploadRequest {
            name: format!("Photo_{}.png", Local::now().format("%Y%m%d_%H%M%S")),
            mime_type: "image/png".to_string(),
            content: BASE64.encode(image),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .headers(self.headers())
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::collaborator(
                "upload",
                format!("service returned {}: {}", status, body),
            ));
        }

        let result = response.json::<UploadResponse>().await?;
        info!(link = %result.link, "Uploaded image");
        Ok(result)
    }
}

#[async_trait]
impl Uploader for HttpUploader {
    async fn upload_and_get_shareable_image(&self, image: &[u8]) -> Option<Vec<u8>> {
        let response = match self.upload(image).await {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "Failed to upload image");
                return None;
            }
        };

        let Some(qr_code) = response.qr_code else {
            warn!(link = %response.link, "Upload service returned no QR code");
            return None;
        };

        match BASE64.decode(qr_code.trim()) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                error!(error = %e, "Failed to decode QR code");
                None
            }
        }
    }
}
