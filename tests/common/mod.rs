//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use parking_lot::Mutex;
use portrait_kiosk::collaborators::{PhotoCategory, PhotoStore, Uploader};
use portrait_kiosk::config::Settings;
use portrait_kiosk::preset::PresetEngine;
use portrait_kiosk::{AppError, Result};
use serde_json::json;
use std::path::PathBuf;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TXT2IMG: &str = "/sdapi/v1/txt2img";
pub const IMG2IMG: &str = "/sdapi/v1/img2img";

pub const T2I_BASE_PROMPT: &str = "studio portrait, soft light";

pub const PRESETS: &str = r#"{
    "baseSettings_t2i": {
        "sd_model_name": "portrait.safetensors",
        "prompt": "studio portrait, soft light",
        "negative_prompt": "blurry",
        "steps": 25, "width": 512, "height": 768, "cfgScale": 7.0,
        "enable": true, "faces_index": 0, "roop_model": "inswapper_128.onnx",
        "restore_face": "CodeFormer", "restore_visibility": 1.0,
        "upscaler": "None", "upscaler_scale": 1.0, "upscaler_visibility": 1.0
    },
    "baseSettings_i2i": {
        "sd_model_name": "portrait.safetensors",
        "prompt": "sharp focus",
        "negative_prompt": "lowres",
        "steps": 20, "width": 512, "height": 768, "cfgScale": 6.0,
        "denoising_strength": 0.3
    },
    "gender": { "female": "a woman", "male": "a man" },
    "age": { "adult": "around 35 years old", "elderly": "around 70 years old" },
    "profession": { "chef": "wearing a chef uniform", "pilot": "wearing a pilot uniform" }
}"#;

pub fn preset_engine() -> PresetEngine {
    PresetEngine::from_document(PresetEngine::parse_json(PRESETS).unwrap())
}

pub fn settings_for(server: &MockServer) -> Settings {
    let mut settings = Settings::default();
    settings.generation.base_url = server.uri();
    settings.generation.timeout_ms = 5_000;
    settings
}

pub fn b64(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

pub fn images_body(image: &[u8]) -> serde_json::Value {
    json!({
        "images": [b64(image), b64(b"ignored")],
        "parameters": {},
        "info": "{}"
    })
}

/// Mount a txt2img and img2img endpoint returning fixed images
pub async fn mount_stages(server: &MockServer, stage_one: &[u8], stage_two: &[u8]) {
    Mock::given(method("POST"))
        .and(path(TXT2IMG))
        .respond_with(ResponseTemplate::new(200).set_body_json(images_body(stage_one)))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(IMG2IMG))
        .respond_with(ResponseTemplate::new(200).set_body_json(images_body(stage_two)))
        .mount(server)
        .await;
}

/// Paths of the requests the mock server saw, in order
pub async fn request_paths(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| r.url.path().to_string())
        .collect()
}

/// Body of the n-th request received by the mock server
pub async fn request_body(server: &MockServer, index: usize) -> serde_json::Value {
    let requests = server.received_requests().await.unwrap_or_default();
    serde_json::from_slice(&requests[index].body).unwrap()
}

/// Photo store keeping everything in memory
#[derive(Default)]
pub struct MemoryStore {
    pub saved: Mutex<Vec<(PhotoCategory, Vec<u8>)>>,
    pub fail: bool,
}

#[async_trait]
impl PhotoStore for MemoryStore {
    async fn save_photo(&self, category: PhotoCategory, photo: &[u8]) -> Result<PathBuf> {
        if self.fail {
            return Err(AppError::collaborator("storage", "disk full"));
        }
        self.saved.lock().push((category, photo.to_vec()));
        Ok(PathBuf::from(format!("{}.png", category)))
    }
}

/// Uploader returning a fixed QR image
pub struct FixedUploader(pub Option<Vec<u8>>);

#[async_trait]
impl Uploader for FixedUploader {
    async fn upload_and_get_shareable_image(&self, _image: &[u8]) -> Option<Vec<u8>> {
        self.0.clone()
    }
}
