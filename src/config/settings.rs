//! Kiosk settings and configuration management

use crate::error::{AppError, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub generation: GenerationConfig,
    pub presets: PresetConfig,
    pub storage: StorageConfig,
    pub upload: UploadConfig,
    pub camera: CameraConfig,
    pub kiosk: KioskConfig,
    pub logging: LoggingConfig,
}

/// Generation service (Stable Diffusion web API) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerationConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_txt2img_path")]
    pub txt2img_path: String,
    #[serde(default = "default_img2img_path")]
    pub img2img_path: String,
    #[serde(default = "default_generation_timeout")]
    pub timeout_ms: u64,
}

fn default_base_url() -> String {
    "http://127.0.0.1:7860".to_string()
}

fn default_txt2img_path() -> String {
    "/sdapi/v1/txt2img".to_string()
}

fn default_img2img_path() -> String {
    "/sdapi/v1/img2img".to_string()
}

fn default_generation_timeout() -> u64 {
    300_000
}

/// Preset resource location
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PresetConfig {
    #[serde(default = "default_preset_path")]
    pub path: String,
}

fn default_preset_path() -> String {
    "assets/sd_presets.json".to_string()
}

/// Photo storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_path")]
    pub base_path: String,
}

fn default_storage_path() -> String {
    "./data".to_string()
}

/// Upload / share-link configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub token_env: Option<String>,
    #[serde(default = "default_upload_timeout")]
    pub timeout_ms: u64,
}

fn default_upload_timeout() -> u64 {
    30_000
}

/// Camera configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CameraConfig {
    /// Image served by the still-image camera
    #[serde(default)]
    pub frame_path: Option<String>,
    #[serde(default = "default_countdown")]
    pub capture_countdown_secs: u64,
}

fn default_countdown() -> u64 {
    5
}

/// Kiosk flow configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KioskConfig {
    #[serde(default)]
    pub test_mode: bool,
    #[serde(default = "default_test_image_dir")]
    pub test_image_dir: String,
    #[serde(default = "default_test_image_index")]
    pub test_image_index: String,
}

fn default_test_image_dir() -> String {
    "assets/test_images".to_string()
}

fn default_test_image_index() -> String {
    "m1".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Settings {
    /// Load settings from the default configuration file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/kiosk.yaml")
    }

    /// Load settings from a specific YAML or TOML file, with `KIOSK__*` overrides
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let format = if path.extension().map_or(false, |ext| ext == "yaml" || ext == "yml") {
            FileFormat::Yaml
        } else {
            FileFormat::Toml
        };

        let mut config_builder = Config::builder()
            .set_default("generation.base_url", default_base_url())?
            .set_default("generation.txt2img_path", default_txt2img_path())?
            .set_default("generation.img2img_path", default_img2img_path())?
            .set_default("generation.timeout_ms", 300_000)?
            .set_default("presets.path", default_preset_path())?
            .set_default("storage.base_path", default_storage_path())?
            .set_default("upload.enabled", false)?
            .set_default("upload.timeout_ms", 30_000)?
            .set_default("camera.capture_countdown_secs", 5)?
            .set_default("kiosk.test_mode", false)?
            .set_default("kiosk.test_image_dir", default_test_image_dir())?
            .set_default("kiosk.test_image_index", default_test_image_index())?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "json")?;

        if path.exists() {
            config_builder = config_builder.add_source(File::from(path).format(format));
        }

        config_builder = config_builder.add_source(
            Environment::with_prefix("KIOSK")
                .separator("__")
                .try_parsing(true),
        );

        let config = config_builder.build()?;
        let settings: Settings = config.try_deserialize()?;
        Ok(settings)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.generation.base_url.trim().is_empty() {
            return Err(AppError::Config(config::ConfigError::Message(
                "Generation base_url cannot be empty".to_string(),
            )));
        }

        for (name, path) in [
            ("txt2img_path", &self.generation.txt2img_path),
            ("img2img_path", &self.generation.img2img_path),
        ] {
            if !path.starts_with('/') {
                return Err(AppError::Config(config::ConfigError::Message(format!(
                    "Generation {} must start with '/': {}",
                    name, path
                ))));
            }
        }

        if self.presets.path.trim().is_empty() {
            return Err(AppError::Config(config::ConfigError::Message(
                "Preset path cannot be empty".to_string(),
            )));
        }

        if self.upload.enabled
            && self
                .upload
                .endpoint
                .as_deref()
                .map_or(true, |e| e.trim().is_empty())
        {
            return Err(AppError::Config(config::ConfigError::Message(
                "Upload is enabled but no endpoint is configured".to_string(),
            )));
        }

        Ok(())
    }

    /// Full URL of the text-to-image endpoint
    pub fn txt2img_url(&self) -> String {
        join_url(&self.generation.base_url, &self.generation.txt2img_path)
    }

    /// Full URL of the image-to-image endpoint
    pub fn img2img_url(&self) -> String {
        join_url(&self.generation.base_url, &self.generation.img2img_path)
    }

    /// Candidate paths for the configured test face, png first
    pub fn test_image_candidates(&self) -> Vec<PathBuf> {
        let dir = Path::new(&self.kiosk.test_image_dir);
        ["png", "jpg"]
            .iter()
            .map(|ext| dir.join(format!("test_face_{}.{}", self.kiosk.test_image_index, ext)))
            .collect()
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            generation: GenerationConfig {
                base_url: default_base_url(),
                txt2img_path: default_txt2img_path(),
                img2img_path: default_img2img_path(),
                timeout_ms: default_generation_timeout(),
            },
            presets: PresetConfig {
                path: default_preset_path(),
            },
            storage: StorageConfig {
                base_path: default_storage_path(),
            },
            upload: UploadConfig {
                enabled: false,
                endpoint: None,
                token_env: None,
                timeout_ms: default_upload_timeout(),
            },
            camera: CameraConfig {
                frame_path: None,
                capture_countdown_secs: default_countdown(),
            },
            kiosk: KioskConfig {
                test_mode: false,
                test_image_dir: default_test_image_dir(),
                test_image_index: default_test_image_index(),
            },
            logging: LoggingConfig {
                level: default_log_level(),
                format: default_log_format(),
            },
        }
    }
}
