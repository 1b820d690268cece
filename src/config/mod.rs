//! Configuration loading

pub mod settings;

pub use settings::{
    CameraConfig, GenerationConfig, KioskConfig, LoggingConfig, PresetConfig, Settings,
    StorageConfig, UploadConfig,
};
