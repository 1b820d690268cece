//! Error types for the kiosk

use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, AppError>;

/// Errors raised by the kiosk components
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Failed to load presets: {0}")]
    PresetLoad(String),

    #[error("Preset engine is not initialized")]
    NotInitialized,

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Collaborator '{name}' failed: {reason}")]
    Collaborator { name: String, reason: String },

    #[error("Event '{event}' is not valid in state {state}")]
    InvalidTransition { state: String, event: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Shorthand for a collaborator failure
    pub fn collaborator(name: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        AppError::Collaborator {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error came out of the generation service round-trip
    pub fn is_generation(&self) -> bool {
        matches!(self, AppError::Generation(_) | AppError::HttpClient(_))
    }
}
