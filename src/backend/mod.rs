//! Backend module - generation service trait and HTTP client

pub mod sd_backend;
pub mod traits;

pub use sd_backend::SdWebUiBackend;
pub use traits::{GenerationBackend, GenerationResponse};
