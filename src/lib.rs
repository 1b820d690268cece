//! Portrait Kiosk
//!
//! Orchestrates an unattended kiosk session: option selection, photo capture and a
//! two-stage Stable Diffusion pipeline (face-locked txt2img, then img2img) that turns
//! the captured face into a generated portrait.

pub mod backend;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod init;
pub mod kiosk;
pub mod pipeline;
pub mod preset;

pub use error::{AppError, Result};
