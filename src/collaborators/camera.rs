//! Camera collaborator

use async_trait::async_trait;
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info};

use crate::error::{AppError, Result};
use crate::init::Initializable;

/// Camera device used to capture the user's face
#[async_trait]
pub trait Camera: Send + Sync {
    /// Whether a device was found during initialization
    fn is_available(&self) -> bool;

    /// Start the preview stream
    async fn open(&self) -> Result<()>;

    /// Stop the preview stream
    async fn close(&self);

    /// Grab the current frame as encoded image bytes
    async fn capture_frame(&self) -> Result<Vec<u8>>;
}

/// Camera that serves a fixed image file as its only frame
///
/// Used on headless kiosks and for demos where no capture device is attached.
pub struct StillImageCamera {
    frame_path: Option<PathBuf>,
    frame: RwLock<Option<Vec<u8>>>,
    streaming: AtomicBool,
}

impl StillImageCamera {
    pub fn new(frame_path: Option<PathBuf>) -> Self {
        Self {
            frame_path,
            frame: RwLock::new(None),
            streaming: AtomicBool::new(false),
        }
    }

    /// Camera preloaded with an in-memory frame
    pub fn with_frame(frame: Vec<u8>) -> Self {
        Self {
            frame_path: None,
            frame: RwLock::new(Some(frame)),
            streaming: AtomicBool::new(false),
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Camera for StillImageCamera {
    fn is_available(&self) -> bool {
        self.frame.read().is_some()
    }

    async fn open(&self) -> Result<()> {
        if !self.is_available() {
            return Err(AppError::collaborator("camera", "no available camera device"));
        }
        self.streaming.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) {
        self.streaming.store(false, Ordering::SeqCst);
    }

    async fn capture_frame(&self) -> Result<Vec<u8>> {
        if !self.is_streaming() {
            return Err(AppError::collaborator("camera", "camera is not open"));
        }
        self.frame
            .read()
            .clone()
            .ok_or_else(|| AppError::collaborator("camera", "no frame available"))
    }
}

#[async_trait]
impl Initializable for StillImageCamera {
    fn module_name(&self) -> &str {
        "camera"
    }

    /// A missing device is logged but does not fail initialization; sessions are
    /// refused later instead.
    async fn initialize(&self) -> Result<()> {
        let Some(path) = &self.frame_path else {
            if !self.is_available() {
                error!("No available camera devices found");
            }
            return Ok(());
        };

        match tokio::fs::read(path).await {
            Ok(bytes) => {
                info!(path = %path.display(), "Found available camera device");
                *self.frame.write() = Some(bytes);
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "No available camera devices found");
            }
        }
        Ok(())
    }
}
