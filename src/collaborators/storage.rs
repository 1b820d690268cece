//! Photo storage collaborator

use async_trait::async_trait;
use chrono::Local;
use std::fmt;
use std::path::PathBuf;
use tracing::debug;

use crate::error::Result;

/// Kind of photo being stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoCategory {
    Captured,
    SdGenerated,
}

impl fmt::Display for PhotoCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhotoCategory::Captured => write!(f, "Captured"),
            PhotoCategory::SdGenerated => write!(f, "SDGenerated"),
        }
    }
}

/// Persists captured and generated photos
#[async_trait]
pub trait PhotoStore: Send + Sync {
    async fn save_photo(&self, category: PhotoCategory, photo: &[u8]) -> Result<PathBuf>;
}

/// Writes photos to `<base>/<YYYYMMDD>/<Category>Photos/<HHMMSS>.png`
pub struct FsPhotoStore {
    base_path: PathBuf,
}

impl FsPhotoStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }
}

#[async_trait]
impl PhotoStore for FsPhotoStore {
    async fn save_photo(&self, category: PhotoCategory, photo: &[u8]) -> Result<PathBuf> {
        let now = Local::now();
        let dir = self
            .base_path
            .join(now.format("%Y%m%d").to_string())
            .join(format!("{}Photos", category));

        tokio::fs::create_dir_all(&dir).await?;

        let file_path = dir.join(format!("{}.png", now.format("%H%M%S")));
        tokio::fs::write(&file_path, photo).await?;

        debug!(category = %category, path = %file_path.display(), "Saved photo");
        Ok(file_path)
    }
}
