//! Adapters for the kiosk's external collaborators: camera, photo storage and upload

pub mod camera;
pub mod storage;
pub mod upload;

pub use camera::{Camera, StillImageCamera};
pub use storage::{FsPhotoStore, PhotoCategory, PhotoStore};
pub use upload::{HttpUploader, Uploader};
