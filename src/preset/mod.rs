//! Parameter presets: category options, base templates and request payloads

pub mod engine;
pub mod payload;
pub mod types;

pub use engine::PresetEngine;
pub use payload::{Img2ImgPayload, RequestPayload, Txt2ImgPayload};
pub use types::{
    Category, CategoryOptions, FaceSwapParams, GenerationMode, GenerationParameters,
    PresetDocument, Selection,
};
