//! Preset data model

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Selectable option category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Gender,
    Age,
    Profession,
}

impl Category {
    /// All categories in prompt order
    pub const ALL: [Category; 3] = [Category::Gender, Category::Age, Category::Profession];
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Gender => write!(f, "gender"),
            Category::Age => write!(f, "age"),
            Category::Profession => write!(f, "profession"),
        }
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gender" => Ok(Category::Gender),
            "age" => Ok(Category::Age),
            "profession" => Ok(Category::Profession),
            other => Err(format!("unknown category '{}'", other)),
        }
    }
}

/// Generation stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationMode {
    /// Text-to-image with face lock
    Txt2Img,
    /// Image-to-image refinement
    Img2Img,
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationMode::Txt2Img => write!(f, "t2i"),
            GenerationMode::Img2Img => write!(f, "i2i"),
        }
    }
}

/// Label to prompt-fragment mappings for each category
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CategoryOptions {
    #[serde(default)]
    pub gender: BTreeMap<String, String>,
    #[serde(default)]
    pub age: BTreeMap<String, String>,
    #[serde(default)]
    pub profession: BTreeMap<String, String>,
}

impl CategoryOptions {
    pub fn get(&self, category: Category) -> &BTreeMap<String, String> {
        match category {
            Category::Gender => &self.gender,
            Category::Age => &self.age,
            Category::Profession => &self.profession,
        }
    }

    /// Prompt fragment for a label, if the label exists
    pub fn fragment(&self, category: Category, label: &str) -> Option<&str> {
        self.get(category).get(label).map(String::as_str)
    }
}

/// Face-swap (roop) post-processing parameters
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FaceSwapParams {
    #[serde(default)]
    pub enable: bool,
    #[serde(default)]
    pub faces_index: u32,
    #[serde(default)]
    pub roop_model: String,
    #[serde(default)]
    pub restore_face: String,
    #[serde(default)]
    pub restore_visibility: f32,
    #[serde(default)]
    pub upscaler: String,
    #[serde(default)]
    pub upscaler_scale: f32,
    #[serde(default)]
    pub upscaler_visibility: f32,
}

/// Base generation template for one stage family
///
/// The preset document stores these flat, so the face-swap group is flattened on
/// the wire while staying nested in Rust.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GenerationParameters {
    pub sd_model_name: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub negative_prompt: String,
    pub steps: u32,
    pub width: u32,
    pub height: u32,
    #[serde(rename = "cfgScale")]
    pub cfg_scale: f32,
    #[serde(default)]
    pub denoising_strength: f32,

    /// Face-lock image for stage one (base64)
    #[serde(rename = "imageForT2IRoop", default, skip_serializing_if = "Option::is_none")]
    pub face_image: Option<String>,

    /// Stage-one output fed into stage two (base64)
    #[serde(rename = "imageForI2I", default, skip_serializing_if = "Option::is_none")]
    pub source_image: Option<String>,

    #[serde(flatten)]
    pub face_swap: FaceSwapParams,
}

/// The preset resource as stored on disk
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PresetDocument {
    #[serde(rename = "baseSettings_t2i")]
    pub base_t2i: GenerationParameters,
    #[serde(rename = "baseSettings_i2i")]
    pub base_i2i: GenerationParameters,
    #[serde(flatten)]
    pub options: CategoryOptions,
}

/// Current choice per category
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub gender: Option<String>,
    pub age: Option<String>,
    pub profession: Option<String>,
}

impl Selection {
    pub fn get(&self, category: Category) -> Option<&str> {
        match category {
            Category::Gender => self.gender.as_deref(),
            Category::Age => self.age.as_deref(),
            Category::Profession => self.profession.as_deref(),
        }
    }

    pub fn set(&mut self, category: Category, value: String) {
        match category {
            Category::Gender => self.gender = Some(value),
            Category::Age => self.age = Some(value),
            Category::Profession => self.profession = Some(value),
        }
    }

    /// True once every category holds a value
    pub fn is_complete(&self) -> bool {
        Category::ALL.iter().all(|c| self.get(*c).is_some())
    }
}
