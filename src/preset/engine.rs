//! Preset engine: turns the current selection into generation payloads

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{AppError, Result};
use crate::init::Initializable;
use crate::preset::payload::RequestPayload;
use crate::preset::types::{
    Category, CategoryOptions, GenerationMode, GenerationParameters, PresetDocument, Selection,
};

/// Parameter preset engine
///
/// Holds the immutable base templates and category options once loaded, plus the
/// selection of the active session. Every request works on a copy of a template.
pub struct PresetEngine {
    path: PathBuf,
    presets: RwLock<Option<PresetDocument>>,
    selection: RwLock<Selection>,
}

impl PresetEngine {
    /// Create an engine that will load its presets from `path` on initialization
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            presets: RwLock::new(None),
            selection: RwLock::new(Selection::default()),
        }
    }

    /// Create and load an engine from a preset file
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        let engine = Self::new(path);
        engine.load()?;
        Ok(engine)
    }

    /// Create an engine directly from an in-memory document
    pub fn from_document(document: PresetDocument) -> Self {
        let engine = Self::new(PathBuf::new());
        *engine.presets.write() = Some(document);
        engine
    }

    /// Parse the configured preset resource
    ///
    /// On failure the engine is left uninitialized.
    pub fn load(&self) -> Result<()> {
        let document = match Self::read_document(&self.path) {
            Ok(document) => document,
            Err(e) => {
                *self.presets.write() = None;
                return Err(e);
            }
        };

        info!(
            path = %self.path.display(),
            genders = document.options.gender.len(),
            ages = document.options.age.len(),
            professions = document.options.profession.len(),
            "Loaded generation presets"
        );

        *self.presets.write() = Some(document);
        Ok(())
    }

    /// Read and parse a preset document, choosing YAML or JSON by extension
    pub fn read_document(path: &Path) -> Result<PresetDocument> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::PresetLoad(format!("failed to read {}: {}", path.display(), e))
        })?;

        let is_yaml = path
            .extension()
            .map_or(false, |ext| ext == "yaml" || ext == "yml");

        if is_yaml {
            serde_yaml::from_str(&content)
                .map_err(|e| AppError::PresetLoad(format!("malformed {}: {}", path.display(), e)))
        } else {
            Self::parse_json(&content)
        }
    }

    /// Parse a JSON preset document
    pub fn parse_json(content: &str) -> Result<PresetDocument> {
        serde_json::from_str(content)
            .map_err(|e| AppError::PresetLoad(format!("malformed preset document: {}", e)))
    }

    pub fn is_initialized(&self) -> bool {
        self.presets.read().is_some()
    }

    fn with_presets<T>(&self, f: impl FnOnce(&PresetDocument) -> T) -> Result<T> {
        let guard = self.presets.read();
        let presets = guard.as_ref().ok_or(AppError::NotInitialized)?;
        Ok(f(presets))
    }

    /// Labels selectable for a category
    pub fn available(&self, category: Category) -> Result<Vec<String>> {
        self.with_presets(|p| p.options.get(category).keys().cloned().collect())
    }

    /// Copy of the loaded category options
    pub fn options(&self) -> Result<CategoryOptions> {
        self.with_presets(|p| p.options.clone())
    }

    /// Record a selection if `value` is a known label of `category`
    ///
    /// Unknown labels return `Ok(false)` and leave the prior selection untouched.
    pub fn set_selection(&self, category: Category, value: &str) -> Result<bool> {
        let known = self.with_presets(|p| p.options.fragment(category, value).is_some())?;
        if !known {
            debug!(category = %category, value = %value, "Ignoring unknown selection");
            return Ok(false);
        }

        self.selection.write().set(category, value.to_string());
        info!(category = %category, value = %value, "Selection set");
        Ok(true)
    }

    pub fn selection(&self) -> Selection {
        self.selection.read().clone()
    }

    pub fn is_selection_complete(&self) -> bool {
        self.selection.read().is_complete()
    }

    pub fn clear_selection(&self) {
        *self.selection.write() = Selection::default();
    }

    /// Build the request payload for `mode` from the current selection and `input_image`
    pub fn build_payload(&self, mode: GenerationMode, input_image: &[u8]) -> Result<RequestPayload> {
        let selection = self.selection();

        let mut params = self.with_presets(|p| {
            let mut params = match mode {
                GenerationMode::Txt2Img => p.base_t2i.clone(),
                GenerationMode::Img2Img => p.base_i2i.clone(),
            };

            let fragments: Vec<&str> = Category::ALL
                .iter()
                .map(|c| {
                    selection
                        .get(*c)
                        .and_then(|label| p.options.fragment(*c, label))
                        .unwrap_or("")
                })
                .collect();

            params.prompt = format!("{}, {}", params.prompt, fragments.join(", "));
            params
        })?;

        let encoded = BASE64.encode(input_image);
        match mode {
            GenerationMode::Txt2Img => params.face_image = Some(encoded),
            GenerationMode::Img2Img => params.source_image = Some(encoded),
        }

        log_parameters(mode, &params);
        Ok(RequestPayload::from_parameters(mode, &params))
    }
}

fn log_parameters(mode: GenerationMode, params: &GenerationParameters) {
    match mode {
        GenerationMode::Txt2Img => info!(
            mode = %mode,
            model = %params.sd_model_name,
            prompt = %params.prompt,
            negative_prompt = %params.negative_prompt,
            cfg_scale = params.cfg_scale,
            roop_enabled = params.face_swap.enable,
            face_image = params.face_image.is_some(),
            restore_visibility = params.face_swap.restore_visibility,
            "Built generation parameters"
        ),
        GenerationMode::Img2Img => info!(
            mode = %mode,
            model = %params.sd_model_name,
            prompt = %params.prompt,
            negative_prompt = %params.negative_prompt,
            cfg_scale = params.cfg_scale,
            denoising_strength = params.denoising_strength,
            source_image = params.source_image.is_some(),
            "Built generation parameters"
        ),
    }
}

#[async_trait]
impl Initializable for PresetEngine {
    fn module_name(&self) -> &str {
        "presets"
    }

    async fn initialize(&self) -> Result<()> {
        self.load()
    }
}
