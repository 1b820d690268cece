//! Wire payloads for the generation service

use serde::ser::{SerializeTuple, Serializer};
use serde::Serialize;

use crate::preset::types::{FaceSwapParams, GenerationMode, GenerationParameters};

/// Fields shared by both stages
#[derive(Debug, Clone, Serialize)]
pub struct CommonFields {
    pub sd_model_name: String,
    pub prompt: String,
    pub negative_prompt: String,
    pub steps: u32,
    pub width: u32,
    pub height: u32,
    #[serde(rename = "cfgScale")]
    pub cfg_scale: f32,
}

impl From<&GenerationParameters> for CommonFields {
    fn from(params: &GenerationParameters) -> Self {
        Self {
            sd_model_name: params.sd_model_name.clone(),
            prompt: params.prompt.clone(),
            negative_prompt: params.negative_prompt.clone(),
            steps: params.steps,
            width: params.width,
            height: params.height,
            cfg_scale: params.cfg_scale,
        }
    }
}

/// Positional arguments of the roop face-swap script
#[derive(Debug, Clone)]
pub struct RoopArgs {
    pub face_image: String,
    pub params: FaceSwapParams,
}

impl RoopArgs {
    /// Number of positional arguments the script expects
    pub const LEN: usize = 11;
}

impl Serialize for RoopArgs {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut args = serializer.serialize_tuple(Self::LEN)?;
        args.serialize_element(&self.face_image)?;
        args.serialize_element(&self.params.enable)?;
        args.serialize_element(&self.params.faces_index)?;
        args.serialize_element(&self.params.roop_model)?;
        args.serialize_element(&self.params.restore_face)?;
        args.serialize_element(&self.params.restore_visibility)?;
        args.serialize_element(&self.params.upscaler)?;
        args.serialize_element(&self.params.upscaler_scale)?;
        args.serialize_element(&self.params.upscaler_visibility)?;
        // swap in source image, swap in generated image
        args.serialize_element(&false)?;
        args.serialize_element(&true)?;
        args.end()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RoopScript {
    pub args: RoopArgs,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlwaysOnScripts {
    pub roop: RoopScript,
}

/// Stage-one request body
#[derive(Debug, Clone, Serialize)]
pub struct Txt2ImgPayload {
    #[serde(flatten)]
    pub common: CommonFields,
    pub alwayson_scripts: AlwaysOnScripts,
}

/// Stage-two request body
#[derive(Debug, Clone, Serialize)]
pub struct Img2ImgPayload {
    #[serde(flatten)]
    pub common: CommonFields,
    pub denoising_strength: f32,
    pub init_images: Vec<String>,
}

/// Mode-tagged request payload, serialized as the bare body of its mode
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum RequestPayload {
    Txt2Img(Txt2ImgPayload),
    Img2Img(Img2ImgPayload),
}

impl RequestPayload {
    /// Project a populated template into the wire shape for `mode`
    pub fn from_parameters(mode: GenerationMode, params: &GenerationParameters) -> Self {
        let common = CommonFields::from(params);
        match mode {
            GenerationMode::Txt2Img => RequestPayload::Txt2Img(Txt2ImgPayload {
                common,
                alwayson_scripts: AlwaysOnScripts {
                    roop: RoopScript {
                        args: RoopArgs {
                            face_image: params.face_image.clone().unwrap_or_default(),
                            params: params.face_swap.clone(),
                        },
                    },
                },
            }),
            GenerationMode::Img2Img => RequestPayload::Img2Img(Img2ImgPayload {
                common,
                denoising_strength: params.denoising_strength,
                init_images: vec![params.source_image.clone().unwrap_or_default()],
            }),
        }
    }

    pub fn mode(&self) -> GenerationMode {
        match self {
            RequestPayload::Txt2Img(_) => GenerationMode::Txt2Img,
            RequestPayload::Img2Img(_) => GenerationMode::Img2Img,
        }
    }

    pub fn common(&self) -> &CommonFields {
        match self {
            RequestPayload::Txt2Img(p) => &p.common,
            RequestPayload::Img2Img(p) => &p.common,
        }
    }

    pub fn prompt(&self) -> &str {
        &self.common().prompt
    }

    /// Base64 image carried by the payload
    pub fn image(&self) -> &str {
        match self {
            RequestPayload::Txt2Img(p) => &p.alwayson_scripts.roop.args.face_image,
            RequestPayload::Img2Img(p) => p.init_images.first().map(String::as_str).unwrap_or(""),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
