//! Kiosk states, UI events and state-change notifications

use std::fmt;
use std::str::FromStr;

use crate::preset::Category;

/// States of the interaction flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KioskState {
    Initialize,
    Test,
    StartMenu,
    /// Transient; the machine passes through it straight into `Options`
    InteractionStart,
    Options,
    TakePhoto,
    PhotoConfirm,
    SdGenerating,
    Result,
}

impl fmt::Display for KioskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KioskState::Initialize => "Initialize",
            KioskState::Test => "Test",
            KioskState::StartMenu => "StartMenu",
            KioskState::InteractionStart => "InteractionStart",
            KioskState::Options => "Options",
            KioskState::TakePhoto => "TakePhoto",
            KioskState::PhotoConfirm => "PhotoConfirm",
            KioskState::SdGenerating => "SDGenerating",
            KioskState::Result => "Result",
        };
        f.write_str(name)
    }
}

/// User input coming from the UI layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KioskEvent {
    /// Start button on the start menu
    Start,
    /// Option button pressed
    Select { category: Category, value: String },
    /// Shutter button
    Capture,
    /// Accept the captured photo
    Confirm,
    /// Take the photo again
    Retry,
    /// Leave the result screen
    Finish,
}

impl fmt::Display for KioskEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KioskEvent::Start => write!(f, "start"),
            KioskEvent::Select { category, value } => write!(f, "select {} {}", category, value),
            KioskEvent::Capture => write!(f, "capture"),
            KioskEvent::Confirm => write!(f, "confirm"),
            KioskEvent::Retry => write!(f, "retry"),
            KioskEvent::Finish => write!(f, "finish"),
        }
    }
}

impl FromStr for KioskEvent {
    type Err = String;

    /// Parse a console command such as `select gender female`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let command = parts.next().ok_or_else(|| "empty command".to_string())?;

        match command.to_lowercase().as_str() {
            "start" => Ok(KioskEvent::Start),
            "capture" | "shot" => Ok(KioskEvent::Capture),
            "confirm" => Ok(KioskEvent::Confirm),
            "retry" => Ok(KioskEvent::Retry),
            "finish" => Ok(KioskEvent::Finish),
            "select" => {
                let category = parts
                    .next()
                    .ok_or_else(|| "usage: select <category> <value>".to_string())?
                    .parse::<Category>()?;
                let value = parts.collect::<Vec<_>>().join(" ");
                if value.is_empty() {
                    return Err("usage: select <category> <value>".to_string());
                }
                Ok(KioskEvent::Select { category, value })
            }
            other => Err(format!("unknown command '{}'", other)),
        }
    }
}

/// Notification broadcast on every state entry, carrying that state's payload
#[derive(Debug, Clone)]
pub enum StateChange {
    Initialize,
    Test {
        txt2img: Option<Vec<u8>>,
        img2img: Option<Vec<u8>>,
        qr_code: Option<Vec<u8>>,
    },
    StartMenu,
    Options,
    TakePhoto,
    PhotoConfirm {
        photo: Vec<u8>,
    },
    SdGenerating,
    Result {
        image: Option<Vec<u8>>,
        qr_code: Option<Vec<u8>>,
        /// Why `image` is missing, when generation failed
        error: Option<String>,
    },
}

impl StateChange {
    pub fn state(&self) -> KioskState {
        match self {
            StateChange::Initialize => KioskState::Initialize,
            StateChange::Test { .. } => KioskState::Test,
            StateChange::StartMenu => KioskState::StartMenu,
            StateChange::Options => KioskState::Options,
            StateChange::TakePhoto => KioskState::TakePhoto,
            StateChange::PhotoConfirm { .. } => KioskState::PhotoConfirm,
            StateChange::SdGenerating => KioskState::SdGenerating,
            StateChange::Result { .. } => KioskState::Result,
        }
    }
}
