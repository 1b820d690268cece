//! The kiosk orchestrator

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::collaborators::{Camera, PhotoCategory, PhotoStore, Uploader};
use crate::config::Settings;
use crate::error::{AppError, Result};
use crate::init::{initialize_all, Initializable};
use crate::kiosk::side_tasks::SideTasks;
use crate::kiosk::state::{KioskEvent, KioskState, StateChange};
use crate::pipeline::PipelineClient;
use crate::preset::PresetEngine;

const NOTIFY_CAPACITY: usize = 32;

/// Flow options
#[derive(Debug, Clone, Default)]
pub struct KioskOptions {
    /// Run the diagnostic pipeline on `test_image` instead of opening the start menu
    pub test_mode: bool,
    pub test_image: Option<Vec<u8>>,
    pub capture_countdown: Duration,
}

impl KioskOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        let test_image = if settings.kiosk.test_mode {
            load_test_image(settings)
        } else {
            None
        };

        Self {
            test_mode: settings.kiosk.test_mode,
            test_image,
            capture_countdown: Duration::from_secs(settings.camera.capture_countdown_secs),
        }
    }
}

/// Read the configured test face (png preferred over jpg)
pub fn load_test_image(settings: &Settings) -> Option<Vec<u8>> {
    let candidates = settings.test_image_candidates();
    let found = candidates.iter().find(|p| p.exists());

    match found.map(|p| (p, std::fs::read(p))) {
        Some((path, Ok(bytes))) => {
            info!(path = %path.display(), "Loaded test image");
            Some(bytes)
        }
        Some((path, Err(e))) => {
            error!(path = %path.display(), error = %e, "Failed to read test image");
            None
        }
        None => {
            error!(
                dir = %Path::new(&settings.kiosk.test_image_dir).display(),
                "No test image found"
            );
            None
        }
    }
}

/// Data owned by the active session
#[derive(Debug)]
struct Session {
    id: Uuid,
    captured: Option<Vec<u8>>,
    result: Option<Vec<u8>>,
}

impl Session {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            captured: None,
            result: None,
        }
    }
}

/// Interaction state machine
///
/// Owns the session data and drives the collaborators on each state entry. Every
/// entry is announced as a [`StateChange`] on a broadcast channel the UI subscribes to.
pub struct Kiosk {
    state: KioskState,
    session: Session,
    pipeline: Arc<PipelineClient>,
    camera: Arc<dyn Camera>,
    store: Arc<dyn PhotoStore>,
    uploader: Option<Arc<dyn Uploader>>,
    modules: Vec<Arc<dyn Initializable>>,
    options: KioskOptions,
    notifier: broadcast::Sender<StateChange>,
    side_tasks: SideTasks,
}

impl Kiosk {
    pub fn new(
        pipeline: Arc<PipelineClient>,
        camera: Arc<dyn Camera>,
        store: Arc<dyn PhotoStore>,
    ) -> Self {
        let (notifier, _) = broadcast::channel(NOTIFY_CAPACITY);
        Self {
            state: KioskState::Initialize,
            session: Session::new(),
            pipeline,
            camera,
            store,
            uploader: None,
            modules: Vec::new(),
            options: KioskOptions::default(),
            notifier,
            side_tasks: SideTasks::new(),
        }
    }

    pub fn with_uploader(mut self, uploader: Arc<dyn Uploader>) -> Self {
        self.uploader = Some(uploader);
        self
    }

    /// Modules awaited by the initialization barrier
    pub fn with_modules(mut self, modules: Vec<Arc<dyn Initializable>>) -> Self {
        self.modules = modules;
        self
    }

    pub fn with_options(mut self, options: KioskOptions) -> Self {
        self.options = options;
        self
    }

    pub fn state(&self) -> KioskState {
        self.state
    }

    pub fn session_id(&self) -> Uuid {
        self.session.id
    }

    pub fn captured_photo(&self) -> Option<&[u8]> {
        self.session.captured.as_deref()
    }

    pub fn result_image(&self) -> Option<&[u8]> {
        self.session.result.as_deref()
    }

    pub fn side_tasks(&self) -> &SideTasks {
        &self.side_tasks
    }

    /// Subscribe to state-change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.notifier.subscribe()
    }

    fn presets(&self) -> &Arc<PresetEngine> {
        self.pipeline.presets()
    }

    fn enter(&mut self, state: KioskState, change: Option<StateChange>) {
        info!(from = %self.state, to = %state, session = %self.session.id, "State transition");
        self.state = state;
        if let Some(change) = change {
            // No subscribers is fine: the UI may attach later.
            let _ = self.notifier.send(change);
        }
    }

    /// Enter `Initialize`, wait for every module, then move on to `StartMenu` or `Test`
    ///
    /// A preset engine that failed to load is fatal.
    pub async fn start(&mut self) -> Result<KioskState> {
        self.enter(KioskState::Initialize, Some(StateChange::Initialize));
        info!("System initializing");

        let failures = initialize_all(&self.modules).await;
        if !self.presets().is_initialized() {
            let reason = failures
                .into_iter()
                .find(|(name, _)| name == "presets")
                .map(|(_, e)| e.to_string())
                .unwrap_or_else(|| "presets were never loaded".to_string());
            return Err(AppError::PresetLoad(reason));
        }

        if self.options.test_mode {
            self.enter_test().await;
        } else {
            self.enter_start_menu();
        }
        Ok(self.state)
    }

    /// Apply a UI event to the current state
    ///
    /// Events that are not valid in the current state are rejected without a state change.
    pub async fn handle(&mut self, event: KioskEvent) -> Result<KioskState> {
        match (self.state, event) {
            (KioskState::StartMenu, KioskEvent::Start) => self.start_interaction().await?,
            (KioskState::Options, KioskEvent::Select { category, value }) => {
                if self.presets().set_selection(category, &value)?
                    && self.presets().is_selection_complete()
                {
                    self.enter_take_photo().await?;
                }
            }
            (KioskState::TakePhoto, KioskEvent::Capture) => self.capture().await?,
            (KioskState::PhotoConfirm, KioskEvent::Confirm) => self.enter_generating().await,
            (KioskState::PhotoConfirm, KioskEvent::Retry) => {
                self.session.captured = None;
                self.enter_take_photo().await?;
            }
            (KioskState::Result, KioskEvent::Finish) => {
                info!(session = %self.session.id, "Interaction finished");
                self.enter_start_menu();
            }
            (KioskState::Test, KioskEvent::Finish) => self.enter_start_menu(),
            (state, event) => {
                return Err(AppError::InvalidTransition {
                    state: state.to_string(),
                    event: event.to_string(),
                })
            }
        }
        Ok(self.state)
    }

    /// Consume UI events until the channel closes
    pub async fn run(mut self, mut events: mpsc::Receiver<KioskEvent>) -> Self {
        while let Some(event) = events.recv().await {
            if let Err(e) = self.handle(event).await {
                warn!(state = %self.state, error = %e, "Event rejected");
            }
        }
        self.side_tasks.wait_idle().await;
        self
    }

    fn enter_start_menu(&mut self) {
        self.presets().clear_selection();
        self.session = Session::new();
        self.enter(KioskState::StartMenu, Some(StateChange::StartMenu));
    }

    async fn start_interaction(&mut self) -> Result<()> {
        if !self.camera.is_available() {
            error!("Cannot start interaction without a camera");
            return Err(AppError::collaborator("camera", "no available camera device"));
        }

        self.enter(KioskState::InteractionStart, None);
        info!(session = %self.session.id, "Interaction start");
        self.enter(KioskState::Options, Some(StateChange::Options));
        Ok(())
    }

    async fn enter_take_photo(&mut self) -> Result<()> {
        self.enter(KioskState::TakePhoto, Some(StateChange::TakePhoto));

        if let Err(e) = self.camera.open().await {
            error!(error = %e, "Failed to open camera, aborting session");
            self.enter_start_menu();
            return Err(e);
        }
        Ok(())
    }

    async fn capture(&mut self) -> Result<()> {
        if !self.options.capture_countdown.is_zero() {
            tokio::time::sleep(self.options.capture_countdown).await;
        }

        let frame = self.camera.capture_frame().await;
        self.camera.close().await;
        let photo = match frame {
            Ok(photo) => photo,
            Err(e) => {
                error!(error = %e, "Capture failed, aborting session");
                self.enter_start_menu();
                return Err(e);
            }
        };

        self.session.captured = Some(photo.clone());
        self.enter(KioskState::PhotoConfirm, Some(StateChange::PhotoConfirm { photo }));
        Ok(())
    }

    async fn enter_generating(&mut self) {
        self.enter(KioskState::SdGenerating, Some(StateChange::SdGenerating));

        let session = self.session.id;
        let captured = self.session.captured.clone().unwrap_or_default();

        let generated = self.pipeline.run(&captured).await;

        self.persist(PhotoCategory::Captured, captured);

        let (image, error) = match generated {
            Ok(output) => {
                self.persist(PhotoCategory::SdGenerated, output.img2img.clone());
                (Some(output.img2img), None)
            }
            Err(e) => {
                error!(session = %session, error = %e, "Generation failed");
                (None, Some(e.to_string()))
            }
        };

        let qr_code = match &image {
            Some(image) => self.share(image).await,
            None => None,
        };

        self.session.result = image.clone();
        self.enter(
            KioskState::Result,
            Some(StateChange::Result {
                image,
                qr_code,
                error,
            }),
        );
    }

    async fn enter_test(&mut self) {
        self.enter(KioskState::Test, None);
        info!("In test mode");

        let Some(test_image) = self.options.test_image.clone() else {
            error!("Test mode requires a test image, falling back to start menu");
            self.enter_start_menu();
            return;
        };

        let txt2img = match self.pipeline.text_to_image(&test_image).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                error!(error = %e, "Test generation failed at first stage");
                None
            }
        };

        let img2img = match &txt2img {
            Some(stage_one) => match self.pipeline.image_to_image(stage_one).await {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    error!(error = %e, "Test generation failed at second stage");
                    None
                }
            },
            None => None,
        };

        let qr_code = match &img2img {
            Some(image) => self.share(image).await,
            None => None,
        };

        let _ = self.notifier.send(StateChange::Test {
            txt2img,
            img2img,
            qr_code,
        });
    }

    fn persist(&self, category: PhotoCategory, photo: Vec<u8>) {
        let store = self.store.clone();
        self.side_tasks.spawn(
            format!("save-{}", category),
            self.session.id,
            async move { store.save_photo(category, &photo).await.map(|_| ()) },
        );
    }

    async fn share(&self, image: &[u8]) -> Option<Vec<u8>> {
        match &self.uploader {
            Some(uploader) => uploader.upload_and_get_shareable_image(image).await,
            None => None,
        }
    }
}
