//! Functional tests for the kiosk session flow

#[path = "../common/mod.rs"]
mod common;

use async_trait::async_trait;
use common::*;
use portrait_kiosk::backend::SdWebUiBackend;
use portrait_kiosk::collaborators::{Camera, PhotoCategory, StillImageCamera};
use portrait_kiosk::kiosk::{Kiosk, KioskEvent, KioskState, StateChange};
use portrait_kiosk::pipeline::PipelineClient;
use portrait_kiosk::preset::Category;
use portrait_kiosk::{AppError, Result};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PHOTO: &[u8] = b"\x89PNG captured face";

/// Camera whose first `failures` captures drop the frame
struct FlakyCamera {
    failures: usize,
    captures: AtomicUsize,
    open: AtomicBool,
}

impl FlakyCamera {
    fn new(failures: usize) -> Self {
        Self {
            failures,
            captures: AtomicUsize::new(0),
            open: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Camera for FlakyCamera {
    fn is_available(&self) -> bool {
        true
    }

    async fn open(&self) -> Result<()> {
        self.open.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    async fn capture_frame(&self) -> Result<Vec<u8>> {
        if !self.open.load(Ordering::SeqCst) {
            return Err(AppError::collaborator("camera", "camera is not open"));
        }
        if self.captures.fetch_add(1, Ordering::SeqCst) < self.failures {
            return Err(AppError::collaborator("camera", "dropped frame"));
        }
        Ok(PHOTO.to_vec())
    }
}

fn build_kiosk_with_camera(
    server: &MockServer,
    store: Arc<MemoryStore>,
    camera: Arc<dyn Camera>,
) -> Kiosk {
    let settings = settings_for(server);
    let backend = Arc::new(SdWebUiBackend::new(&settings).unwrap());
    let pipeline = Arc::new(PipelineClient::new(Arc::new(preset_engine()), backend));
    Kiosk::new(pipeline, camera, store)
}

fn build_kiosk(server: &MockServer, store: Arc<MemoryStore>) -> Kiosk {
    let camera = Arc::new(StillImageCamera::with_frame(PHOTO.to_vec()));
    build_kiosk_with_camera(server, store, camera)
}

fn select(category: Category, value: &str) -> KioskEvent {
    KioskEvent::Select {
        category,
        value: value.to_string(),
    }
}

fn drain(changes: &mut broadcast::Receiver<StateChange>) -> Vec<StateChange> {
    let mut received = Vec::new();
    while let Ok(change) = changes.try_recv() {
        received.push(change);
    }
    received
}

async fn walk_to_photo_confirm(kiosk: &mut Kiosk) {
    kiosk.handle(KioskEvent::Start).await.unwrap();
    kiosk.handle(select(Category::Gender, "female")).await.unwrap();
    kiosk.handle(select(Category::Age, "adult")).await.unwrap();
    kiosk.handle(select(Category::Profession, "chef")).await.unwrap();
    assert_eq!(
        kiosk.handle(KioskEvent::Capture).await.unwrap(),
        KioskState::PhotoConfirm
    );
}

#[tokio::test]
async fn test_full_session_produces_second_stage_image() {
    let server = MockServer::start().await;
    mount_stages(&server, b"t2i-output", b"i2i-output").await;

    let store = Arc::new(MemoryStore::default());
    let mut kiosk = build_kiosk(&server, store.clone())
        .with_uploader(Arc::new(FixedUploader(Some(b"qr-png".to_vec()))));

    assert_eq!(kiosk.start().await.unwrap(), KioskState::StartMenu);
    let mut changes = kiosk.subscribe();

    walk_to_photo_confirm(&mut kiosk).await;
    assert_eq!(kiosk.captured_photo(), Some(PHOTO));

    assert_eq!(kiosk.handle(KioskEvent::Confirm).await.unwrap(), KioskState::Result);
    assert_eq!(kiosk.result_image(), Some(&b"i2i-output"[..]));

    let received = drain(&mut changes);
    let states: Vec<KioskState> = received.iter().map(StateChange::state).collect();
    assert_eq!(
        states,
        vec![
            KioskState::Options,
            KioskState::TakePhoto,
            KioskState::PhotoConfirm,
            KioskState::SdGenerating,
            KioskState::Result,
        ]
    );

    match received.last().unwrap() {
        StateChange::Result { image, qr_code, error } => {
            assert_eq!(image.as_deref(), Some(&b"i2i-output"[..]));
            assert_eq!(qr_code.as_deref(), Some(&b"qr-png"[..]));
            assert!(error.is_none());
        }
        other => panic!("unexpected change {:?}", other),
    }

    // exactly one call per stage, stage two fed with stage one's output
    assert_eq!(request_paths(&server).await, vec![TXT2IMG, IMG2IMG]);
    let txt2img = request_body(&server, 0).await;
    assert_eq!(
        txt2img["prompt"],
        format!(
            "{}, a woman, around 35 years old, wearing a chef uniform",
            T2I_BASE_PROMPT
        )
    );
    assert_eq!(txt2img["alwayson_scripts"]["roop"]["args"][0], b64(PHOTO));
    let img2img = request_body(&server, 1).await;
    assert_eq!(img2img["init_images"][0], b64(b"t2i-output"));

    kiosk.side_tasks().wait_idle().await;
    let saved = store.saved.lock().clone();
    assert_eq!(saved.len(), 2);
    assert!(saved.contains(&(PhotoCategory::Captured, PHOTO.to_vec())));
    assert!(saved.contains(&(PhotoCategory::SdGenerated, b"i2i-output".to_vec())));

    let finished_session = kiosk.session_id();
    assert_eq!(kiosk.handle(KioskEvent::Finish).await.unwrap(), KioskState::StartMenu);
    assert_ne!(kiosk.session_id(), finished_session);
    assert!(kiosk.captured_photo().is_none());
}

#[tokio::test]
async fn test_retry_loops_without_generating() {
    let server = MockServer::start().await;
    let mut kiosk = build_kiosk(&server, Arc::new(MemoryStore::default()));
    kiosk.start().await.unwrap();
    let mut changes = kiosk.subscribe();

    walk_to_photo_confirm(&mut kiosk).await;
    for _ in 0..25 {
        assert_eq!(kiosk.handle(KioskEvent::Retry).await.unwrap(), KioskState::TakePhoto);
        assert_eq!(
            kiosk.handle(KioskEvent::Capture).await.unwrap(),
            KioskState::PhotoConfirm
        );
    }

    let states: Vec<KioskState> = drain(&mut changes).iter().map(StateChange::state).collect();
    assert!(!states.contains(&KioskState::SdGenerating));
    assert!(request_paths(&server).await.is_empty());
}

#[tokio::test]
async fn test_failed_capture_returns_to_start_menu() {
    let server = MockServer::start().await;
    let camera = Arc::new(FlakyCamera::new(1));
    let mut kiosk =
        build_kiosk_with_camera(&server, Arc::new(MemoryStore::default()), camera.clone());
    kiosk.start().await.unwrap();
    let mut changes = kiosk.subscribe();

    kiosk.handle(KioskEvent::Start).await.unwrap();
    kiosk.handle(select(Category::Gender, "male")).await.unwrap();
    kiosk.handle(select(Category::Age, "adult")).await.unwrap();
    assert_eq!(
        kiosk.handle(select(Category::Profession, "pilot")).await.unwrap(),
        KioskState::TakePhoto
    );
    let aborted_session = kiosk.session_id();

    let err = kiosk.handle(KioskEvent::Capture).await.unwrap_err();
    assert!(err.to_string().contains("dropped frame"));
    assert_eq!(kiosk.state(), KioskState::StartMenu);
    assert_ne!(kiosk.session_id(), aborted_session);
    assert!(!camera.open.load(Ordering::SeqCst));

    let states: Vec<KioskState> = drain(&mut changes).iter().map(StateChange::state).collect();
    assert_eq!(states.last(), Some(&KioskState::StartMenu));

    // the next session starts from scratch and captures normally
    walk_to_photo_confirm(&mut kiosk).await;
    assert_eq!(kiosk.captured_photo(), Some(PHOTO));
    assert!(request_paths(&server).await.is_empty());
}

#[tokio::test]
async fn test_first_stage_failure_reaches_result_without_image() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TXT2IMG))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(IMG2IMG))
        .respond_with(ResponseTemplate::new(200).set_body_json(images_body(b"never")))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::default());
    let mut kiosk = build_kiosk(&server, store.clone())
        .with_uploader(Arc::new(FixedUploader(Some(b"qr".to_vec()))));
    kiosk.start().await.unwrap();
    let mut changes = kiosk.subscribe();

    walk_to_photo_confirm(&mut kiosk).await;
    assert_eq!(kiosk.handle(KioskEvent::Confirm).await.unwrap(), KioskState::Result);

    match drain(&mut changes).pop().unwrap() {
        StateChange::Result { image, qr_code, error } => {
            assert!(image.is_none());
            assert!(qr_code.is_none());
            assert!(error.unwrap().contains("500"));
        }
        other => panic!("unexpected change {:?}", other),
    }
    assert_eq!(request_paths(&server).await, vec![TXT2IMG]);

    kiosk.side_tasks().wait_idle().await;
    let saved = store.saved.lock().clone();
    assert_eq!(saved, vec![(PhotoCategory::Captured, PHOTO.to_vec())]);
}

#[tokio::test]
async fn test_storage_failure_does_not_abort_session() {
    let server = MockServer::start().await;
    mount_stages(&server, b"one", b"two").await;

    let store = Arc::new(MemoryStore {
        fail: true,
        ..Default::default()
    });
    let mut kiosk = build_kiosk(&server, store);
    kiosk.start().await.unwrap();

    walk_to_photo_confirm(&mut kiosk).await;
    assert_eq!(kiosk.handle(KioskEvent::Confirm).await.unwrap(), KioskState::Result);
    assert_eq!(kiosk.result_image(), Some(&b"two"[..]));

    kiosk.side_tasks().wait_idle().await;
    let reports = kiosk.side_tasks().reports();
    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| !r.succeeded()));
}

#[tokio::test]
async fn test_event_loop_drives_session_from_channel() {
    let server = MockServer::start().await;
    mount_stages(&server, b"one", b"two").await;

    let mut kiosk = build_kiosk(&server, Arc::new(MemoryStore::default()));
    kiosk.start().await.unwrap();
    let mut changes = kiosk.subscribe();

    let (tx, rx) = mpsc::channel(16);
    let task = tokio::spawn(kiosk.run(rx));

    for event in [
        KioskEvent::Start,
        select(Category::Gender, "male"),
        select(Category::Age, "elderly"),
        select(Category::Profession, "pilot"),
        KioskEvent::Capture,
        // rejected: not valid in PhotoConfirm
        KioskEvent::Finish,
        KioskEvent::Confirm,
        KioskEvent::Finish,
    ] {
        tx.send(event).await.unwrap();
    }
    drop(tx);

    let kiosk = task.await.unwrap();
    assert_eq!(kiosk.state(), KioskState::StartMenu);

    let states: Vec<KioskState> = drain(&mut changes).iter().map(StateChange::state).collect();
    assert_eq!(
        states,
        vec![
            KioskState::Options,
            KioskState::TakePhoto,
            KioskState::PhotoConfirm,
            KioskState::SdGenerating,
            KioskState::Result,
            KioskState::StartMenu,
        ]
    );
    assert_eq!(request_paths(&server).await, vec![TXT2IMG, IMG2IMG]);
}
