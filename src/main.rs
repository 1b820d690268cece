//! Main entry point for the portrait kiosk
//!
//! Reads UI commands line by line from stdin and logs every state change, standing in
//! for the kiosk's touch UI.

use portrait_kiosk::{
    backend::SdWebUiBackend,
    collaborators::{FsPhotoStore, HttpUploader, StillImageCamera, Uploader},
    config::Settings,
    init::Initializable,
    kiosk::{Kiosk, KioskEvent, KioskOptions, StateChange},
    pipeline::PipelineClient,
    preset::PresetEngine,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/kiosk.yaml".to_string());
    let settings = Settings::load_from_path(&config_path)?;
    settings.validate()?;

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));

    if settings.logging.format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }

    info!(config = %config_path, "Starting portrait kiosk");
    info!(
        txt2img = %settings.txt2img_url(),
        img2img = %settings.img2img_url(),
        "Generation service configured"
    );

    let presets = Arc::new(PresetEngine::new(&settings.presets.path));
    let backend = Arc::new(SdWebUiBackend::new(&settings)?);
    let pipeline = Arc::new(PipelineClient::new(presets.clone(), backend));

    let camera = Arc::new(StillImageCamera::new(
        settings.camera.frame_path.as_ref().map(PathBuf::from),
    ));
    let store = Arc::new(FsPhotoStore::new(&settings.storage.base_path));

    let modules: Vec<Arc<dyn Initializable>> = vec![
        camera.clone() as Arc<dyn Initializable>,
        presets.clone() as Arc<dyn Initializable>,
    ];

    let mut kiosk = Kiosk::new(pipeline, camera, store)
        .with_modules(modules)
        .with_options(KioskOptions::from_settings(&settings));

    if settings.upload.enabled {
        let uploader: Arc<dyn Uploader> = Arc::new(HttpUploader::new(&settings.upload)?);
        kiosk = kiosk.with_uploader(uploader);
        info!("Upload enabled");
    }

    // Log state changes as the UI would render them
    let mut changes = kiosk.subscribe();
    tokio::spawn(async move {
        while let Ok(change) = changes.recv().await {
            log_state_change(&change);
        }
    });

    kiosk.start().await?;

    let (tx, rx) = mpsc::channel(16);
    let kiosk_task = tokio::spawn(kiosk.run(rx));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" || line == "exit" {
            break;
        }

        match line.parse::<KioskEvent>() {
            Ok(event) => {
                if tx.send(event).await.is_err() {
                    break;
                }
            }
            Err(e) => warn!(input = %line, error = %e, "Unrecognized command"),
        }
    }

    drop(tx);
    let kiosk = kiosk_task.await?;
    for report in kiosk.side_tasks().reports() {
        info!(task = %report.name, ok = report.succeeded(), "Side task outcome");
    }

    info!("Portrait kiosk stopped");
    Ok(())
}

fn log_state_change(change: &StateChange) {
    match change {
        StateChange::PhotoConfirm { photo } => {
            info!(state = %change.state(), photo_bytes = photo.len(), "State changed")
        }
        StateChange::Result {
            image,
            qr_code,
            error,
        } => info!(
            state = %change.state(),
            image_bytes = image.as_ref().map_or(0, Vec::len),
            qr_code = qr_code.is_some(),
            error = error.as_deref().unwrap_or(""),
            "State changed"
        ),
        StateChange::Test {
            txt2img,
            img2img,
            qr_code,
        } => info!(
            state = %change.state(),
            txt2img = txt2img.is_some(),
            img2img = img2img.is_some(),
            qr_code = qr_code.is_some(),
            "Test run completed"
        ),
        _ => info!(state = %change.state(), "State changed"),
    }
}
