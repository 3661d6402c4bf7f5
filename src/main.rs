use eframe::egui;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod app;
mod canvas;
mod config;
mod error;
mod export;
mod geometry;
mod overlay;
mod position;
mod render;
mod source;
mod transform;

use app::PositionAnnotatorApp;

const APP_NAME: &str = "position-annotator";

fn setup_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,position_annotator=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

// ── Main ────────────────────────────────────────────────────────────────────

fn main() -> eframe::Result {
    setup_logging();

    // an optional image or PDF to open right away
    let initial = std::env::args().nth(1).map(PathBuf::from);
    if let Some(path) = &initial {
        if !path.exists() {
            eprintln!("File not found: {}", path.display());
            std::process::exit(1);
        }
    }

    let loaded = config::load_config(config::config_path());
    info!(path = ?loaded.config.config_path, "starting {APP_NAME}");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_title(APP_NAME),
        ..Default::default()
    };

    eframe::run_native(
        APP_NAME,
        options,
        Box::new(move |cc| Ok(Box::new(PositionAnnotatorApp::new(cc, loaded, initial)))),
    )
    .inspect_err(|e| error!("eframe exited with an error: {e}"))
}
