// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! YinTu - interactive image annotation for detection datasets.
//!
//! Desktop front end: draws rectangles and polygons over images, keeps a
//! per-project label vocabulary and saves normalized annotations.

use anyhow::Result;
use std::path::{Path, PathBuf};
use yintu::app::YinTuApp;
use yintu::config::{AppConfig, CONFIG_FILE};

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    let config = AppConfig::load(Path::new(CONFIG_FILE))?;
    let start_folder = std::env::args().nth(1).map(PathBuf::from);

    let mut app = YinTuApp::new(config)?;
    if let Some(folder) = start_folder {
        app.open_folder(folder);
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_min_inner_size([800.0, 600.0])
            .with_title("YinTu - Image Annotation"),
        ..Default::default()
    };

    eframe::run_native("YinTu", options, Box::new(|_cc| Ok(Box::new(app))))
        .map_err(|e| anyhow::anyhow!("Application error: {}", e))?;

    Ok(())
}
