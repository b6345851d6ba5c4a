// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Main application state and egui App implementation.
//!
//! The app hosts an [`AnnotationSession`] over the project file, loads
//! images in the background, and routes canvas, list, toolbar and keyboard
//! input into the session.

use crate::config::AppConfig;
use crate::engine::controller::InputOutcome;
use crate::engine::detect::Detector;
use crate::engine::persistence::SaveTrigger;
use crate::engine::selection::SelectionEvent;
use crate::engine::session::{AnnotationSession, DetectionOutcome};
use crate::error::EngineError;
use crate::io::media::{self, LoadedImage};
use crate::io::serialization;
use crate::io::storage::JsonProjectStorage;
use crate::ui::canvas::{self, CanvasView};
use crate::ui::label_dialog::LabelPrompt;
use crate::ui::properties::{self, PropertiesAction, ShapeList};
use crate::ui::{shortcuts, toolbar};
use crate::util::geometry::ImageSize;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver};
use std::sync::Arc;

/// Result of a background image load, tagged with the image key.
struct LoadedImageData {
    key: String,
    result: Result<LoadedImage, String>,
}

/// Main application state.
pub struct YinTuApp {
    config: AppConfig,
    session: AnnotationSession<JsonProjectStorage>,
    detector: Option<Arc<dyn Detector>>,

    /// Folder the images were scanned from; keys are relative to it.
    folder: Option<PathBuf>,
    images: Vec<PathBuf>,
    current: usize,

    image_texture: Option<egui::TextureHandle>,
    image_loader: Option<Receiver<LoadedImageData>>,
    loading_message: Option<String>,

    canvas: CanvasView,
    list: ShapeList,
    prompt: LabelPrompt,
    last_label: String,

    /// Status line message.
    notice: Option<String>,
}

impl YinTuApp {
    /// Open the project store named by `config`.
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let storage = JsonProjectStorage::open(config.project_path())?;
        let session = AnnotationSession::new(storage, &config);
        Ok(Self {
            last_label: config.default_label.clone(),
            config,
            session,
            detector: None,
            folder: None,
            images: Vec::new(),
            current: 0,
            image_texture: None,
            image_loader: None,
            loading_message: None,
            canvas: CanvasView::new(),
            list: ShapeList::new(),
            prompt: LabelPrompt::new(),
            notice: None,
        })
    }

    /// Enable the auto-detect button with `detector`.
    pub fn with_detector(mut self, detector: Arc<dyn Detector>) -> Self {
        self.detector = Some(detector);
        self
    }

    /// Scan `folder` for images and show the first one.
    pub fn open_folder(&mut self, folder: PathBuf) {
        match media::scan_images(&folder, &self.config.image_extensions) {
            Ok(images) if images.is_empty() => {
                self.notice = Some(format!("No images found in {}", folder.display()));
            }
            Ok(images) => {
                self.images = images;
                self.folder = Some(folder);
                self.show_image(0);
            }
            Err(e) => {
                log::error!("Failed to open folder: {:#}", e);
                self.notice = Some(format!("Failed to open folder: {:#}", e));
            }
        }
    }

    /// Switch to image `index`, saving the current one first.
    fn show_image(&mut self, index: usize) {
        if self.prompt.is_open() {
            return;
        }
        let Some(path) = self.images.get(index).cloned() else {
            return;
        };
        let key = match &self.folder {
            Some(folder) => media::image_key(folder, &path),
            None => path.to_string_lossy().to_string(),
        };

        // Silent saves only log on failure.
        let _ = self.session.begin_image(&key, &path);
        self.current = index;
        self.image_texture = None;
        self.canvas.reset_view();
        self.notice = None;

        let (sender, receiver) = channel();
        self.image_loader = Some(receiver);
        self.loading_message = Some(format!("Loading {}...", key));

        std::thread::spawn(move || {
            let result = media::load_image(&path).map_err(|e| format!("{:#}", e));
            let _ = sender.send(LoadedImageData { key, result });
        });
    }

    fn step(&mut self, forward: bool) {
        if self.images.is_empty() {
            return;
        }
        let index = if forward {
            (self.current + 1).min(self.images.len() - 1)
        } else {
            self.current.saturating_sub(1)
        };
        if index != self.current {
            self.show_image(index);
        }
    }

    fn poll_image_loader(&mut self, ctx: &egui::Context) {
        let Some(receiver) = &self.image_loader else {
            return;
        };
        let Ok(loaded) = receiver.try_recv() else {
            return;
        };
        self.image_loader = None;
        self.loading_message = None;

        if self.session.image().map(|i| i.key.as_str()) != Some(loaded.key.as_str()) {
            log::debug!("Dropping load result for {}", loaded.key);
            return;
        }

        let image = match loaded.result {
            Ok(image) => image,
            Err(message) => {
                let path = self.session.image().map(|i| i.path.clone()).unwrap_or_default();
                let error = EngineError::ImageLoad { path, message };
                self.notice = Some(error.to_string());
                self.session.abort_image_load(&error);
                return;
            }
        };

        let size = match ImageSize::new(image.width, image.height) {
            Ok(size) => size,
            Err(e) => {
                self.notice = Some(e.to_string());
                self.session.abort_image_load(&e);
                return;
            }
        };
        let color_image = egui::ColorImage::from_rgba_unmultiplied(
            [image.width as usize, image.height as usize],
            &image.pixels,
        );
        self.image_texture = Some(ctx.load_texture("current_image", color_image, egui::TextureOptions::LINEAR));

        match self.session.finish_image_load(size) {
            Ok(count) => log::info!("Showing {} with {} shape(s)", loaded.key, count),
            Err(e) => self.notice = Some(e.to_string()),
        }
        self.session.refresh_views(&mut self.canvas, &mut self.list);
    }

    fn save(&mut self, trigger: SaveTrigger) {
        match self.session.save(trigger) {
            Ok(count) => self.notice = Some(format!("Saved {} annotation(s)", count)),
            Err(EngineError::NoImage) => {}
            Err(e) => self.notice = Some(format!("Save failed: {}", e)),
        }
    }

    fn delete_selected(&mut self) {
        let removed = self.session.delete_selected(&mut self.canvas, &mut self.list);
        if removed > 0 {
            self.notice = Some(format!("Deleted {} shape(s)", removed));
        }
    }

    fn trigger_detection(&mut self) {
        let Some(detector) = self.detector.clone() else {
            return;
        };
        match self.session.trigger_detection(detector) {
            Ok(()) => self.notice = Some("Detecting...".to_string()),
            Err(e) => self.notice = Some(e.to_string()),
        }
    }

    fn poll_detection(&mut self) {
        match self.session.poll_detection() {
            Some(DetectionOutcome::Applied(count)) => {
                self.notice = Some(format!("Detection found {} shape(s)", count));
                self.session.refresh_views(&mut self.canvas, &mut self.list);
            }
            Some(DetectionOutcome::Failed(error)) => {
                self.notice = Some(error.to_string());
            }
            Some(DetectionOutcome::Stale { .. }) | None => {}
        }
    }

    fn handle_outcome(&mut self, outcome: InputOutcome) {
        match outcome {
            InputOutcome::LabelRequested => self.prompt.open(&self.last_label),
            InputOutcome::SelectionChanged => {
                let selected = self.session.store().selected().clone();
                self.session
                    .sync_selection(SelectionEvent::canvas(selected), &mut self.canvas, &mut self.list);
            }
            InputOutcome::Undone(_) => self.session.refresh_views(&mut self.canvas, &mut self.list),
            InputOutcome::Rejected => self.notice = Some("Shape too small, discarded".to_string()),
            _ => {}
        }
    }

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        if self.prompt.is_open() {
            return;
        }
        let wants_text = ctx.wants_keyboard_input();
        let actions = ctx.input(|i| shortcuts::capture(i, wants_text));

        if actions.save {
            self.save(SaveTrigger::Shortcut);
        }
        if actions.undo {
            let outcome = self.session.undo_last();
            self.handle_outcome(outcome);
        }
        if actions.cancel {
            let outcome = self.session.cancel();
            if outcome == InputOutcome::SelectionChanged {
                self.session.refresh_views(&mut self.canvas, &mut self.list);
            }
        }
        if actions.delete {
            self.delete_selected();
        }
        if let Some(mode) = actions.mode {
            self.session.set_mode(mode);
        }
        if actions.previous {
            self.step(false);
        }
        if actions.next {
            self.step(true);
        }
    }

    fn export_project(&mut self, path: PathBuf) {
        match serialization::export_by_extension(self.session.storage().data(), &path) {
            Ok(()) => {
                log::info!("Exported project to {}", path.display());
                self.notice = Some(format!("Exported to {}", path.display()));
            }
            Err(e) => {
                log::error!("Failed to export project: {:#}", e);
                self.notice = Some(format!("Export failed: {:#}", e));
            }
        }
    }

    fn import_project(&mut self, path: PathBuf) {
        let imported = match serialization::import_by_extension(&path) {
            Ok(data) => data,
            Err(e) => {
                log::error!("Failed to import project: {:#}", e);
                self.notice = Some(format!("Import failed: {:#}", e));
                return;
            }
        };
        if let Err(e) = self.session.storage_mut().replace_project(imported) {
            self.notice = Some(format!("Import failed: {}", e));
            return;
        }
        match self.session.reload_image() {
            Ok(_) | Err(EngineError::NoImage) | Err(EngineError::GeometryUnavailable) => {
                self.notice = Some(format!("Imported {}", path.display()));
            }
            Err(e) => self.notice = Some(e.to_string()),
        }
        self.session.refresh_views(&mut self.canvas, &mut self.list);
    }

    fn menu_bar(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        egui::menu::bar(ui, |ui| {
            ui.menu_button("File", |ui| {
                if ui.button("Open Folder...").clicked() {
                    if let Some(folder) = rfd::FileDialog::new().pick_folder() {
                        self.open_folder(folder);
                    }
                    ui.close_menu();
                }
                if ui.button("Save (Ctrl+S)").clicked() {
                    self.save(SaveTrigger::Explicit);
                    ui.close_menu();
                }
                ui.separator();
                if ui.button("Import Project...").clicked() {
                    if let Some(path) = rfd::FileDialog::new()
                        .add_filter("Project", &["yaml", "yml", "json"])
                        .pick_file()
                    {
                        self.import_project(path);
                    }
                    ui.close_menu();
                }
                ui.menu_button("Export Project", |ui| {
                    if ui.button("Export as YAML...").clicked() {
                        if let Some(path) = rfd::FileDialog::new()
                            .add_filter("YAML", &["yaml", "yml"])
                            .set_file_name("project.yaml")
                            .save_file()
                        {
                            self.export_project(path);
                        }
                        ui.close_menu();
                    }
                    if ui.button("Export as JSON...").clicked() {
                        if let Some(path) = rfd::FileDialog::new()
                            .add_filter("JSON", &["json"])
                            .set_file_name("project.json")
                            .save_file()
                        {
                            self.export_project(path);
                        }
                        ui.close_menu();
                    }
                });
                ui.separator();
                if ui.button("Quit").clicked() {
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
            });

            ui.menu_button("Edit", |ui| {
                if ui.button("Undo Last Shape (Ctrl+Z)").clicked() {
                    let outcome = self.session.undo_last();
                    self.handle_outcome(outcome);
                    ui.close_menu();
                }
                if ui.button("Delete Selected").clicked() {
                    self.delete_selected();
                    ui.close_menu();
                }
            });

            ui.menu_button("Navigate", |ui| {
                if ui.button("Previous Image (A)").clicked() {
                    self.step(false);
                    ui.close_menu();
                }
                if ui.button("Next Image (D)").clicked() {
                    self.step(true);
                    ui.close_menu();
                }
            });

            ui.menu_button("View", |ui| {
                if ui.button("Zoom In").clicked() {
                    self.canvas.zoom_by(1.25);
                    ui.close_menu();
                }
                if ui.button("Zoom Out").clicked() {
                    self.canvas.zoom_by(0.8);
                    ui.close_menu();
                }
                if ui.button("Reset Zoom").clicked() {
                    self.canvas.reset_view();
                    ui.close_menu();
                }
            });
        });
    }
}

impl eframe::App for YinTuApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_image_loader(ctx);
        self.poll_detection();
        if self.loading_message.is_some() || self.session.detection_busy() {
            ctx.request_repaint();
        }

        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| self.menu_bar(ctx, ui));

        let detect = self.detector.as_ref().map(|_| !self.session.detection_busy());
        let toolbar_action = egui::TopBottomPanel::top("toolbar")
            .show(ctx, |ui| toolbar::show(ui, self.session.mode(), detect))
            .inner;
        match toolbar_action {
            toolbar::ToolbarAction::SetMode(mode) => self.session.set_mode(mode),
            toolbar::ToolbarAction::Detect => self.trigger_detection(),
            toolbar::ToolbarAction::None => {}
        }

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                match self.session.image() {
                    Some(image) => ui.label(format!(
                        "{} ({}/{})",
                        image.key,
                        self.current + 1,
                        self.images.len()
                    )),
                    None => ui.label("No image"),
                };
                if self.session.annotations_locked() {
                    ui.separator();
                    ui.colored_label(egui::Color32::LIGHT_RED, "Read-only: annotations failed to load");
                }
                if let Some(notice) = &self.notice {
                    ui.separator();
                    ui.label(notice);
                }
            });
        });

        let labels = self.session.labels();
        let properties_action = egui::SidePanel::right("properties")
            .default_width(250.0)
            .show(ctx, |ui| properties::show(ui, &mut self.list, self.session.store(), &labels))
            .inner;
        match properties_action {
            PropertiesAction::Select(event) => {
                self.session.sync_selection(event, &mut self.canvas, &mut self.list);
            }
            PropertiesAction::DeleteSelected => self.delete_selected(),
            PropertiesAction::None => {}
        }

        self.handle_shortcuts(ctx);

        let canvas_output = egui::CentralPanel::default()
            .show(ctx, |ui| {
                if let Some(message) = &self.loading_message {
                    ui.centered_and_justified(|ui| {
                        ui.vertical_centered(|ui| {
                            ui.spinner();
                            ui.label(
                                egui::RichText::new(message)
                                    .size(16.0)
                                    .color(egui::Color32::from_gray(200)),
                            );
                        });
                    });
                    return canvas::CanvasOutput::default();
                }
                canvas::show(
                    ui,
                    &mut self.canvas,
                    self.image_texture.as_ref(),
                    self.session.image().and_then(|i| i.size),
                    self.session.store(),
                    self.session.controller(),
                )
            })
            .inner;

        for event in canvas_output.events {
            match self.session.pointer(event, canvas_output.zoom) {
                Ok(outcome) => self.handle_outcome(outcome),
                Err(e) => log::debug!("Pointer input ignored: {}", e),
            }
        }

        if let Some(answer) = self.prompt.show(ctx, &labels) {
            match self.session.resolve_label(answer.into_label()) {
                Ok(InputOutcome::Committed(id)) => {
                    if let Some(shape) = self.session.store().get(id) {
                        self.last_label = shape.label.clone();
                    }
                }
                Ok(_) => {}
                Err(e) => self.notice = Some(e.to_string()),
            }
        }
    }
}
