// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annotation session for the displayed image.
//!
//! The session owns the shape store, the mode controller, the selection
//! synchronizer and the detector runner, and talks to storage through the
//! persistence adapter. All methods run on the interaction thread.

use crate::config::AppConfig;
use crate::engine::controller::{InputOutcome, LabelDialog, Mode, ModeController, PointerEvent};
use crate::engine::detect::{detections_to_shapes, DetectionEvent, DetectionRunner, Detector};
use crate::engine::persistence::{self, AnnotationStorage, SaveTrigger};
use crate::engine::selection::{SelectionEvent, SelectionSync, SelectionView};
use crate::engine::store::ShapeStore;
use crate::error::EngineError;
use crate::models::project::LabelVocabulary;
use crate::util::geometry::{require_size, ImageSize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// The image currently shown.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageContext {
    pub key: String,
    pub path: PathBuf,
    /// `None` until the image has been decoded.
    pub size: Option<ImageSize>,
}

/// What happened to a finished detection request.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectionOutcome {
    /// The store now holds exactly these many detector shapes.
    Applied(usize),
    /// The result targeted an image that is no longer displayed.
    Stale { image_key: String },
    /// The detector failed; the store is unchanged.
    Failed(EngineError),
}

/// Interactive annotation session over a storage backend.
pub struct AnnotationSession<S> {
    storage: S,
    store: ShapeStore,
    controller: ModeController,
    selection: SelectionSync,
    detection: DetectionRunner,
    image: Option<ImageContext>,
    /// Stored annotations for the current image could not be read. Saving
    /// would overwrite them with an empty set, so editing stays locked.
    load_failed: bool,
    target_classes: Vec<String>,
}

impl<S: AnnotationStorage + LabelVocabulary> AnnotationSession<S> {
    pub fn new(storage: S, config: &AppConfig) -> Self {
        Self {
            storage,
            store: ShapeStore::new(),
            controller: ModeController::new(config.controller_settings()),
            selection: SelectionSync::new(),
            detection: DetectionRunner::new(),
            image: None,
            load_failed: false,
            target_classes: config.detector.target_classes.clone(),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn store(&self) -> &ShapeStore {
        &self.store
    }

    pub fn controller(&self) -> &ModeController {
        &self.controller
    }

    pub fn selection(&self) -> &SelectionSync {
        &self.selection
    }

    pub fn image(&self) -> Option<&ImageContext> {
        self.image.as_ref()
    }

    pub fn labels(&self) -> Vec<String> {
        self.storage.labels()
    }

    pub fn mode(&self) -> Mode {
        self.controller.mode()
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.controller.set_mode(mode);
    }

    /// Switch to a new image whose pixels are still loading.
    ///
    /// The current image is saved silently first. A failed implicit save is
    /// logged and returned, but never blocks the switch.
    pub fn begin_image(&mut self, key: &str, path: &Path) -> Option<EngineError> {
        let save_error = self.save_before_leaving();
        self.clear_current();
        self.image = Some(ImageContext {
            key: key.to_string(),
            path: path.to_path_buf(),
            size: None,
        });
        log::debug!("Loading image {}", key);
        save_error
    }

    /// The pending image finished decoding; populate the store from storage.
    pub fn finish_image_load(&mut self, size: ImageSize) -> Result<usize, EngineError> {
        let image = self.image.as_mut().ok_or(EngineError::NoImage)?;
        image.size = Some(size);
        let key = image.key.clone();
        let loaded = self
            .storage
            .load_records(&key)
            .and_then(|records| persistence::shapes_from_records(records, size, &mut self.storage));
        match loaded {
            Ok(shapes) => {
                self.load_failed = false;
                self.store.replace_all(shapes);
                log::info!("Loaded {} annotation(s) for {}", self.store.len(), key);
                Ok(self.store.len())
            }
            Err(e) => {
                log::error!("Failed to load annotations for {}: {}", key, e);
                self.store.clear();
                self.load_failed = true;
                Err(e)
            }
        }
    }

    /// The pending image could not be read: clear the canvas.
    pub fn abort_image_load(&mut self, error: &EngineError) {
        log::warn!("Image load aborted: {}", error);
        self.clear_current();
        self.image = None;
    }

    /// Drop unsaved edits and rebuild the store from storage.
    pub fn reload_image(&mut self) -> Result<usize, EngineError> {
        let size = self.image.as_ref().ok_or(EngineError::NoImage).and_then(|i| require_size(i.size))?;
        self.clear_current();
        self.finish_image_load(size)
    }

    /// Switch to an already decoded image.
    pub fn open_image(&mut self, key: &str, path: &Path, size: ImageSize) -> Result<usize, EngineError> {
        if let Some(e) = self.begin_image(key, path) {
            log::warn!("Previous image was not saved: {}", e);
        }
        self.finish_image_load(size)
    }

    /// Save and drop the current image.
    pub fn close_image(&mut self) -> Option<EngineError> {
        let save_error = self.save_before_leaving();
        self.clear_current();
        self.image = None;
        save_error
    }

    /// Persist the store for the current image.
    pub fn save(&mut self, trigger: SaveTrigger) -> Result<usize, EngineError> {
        let image = self.image.as_ref().ok_or(EngineError::NoImage)?;
        let result = if self.load_failed {
            Err(Self::locked(&image.key))
        } else {
            persistence::save(&self.store, &image.key, image.size, &mut self.storage)
        };
        if let Err(e) = &result {
            if trigger.is_user_initiated() {
                log::error!("Save failed: {}", e);
            } else {
                log::warn!("Silent save of {} failed: {}", image.key, e);
            }
        }
        result
    }

    /// Feed pointer input to the mode controller.
    pub fn pointer(&mut self, event: PointerEvent, zoom: f64) -> Result<InputOutcome, EngineError> {
        let size = self.current_size()?;
        Ok(self.controller.handle_pointer(event, zoom, size, &mut self.store))
    }

    /// Feed pointer input, prompting `dialog` synchronously when a shape completes.
    pub fn pointer_with_dialog(
        &mut self,
        event: PointerEvent,
        zoom: f64,
        dialog: &mut dyn LabelDialog,
    ) -> Result<InputOutcome, EngineError> {
        let size = self.current_size()?;
        self.controller
            .handle_with_dialog(event, zoom, size, &mut self.store, &mut self.storage, dialog)
    }

    /// Finish (or cancel with `None`) a shape waiting for its label.
    pub fn resolve_label(&mut self, label: Option<String>) -> Result<InputOutcome, EngineError> {
        self.controller.resolve_label(label, &mut self.store, &mut self.storage)
    }

    /// Escape key.
    pub fn cancel(&mut self) -> InputOutcome {
        self.controller.cancel(&mut self.store)
    }

    pub fn undo_last(&mut self) -> InputOutcome {
        self.controller.undo_last_committed(&mut self.store)
    }

    /// Propagate a selection change between canvas and list.
    pub fn sync_selection(
        &mut self,
        event: SelectionEvent,
        canvas: &mut dyn SelectionView,
        list: &mut dyn SelectionView,
    ) {
        self.selection.handle(event, &mut self.store, canvas, list);
    }

    /// Delete what is selected in either view. Returns how many shapes went.
    pub fn delete_selected(&mut self, canvas: &mut dyn SelectionView, list: &mut dyn SelectionView) -> usize {
        self.selection.delete_selected(&mut self.store, canvas, list).len()
    }

    /// Re-show both selections after shapes were removed outside a delete.
    pub fn refresh_views(&mut self, canvas: &mut dyn SelectionView, list: &mut dyn SelectionView) {
        self.selection.refresh(&self.store, canvas, list);
    }

    pub fn detection_busy(&self) -> bool {
        self.detection.is_busy()
    }

    /// Number of detector requests started so far.
    pub fn detections_issued(&self) -> u64 {
        self.detection.issued()
    }

    /// Run the detector on the current image.
    pub fn trigger_detection(&mut self, detector: Arc<dyn Detector>) -> Result<(), EngineError> {
        self.current_size()?;
        let image = self.image.as_ref().ok_or(EngineError::NoImage)?;
        self.detection.trigger(detector, &image.key, image.path.clone())
    }

    /// Apply a finished detection, if there is one.
    pub fn poll_detection(&mut self) -> Option<DetectionOutcome> {
        let event = self.detection.poll()?;
        Some(self.apply_detection(event))
    }

    /// Like [`poll_detection`](Self::poll_detection) but waits up to `timeout`.
    pub fn wait_detection(&mut self, timeout: Duration) -> Option<DetectionOutcome> {
        let event = self.detection.wait(timeout)?;
        Some(self.apply_detection(event))
    }

    fn apply_detection(&mut self, event: DetectionEvent) -> DetectionOutcome {
        let current = self.image.as_ref().filter(|image| image.key == event.image_key);
        let Some(size) = current.and_then(|image| image.size) else {
            log::warn!("Discarding detection result for {}: image no longer displayed", event.image_key);
            return DetectionOutcome::Stale {
                image_key: event.image_key,
            };
        };

        let detections = match event.result {
            Ok(detections) => detections,
            Err(error) => {
                log::error!("Detection failed for {}: {}", event.image_key, error);
                return DetectionOutcome::Failed(error);
            }
        };

        match detections_to_shapes(detections, &self.target_classes, size, &mut self.storage) {
            Ok(shapes) => {
                self.store.replace_all(shapes);
                self.selection.reset();
                log::info!("Detection replaced annotations: {} shape(s)", self.store.len());
                DetectionOutcome::Applied(self.store.len())
            }
            Err(e) => {
                log::error!("Could not apply detection result: {}", e);
                DetectionOutcome::Failed(e)
            }
        }
    }

    /// Whether the stored annotations of the current image failed to load.
    pub fn annotations_locked(&self) -> bool {
        self.load_failed
    }

    fn current_size(&self) -> Result<ImageSize, EngineError> {
        let image = self.image.as_ref().ok_or(EngineError::NoImage)?;
        let size = require_size(image.size)?;
        if self.load_failed {
            return Err(Self::locked(&image.key));
        }
        Ok(size)
    }

    fn locked(image_key: &str) -> EngineError {
        EngineError::storage(image_key, "stored annotations could not be loaded; refusing to overwrite them")
    }

    fn save_before_leaving(&mut self) -> Option<EngineError> {
        // Nothing can have been drawn on an image that never finished loading.
        if self.image.as_ref().map_or(true, |image| image.size.is_none()) {
            return None;
        }
        if self.load_failed {
            log::warn!("Skipping implicit save: stored annotations were never loaded");
            return None;
        }
        self.save(SaveTrigger::Navigation).err()
    }

    fn clear_current(&mut self) {
        self.load_failed = false;
        self.controller.reset();
        self.store.clear();
        self.selection.reset();
    }
}
