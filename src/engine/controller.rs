// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Drawing-tool state machine.
//!
//! The controller interprets pointer input according to the current
//! [`Mode`], owns the in-progress (uncommitted) geometry and turns finished
//! drawings into shapes once a label has been chosen.
//!
//! Committing is two-phase. A finished rectangle or polygon is parked
//! until [`ModeController::resolve_label`] is called; callers that own a
//! blocking [`LabelDialog`] can use [`ModeController::handle_with_dialog`]
//! to do both in one step.

use crate::engine::color::color_for;
use crate::engine::store::ShapeStore;
use crate::error::EngineError;
use crate::models::annotation::{Geometry, Point, Shape, ShapeId, MIN_POLYGON_VERTICES};
use crate::models::project::LabelVocabulary;
use crate::util::geometry::{clamp_to_image, ImageSize};

/// Interaction mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Browse,
    DrawRect,
    DrawPolygon,
}

impl Mode {
    pub fn name(&self) -> &'static str {
        match self {
            Mode::Browse => "Browse",
            Mode::DrawRect => "Rectangle",
            Mode::DrawPolygon => "Polygon",
        }
    }

    pub fn all() -> &'static [Mode] {
        &[Mode::Browse, Mode::DrawRect, Mode::DrawPolygon]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Left,
    Right,
}

/// Pointer input in image-pixel coordinates (not yet clamped).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Click { button: PointerButton, pos: Point },
    Move { pos: Point },
    DragStart { pos: Point },
    Drag { pos: Point },
    DragEnd,
}

/// What handling an input did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOutcome {
    Ignored,
    /// In-progress geometry or preview changed.
    PreviewChanged,
    /// Canvas selection changed in browse mode.
    SelectionChanged,
    /// A shape was dragged to a new position.
    Moved(ShapeId),
    /// Geometry is complete and waiting for a label.
    LabelRequested,
    /// Geometry was too small and has been discarded.
    Rejected,
    /// The label prompt was cancelled; the geometry is gone.
    Cancelled,
    Committed(ShapeId),
    /// The most recently committed shape was removed.
    Undone(ShapeId),
}

/// Source of labels for newly committed shapes.
pub trait LabelDialog {
    /// Ask for a label. `None` means the user cancelled.
    fn prompt(&mut self, existing_labels: &[String]) -> Option<String>;
}

/// Uncommitted geometry of the active drawing tool.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InProgress {
    #[default]
    None,
    Rect { anchor: Point, cursor: Point },
    Polygon { vertices: Vec<Point>, cursor: Option<Point> },
}

#[derive(Debug, Clone)]
struct DragState {
    id: ShapeId,
    origin: Point,
    original: Geometry,
    moved: bool,
}

/// Controller settings, usually taken from [`AppConfig`](crate::config::AppConfig).
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    /// Polygon closing distance in screen pixels.
    pub snap_threshold: f64,
    /// Smallest side (or square root of area) accepted at commit.
    pub min_shape_size: f64,
    pub default_label: String,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            snap_threshold: 10.0,
            min_shape_size: 2.0,
            default_label: "Object".to_string(),
        }
    }
}

/// Mode controller / drawing state machine.
#[derive(Debug, Clone, Default)]
pub struct ModeController {
    mode: Mode,
    in_progress: InProgress,
    awaiting_label: Option<Geometry>,
    drag: Option<DragState>,
    settings: ControllerSettings,
}

impl ModeController {
    pub fn new(settings: ControllerSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    pub fn in_progress(&self) -> &InProgress {
        &self.in_progress
    }

    pub fn awaiting_label(&self) -> bool {
        self.awaiting_label.is_some()
    }

    /// Geometry parked while a label is being chosen.
    pub fn pending_geometry(&self) -> Option<&Geometry> {
        self.awaiting_label.as_ref()
    }

    /// Whether existing shapes accept drag and pointer selection.
    pub fn shapes_interactive(&self) -> bool {
        self.mode == Mode::Browse
    }

    /// Switch mode, discarding all uncommitted geometry.
    pub fn set_mode(&mut self, mode: Mode) {
        self.reset();
        if self.mode != mode {
            log::info!("Mode: {} -> {}", self.mode.name(), mode.name());
        }
        self.mode = mode;
    }

    /// Drop in-progress geometry, any parked commit and any drag.
    pub fn reset(&mut self) {
        self.in_progress = InProgress::None;
        self.awaiting_label = None;
        self.drag = None;
    }

    /// Escape: clear in-progress geometry, or the selection in browse mode.
    pub fn cancel(&mut self, store: &mut ShapeStore) -> InputOutcome {
        if self.in_progress != InProgress::None {
            self.in_progress = InProgress::None;
            log::debug!("In-progress drawing cancelled");
            return InputOutcome::PreviewChanged;
        }
        if self.mode == Mode::Browse && !store.selected().is_empty() {
            store.clear_selection();
            return InputOutcome::SelectionChanged;
        }
        InputOutcome::Ignored
    }

    /// Interpret one pointer event.
    ///
    /// `zoom` is screen pixels per image pixel and scales the snap threshold.
    pub fn handle_pointer(
        &mut self,
        event: PointerEvent,
        zoom: f64,
        size: ImageSize,
        store: &mut ShapeStore,
    ) -> InputOutcome {
        if self.awaiting_label.is_some() {
            return InputOutcome::Ignored;
        }
        match self.mode {
            Mode::Browse => self.handle_browse(event, size, store),
            Mode::DrawRect => self.handle_rect(event, size, store),
            Mode::DrawPolygon => self.handle_polygon(event, zoom, size, store),
        }
    }

    /// Handle an event and, if it completes a shape, prompt for its label.
    pub fn handle_with_dialog(
        &mut self,
        event: PointerEvent,
        zoom: f64,
        size: ImageSize,
        store: &mut ShapeStore,
        vocabulary: &mut dyn LabelVocabulary,
        dialog: &mut dyn LabelDialog,
    ) -> Result<InputOutcome, EngineError> {
        let outcome = self.handle_pointer(event, zoom, size, store);
        if outcome != InputOutcome::LabelRequested {
            return Ok(outcome);
        }
        let label = dialog.prompt(&vocabulary.labels());
        self.resolve_label(label, store, vocabulary)
    }

    /// Finish a parked commit with the chosen label, or discard it on `None`.
    pub fn resolve_label(
        &mut self,
        label: Option<String>,
        store: &mut ShapeStore,
        vocabulary: &mut dyn LabelVocabulary,
    ) -> Result<InputOutcome, EngineError> {
        let Some(geometry) = self.awaiting_label.take() else {
            return Ok(InputOutcome::Ignored);
        };
        let Some(label) = label else {
            log::debug!("Label prompt cancelled, shape discarded");
            return Ok(InputOutcome::Cancelled);
        };
        let label = match label.trim() {
            "" => self.settings.default_label.clone(),
            trimmed => trimmed.to_string(),
        };

        vocabulary.ensure(&label)?;
        let color = color_for(&label, &vocabulary.labels());
        let kind = geometry.kind();
        let id = store.add(Shape::new(label.clone(), geometry, color));
        log::info!("Committed {:?} {} '{}' ({} shapes)", kind, id, label, store.len());
        Ok(InputOutcome::Committed(id))
    }

    /// Remove the most recently committed shape, if any.
    pub fn undo_last_committed(&mut self, store: &mut ShapeStore) -> InputOutcome {
        match store.pop_last() {
            Some(shape) => {
                log::info!("Undid shape {} '{}'", shape.id(), shape.label);
                InputOutcome::Undone(shape.id())
            }
            None => InputOutcome::Ignored,
        }
    }

    fn handle_browse(&mut self, event: PointerEvent, size: ImageSize, store: &mut ShapeStore) -> InputOutcome {
        match event {
            PointerEvent::Click {
                button: PointerButton::Left,
                pos,
            } => {
                let pos = clamp_to_image(pos, size);
                match store.hit_test(&pos) {
                    Some(id) => {
                        store.select(id, true);
                        InputOutcome::SelectionChanged
                    }
                    None if store.selected().is_empty() => InputOutcome::Ignored,
                    None => {
                        store.clear_selection();
                        InputOutcome::SelectionChanged
                    }
                }
            }
            PointerEvent::DragStart { pos } => {
                let pos = clamp_to_image(pos, size);
                let Some(id) = store.hit_test(&pos) else {
                    return InputOutcome::Ignored;
                };
                let Some(shape) = store.get(id) else {
                    return InputOutcome::Ignored;
                };
                self.drag = Some(DragState {
                    id,
                    origin: pos,
                    original: shape.geometry.clone(),
                    moved: false,
                });
                store.select(id, true);
                InputOutcome::SelectionChanged
            }
            PointerEvent::Drag { pos } => {
                let Some(drag) = self.drag.as_mut() else {
                    return InputOutcome::Ignored;
                };
                let pos = clamp_to_image(pos, size);
                let (dx, dy) = (pos.x - drag.origin.x, pos.y - drag.origin.y);
                if store.move_shape(drag.id, &drag.original, dx, dy, size) {
                    drag.moved = true;
                    InputOutcome::PreviewChanged
                } else {
                    self.drag = None;
                    InputOutcome::Ignored
                }
            }
            PointerEvent::DragEnd => match self.drag.take() {
                Some(drag) if drag.moved => {
                    log::debug!("Moved shape {}", drag.id);
                    InputOutcome::Moved(drag.id)
                }
                _ => InputOutcome::Ignored,
            },
            PointerEvent::Click {
                button: PointerButton::Right,
                ..
            }
            | PointerEvent::Move { .. } => InputOutcome::Ignored,
        }
    }

    fn handle_rect(&mut self, event: PointerEvent, size: ImageSize, store: &mut ShapeStore) -> InputOutcome {
        match event {
            PointerEvent::Click {
                button: PointerButton::Left,
                pos,
            } => {
                let pos = clamp_to_image(pos, size);
                match std::mem::take(&mut self.in_progress) {
                    InProgress::Rect { anchor, .. } => {
                        let geometry = Geometry::rectangle_from_corners(anchor, pos);
                        self.park(geometry)
                    }
                    _ => {
                        self.in_progress = InProgress::Rect {
                            anchor: pos,
                            cursor: pos,
                        };
                        log::debug!("Rectangle corner at ({:.1}, {:.1})", pos.x, pos.y);
                        InputOutcome::PreviewChanged
                    }
                }
            }
            PointerEvent::Click {
                button: PointerButton::Right,
                ..
            } => {
                if matches!(self.in_progress, InProgress::Rect { .. }) {
                    self.in_progress = InProgress::None;
                    log::debug!("Rectangle cancelled");
                    InputOutcome::PreviewChanged
                } else {
                    self.undo_last_committed(store)
                }
            }
            PointerEvent::Move { pos } | PointerEvent::DragStart { pos } | PointerEvent::Drag { pos } => {
                match &mut self.in_progress {
                    InProgress::Rect { cursor, .. } => {
                        *cursor = clamp_to_image(pos, size);
                        InputOutcome::PreviewChanged
                    }
                    _ => InputOutcome::Ignored,
                }
            }
            PointerEvent::DragEnd => InputOutcome::Ignored,
        }
    }

    fn handle_polygon(
        &mut self,
        event: PointerEvent,
        zoom: f64,
        size: ImageSize,
        store: &mut ShapeStore,
    ) -> InputOutcome {
        match event {
            PointerEvent::Click {
                button: PointerButton::Left,
                pos,
            } => {
                let pos = clamp_to_image(pos, size);
                let snap = self.settings.snap_threshold / zoom.max(f64::EPSILON);
                match &mut self.in_progress {
                    InProgress::Polygon { vertices, cursor } => {
                        if vertices.len() >= MIN_POLYGON_VERTICES && pos.distance_to(&vertices[0]) <= snap {
                            let vertices = std::mem::take(vertices);
                            self.in_progress = InProgress::None;
                            return self.park(Geometry::Polygon { vertices });
                        }
                        vertices.push(pos);
                        *cursor = Some(pos);
                        log::debug!(
                            "Polygon vertex at ({:.1}, {:.1}), total: {}",
                            pos.x,
                            pos.y,
                            vertices.len()
                        );
                    }
                    _ => {
                        self.in_progress = InProgress::Polygon {
                            vertices: vec![pos],
                            cursor: Some(pos),
                        };
                        log::debug!("Polygon started at ({:.1}, {:.1})", pos.x, pos.y);
                    }
                }
                InputOutcome::PreviewChanged
            }
            PointerEvent::Click {
                button: PointerButton::Right,
                ..
            } => match &mut self.in_progress {
                InProgress::Polygon { vertices, .. } if !vertices.is_empty() => {
                    vertices.pop();
                    if vertices.is_empty() {
                        self.in_progress = InProgress::None;
                    }
                    InputOutcome::PreviewChanged
                }
                _ => self.undo_last_committed(store),
            },
            PointerEvent::Move { pos } | PointerEvent::DragStart { pos } | PointerEvent::Drag { pos } => {
                match &mut self.in_progress {
                    InProgress::Polygon { cursor, .. } => {
                        *cursor = Some(clamp_to_image(pos, size));
                        InputOutcome::PreviewChanged
                    }
                    _ => InputOutcome::Ignored,
                }
            }
            PointerEvent::DragEnd => InputOutcome::Ignored,
        }
    }

    /// Park finished geometry for labelling, unless it is degenerate.
    fn park(&mut self, geometry: Geometry) -> InputOutcome {
        self.in_progress = InProgress::None;
        if geometry.is_degenerate(self.settings.min_shape_size) {
            log::warn!("Discarded degenerate {:?} (area {:.2})", geometry.kind(), geometry.area());
            return InputOutcome::Rejected;
        }
        self.awaiting_label = Some(geometry);
        InputOutcome::LabelRequested
    }
}
