// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Drawing canvas for image display and annotation.
//!
//! The canvas renders the shape store on top of the image and turns raw
//! egui pointer input into engine [`PointerEvent`]s in image pixels. It
//! owns the view transform (zoom and pan) but no annotation state.

use crate::engine::color::Color;
use crate::engine::controller::{InProgress, Mode, ModeController, PointerButton, PointerEvent};
use crate::engine::selection::{SelectionEvent, SelectionView};
use crate::engine::store::ShapeStore;
use crate::models::annotation::{BoundingBox, Geometry, Point, Shape, ShapeId};
use crate::util::geometry::ImageSize;
use std::collections::BTreeSet;

const MIN_ZOOM: f32 = 0.1;
const MAX_ZOOM: f32 = 20.0;
const VERTEX_RADIUS: f32 = 4.0;

impl From<Color> for egui::Color32 {
    fn from(c: Color) -> Self {
        egui::Color32::from_rgb(c.r, c.g, c.b)
    }
}

/// Mapping between image pixels and screen points for one frame.
#[derive(Debug, Clone, Copy)]
pub struct ViewTransform {
    pub image_rect: egui::Rect,
    pub size: ImageSize,
}

impl ViewTransform {
    /// Screen pixels per image pixel.
    pub fn zoom(&self) -> f64 {
        (self.image_rect.width() as f64) / self.size.w()
    }

    pub fn to_image(&self, pos: egui::Pos2) -> Point {
        let scale = self.zoom();
        Point::new(
            (pos.x - self.image_rect.min.x) as f64 / scale,
            (pos.y - self.image_rect.min.y) as f64 / scale,
        )
    }

    pub fn to_screen(&self, p: &Point) -> egui::Pos2 {
        let scale = self.zoom();
        egui::pos2(
            self.image_rect.min.x + (p.x * scale) as f32,
            self.image_rect.min.y + (p.y * scale) as f32,
        )
    }
}

/// What the canvas produced this frame.
#[derive(Debug, Default)]
pub struct CanvasOutput {
    pub events: Vec<PointerEvent>,
    /// Screen pixels per image pixel, for the snap threshold.
    pub zoom: f64,
}

/// Persistent view state of the canvas.
#[derive(Debug)]
pub struct CanvasView {
    /// Multiplier on top of fit-to-window.
    zoom: f32,
    pan: egui::Vec2,
    reveal: Option<BoundingBox>,
    shown: BTreeSet<ShapeId>,
}

impl Default for CanvasView {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan: egui::Vec2::ZERO,
            reveal: None,
            shown: BTreeSet::new(),
        }
    }
}

impl CanvasView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Back to fit-to-window.
    pub fn reset_view(&mut self) {
        self.zoom = 1.0;
        self.pan = egui::Vec2::ZERO;
        self.reveal = None;
    }

    pub fn zoom_by(&mut self, factor: f32) {
        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    /// Center the view on `bounds` on the next frame.
    pub fn center_on(&mut self, bounds: BoundingBox) {
        self.reveal = Some(bounds);
    }

    fn layout(&mut self, canvas: egui::Rect, size: ImageSize) -> ViewTransform {
        let fit = (canvas.width() / size.width as f32).min(canvas.height() / size.height as f32);
        let scale = fit * self.zoom;
        let display = egui::vec2(size.width as f32 * scale, size.height as f32 * scale);
        let mut transform = ViewTransform {
            image_rect: egui::Rect::from_center_size(canvas.center() + self.pan, display),
            size,
        };

        if let Some(bounds) = self.reveal.take() {
            let target = transform.to_screen(&bounds.center());
            let shift = canvas.center() - target;
            self.pan += shift;
            transform.image_rect = transform.image_rect.translate(shift);
        }
        transform
    }

    /// Zoom around `cursor` so the image point under it stays put.
    fn zoom_at(&mut self, canvas: egui::Rect, cursor: egui::Pos2, factor: f32) {
        let old = self.zoom;
        self.zoom_by(factor);
        let ratio = self.zoom / old;
        let image_center = canvas.center() + self.pan;
        let offset = image_center - cursor;
        self.pan = (cursor + offset * ratio) - canvas.center();
    }
}

impl SelectionView for CanvasView {
    fn show_selection(&mut self, ids: &BTreeSet<ShapeId>) -> Option<SelectionEvent> {
        // The canvas paints from the store each frame, so there is no echo.
        self.shown = ids.clone();
        None
    }

    fn reveal(&mut self, _id: ShapeId, bounds: BoundingBox) {
        self.center_on(bounds);
    }
}

/// Display the canvas and collect pointer input.
pub fn show(
    ui: &mut egui::Ui,
    view: &mut CanvasView,
    texture: Option<&egui::TextureHandle>,
    size: Option<ImageSize>,
    store: &ShapeStore,
    controller: &ModeController,
) -> CanvasOutput {
    let mut output = CanvasOutput::default();
    ui.style_mut().visuals.extreme_bg_color = egui::Color32::from_gray(40);

    let available = ui.available_size() - egui::vec2(0.0, 24.0);
    let (canvas_rect, response) = ui.allocate_exact_size(available.max(egui::Vec2::ZERO), egui::Sense::click_and_drag());
    let painter = ui.painter_at(canvas_rect);
    painter.rect_filled(canvas_rect, 0.0, egui::Color32::from_gray(40));

    let (Some(texture), Some(size)) = (texture, size) else {
        show_welcome(&painter, canvas_rect);
        show_footer(ui, controller.mode(), None, None);
        return output;
    };

    if let Some(cursor) = response.hover_pos() {
        let scroll = ui.input(|i| i.smooth_scroll_delta.y);
        if scroll != 0.0 {
            view.zoom_at(canvas_rect, cursor, (scroll * 0.002).exp());
        }
    }
    if response.dragged_by(egui::PointerButton::Middle) {
        view.pan += response.drag_delta();
    }

    let transform = view.layout(canvas_rect, size);
    output.zoom = transform.zoom();

    painter.image(
        texture.id(),
        transform.image_rect,
        egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
        egui::Color32::WHITE,
    );

    collect_pointer_events(ui, &response, &transform, &mut output.events);

    for shape in store.all() {
        draw_shape(&painter, &transform, shape, store.is_selected(shape.id()));
    }
    draw_in_progress(&painter, &transform, controller);

    let cursor = response.hover_pos().map(|p| transform.to_image(p));
    show_footer(ui, controller.mode(), Some(output.zoom), cursor);
    output
}

fn collect_pointer_events(
    ui: &egui::Ui,
    response: &egui::Response,
    transform: &ViewTransform,
    events: &mut Vec<PointerEvent>,
) {
    if response.drag_started_by(egui::PointerButton::Primary) {
        if let Some(origin) = ui.input(|i| i.pointer.press_origin()) {
            events.push(PointerEvent::DragStart {
                pos: transform.to_image(origin),
            });
        }
    }
    if response.dragged_by(egui::PointerButton::Primary) {
        if let Some(pos) = response.interact_pointer_pos() {
            events.push(PointerEvent::Drag {
                pos: transform.to_image(pos),
            });
        }
    }
    if response.drag_stopped_by(egui::PointerButton::Primary) {
        events.push(PointerEvent::DragEnd);
    }

    if let Some(pos) = response.interact_pointer_pos() {
        let pos = transform.to_image(pos);
        if response.clicked() {
            events.push(PointerEvent::Click {
                button: PointerButton::Left,
                pos,
            });
        } else if response.secondary_clicked() {
            events.push(PointerEvent::Click {
                button: PointerButton::Right,
                pos,
            });
        }
    }

    if !response.dragged() && ui.input(|i| i.pointer.is_moving()) {
        if let Some(pos) = response.hover_pos() {
            events.push(PointerEvent::Move {
                pos: transform.to_image(pos),
            });
        }
    }
}

fn outline_points(transform: &ViewTransform, geometry: &Geometry) -> Vec<egui::Pos2> {
    geometry.outline().iter().map(|p| transform.to_screen(p)).collect()
}

/// Draw a committed shape in its label color.
fn draw_shape(painter: &egui::Painter, transform: &ViewTransform, shape: &Shape, selected: bool) {
    let color: egui::Color32 = shape.color.into();
    let width = if selected { 3.0 } else { 2.0 };
    let points = outline_points(transform, &shape.geometry);

    if selected {
        let fill = egui::Color32::from_rgba_unmultiplied(color.r(), color.g(), color.b(), 48);
        match &shape.geometry {
            Geometry::Rectangle { .. } => {
                let rect = egui::Rect::from_two_pos(points[0], points[2]);
                painter.rect_filled(rect, 0.0, fill);
            }
            Geometry::Polygon { .. } => {
                for p in &points {
                    painter.circle_filled(*p, VERTEX_RADIUS, color);
                }
            }
        }
    }
    painter.add(egui::Shape::closed_line(points.clone(), egui::Stroke::new(width, color)));

    let caption = if shape.confidence < 1.0 {
        format!("{} {:.2}", shape.label, shape.confidence)
    } else {
        shape.label.clone()
    };
    let bounds = shape.bounding_box();
    let anchor = transform.to_screen(&Point::new(bounds.x, bounds.y));
    let galley = painter.layout_no_wrap(caption, egui::FontId::proportional(13.0), egui::Color32::WHITE);
    let text_rect = egui::Align2::LEFT_BOTTOM.anchor_size(anchor, galley.size()).expand(2.0);
    painter.rect_filled(text_rect, 2.0, color);
    painter.galley(text_rect.min + egui::vec2(2.0, 2.0), galley, egui::Color32::WHITE);
}

fn draw_in_progress(painter: &egui::Painter, transform: &ViewTransform, controller: &ModeController) {
    let stroke = egui::Stroke::new(2.0, egui::Color32::LIGHT_BLUE);

    if let Some(pending) = controller.pending_geometry() {
        let points = outline_points(transform, pending);
        painter.add(egui::Shape::closed_line(points, egui::Stroke::new(2.0, egui::Color32::WHITE)));
        return;
    }

    match controller.in_progress() {
        InProgress::None => {}
        InProgress::Rect { anchor, cursor } => {
            let rect = egui::Rect::from_two_pos(transform.to_screen(anchor), transform.to_screen(cursor));
            painter.rect_stroke(rect, 0.0, stroke);
        }
        InProgress::Polygon { vertices, cursor } => {
            let mut points: Vec<egui::Pos2> = vertices.iter().map(|p| transform.to_screen(p)).collect();
            if let Some(cursor) = cursor {
                points.push(transform.to_screen(cursor));
            }
            painter.add(egui::Shape::line(points, stroke));

            for (i, vertex) in vertices.iter().enumerate() {
                let pos = transform.to_screen(vertex);
                // The first vertex is drawn larger: clicking near it closes the polygon.
                let radius = if i == 0 { VERTEX_RADIUS * 1.5 } else { VERTEX_RADIUS };
                painter.circle_filled(pos, radius, egui::Color32::WHITE);
                painter.circle_stroke(pos, radius, egui::Stroke::new(1.0, egui::Color32::BLACK));
            }
        }
    }
}

fn show_welcome(painter: &egui::Painter, rect: egui::Rect) {
    painter.text(
        rect.center() - egui::vec2(0.0, 20.0),
        egui::Align2::CENTER_CENTER,
        "YinTu",
        egui::FontId::proportional(32.0),
        egui::Color32::from_gray(200),
    );
    painter.text(
        rect.center() + egui::vec2(0.0, 16.0),
        egui::Align2::CENTER_CENTER,
        "Open an image folder to begin annotating (File → Open Folder...)",
        egui::FontId::proportional(14.0),
        egui::Color32::from_gray(160),
    );
}

fn show_footer(ui: &mut egui::Ui, mode: Mode, zoom: Option<f64>, cursor: Option<Point>) {
    ui.horizontal(|ui| {
        ui.label(format!("Mode: {}", mode.name()));
        if let Some(zoom) = zoom {
            ui.separator();
            ui.label(format!("Zoom: {:.0}%", zoom * 100.0));
        }
        if let Some(p) = cursor {
            ui.separator();
            ui.label(format!("({:.0}, {:.0})", p.x, p.y));
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transform() -> ViewTransform {
        ViewTransform {
            image_rect: egui::Rect::from_min_size(egui::pos2(10.0, 20.0), egui::vec2(400.0, 300.0)),
            size: ImageSize::new(800, 600).unwrap(),
        }
    }

    #[test]
    fn test_screen_image_roundtrip() {
        let t = transform();
        assert!((t.zoom() - 0.5).abs() < 1e-9);
        let p = t.to_image(egui::pos2(210.0, 170.0));
        assert!((p.x - 400.0).abs() < 1e-6 && (p.y - 300.0).abs() < 1e-6);
        let back = t.to_screen(&p);
        assert!((back.x - 210.0).abs() < 1e-4 && (back.y - 170.0).abs() < 1e-4);
    }

    #[test]
    fn test_reveal_centers_shape() {
        let mut view = CanvasView::new();
        let canvas = egui::Rect::from_min_size(egui::Pos2::ZERO, egui::vec2(800.0, 600.0));
        let size = ImageSize::new(800, 600).unwrap();
        view.center_on(BoundingBox {
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 100.0,
        });
        let t = view.layout(canvas, size);
        let center = t.to_screen(&Point::new(50.0, 50.0));
        assert!((center - canvas.center()).length() < 1e-3);
    }

    #[test]
    fn test_zoom_keeps_point_under_cursor() {
        let mut view = CanvasView::new();
        let canvas = egui::Rect::from_min_size(egui::Pos2::ZERO, egui::vec2(800.0, 600.0));
        let size = ImageSize::new(800, 600).unwrap();
        let cursor = egui::pos2(200.0, 150.0);
        let before = view.layout(canvas, size).to_image(cursor);

        view.zoom_at(canvas, cursor, 2.0);
        let after = view.layout(canvas, size).to_image(cursor);
        assert!(before.distance_to(&after) < 1e-3);
    }

    #[test]
    fn test_color_conversion() {
        let c: egui::Color32 = Color::rgb(1, 2, 3).into();
        assert_eq!(c, egui::Color32::from_rgb(1, 2, 3));
    }
}
