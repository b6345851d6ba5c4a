// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Shape list panel.
//!
//! Lists the shapes of the current image with their label colors. Row
//! selection is reported as a list [`SelectionEvent`] and kept in sync with
//! the canvas by the selection synchronizer.

use crate::engine::selection::{SelectionEvent, SelectionView};
use crate::engine::store::ShapeStore;
use crate::models::annotation::{BoundingBox, ShapeId, ShapeKind};
use std::collections::BTreeSet;

/// Result of panel interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertiesAction {
    None,
    Select(SelectionEvent),
    DeleteSelected,
}

/// Row selection state of the list.
#[derive(Debug, Default)]
pub struct ShapeList {
    selected: BTreeSet<ShapeId>,
    scroll_to: Option<ShapeId>,
}

impl ShapeList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> &BTreeSet<ShapeId> {
        &self.selected
    }

    /// Selection after the user clicks `id`, with ctrl/cmd toggling.
    fn clicked(&self, id: ShapeId, toggle: bool) -> BTreeSet<ShapeId> {
        if !toggle {
            return BTreeSet::from([id]);
        }
        let mut next = self.selected.clone();
        if !next.remove(&id) {
            next.insert(id);
        }
        next
    }
}

impl SelectionView for ShapeList {
    fn show_selection(&mut self, ids: &BTreeSet<ShapeId>) -> Option<SelectionEvent> {
        self.selected = ids.clone();
        None
    }

    fn reveal(&mut self, id: ShapeId, _bounds: BoundingBox) {
        self.scroll_to = Some(id);
    }
}

/// Display the shape list.
pub fn show(ui: &mut egui::Ui, list: &mut ShapeList, store: &ShapeStore, labels: &[String]) -> PropertiesAction {
    let mut action = PropertiesAction::None;

    ui.heading(format!("Shapes ({})", store.len()));
    ui.separator();

    let scroll_to = list.scroll_to.take();
    egui::ScrollArea::vertical()
        .max_height((ui.available_height() - 120.0).max(80.0))
        .show(ui, |ui| {
            if store.is_empty() {
                ui.label(egui::RichText::new("No shapes yet").weak());
            }
            for shape in store.all() {
                let id = shape.id();
                let kind = match shape.kind() {
                    ShapeKind::Rectangle => "rect",
                    ShapeKind::Polygon => "polygon",
                };
                let response = ui
                    .horizontal(|ui| {
                        let (swatch, _) = ui.allocate_exact_size(egui::vec2(12.0, 12.0), egui::Sense::hover());
                        ui.painter().rect_filled(swatch, 2.0, egui::Color32::from(shape.color));
                        let mut text = format!("{} {} ({})", id, shape.label, kind);
                        if shape.confidence < 1.0 {
                            text.push_str(&format!(" {:.2}", shape.confidence));
                        }
                        ui.selectable_label(list.selected.contains(&id), text)
                    })
                    .inner;

                if scroll_to == Some(id) {
                    response.scroll_to_me(Some(egui::Align::Center));
                }
                if response.clicked() {
                    let toggle = ui.input(|i| i.modifiers.command);
                    action = PropertiesAction::Select(SelectionEvent::list(list.clicked(id, toggle)));
                }
            }
        });

    ui.separator();
    let any_selected = !list.selected.is_empty() || !store.selected().is_empty();
    if ui
        .add_enabled(any_selected, egui::Button::new("🗑 Delete Selected"))
        .clicked()
    {
        action = PropertiesAction::DeleteSelected;
    }

    ui.separator();
    ui.label(egui::RichText::new(format!("Labels ({})", labels.len())).strong());
    ui.horizontal_wrapped(|ui| {
        for label in labels {
            ui.label(
                egui::RichText::new(label)
                    .color(egui::Color32::from(crate::engine::color::color_for(label, labels))),
            );
        }
    });

    action
}
