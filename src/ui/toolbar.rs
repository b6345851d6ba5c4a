// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Toolbar and mode selection UI.
//!
//! This module provides the toolbar for switching interaction modes and
//! triggering the detector.

use crate::engine::controller::Mode;

/// Result of toolbar interaction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToolbarAction {
    None,
    SetMode(Mode),
    Detect,
}

fn mode_icon(mode: Mode) -> &'static str {
    match mode {
        Mode::Browse => "⬆",
        Mode::DrawRect => "▭",
        Mode::DrawPolygon => "▱",
    }
}

fn mode_hint(mode: Mode) -> &'static str {
    match mode {
        Mode::Browse => "Click to select a shape, drag to move it",
        Mode::DrawRect => "Click two corners; right-click cancels",
        Mode::DrawPolygon => "Click to add vertices, click the first vertex to close",
    }
}

/// Display the toolbar with mode buttons.
///
/// `detect` is `None` when no detector is configured, otherwise whether
/// the button is enabled.
pub fn show(ui: &mut egui::Ui, current: Mode, detect: Option<bool>) -> ToolbarAction {
    let mut action = ToolbarAction::None;
    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 8.0;

        ui.label("Mode:");
        ui.separator();

        for (i, mode) in Mode::all().iter().enumerate() {
            let text = format!("{} {} ({})", mode_icon(*mode), mode.name(), i + 1);
            if ui.selectable_label(current == *mode, text).clicked() && current != *mode {
                action = ToolbarAction::SetMode(*mode);
            }
        }

        if let Some(enabled) = detect {
            ui.separator();
            let label = if enabled { "Auto Detect" } else { "Detecting..." };
            if ui.add_enabled(enabled, egui::Button::new(label)).clicked() {
                action = ToolbarAction::Detect;
            }
        }

        ui.separator();
        ui.label(egui::RichText::new(mode_hint(current)).italics().weak());
    });
    action
}
