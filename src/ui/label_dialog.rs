// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Modal label prompt shown when a shape is completed.
//!
//! egui cannot block inside a frame, so the prompt is opened when the
//! controller reports `LabelRequested` and answers on a later frame; the
//! app then hands the answer to `resolve_label`.

/// The user's answer to the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelAnswer {
    Confirmed(String),
    Cancelled,
}

/// Prompt state carried across frames.
#[derive(Debug, Default)]
pub struct LabelPrompt {
    open: bool,
    text: String,
    focus: bool,
}

impl LabelPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Open the prompt, pre-filled with the last label used.
    pub fn open(&mut self, initial: &str) {
        self.open = true;
        self.text = initial.to_string();
        self.focus = true;
    }

    fn close(&mut self, answer: LabelAnswer) -> Option<LabelAnswer> {
        self.open = false;
        Some(answer)
    }

    /// Draw the prompt. Returns an answer on the frame the user decides.
    pub fn show(&mut self, ctx: &egui::Context, existing: &[String]) -> Option<LabelAnswer> {
        if !self.open {
            return None;
        }

        let mut answer = None;
        egui::Window::new("Label")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                ui.label("Label for the new shape:");
                let edit = ui.text_edit_singleline(&mut self.text);
                if self.focus {
                    edit.request_focus();
                    self.focus = false;
                }
                let enter = edit.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));

                if !existing.is_empty() {
                    ui.add_space(4.0);
                    ui.label(egui::RichText::new("Existing labels").weak());
                    egui::ScrollArea::vertical().max_height(160.0).show(ui, |ui| {
                        for label in existing {
                            let chosen = ui.selectable_label(self.text == *label, label);
                            if chosen.double_clicked() {
                                answer = Some(LabelAnswer::Confirmed(label.clone()));
                            } else if chosen.clicked() {
                                self.text = label.clone();
                            }
                        }
                    });
                }

                ui.add_space(4.0);
                ui.horizontal(|ui| {
                    if ui.button("OK").clicked() || enter {
                        answer = Some(LabelAnswer::Confirmed(self.text.clone()));
                    }
                    if ui.button("Cancel").clicked() || ui.input(|i| i.key_pressed(egui::Key::Escape)) {
                        answer = Some(LabelAnswer::Cancelled);
                    }
                });
            });

        answer.and_then(|a| self.close(a))
    }
}

impl LabelAnswer {
    /// The value `resolve_label` expects.
    pub fn into_label(self) -> Option<String> {
        match self {
            LabelAnswer::Confirmed(label) => Some(label),
            LabelAnswer::Cancelled => None,
        }
    }
}
