// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Keyboard shortcut handling.

use crate::engine::controller::Mode;
use egui::Key;

/// Actions requested from the keyboard this frame.
#[derive(Debug, Default, PartialEq)]
pub struct ShortcutActions {
    pub save: bool,
    pub delete: bool,
    pub cancel: bool,
    pub undo: bool,
    pub mode: Option<Mode>,
    pub previous: bool,
    pub next: bool,
}

/// Translate key presses into shortcut actions.
///
/// Single-key shortcuts are skipped while a text field has focus.
pub fn capture(input: &egui::InputState, wants_text: bool) -> ShortcutActions {
    let mut actions = ShortcutActions::default();
    let command = input.modifiers.command;

    if command && input.key_pressed(Key::S) {
        actions.save = true;
    }
    if command && input.key_pressed(Key::Z) {
        actions.undo = true;
    }
    if input.key_pressed(Key::Escape) {
        actions.cancel = true;
    }

    if !command && !wants_text {
        if input.key_pressed(Key::Delete) || input.key_pressed(Key::Backspace) {
            actions.delete = true;
        }
        const MODES: [(Key, Mode); 3] = [
            (Key::Num1, Mode::Browse),
            (Key::Num2, Mode::DrawRect),
            (Key::Num3, Mode::DrawPolygon),
        ];
        for (key, mode) in MODES {
            if input.key_pressed(key) {
                actions.mode = Some(mode);
            }
        }
        actions.previous = input.key_pressed(Key::A);
        actions.next = input.key_pressed(Key::D);
    }
    actions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(key: Key, modifiers: egui::Modifiers) -> egui::InputState {
        let raw = egui::RawInput {
            modifiers,
            events: vec![egui::Event::Key {
                key,
                physical_key: None,
                pressed: true,
                repeat: false,
                modifiers,
            }],
            ..Default::default()
        };
        egui::InputState::default().begin_frame(raw, true, 1.0, &egui::Options::default())
    }

    #[test]
    fn test_ctrl_s_saves() {
        let input = press(Key::S, egui::Modifiers::COMMAND);
        assert_eq!(
            capture(&input, false),
            ShortcutActions {
                save: true,
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_number_keys_pick_modes() {
        let input = press(Key::Num3, egui::Modifiers::NONE);
        assert_eq!(capture(&input, false).mode, Some(Mode::DrawPolygon));
    }

    #[test]
    fn test_single_keys_ignored_while_typing() {
        let input = press(Key::D, egui::Modifiers::NONE);
        assert!(!capture(&input, true).next);
        assert!(capture(&input, false).next);
    }
}
