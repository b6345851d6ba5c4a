// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Deterministic label to color mapping.
//!
//! Labels in the project vocabulary take the palette entry at their index.
//! Unknown labels fall back to a SHA-256 digest of their bytes, which does
//! not depend on process, platform or creation order.

use sha2::{Digest, Sha256};

/// An opaque RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Visually distinct annotation colors.
pub const PALETTE: [Color; 20] = [
    Color::rgb(230, 25, 75),
    Color::rgb(60, 180, 75),
    Color::rgb(255, 225, 25),
    Color::rgb(0, 130, 200),
    Color::rgb(245, 130, 48),
    Color::rgb(145, 30, 180),
    Color::rgb(70, 240, 240),
    Color::rgb(240, 50, 230),
    Color::rgb(210, 245, 60),
    Color::rgb(250, 190, 212),
    Color::rgb(0, 128, 128),
    Color::rgb(220, 190, 255),
    Color::rgb(170, 110, 40),
    Color::rgb(255, 250, 200),
    Color::rgb(128, 0, 0),
    Color::rgb(170, 255, 195),
    Color::rgb(128, 128, 0),
    Color::rgb(255, 215, 180),
    Color::rgb(0, 0, 128),
    Color::rgb(128, 128, 128),
];

/// First 8 bytes of the label's SHA-256 digest, big-endian.
fn stable_hash(label: &str) -> u64 {
    let digest = Sha256::digest(label.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(prefix)
}

/// Color for `label` given the ordered project vocabulary.
pub fn color_for(label: &str, known_labels: &[String]) -> Color {
    let slot = match known_labels.iter().position(|l| l == label) {
        Some(index) => index,
        None => (stable_hash(label) % PALETTE.len() as u64) as usize,
    };
    PALETTE[slot % PALETTE.len()]
}
