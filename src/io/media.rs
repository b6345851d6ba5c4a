// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Media file loading.
//!
//! Images are decoded to RGBA8 for display in egui. Folders are scanned
//! for images so the host can step through them.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Decoded image ready to upload as a texture.
pub struct LoadedImage {
    pub width: u32,
    pub height: u32,
    /// RGBA8, row major.
    pub pixels: Vec<u8>,
}

/// Decode an image file.
pub fn load_image(path: &Path) -> Result<LoadedImage> {
    let img = image::open(path).with_context(|| format!("failed to open image {}", path.display()))?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(LoadedImage {
        width,
        height,
        pixels: rgba.into_raw(),
    })
}

/// Whether `path` ends in one of `extensions` (case-insensitive, no dot).
pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Find images under `folder`, including subfolders, sorted by path.
pub fn scan_images(folder: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let mut images = Vec::new();
    scan_recursive(folder, extensions, &mut images)
        .with_context(|| format!("failed to read folder {}", folder.display()))?;
    images.sort();
    log::info!("Found {} image(s) in {}", images.len(), folder.display());
    Ok(images)
}

fn scan_recursive(folder: &Path, extensions: &[String], images: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(folder)?.filter_map(|e| e.ok()) {
        let path = entry.path();
        if path.is_file() && has_extension(&path, extensions) {
            images.push(path);
        } else if path.is_dir() {
            if let Err(e) = scan_recursive(&path, extensions, images) {
                log::warn!("Skipping subfolder {}: {}", path.display(), e);
            }
        }
    }
    Ok(())
}

/// Storage key for an image: its path relative to `root`, with `/` separators.
pub fn image_key(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
