// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Error types for the annotation engine.
//!
//! File-level helpers return `anyhow::Result`; anything that crosses into
//! the engine is converted into an [`EngineError`] so callers can decide
//! whether a failure is blocking, user-visible or silently logged.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the annotation engine and its adapters.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The image has not finished loading, so its dimensions are unknown.
    #[error("Image geometry unavailable: dimensions are not known yet")]
    GeometryUnavailable,

    /// No image is currently displayed.
    #[error("No image is loaded")]
    NoImage,

    /// The image file is missing or could not be decoded.
    #[error("Failed to load image {path:?}: {message}")]
    ImageLoad {
        /// Path of the image that failed.
        path: PathBuf,
        /// Decoder or filesystem message.
        message: String,
    },

    /// The storage layer rejected a load or replace.
    #[error("Storage error for '{image_key}': {message}")]
    Storage {
        /// Image key the operation targeted.
        image_key: String,
        /// Description of the failure.
        message: String,
    },

    /// A persisted record could not be turned back into a shape.
    #[error("Invalid annotation record: {reason}")]
    InvalidRecord {
        /// What was wrong with the record.
        reason: String,
    },

    /// A detection request is already running.
    #[error("A detection request is already in flight")]
    DetectionInFlight,

    /// The detector reported a failure.
    #[error("Detector error: {0}")]
    Detector(String),

    /// The configuration file could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl EngineError {
    /// Build a storage error from any displayable cause.
    pub fn storage(image_key: &str, cause: impl std::fmt::Display) -> Self {
        EngineError::Storage {
            image_key: image_key.to_string(),
            message: cause.to_string(),
        }
    }
}
