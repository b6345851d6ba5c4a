// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Application configuration.
//!
//! Settings are read from an optional YAML file; every field falls back to
//! a default so a partial (or missing) file is fine.

use crate::engine::controller::ControllerSettings;
use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "yintu.yaml";

/// Detector settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Model file handed to the detector backend.
    pub model_path: Option<PathBuf>,
    /// Only keep detections with these labels. Empty keeps everything.
    pub target_classes: Vec<String>,
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub project_file: String,
    pub snap_threshold: f64,
    pub min_shape_size: f64,
    pub default_label: String,
    pub image_extensions: Vec<String>,
    pub video_extensions: Vec<String>,
    pub extract_fps: u32,
    pub detector: DetectorConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            project_file: "project.json".to_string(),
            snap_threshold: 10.0,
            min_shape_size: 2.0,
            default_label: "Object".to_string(),
            image_extensions: ["jpg", "jpeg", "png", "bmp"].map(String::from).to_vec(),
            video_extensions: ["mp4", "avi", "mov", "mkv"].map(String::from).to_vec(),
            extract_fps: 2,
            detector: DetectorConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `path`, or defaults if the file does not exist.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        if !path.exists() {
            log::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_yaml(&text)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Self, EngineError> {
        serde_yaml::from_str(text).map_err(|e| EngineError::Config(e.to_string()))
    }

    /// Full path of the project store file.
    pub fn project_path(&self) -> PathBuf {
        self.data_dir.join(&self.project_file)
    }

    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            snap_threshold: self.snap_threshold,
            min_shape_size: self.min_shape_size,
            default_label: self.default_label.clone(),
        }
    }
}
