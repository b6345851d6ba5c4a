// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Project file storage.
//!
//! [`JsonProjectStorage`] keeps the whole project (label vocabulary plus
//! records per image) in one JSON file. Every change is written to a
//! temporary file and renamed over the project, and the in-memory copy
//! only changes once that write succeeds.

use crate::engine::persistence::AnnotationStorage;
use crate::error::EngineError;
use crate::io::serialization::{import_json, write_atomic};
use crate::models::project::{LabelVocabulary, ProjectData};
use crate::models::record::AnnotationRecord;
use std::path::{Path, PathBuf};

/// Annotation storage and label vocabulary backed by a JSON file.
#[derive(Debug)]
pub struct JsonProjectStorage {
    path: PathBuf,
    data: ProjectData,
}

impl JsonProjectStorage {
    /// Open the project at `path`. A missing file is an empty project.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, EngineError> {
        let path = path.into();
        let data = if path.exists() {
            let data = import_json(&path).map_err(|e| project_error(&path, format!("{:#}", e)))?;
            log::info!(
                "Opened project {} ({} label(s), {} record(s))",
                path.display(),
                data.labels.len(),
                data.record_count()
            );
            data
        } else {
            log::info!("Starting new project at {}", path.display());
            ProjectData::default()
        };
        Ok(Self { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn data(&self) -> &ProjectData {
        &self.data
    }

    /// Replace the whole project, e.g. with an imported one.
    pub fn replace_project(&mut self, data: ProjectData) -> Result<(), EngineError> {
        let key = self.path.display().to_string();
        self.commit(data, &key)?;
        log::info!(
            "Replaced project {} ({} label(s), {} record(s))",
            self.path.display(),
            self.data.labels.len(),
            self.data.record_count()
        );
        Ok(())
    }

    fn commit(&mut self, next: ProjectData, image_key: &str) -> Result<(), EngineError> {
        let json = serde_json::to_string_pretty(&next).map_err(|e| EngineError::storage(image_key, e))?;
        write_atomic(&self.path, json.as_bytes()).map_err(|e| EngineError::storage(image_key, format!("{:#}", e)))?;
        self.data = next;
        Ok(())
    }
}

fn project_error(path: &Path, message: String) -> EngineError {
    EngineError::Storage {
        image_key: path.display().to_string(),
        message,
    }
}

impl AnnotationStorage for JsonProjectStorage {
    fn load_records(&self, image_key: &str) -> Result<Vec<AnnotationRecord>, EngineError> {
        self.data.load_records(image_key)
    }

    fn replace_records(&mut self, image_key: &str, records: Vec<AnnotationRecord>) -> Result<(), EngineError> {
        let mut next = self.data.clone();
        next.replace_records(image_key, records)?;
        self.commit(next, image_key)
    }
}

impl LabelVocabulary for JsonProjectStorage {
    fn labels(&self) -> Vec<String> {
        self.data.labels.clone()
    }

    fn append(&mut self, label: &str) -> Result<(), EngineError> {
        let mut next = self.data.clone();
        next.append(label)?;
        self.commit(next, label)
    }

    fn contains(&self, label: &str) -> bool {
        self.data.contains(label)
    }
}
