// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Project state management.
//!
//! This module holds the project label vocabulary and the per-image
//! annotation records that make up a saved project.

use super::record::AnnotationRecord;
use crate::engine::persistence::AnnotationStorage;
use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered set of label strings known to a project.
///
/// Order matters: a label's position selects its palette color.
pub trait LabelVocabulary {
    /// All labels, in insertion order.
    fn labels(&self) -> Vec<String>;

    /// Append a label. Callers only append labels that are not present.
    fn append(&mut self, label: &str) -> Result<(), EngineError>;

    fn contains(&self, label: &str) -> bool {
        self.labels().iter().any(|l| l == label)
    }

    /// Append `label` if it is new. Returns `true` when it was appended.
    fn ensure(&mut self, label: &str) -> Result<bool, EngineError> {
        if self.contains(label) {
            return Ok(false);
        }
        self.append(label)?;
        log::info!("Added label '{}' to project vocabulary", label);
        Ok(true)
    }
}

/// Complete project data for serialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectData {
    #[serde(default)]
    pub labels: Vec<String>,
    /// Records per image key.
    #[serde(default)]
    pub images: BTreeMap<String, Vec<AnnotationRecord>>,
}

impl ProjectData {
    /// Create an empty project with the given starting vocabulary.
    pub fn new(labels: Vec<String>) -> Self {
        Self {
            labels,
            images: BTreeMap::new(),
        }
    }

    /// Total number of records across all images.
    pub fn record_count(&self) -> usize {
        self.images.values().map(Vec::len).sum()
    }
}

impl LabelVocabulary for ProjectData {
    fn labels(&self) -> Vec<String> {
        self.labels.clone()
    }

    fn append(&mut self, label: &str) -> Result<(), EngineError> {
        self.labels.push(label.to_string());
        Ok(())
    }

    fn contains(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }
}

impl AnnotationStorage for ProjectData {
    fn load_records(&self, image_key: &str) -> Result<Vec<AnnotationRecord>, EngineError> {
        Ok(self.images.get(image_key).cloned().unwrap_or_default())
    }

    fn replace_records(
        &mut self,
        image_key: &str,
        records: Vec<AnnotationRecord>,
    ) -> Result<(), EngineError> {
        if records.is_empty() {
            self.images.remove(image_key);
        } else {
            self.images.insert(image_key.to_string(), records);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::ShapeType;

    fn record(label: &str) -> AnnotationRecord {
        AnnotationRecord {
            shape_type: ShapeType::Rect,
            label: label.to_string(),
            x: 0.5,
            y: 0.5,
            w: 0.1,
            h: 0.1,
            points: None,
            confidence: 1.0,
        }
    }

    #[test]
    fn test_ensure_appends_once() {
        let mut project = ProjectData::new(vec!["car".to_string()]);
        assert!(!project.ensure("car").unwrap());
        assert!(project.ensure("person").unwrap());
        assert!(!project.ensure("person").unwrap());
        assert_eq!(project.labels(), vec!["car", "person"]);
    }

    #[test]
    fn test_replace_records_overwrites_image() {
        let mut project = ProjectData::default();
        project.replace_records("a.jpg", vec![record("car"), record("car")]).unwrap();
        project.replace_records("a.jpg", vec![record("person")]).unwrap();
        assert_eq!(project.load_records("a.jpg").unwrap(), vec![record("person")]);
        assert_eq!(project.record_count(), 1);

        project.replace_records("a.jpg", Vec::new()).unwrap();
        assert!(project.load_records("a.jpg").unwrap().is_empty());
        assert!(project.images.is_empty());
    }
}
