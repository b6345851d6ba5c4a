// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Save/load contract between the shape store and annotation storage.

use crate::engine::color::color_for;
use crate::engine::store::ShapeStore;
use crate::error::EngineError;
use crate::models::annotation::Shape;
use crate::models::project::LabelVocabulary;
use crate::models::record::AnnotationRecord;
use crate::util::geometry::{from_normalized, require_size, ImageSize};

/// Per-image annotation storage.
///
/// `replace_records` must be atomic for the given key: on failure the
/// previously stored records stay intact.
pub trait AnnotationStorage {
    fn load_records(&self, image_key: &str) -> Result<Vec<AnnotationRecord>, EngineError>;

    fn replace_records(
        &mut self,
        image_key: &str,
        records: Vec<AnnotationRecord>,
    ) -> Result<(), EngineError>;
}

/// Why a save happened. Only user-initiated failures are shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveTrigger {
    /// Save button or menu entry.
    Explicit,
    /// Keyboard save shortcut.
    Shortcut,
    /// Implicit save before switching images.
    Navigation,
}

impl SaveTrigger {
    pub fn is_user_initiated(&self) -> bool {
        !matches!(self, SaveTrigger::Navigation)
    }
}

/// Write every shape in `store` as the complete record set for `image_key`.
///
/// Returns the number of records written.
pub fn save(
    store: &ShapeStore,
    image_key: &str,
    size: Option<ImageSize>,
    storage: &mut dyn AnnotationStorage,
) -> Result<usize, EngineError> {
    let size = require_size(size)?;
    let records: Vec<AnnotationRecord> = store
        .all()
        .iter()
        .map(|shape| shape.normalized_record(size))
        .collect();
    let count = records.len();
    storage.replace_records(image_key, records)?;
    log::info!("Saved {} annotation(s) for {}", count, image_key);
    Ok(count)
}

/// Rebuild the shapes stored for `image_key`.
///
/// Unknown labels are appended to the vocabulary before colors are assigned.
pub fn load(
    image_key: &str,
    size: Option<ImageSize>,
    storage: &dyn AnnotationStorage,
    vocabulary: &mut dyn LabelVocabulary,
) -> Result<Vec<Shape>, EngineError> {
    let size = require_size(size)?;
    let records = storage.load_records(image_key)?;
    let shapes = shapes_from_records(records, size, vocabulary)?;
    log::info!("Loaded {} annotation(s) for {}", shapes.len(), image_key);
    Ok(shapes)
}

/// Convert stored records into pixel-space shapes for an image of `size`.
///
/// Every record is validated before any label reaches the vocabulary, so a
/// bad record leaves the vocabulary untouched.
pub fn shapes_from_records(
    records: Vec<AnnotationRecord>,
    size: ImageSize,
    vocabulary: &mut dyn LabelVocabulary,
) -> Result<Vec<Shape>, EngineError> {
    let validated = records
        .into_iter()
        .map(|record| record.normalized_geometry().map(|geometry| (record, geometry)))
        .collect::<Result<Vec<_>, _>>()?;

    let mut shapes = Vec::with_capacity(validated.len());
    for (record, normalized) in validated {
        vocabulary.ensure(&record.label)?;
        let color = color_for(&record.label, &vocabulary.labels());
        shapes.push(
            Shape::new(record.label, from_normalized(&normalized, size), color)
                .with_confidence(record.confidence),
        );
    }
    Ok(shapes)
}
