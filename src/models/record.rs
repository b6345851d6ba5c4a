// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Persisted annotation records.
//!
//! An [`AnnotationRecord`] is the normalized projection of a shape and the
//! only format the engine agrees on with annotation storage.

use crate::error::EngineError;
use crate::models::annotation::{Point, MIN_POLYGON_VERTICES};
use crate::util::geometry::{NormalizedBox, NormalizedGeometry};
use serde::{Deserialize, Serialize};

/// Shape discriminator as written to storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShapeType {
    #[serde(rename = "rect")]
    Rect,
    #[serde(rename = "polygon")]
    Polygon,
}

fn default_confidence() -> f64 {
    1.0
}

/// One stored annotation, all coordinates in [0, 1].
///
/// For rectangles `x`/`y` is the box center and `w`/`h` its size. For
/// polygons the same fields hold the bounding box of `points`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    pub shape_type: ShapeType,
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<[f64; 2]>>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

impl AnnotationRecord {
    /// Assemble a record from a label and normalized geometry.
    pub fn from_normalized(label: String, confidence: f64, geometry: NormalizedGeometry) -> Self {
        let (shape_type, b, points) = match geometry {
            NormalizedGeometry::Rect(b) => (ShapeType::Rect, b, None),
            NormalizedGeometry::Polygon { points, bounds } => (
                ShapeType::Polygon,
                bounds,
                Some(points.iter().map(|p| [p.x, p.y]).collect()),
            ),
        };
        Self {
            shape_type,
            label,
            x: b.x_center,
            y: b.y_center,
            w: b.width,
            h: b.height,
            points,
            confidence,
        }
    }

    /// Recover the normalized geometry stored in this record.
    pub fn normalized_geometry(&self) -> Result<NormalizedGeometry, EngineError> {
        let bounds = NormalizedBox {
            x_center: self.x,
            y_center: self.y,
            width: self.w,
            height: self.h,
        };
        match self.shape_type {
            ShapeType::Rect => Ok(NormalizedGeometry::Rect(bounds)),
            ShapeType::Polygon => {
                let points: Vec<Point> = self
                    .points
                    .as_deref()
                    .unwrap_or_default()
                    .iter()
                    .map(|[x, y]| Point::new(*x, *y))
                    .collect();
                if points.len() < MIN_POLYGON_VERTICES {
                    return Err(EngineError::InvalidRecord {
                        reason: format!(
                            "polygon '{}' has {} points, needs at least {}",
                            self.label,
                            points.len(),
                            MIN_POLYGON_VERTICES
                        ),
                    });
                }
                Ok(NormalizedGeometry::Polygon { points, bounds })
            }
        }
    }
}
