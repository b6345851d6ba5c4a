// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Geometric utility functions.
//!
//! This module converts between image-pixel coordinates and the normalized
//! [0, 1] space annotations are stored in, and clamps interaction points
//! to the image rectangle.

use crate::error::EngineError;
use crate::models::annotation::{BoundingBox, Geometry, Point};

/// Pixel dimensions of a loaded image. Both sides are non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    /// Returns `GeometryUnavailable` when either side is zero.
    pub fn new(width: u32, height: u32) -> Result<Self, EngineError> {
        if width == 0 || height == 0 {
            return Err(EngineError::GeometryUnavailable);
        }
        Ok(Self { width, height })
    }

    pub fn w(&self) -> f64 {
        self.width as f64
    }

    pub fn h(&self) -> f64 {
        self.height as f64
    }
}

/// Unwrap the size of an image that may still be loading.
pub fn require_size(size: Option<ImageSize>) -> Result<ImageSize, EngineError> {
    size.ok_or(EngineError::GeometryUnavailable)
}

/// Box in normalized space given by its center and size (YOLO layout).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NormalizedBox {
    pub x_center: f64,
    pub y_center: f64,
    pub width: f64,
    pub height: f64,
}

/// Normalized projection of a [`Geometry`].
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedGeometry {
    Rect(NormalizedBox),
    Polygon {
        points: Vec<Point>,
        /// Bounding box of `points`, kept for filtering and compatibility.
        bounds: NormalizedBox,
    },
}

/// Convert pixel coordinates to normalized coordinates (0.0 to 1.0).
pub fn normalize_coordinates(pixel_x: f64, pixel_y: f64, size: ImageSize) -> Point {
    Point {
        x: pixel_x / size.w(),
        y: pixel_y / size.h(),
    }
}

/// Convert normalized coordinates to pixel coordinates.
pub fn denormalize_coordinates(point: &Point, size: ImageSize) -> Point {
    Point {
        x: point.x * size.w(),
        y: point.y * size.h(),
    }
}

/// Project a point onto the image rectangle `[0, w] × [0, h]`.
pub fn clamp_to_image(point: Point, size: ImageSize) -> Point {
    Point {
        x: point.x.clamp(0.0, size.w()),
        y: point.y.clamp(0.0, size.h()),
    }
}

/// Limit a translation so that `bounds` stays inside the image.
pub fn clamp_translation(bounds: &BoundingBox, dx: f64, dy: f64, size: ImageSize) -> (f64, f64) {
    let min_dx = -bounds.x;
    let max_dx = size.w() - (bounds.x + bounds.width);
    let min_dy = -bounds.y;
    let max_dy = size.h() - (bounds.y + bounds.height);
    (
        dx.clamp(min_dx.min(0.0), max_dx.max(0.0)),
        dy.clamp(min_dy.min(0.0), max_dy.max(0.0)),
    )
}

fn normalize_box(bounds: &BoundingBox, size: ImageSize) -> NormalizedBox {
    let center = bounds.center();
    NormalizedBox {
        x_center: center.x / size.w(),
        y_center: center.y / size.h(),
        width: bounds.width / size.w(),
        height: bounds.height / size.h(),
    }
}

/// Pixel geometry to normalized form.
pub fn to_normalized(geometry: &Geometry, size: ImageSize) -> NormalizedGeometry {
    match geometry {
        Geometry::Rectangle { .. } => NormalizedGeometry::Rect(normalize_box(&geometry.bounding_box(), size)),
        Geometry::Polygon { vertices } => NormalizedGeometry::Polygon {
            points: vertices
                .iter()
                .map(|v| normalize_coordinates(v.x, v.y, size))
                .collect(),
            bounds: normalize_box(&geometry.bounding_box(), size),
        },
    }
}

/// Normalized form back to pixel geometry; the inverse of [`to_normalized`].
pub fn from_normalized(normalized: &NormalizedGeometry, size: ImageSize) -> Geometry {
    match normalized {
        NormalizedGeometry::Rect(b) => {
            let width = b.width * size.w();
            let height = b.height * size.h();
            Geometry::Rectangle {
                x: b.x_center * size.w() - width / 2.0,
                y: b.y_center * size.h() - height / 2.0,
                width,
                height,
            }
        }
        NormalizedGeometry::Polygon { points, .. } => Geometry::Polygon {
            vertices: points
                .iter()
                .map(|p| denormalize_coordinates(p, size))
                .collect(),
        },
    }
}
