// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annotation data structures.
//!
//! This module defines the shapes users draw over an image: axis-aligned
//! rectangles and polygons, both stored in image-pixel coordinates and
//! carrying a label and a display color.

use crate::engine::color::Color;
use crate::models::record::AnnotationRecord;
use crate::util::geometry::{to_normalized, ImageSize};
use serde::{Deserialize, Serialize};

/// Minimum number of vertices required for a polygon.
pub const MIN_POLYGON_VERTICES: usize = 3;

/// A 2D point in image-pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Create a new point.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Axis-aligned box given by its top-left corner and size.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    /// Smallest box containing all `points`. Empty input yields a zero box.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point>) -> Self {
        let mut iter = points.into_iter();
        let Some(first) = iter.next() else {
            return Self::default();
        };
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in iter {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Self {
            x: min_x,
            y: min_y,
            width: max_x - min_x,
            height: max_y - min_y,
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn contains(&self, p: &Point) -> bool {
        p.x >= self.x && p.x <= self.x + self.width && p.y >= self.y && p.y <= self.y + self.height
    }
}

/// Kind of shape, used where only the variant matters (rendering, records).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Rectangle,
    Polygon,
}

/// Geometry of a shape in image-pixel coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// Axis-aligned box; `x`/`y` is the top-left corner.
    Rectangle {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
    /// Closed polygon; the last vertex connects back to the first.
    Polygon { vertices: Vec<Point> },
}

impl Geometry {
    /// Build a rectangle spanning two opposite corners in any order.
    pub fn rectangle_from_corners(a: Point, b: Point) -> Self {
        Geometry::Rectangle {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (b.x - a.x).abs(),
            height: (b.y - a.y).abs(),
        }
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            Geometry::Rectangle { .. } => ShapeKind::Rectangle,
            Geometry::Polygon { .. } => ShapeKind::Polygon,
        }
    }

    pub fn bounding_box(&self) -> BoundingBox {
        match self {
            Geometry::Rectangle {
                x,
                y,
                width,
                height,
            } => BoundingBox {
                x: *x,
                y: *y,
                width: *width,
                height: *height,
            },
            Geometry::Polygon { vertices } => BoundingBox::from_points(vertices),
        }
    }

    /// Hit test used for selection and dragging.
    pub fn contains_point(&self, p: &Point) -> bool {
        match self {
            Geometry::Rectangle { .. } => self.bounding_box().contains(p),
            Geometry::Polygon { vertices } => {
                if vertices.len() < MIN_POLYGON_VERTICES {
                    return false;
                }
                // Ray casting
                let mut inside = false;
                let mut j = vertices.len() - 1;
                for i in 0..vertices.len() {
                    let (vi, vj) = (vertices[i], vertices[j]);
                    if (vi.y > p.y) != (vj.y > p.y)
                        && p.x < (vj.x - vi.x) * (p.y - vi.y) / (vj.y - vi.y) + vi.x
                    {
                        inside = !inside;
                    }
                    j = i;
                }
                inside
            }
        }
    }

    /// Move every vertex by `(dx, dy)`. No clamping is applied here.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        match self {
            Geometry::Rectangle { x, y, .. } => {
                *x += dx;
                *y += dy;
            }
            Geometry::Polygon { vertices } => {
                for v in vertices.iter_mut() {
                    v.x += dx;
                    v.y += dy;
                }
            }
        }
    }

    /// Corner or vertex list in drawing order.
    pub fn outline(&self) -> Vec<Point> {
        match self {
            Geometry::Rectangle {
                x,
                y,
                width,
                height,
            } => vec![
                Point::new(*x, *y),
                Point::new(x + width, *y),
                Point::new(x + width, y + height),
                Point::new(*x, y + height),
            ],
            Geometry::Polygon { vertices } => vertices.clone(),
        }
    }

    /// Enclosed area in square pixels (shoelace formula for polygons).
    pub fn area(&self) -> f64 {
        match self {
            Geometry::Rectangle { width, height, .. } => width * height,
            Geometry::Polygon { vertices } => {
                if vertices.len() < MIN_POLYGON_VERTICES {
                    return 0.0;
                }
                let mut twice = 0.0;
                for (i, a) in vertices.iter().enumerate() {
                    let b = vertices[(i + 1) % vertices.len()];
                    twice += a.x * b.y - b.x * a.y;
                }
                twice.abs() / 2.0
            }
        }
    }

    /// Whether this geometry is too small to be a meaningful annotation.
    ///
    /// Rectangles need both sides of at least `min_size` pixels; polygons need
    /// three vertices and an area of at least `min_size²`.
    pub fn is_degenerate(&self, min_size: f64) -> bool {
        match self {
            Geometry::Rectangle { width, height, .. } => *width < min_size || *height < min_size,
            Geometry::Polygon { vertices } => {
                vertices.len() < MIN_POLYGON_VERTICES || self.area() < min_size * min_size
            }
        }
    }
}

/// Stable identity of a shape inside a [`ShapeStore`](crate::engine::store::ShapeStore).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId(pub u64);

impl std::fmt::Display for ShapeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A labelled annotation shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    id: ShapeId,
    pub label: String,
    pub geometry: Geometry,
    /// Derived from the label; never persisted.
    pub color: Color,
    /// 1.0 for hand-drawn shapes, the detector score otherwise.
    pub confidence: f64,
}

impl Shape {
    /// Create a shape that has not been added to a store yet.
    pub fn new(label: impl Into<String>, geometry: Geometry, color: Color) -> Self {
        Self {
            id: ShapeId(0),
            label: label.into(),
            geometry,
            color,
            confidence: 1.0,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn id(&self) -> ShapeId {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: ShapeId) {
        self.id = id;
    }

    pub fn kind(&self) -> ShapeKind {
        self.geometry.kind()
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.geometry.bounding_box()
    }

    pub fn contains_point(&self, p: &Point) -> bool {
        self.geometry.contains_point(p)
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.geometry.translate(dx, dy);
    }

    /// Persisted form of this shape for an image of the given size.
    pub fn normalized_record(&self, size: ImageSize) -> AnnotationRecord {
        AnnotationRecord::from_normalized(
            self.label.clone(),
            self.confidence,
            to_normalized(&self.geometry, size),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Geometry {
        Geometry::Polygon {
            vertices: vec![
                Point::new(50.0, 50.0),
                Point::new(150.0, 50.0),
                Point::new(150.0, 150.0),
                Point::new(50.0, 150.0),
            ],
        }
    }

    #[test]
    fn test_rectangle_from_corners_any_order() {
        let g = Geometry::rectangle_from_corners(Point::new(300.0, 400.0), Point::new(100.0, 100.0));
        assert_eq!(
            g,
            Geometry::Rectangle {
                x: 100.0,
                y: 100.0,
                width: 200.0,
                height: 300.0
            }
        );
    }

    #[test]
    fn test_polygon_bounding_box_and_area() {
        let g = square();
        let bb = g.bounding_box();
        assert_eq!((bb.x, bb.y, bb.width, bb.height), (50.0, 50.0, 100.0, 100.0));
        assert!((g.area() - 10_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_contains_point() {
        let g = square();
        assert!(g.contains_point(&Point::new(100.0, 100.0)));
        assert!(!g.contains_point(&Point::new(10.0, 100.0)));

        let triangle = Geometry::Polygon {
            vertices: vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0), Point::new(0.0, 100.0)],
        };
        assert!(triangle.contains_point(&Point::new(10.0, 10.0)));
        assert!(!triangle.contains_point(&Point::new(90.0, 90.0)));
    }

    #[test]
    fn test_translate_moves_all_vertices() {
        let mut g = square();
        g.translate(10.0, -5.0);
        assert_eq!(g.outline()[0], Point::new(60.0, 45.0));
        assert_eq!(g.outline()[2], Point::new(160.0, 145.0));
    }

    #[test]
    fn test_degenerate_shapes() {
        let flat = Geometry::rectangle_from_corners(Point::new(10.0, 10.0), Point::new(200.0, 10.5));
        assert!(flat.is_degenerate(2.0));

        let collinear = Geometry::Polygon {
            vertices: vec![Point::new(0.0, 0.0), Point::new(50.0, 50.0), Point::new(100.0, 100.0)],
        };
        assert!(collinear.is_degenerate(2.0));
        assert!(!square().is_degenerate(2.0));
    }
}
