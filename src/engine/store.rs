// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! In-memory shape store for the displayed image.
//!
//! The store is the single source of truth for both the canvas and the
//! side list. Insertion order is preserved and drives rendering order,
//! hit-test priority and "undo last committed shape".

use crate::models::annotation::{Geometry, Point, Shape, ShapeId};
use crate::util::geometry::{clamp_translation, ImageSize};
use std::collections::BTreeSet;

/// Ordered shapes plus the current selection. Single-threaded.
#[derive(Debug, Clone)]
pub struct ShapeStore {
    shapes: Vec<Shape>,
    selected: BTreeSet<ShapeId>,
    next_id: u64,
}

impl Default for ShapeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ShapeStore {
    pub fn new() -> Self {
        Self {
            shapes: Vec::new(),
            selected: BTreeSet::new(),
            next_id: 1,
        }
    }

    /// Append a shape, assigning it a fresh id.
    pub fn add(&mut self, mut shape: Shape) -> ShapeId {
        let id = ShapeId(self.next_id);
        self.next_id += 1;
        shape.set_id(id);
        self.shapes.push(shape);
        id
    }

    /// Remove a shape and drop it from the selection.
    pub fn remove(&mut self, id: ShapeId) -> Option<Shape> {
        let index = self.shapes.iter().position(|s| s.id() == id)?;
        self.selected.remove(&id);
        Some(self.shapes.remove(index))
    }

    /// Remove every shape in `ids`, returning the ones that existed.
    pub fn remove_many(&mut self, ids: &BTreeSet<ShapeId>) -> Vec<Shape> {
        let (removed, kept): (Vec<Shape>, Vec<Shape>) = std::mem::take(&mut self.shapes)
            .into_iter()
            .partition(|s| ids.contains(&s.id()));
        self.shapes = kept;
        self.selected.retain(|id| !ids.contains(id));
        removed
    }

    pub fn remove_selected(&mut self) -> Vec<Shape> {
        let ids = std::mem::take(&mut self.selected);
        self.remove_many(&ids)
    }

    /// Remove the most recently added shape.
    pub fn pop_last(&mut self) -> Option<Shape> {
        let shape = self.shapes.pop()?;
        self.selected.remove(&shape.id());
        Some(shape)
    }

    /// Select a shape. Returns `false` when the id is unknown.
    pub fn select(&mut self, id: ShapeId, exclusive: bool) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        if exclusive {
            self.selected.clear();
        }
        self.selected.insert(id);
        true
    }

    /// Replace the selection, ignoring ids that are not in the store.
    pub fn set_selection(&mut self, ids: impl IntoIterator<Item = ShapeId>) {
        self.selected = ids.into_iter().filter(|id| self.get(*id).is_some()).collect();
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    pub fn all(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn selected(&self) -> &BTreeSet<ShapeId> {
        &self.selected
    }

    pub fn is_selected(&self, id: ShapeId) -> bool {
        self.selected.contains(&id)
    }

    pub fn get(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.iter().find(|s| s.id() == id)
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Topmost (most recently added) shape containing `p`.
    pub fn hit_test(&self, p: &Point) -> Option<ShapeId> {
        self.shapes
            .iter()
            .rev()
            .find(|s| s.contains_point(p))
            .map(Shape::id)
    }

    /// Overwrite a shape's geometry, keeping the whole shape inside the image.
    ///
    /// `original` is the geometry at drag start and `(dx, dy)` the total
    /// pointer offset since then.
    pub fn move_shape(
        &mut self,
        id: ShapeId,
        original: &Geometry,
        dx: f64,
        dy: f64,
        size: ImageSize,
    ) -> bool {
        let Some(shape) = self.shapes.iter_mut().find(|s| s.id() == id) else {
            return false;
        };
        let (dx, dy) = clamp_translation(&original.bounding_box(), dx, dy, size);
        let mut geometry = original.clone();
        geometry.translate(dx, dy);
        shape.geometry = geometry;
        true
    }

    /// Discard everything and take `shapes` as the new contents.
    pub fn replace_all(&mut self, shapes: Vec<Shape>) {
        self.shapes.clear();
        self.selected.clear();
        for shape in shapes {
            self.add(shape);
        }
    }

    pub fn clear(&mut self) {
        self.shapes.clear();
        self.selected.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::color::PALETTE;

    fn rect(x: f64, y: f64, w: f64, h: f64) -> Shape {
        Shape::new(
            "Object",
            Geometry::Rectangle {
                x,
                y,
                width: w,
                height: h,
            },
            PALETTE[0],
        )
    }

    #[test]
    fn test_add_assigns_unique_ids_in_order() {
        let mut store = ShapeStore::new();
        let a = store.add(rect(0.0, 0.0, 10.0, 10.0));
        let b = store.add(rect(5.0, 5.0, 10.0, 10.0));
        assert_ne!(a, b);
        let ids: Vec<_> = store.all().iter().map(Shape::id).collect();
        assert_eq!(ids, vec![a, b]);
    }

    #[test]
    fn test_remove_drops_selection() {
        let mut store = ShapeStore::new();
        let a = store.add(rect(0.0, 0.0, 10.0, 10.0));
        assert!(store.select(a, true));
        assert!(store.remove(a).is_some());
        assert!(store.selected().is_empty());
        assert!(store.remove(a).is_none());
    }

    #[test]
    fn test_select_exclusive_and_additive() {
        let mut store = ShapeStore::new();
        let a = store.add(rect(0.0, 0.0, 10.0, 10.0));
        let b = store.add(rect(20.0, 0.0, 10.0, 10.0));
        store.select(a, true);
        store.select(b, false);
        assert_eq!(store.selected().len(), 2);
        store.select(b, true);
        assert_eq!(store.selected().iter().copied().collect::<Vec<_>>(), vec![b]);
        assert!(!store.select(ShapeId(999), true));
        assert!(store.is_selected(b));
    }

    #[test]
    fn test_remove_selected_keeps_others() {
        let mut store = ShapeStore::new();
        let a = store.add(rect(0.0, 0.0, 10.0, 10.0));
        let b = store.add(rect(20.0, 0.0, 10.0, 10.0));
        store.select(a, true);
        let removed = store.remove_selected();
        assert_eq!(removed.len(), 1);
        assert_eq!(store.all()[0].id(), b);
        assert!(store.selected().is_empty());
    }

    #[test]
    fn test_pop_last_is_lifo() {
        let mut store = ShapeStore::new();
        let a = store.add(rect(0.0, 0.0, 10.0, 10.0));
        let b = store.add(rect(20.0, 0.0, 10.0, 10.0));
        store.select(b, true);
        assert_eq!(store.pop_last().map(|s| s.id()), Some(b));
        assert!(store.selected().is_empty());
        assert_eq!(store.pop_last().map(|s| s.id()), Some(a));
        assert!(store.pop_last().is_none());
    }

    #[test]
    fn test_hit_test_prefers_topmost() {
        let mut store = ShapeStore::new();
        store.add(rect(0.0, 0.0, 100.0, 100.0));
        let top = store.add(rect(40.0, 40.0, 20.0, 20.0));
        assert_eq!(store.hit_test(&Point::new(50.0, 50.0)), Some(top));
        assert_eq!(store.hit_test(&Point::new(500.0, 500.0)), None);
    }

    #[test]
    fn test_move_shape_is_clamped_to_image() {
        let mut store = ShapeStore::new();
        let id = store.add(rect(10.0, 10.0, 20.0, 20.0));
        let original = store.get(id).unwrap().geometry.clone();
        let size = ImageSize::new(100, 100).unwrap();
        assert!(store.move_shape(id, &original, 500.0, -500.0, size));
        let bb = store.get(id).unwrap().bounding_box();
        assert_eq!((bb.x, bb.y), (80.0, 0.0));
    }

    #[test]
    fn test_replace_all_resets_selection() {
        let mut store = ShapeStore::new();
        let a = store.add(rect(0.0, 0.0, 10.0, 10.0));
        store.select(a, true);
        store.replace_all(vec![rect(1.0, 1.0, 5.0, 5.0), rect(2.0, 2.0, 5.0, 5.0)]);
        assert_eq!(store.len(), 2);
        assert!(store.selected().is_empty());
        assert!(store.get(a).is_none());
    }
}
