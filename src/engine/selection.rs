// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Keeps canvas selection and side-list selection consistent.
//!
//! Views report user-initiated selection changes as [`SelectionEvent`]s.
//! When the synchronizer pushes a selection into the other view, that view
//! may answer with its own change notification (as retained-mode widgets
//! do when their selection is set programmatically). Those echoes arrive
//! while the reentrancy guard is held and are dropped.

use crate::engine::store::ShapeStore;
use crate::models::annotation::{BoundingBox, Shape, ShapeId};
use std::collections::BTreeSet;

/// Which view a selection change came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionSource {
    Canvas,
    List,
}

/// A selection change reported by a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionEvent {
    pub source: SelectionSource,
    pub ids: Vec<ShapeId>,
}

impl SelectionEvent {
    pub fn canvas(ids: impl IntoIterator<Item = ShapeId>) -> Self {
        Self {
            source: SelectionSource::Canvas,
            ids: ids.into_iter().collect(),
        }
    }

    pub fn list(ids: impl IntoIterator<Item = ShapeId>) -> Self {
        Self {
            source: SelectionSource::List,
            ids: ids.into_iter().collect(),
        }
    }
}

/// A view that can display a selection.
pub trait SelectionView {
    /// Show `ids` as selected. Returns the change notification the view
    /// emits in response, if it emits one.
    fn show_selection(&mut self, ids: &BTreeSet<ShapeId>) -> Option<SelectionEvent>;

    /// Bring a shape into view (scroll a list row, center the canvas).
    fn reveal(&mut self, _id: ShapeId, _bounds: BoundingBox) {}
}

/// Selection synchronizer with a reentrancy guard.
#[derive(Debug, Default)]
pub struct SelectionSync {
    syncing: bool,
    list_selection: BTreeSet<ShapeId>,
    suppressed: usize,
}

impl SelectionSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows currently selected in the side list.
    pub fn list_selection(&self) -> &BTreeSet<ShapeId> {
        &self.list_selection
    }

    /// Echo notifications dropped by the guard so far.
    pub fn suppressed(&self) -> usize {
        self.suppressed
    }

    /// Apply a user selection change from one view to the store and the other view.
    pub fn handle(
        &mut self,
        event: SelectionEvent,
        store: &mut ShapeStore,
        canvas: &mut dyn SelectionView,
        list: &mut dyn SelectionView,
    ) {
        if self.syncing {
            self.suppressed += 1;
            log::trace!("Ignoring {:?} selection echo", event.source);
            return;
        }
        self.syncing = true;

        let ids: BTreeSet<ShapeId> = event
            .ids
            .into_iter()
            .filter(|id| store.get(*id).is_some())
            .collect();
        store.set_selection(ids.iter().copied());
        self.list_selection = ids.clone();

        let target: &mut dyn SelectionView = match event.source {
            SelectionSource::Canvas => &mut *list,
            SelectionSource::List => &mut *canvas,
        };
        let echo = target.show_selection(&ids);
        if let Some(shape) = ids.first().and_then(|id| store.get(*id)) {
            target.reveal(shape.id(), shape.bounding_box());
        }
        if let Some(echo) = echo {
            self.handle(echo, store, canvas, list);
        }

        log::debug!("Selection synced from {:?}: {} shape(s)", event.source, ids.len());
        self.syncing = false;
    }

    /// Delete the union of canvas-selected and list-selected shapes.
    ///
    /// Both selections are cleared and both views refreshed.
    pub fn delete_selected(
        &mut self,
        store: &mut ShapeStore,
        canvas: &mut dyn SelectionView,
        list: &mut dyn SelectionView,
    ) -> Vec<Shape> {
        let ids: BTreeSet<ShapeId> = store
            .selected()
            .union(&self.list_selection)
            .copied()
            .collect();
        self.list_selection.clear();
        if ids.is_empty() {
            return Vec::new();
        }

        let removed = store.remove_many(&ids);
        store.clear_selection();
        self.refresh(store, canvas, list);
        log::info!("Deleted {} shape(s), {} remaining", removed.len(), store.len());
        removed
    }

    /// Drop list rows whose shapes are gone and re-show both selections.
    pub fn refresh(&mut self, store: &ShapeStore, canvas: &mut dyn SelectionView, list: &mut dyn SelectionView) {
        self.list_selection.retain(|id| store.get(*id).is_some());
        self.syncing = true;
        let canvas_echo = canvas.show_selection(store.selected());
        let list_echo = list.show_selection(&self.list_selection);
        self.suppressed += usize::from(canvas_echo.is_some()) + usize::from(list_echo.is_some());
        self.syncing = false;
    }

    /// Forget the list selection (new image loaded).
    pub fn reset(&mut self) {
        self.list_selection.clear();
        self.syncing = false;
    }
}
