// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! The annotation engine: shape store, interaction state machine, selection
//! sync, persistence and background tasks.

pub mod color;
pub mod controller;
pub mod detect;
pub mod frames;
pub mod persistence;
pub mod selection;
pub mod session;
pub mod store;
