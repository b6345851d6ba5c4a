// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! UI components for the YinTu application.

pub mod canvas;
pub mod label_dialog;
pub mod properties;
pub mod shortcuts;
pub mod toolbar;
