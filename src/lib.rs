// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! YinTu - interactive image annotation for detection datasets.
//!
//! The library holds the annotation engine (shape store, drawing state
//! machine, selection sync, persistence and background tasks), the file
//! adapters it talks to, and the egui front end used by the `yintu` binary.

pub mod app;
pub mod config;
pub mod engine;
pub mod error;
pub mod io;
pub mod models;
pub mod ui;
pub mod util;

pub use config::AppConfig;
pub use engine::session::AnnotationSession;
pub use error::EngineError;
