// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Data model: shapes, persisted records and project data.

pub mod annotation;
pub mod project;
pub mod record;
