// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! I/O for media files and the project store.

pub mod media;
pub mod serialization;
pub mod storage;
