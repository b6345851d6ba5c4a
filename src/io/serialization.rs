// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Project data serialization and deserialization.
//!
//! Projects are exported and imported as YAML or JSON, chosen by file
//! extension. Writes go to a sibling temporary file that is renamed over
//! the target, so a failed write never leaves a truncated project behind.

use crate::models::project::ProjectData;
use anyhow::{bail, Context, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Export project data to YAML format.
pub fn export_yaml(data: &ProjectData, path: &Path) -> Result<()> {
    let yaml = serde_yaml::to_string(data)?;
    write_atomic(path, yaml.as_bytes())
}

/// Export project data to JSON format.
pub fn export_json(data: &ProjectData, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(data)?;
    write_atomic(path, json.as_bytes())
}

/// Import project data from YAML format.
pub fn import_yaml(path: &Path) -> Result<ProjectData> {
    let yaml = std::fs::read_to_string(path)?;
    let data = serde_yaml::from_str(&yaml).with_context(|| format!("invalid YAML in {}", path.display()))?;
    Ok(data)
}

/// Import project data from JSON format.
pub fn import_json(path: &Path) -> Result<ProjectData> {
    let json = std::fs::read_to_string(path)?;
    let data = serde_json::from_str(&json).with_context(|| format!("invalid JSON in {}", path.display()))?;
    Ok(data)
}

/// Export in the format implied by the extension of `path`.
pub fn export_by_extension(data: &ProjectData, path: &Path) -> Result<()> {
    match path.extension().and_then(|s| s.to_str()) {
        Some("yaml") | Some("yml") => export_yaml(data, path),
        Some("json") => export_json(data, path),
        other => bail!("Unsupported file extension: {:?}", other),
    }
}

/// Import in the format implied by the extension of `path`.
pub fn import_by_extension(path: &Path) -> Result<ProjectData> {
    match path.extension().and_then(|s| s.to_str()) {
        Some("yaml") | Some("yml") => import_yaml(path),
        Some("json") => import_json(path),
        other => bail!("Unsupported file extension: {:?}", other),
    }
}

/// Replace `path` with `contents` via a temporary file and rename.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let tmp = temp_path(path);
    std::fs::write(&tmp, contents).with_context(|| format!("failed to write {}", tmp.display()))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e).with_context(|| format!("failed to replace {}", path.display()));
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::{AnnotationRecord, ShapeType};

    fn sample() -> ProjectData {
        let mut data = ProjectData::new(vec!["car".to_string()]);
        data.images.insert(
            "frames/0001.jpg".to_string(),
            vec![AnnotationRecord {
                shape_type: ShapeType::Rect,
                label: "car".to_string(),
                x: 0.25,
                y: 0.41667,
                w: 0.25,
                h: 0.5,
                points: None,
                confidence: 0.8,
            }],
        );
        data
    }

    #[test]
    fn test_yaml_and_json_agree() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = dir.path().join("p.yaml");
        let json = dir.path().join("p.json");
        export_by_extension(&sample(), &yaml).unwrap();
        export_by_extension(&sample(), &json).unwrap();

        assert_eq!(import_by_extension(&yaml).unwrap(), sample());
        assert_eq!(import_by_extension(&json).unwrap(), sample());
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(export_by_extension(&sample(), &dir.path().join("p.txt")).is_err());
    }

    #[test]
    fn test_write_atomic_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("project.json");
        write_atomic(&path, b"{}").unwrap();
        write_atomic(&path, b"{\"labels\":[]}").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"labels\":[]}");
        assert!(!temp_path(&path).exists());
    }
}
