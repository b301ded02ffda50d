// This file is part of the product Pantry.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::error::Error;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

const MAX_TEMP_ATTEMPTS: u32 = 100;

#[derive(Debug)]
pub struct YamlStoreError {
    message: String,
}

impl YamlStoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for YamlStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for YamlStoreError {}

/// Reads and decodes a YAML file. A missing or blank file yields `None`.
pub fn read_yaml_file<T: DeserializeOwned>(
    path: &Path,
    label: &str,
) -> Result<Option<T>, YamlStoreError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)
        .map_err(|err| YamlStoreError::new(format!("Failed to read {} file: {}", label, err)))?;
    if content.trim().is_empty() {
        return Ok(None);
    }
    let decoded = serde_yaml::from_str(&content)
        .map_err(|err| YamlStoreError::new(format!("Failed to parse {} file: {}", label, err)))?;
    Ok(Some(decoded))
}

/// Replaces `path` atomically: temp file in the same directory, fsync, rename.
pub fn write_yaml_file<T: Serialize>(
    path: &Path,
    label: &str,
    value: &T,
) -> Result<(), YamlStoreError> {
    let content = serde_yaml::to_string(value)
        .map_err(|err| YamlStoreError::new(format!("Failed to serialize {}: {}", label, err)))?;
    let parent = path
        .parent()
        .ok_or_else(|| YamlStoreError::new(format!("{} file path has no parent directory", label)))?;
    let file_name = path
        .file_name()
        .ok_or_else(|| YamlStoreError::new(format!("{} file path has no file name", label)))?;
    let (mut file, temp_path) = create_temp_file(parent, file_name, label)?;

    if let Ok(metadata) = fs::metadata(path) {
        #[cfg(unix)]
        {
            if let Err(err) = fs::set_permissions(&temp_path, metadata.permissions()) {
                let _ = fs::remove_file(&temp_path);
                return Err(YamlStoreError::new(format!(
                    "Failed to set temp {} file permissions: {}",
                    label, err
                )));
            }
        }
        #[cfg(not(unix))]
        let _ = metadata;
    }

    if let Err(err) = file.write_all(content.as_bytes()) {
        let _ = fs::remove_file(&temp_path);
        return Err(YamlStoreError::new(format!(
            "Failed to write {} temp file: {}",
            label, err
        )));
    }
    if let Err(err) = file.sync_all() {
        let _ = fs::remove_file(&temp_path);
        return Err(YamlStoreError::new(format!(
            "Failed to sync {} temp file: {}",
            label, err
        )));
    }

    if let Err(err) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(YamlStoreError::new(format!(
            "Failed to replace {} file: {}",
            label, err
        )));
    }

    #[cfg(unix)]
    {
        if let Err(err) = sync_parent_dir(parent) {
            log::warn!("Directory sync for {} file failed: {}", label, err);
        }
    }

    Ok(())
}

fn create_temp_file(
    parent: &Path,
    file_name: &std::ffi::OsStr,
    label: &str,
) -> Result<(fs::File, PathBuf), YamlStoreError> {
    let base = file_name.to_string_lossy();
    for attempt in 0..MAX_TEMP_ATTEMPTS {
        let temp_path = parent.join(format!(".{}.tmp.{}.{}", base, std::process::id(), attempt));
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)
        {
            Ok(file) => return Ok((file, temp_path)),
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(err) => {
                return Err(YamlStoreError::new(format!(
                    "Failed to create temp {} file: {}",
                    label, err
                )));
            }
        }
    }
    Err(YamlStoreError::new(format!(
        "Failed to create temp {} file after repeated attempts",
        label
    )))
}

#[cfg(unix)]
fn sync_parent_dir(parent: &Path) -> Result<(), std::io::Error> {
    let dir = fs::File::open(parent)?;
    dir.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn read_missing_file_is_none() {
        let temp = tempfile::tempdir().expect("tempdir");
        let value: Option<BTreeMap<String, u32>> =
            read_yaml_file(&temp.path().join("absent.yaml"), "test").expect("read");
        assert!(value.is_none());
    }

    #[test]
    fn read_blank_file_is_none() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("blank.yaml");
        fs::write(&path, "  \n").expect("write");
        let value: Option<BTreeMap<String, u32>> = read_yaml_file(&path, "test").expect("read");
        assert!(value.is_none());
    }

    #[test]
    fn write_replaces_file_and_leaves_no_temp() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("data.yaml");
        fs::write(&path, "old: 1\n").expect("write");

        let mut data = BTreeMap::new();
        data.insert("new".to_string(), 2u32);
        write_yaml_file(&path, "data", &data).expect("write yaml");

        let read: BTreeMap<String, u32> = read_yaml_file(&path, "data")
            .expect("read")
            .expect("present");
        assert_eq!(read.get("new"), Some(&2));
        assert!(!read.contains_key("old"));

        let leftovers: Vec<_> = fs::read_dir(temp.path())
            .expect("read dir")
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().contains(".tmp."))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn read_reports_parse_errors() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("broken.yaml");
        fs::write(&path, "key: [unclosed\n").expect("write");
        let err = read_yaml_file::<BTreeMap<String, u32>>(&path, "broken").expect_err("parse");
        assert!(err.to_string().contains("Failed to parse broken file"));
    }
}
