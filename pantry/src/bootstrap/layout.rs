// This file is part of the product Pantry.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::{BootstrapError, log_action};
use crate::config::CONFIG_FILE_NAME;
use crate::runtime_paths::{STATE_DIR_NAME, USERS_FILE_NAME};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    File,
    Directory,
}

impl EntryKind {
    fn matches(self, path: &Path) -> bool {
        match self {
            EntryKind::File => path.is_file(),
            EntryKind::Directory => path.is_dir(),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            EntryKind::File => "a file",
            EntryKind::Directory => "a directory",
        }
    }
}

/// Entries Pantry owns inside the runtime root. Anything else is left alone.
const PANTRY_ENTRIES: [(&str, EntryKind); 3] = [
    (CONFIG_FILE_NAME, EntryKind::File),
    (USERS_FILE_NAME, EntryKind::File),
    (STATE_DIR_NAME, EntryKind::Directory),
];

/// Creates the runtime root if needed and checks that the entries Pantry
/// manages, when present, have the expected kind.
pub fn prepare_root(root: &Path) -> Result<PathBuf, BootstrapError> {
    let root_path = if root.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        root.to_path_buf()
    };

    if !root_path.exists() {
        fs::create_dir_all(&root_path)?;
        log_action(format!("created runtime root {}", root_path.display()));
        return Ok(root_path);
    }
    if !root_path.is_dir() {
        return Err(invalid_input(format!(
            "Runtime root is not a directory: {}",
            root_path.display()
        )));
    }

    let mismatched: Vec<String> = PANTRY_ENTRIES
        .iter()
        .filter_map(|(name, kind)| {
            let path = root_path.join(name);
            // dangling links count as present
            let present = fs::symlink_metadata(&path).is_ok();
            (present && !kind.matches(&path))
                .then(|| format!("{} should be {}", name, kind.describe()))
        })
        .collect();

    if mismatched.is_empty() {
        Ok(root_path)
    } else {
        Err(invalid_input(format!(
            "Runtime root '{}' has unusable entries: {}",
            root_path.display(),
            mismatched.join("; ")
        )))
    }
}

fn invalid_input(message: String) -> BootstrapError {
    BootstrapError::Io(io::Error::new(io::ErrorKind::InvalidInput, message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_root_is_created() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().join("nested").join("root");
        let resolved = prepare_root(&root).expect("root");
        assert!(resolved.is_dir());
    }

    #[test]
    fn unrelated_entries_and_dotfiles_are_ignored() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("notes.txt"), "").expect("write");
        fs::write(dir.path().join(".env"), "").expect("write");
        fs::create_dir(dir.path().join(".git")).expect("mkdir");
        fs::create_dir(dir.path().join("src")).expect("mkdir");
        fs::write(dir.path().join("config.yaml"), "").expect("write");

        let resolved = prepare_root(dir.path()).expect("ordinary directory is accepted");
        assert_eq!(resolved, dir.path());
    }

    #[test]
    fn directory_in_place_of_users_file_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir(dir.path().join("users.yaml")).expect("mkdir");

        let message = prepare_root(dir.path()).expect_err("wrong kind").to_string();
        assert!(message.contains("users.yaml should be a file"));
    }

    #[test]
    fn file_in_place_of_state_dir_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("state"), "x").expect("write");

        let message = prepare_root(dir.path()).expect_err("wrong kind").to_string();
        assert!(message.contains("state should be a directory"));
    }

    #[test]
    fn file_root_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("file");
        fs::write(&file, "x").expect("write");
        assert!(prepare_root(&file).is_err());
    }
}
