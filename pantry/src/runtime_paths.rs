// This file is part of the product Pantry.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::config::{CONFIG_FILE_NAME, ConfigError};
use std::fs;
use std::path::{Path, PathBuf};

pub const USERS_FILE_NAME: &str = "users.yaml";
pub const RECIPES_FILE_NAME: &str = "recipes.yaml";
pub const STATE_DIR_NAME: &str = "state";

#[derive(Debug, Clone)]
pub struct RuntimePaths {
    pub root: PathBuf,
    pub config_file: PathBuf,
    pub users_file: PathBuf,
    pub state_dir: PathBuf,
    pub recipes_file: PathBuf,
}

impl RuntimePaths {
    /// Resolves the runtime layout under `root`, creating the state directory when missing.
    pub fn from_root(root: &Path) -> Result<Self, ConfigError> {
        let root_path = if root.as_os_str().is_empty() {
            PathBuf::from(".")
        } else {
            root.to_path_buf()
        };

        if !root_path.exists() {
            fs::create_dir_all(&root_path).map_err(|e| {
                ConfigError::ValidationError(format!(
                    "Failed to create runtime root '{}': {}",
                    root_path.display(),
                    e
                ))
            })?;
        }

        let root_canonical = root_path.canonicalize().map_err(|e| {
            ConfigError::ValidationError(format!(
                "Failed to canonicalize runtime root '{}': {}",
                root_path.display(),
                e
            ))
        })?;

        let state_dir = root_canonical.join(STATE_DIR_NAME);
        ensure_dir_exists(&state_dir)?;

        Ok(Self {
            config_file: root_canonical.join(CONFIG_FILE_NAME),
            users_file: root_canonical.join(USERS_FILE_NAME),
            recipes_file: state_dir.join(RECIPES_FILE_NAME),
            state_dir,
            root: root_canonical,
        })
    }
}

fn ensure_dir_exists(path: &Path) -> Result<(), ConfigError> {
    if path.exists() {
        if !path.is_dir() {
            return Err(ConfigError::ValidationError(format!(
                "Expected a directory at '{}'",
                path.display()
            )));
        }
        return Ok(());
    }
    fs::create_dir_all(path).map_err(|e| {
        ConfigError::ValidationError(format!(
            "Failed to create directory '{}': {}",
            path.display(),
            e
        ))
    })
}
