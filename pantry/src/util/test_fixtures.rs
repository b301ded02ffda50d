// This file is part of the product Pantry.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::config::CONFIG_FILE_NAME;
use crate::runtime_paths::STATE_DIR_NAME;

/// Scratch runtime root under `target/test-fixtures`, removed on drop.
#[derive(Debug)]
pub struct TestFixtureRoot {
    path: PathBuf,
}

impl TestFixtureRoot {
    pub fn new_fixed(name: &str) -> std::io::Result<Self> {
        let root = fixtures_root().join(name);
        if root.exists() {
            fs::remove_dir_all(&root)?;
        }
        fs::create_dir_all(&root)?;
        Ok(Self { path: root })
    }

    pub fn new_unique(prefix: &str) -> std::io::Result<Self> {
        let name = format!("{}-{}", prefix, Uuid::new_v4());
        Self::new_fixed(&name)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config_file(&self) -> PathBuf {
        self.path.join(CONFIG_FILE_NAME)
    }

    pub fn state_dir(&self) -> PathBuf {
        self.path.join(STATE_DIR_NAME)
    }

    /// Writes a config with a fixed JWT secret and cheap password hashing.
    pub fn write_test_config(&self) -> std::io::Result<()> {
        fs::create_dir_all(self.state_dir())?;
        fs::write(self.config_file(), TEST_CONFIG_YAML)
    }
}

impl Drop for TestFixtureRoot {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

const TEST_CONFIG_YAML: &str = "server:\n  host: \"127.0.0.1\"\n  port: 8000\n  workers: 1\napp:\n  name: \"Pantry\"\nusers:\n  jwt:\n    secret: \"test-secret\"\n  password:\n    memory_kib: 1024\n    iterations: 1\n    parallelism: 1\nlogging:\n  level: \"debug\"\n";

fn fixtures_root() -> PathBuf {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let repo_root = manifest_dir.parent().unwrap_or(&manifest_dir);
    repo_root.join("target").join("test-fixtures")
}
