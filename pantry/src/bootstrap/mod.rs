// This file is part of the product Pantry.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::config::{Config, ConfigError, ValidatedConfig};
use crate::runtime_paths::RuntimePaths;
use std::error::Error;
use std::fmt;
use std::path::Path;

pub mod config;
pub mod layout;
pub mod users;

#[derive(Debug)]
pub struct BootstrapResult {
    pub validated_config: ValidatedConfig,
    pub runtime_paths: RuntimePaths,
    pub created_config: bool,
    pub created_users: bool,
}

#[derive(Debug)]
pub enum BootstrapError {
    Config(ConfigError),
    Io(std::io::Error),
    Users(String),
}

impl fmt::Display for BootstrapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootstrapError::Config(err) => write!(f, "{}", err),
            BootstrapError::Io(err) => write!(f, "Bootstrap I/O error: {}", err),
            BootstrapError::Users(message) => write!(f, "Bootstrap users error: {}", message),
        }
    }
}

impl Error for BootstrapError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BootstrapError::Config(err) => Some(err),
            BootstrapError::Io(err) => Some(err),
            BootstrapError::Users(_) => None,
        }
    }
}

impl From<ConfigError> for BootstrapError {
    fn from(err: ConfigError) -> Self {
        BootstrapError::Config(err)
    }
}

impl From<std::io::Error> for BootstrapError {
    fn from(err: std::io::Error) -> Self {
        BootstrapError::Io(err)
    }
}

/// Prepares the runtime root: config, seeded users file and state directory.
pub fn bootstrap_runtime(root: &Path) -> Result<BootstrapResult, BootstrapError> {
    let root_path = layout::prepare_root(root)?;

    let created_config = config::ensure_config(&root_path)?;

    let validated_config = Config::load_and_validate(&root_path).map_err(BootstrapError::Config)?;

    let created_users = users::ensure_users(&root_path, &validated_config)?;

    let runtime_paths = RuntimePaths::from_root(&root_path).map_err(BootstrapError::Config)?;

    Ok(BootstrapResult {
        validated_config,
        runtime_paths,
        created_config,
        created_users,
    })
}

pub(crate) fn log_action(message: impl AsRef<str>) {
    eprintln!("[bootstrap] {}", message.as_ref());
}

pub(crate) fn log_warning(message: impl AsRef<str>) {
    eprintln!("[bootstrap] WARNING: {}", message.as_ref());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iam::types::YamlUser;
    use crate::util::test_fixtures::TestFixtureRoot;
    use std::collections::HashMap;
    use std::fs;

    #[test]
    fn bootstrap_creates_defaults_when_missing() {
        let fixture = TestFixtureRoot::new_unique("bootstrap-default").unwrap();
        let result = bootstrap_runtime(fixture.path()).expect("bootstrap should succeed");

        assert!(result.created_config);
        assert!(result.created_users);
        assert_eq!(result.validated_config.server.host, "127.0.0.1");
        assert_eq!(result.validated_config.server.port, 8000);
        assert!(!result.validated_config.users.jwt.secret.is_empty());

        let users_path = fixture.path().join("users.yaml");
        let users_content = fs::read_to_string(users_path).unwrap();
        let users: HashMap<String, YamlUser> = serde_yaml::from_str(&users_content).unwrap();
        let admin = users.get("admin@example.com").expect("admin user missing");
        assert_eq!(admin.name, "Administrator");
        assert!(admin.is_superuser);
        assert!(admin.is_staff);
        assert_eq!(admin.password_version, Some(1));

        assert!(result.runtime_paths.state_dir.is_dir());
        assert!(
            result
                .runtime_paths
                .recipes_file
                .ends_with("state/recipes.yaml")
        );
    }

    #[test]
    fn bootstrap_is_idempotent() {
        let fixture = TestFixtureRoot::new_unique("bootstrap-idempotent").unwrap();
        let first = bootstrap_runtime(fixture.path()).expect("bootstrap should succeed");
        assert!(first.created_config);
        assert!(first.created_users);

        let config_path = fixture.path().join("config.yaml");
        let users_path = fixture.path().join("users.yaml");
        let config_before = fs::read_to_string(&config_path).unwrap();
        let users_before = fs::read_to_string(&users_path).unwrap();

        let second = bootstrap_runtime(fixture.path()).expect("bootstrap should succeed");
        assert!(!second.created_config);
        assert!(!second.created_users);

        assert_eq!(config_before, fs::read_to_string(&config_path).unwrap());
        assert_eq!(users_before, fs::read_to_string(&users_path).unwrap());
    }

    #[test]
    fn bootstrap_keeps_existing_config() {
        let fixture = TestFixtureRoot::new_unique("bootstrap-existing").unwrap();
        let config = "server:\n  host: \"0.0.0.0\"\n  port: 9000\napp:\n  name: \"Kitchen\"\nusers:\n  jwt:\n    secret: \"existing-secret\"\n  password:\n    memory_kib: 1024\n    iterations: 1\n";
        fs::write(fixture.path().join("config.yaml"), config).unwrap();

        let result = bootstrap_runtime(fixture.path()).expect("bootstrap should succeed");
        assert!(!result.created_config);
        assert!(result.created_users);
        assert_eq!(result.validated_config.server.port, 9000);
        assert_eq!(result.validated_config.users.jwt.secret, "existing-secret");
    }

    #[test]
    fn bootstrap_runs_in_a_populated_directory() {
        let fixture = TestFixtureRoot::new_unique("bootstrap-populated").unwrap();
        fs::write(fixture.path().join("README.md"), "# kitchen").unwrap();
        fs::create_dir(fixture.path().join(".git")).unwrap();

        let result = bootstrap_runtime(fixture.path()).expect("bootstrap should succeed");
        assert!(result.created_config);
        assert!(fixture.path().join("README.md").is_file());
    }

    #[test]
    fn bootstrap_rejects_invalid_config() {
        let fixture = TestFixtureRoot::new_unique("bootstrap-invalid").unwrap();
        fs::write(fixture.path().join("config.yaml"), "server: [").unwrap();

        let err = bootstrap_runtime(fixture.path()).expect_err("invalid config");
        assert!(matches!(err, BootstrapError::Config(_)));
        assert!(!fixture.path().join("users.yaml").exists());
    }
}
