// This file is part of the product Pantry.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = "config.yaml";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug)]
pub enum ConfigError {
    LoadError(String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::LoadError(msg) => write!(f, "Configuration load error: {}", msg),
            ConfigError::ValidationError(msg) => {
                write!(f, "Configuration validation error: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub app: AppConfig,
    pub users: UsersConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub server: ServerConfig,
    pub app: AppConfig,
    pub users: ValidatedUsersConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_workers() -> usize {
    4
}

impl ServerConfig {
    pub fn address_tuple(&self) -> (&str, u16) {
        (self.host.as_str(), self.port)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize, Serialize)]
pub struct UsersConfig {
    pub jwt: JwtConfig,
    #[serde(default)]
    pub password: Argon2ParamsConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Argon2ParamsConfig {
    #[serde(default)]
    pub memory_kib: Option<u32>,
    #[serde(default)]
    pub iterations: Option<u32>,
    #[serde(default)]
    pub parallelism: Option<u32>,
    #[serde(default)]
    pub output_len: Option<u32>,
    #[serde(default)]
    pub salt_len: Option<u32>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct JwtConfig {
    pub secret: String,
    #[serde(default = "default_jwt_issuer")]
    pub issuer: String,
    #[serde(default = "default_jwt_audience")]
    pub audience: String,
    #[serde(default = "default_jwt_expiration_hours")]
    pub expiration_hours: u64,
}

pub fn default_jwt_issuer() -> String {
    "pantry".to_string()
}

pub fn default_jwt_audience() -> String {
    "pantry-users".to_string()
}

pub fn default_jwt_expiration_hours() -> u64 {
    12
}

#[derive(Debug, Clone)]
pub struct ValidatedUsersConfig {
    pub jwt: JwtConfig,
    pub password: Argon2Params,
}

/// Argon2id cost parameters, OWASP minimums by default.
pub const DEFAULT_ARGON2_PARAMS: Argon2Params = Argon2Params {
    memory_kib: 19456,
    iterations: 2,
    parallelism: 1,
    output_len: 32,
    salt_len: 16,
};

#[derive(Debug, Clone)]
pub struct Argon2Params {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
    pub output_len: u32,
    pub salt_len: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        DEFAULT_ARGON2_PARAMS
    }
}

impl Argon2Params {
    fn resolve(config: &Argon2ParamsConfig, defaults: Argon2Params) -> Result<Self, ConfigError> {
        let resolved = Argon2Params {
            memory_kib: config.memory_kib.unwrap_or(defaults.memory_kib),
            iterations: config.iterations.unwrap_or(defaults.iterations),
            parallelism: config.parallelism.unwrap_or(defaults.parallelism),
            output_len: config.output_len.unwrap_or(defaults.output_len),
            salt_len: config.salt_len.unwrap_or(defaults.salt_len),
        };

        if resolved.memory_kib == 0
            || resolved.iterations == 0
            || resolved.parallelism == 0
            || resolved.output_len == 0
            || resolved.salt_len == 0
        {
            return Err(ConfigError::ValidationError(
                "Argon2id password params must be non-zero".to_string(),
            ));
        }

        if resolved.salt_len < 8 {
            return Err(ConfigError::ValidationError(format!(
                "Argon2id salt_len must be at least 8 bytes, got {}",
                resolved.salt_len
            )));
        }

        let output_len = usize::try_from(resolved.output_len).map_err(|_| {
            ConfigError::ValidationError(format!(
                "Argon2id output_len is too large: {}",
                resolved.output_len
            ))
        })?;

        if let Err(err) = argon2::Params::new(
            resolved.memory_kib,
            resolved.iterations,
            resolved.parallelism,
            Some(output_len),
        ) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid Argon2id password params: {}",
                err
            )));
        }

        Ok(resolved)
    }
}

impl Config {
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let config_path = root.join(CONFIG_FILE_NAME);
        let config_content = fs::read_to_string(&config_path).map_err(|e| {
            ConfigError::LoadError(format!(
                "Failed to read config file '{}': {}",
                config_path.display(),
                e
            ))
        })?;
        Self::parse(&config_content).map_err(|e| match e {
            ConfigError::LoadError(msg) => ConfigError::LoadError(format!(
                "Failed to parse config file '{}': {}",
                config_path.display(),
                msg
            )),
            other => other,
        })
    }

    fn parse(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::LoadError(e.to_string()))
    }

    /// Loads and validates configuration at startup. If validation fails, the server must not start.
    pub fn load_and_validate(root: &Path) -> Result<ValidatedConfig, ConfigError> {
        Self::load(root)?.validate()
    }

    pub fn validate(self) -> Result<ValidatedConfig, ConfigError> {
        let jwt = &self.users.jwt;
        if jwt.secret.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "users.jwt.secret must not be empty".to_string(),
            ));
        }
        if jwt.expiration_hours < 1 {
            return Err(ConfigError::ValidationError(format!(
                "users.jwt.expiration_hours must be at least 1, got: {}",
                jwt.expiration_hours
            )));
        }

        let password = Argon2Params::resolve(&self.users.password, DEFAULT_ARGON2_PARAMS)?;

        if self.server.workers == 0 {
            return Err(ConfigError::ValidationError(
                "server.workers must be at least 1".to_string(),
            ));
        }

        Self::validate_logging(&self.logging)?;

        Ok(ValidatedConfig {
            server: self.server,
            app: self.app,
            users: ValidatedUsersConfig {
                jwt: self.users.jwt,
                password,
            },
            logging: self.logging,
        })
    }

    fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
        let level = logging.level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "logging.level must be one of {}, got: {}",
                LOG_LEVELS.join(", "),
                logging.level
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
pub fn test_config() -> ValidatedConfig {
    ValidatedConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8000,
            workers: 1,
        },
        app: AppConfig {
            name: "Pantry".to_string(),
            description: String::new(),
        },
        users: ValidatedUsersConfig {
            jwt: JwtConfig {
                secret: "test-secret".to_string(),
                issuer: default_jwt_issuer(),
                audience: default_jwt_audience(),
                expiration_hours: default_jwt_expiration_hours(),
            },
            password: Argon2Params {
                memory_kib: 1024,
                iterations: 1,
                parallelism: 1,
                output_len: 32,
                salt_len: 16,
            },
        },
        logging: LoggingConfig::default(),
    }
}
