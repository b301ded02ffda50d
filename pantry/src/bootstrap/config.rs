// This file is part of the product Pantry.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::{BootstrapError, log_action};
use crate::config::CONFIG_FILE_NAME;
use crate::iam::generate_secret_hex;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_WORKERS: u16 = 4;
const JWT_SECRET_BYTES: usize = 32;

/// Writes a default `config.yaml` with a fresh JWT secret. Returns false if one already exists.
pub fn ensure_config(root: &Path) -> Result<bool, BootstrapError> {
    let config_path = root.join(CONFIG_FILE_NAME);

    if config_path.exists() {
        return Ok(false);
    }

    let jwt_secret = generate_secret_hex(JWT_SECRET_BYTES);
    let contents = default_config_yaml(&jwt_secret);

    let mut file = match OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&config_path)
    {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
        Err(err) => return Err(BootstrapError::Io(err)),
    };

    file.write_all(contents.as_bytes())?;
    file.sync_all()?;

    log_action(format!(
        "created {} listening on {}:{}",
        CONFIG_FILE_NAME, DEFAULT_HOST, DEFAULT_PORT
    ));

    Ok(true)
}

fn default_config_yaml(jwt_secret: &str) -> String {
    format!(
        "server:\n  host: \"{host}\"\n  port: {port}\n  workers: {workers}\n\napp:\n  name: \"Pantry\"\n  description: \"Recipe API server\"\n\nusers:\n  jwt:\n    secret: \"{jwt_secret}\"\n    expiration_hours: 12\n\nlogging:\n  level: \"info\"\n",
        host = DEFAULT_HOST,
        port = DEFAULT_PORT,
        workers = DEFAULT_WORKERS,
        jwt_secret = jwt_secret,
    )
}
