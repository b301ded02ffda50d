// This file is part of the product Pantry.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::{BootstrapError, log_action, log_warning};
use crate::config::ValidatedConfig;
use crate::iam::types::{DEFAULT_PASSWORD_VERSION, User, UsersData};
use crate::iam::{FileUserStore, UserStore, hash_password};
use crate::runtime_paths::USERS_FILE_NAME;
use argon2::password_hash::rand_core::{OsRng, RngCore};
use std::path::Path;

const ADMIN_EMAIL: &str = "admin@example.com";
const ADMIN_NAME: &str = "Administrator";
const ADMIN_PASSWORD_LENGTH: usize = 16;
const PASSWORD_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Seeds `users.yaml` with a superuser. Returns false if the file already exists.
pub fn ensure_users(root: &Path, config: &ValidatedConfig) -> Result<bool, BootstrapError> {
    let users_path = root.join(USERS_FILE_NAME);
    if users_path.exists() {
        return Ok(false);
    }

    let password = generate_password();
    let password_hash = hash_password(&password, &config.users.password)
        .map_err(|err| BootstrapError::Users(err.to_string()))?;

    let admin = User {
        id: 1,
        email: ADMIN_EMAIL.to_string(),
        name: ADMIN_NAME.to_string(),
        password_hash: Some(password_hash),
        is_active: true,
        is_staff: true,
        is_superuser: true,
        password_version: DEFAULT_PASSWORD_VERSION,
    };
    let mut users = UsersData::new();
    users.insert(admin.email.clone(), admin);

    let store = FileUserStore::new(users_path)
        .map_err(|err| BootstrapError::Users(err.to_string()))?;
    store
        .save(&users)
        .map_err(|err| BootstrapError::Users(err.to_string()))?;

    log_action(format!("created {} with {}", USERS_FILE_NAME, ADMIN_EMAIL));
    log_warning(format!(
        "{} password: {} (change this immediately)",
        ADMIN_EMAIL, password
    ));

    Ok(true)
}

fn generate_password() -> String {
    let mut bytes = [0u8; ADMIN_PASSWORD_LENGTH];
    OsRng.fill_bytes(&mut bytes);

    let mut password = String::with_capacity(ADMIN_PASSWORD_LENGTH);
    for byte in bytes {
        let idx = (byte as usize) % PASSWORD_CHARS.len();
        password.push(PASSWORD_CHARS[idx] as char);
    }
    password
}
