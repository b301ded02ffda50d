// This file is part of the product Pantry.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::password::verify_password;

pub const DEFAULT_PASSWORD_VERSION: u32 = 1;

pub type UserId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub password_hash: Option<String>,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub password_version: u32,
}

impl User {
    /// True when `password` matches the stored hash. Users without a hash never match.
    pub fn check_password(&self, password: &str) -> bool {
        match self.password_hash.as_deref() {
            Some(stored) => verify_password(password, stored).unwrap_or_else(|err| {
                log::warn!("Stored password hash for {} is unreadable: {}", self.email, err);
                false
            }),
            None => false,
        }
    }
}

fn default_true() -> bool {
    true
}

// Structure matching the users.yaml entry format
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct YamlUser {
    pub id: UserId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_version: Option<u32>,
}

impl YamlUser {
    pub fn into_user(self, email: String) -> User {
        User {
            id: self.id,
            email,
            name: self.name,
            password_hash: self.password,
            is_active: self.is_active,
            is_staff: self.is_staff,
            is_superuser: self.is_superuser,
            password_version: self.password_version.unwrap_or(DEFAULT_PASSWORD_VERSION),
        }
    }

    pub fn from_user(user: &User) -> Self {
        YamlUser {
            id: user.id,
            name: user.name.clone(),
            password: user.password_hash.clone(),
            is_active: user.is_active,
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
            password_version: Some(user.password_version),
        }
    }
}

#[derive(Debug, Clone)]
pub enum IamError {
    UserNotFound(String),
    DuplicateEmail(String),
    ServiceNotInitialized,
    ConfigurationError(String),
    FileError(String),
    ParseError(String),
}

impl std::fmt::Display for IamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IamError::UserNotFound(email) => write!(f, "User not found: {}", email),
            IamError::DuplicateEmail(email) => write!(f, "User {} already exists", email),
            IamError::ServiceNotInitialized => write!(f, "IAM service not initialized"),
            IamError::ConfigurationError(msg) => write!(f, "Configuration error: {}", msg),
            IamError::FileError(msg) => write!(f, "File error: {}", msg),
            IamError::ParseError(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for IamError {}

/// Fields of a user about to be inserted; the id is assigned by the service.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub is_staff: bool,
    pub is_superuser: bool,
}

// Mutation commands for the background task
#[derive(Debug)]
pub enum UserMutation {
    Add(NewUser),
    Update {
        email: String,
        name: Option<String>,
        password_hash: Option<String>,
    },
}

#[derive(Debug)]
pub enum UserMutationResult {
    Added(User),
    Updated(User),
}

// The users.yaml file structure: email -> yaml user data
pub type YamlUsersData = HashMap<String, YamlUser>;
pub type UsersData = HashMap<String, User>;
