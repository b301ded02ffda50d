// This file is part of the product Pantry.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::types::{DEFAULT_PASSWORD_VERSION, IamError, UsersData, YamlUser, YamlUsersData};
use crate::util::yaml_store::{read_yaml_file, write_yaml_file};
use std::path::PathBuf;

#[cfg(test)]
use super::types::User;
#[cfg(test)]
use std::sync::{Arc, RwLock};

const USERS_LABEL: &str = "users";

pub trait UserStore: Send + Sync {
    fn load(&self) -> Result<UsersData, IamError>;
    fn save(&self, users: &UsersData) -> Result<(), IamError>;
}

pub struct FileUserStore {
    users_file: PathBuf,
}

impl FileUserStore {
    pub fn new(users_file: PathBuf) -> Result<Self, IamError> {
        if users_file.as_os_str().is_empty() {
            return Err(IamError::ConfigurationError(
                "Users file path is empty".to_string(),
            ));
        }

        Ok(Self { users_file })
    }

    fn into_users(yaml_users: YamlUsersData) -> Result<(UsersData, usize), IamError> {
        let mut missing_password_versions = 0;
        let mut users_data = UsersData::new();
        for (email, yaml_user) in yaml_users {
            if yaml_user.id == 0 {
                return Err(IamError::ParseError(format!(
                    "User {} has invalid id 0",
                    email
                )));
            }
            if users_data.values().any(|user| user.id == yaml_user.id) {
                return Err(IamError::ParseError(format!(
                    "Duplicate user id {} in users file",
                    yaml_user.id
                )));
            }
            if yaml_user.password_version.is_none() {
                missing_password_versions += 1;
            }
            users_data.insert(email.clone(), yaml_user.into_user(email));
        }

        Ok((users_data, missing_password_versions))
    }
}

impl UserStore for FileUserStore {
    fn load(&self) -> Result<UsersData, IamError> {
        let yaml_users: YamlUsersData = read_yaml_file(&self.users_file, USERS_LABEL)
            .map_err(|e| IamError::ParseError(e.to_string()))?
            .unwrap_or_default();
        let (users_data, missing_password_versions) = Self::into_users(yaml_users)?;

        if missing_password_versions > 0 {
            log::warn!(
                "users.yaml missing password_version for {} user(s); defaulting to {} and persisting",
                missing_password_versions,
                DEFAULT_PASSWORD_VERSION
            );
            self.save(&users_data)?;
        }

        Ok(users_data)
    }

    fn save(&self, users: &UsersData) -> Result<(), IamError> {
        let yaml_users: YamlUsersData = users
            .iter()
            .map(|(email, user)| (email.clone(), YamlUser::from_user(user)))
            .collect();
        write_yaml_file(&self.users_file, USERS_LABEL, &yaml_users)
            .map_err(|e| IamError::FileError(e.to_string()))
    }
}

#[cfg(test)]
pub struct MemoryUserStore {
    users: Arc<RwLock<UsersData>>,
}

#[cfg(test)]
impl MemoryUserStore {
    pub fn new(initial: UsersData) -> Self {
        Self {
            users: Arc::new(RwLock::new(initial)),
        }
    }

    pub fn from_users(users: Vec<User>) -> Self {
        let data = users
            .into_iter()
            .map(|user| (user.email.clone(), user))
            .collect();
        Self::new(data)
    }
}

#[cfg(test)]
impl UserStore for MemoryUserStore {
    fn load(&self) -> Result<UsersData, IamError> {
        match self.users.read() {
            Ok(guard) => Ok(guard.clone()),
            Err(poisoned) => {
                log::error!("MemoryUserStore lock poisoned on read; recovering");
                Ok(poisoned.into_inner().clone())
            }
        }
    }

    fn save(&self, users: &UsersData) -> Result<(), IamError> {
        match self.users.write() {
            Ok(mut guard) => {
                *guard = users.clone();
                Ok(())
            }
            Err(poisoned) => {
                log::error!("MemoryUserStore lock poisoned on write; recovering");
                let mut guard = poisoned.into_inner();
                *guard = users.clone();
                Ok(())
            }
        }
    }
}
