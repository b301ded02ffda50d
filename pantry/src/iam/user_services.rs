// This file is part of the product Pantry.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::IamService;
use super::jwt::JwtService;
use super::password::{PasswordError, hash_password, verify_password};
use super::store::{FileUserStore, UserStore};
use super::types::{IamError, NewUser, User};
use crate::config::{Argon2Params, ValidatedConfig};
use crate::security::{normalize_email, validate_and_sanitize_user_name, validate_email_field};
use crate::util::blocking::{BlockingError, run_blocking};
use std::fmt;
use std::sync::Arc;

/// User manager: creation rules, credential checks and token handling on top of the IAM store
pub struct UserServices {
    iam_service: IamService,
    jwt_service: JwtService,
    password_params: Argon2Params,
    dummy_stored_hash: String,
}

pub type UserServiceResult<T> = Result<T, UserServiceError>;

#[derive(Debug)]
pub enum UserServiceError {
    MissingEmail,
    Validation { field: String, message: String },
    DuplicateEmail(String),
    NotFound(String),
    Iam(String),
    Jwt(String),
    Password(PasswordError),
    Blocking(BlockingError),
}

impl UserServiceError {
    fn validation(field: &str, message: impl Into<String>) -> Self {
        UserServiceError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for UserServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserServiceError::MissingEmail => write!(f, "Users must have an email address"),
            UserServiceError::Validation { field, message } => write!(f, "{}: {}", field, message),
            UserServiceError::DuplicateEmail(email) => {
                write!(f, "A user with email {} already exists", email)
            }
            UserServiceError::NotFound(email) => write!(f, "User not found: {}", email),
            UserServiceError::Iam(message) => write!(f, "{}", message),
            UserServiceError::Jwt(message) => write!(f, "{}", message),
            UserServiceError::Password(err) => write!(f, "{}", err),
            UserServiceError::Blocking(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for UserServiceError {}

impl From<PasswordError> for UserServiceError {
    fn from(err: PasswordError) -> Self {
        UserServiceError::Password(err)
    }
}

impl From<BlockingError> for UserServiceError {
    fn from(err: BlockingError) -> Self {
        UserServiceError::Blocking(err)
    }
}

impl From<IamError> for UserServiceError {
    fn from(err: IamError) -> Self {
        match err {
            IamError::DuplicateEmail(email) => UserServiceError::DuplicateEmail(email),
            IamError::UserNotFound(email) => UserServiceError::NotFound(email),
            other => UserServiceError::Iam(other.to_string()),
        }
    }
}

impl UserServices {
    pub fn new(
        config: &ValidatedConfig,
        users_file: std::path::PathBuf,
    ) -> UserServiceResult<Self> {
        let store = Arc::new(FileUserStore::new(users_file)?);
        Self::new_with_store(config, store)
    }

    pub fn new_with_store(
        config: &ValidatedConfig,
        store: Arc<dyn UserStore>,
    ) -> UserServiceResult<Self> {
        let iam_service = IamService::new(store)?;
        let jwt_service = JwtService::new(&config.users.jwt);
        let password_params = config.users.password.clone();
        let dummy_stored_hash = hash_password("dummy-password", &password_params)?;

        Ok(UserServices {
            iam_service,
            jwt_service,
            password_params,
            dummy_stored_hash,
        })
    }

    /// Creates a regular user. The email is normalized; a missing or blank email is rejected.
    pub async fn create_user(&self, email: Option<&str>, password: &str) -> UserServiceResult<User> {
        self.insert_user(email, password, None, false).await
    }

    pub async fn create_user_with_name(
        &self,
        email: Option<&str>,
        password: &str,
        name: &str,
    ) -> UserServiceResult<User> {
        self.insert_user(email, password, Some(name), false).await
    }

    /// Creates a user with the staff and superuser flags set.
    pub async fn create_superuser(&self, email: &str, password: &str) -> UserServiceResult<User> {
        self.insert_user(Some(email), password, None, true).await
    }

    async fn insert_user(
        &self,
        email: Option<&str>,
        password: &str,
        name: Option<&str>,
        superuser: bool,
    ) -> UserServiceResult<User> {
        let email = match email {
            Some(email) if !email.trim().is_empty() => email,
            _ => return Err(UserServiceError::MissingEmail),
        };
        validate_email_field(email).map_err(|msg| UserServiceError::validation("email", msg))?;
        let email = normalize_email(email);

        let name = match name {
            Some(name) => validate_and_sanitize_user_name(name)
                .map_err(|msg| UserServiceError::validation("name", msg))?,
            None => String::new(),
        };

        let password_hash = self.hash(password).await?;
        let user = self
            .iam_service
            .add_user(NewUser {
                email,
                name,
                password_hash,
                is_staff: superuser,
                is_superuser: superuser,
            })
            .await?;
        Ok(user)
    }

    pub fn get_user(&self, email: &str) -> UserServiceResult<Option<User>> {
        Ok(self.iam_service.get_user(&normalize_email(email))?)
    }

    pub fn list_users(&self) -> UserServiceResult<Vec<User>> {
        Ok(self.iam_service.list_users()?)
    }

    /// Returns the active user matching the credentials.
    /// Unknown emails still pay for one hash verification.
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> UserServiceResult<Option<User>> {
        let user = self.iam_service.get_user(&normalize_email(email))?;
        let stored_hash = user
            .as_ref()
            .and_then(|user| user.password_hash.clone())
            .unwrap_or_else(|| self.dummy_stored_hash.clone());

        let password = password.to_string();
        let valid = run_blocking("verify password", move || {
            verify_password(&password, &stored_hash)
        })
        .await??;
        match user {
            Some(user) if valid && user.password_hash.is_some() => {
                if user.is_active {
                    Ok(Some(user))
                } else {
                    log::warn!("Login attempt for inactive user {}", user.email);
                    Ok(None)
                }
            }
            _ => Ok(None),
        }
    }

    pub fn issue_token(&self, user: &User) -> UserServiceResult<String> {
        self.jwt_service
            .create_token(user)
            .map_err(|err| UserServiceError::Jwt(err.to_string()))
    }

    /// Resolves a bearer token to its active user.
    /// Tokens issued before a password change are rejected.
    pub fn validate_token(&self, token: &str) -> Option<User> {
        let claims = self.jwt_service.verify_token(token).ok()?;
        let user = match self.iam_service.get_user(&claims.sub) {
            Ok(user) => user?,
            Err(err) => {
                log::error!("User lookup failed during token validation: {}", err);
                return None;
            }
        };
        if user.id != claims.uid {
            log::warn!("JWT user id mismatch for {}", claims.sub);
            return None;
        }
        if user.password_version != claims.password_version {
            log::warn!("JWT password version mismatch for user {}", claims.sub);
            return None;
        }
        if !user.is_active {
            return None;
        }
        Some(user)
    }

    /// Updates the caller's name and/or password.
    pub async fn update_user(
        &self,
        email: &str,
        name: Option<&str>,
        password: Option<&str>,
    ) -> UserServiceResult<User> {
        let name = match name {
            Some(name) => Some(
                validate_and_sanitize_user_name(name)
                    .map_err(|msg| UserServiceError::validation("name", msg))?,
            ),
            None => None,
        };
        let password_hash = match password {
            Some(password) => Some(self.hash(password).await?),
            None => None,
        };
        let user = self
            .iam_service
            .update_user(&normalize_email(email), name.as_deref(), password_hash)
            .await?;
        Ok(user)
    }

    /// Hashes `password` on the blocking pool.
    async fn hash(&self, password: &str) -> UserServiceResult<String> {
        let password = password.to_string();
        let params = self.password_params.clone();
        let hash =
            run_blocking("hash password", move || hash_password(&password, &params)).await??;
        Ok(hash)
    }
}
