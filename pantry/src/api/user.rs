// This file is part of the product Pantry.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::error::{ApiError, AuthenticatedUser, FIELD_REQUIRED};
use crate::iam::{User, UserServices};
use crate::security::{validate_and_sanitize_user_name, validate_email_field, validate_password_field};

const AUTH_FAILED: &str = "Unable to authenticate with provided credentials";

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMeRequest {
    pub name: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize)]
struct UserResponse {
    email: String,
    name: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        UserResponse {
            email: user.email.clone(),
            name: user.name.clone(),
        }
    }
}

#[derive(Serialize)]
struct TokenResponse {
    token: String,
}

/// Collects per-field messages so one response reports every bad field.
#[derive(Default)]
struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    fn check(&mut self, field: &str, result: Result<(), String>) {
        if let Err(message) = result {
            self.0.entry(field.to_string()).or_default().push(message);
        }
    }

    fn into_result(self) -> Result<(), ApiError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self.0))
        }
    }
}

fn required(value: Option<&str>) -> Result<&str, String> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(FIELD_REQUIRED.to_string()),
    }
}

pub async fn create_user(
    user_services: web::Data<UserServices>,
    body: web::Json<CreateUserRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    let mut errors = FieldErrors::default();
    errors.check(
        "email",
        required(body.email.as_deref()).and_then(validate_email_field),
    );
    errors.check(
        "password",
        required(body.password.as_deref()).and_then(validate_password_field),
    );
    errors.check(
        "name",
        required(body.name.as_deref())
            .and_then(validate_and_sanitize_user_name)
            .map(|_| ()),
    );
    errors.into_result()?;

    let user = user_services
        .create_user_with_name(
            body.email.as_deref(),
            body.password.as_deref().unwrap_or_default(),
            body.name.as_deref().unwrap_or_default(),
        )
        .await?;
    log::info!("Created user {}", user.email);
    Ok(HttpResponse::Created().json(UserResponse::from(&user)))
}

pub async fn create_token(
    user_services: web::Data<UserServices>,
    body: web::Json<TokenRequest>,
) -> Result<HttpResponse, ApiError> {
    let (Some(email), Some(password)) = (body.email.as_deref(), body.password.as_deref()) else {
        return Err(ApiError::non_field(AUTH_FAILED));
    };
    if email.trim().is_empty() || password.is_empty() {
        return Err(ApiError::non_field(AUTH_FAILED));
    }

    let Some(user) = user_services.authenticate(email, password).await? else {
        log::info!("Failed token request for {}", email.trim());
        return Err(ApiError::non_field(AUTH_FAILED));
    };
    let token = user_services.issue_token(&user)?;
    Ok(HttpResponse::Ok().json(TokenResponse { token }))
}

pub async fn get_me(
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(UserResponse::from(&user)))
}

pub async fn update_me(
    AuthenticatedUser(user): AuthenticatedUser,
    user_services: web::Data<UserServices>,
    body: web::Json<UpdateMeRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    let mut errors = FieldErrors::default();
    if let Some(name) = body.name.as_deref() {
        errors.check("name", validate_and_sanitize_user_name(name).map(|_| ()));
    }
    if let Some(password) = body.password.as_deref() {
        errors.check("password", validate_password_field(password));
    }
    errors.into_result()?;

    let updated = user_services
        .update_user(&user.email, body.name.as_deref(), body.password.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(&updated)))
}
