// This file is part of the product Pantry.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use actix_web::http::StatusCode;
use actix_web::http::header::WWW_AUTHENTICATE;
use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest, HttpResponse, ResponseError};
use serde_json::json;
use std::collections::BTreeMap;
use std::fmt;
use std::future::{Ready, ready};

use crate::iam::{AuthRequest, User, UserServiceError};
use crate::recipes::RecipeError;
use crate::util::blocking::BlockingError;

pub const NON_FIELD_ERRORS: &str = "non_field_errors";
pub const FIELD_REQUIRED: &str = "This field is required.";

/// Errors returned by API handlers, rendered as JSON bodies.
#[derive(Debug)]
pub enum ApiError {
    Validation(BTreeMap<String, Vec<String>>),
    Unauthorized,
    NotFound,
    Internal(String),
}

impl ApiError {
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = BTreeMap::new();
        errors.insert(field.to_string(), vec![message.into()]);
        ApiError::Validation(errors)
    }

    pub fn non_field(message: impl Into<String>) -> Self {
        Self::field(NON_FIELD_ERRORS, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Validation(errors) => write!(f, "Validation failed: {:?}", errors),
            ApiError::Unauthorized => write!(f, "Authentication credentials were not provided."),
            ApiError::NotFound => write!(f, "Not found."),
            ApiError::Internal(message) => write!(f, "Internal error: {}", message),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status_code());
        match self {
            ApiError::Validation(errors) => builder.json(errors),
            ApiError::Unauthorized => builder
                .insert_header((WWW_AUTHENTICATE, "Bearer"))
                .json(json!({ "detail": "Authentication credentials were not provided." })),
            ApiError::NotFound => builder.json(json!({ "detail": "Not found." })),
            ApiError::Internal(message) => {
                log::error!("Request failed: {}", message);
                builder.json(json!({ "detail": "Internal server error" }))
            }
        }
    }
}

impl From<RecipeError> for ApiError {
    fn from(err: RecipeError) -> Self {
        match err {
            RecipeError::Validation { field, message } => ApiError::field(&field, message),
            RecipeError::NotFound => ApiError::NotFound,
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<BlockingError> for ApiError {
    fn from(err: BlockingError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<UserServiceError> for ApiError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::MissingEmail => ApiError::field("email", FIELD_REQUIRED),
            UserServiceError::Validation { field, message } => ApiError::field(&field, message),
            UserServiceError::DuplicateEmail(_) => {
                ApiError::field("email", "user with this email already exists.")
            }
            UserServiceError::NotFound(_) => ApiError::NotFound,
            other => ApiError::Internal(other.to_string()),
        }
    }
}

/// The caller placed in the request by the JWT middleware.
///
/// Protected handlers take this as their first argument so anonymous
/// requests are refused before the body or path is parsed.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl FromRequest for AuthenticatedUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(req.user_info().map(AuthenticatedUser).ok_or(ApiError::Unauthorized))
    }
}

/// Maps malformed JSON bodies to a 400 with `non_field_errors`.
pub fn json_error_handler(
    err: actix_web::error::JsonPayloadError,
    _req: &HttpRequest,
) -> actix_web::Error {
    log::debug!("Rejected JSON body: {}", err);
    ApiError::non_field(format!("Invalid data. {}", err)).into()
}

/// Maps malformed query strings to a 400 with `non_field_errors`.
pub fn query_error_handler(
    err: actix_web::error::QueryPayloadError,
    _req: &HttpRequest,
) -> actix_web::Error {
    ApiError::non_field(format!("Invalid query. {}", err)).into()
}

/// Unparseable ids in the path are reported as missing objects.
pub fn path_error_handler(
    err: actix_web::error::PathError,
    _req: &HttpRequest,
) -> actix_web::Error {
    log::debug!("Rejected path: {}", err);
    ApiError::NotFound.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use actix_web::http::header::HeaderMap;

    async fn render(err: ApiError) -> (StatusCode, HeaderMap, serde_json::Value) {
        let response = err.error_response();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body()).await.expect("body");
        (
            status,
            headers,
            serde_json::from_slice(&bytes).expect("json body"),
        )
    }

    #[actix_web::test]
    async fn validation_errors_are_keyed_by_field() {
        let (status, _, body) = render(ApiError::field("name", "Name may not be blank")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "name": ["Name may not be blank"] }));
    }

    #[actix_web::test]
    async fn unauthorized_sets_challenge_header() {
        let (status, headers, body) = render(ApiError::Unauthorized).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            body["detail"],
            "Authentication credentials were not provided."
        );
        assert_eq!(
            headers
                .get(WWW_AUTHENTICATE)
                .and_then(|v| v.to_str().ok()),
            Some("Bearer")
        );
    }

    #[actix_web::test]
    async fn internal_errors_hide_details() {
        let (status, _, body) = render(ApiError::Internal("disk full".to_string())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "detail": "Internal server error" }));
    }

    #[actix_web::test]
    async fn anonymous_request_is_refused_by_extractor() {
        let req = actix_web::test::TestRequest::default().to_http_request();
        let result = AuthenticatedUser::extract(&req).await;
        assert!(matches!(result, Err(ApiError::Unauthorized)));
    }

    #[actix_web::test]
    async fn extractor_returns_user_from_extensions() {
        use actix_web::HttpMessage;

        let req = actix_web::test::TestRequest::default().to_http_request();
        req.extensions_mut().insert(User {
            id: 7,
            email: "cook@example.com".to_string(),
            name: "Cook".to_string(),
            password_hash: None,
            is_active: true,
            is_staff: false,
            is_superuser: false,
            password_version: 1,
        });
        let AuthenticatedUser(user) = AuthenticatedUser::extract(&req).await.expect("user");
        assert_eq!(user.id, 7);
        assert_eq!(user.email, "cook@example.com");
    }

    #[test]
    fn recipe_errors_map_to_api_errors() {
        assert!(matches!(
            ApiError::from(RecipeError::NotFound),
            ApiError::NotFound
        ));
        assert!(matches!(
            ApiError::from(RecipeError::LockPoisoned),
            ApiError::Internal(_)
        ));
        assert!(matches!(
            ApiError::from(RecipeError::validation("tags", "bad")),
            ApiError::Validation(_)
        ));
    }
}
