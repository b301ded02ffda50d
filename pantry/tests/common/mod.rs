// This file is part of the product Pantry.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

#![allow(dead_code)]

use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::http::header::AUTHORIZATION;
use actix_web::{App, web};
use pantry::api;
use pantry::config::{Config, ValidatedConfig};
use pantry::iam::{JwtAuthMiddlewareFactory, User, UserServices};
use pantry::recipes::{FileRecipeStore, RecipeService};
use pantry::runtime_paths::RuntimePaths;
use pantry::util::test_fixtures::TestFixtureRoot;
use serde_json::Value;
use std::sync::Arc;

pub const USER_EMAIL: &str = "test@cyrx.org";
pub const USER_PASSWORD: &str = "password42";

pub struct TestHarness {
    pub fixture: TestFixtureRoot,
    pub config: Arc<ValidatedConfig>,
    pub runtime_paths: RuntimePaths,
    pub user_services: Arc<UserServices>,
    pub recipes: Arc<RecipeService>,
}

#[derive(Clone)]
pub struct AppBundle {
    pub config: Arc<ValidatedConfig>,
    pub user_services: Arc<UserServices>,
    pub recipes: Arc<RecipeService>,
}

impl TestHarness {
    pub async fn new() -> Self {
        let fixture = TestFixtureRoot::new_unique("api-test-suite").expect("fixture root");
        fixture.write_test_config().expect("test config");

        let config = Arc::new(Config::load_and_validate(fixture.path()).expect("config"));
        let runtime_paths = RuntimePaths::from_root(fixture.path()).expect("runtime paths");
        let user_services = Arc::new(
            UserServices::new(&config, runtime_paths.users_file.clone()).expect("user services"),
        );
        let store = FileRecipeStore::new(runtime_paths.recipes_file.clone()).expect("recipe store");
        let recipes = Arc::new(RecipeService::new(Arc::new(store)).expect("recipe service"));

        Self {
            fixture,
            config,
            runtime_paths,
            user_services,
            recipes,
        }
    }

    pub async fn create_user(&self, email: &str, password: &str) -> User {
        self.user_services
            .create_user(Some(email), password)
            .await
            .expect("create user")
    }

    /// The default test user, as the tag tests set it up.
    pub async fn default_user(&self) -> User {
        self.create_user(USER_EMAIL, USER_PASSWORD).await
    }

    pub fn token_for(&self, user: &User) -> String {
        self.user_services.issue_token(user).expect("jwt token")
    }

    pub fn app_bundle(&self) -> AppBundle {
        AppBundle {
            config: self.config.clone(),
            user_services: self.user_services.clone(),
            recipes: self.recipes.clone(),
        }
    }
}

pub fn build_test_app(
    bundle: AppBundle,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::from(bundle.config))
        .app_data(web::Data::from(bundle.user_services))
        .app_data(web::Data::from(bundle.recipes))
        .wrap(JwtAuthMiddlewareFactory)
        .configure(api::configure)
}

pub fn with_token(req: actix_web::test::TestRequest, token: &str) -> actix_web::test::TestRequest {
    req.insert_header((AUTHORIZATION, format!("Bearer {}", token)))
}

pub async fn read_json(resp: ServiceResponse) -> Value {
    let body = actix_web::test::read_body(resp).await;
    serde_json::from_slice(&body).expect("json body")
}
