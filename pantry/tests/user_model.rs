// This file is part of the product Pantry.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

mod common;

use pantry::iam::{FileUserStore, UserServiceError, UserStore};

#[actix_web::test]
async fn create_user_with_email_successful() {
    let harness = common::TestHarness::new().await;
    let email = "test@cyrx.org";
    let password = "password";
    let user = harness.create_user(email, password).await;

    assert_eq!(user.email, email);
    assert!(user.check_password(password));
    assert!(!user.is_staff);
    assert!(!user.is_superuser);
    assert!(user.is_active);
}

#[actix_web::test]
async fn new_user_email_normalized() {
    let harness = common::TestHarness::new().await;
    let email = "test@CYRX.org";
    let user = harness.create_user(email, "notUsedPassword").await;

    assert_eq!(user.email, email.to_lowercase());
}

#[actix_web::test]
async fn new_user_invalid_email() {
    let harness = common::TestHarness::new().await;
    let result = harness
        .user_services
        .create_user(None, "notUsedPassword")
        .await;

    assert!(matches!(result, Err(UserServiceError::MissingEmail)));
    assert!(harness.user_services.list_users().expect("users").is_empty());
    assert!(!harness.runtime_paths.users_file.exists());
}

#[actix_web::test]
async fn create_new_superuser() {
    let harness = common::TestHarness::new().await;
    let user = harness
        .user_services
        .create_superuser("test@cyrx.org", "NotUsedPassword")
        .await
        .expect("create superuser");

    assert!(user.is_superuser);
    assert!(user.is_staff);
}

#[actix_web::test]
async fn created_users_are_persisted() {
    let harness = common::TestHarness::new().await;
    let first = harness.create_user("first@cyrx.org", "password").await;
    let second = harness.create_user("second@cyrx.org", "password").await;
    assert!(second.id > first.id);

    let store = FileUserStore::new(harness.runtime_paths.users_file.clone()).expect("store");
    let users = store.load().expect("load users");
    let stored = users.get("second@cyrx.org").expect("stored user");
    assert_eq!(stored.id, second.id);
    assert!(stored.check_password("password"));
    assert!(
        stored
            .password_hash
            .as_deref()
            .is_some_and(|hash| hash.starts_with("$argon2id$"))
    );
}
