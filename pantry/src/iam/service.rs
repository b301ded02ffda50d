// This file is part of the product Pantry.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::store::UserStore;
use super::types::{
    DEFAULT_PASSWORD_VERSION, IamError, NewUser, User, UserId, UserMutation, UserMutationResult,
    UsersData,
};
use std::sync::{Arc, RwLock};
use tokio::sync::{mpsc, oneshot};

// Type aliases for complex channel types
type MutationRequest = (
    UserMutation,
    oneshot::Sender<Result<UserMutationResult, IamError>>,
);
type MutationSender = mpsc::UnboundedSender<MutationRequest>;
type MutationReceiver = mpsc::UnboundedReceiver<MutationRequest>;

/// Holds the user table in memory; every mutation goes through one background task.
#[derive(Clone)]
pub struct IamService {
    users_data: Arc<RwLock<UsersData>>,
    mutation_sender: MutationSender,
    store: Arc<dyn UserStore>,
}

impl IamService {
    /// Loads users from the store and starts the mutation task.
    /// Must be called from within a tokio runtime.
    pub fn new(store: Arc<dyn UserStore>) -> Result<Self, IamError> {
        let users = store.load()?;
        let users_data = Arc::new(RwLock::new(users));

        let (mutation_sender, mut mutation_receiver): (MutationSender, MutationReceiver) =
            mpsc::unbounded_channel();

        let users_data_clone = users_data.clone();
        let store_clone = store.clone();

        tokio::spawn(async move {
            while let Some((mutation, response_sender)) = mutation_receiver.recv().await {
                let result = Self::handle_mutation(mutation, &users_data_clone, &store_clone);
                let _ = response_sender.send(result);
            }
        });

        Ok(IamService {
            users_data,
            mutation_sender,
            store,
        })
    }

    fn reload_users_from_store(
        users_data: &Arc<RwLock<UsersData>>,
        store: &Arc<dyn UserStore>,
    ) -> Result<(), IamError> {
        let users = store.load()?;
        match users_data.write() {
            Ok(mut guard) => {
                *guard = users;
            }
            Err(poisoned) => {
                log::error!("Users lock poisoned during reload; recovering");
                let mut guard = poisoned.into_inner();
                *guard = users;
            }
        }
        users_data.clear_poison();
        Ok(())
    }

    fn with_users_read<T>(
        &self,
        f: impl FnOnce(&UsersData) -> Result<T, IamError>,
    ) -> Result<T, IamError> {
        match self.users_data.read() {
            Ok(guard) => f(&guard),
            Err(_) => {
                log::error!("Users lock poisoned on read; reloading from disk");
                Self::reload_users_from_store(&self.users_data, &self.store)?;
                let guard = self.users_data.read().map_err(|_| {
                    IamError::ConfigurationError(
                        "Users lock poisoned after recovery attempt".to_string(),
                    )
                })?;
                f(&guard)
            }
        }
    }

    fn with_users_write<T>(
        users_data: &Arc<RwLock<UsersData>>,
        store: &Arc<dyn UserStore>,
        f: impl FnOnce(&mut UsersData) -> Result<T, IamError>,
    ) -> Result<T, IamError> {
        let mut guard = match users_data.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::error!("Users lock poisoned on write; reloading from disk");
                let mut guard = poisoned.into_inner();
                *guard = store.load()?;
                users_data.clear_poison();
                guard
            }
        };

        f(&mut guard)
    }

    fn handle_mutation(
        mutation: UserMutation,
        users_data: &Arc<RwLock<UsersData>>,
        store: &Arc<dyn UserStore>,
    ) -> Result<UserMutationResult, IamError> {
        match mutation {
            UserMutation::Add(new_user) => Self::with_users_write(users_data, store, |users| {
                if users.contains_key(&new_user.email) {
                    return Err(IamError::DuplicateEmail(new_user.email));
                }

                let id: UserId = users
                    .values()
                    .map(|user| user.id)
                    .max()
                    .unwrap_or(0)
                    .checked_add(1)
                    .ok_or_else(|| IamError::FileError("User id space exhausted".to_string()))?;
                let user = User {
                    id,
                    email: new_user.email,
                    name: new_user.name,
                    password_hash: Some(new_user.password_hash),
                    is_active: true,
                    is_staff: new_user.is_staff,
                    is_superuser: new_user.is_superuser,
                    password_version: DEFAULT_PASSWORD_VERSION,
                };

                let mut updated = users.clone();
                updated.insert(user.email.clone(), user.clone());

                store.save(&updated)?;
                *users = updated;
                log::info!("Created user {} (id {})", user.email, user.id);
                Ok(UserMutationResult::Added(user))
            }),
            UserMutation::Update {
                email,
                name,
                password_hash,
            } => Self::with_users_write(users_data, store, |users| {
                let mut updated = users.clone();
                let user = updated
                    .get_mut(&email)
                    .ok_or_else(|| IamError::UserNotFound(email.clone()))?;
                if let Some(name) = name {
                    user.name = name;
                }
                if let Some(password_hash) = password_hash {
                    user.password_hash = Some(password_hash);
                    user.password_version = user.password_version.saturating_add(1);
                }
                let user = user.clone();

                store.save(&updated)?;
                *users = updated;
                Ok(UserMutationResult::Updated(user))
            }),
        }
    }

    async fn submit(&self, mutation: UserMutation) -> Result<UserMutationResult, IamError> {
        let (response_sender, response_receiver) = oneshot::channel();

        self.mutation_sender
            .send((mutation, response_sender))
            .map_err(|_| IamError::ServiceNotInitialized)?;

        response_receiver
            .await
            .map_err(|_| IamError::ServiceNotInitialized)?
    }

    /// Get a user by (already normalized) email
    pub fn get_user(&self, email: &str) -> Result<Option<User>, IamError> {
        self.with_users_read(|users| Ok(users.get(email).cloned()))
    }

    /// All users ordered by id
    pub fn list_users(&self) -> Result<Vec<User>, IamError> {
        self.with_users_read(|users| {
            let mut list: Vec<User> = users.values().cloned().collect();
            list.sort_by_key(|user| user.id);
            Ok(list)
        })
    }

    pub async fn add_user(&self, new_user: NewUser) -> Result<User, IamError> {
        match self.submit(UserMutation::Add(new_user)).await? {
            UserMutationResult::Added(user) => Ok(user),
            _ => Err(IamError::ConfigurationError(
                "Unexpected result".to_string(),
            )),
        }
    }

    /// Updates name and/or password hash. A new password bumps `password_version`.
    pub async fn update_user(
        &self,
        email: &str,
        name: Option<&str>,
        password_hash: Option<String>,
    ) -> Result<User, IamError> {
        let mutation = UserMutation::Update {
            email: email.to_string(),
            name: name.map(|s| s.to_string()),
            password_hash,
        };
        match self.submit(mutation).await? {
            UserMutationResult::Updated(user) => Ok(user),
            _ => Err(IamError::ConfigurationError(
                "Unexpected result".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iam::store::MemoryUserStore;
    use std::collections::HashMap;

    struct FailingUserStore {
        users: UsersData,
    }

    impl UserStore for FailingUserStore {
        fn load(&self) -> Result<UsersData, IamError> {
            Ok(self.users.clone())
        }

        fn save(&self, _users: &UsersData) -> Result<(), IamError> {
            Err(IamError::FileError(
                "Simulated users save failure".to_string(),
            ))
        }
    }

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            name: "User".to_string(),
            password_hash: "hash".to_string(),
            is_staff: false,
            is_superuser: false,
        }
    }

    fn sample_user() -> User {
        User {
            id: 1,
            email: "user@example.com".to_string(),
            name: "User One".to_string(),
            password_hash: Some("hash".to_string()),
            is_active: true,
            is_staff: false,
            is_superuser: false,
            password_version: DEFAULT_PASSWORD_VERSION,
        }
    }

    #[tokio::test]
    async fn add_assigns_increasing_ids() {
        let store = Arc::new(MemoryUserStore::new(HashMap::new()));
        let service = IamService::new(store).expect("service");

        let first = service.add_user(new_user("a@example.com")).await.expect("add");
        let second = service.add_user(new_user("b@example.com")).await.expect("add");
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        let listed: Vec<(UserId, String)> = service
            .list_users()
            .expect("list")
            .into_iter()
            .map(|u| (u.id, u.email))
            .collect();
        assert_eq!(
            listed,
            vec![(1, "a@example.com".to_string()), (2, "b@example.com".to_string())]
        );
    }

    #[tokio::test]
    async fn add_refuses_when_ids_are_exhausted() {
        let mut last = sample_user();
        last.id = UserId::MAX;
        let store = Arc::new(MemoryUserStore::from_users(vec![last]));
        let service = IamService::new(store).expect("service");

        let err = service
            .add_user(new_user("b@example.com"))
            .await
            .expect_err("no id left");
        assert!(matches!(err, IamError::FileError(_)));
        assert_eq!(service.list_users().expect("list").len(), 1);
    }

    #[tokio::test]
    async fn add_rejects_duplicate_email() {
        let store = Arc::new(MemoryUserStore::from_users(vec![sample_user()]));
        let service = IamService::new(store).expect("service");

        let err = service
            .add_user(new_user("user@example.com"))
            .await
            .expect_err("duplicate");
        assert!(matches!(err, IamError::DuplicateEmail(_)));
        assert_eq!(service.list_users().expect("list").len(), 1);
    }

    #[tokio::test]
    async fn add_does_not_mutate_in_memory_on_save_error() {
        let store = Arc::new(FailingUserStore {
            users: HashMap::new(),
        });
        let service = IamService::new(store).expect("service");

        let result = service.add_user(new_user("user@example.com")).await;
        assert!(result.is_err());

        let users = service.list_users().expect("list users");
        assert!(users.is_empty());
    }

    #[tokio::test]
    async fn update_does_not_mutate_in_memory_on_save_error() {
        let mut users = HashMap::new();
        let user = sample_user();
        users.insert(user.email.clone(), user);
        let store = Arc::new(FailingUserStore { users });
        let service = IamService::new(store).expect("service");

        let result = service
            .update_user("user@example.com", Some("Updated Name"), None)
            .await;
        assert!(result.is_err());

        let users = service.list_users().expect("list users");
        assert_eq!(users[0].name, "User One");
    }

    #[tokio::test]
    async fn update_unknown_user_fails() {
        let store = Arc::new(MemoryUserStore::new(HashMap::new()));
        let service = IamService::new(store).expect("service");

        let err = service
            .update_user("ghost@example.com", Some("Ghost"), None)
            .await
            .expect_err("unknown");
        assert!(matches!(err, IamError::UserNotFound(_)));
    }

    #[tokio::test]
    async fn password_update_bumps_password_version() {
        let store = Arc::new(MemoryUserStore::from_users(vec![sample_user()]));
        let service = IamService::new(store).expect("service");

        let updated = service
            .update_user("user@example.com", None, Some("new-hash".to_string()))
            .await
            .expect("update user");
        assert_eq!(
            updated.password_version,
            DEFAULT_PASSWORD_VERSION.saturating_add(1)
        );
        assert_eq!(updated.password_hash.as_deref(), Some("new-hash"));
    }

    #[tokio::test]
    async fn name_update_does_not_bump_password_version() {
        let store = Arc::new(MemoryUserStore::from_users(vec![sample_user()]));
        let service = IamService::new(store).expect("service");

        service
            .update_user("user@example.com", Some("New Name"), None)
            .await
            .expect("update user");

        let updated = service
            .get_user("user@example.com")
            .expect("get user")
            .expect("user");
        assert_eq!(updated.name, "New Name");
        assert_eq!(updated.password_version, DEFAULT_PASSWORD_VERSION);
    }
}
