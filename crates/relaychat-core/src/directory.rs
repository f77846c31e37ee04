//! Identity Directory
//!
//! Issues numeric user ids and looks users up by name. The relay itself only
//! consumes the ids; the directory backs the registration and login routes.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::types::UserId;
use crate::DirectoryError;

/// Users created by [`InMemoryIdentityDirectory::with_seed_users`].
pub const SEED_USERS: [(&str, &str); 4] = [
    ("a", "a"),
    ("b", "b"),
    ("sam", "sam"),
    ("richard", "richard"),
];

/// A registered chat participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
}

/// Trait for identity directories.
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    /// Register a new user and return it with its issued id.
    async fn add_user(&self, first_name: &str, last_name: &str) -> Result<User, DirectoryError>;

    /// Find a user by exact first and last name.
    async fn find_user(
        &self,
        first_name: &str,
        last_name: &str,
    ) -> Result<Option<User>, DirectoryError>;

    /// Get a user by id.
    async fn get_user(&self, id: UserId) -> Result<Option<User>, DirectoryError>;

    /// List all users in ascending id order.
    async fn list_users(&self) -> Result<Vec<User>, DirectoryError>;
}

#[derive(Debug)]
struct DirectoryInner {
    users: BTreeMap<UserId, User>,
    next_id: i64,
}

/// In-memory identity directory issuing ids from 1 upward.
#[derive(Debug)]
pub struct InMemoryIdentityDirectory {
    inner: Mutex<DirectoryInner>,
}

impl Default for InMemoryIdentityDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryIdentityDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(DirectoryInner {
                users: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }

    /// Create a directory pre-populated with [`SEED_USERS`] (ids 1 to 4).
    pub fn with_seed_users() -> Self {
        let directory = Self::new();
        for (first_name, last_name) in SEED_USERS {
            directory.insert(first_name, last_name);
        }
        info!(count = SEED_USERS.len(), "Seeded identity directory");
        directory
    }

    fn insert(&self, first_name: &str, last_name: &str) -> User {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let user = User {
            id: UserId(inner.next_id),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
        };
        inner.next_id += 1;
        inner.users.insert(user.id, user.clone());
        user
    }
}

#[async_trait]
impl IdentityDirectory for InMemoryIdentityDirectory {
    async fn add_user(&self, first_name: &str, last_name: &str) -> Result<User, DirectoryError> {
        let user = self.insert(first_name, last_name);
        debug!(user_id = %user.id, "Registered user");
        Ok(user)
    }

    async fn find_user(
        &self,
        first_name: &str,
        last_name: &str,
    ) -> Result<Option<User>, DirectoryError> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(inner
            .users
            .values()
            .find(|u| u.first_name == first_name && u.last_name == last_name)
            .cloned())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, DirectoryError> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(inner.users.get(&id).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, DirectoryError> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(inner.users.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_add_user_issues_sequential_ids() {
        let directory = InMemoryIdentityDirectory::new();
        let alice = directory.add_user("alice", "liddell").await.unwrap();
        let bob = directory.add_user("bob", "builder").await.unwrap();

        assert_eq!(alice.id, UserId(1));
        assert_eq!(bob.id, UserId(2));
        assert_eq!(directory.get_user(UserId(2)).await.unwrap(), Some(bob));
        assert_eq!(directory.get_user(UserId(3)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_find_user_by_name() {
        let directory = InMemoryIdentityDirectory::new();
        directory.add_user("alice", "liddell").await.unwrap();

        let found = directory.find_user("alice", "liddell").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(UserId(1)));
        assert!(directory.find_user("alice", "smith").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_seed_users() {
        let directory = InMemoryIdentityDirectory::with_seed_users();
        let users = directory.list_users().await.unwrap();

        assert_eq!(users.len(), 4);
        let ids: Vec<i64> = users.iter().map(|u| u.id.0).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert_eq!(users[2].first_name, "sam");

        // New registrations continue after the seeds
        let next = directory.add_user("new", "user").await.unwrap();
        assert_eq!(next.id, UserId(5));
    }

    #[test]
    fn test_user_wire_format() {
        let user = User {
            id: UserId(7),
            first_name: "sam".to_string(),
            last_name: "sam".to_string(),
        };
        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(value["id"], 7);
        assert_eq!(value["first_name"], "sam");
        assert_eq!(value["last_name"], "sam");
    }
}
