//! In-memory identity directory.

use hotel_types::{IdentityDirectory, StoreError, User};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory implementation of IdentityDirectory, keyed by user id.
pub struct InMemoryDirectory {
    users: Arc<RwLock<HashMap<String, User>>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        let map = users.into_iter().map(|u| (u.id.clone(), u)).collect();
        Self {
            users: Arc::new(RwLock::new(map)),
        }
    }

    /// Insert or replace a user (admin provisioning).
    pub async fn upsert(&self, user: User) {
        self.users.write().await.insert(user.id.clone(), user);
    }

    pub async fn remove(&self, id: &str) -> Option<User> {
        self.users.write().await.remove(id)
    }
}

impl Default for InMemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl IdentityDirectory for InMemoryDirectory {
    async fn lookup_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let guard = self.users.read().await;
        Ok(guard
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email.trim()))
            .cloned())
    }

    async fn lookup_user_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        let guard = self.users.read().await;
        Ok(guard.get(id).cloned())
    }
}
