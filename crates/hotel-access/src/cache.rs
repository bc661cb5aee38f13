//! Short-lived cache of resolved users, keyed by identity.

use hotel_types::User;
use moka::future::Cache;
use std::time::Duration;

use crate::AccessConfig;

/// Read-through cache in front of the identity directory.
///
/// Entries expire after the configured TTL; only found users are stored, so
/// an unknown identity always falls through to the directory. Safe to share
/// between concurrent requests (clones share the same storage).
#[derive(Clone)]
pub struct PermissionCache {
    users: Cache<String, User>,
}

impl PermissionCache {
    pub fn new(ttl: Duration, capacity: u64) -> Self {
        Self {
            users: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub fn from_config(config: &AccessConfig) -> Self {
        Self::new(
            Duration::from_secs(config.cache_ttl_secs),
            config.cache_capacity,
        )
    }

    pub async fn get(&self, identity: &str) -> Option<User> {
        self.users.get(&Self::key(identity)).await
    }

    pub async fn insert(&self, identity: &str, user: User) {
        self.users.insert(Self::key(identity), user).await;
    }

    pub async fn invalidate(&self, identity: &str) {
        self.users.invalidate(&Self::key(identity)).await;
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.users.invalidate_all();
    }

    // Emails are case-insensitive; ids are kept verbatim.
    fn key(identity: &str) -> String {
        let identity = identity.trim();
        if identity.contains('@') {
            identity.to_ascii_lowercase()
        } else {
            identity.to_string()
        }
    }
}
