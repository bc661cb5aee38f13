//! Identity to access-scope resolution.

use hotel_types::{AccessScope, IdentityDirectory, User};
use std::sync::Arc;

use crate::{AccessError, PermissionCache};

/// Resolves identities (email or user id) to users and their unit scope.
///
/// Unknown identities resolve to [`AccessScope::Empty`]; only directory faults
/// are errors.
pub struct PermissionResolver {
    directory: Arc<dyn IdentityDirectory>,
    cache: PermissionCache,
}

impl PermissionResolver {
    pub fn new(directory: Arc<dyn IdentityDirectory>, cache: PermissionCache) -> Self {
        Self { directory, cache }
    }

    pub fn cache(&self) -> &PermissionCache {
        &self.cache
    }

    /// Look up a user, consulting the cache first.
    pub async fn resolve_user(&self, identity: &str) -> Result<Option<User>, AccessError> {
        let identity = identity.trim();
        if identity.is_empty() {
            return Ok(None);
        }
        if let Some(user) = self.cache.get(identity).await {
            return Ok(Some(user));
        }
        let found = if identity.contains('@') {
            self.directory.lookup_user_by_email(identity).await?
        } else {
            self.directory.lookup_user_by_id(identity).await?
        };
        match &found {
            Some(user) => {
                tracing::debug!(identity, user_id = %user.id, "resolved user");
                self.cache.insert(&user.id, user.clone()).await;
                if !user.email.is_empty() {
                    self.cache.insert(&user.email, user.clone()).await;
                }
            }
            None => tracing::debug!(identity, "identity not found; no access"),
        }
        Ok(found)
    }

    /// `All` for administrators, the explicit unit list otherwise.
    pub async fn accessible_units(&self, identity: &str) -> Result<AccessScope, AccessError> {
        Ok(match self.resolve_user(identity).await? {
            Some(user) => Self::scope_of(&user),
            None => AccessScope::Empty,
        })
    }

    pub async fn has_access(&self, identity: &str, unit: &str) -> Result<bool, AccessError> {
        Ok(self.accessible_units(identity).await?.contains(unit))
    }

    pub async fn is_admin(&self, identity: &str) -> Result<bool, AccessError> {
        Ok(self
            .resolve_user(identity)
            .await?
            .map(|u| u.is_admin())
            .unwrap_or(false))
    }

    /// Forget a cached user under every alias (id and email), e.g. after
    /// its grants changed.
    pub async fn invalidate(&self, identity: &str) {
        if let Some(user) = self.cache.get(identity).await {
            self.cache.invalidate(&user.id).await;
            self.cache.invalidate(&user.email).await;
        }
        self.cache.invalidate(identity).await;
    }

    pub fn scope_of(user: &User) -> AccessScope {
        if user.is_admin() {
            AccessScope::All
        } else {
            AccessScope::from_units(user.hotels.iter().cloned())
        }
    }
}
