//! Traits for the storage and identity collaborators.

use crate::{Snapshot, StoreQuery, User};
use async_trait::async_trait;
use std::time::Duration;

/// Document store abstraction: collections of loosely-typed documents.
///
/// Only equality and bounded membership predicates are supported; there are
/// no server-side joins, and ordering combined with a predicate on another
/// field requires a composite index the store may not have.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Run a query against one collection.
    async fn query(&self, collection: &str, query: &StoreQuery)
        -> Result<Vec<Snapshot>, StoreError>;

    /// Get one document by id.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Snapshot>, StoreError>;

    /// Insert a document; returns its id (the row's `id` field when present,
    /// otherwise a generated one).
    async fn insert(&self, collection: &str, row: Snapshot) -> Result<String, StoreError>;

    /// Merge `partial` into an existing document.
    async fn update(&self, collection: &str, id: &str, partial: Snapshot)
        -> Result<(), StoreError>;

    /// Delete a document by id.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;
}

/// Identity collaborator: user lookups for permissions and actor names.
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    async fn lookup_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn lookup_user_by_id(&self, id: &str) -> Result<Option<User>, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("storage call timed out after {0:?}")]
    Timeout(Duration),
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    #[error("missing composite index: {0}")]
    MissingIndex(String),
    #[error("document not found: {0}")]
    NotFound(String),
}

impl StoreError {
    /// Transient faults a read path may retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::Timeout(_))
    }
}
