//! Fault-injecting wrapper for tests: fail calls per collection, or all of them.

use hotel_types::{DocumentStore, IdentityDirectory, Snapshot, StoreError, StoreQuery, User};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// Wraps a store (and/or directory) and fails selected calls with
/// [`StoreError::Unavailable`]. Reads and writes fail alike.
pub struct FaultyStore<S> {
    inner: S,
    failing_collections: RwLock<HashSet<String>>,
    fail_all: AtomicBool,
    fail_directory: AtomicBool,
}

impl<S> FaultyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            failing_collections: RwLock::new(HashSet::new()),
            fail_all: AtomicBool::new(false),
            fail_directory: AtomicBool::new(false),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub async fn fail_collection(&self, collection: &str) {
        self.failing_collections
            .write()
            .await
            .insert(collection.to_string());
    }

    pub fn fail_everything(&self) {
        self.fail_all.store(true, Ordering::SeqCst);
    }

    pub fn fail_directory(&self) {
        self.fail_directory.store(true, Ordering::SeqCst);
    }

    /// Clear every injected fault.
    pub async fn heal(&self) {
        self.failing_collections.write().await.clear();
        self.fail_all.store(false, Ordering::SeqCst);
        self.fail_directory.store(false, Ordering::SeqCst);
    }

    async fn check(&self, collection: &str) -> Result<(), StoreError> {
        if self.fail_all.load(Ordering::SeqCst)
            || self.failing_collections.read().await.contains(collection)
        {
            return Err(StoreError::Unavailable(format!(
                "injected fault on {}",
                collection
            )));
        }
        Ok(())
    }

    fn check_directory(&self) -> Result<(), StoreError> {
        if self.fail_all.load(Ordering::SeqCst) || self.fail_directory.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "injected fault on identity directory".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl<S: DocumentStore> DocumentStore for FaultyStore<S> {
    async fn query(
        &self,
        collection: &str,
        query: &StoreQuery,
    ) -> Result<Vec<Snapshot>, StoreError> {
        self.check(collection).await?;
        self.inner.query(collection, query).await
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Snapshot>, StoreError> {
        self.check(collection).await?;
        self.inner.get(collection, id).await
    }

    async fn insert(&self, collection: &str, row: Snapshot) -> Result<String, StoreError> {
        self.check(collection).await?;
        self.inner.insert(collection, row).await
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        partial: Snapshot,
    ) -> Result<(), StoreError> {
        self.check(collection).await?;
        self.inner.update(collection, id, partial).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.check(collection).await?;
        self.inner.delete(collection, id).await
    }
}

#[async_trait::async_trait]
impl<S: IdentityDirectory> IdentityDirectory for FaultyStore<S> {
    async fn lookup_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.check_directory()?;
        self.inner.lookup_user_by_email(email).await
    }

    async fn lookup_user_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        self.check_directory()?;
        self.inner.lookup_user_by_id(id).await
    }
}
