//! Timeout decorator for storage collaborators.

use hotel_types::{DocumentStore, IdentityDirectory, Snapshot, StoreError, StoreQuery, User};
use std::future::Future;
use std::time::Duration;

/// Bounds every call on the wrapped store or directory with a timeout.
///
/// An elapsed call fails with [`StoreError::Timeout`]; whatever the inner
/// call already did at the storage layer is not undone.
pub struct Timed<S> {
    inner: S,
    timeout: Duration,
}

impl<S> Timed<S> {
    pub fn new(inner: S, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(res) => res,
            Err(_) => {
                tracing::warn!(timeout = ?self.timeout, "storage call timed out");
                Err(StoreError::Timeout(self.timeout))
            }
        }
    }
}

#[async_trait::async_trait]
impl<S: DocumentStore> DocumentStore for Timed<S> {
    async fn query(
        &self,
        collection: &str,
        query: &StoreQuery,
    ) -> Result<Vec<Snapshot>, StoreError> {
        self.bounded(self.inner.query(collection, query)).await
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Snapshot>, StoreError> {
        self.bounded(self.inner.get(collection, id)).await
    }

    async fn insert(&self, collection: &str, row: Snapshot) -> Result<String, StoreError> {
        self.bounded(self.inner.insert(collection, row)).await
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        partial: Snapshot,
    ) -> Result<(), StoreError> {
        self.bounded(self.inner.update(collection, id, partial)).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.bounded(self.inner.delete(collection, id)).await
    }
}

#[async_trait::async_trait]
impl<S: IdentityDirectory> IdentityDirectory for Timed<S> {
    async fn lookup_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.bounded(self.inner.lookup_user_by_email(email)).await
    }

    async fn lookup_user_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        self.bounded(self.inner.lookup_user_by_id(id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowStore;

    #[async_trait::async_trait]
    impl DocumentStore for SlowStore {
        async fn query(&self, _: &str, _: &StoreQuery) -> Result<Vec<Snapshot>, StoreError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Vec::new())
        }

        async fn get(&self, _: &str, _: &str) -> Result<Option<Snapshot>, StoreError> {
            Ok(None)
        }

        async fn insert(&self, _: &str, _: Snapshot) -> Result<String, StoreError> {
            Ok("x".to_string())
        }

        async fn update(&self, _: &str, _: &str, _: Snapshot) -> Result<(), StoreError> {
            Ok(())
        }

        async fn delete(&self, _: &str, _: &str) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn slow_call_fails_with_timeout() {
        let store = Timed::new(SlowStore, Duration::from_millis(20));
        let err = store
            .query("incidents", &StoreQuery::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Timeout(_)));
        assert!(err.is_transient());
        assert_eq!(store.get("incidents", "a").await.unwrap(), None);
    }
}
