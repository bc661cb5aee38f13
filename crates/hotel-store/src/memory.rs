//! In-memory document store that enforces document-database query limits.

use hotel_types::{
    compare_sort_values, DocumentStore, FieldValue, Predicate, Snapshot, SortDirection,
    StoreError, StoreQuery, ID_FIELD,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Maximum number of values a membership predicate may carry.
pub const DEFAULT_MAX_IN_VALUES: usize = 10;

type Collection = BTreeMap<String, Snapshot>;

/// (collection, predicate field, order-by field)
type CompositeIndex = (String, String, String);

/// In-memory implementation of DocumentStore.
///
/// Mirrors the restrictions of a hosted document database so callers get the
/// same failures in tests as in production: membership predicates are capped
/// at `max_in_values`, and an order-by combined with a predicate on another
/// field is rejected unless a composite index was declared for that pair.
pub struct InMemoryDocumentStore {
    /// collection -> id -> document.
    collections: Arc<RwLock<HashMap<String, Collection>>>,
    indexes: HashSet<CompositeIndex>,
    max_in_values: usize,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            collections: Arc::new(RwLock::new(HashMap::new())),
            indexes: HashSet::new(),
            max_in_values: DEFAULT_MAX_IN_VALUES,
        }
    }

    pub fn with_max_in_values(mut self, max: usize) -> Self {
        self.max_in_values = max;
        self
    }

    /// Declare a composite index allowing `order_by_field` together with a
    /// predicate on `field`.
    pub fn with_index(mut self, collection: &str, field: &str, order_by_field: &str) -> Self {
        self.indexes.insert((
            collection.to_string(),
            field.to_string(),
            order_by_field.to_string(),
        ));
        self
    }

    /// Number of documents in a collection.
    pub async fn count(&self, collection: &str) -> usize {
        let guard = self.collections.read().await;
        guard.get(collection).map(BTreeMap::len).unwrap_or(0)
    }

    fn validate(&self, collection: &str, query: &StoreQuery) -> Result<(), StoreError> {
        for predicate in &query.predicates {
            if let Predicate::In { field, values } = predicate {
                if values.is_empty() {
                    return Err(StoreError::InvalidQuery(format!(
                        "'in' predicate on {} has no values",
                        field
                    )));
                }
                if values.len() > self.max_in_values {
                    return Err(StoreError::InvalidQuery(format!(
                        "'in' predicate on {} has {} values (max {})",
                        field,
                        values.len(),
                        self.max_in_values
                    )));
                }
            }
        }
        if let Some(order) = &query.order_by {
            for predicate in &query.predicates {
                if predicate.field() == order.field {
                    continue;
                }
                let key = (
                    collection.to_string(),
                    predicate.field().to_string(),
                    order.field.clone(),
                );
                if !self.indexes.contains(&key) {
                    return Err(StoreError::MissingIndex(format!(
                        "{}: ({}, {})",
                        collection,
                        predicate.field(),
                        order.field
                    )));
                }
            }
        }
        Ok(())
    }

    fn document_id(row: &Snapshot) -> Option<String> {
        row.get(ID_FIELD)
            .and_then(FieldValue::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn query(
        &self,
        collection: &str,
        query: &StoreQuery,
    ) -> Result<Vec<Snapshot>, StoreError> {
        self.validate(collection, query)?;
        let guard = self.collections.read().await;
        let Some(docs) = guard.get(collection) else {
            return Ok(Vec::new());
        };
        let mut out: Vec<Snapshot> = docs.values().filter(|d| query.matches(d)).cloned().collect();
        if let Some(order) = &query.order_by {
            out.sort_by(|a, b| {
                let ord = compare_sort_values(a.get(&order.field), b.get(&order.field));
                match order.direction {
                    SortDirection::Asc => ord,
                    SortDirection::Desc => ord.reverse(),
                }
            });
        }
        out.truncate(query.limit);
        Ok(out)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Snapshot>, StoreError> {
        let guard = self.collections.read().await;
        Ok(guard.get(collection).and_then(|docs| docs.get(id)).cloned())
    }

    async fn insert(&self, collection: &str, mut row: Snapshot) -> Result<String, StoreError> {
        let id = Self::document_id(&row).unwrap_or_else(|| Uuid::new_v4().to_string());
        row.insert(ID_FIELD.to_string(), FieldValue::String(id.clone()));
        let mut guard = self.collections.write().await;
        guard
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), row);
        Ok(id)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        partial: Snapshot,
    ) -> Result<(), StoreError> {
        let mut guard = self.collections.write().await;
        let doc = guard
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| StoreError::NotFound(format!("{}/{}", collection, id)))?;
        for (k, v) in partial {
            if k == ID_FIELD {
                continue;
            }
            doc.insert(k, v);
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut guard = self.collections.write().await;
        guard
            .get_mut(collection)
            .and_then(|docs| docs.remove(id))
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("{}/{}", collection, id)))
    }
}
