//! Append-only history log over a document collection.

use chrono::{DateTime, Duration, Utc};
use hotel_types::{
    DocumentStore, FieldValue, HistoryActor, HistoryEntry, HistoryPayload, IdentityDirectory,
    Operation, Predicate, Snapshot, StoreQuery,
};
use std::cmp::Ordering;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::diff::diff;
use crate::record::{self, decode, snapshot_value, string_list, unknown_actor_label};
use crate::{HistoryConfig, HistoryError};

/// One mutation to record.
#[derive(Debug, Clone)]
pub struct AppendRequest {
    pub entity_id: String,
    pub entity_type: String,
    /// `None` for creations.
    pub previous: Option<Snapshot>,
    /// `None` for deletions.
    pub next: Option<Snapshot>,
    /// Email or user id of whoever made the change.
    pub actor_id: String,
    pub operation: Operation,
    /// Kept in the stored snapshots but left out of `changedFields`
    /// (audit stamps such as `updatedAt`).
    pub untracked_fields: Vec<String>,
}

/// Writes and reads history records.
///
/// Entries are never updated or deleted. Each record stores the actor's name
/// as it was at write time, the changed field names, and both full snapshots.
pub struct HistoryLog {
    store: Arc<dyn DocumentStore>,
    directory: Arc<dyn IdentityDirectory>,
    config: HistoryConfig,
    last_timestamp: Mutex<Option<DateTime<Utc>>>,
}

impl HistoryLog {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        directory: Arc<dyn IdentityDirectory>,
        config: HistoryConfig,
    ) -> Self {
        Self {
            store,
            directory,
            config,
            last_timestamp: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Record one mutation; returns the new entry id.
    ///
    /// Actor lookup failures degrade to an "Unknown user" label. Storage
    /// failures on the write itself are returned.
    pub async fn append(&self, req: AppendRequest) -> Result<String, HistoryError> {
        if req.entity_id.trim().is_empty() {
            return Err(HistoryError::Encode("entity id is empty".to_string()));
        }
        let actor = self.resolve_actor(&req.actor_id).await;
        let mut changed = diff(req.previous.as_ref(), req.next.as_ref());
        changed.retain(|f| !req.untracked_fields.contains(f));
        let timestamp = self.next_timestamp().await;

        let mut doc = Snapshot::new();
        doc.insert(record::ENTITY_ID.into(), req.entity_id.clone().into());
        doc.insert(record::ENTITY_TYPE.into(), req.entity_type.into());
        doc.insert(record::OPERATION.into(), req.operation.as_str().into());
        doc.insert(record::USER_ID.into(), actor.id.into());
        doc.insert(record::USER_NAME.into(), actor.name.into());
        if let Some(email) = actor.email {
            doc.insert(record::USER_EMAIL.into(), email.into());
        }
        doc.insert(record::TIMESTAMP.into(), FieldValue::from(timestamp));
        doc.insert(record::CHANGED_FIELDS.into(), string_list(&changed));
        if let Some(prev) = &req.previous {
            doc.insert(record::PREVIOUS_STATE.into(), snapshot_value(prev));
        }
        if let Some(next) = &req.next {
            doc.insert(record::NEW_STATE.into(), snapshot_value(next));
        }

        let id = self.store.insert(&self.config.collection, doc).await?;
        tracing::debug!(
            entity_id = %req.entity_id,
            operation = %req.operation,
            changed = changed.len(),
            entry_id = %id,
            "history appended"
        );
        Ok(id)
    }

    /// Entries for one entity, newest first. Unknown ids yield an empty list.
    pub async fn entries_for(&self, entity_id: &str) -> Result<Vec<HistoryEntry>, HistoryError> {
        if entity_id.trim().is_empty() {
            return Ok(Vec::new());
        }
        // No order-by: equality plus ordering would need a composite index, so
        // every candidate is fetched and ordered here.
        let query = StoreQuery {
            predicates: vec![Predicate::eq(record::ENTITY_ID, entity_id)],
            order_by: None,
            limit: usize::MAX,
        };
        let rows = self.store.query(&self.config.collection, &query).await?;

        let mut entries: Vec<HistoryEntry> = rows
            .iter()
            .map(decode)
            .filter(|e| e.entity_id == entity_id)
            .collect();
        for e in &entries {
            if e.payload == HistoryPayload::Unrecognized {
                tracing::warn!(entry_id = %e.id, entity_id, "unrecognized history payload");
            }
        }
        entries.sort_by(newest_first);
        if entries.len() > self.config.scan_limit {
            tracing::warn!(
                entity_id,
                total = entries.len(),
                scan_limit = self.config.scan_limit,
                "history scan limit reached; oldest entries omitted"
            );
            entries.truncate(self.config.scan_limit);
        }
        Ok(entries)
    }

    async fn resolve_actor(&self, actor_id: &str) -> HistoryActor {
        let lookup = if actor_id.contains('@') {
            self.directory.lookup_user_by_email(actor_id).await
        } else {
            self.directory.lookup_user_by_id(actor_id).await
        };
        match lookup {
            Ok(Some(user)) => HistoryActor {
                name: user.display_label(),
                email: Some(user.email),
                id: user.id,
            },
            Ok(None) => {
                tracing::warn!(actor_id, "history actor not found; using fallback label");
                Self::fallback_actor(actor_id)
            }
            Err(e) => {
                tracing::warn!(actor_id, error = %e, "history actor lookup failed; using fallback label");
                Self::fallback_actor(actor_id)
            }
        }
    }

    fn fallback_actor(actor_id: &str) -> HistoryActor {
        HistoryActor {
            id: actor_id.to_string(),
            name: unknown_actor_label(actor_id),
            email: actor_id.contains('@').then(|| actor_id.to_string()),
        }
    }

    // Strictly increasing within this process so newest-first is a total order.
    async fn next_timestamp(&self) -> DateTime<Utc> {
        let mut last = self.last_timestamp.lock().await;
        let mut now = Utc::now();
        if let Some(prev) = *last {
            if now <= prev {
                now = prev + Duration::microseconds(1);
            }
        }
        *last = Some(now);
        now
    }
}

fn newest_first(a: &HistoryEntry, b: &HistoryEntry) -> Ordering {
    match (a.timestamp, b.timestamp) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
