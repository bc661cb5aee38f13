//! Scoped CRUD for one entity kind.

use chrono::Utc;
use hotel_access::{PermissionResolver, PlanRequest, ScopedQueryPlanner};
use hotel_history::{last_known_state, AppendRequest, FormattedEntry, Formatter, HistoryLog};
use hotel_types::{
    fields, AccessScope, DocumentStore, EntityKind, EntityStats, FieldValue, HistoryEntry,
    HistoryStatus, ListOptions, MutationOutcome, Operation, Snapshot, UnitFilter, User,
};
use std::sync::Arc;

use crate::ServiceError;

/// CRUD, statistics, and history for one [`EntityKind`].
///
/// Reads never fail for lack of access: they return nothing. Writes fail with
/// [`ServiceError::AccessDenied`] when the actor cannot reach the entity's
/// hotel. Each committed write appends a history entry; a failed append is
/// reported in the outcome and never undoes the write.
#[derive(Clone)]
pub struct EntityService {
    kind: EntityKind,
    store: Arc<dyn DocumentStore>,
    planner: Arc<ScopedQueryPlanner>,
    history: Arc<HistoryLog>,
    formatter: Arc<Formatter>,
}

impl EntityService {
    pub fn new(
        kind: EntityKind,
        store: Arc<dyn DocumentStore>,
        planner: Arc<ScopedQueryPlanner>,
        history: Arc<HistoryLog>,
        formatter: Arc<Formatter>,
    ) -> Self {
        Self {
            kind,
            store,
            planner,
            history,
            formatter,
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    fn resolver(&self) -> &PermissionResolver {
        self.planner.resolver()
    }

    fn collection(&self) -> &'static str {
        self.kind.collection()
    }

    fn unit_of(doc: &Snapshot) -> Option<&str> {
        doc.get(fields::HOTEL_ID)
            .and_then(FieldValue::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    async fn require_user(&self, actor: &str) -> Result<User, ServiceError> {
        self.resolver()
            .resolve_user(actor)
            .await?
            .ok_or_else(|| ServiceError::AccessDenied(format!("unknown identity {}", actor)))
    }

    // Entities without a hotel are visible to administrators only.
    async fn can_see(&self, actor: &str, unit: Option<&str>) -> Result<bool, ServiceError> {
        Ok(match unit {
            Some(unit) => self.resolver().has_access(actor, unit).await?,
            None => self.resolver().is_admin(actor).await?,
        })
    }

    async fn load(&self, id: &str) -> Result<Snapshot, ServiceError> {
        self.store
            .get(self.collection(), id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("{} {}", self.kind, id)))
    }

    /// Entities visible to `actor`, newest first.
    #[tracing::instrument(skip(self, opts), fields(kind = %self.kind))]
    pub async fn list(&self, actor: &str, opts: &ListOptions) -> Result<Vec<Snapshot>, ServiceError> {
        self.run_plan(actor, PlanRequest::from_options(opts)).await
    }

    async fn run_plan(&self, actor: &str, request: PlanRequest) -> Result<Vec<Snapshot>, ServiceError> {
        let plan = self.planner.plan(actor, &request).await?;
        if plan.matches_nothing() {
            return Ok(Vec::new());
        }
        let rows = self
            .store
            .query(self.collection(), &plan.to_store_query())
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "read failed");
                e
            })?;
        Ok(plan.apply(rows))
    }

    /// One entity; `NotFound` also when it exists outside the actor's scope.
    #[tracing::instrument(skip(self), fields(kind = %self.kind))]
    pub async fn get(&self, actor: &str, id: &str) -> Result<Snapshot, ServiceError> {
        let doc = self.load(id).await?;
        if !self.can_see(actor, Self::unit_of(&doc)).await? {
            return Err(ServiceError::NotFound(format!("{} {}", self.kind, id)));
        }
        Ok(doc)
    }

    #[tracing::instrument(skip(self, data), fields(kind = %self.kind))]
    pub async fn create(&self, actor: &str, data: Snapshot) -> Result<MutationOutcome, ServiceError> {
        let user = self.require_user(actor).await?;
        let unit = Self::unit_of(&data)
            .ok_or_else(|| ServiceError::InvalidInput(format!("{} is required", fields::HOTEL_ID)))?
            .to_string();
        if !PermissionResolver::scope_of(&user).contains(&unit) {
            return Err(ServiceError::AccessDenied(unit));
        }

        let mut row = data;
        row.remove(fields::ID);
        row.insert(fields::HOTEL_ID.to_string(), unit.clone().into());
        let has_status = row
            .get(fields::STATUS)
            .and_then(FieldValue::as_str)
            .is_some_and(|s| !s.trim().is_empty());
        if !has_status {
            row.insert(fields::STATUS.to_string(), self.kind.default_status().into());
        }
        let now = FieldValue::from(Utc::now());
        row.insert(fields::CREATED_AT.to_string(), now.clone());
        row.insert(fields::UPDATED_AT.to_string(), now);
        row.insert(fields::CREATED_BY.to_string(), user.id.clone().into());
        row.remove(fields::UPDATED_BY);

        let id = self.store.insert(self.collection(), row.clone()).await?;
        row.insert(fields::ID.to_string(), id.clone().into());
        tracing::info!(id = %id, unit = %unit, actor = %user.id, "entity created");

        let history = self
            .record(&id, Operation::Create, None, Some(row), &user, &[])
            .await;
        Ok(MutationOutcome { id, history })
    }

    /// Partial update. Moving an entity to another hotel needs access to both.
    #[tracing::instrument(skip(self, data), fields(kind = %self.kind))]
    pub async fn update(
        &self,
        actor: &str,
        id: &str,
        data: Snapshot,
    ) -> Result<MutationOutcome, ServiceError> {
        let user = self.require_user(actor).await?;
        let existing = self.load(id).await?;
        let scope = PermissionResolver::scope_of(&user);
        Self::check_unit(&scope, &existing)?;

        let mut partial = data;
        for immutable in [fields::ID, fields::CREATED_AT, fields::CREATED_BY] {
            partial.remove(immutable);
        }
        if partial.is_empty() {
            return Err(ServiceError::InvalidInput("no fields to update".to_string()));
        }
        if let Some(value) = partial.get(fields::HOTEL_ID) {
            let unit = value
                .as_str()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| {
                    ServiceError::InvalidInput(format!("{} must be a non-empty string", fields::HOTEL_ID))
                })?;
            if Self::unit_of(&existing) != Some(unit) && !scope.contains(unit) {
                return Err(ServiceError::AccessDenied(unit.to_string()));
            }
        }
        partial.insert(fields::UPDATED_AT.to_string(), FieldValue::from(Utc::now()));
        partial.insert(fields::UPDATED_BY.to_string(), user.id.clone().into());

        self.store
            .update(self.collection(), id, partial.clone())
            .await?;
        let mut next = existing.clone();
        next.extend(partial);
        tracing::info!(id, actor = %user.id, "entity updated");

        let history = self
            .record(
                id,
                Operation::Update,
                Some(existing),
                Some(next),
                &user,
                &[fields::UPDATED_AT, fields::UPDATED_BY],
            )
            .await;
        Ok(MutationOutcome {
            id: id.to_string(),
            history,
        })
    }

    /// Allowed for administrators, or for the creator while they can still
    /// access the entity's hotel.
    #[tracing::instrument(skip(self), fields(kind = %self.kind))]
    pub async fn delete(&self, actor: &str, id: &str) -> Result<MutationOutcome, ServiceError> {
        let user = self.require_user(actor).await?;
        let existing = self.load(id).await?;
        if !user.is_admin() {
            Self::check_unit(&PermissionResolver::scope_of(&user), &existing)?;
            let creator = existing
                .get(fields::CREATED_BY)
                .and_then(FieldValue::as_str)
                .unwrap_or_default();
            if creator.is_empty() || !user.matches_identity(creator) {
                return Err(ServiceError::AccessDenied(format!(
                    "only the creator or an administrator may delete {} {}",
                    self.kind, id
                )));
            }
        }

        self.store.delete(self.collection(), id).await?;
        tracing::info!(id, actor = %user.id, "entity deleted");

        let history = self
            .record(id, Operation::Delete, Some(existing), None, &user, &[])
            .await;
        Ok(MutationOutcome {
            id: id.to_string(),
            history,
        })
    }

    /// Totals over the actor's scope, read with the raised statistics bound.
    #[tracing::instrument(skip(self), fields(kind = %self.kind))]
    pub async fn stats(&self, actor: &str, hotel: Option<&str>) -> Result<EntityStats, ServiceError> {
        let request = PlanRequest::new(UnitFilter::parse(hotel))
            .with_limit(self.planner.config().stats_limit);
        let rows = self.run_plan(actor, request).await?;
        let mut stats = EntityStats {
            total: rows.len(),
            ..EntityStats::default()
        };
        for row in &rows {
            let status = row
                .get(fields::STATUS)
                .and_then(FieldValue::as_str)
                .unwrap_or("unknown");
            *stats.by_status.entry(status.to_string()).or_default() += 1;
        }
        Ok(stats)
    }

    /// Raw history entries, newest first, if the actor can see the entity's
    /// hotel (from the live entity, or its last recorded state once deleted).
    #[tracing::instrument(skip(self), fields(kind = %self.kind))]
    pub async fn history_entries(
        &self,
        actor: &str,
        id: &str,
    ) -> Result<Vec<HistoryEntry>, ServiceError> {
        let entries: Vec<HistoryEntry> = self
            .history
            .entries_for(id)
            .await?
            .into_iter()
            .filter(|e| e.entity_type.is_empty() || e.entity_type == self.kind.as_str())
            .collect();

        let live = self.store.get(self.collection(), id).await?;
        let unit = match &live {
            Some(doc) => Self::unit_of(doc),
            None => last_known_state(&entries).and_then(Self::unit_of),
        };
        if entries.is_empty() || !self.can_see(actor, unit).await? {
            return Ok(Vec::new());
        }
        Ok(entries)
    }

    /// History rendered for display, newest first.
    pub async fn history(&self, actor: &str, id: &str) -> Result<Vec<FormattedEntry>, ServiceError> {
        let entries = self.history_entries(actor, id).await?;
        Ok(entries.iter().map(|e| self.formatter.format(e)).collect())
    }

    fn check_unit(scope: &AccessScope, doc: &Snapshot) -> Result<(), ServiceError> {
        match Self::unit_of(doc) {
            Some(unit) if scope.contains(unit) => Ok(()),
            Some(unit) => Err(ServiceError::AccessDenied(unit.to_string())),
            None if scope.is_all() => Ok(()),
            None => Err(ServiceError::AccessDenied("entity has no hotel".to_string())),
        }
    }

    async fn record(
        &self,
        id: &str,
        operation: Operation,
        previous: Option<Snapshot>,
        next: Option<Snapshot>,
        user: &User,
        untracked: &[&str],
    ) -> HistoryStatus {
        let req = AppendRequest {
            entity_id: id.to_string(),
            entity_type: self.kind.as_str().to_string(),
            previous,
            next,
            actor_id: user.id.clone(),
            operation,
            untracked_fields: untracked.iter().map(|f| f.to_string()).collect(),
        };
        match self.history.append(req).await {
            Ok(entry_id) => HistoryStatus::Recorded { entry_id },
            Err(e) => {
                tracing::warn!(id, %operation, error = %e, "history append failed after commit");
                HistoryStatus::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HotelOps;
    use hotel_history::changed_fields;
    use hotel_store::{FaultyStore, InMemoryDirectory, InMemoryDocumentStore};
    use hotel_types::{snapshot_from_json, HistoryPayload, Role};
    use serde_json::json;

    struct Fixture {
        store: Arc<FaultyStore<InMemoryDocumentStore>>,
        ops: HotelOps,
    }

    impl Fixture {
        fn incidents(&self) -> &EntityService {
            self.ops.service(EntityKind::Incident)
        }
    }

    fn user(id: &str, role: Role, hotels: &[&str]) -> User {
        User {
            id: id.to_string(),
            email: format!("{}@example.com", id),
            display_name: Some(id.to_uppercase()),
            role,
            hotels: hotels.iter().map(|h| h.to_string()).collect(),
        }
    }

    fn fixture() -> Fixture {
        let many: Vec<String> = (1..=15).map(|i| format!("H{}", i)).collect();
        let many: Vec<&str> = many.iter().map(String::as_str).collect();
        let directory = Arc::new(InMemoryDirectory::with_users(vec![
            user("root", Role::SystemAdmin, &[]),
            user("ana", Role::Standard, &["H1", "H2"]),
            user("bob", Role::Standard, &["H2"]),
            user("carl", Role::Standard, &many),
            user("olga", Role::Standard, &["H9"]),
        ]));
        let store = Arc::new(FaultyStore::new(InMemoryDocumentStore::new()));
        let ops = HotelOps::with_defaults(store.clone(), directory);
        Fixture { store, ops }
    }

    fn snap(v: serde_json::Value) -> Snapshot {
        snapshot_from_json(v).unwrap()
    }

    async fn seed(svc: &EntityService, actor: &str, hotel: &str, status: &str) -> String {
        svc.create(actor, snap(json!({"hotelId": hotel, "status": status, "title": "t"})))
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn create_stamps_audit_fields_and_records_history() {
        let fx = fixture();
        let out = fx
            .incidents()
            .create("ana@example.com", snap(json!({"hotelId": "H1", "title": "leak", "id": "forged"})))
            .await
            .unwrap();
        assert_ne!(out.id, "forged");
        assert!(out.history_entry_id().is_some());

        let doc = fx.incidents().get("ana", &out.id).await.unwrap();
        assert_eq!(doc["status"], FieldValue::from("open"));
        assert_eq!(doc["createdBy"], FieldValue::from("ana"));
        assert!(doc["createdAt"].as_datetime().is_some());

        let entries = fx.incidents().history_entries("ana", &out.id).await.unwrap();
        assert_eq!(entries[0].operation, Some(Operation::Create));
    }

    #[tokio::test]
    async fn default_status_follows_entity_kind() {
        let fx = fixture();
        let svc = fx.ops.service(EntityKind::LostItem);
        let id = svc
            .create("root", snap(json!({"hotelId": "H4", "itemName": "umbrella"})))
            .await
            .unwrap()
            .id;
        assert_eq!(svc.get("root", &id).await.unwrap()["status"], FieldValue::from("stored"));
    }

    #[tokio::test]
    async fn create_outside_scope_is_denied() {
        let fx = fixture();
        let err = fx
            .incidents()
            .create("bob", snap(json!({"hotelId": "H1"})))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::AccessDenied(_)));

        let err = fx
            .incidents()
            .create("nobody@example.com", snap(json!({"hotelId": "H1"})))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::AccessDenied(_)));

        let err = fx.incidents().create("ana", snap(json!({"title": "x"}))).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn status_update_is_recorded_with_exact_diff() {
        let fx = fixture();
        let id = seed(fx.incidents(), "ana", "H1", "open").await;

        let out = fx
            .incidents()
            .update("ana", &id, snap(json!({"status": "resolved"})))
            .await
            .unwrap();
        assert!(out.history_entry_id().is_some());

        let entries = fx.incidents().history_entries("ana", &id).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].operation, Some(Operation::Update));
        let changed = changed_fields(&entries[0].payload).unwrap();
        assert_eq!(changed, vec!["status".to_string()]);

        let formatted = fx.incidents().history("ana", &id).await.unwrap();
        assert_eq!(formatted[0].header.operation, "Updated");
        assert_eq!(formatted[0].header.actor, "ANA");
        let status = formatted[0].changes.iter().find(|c| c.field == "status").unwrap();
        assert_eq!((status.old.as_str(), status.new.as_str()), ("open", "resolved"));
    }

    #[tokio::test]
    async fn moving_to_another_hotel_rechecks_access() {
        let fx = fixture();
        let id = seed(fx.incidents(), "ana", "H2", "open").await;

        let err = fx
            .incidents()
            .update("bob", &id, snap(json!({"hotelId": "H1"})))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::AccessDenied(u) if u == "H1"));

        fx.incidents()
            .update("ana", &id, snap(json!({"hotelId": "H1"})))
            .await
            .unwrap();
        let err = fx
            .incidents()
            .update("bob", &id, snap(json!({"status": "x"})))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::AccessDenied(_)));
    }

    #[tokio::test]
    async fn missing_entity_is_not_found_on_writes() {
        let fx = fixture();
        let err = fx
            .incidents()
            .update("ana", "ghost", snap(json!({"status": "x"})))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        let err = fx.incidents().delete("root", "ghost").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_is_limited_to_creator_or_admin() {
        let fx = fixture();
        let id = seed(fx.incidents(), "bob", "H2", "open").await;

        let err = fx.incidents().delete("ana", &id).await.unwrap_err();
        assert!(matches!(err, ServiceError::AccessDenied(_)));

        let out = fx.incidents().delete("bob@example.com", &id).await.unwrap();
        assert!(out.history_entry_id().is_some());

        let id = seed(fx.incidents(), "bob", "H2", "open").await;
        fx.incidents().delete("root", &id).await.unwrap();
    }

    #[tokio::test]
    async fn delete_records_last_state_and_history_stays_scoped() {
        let fx = fixture();
        let id = seed(fx.incidents(), "ana", "H1", "open").await;
        let last = fx.incidents().get("ana", &id).await.unwrap();
        fx.incidents().delete("ana", &id).await.unwrap();

        let entries = fx.incidents().history_entries("ana", &id).await.unwrap();
        assert_eq!(entries[0].operation, Some(Operation::Delete));
        match &entries[0].payload {
            HistoryPayload::Legacy {
                previous_state,
                new_state,
                ..
            } => {
                assert_eq!(previous_state.as_ref(), Some(&last));
                assert!(new_state.is_none());
            }
            other => panic!("unexpected payload {:?}", other),
        }

        assert!(fx.incidents().history_entries("olga", &id).await.unwrap().is_empty());
        assert!(fx.incidents().history("bob", &id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn entity_without_hotel_is_visible_to_admins_only() {
        let fx = fixture();
        let svc = fx.incidents();
        let id = fx
            .store
            .insert(svc.collection(), snap(json!({"status": "open", "title": "orphan"})))
            .await
            .unwrap();
        svc.update("root", &id, snap(json!({"status": "resolved"})))
            .await
            .unwrap();

        assert!(svc.get("root", &id).await.is_ok());
        assert_eq!(svc.history_entries("root", &id).await.unwrap().len(), 1);

        assert!(matches!(svc.get("ana", &id).await, Err(ServiceError::NotFound(_))));
        assert!(svc.history_entries("ana", &id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn history_failure_is_reported_without_undoing_the_write() {
        let fx = fixture();
        fx.store.fail_collection("history").await;

        let out = fx
            .incidents()
            .create("ana", snap(json!({"hotelId": "H1"})))
            .await
            .unwrap();
        assert!(matches!(out.history, HistoryStatus::Failed { .. }));
        assert!(out.warning().is_some());

        fx.store.heal().await;
        assert!(fx.incidents().get("ana", &out.id).await.is_ok());
    }

    #[tokio::test]
    async fn reads_are_scoped_and_denials_look_empty() {
        let fx = fixture();
        let svc = fx.incidents();
        let in_h1 = seed(svc, "root", "H1", "open").await;
        seed(svc, "root", "H2", "resolved").await;
        seed(svc, "root", "H9", "open").await;

        let rows = svc.list("ana", &ListOptions::default()).await.unwrap();
        assert_eq!(rows.len(), 2);

        let err = svc.get("olga", &in_h1).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        assert!(svc.list("nobody", &ListOptions::default()).await.unwrap().is_empty());

        let opts = ListOptions {
            hotel: Some("H9".to_string()),
            ..ListOptions::default()
        };
        let rows = svc.list("ana", &opts).await.unwrap();
        assert!(rows.iter().all(|r| r["hotelId"].as_str() == Some("H1")));
    }

    #[tokio::test]
    async fn status_filter_over_several_hotels_sorts_newest_first() {
        let fx = fixture();
        let svc = fx.incidents();
        for (id, hotel, status, created) in [
            ("a", "H1", "open", "2024-01-01T08:00:00Z"),
            ("b", "H2", "resolved", "2024-01-02T08:00:00Z"),
            ("c", "H2", "open", "2024-01-03T08:00:00Z"),
            ("d", "H3", "open", "2024-01-04T08:00:00Z"),
        ] {
            fx.store
                .insert(
                    "incidents",
                    snap(json!({"id": id, "hotelId": hotel, "status": status, "createdAt": created})),
                )
                .await
                .unwrap();
        }

        let opts = ListOptions {
            status: Some("open".to_string()),
            ..ListOptions::default()
        };
        let rows = svc.list("ana", &opts).await.unwrap();
        let ids: Vec<&str> = rows.iter().filter_map(|r| r["id"].as_str()).collect();
        assert_eq!(ids, vec!["c", "a"]);
    }

    #[tokio::test]
    async fn large_scope_is_filtered_client_side() {
        let fx = fixture();
        let svc = fx.incidents();
        for hotel in ["H1", "H7", "H15", "H16", "H99"] {
            seed(svc, "root", hotel, "open").await;
        }
        let rows = svc.list("carl", &ListOptions::default()).await.unwrap();
        let mut hotels: Vec<&str> = rows.iter().filter_map(|r| r["hotelId"].as_str()).collect();
        hotels.sort();
        assert_eq!(hotels, vec!["H1", "H15", "H7"]);
    }

    #[tokio::test]
    async fn storage_fault_on_read_is_retryable_error() {
        let fx = fixture();
        fx.store.fail_collection("incidents").await;
        let err = fx
            .incidents()
            .list("ana", &ListOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::StorageUnavailable(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn stats_count_by_status_within_scope() {
        let fx = fixture();
        let svc = fx.incidents();
        seed(svc, "root", "H1", "open").await;
        seed(svc, "root", "H1", "open").await;
        seed(svc, "root", "H2", "resolved").await;
        seed(svc, "root", "H9", "open").await;

        let stats = svc.stats("ana", None).await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_status["open"], 2);
        assert_eq!(stats.by_status["resolved"], 1);

        let stats = svc.stats("root", Some("H9")).await.unwrap();
        assert_eq!(stats.total, 1);

        let stats = svc.stats("nobody", None).await.unwrap();
        assert_eq!(stats, EntityStats::default());
    }
}
