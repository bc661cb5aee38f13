//! Wiring of the shared collaborators into one service per entity kind.

use hotel_access::{AccessConfig, PermissionCache, PermissionResolver, ScopedQueryPlanner};
use hotel_history::{Formatter, HistoryConfig, HistoryLog};
use hotel_types::{DocumentStore, EntityKind, IdentityDirectory};
use std::sync::Arc;

use crate::EntityService;

/// Entity services sharing one resolver (and its cache), planner, and
/// history log.
pub struct HotelOps {
    resolver: Arc<PermissionResolver>,
    history: Arc<HistoryLog>,
    incidents: EntityService,
    interventions: EntityService,
    lost_items: EntityService,
}

impl HotelOps {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        directory: Arc<dyn IdentityDirectory>,
        access: AccessConfig,
        history: HistoryConfig,
        formatter: Formatter,
    ) -> Self {
        let resolver = Arc::new(PermissionResolver::new(
            directory.clone(),
            PermissionCache::from_config(&access),
        ));
        let planner = Arc::new(ScopedQueryPlanner::new(resolver.clone(), access));
        let history = Arc::new(HistoryLog::new(store.clone(), directory, history));
        let formatter = Arc::new(formatter);
        let service = |kind| {
            EntityService::new(
                kind,
                store.clone(),
                planner.clone(),
                history.clone(),
                formatter.clone(),
            )
        };
        Self {
            incidents: service(EntityKind::Incident),
            interventions: service(EntityKind::Intervention),
            lost_items: service(EntityKind::LostItem),
            resolver,
            history,
        }
    }

    /// Defaults everywhere; handy for tests and local runs.
    pub fn with_defaults(store: Arc<dyn DocumentStore>, directory: Arc<dyn IdentityDirectory>) -> Self {
        Self::new(
            store,
            directory,
            AccessConfig::default(),
            HistoryConfig::default(),
            Formatter::default(),
        )
    }

    pub fn service(&self, kind: EntityKind) -> &EntityService {
        match kind {
            EntityKind::Incident => &self.incidents,
            EntityKind::Intervention => &self.interventions,
            EntityKind::LostItem => &self.lost_items,
        }
    }

    pub fn resolver(&self) -> &Arc<PermissionResolver> {
        &self.resolver
    }

    pub fn history_log(&self) -> &Arc<HistoryLog> {
        &self.history
    }
}
