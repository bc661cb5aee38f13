//! Scoped query planning under document-store constraints.
//!
//! The store caps membership predicates at `max_in_values` values and needs a
//! composite index to order by one field while filtering on another. Plans
//! therefore never combine an order-by with a predicate; when a predicate is
//! present the caller sorts client-side, and when the scope is too large for a
//! membership predicate the caller filters client-side.

use chrono::{DateTime, Utc};
use hotel_types::{
    compare_sort_values, AccessScope, ListOptions, OrderBy, Predicate, Snapshot, StoreQuery,
    UnitFilter,
};
use std::sync::Arc;

use crate::{AccessConfig, OutOfScopePolicy, PermissionResolver, PlanError};

/// What the caller asked for.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanRequest {
    pub unit_filter: UnitFilter,
    pub status: Option<String>,
    /// Applied after fetch, never sent to the store.
    pub since: Option<DateTime<Utc>>,
    /// Result bound; defaults to `default_limit`, capped at `stats_limit`.
    pub limit: Option<usize>,
}

impl PlanRequest {
    pub fn new(unit_filter: UnitFilter) -> Self {
        Self {
            unit_filter,
            status: None,
            since: None,
            limit: None,
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn from_options(opts: &ListOptions) -> Self {
        Self {
            unit_filter: UnitFilter::parse(opts.hotel.as_deref()),
            status: opts
                .status
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            since: opts.since,
            limit: opts.limit,
        }
    }
}

/// Executable plan plus the post-fetch work it requires.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub predicates: Vec<Predicate>,
    pub order_by: Option<OrderBy>,
    pub limit: usize,
    /// Rows must be filtered by `unit_field ∈ scope` after fetch.
    pub client_side_filter: bool,
    /// Rows must be sorted by `sort_field` descending after fetch.
    pub client_side_sort: bool,
    pub unit_field: String,
    pub sort_field: String,
    pub date_lower_bound: Option<DateTime<Utc>>,
    pub scope: AccessScope,
    matches_nothing: bool,
}

impl QueryPlan {
    fn nothing(config: &AccessConfig, scope: AccessScope) -> Self {
        Self {
            predicates: Vec::new(),
            order_by: None,
            limit: 0,
            client_side_filter: false,
            client_side_sort: false,
            unit_field: config.unit_field.clone(),
            sort_field: config.sort_field.clone(),
            date_lower_bound: None,
            scope,
            matches_nothing: true,
        }
    }

    /// True when no storage call should be made at all.
    pub fn matches_nothing(&self) -> bool {
        self.matches_nothing
    }

    /// Predicate on the unit field, if the plan carries one.
    pub fn unit_predicate(&self) -> Option<&Predicate> {
        self.predicates
            .iter()
            .find(|p| p.field() == self.unit_field)
    }

    pub fn to_store_query(&self) -> StoreQuery {
        StoreQuery {
            predicates: self.predicates.clone(),
            order_by: self.order_by.clone(),
            limit: self.limit,
        }
    }

    /// Finish the plan on fetched rows: unit post-filter, date lower bound,
    /// then newest-first sort.
    pub fn apply(&self, mut rows: Vec<Snapshot>) -> Vec<Snapshot> {
        if self.matches_nothing {
            return Vec::new();
        }
        if self.client_side_filter {
            rows.retain(|row| {
                row.get(&self.unit_field)
                    .and_then(|v| v.as_str())
                    .map(|unit| self.scope.contains(unit))
                    .unwrap_or(false)
            });
        }
        if let Some(bound) = self.date_lower_bound {
            rows.retain(|row| {
                row.get(&self.sort_field)
                    .and_then(|v| v.as_datetime())
                    .map(|at| at >= bound)
                    .unwrap_or(false)
            });
        }
        if self.client_side_sort {
            rows.sort_by(|a, b| {
                compare_sort_values(a.get(&self.sort_field), b.get(&self.sort_field)).reverse()
            });
        }
        rows.truncate(self.limit);
        rows
    }
}

/// Turns (identity, requested filter) into a [`QueryPlan`].
pub struct ScopedQueryPlanner {
    resolver: Arc<PermissionResolver>,
    config: AccessConfig,
}

impl ScopedQueryPlanner {
    pub fn new(resolver: Arc<PermissionResolver>, config: AccessConfig) -> Self {
        Self { resolver, config }
    }

    pub fn resolver(&self) -> &Arc<PermissionResolver> {
        &self.resolver
    }

    pub fn config(&self) -> &AccessConfig {
        &self.config
    }

    pub async fn plan(&self, identity: &str, request: &PlanRequest) -> Result<QueryPlan, PlanError> {
        let scope = self.resolver.accessible_units(identity).await?;
        self.plan_for_scope(scope, request)
    }

    /// Plan against an already-resolved scope.
    pub fn plan_for_scope(
        &self,
        scope: AccessScope,
        request: &PlanRequest,
    ) -> Result<QueryPlan, PlanError> {
        let cfg = &self.config;
        let mut client_side_filter = false;
        let mut predicates = Vec::new();

        match &scope {
            AccessScope::Empty => {
                tracing::debug!("empty scope; plan matches nothing");
                return Ok(QueryPlan::nothing(cfg, AccessScope::Empty));
            }
            AccessScope::Units(units) if units.is_empty() => {
                return Ok(QueryPlan::nothing(cfg, AccessScope::Empty));
            }
            AccessScope::All => {
                if let UnitFilter::Unit(unit) = &request.unit_filter {
                    predicates.push(Predicate::eq(cfg.unit_field.as_str(), unit.as_str()));
                }
            }
            AccessScope::Units(units) => match &request.unit_filter {
                UnitFilter::Unit(unit) if scope.contains(unit) => {
                    predicates.push(Predicate::eq(cfg.unit_field.as_str(), unit.as_str()));
                }
                UnitFilter::Unit(unit) => match cfg.out_of_scope {
                    OutOfScopePolicy::FirstAccessible => {
                        let first = &units[0];
                        tracing::debug!(
                            requested = %unit,
                            substituted = %first,
                            "unit filter outside scope; using first accessible unit"
                        );
                        predicates.push(Predicate::eq(cfg.unit_field.as_str(), first.as_str()));
                    }
                    OutOfScopePolicy::Empty => {
                        tracing::debug!(requested = %unit, "unit filter outside scope; empty plan");
                        return Ok(QueryPlan::nothing(cfg, scope.clone()));
                    }
                    OutOfScopePolicy::Reject => {
                        return Err(PlanError::AccessDenied(unit.clone()));
                    }
                },
                UnitFilter::All if units.len() == 1 => {
                    predicates.push(Predicate::eq(cfg.unit_field.as_str(), units[0].as_str()));
                }
                UnitFilter::All if units.len() <= cfg.max_in_values => {
                    predicates.push(Predicate::is_in(cfg.unit_field.as_str(), units.clone()));
                }
                UnitFilter::All => {
                    tracing::debug!(
                        units = units.len(),
                        max = cfg.max_in_values,
                        "scope exceeds membership cap; filtering client-side"
                    );
                    client_side_filter = true;
                }
            },
        }

        if let Some(status) = &request.status {
            predicates.push(Predicate::eq(hotel_types::fields::STATUS, status.as_str()));
        }

        // Any predicate rules out a server-side order-by without a composite index.
        let client_side_sort = !predicates.is_empty();
        let order_by = if client_side_sort {
            None
        } else {
            Some(OrderBy::desc(cfg.sort_field.as_str()))
        };
        let limit = request
            .limit
            .map(|l| l.clamp(1, cfg.stats_limit.max(1)))
            .unwrap_or(cfg.default_limit);

        let plan = QueryPlan {
            predicates,
            order_by,
            limit,
            client_side_filter,
            client_side_sort,
            unit_field: cfg.unit_field.clone(),
            sort_field: cfg.sort_field.clone(),
            date_lower_bound: request.since,
            scope,
            matches_nothing: false,
        };
        tracing::debug!(
            predicates = plan.predicates.len(),
            client_side_filter = plan.client_side_filter,
            client_side_sort = plan.client_side_sort,
            limit = plan.limit,
            "query planned"
        );
        Ok(plan)
    }
}
