//! Permission resolution and scoped query planning.
//!
//! [`PermissionResolver`] maps an identity (email or user id) to the hotels it
//! may see; [`ScopedQueryPlanner`] turns that scope and a requested unit filter
//! into a [`QueryPlan`] the document store can execute without composite
//! indexes, flagging any work the caller must finish client-side.

mod cache;
mod config;
mod planner;
mod resolver;

pub use cache::PermissionCache;
pub use config::{AccessConfig, OutOfScopePolicy};
pub use planner::{PlanRequest, QueryPlan, ScopedQueryPlanner};
pub use resolver::PermissionResolver;

use hotel_types::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("identity lookup failed: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("access denied to unit {0}")]
    AccessDenied(String),
    #[error(transparent)]
    Access(#[from] AccessError),
}
