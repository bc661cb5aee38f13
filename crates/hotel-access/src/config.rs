//! Access-layer configuration.

use serde::{Deserialize, Serialize};

/// What the planner does when a caller asks for a unit outside its scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutOfScopePolicy {
    /// Silently use the first accessible unit instead.
    #[default]
    FirstAccessible,
    /// Plan matches nothing; looks like "no data" to the caller.
    Empty,
    /// Planner fails with `PlanError::AccessDenied`.
    Reject,
}

impl OutOfScopePolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "first_accessible" | "first" | "substitute" => Some(OutOfScopePolicy::FirstAccessible),
            "empty" | "none" => Some(OutOfScopePolicy::Empty),
            "reject" | "deny" => Some(OutOfScopePolicy::Reject),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AccessConfig {
    /// How long a resolved user stays cached.
    pub cache_ttl_secs: u64,
    pub cache_capacity: u64,
    /// Most values the store accepts in one membership predicate.
    pub max_in_values: usize,
    /// Result bound attached to ordinary reads.
    pub default_limit: usize,
    /// Raised bound for full-scope statistics reads; also caps explicit limits.
    pub stats_limit: usize,
    pub out_of_scope: OutOfScopePolicy,
    /// Document field holding the owning unit.
    pub unit_field: String,
    /// Date field used for ordering and the lower-bound filter.
    pub sort_field: String,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 300,
            cache_capacity: 10_000,
            max_in_values: 10,
            default_limit: 100,
            stats_limit: 1000,
            out_of_scope: OutOfScopePolicy::FirstAccessible,
            unit_field: hotel_types::fields::HOTEL_ID.to_string(),
            sort_field: hotel_types::fields::CREATED_AT.to_string(),
        }
    }
}
