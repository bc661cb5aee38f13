//! Request and response DTOs for the entity services and the HTTP API.

use crate::Snapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Read options for listing entities.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListOptions {
    /// Hotel id, `"all"`, or absent.
    #[serde(default)]
    pub hotel: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    /// Lower bound on the sort date, applied after fetch.
    #[serde(default)]
    pub since: Option<DateTime<Utc>>,
    /// Overrides the default result bound.
    #[serde(default)]
    pub limit: Option<usize>,
}

/// List request (`POST /api/:kind/list`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListRequest {
    /// Caller identity: email or user id.
    pub actor: String,
    #[serde(flatten)]
    pub options: ListOptions,
}

/// Stats request (`POST /api/:kind/stats`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsRequest {
    pub actor: String,
    #[serde(default)]
    pub hotel: Option<String>,
}

/// Request addressing one entity (`get`, `delete`, `history`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRequest {
    pub actor: String,
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRequest {
    pub actor: String,
    pub data: Snapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRequest {
    pub actor: String,
    pub id: String,
    pub data: Snapshot,
}

/// Response envelope: HTTP status stays 200, `code` carries the outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseResponse<T> {
    #[serde(default = "default_code")]
    pub code: i32,
    pub message: String,
    #[serde(default)]
    pub data: Option<T>,
    /// Non-fatal warning, e.g. a history append that failed after the write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

fn default_code() -> i32 {
    200
}

impl<T> BaseResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            code: 200,
            message: message.into(),
            data: Some(data),
            warning: None,
        }
    }

    pub fn error(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
            warning: None,
        }
    }
}

/// Dashboard counters for one entity kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityStats {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
}

/// Whether the audit entry for a mutation was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HistoryStatus {
    Recorded { entry_id: String },
    /// The mutation committed, the audit write did not.
    Failed { reason: String },
}

/// Result of a create/update/delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationOutcome {
    pub id: String,
    pub history: HistoryStatus,
}

impl MutationOutcome {
    pub fn history_entry_id(&self) -> Option<&str> {
        match &self.history {
            HistoryStatus::Recorded { entry_id } => Some(entry_id),
            HistoryStatus::Failed { .. } => None,
        }
    }

    pub fn warning(&self) -> Option<String> {
        match &self.history {
            HistoryStatus::Recorded { .. } => None,
            HistoryStatus::Failed { reason } => {
                Some(format!("change saved but history was not recorded: {}", reason))
            }
        }
    }
}
