//! Audit-trail types: operations, actors, and the two stored payload shapes.

use crate::{FieldValue, Snapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Kind of mutation recorded in the history log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "create" | "created" => Some(Operation::Create),
            "update" | "updated" => Some(Operation::Update),
            "delete" | "deleted" => Some(Operation::Delete),
            _ => None,
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Actor denormalized into the entry at write time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryActor {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// One field-level change in the newer payload shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    #[serde(default)]
    pub old: Option<FieldValue>,
    #[serde(default)]
    pub new: Option<FieldValue>,
}

/// Diff payload of a stored entry, by shape.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryPayload {
    /// `changedFields` plus full `previousState` / `newState` snapshots.
    /// `changed_fields` is `None` when the record predates that field.
    Legacy {
        changed_fields: Option<Vec<String>>,
        previous_state: Option<Snapshot>,
        new_state: Option<Snapshot>,
    },
    /// `changes` as an array of `{field, old, new}`.
    Changes(Vec<FieldChange>),
    /// `changes` as an object keyed by field name.
    Opaque(BTreeMap<String, FieldValue>),
    /// Neither shape could be recognized.
    Unrecognized,
}

/// Immutable audit record for one mutation of one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub id: String,
    pub entity_id: String,
    pub entity_type: String,
    /// `None` when the stored operation label is unknown.
    pub operation: Option<Operation>,
    pub actor: HistoryActor,
    pub timestamp: Option<DateTime<Utc>>,
    pub payload: HistoryPayload,
}
