//! Storage-level query description: predicates, ordering, and bound.

use crate::{FieldValue, Snapshot};
use serde::{Deserialize, Serialize};

/// Predicate the document store can evaluate server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Predicate {
    /// `field == value`
    Eq { field: String, value: String },
    /// `field IN (values)`; the store caps the number of values.
    In { field: String, values: Vec<String> },
}

impl Predicate {
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Predicate::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn is_in(field: impl Into<String>, values: Vec<String>) -> Self {
        Predicate::In {
            field: field.into(),
            values,
        }
    }

    pub fn field(&self) -> &str {
        match self {
            Predicate::Eq { field, .. } | Predicate::In { field, .. } => field,
        }
    }

    /// All values the predicate references.
    pub fn values(&self) -> Vec<&str> {
        match self {
            Predicate::Eq { value, .. } => vec![value.as_str()],
            Predicate::In { values, .. } => values.iter().map(String::as_str).collect(),
        }
    }

    pub fn matches(&self, doc: &Snapshot) -> bool {
        let Some(actual) = doc.get(self.field()).and_then(FieldValue::as_str) else {
            return false;
        };
        match self {
            Predicate::Eq { value, .. } => actual == value,
            Predicate::In { values, .. } => values.iter().any(|v| v == actual),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: SortDirection,
}

impl OrderBy {
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Query as handed to [`crate::DocumentStore::query`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StoreQuery {
    pub predicates: Vec<Predicate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<OrderBy>,
    pub limit: usize,
}

impl StoreQuery {
    pub fn matches(&self, doc: &Snapshot) -> bool {
        self.predicates.iter().all(|p| p.matches(doc))
    }
}
