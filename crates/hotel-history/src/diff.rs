//! Field-level snapshot diff.

use hotel_types::{FieldChange, Snapshot, ID_FIELD};
use std::collections::BTreeSet;

/// Names of fields that differ between `previous` and `next`.
///
/// An absent or empty side reports every field of the other side. Values are
/// compared structurally; the `id` field is never reported. Names come back
/// sorted.
pub fn diff(previous: Option<&Snapshot>, next: Option<&Snapshot>) -> Vec<String> {
    let empty = Snapshot::new();
    let prev = previous.unwrap_or(&empty);
    let next = next.unwrap_or(&empty);

    let keys: BTreeSet<&String> = prev.keys().chain(next.keys()).collect();
    keys.into_iter()
        .filter(|k| k.as_str() != ID_FIELD)
        .filter(|k| match (prev.get(*k), next.get(*k)) {
            (Some(a), Some(b)) => !a.deep_eq(b),
            _ => true,
        })
        .cloned()
        .collect()
}

/// Like [`diff`], but with the old and new values of each changed field.
pub fn field_changes(previous: Option<&Snapshot>, next: Option<&Snapshot>) -> Vec<FieldChange> {
    diff(previous, next)
        .into_iter()
        .map(|field| FieldChange {
            old: previous.and_then(|s| s.get(&field)).cloned(),
            new: next.and_then(|s| s.get(&field)).cloned(),
            field,
        })
        .collect()
}
