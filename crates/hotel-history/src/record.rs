//! Stored layout of history records and decoding of both payload shapes.

use hotel_types::{
    FieldChange, FieldValue, HistoryActor, HistoryEntry, HistoryPayload, Operation, Snapshot,
    ID_FIELD,
};

use crate::diff::diff;

pub(crate) const ENTITY_ID: &str = "entityId";
pub(crate) const ENTITY_TYPE: &str = "entityType";
pub(crate) const OPERATION: &str = "operation";
pub(crate) const USER_ID: &str = "userId";
pub(crate) const USER_NAME: &str = "userName";
pub(crate) const USER_EMAIL: &str = "userEmail";
pub(crate) const TIMESTAMP: &str = "timestamp";
pub(crate) const CHANGED_FIELDS: &str = "changedFields";
pub(crate) const PREVIOUS_STATE: &str = "previousState";
pub(crate) const NEW_STATE: &str = "newState";
pub(crate) const CHANGES: &str = "changes";

/// Label used when an actor cannot be resolved: a short prefix of the id.
pub(crate) fn unknown_actor_label(actor_id: &str) -> String {
    let short: String = actor_id.chars().take(8).collect();
    if short.is_empty() {
        "Unknown user".to_string()
    } else {
        format!("Unknown user ({})", short)
    }
}

fn string_field(doc: &Snapshot, field: &str) -> Option<String> {
    doc.get(field)
        .and_then(FieldValue::as_str)
        .map(str::to_string)
}

/// Decode a stored record. Never fails: unknown parts decode to `None` and an
/// unrecognizable payload to [`HistoryPayload::Unrecognized`].
pub(crate) fn decode(doc: &Snapshot) -> HistoryEntry {
    let actor_id = string_field(doc, USER_ID).unwrap_or_default();
    let name = string_field(doc, USER_NAME)
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| unknown_actor_label(&actor_id));
    HistoryEntry {
        id: string_field(doc, ID_FIELD).unwrap_or_default(),
        entity_id: string_field(doc, ENTITY_ID).unwrap_or_default(),
        entity_type: string_field(doc, ENTITY_TYPE).unwrap_or_default(),
        operation: doc
            .get(OPERATION)
            .and_then(FieldValue::as_str)
            .and_then(Operation::parse),
        actor: HistoryActor {
            id: actor_id,
            name,
            email: string_field(doc, USER_EMAIL),
        },
        timestamp: doc.get(TIMESTAMP).and_then(FieldValue::as_datetime),
        payload: decode_payload(doc),
    }
}

fn decode_payload(doc: &Snapshot) -> HistoryPayload {
    let changed_fields = match doc.get(CHANGED_FIELDS) {
        Some(FieldValue::Array(items)) => Some(
            items
                .iter()
                .filter_map(FieldValue::as_str)
                .map(str::to_string)
                .collect::<Vec<_>>(),
        ),
        _ => None,
    };
    let previous_state = as_snapshot(doc.get(PREVIOUS_STATE));
    let new_state = as_snapshot(doc.get(NEW_STATE));
    if changed_fields.is_some() || previous_state.is_some() || new_state.is_some() {
        return HistoryPayload::Legacy {
            changed_fields,
            previous_state,
            new_state,
        };
    }

    match doc.get(CHANGES) {
        Some(FieldValue::Array(items)) => {
            let changes: Vec<FieldChange> = items.iter().filter_map(decode_change).collect();
            if changes.is_empty() && !items.is_empty() {
                HistoryPayload::Unrecognized
            } else {
                HistoryPayload::Changes(changes)
            }
        }
        Some(FieldValue::Map(map)) => HistoryPayload::Opaque(map.clone()),
        _ => HistoryPayload::Unrecognized,
    }
}

fn as_snapshot(value: Option<&FieldValue>) -> Option<Snapshot> {
    match value {
        Some(FieldValue::Map(map)) => Some(map.clone()),
        _ => None,
    }
}

fn decode_change(item: &FieldValue) -> Option<FieldChange> {
    let FieldValue::Map(map) = item else {
        return None;
    };
    let field = map.get("field")?.as_str()?.to_string();
    Some(FieldChange {
        field,
        old: map.get("old").cloned(),
        new: map.get("new").cloned(),
    })
}

/// Before/after pairs for an entry, whichever shape it was stored in.
/// `None` for unrecognized payloads.
pub fn normalize_changes(payload: &HistoryPayload) -> Option<Vec<FieldChange>> {
    match payload {
        HistoryPayload::Legacy {
            changed_fields,
            previous_state,
            new_state,
        } => {
            let fields = changed_fields
                .clone()
                .unwrap_or_else(|| diff(previous_state.as_ref(), new_state.as_ref()));
            Some(
                fields
                    .into_iter()
                    .map(|field| FieldChange {
                        old: previous_state.as_ref().and_then(|s| s.get(&field)).cloned(),
                        new: new_state.as_ref().and_then(|s| s.get(&field)).cloned(),
                        field,
                    })
                    .collect(),
            )
        }
        HistoryPayload::Changes(changes) => Some(changes.clone()),
        HistoryPayload::Opaque(map) => Some(
            map.iter()
                .map(|(field, value)| opaque_change(field, value))
                .collect(),
        ),
        HistoryPayload::Unrecognized => None,
    }
}

// `{field: {old, new}}`, `{field: {from, to}}`, or `{field: newValue}`.
fn opaque_change(field: &str, value: &FieldValue) -> FieldChange {
    if let FieldValue::Map(inner) = value {
        for (old_key, new_key) in [("old", "new"), ("from", "to")] {
            let has_pair = inner.contains_key(old_key) || inner.contains_key(new_key);
            if has_pair && inner.keys().all(|k| k == old_key || k == new_key) {
                return FieldChange {
                    field: field.to_string(),
                    old: inner.get(old_key).cloned(),
                    new: inner.get(new_key).cloned(),
                };
            }
        }
    }
    FieldChange {
        field: field.to_string(),
        old: None,
        new: Some(value.clone()),
    }
}

/// Changed field names; recomputed from the snapshots when a legacy record
/// does not carry them.
pub fn changed_fields(payload: &HistoryPayload) -> Option<Vec<String>> {
    match payload {
        HistoryPayload::Legacy {
            changed_fields: Some(fields),
            ..
        } => Some(fields.clone()),
        HistoryPayload::Legacy {
            previous_state,
            new_state,
            ..
        } => Some(diff(previous_state.as_ref(), new_state.as_ref())),
        HistoryPayload::Changes(changes) => Some(changes.iter().map(|c| c.field.clone()).collect()),
        HistoryPayload::Opaque(map) => Some(map.keys().cloned().collect()),
        HistoryPayload::Unrecognized => None,
    }
}

/// Newest full snapshot recorded for an entity, from entries sorted
/// newest-first. For a deleted entity this is its state at deletion.
pub fn last_known_state(entries: &[HistoryEntry]) -> Option<&Snapshot> {
    entries.iter().find_map(|e| match &e.payload {
        HistoryPayload::Legacy {
            new_state,
            previous_state,
            ..
        } => new_state.as_ref().or(previous_state.as_ref()),
        _ => None,
    })
}

pub(crate) fn string_list(items: &[String]) -> FieldValue {
    FieldValue::Array(items.iter().cloned().map(FieldValue::String).collect())
}

pub(crate) fn snapshot_value(snapshot: &Snapshot) -> FieldValue {
    FieldValue::Map(snapshot.clone())
}
