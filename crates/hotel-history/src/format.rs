//! Human-readable rendering of history entries.

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, Offset, Utc};
use hotel_types::{FieldValue, HistoryEntry, Operation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::record::{normalize_changes, unknown_actor_label};

pub const NOT_SET: &str = "Not set";
pub const DETAILS_UNAVAILABLE: &str = "Details unavailable";
const COMPLEX_OBJECT: &str = "Complex object";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FormatterOptions {
    /// Offset applied to timestamps before display.
    pub utc_offset_minutes: i32,
    /// strftime pattern for dates.
    pub date_format: String,
    /// Longest rendering of a nested object before it is cut.
    pub object_char_budget: usize,
    /// Characters kept when shortening identifiers.
    pub id_prefix_len: usize,
}

impl Default for FormatterOptions {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 0,
            date_format: "%d/%m/%Y %H:%M".to_string(),
            object_char_budget: 50,
            id_prefix_len: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryHeader {
    /// "Created", "Updated", "Deleted", or "Changed".
    pub operation: String,
    pub actor: String,
    pub timestamp: String,
}

impl std::fmt::Display for EntryHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} by {} on {}", self.operation, self.actor, self.timestamp)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormattedChange {
    pub field: String,
    pub label: String,
    pub old: String,
    pub new: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormattedEntry {
    pub id: String,
    pub header: EntryHeader,
    pub changes: Vec<FormattedChange>,
    /// Set when the payload could not be interpreted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

/// Renders [`HistoryEntry`] values. Pure; never fails.
#[derive(Debug, Clone, Default)]
pub struct Formatter {
    options: FormatterOptions,
    /// Raw id -> display name supplied by the caller (e.g. hotel names).
    hints: HashMap<String, String>,
}

impl Formatter {
    /// An unparsable `date_format` is replaced by the default pattern.
    pub fn new(mut options: FormatterOptions) -> Self {
        if !is_valid_date_format(&options.date_format) {
            let fallback = FormatterOptions::default().date_format;
            tracing::warn!(
                date_format = %options.date_format,
                fallback = %fallback,
                "invalid date format, using default"
            );
            options.date_format = fallback;
        }
        Self {
            options,
            hints: HashMap::new(),
        }
    }

    pub fn with_hints<I, K, V>(mut self, hints: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.hints
            .extend(hints.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn format(&self, entry: &HistoryEntry) -> FormattedEntry {
        let header = EntryHeader {
            operation: match entry.operation {
                Some(Operation::Create) => "Created",
                Some(Operation::Update) => "Updated",
                Some(Operation::Delete) => "Deleted",
                None => "Changed",
            }
            .to_string(),
            actor: if entry.actor.name.trim().is_empty() {
                unknown_actor_label(&entry.actor.id)
            } else {
                entry.actor.name.clone()
            },
            timestamp: entry
                .timestamp
                .map(|t| self.format_date(t))
                .unwrap_or_else(|| "Unknown date".to_string()),
        };

        let Some(changes) = normalize_changes(&entry.payload) else {
            return FormattedEntry {
                id: entry.id.clone(),
                header,
                changes: Vec::new(),
                notice: Some(DETAILS_UNAVAILABLE.to_string()),
            };
        };
        let changes = changes
            .iter()
            .map(|c| FormattedChange {
                label: field_label(&c.field)
                    .map(str::to_string)
                    .unwrap_or_else(|| c.field.clone()),
                old: self.format_value(&c.field, c.old.as_ref()),
                new: self.format_value(&c.field, c.new.as_ref()),
                field: c.field.clone(),
            })
            .collect();
        FormattedEntry {
            id: entry.id.clone(),
            header,
            changes,
            notice: None,
        }
    }

    /// Display string for one field value.
    pub fn format_value(&self, field: &str, value: Option<&FieldValue>) -> String {
        let Some(value) = value.filter(|v| !v.is_null()) else {
            return NOT_SET.to_string();
        };
        match value {
            FieldValue::Null => NOT_SET.to_string(),
            FieldValue::Bool(true) => "Yes".to_string(),
            FieldValue::Bool(false) => "No".to_string(),
            FieldValue::Timestamp(ts) => match ts.to_datetime() {
                Some(dt) => self.format_date(dt),
                None => NOT_SET.to_string(),
            },
            FieldValue::String(s) => {
                if is_date_field(field) {
                    if let Some(dt) = value.as_datetime() {
                        return self.format_date(dt);
                    }
                }
                if is_id_field(field) {
                    return self.format_id(s);
                }
                s.clone()
            }
            FieldValue::Integer(i) => i.to_string(),
            FieldValue::Float(f) => f.to_string(),
            FieldValue::Array(items) if items.len() == 1 => "1 item".to_string(),
            FieldValue::Array(items) => format!("{} items", items.len()),
            FieldValue::Map(map) => {
                if let Some(dt) = underscore_timestamp(map) {
                    return self.format_date(dt);
                }
                match serde_json::to_string(&value.to_json()) {
                    Ok(text) => truncate(&text, self.options.object_char_budget),
                    Err(_) => COMPLEX_OBJECT.to_string(),
                }
            }
        }
    }

    fn format_id(&self, id: &str) -> String {
        if let Some(name) = self.hints.get(id) {
            return name.clone();
        }
        if id.chars().count() > self.options.id_prefix_len {
            let short: String = id.chars().take(self.options.id_prefix_len).collect();
            format!("{}...", short)
        } else {
            id.to_string()
        }
    }

    fn format_date(&self, dt: DateTime<Utc>) -> String {
        let offset = FixedOffset::east_opt(self.options.utc_offset_minutes.saturating_mul(60))
            .unwrap_or_else(|| Utc.fix());
        dt.with_timezone(&offset)
            .format(&self.options.date_format)
            .to_string()
    }
}

/// True when chrono can render every item of a strftime pattern.
pub fn is_valid_date_format(pattern: &str) -> bool {
    StrftimeItems::new(pattern).all(|item| !matches!(item, Item::Error))
}

fn truncate(text: &str, budget: usize) -> String {
    if text.chars().count() <= budget {
        text.to_string()
    } else {
        let cut: String = text.chars().take(budget).collect();
        format!("{}...", cut)
    }
}

// `{_seconds, _nanoseconds}` as written by some SDK serializers.
fn underscore_timestamp(
    map: &std::collections::BTreeMap<String, FieldValue>,
) -> Option<DateTime<Utc>> {
    let FieldValue::Integer(seconds) = map.get("_seconds")? else {
        return None;
    };
    let nanos = match map.get("_nanoseconds") {
        Some(FieldValue::Integer(n)) => u32::try_from(*n).ok()?,
        _ => 0,
    };
    DateTime::from_timestamp(*seconds, nanos)
}

fn is_date_field(field: &str) -> bool {
    field.ends_with("At") || field.ends_with("Date") || field.eq_ignore_ascii_case("date")
}

const ID_FIELDS: &[&str] = &["id", "createdBy", "updatedBy", "assignedTo", "reportedBy"];

fn is_id_field(field: &str) -> bool {
    field.ends_with("Id") || ID_FIELDS.contains(&field)
}

/// Display label for known entity fields.
pub fn field_label(field: &str) -> Option<&'static str> {
    Some(match field {
        "id" => "Identifier",
        "hotelId" => "Hotel",
        "status" => "Status",
        "title" => "Title",
        "description" => "Description",
        "category" => "Category",
        "priority" => "Priority",
        "location" => "Location",
        "room" => "Room",
        "createdAt" => "Created at",
        "updatedAt" => "Updated at",
        "createdBy" => "Created by",
        "updatedBy" => "Updated by",
        "assignedTo" => "Assigned to",
        "reportedBy" => "Reported by",
        "dueDate" => "Due date",
        "resolvedAt" => "Resolved at",
        "resolution" => "Resolution",
        "isUrgent" => "Urgent",
        "estimatedCost" => "Estimated cost",
        "quoteAmount" => "Quote amount",
        "quoteStatus" => "Quote status",
        "supplierId" => "Supplier",
        "technicianId" => "Technician",
        "itemName" => "Item",
        "foundAt" => "Found at",
        "foundBy" => "Found by",
        "foundLocation" => "Found location",
        "returnedAt" => "Returned at",
        "returnedTo" => "Returned to",
        "photoUrl" => "Photo",
        "photos" => "Photos",
        "notes" => "Notes",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hotel_types::{
        snapshot_from_json, FieldChange, HistoryActor, HistoryPayload, Snapshot, Timestamp,
    };
    use serde_json::json;
    use std::collections::BTreeMap;

    fn snap(v: serde_json::Value) -> Snapshot {
        snapshot_from_json(v).unwrap()
    }

    fn entry(operation: Option<Operation>, payload: HistoryPayload) -> HistoryEntry {
        HistoryEntry {
            id: "h1".to_string(),
            entity_id: "i1".to_string(),
            entity_type: "incident".to_string(),
            operation,
            actor: HistoryActor {
                id: "u1".to_string(),
                name: "Ana".to_string(),
                email: None,
            },
            timestamp: "2024-01-05T10:30:00Z".parse().ok(),
            payload,
        }
    }

    fn value(field: &str, v: serde_json::Value) -> String {
        Formatter::default().format_value(field, Some(&FieldValue::from(v)))
    }

    #[test]
    fn header_names_operation_actor_and_local_time() {
        let f = Formatter::new(FormatterOptions {
            utc_offset_minutes: 60,
            ..FormatterOptions::default()
        });
        let out = f.format(&entry(Some(Operation::Update), HistoryPayload::Changes(vec![])));
        assert_eq!(out.header.to_string(), "Updated by Ana on 05/01/2024 11:30");
    }

    #[test]
    fn invalid_date_pattern_falls_back_to_default() {
        assert!(!is_valid_date_format("%Q"));
        assert!(is_valid_date_format("%Y-%m-%d"));
        let f = Formatter::new(FormatterOptions {
            date_format: "%Q".to_string(),
            ..FormatterOptions::default()
        });
        let out = f.format(&entry(Some(Operation::Update), HistoryPayload::Changes(vec![])));
        assert_eq!(out.header.timestamp, "05/01/2024 10:30");
    }

    #[test]
    fn every_shape_formats_with_a_header() {
        let payloads = vec![
            HistoryPayload::Legacy {
                changed_fields: None,
                previous_state: Some(snap(json!({"status": "open"}))),
                new_state: Some(snap(json!({"status": "closed"}))),
            },
            HistoryPayload::Legacy {
                changed_fields: Some(vec!["status".into()]),
                previous_state: None,
                new_state: None,
            },
            HistoryPayload::Changes(vec![FieldChange {
                field: "status".into(),
                old: None,
                new: Some(FieldValue::from("open")),
            }]),
            HistoryPayload::Opaque(BTreeMap::from([(
                "status".to_string(),
                FieldValue::from("open"),
            )])),
            HistoryPayload::Unrecognized,
        ];
        let f = Formatter::default();
        for op in [None, Some(Operation::Create), Some(Operation::Delete)] {
            for p in &payloads {
                let mut e = entry(op, p.clone());
                e.timestamp = None;
                e.actor.name = String::new();
                let out = f.format(&e);
                assert!(!out.header.to_string().is_empty());
                assert!(!out.header.actor.is_empty());
            }
        }
    }

    #[test]
    fn unrecognized_payload_renders_notice() {
        let out = Formatter::default().format(&entry(None, HistoryPayload::Unrecognized));
        assert!(out.changes.is_empty());
        assert_eq!(out.notice.as_deref(), Some(DETAILS_UNAVAILABLE));
        assert_eq!(out.header.operation, "Changed");
    }

    #[test]
    fn known_fields_get_labels_unknown_stay_verbatim() {
        let out = Formatter::default().format(&entry(
            Some(Operation::Update),
            HistoryPayload::Changes(vec![
                FieldChange {
                    field: "status".into(),
                    old: Some(FieldValue::from("open")),
                    new: Some(FieldValue::from("resolved")),
                },
                FieldChange {
                    field: "customThing".into(),
                    old: None,
                    new: Some(FieldValue::from("x")),
                },
            ]),
        ));
        assert_eq!(out.changes[0].label, "Status");
        assert_eq!(out.changes[1].label, "customThing");
        assert_eq!(out.changes[1].old, NOT_SET);
    }

    #[test]
    fn dates_by_shape_and_by_name() {
        let ts = FieldValue::Timestamp(Timestamp {
            seconds: 1704450600,
            nanoseconds: 0,
        });
        let f = Formatter::default();
        assert_eq!(f.format_value("anything", Some(&ts)), "05/01/2024 10:30");
        assert_eq!(value("dueDate", json!("2024-01-05T10:30:00Z")), "05/01/2024 10:30");
        assert_eq!(value("title", json!("2024-01-05T10:30:00Z")), "2024-01-05T10:30:00Z");
        assert_eq!(
            value("foundAt", json!({"_seconds": 1704450600, "_nanoseconds": 0})),
            "05/01/2024 10:30"
        );
    }

    #[test]
    fn scalars_and_missing_values() {
        assert_eq!(value("isUrgent", json!(true)), "Yes");
        assert_eq!(value("isUrgent", json!(false)), "No");
        assert_eq!(value("priority", json!(3)), "3");
        assert_eq!(value("notes", json!(null)), NOT_SET);
        assert_eq!(Formatter::default().format_value("notes", None), NOT_SET);
    }

    #[test]
    fn identifiers_are_shortened_unless_hinted() {
        assert_eq!(value("hotelId", json!("abcdefghijklmnop")), "abcdefgh...");
        assert_eq!(value("createdBy", json!("u-12345678901")), "u-123456...");
        assert_eq!(value("hotelId", json!("H1")), "H1");

        let f = Formatter::default().with_hints([("abcdefghijklmnop", "Hotel Lumière")]);
        let v = FieldValue::from("abcdefghijklmnop");
        assert_eq!(f.format_value("hotelId", Some(&v)), "Hotel Lumière");
    }

    #[test]
    fn collections_render_as_counts_or_truncated_json() {
        assert_eq!(value("photos", json!(["a", "b", "c"])), "3 items");
        assert_eq!(value("photos", json!(["a"])), "1 item");
        assert_eq!(value("location", json!({"floor": 2})), r#"{"floor":2}"#);

        let long = value(
            "location",
            json!({"description": "a very long nested description that exceeds the budget"}),
        );
        assert!(long.ends_with("..."));
        assert_eq!(long.chars().count(), 53);
    }
}
