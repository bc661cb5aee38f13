//! Tagged field values and document snapshots.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Identity field of every document. Never part of a diff.
pub const ID_FIELD: &str = "id";

/// A document snapshot: field name -> value, ordered by field name.
pub type Snapshot = BTreeMap<String, FieldValue>;

/// Storage timestamp in the document store's native `{seconds, nanoseconds}` shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanoseconds: u32,
}

impl Timestamp {
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self {
            seconds: dt.timestamp(),
            nanoseconds: dt.timestamp_subsec_nanos(),
        }
    }

    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.seconds, self.nanoseconds).single()
    }
}

/// One field value. Serializes to plain JSON; timestamps keep the
/// `{seconds, nanoseconds}` object shape.
///
/// Equality is structural: nested arrays and maps compare by value, an
/// integer equals a float of the same numeric value, and NaN equals NaN so
/// that any snapshot is equal to itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Timestamp(Timestamp),
    Array(Vec<FieldValue>),
    Map(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Interprets a timestamp value or an RFC 3339 string as a UTC date-time.
    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            FieldValue::Timestamp(ts) => ts.to_datetime(),
            FieldValue::String(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            _ => None,
        }
    }

    /// Structural equality over nested values.
    pub fn deep_eq(&self, other: &FieldValue) -> bool {
        match (self, other) {
            (FieldValue::Null, FieldValue::Null) => true,
            (FieldValue::Bool(a), FieldValue::Bool(b)) => a == b,
            (FieldValue::Integer(a), FieldValue::Integer(b)) => a == b,
            (FieldValue::Float(a), FieldValue::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (FieldValue::Integer(i), FieldValue::Float(f))
            | (FieldValue::Float(f), FieldValue::Integer(i)) => (*i as f64) == *f,
            (FieldValue::String(a), FieldValue::String(b)) => a == b,
            (FieldValue::Timestamp(a), FieldValue::Timestamp(b)) => a == b,
            (FieldValue::Array(a), FieldValue::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.deep_eq(y))
            }
            (FieldValue::Map(a), FieldValue::Map(b)) => {
                a.len() == b.len()
                    && a
                        .iter()
                        .all(|(k, v)| b.get(k).is_some_and(|w| v.deep_eq(w)))
            }
            _ => false,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            FieldValue::Null => serde_json::Value::Null,
            FieldValue::Bool(b) => serde_json::Value::Bool(*b),
            FieldValue::Integer(i) => serde_json::Value::from(*i),
            FieldValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            FieldValue::String(s) => serde_json::Value::String(s.clone()),
            FieldValue::Timestamp(ts) => serde_json::json!({
                "seconds": ts.seconds,
                "nanoseconds": ts.nanoseconds,
            }),
            FieldValue::Array(items) => {
                serde_json::Value::Array(items.iter().map(FieldValue::to_json).collect())
            }
            FieldValue::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        self.deep_eq(other)
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => FieldValue::Null,
            serde_json::Value::Bool(b) => FieldValue::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Integer(i),
                None => FieldValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => FieldValue::String(s),
            serde_json::Value::Array(items) => {
                FieldValue::Array(items.into_iter().map(FieldValue::from).collect())
            }
            serde_json::Value::Object(map) => {
                if let Some(ts) = timestamp_shape(&map) {
                    return FieldValue::Timestamp(ts);
                }
                FieldValue::Map(
                    map.into_iter()
                        .map(|(k, v)| (k, FieldValue::from(v)))
                        .collect(),
                )
            }
        }
    }
}

fn timestamp_shape(map: &serde_json::Map<String, serde_json::Value>) -> Option<Timestamp> {
    if map.len() != 2 {
        return None;
    }
    let seconds = map.get("seconds")?.as_i64()?;
    let nanoseconds = u32::try_from(map.get("nanoseconds")?.as_u64()?).ok()?;
    Some(Timestamp {
        seconds,
        nanoseconds,
    })
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Integer(i)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(dt: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(Timestamp::from_datetime(dt))
    }
}

impl From<Vec<FieldValue>> for FieldValue {
    fn from(items: Vec<FieldValue>) -> Self {
        FieldValue::Array(items)
    }
}

/// Ascending order over optional field values used for sorting documents.
///
/// Missing and null values sort first; dates (timestamps or RFC 3339
/// strings) compare chronologically, numbers numerically, other strings
/// lexically. Values of unrelated kinds compare equal.
pub fn compare_sort_values(a: Option<&FieldValue>, b: Option<&FieldValue>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => {
            if let (Some(dx), Some(dy)) = (x.as_datetime(), y.as_datetime()) {
                return dx.cmp(&dy);
            }
            match (x, y) {
                (FieldValue::Integer(i), FieldValue::Integer(j)) => i.cmp(j),
                (
                    FieldValue::Integer(_) | FieldValue::Float(_),
                    FieldValue::Integer(_) | FieldValue::Float(_),
                ) => as_f64(x).partial_cmp(&as_f64(y)).unwrap_or(Ordering::Equal),
                (FieldValue::String(s), FieldValue::String(t)) => s.cmp(t),
                (FieldValue::Bool(p), FieldValue::Bool(q)) => p.cmp(q),
                _ => Ordering::Equal,
            }
        }
    }
}

fn as_f64(v: &FieldValue) -> f64 {
    match v {
        FieldValue::Integer(i) => *i as f64,
        FieldValue::Float(f) => *f,
        _ => f64::NAN,
    }
}

/// Builds a snapshot from a JSON object. Non-object input yields `None`.
pub fn snapshot_from_json(value: serde_json::Value) -> Option<Snapshot> {
    match FieldValue::from(value) {
        FieldValue::Map(map) => Some(map),
        _ => None,
    }
}

pub fn snapshot_to_json(snapshot: &Snapshot) -> serde_json::Value {
    serde_json::Value::Object(
        snapshot
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect(),
    )
}
