//! Dynamic value type shared by raw inputs and typed outputs.
//!
//! Raw HTTP parameters arrive as strings (or string-keyed maps of strings);
//! non-HTTP callers may hand the engine already-typed values. Both sides of
//! the engine speak [`Value`], so a correctly-typed input passes through
//! casting unchanged.

use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;

/// An ordered string-keyed map of values.
pub type Map = IndexMap<String, Value>;

// ============================================================================
// VALUE
// ============================================================================

/// A loosely-typed value: raw input leaf, typed output leaf, rule parameter
/// or resolved default.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absent / nil.
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer number (i64).
    Int(i64),
    /// Floating point number (f64).
    Float(f64),
    /// UTF-8 string.
    Str(String),
    /// Calendar date (no time component).
    Date(NaiveDate),
    /// Date and time, naive (no timezone offset).
    DateTime(NaiveDateTime),
    /// Ordered list of values.
    List(Vec<Value>),
    /// Ordered string-keyed map.
    Map(Map),
}

impl Value {
    /// Creates a string value.
    pub fn str(v: impl Into<String>) -> Self {
        Self::Str(v.into())
    }

    /// Creates an empty map value.
    #[must_use]
    pub fn map_empty() -> Self {
        Self::Map(Map::new())
    }

    /// Returns true for `Null`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns true for the empty string.
    #[must_use]
    pub fn is_empty_str(&self) -> bool {
        matches!(self, Self::Str(s) if s.is_empty())
    }

    /// Returns true when the value is absent for required/default purposes:
    /// `Null` or the empty string.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.is_null() || self.is_empty_str()
    }

    /// Borrows the inner string, if any.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Borrows the inner map, if any.
    #[must_use]
    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Borrows the inner list, if any.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the inner integer, if any.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the inner float, widening integers.
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Looks up a key in a map value. Non-map values have no keys.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map().and_then(|m| m.get(key))
    }

    /// Converts to a `serde_json::Value`. Dates serialize as ISO-8601 strings.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(i) => serde_json::Value::from(*i),
            Self::Float(f) => serde_json::Value::from(*f),
            Self::Str(s) => serde_json::Value::String(s.clone()),
            Self::Date(d) => serde_json::Value::String(d.format("%Y-%m-%d").to_string()),
            Self::DateTime(dt) => {
                serde_json::Value::String(dt.format("%Y-%m-%dT%H:%M:%S").to_string())
            }
            Self::List(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Self::Map(m) => serde_json::Value::Object(
                m.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }

    /// Converts from a `serde_json::Value`. Numbers become `Int` when they
    /// fit in an i64, otherwise `Float`; strings stay strings (no date
    /// sniffing, casting is the engine's job).
    #[must_use]
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map_or_else(|| Self::Float(n.as_f64().unwrap_or(f64::NAN)), Self::Int),
            serde_json::Value::String(s) => Self::Str(s.clone()),
            serde_json::Value::Array(items) => {
                Self::List(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(m) => Self::Map(
                m.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl std::fmt::Display for Value {
    /// Human-readable form used inside error messages: bare strings,
    /// ISO-8601 dates, JSON for containers.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(s) => f.write_str(s),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S")),
            Self::List(_) | Self::Map(_) => write!(f, "{}", self.to_json()),
        }
    }
}

impl serde::Serialize for Value {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Self::Date(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Self::DateTime(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

// ============================================================================
// BOUNDARY HELPERS
// ============================================================================

/// Rewrites maps whose keys are all decimal indices (`{"0": .., "1": ..}`,
/// as produced by URL-encoded array parameters) into lists ordered by the
/// numeric key, recursively.
///
/// This is a boundary adaptation for web-adapter layers; the engine itself
/// only consumes already-ordered lists.
#[must_use]
pub fn normalize_indexed_lists(value: Value) -> Value {
    match value {
        Value::Map(m) => {
            let all_indices = !m.is_empty()
                && m.keys()
                    .all(|k| !k.is_empty() && k.bytes().all(|b| b.is_ascii_digit()));
            if all_indices {
                let mut entries: Vec<(usize, Value)> = m
                    .into_iter()
                    .filter_map(|(k, v)| {
                        k.parse::<usize>()
                            .ok()
                            .map(|i| (i, normalize_indexed_lists(v)))
                    })
                    .collect();
                entries.sort_by_key(|(i, _)| *i);
                Value::List(entries.into_iter().map(|(_, v)| v).collect())
            } else {
                Value::Map(
                    m.into_iter()
                        .map(|(k, v)| (k, normalize_indexed_lists(v)))
                        .collect(),
                )
            }
        }
        Value::List(items) => {
            Value::List(items.into_iter().map(normalize_indexed_lists).collect())
        }
        other => other,
    }
}

// ============================================================================
// TESTS
// ============================================================================
