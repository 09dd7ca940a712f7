//! Typed value tree produced by decode and consumed by encode.
//!
//! Plain JSON plus one extra leaf, `Date`, which only appears where a
//! descriptor asked for a timestamp.
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde_json::{Map, Number, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Date(DateTime<Utc>),
    Array(Vec<TypedValue>),
    Object(IndexMap<String, TypedValue>),
}

impl TypedValue {
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => TypedValue::Null,
            Value::Bool(b) => TypedValue::Bool(*b),
            Value::Number(n) => TypedValue::Number(n.clone()),
            Value::String(s) => TypedValue::String(s.clone()),
            Value::Array(xs) => TypedValue::Array(xs.iter().map(Self::from_json).collect()),
            Value::Object(m) => TypedValue::Object(
                m.iter().map(|(k, v)| (k.clone(), Self::from_json(v))).collect(),
            ),
        }
    }

    /// Lower to plain JSON. Dates become ISO-8601 text with millisecond
    /// precision and a `Z` suffix.
    pub fn to_json(&self) -> Value {
        match self {
            TypedValue::Null => Value::Null,
            TypedValue::Bool(b) => Value::Bool(*b),
            TypedValue::Number(n) => Value::Number(n.clone()),
            TypedValue::String(s) => Value::String(s.clone()),
            TypedValue::Date(d) => Value::String(format_timestamp(d)),
            TypedValue::Array(xs) => Value::Array(xs.iter().map(Self::to_json).collect()),
            TypedValue::Object(m) => {
                let mut out = Map::with_capacity(m.len());
                for (k, v) in m {
                    out.insert(k.clone(), v.to_json());
                }
                Value::Object(out)
            }
        }
    }

    pub fn as_date(&self) -> Option<&DateTime<Utc>> {
        match self {
            TypedValue::Date(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&IndexMap<String, TypedValue>> {
        match self {
            TypedValue::Object(m) => Some(m),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&TypedValue> {
        self.as_object().and_then(|m| m.get(key))
    }
}

impl From<&Value> for TypedValue {
    fn from(value: &Value) -> Self {
        TypedValue::from_json(value)
    }
}

impl From<TypedValue> for Value {
    fn from(value: TypedValue) -> Self {
        value.to_json()
    }
}

/// Compact JSON text, as shown in mismatch messages.
impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

/// JSON number for `n`, as an integer when it is one.
pub fn json_num_pref_i64(n: f64) -> Value {
    if n.is_finite() && n.fract() == 0.0 && n >= i64::MIN as f64 && n <= i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        Value::from(n)
    }
}

pub fn format_timestamp(d: &DateTime<Utc>) -> String {
    d.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse timestamp text. Offsets are honored; text without an offset is
/// taken as UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(d) = DateTime::parse_from_rfc3339(s) {
        return Some(d.with_timezone(&Utc));
    }
    if let Ok(d) = DateTime::parse_from_rfc2822(s) {
        return Some(d.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
