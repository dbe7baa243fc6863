//! Lenient coercion of raw collector fields.
//!
//! Collectors store whatever the upstream API returned: counts as numbers or
//! numeric strings, JSON blobs as objects or as serialized text, durations as
//! ISO-8601 strings. Every function here is total; a value that cannot be
//! understood comes back as [`Field::Malformed`] and the caller decides how
//! to degrade it.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::models::JsonObject;

/// ISO-8601 duration as used by video APIs: "PT4M13S", "PT1H2M", "P1DT3S", "P0D"
static ISO_DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?)?$").unwrap()
});

/// Outcome of coercing one raw field.
#[derive(Debug, Clone, PartialEq)]
pub enum Field<T> {
    /// Absent or null
    Missing,
    Valid(T),
    /// Present but not understood
    Malformed,
}

impl<T> Field<T> {
    pub fn is_malformed(&self) -> bool {
        matches!(self, Field::Malformed)
    }

    /// Numeric policy: malformed values become unknown.
    pub fn into_option(self) -> Option<T> {
        match self {
            Field::Valid(v) => Some(v),
            Field::Missing | Field::Malformed => None,
        }
    }
}

impl<T: Default> Field<T> {
    /// Blob policy: malformed values become present-but-empty.
    pub fn into_option_or_empty(self) -> Option<T> {
        match self {
            Field::Valid(v) => Some(v),
            Field::Malformed => Some(T::default()),
            Field::Missing => None,
        }
    }
}

// ============================================================================
// Numerics
// ============================================================================

fn float_to_int(f: f64) -> Field<i64> {
    if f.is_finite() && f.abs() < i64::MAX as f64 {
        Field::Valid(f.trunc() as i64)
    } else {
        Field::Malformed
    }
}

/// Coerce a count or position. Accepts integers, floats (truncated) and
/// numeric strings; blank strings count as missing.
pub fn coerce_int(value: Option<&Value>) -> Field<i64> {
    match value {
        None | Some(Value::Null) => Field::Missing,
        Some(Value::Number(n)) => match n.as_i64() {
            Some(i) => Field::Valid(i),
            None => n.as_f64().map_or(Field::Malformed, float_to_int),
        },
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                Field::Missing
            } else if let Ok(i) = s.parse::<i64>() {
                Field::Valid(i)
            } else {
                s.parse::<f64>().map_or(Field::Malformed, float_to_int)
            }
        }
        Some(_) => Field::Malformed,
    }
}

/// Parse an ISO-8601 duration into whole seconds.
pub fn parse_iso_duration(value: Option<&str>) -> Field<i64> {
    let Some(raw) = value.map(str::trim).filter(|s| !s.is_empty()) else {
        return Field::Missing;
    };

    let Some(caps) = ISO_DURATION.captures(raw) else {
        return Field::Malformed;
    };
    // "P" and "PT" match the shape but carry no component
    if (1..=4).all(|i| caps.get(i).is_none()) {
        return Field::Malformed;
    }

    let mut seconds: i64 = 0;
    for (group, unit) in [(1, 86_400i64), (2, 3_600), (3, 60), (4, 1)] {
        if let Some(m) = caps.get(group) {
            let Ok(n) = m.as_str().parse::<i64>() else {
                return Field::Malformed;
            };
            seconds = match n.checked_mul(unit).and_then(|v| seconds.checked_add(v)) {
                Some(total) => total,
                None => return Field::Malformed,
            };
        }
    }
    Field::Valid(seconds)
}

// ============================================================================
// JSON blobs
// ============================================================================

/// Parse `additional_info`: an object, or a string holding one.
/// An empty string is an empty object.
pub fn parse_json_object(value: Option<&Value>) -> Field<JsonObject> {
    match value {
        None | Some(Value::Null) => Field::Missing,
        Some(Value::Object(map)) => Field::Valid(map.clone()),
        Some(Value::String(s)) if s.trim().is_empty() => Field::Valid(JsonObject::new()),
        Some(Value::String(s)) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Object(map)) => Field::Valid(map),
            _ => Field::Malformed,
        },
        Some(_) => Field::Malformed,
    }
}

fn tag_list(items: &[Value]) -> Vec<String> {
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        })
        .collect()
}

/// Parse `tags`: an array, or a string holding one.
/// An empty string is an empty list.
pub fn parse_tags(value: Option<&Value>) -> Field<Vec<String>> {
    match value {
        None | Some(Value::Null) => Field::Missing,
        Some(Value::Array(items)) => Field::Valid(tag_list(items)),
        Some(Value::String(s)) if s.trim().is_empty() => Field::Valid(Vec::new()),
        Some(Value::String(s)) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Array(items)) => Field::Valid(tag_list(&items)),
            _ => Field::Malformed,
        },
        Some(_) => Field::Malformed,
    }
}
