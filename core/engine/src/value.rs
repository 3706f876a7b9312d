//! FILENAME: core/engine/src/value.rs
//! PURPOSE: Defines the scalar value held by a single record field.
//! CONTEXT: `FieldValue` is the closed set of scalars a data source hands to the
//! widget engine. Every type coercion goes through the functions in this file so
//! that filters, buckets, metrics and trends agree on what counts as a number,
//! a timestamp, or a grouping key.

use std::borrow::Cow;
use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::de::{self, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Key used for null and missing values when grouping or counting distinct values.
pub const UNDEFINED_KEY: &str = "undefined";

/// Naive date-time layouts accepted for text timestamps (interpreted as local time).
const NAIVE_DATETIME_PATTERNS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// A single scalar value inside a record.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Number(f64),
    Text(String),
    Boolean(bool),
    /// Milliseconds since the Unix epoch (UTC).
    Timestamp(i64),
}

impl Default for FieldValue {
    fn default() -> Self {
        FieldValue::Null
    }
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Coerces the value to a finite number.
    /// Numeric text ("12.5") is accepted; booleans and timestamps are not numbers.
    pub fn to_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) if n.is_finite() => Some(*n),
            FieldValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    /// Coerces the value to epoch milliseconds.
    /// Numbers are taken as epoch milliseconds and must fall inside the
    /// calendar range. Text without an explicit offset is read as local time
    /// in `offset`.
    pub fn to_timestamp(&self, offset: FixedOffset) -> Option<i64> {
        match self {
            FieldValue::Timestamp(ms) => Some(*ms),
            FieldValue::Number(n) if n.is_finite() => {
                let ms = n.trunc() as i64;
                Utc.timestamp_millis_opt(ms).single().map(|_| ms)
            }
            FieldValue::Text(s) => parse_timestamp_text(s, offset),
            _ => None,
        }
    }

    /// The string form used for key equality (terms buckets, distinct counts).
    pub fn key_string(&self) -> Cow<'_, str> {
        match self {
            FieldValue::Null => Cow::Borrowed(UNDEFINED_KEY),
            FieldValue::Number(n) => Cow::Owned(format_plain_number(*n)),
            FieldValue::Text(s) => Cow::Borrowed(s.as_str()),
            FieldValue::Boolean(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
            FieldValue::Timestamp(ms) => Cow::Owned(timestamp_to_rfc3339(*ms)),
        }
    }

    /// Short name of the runtime type, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Number(_) => "number",
            FieldValue::Text(_) => "text",
            FieldValue::Boolean(_) => "boolean",
            FieldValue::Timestamp(_) => "timestamp",
        }
    }
}

/// Formats a number without unnecessary decimal places.
fn format_plain_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{:.0}", n)
    } else {
        format!("{}", n)
    }
}

/// Renders epoch milliseconds as RFC 3339 UTC with millisecond precision.
pub fn timestamp_to_rfc3339(ms: i64) -> String {
    match Utc.timestamp_millis_opt(ms).single() {
        Some(dt) => dt.to_rfc3339_opts(SecondsFormat::Millis, true),
        None => ms.to_string(),
    }
}

/// Parses a text timestamp. RFC 3339 carries its own offset; naive layouts
/// are resolved against `offset`.
pub fn parse_timestamp_text(text: &str, offset: FixedOffset) -> Option<i64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.timestamp_millis());
    }

    for pattern in NAIVE_DATETIME_PATTERNS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, pattern) {
            return local_to_millis(naive, offset);
        }
    }

    let date = NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()?;
    local_to_millis(date.and_hms_opt(0, 0, 0)?, offset)
}

fn local_to_millis(naive: NaiveDateTime, offset: FixedOffset) -> Option<i64> {
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.timestamp_millis())
}

// ============================================================================
// CONVERSIONS
// ============================================================================

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Number(value as f64)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Number(value as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}

/// Nested arrays and objects are outside the data contract and become `Null`.
impl From<&serde_json::Value> for FieldValue {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => FieldValue::Null,
            serde_json::Value::Bool(b) => FieldValue::Boolean(*b),
            serde_json::Value::Number(n) => n.as_f64().map_or(FieldValue::Null, FieldValue::Number),
            serde_json::Value::String(s) => FieldValue::Text(s.clone()),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => FieldValue::Null,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key_string())
    }
}

// ============================================================================
// HASHING
// ============================================================================

/// NaN values hash equal to each other, matching the pivot cache convention.
impl std::hash::Hash for FieldValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            FieldValue::Null => {}
            FieldValue::Number(n) => {
                if n.is_nan() {
                    u64::MAX.hash(state);
                } else {
                    n.to_bits().hash(state);
                }
            }
            FieldValue::Text(s) => s.hash(state),
            FieldValue::Boolean(b) => b.hash(state),
            FieldValue::Timestamp(ms) => ms.hash(state),
        }
    }
}

// ============================================================================
// SERDE
// ============================================================================

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Null => serializer.serialize_none(),
            FieldValue::Number(n) => serializer.serialize_f64(*n),
            FieldValue::Text(s) => serializer.serialize_str(s),
            FieldValue::Boolean(b) => serializer.serialize_bool(*b),
            FieldValue::Timestamp(ms) => serializer.serialize_i64(*ms),
        }
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(FieldValueVisitor)
    }
}

struct FieldValueVisitor;

impl<'de> Visitor<'de> for FieldValueVisitor {
    type Value = FieldValue;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a JSON scalar")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<FieldValue, E> {
        Ok(FieldValue::Boolean(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<FieldValue, E> {
        Ok(FieldValue::Number(v as f64))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<FieldValue, E> {
        Ok(FieldValue::Number(v as f64))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<FieldValue, E> {
        Ok(FieldValue::Number(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<FieldValue, E> {
        Ok(FieldValue::Text(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<FieldValue, E> {
        Ok(FieldValue::Text(v))
    }

    fn visit_none<E: de::Error>(self) -> Result<FieldValue, E> {
        Ok(FieldValue::Null)
    }

    fn visit_unit<E: de::Error>(self) -> Result<FieldValue, E> {
        Ok(FieldValue::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<FieldValue, D::Error> {
        deserializer.deserialize_any(FieldValueVisitor)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<FieldValue, A::Error> {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(FieldValue::Null)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<FieldValue, A::Error> {
        while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
        Ok(FieldValue::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn test_to_number_coercion() {
        assert_eq!(FieldValue::Number(4.5).to_number(), Some(4.5));
        assert_eq!(FieldValue::Text(" 12.5 ".to_string()).to_number(), Some(12.5));
        assert_eq!(FieldValue::Text("abc".to_string()).to_number(), None);
        assert_eq!(FieldValue::Boolean(true).to_number(), None);
        assert_eq!(FieldValue::Null.to_number(), None);
        assert_eq!(FieldValue::Number(f64::NAN).to_number(), None);
        assert_eq!(FieldValue::Text("inf".to_string()).to_number(), None);
    }

    #[test]
    fn test_key_string() {
        assert_eq!(FieldValue::Number(10.0).key_string(), "10");
        assert_eq!(FieldValue::Number(2.5).key_string(), "2.5");
        assert_eq!(FieldValue::Text("10".to_string()).key_string(), "10");
        assert_eq!(FieldValue::Boolean(false).key_string(), "false");
        assert_eq!(FieldValue::Null.key_string(), UNDEFINED_KEY);
        assert_eq!(
            FieldValue::Timestamp(0).key_string(),
            "1970-01-01T00:00:00.000Z"
        );
    }

    #[test]
    fn test_timestamp_parsing() {
        let day = 86_400_000;
        assert_eq!(
            FieldValue::from("1970-01-02").to_timestamp(utc()),
            Some(day)
        );
        assert_eq!(
            FieldValue::from("1970-01-02T00:00:00Z").to_timestamp(utc()),
            Some(day)
        );
        assert_eq!(
            FieldValue::from("1970-01-02 01:00:00").to_timestamp(utc()),
            Some(day + 3_600_000)
        );
        // Naive text is local time: midnight at UTC+2 is 22:00 the previous day in UTC.
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(
            FieldValue::from("1970-01-02").to_timestamp(plus_two),
            Some(day - 2 * 3_600_000)
        );
        assert_eq!(FieldValue::Number(1234.0).to_timestamp(utc()), Some(1234));
        assert_eq!(FieldValue::Number(-1234.0).to_timestamp(utc()), Some(-1234));
        assert_eq!(FieldValue::Number(1e300).to_timestamp(utc()), None);
        assert_eq!(FieldValue::Number(-1e300).to_timestamp(utc()), None);
        assert_eq!(FieldValue::Number(i64::MAX as f64).to_timestamp(utc()), None);
        assert_eq!(FieldValue::from("not a date").to_timestamp(utc()), None);
        assert_eq!(FieldValue::Boolean(true).to_timestamp(utc()), None);
    }

    #[test]
    fn test_json_round_trip_of_scalars() {
        let parsed: Vec<FieldValue> =
            serde_json::from_str(r#"[1, 2.5, "x", true, null, [1, 2], {"a": 1}]"#).unwrap();
        assert_eq!(
            parsed,
            vec![
                FieldValue::Number(1.0),
                FieldValue::Number(2.5),
                FieldValue::Text("x".to_string()),
                FieldValue::Boolean(true),
                FieldValue::Null,
                FieldValue::Null,
                FieldValue::Null,
            ]
        );
        assert_eq!(
            serde_json::to_string(&FieldValue::Timestamp(5)).unwrap(),
            "5"
        );
    }
}
