//! FILENAME: core/engine/src/record.rs
//! PURPOSE: A flat row of named scalar values, as handed over by a data source.
//! CONTEXT: Field order is irrelevant. A `Null` value and a missing field are
//! treated the same by every lookup in this module.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::ValueError;
use crate::value::FieldValue;

/// A single source row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: FxHashMap<String, FieldValue>,
}

impl Record {
    pub fn new() -> Self {
        Record {
            fields: FxHashMap::default(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Record {
            fields: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    /// Sets a field, replacing any previous value.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Builder-style variant of `insert`.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(field, value);
        self
    }

    /// Returns the value of a field, or `None` when it is missing or null.
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field).filter(|v| !v.is_null())
    }

    /// Whether the field holds a non-null value.
    pub fn has_value(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }

    /// Entries sorted by field name. Gives a canonical order for hashing.
    pub fn sorted_entries(&self) -> Vec<(&String, &FieldValue)> {
        let mut entries: Vec<_> = self.fields.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }

    /// Builds a record from a JSON object.
    pub fn from_json(value: &serde_json::Value) -> Result<Record, ValueError> {
        let object = value
            .as_object()
            .ok_or_else(|| ValueError::NotAnObject(json_type_name(value).to_string()))?;

        let mut record = Record::with_capacity(object.len());
        for (key, field_value) in object {
            record.insert(key.clone(), FieldValue::from(field_value));
        }
        Ok(record)
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (field, value) in iter {
            record.insert(field, value);
        }
        record
    }
}

/// Parses a JSON array of objects into records.
pub fn records_from_json(value: &serde_json::Value) -> Result<Vec<Record>, ValueError> {
    let rows = value
        .as_array()
        .ok_or_else(|| ValueError::NotAnArray(json_type_name(value).to_string()))?;
    rows.iter().map(Record::from_json).collect()
}

/// Parses a JSON document holding an array of objects into records.
pub fn records_from_json_str(text: &str) -> Result<Vec<Record>, ValueError> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    records_from_json(&value)
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
