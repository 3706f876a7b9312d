//! FILENAME: core/widget-engine/src/filter.rs
//! PURPOSE: Record filtering ahead of grouping and aggregation.
//! CONTEXT: All filters of a widget must pass (logical AND). A record whose
//! field is missing or null fails every operator except `neq`. Comparisons
//! between values that cannot be coerced to a common type are false.

use std::cmp::Ordering;

use chrono::FixedOffset;
use engine::{parse_timestamp_text, FieldValue, Record};

use crate::definition::{FilterOperator, FilterSpec, FilterValue};

// ============================================================================
// PUBLIC API
// ============================================================================

/// Returns the records that pass every filter, in input order.
/// Filters with an unknown operator are skipped.
pub fn filter_records<'r>(
    records: &'r [Record],
    filters: &[FilterSpec],
    offset: FixedOffset,
) -> Vec<&'r Record> {
    let active: Vec<&FilterSpec> = filters
        .iter()
        .filter(|f| {
            if f.operator == FilterOperator::Unknown {
                log::warn!(target: "FILTER", "skipping filter on '{}': unknown operator", f.field);
                false
            } else {
                true
            }
        })
        .collect();

    if active.is_empty() {
        return records.iter().collect();
    }

    let passed: Vec<&Record> = records
        .iter()
        .filter(|record| active.iter().all(|f| matches_filter(record, f, offset)))
        .collect();

    log::debug!(
        target: "FILTER",
        "{} of {} records passed {} filters",
        passed.len(),
        records.len(),
        active.len()
    );
    passed
}

/// Evaluates a single filter against a record.
pub fn matches_filter(record: &Record, filter: &FilterSpec, offset: FixedOffset) -> bool {
    let value = record.get(&filter.field);

    match filter.operator {
        FilterOperator::Unknown => true,
        FilterOperator::Neq => match (value, &filter.value) {
            (None, _) => true,
            (Some(_), FilterValue::Scalar(FieldValue::Null)) => true,
            (Some(v), FilterValue::Scalar(target)) => {
                matches!(compare_field_values(v, target, offset), Some(o) if o != Ordering::Equal)
            }
            (Some(_), FilterValue::List(_)) => false,
        },
        operator => {
            let Some(v) = value else {
                return false;
            };
            match (operator, &filter.value) {
                (FilterOperator::In, FilterValue::List(items)) => items
                    .iter()
                    .any(|item| compare_field_values(v, item, offset) == Some(Ordering::Equal)),
                (FilterOperator::In, FilterValue::Scalar(_)) => false,
                (FilterOperator::Contains, FilterValue::Scalar(target)) => match (v, target) {
                    (FieldValue::Text(text), FieldValue::Text(needle)) => text.contains(needle.as_str()),
                    _ => false,
                },
                (_, FilterValue::Scalar(target)) => {
                    let Some(ordering) = compare_field_values(v, target, offset) else {
                        return false;
                    };
                    match operator {
                        FilterOperator::Eq => ordering == Ordering::Equal,
                        FilterOperator::Gt => ordering == Ordering::Greater,
                        FilterOperator::Gte => ordering != Ordering::Less,
                        FilterOperator::Lt => ordering == Ordering::Less,
                        FilterOperator::Lte => ordering != Ordering::Greater,
                        _ => false,
                    }
                }
                (_, FilterValue::List(_)) => false,
            }
        }
    }
}

// ============================================================================
// COMPARISON
// ============================================================================

/// Orders a record value against a filter operand.
/// Two date texts compare by instant; other texts compare lexically.
/// Returns None when the two cannot be brought to a common type.
fn compare_field_values(value: &FieldValue, target: &FieldValue, offset: FixedOffset) -> Option<Ordering> {
    match (value, target) {
        (FieldValue::Number(a), FieldValue::Number(b)) => a.partial_cmp(b),
        (FieldValue::Text(a), FieldValue::Text(b)) => {
            match (parse_timestamp_text(a, offset), parse_timestamp_text(b, offset)) {
                (Some(x), Some(y)) => Some(x.cmp(&y)),
                _ => Some(a.cmp(b)),
            }
        }
        (FieldValue::Boolean(a), FieldValue::Boolean(b)) => Some(a.cmp(b)),
        (FieldValue::Timestamp(a), _) => target.to_timestamp(offset).map(|b| a.cmp(&b)),
        (_, FieldValue::Timestamp(b)) => value.to_timestamp(offset).map(|a| a.cmp(b)),
        (FieldValue::Text(_), FieldValue::Number(b)) => value.to_number().and_then(|a| a.partial_cmp(b)),
        (FieldValue::Number(a), FieldValue::Text(_)) => target.to_number().and_then(|b| a.partial_cmp(&b)),
        _ => None,
    }
}
