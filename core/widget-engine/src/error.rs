//! FILENAME: core/widget-engine/src/error.rs
//! PURPOSE: Configuration errors and non-fatal calculation diagnostics.
//! CONTEXT: A `ConfigError` stops a widget before any record is read. Everything
//! that can go wrong with the data itself is reported as a `Diagnostic` next to
//! a normal result.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::definition::AggregationType;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid widget configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Bucket {index} has an empty field name")]
    EmptyBucketField { index: usize },

    #[error("Bucket {index} ({field}) has size 0; size must be positive")]
    ZeroBucketSize { index: usize, field: String },

    #[error("Bucket {index} ({field}) declares no ranges")]
    NoRanges { index: usize, field: String },

    #[error("Range {range} of bucket {index} has from >= to")]
    InvertedRange { index: usize, range: usize },

    #[error("Bucket {index} orders by metric {metric} but only {available} metrics are configured")]
    OrderMetricOutOfBounds {
        index: usize,
        metric: usize,
        available: usize,
    },

    #[error("Metric {index} ({agg}) requires a field")]
    EmptyMetricField { index: usize, agg: String },

    #[error("KPI trend requires a timestamp field")]
    MissingTimestampField,

    #[error("Invalid window period '{0}': expected <n><s|m|h|d|w>, e.g. \"7d\"")]
    InvalidPeriod(String),

    #[error("UTC offset of {0} minutes is out of range")]
    InvalidUtcOffset(i32),
}

/// A data-quality observation collected while calculating a widget.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Diagnostic {
    /// A referenced field holds no value in any input record.
    #[serde(rename_all = "camelCase")]
    MissingField { field: String },

    /// Non-null values a numeric metric could not read as numbers.
    #[serde(rename_all = "camelCase")]
    CoercionSkipped {
        field: String,
        agg: AggregationType,
        skipped: usize,
    },

    /// A filter with an unrecognized operator was ignored.
    #[serde(rename_all = "camelCase")]
    UnknownFilterOperator { field: String },

    /// Records left out of the KPI trend because their timestamp is unreadable.
    #[serde(rename_all = "camelCase")]
    UnreadableTimestamp { field: String, skipped: usize },

    /// No records remained to aggregate.
    EmptyInput,
}
