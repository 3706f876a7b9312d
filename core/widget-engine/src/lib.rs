//! FILENAME: core/widget-engine/src/lib.rs
//! Dashboard widget aggregation engine.
//!
//! This crate turns a flat set of records plus a declarative widget
//! configuration into chart buckets or a single KPI value. It depends on
//! `engine` only for shared types (Record, FieldValue, NumberFormat).
//!
//! Layers:
//! - `definition`: Serializable configuration (what the widget IS)
//! - `filter`: Record predicates applied before anything else
//! - `engine`: Grouping and the widget calculator (HOW we calculate)
//! - `metrics`: Aggregations over one group of records
//! - `kpi`: Current-versus-previous trend windows
//! - `format`: KPI display strings, icon and color
//! - `view`: Renderable output for the frontend (WHAT we display)
//! - `cache`: Memoized results keyed by input fingerprint

pub mod cache;
pub mod definition;
pub mod engine;
pub mod error;
pub mod filter;
pub mod format;
pub mod kpi;
pub mod metrics;
pub mod view;

pub use cache::*;
pub use definition::*;
pub use error::{ConfigError, Diagnostic};
pub use view::*;
pub use crate::engine::{
    calculate_widget, group_records, interval_label, truncate_timestamp,
    WidgetCalculator, ALL_LABEL,
};
pub use filter::{filter_records, matches_filter};
pub use format::present_kpi;
pub use kpi::{compute_trend, KpiComputation};
pub use metrics::{aggregate, MetricAccumulator};
