//! FILENAME: core/widget-engine/src/definition.rs
//! Widget Definition - The serializable configuration.
//!
//! This module contains all the types needed to DESCRIBE a widget computation.
//! These structures are designed to be:
//! - Deserialized from the dashboard's JSON widget configuration (camelCase keys)
//! - Closed tagged variants, so the engine matches exhaustively instead of
//!   probing for optional keys
//! - Validated once at the configuration boundary (`WidgetDefinition::validate`)

use chrono::{FixedOffset, Offset, Utc};
use engine::{FieldValue, NumberFormat};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ============================================================================
// FILTERS
// ============================================================================

/// Comparison operators for filter predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterOperator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
    In,
    /// Any operator name we do not recognize. The filter is skipped.
    #[serde(other)]
    Unknown,
}

/// The right-hand side of a filter: one scalar, or a list for `in`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    List(Vec<FieldValue>),
    Scalar(FieldValue),
}

impl Default for FilterValue {
    fn default() -> Self {
        FilterValue::Scalar(FieldValue::Null)
    }
}

/// A single predicate. Filters in a widget are combined with logical AND.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSpec {
    pub field: String,
    pub operator: FilterOperator,
    #[serde(default)]
    pub value: FilterValue,
}

impl FilterSpec {
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: impl Into<FieldValue>) -> Self {
        FilterSpec {
            field: field.into(),
            operator,
            value: FilterValue::Scalar(value.into()),
        }
    }

    pub fn one_of(field: impl Into<String>, values: Vec<FieldValue>) -> Self {
        FilterSpec {
            field: field.into(),
            operator: FilterOperator::In,
            value: FilterValue::List(values),
        }
    }
}

// ============================================================================
// BUCKETS
// ============================================================================

/// Calendar intervals for date histograms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DateInterval {
    #[serde(alias = "1m")]
    Minute,
    #[serde(alias = "1h")]
    Hour,
    #[serde(alias = "1d")]
    Day,
    /// ISO weeks, starting Monday.
    #[serde(alias = "1w")]
    Week,
    #[serde(alias = "1M")]
    Month,
    #[serde(alias = "1q")]
    Quarter,
    #[serde(alias = "1y")]
    Year,
}

/// A half-open numeric range `[from, to)`. A missing bound is open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeSpec {
    #[serde(default)]
    pub from: Option<f64>,
    #[serde(default)]
    pub to: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl RangeSpec {
    pub fn new(from: Option<f64>, to: Option<f64>) -> Self {
        RangeSpec { from, to, label: None }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.from.map_or(true, |from| value >= from) && self.to.map_or(true, |to| value < to)
    }

    /// Display label: the configured label, else "from-to" with "*" for open bounds.
    pub fn display_label(&self) -> String {
        if let Some(label) = &self.label {
            return label.clone();
        }
        let bound = |b: Option<f64>| {
            b.map_or_else(|| "*".to_string(), |v| FieldValue::Number(v).key_string().into_owned())
        };
        format!("{}-{}", bound(self.from), bound(self.to))
    }
}

/// How a bucket derives its key from a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BucketKind {
    /// Group by the exact field value.
    Terms,
    /// Group by calendar-truncated timestamp.
    DateHistogram { interval: DateInterval },
    /// Group by the first matching range; unmatched records are dropped.
    Range { ranges: Vec<RangeSpec> },
}

/// What a bucket level is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "OrderByRepr", into = "OrderByRepr")]
pub enum OrderBy {
    Key,
    Count,
    /// Index into the widget's metric list.
    Metric(usize),
}

#[derive(Clone, Copy, Serialize, Deserialize)]
#[serde(untagged)]
enum OrderByRepr {
    Metric(usize),
    Named(OrderByName),
}

#[derive(Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
enum OrderByName {
    #[serde(alias = "_key")]
    Key,
    #[serde(alias = "_count")]
    Count,
}

impl From<OrderByRepr> for OrderBy {
    fn from(repr: OrderByRepr) -> Self {
        match repr {
            OrderByRepr::Metric(index) => OrderBy::Metric(index),
            OrderByRepr::Named(OrderByName::Key) => OrderBy::Key,
            OrderByRepr::Named(OrderByName::Count) => OrderBy::Count,
        }
    }
}

impl From<OrderBy> for OrderByRepr {
    fn from(order: OrderBy) -> Self {
        match order {
            OrderBy::Key => OrderByRepr::Named(OrderByName::Key),
            OrderBy::Count => OrderByRepr::Named(OrderByName::Count),
            OrderBy::Metric(index) => OrderByRepr::Metric(index),
        }
    }
}

/// Sort direction for a bucket level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Ordering rule for one bucket level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketOrder {
    pub by: OrderBy,
    /// Defaults to ascending for keys and descending for counts and metrics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<SortDirection>,
}

impl BucketOrder {
    pub fn new(by: OrderBy, direction: SortDirection) -> Self {
        BucketOrder {
            by,
            direction: Some(direction),
        }
    }

    pub fn effective_direction(&self) -> SortDirection {
        self.direction.unwrap_or(match self.by {
            OrderBy::Key => SortDirection::Asc,
            OrderBy::Count | OrderBy::Metric(_) => SortDirection::Desc,
        })
    }
}

/// One grouping dimension. A widget lists these outer to inner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketSpec {
    pub field: String,

    #[serde(flatten)]
    pub kind: BucketKind,

    /// Keep only the top `size` groups of this level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<BucketOrder>,
}

impl BucketSpec {
    pub fn terms(field: impl Into<String>) -> Self {
        BucketSpec::with_kind(field, BucketKind::Terms)
    }

    pub fn date_histogram(field: impl Into<String>, interval: DateInterval) -> Self {
        BucketSpec::with_kind(field, BucketKind::DateHistogram { interval })
    }

    pub fn range(field: impl Into<String>, ranges: Vec<RangeSpec>) -> Self {
        BucketSpec::with_kind(field, BucketKind::Range { ranges })
    }

    fn with_kind(field: impl Into<String>, kind: BucketKind) -> Self {
        BucketSpec {
            field: field.into(),
            kind,
            size: None,
            order: None,
        }
    }

    pub fn with_size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_order(mut self, order: BucketOrder) -> Self {
        self.order = Some(order);
        self
    }
}

// ============================================================================
// METRICS
// ============================================================================

/// Supported aggregation functions for metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AggregationType {
    Sum,
    #[serde(alias = "average")]
    Avg,
    Count,
    Min,
    Max,
    #[serde(alias = "distinct")]
    Cardinality,
}

impl AggregationType {
    pub fn name(&self) -> &'static str {
        match self {
            AggregationType::Sum => "sum",
            AggregationType::Avg => "avg",
            AggregationType::Count => "count",
            AggregationType::Min => "min",
            AggregationType::Max => "max",
            AggregationType::Cardinality => "cardinality",
        }
    }

    /// Whether the aggregation reads numbers from its field.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            AggregationType::Sum | AggregationType::Avg | AggregationType::Min | AggregationType::Max
        )
    }
}

/// A metric computed over every terminal group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSpec {
    /// Ignored by `count`.
    #[serde(default)]
    pub field: String,
    pub agg: AggregationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl MetricSpec {
    pub fn new(field: impl Into<String>, agg: AggregationType) -> Self {
        MetricSpec {
            field: field.into(),
            agg,
            label: None,
        }
    }

    pub fn count() -> Self {
        MetricSpec::new("", AggregationType::Count)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Display name (e.g., "sum of sales").
    pub fn display_label(&self) -> String {
        match (&self.label, self.agg) {
            (Some(label), _) => label.clone(),
            (None, AggregationType::Count) => "count".to_string(),
            (None, agg) => format!("{} of {}", agg.name(), self.field),
        }
    }
}

// ============================================================================
// KPI
// ============================================================================

/// How records are split into the current and previous trend windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TrendWindow {
    /// Split the observed time span in two equal halves.
    #[default]
    Halves,
    /// The most recent `period` against the `period` before it.
    Recent { period: WindowPeriod },
}

/// A fixed-length window such as "7d" or "12h".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WindowPeriod {
    millis: i64,
}

impl WindowPeriod {
    pub fn from_millis(millis: i64) -> Self {
        WindowPeriod { millis }
    }

    pub fn days(days: i64) -> Self {
        WindowPeriod::from_millis(days * 86_400_000)
    }

    pub fn as_millis(&self) -> i64 {
        self.millis
    }

    /// Parses "<n><unit>" with unit one of ms, s, m, h, d, w.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidPeriod(text.to_string());
        let trimmed = text.trim();
        let (amount, unit_millis) = match trimmed.strip_suffix("ms") {
            Some(amount) => (amount, 1),
            None => {
                let unit = trimmed.chars().last().ok_or_else(invalid)?;
                let unit_millis: i64 = match unit {
                    's' => 1_000,
                    'm' => 60_000,
                    'h' => 3_600_000,
                    'd' => 86_400_000,
                    'w' => 7 * 86_400_000,
                    _ => return Err(invalid()),
                };
                (&trimmed[..trimmed.len() - unit.len_utf8()], unit_millis)
            }
        };
        let amount: i64 = amount.trim().parse().map_err(|_| invalid())?;
        if amount <= 0 {
            return Err(invalid());
        }
        amount
            .checked_mul(unit_millis)
            .map(WindowPeriod::from_millis)
            .ok_or_else(invalid)
    }
}

impl TryFrom<String> for WindowPeriod {
    type Error = ConfigError;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        WindowPeriod::parse(&text)
    }
}

impl From<WindowPeriod> for String {
    fn from(period: WindowPeriod) -> Self {
        const UNITS: [(i64, char); 5] = [
            (7 * 86_400_000, 'w'),
            (86_400_000, 'd'),
            (3_600_000, 'h'),
            (60_000, 'm'),
            (1_000, 's'),
        ];
        for (unit_millis, unit) in UNITS {
            if period.millis % unit_millis == 0 {
                return format!("{}{}", period.millis / unit_millis, unit);
            }
        }
        format!("{}ms", period.millis)
    }
}

/// A band for the current KPI value. Outside the band renders as negative,
/// inside as positive, regardless of the trend sign.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ThresholdSpec {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

impl ThresholdSpec {
    pub fn contains(&self, value: f64) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }
}

/// Single-value (KPI/Card) widget configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiSpec {
    pub metric: MetricSpec,

    /// Field used to place records in trend windows.
    #[serde(default)]
    pub timestamp_field: String,

    /// When false the trend stage is skipped entirely.
    #[serde(default = "default_true")]
    pub trend: bool,

    #[serde(default)]
    pub window: TrendWindow,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<ThresholdSpec>,

    /// Treat a falling value as good news (e.g. error rates).
    #[serde(default)]
    pub lower_is_better: bool,

    /// Overrides the widget format for the KPI value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<NumberFormat>,

    /// Decimal places of the trend percentage badge.
    #[serde(default = "default_trend_decimals")]
    pub trend_decimals: u8,
}

impl KpiSpec {
    pub fn new(metric: MetricSpec, timestamp_field: impl Into<String>) -> Self {
        KpiSpec {
            metric,
            timestamp_field: timestamp_field.into(),
            trend: true,
            window: TrendWindow::Halves,
            threshold: None,
            lower_is_better: false,
            format: None,
            trend_decimals: default_trend_decimals(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_trend_decimals() -> u8 {
    1
}

// ============================================================================
// CALCULATION OPTIONS
// ============================================================================

/// Context shared by the grouping and trend stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Offset used for calendar truncation and naive text timestamps.
    pub utc_offset: FixedOffset,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            utc_offset: Utc.fix(),
        }
    }
}

impl EngineOptions {
    /// Falls back to UTC when the offset is out of range.
    pub fn with_utc_offset_minutes(minutes: i32) -> Self {
        EngineOptions {
            utc_offset: minutes
                .checked_mul(60)
                .and_then(FixedOffset::east_opt)
                .unwrap_or_else(|| Utc.fix()),
        }
    }
}

// ============================================================================
// MAIN DEFINITION STRUCT
// ============================================================================

/// The complete definition of one widget computation.
/// A widget with `kpi` set is a single-value widget; otherwise it is a chart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetDefinition {
    #[serde(default)]
    pub filters: Vec<FilterSpec>,

    /// Grouping dimensions, outer to inner.
    #[serde(default)]
    pub buckets: Vec<BucketSpec>,

    #[serde(default)]
    pub metrics: Vec<MetricSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kpi: Option<KpiSpec>,

    /// Display format for KPI values.
    #[serde(default)]
    pub format: NumberFormat,

    /// Calendar context for date truncation and for timestamps written
    /// without an offset.
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl WidgetDefinition {
    /// Parses and validates a JSON widget configuration.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let definition: WidgetDefinition = serde_json::from_str(text)?;
        definition.validate()?;
        Ok(definition)
    }

    /// Validates an already-parsed JSON configuration value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        let definition: WidgetDefinition = serde_json::from_value(value)?;
        definition.validate()?;
        Ok(definition)
    }

    pub fn is_kpi(&self) -> bool {
        self.kpi.is_some()
    }

    pub fn options(&self) -> EngineOptions {
        EngineOptions::with_utc_offset_minutes(self.utc_offset_minutes)
    }

    /// Checks the invariants serde cannot express.
    /// Unknown filter operators are accepted here; the filter pipeline skips them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self
            .utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .is_none()
        {
            return Err(ConfigError::InvalidUtcOffset(self.utc_offset_minutes));
        }

        for (index, metric) in self.metrics.iter().enumerate() {
            validate_metric(index, metric)?;
        }

        for (index, bucket) in self.buckets.iter().enumerate() {
            self.validate_bucket(index, bucket)?;
        }

        if let Some(kpi) = &self.kpi {
            validate_metric(0, &kpi.metric)?;
            if kpi.trend && kpi.timestamp_field.trim().is_empty() {
                return Err(ConfigError::MissingTimestampField);
            }
        }

        Ok(())
    }

    fn validate_bucket(&self, index: usize, bucket: &BucketSpec) -> Result<(), ConfigError> {
        if bucket.field.trim().is_empty() {
            return Err(ConfigError::EmptyBucketField { index });
        }

        if bucket.size == Some(0) {
            return Err(ConfigError::ZeroBucketSize {
                index,
                field: bucket.field.clone(),
            });
        }

        if let BucketKind::Range { ranges } = &bucket.kind {
            if ranges.is_empty() {
                return Err(ConfigError::NoRanges {
                    index,
                    field: bucket.field.clone(),
                });
            }
            for (range_index, range) in ranges.iter().enumerate() {
                if let (Some(from), Some(to)) = (range.from, range.to) {
                    if from >= to {
                        return Err(ConfigError::InvertedRange {
                            index,
                            range: range_index,
                        });
                    }
                }
            }
        }

        if let Some(BucketOrder {
            by: OrderBy::Metric(metric),
            ..
        }) = bucket.order
        {
            if metric >= self.metrics.len() {
                return Err(ConfigError::OrderMetricOutOfBounds {
                    index,
                    metric,
                    available: self.metrics.len(),
                });
            }
        }

        Ok(())
    }
}

fn validate_metric(index: usize, metric: &MetricSpec) -> Result<(), ConfigError> {
    if metric.agg != AggregationType::Count && metric.field.trim().is_empty() {
        return Err(ConfigError::EmptyMetricField {
            index,
            agg: metric.agg.name().to_string(),
        });
    }
    Ok(())
}
