//! FILENAME: core/widget-engine/src/view.rs
//! Widget View - The calculated output handed to the rendering layer.
//!
//! Chart widgets produce a flat list of leaf buckets. KPI widgets produce a
//! single value with its trend and display strings. Both are serialized as
//! camelCase JSON.

use engine::FieldValue;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use smallvec::SmallVec;

use crate::definition::AggregationType;
use crate::error::Diagnostic;

// ============================================================================
// CHART OUTPUT
// ============================================================================

/// One level of a composite bucket key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyPart {
    pub field: String,
    pub value: FieldValue,
}

/// Composite keys rarely exceed a handful of levels.
pub type KeyParts = SmallVec<[KeyPart; 4]>;

/// The key of a leaf bucket.
/// A single grouping level yields its scalar key; nested levels yield an
/// ordered field-to-value map, serialized as a JSON object.
#[derive(Debug, Clone, PartialEq)]
pub enum BucketKey {
    Single(FieldValue),
    Composite(KeyParts),
}

impl BucketKey {
    /// The key value for `field`, if it is part of this key.
    pub fn part(&self, field: &str) -> Option<&FieldValue> {
        match self {
            BucketKey::Single(_) => None,
            BucketKey::Composite(parts) => parts.iter().find(|p| p.field == field).map(|p| &p.value),
        }
    }
}

impl Serialize for BucketKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            BucketKey::Single(value) => value.serialize(serializer),
            BucketKey::Composite(parts) => {
                let mut map = serializer.serialize_map(Some(parts.len()))?;
                for part in parts {
                    map.serialize_entry(&part.field, &part.value)?;
                }
                map.end()
            }
        }
    }
}

/// A computed metric for one bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricValue {
    pub field: String,
    pub agg: AggregationType,
    pub label: String,
    pub value: f64,
}

/// A terminal group of a chart widget.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketResult {
    pub key: BucketKey,
    /// Display label; nested levels are joined with " / ".
    pub label: String,
    pub metrics: Vec<MetricValue>,
    /// Number of records in the group.
    pub count: usize,
}

impl BucketResult {
    /// Value of the metric at `index`, or 0 when there is none.
    pub fn metric(&self, index: usize) -> f64 {
        self.metrics.get(index).map_or(0.0, |m| m.value)
    }
}

// ============================================================================
// KPI OUTPUT
// ============================================================================

/// Direction of change between the previous and current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Trend {
    Up,
    Down,
    Flat,
}

/// Raw KPI numbers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiResult {
    /// Metric over the current window (or all records when trend is off).
    pub value: f64,
    /// current - previous.
    pub trend_value: f64,
    /// Percentage change; 100 when the previous window is 0 and the current is not.
    pub trend_percent: f64,
    pub trend: Trend,
}

impl KpiResult {
    pub fn from_windows(current: f64, previous: f64) -> Self {
        let trend_value = current - previous;
        let trend_percent = if previous == 0.0 {
            if current == 0.0 {
                0.0
            } else {
                100.0
            }
        } else {
            trend_value / previous * 100.0
        };
        let trend = if trend_value > 0.0 {
            Trend::Up
        } else if trend_value < 0.0 {
            Trend::Down
        } else {
            Trend::Flat
        };

        KpiResult {
            value: current,
            trend_value,
            trend_percent,
            trend,
        }
    }

    pub fn without_trend(value: f64) -> Self {
        KpiResult {
            value,
            trend_value: 0.0,
            trend_percent: 0.0,
            trend: Trend::Flat,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TrendIcon {
    ArrowUp,
    ArrowDown,
    Flat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TrendColor {
    Positive,
    Negative,
    Neutral,
}

/// KPI numbers plus their presentation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiView {
    #[serde(flatten)]
    pub result: KpiResult,
    pub formatted_value: String,
    pub formatted_trend: String,
    pub icon: TrendIcon,
    pub color: TrendColor,
    pub trend_enabled: bool,
    pub current_count: usize,
    pub previous_count: usize,
}

// ============================================================================
// WIDGET OUTPUT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WidgetKind {
    Chart,
    Kpi,
}

/// `NoData` lets the rendering layer show an empty state instead of zeros.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DataStatus {
    Ok,
    NoData,
}

/// Everything one widget calculation produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetOutput {
    pub kind: WidgetKind,
    pub status: DataStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buckets: Option<Vec<BucketResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kpi: Option<KpiView>,
    pub total_records: usize,
    pub matched_records: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl WidgetOutput {
    pub fn bucket_results(&self) -> &[BucketResult] {
        self.buckets.as_deref().unwrap_or(&[])
    }

    pub fn has_diagnostic(&self, predicate: impl Fn(&Diagnostic) -> bool) -> bool {
        self.diagnostics.iter().any(predicate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use smallvec::smallvec;

    #[test]
    fn test_composite_key_serializes_as_object() {
        let key = BucketKey::Composite(smallvec![
            KeyPart {
                field: "region".to_string(),
                value: FieldValue::from("EU"),
            },
            KeyPart {
                field: "year".to_string(),
                value: FieldValue::Number(2024.0),
            },
        ]);
        assert_eq!(
            serde_json::to_value(&key).unwrap(),
            json!({"region": "EU", "year": 2024.0})
        );
        assert_eq!(key.part("region"), Some(&FieldValue::from("EU")));
        assert_eq!(
            serde_json::to_value(BucketKey::Single(FieldValue::Null)).unwrap(),
            json!(null)
        );
    }

    #[test]
    fn test_trend_from_windows() {
        let up = KpiResult::from_windows(120.0, 100.0);
        assert_eq!(up.trend, Trend::Up);
        assert!((up.trend_percent - 20.0).abs() < 1e-9);

        let from_zero = KpiResult::from_windows(5.0, 0.0);
        assert_eq!(from_zero.trend_percent, 100.0);

        let flat = KpiResult::from_windows(0.0, 0.0);
        assert_eq!(flat.trend, Trend::Flat);
        assert_eq!(flat.trend_percent, 0.0);

        let down = KpiResult::from_windows(50.0, 100.0);
        assert_eq!(down.trend, Trend::Down);
        assert_eq!(down.trend_value, -50.0);
    }

    #[test]
    fn test_kpi_view_flattens_result() {
        let view = KpiView {
            result: KpiResult::without_trend(3.0),
            formatted_value: "3".to_string(),
            formatted_trend: "0.0%".to_string(),
            icon: TrendIcon::Flat,
            color: TrendColor::Neutral,
            trend_enabled: false,
            current_count: 3,
            previous_count: 0,
        };
        let value = serde_json::to_value(&view).unwrap();
        assert_eq!(value["value"], json!(3.0));
        assert_eq!(value["trend"], json!("flat"));
        assert_eq!(value["icon"], json!("flat"));
        assert_eq!(value["formattedValue"], json!("3"));
    }
}
