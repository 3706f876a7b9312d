//! FILENAME: core/widget-engine/src/metrics.rs
//! PURPOSE: Metric aggregation over a group of records.
//! CONTEXT: Numeric aggregations read values through `FieldValue::to_number`.
//! Null and missing values are ignored; non-null values that are not numbers
//! are skipped and counted so the caller can report them. An aggregation with
//! no usable values yields 0.

use engine::Record;
use rustc_hash::FxHashSet;

use crate::definition::{AggregationType, MetricSpec};
use crate::view::MetricValue;

/// Running state for one metric over one group.
#[derive(Debug, Clone)]
pub struct MetricAccumulator {
    agg: AggregationType,
    /// Records seen, whatever their value.
    records: usize,
    sum: f64,
    count_numbers: usize,
    min: Option<f64>,
    max: Option<f64>,
    skipped: usize,
    distinct: FxHashSet<String>,
}

impl MetricAccumulator {
    pub fn new(agg: AggregationType) -> Self {
        MetricAccumulator {
            agg,
            records: 0,
            sum: 0.0,
            count_numbers: 0,
            min: None,
            max: None,
            skipped: 0,
            distinct: FxHashSet::default(),
        }
    }

    /// Feeds the value of `field` in `record` into the accumulator.
    pub fn add(&mut self, record: &Record, field: &str) {
        self.records += 1;

        match self.agg {
            AggregationType::Count => {}
            AggregationType::Cardinality => {
                if let Some(value) = record.get(field) {
                    self.distinct.insert(value.key_string().into_owned());
                }
            }
            AggregationType::Sum | AggregationType::Avg | AggregationType::Min | AggregationType::Max => {
                match record.get(field).map(|v| v.to_number()) {
                    Some(Some(n)) => self.add_number(n),
                    Some(None) => self.skipped += 1,
                    None => {}
                }
            }
        }
    }

    fn add_number(&mut self, value: f64) {
        self.count_numbers += 1;
        self.sum += value;
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
    }

    /// Non-null values that could not be read as numbers.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Computes the final aggregate value.
    pub fn compute(&self) -> f64 {
        match self.agg {
            AggregationType::Sum => self.sum,
            AggregationType::Count => self.records as f64,
            AggregationType::Avg => {
                if self.count_numbers > 0 {
                    self.sum / self.count_numbers as f64
                } else {
                    0.0
                }
            }
            AggregationType::Min => self.min.unwrap_or(0.0),
            AggregationType::Max => self.max.unwrap_or(0.0),
            AggregationType::Cardinality => self.distinct.len() as f64,
        }
    }
}

/// Runs every metric over `records`, returning one accumulator per metric.
pub fn accumulate(records: &[&Record], metrics: &[MetricSpec]) -> Vec<MetricAccumulator> {
    let mut accumulators: Vec<MetricAccumulator> =
        metrics.iter().map(|m| MetricAccumulator::new(m.agg)).collect();

    for record in records {
        for (accumulator, metric) in accumulators.iter_mut().zip(metrics) {
            accumulator.add(record, &metric.field);
        }
    }

    accumulators
}

/// Computes each metric over a group, in metric order.
pub fn aggregate(records: &[&Record], metrics: &[MetricSpec]) -> Vec<MetricValue> {
    accumulate(records, metrics)
        .iter()
        .zip(metrics)
        .map(|(accumulator, metric)| MetricValue {
            field: metric.field.clone(),
            agg: metric.agg,
            label: metric.display_label(),
            value: accumulator.compute(),
        })
        .collect()
}

/// Computes a single metric over a group.
pub fn metric_value(records: &[&Record], metric: &MetricSpec) -> f64 {
    let mut accumulator = MetricAccumulator::new(metric.agg);
    for record in records {
        accumulator.add(record, &metric.field);
    }
    accumulator.compute()
}
