//! FILENAME: core/widget-engine/src/engine.rs
//! Widget Engine - The calculation core that turns records into widget output.
//!
//! This module takes a WidgetDefinition (configuration) and a slice of records
//! and produces a WidgetOutput (buckets or a KPI ready for rendering).
//!
//! Algorithm:
//! 1. Filter records (all filters must pass)
//! 2. Chart: group recursively per bucket level, applying size caps and order,
//!    then aggregate metrics over each terminal group
//! 3. KPI: split records into trend windows and aggregate each window
//! 4. Collect diagnostics for everything that was skipped along the way

use std::cmp::Ordering;

use chrono::{Datelike, Days, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Timelike};
use engine::{FieldValue, Record};
use rustc_hash::FxHashMap;

use crate::definition::{
    AggregationType, BucketKind, BucketOrder, BucketSpec, DateInterval, EngineOptions,
    FilterOperator, KpiSpec, MetricSpec, OrderBy, SortDirection, WidgetDefinition,
};
use crate::error::Diagnostic;
use crate::filter::filter_records;
use crate::format::present_kpi;
use crate::kpi::compute_trend;
use crate::metrics::{accumulate, aggregate, metric_value};
use crate::view::{
    BucketKey, BucketResult, DataStatus, KeyPart, KeyParts, KpiView, WidgetKind, WidgetOutput,
};

/// Label of the single group a chart without buckets produces.
pub const ALL_LABEL: &str = "All";

/// Separator between level labels of a nested bucket.
pub const LABEL_SEPARATOR: &str = " / ";

// ============================================================================
// GROUP STRUCTURES
// ============================================================================

/// What makes two records land in the same group at one level.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum GroupIdentity {
    /// Null or missing terms value.
    Undefined,
    /// Terms value, by key string.
    Term(String),
    /// Start of a date histogram interval (epoch ms).
    Instant(i64),
    /// Index of the matching range.
    Range(usize),
}

/// A group at one bucket level, with its member records.
#[derive(Debug)]
struct Group<'r> {
    identity: GroupIdentity,
    key: FieldValue,
    label: String,
    records: Vec<&'r Record>,
    /// Value of the order metric, when ordering by metric.
    sort_metric: f64,
}

// ============================================================================
// BUCKET GROUPER
// ============================================================================

struct BucketGrouper<'a> {
    buckets: &'a [BucketSpec],
    metrics: &'a [MetricSpec],
    offset: FixedOffset,
}

impl<'a> BucketGrouper<'a> {
    /// Groups records at the given level, then orders and caps the groups.
    fn group_level<'r>(&self, records: &[&'r Record], level: usize) -> Vec<Group<'r>> {
        let spec = &self.buckets[level];
        let mut index: FxHashMap<GroupIdentity, usize> = FxHashMap::default();
        let mut groups: Vec<Group<'r>> = Vec::new();
        let mut dropped = 0usize;

        for &record in records {
            let Some(identity) = self.record_identity(record, spec) else {
                dropped += 1;
                continue;
            };

            match index.get(&identity).copied() {
                Some(position) => groups[position].records.push(record),
                None => {
                    let (key, label) = self.group_key(&identity, record, spec);
                    index.insert(identity.clone(), groups.len());
                    groups.push(Group {
                        identity,
                        key,
                        label,
                        records: vec![record],
                        sort_metric: 0.0,
                    });
                }
            }
        }

        if dropped > 0 {
            log::debug!(
                target: "GROUP",
                "level {} ({}): {} records without a bucket",
                level,
                spec.field,
                dropped
            );
        }

        self.order_and_cap(groups, spec, level)
    }

    /// Computes the grouping identity of a record, or None to drop it.
    fn record_identity(&self, record: &Record, spec: &BucketSpec) -> Option<GroupIdentity> {
        let value = record.get(&spec.field);

        match &spec.kind {
            BucketKind::Terms => Some(match value {
                None => GroupIdentity::Undefined,
                Some(v) => GroupIdentity::Term(v.key_string().into_owned()),
            }),
            BucketKind::DateHistogram { interval } => {
                let timestamp = value?.to_timestamp(self.offset)?;
                truncate_timestamp(timestamp, *interval, self.offset).map(GroupIdentity::Instant)
            }
            BucketKind::Range { ranges } => {
                let number = value?.to_number()?;
                ranges.iter().position(|r| r.contains(number)).map(GroupIdentity::Range)
            }
        }
    }

    /// The reported key and label of a new group, taken from its first record.
    fn group_key(&self, identity: &GroupIdentity, record: &Record, spec: &BucketSpec) -> (FieldValue, String) {
        match identity {
            GroupIdentity::Undefined => (FieldValue::Null, engine::UNDEFINED_KEY.to_string()),
            GroupIdentity::Term(text) => (
                record.get(&spec.field).cloned().unwrap_or(FieldValue::Null),
                text.clone(),
            ),
            GroupIdentity::Instant(start) => {
                let label = match &spec.kind {
                    BucketKind::DateHistogram { interval } => interval_label(*start, *interval, self.offset),
                    _ => engine::timestamp_to_rfc3339(*start),
                };
                (FieldValue::Timestamp(*start), label)
            }
            GroupIdentity::Range(position) => {
                let label = match &spec.kind {
                    BucketKind::Range { ranges } => ranges
                        .get(*position)
                        .map(|r| r.display_label())
                        .unwrap_or_default(),
                    _ => String::new(),
                };
                (FieldValue::Text(label.clone()), label)
            }
        }
    }

    /// Applies the level's order and size rules.
    fn order_and_cap<'r>(&self, mut groups: Vec<Group<'r>>, spec: &BucketSpec, level: usize) -> Vec<Group<'r>> {
        match spec.order.map(|order| self.resolve_order(order, level)) {
            Some(order) => {
                if let OrderBy::Metric(metric_index) = order.by {
                    let metric = &self.metrics[metric_index];
                    for group in groups.iter_mut() {
                        group.sort_metric = metric_value(&group.records, metric);
                    }
                }

                let direction = order.effective_direction();
                groups.sort_by(|a, b| {
                    let ordering = compare_groups(a, b, order.by);
                    match direction {
                        SortDirection::Asc => ordering,
                        SortDirection::Desc => ordering.reverse(),
                    }
                });

                if let Some(size) = spec.size {
                    groups.truncate(size);
                }
            }
            None => {
                if let Some(size) = spec.size {
                    if groups.len() > size {
                        // Top groups by count; survivors keep first-seen order.
                        let mut ranked: Vec<usize> = (0..groups.len()).collect();
                        ranked.sort_by(|&a, &b| groups[b].records.len().cmp(&groups[a].records.len()));
                        let mut keep = vec![false; groups.len()];
                        for &position in ranked.iter().take(size) {
                            keep[position] = true;
                        }
                        let mut position = 0;
                        groups.retain(|_| {
                            let kept = keep[position];
                            position += 1;
                            kept
                        });
                    }
                }
            }
        }

        groups
    }

    /// Replaces a metric order whose index is out of bounds with a count order.
    fn resolve_order(&self, order: BucketOrder, level: usize) -> BucketOrder {
        match order.by {
            OrderBy::Metric(index) if index >= self.metrics.len() => {
                log::warn!(
                    target: "GROUP",
                    "level {}: order metric {} out of bounds ({} metrics), ordering by count",
                    level,
                    index,
                    self.metrics.len()
                );
                BucketOrder {
                    by: OrderBy::Count,
                    direction: order.direction,
                }
            }
            _ => order,
        }
    }

    /// Recursively walks the levels, emitting one result per terminal group.
    fn collect_leaves(
        &self,
        records: &[&Record],
        level: usize,
        parts: &mut KeyParts,
        labels: &mut Vec<String>,
        out: &mut Vec<BucketResult>,
    ) {
        let spec = &self.buckets[level];
        let is_leaf_level = level + 1 == self.buckets.len();

        for group in self.group_level(records, level) {
            parts.push(KeyPart {
                field: spec.field.clone(),
                value: group.key.clone(),
            });
            labels.push(group.label.clone());

            if is_leaf_level {
                let key = if self.buckets.len() == 1 {
                    BucketKey::Single(group.key)
                } else {
                    BucketKey::Composite(parts.clone())
                };
                out.push(BucketResult {
                    key,
                    label: labels.join(LABEL_SEPARATOR),
                    metrics: aggregate(&group.records, self.metrics),
                    count: group.records.len(),
                });
            } else {
                self.collect_leaves(&group.records, level + 1, parts, labels, out);
            }

            parts.pop();
            labels.pop();
        }
    }
}

/// Compares two groups of the same level under an order rule.
fn compare_groups(a: &Group, b: &Group, by: OrderBy) -> Ordering {
    match by {
        OrderBy::Key => match (&a.identity, &b.identity) {
            (GroupIdentity::Instant(x), GroupIdentity::Instant(y)) => x.cmp(y),
            (GroupIdentity::Range(x), GroupIdentity::Range(y)) => x.cmp(y),
            _ => compare_key_values(&a.key, &b.key),
        },
        OrderBy::Count => a.records.len().cmp(&b.records.len()),
        OrderBy::Metric(_) => a.sort_metric.partial_cmp(&b.sort_metric).unwrap_or(Ordering::Equal),
    }
}

/// Orders keys: null < number < text < boolean < timestamp.
fn compare_key_values(a: &FieldValue, b: &FieldValue) -> Ordering {
    fn rank(value: &FieldValue) -> u8 {
        match value {
            FieldValue::Null => 0,
            FieldValue::Number(_) => 1,
            FieldValue::Text(_) => 2,
            FieldValue::Boolean(_) => 3,
            FieldValue::Timestamp(_) => 4,
        }
    }

    match (a, b) {
        (FieldValue::Number(x), FieldValue::Number(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (FieldValue::Text(x), FieldValue::Text(y)) => x.cmp(y),
        (FieldValue::Boolean(x), FieldValue::Boolean(y)) => x.cmp(y),
        (FieldValue::Timestamp(x), FieldValue::Timestamp(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

// ============================================================================
// GROUPING TRANSFORM HELPERS
// ============================================================================

/// Truncates epoch milliseconds to the start of its calendar interval,
/// evaluated in `offset` local time.
pub fn truncate_timestamp(ms: i64, interval: DateInterval, offset: FixedOffset) -> Option<i64> {
    let local = offset.timestamp_millis_opt(ms).single()?;
    let date = local.date_naive();

    let start: NaiveDateTime = match interval {
        DateInterval::Minute => date.and_hms_opt(local.hour(), local.minute(), 0)?,
        DateInterval::Hour => date.and_hms_opt(local.hour(), 0, 0)?,
        DateInterval::Day => date.and_hms_opt(0, 0, 0)?,
        DateInterval::Week => {
            let back = local.weekday().num_days_from_monday() as u64;
            date.checked_sub_days(Days::new(back))?.and_hms_opt(0, 0, 0)?
        }
        DateInterval::Month => NaiveDate::from_ymd_opt(date.year(), date.month(), 1)?.and_hms_opt(0, 0, 0)?,
        DateInterval::Quarter => {
            let first_month = (date.month() - 1) / 3 * 3 + 1;
            NaiveDate::from_ymd_opt(date.year(), first_month, 1)?.and_hms_opt(0, 0, 0)?
        }
        DateInterval::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1)?.and_hms_opt(0, 0, 0)?,
    };

    offset
        .from_local_datetime(&start)
        .single()
        .map(|dt| dt.timestamp_millis())
}

/// Display label of an interval starting at `start_ms`.
pub fn interval_label(start_ms: i64, interval: DateInterval, offset: FixedOffset) -> String {
    let Some(local) = offset.timestamp_millis_opt(start_ms).single() else {
        return engine::timestamp_to_rfc3339(start_ms);
    };

    match interval {
        DateInterval::Minute | DateInterval::Hour => local.format("%Y-%m-%d %H:%M").to_string(),
        DateInterval::Day | DateInterval::Week => local.format("%Y-%m-%d").to_string(),
        DateInterval::Month => local.format("%Y-%m").to_string(),
        DateInterval::Quarter => format!("{}-Q{}", local.year(), (local.month() - 1) / 3 + 1),
        DateInterval::Year => local.format("%Y").to_string(),
    }
}

// ============================================================================
// WIDGET CALCULATOR
// ============================================================================

/// Runs one widget definition over one dataset.
pub struct WidgetCalculator<'a> {
    records: &'a [Record],
    definition: &'a WidgetDefinition,
    options: EngineOptions,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> WidgetCalculator<'a> {
    pub fn new(records: &'a [Record], definition: &'a WidgetDefinition) -> Self {
        WidgetCalculator {
            records,
            definition,
            options: definition.options(),
            diagnostics: Vec::new(),
        }
    }

    pub fn calculate(mut self) -> WidgetOutput {
        let definition = self.definition;

        // Step 1: Filters we cannot evaluate are reported, then skipped
        for filter in &definition.filters {
            if filter.operator == FilterOperator::Unknown {
                self.diagnostics.push(Diagnostic::UnknownFilterOperator {
                    field: filter.field.clone(),
                });
            }
        }

        // Step 2: Filter
        let filtered = filter_records(self.records, &definition.filters, self.options.utc_offset);

        // Step 3: Referenced fields that hold no value anywhere
        self.check_referenced_fields();

        if filtered.is_empty() {
            log::debug!(target: "WIDGET", "no records left after filtering {} inputs", self.records.len());
            self.diagnostics.push(Diagnostic::EmptyInput);
        }

        // Step 4: Chart or KPI
        let (kind, buckets, kpi) = match &definition.kpi {
            Some(kpi) => (WidgetKind::Kpi, None, Some(self.calculate_kpi(kpi, &filtered))),
            None => (WidgetKind::Chart, Some(self.calculate_chart(&filtered)), None),
        };

        log::debug!(
            target: "WIDGET",
            "calculated {:?} widget: {} of {} records, {} buckets, {} diagnostics",
            kind,
            filtered.len(),
            self.records.len(),
            buckets.as_ref().map_or(0, Vec::len),
            self.diagnostics.len()
        );

        WidgetOutput {
            kind,
            status: if filtered.is_empty() {
                DataStatus::NoData
            } else {
                DataStatus::Ok
            },
            buckets,
            kpi,
            total_records: self.records.len(),
            matched_records: filtered.len(),
            diagnostics: self.diagnostics,
        }
    }

    fn calculate_chart(&mut self, filtered: &[&Record]) -> Vec<BucketResult> {
        let definition = self.definition;
        self.report_coercions(filtered, &definition.metrics);

        if filtered.is_empty() {
            return Vec::new();
        }

        group_records(filtered, &definition.buckets, &definition.metrics, &self.options).unwrap_or_else(|| {
            vec![BucketResult {
                key: BucketKey::Single(FieldValue::Null),
                label: ALL_LABEL.to_string(),
                metrics: aggregate(filtered, &definition.metrics),
                count: filtered.len(),
            }]
        })
    }

    fn calculate_kpi(&mut self, kpi: &KpiSpec, filtered: &[&Record]) -> KpiView {
        self.report_coercions(filtered, std::slice::from_ref(&kpi.metric));

        let computation = compute_trend(filtered, kpi, &self.options);
        if computation.unreadable_timestamps > 0 {
            log::warn!(
                target: "KPI",
                "{} records have no readable '{}' timestamp",
                computation.unreadable_timestamps,
                kpi.timestamp_field
            );
            self.diagnostics.push(Diagnostic::UnreadableTimestamp {
                field: kpi.timestamp_field.clone(),
                skipped: computation.unreadable_timestamps,
            });
        }

        present_kpi(&computation, kpi, &self.definition.format)
    }

    fn report_coercions(&mut self, records: &[&Record], metrics: &[MetricSpec]) {
        if !metrics.iter().any(|m| m.agg.is_numeric()) {
            return;
        }
        for (accumulator, metric) in accumulate(records, metrics).iter().zip(metrics) {
            if accumulator.skipped() > 0 {
                log::warn!(
                    target: "METRIC",
                    "{} of '{}': skipped {} non-numeric values",
                    metric.agg.name(),
                    metric.field,
                    accumulator.skipped()
                );
                self.diagnostics.push(Diagnostic::CoercionSkipped {
                    field: metric.field.clone(),
                    agg: metric.agg,
                    skipped: accumulator.skipped(),
                });
            }
        }
    }

    fn check_referenced_fields(&mut self) {
        if self.records.is_empty() {
            return;
        }

        for field in referenced_fields(self.definition) {
            if !self.records.iter().any(|r| r.has_value(&field)) {
                log::warn!(target: "WIDGET", "field '{}' has no value in any record", field);
                self.diagnostics.push(Diagnostic::MissingField { field });
            }
        }
    }
}

/// Fields a widget reads, deduplicated, in configuration order.
fn referenced_fields(definition: &WidgetDefinition) -> Vec<String> {
    let mut fields: Vec<String> = Vec::new();
    let mut add = |field: &str| {
        if !field.is_empty() && !fields.iter().any(|f| f == field) {
            fields.push(field.to_string());
        }
    };

    for bucket in &definition.buckets {
        add(&bucket.field);
    }
    for metric in &definition.metrics {
        if metric.agg != AggregationType::Count {
            add(&metric.field);
        }
    }
    if let Some(kpi) = &definition.kpi {
        if kpi.metric.agg != AggregationType::Count {
            add(&kpi.metric.field);
        }
        if kpi.trend {
            add(&kpi.timestamp_field);
        }
    }

    fields
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Groups records by the bucket levels and aggregates each terminal group.
/// Returns None when there are no buckets.
pub fn group_records(
    records: &[&Record],
    buckets: &[BucketSpec],
    metrics: &[MetricSpec],
    options: &EngineOptions,
) -> Option<Vec<BucketResult>> {
    if buckets.is_empty() {
        return None;
    }

    let grouper = BucketGrouper {
        buckets,
        metrics,
        offset: options.utc_offset,
    };

    let mut out = Vec::new();
    let mut parts = KeyParts::new();
    let mut labels = Vec::with_capacity(buckets.len());
    grouper.collect_leaves(records, 0, &mut parts, &mut labels, &mut out);

    log::debug!(target: "GROUP", "{} records into {} buckets", records.len(), out.len());
    Some(out)
}

/// Main entry point: calculates a widget from records and its definition.
pub fn calculate_widget(records: &[Record], definition: &WidgetDefinition) -> WidgetOutput {
    WidgetCalculator::new(records, definition).calculate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::RangeSpec;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn ms(text: &str) -> i64 {
        engine::parse_timestamp_text(text, utc()).unwrap()
    }

    fn group(records: &[Record], buckets: &[BucketSpec], metrics: &[MetricSpec]) -> Vec<BucketResult> {
        let refs: Vec<&Record> = records.iter().collect();
        group_records(&refs, buckets, metrics, &EngineOptions::default()).unwrap()
    }

    fn labels(results: &[BucketResult]) -> Vec<&str> {
        results.iter().map(|b| b.label.as_str()).collect()
    }

    #[test]
    fn test_no_buckets_returns_none() {
        let records = vec![Record::new().with("a", 1.0)];
        let refs: Vec<&Record> = records.iter().collect();
        assert!(group_records(&refs, &[], &[], &EngineOptions::default()).is_none());
    }

    #[test]
    fn test_terms_share_key_string() {
        let records = vec![
            Record::new().with("code", 10.0),
            Record::new().with("code", "10"),
            Record::new().with("code", FieldValue::Null),
            Record::new(),
        ];
        let results = group(&records, &[BucketSpec::terms("code")], &[MetricSpec::count()]);
        assert_eq!(labels(&results), vec!["10", "undefined"]);
        assert_eq!(results[0].key, BucketKey::Single(FieldValue::Number(10.0)));
        assert_eq!(results[0].count, 2);
        assert_eq!(results[1].key, BucketKey::Single(FieldValue::Null));
        assert_eq!(results[1].count, 2);
    }

    #[test]
    fn test_truncate_week_starts_monday() {
        // 2024-03-14 is a Thursday.
        let start = truncate_timestamp(ms("2024-03-14T15:30:00Z"), DateInterval::Week, utc()).unwrap();
        assert_eq!(start, ms("2024-03-11T00:00:00Z"));
        assert_eq!(interval_label(start, DateInterval::Week, utc()), "2024-03-11");
    }

    #[test]
    fn test_truncate_calendar_intervals() {
        let t = ms("2024-08-17T13:45:12Z");
        let cases = [
            (DateInterval::Minute, "2024-08-17T13:45:00Z", "2024-08-17 13:45"),
            (DateInterval::Hour, "2024-08-17T13:00:00Z", "2024-08-17 13:00"),
            (DateInterval::Day, "2024-08-17T00:00:00Z", "2024-08-17"),
            (DateInterval::Month, "2024-08-01T00:00:00Z", "2024-08"),
            (DateInterval::Quarter, "2024-07-01T00:00:00Z", "2024-Q3"),
            (DateInterval::Year, "2024-01-01T00:00:00Z", "2024"),
        ];
        for (interval, expected_start, expected_label) in cases {
            let start = truncate_timestamp(t, interval, utc()).unwrap();
            assert_eq!(start, ms(expected_start), "{:?}", interval);
            assert_eq!(interval_label(start, interval, utc()), expected_label);
        }
    }

    #[test]
    fn test_truncate_respects_offset() {
        // 23:30 UTC on Jan 31 is already Feb 1 at UTC+2.
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let start = truncate_timestamp(ms("2024-01-31T23:30:00Z"), DateInterval::Month, plus_two).unwrap();
        assert_eq!(start, ms("2024-01-31T22:00:00Z"));
        assert_eq!(interval_label(start, DateInterval::Month, plus_two), "2024-02");
    }

    #[test]
    fn test_date_histogram_drops_unparseable_values() {
        let records = vec![
            Record::new().with("day", "2024-01-01T08:00:00Z"),
            Record::new().with("day", "garbage"),
            Record::new().with("day", "2024-01-01T20:00:00Z"),
            Record::new().with("day", "2024-01-02"),
        ];
        let results = group(
            &records,
            &[BucketSpec::date_histogram("day", DateInterval::Day)],
            &[MetricSpec::count()],
        );
        assert_eq!(labels(&results), vec!["2024-01-01", "2024-01-02"]);
        assert_eq!(results[0].count, 2);
        assert_eq!(
            results[0].key,
            BucketKey::Single(FieldValue::Timestamp(ms("2024-01-01T00:00:00Z")))
        );
    }

    #[test]
    fn test_range_buckets_first_match_and_drop() {
        let records = vec![
            Record::new().with("age", 5.0),
            Record::new().with("age", 10.0),
            Record::new().with("age", 99.0),
            Record::new().with("age", -1.0),
            Record::new().with("age", "n/a"),
        ];
        let ranges = vec![
            RangeSpec::new(Some(0.0), Some(10.0)),
            RangeSpec::new(Some(10.0), Some(50.0)),
            RangeSpec {
                from: Some(50.0),
                to: None,
                label: Some("senior".to_string()),
            },
        ];
        let results = group(&records, &[BucketSpec::range("age", ranges)], &[MetricSpec::count()]);
        assert_eq!(labels(&results), vec!["0-10", "10-50", "senior"]);
        assert_eq!(results.iter().map(|b| b.count).sum::<usize>(), 3);
    }

    #[test]
    fn test_size_cap_without_order_keeps_first_seen() {
        let records: Vec<Record> = ["a", "b", "b", "c", "c", "c", "d"]
            .iter()
            .map(|v| Record::new().with("k", *v))
            .collect();
        let results = group(&records, &[BucketSpec::terms("k").with_size(2)], &[MetricSpec::count()]);
        assert_eq!(labels(&results), vec!["b", "c"]);
    }

    #[test]
    fn test_size_cap_breaks_count_ties_by_first_seen() {
        let records: Vec<Record> = ["a", "a", "b", "b", "c"]
            .iter()
            .map(|v| Record::new().with("k", *v))
            .collect();

        let unordered = group(&records, &[BucketSpec::terms("k").with_size(1)], &[MetricSpec::count()]);
        assert_eq!(labels(&unordered), vec!["a"]);

        let by_count: BucketOrder = serde_json::from_value(serde_json::json!({"by": "count"})).unwrap();
        let ordered = group(
            &records,
            &[BucketSpec::terms("k").with_order(by_count).with_size(1)],
            &[MetricSpec::count()],
        );
        assert_eq!(labels(&ordered), vec!["a"]);

        let ascending = group(
            &records,
            &[BucketSpec::terms("k")
                .with_order(BucketOrder::new(OrderBy::Count, SortDirection::Asc))
                .with_size(2)],
            &[MetricSpec::count()],
        );
        assert_eq!(labels(&ascending), vec!["c", "a"]);
    }

    #[test]
    fn test_order_by_key_and_metric() {
        let records = vec![
            Record::new().with("k", "b").with("v", 1.0),
            Record::new().with("k", "a").with("v", 5.0),
            Record::new().with("k", "c").with("v", 3.0),
        ];
        let metrics = vec![MetricSpec::new("v", AggregationType::Sum)];

        let by_key = group(
            &records,
            &[BucketSpec::terms("k").with_order(BucketOrder::new(OrderBy::Key, SortDirection::Asc))],
            &metrics,
        );
        assert_eq!(labels(&by_key), vec!["a", "b", "c"]);

        let by_metric = group(
            &records,
            &[BucketSpec::terms("k")
                .with_order(BucketOrder::new(OrderBy::Metric(0), SortDirection::Desc))
                .with_size(2)],
            &metrics,
        );
        assert_eq!(labels(&by_metric), vec!["a", "c"]);
    }

    #[test]
    fn test_out_of_bounds_metric_order_falls_back_to_count() {
        let records: Vec<Record> = ["x", "y", "y"].iter().map(|v| Record::new().with("k", *v)).collect();
        let results = group(
            &records,
            &[BucketSpec::terms("k").with_order(BucketOrder {
                by: OrderBy::Metric(7),
                direction: None,
            })],
            &[MetricSpec::count()],
        );
        assert_eq!(labels(&results), vec!["y", "x"]);
    }

    #[test]
    fn test_key_order_ranks_types() {
        let mut values = vec![
            FieldValue::Boolean(true),
            FieldValue::from("b"),
            FieldValue::Number(2.0),
            FieldValue::Null,
            FieldValue::Number(-1.0),
        ];
        values.sort_by(compare_key_values);
        assert_eq!(
            values,
            vec![
                FieldValue::Null,
                FieldValue::Number(-1.0),
                FieldValue::Number(2.0),
                FieldValue::from("b"),
                FieldValue::Boolean(true),
            ]
        );
    }
}
