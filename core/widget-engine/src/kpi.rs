//! FILENAME: core/widget-engine/src/kpi.rs
//! PURPOSE: Current-versus-previous trend for single-value widgets.
//! CONTEXT: Records are placed in two disjoint, contiguous time windows by
//! their timestamp field, and the KPI metric is aggregated over each window.
//! Records without a readable timestamp belong to neither window.

use engine::Record;

use crate::definition::{EngineOptions, KpiSpec, TrendWindow};
use crate::metrics::metric_value;
use crate::view::KpiResult;

/// A half-open time window `[start, end)` in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: i64,
    pub end: i64,
}

impl TimeWindow {
    pub fn contains(&self, ms: i64) -> bool {
        ms >= self.start && ms < self.end
    }
}

/// The trend result together with the window sizes it was computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct KpiComputation {
    pub result: KpiResult,
    pub trend_enabled: bool,
    pub current_count: usize,
    pub previous_count: usize,
    /// Records left out because their timestamp could not be read.
    pub unreadable_timestamps: usize,
}

/// Splits `[tmin, tmax]` into (previous, current) windows.
/// Bounds are computed in i128 and clamped to the i64 range.
pub fn trend_windows(tmin: i64, tmax: i64, window: &TrendWindow) -> (TimeWindow, TimeWindow) {
    let (tmin, tmax) = (i128::from(tmin), i128::from(tmax));
    let end = tmax + 1;
    let (previous_start, current_start) = match window {
        TrendWindow::Halves => (tmin, tmin + (tmax - tmin) / 2),
        TrendWindow::Recent { period } => {
            let p = i128::from(period.as_millis());
            (end - 2 * p, end - p)
        }
    };
    (
        TimeWindow {
            start: clamp_millis(previous_start),
            end: clamp_millis(current_start),
        },
        TimeWindow {
            start: clamp_millis(current_start),
            end: clamp_millis(end),
        },
    )
}

fn clamp_millis(ms: i128) -> i64 {
    ms.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}

/// Computes the KPI value and its trend over `records`.
pub fn compute_trend(records: &[&Record], kpi: &KpiSpec, options: &EngineOptions) -> KpiComputation {
    if !kpi.trend {
        return KpiComputation {
            result: KpiResult::without_trend(metric_value(records, &kpi.metric)),
            trend_enabled: false,
            current_count: records.len(),
            previous_count: 0,
            unreadable_timestamps: 0,
        };
    }

    let mut stamped: Vec<(i64, &Record)> = Vec::with_capacity(records.len());
    for &record in records {
        if let Some(ms) = record
            .get(&kpi.timestamp_field)
            .and_then(|v| v.to_timestamp(options.utc_offset))
        {
            stamped.push((ms, record));
        }
    }
    let unreadable_timestamps = records.len() - stamped.len();

    let (Some(tmin), Some(tmax)) = (
        stamped.iter().map(|(ms, _)| *ms).min(),
        stamped.iter().map(|(ms, _)| *ms).max(),
    ) else {
        return KpiComputation {
            result: KpiResult::from_windows(0.0, 0.0),
            trend_enabled: true,
            current_count: 0,
            previous_count: 0,
            unreadable_timestamps,
        };
    };

    let (previous_window, current_window) = trend_windows(tmin, tmax, &kpi.window);
    let mut current: Vec<&Record> = Vec::new();
    let mut previous: Vec<&Record> = Vec::new();
    // Nothing is newer than tmax, so the current window has no upper bound here.
    for (ms, record) in stamped {
        if ms >= current_window.start {
            current.push(record);
        } else if previous_window.contains(ms) {
            previous.push(record);
        }
    }

    let current_value = metric_value(&current, &kpi.metric);
    let previous_value = metric_value(&previous, &kpi.metric);
    log::debug!(
        target: "KPI",
        "current {} records -> {}, previous {} records -> {}",
        current.len(),
        current_value,
        previous.len(),
        previous_value
    );

    KpiComputation {
        result: KpiResult::from_windows(current_value, previous_value),
        trend_enabled: true,
        current_count: current.len(),
        previous_count: previous.len(),
        unreadable_timestamps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{AggregationType, MetricSpec, WindowPeriod};
    use crate::view::Trend;
    use engine::FieldValue;

    const DAY: i64 = 86_400_000;

    fn daily(values: &[f64]) -> Vec<Record> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| Record::new().with("t", i as f64 * DAY as f64).with("v", *v))
            .collect()
    }

    fn sum_kpi() -> KpiSpec {
        KpiSpec::new(MetricSpec::new("v", AggregationType::Sum), "t")
    }

    #[test]
    fn test_halves_windows() {
        let (previous, current) = trend_windows(0, 10, &TrendWindow::Halves);
        assert_eq!(previous, TimeWindow { start: 0, end: 5 });
        assert_eq!(current, TimeWindow { start: 5, end: 11 });
    }

    #[test]
    fn test_recent_windows() {
        let window = TrendWindow::Recent {
            period: WindowPeriod::from_millis(3),
        };
        let (previous, current) = trend_windows(0, 9, &window);
        assert_eq!(current, TimeWindow { start: 7, end: 10 });
        assert_eq!(previous, TimeWindow { start: 4, end: 7 });
    }

    #[test]
    fn test_trend_over_halves() {
        // Days 0..3 -> previous = days 0,1 (mid = 1.5 days), current = days 2,3.
        let records = daily(&[50.0, 50.0, 60.0, 60.0]);
        let refs: Vec<&Record> = records.iter().collect();
        let computation = compute_trend(&refs, &sum_kpi(), &EngineOptions::default());

        assert_eq!(computation.result.value, 120.0);
        assert_eq!(computation.result.trend_value, 20.0);
        assert!((computation.result.trend_percent - 20.0).abs() < 1e-9);
        assert_eq!(computation.result.trend, Trend::Up);
        assert_eq!((computation.current_count, computation.previous_count), (2, 2));
    }

    #[test]
    fn test_recent_window_ignores_older_records() {
        let records = daily(&[1000.0, 10.0, 20.0, 30.0, 40.0]);
        let refs: Vec<&Record> = records.iter().collect();
        let mut kpi = sum_kpi();
        kpi.window = TrendWindow::Recent {
            period: WindowPeriod::days(2),
        };
        let computation = compute_trend(&refs, &kpi, &EngineOptions::default());
        assert_eq!(computation.result.value, 70.0);
        assert_eq!(computation.result.trend_value, 40.0);
        assert_eq!(computation.previous_count, 2);
    }

    #[test]
    fn test_unreadable_timestamps_are_excluded() {
        let mut records = daily(&[10.0, 10.0]);
        records.push(Record::new().with("t", "yesterday").with("v", 999.0));
        records.push(Record::new().with("v", 999.0));
        let refs: Vec<&Record> = records.iter().collect();
        let computation = compute_trend(&refs, &sum_kpi(), &EngineOptions::default());
        assert_eq!(computation.unreadable_timestamps, 2);
        assert_eq!(computation.result.value, 10.0);
        assert_eq!(computation.result.trend, Trend::Flat);
    }

    #[test]
    fn test_trend_disabled_uses_all_records() {
        let records = daily(&[1.0, 2.0, 3.0]);
        let refs: Vec<&Record> = records.iter().collect();
        let mut kpi = sum_kpi();
        kpi.trend = false;
        let computation = compute_trend(&refs, &kpi, &EngineOptions::default());
        assert_eq!(computation.result, KpiResult::without_trend(6.0));
        assert!(!computation.trend_enabled);
    }

    #[test]
    fn test_single_instant_is_all_current() {
        let records = vec![Record::new().with("t", 5.0).with("v", 3.0)];
        let refs: Vec<&Record> = records.iter().collect();
        let computation = compute_trend(&refs, &sum_kpi(), &EngineOptions::default());
        assert_eq!(computation.result.value, 3.0);
        assert_eq!(computation.result.trend_percent, 100.0);
        assert_eq!(computation.previous_count, 0);
    }

    #[test]
    fn test_extreme_timestamps_do_not_overflow() {
        let (previous, current) = trend_windows(i64::MIN, i64::MAX, &TrendWindow::Halves);
        assert_eq!(previous.start, i64::MIN);
        assert_eq!(previous.end, current.start);
        assert_eq!(current.end, i64::MAX);

        let window = TrendWindow::Recent {
            period: WindowPeriod::days(7),
        };
        let (previous, current) = trend_windows(i64::MIN, i64::MIN + 10, &window);
        assert_eq!(previous.start, i64::MIN);
        assert_eq!(current.end, i64::MIN + 11);
    }

    #[test]
    fn test_out_of_range_numeric_timestamps_are_unreadable() {
        let records = vec![
            Record::new().with("t", -1e300).with("v", 1.0),
            Record::new().with("t", 1e300).with("v", 2.0),
            Record::new().with("t", 0.0).with("v", 4.0),
        ];
        let refs: Vec<&Record> = records.iter().collect();
        let computation = compute_trend(&refs, &sum_kpi(), &EngineOptions::default());
        assert_eq!(computation.unreadable_timestamps, 2);
        assert_eq!(computation.result.value, 4.0);
        assert_eq!(computation.current_count, 1);
    }

    #[test]
    fn test_newest_record_at_max_instant_is_current() {
        let records = vec![
            Record::new().with("t", FieldValue::Timestamp(0)).with("v", 1.0),
            Record::new().with("t", FieldValue::Timestamp(i64::MAX)).with("v", 2.0),
        ];
        let refs: Vec<&Record> = records.iter().collect();
        let computation = compute_trend(&refs, &sum_kpi(), &EngineOptions::default());
        assert_eq!((computation.current_count, computation.previous_count), (1, 1));
        assert_eq!(computation.result.value, 2.0);
        assert_eq!(computation.result.trend, Trend::Up);
    }

    #[test]
    fn test_no_records() {
        let computation = compute_trend(&[], &sum_kpi(), &EngineOptions::default());
        assert_eq!(computation.result, KpiResult::from_windows(0.0, 0.0));
        assert_eq!(computation.result.trend, Trend::Flat);
    }
}
