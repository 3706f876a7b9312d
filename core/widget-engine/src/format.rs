//! FILENAME: core/widget-engine/src/format.rs
//! PURPOSE: Presentation of KPI results: display strings, icon and color.
//! CONTEXT: The numeric trend never says whether a change is good or bad.
//! That judgement is made here from the threshold and `lowerIsBetter`.

use engine::{format_number, format_signed_percent, NumberFormat};

use crate::definition::{KpiSpec, ThresholdSpec};
use crate::kpi::KpiComputation;
use crate::view::{KpiResult, KpiView, Trend, TrendColor, TrendIcon};

/// Builds the display form of a KPI computation.
/// `widget_format` applies unless the KPI carries its own format.
pub fn present_kpi(computation: &KpiComputation, kpi: &KpiSpec, widget_format: &NumberFormat) -> KpiView {
    let format = kpi.format.as_ref().unwrap_or(widget_format);
    let result = computation.result;

    KpiView {
        result,
        formatted_value: format_number(result.value, format),
        formatted_trend: format_signed_percent(result.trend_percent, kpi.trend_decimals),
        icon: trend_icon(result.trend),
        color: trend_color(&result, kpi.threshold.as_ref(), kpi.lower_is_better),
        trend_enabled: computation.trend_enabled,
        current_count: computation.current_count,
        previous_count: computation.previous_count,
    }
}

pub fn trend_icon(trend: Trend) -> TrendIcon {
    match trend {
        Trend::Up => TrendIcon::ArrowUp,
        Trend::Down => TrendIcon::ArrowDown,
        Trend::Flat => TrendIcon::Flat,
    }
}

/// A threshold judges the current value; otherwise the trend direction decides.
pub fn trend_color(result: &KpiResult, threshold: Option<&ThresholdSpec>, lower_is_better: bool) -> TrendColor {
    if let Some(threshold) = threshold {
        return if threshold.contains(result.value) {
            TrendColor::Positive
        } else {
            TrendColor::Negative
        };
    }

    match (result.trend, lower_is_better) {
        (Trend::Flat, _) => TrendColor::Neutral,
        (Trend::Up, false) | (Trend::Down, true) => TrendColor::Positive,
        (Trend::Up, true) | (Trend::Down, false) => TrendColor::Negative,
    }
}
