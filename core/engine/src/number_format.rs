//! FILENAME: core/engine/src/number_format.rs
//! PURPOSE: Number formatting utilities for displaying aggregated values.
//! CONTEXT: This module handles the conversion of raw numeric values to
//! formatted display strings based on a widget's NumberFormat setting.
//!
//! Rounding is round-half-away-from-zero on the value scaled by 10^decimals,
//! so the same input always renders the same string. No locale state is read:
//! the thousands separator is "," and the decimal point is ".".

use crate::style::{CurrencyPosition, NumberFormat};

/// Upper bound for requested decimal places.
pub const MAX_DECIMALS: u8 = 10;

/// Rendered for NaN and infinities.
pub const NOT_AVAILABLE: &str = "N/A";

/// Format a number according to the specified format.
pub fn format_number(value: f64, format: &NumberFormat) -> String {
    if !value.is_finite() {
        return NOT_AVAILABLE.to_string();
    }

    match format {
        NumberFormat::Number {
            decimals,
            thousands_separator,
        } => format_decimal(value, *decimals, *thousands_separator),
        NumberFormat::Currency { decimals, currency } => {
            format_currency(value, *decimals, currency)
        }
        NumberFormat::Percent { decimals } => format_percentage(value, *decimals),
    }
}

/// Rounds half away from zero to the given number of decimal places.
/// Negative zero is normalized to zero.
pub fn round_half_away(value: f64, decimals: u8) -> f64 {
    let factor = 10f64.powi(decimals.min(MAX_DECIMALS) as i32);
    let scaled = value * factor;
    if !scaled.is_finite() {
        return value;
    }
    let rounded = scaled.round() / factor;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Formats a value that is already in percentage points with an explicit sign,
/// e.g. 20.0 -> "+20.0%". Used for KPI trend badges.
pub fn format_signed_percent(value: f64, decimals: u8) -> String {
    if !value.is_finite() {
        return NOT_AVAILABLE.to_string();
    }
    let body = format_decimal(value, decimals, true);
    if round_half_away(value, decimals) > 0.0 {
        format!("+{}%", body)
    } else {
        format!("{}%", body)
    }
}

/// Format a number with specified decimal places and optional thousands separator.
fn format_decimal(value: f64, decimal_places: u8, use_thousands_separator: bool) -> String {
    let decimal_places = decimal_places.min(MAX_DECIMALS);
    let rounded = format!(
        "{:.prec$}",
        round_half_away(value, decimal_places),
        prec = decimal_places as usize
    );

    if use_thousands_separator {
        add_thousands_separator(&rounded)
    } else {
        rounded
    }
}

/// Add thousands separators to a numeric string.
fn add_thousands_separator(s: &str) -> String {
    let parts: Vec<&str> = s.split('.').collect();
    let integer_part = parts[0];
    let decimal_part = parts.get(1);

    let negative = integer_part.starts_with('-');
    let digits: String = integer_part.chars().filter(|c| c.is_ascii_digit()).collect();

    let mut result = String::new();
    let len = digits.len();

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }

    if negative {
        result = format!("-{}", result);
    }

    if let Some(decimal) = decimal_part {
        result.push('.');
        result.push_str(decimal);
    }

    result
}

/// Maps an ISO 4217 code to its display symbol and placement.
/// Unknown codes are shown verbatim in front of the amount.
pub fn currency_symbol(code: &str) -> (String, CurrencyPosition) {
    let code = code.trim().to_ascii_uppercase();
    match code.as_str() {
        "USD" | "" => ("$".to_string(), CurrencyPosition::Before),
        "EUR" => ("€".to_string(), CurrencyPosition::Before),
        "GBP" => ("£".to_string(), CurrencyPosition::Before),
        "JPY" | "CNY" => ("¥".to_string(), CurrencyPosition::Before),
        "INR" => ("₹".to_string(), CurrencyPosition::Before),
        "SEK" | "NOK" | "DKK" => (" kr".to_string(), CurrencyPosition::After),
        _ => (format!("{} ", code), CurrencyPosition::Before),
    }
}

/// Format a number as currency. Negative amounts carry a leading minus sign.
fn format_currency(value: f64, decimal_places: u8, code: &str) -> String {
    let formatted = format_decimal(value.abs(), decimal_places, true);
    let (symbol, position) = currency_symbol(code);

    let with_symbol = match position {
        CurrencyPosition::Before => format!("{}{}", symbol, formatted),
        CurrencyPosition::After => format!("{}{}", formatted, symbol),
    };

    if round_half_away(value, decimal_places) < 0.0 {
        format!("-{}", with_symbol)
    } else {
        with_symbol
    }
}

/// Format a ratio as percentage.
fn format_percentage(value: f64, decimal_places: u8) -> String {
    let scaled = value * 100.0;
    if !scaled.is_finite() {
        return NOT_AVAILABLE.to_string();
    }
    format!("{}%", format_decimal(scaled, decimal_places, false))
}
