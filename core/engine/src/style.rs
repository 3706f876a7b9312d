//! FILENAME: core/engine/src/style.rs
//! PURPOSE: Display options for rendering numeric values.
//! CONTEXT: `NumberFormat` is deserialized straight from widget configuration,
//! e.g. `{"format": "currency", "decimals": 2, "currency": "EUR"}`.

use serde::{Deserialize, Serialize};

/// Number format type for display.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "camelCase")]
pub enum NumberFormat {
    #[serde(rename_all = "camelCase")]
    Number {
        #[serde(default)]
        decimals: u8,
        #[serde(default = "default_true")]
        thousands_separator: bool,
    },
    Currency {
        #[serde(default = "default_currency_decimals")]
        decimals: u8,
        /// ISO 4217 code, e.g. "USD".
        #[serde(default = "default_currency")]
        currency: String,
    },
    /// The value is a ratio: 0.25 renders as "25%".
    Percent {
        #[serde(default)]
        decimals: u8,
    },
}

impl Default for NumberFormat {
    fn default() -> Self {
        NumberFormat::Number {
            decimals: 0,
            thousands_separator: true,
        }
    }
}

impl NumberFormat {
    pub fn decimals(&self) -> u8 {
        match self {
            NumberFormat::Number { decimals, .. }
            | NumberFormat::Currency { decimals, .. }
            | NumberFormat::Percent { decimals } => *decimals,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_currency_decimals() -> u8 {
    2
}

fn default_currency() -> String {
    "USD".to_string()
}

/// Position of currency symbol relative to the number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyPosition {
    #[default]
    Before, // $100
    After,  // 100 kr
}
