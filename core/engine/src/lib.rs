//! FILENAME: core/engine/src/lib.rs
//! PURPOSE: Main library entry point for the shared record and value model.
//! CONTEXT: Re-exports public types and modules for use by the widget engine
//! and the command-line driver.

pub mod error;
pub mod number_format;
pub mod record;
pub mod style;
pub mod value;

// Re-export commonly used types at the crate root
pub use error::ValueError;
pub use number_format::{currency_symbol, format_number, format_signed_percent, round_half_away};
pub use record::{records_from_json, records_from_json_str, Record};
pub use style::{CurrencyPosition, NumberFormat};
pub use value::{parse_timestamp_text, timestamp_to_rfc3339, FieldValue, UNDEFINED_KEY};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_builds_records() {
        let record = Record::new().with("region", "EU").with("sales", 10.0);
        assert_eq!(record.get("sales"), Some(&FieldValue::Number(10.0)));
        assert_eq!(
            record.get("region").map(|v| v.key_string().into_owned()),
            Some("EU".to_string())
        );
    }

    #[test]
    fn it_formats_coerced_values() {
        let record = Record::new().with("amount", "1234.5");
        let amount = record.get("amount").and_then(FieldValue::to_number).unwrap_or(0.0);
        assert_eq!(format_number(amount, &NumberFormat::default()), "1,235");
    }
}
