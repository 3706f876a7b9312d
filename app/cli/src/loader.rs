//! FILENAME: app/cli/src/loader.rs
//! PURPOSE: Reads datasets and widget configurations from disk.
//! CONTEXT: JSON datasets are arrays of objects. CSV datasets have a header
//! row; cells are typed as null, boolean, number or text.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context};
use clap::ValueEnum;
use engine::{records_from_json_str, FieldValue, Record};
use widget_engine::WidgetDefinition;

/// On-disk dataset encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DataFormat {
    Json,
    Csv,
}

impl DataFormat {
    /// Guesses the format from the file extension.
    pub fn from_path(path: &Path) -> Option<DataFormat> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "json" => Some(DataFormat::Json),
            "csv" => Some(DataFormat::Csv),
            _ => None,
        }
    }
}

/// Loads a dataset, using `format` or else the file extension.
pub fn load_records(path: &Path, format: Option<DataFormat>) -> anyhow::Result<Vec<Record>> {
    let Some(format) = format.or_else(|| DataFormat::from_path(path)) else {
        bail!(
            "Cannot tell the format of {:?}; pass --data-format json|csv",
            path
        );
    };

    let records = match format {
        DataFormat::Json => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read data file {:?}", path))?;
            records_from_json_str(&text)
                .with_context(|| format!("Invalid JSON dataset in {:?}", path))?
        }
        DataFormat::Csv => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open data file {:?}", path))?;
            parse_csv_records(file)
                .with_context(|| format!("Invalid CSV dataset in {:?}", path))?
        }
    };

    log::info!(target: "LOADER", "loaded {} records from {:?}", records.len(), path);
    Ok(records)
}

/// Parses CSV with a header row into records.
pub fn parse_csv_records<R: Read>(reader: R) -> anyhow::Result<Vec<Record>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let mut records = Vec::new();

    for result in rdr.records() {
        let row = result?;
        let mut record = Record::with_capacity(headers.len());
        for (header, cell) in headers.iter().zip(row.iter()) {
            record.insert(header, parse_csv_cell(cell));
        }
        records.push(record);
    }

    Ok(records)
}

/// Types a CSV cell: empty -> null, true/false -> boolean, finite number -> number.
pub fn parse_csv_cell(cell: &str) -> FieldValue {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return FieldValue::Null;
    }
    match trimmed {
        "true" => FieldValue::Boolean(true),
        "false" => FieldValue::Boolean(false),
        _ => match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => FieldValue::Number(n),
            _ => FieldValue::Text(cell.to_string()),
        },
    }
}

/// Loads and validates a widget configuration.
/// `utc_offset_minutes` overrides the offset stored in the file.
pub fn load_definition(path: &Path, utc_offset_minutes: Option<i32>) -> anyhow::Result<WidgetDefinition> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {:?}", path))?;
    let mut definition = WidgetDefinition::from_json_str(&text)
        .with_context(|| format!("Invalid widget configuration in {:?}", path))?;

    if let Some(minutes) = utc_offset_minutes {
        definition.utc_offset_minutes = minutes;
        definition.validate()?;
    }

    Ok(definition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_file(suffix: &str, contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_parse_csv_cell() {
        assert_eq!(parse_csv_cell(""), FieldValue::Null);
        assert_eq!(parse_csv_cell("  "), FieldValue::Null);
        assert_eq!(parse_csv_cell("true"), FieldValue::Boolean(true));
        assert_eq!(parse_csv_cell("12.5"), FieldValue::Number(12.5));
        assert_eq!(parse_csv_cell("NaN"), FieldValue::Text("NaN".to_string()));
        assert_eq!(parse_csv_cell("EU"), FieldValue::Text("EU".to_string()));
    }

    #[test]
    fn test_load_csv_records() {
        let file = temp_file(".csv", "region,sales,active\nEU,10,true\nUS,,false\n");
        let records = load_records(file.path(), None).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("sales"), Some(&FieldValue::Number(10.0)));
        assert_eq!(records[1].get("sales"), None);
        assert_eq!(records[1].get("active"), Some(&FieldValue::Boolean(false)));
    }

    #[test]
    fn test_load_json_records() {
        let file = temp_file(".json", r#"[{"region": "EU", "sales": 10}]"#);
        let records = load_records(file.path(), None).unwrap();
        assert_eq!(records[0].get("region"), Some(&FieldValue::from("EU")));

        let not_an_array = temp_file(".json", r#"{"region": "EU"}"#);
        assert!(load_records(not_an_array.path(), None).is_err());
    }

    #[test]
    fn test_explicit_format_wins_over_extension() {
        let file = temp_file(".txt", "a\n1\n");
        assert!(load_records(file.path(), None).is_err());
        let records = load_records(file.path(), Some(DataFormat::Csv)).unwrap();
        assert_eq!(records[0].get("a"), Some(&FieldValue::Number(1.0)));
    }

    #[test]
    fn test_load_definition_with_offset_override() {
        let file = temp_file(".json", r#"{"metrics": [{"agg": "count"}]}"#);
        let definition = load_definition(file.path(), Some(120)).unwrap();
        assert_eq!(definition.utc_offset_minutes, 120);

        assert!(load_definition(file.path(), Some(100_000)).is_err());

        let invalid = temp_file(".json", r#"{"buckets": [{"field": "a", "type": "terms", "size": 0}]}"#);
        assert!(load_definition(invalid.path(), None).is_err());
    }
}
