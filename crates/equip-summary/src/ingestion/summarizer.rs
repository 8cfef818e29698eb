//! CSV summarizer
//!
//! Turns the raw bytes of an uploaded equipment table into a [`Summary`].
//! Pure function of its input: nothing is persisted here.

use std::collections::BTreeMap;

use crate::config::SchemaConfig;
use crate::error::{Error, Result};
use crate::types::Summary;

/// Numeric column holding flow rates
pub const FLOWRATE_COLUMN: &str = "Flowrate";
/// Numeric column holding pressures
pub const PRESSURE_COLUMN: &str = "Pressure";
/// Numeric column holding temperatures
pub const TEMPERATURE_COLUMN: &str = "Temperature";
/// Categorical column holding equipment types
pub const TYPE_COLUMN: &str = "Type";

/// Column requirements checked before aggregation
#[derive(Debug, Clone)]
pub struct SummarySchema {
    required: Vec<String>,
}

impl SummarySchema {
    pub fn new<I, S>(required: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            required: required.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &SchemaConfig) -> Self {
        Self::new(config.required_columns.iter().cloned())
    }

    /// Schema requiring all four known columns
    pub fn strict() -> Self {
        Self::new([FLOWRATE_COLUMN, PRESSURE_COLUMN, TEMPERATURE_COLUMN, TYPE_COLUMN])
    }

    pub fn required(&self) -> &[String] {
        &self.required
    }

    fn validate(&self, filename: &str, headers: &[String]) -> Result<()> {
        for column in &self.required {
            if column_index(headers, column).is_none() {
                return Err(Error::missing_column(filename, column.clone()));
            }
        }
        Ok(())
    }
}

impl Default for SummarySchema {
    fn default() -> Self {
        Self::from_config(&SchemaConfig::default())
    }
}

/// Running arithmetic mean over the numeric cells of one column
#[derive(Debug, Default)]
struct ColumnMean {
    sum: f64,
    count: u64,
}

impl ColumnMean {
    fn push(&mut self, raw: Option<&str>) {
        if let Some(value) = raw.and_then(parse_number) {
            self.sum += value;
            self.count += 1;
        }
    }

    fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

/// Summarize an uploaded CSV table
///
/// Empty or non-numeric cells are left out of their own column's mean only.
/// A numeric column missing from the header yields `None` for its average.
pub fn summarize(filename: &str, data: &[u8], schema: &SummarySchema) -> Result<Summary> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(data);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| Error::parse(filename, e.to_string()))?
        .iter()
        .map(normalize_header)
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(Error::parse(filename, "no header row"));
    }

    schema.validate(filename, &headers)?;

    let flow_idx = column_index(&headers, FLOWRATE_COLUMN);
    let pressure_idx = column_index(&headers, PRESSURE_COLUMN);
    let temperature_idx = column_index(&headers, TEMPERATURE_COLUMN);
    let type_idx = column_index(&headers, TYPE_COLUMN);

    let mut total_equipment = 0u64;
    let mut flowrate = ColumnMean::default();
    let mut pressure = ColumnMean::default();
    let mut temperature = ColumnMean::default();
    let mut type_distribution: BTreeMap<String, u64> = BTreeMap::new();

    for (row, result) in reader.records().enumerate() {
        let record = result.map_err(|e| Error::parse(filename, e.to_string()))?;

        if record.len() > headers.len() {
            // Line 1 is the header
            return Err(Error::parse(
                filename,
                format!(
                    "line {}: expected {} fields, found {}",
                    row + 2,
                    headers.len(),
                    record.len()
                ),
            ));
        }

        total_equipment += 1;
        flowrate.push(flow_idx.and_then(|i| record.get(i)));
        pressure.push(pressure_idx.and_then(|i| record.get(i)));
        temperature.push(temperature_idx.and_then(|i| record.get(i)));

        if let Some(value) = type_idx.and_then(|i| record.get(i)) {
            *type_distribution.entry(value.to_string()).or_insert(0) += 1;
        }
    }

    tracing::debug!(
        "Summarized '{}': {} rows, {} types",
        filename,
        total_equipment,
        type_distribution.len()
    );

    Ok(Summary::new(
        total_equipment,
        flowrate.mean(),
        pressure.mean(),
        temperature.mean(),
        type_distribution,
    ))
}

fn normalize_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}').trim().to_string()
}

fn column_index(headers: &[String], name: &str) -> Option<usize> {
    headers.iter().position(|h| h == name)
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(csv: &str) -> Result<Summary> {
        summarize("equipment.csv", csv.as_bytes(), &SummarySchema::default())
    }

    #[test]
    fn test_two_row_scenario() {
        let summary = run(
            "Equipment Name,Type,Flowrate,Pressure,Temperature\n\
             P-1,pump,10,1,20\n\
             V-1,valve,20,3,30\n",
        )
        .unwrap();

        assert_eq!(summary.total_equipment(), 2);
        assert_eq!(summary.avg_flowrate(), Some(15.0));
        assert_eq!(summary.avg_pressure(), Some(2.0));
        assert_eq!(summary.avg_temperature(), Some(25.0));
        assert_eq!(summary.type_distribution().get("pump"), Some(&1));
        assert_eq!(summary.type_distribution().get("valve"), Some(&1));
        assert_eq!(summary.type_distribution().len(), 2);
    }

    #[test]
    fn test_absent_numeric_column_is_missing_not_zero() {
        let summary = run("Type,Flowrate\npump,4\nvalve,6\n").unwrap();

        assert_eq!(summary.avg_flowrate(), Some(5.0));
        assert_eq!(summary.avg_pressure(), None);
        assert_eq!(summary.avg_temperature(), None);
    }

    #[test]
    fn test_non_numeric_cells_excluded_per_column() {
        let summary = run(
            "Type,Flowrate,Pressure,Temperature\n\
             pump,10,n/a,20\n\
             pump,,4,\n\
             valve,30,6,40\n",
        )
        .unwrap();

        assert_eq!(summary.total_equipment(), 3);
        assert_eq!(summary.avg_flowrate(), Some(20.0));
        assert_eq!(summary.avg_pressure(), Some(5.0));
        assert_eq!(summary.avg_temperature(), Some(30.0));
    }

    #[test]
    fn test_nan_text_is_missing() {
        let summary = run("Type,Flowrate\npump,NaN\npump,8\n").unwrap();
        assert_eq!(summary.avg_flowrate(), Some(8.0));
    }

    #[test]
    fn test_distribution_sums_to_total() {
        let summary = run(
            "Type,Flowrate\npump,1\npump,2\nvalve,3\ncompressor,4\npump,5\n",
        )
        .unwrap();

        let sum: u64 = summary.type_distribution().values().sum();
        assert_eq!(sum, summary.total_equipment());
        assert_eq!(summary.type_distribution().get("pump"), Some(&3));
    }

    #[test]
    fn test_empty_type_value_is_counted() {
        let summary = run("Type,Flowrate\n,1\npump,2\n").unwrap();
        assert_eq!(summary.type_distribution().get(""), Some(&1));
        assert_eq!(summary.type_distribution().get("pump"), Some(&1));
    }

    #[test]
    fn test_short_row_counts_but_contributes_nothing_missing() {
        let summary = run("Flowrate,Pressure,Type\n10,2,pump\n20\n").unwrap();

        assert_eq!(summary.total_equipment(), 2);
        assert_eq!(summary.avg_flowrate(), Some(15.0));
        assert_eq!(summary.avg_pressure(), Some(2.0));
        assert_eq!(summary.type_distribution().values().sum::<u64>(), 1);
    }

    #[test]
    fn test_header_only() {
        let summary = run("Type,Flowrate,Pressure,Temperature\n").unwrap();

        assert_eq!(summary.total_equipment(), 0);
        assert_eq!(summary.avg_flowrate(), None);
        assert!(summary.type_distribution().is_empty());
    }

    #[test]
    fn test_header_whitespace_and_bom() {
        let summary = run("\u{feff}Type , Flowrate\npump,3\n").unwrap();
        assert_eq!(summary.avg_flowrate(), Some(3.0));
        assert_eq!(summary.type_distribution().get("pump"), Some(&1));
    }

    #[test]
    fn test_missing_required_column() {
        let err = run("Flowrate,Pressure\n1,2\n").unwrap_err();
        match err {
            Error::MissingColumn { column, filename } => {
                assert_eq!(column, "Type");
                assert_eq!(filename, "equipment.csv");
            }
            other => panic!("expected MissingColumn, got {:?}", other),
        }
    }

    #[test]
    fn test_strict_schema_requires_numeric_columns() {
        let err = summarize("a.csv", b"Type,Flowrate\npump,1\n", &SummarySchema::strict())
            .unwrap_err();
        assert!(matches!(err, Error::MissingColumn { ref column, .. } if column == "Pressure"));
    }

    #[test]
    fn test_empty_input_is_parse_error() {
        assert!(matches!(run(""), Err(Error::Parse { .. })));
    }

    #[test]
    fn test_extra_fields_is_parse_error() {
        let err = run("Type,Flowrate\npump,1\npump,2,3\n").unwrap_err();
        match err {
            Error::Parse { message, .. } => assert!(message.contains("line 3")),
            other => panic!("expected Parse, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_utf8_is_parse_error() {
        let data = b"Type,Flowrate\n\xff\xfe,1\n";
        let result = summarize("bad.csv", data, &SummarySchema::default());
        assert!(matches!(result, Err(Error::Parse { .. })));
    }
}
