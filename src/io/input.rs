//! CSV readers for demand, supply, and capacity factor series.
//!
//! The first column holds timestamps; every other column is one series whose
//! header names it and, in brackets, its unit:
//!
//! ```text
//! timestamp,demand [GW]
//! 2050-01-01,41.2
//! 2050-01-02,43.9
//! ```
//!
//! A header without a unit is read as a plain fraction.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{Result, SimError};
use crate::series::TimeSeries;
use crate::supply::CapacityFactors;
use crate::units::Unit;

const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"];

/// Parses a timestamp cell. Bare dates map to midnight.
pub fn parse_timestamp(text: &str) -> Result<NaiveDateTime> {
    let text = text.trim();
    for format in DATETIME_FORMATS {
        if let Ok(t) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(t);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map(|d| d.and_time(chrono::NaiveTime::MIN))
        .map_err(|_| SimError::InvalidInput(format!("unrecognised timestamp \"{text}\"")))
}

/// Splits `"demand [GW]"` into its name and unit.
fn parse_header(header: &str) -> Result<(String, Unit)> {
    let header = header.trim();
    match header.split_once('[') {
        Some((name, rest)) => {
            let unit = rest.strip_suffix(']').ok_or_else(|| {
                SimError::InvalidInput(format!("unterminated unit in column \"{header}\""))
            })?;
            Ok((name.trim().to_string(), unit.trim().parse()?))
        }
        None => Ok((header.to_string(), Unit::Fraction)),
    }
}

/// Reads every value column of a CSV table.
///
/// # Errors
///
/// * [`SimError::Csv`] for malformed CSV
/// * [`SimError::InvalidInput`] for missing columns, bad timestamps or numbers,
///   or an irregular index
pub fn read_columns(reader: impl Read) -> Result<Vec<TimeSeries>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr.headers()?.clone();
    if headers.len() < 2 {
        return Err(SimError::InvalidInput(
            "expected a timestamp column followed by at least one value column".to_string(),
        ));
    }
    let columns = headers
        .iter()
        .skip(1)
        .map(parse_header)
        .collect::<Result<Vec<_>>>()?;

    let mut timestamps = Vec::new();
    let mut values: Vec<Vec<f64>> = vec![Vec::new(); columns.len()];
    for (row, record) in rdr.records().enumerate() {
        let record = record?;
        timestamps.push(parse_timestamp(&record[0])?);
        for (col, cell) in record.iter().skip(1).enumerate() {
            let value: f64 = cell.parse().map_err(|_| {
                SimError::InvalidInput(format!(
                    "row {}: column \"{}\" is not a number: \"{cell}\"",
                    row + 1,
                    columns[col].0
                ))
            })?;
            values[col].push(value);
        }
    }

    columns
        .into_iter()
        .zip(values)
        .map(|((name, unit), values)| TimeSeries::new(name, timestamps.clone(), values, unit))
        .collect()
}

/// Reads the first value column of a CSV file.
///
/// # Errors
///
/// See [`read_columns`]; also fails if the file cannot be opened.
pub fn read_series(path: &Path) -> Result<TimeSeries> {
    let file = File::open(path)?;
    read_columns(file)?
        .into_iter()
        .next()
        .ok_or_else(|| SimError::InvalidInput(format!("{} has no value column", path.display())))
}

/// Reads a `timestamp,solar,offshore,onshore` capacity factor table.
///
/// # Errors
///
/// See [`read_columns`] and [`CapacityFactors::from_columns`].
pub fn read_capacity_factors(path: &Path) -> Result<CapacityFactors> {
    let file = File::open(path)?;
    CapacityFactors::from_columns(read_columns(file)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("2050-01-02", "2050-01-02 00:00:00")]
    #[case("2050-01-02T06:30:00", "2050-01-02 06:30:00")]
    #[case("2050-01-02 06:30:00", "2050-01-02 06:30:00")]
    #[case("2050-01-02T06:30", "2050-01-02 06:30:00")]
    fn timestamps_parse(#[case] text: &str, #[case] expected: &str) {
        let expected = NaiveDateTime::parse_from_str(expected, "%Y-%m-%d %H:%M:%S").unwrap();
        assert_eq!(parse_timestamp(text).unwrap(), expected);
    }

    #[test]
    fn bad_timestamp_rejected() {
        assert!(matches!(parse_timestamp("yesterday"), Err(SimError::InvalidInput(_))));
    }

    #[test]
    fn reads_units_from_headers() {
        let csv = "timestamp,demand [GW],stored [TWh],share\n\
                   2050-01-01,40,1.5,0.2\n\
                   2050-01-02,42,1.4,0.3\n";
        let columns = read_columns(csv.as_bytes()).unwrap();
        assert_eq!(columns.len(), 3);
        assert_eq!(columns[0].name(), "demand");
        assert_eq!(columns[0].unit(), Unit::Gigawatt);
        assert_eq!(columns[1].unit(), Unit::TerawattHour);
        assert_eq!(columns[2].unit(), Unit::Fraction);
        assert_eq!(columns[0].values(), &[40.0, 42.0]);
        assert_eq!(columns[0].step_hours(), 24.0);
    }

    #[test]
    fn non_numeric_cell_names_row_and_column() {
        let csv = "timestamp,demand [GW]\n2050-01-01,40\n2050-01-02,n/a\n";
        let err = read_columns(csv.as_bytes()).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("row 2"), "{text}");
        assert!(text.contains("demand"), "{text}");
    }

    #[test]
    fn unknown_unit_rejected() {
        let csv = "timestamp,demand [furlongs]\n2050-01-01,40\n2050-01-02,41\n";
        assert!(read_columns(csv.as_bytes()).is_err());
    }

    #[test]
    fn irregular_index_rejected() {
        let csv = "timestamp,demand [GW]\n2050-01-01,40\n2050-01-02,41\n2050-01-04,39\n";
        assert!(matches!(read_columns(csv.as_bytes()), Err(SimError::InvalidInput(_))));
    }

    #[test]
    fn capacity_factor_columns_resolve_by_name() {
        let csv = "timestamp,onshore,solar,offshore\n\
                   2050-01-01T00:00:00,0.3,0.0,0.5\n\
                   2050-01-01T01:00:00,0.2,0.0,0.4\n";
        let factors = CapacityFactors::from_columns(read_columns(csv.as_bytes()).unwrap()).unwrap();
        assert_eq!(factors.onshore.values(), &[0.3, 0.2]);
        assert_eq!(factors.offshore.values(), &[0.5, 0.4]);
        assert_eq!(factors.solar.step_hours(), 1.0);
    }
}
