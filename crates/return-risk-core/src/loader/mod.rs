//! Delimited-file loaders producing monthly return series.
//!
//! Two source layouts are handled: level series (prices, index values) that
//! are turned into period-over-period returns, and tables that already hold
//! returns in percent and only need rescaling to fractions.

mod csv_source;
pub mod dates;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::debug;

use crate::error::RiskError;
use crate::types::*;
use crate::RiskResult;
use csv_source::RawTable;

pub use dates::DateLayout;

/// Parsing options for the delimited source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoaderOptions {
    /// Field separator (ASCII)
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    #[serde(default)]
    pub date_layout: DateLayout,
}

fn default_delimiter() -> char {
    ','
}

impl Default for LoaderOptions {
    fn default() -> Self {
        LoaderOptions {
            delimiter: default_delimiter(),
            date_layout: DateLayout::Auto,
        }
    }
}

impl LoaderOptions {
    pub(crate) fn delimiter_byte(&self) -> RiskResult<u8> {
        if !self.delimiter.is_ascii() {
            return Err(RiskError::invalid(
                "delimiter",
                format!("Delimiter must be ASCII, got '{}'", self.delimiter),
            ));
        }
        Ok(self.delimiter as u8)
    }
}

/// A source column and the name its series takes in the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub column: String,
    pub name: String,
}

impl ColumnSpec {
    pub fn new(column: impl Into<String>, name: impl Into<String>) -> Self {
        ColumnSpec {
            column: column.into(),
            name: name.into(),
        }
    }
}

fn open(path: &Path) -> RiskResult<BufReader<File>> {
    let file = File::open(path)
        .map_err(|e| RiskError::Io(format!("Failed to read '{}': {}", path.display(), e)))?;
    Ok(BufReader::new(file))
}

/// v_t / v_{t-1} - 1 for each consecutive pair; the first observation has no
/// predecessor and is dropped.
fn pct_change(levels: &[(Period, Decimal)], name: &str) -> RiskResult<Vec<(Period, Rate)>> {
    levels
        .windows(2)
        .map(|w| {
            let (_, prev) = w[0];
            let (period, curr) = w[1];
            if prev.is_zero() {
                return Err(RiskError::DivisionByZero {
                    context: format!("percent change of '{}' at {} (previous level is zero)", name, period),
                });
            }
            Ok((period, curr / prev - Decimal::ONE))
        })
        .collect()
}

fn scale_percent(values: Vec<(Period, Decimal)>) -> Vec<(Period, Rate)> {
    values
        .into_iter()
        .map(|(p, v)| (p, v / dec!(100)))
        .collect()
}

// ---------------------------------------------------------------------------
// Level series -> returns
// ---------------------------------------------------------------------------

/// Read `column` of a date-indexed file of levels and return its monthly
/// returns, named `output_name`.
pub fn load_return_series(
    source: impl AsRef<Path>,
    column: &str,
    output_name: &str,
) -> RiskResult<ReturnSeries> {
    load_return_series_from_reader(
        open(source.as_ref())?,
        column,
        output_name,
        &LoaderOptions::default(),
    )
}

pub fn load_return_series_from_reader<R: Read>(
    reader: R,
    column: &str,
    output_name: &str,
    options: &LoaderOptions,
) -> RiskResult<ReturnSeries> {
    let raw = RawTable::read(reader, options)?;
    let levels = raw.column(column)?;
    let returns = pct_change(&levels, output_name)?;
    debug!(column, output_name, returns = returns.len(), "loaded return series");
    ReturnSeries::new(output_name, returns)
}

/// Monthly returns for several level columns, one series per [`ColumnSpec`].
pub fn load_return_table(
    source: impl AsRef<Path>,
    columns: &[ColumnSpec],
    options: &LoaderOptions,
) -> RiskResult<ReturnTable> {
    load_return_table_from_reader(open(source.as_ref())?, columns, options)
}

pub fn load_return_table_from_reader<R: Read>(
    reader: R,
    columns: &[ColumnSpec],
    options: &LoaderOptions,
) -> RiskResult<ReturnTable> {
    let raw = RawTable::read(reader, options)?;
    let series = columns
        .iter()
        .map(|spec| {
            let levels = raw.column(&spec.column)?;
            ReturnSeries::new(spec.name.as_str(), pct_change(&levels, &spec.name)?)
        })
        .collect::<RiskResult<Vec<_>>>()?;
    ReturnTable::new(series)
}

// ---------------------------------------------------------------------------
// Percent-formatted returns -> fractions
// ---------------------------------------------------------------------------

/// Read a file whose every value column already holds monthly returns in
/// percent (1.5 = 1.5%) and rescale them to fractions.
pub fn load_percent_scaled_table(source: impl AsRef<Path>) -> RiskResult<ReturnTable> {
    load_percent_scaled_table_from_reader(open(source.as_ref())?, &LoaderOptions::default())
}

pub fn load_percent_scaled_table_from_reader<R: Read>(
    reader: R,
    options: &LoaderOptions,
) -> RiskResult<ReturnTable> {
    let raw = RawTable::read(reader, options)?;
    let series = raw
        .headers()
        .iter()
        .map(|h| ReturnSeries::new(h.as_str(), scale_percent(raw.column(h)?)))
        .collect::<RiskResult<Vec<_>>>()?;
    debug!(columns = series.len(), rows = raw.len(), "loaded percent-scaled table");
    ReturnTable::new(series)
}

/// Like [`load_percent_scaled_table`] but keeps only the listed columns,
/// renamed per [`ColumnSpec`].
pub fn load_percent_scaled_columns(
    source: impl AsRef<Path>,
    columns: &[ColumnSpec],
    options: &LoaderOptions,
) -> RiskResult<ReturnTable> {
    load_percent_scaled_columns_from_reader(open(source.as_ref())?, columns, options)
}

pub fn load_percent_scaled_columns_from_reader<R: Read>(
    reader: R,
    columns: &[ColumnSpec],
    options: &LoaderOptions,
) -> RiskResult<ReturnTable> {
    let raw = RawTable::read(reader, options)?;
    let series = columns
        .iter()
        .map(|spec| ReturnSeries::new(spec.name.as_str(), scale_percent(raw.column(&spec.column)?)))
        .collect::<RiskResult<Vec<_>>>()?;
    ReturnTable::new(series)
}
