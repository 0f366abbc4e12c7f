use rust_decimal::Decimal;
use std::collections::HashSet;
use std::io::Read;
use std::str::FromStr;
use tracing::{debug, warn};

use super::LoaderOptions;
use crate::error::RiskError;
use crate::types::Period;
use crate::RiskResult;

/// A delimited file held in memory: month-keyed rows of raw cells.
#[derive(Debug)]
pub(crate) struct RawTable {
    /// Value column headers (the index header excluded)
    headers: Vec<String>,
    periods: Vec<Period>,
    /// rows[i][j] is the cell of value column j at periods[i]
    rows: Vec<Vec<String>>,
}

impl RawTable {
    pub(crate) fn read<R: Read>(reader: R, options: &LoaderOptions) -> RiskResult<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(options.delimiter_byte()?)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = rdr.headers()?.iter().skip(1).map(str::to_string).collect();

        let mut keyed: Vec<(Period, Vec<String>)> = Vec::new();
        for record in rdr.records() {
            let record = record?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            let index = record.get(0).ok_or_else(|| {
                RiskError::format(format!("line {}", line), "Missing date index")
            })?;
            let period = options.date_layout.parse(index).map_err(|e| match e {
                RiskError::Format { reason, .. } => RiskError::Format {
                    context: format!("line {}", line),
                    reason,
                },
                other => other,
            })?;
            keyed.push((period, record.iter().skip(1).map(str::to_string).collect()));
        }

        if keyed.windows(2).any(|w| w[1].0 < w[0].0) {
            warn!(rows = keyed.len(), "rows are not in period order, sorting");
            keyed.sort_by_key(|(p, _)| *p);
        }

        let mut seen = HashSet::with_capacity(keyed.len());
        for (period, _) in &keyed {
            if !seen.insert(*period) {
                return Err(RiskError::format(
                    "date index",
                    format!("More than one row falls in period {}", period),
                ));
            }
        }

        let (periods, rows) = keyed.into_iter().unzip();
        Ok(RawTable {
            headers,
            periods,
            rows,
        })
    }

    pub(crate) fn headers(&self) -> &[String] {
        &self.headers
    }

    pub(crate) fn len(&self) -> usize {
        self.periods.len()
    }

    /// Parse one value column to decimals, paired with its periods.
    pub(crate) fn column(&self, name: &str) -> RiskResult<Vec<(Period, Decimal)>> {
        let idx = self
            .headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| {
                RiskError::format(
                    "header",
                    format!(
                        "Column '{}' not found (available: {})",
                        name,
                        self.headers.join(", ")
                    ),
                )
            })?;

        let values = self
            .periods
            .iter()
            .zip(self.rows.iter())
            .map(|(period, row)| {
                let cell = row.get(idx).map(String::as_str).unwrap_or("");
                parse_decimal(cell)
                    .map(|v| (*period, v))
                    .ok_or_else(|| {
                        RiskError::format(
                            format!("column '{}' at {}", name, period),
                            format!("Malformed numeric value '{}'", cell),
                        )
                    })
            })
            .collect::<RiskResult<Vec<_>>>()?;

        debug!(column = name, rows = values.len(), "parsed column");
        Ok(values)
    }
}

fn parse_decimal(cell: &str) -> Option<Decimal> {
    if cell.is_empty() {
        return None;
    }
    Decimal::from_str(cell)
        .or_else(|_| Decimal::from_scientific(cell))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const PRICES: &str = "date,AAA,BBB\n\
                          2020-01-31,100,50\n\
                          2020-02-29,110,55\n\
                          2020-03-31,99,1.5e1\n";

    #[test]
    fn test_reads_headers_and_periods() {
        let raw = RawTable::read(PRICES.as_bytes(), &LoaderOptions::default()).unwrap();
        assert_eq!(raw.headers(), &["AAA".to_string(), "BBB".to_string()]);
        assert_eq!(raw.len(), 3);
        let bbb = raw.column("BBB").unwrap();
        assert_eq!(bbb[2].1, dec!(15));
    }

    #[test]
    fn test_missing_column_is_format_error() {
        let raw = RawTable::read(PRICES.as_bytes(), &LoaderOptions::default()).unwrap();
        assert!(matches!(raw.column("CCC"), Err(RiskError::Format { .. })));
    }

    #[test]
    fn test_unsorted_rows_are_sorted() {
        let csv = "date,X\n2020-03-31,3\n2020-01-31,1\n2020-02-29,2\n";
        let raw = RawTable::read(csv.as_bytes(), &LoaderOptions::default()).unwrap();
        let x = raw.column("X").unwrap();
        assert_eq!(x[0].1, dec!(1));
        assert_eq!(x[2].1, dec!(3));
    }

    #[test]
    fn test_duplicate_month_rejected() {
        let csv = "date,X\n2020-01-02,1\n2020-01-03,2\n";
        let err = RawTable::read(csv.as_bytes(), &LoaderOptions::default()).unwrap_err();
        assert!(matches!(err, RiskError::Format { .. }));
    }

    #[test]
    fn test_bad_date_reports_line() {
        let csv = "date,X\n2020-01-31,1\nnope,2\n";
        match RawTable::read(csv.as_bytes(), &LoaderOptions::default()) {
            Err(RiskError::Format { context, .. }) => assert_eq!(context, "line 3"),
            other => panic!("expected format error, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_cell_is_malformed() {
        let csv = "date,X\n2020-01-31,1\n2020-02-29,\n";
        let raw = RawTable::read(csv.as_bytes(), &LoaderOptions::default()).unwrap();
        assert!(raw.column("X").is_err());
    }
}
