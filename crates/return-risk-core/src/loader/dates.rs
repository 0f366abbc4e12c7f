use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::RiskError;
use crate::types::Period;
use crate::RiskResult;

/// How the index column encodes dates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateLayout {
    /// Detect per cell from the formats below
    #[default]
    Auto,
    /// `199701`
    YearMonthCompact,
    /// `1997-01`
    YearMonth,
    /// `1997-01-31`, optionally followed by a time
    Iso,
    /// `31/01/1997`
    DayFirst,
}

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"];

impl DateLayout {
    /// Parse an index cell and truncate it to its month.
    pub fn parse(&self, cell: &str) -> RiskResult<Period> {
        let cell = cell.trim();
        let parsed = match self {
            DateLayout::Auto => parse_auto(cell),
            DateLayout::YearMonthCompact => parse_compact(cell),
            DateLayout::YearMonth => parse_year_month(cell),
            DateLayout::Iso => parse_date(date_part(cell), "%Y-%m-%d"),
            DateLayout::DayFirst => parse_date(cell, "%d/%m/%Y"),
        };
        parsed.ok_or_else(|| {
            RiskError::format(
                "date index",
                format!("Unparsable date '{}' for layout {:?}", cell, self),
            )
        })
    }
}

fn parse_auto(cell: &str) -> Option<Period> {
    if cell.len() == 6 && cell.bytes().all(|b| b.is_ascii_digit()) {
        return parse_compact(cell);
    }
    if cell.len() == 7 && cell.as_bytes().get(4) == Some(&b'-') {
        return parse_year_month(cell);
    }
    let date = date_part(cell);
    DATE_FORMATS.iter().find_map(|fmt| parse_date(date, fmt))
}

fn parse_compact(cell: &str) -> Option<Period> {
    if cell.len() != 6 {
        return None;
    }
    let year = cell.get(..4)?.parse().ok()?;
    let month = cell.get(4..)?.parse().ok()?;
    Period::new(year, month).ok()
}

fn parse_year_month(cell: &str) -> Option<Period> {
    cell.parse().ok()
}

fn parse_date(cell: &str, fmt: &str) -> Option<Period> {
    NaiveDate::parse_from_str(cell, fmt)
        .ok()
        .map(Period::from_date)
}

/// Drop a trailing time component (`1997-01-31 00:00:00`, `1997-01-31T00:00`).
fn date_part(cell: &str) -> &str {
    cell.split(|c| c == ' ' || c == 'T').next().unwrap_or(cell)
}
