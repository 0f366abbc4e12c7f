use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::RiskError;
use crate::RiskResult;

/// All monetary values (principal, wealth).
pub type Money = Decimal;

/// Returns expressed as decimals (0.01 = +1%). Never as percentages.
pub type Rate = Decimal;

/// A calendar month. Every return observation is keyed by one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> RiskResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(RiskError::invalid(
                "month",
                format!("Month must be in 1..=12, got {}", month),
            ));
        }
        Ok(Period { year, month })
    }

    /// Truncate a calendar date to its month.
    pub fn from_date(date: NaiveDate) -> Self {
        Period {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Period {
    type Err = RiskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| RiskError::format("period", format!("Expected YYYY-MM, got '{}'", s)))?;
        let year: i32 = year
            .parse()
            .map_err(|_| RiskError::format("period", format!("Bad year in '{}'", s)))?;
        let month: u32 = month
            .parse()
            .map_err(|_| RiskError::format("period", format!("Bad month in '{}'", s)))?;
        Period::new(year, month)
    }
}

impl TryFrom<String> for Period {
    type Error = RiskError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Period> for String {
    fn from(p: Period) -> Self {
        p.to_string()
    }
}

/// One (period, return) pair of a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub period: Period,
    pub value: Rate,
}

/// JSON form of a [`ReturnSeries`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeriesRepr {
    pub name: String,
    pub observations: Vec<Observation>,
}

/// A named, period-ordered series of fractional returns.
///
/// Periods are strictly ascending; the series is immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SeriesRepr", into = "SeriesRepr")]
pub struct ReturnSeries {
    name: String,
    periods: Vec<Period>,
    values: Vec<Rate>,
}

impl ReturnSeries {
    pub fn new(name: impl Into<String>, observations: Vec<(Period, Rate)>) -> RiskResult<Self> {
        let name = name.into();
        for pair in observations.windows(2) {
            if pair[1].0 <= pair[0].0 {
                return Err(RiskError::invalid(
                    format!("{}.periods", name),
                    format!(
                        "Periods must be strictly ascending ({} follows {})",
                        pair[1].0, pair[0].0
                    ),
                ));
            }
        }
        let (periods, values) = observations.into_iter().unzip();
        Ok(ReturnSeries {
            name,
            periods,
            values,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    pub fn returns(&self) -> &[Rate] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Observation> + '_ {
        self.periods
            .iter()
            .zip(self.values.iter())
            .map(|(p, v)| Observation {
                period: *p,
                value: *v,
            })
    }

    /// Same observations under a new name.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        ReturnSeries {
            name: name.into(),
            periods: self.periods.clone(),
            values: self.values.clone(),
        }
    }
}

impl TryFrom<SeriesRepr> for ReturnSeries {
    type Error = RiskError;

    fn try_from(repr: SeriesRepr) -> Result<Self, Self::Error> {
        ReturnSeries::new(
            repr.name,
            repr.observations
                .into_iter()
                .map(|o| (o.period, o.value))
                .collect(),
        )
    }
}

impl From<ReturnSeries> for SeriesRepr {
    fn from(s: ReturnSeries) -> Self {
        let observations = s.iter().collect();
        SeriesRepr {
            name: s.name,
            observations,
        }
    }
}

/// JSON form of a [`ReturnTable`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableRepr {
    pub series: Vec<ReturnSeries>,
}

/// Several named return series sharing one period axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TableRepr", into = "TableRepr")]
pub struct ReturnTable {
    series: Vec<ReturnSeries>,
}

impl ReturnTable {
    pub fn new(series: Vec<ReturnSeries>) -> RiskResult<Self> {
        let mut names = HashSet::new();
        for s in &series {
            if !names.insert(s.name()) {
                return Err(RiskError::invalid(
                    "series",
                    format!("Duplicate series name '{}'", s.name()),
                ));
            }
        }
        if let Some(first) = series.first() {
            for s in &series[1..] {
                if s.periods() != first.periods() {
                    return Err(RiskError::invalid(
                        format!("{}.periods", s.name()),
                        format!("Not aligned with '{}'", first.name()),
                    ));
                }
            }
        }
        Ok(ReturnTable { series })
    }

    pub fn periods(&self) -> &[Period] {
        self.series.first().map(|s| s.periods()).unwrap_or(&[])
    }

    pub fn series(&self) -> &[ReturnSeries] {
        &self.series
    }

    pub fn column(&self, name: &str) -> Option<&ReturnSeries> {
        self.series.iter().find(|s| s.name() == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.series.iter().map(|s| s.name())
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

impl TryFrom<TableRepr> for ReturnTable {
    type Error = RiskError;

    fn try_from(repr: TableRepr) -> Result<Self, Self::Error> {
        ReturnTable::new(repr.series)
    }
}

impl From<ReturnTable> for TableRepr {
    fn from(t: ReturnTable) -> Self {
        TableRepr { series: t.series }
    }
}

/// Either a single return series or a table of them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReturnData {
    Series(ReturnSeries),
    Table(ReturnTable),
}

impl ReturnData {
    /// Interpret a JSON value as a series (`{"name", "observations"}`) or a
    /// table (`{"series": [...]}`). Anything else is unsupported.
    pub fn from_value(value: serde_json::Value) -> RiskResult<Self> {
        let kind = match &value {
            serde_json::Value::Object(map) if map.contains_key("observations") => "series",
            serde_json::Value::Object(map) if map.contains_key("series") => "table",
            serde_json::Value::Object(_) => "object without 'observations' or 'series'",
            serde_json::Value::Array(_) => "array",
            serde_json::Value::String(_) => "string",
            serde_json::Value::Number(_) => "number",
            serde_json::Value::Bool(_) => "boolean",
            serde_json::Value::Null => "null",
        };
        match kind {
            "series" => Ok(ReturnData::Series(serde_json::from_value(value)?)),
            "table" => Ok(ReturnData::Table(serde_json::from_value(value)?)),
            other => Err(RiskError::UnsupportedInput(format!(
                "Expected a return series or a return table, got {}",
                other
            ))),
        }
    }

    /// Apply a per-series statistic: scalar for a series, one entry per
    /// column for a table.
    pub fn map_series<F>(&self, mut f: F) -> RiskResult<RiskValue>
    where
        F: FnMut(&ReturnSeries) -> RiskResult<Decimal>,
    {
        match self {
            ReturnData::Series(s) => Ok(RiskValue::Scalar(f(s)?)),
            ReturnData::Table(t) => {
                let mut values = Vec::with_capacity(t.len());
                for s in t.series() {
                    values.push(NamedValue {
                        name: s.name().to_string(),
                        value: f(s)?,
                    });
                }
                Ok(RiskValue::PerSeries(values))
            }
        }
    }

    pub fn series(&self) -> &[ReturnSeries] {
        match self {
            ReturnData::Series(s) => std::slice::from_ref(s),
            ReturnData::Table(t) => t.series(),
        }
    }
}

impl From<ReturnSeries> for ReturnData {
    fn from(s: ReturnSeries) -> Self {
        ReturnData::Series(s)
    }
}

impl From<ReturnTable> for ReturnData {
    fn from(t: ReturnTable) -> Self {
        ReturnData::Table(t)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedValue {
    pub name: String,
    pub value: Decimal,
}

/// Result of a statistic over [`ReturnData`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RiskValue {
    Scalar(Decimal),
    PerSeries(Vec<NamedValue>),
}

impl RiskValue {
    pub fn as_scalar(&self) -> Option<Decimal> {
        match self {
            RiskValue::Scalar(v) => Some(*v),
            RiskValue::PerSeries(_) => None,
        }
    }

    pub fn get(&self, name: &str) -> Option<Decimal> {
        match self {
            RiskValue::Scalar(_) => None,
            RiskValue::PerSeries(values) => {
                values.iter().find(|v| v.name == name).map(|v| v.value)
            }
        }
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn p(y: i32, m: u32) -> Period {
        Period::new(y, m).unwrap()
    }

    #[test]
    fn test_period_display_and_parse() {
        let period = p(1997, 1);
        assert_eq!(period.to_string(), "1997-01");
        assert_eq!("1997-01".parse::<Period>().unwrap(), period);
        assert!("1997-13".parse::<Period>().is_err());
        assert!("199701".parse::<Period>().is_err());
    }

    #[test]
    fn test_period_ordering() {
        assert!(p(1999, 12) < p(2000, 1));
        assert!(p(2000, 2) > p(2000, 1));
    }

    #[test]
    fn test_series_rejects_unsorted_periods() {
        let err = ReturnSeries::new("x", vec![(p(2000, 2), dec!(0.01)), (p(2000, 1), dec!(0.02))]);
        assert!(matches!(err, Err(RiskError::InvalidInput { .. })));
    }

    #[test]
    fn test_series_rejects_duplicate_periods() {
        let err = ReturnSeries::new("x", vec![(p(2000, 1), dec!(0.01)), (p(2000, 1), dec!(0.02))]);
        assert!(err.is_err());
    }

    #[test]
    fn test_table_rejects_misaligned_series() {
        let a = ReturnSeries::new("a", vec![(p(2000, 1), dec!(0.01))]).unwrap();
        let b = ReturnSeries::new("b", vec![(p(2000, 2), dec!(0.01))]).unwrap();
        assert!(ReturnTable::new(vec![a, b]).is_err());
    }

    #[test]
    fn test_table_rejects_duplicate_names() {
        let a = ReturnSeries::new("a", vec![(p(2000, 1), dec!(0.01))]).unwrap();
        assert!(ReturnTable::new(vec![a.clone(), a]).is_err());
    }

    #[test]
    fn test_series_json_shape() {
        let s = ReturnSeries::new("fund", vec![(p(2020, 1), dec!(0.015))]).unwrap();
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["name"], "fund");
        assert_eq!(json["observations"][0]["period"], "2020-01");
        let back: ReturnSeries = serde_json::from_value(json).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn test_return_data_rejects_scalars() {
        let err = ReturnData::from_value(serde_json::json!(42)).unwrap_err();
        assert!(matches!(err, RiskError::UnsupportedInput(_)));
        let err = ReturnData::from_value(serde_json::json!({"values": [1, 2]})).unwrap_err();
        assert!(matches!(err, RiskError::UnsupportedInput(_)));
    }

    #[test]
    fn test_return_data_accepts_table() {
        let json = serde_json::json!({
            "series": [
                {"name": "a", "observations": [{"period": "2000-01", "value": 0.01}]},
                {"name": "b", "observations": [{"period": "2000-01", "value": "-0.02"}]}
            ]
        });
        match ReturnData::from_value(json).unwrap() {
            ReturnData::Table(t) => {
                assert_eq!(t.len(), 2);
                assert_eq!(t.column("b").unwrap().returns()[0], dec!(-0.02));
            }
            other => panic!("expected table, got {:?}", other),
        }
    }

    #[test]
    fn test_map_series_keeps_column_order() {
        let a = ReturnSeries::new("zeta", vec![(p(2000, 1), dec!(0.01))]).unwrap();
        let b = ReturnSeries::new("alpha", vec![(p(2000, 1), dec!(0.02))]).unwrap();
        let data = ReturnData::from(ReturnTable::new(vec![a, b]).unwrap());
        let out = data.map_series(|s| Ok(s.returns()[0])).unwrap();
        match out {
            RiskValue::PerSeries(values) => {
                assert_eq!(values[0].name, "zeta");
                assert_eq!(values[1].name, "alpha");
            }
            RiskValue::Scalar(_) => panic!("expected per-series result"),
        }
    }
}
