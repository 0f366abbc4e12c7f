use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::RiskError;
use crate::risk::{
    cvar_historic_series, drawdown, jarque_bera, kurtosis, skewness, var_gaussian_series,
    var_historic_series, JarqueBera, MaxDrawdown,
};
use crate::types::*;
use crate::RiskResult;

/// Run-time settings for [`analyze_returns`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    /// VaR / CVaR level in percent
    #[serde(default = "default_var_level")]
    pub var_level: Decimal,
    /// Jarque-Bera significance level
    #[serde(default = "default_normality_level")]
    pub normality_level: Decimal,
    #[serde(default = "default_periods_per_year")]
    pub periods_per_year: u32,
    /// Annual risk-free rate for the Sharpe ratio
    #[serde(default = "default_riskfree_rate")]
    pub riskfree_rate: Rate,
    /// Samples shorter than this are flagged in the warnings
    #[serde(default = "default_min_observations")]
    pub min_observations: usize,
}

fn default_var_level() -> Decimal {
    crate::risk::DEFAULT_VAR_LEVEL
}

fn default_normality_level() -> Decimal {
    crate::risk::DEFAULT_NORMALITY_LEVEL
}

fn default_periods_per_year() -> u32 {
    12
}

fn default_riskfree_rate() -> Rate {
    dec!(0.03)
}

fn default_min_observations() -> usize {
    12
}

impl Default for RiskConfig {
    fn default() -> Self {
        RiskConfig {
            var_level: default_var_level(),
            normality_level: default_normality_level(),
            periods_per_year: default_periods_per_year(),
            riskfree_rate: default_riskfree_rate(),
            min_observations: default_min_observations(),
        }
    }
}

/// Input for a full risk report over one series or a table of series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisInput {
    /// A return series or return table in JSON form
    pub returns: serde_json::Value,
    /// Starting wealth for the drawdown trajectory
    #[serde(default = "default_principal")]
    pub principal: Money,
    #[serde(default)]
    pub config: RiskConfig,
}

fn default_principal() -> Money {
    dec!(1000)
}

/// Risk report for a single series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesAnalysis {
    pub name: String,
    pub observations: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annualized_return: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annualized_volatility: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sharpe_ratio: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semideviation: Option<Rate>,
    pub skewness: Decimal,
    /// Raw kurtosis (3 for a normal distribution)
    pub kurtosis: Decimal,
    pub jarque_bera: JarqueBera,
    pub is_normal: bool,
    pub var_historic: Decimal,
    pub var_gaussian: Decimal,
    pub var_cornish_fisher: Decimal,
    pub cvar_historic: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_drawdown: Option<MaxDrawdown>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutput {
    pub series: Vec<SeriesAnalysis>,
}

/// Compute every risk statistic for each series in `input.returns`.
pub fn analyze_returns(input: &AnalysisInput) -> RiskResult<ComputationOutput<AnalysisOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    let config = &input.config;

    if input.principal <= Decimal::ZERO {
        return Err(RiskError::invalid("principal", "Must be positive"));
    }
    if config.normality_level <= Decimal::ZERO || config.normality_level >= Decimal::ONE {
        return Err(RiskError::invalid(
            "config.normality_level",
            "Significance level must be between 0 and 1 (exclusive)",
        ));
    }

    let data = ReturnData::from_value(input.returns.clone())?;
    if data.series().is_empty() {
        return Err(RiskError::InsufficientData(
            "At least one return series required".into(),
        ));
    }

    let mut series_out = Vec::with_capacity(data.series().len());
    for series in data.series() {
        let n = series.len();
        if n < 3 {
            return Err(RiskError::InsufficientData(format!(
                "{}: at least 3 return observations required for risk metrics",
                series.name()
            )));
        }
        if n < config.min_observations {
            warnings.push(format!(
                "{}: only {} observations (fewer than {}); tail estimates are unreliable",
                series.name(),
                n,
                config.min_observations
            ));
        }

        let jb = jarque_bera(series)?;
        let is_normal = jb.p_value > config.normality_level;
        if !is_normal {
            warnings.push(format!(
                "{}: Jarque-Bera rejects normality at {} (p = {})",
                series.name(),
                config.normality_level,
                jb.p_value.round_dp(6)
            ));
        }

        let var_gaussian = var_gaussian_series(series, config.var_level, false)?;
        let var_cornish_fisher = var_gaussian_series(series, config.var_level, true)?;
        if !var_gaussian.is_zero()
            && ((var_cornish_fisher - var_gaussian) / var_gaussian).abs() > dec!(0.5)
        {
            warnings.push(format!(
                "{}: Cornish-Fisher VaR ({}) departs from Gaussian VaR ({}) by more than 50%",
                series.name(),
                var_cornish_fisher.round_dp(6),
                var_gaussian.round_dp(6)
            ));
        }

        let (annualized_return, annualized_volatility, sharpe_ratio, semideviation) =
            performance_metrics(series, config, &mut warnings)?;

        series_out.push(SeriesAnalysis {
            name: series.name().to_string(),
            observations: n,
            annualized_return,
            annualized_volatility,
            sharpe_ratio,
            semideviation,
            skewness: skewness(series)?,
            kurtosis: kurtosis(series)?,
            jarque_bera: jb,
            is_normal,
            var_historic: var_historic_series(series, config.var_level)?,
            var_gaussian,
            var_cornish_fisher,
            cvar_historic: cvar_historic_series(series, config.var_level)?,
            max_drawdown: drawdown(input.principal, series)?.max_drawdown(),
        });
    }

    let output = AnalysisOutput { series: series_out };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Return Series Risk Report (Drawdown, Moments, Jarque-Bera, Historic/Gaussian/Cornish-Fisher VaR, CVaR)",
        &serde_json::json!({
            "series": data.series().len(),
            "principal": input.principal.to_string(),
            "var_level": config.var_level.to_string(),
            "normality_level": config.normality_level.to_string(),
            "periods_per_year": config.periods_per_year,
            "standard_deviation": "population (n) for moments and VaR",
        }),
        warnings,
        elapsed,
        output,
    ))
}

type PerformanceMetrics = (Option<Rate>, Option<Rate>, Option<Decimal>, Option<Rate>);

#[cfg(feature = "performance")]
/// Metrics that are undefined for this sample are left out and reported.
fn optional_metric<T>(
    result: RiskResult<T>,
    label: &str,
    series: &ReturnSeries,
    warnings: &mut Vec<String>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warnings.push(format!("{}: {} omitted: {}", series.name(), label, e));
            None
        }
    }
}

#[cfg(feature = "performance")]
fn performance_metrics(
    series: &ReturnSeries,
    config: &RiskConfig,
    warnings: &mut Vec<String>,
) -> RiskResult<PerformanceMetrics> {
    use crate::performance::{annualize_rets, annualize_vol, semideviation, sharpe_ratio};

    let ann_ret = optional_metric(
        annualize_rets(series, config.periods_per_year),
        "annualized return",
        series,
        warnings,
    );
    let ann_vol = annualize_vol(series, config.periods_per_year)?;
    let sharpe = optional_metric(
        sharpe_ratio(series, config.riskfree_rate, config.periods_per_year),
        "Sharpe ratio",
        series,
        warnings,
    );
    Ok((ann_ret, Some(ann_vol), sharpe, Some(semideviation(series)?)))
}

#[cfg(not(feature = "performance"))]
fn performance_metrics(
    _series: &ReturnSeries,
    _config: &RiskConfig,
    _warnings: &mut Vec<String>,
) -> RiskResult<PerformanceMetrics> {
    Ok((None, None, None, None))
}
