use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::RiskError;
use crate::stats;
use crate::types::*;
use crate::RiskResult;

/// Default significance level for [`is_normal`].
pub const DEFAULT_NORMALITY_LEVEL: Decimal = dec!(0.01);

/// k-th standardized central moment: mean((x - mean)^k) / sigma^k, with the
/// population (denominator n) standard deviation.
pub fn higher_moment(series: &ReturnSeries, k: u32) -> RiskResult<Decimal> {
    if k == 0 {
        return Err(RiskError::invalid("k", "Moment order must be at least 1"));
    }
    let values = series.returns();
    let mean = stats::mean(values, series.name())?;
    let variance = stats::central_moment(values, mean, 2)?;
    if variance.is_zero() {
        return Err(RiskError::DivisionByZero {
            context: format!("standardized moment of '{}' (zero variance)", series.name()),
        });
    }

    let sigma = stats::sqrt_decimal(variance);
    if sigma.is_zero() {
        return Err(RiskError::DivisionByZero {
            context: format!("standardized moment of '{}' (sigma underflows)", series.name()),
        });
    }

    // Standardize before raising to k so terms stay near unit scale. Even
    // powers go through the squared ratio to avoid the rounded sqrt.
    let half = (k / 2) as i64;
    let mut acc = Decimal::ZERO;
    for x in values {
        let d = *x - mean;
        let mut term = stats::checked_pow(d * d / variance, half)?;
        if k % 2 == 1 {
            term = term
                .checked_mul(d / sigma)
                .ok_or_else(|| RiskError::invalid("k", format!("Overflow at moment order {}", k)))?;
        }
        acc = acc
            .checked_add(term)
            .ok_or_else(|| RiskError::invalid("k", format!("Overflow at moment order {}", k)))?;
    }
    Ok(acc / Decimal::from(values.len() as i64))
}

pub fn skewness(series: &ReturnSeries) -> RiskResult<Decimal> {
    higher_moment(series, 3)
}

/// Raw (not excess) kurtosis; a normal sample gives roughly 3.
pub fn kurtosis(series: &ReturnSeries) -> RiskResult<Decimal> {
    higher_moment(series, 4)
}

pub fn skewness_table(data: &ReturnData) -> RiskResult<RiskValue> {
    data.map_series(skewness)
}

pub fn kurtosis_table(data: &ReturnData) -> RiskResult<RiskValue> {
    data.map_series(kurtosis)
}

/// Jarque-Bera test statistic and its chi-squared(2) p-value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JarqueBera {
    pub statistic: Decimal,
    pub p_value: Decimal,
}

/// JB = n/6 * (S^2 + (K - 3)^2 / 4)
pub fn jarque_bera(series: &ReturnSeries) -> RiskResult<JarqueBera> {
    let n = Decimal::from(series.len() as i64);
    let s = skewness(series)?;
    let k = kurtosis(series)?;
    let excess = k - dec!(3);
    let statistic = n / dec!(6) * (s * s + excess * excess / dec!(4));
    let p_value = stats::chi_squared_sf(statistic, 2.0)?;
    Ok(JarqueBera { statistic, p_value })
}

/// True when the Jarque-Bera test does not reject normality at `level`.
pub fn is_normal(series: &ReturnSeries, level: Decimal) -> RiskResult<bool> {
    if level <= Decimal::ZERO || level >= Decimal::ONE {
        return Err(RiskError::invalid(
            "level",
            "Significance level must be between 0 and 1 (exclusive)",
        ));
    }
    Ok(jarque_bera(series)?.p_value > level)
}

/// [`is_normal`] applied to every series, in column order.
pub fn is_normal_table(data: &ReturnData, level: Decimal) -> RiskResult<Vec<(String, bool)>> {
    data.series()
        .iter()
        .map(|s| Ok((s.name().to_string(), is_normal(s, level)?)))
        .collect()
}
