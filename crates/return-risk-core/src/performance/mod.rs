use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::error::RiskError;
use crate::stats;
use crate::types::*;
use crate::RiskResult;

/// Monthly observations per year.
pub const MONTHLY: u32 = 12;

fn validate_periods(periods_per_year: u32) -> RiskResult<Decimal> {
    if periods_per_year == 0 {
        return Err(RiskError::invalid(
            "periods_per_year",
            "Must be at least 1",
        ));
    }
    Ok(Decimal::from(periods_per_year))
}

fn compound(values: &[Decimal], periods_per_year: Decimal, context: &str) -> RiskResult<Rate> {
    if values.is_empty() {
        return Err(RiskError::InsufficientData(format!(
            "{}: at least one observation required",
            context
        )));
    }
    let growth = values.iter().try_fold(Decimal::ONE, |acc, r| {
        acc.checked_mul(Decimal::ONE + r).ok_or_else(|| {
            RiskError::invalid(context, "Compounded growth overflows Decimal")
        })
    })?;
    if growth <= Decimal::ZERO {
        return Err(RiskError::invalid(
            context,
            "Compounded growth is not positive; cannot annualize",
        ));
    }
    let exponent = periods_per_year / Decimal::from(values.len() as i64);
    let annual = growth.checked_powd(exponent).ok_or_else(|| {
        RiskError::invalid(context, format!("Overflow raising growth {} to {}", growth, exponent))
    })?;
    Ok(annual - Decimal::ONE)
}

/// Geometric annualized return: (prod(1 + r))^(ppy / n) - 1.
pub fn annualize_rets(series: &ReturnSeries, periods_per_year: u32) -> RiskResult<Rate> {
    let ppy = validate_periods(periods_per_year)?;
    compound(series.returns(), ppy, series.name())
}

/// Sample standard deviation scaled by sqrt(ppy).
pub fn annualize_vol(series: &ReturnSeries, periods_per_year: u32) -> RiskResult<Rate> {
    let ppy = validate_periods(periods_per_year)?;
    let variance = stats::sample_variance(series.returns(), series.name())?;
    Ok(stats::sqrt_decimal(variance) * stats::sqrt_decimal(ppy))
}

/// Annualized Sharpe ratio against an annual risk-free rate.
pub fn sharpe_ratio(
    series: &ReturnSeries,
    riskfree_rate: Rate,
    periods_per_year: u32,
) -> RiskResult<Decimal> {
    let ppy = validate_periods(periods_per_year)?;
    if riskfree_rate <= dec!(-1) {
        return Err(RiskError::invalid(
            "riskfree_rate",
            "Must be greater than -100%",
        ));
    }
    let rf_per_period = (Decimal::ONE + riskfree_rate)
        .checked_powd(Decimal::ONE / ppy)
        .ok_or_else(|| RiskError::invalid("riskfree_rate", "Cannot de-annualize"))?
        - Decimal::ONE;

    let excess: Vec<Decimal> = series.returns().iter().map(|r| r - rf_per_period).collect();
    let ann_excess = compound(&excess, ppy, series.name())?;
    let ann_vol = annualize_vol(series, periods_per_year)?;
    if ann_vol.is_zero() {
        return Err(RiskError::DivisionByZero {
            context: format!("Sharpe ratio of '{}' (zero volatility)", series.name()),
        });
    }
    Ok(ann_excess / ann_vol)
}

/// Population standard deviation of the strictly negative returns; zero when
/// there are none.
pub fn semideviation(series: &ReturnSeries) -> RiskResult<Rate> {
    if series.is_empty() {
        return Err(RiskError::InsufficientData(format!(
            "{}: at least one observation required",
            series.name()
        )));
    }
    let losses: Vec<Decimal> = series
        .returns()
        .iter()
        .copied()
        .filter(|r| r.is_sign_negative() && !r.is_zero())
        .collect();
    if losses.is_empty() {
        return Ok(Decimal::ZERO);
    }
    Ok(stats::sqrt_decimal(stats::population_variance(
        &losses,
        series.name(),
    )?))
}
