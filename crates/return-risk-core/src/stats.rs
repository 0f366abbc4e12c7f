//! Decimal reductions shared by the risk and performance modules.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use statrs::distribution::{ChiSquared, ContinuousCDF, Normal};

use crate::error::RiskError;
use crate::RiskResult;

pub(crate) fn mean(values: &[Decimal], context: &str) -> RiskResult<Decimal> {
    if values.is_empty() {
        return Err(RiskError::InsufficientData(format!(
            "{}: at least one observation required",
            context
        )));
    }
    let sum: Decimal = values.iter().sum();
    Ok(sum / Decimal::from(values.len() as i64))
}

pub(crate) fn checked_pow(base: Decimal, exp: i64) -> RiskResult<Decimal> {
    base.checked_powi(exp).ok_or_else(|| {
        RiskError::invalid("exponent", format!("Overflow raising {} to power {}", base, exp))
    })
}

/// mean((x - mean)^k), denominator n.
pub(crate) fn central_moment(values: &[Decimal], mean: Decimal, k: u32) -> RiskResult<Decimal> {
    let mut acc = Decimal::ZERO;
    for x in values {
        acc += checked_pow(*x - mean, k as i64)?;
    }
    Ok(acc / Decimal::from(values.len() as i64))
}

/// Variance with denominator n.
pub(crate) fn population_variance(values: &[Decimal], context: &str) -> RiskResult<Decimal> {
    let mu = mean(values, context)?;
    central_moment(values, mu, 2)
}

/// Variance with denominator n - 1.
pub(crate) fn sample_variance(values: &[Decimal], context: &str) -> RiskResult<Decimal> {
    if values.len() < 2 {
        return Err(RiskError::InsufficientData(format!(
            "{}: at least 2 observations required",
            context
        )));
    }
    let mu = mean(values, context)?;
    let sum_sq: Decimal = values.iter().map(|r| (r - mu) * (r - mu)).sum();
    Ok(sum_sq / Decimal::from((values.len() - 1) as i64))
}

pub(crate) fn sqrt_decimal(val: Decimal) -> Decimal {
    if val <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    val.sqrt().unwrap_or(Decimal::ZERO)
}

/// Percentile with linear interpolation between closest ranks.
/// `level` is on the 0..100 scale.
pub(crate) fn percentile(values: &[Decimal], level: Decimal, context: &str) -> RiskResult<Decimal> {
    if values.is_empty() {
        return Err(RiskError::InsufficientData(format!(
            "{}: at least one observation required",
            context
        )));
    }
    let mut sorted = values.to_vec();
    sorted.sort();

    let rank = Decimal::from((sorted.len() - 1) as i64) * level / dec!(100);
    let lower = rank.floor();
    let idx = lower
        .to_usize()
        .ok_or_else(|| RiskError::invalid("level", format!("Rank {} out of range", rank)))?;
    let frac = rank - lower;

    let base = sorted[idx];
    match sorted.get(idx + 1) {
        Some(next) if !frac.is_zero() => Ok(base + frac * (*next - base)),
        _ => Ok(base),
    }
}

pub(crate) fn to_f64(val: Decimal, field: &str) -> RiskResult<f64> {
    val.to_f64()
        .ok_or_else(|| RiskError::invalid(field, format!("{} is not representable as f64", val)))
}

pub(crate) fn from_f64(val: f64, field: &str) -> RiskResult<Decimal> {
    if !val.is_finite() {
        return Err(RiskError::invalid(field, format!("Non-finite value {}", val)));
    }
    // below Decimal's 28 fractional digits
    if val.abs() < 1e-28 {
        return Ok(Decimal::ZERO);
    }
    Decimal::from_f64(val)
        .ok_or_else(|| RiskError::invalid(field, format!("{} is not representable as Decimal", val)))
}

/// Standard normal quantile at probability `p`.
pub(crate) fn norm_inv(p: Decimal) -> RiskResult<Decimal> {
    if p <= Decimal::ZERO || p >= Decimal::ONE {
        return Err(RiskError::invalid(
            "probability",
            "Must be between 0 and 1 exclusive",
        ));
    }
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| RiskError::invalid("normal_distribution", e.to_string()))?;
    from_f64(normal.inverse_cdf(to_f64(p, "probability")?), "z_score")
}

/// Upper-tail probability of a chi-squared variable.
pub(crate) fn chi_squared_sf(statistic: Decimal, dof: f64) -> RiskResult<Decimal> {
    let dist = ChiSquared::new(dof)
        .map_err(|e| RiskError::invalid("degrees_of_freedom", e.to_string()))?;
    let x = to_f64(statistic, "statistic")?;
    from_f64(dist.sf(x), "p_value")
}
