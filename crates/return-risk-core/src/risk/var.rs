use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::moments::{kurtosis, skewness};
use crate::error::RiskError;
use crate::stats;
use crate::types::*;
use crate::RiskResult;

/// Default VaR level, in percent (the 5th percentile).
pub const DEFAULT_VAR_LEVEL: Decimal = dec!(5);

fn validate_level(level: Decimal) -> RiskResult<()> {
    if level <= Decimal::ZERO || level >= dec!(100) {
        return Err(RiskError::invalid(
            "level",
            format!("VaR level must be between 0 and 100 (exclusive), got {}", level),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Historic VaR / CVaR
// ---------------------------------------------------------------------------

/// Negative of the `level`-th percentile of the series.
pub fn var_historic_series(series: &ReturnSeries, level: Decimal) -> RiskResult<Decimal> {
    validate_level(level)?;
    Ok(-stats::percentile(series.returns(), level, series.name())?)
}

/// Historic VaR of a series, or of every column of a table.
pub fn var_historic(data: &ReturnData, level: Decimal) -> RiskResult<RiskValue> {
    data.map_series(|s| var_historic_series(s, level))
}

/// Expected shortfall: negative mean of the returns at or below the historic
/// VaR threshold.
pub fn cvar_historic_series(series: &ReturnSeries, level: Decimal) -> RiskResult<Decimal> {
    let threshold = -var_historic_series(series, level)?;
    let tail: Vec<Decimal> = series
        .returns()
        .iter()
        .copied()
        .filter(|r| *r <= threshold)
        .collect();
    // the interpolated percentile never falls below the minimum, so the tail
    // holds at least one observation
    Ok(-stats::mean(&tail, series.name())?)
}

pub fn cvar_historic(data: &ReturnData, level: Decimal) -> RiskResult<RiskValue> {
    data.map_series(|s| cvar_historic_series(s, level))
}

/// [`var_historic`] over a JSON value; fails with `UnsupportedInput` when the
/// value is neither a series nor a table.
pub fn var_historic_value(value: serde_json::Value, level: Decimal) -> RiskResult<RiskValue> {
    var_historic(&ReturnData::from_value(value)?, level)
}

/// [`cvar_historic`] over a JSON value; fails with `UnsupportedInput` when the
/// value is neither a series nor a table.
pub fn cvar_historic_value(value: serde_json::Value, level: Decimal) -> RiskResult<RiskValue> {
    cvar_historic(&ReturnData::from_value(value)?, level)
}

// ---------------------------------------------------------------------------
// Parametric VaR
// ---------------------------------------------------------------------------

/// Cornish-Fisher adjustment to the z-score, using skewness `s` and raw
/// kurtosis `k`.
/// z_CF = z + (z^2 - 1)*S/6 + (z^3 - 3z)*(K - 3)/24 - (2z^3 - 5z)*S^2/36
pub fn cornish_fisher_z(z: Decimal, s: Decimal, k: Decimal) -> Decimal {
    let z2 = z * z;
    let z3 = z2 * z;
    z + (z2 - Decimal::ONE) * s / dec!(6) + (z3 - dec!(3) * z) * (k - dec!(3)) / dec!(24)
        - (dec!(2) * z3 - dec!(5) * z) * s * s / dec!(36)
}

/// Parametric Gaussian VaR: -(mean + z * sigma), sigma the population
/// standard deviation. With `modified`, z is Cornish-Fisher adjusted.
pub fn var_gaussian_series(
    series: &ReturnSeries,
    level: Decimal,
    modified: bool,
) -> RiskResult<Decimal> {
    validate_level(level)?;
    let values = series.returns();
    let mean = stats::mean(values, series.name())?;
    let sigma = stats::sqrt_decimal(stats::population_variance(values, series.name())?);

    let mut z = stats::norm_inv(level / dec!(100))?;
    if modified {
        z = cornish_fisher_z(z, skewness(series)?, kurtosis(series)?);
    }
    Ok(-(mean + z * sigma))
}

pub fn var_gaussian(data: &ReturnData, level: Decimal, modified: bool) -> RiskResult<RiskValue> {
    data.map_series(|s| var_gaussian_series(s, level, modified))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn series(name: &str, values: &[Decimal]) -> ReturnSeries {
        let obs = values
            .iter()
            .enumerate()
            .map(|(i, v)| (Period::new(2010 + (i / 12) as i32, (i % 12) as u32 + 1).unwrap(), *v))
            .collect();
        ReturnSeries::new(name, obs).unwrap()
    }

    fn sample_returns() -> Vec<Decimal> {
        vec![
            dec!(0.05),
            dec!(-0.02),
            dec!(0.03),
            dec!(0.01),
            dec!(-0.01),
            dec!(0.04),
            dec!(0.02),
            dec!(-0.03),
            dec!(0.06),
            dec!(0.01),
            dec!(-0.02),
            dec!(0.03),
            dec!(-0.08),
            dec!(0.02),
            dec!(-0.05),
            dec!(0.01),
            dec!(0.00),
            dec!(0.04),
            dec!(-0.01),
            dec!(0.02),
        ]
    }

    #[test]
    fn test_var_historic_interpolates() {
        // sorted: -0.08, -0.05, ...; rank = 19 * 0.05 = 0.95
        let r = series("fund", &sample_returns());
        let var = var_historic_series(&r, dec!(5)).unwrap();
        assert_eq!(var, -(dec!(-0.08) + dec!(0.95) * dec!(0.03)));
    }

    #[test]
    fn test_var_historic_positive_when_tail_negative() {
        let r = series("fund", &sample_returns());
        assert!(var_historic_series(&r, DEFAULT_VAR_LEVEL).unwrap() > Decimal::ZERO);
    }

    #[test]
    fn test_cvar_at_least_var() {
        let r = series("fund", &sample_returns());
        for level in [dec!(1), dec!(5), dec!(10), dec!(25)] {
            let var = var_historic_series(&r, level).unwrap();
            let cvar = cvar_historic_series(&r, level).unwrap();
            assert!(cvar >= var, "level {}: cvar {} < var {}", level, cvar, var);
        }
    }

    #[test]
    fn test_cvar_is_tail_mean() {
        let r = series("fund", &sample_returns());
        // threshold at 10%: rank 1.9 -> -0.05 + 0.9 * 0.02 = -0.032
        let cvar = cvar_historic_series(&r, dec!(10)).unwrap();
        assert_eq!(cvar, (dec!(0.08) + dec!(0.05)) / dec!(2));
    }

    #[test]
    fn test_var_table_per_column() {
        let a = series("a", &sample_returns());
        let b = series("b", &vec![dec!(0.01); 20]);
        let data = ReturnData::from(ReturnTable::new(vec![a, b]).unwrap());
        let out = var_historic(&data, dec!(5)).unwrap();
        assert!(out.get("a").unwrap() > Decimal::ZERO);
        assert_eq!(out.get("b").unwrap(), dec!(-0.01));
        assert!(out.as_scalar().is_none());
    }

    #[test]
    fn test_level_out_of_range() {
        let r = series("fund", &sample_returns());
        assert!(var_historic_series(&r, Decimal::ZERO).is_err());
        assert!(var_historic_series(&r, dec!(100)).is_err());
        assert!(var_gaussian_series(&r, dec!(-5), false).is_err());
    }

    #[test]
    fn test_unsupported_json_input() {
        let err = cvar_historic_value(serde_json::json!("not returns"), dec!(5)).unwrap_err();
        assert!(matches!(err, RiskError::UnsupportedInput(_)));
        let err = var_historic_value(serde_json::json!([0.01, 0.02]), dec!(5)).unwrap_err();
        assert!(matches!(err, RiskError::UnsupportedInput(_)));
    }

    #[test]
    fn test_cornish_fisher_vanishes_for_gaussian_moments() {
        let z = dec!(-1.6448536);
        assert_eq!(cornish_fisher_z(z, Decimal::ZERO, dec!(3)), z);
    }

    #[test]
    fn test_cornish_fisher_negative_skew_deepens_quantile() {
        let z = dec!(-1.6448536);
        assert!(cornish_fisher_z(z, dec!(-1), dec!(3)) < z);
        assert!(cornish_fisher_z(z, Decimal::ZERO, dec!(8)) < z);
    }

    #[test]
    fn test_gaussian_var_matches_formula() {
        let r = series("fund", &sample_returns());
        let var = var_gaussian_series(&r, dec!(5), false).unwrap();
        let mean = stats::mean(r.returns(), "t").unwrap();
        let sigma = stats::sqrt_decimal(stats::population_variance(r.returns(), "t").unwrap());
        let expected = -(mean + dec!(-1.6448536) * sigma);
        assert!((var - expected).abs() < dec!(0.000001));
    }

    #[test]
    fn test_modified_var_differs_when_skewed() {
        let r = series("fund", &sample_returns());
        let plain = var_gaussian_series(&r, dec!(5), false).unwrap();
        let cf = var_gaussian_series(&r, dec!(5), true).unwrap();
        assert_ne!(plain, cf);
    }
}
