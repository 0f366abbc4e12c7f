use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::RiskError;
use crate::types::*;
use crate::RiskResult;

/// Wealth trajectory, running peaks and drawdowns, aligned by period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownResult {
    pub periods: Vec<Period>,
    /// principal * cumulative product of (1 + r)
    pub wealth: Vec<Money>,
    /// Highest wealth seen up to and including each period
    pub peaks: Vec<Money>,
    /// (wealth - peak) / peak, always <= 0
    pub drawdowns: Vec<Rate>,
}

/// Deepest point of a drawdown trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaxDrawdown {
    pub drawdown: Rate,
    /// Period at which the trough was reached
    pub trough: Period,
    /// Period of the peak the trough is measured from
    pub peak: Period,
}

impl DrawdownResult {
    pub fn len(&self) -> usize {
        self.wealth.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wealth.is_empty()
    }

    /// Most negative drawdown, `None` for an empty trajectory. Ties resolve to
    /// the earliest trough.
    pub fn max_drawdown(&self) -> Option<MaxDrawdown> {
        let mut best: Option<MaxDrawdown> = None;
        let mut peak_period = *self.periods.first()?;
        let mut peak_value: Option<Money> = None;

        for (i, period) in self.periods.iter().enumerate() {
            if peak_value.map_or(true, |p| self.peaks[i] != p) {
                peak_value = Some(self.peaks[i]);
                peak_period = *period;
            }
            let dd = self.drawdowns[i];
            if best.map_or(true, |b| dd < b.drawdown) {
                best = Some(MaxDrawdown {
                    drawdown: dd,
                    trough: *period,
                    peak: peak_period,
                });
            }
        }
        best
    }
}

/// Compute the wealth index, previous peaks and percentage drawdowns of
/// `principal` invested in `series`.
///
/// Returns at or below -1 are not rejected; wealth simply goes non-positive.
/// A running peak of exactly zero leaves the drawdown undefined and yields
/// `DivisionByZero`.
pub fn drawdown(principal: Money, series: &ReturnSeries) -> RiskResult<DrawdownResult> {
    let n = series.len();
    let mut wealth = Vec::with_capacity(n);
    let mut peaks = Vec::with_capacity(n);
    let mut drawdowns = Vec::with_capacity(n);

    let mut current = principal;
    let mut peak: Option<Money> = None;

    for obs in series.iter() {
        current = current.checked_mul(Decimal::ONE + obs.value).ok_or_else(|| {
            RiskError::invalid(
                format!("{}.wealth", series.name()),
                format!("Wealth overflows Decimal at {}", obs.period),
            )
        })?;
        let running = match peak {
            Some(p) if p >= current => p,
            _ => current,
        };
        peak = Some(running);

        if running.is_zero() {
            return Err(RiskError::DivisionByZero {
                context: format!("drawdown of '{}' at {} (peak is zero)", series.name(), obs.period),
            });
        }

        wealth.push(current);
        peaks.push(running);
        drawdowns.push((current - running) / running);
    }

    Ok(DrawdownResult {
        periods: series.periods().to_vec(),
        wealth,
        peaks,
        drawdowns,
    })
}
