use analysis_core::{AnalysisError, IndicatorSnapshot, PriceSeries};
use chrono::NaiveDate;
use statrs::statistics::Statistics;

use crate::indicators::*;

pub const SMA_SHORT: usize = 20;
pub const SMA_LONG: usize = 50;
pub const VOLATILITY_WINDOW: usize = 20;
pub const MOMENTUM_WINDOW: usize = 10;
pub const RSI_WINDOW: usize = 14;
pub const BETA_WINDOW: usize = 20;

/// Observations needed before the first snapshot is emitted (driven by SMA50).
pub const WARMUP: usize = SMA_LONG;

/// RSI reported for a window whose returns have zero dispersion.
const NEUTRAL_RSI: f64 = 50.0;

/// Return dispersion below this is rounding noise, not variance.
const MIN_RETURN_STD: f64 = 1e-12;

/// Derives the per-date indicator bundle from a daily price series.
///
/// Stateless: the same series always yields the same snapshots.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndicatorEngine;

impl IndicatorEngine {
    pub fn new() -> Self {
        Self
    }

    /// Compute snapshots for every date at which all indicators are defined.
    ///
    /// The first `WARMUP - 1` observations are dropped, so the output holds
    /// `series.len() - 49` rows.
    pub fn compute_indicators(
        &self,
        series: &PriceSeries,
    ) -> Result<Vec<IndicatorSnapshot>, AnalysisError> {
        if series.len() < WARMUP {
            return Err(AnalysisError::InsufficientHistory {
                required: WARMUP,
                actual: series.len(),
            });
        }

        let closes = series.closes();
        let returns = pct_change(&closes);

        let sharpe = sharpe_ratio(&returns).ok_or_else(|| {
            AnalysisError::DegenerateSeries(format!(
                "{}: daily returns have zero variance",
                series.symbol()
            ))
        })?;

        let sma20 = sma(&closes, SMA_SHORT);
        let sma50 = sma(&closes, SMA_LONG);
        let volatility = rolling_std(&returns, VOLATILITY_WINDOW);
        let momentum = rolling_mean(&diff(&closes), MOMENTUM_WINDOW);
        let rsi = simplified_rsi(&returns, RSI_WINDOW);
        let beta = rolling_corr(&returns, &sma50, BETA_WINDOW, 2);

        let mut snapshots = Vec::with_capacity(series.len() - (WARMUP - 1));
        for (i, point) in series.points().iter().enumerate().skip(WARMUP - 1) {
            let snapshot = IndicatorSnapshot {
                date: point.date,
                close: point.close,
                volume: point.volume,
                sma20: required(sma20[i], "sma20", point.date)?,
                sma50: required(sma50[i], "sma50", point.date)?,
                volatility20: required(volatility[i], "volatility20", point.date)?,
                momentum10: required(momentum[i], "momentum10", point.date)?,
                rsi14: required(rsi[i], "rsi14", point.date)?,
                // Correlation is undefined until two SMA50 points exist or when either
                // side is flat over the window; report no co-movement.
                beta20: beta[i].unwrap_or(0.0),
                sharpe,
            };

            if !snapshot.is_finite() {
                return Err(AnalysisError::DegenerateSeries(format!(
                    "{}: non-finite indicator on {}",
                    series.symbol(),
                    point.date
                )));
            }
            snapshots.push(snapshot);
        }

        tracing::debug!(
            symbol = series.symbol(),
            observations = series.len(),
            snapshots = snapshots.len(),
            "computed indicators"
        );
        Ok(snapshots)
    }
}

/// Free-function form of [`IndicatorEngine::compute_indicators`].
pub fn compute_indicators(series: &PriceSeries) -> Result<Vec<IndicatorSnapshot>, AnalysisError> {
    IndicatorEngine::new().compute_indicators(series)
}

/// Last value of the full-series drawdown.
pub fn latest_drawdown(series: &PriceSeries) -> f64 {
    drawdown(&series.closes()).last().copied().unwrap_or(0.0)
}

/// `mean / std` of all defined returns. `None` when the ratio is not a number.
fn sharpe_ratio(returns: &[Option<f64>]) -> Option<f64> {
    let defined: Vec<f64> = returns.iter().flatten().copied().collect();
    if defined.len() < 2 {
        return None;
    }
    let mean: f64 = defined.iter().mean();
    let std: f64 = defined.iter().std_dev();
    if !std.is_finite() || std < MIN_RETURN_STD {
        return None;
    }
    let ratio = mean / std;
    ratio.is_finite().then_some(ratio)
}

/// `100 - 100 / (1 + mean / std)` of the windowed returns.
///
/// Gains and losses are not separated, so this is not Wilder's RSI.
fn simplified_rsi(returns: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let means = rolling_mean(returns, window);
    let stds = rolling_std(returns, window);
    means
        .into_iter()
        .zip(stds)
        .map(|(m, s)| match (m, s) {
            (Some(_), Some(s)) if s == 0.0 => Some(NEUTRAL_RSI),
            (Some(m), Some(s)) => Some(100.0 - 100.0 / (1.0 + m / s)),
            _ => None,
        })
        .collect()
}

fn required(value: Option<f64>, name: &str, date: NaiveDate) -> Result<f64, AnalysisError> {
    value.ok_or_else(|| AnalysisError::DegenerateSeries(format!("{name} undefined on {date}")))
}
