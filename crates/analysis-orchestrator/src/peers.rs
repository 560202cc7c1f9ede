use std::cmp::Ordering;

use analysis_core::{stats, AnalysisError, HistoryProvider, Period};
use risk_manager::{RiskCategory, RiskClassifier};
use serde::{Deserialize, Serialize};
use technical_analysis::{latest_drawdown, IndicatorEngine};

/// Side-by-side figures for one peer over the analysed period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerSummary {
    pub symbol: String,
    /// Close-to-close return over the indicator rows, in percent
    pub percent_return: f64,
    /// Mean 20-day volatility, in percent
    pub volatility_pct: f64,
    pub mean_rsi: f64,
    pub mean_momentum: f64,
    pub risk: RiskCategory,
}

impl PeerSummary {
    /// Value of `amount` invested at the start of the period.
    pub fn projected_value(&self, amount: f64) -> f64 {
        amount * (1.0 + self.percent_return / 100.0)
    }
}

fn summarize(
    provider: &dyn HistoryProvider,
    symbol: &str,
    period: Period,
) -> Result<PeerSummary, AnalysisError> {
    let series = provider.fetch_history(symbol, period)?;
    let snapshots = IndicatorEngine::new().compute_indicators(&series)?;
    let (Some(first), Some(last)) = (snapshots.first(), snapshots.last()) else {
        return Err(AnalysisError::InsufficientHistory {
            required: 1,
            actual: 0,
        });
    };

    let column = |f: fn(&analysis_core::IndicatorSnapshot) -> f64| -> f64 {
        stats::mean(&snapshots.iter().map(f).collect::<Vec<_>>())
    };

    Ok(PeerSummary {
        symbol: symbol.to_string(),
        percent_return: (last.close - first.close) / first.close * 100.0,
        volatility_pct: column(|s| s.volatility20) * 100.0,
        mean_rsi: column(|s| s.rsi14),
        mean_momentum: column(|s| s.momentum10),
        risk: RiskClassifier::new().assess(last, latest_drawdown(&series)).category,
    })
}

/// Summaries for `peers`, best performer first.
///
/// Peers whose history is missing or unusable are skipped.
pub fn compare_peers<S: AsRef<str>>(
    provider: &dyn HistoryProvider,
    peers: &[S],
    period: Period,
) -> Vec<PeerSummary> {
    let mut summaries: Vec<PeerSummary> = peers
        .iter()
        .filter_map(|peer| match summarize(provider, peer.as_ref(), period) {
            Ok(summary) => Some(summary),
            Err(e) => {
                tracing::warn!("Skipping peer {}: {}", peer.as_ref(), e);
                None
            }
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.percent_return
            .partial_cmp(&a.percent_return)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
    summaries
}
