use analysis_core::{AnalysisError, IndicatorSnapshot, PriceSeries};
use technical_analysis::{latest_drawdown, IndicatorEngine};

use crate::models::{RiskAssessment, RiskCategory, RiskThresholds};

/// Maps the latest indicator snapshot of a series to a [`RiskAssessment`].
#[derive(Debug, Clone, Default)]
pub struct RiskClassifier {
    thresholds: RiskThresholds,
    engine: IndicatorEngine,
}

impl RiskClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thresholds(thresholds: RiskThresholds) -> Self {
        Self {
            thresholds,
            engine: IndicatorEngine::new(),
        }
    }

    pub fn thresholds(&self) -> &RiskThresholds {
        &self.thresholds
    }

    /// Classify a snapshot given the last value of the full-series drawdown.
    ///
    /// Rules are evaluated in order and the first match wins. A NaN input fails every
    /// comparison and therefore lands in `High`.
    pub fn assess(&self, snapshot: &IndicatorSnapshot, full_series_drawdown: f64) -> RiskAssessment {
        let t = &self.thresholds;
        let beta = snapshot.beta20;
        let volatility = snapshot.volatility20;

        let category = if beta < t.low_max_beta
            && volatility < t.low_max_volatility
            && full_series_drawdown > t.low_min_drawdown
        {
            RiskCategory::Low
        } else if beta < t.medium_max_beta && volatility < t.medium_max_volatility {
            RiskCategory::Medium
        } else {
            RiskCategory::High
        };

        RiskAssessment {
            category,
            trust_score: category.trust_score(),
            beta,
            volatility,
            drawdown: full_series_drawdown,
            sharpe: snapshot.sharpe,
        }
    }

    /// Compute indicators for `series` and classify its last valid snapshot.
    pub fn assess_series(&self, series: &PriceSeries) -> Result<RiskAssessment, AnalysisError> {
        let snapshots = self.engine.compute_indicators(series)?;
        let last = snapshots.last().ok_or_else(|| AnalysisError::InsufficientHistory {
            required: technical_analysis::WARMUP,
            actual: series.len(),
        })?;
        let assessment = self.assess(last, latest_drawdown(series));

        tracing::debug!(
            symbol = series.symbol(),
            category = %assessment.category,
            beta = assessment.beta,
            volatility = assessment.volatility,
            drawdown = assessment.drawdown,
            "assessed risk"
        );
        Ok(assessment)
    }
}

/// Classify with the default thresholds.
pub fn assess_risk(snapshot: &IndicatorSnapshot, full_series_drawdown: f64) -> RiskAssessment {
    RiskClassifier::new().assess(snapshot, full_series_drawdown)
}
