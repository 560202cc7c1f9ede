use std::sync::Arc;

use analysis_core::{AnalysisError, HistorySource, IndicatorSnapshot, Period, PriceSeries};
use anyhow::Context;
use ml_client::{AdviceLabel, AdvicePredictor};
use peer_similarity::{SimilarityMatrix, DEFAULT_TOP_N};
use risk_manager::{RiskAssessment, RiskClassifier};
use serde::{Deserialize, Serialize};
use technical_analysis::{latest_drawdown, IndicatorEngine};

pub mod cache;
pub mod config;
pub mod peers;
pub mod universe;


pub use cache::HistoryCache;
pub use config::AdvisorConfig;
pub use peers::{compare_peers, PeerSummary};
pub use universe::{default_universe, normalize_symbol, normalize_symbols, DEFAULT_UNIVERSE};

/// Notional amount the projected return is quoted against.
pub const PROJECTION_NOTIONAL: f64 = 10_000.0;

/// Everything the pipeline says about one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockReport {
    pub symbol: String,
    pub period: Period,
    /// Latest close, rounded to cents
    pub latest_price: f64,
    pub latest: IndicatorSnapshot,
    pub risk: RiskAssessment,
    /// Dashboard caption for the risk category
    pub safety_meter: String,
    pub prediction: AdviceLabel,
    /// Value today of `PROJECTION_NOTIONAL` invested at the first indicator row
    pub projected_returns: f64,
    /// Close on the first indicator row
    pub base_close: f64,
    pub recommendations: Vec<String>,
}

impl StockReport {
    /// Value today of `amount` invested at `base_close`.
    pub fn investment_value(&self, amount: f64) -> f64 {
        amount / self.base_close * self.latest.close
    }
}

/// Indicator, risk, advice and peer lookups behind one call.
#[derive(Debug, Clone)]
pub struct StockAdvisor {
    engine: IndicatorEngine,
    classifier: RiskClassifier,
    predictor: AdvicePredictor,
    matrix: Option<Arc<SimilarityMatrix>>,
    top_n: usize,
}

impl StockAdvisor {
    pub fn new(predictor: AdvicePredictor) -> Self {
        Self {
            engine: IndicatorEngine::new(),
            classifier: RiskClassifier::new(),
            predictor,
            matrix: None,
            top_n: DEFAULT_TOP_N,
        }
    }

    pub fn with_matrix(mut self, matrix: Arc<SimilarityMatrix>) -> Self {
        self.matrix = Some(matrix);
        self
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    pub fn with_classifier(mut self, classifier: RiskClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Load the advice model, scaler and (if configured) similarity matrix.
    pub fn from_config(config: &AdvisorConfig) -> anyhow::Result<Self> {
        let predictor = AdvicePredictor::from_config(&config.ml)
            .context("loading advice model (ADVICE_MODEL_PATH / ADVICE_SCALER_PATH)")?;
        let mut advisor = Self::new(predictor).with_top_n(config.top_n);

        if let Some(path) = &config.similarity_matrix_path {
            let matrix = SimilarityMatrix::from_json_file(path)
                .with_context(|| format!("loading similarity matrix from {}", path.display()))?;
            tracing::info!("Loaded similarity matrix with {} symbols", matrix.len());
            advisor = advisor.with_matrix(Arc::new(matrix));
        } else {
            tracing::warn!("SIMILARITY_MATRIX_PATH not set; reports will have no recommendations");
        }

        Ok(advisor)
    }

    pub fn matrix(&self) -> Option<&SimilarityMatrix> {
        self.matrix.as_deref()
    }

    pub fn predictor(&self) -> &AdvicePredictor {
        &self.predictor
    }

    /// Run the full pipeline over an already-fetched series.
    pub fn analyze(&self, series: &PriceSeries, period: Period) -> Result<StockReport, AnalysisError> {
        let snapshots = self.engine.compute_indicators(series)?;
        let (Some(first), Some(latest)) = (snapshots.first(), snapshots.last()) else {
            return Err(AnalysisError::InsufficientHistory {
                required: 1,
                actual: 0,
            });
        };

        let risk = self.classifier.assess(latest, latest_drawdown(series));
        let prediction = self.predictor.predict(&latest.features());
        let recommendations = self
            .matrix
            .as_ref()
            .map(|m| m.recommend(series.symbol(), self.top_n))
            .unwrap_or_default();

        tracing::debug!(
            symbol = series.symbol(),
            risk = %risk.category,
            prediction = %prediction,
            peers = recommendations.len(),
            "analysis complete"
        );

        Ok(StockReport {
            symbol: series.symbol().to_string(),
            period,
            latest_price: round2(latest.close),
            latest: *latest,
            risk,
            safety_meter: risk.category.safety_meter().to_string(),
            prediction,
            projected_returns: round2(PROJECTION_NOTIONAL * latest.close / first.close),
            base_close: first.close,
            recommendations,
        })
    }

    /// Fetch `symbol` from `source` and analyse it.
    pub async fn analyze_symbol(
        &self,
        source: &dyn HistorySource,
        symbol: &str,
        period: Period,
    ) -> Result<StockReport, AnalysisError> {
        let series = source.fetch_history(symbol, period).await?;
        self.analyze(&series, period)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
