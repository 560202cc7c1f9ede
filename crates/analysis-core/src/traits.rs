use async_trait::async_trait;

use crate::{AnalysisError, Period, PriceSeries};

/// Synchronous access to already-available price history.
///
/// Returns [`AnalysisError::NotFound`] when the symbol/period has no data. The pure
/// pipeline (matrix build, peer comparison) only ever talks to this trait.
pub trait HistoryProvider: Send + Sync {
    fn fetch_history(&self, symbol: &str, period: Period) -> Result<PriceSeries, AnalysisError>;
}

/// Remote source of price history (market-data APIs)
#[async_trait]
pub trait HistorySource: Send + Sync {
    async fn fetch_history(&self, symbol: &str, period: Period) -> Result<PriceSeries, AnalysisError>;

    fn source_name(&self) -> &'static str;
}
