use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use analysis_core::{AnalysisError, HistoryProvider, HistorySource, Period, PriceSeries};
use dashmap::DashMap;
use tokio::sync::Semaphore;

/// In-memory price history keyed by `(symbol, period)`.
///
/// Filled asynchronously from a [`HistorySource`], then read synchronously by the pure
/// pipeline through [`HistoryProvider`]. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct HistoryCache {
    entries: Arc<DashMap<(String, Period), PriceSeries>>,
}

impl HistoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, period: Period, series: PriceSeries) {
        self.entries
            .insert((series.symbol().to_string(), period), series);
    }

    pub fn get(&self, symbol: &str, period: Period) -> Option<PriceSeries> {
        self.entries
            .get(&(symbol.to_string(), period))
            .map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fetch `symbols` from `source` with at most `concurrency` requests in flight.
    ///
    /// Symbols already cached for `period` are not fetched again. Failures are logged
    /// and skipped; returns how many symbols are available afterwards.
    pub async fn prefetch(
        &self,
        source: Arc<dyn HistorySource>,
        symbols: &[String],
        period: Period,
        concurrency: usize,
    ) -> usize {
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        let completed = Arc::new(AtomicUsize::new(0));
        let failed = Arc::new(AtomicUsize::new(0));
        let total = symbols.len();

        let mut handles = Vec::with_capacity(total);
        for symbol in symbols {
            if self.entries.contains_key(&(symbol.clone(), period)) {
                completed.fetch_add(1, Ordering::Relaxed);
                continue;
            }

            let symbol = symbol.clone();
            let source = Arc::clone(&source);
            let semaphore = Arc::clone(&semaphore);
            let completed = Arc::clone(&completed);
            let failed = Arc::clone(&failed);
            let cache = self.clone();

            let handle = tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire().await else {
                    return;
                };

                let result = source.fetch_history(&symbol, period).await;
                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;

                match result {
                    Ok(series) => {
                        tracing::info!("[{}/{}] {} => {} bars", done, total, symbol, series.len());
                        cache.insert(period, series);
                    }
                    Err(e) => {
                        failed.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!("[{}/{}] {} failed: {}", done, total, symbol, e);
                    }
                }
            });

            handles.push(handle);
        }

        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!("prefetch task aborted: {}", e);
            }
        }

        let loaded = symbols
            .iter()
            .filter(|s| self.entries.contains_key(&(s.to_string(), period)))
            .count();
        tracing::info!(
            source = source.source_name(),
            period = %period,
            loaded,
            failed = failed.load(Ordering::Relaxed),
            "prefetch finished"
        );
        loaded
    }
}

impl HistoryProvider for HistoryCache {
    fn fetch_history(&self, symbol: &str, period: Period) -> Result<PriceSeries, AnalysisError> {
        self.get(symbol, period)
            .ok_or_else(|| AnalysisError::NotFound(format!("{symbol} ({period}) not in cache")))
    }
}
