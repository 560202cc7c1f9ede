use std::collections::BTreeMap;

use analysis_core::{AnalysisError, FeatureVector, HistoryProvider, Period, FEATURE_COUNT};
use ml_client::StandardScaler;
use rayon::prelude::*;
use technical_analysis::IndicatorEngine;

use crate::matrix::SimilarityMatrix;

/// Mean feature vector of a symbol's indicator rows over `period`.
pub fn symbol_profile(
    provider: &dyn HistoryProvider,
    symbol: &str,
    period: Period,
) -> Result<FeatureVector, AnalysisError> {
    let series = provider.fetch_history(symbol, period)?;
    let snapshots = IndicatorEngine::new().compute_indicators(&series)?;
    let features: Vec<FeatureVector> = snapshots.iter().map(|s| s.features()).collect();

    FeatureVector::mean_of(&features)
        .ok_or_else(|| AnalysisError::InsufficientHistory { required: 1, actual: 0 })
}

/// Build the similarity matrix for `universe`.
///
/// Each symbol's profile is computed in parallel, standardised with `scaler`, and
/// compared by cosine similarity. Symbols whose history is missing or unusable are
/// left out of the matrix.
pub fn build_similarity<S>(
    universe: &[S],
    provider: &dyn HistoryProvider,
    period: Period,
    scaler: &StandardScaler,
) -> SimilarityMatrix
where
    S: AsRef<str> + Sync,
{
    let vectors: BTreeMap<String, [f64; FEATURE_COUNT]> = universe
        .par_iter()
        .filter_map(|symbol| {
            let symbol = symbol.as_ref();
            match symbol_profile(provider, symbol, period) {
                Ok(profile) => {
                    tracing::debug!(symbol, "profile computed");
                    Some((symbol.to_string(), scaler.transform(&profile)))
                }
                Err(e) => {
                    tracing::warn!(symbol, error = %e, "skipping symbol in similarity build");
                    None
                }
            }
        })
        .collect();

    let matrix = SimilarityMatrix::from_vectors(vectors);
    tracing::info!(
        requested = universe.len(),
        included = matrix.len(),
        period = %period,
        "built similarity matrix"
    );
    matrix
}
