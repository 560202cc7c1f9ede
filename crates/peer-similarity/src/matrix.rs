use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::Path;

use analysis_core::{stats, FEATURE_COUNT};
use serde::{Deserialize, Serialize};

use crate::error::{SimilarityError, SimilarityResult};

/// Number of peers returned when the caller does not ask for a specific count.
pub const DEFAULT_TOP_N: usize = 5;

/// Allowed asymmetry / diagonal drift in a loaded matrix.
const TOLERANCE: f64 = 1e-9;

/// Dense pairwise similarity over a fixed universe.
///
/// Symbols are sorted ascending and unique; `scores` is row-major, symmetric, with a
/// unit diagonal and every entry in `[-1, 1]`. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MatrixData", into = "MatrixData")]
pub struct SimilarityMatrix {
    symbols: Vec<String>,
    scores: Vec<f64>,
}

/// On-disk layout: symbols plus one row per symbol.
#[derive(Serialize, Deserialize)]
struct MatrixData {
    symbols: Vec<String>,
    scores: Vec<Vec<f64>>,
}

impl SimilarityMatrix {
    /// Pairwise cosine similarity between the given (already normalised) vectors.
    pub fn from_vectors(vectors: BTreeMap<String, [f64; FEATURE_COUNT]>) -> Self {
        let (symbols, rows): (Vec<String>, Vec<[f64; FEATURE_COUNT]>) = vectors.into_iter().unzip();
        let n = symbols.len();
        let mut scores = vec![0.0; n * n];

        for i in 0..n {
            scores[i * n + i] = 1.0;
            for j in (i + 1)..n {
                let sim = stats::cosine_similarity(&rows[i], &rows[j]).clamp(-1.0, 1.0);
                scores[i * n + j] = sim;
                scores[j * n + i] = sim;
            }
        }

        Self { symbols, scores }
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.index_of(symbol).is_some()
    }

    /// Similarity between two known symbols.
    pub fn similarity(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.index_of(a)?;
        let j = self.index_of(b)?;
        Some(self.score(i, j))
    }

    /// The `top_n` most similar symbols to `symbol`, most similar first.
    ///
    /// Ties are broken by symbol ascending. The query symbol is never returned, and an
    /// unknown symbol yields an empty list.
    pub fn recommend(&self, symbol: &str, top_n: usize) -> Vec<String> {
        let Some(i) = self.index_of(symbol) else {
            tracing::debug!(symbol, "symbol not in similarity matrix");
            return Vec::new();
        };

        let mut peers: Vec<(usize, f64)> = (0..self.len())
            .filter(|&j| j != i)
            .map(|j| (j, self.score(i, j)))
            .collect();

        // symbols are sorted, so comparing indices orders ties by symbol
        peers.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });

        peers
            .into_iter()
            .take(top_n)
            .map(|(j, _)| self.symbols[j].clone())
            .collect()
    }

    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> SimilarityResult<()> {
        let json = serde_json::to_string(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> SimilarityResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn index_of(&self, symbol: &str) -> Option<usize> {
        self.symbols
            .binary_search_by(|s| s.as_str().cmp(symbol))
            .ok()
    }

    fn score(&self, i: usize, j: usize) -> f64 {
        self.scores[i * self.len() + j]
    }
}

impl TryFrom<MatrixData> for SimilarityMatrix {
    type Error = SimilarityError;

    fn try_from(data: MatrixData) -> Result<Self, Self::Error> {
        let n = data.symbols.len();

        if data.symbols.windows(2).any(|w| w[0] >= w[1]) {
            return Err(SimilarityError::InvalidMatrix(
                "symbols must be sorted and unique".to_string(),
            ));
        }
        if data.scores.len() != n || data.scores.iter().any(|row| row.len() != n) {
            return Err(SimilarityError::InvalidMatrix(format!(
                "expected a {n}x{n} score table"
            )));
        }

        for i in 0..n {
            if (data.scores[i][i] - 1.0).abs() > TOLERANCE {
                return Err(SimilarityError::InvalidMatrix(format!(
                    "diagonal entry for {} is {}",
                    data.symbols[i], data.scores[i][i]
                )));
            }
            for j in 0..n {
                let s = data.scores[i][j];
                if !s.is_finite() || s.abs() > 1.0 + TOLERANCE {
                    return Err(SimilarityError::InvalidMatrix(format!(
                        "score ({i}, {j}) out of range: {s}"
                    )));
                }
                if (s - data.scores[j][i]).abs() > TOLERANCE {
                    return Err(SimilarityError::InvalidMatrix(format!(
                        "scores ({i}, {j}) and ({j}, {i}) differ"
                    )));
                }
            }
        }

        Ok(Self {
            symbols: data.symbols,
            scores: data.scores.into_iter().flatten().collect(),
        })
    }
}

impl From<SimilarityMatrix> for MatrixData {
    fn from(matrix: SimilarityMatrix) -> Self {
        let n = matrix.len();
        let scores = if n == 0 {
            Vec::new()
        } else {
            matrix.scores.chunks(n).map(<[f64]>::to_vec).collect()
        };
        Self {
            symbols: matrix.symbols,
            scores,
        }
    }
}
