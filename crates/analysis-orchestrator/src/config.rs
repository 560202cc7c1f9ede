use std::path::{Path, PathBuf};

use analysis_core::Period;
use anyhow::Context;
use ml_client::{MLConfig, StandardScaler};
use peer_similarity::DEFAULT_TOP_N;
use polygon_client::PolygonClient;

pub const DEFAULT_RATE_LIMIT: usize = 5;
pub const DEFAULT_FETCH_CONCURRENCY: usize = 4;

/// Runtime settings for the advisor pipeline, read from the environment.
#[derive(Debug, Clone)]
pub struct AdvisorConfig {
    pub polygon_api_key: Option<String>,
    /// Polygon requests per minute
    pub rate_limit: usize,
    pub ml: MLConfig,
    pub similarity_matrix_path: Option<PathBuf>,
    pub period: Period,
    pub top_n: usize,
    pub fetch_concurrency: usize,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            polygon_api_key: None,
            rate_limit: DEFAULT_RATE_LIMIT,
            ml: MLConfig {
                model_path: None,
                scaler_path: None,
            },
            similarity_matrix_path: None,
            period: Period::default(),
            top_n: DEFAULT_TOP_N,
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
        }
    }
}

impl AdvisorConfig {
    /// Read every setting from the environment, falling back to defaults for anything
    /// missing or unparseable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let period = match lookup("ANALYSIS_PERIOD") {
            Some(raw) => raw.parse::<Period>().unwrap_or_else(|e| {
                tracing::warn!("Ignoring ANALYSIS_PERIOD={}: {}", raw, e);
                defaults.period
            }),
            None => defaults.period,
        };

        Self {
            polygon_api_key: lookup("POLYGON_API_KEY").filter(|k| !k.trim().is_empty()),
            rate_limit: parse_or(&lookup, "POLYGON_RATE_LIMIT", defaults.rate_limit),
            ml: MLConfig {
                model_path: lookup("ADVICE_MODEL_PATH").map(PathBuf::from),
                scaler_path: lookup("ADVICE_SCALER_PATH").map(PathBuf::from),
            },
            similarity_matrix_path: lookup("SIMILARITY_MATRIX_PATH").map(PathBuf::from),
            period,
            top_n: parse_or(&lookup, "RECOMMEND_TOP_N", defaults.top_n),
            fetch_concurrency: parse_or(&lookup, "FETCH_CONCURRENCY", defaults.fetch_concurrency).max(1),
        }
    }

    /// Rate-limited Polygon client; fails when no API key is configured.
    pub fn polygon_client(&self) -> anyhow::Result<PolygonClient> {
        let api_key = self
            .polygon_api_key
            .clone()
            .context("POLYGON_API_KEY must be set")?;
        Ok(PolygonClient::with_rate_limit(api_key, self.rate_limit))
    }

    /// Scaler used to normalize similarity profiles. `path` overrides
    /// `ADVICE_SCALER_PATH`; one of them is required, since raw features are
    /// dominated by volume and make every pair look identical.
    pub fn similarity_scaler(&self, path: Option<&Path>) -> anyhow::Result<StandardScaler> {
        let path = path
            .or(self.ml.scaler_path.as_deref())
            .context("ADVICE_SCALER_PATH or --scaler must be set")?;
        StandardScaler::from_json_file(path)
            .with_context(|| format!("loading scaler from {}", path.display()))
    }
}

fn parse_or<F>(lookup: &F, key: &str, default: usize) -> usize
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
