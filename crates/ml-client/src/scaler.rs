use std::path::Path;

use analysis_core::{FeatureVector, FEATURE_COUNT};
use serde::{Deserialize, Serialize};

use crate::error::{MLError, MLResult};

/// Standardisation fixed at training time: `(x - mean) / scale` per feature.
///
/// The statistics are always loaded, never re-estimated from query data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: [f64; FEATURE_COUNT],
    pub scale: [f64; FEATURE_COUNT],
}

impl StandardScaler {
    pub fn new(mean: [f64; FEATURE_COUNT], scale: [f64; FEATURE_COUNT]) -> MLResult<Self> {
        let scaler = Self { mean, scale };
        scaler.validate()?;
        Ok(scaler)
    }

    /// Pass-through transform (zero mean, unit scale).
    pub fn identity() -> Self {
        Self {
            mean: [0.0; FEATURE_COUNT],
            scale: [1.0; FEATURE_COUNT],
        }
    }

    pub fn from_json_str(json: &str) -> MLResult<Self> {
        let scaler: StandardScaler = serde_json::from_str(json)?;
        scaler.validate()?;
        Ok(scaler)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> MLResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Standardise a raw feature vector. A zero scale is treated as 1.0, matching
    /// sklearn's handling of constant training columns.
    pub fn transform(&self, features: &FeatureVector) -> [f64; FEATURE_COUNT] {
        let raw = features.to_array();
        std::array::from_fn(|i| {
            let scale = if self.scale[i] == 0.0 { 1.0 } else { self.scale[i] };
            (raw[i] - self.mean[i]) / scale
        })
    }

    fn validate(&self) -> MLResult<()> {
        if let Some(i) = self.mean.iter().position(|m| !m.is_finite()) {
            return Err(MLError::InvalidScaler(format!("mean[{i}] is not finite")));
        }
        if let Some(i) = self.scale.iter().position(|s| !s.is_finite() || *s < 0.0) {
            return Err(MLError::InvalidScaler(format!(
                "scale[{i}] must be finite and non-negative"
            )));
        }
        Ok(())
    }
}
