pub mod advice;
pub mod error;
pub mod forest;
pub mod scaler;

pub use advice::{predict_advice, AdviceLabel, AdvicePredictor, Classifier};
pub use error::{MLError, MLResult};
pub use forest::{load_classifier, DecisionTree, RandomForest};
pub use scaler::StandardScaler;

use std::path::PathBuf;

/// Locations of the artifacts produced by the offline training run
#[derive(Debug, Clone)]
pub struct MLConfig {
    pub model_path: Option<PathBuf>,
    pub scaler_path: Option<PathBuf>,
}

impl Default for MLConfig {
    fn default() -> Self {
        Self {
            model_path: std::env::var("ADVICE_MODEL_PATH").ok().map(PathBuf::from),
            scaler_path: std::env::var("ADVICE_SCALER_PATH").ok().map(PathBuf::from),
        }
    }
}

impl MLConfig {
    pub fn new(model_path: impl Into<PathBuf>, scaler_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: Some(model_path.into()),
            scaler_path: Some(scaler_path.into()),
        }
    }
}
