use std::fmt;
use std::sync::Arc;

use analysis_core::{FeatureVector, FEATURE_COUNT};
use serde::{Deserialize, Serialize};

use crate::error::{MLError, MLResult};
use crate::forest::load_classifier;
use crate::scaler::StandardScaler;
use crate::MLConfig;

/// A fitted classifier over standardised feature vectors.
///
/// Implementations must be pure and must not depend on call order.
pub trait Classifier: Send + Sync {
    /// Predicted class index for one normalised vector.
    fn classify(&self, normalized: &[f64; FEATURE_COUNT]) -> i64;

    fn name(&self) -> &str;
}

/// Advice assigned to an instrument by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdviceLabel {
    Good,
    Medium,
    Bad,
    Unknown,
}

impl AdviceLabel {
    /// Fixed label table from training: 0 → Good, 1 → Medium, 2 → Bad.
    pub fn from_class_index(index: i64) -> Self {
        match index {
            0 => AdviceLabel::Good,
            1 => AdviceLabel::Medium,
            2 => AdviceLabel::Bad,
            _ => AdviceLabel::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AdviceLabel::Good => "Good",
            AdviceLabel::Medium => "Medium",
            AdviceLabel::Bad => "Bad",
            AdviceLabel::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for AdviceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalise `features` with the training-time scaler and map the predicted class to a label.
pub fn predict_advice(
    features: &FeatureVector,
    model: &dyn Classifier,
    scaler: &StandardScaler,
) -> AdviceLabel {
    let normalized = scaler.transform(features);
    let index = model.classify(&normalized);
    let label = AdviceLabel::from_class_index(index);

    tracing::debug!(model = model.name(), index, label = %label, "advice predicted");
    label
}

/// A classifier bound to the scaler it was trained with.
#[derive(Clone)]
pub struct AdvicePredictor {
    model: Arc<dyn Classifier>,
    scaler: StandardScaler,
}

impl fmt::Debug for AdvicePredictor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdvicePredictor")
            .field("model", &self.model.name())
            .field("scaler", &self.scaler)
            .finish()
    }
}

impl AdvicePredictor {
    pub fn new(model: Arc<dyn Classifier>, scaler: StandardScaler) -> Self {
        Self { model, scaler }
    }

    /// Load the model and scaler artifacts named by `config`.
    pub fn from_config(config: &MLConfig) -> MLResult<Self> {
        let (Some(model_path), Some(scaler_path)) = (&config.model_path, &config.scaler_path) else {
            return Err(MLError::ModelNotLoaded);
        };

        let model = load_classifier(model_path)?;
        let scaler = StandardScaler::from_json_file(scaler_path)?;
        Ok(Self::new(model, scaler))
    }

    pub fn predict(&self, features: &FeatureVector) -> AdviceLabel {
        predict_advice(features, self.model.as_ref(), &self.scaler)
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }
}
