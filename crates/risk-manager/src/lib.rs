pub mod classifier;
pub mod models;

pub use classifier::{assess_risk, RiskClassifier};
pub use models::*;
