use serde::{Deserialize, Serialize};
use std::fmt;

/// Three-level risk classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskCategory {
    Low,
    Medium,
    High,
}

impl RiskCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskCategory::Low => "Low",
            RiskCategory::Medium => "Medium",
            RiskCategory::High => "High",
        }
    }

    /// Dashboard "safety meter" caption
    pub fn safety_meter(&self) -> &'static str {
        match self {
            RiskCategory::Low => "Low Risk",
            RiskCategory::Medium => "Medium Risk",
            RiskCategory::High => "High Risk",
        }
    }

    pub fn trust_score(&self) -> TrustScore {
        match self {
            RiskCategory::Low => TrustScore::FourStar,
            RiskCategory::Medium => TrustScore::ThreeStar,
            RiskCategory::High => TrustScore::TwoStar,
        }
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Symbolic star rating paired with a [`RiskCategory`]. Serialized as the star string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrustScore {
    #[serde(rename = "⭐⭐⭐⭐")]
    FourStar,
    #[serde(rename = "⭐⭐⭐")]
    ThreeStar,
    #[serde(rename = "⭐⭐")]
    TwoStar,
}

impl TrustScore {
    pub fn count(&self) -> u8 {
        match self {
            TrustScore::FourStar => 4,
            TrustScore::ThreeStar => 3,
            TrustScore::TwoStar => 2,
        }
    }

    pub fn stars(&self) -> &'static str {
        match self {
            TrustScore::FourStar => "⭐⭐⭐⭐",
            TrustScore::ThreeStar => "⭐⭐⭐",
            TrustScore::TwoStar => "⭐⭐",
        }
    }
}

impl fmt::Display for TrustScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.stars())
    }
}

/// Fixed heuristic cut-offs. Not calibrated; changing them changes every assessment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    /// Low risk requires beta below this
    pub low_max_beta: f64,
    /// Low risk requires volatility below this
    pub low_max_volatility: f64,
    /// Low risk requires drawdown above this (drawdown is <= 0)
    pub low_min_drawdown: f64,
    /// Medium risk requires beta below this
    pub medium_max_beta: f64,
    /// Medium risk requires volatility below this
    pub medium_max_volatility: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            low_max_beta: 1.0,
            low_max_volatility: 0.02,
            low_min_drawdown: -0.15,
            medium_max_beta: 1.5,
            medium_max_volatility: 0.05,
        }
    }
}

/// Risk classification of the latest indicator snapshot of a series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub category: RiskCategory,
    pub trust_score: TrustScore,
    pub beta: f64,
    pub volatility: f64,
    pub drawdown: f64,
    pub sharpe: f64,
}
