use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::AnalysisError;

/// Number of fields in a [`FeatureVector`].
pub const FEATURE_COUNT: usize = 5;

/// One trading-day OHLCV observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Date-ordered daily history for a single symbol.
///
/// Only constructible through [`PriceSeries::new`], which guarantees at least one
/// point, strictly increasing dates and finite, positive closes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    symbol: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, points: Vec<PricePoint>) -> Result<Self, AnalysisError> {
        let symbol = symbol.into();
        if points.is_empty() {
            return Err(AnalysisError::InvalidData(format!(
                "{symbol}: price series must contain at least one observation"
            )));
        }

        for (i, point) in points.iter().enumerate() {
            if !point.close.is_finite() || point.close <= 0.0 {
                return Err(AnalysisError::InvalidData(format!(
                    "{symbol}: close must be positive on {} (got {})",
                    point.date, point.close
                )));
            }
            if i > 0 && points[i - 1].date >= point.date {
                return Err(AnalysisError::InvalidData(format!(
                    "{symbol}: dates must be strictly increasing ({} then {})",
                    points[i - 1].date, point.date
                )));
            }
        }

        Ok(Self { symbol, points })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false for a constructed series; kept for slice-like ergonomics.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> &PricePoint {
        &self.points[0]
    }

    pub fn last(&self) -> &PricePoint {
        &self.points[self.points.len() - 1]
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.volume).collect()
    }
}

impl<'de> Deserialize<'de> for PriceSeries {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            symbol: String,
            points: Vec<PricePoint>,
        }

        let raw = Raw::deserialize(deserializer)?;
        PriceSeries::new(raw.symbol, raw.points).map_err(serde::de::Error::custom)
    }
}

/// Lookback period for a history request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "1y")]
    OneYear,
    #[default]
    #[serde(rename = "5y")]
    FiveYears,
    #[serde(rename = "10y")]
    TenYears,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::OneYear => "1y",
            Period::FiveYears => "5y",
            Period::TenYears => "10y",
        }
    }

    /// Calendar days covered by the period, counting leap days.
    pub fn calendar_days(&self) -> i64 {
        match self {
            Period::OneYear => 365,
            Period::FiveYears => 1826,
            Period::TenYears => 3652,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1y" => Ok(Period::OneYear),
            "5y" => Ok(Period::FiveYears),
            "10y" => Ok(Period::TenYears),
            other => Err(AnalysisError::InvalidData(format!(
                "unsupported period '{other}' (expected 1y, 5y or 10y)"
            ))),
        }
    }
}

/// Indicator values for one date on which every window is full
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub date: NaiveDate,
    pub close: f64,
    pub volume: f64,
    pub sma20: f64,
    pub sma50: f64,
    pub volatility20: f64,
    pub momentum10: f64,
    pub rsi14: f64,
    pub beta20: f64,
    /// Whole-series Sharpe ratio, identical on every row.
    pub sharpe: f64,
}

impl IndicatorSnapshot {
    pub fn features(&self) -> FeatureVector {
        FeatureVector {
            close: self.close,
            volume: self.volume,
            sma20: self.sma20,
            sma50: self.sma50,
            volatility20: self.volatility20,
        }
    }

    pub fn is_finite(&self) -> bool {
        [
            self.close,
            self.volume,
            self.sma20,
            self.sma50,
            self.volatility20,
            self.momentum10,
            self.rsi14,
            self.beta20,
            self.sharpe,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

/// Raw (unnormalised) classifier / similarity input
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub close: f64,
    pub volume: f64,
    pub sma20: f64,
    pub sma50: f64,
    pub volatility20: f64,
}

impl FeatureVector {
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [self.close, self.volume, self.sma20, self.sma50, self.volatility20]
    }

    pub fn from_array(values: [f64; FEATURE_COUNT]) -> Self {
        Self {
            close: values[0],
            volume: values[1],
            sma20: values[2],
            sma50: values[3],
            volatility20: values[4],
        }
    }

    /// Per-field arithmetic mean, `None` for an empty slice.
    pub fn mean_of(vectors: &[FeatureVector]) -> Option<Self> {
        if vectors.is_empty() {
            return None;
        }

        let mut sums = [0.0; FEATURE_COUNT];
        for v in vectors {
            for (sum, x) in sums.iter_mut().zip(v.to_array()) {
                *sum += x;
            }
        }
        let n = vectors.len() as f64;
        Some(Self::from_array(sums.map(|s| s / n)))
    }
}
