use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// The symbol/period pair produced no observations.
    #[error("No data found: {0}")]
    NotFound(String),

    #[error("Insufficient history: need at least {required} observations, got {actual}")]
    InsufficientHistory { required: usize, actual: usize },

    /// Zero-variance or otherwise non-numeric indicator input.
    #[error("Degenerate series: {0}")]
    DegenerateSeries(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("API error: {0}")]
    ApiError(String),
}

impl AnalysisError {
    /// True for outcomes the caller should surface as "no analysis available"
    /// rather than as a transport fault.
    pub fn is_data_condition(&self) -> bool {
        !matches!(self, AnalysisError::ApiError(_))
    }
}
