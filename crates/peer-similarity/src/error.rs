use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimilarityError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid similarity matrix: {0}")]
    InvalidMatrix(String),
}

pub type SimilarityResult<T> = Result<T, SimilarityError>;
