use thiserror::Error;

#[derive(Error, Debug)]
pub enum MLError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid model: {0}")]
    InvalidModel(String),

    #[error("Invalid scaler: {0}")]
    InvalidScaler(String),

    #[error("Model not loaded")]
    ModelNotLoaded,
}

pub type MLResult<T> = Result<T, MLError>;
