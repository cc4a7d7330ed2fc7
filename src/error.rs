use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpendingForecastError {
    #[error("Missing data: {0}")]
    MissingData(String),

    #[error("Insufficient history: {days} distinct day(s), lag features need {required}")]
    InsufficientHistory { days: usize, required: usize },

    #[error("Prediction error: {0}")]
    Prediction(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Date calculation error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SpendingForecastError>;
