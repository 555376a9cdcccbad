use thiserror::Error;

/// Error type shared by the detection engine, the stores and the binaries.
#[derive(Debug, Error)]
pub enum InsiderError {
    /// Required configuration is missing or unusable (e.g. no database path).
    #[error("Configuration error: {0}")]
    Config(String),

    /// No data exists to anchor a computation (empty signal table).
    #[error("No data: {0}")]
    NoData(String),

    /// A caller passed a parameter the engine cannot work with.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, InsiderError>;
