//! Error types shared across the carsync workspace

use thiserror::Error;

/// Result type alias for carsync operations
pub type Result<T> = std::result::Result<T, CarsyncError>;

/// Main error type for carsync
#[derive(Error, Debug)]
pub enum CarsyncError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Database error: {0}")]
    Database(String),
}
