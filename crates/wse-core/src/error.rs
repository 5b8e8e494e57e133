// crates/wse-core/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WseError {
    #[error("Unsupported pressure unit: {0}")]
    UnsupportedUnit(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Required column missing: {0}")]
    MissingColumn(String),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV writing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, WseError>;
