//! Error types for corpus readers and shard writers

use std::path::PathBuf;
use thiserror::Error;

/// Format reader and writer errors
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Parquet error: {0}")]
    ParquetError(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    ArrowError(#[from] arrow::error::ArrowError),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid file: {0}")]
    InvalidFile(String),

    /// The output location already holds a previous run's shards.
    #[error("Output already exists: {}", .0.display())]
    AlreadyExists(PathBuf),
}

/// Result type alias for format operations
pub type Result<T> = std::result::Result<T, Error>;
