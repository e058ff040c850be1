//! Error types for the filtering core

use thiserror::Error;

/// Core filtering errors
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Format(#[from] codesieve_formats::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid record {position}: {source}")]
    InvalidRecord {
        position: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, Error>;
