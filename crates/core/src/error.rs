//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("missing required configuration: {0}")]
    MissingConfig(&'static str),

    #[error("corrupt persisted state: {0}")]
    CorruptState(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
