//! Common error types for the medialog pipeline

use thiserror::Error;

/// Common result type for medialog operations
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal error taxonomy shared across the workspace
///
/// Only these errors abort a pipeline run. Row-level and event-level
/// problems are absorbed into per-entry warnings and run statistics
/// instead of being raised.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Input file is structurally unusable (missing required columns, malformed CSV)
    #[error("Input format error: {0}")]
    InputFormat(String),

    /// First input row carries no resolvable year, so no date can be anchored
    #[error("Ambiguous year: {0}")]
    AmbiguousYear(String),

    /// Unrecoverable defect while serializing the output document
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
