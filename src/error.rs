//! Error types for the lookahead packer.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for crate operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Validation error for item, orientation and container data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid dimension: {0}")]
    InvalidDimension(String),
    #[error("Invalid orientation: {0}")]
    InvalidOrientation(String),
    #[error("Invalid container: {0}")]
    InvalidContainer(String),
}

/// Failure reported by a lookahead accelerator.
///
/// Always recoverable: the session falls back to the in-process evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AcceleratorError {
    /// The accelerator could not be reached or refused the call.
    #[error("Accelerator unavailable: {0}")]
    Unavailable(String),

    /// The accelerator did not answer within its time budget.
    #[error("Accelerator timed out after {0:?}")]
    Timeout(Duration),

    /// The accelerator answered with something that cannot be interpreted.
    #[error("Malformed accelerator response: {0}")]
    Malformed(String),
}

/// Errors that can occur while building or querying packing results.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid input data.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Query that needs at least one packed box.
    #[error("Packed box list is empty")]
    EmptyBoxList,

    /// A packed item lies outside its container or overlaps another item.
    #[error("Invalid placement: {0}")]
    InvalidPlacement(String),

    /// Serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Accelerator failure surfaced directly to the caller.
    #[error(transparent)]
    Accelerator(#[from] AcceleratorError),
}
