//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The fallback used to resolve a miss returned an error
    #[error("Fallback failed: {0}")]
    Fallback(#[from] anyhow::Error),

    /// Invalid construction parameters
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Invalid event registration
    #[error("Invalid event: {0}")]
    InvalidEvent(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
