//! Rate limiting error types.

use thiserror::Error;

/// Errors surfaced by the sliding window limiter and its layered callers.
#[derive(Debug, Error)]
pub enum RateLimitError {
    /// The backing `OrderedSetStore` failed (e.g. the store-backed
    /// implementation lost its connection).
    #[error("rate limit store error: {0}")]
    Store(#[from] anyhow::Error),
}

/// Result type for rate limiting operations.
pub type RateLimitResult<T> = Result<T, RateLimitError>;
