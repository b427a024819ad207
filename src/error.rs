//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for all cache backends.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key not found in the cache, or found but already stale
    #[error("key not found: {0}")]
    NotFound(String),

    /// The remote backend could not be reached or rejected a request
    #[error("cache backend unavailable: {0}")]
    Backend(#[from] redis::RedisError),

    /// A flush aborted after some keys were already removed.
    ///
    /// Deletion is at-least-once: keys removed before the failure stay
    /// removed, and the first error encountered is surfaced here.
    #[error("flush aborted after removing {removed} keys: {source}")]
    PartialFlush {
        removed: usize,
        #[source]
        source: redis::RedisError,
    },
}

impl CacheError {
    /// True for the not-found case (absent key or stale entry).
    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::NotFound(_))
    }

    /// Wraps a backend error raised inside a flush loop, preserving the
    /// partial-deletion count once at least one key is already gone.
    pub(crate) fn flush_failure(removed: usize, source: redis::RedisError) -> Self {
        if removed == 0 {
            CacheError::Backend(source)
        } else {
            CacheError::PartialFlush { removed, source }
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
