//! Cache Entry Module
//!
//! Defines the structure for individual in-memory cache entries and the
//! staleness predicate shared by every code path that needs it.

use std::time::{Duration, Instant};

// == Cache Entry ==
/// A single in-memory cache entry: the caller's opaque payload plus the
/// instant it was saved.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored payload, opaque to the cache
    pub payload: Vec<u8>,
    /// When this value was saved (reset on every overwrite)
    pub saved_at: Instant,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry saved at the current instant.
    pub fn new(payload: Vec<u8>) -> Self {
        Self {
            payload,
            saved_at: Instant::now(),
        }
    }

    // == Age ==
    /// Time elapsed since the entry was saved.
    pub fn age(&self) -> Duration {
        self.saved_at.elapsed()
    }

    // == Is Stale ==
    /// Checks whether the entry has outlived the window.
    ///
    /// Boundary condition: an entry is stale once its age reaches the
    /// window, i.e. `age >= window`. `get`, `is_warm`, and `flush_stale`
    /// all route through this one predicate so they can never disagree
    /// at the boundary.
    pub fn is_stale(&self, window: Duration) -> bool {
        self.age() >= window
    }

    // == Is Warm ==
    /// The complement of [`is_stale`](Self::is_stale).
    pub fn is_warm(&self, window: Duration) -> bool {
        !self.is_stale(window)
    }
}
