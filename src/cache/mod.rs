//! Cache Module
//!
//! The uniform cache contract and its two backends: an in-process
//! concurrent map store and a Redis-backed remote store. Both enforce
//! the same time-window policy; entries older than the configured
//! window are stale and get reclaimed by reads, explicit flushes, or
//! the background janitor.

mod entry;
mod memory;
mod redis;
mod stats;


// Re-export public types
pub use self::entry::CacheEntry;
pub use self::memory::MemoryCache;
pub use self::redis::RedisCache;
pub use self::stats::CacheStats;

use async_trait::async_trait;

use crate::error::Result;

// == Cache Contract ==
/// Capability set every cache backend satisfies.
///
/// Payloads are opaque bytes supplied and interpreted entirely by the
/// caller; the cache never transforms them. Staleness is purely
/// elapsed-time based against the window fixed at construction.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Stores `value` under `key` with the configured window as its
    /// expiry horizon starting now. Overwrites any existing value.
    async fn put(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Returns the stored payload verbatim, or
    /// [`CacheError::NotFound`](crate::error::CacheError::NotFound)
    /// when the key is absent or already stale. Callers never receive
    /// an expired payload.
    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Removes the entry for `key`.
    ///
    /// The in-process backend fails with `NotFound` when the key is
    /// absent; the remote backend succeeds idempotently (a DEL of a
    /// missing key is a no-op there).
    async fn delete(&self, key: &str) -> Result<()>;

    /// True iff `key` currently has a non-stale entry. Absence,
    /// staleness, and backend errors all yield `false`.
    async fn is_warm(&self, key: &str) -> bool;

    /// Removes every entry regardless of staleness. Best-effort: on a
    /// backend failure the keys already removed stay removed and the
    /// first error is reported.
    async fn flush(&self) -> Result<()>;

    /// Removes only stale entries, with the same partial-failure
    /// semantics as [`flush`](Self::flush).
    async fn flush_stale(&self) -> Result<()>;

    /// Starts the background janitor, which sweeps stale entries every
    /// window interval. Non-blocking. A second call while a janitor is
    /// live is a logged no-op.
    fn run_cleaner(&self);

    /// Stops the background janitor. Idempotent; a no-op when no
    /// janitor is running.
    fn stop_cleaner(&self);
}
