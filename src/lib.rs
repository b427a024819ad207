//! warmcache - A time-windowed key-value cache
//!
//! Stores opaque byte payloads under string keys and considers an entry
//! stale once it has outlived a window fixed at construction. Two
//! interchangeable backends implement the same [`Cache`] contract: an
//! in-process concurrent map and a Redis-backed remote store. A
//! background janitor sweeps stale entries at the window interval.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use warmcache::{Cache, MemoryCache};
//!
//! #[tokio::main]
//! async fn main() -> warmcache::Result<()> {
//!     let cache = MemoryCache::with_window(Duration::from_secs(30));
//!     cache.run_cleaner();
//!
//!     cache.put("greeting", b"hello").await?;
//!     assert_eq!(cache.get("greeting").await?, b"hello");
//!     assert!(cache.is_warm("greeting").await);
//!
//!     cache.stop_cleaner();
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use cache::{Cache, CacheStats, MemoryCache, RedisCache};
pub use config::{RedisConfig, DEFAULT_WINDOW};
pub use error::{CacheError, Result};
pub use tasks::Janitor;
