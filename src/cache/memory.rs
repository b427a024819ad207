//! In-Process Cache Backend
//!
//! A concurrent map store guarded by one lock over the whole mapping.
//! Reads take the lock shared, mutations take it exclusive; the janitor
//! sweep goes through the same lock, so all operations serialize
//! against it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::warn;

use crate::cache::entry::CacheEntry;
use crate::cache::stats::{CacheStats, StatsRecorder};
use crate::cache::Cache;
use crate::config::DEFAULT_WINDOW;
use crate::error::{CacheError, Result};
use crate::tasks::Janitor;

// == Shared State ==
/// State shared between caller-facing operations and the janitor task.
#[derive(Debug)]
struct Shared {
    /// Time window after which an entry counts as stale
    window: Duration,
    /// Key-value storage, one lock over the whole mapping
    entries: RwLock<HashMap<String, CacheEntry>>,
    /// Hit/miss/sweep counters
    stats: StatsRecorder,
}

impl Shared {
    /// Removes every stale entry and returns how many were dropped.
    ///
    /// Stale keys are collected first and removed afterwards so the map
    /// is never mutated mid-iteration.
    async fn sweep(&self) -> usize {
        let mut entries = self.entries.write().await;
        let stale_keys: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| entry.is_stale(self.window))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &stale_keys {
            entries.remove(key);
        }

        self.stats.record_swept(stale_keys.len());
        stale_keys.len()
    }
}

// == Memory Cache ==
/// In-memory cache backend with time-window expiry.
#[derive(Debug)]
pub struct MemoryCache {
    shared: Arc<Shared>,
    /// At most one live janitor per cache instance
    janitor: Mutex<Option<Janitor>>,
}

impl MemoryCache {
    // == Constructors ==
    /// Creates a cache with the default 60 second window.
    pub fn new() -> Self {
        Self::with_window(DEFAULT_WINDOW)
    }

    /// Creates a cache with the given staleness window.
    pub fn with_window(window: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                window,
                entries: RwLock::new(HashMap::new()),
                stats: StatsRecorder::default(),
            }),
            janitor: Mutex::new(None),
        }
    }

    /// The staleness window this instance was built with.
    pub fn window(&self) -> Duration {
        self.shared.window
    }

    // == Length ==
    /// Current number of entries, stale ones included.
    pub async fn len(&self) -> usize {
        self.shared.entries.read().await.len()
    }

    /// True if the cache holds no entries at all.
    pub async fn is_empty(&self) -> bool {
        self.shared.entries.read().await.is_empty()
    }

    // == Stats ==
    /// Returns a snapshot of the performance counters.
    pub async fn stats(&self) -> CacheStats {
        let total = self.len().await;
        self.shared.stats.snapshot(total)
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    // == Put ==
    /// Inserts the entry under an exclusive lock, resetting its save
    /// time. A plain insert replaces any previous entry wholesale.
    async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut entries = self.shared.entries.write().await;
        entries.insert(key.to_string(), CacheEntry::new(value.to_vec()));
        Ok(())
    }

    // == Get ==
    /// Looks the key up under a shared lock. A stale entry is treated
    /// as absent; physical removal is left to the sweep.
    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let entries = self.shared.entries.read().await;
        match entries.get(key) {
            Some(entry) if entry.is_warm(self.shared.window) => {
                self.shared.stats.record_hit();
                Ok(entry.payload.clone())
            }
            _ => {
                self.shared.stats.record_miss();
                Err(CacheError::NotFound(key.to_string()))
            }
        }
    }

    // == Delete ==
    async fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self.shared.entries.write().await;
        match entries.remove(key) {
            Some(_) => Ok(()),
            None => Err(CacheError::NotFound(key.to_string())),
        }
    }

    // == Is Warm ==
    async fn is_warm(&self, key: &str) -> bool {
        let entries = self.shared.entries.read().await;
        entries
            .get(key)
            .is_some_and(|entry| entry.is_warm(self.shared.window))
    }

    // == Flush ==
    async fn flush(&self) -> Result<()> {
        self.shared.entries.write().await.clear();
        Ok(())
    }

    // == Flush Stale ==
    async fn flush_stale(&self) -> Result<()> {
        self.shared.sweep().await;
        Ok(())
    }

    // == Run Cleaner ==
    fn run_cleaner(&self) {
        let mut slot = self.janitor.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|janitor| !janitor.is_finished()) {
            warn!("cleaner already running; ignoring");
            return;
        }

        let shared = Arc::clone(&self.shared);
        *slot = Some(Janitor::spawn(self.shared.window, move || {
            let shared = Arc::clone(&shared);
            async move { Ok(shared.sweep().await) }
        }));
    }

    // == Stop Cleaner ==
    fn stop_cleaner(&self) {
        let taken = self
            .janitor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(janitor) = taken {
            janitor.stop();
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test]
    async fn test_put_and_get_roundtrip() {
        let cache = MemoryCache::new();
        cache.put("key1", b"value1").await.unwrap();

        let value = cache.get("key1").await.unwrap();
        assert_eq!(value, b"value1");
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_get_missing_key() {
        let cache = MemoryCache::new();
        let result = cache.get("nonexistent").await;
        assert!(matches!(result, Err(CacheError::NotFound(_))));
        assert!(!cache.is_warm("nonexistent").await);
    }

    #[tokio::test]
    async fn test_overwrite_is_last_write_wins() {
        let cache = MemoryCache::new();
        cache.put("key1", b"value1").await.unwrap();
        cache.put("key1", b"value2").await.unwrap();

        assert_eq!(cache.get("key1").await.unwrap(), b"value2");
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_delete() {
        let cache = MemoryCache::new();
        cache.put("key1", b"value1").await.unwrap();
        cache.delete("key1").await.unwrap();

        assert!(cache.is_empty().await);
        assert!(matches!(
            cache.get("key1").await,
            Err(CacheError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_missing_key() {
        let cache = MemoryCache::new();
        let result = cache.delete("nonexistent").await;
        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_stale_entry_reads_as_not_found() {
        let cache = MemoryCache::with_window(Duration::from_millis(100));
        cache.put("a", b"x").await.unwrap();

        assert!(cache.is_warm("a").await);
        assert_eq!(cache.get("a").await.unwrap(), b"x");

        sleep(Duration::from_millis(150)).await;

        assert!(!cache.is_warm("a").await);
        assert!(matches!(cache.get("a").await, Err(CacheError::NotFound(_))));
        // entry is still physically present until a sweep runs
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_flush_removes_everything() {
        let cache = MemoryCache::new();
        cache.put("key1", b"value1").await.unwrap();
        cache.put("key2", b"value2").await.unwrap();

        cache.flush().await.unwrap();
        assert!(cache.is_empty().await);
        assert!(!cache.is_warm("key1").await);

        // second flush is a no-op, not an error
        cache.flush().await.unwrap();
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_flush_stale_removes_only_stale_entries() {
        let cache = MemoryCache::with_window(Duration::from_millis(100));
        cache.put("old", b"stale payload").await.unwrap();
        sleep(Duration::from_millis(150)).await;
        cache.put("fresh", b"fresh payload").await.unwrap();

        cache.flush_stale().await.unwrap();

        assert_eq!(cache.len().await, 1);
        assert!(matches!(
            cache.get("old").await,
            Err(CacheError::NotFound(_))
        ));
        // fresh payload survives byte-identical
        assert_eq!(cache.get("fresh").await.unwrap(), b"fresh payload");
    }

    #[tokio::test]
    async fn test_flush_stale_agrees_with_is_warm() {
        let cache = MemoryCache::with_window(Duration::from_millis(100));
        cache.put("a", b"x").await.unwrap();
        sleep(Duration::from_millis(150)).await;

        // is_warm already reports stale, so the sweep must remove it
        assert!(!cache.is_warm("a").await);
        cache.flush_stale().await.unwrap();
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_reput_resets_the_window() {
        let cache = MemoryCache::with_window(Duration::from_millis(200));
        cache.put("a", b"v1").await.unwrap();
        sleep(Duration::from_millis(120)).await;
        cache.put("a", b"v2").await.unwrap();
        sleep(Duration::from_millis(120)).await;

        // 240ms after the first put but only 120ms after the second
        assert!(cache.is_warm("a").await);
        assert_eq!(cache.get("a").await.unwrap(), b"v2");
    }

    #[tokio::test]
    async fn test_stats_track_reads_and_sweeps() {
        let cache = MemoryCache::with_window(Duration::from_millis(100));
        cache.put("a", b"x").await.unwrap();

        cache.get("a").await.unwrap(); // hit
        let _ = cache.get("missing").await; // miss

        sleep(Duration::from_millis(150)).await;
        cache.flush_stale().await.unwrap();

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.swept, 1);
        assert_eq!(stats.total_entries, 0);
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[tokio::test]
    async fn test_cleaner_sweeps_in_background() {
        let cache = MemoryCache::with_window(Duration::from_millis(100));
        cache.put("a", b"x").await.unwrap();

        cache.run_cleaner();

        // window and sweep interval are both 100ms, so by 250ms the
        // entry must be gone without any explicit flush_stale call
        sleep(Duration::from_millis(250)).await;
        assert!(matches!(cache.get("a").await, Err(CacheError::NotFound(_))));
        assert_eq!(cache.len().await, 0);

        cache.stop_cleaner();
    }

    #[tokio::test]
    async fn test_stop_cleaner_is_idempotent() {
        let cache = MemoryCache::with_window(Duration::from_millis(100));
        cache.run_cleaner();
        cache.stop_cleaner();
        cache.stop_cleaner(); // second stop must be a no-op
        cache.stop_cleaner();
    }

    #[tokio::test]
    async fn test_run_cleaner_twice_keeps_one_janitor() {
        let cache = MemoryCache::with_window(Duration::from_millis(100));
        cache.run_cleaner();
        cache.run_cleaner(); // ignored while the first is live

        cache.put("a", b"x").await.unwrap();
        sleep(Duration::from_millis(250)).await;
        assert_eq!(cache.len().await, 0);

        cache.stop_cleaner();
    }

    #[tokio::test]
    async fn test_concurrent_puts_and_gets() {
        let cache = Arc::new(MemoryCache::new());
        let mut handles = Vec::new();

        for i in 0..16 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                let key = format!("key{}", i % 4);
                cache.put(&key, format!("value{i}").as_bytes()).await.unwrap();
                // whatever we read back must be a complete value for that key slot
                if let Ok(value) = cache.get(&key).await {
                    assert!(value.starts_with(b"value"));
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(cache.len().await, 4);
    }
}
