//! Redis Cache Backend
//!
//! Remote store that delegates storage and expiry to Redis: every put
//! carries the window as a native TTL, so the backend's own countdown is
//! authoritative for staleness. The stale sweep reconciles by walking
//! the full keyspace and deleting keys the backend reports as having no
//! expiry set.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::AsyncCommands;
use tracing::{info, warn};

use crate::cache::Cache;
use crate::config::RedisConfig;
use crate::error::{CacheError, Result};
use crate::tasks::Janitor;

/// TTL reply for a key that exists but has no expiry set.
const TTL_NO_EXPIRY: i64 = -1;

// == Redis Cache ==
/// Redis-backed cache with time-window expiry.
///
/// Holds one multiplexed connection handle created at construction; the
/// handle is cloned per operation and shared with the janitor. Client-side
/// locking is not needed — concurrency control is the connection's job.
pub struct RedisCache {
    conn: ConnectionManager,
    window: Duration,
    /// At most one live janitor per cache instance
    janitor: Mutex<Option<Janitor>>,
}

impl RedisCache {
    // == Constructors ==
    /// Connects to the backend described by `config`, applying its
    /// response and connection timeouts once for the life of the
    /// connection.
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        let client = redis::Client::open(config.url())?;
        let manager_config = ConnectionManagerConfig::new()
            .set_connection_timeout(config.connection_timeout)
            .set_response_timeout(config.response_timeout);
        let conn = ConnectionManager::new_with_config(client, manager_config).await?;

        info!(address = %config.address, "redis cache connected");
        Ok(Self::with_connection(conn, config.window))
    }

    /// Wraps a fully custom pre-built connection, replacing the default
    /// client setup entirely.
    pub fn with_connection(conn: ConnectionManager, window: Duration) -> Self {
        Self {
            conn,
            window,
            janitor: Mutex::new(None),
        }
    }

    /// The staleness window this instance was built with.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Window as whole seconds for `SET .. EX`, clamped to at least 1.
    fn window_secs(&self) -> u64 {
        self.window.as_secs().max(1)
    }
}

// == Keyspace Scans ==
/// One SCAN page: full keyspace, no pattern filter, default batch size.
async fn scan_page(conn: &mut ConnectionManager, cursor: u64) -> redis::RedisResult<(u64, Vec<String>)> {
    redis::cmd("SCAN").arg(cursor).query_async(conn).await
}

/// Deletes every key visible to this connection. Returns the number of
/// keys removed; stops at the first enumeration or deletion error.
async fn purge_all(mut conn: ConnectionManager) -> Result<usize> {
    let mut removed = 0usize;
    let mut cursor = 0u64;
    loop {
        let (next, keys) = scan_page(&mut conn, cursor)
            .await
            .map_err(|err| CacheError::flush_failure(removed, err))?;

        for key in keys {
            conn.del::<_, ()>(&key)
                .await
                .map_err(|err| CacheError::flush_failure(removed, err))?;
            removed += 1;
        }

        if next == 0 {
            return Ok(removed);
        }
        cursor = next;
    }
}

/// Deletes every key whose TTL reply says "no expiry set" — on this
/// backend that is the sole staleness signal, since `put` always sets
/// one. Keys that vanish between scan and query (TTL -2) are skipped;
/// live countdowns are left to the backend.
async fn purge_unexpiring(mut conn: ConnectionManager) -> Result<usize> {
    let mut removed = 0usize;
    let mut cursor = 0u64;
    loop {
        let (next, keys) = scan_page(&mut conn, cursor)
            .await
            .map_err(|err| CacheError::flush_failure(removed, err))?;

        for key in keys {
            let ttl: i64 = conn
                .ttl(&key)
                .await
                .map_err(|err| CacheError::flush_failure(removed, err))?;

            if ttl == TTL_NO_EXPIRY {
                conn.del::<_, ()>(&key)
                    .await
                    .map_err(|err| CacheError::flush_failure(removed, err))?;
                removed += 1;
            }
        }

        if next == 0 {
            return Ok(removed);
        }
        cursor = next;
    }
}

#[async_trait]
impl Cache for RedisCache {
    // == Put ==
    async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(key, value, self.window_secs())
            .await?;
        Ok(())
    }

    // == Get ==
    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.get(key).await?;
        value.ok_or_else(|| CacheError::NotFound(key.to_string()))
    }

    // == Delete ==
    /// DEL of a missing key is a counted no-op on the backend, so delete
    /// succeeds idempotently here.
    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    // == Is Warm ==
    /// An error determining existence is treated as "not warm".
    async fn is_warm(&self, key: &str) -> bool {
        let mut conn = self.conn.clone();
        conn.exists::<_, bool>(key).await.unwrap_or(false)
    }

    // == Flush ==
    async fn flush(&self) -> Result<()> {
        purge_all(self.conn.clone()).await?;
        Ok(())
    }

    // == Flush Stale ==
    async fn flush_stale(&self) -> Result<()> {
        purge_unexpiring(self.conn.clone()).await?;
        Ok(())
    }

    // == Run Cleaner ==
    fn run_cleaner(&self) {
        let mut slot = self.janitor.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|janitor| !janitor.is_finished()) {
            warn!("cleaner already running; ignoring");
            return;
        }

        let conn = self.conn.clone();
        *slot = Some(Janitor::spawn(self.window, move || {
            purge_unexpiring(conn.clone())
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
