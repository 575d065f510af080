//! In-memory cache implementation - used when Redis is not configured.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use tally_core::ports::{Cache, CacheError};

use super::{DEFAULT_BUCKET_TTL, bucket_ttl_from_env};

/// In-memory cache configuration.
#[derive(Debug, Clone)]
pub struct InMemoryCacheConfig {
    /// How long a bucket lives after its first write. `None` keeps it forever.
    pub bucket_ttl: Option<Duration>,
}

impl Default for InMemoryCacheConfig {
    fn default() -> Self {
        Self {
            bucket_ttl: Some(DEFAULT_BUCKET_TTL),
        }
    }
}

impl InMemoryCacheConfig {
    /// Load configuration from environment variables.
    ///
    /// `CACHE_BUCKET_TTL_SECS=0` disables expiry.
    pub fn from_env() -> Self {
        Self {
            bucket_ttl: bucket_ttl_from_env(),
        }
    }
}

struct CacheEntry {
    value: u64,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map(|exp| now >= exp).unwrap_or(false)
    }
}

/// In-memory counter cache using a HashMap behind an async RwLock.
///
/// Counts are per-process and lost on restart. Expired buckets are dropped
/// lazily, when they are next touched or on [`purge_expired`](Self::purge_expired).
pub struct InMemoryCache {
    store: RwLock<HashMap<String, CacheEntry>>,
    config: InMemoryCacheConfig,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::with_config(InMemoryCacheConfig::default())
    }

    pub fn with_config(config: InMemoryCacheConfig) -> Self {
        Self {
            store: RwLock::new(HashMap::new()),
            config,
        }
    }

    pub fn from_env() -> Self {
        Self::with_config(InMemoryCacheConfig::from_env())
    }

    /// Number of live (unexpired) buckets.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let store = self.store.read().await;
        store.values().filter(|e| !e.is_expired(now)).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop every expired bucket, returning how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut store = self.store.write().await;
        let before = store.len();
        store.retain(|_, entry| !entry.is_expired(now));
        let purged = before - store.len();

        if purged > 0 {
            tracing::debug!(purged, remaining = store.len(), "Purged expired buckets");
        }

        purged
    }

    /// A TTL too large to represent as an `Instant` never expires.
    fn new_entry(&self, value: u64) -> CacheEntry {
        CacheEntry {
            value,
            expires_at: self
                .config
                .bucket_ttl
                .and_then(|ttl| Instant::now().checked_add(ttl)),
        }
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn read(&self, key: &str) -> Result<Option<u64>, CacheError> {
        let now = Instant::now();
        let store = self.store.read().await;
        let Some(entry) = store.get(key) else {
            return Ok(None);
        };

        if entry.is_expired(now) {
            drop(store);
            // Re-check under the write lock; a writer may have replaced it.
            let mut store = self.store.write().await;
            if store.get(key).is_some_and(|e| e.is_expired(now)) {
                store.remove(key);
                return Ok(None);
            }
            return Ok(store.get(key).map(|e| e.value));
        }

        Ok(Some(entry.value))
    }

    async fn write(&self, key: &str, value: u64) -> Result<(), CacheError> {
        let entry = self.new_entry(value);
        let mut store = self.store.write().await;
        store.insert(key.to_string(), entry);
        Ok(())
    }

    async fn increment(&self, key: &str) -> Result<(), CacheError> {
        let now = Instant::now();
        let mut store = self.store.write().await;

        match store.get_mut(key) {
            Some(entry) if !entry.is_expired(now) => {
                entry.value = entry.value.checked_add(1).ok_or_else(|| {
                    CacheError::Operation(format!("counter overflow for key {key}"))
                })?;
            }
            // Absent or expired keys start over at 1, like Redis INCR.
            _ => {
                let entry = self.new_entry(1);
                store.insert(key.to_string(), entry);
            }
        }

        Ok(())
    }
}
