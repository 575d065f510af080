//! Redis cache implementation with connection manager.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use tally_core::ports::{Cache, CacheError};

use super::{DEFAULT_BUCKET_TTL, bucket_ttl_from_env};

/// Redis connection configuration.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis URL (e.g., redis://localhost:6379)
    pub url: String,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Expiry set on every freshly written bucket. `None` keeps buckets forever.
    pub bucket_ttl: Option<Duration>,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            connect_timeout: Duration::from_secs(5),
            bucket_ttl: Some(DEFAULT_BUCKET_TTL),
        }
    }
}

impl RedisConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            connect_timeout: Duration::from_secs(
                std::env::var("REDIS_CONNECT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
            bucket_ttl: bucket_ttl_from_env(),
        }
    }
}

/// Redis-backed counter cache.
///
/// `write` is `SET` (with `EX` when a TTL is configured) and `increment` is
/// `INCR`, which keeps the key's existing expiry. Connection failures and
/// command errors are returned to the caller as they happen; there is no
/// retry and no local fallback.
pub struct RedisCache {
    conn: ConnectionManager,
    config: RedisConfig,
}

impl RedisCache {
    pub async fn new(config: RedisConfig) -> Result<Self, CacheError> {
        let client =
            Client::open(config.url.as_str()).map_err(|e| CacheError::Connection(e.to_string()))?;

        // Use timeout to prevent hanging if Redis is unreachable
        let conn_manager_fut = ConnectionManager::new(client);
        let conn = tokio::time::timeout(config.connect_timeout, conn_manager_fut)
            .await
            .map_err(|_| CacheError::Connection("Connection timed out".to_string()))?
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        tracing::info!(url = %config.url, "Connected to Redis cache");

        Ok(Self { conn, config })
    }

    /// Create from environment configuration.
    pub async fn from_env() -> Result<Self, CacheError> {
        Self::new(RedisConfig::from_env()).await
    }
}

fn operation_error(op: &'static str, key: &str, e: redis::RedisError) -> CacheError {
    tracing::warn!(key = %key, error = %e, "Redis {} failed", op);

    if e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() || e.is_timeout()
    {
        CacheError::Connection(e.to_string())
    } else {
        CacheError::Operation(e.to_string())
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn read(&self, key: &str) -> Result<Option<u64>, CacheError> {
        let mut conn = self.conn.clone();
        let raw = conn
            .get::<_, Option<String>>(key)
            .await
            .map_err(|e| operation_error("GET", key, e))?;

        raw.map(|value| {
            value.parse::<u64>().map_err(|e| {
                CacheError::Serialization(format!("bucket {key} holds {value:?}: {e}"))
            })
        })
        .transpose()
    }

    async fn write(&self, key: &str, value: u64) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();

        match self.config.bucket_ttl {
            Some(ttl) => conn
                .set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1))
                .await
                .map_err(|e| operation_error("SETEX", key, e)),
            None => conn
                .set::<_, _, ()>(key, value)
                .await
                .map_err(|e| operation_error("SET", key, e)),
        }
    }

    async fn increment(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        conn.incr::<_, _, ()>(key, 1u64)
            .await
            .map_err(|e| operation_error("INCR", key, e))
    }
}
