//! Application state - shared across all handlers.

use std::sync::Arc;

use tally_core::ports::Cache;
use tally_core::{LimitError, LimiterConfig, Policy, RateLimiter};
use tally_infra::InMemoryCache;

use crate::config::{AppConfig, CacheBackend};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<dyn Cache>,
    /// Backend actually in use (after any fallback).
    pub cache_backend: CacheBackend,
    pub limiter: LimiterConfig,
    pub policy: Policy,
    pub fail_open: bool,
}

impl AppState {
    /// Build the application state with the configured cache backend.
    pub async fn new(config: &AppConfig) -> Self {
        let (cache, cache_backend) = connect_cache(config.cache_backend).await;

        tracing::info!(
            backend = %cache_backend,
            namespace = %config.limiter.namespace,
            allowed = config.policy.allowed_number,
            window_minutes = config.policy.window_minutes,
            "Application state initialized"
        );

        Self {
            cache,
            cache_backend,
            limiter: config.limiter.clone(),
            policy: config.policy,
            fail_open: config.fail_open,
        }
    }

    /// Limiter for one caller, sharing this state's cache.
    pub fn limiter_for(&self, limit_key: &str) -> Result<RateLimiter, LimitError> {
        RateLimiter::new(limit_key, &self.limiter, self.cache.clone())
    }
}

fn in_memory() -> (Arc<dyn Cache>, CacheBackend) {
    (Arc::new(InMemoryCache::from_env()), CacheBackend::Memory)
}

#[cfg(feature = "redis")]
async fn connect_cache(backend: CacheBackend) -> (Arc<dyn Cache>, CacheBackend) {
    match backend {
        CacheBackend::Memory => in_memory(),
        CacheBackend::Redis => match tally_infra::RedisCache::from_env().await {
            Ok(cache) => (Arc::new(cache), CacheBackend::Redis),
            Err(e) => {
                tracing::error!(
                    "Failed to connect to Redis: {}. Using in-memory counters.",
                    e
                );
                in_memory()
            }
        },
    }
}

#[cfg(not(feature = "redis"))]
async fn connect_cache(backend: CacheBackend) -> (Arc<dyn Cache>, CacheBackend) {
    if backend == CacheBackend::Redis {
        tracing::warn!("Built without redis feature - using in-memory counters");
    }
    in_memory()
}
