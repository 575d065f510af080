//! Application configuration loaded from environment variables.

use std::env;
use std::fmt;
use std::str::FromStr;

use tally_core::domain::DEFAULT_NAMESPACE;
use tally_core::{LimiterConfig, Policy};

/// Which Cache Port implementation backs the limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    Memory,
    Redis,
}

impl FromStr for CacheBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" | "in-memory" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            other => Err(format!("unknown cache backend: {other}")),
        }
    }
}

impl fmt::Display for CacheBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheBackend::Memory => f.write_str("memory"),
            CacheBackend::Redis => f.write_str("redis"),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub cache_backend: CacheBackend,
    pub limiter: LimiterConfig,
    pub policy: Policy,
    /// Let requests through when the cache backend fails.
    pub fail_open: bool,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let cache_backend = env::var("CACHE_BACKEND")
            .ok()
            .and_then(|v| match v.parse() {
                Ok(backend) => Some(backend),
                Err(e) => {
                    tracing::warn!("{}, using in-memory counters", e);
                    None
                }
            })
            .unwrap_or(CacheBackend::Memory);

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_var("PORT").unwrap_or(8080),
            cache_backend,
            limiter: LimiterConfig::with_namespace(
                env::var("RATE_LIMIT_NAMESPACE")
                    .ok()
                    .filter(|ns| !ns.is_empty())
                    .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            ),
            policy: Policy::new(
                parse_var("RATE_LIMIT_ALLOWED").unwrap_or(60),
                parse_var("RATE_LIMIT_WINDOW_MINUTES").unwrap_or(1),
            ),
            fail_open: env::var("RATE_LIMIT_FAIL_OPEN")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.parse().ok())
}
