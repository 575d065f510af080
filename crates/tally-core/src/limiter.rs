//! Sliding-window rate limiter over minute buckets.
//!
//! A window of `M` minutes is rebuilt on every call by summing the `M + 1`
//! one-minute buckets that cover `[now - M, now]`. Requests that pass the check
//! bump the current-minute bucket; rejected requests are not counted.
//!
//! The read-sum-then-increment sequence is not atomic. Two callers sharing an
//! identity can both read the same pre-increment total and both be admitted,
//! so under concurrency the aggregate may overshoot the limit by up to the
//! number of concurrent callers minus one.

use std::fmt;
use std::sync::Arc;

use crate::domain::bucket::{bucket_key, window_keys};
use crate::domain::{DEFAULT_NAMESPACE, Decision, LimiterIdentity, Policy};
use crate::error::LimitError;
use crate::ports::{Cache, CacheError, Clock, SystemClock};

/// Limiter configuration, fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimiterConfig {
    /// Prefix for every bucket key this limiter touches.
    pub namespace: String,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

impl LimiterConfig {
    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }
}

/// Rate limiter for one identity.
///
/// Holds no per-call state; all counts live in the cache, so one instance can
/// be shared (or cloned) across tasks and reused for every request of its
/// subject.
#[derive(Clone)]
pub struct RateLimiter {
    identity: LimiterIdentity,
    cache: Arc<dyn Cache>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Create a limiter for `limit_key` over an existing cache handle.
    pub fn new(
        limit_key: &str,
        config: &LimiterConfig,
        cache: Arc<dyn Cache>,
    ) -> Result<Self, LimitError> {
        let identity = LimiterIdentity::new(&config.namespace, limit_key)?;
        Self::with_identity(identity, cache)
    }

    /// Create a limiter whose cache is built by `factory`.
    ///
    /// The identity is validated before the factory runs.
    pub fn from_factory<C, F>(
        limit_key: &str,
        config: &LimiterConfig,
        factory: F,
    ) -> Result<Self, LimitError>
    where
        C: Cache + 'static,
        F: FnOnce() -> C,
    {
        let identity = LimiterIdentity::new(&config.namespace, limit_key)?;
        Self::with_identity(identity, Arc::new(factory()))
    }

    fn with_identity(
        identity: LimiterIdentity,
        cache: Arc<dyn Cache>,
    ) -> Result<Self, LimitError> {
        let missing = cache.capabilities().missing();
        if !missing.is_empty() {
            return Err(LimitError::BackendContract { missing });
        }

        Ok(Self {
            identity,
            cache,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn identity(&self) -> &LimiterIdentity {
        &self.identity
    }

    /// Decide whether one more request fits `policy`, counting it if it does.
    ///
    /// Buckets are read oldest first and reading stops at the first one that
    /// takes the total strictly above `allowed_number`. Because the total is
    /// taken before the current request is counted, `allowed_number + 1`
    /// requests fit into an empty window.
    pub async fn evaluate(&self, policy: &Policy) -> Result<Decision, CacheError> {
        let keys = window_keys(&self.identity, self.clock.now(), policy.window_minutes);
        let allowed = policy.allowed_number;

        let mut total: u64 = 0;
        for key in &keys {
            total = total.saturating_add(self.cache.read(key).await?.unwrap_or(0));

            if total > allowed {
                tracing::info!(
                    identity = %self.identity,
                    total,
                    allowed,
                    window_minutes = policy.window_minutes,
                    "Rate limit exceeded"
                );
                return Ok(Decision::Rejected { total, allowed });
            }
        }

        self.record_request().await?;

        tracing::debug!(
            identity = %self.identity,
            total,
            allowed,
            "Request admitted"
        );

        Ok(Decision::Admitted { total, allowed })
    }

    /// Admit the request or fail with [`LimitError::RateExceeded`].
    pub async fn limit_requests(
        &self,
        allowed_number: u64,
        window_minutes: u32,
    ) -> Result<(), LimitError> {
        match self
            .evaluate(&Policy::new(allowed_number, window_minutes))
            .await?
        {
            Decision::Admitted { .. } => Ok(()),
            Decision::Rejected { total, allowed } => Err(LimitError::RateExceeded {
                identity: self.identity.to_string(),
                total,
                allowed,
            }),
        }
    }

    /// Admit the request or run `on_exceeded` instead of failing.
    ///
    /// Only cache errors are returned.
    pub async fn limit_requests_or_else<F>(
        &self,
        allowed_number: u64,
        window_minutes: u32,
        on_exceeded: F,
    ) -> Result<(), LimitError>
    where
        F: FnOnce(),
    {
        let decision = self
            .evaluate(&Policy::new(allowed_number, window_minutes))
            .await?;

        if !decision.is_admitted() {
            on_exceeded();
        }

        Ok(())
    }

    /// Count one request in the current-minute bucket.
    async fn record_request(&self) -> Result<(), CacheError> {
        let key = bucket_key(&self.identity, self.clock.now());

        match self.cache.read(&key).await? {
            Some(count) if count > 0 => self.cache.increment(&key).await,
            _ => self.cache.write(&key, 1).await,
        }
    }
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
