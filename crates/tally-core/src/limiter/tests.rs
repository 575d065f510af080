use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use super::*;
use crate::domain::bucket::format_minute;
use crate::ports::CacheCapabilities;

/// Scripted cache: records every call and can fail any operation or drop
/// capabilities.
#[derive(Default)]
struct ScriptedCache {
    store: Mutex<HashMap<String, u64>>,
    calls: Mutex<Vec<String>>,
    read_error: Option<CacheError>,
    write_error: Option<CacheError>,
    increment_error: Option<CacheError>,
    capabilities: Option<CacheCapabilities>,
}

impl ScriptedCache {
    fn failing_reads(error: CacheError) -> Self {
        Self {
            read_error: Some(error),
            ..Self::default()
        }
    }

    fn failing_writes(error: CacheError) -> Self {
        Self {
            write_error: Some(error),
            ..Self::default()
        }
    }

    fn failing_increments(error: CacheError) -> Self {
        Self {
            increment_error: Some(error),
            ..Self::default()
        }
    }

    fn with_capabilities(capabilities: CacheCapabilities) -> Self {
        Self {
            capabilities: Some(capabilities),
            ..Self::default()
        }
    }

    fn seed(&self, key: &str, value: u64) {
        self.store.lock().unwrap().insert(key.to_string(), value);
    }

    fn value(&self, key: &str) -> Option<u64> {
        self.store.lock().unwrap().get(key).copied()
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }
}

#[async_trait]
impl Cache for ScriptedCache {
    async fn read(&self, key: &str) -> Result<Option<u64>, CacheError> {
        self.calls.lock().unwrap().push(format!("read {key}"));
        if let Some(error) = &self.read_error {
            return Err(error.clone());
        }
        Ok(self.value(key))
    }

    async fn write(&self, key: &str, value: u64) -> Result<(), CacheError> {
        self.calls.lock().unwrap().push(format!("write {key}={value}"));
        if let Some(error) = &self.write_error {
            return Err(error.clone());
        }
        self.seed(key, value);
        Ok(())
    }

    async fn increment(&self, key: &str) -> Result<(), CacheError> {
        self.calls.lock().unwrap().push(format!("increment {key}"));
        if let Some(error) = &self.increment_error {
            return Err(error.clone());
        }
        *self
            .store
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_insert(0) += 1;
        Ok(())
    }

    fn capabilities(&self) -> CacheCapabilities {
        self.capabilities.unwrap_or_default()
    }
}

/// Clock that only moves when told to.
struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 19, 14, 30, 10)
        .single()
        .unwrap()
}

fn limiter_on(
    cache: &Arc<ScriptedCache>,
    clock: &Arc<ManualClock>,
    config: &LimiterConfig,
    key: &str,
) -> RateLimiter {
    RateLimiter::new(key, config, cache.clone())
        .unwrap()
        .with_clock(clock.clone())
}

fn setup() -> (Arc<ScriptedCache>, Arc<ManualClock>, RateLimiter) {
    let cache = Arc::new(ScriptedCache::default());
    let clock = Arc::new(ManualClock::new(start()));
    let limiter = limiter_on(&cache, &clock, &LimiterConfig::default(), "10.0.0.1");
    (cache, clock, limiter)
}

fn current_key(identity: &str, clock: &ManualClock) -> String {
    format!("{identity}{}", format_minute(clock.now()))
}

#[tokio::test]
async fn test_strict_boundary_admits_one_past_allowed() {
    let (cache, clock, limiter) = setup();
    let key = current_key("rate-limited-10.0.0.1", &clock);

    for expected in 1..=4 {
        limiter.limit_requests(3, 1).await.unwrap();
        assert_eq!(cache.value(&key), Some(expected));
    }

    let err = limiter.limit_requests(3, 1).await.unwrap_err();
    match err {
        LimitError::RateExceeded {
            identity,
            total,
            allowed,
        } => {
            assert_eq!(identity, "rate-limited-10.0.0.1");
            assert_eq!(total, 4);
            assert_eq!(allowed, 3);
        }
        other => panic!("expected RateExceeded, got {other:?}"),
    }

    // Rejected requests are not counted.
    assert_eq!(cache.value(&key), Some(4));
}

#[tokio::test]
async fn test_admissions_per_allowed_number_in_empty_window() {
    for allowed in 0..5u64 {
        let (_cache, _clock, limiter) = setup();

        let mut admitted = 0;
        while limiter.limit_requests(allowed, 5).await.is_ok() {
            admitted += 1;
            assert!(admitted <= allowed + 1, "limiter never rejected");
        }

        assert_eq!(admitted, allowed + 1);
    }
}

#[tokio::test]
async fn test_zero_allowed_admits_only_into_empty_window() {
    let (_cache, _clock, limiter) = setup();

    assert!(limiter.limit_requests(0, 1).await.is_ok());
    assert!(matches!(
        limiter.limit_requests(0, 1).await,
        Err(LimitError::RateExceeded { total: 1, .. })
    ));
}

#[tokio::test]
async fn test_namespaces_do_not_share_counts() {
    let cache = Arc::new(ScriptedCache::default());
    let clock = Arc::new(ManualClock::new(start()));
    let api = limiter_on(&cache, &clock, &LimiterConfig::with_namespace("api-"), "user-7");
    let login = limiter_on(&cache, &clock, &LimiterConfig::with_namespace("login-"), "user-7");

    api.limit_requests(0, 1).await.unwrap();
    assert!(api.limit_requests(0, 1).await.is_err());

    assert!(login.limit_requests(0, 1).await.is_ok());
    assert_eq!(cache.value(&current_key("api-user-7", &clock)), Some(1));
    assert_eq!(cache.value(&current_key("login-user-7", &clock)), Some(1));
}

#[tokio::test]
async fn test_same_identity_on_same_backend_shares_counts() {
    let cache = Arc::new(ScriptedCache::default());
    let clock = Arc::new(ManualClock::new(start()));
    let config = LimiterConfig::default();
    let first = limiter_on(&cache, &clock, &config, "token-abc");
    let second = limiter_on(&cache, &clock, &config, "token-abc");

    first.limit_requests(1, 1).await.unwrap();
    second.limit_requests(1, 1).await.unwrap();

    assert!(first.limit_requests(1, 1).await.is_err());
    assert!(second.limit_requests(1, 1).await.is_err());
}

#[tokio::test]
async fn test_fallback_replaces_error_and_skips_increment() {
    let (cache, clock, limiter) = setup();
    let key = current_key("rate-limited-10.0.0.1", &clock);
    let mut fallbacks = 0;

    for _ in 0..2 {
        limiter
            .limit_requests_or_else(1, 1, || fallbacks += 1)
            .await
            .unwrap();
    }
    assert_eq!(fallbacks, 0);

    for round in 1..=3 {
        limiter
            .limit_requests_or_else(1, 1, || fallbacks += 1)
            .await
            .unwrap();
        assert_eq!(fallbacks, round);
    }

    assert_eq!(cache.value(&key), Some(2));
}

#[tokio::test]
async fn test_zero_minute_window_ignores_previous_minutes() {
    let (cache, clock, limiter) = setup();
    let previous = format!(
        "rate-limited-10.0.0.1{}",
        format_minute(clock.now() - Duration::minutes(1))
    );
    cache.seed(&previous, 100);

    let decision = limiter.evaluate(&Policy::new(1, 0)).await.unwrap();
    assert_eq!(
        decision,
        Decision::Admitted {
            total: 0,
            allowed: 1
        }
    );
    assert!(cache.calls().iter().all(|call| !call.contains(&previous)));

    let decision = limiter.evaluate(&Policy::new(1, 1)).await.unwrap();
    assert!(!decision.is_admitted());
}

#[tokio::test]
async fn test_reads_stop_at_first_bucket_over_limit() {
    let (cache, clock, limiter) = setup();
    let oldest = format!(
        "rate-limited-10.0.0.1{}",
        format_minute(clock.now() - Duration::minutes(3))
    );
    cache.seed(&oldest, 10);

    let decision = limiter.evaluate(&Policy::new(5, 3)).await.unwrap();

    assert_eq!(
        decision,
        Decision::Rejected {
            total: 10,
            allowed: 5
        }
    );
    assert_eq!(cache.calls(), vec![format!("read {oldest}")]);
}

#[tokio::test]
async fn test_first_request_writes_then_later_requests_increment() {
    let (cache, clock, limiter) = setup();
    let key = current_key("rate-limited-10.0.0.1", &clock);

    limiter.evaluate(&Policy::new(10, 0)).await.unwrap();
    assert_eq!(
        cache.calls(),
        vec![
            format!("read {key}"),
            format!("read {key}"),
            format!("write {key}=1"),
        ]
    );

    cache.clear_calls();
    limiter.evaluate(&Policy::new(10, 0)).await.unwrap();
    assert_eq!(
        cache.calls(),
        vec![
            format!("read {key}"),
            format!("read {key}"),
            format!("increment {key}"),
        ]
    );
    assert_eq!(cache.value(&key), Some(2));
}

#[tokio::test]
async fn test_window_slides_past_old_buckets() {
    let (_cache, clock, limiter) = setup();

    limiter.limit_requests(1, 1).await.unwrap();
    limiter.limit_requests(1, 1).await.unwrap();
    assert!(limiter.limit_requests(1, 1).await.is_err());

    // Previous minute is still inside a one-minute window.
    clock.advance(Duration::minutes(1));
    assert!(limiter.limit_requests(1, 1).await.is_err());

    clock.advance(Duration::minutes(1));
    assert!(limiter.limit_requests(1, 1).await.is_ok());
}

#[tokio::test]
async fn test_read_failure_propagates_unchanged() {
    let cache = Arc::new(ScriptedCache::failing_reads(CacheError::Connection(
        "connection reset".to_string(),
    )));
    let limiter = RateLimiter::new("10.0.0.1", &LimiterConfig::default(), cache.clone()).unwrap();

    let err = limiter.limit_requests(3, 1).await.unwrap_err();
    assert!(matches!(
        err,
        LimitError::Cache(CacheError::Connection(ref msg)) if msg == "connection reset"
    ));

    let err = limiter
        .limit_requests_or_else(3, 1, || panic!("fallback must not run on cache errors"))
        .await
        .unwrap_err();
    assert!(matches!(err, LimitError::Cache(_)));
    assert!(cache.calls().iter().all(|call| call.starts_with("read")));
}

#[tokio::test]
async fn test_write_failure_on_first_request_propagates_unchanged() {
    let error = CacheError::Operation("READONLY replica".to_string());
    let (cache, clock) = (
        Arc::new(ScriptedCache::failing_writes(error.clone())),
        Arc::new(ManualClock::new(start())),
    );
    let limiter = limiter_on(&cache, &clock, &LimiterConfig::default(), "10.0.0.1");
    let key = current_key("rate-limited-10.0.0.1", &clock);

    let err = limiter.limit_requests(3, 1).await.unwrap_err();
    assert!(matches!(err, LimitError::Cache(ref e) if *e == error));
    assert_eq!(cache.calls().last(), Some(&format!("write {key}=1")));

    let err = limiter
        .limit_requests_or_else(3, 1, || panic!("fallback must not run on cache errors"))
        .await
        .unwrap_err();
    assert!(matches!(err, LimitError::Cache(ref e) if *e == error));
    assert_eq!(cache.value(&key), None);
}

#[tokio::test]
async fn test_increment_failure_on_later_request_propagates_unchanged() {
    let error = CacheError::Connection("broken pipe".to_string());
    let (cache, clock) = (
        Arc::new(ScriptedCache::failing_increments(error.clone())),
        Arc::new(ManualClock::new(start())),
    );
    let limiter = limiter_on(&cache, &clock, &LimiterConfig::default(), "10.0.0.1");
    let key = current_key("rate-limited-10.0.0.1", &clock);

    // First request of the minute writes, which succeeds.
    limiter.limit_requests(3, 1).await.unwrap();
    assert_eq!(cache.value(&key), Some(1));

    let err = limiter.limit_requests(3, 1).await.unwrap_err();
    assert!(matches!(err, LimitError::Cache(ref e) if *e == error));
    assert_eq!(cache.calls().last(), Some(&format!("increment {key}")));

    let err = limiter
        .limit_requests_or_else(3, 1, || panic!("fallback must not run on cache errors"))
        .await
        .unwrap_err();
    assert!(matches!(err, LimitError::Cache(ref e) if *e == error));
    assert_eq!(cache.value(&key), Some(1));
}

#[tokio::test]
async fn test_remaining_reaches_zero_exactly_before_rejection() {
    let (_cache, _clock, limiter) = setup();
    let policy = Policy::new(2, 1);

    let mut remaining = Vec::new();
    loop {
        let decision = limiter.evaluate(&policy).await.unwrap();
        if !decision.is_admitted() {
            break;
        }
        remaining.push(decision.remaining());
    }

    assert_eq!(remaining, vec![2, 1, 0]);
}

#[test]
fn test_backend_missing_capability_is_rejected_at_construction() {
    let cache = Arc::new(ScriptedCache::with_capabilities(CacheCapabilities {
        read: true,
        write: true,
        increment: false,
    }));

    let err = RateLimiter::new("10.0.0.1", &LimiterConfig::default(), cache).unwrap_err();
    match err {
        LimitError::BackendContract { missing } => assert_eq!(missing, vec!["increment"]),
        other => panic!("expected BackendContract, got {other:?}"),
    }

    let err = RateLimiter::from_factory("10.0.0.1", &LimiterConfig::default(), || {
        ScriptedCache::with_capabilities(CacheCapabilities {
            read: false,
            write: false,
            increment: true,
        })
    })
    .unwrap_err();
    assert!(matches!(
        err,
        LimitError::BackendContract { ref missing } if missing == &vec!["read", "write"]
    ));
}

#[test]
fn test_empty_limit_key_is_rejected_before_factory_runs() {
    let mut factory_ran = false;
    let err = RateLimiter::from_factory("", &LimiterConfig::default(), || {
        factory_ran = true;
        ScriptedCache::default()
    })
    .unwrap_err();

    assert!(matches!(err, LimitError::InvalidIdentity(_)));
    assert!(!factory_ran);
}

#[test]
fn test_factory_built_limiter_uses_configured_namespace() {
    let limiter = RateLimiter::from_factory(
        "user-42",
        &LimiterConfig::with_namespace("uploads-"),
        ScriptedCache::default,
    )
    .unwrap();

    assert_eq!(limiter.identity().as_str(), "uploads-user-42");
    assert_eq!(limiter.identity().namespace(), "uploads-");
}
