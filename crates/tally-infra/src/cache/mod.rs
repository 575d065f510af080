//! Cache implementations - Redis and in-memory.

use std::time::Duration;

mod memory;


pub use memory::{InMemoryCache, InMemoryCacheConfig};

#[cfg(feature = "redis")]
mod redis;
#[cfg(feature = "redis")]
pub use self::redis::{RedisCache, RedisConfig};

/// Default bucket lifetime. Bucket keys carry only day-of-month, hour and
/// minute, so this must stay well under a month.
pub const DEFAULT_BUCKET_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Longest bucket lifetime accepted from configuration.
pub const MAX_BUCKET_TTL: Duration = Duration::from_secs(28 * 24 * 60 * 60);

/// Bucket lifetime from `CACHE_BUCKET_TTL_SECS`, where `0` disables expiry.
///
/// Values above [`MAX_BUCKET_TTL`] are clamped to it. Anything unparsable
/// falls back to [`DEFAULT_BUCKET_TTL`].
pub(crate) fn bucket_ttl_from_env() -> Option<Duration> {
    parse_bucket_ttl(std::env::var("CACHE_BUCKET_TTL_SECS").ok().as_deref())
}

fn parse_bucket_ttl(raw: Option<&str>) -> Option<Duration> {
    let Some(secs) = raw.and_then(|s| s.trim().parse::<u64>().ok()) else {
        return Some(DEFAULT_BUCKET_TTL);
    };
    if secs == 0 {
        return None;
    }

    let ttl = Duration::from_secs(secs);
    if ttl > MAX_BUCKET_TTL {
        tracing::warn!(
            requested_secs = secs,
            max_secs = MAX_BUCKET_TTL.as_secs(),
            "CACHE_BUCKET_TTL_SECS too large, clamping"
        );
        return Some(MAX_BUCKET_TTL);
    }
    Some(ttl)
}

#[cfg(test)]
mod ttl_tests {
    use super::*;

    #[test]
    fn test_bucket_ttl_parsing() {
        assert_eq!(parse_bucket_ttl(None), Some(DEFAULT_BUCKET_TTL));
        assert_eq!(parse_bucket_ttl(Some("soon")), Some(DEFAULT_BUCKET_TTL));
        assert_eq!(parse_bucket_ttl(Some("0")), None);
        assert_eq!(parse_bucket_ttl(Some("90")), Some(Duration::from_secs(90)));
    }

    #[test]
    fn test_oversized_bucket_ttl_is_clamped() {
        let max = u64::MAX.to_string();
        assert_eq!(parse_bucket_ttl(Some(&max)), Some(MAX_BUCKET_TTL));
    }
}
