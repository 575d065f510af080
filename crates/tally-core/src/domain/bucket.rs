//! Bucket keys - one counter per identity per wall-clock minute.
//!
//! A bucket key is the identity followed by the minute stamp `DDHHMM` (UTC
//! day-of-month, hour, minute). Month and year are not part of the stamp, so
//! the same day/hour/minute in two different months maps to the same key;
//! backends are expected to expire buckets well before that happens.

use chrono::{DateTime, Duration, Utc};

use super::LimiterIdentity;

/// Fixed-width minute stamp: two digits each of day-of-month, hour and minute.
pub fn format_minute(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%d%H%M").to_string()
}

/// Key of the bucket that counts requests in `timestamp`'s minute.
pub fn bucket_key(identity: &LimiterIdentity, timestamp: DateTime<Utc>) -> String {
    format!("{}{}", identity.as_str(), format_minute(timestamp))
}

/// Keys covering `[now - window_minutes, now]` in one-minute steps.
///
/// Oldest first; the last key is always the current-minute bucket, and a
/// zero-minute window yields only that one.
pub fn window_keys(
    identity: &LimiterIdentity,
    now: DateTime<Utc>,
    window_minutes: u32,
) -> Vec<String> {
    (0..=i64::from(window_minutes))
        .rev()
        .map(|minutes_back| bucket_key(identity, now - Duration::minutes(minutes_back)))
        .collect()
}
