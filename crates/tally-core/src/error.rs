//! Domain-level error types.

use thiserror::Error;

use crate::ports::CacheError;

/// Rate limiter errors.
#[derive(Debug, Error)]
pub enum LimitError {
    #[error("Invalid limiter identity: {0}")]
    InvalidIdentity(String),

    #[error("Cache backend does not support: {}", .missing.join(", "))]
    BackendContract { missing: Vec<&'static str> },

    #[error("Rate exceeded for {identity}: {total} requests observed, {allowed} allowed")]
    RateExceeded {
        identity: String,
        total: u64,
        allowed: u64,
    },

    /// Backend failures surface unchanged.
    #[error(transparent)]
    Cache(#[from] CacheError),
}
