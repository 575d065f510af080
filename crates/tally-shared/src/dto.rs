//! Data Transfer Objects - request/response types for the API.

use serde::{Deserialize, Serialize};

/// Response of the health endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
    pub cache_backend: String,
}

/// Rate limit standing of the caller after an admitted request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitStatus {
    /// Namespace-qualified limiter identity.
    pub identity: String,
    pub limit: u64,
    pub window_minutes: u32,
    pub remaining: u64,
}
