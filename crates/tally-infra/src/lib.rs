//! # Tally Infrastructure
//!
//! Concrete implementations of the Cache Port defined in `tally-core`.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - No external dependencies, in-memory only
//! - `redis` - Redis-backed bucket counters

pub mod cache;

// Re-exports - In-Memory
pub use cache::{InMemoryCache, InMemoryCacheConfig};

// Re-exports - Redis
#[cfg(feature = "redis")]
pub use cache::{RedisCache, RedisConfig};
