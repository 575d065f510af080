//! # Tally Core
//!
//! The domain layer of the tally rate limiter.
//! This crate holds the minute-bucket sliding-window algorithm and the ports
//! it needs, with zero infrastructure dependencies.

pub mod domain;
pub mod error;
pub mod limiter;
pub mod ports;

pub use domain::{Decision, LimiterIdentity, Policy};
pub use error::LimitError;
pub use limiter::{LimiterConfig, RateLimiter};
