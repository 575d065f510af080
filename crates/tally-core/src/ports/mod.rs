//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod cache;
mod clock;

pub use cache::{Cache, CacheCapabilities, CacheError};
pub use clock::{Clock, SystemClock};
