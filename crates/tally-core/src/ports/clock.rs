//! Clock port - where the limiter gets "now" from.

use chrono::{DateTime, Utc};

/// Time source for bucket selection.
///
/// Production code uses [`SystemClock`]; tests substitute a controllable clock
/// so minute boundaries are deterministic.
pub trait Clock: Send + Sync {
    /// Current wall-clock time in UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock backed by `chrono::Utc::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
