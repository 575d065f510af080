use async_trait::async_trait;

/// Cache trait - the counter store the limiter reads and bumps.
///
/// Keys are plain strings; values are non-negative request counts. Entry
/// lifetime (expiry, eviction) belongs to the implementation.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Read a counter. Absent keys yield `Ok(None)`.
    async fn read(&self, key: &str) -> Result<Option<u64>, CacheError>;

    /// Store a counter value, replacing any previous one.
    async fn write(&self, key: &str, value: u64) -> Result<(), CacheError>;

    /// Add one to an existing counter.
    ///
    /// The limiter only calls this on keys it has just read as present; what
    /// happens for an absent key is up to the backend.
    async fn increment(&self, key: &str) -> Result<(), CacheError>;

    /// Operations this backend actually serves.
    ///
    /// Adapters fronting a partial store (a read-only replica, say) override
    /// this so limiter construction can refuse them up front.
    fn capabilities(&self) -> CacheCapabilities {
        CacheCapabilities::all()
    }
}

/// Set of Cache Port operations a backend supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheCapabilities {
    pub read: bool,
    pub write: bool,
    pub increment: bool,
}

impl CacheCapabilities {
    pub const fn all() -> Self {
        Self {
            read: true,
            write: true,
            increment: true,
        }
    }

    /// Names of the operations that are not supported.
    pub fn missing(&self) -> Vec<&'static str> {
        [
            (self.read, "read"),
            (self.write, "write"),
            (self.increment, "increment"),
        ]
        .into_iter()
        .filter_map(|(supported, name)| (!supported).then_some(name))
        .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.read && self.write && self.increment
    }
}

impl Default for CacheCapabilities {
    fn default() -> Self {
        Self::all()
    }
}

/// Cache operation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("Operation failed: {0}")]
    Operation(String),
}
