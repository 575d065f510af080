use std::fmt;

use crate::error::LimitError;

/// Namespace used when the configuration does not name one.
pub const DEFAULT_NAMESPACE: &str = "rate-limited-";

/// Namespace-qualified key for one rate-limited subject.
///
/// The qualified form (`namespace` immediately followed by `limit_key`) is the
/// prefix of every bucket key, so limiters in different namespaces never see
/// each other's counts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LimiterIdentity {
    qualified: String,
    namespace_len: usize,
}

impl LimiterIdentity {
    pub fn new(namespace: &str, limit_key: &str) -> Result<Self, LimitError> {
        if namespace.is_empty() {
            return Err(LimitError::InvalidIdentity(
                "namespace must not be empty".to_string(),
            ));
        }
        if limit_key.is_empty() {
            return Err(LimitError::InvalidIdentity(
                "limit key must not be empty".to_string(),
            ));
        }

        Ok(Self {
            qualified: format!("{namespace}{limit_key}"),
            namespace_len: namespace.len(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.qualified
    }

    pub fn namespace(&self) -> &str {
        &self.qualified[..self.namespace_len]
    }

    pub fn limit_key(&self) -> &str {
        &self.qualified[self.namespace_len..]
    }
}

impl fmt::Display for LimiterIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified)
    }
}
