//! Domain types - policies, identities, buckets and decisions.

pub mod bucket;

mod decision;
mod identity;
mod policy;

pub use decision::Decision;
pub use identity::{DEFAULT_NAMESPACE, LimiterIdentity};
pub use policy::Policy;
