//! Cache Module
//!
//! TTL-governed response cache keyed by data category.

mod entry;
mod key;
mod policy;
mod stats;
mod store;


// Re-export public types
pub use entry::{current_timestamp_ms, CacheEntry};
pub use key::cache_key;
pub use policy::{CacheCategory, CachePolicy, PolicyTable};
pub use stats::{CacheStats, HitCounters, ZERO_HIT_RATE};
pub use store::ResponseCache;
