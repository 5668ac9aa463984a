//! Cache Entry Module
//!
//! Defines the structure for individual response cache entries.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::cache::CacheCategory;

// == Cache Entry ==
/// A cached payload together with its freshness window.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    /// Caller supplied key
    pub key: String,
    /// Category the TTL was taken from
    pub category: CacheCategory,
    /// The stored payload
    pub payload: T,
    /// Storage timestamp (Unix milliseconds)
    pub stored_at: u64,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
}

impl<T> CacheEntry<T> {
    // == Constructor ==
    /// Creates an entry stored at `now` that lives for `ttl_ms`.
    pub fn new(key: String, category: CacheCategory, payload: T, now: u64, ttl_ms: u64) -> Self {
        Self {
            key,
            category,
            payload,
            stored_at: now,
            expires_at: now.saturating_add(ttl_ms),
        }
    }

    // == Is Expired ==
    /// Checks whether the entry is stale at `now`.
    ///
    /// The expiration instant itself is still fresh: an entry is expired only
    /// once `now > expires_at`.
    pub fn is_expired_at(&self, now: u64) -> bool {
        now > self.expires_at
    }

    /// Checks whether the entry is stale at the current wall clock time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    // == Time To Live ==
    /// Returns remaining freshness in milliseconds, 0 once expired.
    pub fn ttl_remaining_ms(&self) -> u64 {
        self.expires_at.saturating_sub(current_timestamp_ms())
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn entry_at(now: u64, ttl_ms: u64) -> CacheEntry<&'static str> {
        CacheEntry::new("k".to_string(), CacheCategory::Card, "v", now, ttl_ms)
    }

    #[test]
    fn test_entry_creation() {
        let entry = entry_at(1_000, 500);

        assert_eq!(entry.payload, "v");
        assert_eq!(entry.stored_at, 1_000);
        assert_eq!(entry.expires_at, 1_500);
    }

    #[test]
    fn test_expiration_boundary_is_inclusive() {
        let entry = entry_at(1_000, 500);

        assert!(!entry.is_expired_at(1_499));
        assert!(!entry.is_expired_at(1_500), "expires_at itself is still fresh");
        assert!(entry.is_expired_at(1_501));
    }

    #[test]
    fn test_ttl_remaining_fresh_entry() {
        let entry = entry_at(current_timestamp_ms(), 10_000);

        let remaining = entry.ttl_remaining_ms();
        assert!(remaining <= 10_000);
        assert!(remaining >= 9_000);
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_ttl_remaining_expired_entry() {
        let entry = entry_at(1_000, 1);

        assert_eq!(entry.ttl_remaining_ms(), 0);
        assert!(entry.is_expired());
    }

    #[test]
    fn test_expiry_saturates() {
        let entry = entry_at(u64::MAX - 1, 10);
        assert_eq!(entry.expires_at, u64::MAX);
    }
}
