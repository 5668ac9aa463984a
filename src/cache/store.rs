//! Response Cache Module
//!
//! Category-keyed side table for remote API responses with TTL freshness.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::cache::entry::current_timestamp_ms;
use crate::cache::{CacheCategory, CacheEntry, CacheStats, HitCounters, PolicyTable};

type EntryKey = (CacheCategory, String);

// == Response Cache ==
/// TTL cache for read-heavy API responses.
///
/// The cache never fails and is never the source of truth: callers `get`,
/// fetch on a miss, then `set`. Stale entries are reported as misses and stay
/// in place until overwritten, cleared, or purged.
#[derive(Debug)]
pub struct ResponseCache<T> {
    /// Entries keyed by category and caller key
    entries: HashMap<EntryKey, CacheEntry<T>>,
    /// Freshness policy per category
    policies: PolicyTable,
    /// Process-wide hit/miss counters
    counters: HitCounters,
}

impl<T: Clone> ResponseCache<T> {
    // == Constructor ==
    /// Creates an empty cache governed by `policies`.
    pub fn new(policies: PolicyTable) -> Self {
        Self {
            entries: HashMap::new(),
            policies,
            counters: HitCounters::new(),
        }
    }

    // == Get ==
    /// Returns the payload if a fresh entry exists, `None` on a miss.
    pub fn get(&mut self, category: CacheCategory, key: &str) -> Option<T> {
        self.get_at(category, key, current_timestamp_ms())
    }

    /// Same as [`get`](Self::get) evaluated at the given Unix millisecond time.
    pub fn get_at(&mut self, category: CacheCategory, key: &str, now: u64) -> Option<T> {
        if self.policies.get_policy(category).is_none() {
            debug!("No policy for category {}, treating {} as miss", category, key);
            self.counters.record_miss();
            return None;
        }

        match self.entries.get(&(category, key.to_string())) {
            Some(entry) if !entry.is_expired_at(now) => {
                self.counters.record_hit();
                Some(entry.payload.clone())
            }
            Some(_) => {
                debug!("Stale {} entry for {}", category, key);
                self.counters.record_miss();
                None
            }
            None => {
                self.counters.record_miss();
                None
            }
        }
    }

    // == Set ==
    /// Stores a payload, overwriting any previous entry for the same key.
    ///
    /// Returns `false` without storing when the category has no policy.
    pub fn set(&mut self, category: CacheCategory, key: impl Into<String>, payload: T) -> bool {
        self.set_at(category, key, payload, current_timestamp_ms())
    }

    /// Same as [`set`](Self::set) with an explicit storage time.
    pub fn set_at(
        &mut self,
        category: CacheCategory,
        key: impl Into<String>,
        payload: T,
        now: u64,
    ) -> bool {
        let key = key.into();
        let Some(policy) = self.policies.get_policy(category) else {
            debug!("No policy for category {}, not caching {}", category, key);
            return false;
        };

        let entry = CacheEntry::new(key.clone(), category, payload, now, policy.ttl_ms);
        if self.entries.insert((category, key.clone()), entry).is_none() {
            debug!("Cached new {} entry {}", category, key);
        }
        true
    }

    // == Clear ==
    /// Drops every entry and resets the hit/miss counters.
    pub fn clear(&mut self) {
        let removed = self.entries.len();
        self.entries.clear();
        self.counters.reset();
        info!("Response cache cleared ({} entries)", removed);
    }

    // == Clear By Type ==
    /// Drops entries of one category. Hit/miss counters are left untouched.
    ///
    /// Returns the number of entries removed.
    pub fn clear_by_type(&mut self, category: CacheCategory) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(entry_category, _), _| *entry_category != category);
        let removed = before - self.entries.len();
        info!("Response cache cleared {} {} entries", removed, category);
        removed
    }

    // == Purge Expired ==
    /// Removes stale entries. Only the sweep task calls this; reads never do.
    pub fn purge_expired(&mut self) -> usize {
        self.purge_expired_at(current_timestamp_ms())
    }

    pub fn purge_expired_at(&mut self, now: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired_at(now));
        before - self.entries.len()
    }

    // == Stats ==
    /// Returns a derived statistics snapshot.
    pub fn stats(&self) -> CacheStats {
        CacheStats::from_parts(&self.counters, self.entries.keys().map(|(category, _)| category))
    }

    // == Policies ==
    /// Read-only view of the TTL policy table.
    pub fn policies(&self) -> &PolicyTable {
        &self.policies
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: Clone> Default for ResponseCache<T> {
    fn default() -> Self {
        Self::new(PolicyTable::default())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CachePolicy;

    const T0: u64 = 1_700_000_000_000;

    fn store() -> ResponseCache<String> {
        ResponseCache::default()
    }

    fn ttl(store: &ResponseCache<String>, category: CacheCategory) -> u64 {
        store.policies().get_policy(category).unwrap().ttl_ms
    }

    #[test]
    fn test_store_new() {
        let store = store();
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert_eq!(store.stats().hit_rate, "0%");
    }

    #[test]
    fn test_store_set_and_get() {
        let mut store = store();

        assert!(store.set(CacheCategory::Card, "card:1", "charizard".to_string()));
        assert_eq!(store.get(CacheCategory::Card, "card:1").as_deref(), Some("charizard"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_same_key_different_category_is_distinct() {
        let mut store = store();

        store.set(CacheCategory::Card, "42", "card".to_string());
        store.set(CacheCategory::Pricing, "42", "price".to_string());

        assert_eq!(store.len(), 2);
        assert_eq!(store.get(CacheCategory::Card, "42").as_deref(), Some("card"));
        assert_eq!(store.get(CacheCategory::Pricing, "42").as_deref(), Some("price"));
    }

    #[test]
    fn test_store_get_nonexistent_is_miss() {
        let mut store = store();

        assert!(store.get(CacheCategory::Search, "nope").is_none());
        let stats = store.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 0);
    }

    #[test]
    fn test_ttl_boundaries() {
        let mut store = store();
        let t = ttl(&store, CacheCategory::Pricing);
        store.set_at(CacheCategory::Pricing, "p", "1.00".to_string(), T0);

        assert!(store.get_at(CacheCategory::Pricing, "p", T0 + t - 1).is_some());
        assert!(store.get_at(CacheCategory::Pricing, "p", T0 + t).is_some());
        assert!(store.get_at(CacheCategory::Pricing, "p", T0 + t + 1).is_none());
    }

    #[test]
    fn test_stale_entry_stays_until_overwritten() {
        let mut store = store();
        let t = ttl(&store, CacheCategory::Usage);
        store.set_at(CacheCategory::Usage, "u", "old".to_string(), T0);

        assert!(store.get_at(CacheCategory::Usage, "u", T0 + t + 1).is_none());
        assert_eq!(store.len(), 1, "stale entry is not removed by a read");

        store.set_at(CacheCategory::Usage, "u", "new".to_string(), T0 + t + 1);
        assert_eq!(
            store.get_at(CacheCategory::Usage, "u", T0 + t + 2).as_deref(),
            Some("new")
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_overwrite() {
        let mut store = store();

        store.set(CacheCategory::Card, "key1", "value1".to_string());
        store.set(CacheCategory::Card, "key1", "value2".to_string());

        assert_eq!(store.get(CacheCategory::Card, "key1").as_deref(), Some("value2"));
        assert_eq!(store.stats().entries_by_category[&CacheCategory::Card], 1);
    }

    #[test]
    fn test_category_without_policy_fails_closed() {
        let policies = PolicyTable::empty()
            .with_policy(CacheCategory::Card, CachePolicy::new(1_000, "cards"));
        let mut store: ResponseCache<String> = ResponseCache::new(policies);

        assert!(!store.set(CacheCategory::Search, "q", "rows".to_string()));
        assert!(store.get(CacheCategory::Search, "q").is_none());
        assert!(store.is_empty());
        assert_eq!(store.stats().misses, 1);
    }

    #[test]
    fn test_clear_resets_counters() {
        let mut store = store();

        store.set(CacheCategory::Card, "a", "1".to_string());
        store.get(CacheCategory::Card, "a");
        store.get(CacheCategory::Card, "b");
        store.clear();

        let stats = store.stats();
        assert_eq!(stats.total_entries, 0);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.hit_rate, "0%");
    }

    #[test]
    fn test_clear_by_type_isolates_categories() {
        let mut store = store();

        store.set(CacheCategory::Card, "a", "1".to_string());
        store.set(CacheCategory::Card, "b", "2".to_string());
        store.set(CacheCategory::Search, "q", "3".to_string());
        store.get(CacheCategory::Card, "a");
        store.get(CacheCategory::Card, "missing");

        assert_eq!(store.clear_by_type(CacheCategory::Card), 2);

        let stats = store.stats();
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(store.get(CacheCategory::Search, "q").as_deref(), Some("3"));
    }

    #[test]
    fn test_stats_hit_rate() {
        let mut store = store();

        store.set(CacheCategory::Expansion, "sv", "sets".to_string());
        store.get(CacheCategory::Expansion, "sv");
        store.get(CacheCategory::Expansion, "sv");
        store.get(CacheCategory::Expansion, "sv");
        store.get(CacheCategory::Expansion, "other");

        let stats = store.stats();
        assert_eq!(stats.hits, 3);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate, "75.00%");
    }

    #[test]
    fn test_purge_expired() {
        let mut store = store();
        let usage_ttl = ttl(&store, CacheCategory::Usage);

        store.set_at(CacheCategory::Usage, "u", "1".to_string(), T0);
        store.set_at(CacheCategory::Card, "c", "2".to_string(), T0);

        let removed = store.purge_expired_at(T0 + usage_ttl + 1);
        assert_eq!(removed, 1);
        assert_eq!(store.len(), 1);
        assert!(store.get_at(CacheCategory::Card, "c", T0 + usage_ttl + 1).is_some());
    }
}
