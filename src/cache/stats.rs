//! Cache Statistics Module
//!
//! Tracks lookup counters and derives the stats snapshot shown to admins.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::cache::CacheCategory;

/// Reported hit rate before any lookup happened.
pub const ZERO_HIT_RATE: &str = "0%";

// == Hit Counters ==
/// Process-wide lookup counters. Not partitioned by category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HitCounters {
    /// Lookups answered from a fresh entry
    pub hits: u64,
    /// Lookups with no entry or a stale one
    pub misses: u64,
}

impl HitCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Hit rate as a percentage string with two decimals.
    pub fn hit_rate_percent(&self) -> String {
        if self.hits + self.misses == 0 {
            ZERO_HIT_RATE.to_string()
        } else {
            format!("{:.2}%", self.hit_rate() * 100.0)
        }
    }
}

// == Cache Stats ==
/// Point-in-time view of the response cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    /// Entries currently held, stale ones included
    pub total_entries: usize,
    pub hits: u64,
    pub misses: u64,
    /// Percentage string such as "75.00%"
    pub hit_rate: String,
    /// Entry count per category; categories with no entries are omitted
    pub entries_by_category: BTreeMap<CacheCategory, usize>,
}

impl CacheStats {
    /// Builds a snapshot from the counters and the categories of held entries.
    pub fn from_parts<'a>(
        counters: &HitCounters,
        categories: impl Iterator<Item = &'a CacheCategory>,
    ) -> Self {
        let mut entries_by_category = BTreeMap::new();
        let mut total_entries = 0;
        for category in categories {
            *entries_by_category.entry(*category).or_insert(0) += 1;
            total_entries += 1;
        }

        Self {
            total_entries,
            hits: counters.hits,
            misses: counters.misses,
            hit_rate: counters.hit_rate_percent(),
            entries_by_category,
        }
    }
}
