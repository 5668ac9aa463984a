//! TTL Policy Module
//!
//! Static mapping from a cache category to its time-to-live.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CacheError;

const MINUTE_MS: u64 = 60 * 1000;
const HOUR_MS: u64 = 60 * MINUTE_MS;
const DAY_MS: u64 = 24 * HOUR_MS;

// == Cache Category ==
/// Kind of data held in the response cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheCategory {
    /// Single card metadata lookups
    Card,
    /// Expansion (set) listings
    Expansion,
    /// Product search results
    Search,
    /// Market pricing
    Pricing,
    /// API usage counters
    Usage,
}

impl CacheCategory {
    /// Every category, in display order.
    pub const ALL: [CacheCategory; 5] = [
        CacheCategory::Card,
        CacheCategory::Expansion,
        CacheCategory::Search,
        CacheCategory::Pricing,
        CacheCategory::Usage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CacheCategory::Card => "card",
            CacheCategory::Expansion => "expansion",
            CacheCategory::Search => "search",
            CacheCategory::Pricing => "pricing",
            CacheCategory::Usage => "usage",
        }
    }
}

impl fmt::Display for CacheCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheCategory {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CacheCategory::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| CacheError::UnknownCategory(s.to_string()))
    }
}

// == Cache Policy ==
/// Freshness lifetime for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CachePolicy {
    /// Time-to-live in milliseconds
    pub ttl_ms: u64,
    /// Human readable description for admin screens
    pub description: String,
}

impl CachePolicy {
    pub fn new(ttl_ms: u64, description: impl Into<String>) -> Self {
        Self {
            ttl_ms,
            description: description.into(),
        }
    }
}

// == Policy Table ==
/// Lookup table of category policies.
///
/// A category missing from the table is never cached.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PolicyTable {
    policies: BTreeMap<CacheCategory, CachePolicy>,
}

impl PolicyTable {
    /// Creates an empty table. Nothing is cached until policies are added.
    pub fn empty() -> Self {
        Self {
            policies: BTreeMap::new(),
        }
    }

    /// Adds or replaces the policy for a category.
    pub fn with_policy(mut self, category: CacheCategory, policy: CachePolicy) -> Self {
        self.policies.insert(category, policy);
        self
    }

    /// Returns the policy for a category, if one is configured.
    pub fn get_policy(&self, category: CacheCategory) -> Option<&CachePolicy> {
        self.policies.get(&category)
    }

    /// Iterates over configured policies in category order.
    pub fn iter(&self) -> impl Iterator<Item = (&CacheCategory, &CachePolicy)> {
        self.policies.iter()
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self::empty()
            .with_policy(
                CacheCategory::Card,
                CachePolicy::new(DAY_MS, "Card metadata rarely changes once printed"),
            )
            .with_policy(
                CacheCategory::Expansion,
                CachePolicy::new(7 * DAY_MS, "Expansion lists change only on new releases"),
            )
            .with_policy(
                CacheCategory::Search,
                CachePolicy::new(30 * MINUTE_MS, "Search results for repeated queries"),
            )
            .with_policy(
                CacheCategory::Pricing,
                CachePolicy::new(HOUR_MS, "Market prices refresh a few times a day"),
            )
            .with_policy(
                CacheCategory::Usage,
                CachePolicy::new(5 * MINUTE_MS, "API usage counters"),
            )
    }
}
