//! Image Entry Module
//!
//! Key and entry types for the image cache.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::remote::LocalRef;

// == Size Variant ==
/// Logical rendition of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeVariant {
    Thumbnail,
    Card,
    Large,
    Hd,
}

impl SizeVariant {
    /// Width hint in pixels passed to the image host.
    pub fn width_hint(&self) -> u32 {
        match self {
            SizeVariant::Thumbnail => 120,
            SizeVariant::Card => 245,
            SizeVariant::Large => 480,
            SizeVariant::Hd => 734,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SizeVariant::Thumbnail => "thumbnail",
            SizeVariant::Card => "card",
            SizeVariant::Large => "large",
            SizeVariant::Hd => "hd",
        }
    }
}

impl fmt::Display for SizeVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// == Image Kind ==
/// What an image depicts; selects the placeholder shown when a fetch fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Card,
    Expansion,
    Product,
}

impl ImageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageKind::Card => "card",
            ImageKind::Expansion => "expansion",
            ImageKind::Product => "product",
        }
    }
}

// == Image Key ==
/// Cache key: source URL plus size variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageKey {
    pub url: String,
    pub variant: SizeVariant,
}

impl ImageKey {
    pub fn new(url: impl Into<String>, variant: SizeVariant) -> Self {
        Self {
            url: url.into(),
            variant,
        }
    }
}

impl fmt::Display for ImageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.url, self.variant)
    }
}

// == Image Cache Entry ==
#[derive(Debug, Clone)]
pub struct ImageCacheEntry {
    pub key: ImageKey,
    /// Handle returned by the blob store
    pub local_ref: LocalRef,
    /// Unix milliseconds
    pub cached_at: u64,
    /// Unix milliseconds; fresh while `now <= expires_at`
    pub expires_at: u64,
}

impl ImageCacheEntry {
    pub fn new(key: ImageKey, local_ref: LocalRef, now: u64, ttl_ms: u64) -> Self {
        Self {
            key,
            local_ref,
            cached_at: now,
            expires_at: now.saturating_add(ttl_ms),
        }
    }

    pub fn is_expired_at(&self, now: u64) -> bool {
        now > self.expires_at
    }
}
