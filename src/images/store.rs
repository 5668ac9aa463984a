//! Image Cache Module
//!
//! Maps (URL, size variant) to locally stored blobs, coalescing concurrent
//! downloads of the same key onto one in-flight fetch.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cache::current_timestamp_ms;
use crate::error::{CacheError, Result};
use crate::images::{FifoTracker, ImageCacheEntry, ImageKey, ImageKind, ImageSource, SizeVariant};
use crate::remote::{with_timeout, BlobStore, LocalRef};

type SharedFetch = Shared<BoxFuture<'static, Result<LocalRef>>>;

// == Image Cache Config ==
#[derive(Debug, Clone)]
pub struct ImageCacheConfig {
    /// Maximum number of cached images; the oldest is evicted beyond this
    pub max_cache_size: usize,
    /// Expiration horizon of a cached image
    pub ttl: Duration,
    /// Limit on a single download
    pub fetch_timeout: Duration,
}

impl ImageCacheConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_cache_size == 0 {
            return Err(CacheError::InvalidConfig(
                "max_cache_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ImageCacheConfig {
    fn default() -> Self {
        Self {
            max_cache_size: 500,
            ttl: Duration::from_secs(24 * 60 * 60),
            fetch_timeout: Duration::from_secs(15),
        }
    }
}

// == Image Cache Stats ==
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageCacheStats {
    /// Entries with `now <= expires_at`
    pub active: usize,
    /// Entries past their horizon but not yet evicted
    pub expired: usize,
    /// Keys with a download in flight
    pub pending_downloads: usize,
    pub max_cache_size: usize,
}

#[derive(Default)]
struct ImageTable {
    entries: HashMap<ImageKey, ImageCacheEntry>,
    fifo: FifoTracker,
    pending: HashMap<ImageKey, SharedFetch>,
}

struct ImageCacheInner {
    table: Mutex<ImageTable>,
    source: Arc<dyn ImageSource>,
    blobs: Arc<dyn BlobStore>,
    config: ImageCacheConfig,
}

// == Image Cache ==
/// Cloneable handle to a shared image cache.
///
/// Eviction is FIFO by `cached_at`, not LRU: reads never reorder entries.
#[derive(Clone)]
pub struct ImageCache {
    inner: Arc<ImageCacheInner>,
}

impl ImageCache {
    // == Constructor ==
    /// Creates the cache. A config failing [`ImageCacheConfig::validate`] is
    /// clamped to a one-entry cache with a warning.
    pub fn new(
        source: Arc<dyn ImageSource>,
        blobs: Arc<dyn BlobStore>,
        mut config: ImageCacheConfig,
    ) -> Self {
        if let Err(e) = config.validate() {
            warn!("{}; using a capacity of 1", e);
            config.max_cache_size = 1;
        }
        Self {
            inner: Arc::new(ImageCacheInner {
                table: Mutex::new(ImageTable::default()),
                source,
                blobs,
                config,
            }),
        }
    }

    // == Get Cached Image ==
    /// Returns the local handle for `url` at `variant`, downloading it on a
    /// miss or after expiry.
    ///
    /// At most one download per key is in flight at any time: callers arriving
    /// while a download is pending await that same download. The pending slot
    /// is reserved under the same lock as the freshness check.
    pub async fn get_cached_image(
        &self,
        url: &str,
        kind: ImageKind,
        variant: SizeVariant,
    ) -> Result<LocalRef> {
        let key = ImageKey::new(url, variant);

        let fetch = {
            let mut table = self.inner.table.lock().await;
            if let Some(entry) = table.entries.get(&key) {
                if !entry.is_expired_at(current_timestamp_ms()) {
                    return Ok(entry.local_ref.clone());
                }
            }

            match table.pending.get(&key).cloned() {
                Some(in_flight) => {
                    debug!("Joining in-flight download of {}", key);
                    in_flight
                }
                None => {
                    let fetch = self.spawn_download(key.clone(), kind);
                    table.pending.insert(key, fetch.clone());
                    fetch
                }
            }
        };

        fetch.await
    }

    /// Starts the download on its own task so it completes even if every
    /// caller stops waiting.
    fn spawn_download(&self, key: ImageKey, kind: ImageKind) -> SharedFetch {
        let cache = self.clone();
        let handle = tokio::spawn(async move { cache.download(key, kind).await });

        async move {
            handle.await.unwrap_or_else(|e| {
                Err(CacheError::Internal(format!("Image download task failed: {}", e)))
            })
        }
        .boxed()
        .shared()
    }

    async fn download(&self, key: ImageKey, kind: ImageKind) -> Result<LocalRef> {
        debug!("Downloading {} image {}", kind.as_str(), key);
        let result = self.fetch_and_store(&key).await;

        let mut released = Vec::new();
        {
            let mut table = self.inner.table.lock().await;
            table.pending.remove(&key);

            match &result {
                Ok(local_ref) => {
                    let entry = ImageCacheEntry::new(
                        key.clone(),
                        local_ref.clone(),
                        current_timestamp_ms(),
                        self.inner.config.ttl.as_millis() as u64,
                    );
                    if let Some(previous) = table.entries.insert(key.clone(), entry) {
                        released.push(previous.local_ref);
                    }
                    table.fifo.push(&key);

                    while table.entries.len() > self.inner.config.max_cache_size {
                        let Some(oldest) = table.fifo.evict_oldest() else {
                            break;
                        };
                        if let Some(evicted) = table.entries.remove(&oldest) {
                            debug!("Evicted oldest image {}", oldest);
                            released.push(evicted.local_ref);
                        }
                    }
                }
                Err(e) => warn!("Image download failed for {}: {}", key, e),
            }
        }

        for local_ref in released {
            self.inner.blobs.release(&local_ref).await;
        }
        result
    }

    async fn fetch_and_store(&self, key: &ImageKey) -> Result<LocalRef> {
        let what = format!("image fetch {}", key);
        let bytes = with_timeout(
            self.inner.config.fetch_timeout,
            &what,
            self.inner.source.fetch(&key.url, key.variant),
        )
        .await?;

        self.inner.blobs.store(bytes).await
    }

    // == Fallback ==
    /// Static placeholder shown by callers when a download ultimately fails.
    pub fn fallback_image(kind: ImageKind) -> LocalRef {
        LocalRef::new(format!("placeholder://{}", kind.as_str()))
    }

    // == Clear ==
    /// Releases every cached blob and empties the table.
    ///
    /// Downloads already in flight are not aborted and will repopulate the
    /// table when they finish.
    pub async fn clear_cache(&self) -> usize {
        let removed: Vec<ImageCacheEntry> = {
            let mut table = self.inner.table.lock().await;
            table.fifo.clear();
            table.entries.drain().map(|(_, entry)| entry).collect()
        };

        let count = removed.len();
        self.release_all(removed).await;
        info!("Image cache cleared ({} entries)", count);
        count
    }

    /// Releases and removes entries of one size variant.
    pub async fn clear_variant(&self, variant: SizeVariant) -> usize {
        self.remove_where(|entry| entry.key.variant == variant).await
    }

    /// Releases and removes expired entries.
    pub async fn purge_expired(&self) -> usize {
        let now = current_timestamp_ms();
        self.remove_where(|entry| entry.is_expired_at(now)).await
    }

    async fn remove_where<F>(&self, predicate: F) -> usize
    where
        F: Fn(&ImageCacheEntry) -> bool,
    {
        let removed: Vec<ImageCacheEntry> = {
            let mut table = self.inner.table.lock().await;
            let keys: Vec<ImageKey> = table
                .entries
                .values()
                .filter(|entry| predicate(entry))
                .map(|entry| entry.key.clone())
                .collect();

            let mut removed = Vec::with_capacity(keys.len());
            for key in keys {
                table.fifo.remove(&key);
                if let Some(entry) = table.entries.remove(&key) {
                    removed.push(entry);
                }
            }
            removed
        };

        let count = removed.len();
        self.release_all(removed).await;
        count
    }

    async fn release_all(&self, entries: Vec<ImageCacheEntry>) {
        for entry in entries {
            self.inner.blobs.release(&entry.local_ref).await;
        }
    }

    // == Stats ==
    /// Counts active and expired entries by a full scan.
    pub async fn stats(&self) -> ImageCacheStats {
        let table = self.inner.table.lock().await;
        let now = current_timestamp_ms();
        let expired = table
            .entries
            .values()
            .filter(|entry| entry.is_expired_at(now))
            .count();

        ImageCacheStats {
            active: table.entries.len() - expired,
            expired,
            pending_downloads: table.pending.len(),
            max_cache_size: self.inner.config.max_cache_size,
        }
    }

    /// True if an entry (fresh or expired) is held for the key.
    pub async fn contains(&self, url: &str, variant: SizeVariant) -> bool {
        let table = self.inner.table.lock().await;
        table.entries.contains_key(&ImageKey::new(url, variant))
    }

    pub async fn len(&self) -> usize {
        self.inner.table.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.table.lock().await.entries.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryBlobStore;
    use async_trait::async_trait;
    use futures::future::join_all;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts downloads and takes a while to answer.
    #[derive(Default)]
    struct SlowSource {
        fetches: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl ImageSource for SlowSource {
        async fn fetch(&self, url: &str, _variant: SizeVariant) -> Result<Vec<u8>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            if self.fail {
                Err(CacheError::FetchFailed(format!("{}: 503", url)))
            } else {
                Ok(url.as_bytes().to_vec())
            }
        }
    }

    fn cache_with(
        source: Arc<SlowSource>,
        blobs: Arc<MemoryBlobStore>,
        max_cache_size: usize,
        ttl: Duration,
    ) -> ImageCache {
        ImageCache::new(
            source,
            blobs,
            ImageCacheConfig {
                max_cache_size,
                ttl,
                fetch_timeout: Duration::from_secs(5),
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_requests_share_one_download() {
        let source = Arc::new(SlowSource::default());
        let blobs = Arc::new(MemoryBlobStore::new());
        let cache = cache_with(source.clone(), blobs.clone(), 10, Duration::from_secs(60));

        let url = "https://img/1.png";
        let calls = (0..8).map(|_| cache.get_cached_image(url, ImageKind::Card, SizeVariant::Card));
        let results: Vec<LocalRef> = join_all(calls)
            .await
            .into_iter()
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| r == &results[0]));
        assert_eq!(blobs.len().await, 1);
        assert_eq!(cache.stats().await.pending_downloads, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hit_skips_download() {
        let source = Arc::new(SlowSource::default());
        let cache = cache_with(
            source.clone(),
            Arc::new(MemoryBlobStore::new()),
            10,
            Duration::from_secs(60),
        );

        let first = cache.get_cached_image("u", ImageKind::Card, SizeVariant::Large).await;
        let second = cache.get_cached_image("u", ImageKind::Card, SizeVariant::Large).await;

        assert!(first.is_ok());
        assert_eq!(first, second);
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_variants_download_separately() {
        let source = Arc::new(SlowSource::default());
        let cache = cache_with(
            source.clone(),
            Arc::new(MemoryBlobStore::new()),
            10,
            Duration::from_secs(60),
        );

        let (a, b) = tokio::join!(
            cache.get_cached_image("u", ImageKind::Card, SizeVariant::Thumbnail),
            cache.get_cached_image("u", ImageKind::Card, SizeVariant::Hd),
        );

        assert_ne!(a.unwrap(), b.unwrap());
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_download_clears_pending_and_allows_retry() {
        let source = Arc::new(SlowSource {
            fail: true,
            ..Default::default()
        });
        let cache = cache_with(
            source.clone(),
            Arc::new(MemoryBlobStore::new()),
            10,
            Duration::from_secs(60),
        );

        let result = cache
            .get_cached_image("https://img/x.png", ImageKind::Product, SizeVariant::Card)
            .await;
        assert!(matches!(result, Err(CacheError::FetchFailed(ref msg)) if msg.contains("x.png")));

        let stats = cache.stats().await;
        assert_eq!(stats.pending_downloads, 0);
        assert_eq!(stats.active, 0);

        let _ = cache
            .get_cached_image("https://img/x.png", ImageKind::Product, SizeVariant::Card)
            .await;
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fifo_eviction_releases_oldest() {
        let source = Arc::new(SlowSource::default());
        let blobs = Arc::new(MemoryBlobStore::new());
        let cache = cache_with(source, blobs.clone(), 3, Duration::from_secs(60));

        let oldest = cache
            .get_cached_image("a", ImageKind::Card, SizeVariant::Card)
            .await
            .unwrap();
        cache.get_cached_image("b", ImageKind::Card, SizeVariant::Card).await.unwrap();
        cache.get_cached_image("c", ImageKind::Card, SizeVariant::Card).await.unwrap();
        // A read does not refresh "a": eviction is by cache time
        cache.get_cached_image("a", ImageKind::Card, SizeVariant::Card).await.unwrap();
        cache.get_cached_image("d", ImageKind::Card, SizeVariant::Card).await.unwrap();

        assert_eq!(cache.len().await, 3);
        assert!(!cache.contains("a", SizeVariant::Card).await);
        assert!(cache.contains("b", SizeVariant::Card).await);
        assert!(cache.contains("d", SizeVariant::Card).await);
        assert!(!blobs.contains(&oldest).await);
        assert_eq!(blobs.len().await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_is_refetched() {
        let source = Arc::new(SlowSource::default());
        let blobs = Arc::new(MemoryBlobStore::new());
        let cache = cache_with(source.clone(), blobs.clone(), 10, Duration::ZERO);

        cache.get_cached_image("u", ImageKind::Card, SizeVariant::Card).await.unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));

        let stats = cache.stats().await;
        assert_eq!(stats.expired, 1);
        assert_eq!(stats.active, 0);

        cache.get_cached_image("u", ImageKind::Card, SizeVariant::Card).await.unwrap();
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len().await, 1);
        assert_eq!(blobs.len().await, 1, "replaced blob is released");
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_and_clear_variant() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let cache = cache_with(
            Arc::new(SlowSource::default()),
            blobs.clone(),
            10,
            Duration::from_secs(60),
        );

        cache.get_cached_image("a", ImageKind::Card, SizeVariant::Thumbnail).await.unwrap();
        cache.get_cached_image("b", ImageKind::Card, SizeVariant::Thumbnail).await.unwrap();
        cache.get_cached_image("a", ImageKind::Card, SizeVariant::Hd).await.unwrap();

        assert_eq!(cache.clear_variant(SizeVariant::Thumbnail).await, 2);
        assert_eq!(cache.len().await, 1);
        assert_eq!(blobs.len().await, 1);

        assert_eq!(cache.clear_cache().await, 1);
        assert!(cache.is_empty().await);
        assert!(blobs.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let cache = cache_with(
            Arc::new(SlowSource::default()),
            Arc::new(MemoryBlobStore::new()),
            10,
            Duration::ZERO,
        );

        cache.get_cached_image("a", ImageKind::Card, SizeVariant::Card).await.unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));

        assert_eq!(cache.purge_expired().await, 1);
        assert!(cache.is_empty().await);
    }

    #[test]
    fn test_zero_capacity_is_invalid() {
        let config = ImageCacheConfig {
            max_cache_size: 0,
            ..ImageCacheConfig::default()
        };
        assert!(matches!(config.validate(), Err(CacheError::InvalidConfig(_))));
        assert!(ImageCacheConfig::default().validate().is_ok());
    }

    #[tokio::test]
    async fn test_zero_capacity_is_clamped() {
        let cache = cache_with(
            Arc::new(SlowSource::default()),
            Arc::new(MemoryBlobStore::new()),
            0,
            Duration::from_secs(60),
        );
        assert_eq!(cache.stats().await.max_cache_size, 1);
    }

    #[test]
    fn test_fallback_image() {
        assert_eq!(
            ImageCache::fallback_image(ImageKind::Expansion).as_str(),
            "placeholder://expansion"
        );
    }

    #[tokio::test]
    async fn test_stats_reports_capacity() {
        let cache = cache_with(
            Arc::new(SlowSource::default()),
            Arc::new(MemoryBlobStore::new()),
            42,
            Duration::from_secs(1),
        );
        let stats = cache.stats().await;
        assert_eq!(stats.max_cache_size, 42);
        assert_eq!(stats.active + stats.expired + stats.pending_downloads, 0);
    }
}
