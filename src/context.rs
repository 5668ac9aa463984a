//! Cache Context
//!
//! Owns every cache of the service and their background work, so startup and
//! shutdown happen in one place.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::{cache_key, CacheCategory, PolicyTable, ResponseCache};
use crate::config::Config;
use crate::error::Result;
use crate::images::{ImageCache, ImageSource, PreloadQueue};
use crate::remote::{with_timeout, BlobStore, RemoteData};
use crate::tasks::spawn_sweep_task;

// == Cache Context ==
pub struct CacheContext {
    responses: Arc<RwLock<ResponseCache<Value>>>,
    images: ImageCache,
    preload: PreloadQueue,
    sweep: Mutex<Option<JoinHandle<()>>>,
    remote_timeout: Duration,
}

impl CacheContext {
    /// Builds the caches from configuration and starts the expiry sweep when
    /// `sweep_interval_secs` is non-zero.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn init(
        config: &Config,
        source: Arc<dyn ImageSource>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        let responses = Arc::new(RwLock::new(ResponseCache::new(PolicyTable::default())));
        let images = ImageCache::new(source, blobs, config.image_cache_config());
        let preload = PreloadQueue::new(images.clone(), config.preload_config());

        let sweep = if config.sweep_interval_secs > 0 {
            Some(spawn_sweep_task(
                responses.clone(),
                images.clone(),
                config.sweep_interval_secs,
            ))
        } else {
            debug!("Expiry sweep disabled");
            None
        };

        Self {
            responses,
            images,
            preload,
            sweep: Mutex::new(sweep),
            remote_timeout: config.remote_timeout(),
        }
    }

    pub fn responses(&self) -> &Arc<RwLock<ResponseCache<Value>>> {
        &self.responses
    }

    pub fn images(&self) -> &ImageCache {
        &self.images
    }

    pub fn preload(&self) -> &PreloadQueue {
        &self.preload
    }

    // == Cached Query ==
    /// Answers `resource` filtered by `filter` from the response cache, going
    /// to the remote store on a miss and caching what it returns.
    ///
    /// Remote failures are returned as-is and nothing is cached for them.
    pub async fn cached_query(
        &self,
        remote: &dyn RemoteData,
        category: CacheCategory,
        resource: &str,
        filter: &Value,
    ) -> Result<Vec<Value>> {
        let key = cache_key(resource, filter)?;

        let cached = self.responses.write().await.get(category, &key);
        if let Some(Value::Array(rows)) = cached {
            return Ok(rows);
        }

        let what = format!("query {}", resource);
        let rows = with_timeout(self.remote_timeout, &what, remote.query(resource, filter)).await?;
        self.responses
            .write()
            .await
            .set(category, key, Value::Array(rows.clone()));
        Ok(rows)
    }

    // == Dispose ==
    /// Cancels pending preloads, stops the sweep and releases every image blob.
    ///
    /// Safe to call more than once.
    pub async fn dispose(&self) {
        let dropped = self.preload.clear().await;
        if let Some(handle) = self.sweep.lock().await.take() {
            handle.abort();
        }
        let released = self.images.clear_cache().await;
        info!(
            "Cache context disposed ({} preloads dropped, {} images released)",
            dropped, released
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;
    use crate::images::{ImageKind, SizeVariant};
    use crate::remote::{MemoryBlobStore, MemoryRemote};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticSource;

    #[async_trait]
    impl ImageSource for StaticSource {
        async fn fetch(&self, _url: &str, _variant: SizeVariant) -> Result<Vec<u8>> {
            Ok(vec![0xFF, 0xD8])
        }
    }

    /// Counts queries before delegating.
    struct CountingRemote {
        inner: MemoryRemote,
        queries: AtomicUsize,
    }

    #[async_trait]
    impl RemoteData for CountingRemote {
        async fn query(&self, resource: &str, filter: &Value) -> Result<Vec<Value>> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            self.inner.query(resource, filter).await
        }

        async fn insert(&self, resource: &str, rows: Vec<Value>) -> Result<Vec<Value>> {
            self.inner.insert(resource, rows).await
        }
    }

    fn context(sweep_interval_secs: u64) -> CacheContext {
        let config = Config {
            sweep_interval_secs,
            ..Config::default()
        };
        CacheContext::init(&config, Arc::new(StaticSource), Arc::new(MemoryBlobStore::new()))
    }

    #[tokio::test]
    async fn test_cached_query_hits_remote_once() {
        let ctx = context(0);
        let remote = CountingRemote {
            inner: MemoryRemote::new(),
            queries: AtomicUsize::new(0),
        };
        remote
            .insert("sets", vec![json!({"code": "base1", "era": "wotc"})])
            .await
            .unwrap();

        let first = ctx
            .cached_query(&remote, CacheCategory::Expansion, "sets", &json!({"era": "wotc"}))
            .await
            .unwrap();
        let second = ctx
            .cached_query(&remote, CacheCategory::Expansion, "sets", &json!({"era": "wotc"}))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
        assert_eq!(remote.queries.load(Ordering::SeqCst), 1);

        let stats = ctx.responses().read().await.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    /// Never answers.
    struct Hanging;

    #[async_trait]
    impl RemoteData for Hanging {
        async fn query(&self, _resource: &str, _filter: &Value) -> Result<Vec<Value>> {
            std::future::pending().await
        }

        async fn insert(&self, _resource: &str, _rows: Vec<Value>) -> Result<Vec<Value>> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cached_query_times_out_without_caching() {
        let ctx = context(0);
        let result = ctx
            .cached_query(&Hanging, CacheCategory::Search, "products", &json!({"q": "pikachu"}))
            .await;

        assert!(matches!(result, Err(CacheError::Timeout(_))));
        assert!(ctx.responses().read().await.is_empty());
    }

    #[tokio::test]
    async fn test_init_respects_disabled_sweep() {
        let ctx = context(0);
        assert!(ctx.sweep.lock().await.is_none());

        let ctx = context(60);
        assert!(ctx.sweep.lock().await.is_some());
        ctx.dispose().await;
        assert!(ctx.sweep.lock().await.is_none());
    }

    #[tokio::test]
    async fn test_dispose_releases_images_and_queue() {
        let ctx = context(0);
        ctx.images()
            .get_cached_image("https://img/a.png", ImageKind::Card, SizeVariant::Large)
            .await
            .unwrap();
        ctx.preload()
            .enqueue("https://img/b.png", ImageKind::Card, SizeVariant::Large)
            .await;

        ctx.dispose().await;
        ctx.dispose().await;

        assert!(ctx.images().is_empty().await);
        assert_eq!(ctx.preload().stats().await.queue_size, 0);
    }
}
