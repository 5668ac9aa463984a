//! Image Preload Module
//!
//! Throttled prefetch queue that warms the image cache ahead of scrolling.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{CacheError, Result};
use crate::images::{ImageCache, ImageKey, ImageKind, SizeVariant};

// == Preload Config ==
#[derive(Debug, Clone)]
pub struct PreloadConfig {
    /// Tasks fetched concurrently per batch
    pub batch_size: usize,
    /// Pause between consecutive batches
    pub batch_delay: Duration,
}

impl PreloadConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(CacheError::InvalidConfig(
                "preload batch_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for PreloadConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            batch_delay: Duration::from_millis(100),
        }
    }
}

// == Preload Stats ==
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreloadStats {
    pub is_preloading: bool,
    /// Tasks waiting, in-flight ones excluded
    pub queue_size: usize,
    pub batch_size: usize,
    pub batch_delay_ms: u64,
}

#[derive(Debug, Clone)]
struct PreloadTask {
    key: ImageKey,
    kind: ImageKind,
}

#[derive(Debug, Default)]
struct PreloadState {
    queue: VecDeque<PreloadTask>,
    queued: HashSet<ImageKey>,
    in_flight: HashSet<ImageKey>,
    is_preloading: bool,
}

struct PreloadInner {
    cache: ImageCache,
    config: PreloadConfig,
    state: Mutex<PreloadState>,
}

// == Preload Queue ==
/// A single worker drains the queue one batch at a time through the image
/// cache, sleeping `batch_delay` between batches. Failed tasks are dropped.
#[derive(Clone)]
pub struct PreloadQueue {
    inner: Arc<PreloadInner>,
}

impl PreloadQueue {
    /// Creates the queue. A config failing [`PreloadConfig::validate`] runs
    /// one task per batch, with a warning.
    pub fn new(cache: ImageCache, mut config: PreloadConfig) -> Self {
        if let Err(e) = config.validate() {
            warn!("{}; using a batch size of 1", e);
            config.batch_size = 1;
        }
        Self {
            inner: Arc::new(PreloadInner {
                cache,
                config,
                state: Mutex::new(PreloadState::default()),
            }),
        }
    }

    // == Enqueue ==
    /// Appends a task unless the same key is already queued or in flight.
    ///
    /// Returns whether the task was added.
    pub async fn enqueue(&self, url: &str, kind: ImageKind, variant: SizeVariant) -> bool {
        let key = ImageKey::new(url, variant);
        let mut state = self.inner.state.lock().await;
        if state.queued.contains(&key) || state.in_flight.contains(&key) {
            return false;
        }

        state.queued.insert(key.clone());
        state.queue.push_back(PreloadTask { key, kind });
        true
    }

    // == Start ==
    /// Spawns the draining worker.
    ///
    /// Returns `None` when a worker is already running or nothing is queued.
    pub async fn start(&self) -> Option<JoinHandle<()>> {
        {
            let mut state = self.inner.state.lock().await;
            if state.is_preloading || state.queue.is_empty() {
                return None;
            }
            state.is_preloading = true;
        }

        let queue = self.clone();
        Some(tokio::spawn(async move { queue.drain().await }))
    }

    async fn drain(&self) {
        let mut batch_number = 0usize;
        let mut fetched = 0usize;

        loop {
            let batch: Vec<PreloadTask> = {
                let mut state = self.inner.state.lock().await;
                let take = self.inner.config.batch_size.min(state.queue.len());
                if take == 0 {
                    state.is_preloading = false;
                    break;
                }
                let batch: Vec<PreloadTask> = state.queue.drain(..take).collect();
                for task in &batch {
                    state.queued.remove(&task.key);
                    state.in_flight.insert(task.key.clone());
                }
                batch
            };

            batch_number += 1;
            debug!("Preload batch {} with {} images", batch_number, batch.len());

            let fetches = batch.iter().map(|task| {
                self.inner
                    .cache
                    .get_cached_image(&task.key.url, task.kind, task.key.variant)
            });
            let results = join_all(fetches).await;
            let failed = results.iter().filter(|result| result.is_err()).count();
            fetched += results.len() - failed;
            if failed > 0 {
                debug!("Preload batch {}: {} images failed", batch_number, failed);
            }

            {
                let mut state = self.inner.state.lock().await;
                for task in &batch {
                    state.in_flight.remove(&task.key);
                }
                if state.queue.is_empty() {
                    state.is_preloading = false;
                    break;
                }
            }

            tokio::time::sleep(self.inner.config.batch_delay).await;
        }

        info!("Preload finished: {} images in {} batches", fetched, batch_number);
    }

    // == Clear ==
    /// Drops queued tasks so no further batch is scheduled. Fetches already in
    /// flight run to completion.
    pub async fn clear(&self) -> usize {
        let mut state = self.inner.state.lock().await;
        let dropped = state.queue.len();
        state.queue.clear();
        state.queued.clear();
        if dropped > 0 {
            info!("Preload queue cleared ({} tasks dropped)", dropped);
        }
        dropped
    }

    // == Stats ==
    pub async fn stats(&self) -> PreloadStats {
        let state = self.inner.state.lock().await;
        PreloadStats {
            is_preloading: state.is_preloading,
            queue_size: state.queue.len(),
            batch_size: self.inner.config.batch_size,
            batch_delay_ms: self.inner.config.batch_delay.as_millis() as u64,
        }
    }
}
