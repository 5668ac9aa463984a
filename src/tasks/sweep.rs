//! Expiry Sweep Task
//!
//! Background task that periodically removes stale entries from both caches.
//! Reads never depend on it: an expired entry is a miss whether or not the
//! sweep has run.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::ResponseCache;
use crate::images::ImageCache;

/// Spawns a background task that purges expired response and image entries.
///
/// The returned handle is aborted by `CacheContext::dispose`.
///
/// # Example
/// ```ignore
/// let handle = spawn_sweep_task(responses.clone(), images.clone(), 60);
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_sweep_task(
    responses: Arc<RwLock<ResponseCache<Value>>>,
    images: ImageCache,
    interval_secs: u64,
) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs);

    tokio::spawn(async move {
        info!(
            "Starting expiry sweep task with interval of {} seconds",
            interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            let responses_removed = responses.write().await.purge_expired();
            let images_removed = images.purge_expired().await;

            if responses_removed + images_removed > 0 {
                info!(
                    "Expiry sweep: removed {} responses, {} images",
                    responses_removed, images_removed
                );
            } else {
                debug!("Expiry sweep: no expired entries found");
            }
        }
    })
}
