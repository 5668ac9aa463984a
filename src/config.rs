//! Configuration Module
//!
//! Handles loading and managing service configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::batch::BatchConfig;
use crate::error::Result;
use crate::images::{ImageCacheConfig, PreloadConfig};

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Maximum number of cached images
    pub image_max_entries: usize,
    /// Image expiration horizon in seconds
    pub image_ttl_secs: u64,
    /// Images fetched per preload batch
    pub preload_batch_size: usize,
    /// Pause between preload batches in milliseconds
    pub preload_batch_delay_ms: u64,
    /// Cart lines per batch processor group
    pub batch_size: usize,
    /// Cart lines resolved concurrently
    pub batch_max_concurrency: usize,
    /// Additional attempts after a failed line
    pub batch_retry_attempts: u32,
    /// Fixed delay between attempts in milliseconds
    pub batch_retry_delay_ms: u64,
    /// Timeout applied to every remote call in milliseconds
    pub remote_timeout_ms: u64,
    /// Expired-entry sweep interval in seconds, 0 disables the sweep
    pub sweep_interval_secs: u64,
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` (default: 3000)
    /// - `IMAGE_CACHE_MAX_ENTRIES` (default: 500)
    /// - `IMAGE_TTL_SECS` (default: 86400)
    /// - `PRELOAD_BATCH_SIZE` (default: 5)
    /// - `PRELOAD_BATCH_DELAY_MS` (default: 100)
    /// - `BATCH_SIZE` (default: 10)
    /// - `BATCH_MAX_CONCURRENCY` (default: 3)
    /// - `BATCH_RETRY_ATTEMPTS` (default: 2)
    /// - `BATCH_RETRY_DELAY_MS` (default: 1000)
    /// - `REMOTE_TIMEOUT_MS` (default: 15000)
    /// - `SWEEP_INTERVAL_SECS` (default: 60)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: env_or("SERVER_PORT", defaults.server_port),
            image_max_entries: env_or("IMAGE_CACHE_MAX_ENTRIES", defaults.image_max_entries),
            image_ttl_secs: env_or("IMAGE_TTL_SECS", defaults.image_ttl_secs),
            preload_batch_size: env_or("PRELOAD_BATCH_SIZE", defaults.preload_batch_size),
            preload_batch_delay_ms: env_or("PRELOAD_BATCH_DELAY_MS", defaults.preload_batch_delay_ms),
            batch_size: env_or("BATCH_SIZE", defaults.batch_size),
            batch_max_concurrency: env_or("BATCH_MAX_CONCURRENCY", defaults.batch_max_concurrency),
            batch_retry_attempts: env_or("BATCH_RETRY_ATTEMPTS", defaults.batch_retry_attempts),
            batch_retry_delay_ms: env_or("BATCH_RETRY_DELAY_MS", defaults.batch_retry_delay_ms),
            remote_timeout_ms: env_or("REMOTE_TIMEOUT_MS", defaults.remote_timeout_ms),
            sweep_interval_secs: env_or("SWEEP_INTERVAL_SECS", defaults.sweep_interval_secs),
        }
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_millis(self.remote_timeout_ms)
    }

    pub fn image_cache_config(&self) -> ImageCacheConfig {
        ImageCacheConfig {
            max_cache_size: self.image_max_entries,
            ttl: Duration::from_secs(self.image_ttl_secs),
            fetch_timeout: self.remote_timeout(),
        }
    }

    pub fn preload_config(&self) -> PreloadConfig {
        PreloadConfig {
            batch_size: self.preload_batch_size,
            batch_delay: Duration::from_millis(self.preload_batch_delay_ms),
        }
    }

    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig::new(
            self.batch_size,
            self.batch_max_concurrency,
            self.batch_retry_attempts,
            Duration::from_millis(self.batch_retry_delay_ms),
        )
    }

    /// Rejects component settings the caches and the batch processor cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.image_cache_config().validate()?;
        self.preload_config().validate()?;
        self.batch_config().validate()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            image_max_entries: 500,
            image_ttl_secs: 24 * 60 * 60,
            preload_batch_size: 5,
            preload_batch_delay_ms: 100,
            batch_size: 10,
            batch_max_concurrency: 3,
            batch_retry_attempts: 2,
            batch_retry_delay_ms: 1000,
            remote_timeout_ms: 15_000,
            sweep_interval_secs: 60,
        }
    }
}
