//! Portfolio Cache - caching and bulk-write layer for a collectibles portfolio
//!
//! Provides a TTL-policy response cache, a coalescing image cache with a
//! throttled preload queue, and bounded-concurrency bulk order submission.

pub mod api;
pub mod batch;
pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod images;
pub mod models;
pub mod orders;
pub mod remote;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use context::CacheContext;
pub use error::{CacheError, Result};
pub use tasks::spawn_sweep_task;
