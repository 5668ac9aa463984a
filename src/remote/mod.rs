//! Remote Capabilities Module
//!
//! Interfaces to the externally owned data store and blob store, plus the
//! timeout wrapper applied to every call that crosses them.

mod memory;

use std::fmt;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CacheError, Result};

pub use memory::{MemoryBlobStore, MemoryRemote};

// == Remote Data ==
/// Query/insert access to the relational store.
///
/// Rows are passed through as JSON; the core never interprets their shape
/// beyond the fields it writes itself.
#[async_trait]
pub trait RemoteData: Send + Sync + 'static {
    /// Returns rows of `resource` matching `filter`.
    async fn query(&self, resource: &str, filter: &Value) -> Result<Vec<Value>>;

    /// Inserts `rows` into `resource` and returns them as stored.
    async fn insert(&self, resource: &str, rows: Vec<Value>) -> Result<Vec<Value>>;
}

// == Local Ref ==
/// Opaque handle to a locally persisted blob.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalRef(String);

impl LocalRef {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocalRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// == Blob Store ==
/// Platform storage for downloaded image bytes.
#[async_trait]
pub trait BlobStore: Send + Sync + 'static {
    async fn store(&self, bytes: Vec<u8>) -> Result<LocalRef>;

    /// Frees a handle. Releasing an unknown handle is not an error.
    async fn release(&self, local_ref: &LocalRef);
}

// == Timeout ==
/// Runs `future`, failing with [`CacheError::Timeout`] once `limit` elapses.
pub async fn with_timeout<T, F>(limit: Duration, what: &str, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, future).await {
        Ok(result) => result,
        Err(_) => Err(CacheError::Timeout(format!(
            "{} exceeded {} ms",
            what,
            limit.as_millis()
        ))),
    }
}
