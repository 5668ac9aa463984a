//! In-memory capability implementations used by the server binary and tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{CacheError, Result};
use crate::remote::{BlobStore, LocalRef, RemoteData};

// == Memory Remote ==
/// Process-local tables with auto-assigned numeric `id` columns.
///
/// A query filter is a JSON object; a row matches when every filter field is
/// equal to the row's field of the same name.
#[derive(Debug, Default)]
pub struct MemoryRemote {
    tables: RwLock<HashMap<String, Vec<Value>>>,
    next_id: AtomicU64,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every row of `resource`.
    pub async fn rows(&self, resource: &str) -> Vec<Value> {
        self.tables
            .read()
            .await
            .get(resource)
            .cloned()
            .unwrap_or_default()
    }
}

fn matches(row: &Value, filter: &Map<String, Value>) -> bool {
    filter.iter().all(|(field, expected)| row.get(field) == Some(expected))
}

#[async_trait]
impl RemoteData for MemoryRemote {
    async fn query(&self, resource: &str, filter: &Value) -> Result<Vec<Value>> {
        let empty = Map::new();
        let filter = match filter {
            Value::Object(map) => map,
            Value::Null => &empty,
            _ => {
                return Err(CacheError::InvalidRequest(
                    "Query filter must be an object".to_string(),
                ))
            }
        };

        let tables = self.tables.read().await;
        Ok(tables
            .get(resource)
            .map(|rows| rows.iter().filter(|row| matches(row, filter)).cloned().collect())
            .unwrap_or_default())
    }

    async fn insert(&self, resource: &str, rows: Vec<Value>) -> Result<Vec<Value>> {
        let mut stored = Vec::with_capacity(rows.len());
        for row in rows {
            let Value::Object(mut fields) = row else {
                return Err(CacheError::InvalidRequest(
                    "Inserted rows must be objects".to_string(),
                ));
            };
            if !fields.contains_key("id") {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
                fields.insert("id".to_string(), Value::from(id));
            }
            stored.push(Value::Object(fields));
        }

        let mut tables = self.tables.write().await;
        tables
            .entry(resource.to_string())
            .or_default()
            .extend(stored.iter().cloned());
        debug!("Inserted {} rows into {}", stored.len(), resource);
        Ok(stored)
    }
}

// == Memory Blob Store ==
/// Keeps blob bytes in a map keyed by generated `blob://` handles.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<LocalRef, Vec<u8>>>,
    next_id: AtomicU64,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blobs currently held.
    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }

    pub async fn contains(&self, local_ref: &LocalRef) -> bool {
        self.blobs.read().await.contains_key(local_ref)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn store(&self, bytes: Vec<u8>) -> Result<LocalRef> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let local_ref = LocalRef::new(format!("blob://{}", id));
        self.blobs.write().await.insert(local_ref.clone(), bytes);
        Ok(local_ref)
    }

    async fn release(&self, local_ref: &LocalRef) {
        self.blobs.write().await.remove(local_ref);
    }
}
