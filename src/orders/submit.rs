//! Bulk Order Submission
//!
//! Turns a multi-line cart into order rows sharing one order number.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::batch::BatchProcessor;
use crate::error::{CacheError, Result};
use crate::orders::{CartLine, CatalogRef, OrderContext, OrderRow, SubmissionSummary};
use crate::remote::{with_timeout, RemoteData};

/// Table holding catalog items.
pub const ITEMS_RESOURCE: &str = "items";
/// Table holding order rows.
pub const ORDERS_RESOURCE: &str = "orders";

// == Order Submitter ==
/// Resolves each cart line through the batch processor, then commits every
/// resolved row in a single bulk insert.
///
/// Lines that fail after retries are counted, not fatal. A failing bulk insert
/// fails the whole submission; nothing from it was committed.
#[derive(Clone)]
pub struct OrderSubmitter {
    remote: Arc<dyn RemoteData>,
    processor: BatchProcessor,
    timeout: Duration,
}

impl OrderSubmitter {
    pub fn new(remote: Arc<dyn RemoteData>, processor: BatchProcessor, timeout: Duration) -> Self {
        Self {
            remote,
            processor,
            timeout,
        }
    }

    // == Submit ==
    pub async fn submit(
        &self,
        lines: Vec<CartLine>,
        context: &OrderContext,
    ) -> Result<SubmissionSummary> {
        if lines.is_empty() {
            return Ok(SubmissionSummary {
                order_number: None,
                order_count: 0,
                failed_count: 0,
            });
        }

        let order_number = generate_order_number(context.date);
        let line_count = lines.len();
        info!("Submitting order {} with {} lines", order_number, line_count);

        let resolver = ItemResolver::new(self.remote.clone(), self.timeout);
        let resolver = &resolver;
        let number = order_number.as_str();
        let outcome = self
            .processor
            .process_batches(lines, move |line: &CartLine| {
                let line = line.clone();
                async move {
                    let item_id = resolver.resolve(&line.catalog_ref).await?;
                    Ok::<_, CacheError>(OrderRow::new(number, item_id, &line, context))
                }
            })
            .await?;

        let failed_count = outcome.failed.len();
        if outcome.successful.is_empty() {
            warn!("Order {}: all {} lines failed, nothing inserted", order_number, line_count);
            return Ok(SubmissionSummary {
                order_number: None,
                order_count: 0,
                failed_count,
            });
        }

        let rows = outcome
            .successful
            .iter()
            .map(|success| serde_json::to_value(&success.result))
            .collect::<std::result::Result<Vec<Value>, _>>()
            .map_err(|e| CacheError::Internal(format!("Unserializable order row: {}", e)))?;

        let inserted = with_timeout(
            self.timeout,
            "order bulk insert",
            self.remote.insert(ORDERS_RESOURCE, rows),
        )
        .await
        .map_err(|e| CacheError::BulkInsert(e.to_string()))?;

        info!(
            "Order {}: inserted {} rows, {} lines failed",
            order_number,
            inserted.len(),
            failed_count
        );
        Ok(SubmissionSummary {
            order_number: Some(order_number),
            order_count: inserted.len(),
            failed_count,
        })
    }
}

type SharedItemId = Shared<BoxFuture<'static, Result<Value>>>;

// == Item Resolver ==
/// Runs at most one find-or-create per external id within a submission.
///
/// Lines repeating a catalog ref await the same resolution, so concurrent
/// lines never create the item twice. A failed resolution is forgotten so
/// the next attempt starts a fresh one.
struct ItemResolver {
    remote: Arc<dyn RemoteData>,
    timeout: Duration,
    resolutions: Mutex<HashMap<String, SharedItemId>>,
}

impl ItemResolver {
    fn new(remote: Arc<dyn RemoteData>, timeout: Duration) -> Self {
        Self {
            remote,
            timeout,
            resolutions: Mutex::new(HashMap::new()),
        }
    }

    async fn resolve(&self, catalog_ref: &CatalogRef) -> Result<Value> {
        let external_id = catalog_ref.external_id.as_str();
        let resolution = {
            let mut resolutions = self.resolutions.lock().await;
            match resolutions.get(external_id).cloned() {
                Some(shared) => {
                    debug!("Joining resolution of item {}", external_id);
                    shared
                }
                None => {
                    let remote = self.remote.clone();
                    let timeout = self.timeout;
                    let catalog_ref = catalog_ref.clone();
                    let shared = async move {
                        find_or_create_item(remote.as_ref(), &catalog_ref, timeout).await
                    }
                    .boxed()
                    .shared();
                    resolutions.insert(external_id.to_string(), shared.clone());
                    shared
                }
            }
        };

        let result = resolution.clone().await;
        if result.is_err() {
            let mut resolutions = self.resolutions.lock().await;
            if resolutions
                .get(external_id)
                .is_some_and(|current| current.ptr_eq(&resolution))
            {
                resolutions.remove(external_id);
            }
        }
        result
    }
}

/// Returns the id of the catalog item, creating it when absent.
async fn find_or_create_item(
    remote: &dyn RemoteData,
    catalog_ref: &CatalogRef,
    timeout: Duration,
) -> Result<Value> {
    let filter = json!({ "external_id": catalog_ref.external_id });
    let existing = with_timeout(timeout, "item lookup", remote.query(ITEMS_RESOURCE, &filter)).await?;
    if let Some(id) = existing.first().and_then(|row| row.get("id")) {
        return Ok(id.clone());
    }

    let row = json!({
        "external_id": catalog_ref.external_id,
        "name": catalog_ref.name,
    });
    let created = with_timeout(timeout, "item create", remote.insert(ITEMS_RESOURCE, vec![row])).await?;
    created
        .first()
        .and_then(|row| row.get("id"))
        .cloned()
        .ok_or_else(|| {
            CacheError::Remote(format!(
                "Created item {} came back without an id",
                catalog_ref.external_id
            ))
        })
}

/// `ORD-<yyyymmdd>-<8 hex chars>`
pub fn generate_order_number(date: NaiveDate) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("ORD-{}-{}", date.format("%Y%m%d"), &suffix[..8].to_uppercase())
}
