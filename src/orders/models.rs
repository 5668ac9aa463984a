//! Order Models
//!
//! Cart input, shared order context, and the rows written to the store.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// == Catalog Ref ==
/// Identifies a catalog item by its external (marketplace) id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogRef {
    pub external_id: String,
    /// Display name used when the item has to be created
    pub name: String,
}

// == Cart Line ==
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub catalog_ref: CatalogRef,
    pub quantity: u32,
    /// Price per unit in minor currency units (cents)
    pub unit_price_minor: i64,
}

// == Order Context ==
/// Fields shared by every row of one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderContext {
    pub date: NaiveDate,
    pub location: String,
    #[serde(default)]
    pub notes: Option<String>,
}

// == Order Row ==
/// One persisted order line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRow {
    pub order_number: String,
    pub item_id: serde_json::Value,
    pub quantity: u32,
    pub unit_price_minor: i64,
    pub total_minor: i64,
    pub order_date: NaiveDate,
    pub location: String,
    pub notes: Option<String>,
}

impl OrderRow {
    pub fn new(
        order_number: &str,
        item_id: serde_json::Value,
        line: &CartLine,
        context: &OrderContext,
    ) -> Self {
        Self {
            order_number: order_number.to_string(),
            item_id,
            quantity: line.quantity,
            unit_price_minor: line.unit_price_minor,
            total_minor: line.unit_price_minor.saturating_mul(i64::from(line.quantity)),
            order_date: context.date,
            location: context.location.clone(),
            notes: context.notes.clone(),
        }
    }
}

// == Submission Summary ==
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionSummary {
    /// Shared order number; `None` when no row was inserted
    pub order_number: Option<String>,
    /// Rows inserted
    pub order_count: usize,
    /// Cart lines that could not be turned into rows
    pub failed_count: usize,
}
