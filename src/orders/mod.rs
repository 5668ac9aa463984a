//! Orders Module
//!
//! Bulk submission of multi-line carts on top of the batch processor.

mod models;
mod submit;

pub use models::{CartLine, CatalogRef, OrderContext, OrderRow, SubmissionSummary};
pub use submit::{generate_order_number, OrderSubmitter, ITEMS_RESOURCE, ORDERS_RESOURCE};
