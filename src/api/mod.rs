//! API Module
//!
//! HTTP handlers and routing for the cache administration REST API.
//!
//! # Endpoints
//! - `GET /health` - Health check endpoint
//! - `GET /stats` - Response cache statistics
//! - `GET /policies` - TTL policy table
//! - `DELETE /cache`, `DELETE /cache/:category` - Clear cached responses
//! - `GET /query/:category/:resource` - Cached remote query
//! - `GET /images/stats`, `DELETE /images`, `DELETE /images/:variant` - Image cache
//! - `GET /preload/stats`, `POST /preload`, `DELETE /preload` - Preload queue
//! - `POST /orders` - Bulk order submission

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
