//! Response DTOs for the admin API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

/// Response body for cache clearing endpoints
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    /// Success message
    pub message: String,
    /// Number of entries removed
    pub removed: usize,
}

impl ClearResponse {
    /// Creates a new ClearResponse
    pub fn new(target: impl AsRef<str>, removed: usize) -> Self {
        Self {
            message: format!("{} cleared", target.as_ref()),
            removed,
        }
    }
}

/// Response body for POST /preload
#[derive(Debug, Clone, Serialize)]
pub struct PreloadResponse {
    /// Images added to the queue
    pub queued: usize,
    /// Images already queued or in flight
    pub skipped: usize,
    /// Whether this request started the worker
    pub started: bool,
}

/// Response body for GET /query/:category/:resource
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub category: String,
    pub resource: String,
    pub count: usize,
    pub rows: Vec<Value>,
}

impl QueryResponse {
    pub fn new(category: impl Into<String>, resource: impl Into<String>, rows: Vec<Value>) -> Self {
        Self {
            category: category.into(),
            resource: resource.into(),
            count: rows.len(),
            rows,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
