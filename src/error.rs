//! Error types for the portfolio cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for caches, the batch processor and order submission.
///
/// `Clone` is required because a failed image download is handed to every
/// caller awaiting the same shared fetch.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CacheError {
    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration rejected before any work started
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Category name with no known policy
    #[error("Unknown cache category: {0}")]
    UnknownCategory(String),

    /// Image download or blob storage failed
    #[error("Fetch failed: {0}")]
    FetchFailed(String),

    /// A remote call did not complete within the configured timeout
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Remote data capability returned an error
    #[error("Remote call failed: {0}")]
    Remote(String),

    /// The single bulk insert closing an order submission failed
    #[error("Bulk insert failed: {0}")]
    BulkInsert(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::InvalidConfig(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CacheError::UnknownCategory(_) => StatusCode::NOT_FOUND,
            CacheError::FetchFailed(_) => StatusCode::BAD_GATEWAY,
            CacheError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            CacheError::Remote(_) => StatusCode::BAD_GATEWAY,
            CacheError::BulkInsert(_) => StatusCode::BAD_GATEWAY,
            CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the crate.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        let cases = [
            (CacheError::InvalidRequest("x".into()), StatusCode::BAD_REQUEST),
            (CacheError::UnknownCategory("x".into()), StatusCode::NOT_FOUND),
            (CacheError::Timeout("x".into()), StatusCode::GATEWAY_TIMEOUT),
            (CacheError::BulkInsert("x".into()), StatusCode::BAD_GATEWAY),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn test_error_display() {
        let error = CacheError::FetchFailed("https://img/1.png".to_string());
        assert_eq!(error.to_string(), "Fetch failed: https://img/1.png");
    }
}
