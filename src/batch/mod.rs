//! Batch Module
//!
//! Bounded-concurrency, bounded-retry executor with progress reporting.

mod backoff;
mod processor;


pub use backoff::BackoffStrategy;
pub use processor::{
    BatchConfig, BatchErrorReport, BatchFailure, BatchOutcome, BatchProcessor, BatchProgress,
    BatchResult,
};
