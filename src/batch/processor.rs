//! Batch Processor Module
//!
//! Runs an async unit of work over an ordered item list with bounded
//! concurrency, bounded retries and per-group progress reporting.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::batch::BackoffStrategy;
use crate::error::{CacheError, Result};

// == Batch Config ==
#[derive(Debug, Clone, PartialEq)]
pub struct BatchConfig {
    /// Items per group; progress is reported after each group
    pub batch_size: usize,
    /// Items in flight at once within a group
    pub max_concurrency: usize,
    /// Additional attempts after the first failure
    pub retry_attempts: u32,
    /// Pause before each retry
    pub backoff: BackoffStrategy,
}

impl BatchConfig {
    /// Creates a config with a fixed retry delay.
    pub fn new(
        batch_size: usize,
        max_concurrency: usize,
        retry_attempts: u32,
        retry_delay: Duration,
    ) -> Self {
        Self {
            batch_size,
            max_concurrency,
            retry_attempts,
            backoff: BackoffStrategy::Fixed(retry_delay),
        }
    }

    /// Replaces the fixed delay with another backoff strategy.
    pub fn with_backoff(mut self, backoff: BackoffStrategy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(CacheError::InvalidConfig(
                "batch_size must be greater than 0".to_string(),
            ));
        }
        if self.max_concurrency == 0 {
            return Err(CacheError::InvalidConfig(
                "max_concurrency must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self::new(10, 3, 2, Duration::from_secs(1))
    }
}

// == Progress & Outcome ==
/// Reported once per completed group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchProgress {
    /// Items settled so far, successes and failures alike
    pub processed: usize,
    pub total: usize,
    /// 0..=100, rounded down
    pub percentage: u8,
    /// 1-based index of the group just completed
    pub batch: usize,
    pub total_batches: usize,
}

/// Reported once per item that exhausted its retries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchErrorReport {
    /// Position of the item in the input list
    pub index: usize,
    pub attempts_made: u32,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult<I, R> {
    pub item: I,
    pub result: R,
    pub attempts_made: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchFailure<I, E> {
    pub item: I,
    /// Error of the last attempt
    pub error: E,
    pub attempts_made: u32,
}

/// Partition of the input. Both lists keep input order.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome<I, R, E> {
    pub successful: Vec<BatchResult<I, R>>,
    pub failed: Vec<BatchFailure<I, E>>,
}

impl<I, R, E> BatchOutcome<I, R, E> {
    fn with_capacity(total: usize) -> Self {
        Self {
            successful: Vec::with_capacity(total),
            failed: Vec::new(),
        }
    }

    pub fn total(&self) -> usize {
        self.successful.len() + self.failed.len()
    }
}

type ProgressCallback = Arc<dyn Fn(&BatchProgress) + Send + Sync>;
type ErrorCallback = Arc<dyn Fn(&BatchErrorReport) + Send + Sync>;

type Attempt<R, E> = std::result::Result<(R, u32), (E, u32)>;

// == Batch Processor ==
/// Stateless executor; every `process_batches` call is independent.
///
/// Groups run strictly one after another, so at most `max_concurrency` units
/// of work are ever active. A failing item never aborts its siblings.
#[derive(Clone)]
pub struct BatchProcessor {
    config: BatchConfig,
    on_progress: Option<ProgressCallback>,
    on_error: Option<ErrorCallback>,
}

impl BatchProcessor {
    pub fn new(config: BatchConfig) -> Self {
        Self {
            config,
            on_progress: None,
            on_error: None,
        }
    }

    /// Registers a callback invoked after each group.
    pub fn on_progress(mut self, callback: impl Fn(&BatchProgress) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    /// Registers a callback invoked for each item that finally failed.
    pub fn on_error(mut self, callback: impl Fn(&BatchErrorReport) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(callback));
        self
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    // == Process Batches ==
    /// Applies `work` to every item and partitions the outcomes.
    ///
    /// Only an invalid configuration is returned as `Err`; item failures are
    /// collected in [`BatchOutcome::failed`].
    pub async fn process_batches<I, R, E, F, Fut>(
        &self,
        items: Vec<I>,
        work: F,
    ) -> Result<BatchOutcome<I, R, E>>
    where
        F: Fn(&I) -> Fut,
        Fut: Future<Output = std::result::Result<R, E>>,
        E: Display,
    {
        self.config.validate()?;

        let total = items.len();
        let batch_size = self.config.batch_size;
        let total_batches = total.div_ceil(batch_size);
        let mut outcome = BatchOutcome::with_capacity(total);
        let mut processed = 0usize;
        let mut pending = items.into_iter().enumerate();
        let work = &work;

        for batch in 1..=total_batches {
            let group: Vec<(usize, I)> = pending.by_ref().take(batch_size).collect();
            let group_len = group.len();

            let mut settled: Vec<(usize, I, Attempt<R, E>)> = stream::iter(group)
                .map(move |(index, item)| async move {
                    let attempt = self.run_with_retry(&item, work).await;
                    (index, item, attempt)
                })
                .buffer_unordered(self.config.max_concurrency)
                .collect()
                .await;
            settled.sort_by_key(|(index, _, _)| *index);

            for (index, item, attempt) in settled {
                match attempt {
                    Ok((result, attempts_made)) => outcome.successful.push(BatchResult {
                        item,
                        result,
                        attempts_made,
                    }),
                    Err((error, attempts_made)) => {
                        warn!(
                            "Item {} failed after {} attempts: {}",
                            index, attempts_made, error
                        );
                        if let Some(on_error) = &self.on_error {
                            on_error(&BatchErrorReport {
                                index,
                                attempts_made,
                                error: error.to_string(),
                            });
                        }
                        outcome.failed.push(BatchFailure {
                            item,
                            error,
                            attempts_made,
                        });
                    }
                }
            }

            processed += group_len;
            let progress = BatchProgress {
                processed,
                total,
                percentage: (processed * 100 / total) as u8,
                batch,
                total_batches,
            };
            debug!(
                "Batch {}/{} complete ({}/{} items)",
                batch, total_batches, processed, total
            );
            if let Some(on_progress) = &self.on_progress {
                on_progress(&progress);
            }
        }

        info!(
            "Processed {} items: {} succeeded, {} failed",
            total,
            outcome.successful.len(),
            outcome.failed.len()
        );
        Ok(outcome)
    }

    async fn run_with_retry<I, R, E, F, Fut>(&self, item: &I, work: &F) -> Attempt<R, E>
    where
        F: Fn(&I) -> Fut,
        Fut: Future<Output = std::result::Result<R, E>>,
        E: Display,
    {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match work(item).await {
                Ok(result) => return Ok((result, attempts)),
                Err(error) if attempts > self.config.retry_attempts => {
                    return Err((error, attempts))
                }
                Err(error) => {
                    let delay = self.config.backoff.delay_for(attempts);
                    debug!(
                        "Attempt {} failed: {}; retrying in {:?}",
                        attempts, error, delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
