//! Backoff Module
//!
//! Delay policies applied between attempts of a failed unit of work.

use std::time::Duration;

use rand::Rng;

// == Backoff Strategy ==
/// Computes the pause before the next attempt.
///
/// `retry` is 1 for the pause after the first failure, 2 after the second,
/// and so on.
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffStrategy {
    /// Same delay before every retry
    Fixed(Duration),
    /// `initial + increment * (retry - 1)`
    Linear { initial: Duration, increment: Duration },
    /// `initial * base^(retry - 1)` capped at `max`, optionally with full jitter
    Exponential {
        initial: Duration,
        base: f64,
        max: Duration,
        jitter: bool,
    },
}

impl BackoffStrategy {
    pub fn delay_for(&self, retry: u32) -> Duration {
        let step = retry.saturating_sub(1);
        match self {
            BackoffStrategy::Fixed(delay) => *delay,
            BackoffStrategy::Linear { initial, increment } => {
                initial.saturating_add(increment.saturating_mul(step))
            }
            BackoffStrategy::Exponential {
                initial,
                base,
                max,
                jitter,
            } => {
                let scaled = initial.as_millis() as f64 * base.powi(step.min(i32::MAX as u32) as i32);
                let capped_ms = scaled.min(max.as_millis() as f64).max(0.0) as u64;
                if *jitter && capped_ms > 0 {
                    Duration::from_millis(rand::thread_rng().gen_range(0..=capped_ms))
                } else {
                    Duration::from_millis(capped_ms)
                }
            }
        }
    }
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        BackoffStrategy::Fixed(Duration::from_secs(1))
    }
}
