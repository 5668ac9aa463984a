//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Expiry sweep: drops stale API responses and image entries at a fixed interval

mod sweep;

pub use sweep::spawn_sweep_task;
