//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to data or generation service:
//!     → timeouts.rs (enforce per-attempt deadline)
//!     → On transient failure: retries.rs (bounded retry with backoff.rs delays)
//!     → On fatal failure or exhausted attempts: RetryFailure with the last error
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every upstream call has a deadline
//! - Only transient failures (timeout, connect, 5xx) are retried
//! - 4xx and not-found are surfaced on the first attempt

pub mod backoff;
pub mod retries;
pub mod timeouts;

pub use retries::{RetryFailure, RetryPolicy};
