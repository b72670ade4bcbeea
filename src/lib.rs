#![deny(missing_docs)]

//! A fixed-size worker pool with drain-on-shutdown semantics.
//!
//! Workers pull items from one FIFO queue, woken by a counting signal so
//! that no wakeup posted before a worker starts waiting is lost. Dropping or
//! shutting down the pool rejects new submissions and blocks until every
//! queued item has run.

/// Sequential and pool-backed array sums used by the demo and benchmarks.
pub mod array_sum;
mod error;
/// Span timing with Chrome trace and console output.
pub mod profile;
/// The worker pool and its baseline alternative.
pub mod thread_pool;

pub use error::{PoolError, Result};
pub use thread_pool::{
    PoolConfig, RayonThreadPool, TaskHandle, ThreadPool, WorkerPool, MAX_CAPACITY,
};
