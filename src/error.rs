use std::io;
use thiserror::Error;

/// Error type for worker pool operations.
#[derive(Error, Debug)]
pub enum PoolError {
    /// The requested number of workers exceeds what the pool supports.
    #[error("Invalid capacity {requested}: at most {max} workers are supported")]
    InvalidCapacity {
        /// Capacity asked for by the caller.
        requested: usize,
        /// Upper bound enforced by the pool.
        max: usize,
    },

    /// Any other invalid pool configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The pool has begun shutting down and accepts no more work.
    #[error("Worker pool is stopped")]
    PoolStopped,

    /// The bounded queue is at its limit.
    #[error("Task queue is full ({limit} pending)")]
    QueueFull {
        /// Configured queue limit.
        limit: usize,
    },

    /// A work item or its completion callback panicked.
    #[error("Task panicked: {0}")]
    TaskPanicked(String),

    /// Waiting on a task handle timed out.
    #[error("Timed out waiting for task")]
    Timeout,

    /// A task's result channel closed before a result was sent.
    #[error("Task result channel disconnected")]
    Disconnected,

    /// IO error from spawning threads or writing trace files.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Serialization error while writing trace files.
    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Result type alias for worker pool operations.
pub type Result<T> = std::result::Result<T, PoolError>;
