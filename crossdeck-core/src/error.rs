//! Error types for crossdeck-core
//!
//! Defines module-specific error types using thiserror for clear error
//! propagation.

use std::time::Duration;
use thiserror::Error;

/// Main error type for the playback-control core
#[derive(Error, Debug)]
pub enum Error {
    /// Operation rejected because the backlog bound was reached
    #[error("Queue full: backlog limit of {0} reached")]
    QueueFull(usize),

    /// Operation submitted after the queue stopped accepting work
    #[error("Queue is shut down")]
    QueueClosed,

    /// Pending operation evicted by a higher-priority submission
    #[error("Operation preempted: {tag}")]
    OperationPreempted {
        /// Tag of the evicted operation
        tag: String,
    },

    /// Operation attempted in a state that forbids it
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Asset load exceeded its adaptive deadline
    #[error("Asset load timed out after {0:?}")]
    AssetLoadTimeout(Duration),

    /// Asset load failed (decode or I/O error surfaced by the engine)
    #[error("Asset load failed: {0}")]
    AssetLoadFailed(String),

    /// Channel engine errors
    #[error("Engine error: {0}")]
    Engine(String),

    /// Configuration loading errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience Result type using the core Error
pub type Result<T> = std::result::Result<T, Error>;
