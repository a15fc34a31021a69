//! Queue error types.

use thiserror::Error;

/// Errors produced by task queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Underlying storage failed.
    #[error("queue storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// Task payload could not be serialized or deserialized.
    #[error("payload serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An ack/fail referenced a task id the queue does not hold.
    #[error("task '{task_id}' not found")]
    NotFound {
        /// The unknown task id
        task_id: String,
    },
}

/// Result type alias for queue operations.
pub type Result<T> = std::result::Result<T, QueueError>;
