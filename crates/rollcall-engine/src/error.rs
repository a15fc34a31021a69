//! Engine error types.

use thiserror::Error;

/// Errors produced by the crawl engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Database layer failure.
    #[error("database error: {0}")]
    Database(#[from] rollcall_db::DatabaseError),

    /// Direct storage failure from an entity operation.
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// Task queue failure.
    #[error("queue error: {0}")]
    Queue(#[from] rollcall_queue::QueueError),

    /// HTTP client could not be constructed.
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),

    /// A task named a region with no registered adapter.
    #[error("no adapter registered for region '{region}'")]
    NoAdapter {
        /// The unknown region code
        region: String,
    },

    /// A region is not present in the configuration.
    #[error("region '{region}' is not configured")]
    NotConfigured {
        /// The unconfigured region code
        region: String,
    },

    /// A lifecycle operation needs a cursor but no session has one.
    #[error("no resumption cursor recorded for region '{region}'")]
    NoCursor {
        /// The region missing a cursor
        region: String,
    },
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
