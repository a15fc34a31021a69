//! Durable, region-partitioned task queue.
//!
//! Every crawl step is a queued task; handlers enqueue their successor
//! rather than looping in-process, so crawl progress survives worker
//! crashes and restarts. Delivery is at-least-once: handlers are written
//! to be idempotent and the queue redelivers anything neither acked nor
//! failed before its lease expires.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod error;
pub mod memory;
pub mod queue;
pub mod sqlite;
pub mod task;

pub use error::{QueueError, Result};
pub use memory::MemoryTaskQueue;
pub use queue::TaskQueue;
pub use sqlite::SqliteTaskQueue;
pub use task::{LeasedTask, Task, TaskPayload, TaskType};
