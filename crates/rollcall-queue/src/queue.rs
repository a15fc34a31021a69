//! The task queue contract.

use crate::error::Result;
use crate::task::{LeasedTask, Task};
use async_trait::async_trait;
use rollcall_core::RegionId;
use std::time::Duration;

/// At-least-once task delivery, partitioned by region.
///
/// A leased task is invisible to other workers until its visibility
/// timeout passes; workers must `ack` on success or `fail` to schedule
/// redelivery. Re-delivery delay (backoff) is the queue's business, not
/// the caller's. No ordering is guaranteed across task types.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Add a task to its region's partition.
    async fn enqueue(&self, task: Task) -> Result<()>;

    /// Lease the next deliverable task in a region, if any.
    ///
    /// The task stays invisible to other `lease` calls for `visibility`;
    /// if neither `ack` nor `fail` arrives in time it becomes
    /// deliverable again.
    async fn lease(&self, region: &RegionId, visibility: Duration) -> Result<Option<LeasedTask>>;

    /// Acknowledge a task as done, removing it permanently.
    async fn ack(&self, task_id: &str) -> Result<()>;

    /// Report a task as failed, scheduling redelivery after a backoff
    /// delay that grows with the attempt count.
    async fn fail(&self, task_id: &str) -> Result<()>;

    /// Drop every task in a region's partition, leased or not.
    ///
    /// Returns the number of tasks dropped. Other regions are untouched.
    async fn purge(&self, region: &RegionId) -> Result<u64>;

    /// Count tasks in a region's partition, including leased ones.
    async fn pending_count(&self, region: &RegionId) -> Result<u64>;
}
