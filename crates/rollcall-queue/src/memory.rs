//! In-memory task queue for tests.
//!
//! Same contract as the SQLite queue, minus durability. Backoff on
//! failure is kept so timing-sensitive engine tests see realistic
//! redelivery behavior; tests that want instant redelivery can construct
//! the queue with a zero backoff.

use crate::error::{QueueError, Result};
use crate::queue::TaskQueue;
use crate::task::{LeasedTask, Task};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rollcall_core::RegionId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
struct QueuedTask {
    task: Task,
    /// Insertion order, the tie-break when tasks are equally available.
    seq: u64,
    attempts: u32,
    available_at: DateTime<Utc>,
    leased_until: Option<DateTime<Utc>>,
}

/// Non-durable queue with the same delivery semantics as the SQLite one.
#[derive(Debug, Clone)]
pub struct MemoryTaskQueue {
    tasks: Arc<Mutex<HashMap<String, QueuedTask>>>,
    next_seq: Arc<AtomicU64>,
    backoff: Duration,
}

impl MemoryTaskQueue {
    /// Create a queue with a 5 second per-failure backoff.
    #[must_use]
    pub fn new() -> Self {
        Self::with_backoff(Duration::from_secs(5))
    }

    /// Create a queue with a fixed per-failure backoff.
    #[must_use]
    pub fn with_backoff(backoff: Duration) -> Self {
        Self {
            tasks: Arc::new(Mutex::new(HashMap::new())),
            next_seq: Arc::new(AtomicU64::new(0)),
            backoff,
        }
    }

    /// Snapshot the tasks currently held for a region, for assertions.
    #[must_use]
    pub fn tasks_for_region(&self, region: &RegionId) -> Vec<Task> {
        let tasks = self.tasks.lock().expect("acquire queue lock");
        let mut held: Vec<(u64, Task)> = tasks
            .values()
            .filter(|qt| qt.task.region == *region)
            .map(|qt| (qt.seq, qt.task.clone()))
            .collect();
        held.sort_by_key(|(seq, _)| *seq);
        held.into_iter().map(|(_, task)| task).collect()
    }
}

impl Default for MemoryTaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskQueue for MemoryTaskQueue {
    async fn enqueue(&self, task: Task) -> Result<()> {
        let mut tasks = self.tasks.lock().expect("acquire queue lock");
        tasks.insert(
            task.id.clone(),
            QueuedTask {
                task,
                seq: self.next_seq.fetch_add(1, Ordering::SeqCst),
                attempts: 0,
                available_at: Utc::now(),
                leased_until: None,
            },
        );
        Ok(())
    }

    async fn lease(&self, region: &RegionId, visibility: Duration) -> Result<Option<LeasedTask>> {
        let now = Utc::now();
        let mut tasks = self.tasks.lock().expect("acquire queue lock");

        let next_id = tasks
            .values()
            .filter(|qt| {
                qt.task.region == *region
                    && qt.available_at <= now
                    && qt.leased_until.map_or(true, |until| until <= now)
            })
            .min_by(|a, b| {
                a.available_at
                    .cmp(&b.available_at)
                    .then_with(|| a.seq.cmp(&b.seq))
            })
            .map(|qt| qt.task.id.clone());

        let Some(id) = next_id else {
            return Ok(None);
        };

        let entry = tasks.get_mut(&id).expect("selected task present");
        entry.attempts += 1;
        entry.leased_until = Some(now + chrono::Duration::from_std(visibility).unwrap_or_default());

        Ok(Some(LeasedTask {
            task: entry.task.clone(),
            attempts: entry.attempts,
        }))
    }

    async fn ack(&self, task_id: &str) -> Result<()> {
        let mut tasks = self.tasks.lock().expect("acquire queue lock");
        tasks.remove(task_id).ok_or_else(|| QueueError::NotFound {
            task_id: task_id.to_string(),
        })?;
        Ok(())
    }

    async fn fail(&self, task_id: &str) -> Result<()> {
        let mut tasks = self.tasks.lock().expect("acquire queue lock");
        let entry = tasks.get_mut(task_id).ok_or_else(|| QueueError::NotFound {
            task_id: task_id.to_string(),
        })?;
        entry.leased_until = None;
        entry.available_at = Utc::now() + chrono::Duration::from_std(self.backoff).unwrap_or_default();
        Ok(())
    }

    async fn purge(&self, region: &RegionId) -> Result<u64> {
        let mut tasks = self.tasks.lock().expect("acquire queue lock");
        let before = tasks.len();
        tasks.retain(|_, qt| qt.task.region != *region);
        Ok((before - tasks.len()) as u64)
    }

    async fn pending_count(&self, region: &RegionId) -> Result<u64> {
        let tasks = self.tasks.lock().expect("acquire queue lock");
        Ok(tasks
            .values()
            .filter(|qt| qt.task.region == *region)
            .count() as u64)
    }
}
