//! Tokio worker pool driving the task queue.
//!
//! Workers loop lease → handle → ack/fail, sleeping briefly when their
//! partition is empty. Shutdown is cooperative: a flagged worker exits
//! at its next loop check, never mid-task.

use crate::machine::{CrawlStateMachine, Disposition};
use rollcall_core::RegionId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// How long an idle worker waits before polling again.
const IDLE_POLL: Duration = Duration::from_secs(1);

/// Runs crawl workers for one or more regions.
pub struct WorkerPool {
    machine: Arc<CrawlStateMachine>,
    shutdown: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Create an empty pool over a shared state machine.
    #[must_use]
    pub fn new(machine: Arc<CrawlStateMachine>) -> Self {
        Self {
            machine,
            shutdown: Arc::new(AtomicBool::new(false)),
            handles: Vec::new(),
        }
    }

    /// Spawn `workers` tasks leasing from one region's partition.
    pub fn spawn_region(&mut self, region: &RegionId, workers: u32, lease: Duration) {
        for index in 0..workers {
            let machine = self.machine.clone();
            let shutdown = self.shutdown.clone();
            let region = region.clone();

            self.handles.push(tokio::spawn(async move {
                worker_loop(&machine, &region, &shutdown, lease, index).await;
            }));
        }

        tracing::info!(region = %region, workers, "workers spawned");
    }

    /// Flag every worker to exit after its current task.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Wait for all workers to exit.
    pub async fn join(self) {
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

async fn worker_loop(
    machine: &CrawlStateMachine,
    region: &RegionId,
    shutdown: &AtomicBool,
    lease: Duration,
    index: u32,
) {
    tracing::debug!(region = %region, worker = index, "worker started");

    while !shutdown.load(Ordering::Relaxed) {
        let leased = match machine.queue().lease(region, lease).await {
            Ok(leased) => leased,
            Err(err) => {
                tracing::error!(region = %region, worker = index, error = %err, "lease failed");
                tokio::time::sleep(IDLE_POLL).await;
                continue;
            }
        };

        let Some(leased) = leased else {
            tokio::time::sleep(IDLE_POLL).await;
            continue;
        };

        let task_id = leased.task.id.clone();
        let outcome = machine.handle_task(&leased.task).await;

        let finish = match outcome {
            Ok(Disposition::Complete) => machine.queue().ack(&task_id).await,
            Ok(Disposition::Retry) => machine.queue().fail(&task_id).await,
            Err(err) => {
                tracing::error!(
                    region = %region,
                    worker = index,
                    task_id = %task_id,
                    error = %err,
                    "task handler failed"
                );
                machine.queue().fail(&task_id).await
            }
        };

        // A purge may have raced the handler and removed the task;
        // nothing to ack or fail then.
        if let Err(err) = finish {
            tracing::debug!(region = %region, task_id = %task_id, error = %err, "task already gone");
        }
    }

    tracing::debug!(region = %region, worker = index, "worker exiting");
}
