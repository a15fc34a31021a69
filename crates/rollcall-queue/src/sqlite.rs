//! Durable SQLite-backed task queue.
//!
//! Shares the application database pool; the `tasks` table is created by
//! the `rollcall-db` migrations. Leases are rows with a `leased_until`
//! in the future, so a crashed worker's task becomes deliverable again
//! when its lease expires, with no reaper process needed.

use crate::error::{QueueError, Result};
use crate::queue::TaskQueue;
use crate::task::{LeasedTask, Task, TaskPayload, TaskType};
use async_trait::async_trait;
use chrono::Utc;
use rollcall_core::RegionId;
use sqlx::{Pool, Row, Sqlite};
use std::time::Duration;

/// Base redelivery delay for the first failure.
const BACKOFF_BASE_SECS: u64 = 5;
/// Redelivery delay ceiling.
const BACKOFF_MAX_SECS: u64 = 300;

/// Delay before a task failed on its nth attempt is redelivered.
fn backoff_delay(attempts: u32) -> Duration {
    let exponent = attempts.saturating_sub(1).min(16);
    let secs = BACKOFF_BASE_SECS.saturating_mul(1 << exponent);
    Duration::from_secs(secs.min(BACKOFF_MAX_SECS))
}

/// Task queue persisted in the application's SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteTaskQueue {
    pool: Pool<Sqlite>,
}

impl SqliteTaskQueue {
    /// Create a queue over an existing pool.
    ///
    /// The pool must have had migrations run against it.
    #[must_use]
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskQueue for SqliteTaskQueue {
    async fn enqueue(&self, task: Task) -> Result<()> {
        let payload = serde_json::to_string(&task.payload)?;

        sqlx::query(
            "INSERT INTO tasks (id, region, task_type, payload, available_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&task.id)
        .bind(task.region.as_str())
        .bind(task.task_type.as_str())
        .bind(payload)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        tracing::debug!(region = %task.region, task_type = %task.task_type, task_id = %task.id, "task enqueued");

        Ok(())
    }

    async fn lease(&self, region: &RegionId, visibility: Duration) -> Result<Option<LeasedTask>> {
        let now = Utc::now();
        let leased_until = now + chrono::Duration::from_std(visibility).unwrap_or_default();

        let row = sqlx::query(
            "UPDATE tasks SET leased_until = ?, attempts = attempts + 1
             WHERE id = (
                 SELECT id FROM tasks
                 WHERE region = ? AND available_at <= ?
                   AND (leased_until IS NULL OR leased_until <= ?)
                 ORDER BY available_at ASC, rowid ASC LIMIT 1
             )
             RETURNING id, region, task_type, payload, attempts",
        )
        .bind(leased_until.to_rfc3339())
        .bind(region.as_str())
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let id: String = row.try_get("id").map_err(QueueError::Storage)?;
        let region_raw: String = row.try_get("region").map_err(QueueError::Storage)?;
        let type_raw: String = row.try_get("task_type").map_err(QueueError::Storage)?;
        let payload_raw: String = row.try_get("payload").map_err(QueueError::Storage)?;
        let attempts: i64 = row.try_get("attempts").map_err(QueueError::Storage)?;

        let region = RegionId::new(region_raw)
            .map_err(|e| QueueError::Storage(sqlx::Error::Decode(e.to_string().into())))?;
        let task_type = TaskType::from_str_opt(&type_raw).ok_or_else(|| {
            QueueError::Storage(sqlx::Error::Decode(
                format!("unknown task type '{type_raw}'").into(),
            ))
        })?;
        let payload: TaskPayload = serde_json::from_str(&payload_raw)?;

        Ok(Some(LeasedTask {
            task: Task {
                id,
                region,
                task_type,
                payload,
            },
            #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
            attempts: attempts as u32,
        }))
    }

    async fn ack(&self, task_id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(task_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(QueueError::NotFound {
                task_id: task_id.to_string(),
            });
        }

        Ok(())
    }

    async fn fail(&self, task_id: &str) -> Result<()> {
        let attempts: Option<i64> = sqlx::query_scalar("SELECT attempts FROM tasks WHERE id = ?")
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(attempts) = attempts else {
            return Err(QueueError::NotFound {
                task_id: task_id.to_string(),
            });
        };

        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let delay = backoff_delay(attempts.max(1) as u32);
        let available_at = Utc::now() + chrono::Duration::from_std(delay).unwrap_or_default();

        sqlx::query("UPDATE tasks SET leased_until = NULL, available_at = ? WHERE id = ?")
            .bind(available_at.to_rfc3339())
            .bind(task_id)
            .execute(&self.pool)
            .await?;

        tracing::debug!(task_id, attempts, delay_secs = delay.as_secs(), "task failed, redelivery scheduled");

        Ok(())
    }

    async fn purge(&self, region: &RegionId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM tasks WHERE region = ?")
            .bind(region.as_str())
            .execute(&self.pool)
            .await?;

        let purged = result.rows_affected();
        tracing::info!(region = %region, purged, "purged task partition");

        Ok(purged)
    }

    async fn pending_count(&self, region: &RegionId) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE region = ?")
            .bind(region.as_str())
            .fetch_one(&self.pool)
            .await?;

        #[allow(clippy::cast_sign_loss)]
        Ok(count as u64)
    }
}
