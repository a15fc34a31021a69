//! Session lifecycle operations: start, resume, stop, status.
//!
//! Every path that opens a session purges the region's queue partition
//! first and awaits the purge before enqueueing anything, so a new crawl
//! never races leftover tasks from the previous one.

use crate::error::{EngineError, Result};
use crate::machine::CrawlStateMachine;
use rollcall_core::{NameQuery, RegionId};
use rollcall_db::{sessions, ScrapeSession};
use std::time::Duration;

/// Attempts stop() makes at draining the queue.
const STOP_ATTEMPTS: u32 = 3;
/// Pause between stop attempts, long enough for in-flight handlers to
/// finish enqueueing into the partition being drained.
const STOP_PAUSE: Duration = Duration::from_secs(1);

/// Point-in-time view of a region's crawl, for operators.
#[derive(Debug, Clone)]
pub struct RegionStatus {
    /// The region reported on
    pub region: RegionId,
    /// The open session, if a crawl is in progress
    pub session: Option<ScrapeSession>,
    /// Tasks currently held in the region's queue partition
    pub pending_tasks: u64,
}

impl CrawlStateMachine {
    /// Close any open session, purge the region's partition, and open a
    /// fresh session.
    ///
    /// The close is best-effort: a failure is logged and the new crawl
    /// proceeds anyway, since stale open sessions only affect reporting.
    pub async fn setup(&self, region: &RegionId) -> Result<ScrapeSession> {
        let pool = self.db().pool();

        if let Err(err) = sessions::close_open_sessions(pool, region.as_str()).await {
            tracing::warn!(region = %region, error = %err, "failed to close previous sessions");
        }

        self.queue().purge(region).await?;

        let session = sessions::open_session(pool, region.as_str()).await?;
        tracing::info!(region = %region, session_id = %session.id, "session opened");

        Ok(session)
    }

    /// Start a fresh crawl from the region's configured seed query.
    pub async fn start(&self, region: &RegionId) -> Result<()> {
        let config = self.region_config(region)?;
        if !config.enabled {
            tracing::warn!(region = %region, "region is disabled in configuration");
            return Err(EngineError::NotConfigured {
                region: region.to_string(),
            });
        }
        let seed = config.seed_query.clone();

        self.setup(region).await?;
        self.submit_search(region, &NameQuery::from_cursor(&seed))
            .await
    }

    /// Resume a crawl from the most recent recorded cursor.
    pub async fn resume(&self, region: &RegionId) -> Result<()> {
        let pool = self.db().pool();

        let cursor = match sessions::get_open_session(pool, region.as_str())
            .await?
            .and_then(|s| s.last_scraped)
        {
            Some(cursor) => Some(cursor),
            None => sessions::most_recent_cursor(pool, region.as_str()).await?,
        };

        let Some(cursor) = cursor else {
            return Err(EngineError::NoCursor {
                region: region.to_string(),
            });
        };

        self.resume_from_cursor(region, &cursor).await
    }

    /// Open a new session seeded from a cursor and re-submit the search.
    ///
    /// The purge inside `setup` has completed before the search task is
    /// enqueued, so the fresh crawl cannot collide with stale tasks.
    pub(crate) async fn resume_from_cursor(&self, region: &RegionId, cursor: &str) -> Result<()> {
        let session = self.setup(region).await?;
        sessions::update_cursor(self.db().pool(), &session.id, cursor).await?;

        tracing::info!(region = %region, cursor, "resuming crawl from cursor");

        self.submit_search(region, &NameQuery::from_cursor(cursor))
            .await
    }

    /// Stop a crawl: close the session and drain the queue partition.
    ///
    /// In-flight handlers can re-enqueue into a just-purged partition
    /// (their session check races the close), so close+purge runs a few
    /// bounded rounds with a pause between them. Returns the total
    /// number of tasks purged.
    pub async fn stop(&self, region: &RegionId) -> Result<u64> {
        let pool = self.db().pool();
        let mut purged_total = 0;

        for attempt in 1..=STOP_ATTEMPTS {
            sessions::close_open_sessions(pool, region.as_str()).await?;
            purged_total += self.queue().purge(region).await?;

            if attempt < STOP_ATTEMPTS {
                tokio::time::sleep(STOP_PAUSE).await;
            }
        }

        tracing::info!(region = %region, purged = purged_total, "crawl stopped");

        Ok(purged_total)
    }

    /// Report the current crawl state of a region.
    pub async fn status(&self, region: &RegionId) -> Result<RegionStatus> {
        let session = sessions::get_open_session(self.db().pool(), region.as_str()).await?;
        let pending_tasks = self.queue().pending_count(region).await?;

        Ok(RegionStatus {
            region: region.clone(),
            session,
            pending_tasks,
        })
    }
}
