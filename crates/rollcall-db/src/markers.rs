//! Scraped-record markers.
//!
//! Markers make disambiguation fan-out idempotent within one session: a
//! record id with a marker newer than the open session's start has
//! already been enqueued this session and is skipped. Markers from
//! earlier sessions never block, so every new session re-scrapes the
//! full roster.

use crate::parse_utc;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Sqlite};

/// Record that a record id has been claimed for scraping.
///
/// Re-marking an id refreshes its `created_on`, claiming it for the
/// current session.
///
/// # Errors
/// Returns `sqlx::Error` if the write fails.
pub async fn mark_record_scraped(
    pool: &Pool<Sqlite>,
    region: &str,
    record_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO scraped_records (region, record_id, created_on) VALUES (?, ?, ?)
         ON CONFLICT(region, record_id) DO UPDATE SET created_on = excluded.created_on",
    )
    .bind(region)
    .bind(record_id)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Check whether a record id was marked at or after the given instant.
///
/// Callers pass the open session's `start_time`, so stale markers from
/// closed sessions read as unmarked.
///
/// # Errors
/// Returns `sqlx::Error` if the query fails.
pub async fn was_record_scraped_since(
    pool: &Pool<Sqlite>,
    region: &str,
    record_id: &str,
    since: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let created_on: Option<String> = sqlx::query_scalar(
        "SELECT created_on FROM scraped_records WHERE region = ? AND record_id = ?",
    )
    .bind(region)
    .bind(record_id)
    .fetch_optional(pool)
    .await?;

    match created_on {
        Some(raw) => Ok(parse_utc(&raw)? >= since),
        None => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use chrono::Duration;

    async fn setup_test_db() -> Database {
        let db = Database::in_memory().await.expect("create database");
        db.run_migrations().await.expect("run migrations");
        db
    }

    #[tokio::test]
    async fn test_unmarked_record_reads_unscraped() {
        let db = setup_test_db().await;

        let scraped = was_record_scraped_since(db.pool(), "us_ny", "1234567a", Utc::now())
            .await
            .expect("query");
        assert!(!scraped);
    }

    #[tokio::test]
    async fn test_marker_blocks_within_session() {
        let db = setup_test_db().await;
        let session_start = Utc::now() - Duration::seconds(5);

        mark_record_scraped(db.pool(), "us_ny", "1234567a")
            .await
            .expect("mark");

        let scraped = was_record_scraped_since(db.pool(), "us_ny", "1234567a", session_start)
            .await
            .expect("query");
        assert!(scraped);
    }

    #[tokio::test]
    async fn test_stale_marker_does_not_block() {
        let db = setup_test_db().await;

        mark_record_scraped(db.pool(), "us_ny", "1234567a")
            .await
            .expect("mark");

        // A session opened after the marker was written
        let later_session_start = Utc::now() + Duration::seconds(5);
        let scraped =
            was_record_scraped_since(db.pool(), "us_ny", "1234567a", later_session_start)
                .await
                .expect("query");
        assert!(!scraped);
    }

    #[tokio::test]
    async fn test_remarking_refreshes_claim() {
        let db = setup_test_db().await;

        mark_record_scraped(db.pool(), "us_ny", "1234567a")
            .await
            .expect("first mark");
        mark_record_scraped(db.pool(), "us_ny", "1234567a")
            .await
            .expect("re-mark");

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM scraped_records")
            .fetch_one(db.pool())
            .await
            .expect("count");
        assert_eq!(count, 1);
    }
}
