//! Scrape session operations.
//!
//! A session is one crawl attempt over a region's roster. Open sessions
//! have no `end_time`; the engine keeps at most one open per region by
//! convention. `last_scraped` is the resumption cursor ("Surname, Given"),
//! updated as results pages are consumed.

use crate::parse_utc;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Row, Sqlite};

/// One crawl attempt over a region.
#[derive(Debug, Clone)]
pub struct ScrapeSession {
    /// Unique session identifier
    pub id: String,
    /// Region this session crawls
    pub region: String,
    /// When the session was opened
    pub start_time: DateTime<Utc>,
    /// When the session was closed, if it has been
    pub end_time: Option<DateTime<Utc>>,
    /// Resumption cursor: the last name the crawl is known to have reached
    pub last_scraped: Option<String>,
}

impl ScrapeSession {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        let start_time: String = row.try_get("start_time")?;
        let end_time: Option<String> = row.try_get("end_time")?;
        Ok(Self {
            id: row.try_get("id")?,
            region: row.try_get("region")?,
            start_time: parse_utc(&start_time)?,
            end_time: end_time.as_deref().map(parse_utc).transpose()?,
            last_scraped: row.try_get("last_scraped")?,
        })
    }
}

/// Open a new session for a region.
///
/// # Errors
/// Returns `sqlx::Error` if the insert fails.
pub async fn open_session(pool: &Pool<Sqlite>, region: &str) -> Result<ScrapeSession, sqlx::Error> {
    let id = uuid::Uuid::new_v4().to_string();
    let start_time = Utc::now();

    sqlx::query("INSERT INTO scrape_sessions (id, region, start_time) VALUES (?, ?, ?)")
        .bind(&id)
        .bind(region)
        .bind(start_time.to_rfc3339())
        .execute(pool)
        .await?;

    tracing::debug!(region, session_id = %id, "opened scrape session");

    Ok(ScrapeSession {
        id,
        region: region.to_string(),
        start_time,
        end_time: None,
        last_scraped: None,
    })
}

/// Get the open session for a region, if one exists.
///
/// With multiple open sessions (a convention violation), the most recent
/// is returned.
///
/// # Errors
/// Returns `sqlx::Error` if the query fails.
pub async fn get_open_session(
    pool: &Pool<Sqlite>,
    region: &str,
) -> Result<Option<ScrapeSession>, sqlx::Error> {
    let row = sqlx::query(
        "SELECT id, region, start_time, end_time, last_scraped FROM scrape_sessions
         WHERE region = ? AND end_time IS NULL ORDER BY start_time DESC LIMIT 1",
    )
    .bind(region)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(ScrapeSession::from_row).transpose()
}

/// Close every open session for a region.
///
/// Returns the number of sessions closed.
///
/// # Errors
/// Returns `sqlx::Error` if the update fails.
pub async fn close_open_sessions(pool: &Pool<Sqlite>, region: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE scrape_sessions SET end_time = ? WHERE region = ? AND end_time IS NULL",
    )
    .bind(Utc::now().to_rfc3339())
    .bind(region)
    .execute(pool)
    .await?;

    let closed = result.rows_affected();
    if closed > 0 {
        tracing::debug!(region, closed, "closed open sessions");
    }

    Ok(closed)
}

/// Record the resumption cursor on a session.
///
/// # Errors
/// Returns `sqlx::Error` if the update fails.
pub async fn update_cursor(
    pool: &Pool<Sqlite>,
    session_id: &str,
    cursor: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE scrape_sessions SET last_scraped = ? WHERE id = ?")
        .bind(cursor)
        .bind(session_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Get the most recently opened session for a region, open or closed.
///
/// # Errors
/// Returns `sqlx::Error` if the query fails.
pub async fn most_recent_session(
    pool: &Pool<Sqlite>,
    region: &str,
) -> Result<Option<ScrapeSession>, sqlx::Error> {
    let row = sqlx::query(
        "SELECT id, region, start_time, end_time, last_scraped FROM scrape_sessions
         WHERE region = ? ORDER BY start_time DESC LIMIT 1",
    )
    .bind(region)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(ScrapeSession::from_row).transpose()
}

/// Get the most recently recorded cursor for a region.
///
/// Open sessions are preferred, but closed sessions are scanned too:
/// after a stop or a crash the only usable cursor may be on an already
/// closed session.
///
/// # Errors
/// Returns `sqlx::Error` if the query fails.
pub async fn most_recent_cursor(
    pool: &Pool<Sqlite>,
    region: &str,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT last_scraped FROM scrape_sessions
         WHERE region = ? AND last_scraped IS NOT NULL
         ORDER BY start_time DESC LIMIT 1",
    )
    .bind(region)
    .fetch_optional(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    async fn setup_test_db() -> Database {
        let db = Database::in_memory().await.expect("create database");
        db.run_migrations().await.expect("run migrations");
        db
    }

    #[tokio::test]
    async fn test_open_and_get_session() {
        let db = setup_test_db().await;

        let session = open_session(db.pool(), "us_ny").await.expect("open");
        let fetched = get_open_session(db.pool(), "us_ny")
            .await
            .expect("query")
            .expect("open session exists");

        assert_eq!(fetched.id, session.id);
        assert!(fetched.end_time.is_none());
        assert!(fetched.last_scraped.is_none());
    }

    #[tokio::test]
    async fn test_open_session_is_region_scoped() {
        let db = setup_test_db().await;

        open_session(db.pool(), "us_ny").await.expect("open");

        let other = get_open_session(db.pool(), "us_fl").await.expect("query");
        assert!(other.is_none());
    }

    #[tokio::test]
    async fn test_close_open_sessions() {
        let db = setup_test_db().await;

        open_session(db.pool(), "us_ny").await.expect("open 1");
        open_session(db.pool(), "us_ny").await.expect("open 2");

        let closed = close_open_sessions(db.pool(), "us_ny")
            .await
            .expect("close");
        assert_eq!(closed, 2);

        assert!(get_open_session(db.pool(), "us_ny")
            .await
            .expect("query")
            .is_none());

        let closed_again = close_open_sessions(db.pool(), "us_ny")
            .await
            .expect("close again");
        assert_eq!(closed_again, 0);
    }

    #[tokio::test]
    async fn test_update_and_read_cursor() {
        let db = setup_test_db().await;

        let session = open_session(db.pool(), "us_ny").await.expect("open");
        update_cursor(db.pool(), &session.id, "SIMPSON, HOMER")
            .await
            .expect("update cursor");

        let cursor = most_recent_cursor(db.pool(), "us_ny")
            .await
            .expect("query")
            .expect("cursor recorded");
        assert_eq!(cursor, "SIMPSON, HOMER");
    }

    #[tokio::test]
    async fn test_most_recent_session_includes_closed() {
        let db = setup_test_db().await;

        let first = open_session(db.pool(), "us_ny").await.expect("open");
        close_open_sessions(db.pool(), "us_ny")
            .await
            .expect("close");

        let recent = most_recent_session(db.pool(), "us_ny")
            .await
            .expect("query")
            .expect("closed session still reported");
        assert_eq!(recent.id, first.id);
        assert!(recent.end_time.is_some());
    }

    #[tokio::test]
    async fn test_cursor_survives_session_close() {
        let db = setup_test_db().await;

        let session = open_session(db.pool(), "us_ny").await.expect("open");
        update_cursor(db.pool(), &session.id, "WIGGUM, CLANCY")
            .await
            .expect("update cursor");
        close_open_sessions(db.pool(), "us_ny")
            .await
            .expect("close");

        let cursor = most_recent_cursor(db.pool(), "us_ny")
            .await
            .expect("query")
            .expect("closed sessions still provide cursors");
        assert_eq!(cursor, "WIGGUM, CLANCY");
    }
}
