//! Facility snapshot change log.
//!
//! Snapshots are append-only: a row is written only when the scraped
//! facility differs from the latest snapshot for that record, so the
//! table reads as the history of facility transfers.

use crate::parse_utc;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Row, Sqlite};

/// One point-in-time facility observation.
#[derive(Debug, Clone)]
pub struct FacilitySnapshot {
    /// Unique snapshot identifier
    pub id: String,
    /// Region of the record
    pub region: String,
    /// Record the snapshot belongs to
    pub record_id: String,
    /// When the observation was made
    pub snapshot_time: DateTime<Utc>,
    /// Facility at observation time; `None` when the site listed none
    pub facility: Option<String>,
}

/// Append a snapshot if the facility changed since the last one.
///
/// Returns `true` if a row was written. The first observation for a
/// record always writes.
///
/// # Errors
/// Returns `sqlx::Error` if the read or write fails.
pub async fn append_snapshot_if_changed(
    pool: &Pool<Sqlite>,
    region: &str,
    record_id: &str,
    facility: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let latest: Option<Option<String>> = sqlx::query_scalar(
        "SELECT facility FROM facility_snapshots
         WHERE region = ? AND record_id = ?
         ORDER BY snapshot_time DESC, rowid DESC LIMIT 1",
    )
    .bind(region)
    .bind(record_id)
    .fetch_optional(pool)
    .await?;

    if let Some(latest_facility) = latest {
        if latest_facility.as_deref() == facility {
            return Ok(false);
        }
    }

    sqlx::query(
        "INSERT INTO facility_snapshots (id, region, record_id, snapshot_time, facility)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(region)
    .bind(record_id)
    .bind(Utc::now().to_rfc3339())
    .bind(facility)
    .execute(pool)
    .await?;

    tracing::debug!(region, record_id, ?facility, "facility changed, snapshot appended");

    Ok(true)
}

/// Get all snapshots for a record, oldest first.
///
/// # Errors
/// Returns `sqlx::Error` if the query fails.
pub async fn snapshots_for_record(
    pool: &Pool<Sqlite>,
    region: &str,
    record_id: &str,
) -> Result<Vec<FacilitySnapshot>, sqlx::Error> {
    let rows = sqlx::query(
        "SELECT id, region, record_id, snapshot_time, facility FROM facility_snapshots
         WHERE region = ? AND record_id = ?
         ORDER BY snapshot_time ASC, rowid ASC",
    )
    .bind(region)
    .bind(record_id)
    .fetch_all(pool)
    .await?;

    let mut snapshots = Vec::with_capacity(rows.len());
    for row in rows {
        let snapshot_time: String = row.try_get("snapshot_time")?;
        snapshots.push(FacilitySnapshot {
            id: row.try_get("id")?,
            region: row.try_get("region")?,
            record_id: row.try_get("record_id")?,
            snapshot_time: parse_utc(&snapshot_time)?,
            facility: row.try_get("facility")?,
        });
    }

    Ok(snapshots)
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
    async fn test_first_snapshot_always_writes() {
        let db = setup_test_db().await;

        let written =
            append_snapshot_if_changed(db.pool(), "us_ny", "1234567a", Some("SING SING"))
                .await
                .expect("append");
        assert!(written);
    }

    #[tokio::test]
    async fn test_only_changes_are_appended() {
        let db = setup_test_db().await;

        // A, A, B, B, A collapses to three transitions
        for facility in ["ATTICA", "ATTICA", "SING SING", "SING SING", "ATTICA"] {
            append_snapshot_if_changed(db.pool(), "us_ny", "1234567a", Some(facility))
                .await
                .expect("append");
        }

        let snapshots = snapshots_for_record(db.pool(), "us_ny", "1234567a")
            .await
            .expect("query");
        let facilities: Vec<Option<String>> =
            snapshots.into_iter().map(|s| s.facility).collect();
        assert_eq!(
            facilities,
            vec![
                Some("ATTICA".to_string()),
                Some("SING SING".to_string()),
                Some("ATTICA".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_none_facility_is_a_value() {
        let db = setup_test_db().await;

        append_snapshot_if_changed(db.pool(), "us_ny", "1234567a", Some("ATTICA"))
            .await
            .expect("append");
        let written = append_snapshot_if_changed(db.pool(), "us_ny", "1234567a", None)
            .await
            .expect("append none");
        assert!(written);

        let unchanged = append_snapshot_if_changed(db.pool(), "us_ny", "1234567a", None)
            .await
            .expect("append none again");
        assert!(!unchanged);
    }

    #[tokio::test]
    async fn test_snapshots_are_record_scoped() {
        let db = setup_test_db().await;

        append_snapshot_if_changed(db.pool(), "us_ny", "1234567a", Some("ATTICA"))
            .await
            .expect("append");
        let written = append_snapshot_if_changed(db.pool(), "us_ny", "7654321b", Some("ATTICA"))
            .await
            .expect("append other record");
        assert!(written);
    }
}
