//! Rollcall Database Layer
//!
//! Provides `SQLite` database access for crawl state and scraped data.
//! Uses `SQLx` with embedded, versioned migrations.
//!
//! # Architecture
//!
//! - **Sessions**: one row per crawl attempt; the open session carries
//!   the resumption cursor
//! - **Persons/records**: stable person identities with records keyed by
//!   `(region, record_id)`; upserts overwrite so redelivery is safe
//! - **Snapshots**: append-only facility change log
//! - **Markers**: session-scoped idempotency claims for disambiguation
//! - **Tasks**: backing table for the durable task queue (the queue
//!   itself lives in `rollcall-queue` and shares this pool)
//!
//! Timestamps are RFC 3339 TEXT in UTC throughout.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod connection;
pub mod error;
pub mod markers;
pub mod migrations;
pub mod persons;
pub mod records;
pub mod sessions;
pub mod snapshots;

pub use error::{DatabaseError, Result};
pub use persons::{Person, PersonIdentity};
pub use records::{RecordKey, StoredRecord};
pub use sessions::ScrapeSession;
pub use snapshots::FacilitySnapshot;

use chrono::{DateTime, NaiveDate, Utc};
use std::path::Path;

/// Parse a stored RFC 3339 timestamp back into UTC.
pub(crate) fn parse_utc(raw: &str) -> std::result::Result<DateTime<Utc>, sqlx::Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| sqlx::Error::Decode(e.into()))
}

/// Parse a stored `YYYY-MM-DD` date.
pub(crate) fn parse_naive_date(raw: &str) -> std::result::Result<NaiveDate, sqlx::Error> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| sqlx::Error::Decode(e.into()))
}

/// High-level database interface.
///
/// Wraps the connection pool and handles initialization and migration.
#[derive(Debug, Clone)]
pub struct Database {
    pool: sqlx::Pool<sqlx::Sqlite>,
}

impl Database {
    /// Open (or create) a database at the specified path.
    ///
    /// # Errors
    /// Returns `DatabaseError` if the database cannot be opened.
    pub async fn new(path: impl AsRef<Path>, max_connections: u32) -> Result<Self> {
        let pool = connection::open_pool(path, max_connections).await?;
        Ok(Self { pool })
    }

    /// Open an in-memory database, mainly for tests.
    ///
    /// # Errors
    /// Returns `DatabaseError` if the pool cannot be created.
    pub async fn in_memory() -> Result<Self> {
        Self::new(":memory:", 1).await
    }

    /// Run all pending database migrations.
    ///
    /// # Errors
    /// Returns `DatabaseError::Migration` if any migration fails.
    pub async fn run_migrations(&self) -> Result<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// Get the current schema version.
    ///
    /// # Errors
    /// Returns `DatabaseError` if the version cannot be queried.
    pub async fn get_schema_version(&self) -> Result<i64> {
        migrations::get_schema_version(&self.pool).await
    }

    /// Get a reference to the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Sqlite> {
        &self.pool
    }

    /// Close the database connection gracefully.
    pub async fn close(self) {
        self.pool.close().await;
    }
}
