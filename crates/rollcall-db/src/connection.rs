//! Database connection management.

use crate::error::{DatabaseError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;

/// Open a `SQLite` connection pool at the given path.
///
/// The database file is created if it does not exist. `:memory:` opens an
/// in-memory database (a single shared connection keeps the schema alive
/// across pool checkouts).
///
/// # Errors
/// Returns `DatabaseError::Open` if the path is invalid or the pool
/// cannot be created.
pub async fn open_pool(path: impl AsRef<Path>, max_connections: u32) -> Result<Pool<Sqlite>> {
    let path_str = path
        .as_ref()
        .to_str()
        .ok_or_else(|| DatabaseError::Open("invalid database path: not valid UTF-8".to_string()))?;

    let in_memory = path_str == ":memory:";

    let connect_options = SqliteConnectOptions::from_str(path_str)
        .map_err(|e| DatabaseError::Open(format!("invalid connection string: {e}")))?
        .create_if_missing(true)
        .foreign_keys(true);

    // In-memory databases vanish with their connection, so pin the pool
    // to a single connection there.
    let max_connections = if in_memory { 1 } else { max_connections };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(connect_options)
        .await
        .map_err(|e| DatabaseError::Open(format!("failed to create pool: {e}")))?;

    tracing::info!(path = path_str, "database pool created");

    Ok(pool)
}
