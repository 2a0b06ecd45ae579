//! SQLite database connection management.
//!
//! Provides a connection pool to the local status database with WAL mode
//! enabled. The database file and its parent directories are created
//! automatically if they don't exist.
//!
//! # Concurrency
//!
//! Several dashboard sessions (separate processes) may share one database
//! file. WAL lets readers proceed alongside a single writer, and the busy
//! timeout makes a blocked writer wait for the lock instead of failing, so
//! the engine itself serializes writes. Concurrent writes to the same key
//! are last-write-wins.

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::config::Config;

/// How long a writer waits for another connection's lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Create a connection pool to the configured SQLite database.
pub async fn connect(config: &Config) -> Result<SqlitePool> {
    connect_path(&config.db.path).await
}

/// Create a connection pool to the SQLite file at `db_path`.
///
/// - Creates the database file and parent directories if they don't exist.
/// - Enables WAL journal mode and a busy timeout.
/// - Returns a pool with up to 5 connections.
pub async fn connect_path(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}
