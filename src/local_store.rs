//! SQLite-backed [`StatusStore`] implementation.
//!
//! The local store is always available: it is the default backend when no
//! remote is configured and the fallback target whenever the remote fails.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS game_status (
//!     key TEXT PRIMARY KEY,
//!     status TEXT,
//!     updated_at TEXT
//! )
//! ```
//!
//! The table is created lazily on first use, so an operation against a
//! fresh or foreign database file never fails for lack of a table.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tokio::sync::OnceCell;
use tracing::debug;

use arcade_shelf_core::models::{Status, StatusKey, StatusMap, StatusRecord};
use arcade_shelf_core::store::{Backend, StatusStore, StoreError};

use crate::db;

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS game_status (
        key TEXT PRIMARY KEY,
        status TEXT,
        updated_at TEXT
    )
"#;

/// Create the status table if missing.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(CREATE_TABLE).execute(pool).await?;
    Ok(())
}

fn storage_error(err: sqlx::Error) -> StoreError {
    StoreError::Storage(err.to_string())
}

/// SQLite implementation of the [`StatusStore`] trait.
pub struct SqliteStatusStore {
    pool: SqlitePool,
    schema: OnceCell<()>,
}

impl SqliteStatusStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            schema: OnceCell::new(),
        }
    }

    /// Open (creating if needed) the database file at `path`.
    pub async fn open(path: &Path) -> anyhow::Result<Self> {
        let pool = db::connect_path(path).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn ready(&self) -> Result<&SqlitePool, StoreError> {
        self.schema
            .get_or_try_init(|| async {
                debug!("ensuring local status table");
                ensure_schema(&self.pool).await
            })
            .await
            .map_err(storage_error)?;
        Ok(&self.pool)
    }

    /// Every stored record with its last update time, ordered by key.
    pub async fn records(&self) -> Result<Vec<StatusRecord>, StoreError> {
        let pool = self.ready().await?;
        let rows = sqlx::query(
            "SELECT key, status, updated_at FROM game_status WHERE status IS NOT NULL ORDER BY key",
        )
        .fetch_all(pool)
        .await
        .map_err(storage_error)?;

        Ok(rows
            .iter()
            .filter_map(|row| {
                let key: String = row.get("key");
                let key = StatusKey::parse(&key)?;
                let status: String = row.get("status");
                let status = Status::parse_opt(&status)?;
                let updated_at: Option<String> = row.get("updated_at");
                Some(StatusRecord {
                    key: key.as_str().to_string(),
                    status,
                    updated_at: updated_at
                        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                        .map(|dt| dt.with_timezone(&Utc)),
                })
            })
            .collect())
    }
}

#[async_trait]
impl StatusStore for SqliteStatusStore {
    fn backend(&self) -> Backend {
        Backend::Local
    }

    async fn list_all(&self) -> Result<StatusMap, StoreError> {
        Ok(self
            .records()
            .await?
            .into_iter()
            .map(|r| (r.key, r.status))
            .collect())
    }

    async fn upsert(&self, key: &StatusKey, status: &Status) -> Result<(), StoreError> {
        let pool = self.ready().await?;
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO game_status (key, status, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                status = excluded.status,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key.as_str())
        .bind(status.as_str())
        .bind(&now)
        .execute(pool)
        .await
        .map_err(storage_error)?;

        Ok(())
    }

    async fn delete(&self, key: &StatusKey) -> Result<(), StoreError> {
        let pool = self.ready().await?;
        sqlx::query("DELETE FROM game_status WHERE key = ?")
            .bind(key.as_str())
            .execute(pool)
            .await
            .map_err(storage_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn key(s: &str) -> StatusKey {
        StatusKey::parse(s).unwrap()
    }

    async fn open_store(tmp: &TempDir) -> SqliteStatusStore {
        SqliteStatusStore::open(&tmp.path().join("data/shelf.sqlite"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_first_use_creates_table() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp).await;
        assert!(store.list_all().await.unwrap().is_empty());
        assert!(tmp.path().join("data/shelf.sqlite").exists());
    }

    #[tokio::test]
    async fn test_upsert_update_and_delete() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp).await;

        store.upsert(&key("pacman"), &Status::WantToPlay).await.unwrap();
        store.upsert(&key("pacman"), &Status::Played).await.unwrap();
        store
            .upsert(&key("galaga"), &Status::Other("favorite".into()))
            .await
            .unwrap();

        let all = store.list_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all.get("pacman"), Some(&Status::Played));
        assert_eq!(all.get("galaga"), Some(&Status::Other("favorite".into())));

        store.delete(&key("pacman")).await.unwrap();
        store.delete(&key("pacman")).await.unwrap();
        let all = store.list_all().await.unwrap();
        assert!(!all.contains_key("pacman"));
    }

    #[tokio::test]
    async fn test_upsert_idempotent() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp).await;

        store.upsert(&key("dkong"), &Status::NotPlayable).await.unwrap();
        let once = store.list_all().await.unwrap();
        store.upsert(&key("dkong"), &Status::NotPlayable).await.unwrap();
        assert_eq!(store.list_all().await.unwrap(), once);
    }

    #[tokio::test]
    async fn test_records_carry_timestamps() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp).await;
        let before = Utc::now() - chrono::Duration::seconds(1);

        store.upsert(&key("sf2"), &Status::DontHaveRom).await.unwrap();
        let records = store.records().await.unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].updated_at.unwrap() >= before);
    }

    #[tokio::test]
    async fn test_persists_across_reopen_and_shared_file() {
        let tmp = TempDir::new().unwrap();
        let first = open_store(&tmp).await;
        let second = open_store(&tmp).await;

        first.upsert(&key("joust"), &Status::Played).await.unwrap();
        second.upsert(&key("joust"), &Status::WantToPlay).await.unwrap();
        first.pool().close().await;

        let reopened = open_store(&tmp).await;
        assert_eq!(
            reopened.list_all().await.unwrap().get("joust"),
            Some(&Status::WantToPlay)
        );
    }
}
