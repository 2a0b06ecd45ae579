//! Unified status service.
//!
//! Routes every status operation to the active backend: the remote REST
//! table when one is configured, otherwise the local SQLite store. A remote
//! failure ([`StoreError::is_remote`]) is logged and the same operation is
//! replayed against the local store, so callers only ever see a result or a
//! `Storage` error.
//!
//! The per-session status cache lives in [`Session`]; this service fills it
//! once with [`StatusService::load`] and keeps it in step after each write.

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, info, warn};

use arcade_shelf_core::models::{Status, StatusKey, StatusMap};
use arcade_shelf_core::store::{Backend, StatusStore, StoreError};

use crate::config::{Config, RemoteSettings};
use crate::local_store::SqliteStatusStore;
use crate::remote_store::RestStatusStore;
use crate::session::Session;

pub struct StatusService {
    local: Arc<dyn StatusStore>,
    remote: Option<Arc<dyn StatusStore>>,
}

impl StatusService {
    pub fn new(local: Arc<dyn StatusStore>, remote: Option<Arc<dyn StatusStore>>) -> Self {
        Self { local, remote }
    }

    /// Open the local store and, if credentials resolve, the remote one.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let local: Arc<dyn StatusStore> = Arc::new(SqliteStatusStore::open(&config.db.path).await?);

        let remote: Option<Arc<dyn StatusStore>> = match RemoteSettings::from_env(&config.remote) {
            Some(settings) => {
                debug!(url = %settings.url, table = %settings.table, "remote status table configured");
                Some(Arc::new(RestStatusStore::new(settings)?))
            }
            None => None,
        };

        let service = Self::new(local, remote);
        debug!(backend = service.active_backend().as_str(), "status service ready");
        Ok(service)
    }

    /// Which backend operations are routed to first.
    pub fn active_backend(&self) -> Backend {
        self.remote
            .as_ref()
            .map(|r| r.backend())
            .unwrap_or_else(|| self.local.backend())
    }

    /// Run `op` on the remote store, replaying it locally on remote failure.
    async fn with_fallback<T, F, Fut>(&self, op: &str, f: F) -> Result<T, StoreError>
    where
        F: Fn(Arc<dyn StatusStore>) -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        if let Some(remote) = &self.remote {
            match f(Arc::clone(remote)).await {
                Err(e) if e.is_remote() => {
                    warn!(op, error = %e, "remote status store failed; using local store");
                }
                other => return other,
            }
        }
        f(Arc::clone(&self.local)).await
    }

    pub async fn list_all(&self) -> Result<StatusMap, StoreError> {
        self.with_fallback("list", |store| async move { store.list_all().await })
            .await
    }

    pub async fn upsert(&self, key: &StatusKey, status: &Status) -> Result<(), StoreError> {
        self.with_fallback("upsert", |store| async move { store.upsert(key, status).await })
            .await
    }

    pub async fn delete(&self, key: &StatusKey) -> Result<(), StoreError> {
        self.with_fallback("delete", |store| async move { store.delete(key).await })
            .await
    }

    /// Fill the session cache from the backend unless already loaded.
    pub async fn load(&self, session: &mut Session) -> Result<(), StoreError> {
        if session.statuses.is_loaded() {
            return Ok(());
        }
        let map = self.list_all().await?;
        debug!(count = map.len(), "status cache loaded");
        session.statuses.replace(map);
        Ok(())
    }

    /// Drop the session cache and reload it from the backend.
    pub async fn refresh(&self, session: &mut Session) -> Result<(), StoreError> {
        session.statuses.invalidate();
        self.load(session).await
    }

    /// Current status for `raw_key`; blank or unknown keys have none.
    pub async fn get_status(
        &self,
        session: &mut Session,
        raw_key: &str,
    ) -> Result<Option<Status>, StoreError> {
        let Some(key) = StatusKey::parse(raw_key) else {
            return Ok(None);
        };
        self.load(session).await?;
        Ok(session.statuses.get(key.as_str()).cloned())
    }

    /// Set or clear the status for `raw_key`.
    ///
    /// `None` deletes the record. Blank keys are ignored. The backend is
    /// written first; the cache only changes once the write succeeded.
    pub async fn set_status(
        &self,
        session: &mut Session,
        raw_key: &str,
        status: Option<Status>,
    ) -> Result<(), StoreError> {
        let Some(key) = StatusKey::parse(raw_key) else {
            debug!("ignoring status write for blank key");
            return Ok(());
        };
        self.load(session).await?;

        match &status {
            Some(s) => self.upsert(&key, s).await?,
            None => self.delete(&key).await?,
        }
        info!(key = %key, status = status.as_ref().map(|s| s.as_str()).unwrap_or("none"), "status updated");
        session.statuses.set(key.as_str(), status);
        Ok(())
    }

    /// A copy of the cached `key -> status` map.
    pub async fn statuses(&self, session: &mut Session) -> Result<StatusMap, StoreError> {
        self.load(session).await?;
        Ok(session.statuses.map().cloned().unwrap_or_default())
    }

    /// Number of keys currently holding `status`.
    pub async fn count(&self, session: &mut Session, status: &Status) -> Result<usize, StoreError> {
        self.load(session).await?;
        Ok(session
            .statuses
            .map()
            .map(|m| m.values().filter(|s| *s == status).count())
            .unwrap_or(0))
    }
}
