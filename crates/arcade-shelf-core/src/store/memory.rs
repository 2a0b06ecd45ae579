//! In-memory [`StatusStore`] implementation for tests and embedding.
//!
//! Uses a `HashMap` behind `std::sync::RwLock` for thread safety. A
//! failure can be injected to exercise the status service's fallback
//! path without a network.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use crate::models::{Status, StatusKey, StatusMap, StatusRecord};

use super::{Backend, StatusStore, StoreError};

/// In-memory status store.
pub struct InMemoryStore {
    backend: Backend,
    records: RwLock<HashMap<String, StatusRecord>>,
    failure: RwLock<Option<StoreError>>,
    calls: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_backend(Backend::Local)
    }

    /// Create a store that reports itself as the given backend kind.
    pub fn with_backend(backend: Backend) -> Self {
        Self {
            backend,
            records: RwLock::new(HashMap::new()),
            failure: RwLock::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    /// Make every subsequent operation fail with `err` (or succeed again with `None`).
    pub fn fail_with(&self, err: Option<StoreError>) {
        *self.failure.write().unwrap() = err;
    }

    /// Number of operations attempted against this store.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Snapshot of stored records, ordered by key.
    pub fn records(&self) -> Vec<StatusRecord> {
        let mut out: Vec<StatusRecord> = self.records.read().unwrap().values().cloned().collect();
        out.sort_by(|a, b| a.key.cmp(&b.key));
        out
    }

    fn begin(&self) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.failure.read().unwrap().as_ref() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StatusStore for InMemoryStore {
    fn backend(&self) -> Backend {
        self.backend
    }

    async fn list_all(&self) -> Result<StatusMap, StoreError> {
        self.begin()?;
        let records = self.records.read().unwrap();
        Ok(records
            .values()
            .map(|r| (r.key.clone(), r.status.clone()))
            .collect())
    }

    async fn upsert(&self, key: &StatusKey, status: &Status) -> Result<(), StoreError> {
        self.begin()?;
        let mut records = self.records.write().unwrap();
        records.insert(
            key.as_str().to_string(),
            StatusRecord {
                key: key.as_str().to_string(),
                status: status.clone(),
                updated_at: Some(Utc::now()),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &StatusKey) -> Result<(), StoreError> {
        self.begin()?;
        self.records.write().unwrap().remove(key.as_str());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> StatusKey {
        StatusKey::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_upsert_then_list() {
        let store = InMemoryStore::new();
        store.upsert(&key("pacman"), &Status::Played).await.unwrap();
        store
            .upsert(&key("galaga"), &Status::WantToPlay)
            .await
            .unwrap();

        let all = store.list_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all.get("pacman"), Some(&Status::Played));
    }

    #[tokio::test]
    async fn test_upsert_idempotent() {
        let store = InMemoryStore::new();
        store.upsert(&key("pacman"), &Status::Played).await.unwrap();
        let once = store.list_all().await.unwrap();
        store.upsert(&key("pacman"), &Status::Played).await.unwrap();
        assert_eq!(store.list_all().await.unwrap(), once);
    }

    #[tokio::test]
    async fn test_delete_absent_is_noop() {
        let store = InMemoryStore::new();
        store.delete(&key("missing")).await.unwrap();
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let store = InMemoryStore::with_backend(Backend::Remote);
        store.fail_with(Some(StoreError::RemoteUnavailable("down".into())));
        let err = store.list_all().await.unwrap_err();
        assert!(err.is_remote());
        assert_eq!(store.calls(), 1);
        assert_eq!(store.backend(), Backend::Remote);
    }
}
