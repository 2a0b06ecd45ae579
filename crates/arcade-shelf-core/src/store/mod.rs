//! Storage abstraction for user-assigned statuses.
//!
//! The [`StatusStore`] trait defines the three operations every status
//! backend supports, so the unified status service can treat the remote
//! REST table, the local SQLite file, and the in-memory test store
//! interchangeably.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Status, StatusKey, StatusMap};

/// Which kind of backend served an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Remote,
    Local,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Remote => "remote",
            Backend::Local => "local",
        }
    }
}

/// Failures a status backend can report.
///
/// The two `Remote*` variants are recoverable: the status service answers
/// them by retrying against the local store. `Storage` has no further
/// fallback and is surfaced to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Network failure, timeout, or non-2xx response.
    #[error("remote store unavailable: {0}")]
    RemoteUnavailable(String),

    /// Response body did not have the expected shape.
    #[error("remote store returned an unexpected response: {0}")]
    RemoteFormat(String),

    /// Embedded storage engine failure (disk full, corruption, ...).
    #[error("storage error: {0}")]
    Storage(String),
}

impl StoreError {
    /// True for failures that should trigger fallback to the local store.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            StoreError::RemoteUnavailable(_) | StoreError::RemoteFormat(_)
        )
    }
}

/// Abstract status backend.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`list_all`](StatusStore::list_all) | Every stored `key -> status` pair |
/// | [`upsert`](StatusStore::upsert) | Insert or replace the status for a key |
/// | [`delete`](StatusStore::delete) | Remove a key; no-op when absent |
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Backend kind, used for logging and reporting.
    fn backend(&self) -> Backend;

    /// Return every stored record. Empty map when nothing is stored.
    async fn list_all(&self) -> Result<StatusMap, StoreError>;

    /// Insert or update the record for `key`. Repeating a call with the
    /// same value leaves the stored data unchanged.
    async fn upsert(&self, key: &StatusKey, status: &Status) -> Result<(), StoreError>;

    /// Remove the record for `key`. Deleting an absent key is not an error.
    async fn delete(&self, key: &StatusKey) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_errors_are_recoverable() {
        assert!(StoreError::RemoteUnavailable("timeout".into()).is_remote());
        assert!(StoreError::RemoteFormat("not an array".into()).is_remote());
        assert!(!StoreError::Storage("disk full".into()).is_remote());
    }

    #[test]
    fn test_error_display() {
        let err = StoreError::RemoteUnavailable("HTTP 503".into());
        assert_eq!(err.to_string(), "remote store unavailable: HTTP 503");
    }
}
