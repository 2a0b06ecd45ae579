//! Session-scoped caches.
//!
//! A [`Session`] is created once per running dashboard session (or CLI
//! invocation) and passed by `&mut` to every status and enrichment call.
//! It owns:
//!
//! - the status cache, a `key -> status` mirror of the active backend that
//!   is loaded once and then updated after every write;
//! - one [`EnrichmentCache`] per fetch kind, keyed by request identity.
//!
//! Actions within a session run one at a time, so nothing here is locked.
//! Nothing here is process-global either: two sessions never share state.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use arcade_shelf_core::models::{Status, StatusMap};

use crate::archive::ArchivePage;
use crate::enrich::{BinaryFetch, StructuredPayload};

/// In-process mirror of the active status backend.
#[derive(Debug, Default)]
pub struct StatusCache {
    entries: Option<StatusMap>,
}

impl StatusCache {
    pub fn is_loaded(&self) -> bool {
        self.entries.is_some()
    }

    /// Replace the whole cache with a fresh backend snapshot.
    pub fn replace(&mut self, map: StatusMap) {
        self.entries = Some(map);
    }

    pub fn get(&self, key: &str) -> Option<&Status> {
        self.entries.as_ref().and_then(|m| m.get(key))
    }

    pub fn set(&mut self, key: &str, status: Option<Status>) {
        let map = self.entries.get_or_insert_with(StatusMap::new);
        match status {
            Some(s) => {
                map.insert(key.to_string(), s);
            }
            None => {
                map.remove(key);
            }
        }
    }

    pub fn map(&self) -> Option<&StatusMap> {
        self.entries.as_ref()
    }

    pub fn invalidate(&mut self) {
        self.entries = None;
    }
}

/// A cached fetch result with the time it was obtained.
#[derive(Debug, Clone)]
pub struct Cached<T> {
    pub value: T,
    pub fetched_at: DateTime<Utc>,
}

/// Fetch results keyed by request identity (URL or normalized subject).
///
/// Failed fetches are cached like successes; an entry is only refetched
/// after [`EnrichmentCache::remove`].
#[derive(Debug)]
pub struct EnrichmentCache<T> {
    entries: HashMap<String, Cached<T>>,
}

impl<T> Default for EnrichmentCache<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T: Clone> EnrichmentCache<T> {
    pub fn get(&self, key: &str) -> Option<&Cached<T>> {
        self.entries.get(key)
    }

    /// Store `value` under `key` and return a copy of it.
    pub fn insert(&mut self, key: String, value: T) -> T {
        self.entries.insert(
            key,
            Cached {
                value: value.clone(),
                fetched_at: Utc::now(),
            },
        );
        value
    }

    pub fn remove(&mut self, key: &str) -> Option<Cached<T>> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Everything cached for one user session.
#[derive(Debug, Default)]
pub struct Session {
    pub statuses: StatusCache,
    /// Image bytes by exact URL.
    pub binaries: EnrichmentCache<BinaryFetch>,
    /// Structured metadata by normalized subject key.
    pub structured: EnrichmentCache<StructuredPayload>,
    /// Unfiltered archive pages by request URL.
    pub searches: EnrichmentCache<ArchivePage>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_cache_lifecycle() {
        let mut cache = StatusCache::default();
        assert!(!cache.is_loaded());
        assert_eq!(cache.get("pacman"), None);

        cache.replace(StatusMap::from([("pacman".to_string(), Status::Played)]));
        assert!(cache.is_loaded());
        assert_eq!(cache.get("pacman"), Some(&Status::Played));

        cache.set("pacman", None);
        assert_eq!(cache.get("pacman"), None);
        cache.set("galaga", Some(Status::WantToPlay));
        assert_eq!(cache.map().unwrap().len(), 1);

        cache.invalidate();
        assert!(!cache.is_loaded());
    }

    #[test]
    fn test_enrichment_cache_keeps_failures() {
        let mut session = Session::new();
        session
            .binaries
            .insert("https://x/missing.png".to_string(), BinaryFetch::Absent);

        let hit = session.binaries.get("https://x/missing.png").unwrap();
        assert_eq!(hit.value, BinaryFetch::Absent);
        assert!(session.binaries.get("https://x/other.png").is_none());

        assert!(session.binaries.remove("https://x/missing.png").is_some());
        assert!(session.binaries.is_empty());
    }
}
