//! Pre-mutation captures of cache subsets.

use super::key::CacheKey;
use super::store::{CacheEntry, CacheStore};

/// A deep copy of every cache entry under a set of prefixes.
///
/// Owned by exactly one in-flight mutation. Dropping it discards the capture;
/// [`CacheStore::rollback`] replays it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    entries: Vec<(CacheKey, CacheEntry)>,
}

impl Snapshot {
    /// Captured keys, in key order.
    pub fn keys(&self) -> impl Iterator<Item = &CacheKey> {
        self.entries.iter().map(|(key, _)| key)
    }

    /// The captured entry for `key`.
    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<&CacheEntry> {
        self.entries
            .iter()
            .find(|(captured, _)| captured == key)
            .map(|(_, entry)| entry)
    }

    /// Number of captured entries.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing was captured.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CacheStore {
    /// Captures every entry under any of `prefixes`.
    ///
    /// Overlapping prefixes capture each key once.
    #[must_use]
    pub fn snapshot(&self, prefixes: &[CacheKey]) -> Snapshot {
        let entries = self.entries.read();
        let captured = entries
            .iter()
            .filter(|(key, _)| prefixes.iter().any(|prefix| key.starts_with(prefix)))
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect();
        Snapshot { entries: captured }
    }

    /// Overwrites exactly the captured keys with their captured entries.
    ///
    /// Keys that were evicted since the capture are restored; keys outside the
    /// capture are left alone.
    pub fn rollback(&self, snapshot: Snapshot) {
        let restored = snapshot.len();
        let mut entries = self.entries.write();
        for (key, entry) in snapshot.entries {
            entries.insert(key, entry);
        }
        drop(entries);
        tracing::debug!(entries = restored, "rolled back cache snapshot");
    }
}
