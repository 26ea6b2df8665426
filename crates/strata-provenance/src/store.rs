//! The shared provenance store.
//!
//! One store exists per top-level merge; every context derived through
//! [`crate::context::MergeContext::with_file`] writes into it, including
//! contexts handed to worker threads during parallel import resolution. The
//! store is therefore internally synchronized and append-only: entries for a
//! path form a chain ordered base layer first, and the last entry is the
//! winner in the merged document.

use std::sync::RwLock;

use indexmap::IndexMap;

use crate::entry::ProvenanceEntry;

/// Path → provenance chain, synchronized for concurrent writers.
#[derive(Debug, Default)]
pub struct ProvenanceStore {
    entries: RwLock<IndexMap<String, Vec<ProvenanceEntry>>>,
}

impl ProvenanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry to the chain at `path`.
    pub fn record(&self, path: &str, entry: ProvenanceEntry) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.entry(path.to_string()).or_default().push(entry);
    }

    /// The full chain at `path`, base layer first.
    pub fn get(&self, path: &str) -> Vec<ProvenanceEntry> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(path).cloned().unwrap_or_default()
    }

    /// The winning (most recent) entry at `path`.
    pub fn latest(&self, path: &str) -> Option<ProvenanceEntry> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(path).and_then(|chain| chain.last().cloned())
    }

    pub fn has(&self, path: &str) -> bool {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.contains_key(path)
    }

    /// All recorded paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let mut paths: Vec<String> = entries.keys().cloned().collect();
        paths.sort_unstable();
        paths
    }

    /// Drop the chain at `path`.
    pub fn remove(&self, path: &str) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.shift_remove(path);
    }

    pub fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.clear();
    }

    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// An independent copy: mutations of either store never affect the
    /// other.
    pub fn deep_clone(&self) -> Self {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Self {
            entries: RwLock::new(entries.clone()),
        }
    }
}
