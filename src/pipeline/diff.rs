//! Change detection between two corpus manifests.
//!
//! Only structural facts are compared: the ID set and, per shared ID, the
//! (source snapshot, included abstract, included full text) triple. Blob
//! content is never read, so editing a blob in place does not count as a
//! change.

use crate::models::CorpusManifest;

/// IDs that differ between a previous and a fresh manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestDiff {
    /// In fresh but not in previous, in fresh order
    pub added: Vec<String>,
    /// In both with a different entry, in fresh order
    pub updated: Vec<String>,
    /// In previous but not in fresh, in previous order
    pub removed: Vec<String>,
}

impl ManifestDiff {
    /// Calculate the diff between previous and fresh manifests.
    pub fn calculate(previous: &CorpusManifest, fresh: &CorpusManifest) -> Self {
        let mut added = Vec::new();
        let mut updated = Vec::new();
        for entry in fresh.iter() {
            match previous.get(&entry.id) {
                None => added.push(entry.id.clone()),
                Some(old) if old != entry => updated.push(entry.id.clone()),
                Some(_) => {}
            }
        }

        let removed = previous
            .ids()
            .filter(|id| !fresh.contains(id))
            .map(str::to_string)
            .collect();

        Self {
            added,
            updated,
            removed,
        }
    }

    /// Check if there are any changes.
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.updated.is_empty() || !self.removed.is_empty()
    }

    /// Get the total number of changes.
    pub fn change_count(&self) -> usize {
        self.added.len() + self.updated.len() + self.removed.len()
    }
}

/// Whether `fresh` differs structurally from `previous`.
pub fn changed(previous: &CorpusManifest, fresh: &CorpusManifest) -> bool {
    ManifestDiff::calculate(previous, fresh).has_changes()
}
