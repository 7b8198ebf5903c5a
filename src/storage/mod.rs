//! Durable snapshot storage.
//!
//! The store only ever grows: snapshots are created on demand and never
//! removed. Each snapshot is loaded lazily on first access.
//!
//! ## Directory Structure
//!
//! ```text
//! {root}/
//! ├── collection_metadata.csv   # SnapshotKey -> RootDirectory
//! ├── .store.lock               # Held by writing runs
//! ├── 2020-03/
//! │   ├── metadata.csv
//! │   ├── abstract_text/
//! │   └── full_text/
//! └── 2020-04/
//!     └── ...
//! ```

pub mod lock;
pub mod report;
pub mod snapshot;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::SnapshotKey;
use crate::utils::table;

// Re-export for convenience
pub use lock::StoreLock;
pub use report::ExtractionReport;
pub use snapshot::Snapshot;

pub const COLLECTION_METADATA: &str = "collection_metadata.csv";

/// Row layout of `collection_metadata.csv`.
#[derive(Debug, Serialize, Deserialize)]
struct CollectionRow {
    #[serde(rename = "SnapshotKey")]
    key: SnapshotKey,
    #[serde(rename = "RootDirectory")]
    root: PathBuf,
}

#[derive(Debug)]
struct Slot {
    root: PathBuf,
    snapshot: Option<Snapshot>,
}

/// Registry of monthly snapshots rooted at one directory.
#[derive(Debug)]
pub struct SnapshotStore {
    root: PathBuf,
    slots: BTreeMap<SnapshotKey, Slot>,
}

impl SnapshotStore {
    /// Open the store at `root`, reading its collection manifest if present.
    pub fn load(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let mut slots = BTreeMap::new();

        let manifest = root.join(COLLECTION_METADATA);
        if let Some(rows) = table::read_rows::<CollectionRow>(&manifest)? {
            for row in rows {
                slots.insert(
                    row.key,
                    Slot {
                        root: row.root,
                        snapshot: None,
                    },
                );
            }
        }

        log::debug!(
            "Loaded snapshot store at {} ({} snapshots)",
            root.display(),
            slots.len()
        );
        Ok(Self { root, slots })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Snapshot keys in chronological order.
    pub fn keys(&self) -> impl Iterator<Item = SnapshotKey> + '_ {
        self.slots.keys().copied()
    }

    pub fn contains(&self, key: SnapshotKey) -> bool {
        self.slots.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Take the single-writer lock on this store.
    pub fn lock(&self) -> Result<StoreLock> {
        StoreLock::acquire(&self.root)
    }

    /// Get a snapshot, loading its metadata on first access.
    pub fn get(&mut self, key: SnapshotKey) -> Result<Option<&mut Snapshot>> {
        let Some(slot) = self.slots.get_mut(&key) else {
            return Ok(None);
        };
        if slot.snapshot.is_none() {
            slot.snapshot = Some(Snapshot::open(key, slot.root.clone())?);
        }
        Ok(slot.snapshot.as_mut())
    }

    /// Get a snapshot that must exist.
    pub fn snapshot(&mut self, key: SnapshotKey) -> Result<&mut Snapshot> {
        self.get(key)?
            .ok_or_else(|| AppError::UnknownSnapshot(key.to_string()))
    }

    /// Get a snapshot, creating it (and recording it in the collection
    /// manifest) if it doesn't exist yet.
    pub fn get_or_create(&mut self, key: SnapshotKey) -> Result<&mut Snapshot> {
        if !self.slots.contains_key(&key) {
            let root = self.root.join(key.to_string());
            let snapshot = Snapshot::create(key, root.clone())?;
            self.slots.insert(
                key,
                Slot {
                    root,
                    snapshot: Some(snapshot),
                },
            );
            self.write_collection()?;
            log::info!("Created snapshot {key}");
        }
        self.snapshot(key)
    }

    /// Persist every loaded snapshot with staged changes.
    ///
    /// Returns the keys that were written.
    pub fn commit(&mut self) -> Result<Vec<SnapshotKey>> {
        let mut written = Vec::new();
        for (key, slot) in &mut self.slots {
            if let Some(snapshot) = slot.snapshot.as_mut() {
                if snapshot.commit()? {
                    written.push(*key);
                }
            }
        }
        Ok(written)
    }

    fn write_collection(&self) -> Result<()> {
        let rows = self.slots.iter().map(|(key, slot)| CollectionRow {
            key: *key,
            root: slot.root.clone(),
        });
        table::write_rows(&self.root.join(COLLECTION_METADATA), rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ResolutionStatus, SnapshotDocument};
    use chrono::NaiveDate;
    use std::fs;
    use tempfile::TempDir;

    fn key(s: &str) -> SnapshotKey {
        s.parse().unwrap()
    }

    fn doc(i: usize) -> SnapshotDocument {
        SnapshotDocument {
            id: format!("doc{i:03}"),
            dump_date: NaiveDate::from_ymd_opt(2020, 4, 10).unwrap(),
            publication_date: format!("2020-03-{:02}", i % 28 + 1),
            resolution_status: if i % 2 == 0 {
                ResolutionStatus::UsedAsIs
            } else {
                ResolutionStatus::MonthInferred
            },
            has_abstract: i % 3 != 0,
            has_full_text: i % 2 == 0,
        }
    }

    #[test]
    fn test_load_empty_store() {
        let tmp = TempDir::new().unwrap();
        let store = SnapshotStore::load(tmp.path()).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let mut store = SnapshotStore::load(tmp.path()).unwrap();

        store.get_or_create(key("2020-03")).unwrap().stage(doc(1));
        let again = store.get_or_create(key("2020-03")).unwrap();
        assert_eq!(again.len(), 1);
        assert_eq!(store.len(), 1);

        let manifest = fs::read_to_string(tmp.path().join(COLLECTION_METADATA)).unwrap();
        assert_eq!(manifest.lines().count(), 2);
        assert!(manifest.starts_with("SnapshotKey,RootDirectory\n"));
    }

    #[test]
    fn test_unknown_snapshot() {
        let tmp = TempDir::new().unwrap();
        let mut store = SnapshotStore::load(tmp.path()).unwrap();
        assert!(store.get(key("2020-01")).unwrap().is_none());
        assert!(matches!(
            store.snapshot(key("2020-01")),
            Err(AppError::UnknownSnapshot(_))
        ));
    }

    #[test]
    fn test_round_trip_through_fresh_store() {
        let tmp = TempDir::new().unwrap();
        let mut store = SnapshotStore::load(tmp.path()).unwrap();
        let originals: Vec<SnapshotDocument> = (0..25).map(doc).collect();

        let snapshot = store.get_or_create(key("2020-03")).unwrap();
        for document in &originals {
            snapshot.stage(document.clone());
        }
        store.get_or_create(key("2019-12")).unwrap();
        assert_eq!(store.commit().unwrap(), vec![key("2020-03")]);

        let mut fresh = SnapshotStore::load(tmp.path()).unwrap();
        let keys: Vec<String> = fresh.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["2019-12", "2020-03"]);

        let reloaded = fresh.snapshot(key("2020-03")).unwrap();
        assert_eq!(reloaded.len(), originals.len());
        for original in &originals {
            assert_eq!(reloaded.get(&original.id), Some(original));
        }
        assert!(fresh.snapshot(key("2019-12")).unwrap().is_empty());
    }

    #[test]
    fn test_commit_skips_clean_snapshots() {
        let tmp = TempDir::new().unwrap();
        let mut store = SnapshotStore::load(tmp.path()).unwrap();
        store.get_or_create(key("2020-03")).unwrap().stage(doc(1));
        assert_eq!(store.commit().unwrap().len(), 1);
        assert!(store.commit().unwrap().is_empty());
    }
}
