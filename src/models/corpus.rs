//! Corpus manifests: the structural description of a compiled corpus.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::SnapshotKey;
use crate::utils::table::{self, title_bool};

/// One document's contribution to a compiled corpus.
///
/// Equality over all four fields is what change detection compares; the
/// text held in the referenced blobs is deliberately not part of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusManifestEntry {
    #[serde(rename = "ID")]
    pub id: String,

    /// Snapshot the document was taken from
    #[serde(rename = "Source")]
    pub source: SnapshotKey,

    #[serde(rename = "IncludedAbstract", with = "title_bool")]
    pub included_abstract: bool,

    #[serde(rename = "IncludedFullText", with = "title_bool")]
    pub included_full_text: bool,
}

/// Ordered mapping of document ID to manifest entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorpusManifest {
    entries: IndexMap<String, CorpusManifestEntry>,
}

impl CorpusManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, replacing any previous entry with the same ID in place.
    pub fn insert(&mut self, entry: CorpusManifestEntry) -> Option<CorpusManifestEntry> {
        self.entries.insert(entry.id.clone(), entry)
    }

    pub fn get(&self, id: &str) -> Option<&CorpusManifestEntry> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in manifest order.
    pub fn iter(&self) -> impl Iterator<Item = &CorpusManifestEntry> {
        self.entries.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Load a persisted manifest, or None if none was written yet.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let Some(rows) = table::read_rows::<CorpusManifestEntry>(path)? else {
            return Ok(None);
        };
        Ok(Some(rows.into_iter().collect()))
    }

    /// Persist the manifest, replacing the previous file in full.
    pub fn write(&self, path: &Path) -> Result<()> {
        table::write_rows(path, self.iter())
    }
}

impl FromIterator<CorpusManifestEntry> for CorpusManifest {
    fn from_iter<T: IntoIterator<Item = CorpusManifestEntry>>(iter: T) -> Self {
        let mut manifest = Self::new();
        for entry in iter {
            manifest.insert(entry);
        }
        manifest
    }
}
