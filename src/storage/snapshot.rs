//! A single monthly snapshot: a document index plus two blob directories.
//!
//! ## Layout
//!
//! ```text
//! {root}/
//! ├── metadata.csv          # One row per document
//! ├── abstract_text/
//! │   └── {ID}.txt          # Abstract, one line
//! └── full_text/
//!     └── {ID}.txt          # Full text, one paragraph per line
//! ```

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{ResolutionStatus, SnapshotDocument, SnapshotKey};
use crate::utils::table::{self, title_bool};

pub const SNAPSHOT_METADATA: &str = "metadata.csv";
const ABSTRACT_DIR: &str = "abstract_text";
const FULL_TEXT_DIR: &str = "full_text";

/// Row layout of `metadata.csv`.
#[derive(Debug, Serialize, Deserialize)]
struct MetadataRow {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "HasAbstract", with = "title_bool")]
    has_abstract: bool,
    #[serde(rename = "HasFullText", with = "title_bool")]
    has_full_text: bool,
    #[serde(rename = "DumpDate")]
    dump_date: NaiveDate,
    #[serde(rename = "PublicationDate")]
    publication_date: String,
    #[serde(rename = "DateResolutionStatus")]
    date_resolution_status: ResolutionStatus,
    /// Label of the owning snapshot; informational only
    #[serde(rename = "ResolvedDate")]
    resolved_date: String,
}

impl From<MetadataRow> for SnapshotDocument {
    fn from(row: MetadataRow) -> Self {
        Self {
            id: row.id,
            dump_date: row.dump_date,
            publication_date: row.publication_date,
            resolution_status: row.date_resolution_status,
            has_abstract: row.has_abstract,
            has_full_text: row.has_full_text,
        }
    }
}

/// Documents assigned to one (year, month).
#[derive(Debug)]
pub struct Snapshot {
    label: SnapshotKey,
    root: PathBuf,
    documents: IndexMap<String, SnapshotDocument>,
    dirty: bool,
}

impl Snapshot {
    /// Open a snapshot, creating its directories if needed.
    pub(crate) fn create(label: SnapshotKey, root: PathBuf) -> Result<Self> {
        fs::create_dir_all(root.join(ABSTRACT_DIR))?;
        fs::create_dir_all(root.join(FULL_TEXT_DIR))?;
        Self::open(label, root)
    }

    /// Open an existing snapshot and read its metadata.
    pub(crate) fn open(label: SnapshotKey, root: PathBuf) -> Result<Self> {
        if !root.exists() {
            log::warn!(
                "Snapshot {} has non-existent root directory {}",
                label,
                root.display()
            );
        }

        let mut snapshot = Self {
            label,
            root,
            documents: IndexMap::new(),
            dirty: false,
        };
        snapshot.load_metadata()?;
        Ok(snapshot)
    }

    pub fn label(&self) -> SnapshotKey {
        self.label
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&SnapshotDocument> {
        self.documents.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.documents.contains_key(id)
    }

    /// Documents in insertion order.
    pub fn documents(&self) -> impl Iterator<Item = &SnapshotDocument> {
        self.documents.values()
    }

    /// Whether staged documents are waiting for [`Snapshot::commit`].
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Stage a document in memory.
    ///
    /// A document with the same ID is replaced without complaint (last write
    /// wins) and keeps its original position. Returns the replaced document.
    pub fn stage(&mut self, document: SnapshotDocument) -> Option<SnapshotDocument> {
        self.dirty = true;
        self.documents.insert(document.id.clone(), document)
    }

    /// Persist staged documents. Returns whether anything was written.
    pub fn commit(&mut self) -> Result<bool> {
        if !self.dirty {
            return Ok(false);
        }
        self.write_metadata()?;
        Ok(true)
    }

    /// Rewrite `metadata.csv` from the in-memory index.
    pub fn write_metadata(&mut self) -> Result<()> {
        let label = self.label.to_string();
        let rows = self.documents.values().map(|doc| MetadataRow {
            id: doc.id.clone(),
            has_abstract: doc.has_abstract,
            has_full_text: doc.has_full_text,
            dump_date: doc.dump_date,
            publication_date: doc.publication_date.clone(),
            date_resolution_status: doc.resolution_status,
            resolved_date: label.clone(),
        });
        table::write_rows(&self.metadata_path(), rows)?;
        self.dirty = false;

        log::debug!(
            "Snapshot {}: wrote metadata for {} documents",
            self.label,
            self.documents.len()
        );
        Ok(())
    }

    /// Replace the in-memory index with the content of `metadata.csv`.
    pub fn load_metadata(&mut self) -> Result<()> {
        self.documents.clear();
        if let Some(rows) = table::read_rows::<MetadataRow>(&self.metadata_path())? {
            for row in rows {
                let document = SnapshotDocument::from(row);
                self.documents.insert(document.id.clone(), document);
            }
        }
        self.dirty = false;
        Ok(())
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.root.join(SNAPSHOT_METADATA)
    }

    pub fn abstract_path(&self, id: &str) -> PathBuf {
        self.root.join(ABSTRACT_DIR).join(format!("{id}.txt"))
    }

    pub fn full_text_path(&self, id: &str) -> PathBuf {
        self.root.join(FULL_TEXT_DIR).join(format!("{id}.txt"))
    }

    /// Abstract blob of `document`, if it has one.
    pub fn abstract_file(&self, document: &SnapshotDocument) -> Option<PathBuf> {
        document
            .has_abstract
            .then(|| self.abstract_path(&document.id))
    }

    /// Full-text blob of `document`, if it has one.
    pub fn full_text_file(&self, document: &SnapshotDocument) -> Option<PathBuf> {
        document
            .has_full_text
            .then(|| self.full_text_path(&document.id))
    }

    /// Write an abstract blob as a single trimmed line.
    pub fn write_abstract(&self, id: &str, text: &str) -> Result<()> {
        let mut file = fs::File::create(self.abstract_path(id))?;
        writeln!(file, "{}", text.trim())?;
        Ok(())
    }

    /// Write a full-text blob, one trimmed paragraph per line.
    pub fn write_full_text(&self, id: &str, paragraphs: &[String]) -> Result<()> {
        let mut file = std::io::BufWriter::new(fs::File::create(self.full_text_path(id))?);
        for paragraph in paragraphs {
            writeln!(file, "{}", paragraph.trim())?;
        }
        file.flush()?;
        Ok(())
    }
}
