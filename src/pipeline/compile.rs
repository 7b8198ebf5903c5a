//! Corpus compilation: flatten snapshots into one text file plus a manifest.
//!
//! A corpus `<label>` produces two files in its root directory:
//!
//! ```text
//! {root_directory}/
//! ├── {label}.raw_corpus.txt   # Included blobs, concatenated in manifest order
//! └── {label}.metadata.csv     # ID,Source,IncludedAbstract,IncludedFullText
//! ```
//!
//! Nothing is rewritten when the fresh manifest matches the persisted one.

use std::fs::File;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::models::{CorpusConfig, CorpusManifest, CorpusManifestEntry, SnapshotKey};
use crate::pipeline::diff::ManifestDiff;
use crate::storage::SnapshotStore;
use crate::utils::log::RunLog;
use crate::utils::{table, thousands};

/// Result of one compile run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileOutcome {
    /// The persisted manifest is current; nothing was written
    Skipped,
    /// Corpus and manifest were rewritten
    Compiled { documents: usize },
}

/// Compiles an ordered list of snapshots into one corpus.
#[derive(Debug, Clone)]
pub struct CorpusCompiler {
    label: String,
    root_directory: PathBuf,
    snapshots: Vec<SnapshotKey>,
    abstracts_only: bool,
}

impl CorpusCompiler {
    pub fn new(
        label: impl Into<String>,
        root_directory: impl Into<PathBuf>,
        snapshots: Vec<SnapshotKey>,
        abstracts_only: bool,
    ) -> Self {
        Self {
            label: label.into(),
            root_directory: root_directory.into(),
            snapshots,
            abstracts_only,
        }
    }

    pub fn from_config(label: &str, config: &CorpusConfig) -> Self {
        Self::new(
            label,
            &config.root_directory,
            config.snapshots.clone(),
            config.abstracts_only,
        )
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn raw_corpus_path(&self) -> PathBuf {
        self.root_directory
            .join(format!("{}.raw_corpus.txt", self.label))
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root_directory.join(format!("{}.metadata.csv", self.label))
    }

    /// Build the manifest the corpus should have right now.
    ///
    /// Reads snapshot metadata only; corpus files are left alone.
    pub fn stage_fresh_manifest(&self, store: &mut SnapshotStore) -> Result<CorpusManifest> {
        let mut manifest = CorpusManifest::new();
        for &key in &self.snapshots {
            let snapshot = store.snapshot(key)?;
            for document in snapshot.documents() {
                let included_abstract = document.has_abstract;
                let included_full_text = document.has_full_text && !self.abstracts_only;
                if !included_abstract && !included_full_text {
                    continue;
                }
                manifest.insert(CorpusManifestEntry {
                    id: document.id.clone(),
                    source: key,
                    included_abstract,
                    included_full_text,
                });
            }
        }
        Ok(manifest)
    }

    /// Recompile the corpus if its manifest changed.
    pub fn run(&self, store: &mut SnapshotStore, log: &mut dyn RunLog) -> Result<CompileOutcome> {
        log.step(1, 3, &format!("Staging manifest for corpus '{}'", self.label));
        let fresh = self.stage_fresh_manifest(store)?;
        log.sub_item(&format!("{} documents selected", thousands(fresh.len())));

        log.step(2, 3, "Comparing with the persisted manifest");
        let manifest_path = self.manifest_path();
        if let Some(previous) = CorpusManifest::load(&manifest_path)? {
            let diff = ManifestDiff::calculate(&previous, &fresh);
            if !diff.has_changes() {
                log.info(&format!("Corpus '{}' is up to date; skipping", self.label));
                return Ok(CompileOutcome::Skipped);
            }
            log.sub_item(&format!(
                "{} changes: {} added, {} updated, {} removed",
                diff.change_count(),
                diff.added.len(),
                diff.updated.len(),
                diff.removed.len()
            ));
        } else {
            log.sub_item("No persisted manifest");
        }

        log.step(3, 3, "Writing corpus");
        let corpus_path = self.raw_corpus_path();
        table::write_atomic(&corpus_path, |out| {
            for entry in fresh.iter() {
                let snapshot = store.snapshot(entry.source)?;
                if entry.included_abstract {
                    append_blob(out, &entry.id, &snapshot.abstract_path(&entry.id))?;
                }
                if entry.included_full_text {
                    append_blob(out, &entry.id, &snapshot.full_text_path(&entry.id))?;
                }
            }
            Ok(())
        })?;
        fresh.write(&manifest_path)?;

        log.summary(
            &format!("Corpus '{}'", self.label),
            &[
                ("Documents".into(), thousands(fresh.len())),
                ("Corpus".into(), corpus_path.display().to_string()),
                ("Manifest".into(), manifest_path.display().to_string()),
            ],
        );
        Ok(CompileOutcome::Compiled {
            documents: fresh.len(),
        })
    }
}

fn append_blob(out: &mut impl Write, id: &str, path: &Path) -> Result<()> {
    let mut blob = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(AppError::missing_blob(id, path));
        }
        Err(e) => return Err(AppError::Io(e)),
    };
    io::copy(&mut blob, out)?;
    Ok(())
}
