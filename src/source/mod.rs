//! Streaming access to the records of one dump.
//!
//! A dump is a `metadata.csv` manifest plus full-text fragments stored in one
//! of three physical layouts:
//!
//! ```text
//! unified:            {distrib}/document_parses.tar.gz
//! split_pdf_only:     {distrib}/{comm_use_subset,custom_license,...}.tar.gz
//! split_pdf_and_pmc:  {distrib}/{subset}/{pdf_json,pmc_json}/*.json
//! ```

pub mod archive;
pub mod layout;

use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::{DumpDescriptor, DumpFormat, SourceRecord};

pub use archive::{FragmentArchive, LooseFiles, TarIndex};
use layout::{DOCUMENT_PARSES, LICENSE_SUBSETS, ManifestRow, ReferenceRow};

/// Where the fragments of a dump are read from.
#[derive(Debug)]
enum Fragments {
    Unified(TarIndex),
    SplitPdfOnly(BTreeMap<String, TarIndex>),
    SplitPdfAndPmc(LooseFiles),
}

impl Fragments {
    fn open(descriptor: &DumpDescriptor) -> Result<Self> {
        let dir = &descriptor.distrib_directory;
        match descriptor.format {
            DumpFormat::Unified => {
                let path = archive::locate_tarball(dir, DOCUMENT_PARSES).ok_or_else(|| {
                    AppError::missing_archive(
                        dir.join(format!("{DOCUMENT_PARSES}.tar.gz")),
                        "document parses archive not found",
                    )
                })?;
                Ok(Self::Unified(TarIndex::open(&path)?))
            }
            DumpFormat::SplitPdfOnly => {
                let mut subsets = BTreeMap::new();
                for subset in LICENSE_SUBSETS {
                    if let Some(path) = archive::locate_tarball(dir, subset) {
                        subsets.insert(subset.to_string(), TarIndex::open(&path)?);
                    }
                }
                if subsets.is_empty() {
                    return Err(AppError::missing_archive(
                        dir,
                        format!("none of the license archives {LICENSE_SUBSETS:?} were found"),
                    ));
                }
                Ok(Self::SplitPdfOnly(subsets))
            }
            DumpFormat::SplitPdfAndPmc => Ok(Self::SplitPdfAndPmc(LooseFiles::new(dir))),
        }
    }

    fn member_count(&self) -> Option<usize> {
        match self {
            Self::Unified(index) => Some(index.len()),
            Self::SplitPdfOnly(subsets) => Some(subsets.values().map(TarIndex::len).sum()),
            Self::SplitPdfAndPmc(_) => None,
        }
    }
}

impl FragmentArchive for Fragments {
    fn read_member(&self, member: &str) -> Result<Option<Vec<u8>>> {
        match self {
            Self::Unified(index) => index.read_member(member),
            Self::SplitPdfOnly(subsets) => {
                let subset = member.trim_start_matches("./").split('/').next().unwrap_or_default();
                match subsets.get(subset) {
                    Some(index) => index.read_member(member),
                    None => Ok(None),
                }
            }
            Self::SplitPdfAndPmc(files) => files.read_member(member),
        }
    }
}

/// Parsed full-text fragment.
#[derive(Debug, Deserialize)]
struct FragmentParse {
    #[serde(default)]
    body_text: Vec<Paragraph>,
}

#[derive(Debug, Deserialize)]
struct Paragraph {
    #[serde(default)]
    text: String,
}

/// Record source over one dump, optionally filtered against a reference dump.
///
/// Archive handles are released when the source is dropped.
#[derive(Debug)]
pub struct ArchiveRecordSource {
    descriptor: DumpDescriptor,
    fragments: Fragments,
    reference_ids: HashSet<String>,
}

impl ArchiveRecordSource {
    /// Open a dump, validating its manifest and indexing its archives.
    pub fn open(descriptor: &DumpDescriptor) -> Result<Self> {
        let manifest = descriptor.manifest_path();
        if !manifest.is_file() {
            return Err(AppError::missing_archive(manifest, "dump manifest not found"));
        }

        let fragments = Fragments::open(descriptor)?;
        match fragments.member_count() {
            Some(n) => log::info!(
                "Opened {} dump at {} ({n} fragments)",
                descriptor.format,
                descriptor.distrib_directory.display()
            ),
            None => log::info!(
                "Opened {} dump at {}",
                descriptor.format,
                descriptor.distrib_directory.display()
            ),
        }

        Ok(Self {
            descriptor: descriptor.clone(),
            fragments,
            reference_ids: HashSet::new(),
        })
    }

    /// Open a dump and skip every record already present in `reference`.
    pub fn open_delta(
        descriptor: &DumpDescriptor,
        reference: Option<&DumpDescriptor>,
    ) -> Result<Self> {
        let mut source = Self::open(descriptor)?;
        source.reference_ids = Self::load_reference_ids(reference)?;
        Ok(source)
    }

    /// Every ID listed in the reference dump's manifest, or the empty set if
    /// there is no reference.
    pub fn load_reference_ids(reference: Option<&DumpDescriptor>) -> Result<HashSet<String>> {
        let Some(reference) = reference else {
            return Ok(HashSet::new());
        };
        let path = reference.manifest_path();
        let file = File::open(&path).map_err(|e| AppError::reference_manifest(&path, e))?;

        let mut ids = HashSet::new();
        for row in csv::Reader::from_reader(file).into_deserialize::<ReferenceRow>() {
            let row = row.map_err(|e| AppError::reference_manifest(&path, e))?;
            ids.insert(row.cord_uid.trim().to_string());
        }
        log::info!(
            "Loaded {} reference IDs from {}",
            ids.len(),
            path.display()
        );
        Ok(ids)
    }

    pub fn descriptor(&self) -> &DumpDescriptor {
        &self.descriptor
    }

    pub fn reference_ids(&self) -> &HashSet<String> {
        &self.reference_ids
    }

    /// Stream records from the start of the manifest, skipping reference IDs.
    pub fn iterate(&self) -> Result<Records<'_>> {
        let path = self.descriptor.manifest_path();
        let file = File::open(&path).map_err(|e| AppError::missing_archive(&path, e))?;
        Ok(Records {
            rows: csv::Reader::from_reader(file).into_deserialize(),
            path,
            source: self,
        })
    }

    /// Paragraphs of every fragment named in `pointer`, in order.
    ///
    /// A fragment that is missing or unreadable is logged and skipped.
    pub fn resolve_full_text(&self, pointer: &str) -> Vec<String> {
        let mut paragraphs = Vec::new();
        for locator in layout::locators(pointer) {
            let bytes = match self.fragments.read_member(locator) {
                Ok(Some(bytes)) => bytes,
                Ok(None) => {
                    log::warn!("Full-text fragment {locator} not found");
                    continue;
                }
                Err(e) => {
                    log::warn!("Failed to read full-text fragment {locator}: {e}");
                    continue;
                }
            };
            match serde_json::from_slice::<FragmentParse>(&bytes) {
                Ok(parse) => paragraphs.extend(
                    parse
                        .body_text
                        .into_iter()
                        .map(|p| p.text.trim().to_string())
                        .filter(|text| !text.is_empty()),
                ),
                Err(e) => log::warn!("Malformed full-text fragment {locator}: {e}"),
            }
        }
        paragraphs
    }

    /// Release the archive handles.
    pub fn close(self) {
        log::debug!(
            "Closed dump at {}",
            self.descriptor.distrib_directory.display()
        );
    }
}

/// Lazy, forward-only record stream over a dump manifest.
pub struct Records<'a> {
    rows: csv::DeserializeRecordsIntoIter<File, ManifestRow>,
    path: PathBuf,
    source: &'a ArchiveRecordSource,
}

impl Iterator for Records<'_> {
    type Item = Result<SourceRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let row = match self.rows.next()? {
                Ok(row) => row,
                Err(e) => return Some(Err(AppError::metadata(&self.path, e))),
            };
            if self.source.reference_ids.contains(row.cord_uid.trim()) {
                continue;
            }
            return Some(Ok(row.into_record(self.source.descriptor.format)));
        }
    }
}
