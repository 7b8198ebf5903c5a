//! Dump descriptors and the source records read from them.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Name of the per-dump manifest listing every record.
pub const DUMP_MANIFEST: &str = "metadata.csv";

/// Physical layout of a dump's full-text fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DumpFormat {
    /// Per-license tarballs holding PDF parses only
    SplitPdfOnly,
    /// Per-license directories (already unpacked) holding PDF and PMC parses
    SplitPdfAndPmc,
    /// A single `document_parses` tarball
    Unified,
}

impl DumpFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DumpFormat::SplitPdfOnly => "split_pdf_only",
            DumpFormat::SplitPdfAndPmc => "split_pdf_and_pmc",
            DumpFormat::Unified => "unified",
        }
    }
}

impl fmt::Display for DumpFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DumpFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "split_pdf_only" => Ok(DumpFormat::SplitPdfOnly),
            "split_pdf_and_pmc" => Ok(DumpFormat::SplitPdfAndPmc),
            "unified" => Ok(DumpFormat::Unified),
            _ => Err(AppError::config(format!(
                "Unrecognized dump format '{s}' (expected split_pdf_only, split_pdf_and_pmc or unified)"
            ))),
        }
    }
}

impl TryFrom<String> for DumpFormat {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DumpFormat> for String {
    fn from(format: DumpFormat) -> Self {
        format.as_str().to_string()
    }
}

/// Configuration of one dated distribution dump.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DumpDescriptor {
    /// Directory holding the dump manifest and its archives
    pub distrib_directory: PathBuf,

    /// Physical layout of the full-text fragments
    pub format: DumpFormat,

    /// Release date of the dump (`YYYY-MM-DD`)
    pub dump_date: NaiveDate,

    /// Name of a previously processed dump whose records are skipped
    #[serde(default)]
    pub reference_dump: Option<String>,

    /// Directory receiving the extraction report (defaults to `distrib_directory`)
    #[serde(default)]
    pub root_directory: Option<PathBuf>,
}

impl DumpDescriptor {
    pub fn new(distrib_directory: impl Into<PathBuf>, format: DumpFormat, dump_date: NaiveDate) -> Self {
        Self {
            distrib_directory: distrib_directory.into(),
            format,
            dump_date,
            reference_dump: None,
            root_directory: None,
        }
    }

    /// Path of the dump manifest.
    pub fn manifest_path(&self) -> PathBuf {
        self.distrib_directory.join(DUMP_MANIFEST)
    }

    /// Directory the extraction report is written to.
    pub fn report_directory(&self) -> &Path {
        self.root_directory
            .as_deref()
            .unwrap_or(&self.distrib_directory)
    }
}

/// One record streamed out of a dump manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRecord {
    /// External identifier, stable across dumps
    pub id: String,

    /// Abstract text, trimmed (may be empty)
    pub abstract_text: String,

    /// Semicolon-delimited fragment locators, if the record has full text
    pub full_text_pointer: Option<String>,

    /// Raw publication date string
    pub publication_date: String,
}

impl SourceRecord {
    pub fn has_abstract(&self) -> bool {
        !self.abstract_text.is_empty()
    }
}
