//! Dump manifest rows and per-format full-text pointer rules.

use serde::Deserialize;

use crate::models::{DumpFormat, SourceRecord};

/// Archive stem of the unified layout.
pub const DOCUMENT_PARSES: &str = "document_parses";

/// License subsets of the split PDF-only layout, one tarball each.
pub const LICENSE_SUBSETS: [&str; 4] = [
    "comm_use_subset",
    "noncomm_use_subset",
    "custom_license",
    "biorxiv_medrxiv",
];

/// The dump manifest columns we use. Columns missing from older dumps
/// default to empty.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ManifestRow {
    pub cord_uid: String,
    #[serde(rename = "abstract", default)]
    pub abstract_text: String,
    #[serde(default)]
    pub publish_time: String,
    #[serde(default)]
    pub pmc_json_files: String,
    #[serde(default)]
    pub pdf_json_files: String,
    #[serde(default)]
    pub has_pmc_xml_parse: String,
    #[serde(default)]
    pub has_pdf_parse: String,
    #[serde(default)]
    pub has_full_text: String,
    #[serde(default)]
    pub full_text_file: String,
    #[serde(default)]
    pub sha: String,
    #[serde(default)]
    pub pmcid: String,
}

/// Only the ID column of a reference manifest.
#[derive(Debug, Deserialize)]
pub(crate) struct ReferenceRow {
    pub cord_uid: String,
}

impl ManifestRow {
    pub fn into_record(self, format: DumpFormat) -> SourceRecord {
        let full_text_pointer = full_text_pointer(format, &self);
        SourceRecord {
            id: self.cord_uid.trim().to_string(),
            abstract_text: self.abstract_text.trim().to_string(),
            full_text_pointer,
            publication_date: self.publish_time.trim().to_string(),
        }
    }
}

/// Derive the fragment locator(s) for a manifest row.
pub(crate) fn full_text_pointer(format: DumpFormat, row: &ManifestRow) -> Option<String> {
    let subset = row.full_text_file.trim();
    match format {
        DumpFormat::Unified => [&row.pmc_json_files, &row.pdf_json_files]
            .into_iter()
            .map(|files| files.trim())
            .find(|files| !files.is_empty())
            .map(str::to_string),
        DumpFormat::SplitPdfAndPmc => {
            if subset.is_empty() {
                return None;
            }
            let pmcid = row.pmcid.trim();
            if is_true(&row.has_pmc_xml_parse) && !pmcid.is_empty() {
                return Some(format!("{subset}/pmc_json/{pmcid}.xml.json"));
            }
            let sha = first_sha(&row.sha)?;
            is_true(&row.has_pdf_parse).then(|| format!("{subset}/pdf_json/{sha}.json"))
        }
        DumpFormat::SplitPdfOnly => {
            if subset.is_empty() || !is_true(&row.has_full_text) {
                return None;
            }
            first_sha(&row.sha).map(|sha| format!("{subset}/{sha}.json"))
        }
    }
}

/// Split a pointer into its non-empty locators.
pub fn locators(pointer: &str) -> impl Iterator<Item = &str> {
    pointer.split(';').map(str::trim).filter(|part| !part.is_empty())
}

fn first_sha(sha: &str) -> Option<&str> {
    locators(sha).next()
}

fn is_true(flag: &str) -> bool {
    flag.trim().eq_ignore_ascii_case("true")
}
