//! Snapshot keys, date resolution statuses and snapshot documents.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Identifier of one monthly snapshot, rendered as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SnapshotKey {
    year: i32,
    month: u32,
}

impl SnapshotKey {
    /// Build a key, rejecting months outside 1..=12.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12)
            .contains(&month)
            .then_some(Self { year, month })
    }

    /// Key of the month containing `date`.
    pub fn of_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }
}

impl fmt::Display for SnapshotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for SnapshotKey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AppError::validation(format!("Invalid snapshot key '{s}', expected YYYY-MM"));

        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Self::new(year, month).ok_or_else(invalid)
    }
}

impl TryFrom<String> for SnapshotKey {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SnapshotKey> for String {
    fn from(key: SnapshotKey) -> Self {
        key.to_string()
    }
}

/// How a record's publication date was mapped onto a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ResolutionStatus {
    /// Publication year and month were used unchanged
    UsedAsIs,
    /// Year matched the dump year; month taken from the dump date
    MonthInferred,
    /// Publication date lies after the dump date; clamped to the dump month
    FuturePublication,
    /// No usable date; the record is not assigned to any snapshot
    DateUnknown,
}

impl ResolutionStatus {
    pub const ALL: [ResolutionStatus; 4] = [
        ResolutionStatus::UsedAsIs,
        ResolutionStatus::MonthInferred,
        ResolutionStatus::FuturePublication,
        ResolutionStatus::DateUnknown,
    ];

    /// Persisted label.
    pub fn label(&self) -> &'static str {
        match self {
            ResolutionStatus::UsedAsIs => "Used as is",
            ResolutionStatus::MonthInferred => "Month inferred",
            ResolutionStatus::FuturePublication => "Future publication",
            ResolutionStatus::DateUnknown => "Date unknown",
        }
    }
}

impl fmt::Display for ResolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ResolutionStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.label().eq_ignore_ascii_case(needle))
            .ok_or_else(|| AppError::validation(format!("Unknown date resolution status '{s}'")))
    }
}

impl TryFrom<String> for ResolutionStatus {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ResolutionStatus> for String {
    fn from(status: ResolutionStatus) -> Self {
        status.label().to_string()
    }
}

/// One document held by a snapshot.
///
/// Blob locations are not part of the document; they are derived from the
/// ID and the owning snapshot's root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotDocument {
    pub id: String,
    pub dump_date: NaiveDate,
    /// Raw publication date as found in the dump manifest
    pub publication_date: String,
    pub resolution_status: ResolutionStatus,
    pub has_abstract: bool,
    pub has_full_text: bool,
}
