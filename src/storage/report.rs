//! Per-dump extraction audit report.
//!
//! Stored as flat `(label, value)` CSV rows in `extraction_report.csv`:
//!
//! ```text
//! Extraction Timestamp,2020-04-12 09:30:00 +0000
//! Input Date,2020-04-10
//! ...
//! Snapshot Touch Count - 2020-04,1520
//! Date Resolution Count - Used as is,1433
//! ```
//!
//! Every write replaces the previous report; it reflects the latest run only.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};

use crate::error::{AppError, Result};
use crate::models::{DumpFormat, ResolutionStatus, SnapshotKey};
use crate::utils::log::RunLog;
use crate::utils::{table, thousands};

pub const REPORT_FILE: &str = "extraction_report.csv";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";
const TIMESTAMP_FORMAT_NO_TZ: &str = "%Y-%m-%d %H:%M:%S";

const TOUCH_PREFIX: &str = "Snapshot Touch Count - ";
const RESOLUTION_PREFIX: &str = "Date Resolution Count - ";

/// Outcome of one extraction pass over a dump.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionReport {
    pub extraction_timestamp: Option<DateTime<FixedOffset>>,
    pub input_date: Option<NaiveDate>,
    pub input_directory: Option<PathBuf>,
    pub input_format: Option<DumpFormat>,
    pub reference_directory: Option<PathBuf>,
    /// Records yielded by the (delta-filtered) dump
    pub identified_records: usize,
    pub number_with_abstract: usize,
    pub number_with_full_text: usize,
    pub number_with_both: usize,
    pub snapshot_touch_counts: BTreeMap<SnapshotKey, usize>,
    pub date_resolution_counts: BTreeMap<ResolutionStatus, usize>,
}

impl ExtractionReport {
    /// Location of the report inside `dir`.
    pub fn path(dir: &Path) -> PathBuf {
        dir.join(REPORT_FILE)
    }

    /// Count one document landing in `key`.
    pub fn touch(&mut self, key: SnapshotKey) {
        *self.snapshot_touch_counts.entry(key).or_default() += 1;
    }

    /// Count one date resolution outcome.
    pub fn count_resolution(&mut self, status: ResolutionStatus) {
        *self.date_resolution_counts.entry(status).or_default() += 1;
    }

    /// Read the report in `dir`, or None if none was written yet.
    ///
    /// Timestamps are accepted with or without a UTC offset; offset-less
    /// timestamps are taken as UTC. Unknown labels are ignored.
    pub fn read(dir: &Path) -> Result<Option<Self>> {
        let path = Self::path(dir);
        let Some(file) = table::open_optional(&path)? else {
            return Ok(None);
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(file);

        let mut report = Self::default();
        for record in reader.records() {
            let record = record.map_err(|e| AppError::metadata(&path, e))?;
            let label = record.get(0).unwrap_or_default().trim();
            let value = record.get(1).unwrap_or_default();
            report
                .apply_row(label, value)
                .map_err(|message| AppError::metadata(&path, message))?;
        }
        Ok(Some(report))
    }

    fn apply_row(&mut self, label: &str, value: &str) -> std::result::Result<(), String> {
        let count = |value: &str| {
            value
                .trim()
                .parse::<usize>()
                .map_err(|_| format!("'{label}' has non-numeric value '{value}'"))
        };
        let optional = |value: &str| {
            let value = value.trim();
            (!value.is_empty()).then(|| value.to_string())
        };

        match label {
            "Extraction Timestamp" => {
                self.extraction_timestamp = optional(value)
                    .map(|v| parse_timestamp(&v))
                    .transpose()?;
            }
            "Input Date" => {
                self.input_date = optional(value)
                    .map(|v| NaiveDate::parse_from_str(&v, "%Y-%m-%d"))
                    .transpose()
                    .map_err(|e| format!("bad input date '{value}': {e}"))?;
            }
            "Input Directory" => self.input_directory = optional(value).map(PathBuf::from),
            "Input Format" => {
                self.input_format = optional(value)
                    .map(|v| v.parse::<DumpFormat>())
                    .transpose()
                    .map_err(|e| e.to_string())?;
            }
            "Reference Directory" => self.reference_directory = optional(value).map(PathBuf::from),
            "Identified Records" => self.identified_records = count(value)?,
            "Number with Abstract" => self.number_with_abstract = count(value)?,
            "Number with Full Text" => self.number_with_full_text = count(value)?,
            "Number with Both" => self.number_with_both = count(value)?,
            _ => {
                if let Some(key) = label.strip_prefix(TOUCH_PREFIX) {
                    let key: SnapshotKey = key.parse().map_err(|e: AppError| e.to_string())?;
                    self.snapshot_touch_counts.insert(key, count(value)?);
                } else if let Some(status) = label.strip_prefix(RESOLUTION_PREFIX) {
                    let status: ResolutionStatus =
                        status.parse().map_err(|e: AppError| e.to_string())?;
                    self.date_resolution_counts.insert(status, count(value)?);
                } else {
                    log::debug!("Ignoring unknown report row '{label}'");
                }
            }
        }
        Ok(())
    }

    /// Write the report into `dir`, replacing any previous one.
    pub fn write(&self, dir: &Path) -> Result<PathBuf> {
        let path = Self::path(dir);
        let display = |p: &Option<PathBuf>| {
            p.as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        };

        let mut rows: Vec<(String, String)> = vec![
            (
                "Extraction Timestamp".into(),
                self.extraction_timestamp
                    .map(|t| t.format(TIMESTAMP_FORMAT).to_string())
                    .unwrap_or_default(),
            ),
            (
                "Input Date".into(),
                self.input_date.map(|d| d.to_string()).unwrap_or_default(),
            ),
            ("Input Directory".into(), display(&self.input_directory)),
            (
                "Input Format".into(),
                self.input_format.map(String::from).unwrap_or_default(),
            ),
            ("Reference Directory".into(), display(&self.reference_directory)),
            ("Identified Records".into(), self.identified_records.to_string()),
            ("Number with Abstract".into(), self.number_with_abstract.to_string()),
            ("Number with Full Text".into(), self.number_with_full_text.to_string()),
            ("Number with Both".into(), self.number_with_both.to_string()),
        ];
        rows.extend(
            self.snapshot_touch_counts
                .iter()
                .map(|(key, n)| (format!("{TOUCH_PREFIX}{key}"), n.to_string())),
        );
        rows.extend(
            self.date_resolution_counts
                .iter()
                .map(|(status, n)| (format!("{RESOLUTION_PREFIX}{status}"), n.to_string())),
        );

        table::write_atomic(&path, |out| {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(out);
            for (label, value) in &rows {
                writer.write_record([label, value])?;
            }
            writer.flush()?;
            Ok(())
        })?;
        Ok(path)
    }

    /// Write the touch and resolution histograms to a run log.
    pub fn render(&self, log: &mut dyn RunLog) {
        log.info("== SNAPSHOT TOUCH COUNT REPORT ==");
        for (key, n) in &self.snapshot_touch_counts {
            log.sub_item(&format!("{key} --> {} entries", thousands(*n)));
        }
        log.info("== PUBLICATION DATE RESOLUTION REPORT ==");
        for (status, n) in &self.date_resolution_counts {
            log.sub_item(&format!("{status} --> {} entries", thousands(*n)));
        }
    }
}

fn parse_timestamp(value: &str) -> std::result::Result<DateTime<FixedOffset>, String> {
    DateTime::parse_from_str(value.trim(), TIMESTAMP_FORMAT)
        .or_else(|_| {
            NaiveDateTime::parse_from_str(value.trim(), TIMESTAMP_FORMAT_NO_TZ)
                .map(|naive| naive.and_utc().fixed_offset())
        })
        .map_err(|e| format!("bad extraction timestamp '{value}': {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};
    use std::fs;
    use tempfile::TempDir;

    fn sample() -> ExtractionReport {
        let mut report = ExtractionReport {
            extraction_timestamp: Some(
                FixedOffset::east_opt(2 * 3600)
                    .unwrap()
                    .with_ymd_and_hms(2020, 4, 12, 9, 30, 0)
                    .unwrap(),
            ),
            input_date: NaiveDate::from_ymd_opt(2020, 4, 10),
            input_directory: Some(PathBuf::from("/dumps/2020-04-10")),
            input_format: Some(DumpFormat::Unified),
            reference_directory: None,
            identified_records: 5,
            number_with_abstract: 4,
            number_with_full_text: 2,
            number_with_both: 1,
            ..Default::default()
        };
        report.touch("2020-04".parse().unwrap());
        report.touch("2020-04".parse().unwrap());
        report.touch("2019-12".parse().unwrap());
        report.count_resolution(ResolutionStatus::UsedAsIs);
        report.count_resolution(ResolutionStatus::DateUnknown);
        report
    }

    #[test]
    fn test_read_missing_report() {
        let tmp = TempDir::new().unwrap();
        assert!(ExtractionReport::read(tmp.path()).unwrap().is_none());
    }

    #[test]
    fn test_write_and_read() {
        let tmp = TempDir::new().unwrap();
        let report = sample();
        let path = report.write(tmp.path()).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.starts_with("Extraction Timestamp,2020-04-12 09:30:00 +0200\n"));
        assert!(raw.contains("Reference Directory,\n"));
        assert!(raw.contains("Snapshot Touch Count - 2019-12,1\nSnapshot Touch Count - 2020-04,2\n"));
        assert!(raw.contains("Date Resolution Count - Used as is,1\n"));

        let loaded = ExtractionReport::read(tmp.path()).unwrap().unwrap();
        assert_eq!(loaded, report);
    }

    #[test]
    fn test_write_overwrites_previous_run() {
        let tmp = TempDir::new().unwrap();
        sample().write(tmp.path()).unwrap();

        let mut second = ExtractionReport::default();
        second.touch("2021-01".parse().unwrap());
        second.write(tmp.path()).unwrap();

        let loaded = ExtractionReport::read(tmp.path()).unwrap().unwrap();
        assert_eq!(loaded.snapshot_touch_counts.len(), 1);
        assert!(loaded.date_resolution_counts.is_empty());
    }

    #[test]
    fn test_empty_report_round_trips() {
        let tmp = TempDir::new().unwrap();
        let path = ExtractionReport::default().write(tmp.path()).unwrap();
        assert!(
            fs::read_to_string(path)
                .unwrap()
                .starts_with("Extraction Timestamp,\n")
        );

        let loaded = ExtractionReport::read(tmp.path()).unwrap().unwrap();
        assert_eq!(loaded, ExtractionReport::default());
    }

    #[test]
    fn test_read_accepts_naive_timestamp() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            ExtractionReport::path(tmp.path()),
            "Extraction Timestamp,2020-05-01 12:00:00 \n\
             Input Date,2020-04-10\n\
             Number with Both,3\n\
             Some Future Field,whatever\n",
        )
        .unwrap();

        let loaded = ExtractionReport::read(tmp.path()).unwrap().unwrap();
        let ts = loaded.extraction_timestamp.unwrap();
        assert_eq!(ts.offset().local_minus_utc(), 0);
        assert_eq!(ts.hour(), 12);
        assert_eq!(loaded.number_with_both, 3);
    }

    #[test]
    fn test_read_rejects_bad_count() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            ExtractionReport::path(tmp.path()),
            "Number with Abstract,many\n",
        )
        .unwrap();
        assert!(matches!(
            ExtractionReport::read(tmp.path()),
            Err(AppError::Metadata { .. })
        ));
    }
}
