// src/pipeline/resolve.rs

//! Publication date resolution.
//!
//! Maps a record's raw publication date onto the monthly snapshot it belongs
//! to, anchored to the date of the dump that produced it. The resolved key is
//! never later than the dump month.

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;

use crate::models::{ResolutionStatus, SnapshotKey};

/// Leading four-digit year, optionally followed by `-M` or `-MM`.
static DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})(?:-(\d{1,2})(?:\D|$))?").expect("valid date pattern"));

/// Outcome of resolving one publication date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// Snapshot the record belongs to; None when the date is unusable
    pub key: Option<SnapshotKey>,
    pub status: ResolutionStatus,
}

impl Resolution {
    fn new(key: SnapshotKey, status: ResolutionStatus) -> Self {
        Self {
            key: Some(key),
            status,
        }
    }

    fn unknown() -> Self {
        Self {
            key: None,
            status: ResolutionStatus::DateUnknown,
        }
    }
}

/// Year and (if present) month parsed from a raw date string.
fn parse_raw_date(raw_date: &str) -> Option<(i32, Option<u32>)> {
    let caps = DATE_PATTERN.captures(raw_date.trim())?;
    let year: i32 = caps.get(1)?.as_str().parse().ok()?;
    let month = caps
        .get(2)
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .filter(|m| (1..=12).contains(m));
    Some((year, month))
}

/// Resolve the snapshot for a publication date relative to the dump date.
pub fn resolve(raw_date: &str, dump_date: NaiveDate) -> Resolution {
    let Some((year, month)) = parse_raw_date(raw_date) else {
        return Resolution::unknown();
    };
    let dump_key = SnapshotKey::of_date(dump_date);

    if year > dump_date.year() {
        return Resolution::new(dump_key, ResolutionStatus::FuturePublication);
    }

    match month {
        Some(month) if year == dump_date.year() && month > dump_date.month() => {
            Resolution::new(dump_key, ResolutionStatus::FuturePublication)
        }
        Some(month) => match SnapshotKey::new(year, month) {
            Some(key) => Resolution::new(key, ResolutionStatus::UsedAsIs),
            None => Resolution::unknown(),
        },
        None if year == dump_date.year() => {
            Resolution::new(dump_key, ResolutionStatus::MonthInferred)
        }
        None => Resolution::unknown(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dump() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 4, 10).unwrap()
    }

    fn check(raw: &str, expected_key: Option<&str>, expected_status: ResolutionStatus) {
        let resolution = resolve(raw, dump());
        assert_eq!(
            resolution.key.map(|k| k.to_string()).as_deref(),
            expected_key,
            "key for {raw:?}"
        );
        assert_eq!(resolution.status, expected_status, "status for {raw:?}");
    }

    #[test]
    fn test_full_date_used_as_is() {
        check("2020-04", Some("2020-04"), ResolutionStatus::UsedAsIs);
        check("2020-03-15", Some("2020-03"), ResolutionStatus::UsedAsIs);
        check("2019-11-02", Some("2019-11"), ResolutionStatus::UsedAsIs);
    }

    #[test]
    fn test_year_only_same_year_infers_month() {
        check("2020", Some("2020-04"), ResolutionStatus::MonthInferred);
    }

    #[test]
    fn test_year_only_other_year_is_unknown() {
        check("2019", None, ResolutionStatus::DateUnknown);
    }

    #[test]
    fn test_future_year_clamps_to_dump() {
        check("2021-01", Some("2020-04"), ResolutionStatus::FuturePublication);
        check("2021", Some("2020-04"), ResolutionStatus::FuturePublication);
    }

    #[test]
    fn test_future_month_clamps_to_dump() {
        check("2020-05", Some("2020-04"), ResolutionStatus::FuturePublication);
        check("2020-12-31", Some("2020-04"), ResolutionStatus::FuturePublication);
    }

    #[test]
    fn test_unparseable_dates_are_unknown() {
        check("", None, ResolutionStatus::DateUnknown);
        check("   ", None, ResolutionStatus::DateUnknown);
        check("unknown", None, ResolutionStatus::DateUnknown);
        check("20-04", None, ResolutionStatus::DateUnknown);
    }

    #[test]
    fn test_out_of_range_month_counts_as_year_only() {
        check("2020-13", Some("2020-04"), ResolutionStatus::MonthInferred);
        check("2020 Apr 10", Some("2020-04"), ResolutionStatus::MonthInferred);
    }

    #[test]
    fn test_single_digit_month_is_padded() {
        check("2020-3-1", Some("2020-03"), ResolutionStatus::UsedAsIs);
    }

    #[test]
    fn test_resolve_is_deterministic() {
        for raw in ["2020-04", "2020", "2021-01", "", "2020-05", "garbage"] {
            assert_eq!(resolve(raw, dump()), resolve(raw, dump()));
        }
    }
}
