//! Extraction of one dump into the snapshot store.

use chrono::{Local, SubsecRound};

use crate::error::Result;
use crate::models::{DumpDescriptor, LoggingConfig, ResolutionStatus, SnapshotDocument};
use crate::pipeline::resolve::resolve;
use crate::source::ArchiveRecordSource;
use crate::storage::{ExtractionReport, SnapshotStore};
use crate::utils::log::RunLog;
use crate::utils::thousands;

/// Running per-record counters shown while a dump is processed.
#[derive(Debug, Default)]
struct Status {
    abstracts: usize,
    full_texts: usize,
    both: usize,
    neither: usize,
}

impl Status {
    fn render(&self) -> String {
        format!(
            "Abstracts: {} Both: {} Full texts: {} Neither: {}",
            thousands(self.abstracts),
            thousands(self.both),
            thousands(self.full_texts),
            thousands(self.neither)
        )
    }
}

/// Extract every new record of a dump into the snapshot store.
///
/// Records already listed in `reference` are skipped. Holds the store lock
/// for the whole run; staged snapshot metadata is committed once the dump has
/// been read to the end, then the extraction report is written.
pub fn run_extract(
    descriptor: &DumpDescriptor,
    reference: Option<&DumpDescriptor>,
    store: &mut SnapshotStore,
    logging: &LoggingConfig,
    log: &mut dyn RunLog,
) -> Result<ExtractionReport> {
    let _lock = store.lock()?;

    log.step(1, 4, &format!(
        "Loading dump from {}",
        descriptor.distrib_directory.display()
    ));
    let source = ArchiveRecordSource::open_delta(descriptor, reference)?;
    if let Some(reference) = reference {
        log.sub_item(&format!(
            "Skipping {} records already in {}",
            thousands(source.reference_ids().len()),
            reference.distrib_directory.display()
        ));
    }

    let mut report = ExtractionReport {
        extraction_timestamp: Some(Local::now().fixed_offset().trunc_subsecs(0)),
        input_date: Some(descriptor.dump_date),
        input_directory: Some(descriptor.distrib_directory.clone()),
        input_format: Some(descriptor.format),
        reference_directory: reference.map(|r| r.distrib_directory.clone()),
        ..Default::default()
    };
    let mut status = Status::default();
    let interval = logging.progress_interval.max(1);

    log.step(2, 4, "Extracting records");
    for record in source.iterate()? {
        let record = record?;
        report.identified_records += 1;

        let full_text = record
            .full_text_pointer
            .as_deref()
            .map(|pointer| source.resolve_full_text(pointer))
            .unwrap_or_default();
        let has_abstract = record.has_abstract();
        let has_full_text = !full_text.is_empty();

        if has_abstract || has_full_text {
            let resolution = resolve(&record.publication_date, descriptor.dump_date);
            report.count_resolution(resolution.status);

            if let Some(key) = resolution.key {
                let snapshot = store.get_or_create(key)?;
                if has_abstract {
                    snapshot.write_abstract(&record.id, &record.abstract_text)?;
                    status.abstracts += 1;
                }
                if has_full_text {
                    snapshot.write_full_text(&record.id, &full_text)?;
                    status.full_texts += 1;
                }
                if has_abstract && has_full_text {
                    status.both += 1;
                }
                snapshot.stage(SnapshotDocument {
                    id: record.id,
                    dump_date: descriptor.dump_date,
                    publication_date: record.publication_date,
                    resolution_status: resolution.status,
                    has_abstract,
                    has_full_text,
                });
                report.touch(key);
            } else {
                debug_assert_eq!(resolution.status, ResolutionStatus::DateUnknown);
                log::debug!(
                    "Skipping {}: unusable publication date '{}'",
                    record.id,
                    record.publication_date
                );
            }
        } else {
            status.neither += 1;
        }

        if logging.show_progress && report.identified_records % interval == 0 {
            log.sub_item(&format!(
                "Processed {} new records (Status -- {})",
                thousands(report.identified_records),
                status.render()
            ));
        }
    }
    source.close();
    log.sub_item(&format!(
        "Processed {} new records (Status -- {})",
        thousands(report.identified_records),
        status.render()
    ));

    report.number_with_abstract = status.abstracts;
    report.number_with_full_text = status.full_texts;
    report.number_with_both = status.both;

    log.step(3, 4, "Committing snapshot metadata");
    let written = store.commit()?;
    log.sub_item(&format!("{} snapshots updated", written.len()));

    log.step(4, 4, "Writing extraction report");
    let report_path = report.write(descriptor.report_directory())?;
    report.render(log);

    log.summary(
        "Extraction",
        &[
            ("Records".into(), thousands(report.identified_records)),
            (
                "Snapshots touched".into(),
                report.snapshot_touch_counts.len().to_string(),
            ),
            ("Report".into(), report_path.display().to_string()),
        ],
    );

    Ok(report)
}
