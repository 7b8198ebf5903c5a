//! End-to-end runs: dumps on disk -> snapshot store -> compiled corpus.

use std::fs::{self, File};
use std::path::Path;

use chrono::NaiveDate;
use diachron::models::{Config, DumpDescriptor, DumpFormat, LoggingConfig, ResolutionStatus};
use diachron::pipeline::{CompileOutcome, CorpusCompiler, run_extract};
use diachron::storage::{ExtractionReport, SnapshotStore};
use diachron::utils::log::NullLog;
use flate2::Compression;
use flate2::write::GzEncoder;
use tempfile::TempDir;

const UNIFIED_HEADER: &str =
    "cord_uid,sha,source_x,title,abstract,publish_time,pmc_json_files,pdf_json_files\n";

fn fragment(paragraphs: &[&str]) -> Vec<u8> {
    let body: Vec<_> = paragraphs
        .iter()
        .map(|text| serde_json::json!({ "text": text }))
        .collect();
    serde_json::to_vec(&serde_json::json!({ "body_text": body })).unwrap()
}

fn write_unified_dump(dir: &Path, rows: &str, members: &[(&str, Vec<u8>)]) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join("metadata.csv"), format!("{UNIFIED_HEADER}{rows}")).unwrap();

    let file = File::create(dir.join("document_parses.tar.gz")).unwrap();
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    for (name, body) in members {
        let mut header = tar::Header::new_gnu();
        header.set_size(body.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, body.as_slice()).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap();
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn test_unified_delta_extraction_then_compile() {
    let tmp = TempDir::new().unwrap();
    let march = tmp.path().join("dumps/2020-03-27");
    let april = tmp.path().join("dumps/2020-04-10");

    write_unified_dump(
        &march,
        "A,sa,PMC,Title A,Abstract A.,2020-03-02,document_parses/pmc_json/PMCA.xml.json,\n\
         B,sb,PMC,Title B,Abstract B.,2020,,\n",
        &[("document_parses/pmc_json/PMCA.xml.json", fragment(&["A body."]))],
    );
    write_unified_dump(
        &april,
        "A,sa,PMC,Title A,Abstract A.,2020-03-02,document_parses/pmc_json/PMCA.xml.json,\n\
         B,sb,PMC,Title B,Abstract B.,2020,,\n\
         C,sc,Elsevier,Title C,,2020-04-01,,document_parses/pdf_json/sc.json\n\
         D,sd,Elsevier,\"Title, D\",\"Abstract, with comma.\",2022,,\n",
        &[(
            "document_parses/pdf_json/sc.json",
            fragment(&["C first.", "C second."]),
        )],
    );

    let march_dump = DumpDescriptor::new(&march, DumpFormat::Unified, date(2020, 3, 27));
    let mut april_dump = DumpDescriptor::new(&april, DumpFormat::Unified, date(2020, 4, 10));
    april_dump.root_directory = Some(tmp.path().join("reports/2020-04-10"));

    let store_root = tmp.path().join("store");
    let logging = LoggingConfig::default();

    let mut store = SnapshotStore::load(&store_root).unwrap();
    let first = run_extract(&march_dump, None, &mut store, &logging, &mut NullLog).unwrap();
    assert_eq!(first.identified_records, 2);
    assert_eq!(first.date_resolution_counts[&ResolutionStatus::MonthInferred], 1);

    let second = run_extract(
        &april_dump,
        Some(&march_dump),
        &mut store,
        &logging,
        &mut NullLog,
    )
    .unwrap();
    assert_eq!(second.identified_records, 2);
    assert_eq!(second.number_with_abstract, 1);
    assert_eq!(second.number_with_full_text, 1);
    assert_eq!(second.number_with_both, 0);
    assert_eq!(second.reference_directory.as_deref(), Some(march.as_path()));
    assert!(ExtractionReport::path(&tmp.path().join("reports/2020-04-10")).is_file());

    let mut store = SnapshotStore::load(&store_root).unwrap();
    let keys: Vec<String> = store.keys().map(|k| k.to_string()).collect();
    assert_eq!(keys, vec!["2020-03", "2020-04"]);

    let snapshot = store.snapshot("2020-04".parse().unwrap()).unwrap();
    let ids: Vec<&str> = snapshot.documents().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["C", "D"]);
    assert_eq!(
        snapshot.get("D").unwrap().resolution_status,
        ResolutionStatus::FuturePublication
    );
    assert_eq!(
        fs::read_to_string(snapshot.full_text_path("C")).unwrap(),
        "C first.\nC second.\n"
    );

    let compiler = CorpusCompiler::new(
        "spring",
        tmp.path().join("corpora"),
        vec!["2020-03".parse().unwrap(), "2020-04".parse().unwrap()],
        false,
    );
    assert_eq!(
        compiler.run(&mut store, &mut NullLog).unwrap(),
        CompileOutcome::Compiled { documents: 4 }
    );
    assert_eq!(
        fs::read_to_string(compiler.raw_corpus_path()).unwrap(),
        "Abstract A.\nA body.\nAbstract B.\nC first.\nC second.\nAbstract, with comma.\n"
    );
    assert_eq!(
        compiler.run(&mut store, &mut NullLog).unwrap(),
        CompileOutcome::Skipped
    );
}

#[test]
fn test_split_pdf_and_pmc_from_config() {
    let tmp = TempDir::new().unwrap();
    let dump = tmp.path().join("dumps/2020-03-13");
    fs::create_dir_all(dump.join("noncomm_use_subset/pmc_json")).unwrap();
    fs::create_dir_all(dump.join("noncomm_use_subset/pdf_json")).unwrap();
    fs::write(
        dump.join("metadata.csv"),
        "cord_uid,sha,abstract,publish_time,has_pdf_parse,has_pmc_xml_parse,full_text_file,pmcid\n\
         x1,h1,Abstract X1.,2019-11-20,True,True,noncomm_use_subset,PMC11\n\
         x2,h2,,2019-12,True,False,noncomm_use_subset,\n\
         x3,h3,,2019-12,True,False,noncomm_use_subset,\n",
    )
    .unwrap();
    fs::write(
        dump.join("noncomm_use_subset/pmc_json/PMC11.xml.json"),
        fragment(&["X1 from PMC."]),
    )
    .unwrap();
    fs::write(
        dump.join("noncomm_use_subset/pdf_json/h2.json"),
        fragment(&["X2 from PDF."]),
    )
    .unwrap();

    let config_path = tmp.path().join("diachron.toml");
    fs::write(
        &config_path,
        format!(
            r#"
[store]
root = "{store}"

[logging]
show_progress = false

[dumps.early]
distrib_directory = "{dump}"
format = "split_pdf_and_pmc"
dump_date = "2020-03-13"

[corpora.abstracts]
root_directory = "{corpora}"
snapshots = ["2019-11", "2019-12"]
abstracts_only = true
"#,
            store = tmp.path().join("store").display(),
            dump = dump.display(),
            corpora = tmp.path().join("corpora").display(),
        ),
    )
    .unwrap();

    let config = Config::load(&config_path).unwrap();
    config.validate().unwrap();

    let mut store = SnapshotStore::load(&config.store.root).unwrap();
    let report = run_extract(
        config.dump("early").unwrap(),
        config.reference_for("early").unwrap(),
        &mut store,
        &config.logging,
        &mut NullLog,
    )
    .unwrap();

    // x3's fragment is missing: it carries neither part and is not stored
    assert_eq!(report.identified_records, 3);
    assert_eq!(report.number_with_full_text, 2);
    assert_eq!(report.snapshot_touch_counts.len(), 2);
    assert!(!store
        .snapshot("2019-12".parse().unwrap())
        .unwrap()
        .contains("x3"));

    let compiler = CorpusCompiler::from_config("abstracts", config.corpus("abstracts").unwrap());
    assert_eq!(
        compiler.run(&mut store, &mut NullLog).unwrap(),
        CompileOutcome::Compiled { documents: 1 }
    );
    assert_eq!(
        fs::read_to_string(compiler.raw_corpus_path()).unwrap(),
        "Abstract X1.\n"
    );
}
