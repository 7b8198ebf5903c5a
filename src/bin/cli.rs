//! Diachron CLI
//!
//! Extracts literature dumps into monthly snapshots and compiles corpora
//! from them.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use diachron::{
    error::Result,
    models::Config,
    pipeline::{self, CompileOutcome, CorpusCompiler},
    storage::{ExtractionReport, SnapshotStore},
    utils::{
        log::{ConsoleLog, RunLog},
        thousands,
    },
};

/// Diachron - monthly literature snapshots
#[derive(Parser, Debug)]
#[command(
    name = "diachron",
    version,
    about = "Diachronic literature snapshot pipeline"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "diachron.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract a configured dump into the snapshot store
    Extract {
        /// Dump name from the configuration
        dump: String,
    },

    /// Compile corpora from the snapshot store
    Compile {
        /// Corpus labels from the configuration
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        corpora: Vec<String>,

        /// Compile every configured corpus
        #[arg(long)]
        all: bool,
    },

    /// Validate the configuration file
    Validate,

    /// Show snapshot and extraction report info
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Build the run log, tee'd to `<log_dir>/<name>.log` when configured.
fn run_log(config: &Config, name: &str) -> Result<ConsoleLog> {
    let log = ConsoleLog::new(&config.logging.level);
    match &config.logging.log_dir {
        Some(dir) => log.with_file(&dir.join(format!("{name}.log"))),
        None => Ok(log),
    }
}

/// Main entry point for the CLI application.
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load(&cli.config)?;
    log::info!("Loaded configuration from {}", cli.config.display());

    match cli.command {
        Command::Extract { dump } => {
            config.validate()?;
            let descriptor = config.dump(&dump)?;
            let reference = config.reference_for(&dump)?;
            let mut store = SnapshotStore::load(&config.store.root)?;

            let mut log = run_log(&config, &format!("extract-{dump}"))?;
            log.start(
                &format!("Extracting dump '{dump}'"),
                &[
                    ("Directory", descriptor.distrib_directory.display().to_string()),
                    ("Format", descriptor.format.to_string()),
                    ("Dump date", descriptor.dump_date.to_string()),
                    (
                        "Reference",
                        descriptor.reference_dump.clone().unwrap_or_else(|| "-".into()),
                    ),
                    ("Store", config.store.root.display().to_string()),
                ],
            );
            let result = pipeline::run_extract(
                descriptor,
                reference,
                &mut store,
                &config.logging,
                &mut log,
            );
            log.stop();
            result?;
        }

        Command::Compile { corpora, all } => {
            config.validate()?;
            let labels: Vec<String> = if all {
                config.corpora.keys().cloned().collect()
            } else {
                corpora
            };
            if labels.is_empty() {
                log::warn!("No corpora configured");
                return Ok(());
            }

            let compilers = labels
                .iter()
                .map(|label| Ok(CorpusCompiler::from_config(label, config.corpus(label)?)))
                .collect::<Result<Vec<_>>>()?;
            let mut store = SnapshotStore::load(&config.store.root)?;

            let mut log = run_log(&config, "compile")?;
            log.start(
                "Compiling corpora",
                &[
                    ("Corpora", labels.join(", ")),
                    ("Store", config.store.root.display().to_string()),
                ],
            );
            let mut result = Ok(());
            for compiler in &compilers {
                match compiler.run(&mut store, &mut log) {
                    Ok(CompileOutcome::Skipped) => {}
                    Ok(CompileOutcome::Compiled { documents }) => log.info(&format!(
                        "Compiled '{}' with {} documents",
                        compiler.label(),
                        thousands(documents)
                    )),
                    Err(e) => {
                        result = Err(e);
                        break;
                    }
                }
            }
            log.stop();
            result?;
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!(
                "✓ Config OK ({} dumps, {} corpora)",
                config.dumps.len(),
                config.corpora.len()
            );
        }

        Command::Info => {
            log::info!("Snapshot store: {}", config.store.root.display());
            let mut store = SnapshotStore::load(&config.store.root)?;
            if store.is_empty() {
                log::info!("No snapshots yet.");
            }
            let keys: Vec<_> = store.keys().collect();
            for key in keys {
                if let Some(snapshot) = store.get(key)? {
                    log::info!("  {key}: {} documents", thousands(snapshot.len()));
                }
            }

            for (name, dump) in &config.dumps {
                match ExtractionReport::read(dump.report_directory())? {
                    Some(report) => log::info!(
                        "Dump '{name}': extracted {} ({} records, {} snapshots touched)",
                        report
                            .extraction_timestamp
                            .map(|t| t.to_string())
                            .unwrap_or_else(|| "-".into()),
                        thousands(report.identified_records),
                        report.snapshot_touch_counts.len()
                    ),
                    None => log::info!("Dump '{name}': not extracted yet"),
                }
            }
        }
    }

    log::info!("Done!");

    Ok(())
}
