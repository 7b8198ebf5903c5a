//! Application configuration structures.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{DumpDescriptor, SnapshotKey};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Snapshot store location
    #[serde(default)]
    pub store: StoreConfig,

    /// Run log settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Known dumps, by name
    #[serde(default)]
    pub dumps: BTreeMap<String, DumpDescriptor>,

    /// Corpora to compile, by label
    #[serde(default)]
    pub corpora: BTreeMap<String, CorpusConfig>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.store.root.as_os_str().is_empty() {
            return Err(AppError::validation("store.root is empty"));
        }
        if self.logging.progress_interval == 0 {
            return Err(AppError::validation(
                "logging.progress_interval must be > 0",
            ));
        }
        for name in self.dumps.keys() {
            self.reference_for(name)?;
        }
        for (label, corpus) in &self.corpora {
            if corpus.root_directory.as_os_str().is_empty() {
                return Err(AppError::validation(format!(
                    "corpora.{label}.root_directory is empty"
                )));
            }
            if corpus.snapshots.is_empty() {
                return Err(AppError::validation(format!(
                    "corpora.{label}.snapshots is empty"
                )));
            }
        }
        Ok(())
    }

    /// Look up a dump by name.
    pub fn dump(&self, name: &str) -> Result<&DumpDescriptor> {
        self.dumps
            .get(name)
            .ok_or_else(|| AppError::config(format!("No dump named '{name}' is configured")))
    }

    /// Resolve the reference dump configured for `name`, if any.
    pub fn reference_for(&self, name: &str) -> Result<Option<&DumpDescriptor>> {
        let dump = self.dump(name)?;
        match dump.reference_dump.as_deref() {
            None => Ok(None),
            Some(reference) if reference == name => Err(AppError::config(format!(
                "Dump '{name}' cannot reference itself"
            ))),
            Some(reference) => self.dumps.get(reference).map(Some).ok_or_else(|| {
                AppError::config(format!(
                    "Dump '{name}' references unknown dump '{reference}'"
                ))
            }),
        }
    }

    /// Look up a corpus by label.
    pub fn corpus(&self, label: &str) -> Result<&CorpusConfig> {
        self.corpora
            .get(label)
            .ok_or_else(|| AppError::config(format!("No corpus labelled '{label}' is configured")))
    }
}

/// Snapshot store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Root directory holding `collection_metadata.csv` and one directory per snapshot
    #[serde(default = "defaults::store_root")]
    pub root: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: defaults::store_root(),
        }
    }
}

/// Run log settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum level shown on the console (debug, info, warn, error)
    #[serde(default = "defaults::level")]
    pub level: String,

    /// Directory receiving a copy of each run log
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Emit running progress lines
    #[serde(default = "defaults::show_progress")]
    pub show_progress: bool,

    /// Records between two progress lines
    #[serde(default = "defaults::progress_interval")]
    pub progress_interval: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::level(),
            log_dir: None,
            show_progress: defaults::show_progress(),
            progress_interval: defaults::progress_interval(),
        }
    }
}

/// One corpus to compile from an ordered list of snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// Directory receiving `<label>.raw_corpus.txt` and `<label>.metadata.csv`
    pub root_directory: PathBuf,

    /// Snapshots to draw documents from, in corpus order
    pub snapshots: Vec<SnapshotKey>,

    /// Leave full texts out of the corpus
    #[serde(default)]
    pub abstracts_only: bool,
}

mod defaults {
    use std::path::PathBuf;

    pub fn store_root() -> PathBuf {
        PathBuf::from("data/snapshots")
    }

    pub fn level() -> String {
        "info".into()
    }

    pub fn show_progress() -> bool {
        true
    }

    pub fn progress_interval() -> usize {
        1000
    }
}
