// src/models/mod.rs

//! Domain models shared by the extraction and compilation pipelines.

mod config;
mod corpus;
mod dump;
mod snapshot;

// Re-export all public types
pub use config::{Config, CorpusConfig, LoggingConfig, StoreConfig};
pub use corpus::{CorpusManifest, CorpusManifestEntry};
pub use dump::{DUMP_MANIFEST, DumpDescriptor, DumpFormat, SourceRecord};
pub use snapshot::{ResolutionStatus, SnapshotDocument, SnapshotKey};
