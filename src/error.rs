// src/error.rs

//! Unified error handling for extraction and compilation.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type alias for diachron operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reading/writing failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// A dump manifest or archive required by the dump format is absent
    #[error("Missing archive {}: {message}", path.display())]
    MissingArchive { path: PathBuf, message: String },

    /// The configured reference dump manifest could not be read
    #[error("Reference manifest {} unreadable: {message}", path.display())]
    ReferenceManifest { path: PathBuf, message: String },

    /// A persisted metadata file is malformed
    #[error("Corrupt metadata in {}: {message}", path.display())]
    Metadata { path: PathBuf, message: String },

    /// A corpus manifest entry points at a blob that does not exist
    #[error("Missing blob for document {id}: {}", path.display())]
    MissingBlob { id: String, path: PathBuf },

    /// A snapshot key was requested that the store does not hold
    #[error("Unknown snapshot: {0}")]
    UnknownSnapshot(String),

    /// Another process holds the snapshot store lock
    #[error("Snapshot store at {} is locked by another process", .0.display())]
    StoreLocked(PathBuf),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a missing-archive error.
    pub fn missing_archive(path: impl AsRef<Path>, message: impl fmt::Display) -> Self {
        Self::MissingArchive {
            path: path.as_ref().to_path_buf(),
            message: message.to_string(),
        }
    }

    /// Create an unreadable-reference-manifest error.
    pub fn reference_manifest(path: impl AsRef<Path>, message: impl fmt::Display) -> Self {
        Self::ReferenceManifest {
            path: path.as_ref().to_path_buf(),
            message: message.to_string(),
        }
    }

    /// Create a corrupt-metadata error for the given file.
    pub fn metadata(path: impl AsRef<Path>, message: impl fmt::Display) -> Self {
        Self::Metadata {
            path: path.as_ref().to_path_buf(),
            message: message.to_string(),
        }
    }

    /// Create a missing-blob error.
    pub fn missing_blob(id: impl Into<String>, path: impl AsRef<Path>) -> Self {
        Self::MissingBlob {
            id: id.into(),
            path: path.as_ref().to_path_buf(),
        }
    }
}
