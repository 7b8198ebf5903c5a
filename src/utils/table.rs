//! CSV table helpers shared by every persisted file.
//!
//! Reads treat a missing file as `None`; writes go to a `.tmp` sibling first
//! and are renamed into place once fully flushed.

use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{AppError, Result};

/// Open a file for reading, returning None if it doesn't exist.
pub fn open_optional(path: &Path) -> Result<Option<File>> {
    match File::open(path) {
        Ok(file) => Ok(Some(file)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(AppError::Io(e)),
    }
}

/// Read every row of a headed CSV file.
///
/// Any malformed row aborts the read with a [`AppError::Metadata`] naming the file.
pub fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Option<Vec<T>>> {
    let Some(file) = open_optional(path)? else {
        return Ok(None);
    };

    let mut reader = csv::Reader::from_reader(file);
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row.map_err(|e| AppError::metadata(path, e))?);
    }
    Ok(Some(rows))
}

/// Write rows as a headed CSV file, replacing any previous content.
pub fn write_rows<T, I>(path: &Path, rows: I) -> Result<()>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    write_atomic(path, |out| {
        let mut writer = csv::Writer::from_writer(out);
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    })
}

/// Write a file atomically (write to temp, then rename).
pub fn write_atomic<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp = tmp_path(path);
    let mut out = BufWriter::new(File::create(&tmp)?);
    let written = write(&mut out).and_then(|()| out.flush().map_err(AppError::from));
    drop(out);
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }

    fs::rename(&tmp, path)?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Booleans encoded as `True` / `False`, read case-insensitively.
pub mod title_bool {
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(if *value { "True" } else { "False" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match raw.trim() {
            v if v.eq_ignore_ascii_case("true") => Ok(true),
            v if v.eq_ignore_ascii_case("false") => Ok(false),
            other => Err(de::Error::custom(format!("expected True/False, found '{other}'"))),
        }
    }
}
