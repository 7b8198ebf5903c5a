//! Random-access readers for full-text fragment archives.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;

use crate::error::{AppError, Result};

/// Read access to named members of an archive.
pub trait FragmentArchive {
    /// Bytes of `member`, or None if the archive has no such member.
    fn read_member(&self, member: &str) -> Result<Option<Vec<u8>>>;
}

#[derive(Debug, Clone, Copy)]
struct MemberSpan {
    offset: u64,
    size: u64,
}

/// Index over the regular files of a tarball.
///
/// Compressed tarballs are inflated once into an anonymous temporary file;
/// member lookups are then a seek and a read.
#[derive(Debug)]
pub struct TarIndex {
    path: PathBuf,
    data: File,
    members: HashMap<String, MemberSpan>,
}

impl TarIndex {
    /// Open and index a `.tar` or `.tar.gz` file.
    pub fn open(path: &Path) -> Result<Self> {
        let source = File::open(path)
            .map_err(|e| AppError::missing_archive(path, e))?;

        let mut data = if is_gzip(path) {
            let mut spool = tempfile::tempfile()?;
            let mut decoder = GzDecoder::new(BufReader::new(source));
            io::copy(&mut decoder, &mut spool)?;
            spool
        } else {
            source
        };
        data.seek(SeekFrom::Start(0))?;

        let mut members = HashMap::new();
        let mut archive = tar::Archive::new(&data);
        for entry in archive.entries()? {
            let entry = entry?;
            if !entry.header().entry_type().is_file() {
                continue;
            }
            let name = normalize_member(&entry.path()?.to_string_lossy());
            members.insert(
                name,
                MemberSpan {
                    offset: entry.raw_file_position(),
                    size: entry.size(),
                },
            );
        }
        drop(archive);

        log::debug!("Indexed {} members in {}", members.len(), path.display());
        Ok(Self {
            path: path.to_path_buf(),
            data,
            members,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl FragmentArchive for TarIndex {
    fn read_member(&self, member: &str) -> Result<Option<Vec<u8>>> {
        let Some(span) = self.members.get(&normalize_member(member)).copied() else {
            return Ok(None);
        };
        let size = usize::try_from(span.size).map_err(|_| {
            AppError::validation(format!("member {member} is too large to read"))
        })?;

        let mut handle = &self.data;
        handle.seek(SeekFrom::Start(span.offset))?;
        let mut bytes = vec![0; size];
        handle.read_exact(&mut bytes)?;
        Ok(Some(bytes))
    }
}

/// Fragments stored as plain files below a directory.
#[derive(Debug, Clone)]
pub struct LooseFiles {
    root: PathBuf,
}

impl LooseFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl FragmentArchive for LooseFiles {
    fn read_member(&self, member: &str) -> Result<Option<Vec<u8>>> {
        match std::fs::read(self.root.join(normalize_member(member))) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}

/// Find `<dir>/<stem>.tar.gz`, falling back to `<dir>/<stem>.tar`.
pub fn locate_tarball(dir: &Path, stem: &str) -> Option<PathBuf> {
    [format!("{stem}.tar.gz"), format!("{stem}.tar")]
        .into_iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

fn is_gzip(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "gz")
}

fn normalize_member(name: &str) -> String {
    name.trim().trim_start_matches("./").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use tempfile::TempDir;

    fn append(builder: &mut tar::Builder<impl std::io::Write>, name: &str, body: &[u8]) {
        let mut header = tar::Header::new_gnu();
        header.set_size(body.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, body).unwrap();
    }

    #[test]
    fn test_index_gzipped_tarball() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("document_parses.tar.gz");
        let encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        append(&mut builder, "document_parses/pdf_json/aaa.json", b"{\"a\":1}");
        append(&mut builder, "document_parses/pmc_json/PMC1.xml.json", b"second member");
        builder.into_inner().unwrap().finish().unwrap();

        let index = TarIndex::open(&path).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(
            index
                .read_member("document_parses/pmc_json/PMC1.xml.json")
                .unwrap()
                .unwrap(),
            b"second member"
        );
        assert_eq!(
            index
                .read_member("./document_parses/pdf_json/aaa.json")
                .unwrap()
                .unwrap(),
            b"{\"a\":1}"
        );
        assert!(index.read_member("document_parses/missing.json").unwrap().is_none());
    }

    #[test]
    fn test_index_plain_tarball() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("comm_use_subset.tar");
        let mut builder = tar::Builder::new(File::create(&path).unwrap());
        append(&mut builder, "comm_use_subset/x.json", b"xyz");
        builder.finish().unwrap();

        let index = TarIndex::open(&path).unwrap();
        assert_eq!(index.read_member("comm_use_subset/x.json").unwrap().unwrap(), b"xyz");
    }

    #[test]
    fn test_missing_tarball() {
        let tmp = TempDir::new().unwrap();
        let err = TarIndex::open(&tmp.path().join("nope.tar.gz")).unwrap_err();
        assert!(matches!(err, AppError::MissingArchive { .. }));
    }

    #[test]
    fn test_locate_prefers_gzip() {
        let tmp = TempDir::new().unwrap();
        assert!(locate_tarball(tmp.path(), "document_parses").is_none());
        std::fs::write(tmp.path().join("document_parses.tar"), b"").unwrap();
        assert_eq!(
            locate_tarball(tmp.path(), "document_parses").unwrap(),
            tmp.path().join("document_parses.tar")
        );
        std::fs::write(tmp.path().join("document_parses.tar.gz"), b"").unwrap();
        assert_eq!(
            locate_tarball(tmp.path(), "document_parses").unwrap(),
            tmp.path().join("document_parses.tar.gz")
        );
    }

    #[test]
    fn test_loose_files() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("custom_license/pdf_json")).unwrap();
        std::fs::write(tmp.path().join("custom_license/pdf_json/s1.json"), b"{}").unwrap();

        let files = LooseFiles::new(tmp.path());
        assert_eq!(
            files.read_member("custom_license/pdf_json/s1.json").unwrap().unwrap(),
            b"{}"
        );
        assert!(files.read_member("custom_license/pdf_json/s2.json").unwrap().is_none());
    }
}
