//! Test fixtures for building result archives on disk.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use bzip2::write::BzEncoder;
use flate2::write::GzEncoder;
use tempfile::TempDir;
use xz2::write::XzEncoder;

/// Heartbeat JSON with `files` double-encoded in the `xml` field.
pub(crate) fn heartbeat_json(files: &[&str]) -> Vec<u8> {
    let xml = serde_json::to_string(files).unwrap();
    serde_json::json!({ "xml": xml }).to_string().into_bytes()
}

struct FixtureEntry {
    name: String,
    data: Vec<u8>,
    raw_name: bool,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum FixtureCompression {
    None,
    Gzip,
    Bzip2,
    Xz,
}

/// Builder for a result archive written to a temporary directory.
pub(crate) struct ArchiveFixture {
    file_name: String,
    entries: Vec<FixtureEntry>,
    compression: FixtureCompression,
    truncate_tar: Option<usize>,
}

/// An archive on disk; removed when dropped.
pub(crate) struct WrittenArchive {
    dir: TempDir,
    path: PathBuf,
}

impl ArchiveFixture {
    pub(crate) fn new(file_name: &str) -> Self {
        Self {
            file_name: file_name.to_string(),
            entries: Vec::new(),
            compression: FixtureCompression::Gzip,
            truncate_tar: None,
        }
    }

    /// Raw bytes written as-is under `file_name`.
    pub(crate) fn from_bytes(file_name: &str, bytes: &[u8]) -> WrittenArchive {
        WrittenArchive::create(file_name, bytes)
    }

    pub(crate) fn entry(mut self, name: &str, data: &[u8]) -> Self {
        self.entries.push(FixtureEntry {
            name: name.to_string(),
            data: data.to_vec(),
            raw_name: false,
        });
        self
    }

    /// Entry whose header name is written byte for byte, keeping `./` prefixes.
    pub(crate) fn raw_entry(mut self, name: &str, data: &[u8]) -> Self {
        self.entries.push(FixtureEntry {
            name: name.to_string(),
            data: data.to_vec(),
            raw_name: true,
        });
        self
    }

    pub(crate) fn compression(mut self, compression: FixtureCompression) -> Self {
        self.compression = compression;
        self
    }

    /// Cut the tar stream to `len` bytes before compressing it.
    pub(crate) fn truncate_tar(mut self, len: usize) -> Self {
        self.truncate_tar = Some(len);
        self
    }

    pub(crate) fn write(self) -> WrittenArchive {
        let mut builder = tar::Builder::new(Vec::new());
        for entry in &self.entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(entry.data.len() as u64);
            header.set_mode(0o644);
            header.set_entry_type(tar::EntryType::Regular);

            if entry.raw_name {
                let gnu = header.as_gnu_mut().unwrap();
                gnu.name[..entry.name.len()].copy_from_slice(entry.name.as_bytes());
                header.set_cksum();
                builder.append(&header, entry.data.as_slice()).unwrap();
            } else {
                builder
                    .append_data(&mut header, &entry.name, entry.data.as_slice())
                    .unwrap();
            }
        }
        let mut tar_bytes = builder.into_inner().unwrap();
        if let Some(len) = self.truncate_tar {
            tar_bytes.truncate(len);
        }

        let bytes = match self.compression {
            FixtureCompression::None => tar_bytes,
            FixtureCompression::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
                encoder.write_all(&tar_bytes).unwrap();
                encoder.finish().unwrap()
            }
            FixtureCompression::Bzip2 => {
                let mut encoder = BzEncoder::new(Vec::new(), bzip2::Compression::default());
                encoder.write_all(&tar_bytes).unwrap();
                encoder.finish().unwrap()
            }
            FixtureCompression::Xz => {
                let mut encoder = XzEncoder::new(Vec::new(), 6);
                encoder.write_all(&tar_bytes).unwrap();
                encoder.finish().unwrap()
            }
        };

        WrittenArchive::create(&self.file_name, &bytes)
    }
}

impl WrittenArchive {
    fn create(file_name: &str, bytes: &[u8]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(file_name);
        fs::write(&path, bytes).unwrap();
        Self { dir, path }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Create an (empty) file next to the archive and return its path.
    pub(crate) fn touch(&self, file_name: &str) -> PathBuf {
        let path = self.dir.path().join(file_name);
        fs::write(&path, b"").unwrap();
        path
    }

    /// Path next to the archive that does not exist.
    pub(crate) fn absent(&self, file_name: &str) -> PathBuf {
        self.dir.path().join(file_name)
    }
}
