//! Result archive extraction.
//!
//! Result archives are tarballs returned by the ARC wrapper, usually
//! gzip-compressed; bzip2 and xz are recognised from their magic bytes too.
//! Only two entries are of interest and both are collected in a single
//! streaming pass; the file handle lives only for that pass.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use bzip2::bufread::BzDecoder;
use flate2::bufread::GzDecoder;
use tar::Archive;
use xz2::bufread::XzDecoder;
use thiserror::Error;
use tracing::{debug, warn};

/// Heartbeat entry name as written by the pilot.
pub const HEARTBEAT_ENTRY: &str = "./heartbeat.json";

const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const BZIP2_MAGIC: &[u8] = b"BZh";
const XZ_MAGIC: &[u8] = &[0xfd, b'7', b'z', b'X', b'Z', 0x00];

/// The archive as a whole could not be read.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} is empty", path.display())]
    Empty { path: PathBuf },

    #[error("{} is not a readable tar archive: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A single requested entry could not be read.
#[derive(Error, Debug)]
pub enum EntryError {
    #[error("{name} not found in archive")]
    Missing { name: String },

    #[error("failed to read {name}: {source}")]
    Read {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("archive ended before {name} was reached: {cause}")]
    Truncated { name: String, cause: String },
}

/// Name of the ARC diagnostic entry for a job.
pub fn diag_entry_name(job_id: &str) -> String {
    format!("{}.diag", job_id)
}

/// Entries read from a result archive, keyed by requested name.
#[derive(Debug, Default)]
pub struct ExtractedEntries {
    entries: HashMap<String, Result<Vec<u8>, EntryError>>,
}

impl ExtractedEntries {
    /// Take the contents of a requested entry.
    pub fn take(&mut self, name: &str) -> Result<Vec<u8>, EntryError> {
        self.entries
            .remove(normalize_entry_name(name))
            .unwrap_or_else(|| {
                Err(EntryError::Missing {
                    name: name.to_string(),
                })
            })
    }
}

/// Read the named entries from the archive at `path`.
///
/// Names are matched after stripping leading `./`. When an entry occurs more
/// than once the last occurrence wins, as with tar extraction.
pub fn extract_entries(path: &Path, names: &[&str]) -> Result<ExtractedEntries, ArchiveError> {
    let reader = open_reader(path)?;
    read_entries(reader, path, names)
}

/// Walk a decompressed tar stream once, keeping the wanted entries.
///
/// An error before the first entry means the archive is unreadable. An error
/// after that leaves the entries already read intact and marks the ones not
/// yet reached as truncated.
fn read_entries<R: Read>(
    reader: R,
    path: &Path,
    names: &[&str],
) -> Result<ExtractedEntries, ArchiveError> {
    let mut archive = Archive::new(reader);
    let entries = archive.entries().map_err(|source| ArchiveError::Corrupt {
        path: path.to_path_buf(),
        source,
    })?;

    let wanted: Vec<&str> = names.iter().map(|n| normalize_entry_name(n)).collect();
    let mut found: HashMap<String, Result<Vec<u8>, EntryError>> = HashMap::new();
    let mut seen_any = false;
    let mut stream_error: Option<String> = None;

    for entry in entries {
        let mut entry = match entry {
            Ok(entry) => entry,
            Err(source) if !seen_any => {
                return Err(ArchiveError::Corrupt {
                    path: path.to_path_buf(),
                    source,
                });
            }
            Err(source) => {
                warn!("Result archive is truncated or damaged: {}", source);
                stream_error = Some(source.to_string());
                break;
            }
        };
        seen_any = true;

        let raw_name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
        let name = normalize_entry_name(&raw_name);
        if !wanted.iter().any(|w| *w == name) {
            continue;
        }

        debug!("Reading {} from result archive", raw_name);
        let mut data = Vec::new();
        let result = match entry.read_to_end(&mut data) {
            Ok(_) => Ok(data),
            Err(source) => Err(EntryError::Read {
                name: raw_name.clone(),
                source,
            }),
        };
        found.insert(name.to_string(), result);
    }

    if let Some(cause) = stream_error {
        for name in &wanted {
            found
                .entry(name.to_string())
                .or_insert_with(|| {
                    Err(EntryError::Truncated {
                        name: name.to_string(),
                        cause: cause.clone(),
                    })
                });
        }
    }

    Ok(ExtractedEntries { entries: found })
}

fn open_reader(path: &Path) -> Result<Box<dyn Read>, ArchiveError> {
    let open_error = |source: io::Error| ArchiveError::Open {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(open_error)?;
    let mut reader = BufReader::new(file);
    let compression = {
        let head = reader.fill_buf().map_err(open_error)?;
        if head.is_empty() {
            return Err(ArchiveError::Empty {
                path: path.to_path_buf(),
            });
        }
        Compression::sniff(head)
    };
    debug!("Result archive compression: {:?}", compression);

    let decoded: Box<dyn Read> = match compression {
        Compression::Gzip => Box::new(GzDecoder::new(reader)),
        Compression::Bzip2 => Box::new(BzDecoder::new(reader)),
        Compression::Xz => Box::new(XzDecoder::new(reader)),
        Compression::None => Box::new(reader),
    };
    Ok(decoded)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Compression {
    Gzip,
    Bzip2,
    Xz,
    None,
}

impl Compression {
    fn sniff(head: &[u8]) -> Self {
        if head.starts_with(GZIP_MAGIC) {
            Compression::Gzip
        } else if head.starts_with(BZIP2_MAGIC) {
            Compression::Bzip2
        } else if head.starts_with(XZ_MAGIC) {
            Compression::Xz
        } else {
            Compression::None
        }
    }
}

fn normalize_entry_name(name: &str) -> &str {
    let mut name = name;
    while let Some(rest) = name.strip_prefix("./") {
        name = rest;
    }
    name
}
