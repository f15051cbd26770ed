//! Loading plain-text files into block sequences.
//!
//! Files are decoded as UTF-8 first and GBK second. A file that cannot be read
//! is skipped and reported; the remaining files still load.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::blocks::BlockSequence;

#[derive(thiserror::Error, Debug)]
pub enum ImportError {
    #[error("file '{0}' does not exist")]
    NotFound(PathBuf),
    #[error("file '{0}' is neither UTF-8 nor GBK text")]
    Decode(PathBuf),
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Read `path` as text, falling back to GBK when it is not valid UTF-8.
pub fn read_text_file(path: &Path) -> Result<String, ImportError> {
    let bytes = fs::read(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ImportError::NotFound(path.to_path_buf()),
        _ => ImportError::Io {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) => {
            let bytes = e.into_bytes();
            let (text, had_errors) = encoding_rs::GBK.decode_without_bom_handling(&bytes);
            if had_errors {
                return Err(ImportError::Decode(path.to_path_buf()));
            }
            log::info!("{} is not UTF-8, decoded as GBK", path.display());
            Ok(text.into_owned())
        }
    }
}

/// Outcome of loading several files at once.
#[derive(Debug, Default)]
pub struct ImportReport {
    pub blocks: BlockSequence,
    /// Files that loaded, with the number of blocks each contributed.
    pub loaded: Vec<(PathBuf, usize)>,
    /// Files that were skipped.
    pub failures: Vec<ImportError>,
}

impl ImportReport {
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Load `paths` in order, concatenating their blocks.
pub fn load_files<P: AsRef<Path>>(paths: &[P]) -> ImportReport {
    let mut report = ImportReport::default();

    for path in paths {
        let path = path.as_ref();
        match read_text_file(path) {
            Ok(text) => {
                let count = report.blocks.extend_from_text(&text);
                log::info!("loaded {} ({count} blocks)", path.display());
                report.loaded.push((path.to_path_buf(), count));
            }
            Err(e) => {
                log::warn!("skipping {}: {e}", path.display());
                report.failures.push(e);
            }
        }
    }

    report
}

/// Text files directly inside `dir`, matched case-insensitively on `.txt`.
///
/// Entries are sorted by name and de-duplicated by canonical path.
pub fn scan_txt_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut seen = HashSet::new();
    let mut files = Vec::new();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() || !has_txt_extension(&path) {
            continue;
        }
        let key = fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
        if seen.insert(key) {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

fn has_txt_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("txt"))
}

/// Human readable file size: bytes, then KB above 1024, then MB above 1 MiB.
pub fn format_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * 1024;
    if bytes > MIB {
        format!("{:.1} MB", bytes as f64 / MIB as f64)
    } else if bytes > KIB {
        format!("{:.1} KB", bytes as f64 / KIB as f64)
    } else {
        format!("{bytes} bytes")
    }
}
