//! Source reader for procfs and sysfs pseudo-files
//!
//! Nodes under `/proc` and `/sys` come and go with hardware and drivers
//! (no discrete GPU, no DSDT, no battery). Reads never fail the caller: an
//! I/O error is logged on the diagnostic channel and surfaces as `None` or an
//! empty listing.

use std::fs;
use std::path::Path;

use rtd3_error::Rtd3Error;
use tracing::{trace, warn};

use crate::config::ReadMode;

/// Read access to pseudo-files and directory listings
#[cfg_attr(test, mockall::automock)]
pub trait Source {
    /// Read a file as text, `None` when it is unavailable
    fn read(&self, path: &Path, mode: ReadMode) -> Option<String>;

    /// Entry names of a directory in listing order, empty when unavailable
    fn list(&self, dir: &Path) -> Vec<String>;
}

/// Reads the real filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSource;

impl Source for FsSource {
    fn read(&self, path: &Path, mode: ReadMode) -> Option<String> {
        let result = match mode {
            ReadMode::Text => fs::read_to_string(path),
            ReadMode::Binary => fs::read(path).map(|bytes| decode_lossy(&bytes)),
        };

        match result {
            Ok(content) => {
                trace!(path = %path.display(), bytes = content.len(), "Read source");
                Some(content)
            }
            Err(source) => {
                let err = Rtd3Error::SourceUnavailable {
                    path: path.to_path_buf(),
                    source,
                };
                warn!("{}", err);
                None
            }
        }
    }

    fn list(&self, dir: &Path) -> Vec<String> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(source) => {
                let err = Rtd3Error::SourceUnavailable {
                    path: dir.to_path_buf(),
                    source,
                };
                warn!("{}", err);
                return Vec::new();
            }
        };

        entries
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry.file_name().to_string_lossy().into_owned()),
                Err(e) => {
                    warn!(dir = %dir.display(), "Skipping unreadable directory entry: {}", e);
                    None
                }
            })
            .collect()
    }
}

/// Decode bytes as UTF-8, dropping anything undecodable
pub fn decode_lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .chars()
        .filter(|&c| c != char::REPLACEMENT_CHARACTER)
        .collect()
}
