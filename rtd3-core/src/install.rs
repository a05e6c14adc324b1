//! Install and uninstall of the managed configuration files
//!
//! An existing file at the install path is moved aside to `path + suffix`
//! before the managed content is written, unless it already holds exactly
//! the managed content. At most one backup exists per install path: when one
//! is already present the install is refused unless forced, and a forced
//! install overwrites the live file without touching the backup. Uninstall
//! removes the live files and moves any backup back.
//!
//! Only a byte-identical file counts as already installed. Reinstalling with
//! different modprobe options moves the previously installed file to the
//! backup path like any foreign file, so a later uninstall restores those
//! older options rather than the pre-install file. Installing a third time
//! then needs `force`.
//!
//! Uninstall removes every candidate path, including files the tool did not
//! write. A removed file that is neither the resolved install path nor has a
//! backup is logged as a warning.
//!
//! There is no rollback; a failing step leaves whatever the previous steps
//! produced.

use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use rtd3_error::{Result, Rtd3Error};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::constants::CONFIG_FILE_MODE;

/// Which managed file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ManagedFileKind {
    Udev,
    Modprobe,
}

impl ManagedFileKind {
    /// Capitalized name for progress lines
    pub fn label(self) -> &'static str {
        match self {
            ManagedFileKind::Udev => "Udev",
            ManagedFileKind::Modprobe => "Modprobe",
        }
    }
}

impl fmt::Display for ManagedFileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManagedFileKind::Udev => write!(f, "udev"),
            ManagedFileKind::Modprobe => write!(f, "modprobe"),
        }
    }
}

/// A configuration file owned by the tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedFile {
    pub kind: ManagedFileKind,
    /// Ordered install candidates; the first is the default target
    candidates: Vec<PathBuf>,
    pub content: String,
}

impl ManagedFile {
    pub fn new(kind: ManagedFileKind, candidates: Vec<PathBuf>, content: String) -> Self {
        debug_assert!(!candidates.is_empty(), "managed file needs a target");
        Self {
            kind,
            candidates,
            content,
        }
    }

    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }

    pub fn default_path(&self) -> &Path {
        self.candidates
            .first()
            .map(PathBuf::as_path)
            .unwrap_or_else(|| Path::new(""))
    }

    /// First candidate that exists, or the default
    pub fn resolve_install_path(&self) -> &Path {
        self.candidates
            .iter()
            .find(|p| p.exists())
            .map(PathBuf::as_path)
            .unwrap_or_else(|| self.default_path())
    }

    /// Existence check used by the state report
    pub fn is_installed(&self) -> bool {
        self.candidates.iter().any(|p| p.exists())
    }
}

/// `path` with `suffix` appended to its final component
pub fn backup_path(path: &Path, suffix: &str) -> PathBuf {
    let mut os: OsString = path.as_os_str().to_owned();
    os.push(suffix);
    PathBuf::from(os)
}

/// What an install did to the filesystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// Nothing existed at the path
    Created { path: PathBuf },
    /// The previous file was moved to `backup` first
    Replaced { path: PathBuf, backup: PathBuf },
    /// Forced over an existing file, backup left as is
    Overwritten { path: PathBuf },
    /// The file already held the managed content
    Unchanged { path: PathBuf },
}

impl fmt::Display for InstallOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallOutcome::Created { path } => write!(f, "Created {}", path.display()),
            InstallOutcome::Replaced { path, backup } => write!(
                f,
                "Created {} (previous file saved as {})",
                path.display(),
                backup.display()
            ),
            InstallOutcome::Overwritten { path } => {
                write!(f, "Overwrote {} (backup kept)", path.display())
            }
            InstallOutcome::Unchanged { path } => {
                write!(f, "{} is already up to date", path.display())
            }
        }
    }
}

fn holds_content(path: &Path, content: &str) -> bool {
    fs::read(path)
        .map(|bytes| bytes == content.as_bytes())
        .unwrap_or(false)
}

/// Install one managed file
pub fn install_file(file: &ManagedFile, backup_suffix: &str, force: bool) -> Result<InstallOutcome> {
    let path = file.resolve_install_path().to_path_buf();
    let backup = backup_path(&path, backup_suffix);
    debug!(kind = %file.kind, path = %path.display(), "Resolved install path");

    let outcome = if path.exists() {
        if backup.exists() {
            if !force {
                return Err(Rtd3Error::InstallConflict { path, backup });
            }
            info!(path = %path.display(), "Backup exists, overwriting live file");
            InstallOutcome::Overwritten { path: path.clone() }
        } else if holds_content(&path, &file.content) {
            debug!(path = %path.display(), "Already installed, not backing up");
            InstallOutcome::Unchanged { path: path.clone() }
        } else {
            fs::rename(&path, &backup).map_err(|source| Rtd3Error::FileRename {
                from: path.clone(),
                to: backup.clone(),
                source,
            })?;
            info!(from = %path.display(), to = %backup.display(), "Backed up existing file");
            InstallOutcome::Replaced {
                path: path.clone(),
                backup,
            }
        }
    } else {
        InstallOutcome::Created { path: path.clone() }
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| Rtd3Error::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    fs::write(&path, &file.content).map_err(|source| Rtd3Error::FileWrite {
        path: path.clone(),
        source,
    })?;

    if let Err(e) = fs::set_permissions(&path, fs::Permissions::from_mode(CONFIG_FILE_MODE)) {
        warn!(path = %path.display(), "Could not set file mode: {}", e);
    }

    info!(kind = %file.kind, path = %path.display(), "Installed");
    Ok(outcome)
}

/// Install every file, continuing past per-file failures
pub fn install_all(
    files: &[ManagedFile],
    backup_suffix: &str,
    force: bool,
) -> Vec<(ManagedFileKind, Result<InstallOutcome>)> {
    files
        .iter()
        .map(|file| {
            let result = install_file(file, backup_suffix, force);
            if let Err(e) = &result {
                warn!(kind = %file.kind, "Install failed: {}", e);
            }
            (file.kind, result)
        })
        .collect()
}

/// What an uninstall did to the filesystem
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UninstallOutcome {
    pub removed: Vec<PathBuf>,
    pub restored: Vec<PathBuf>,
}

impl UninstallOutcome {
    pub fn is_noop(&self) -> bool {
        self.removed.is_empty() && self.restored.is_empty()
    }
}

/// Remove a managed file from every candidate path and restore backups
pub fn uninstall_file(file: &ManagedFile, backup_suffix: &str) -> Result<UninstallOutcome> {
    let mut outcome = UninstallOutcome::default();
    let resolved = file.resolve_install_path().to_path_buf();

    for path in file.candidates() {
        let backup = backup_path(path, backup_suffix);

        if path.exists() {
            if *path != resolved && !backup.exists() {
                warn!(
                    kind = %file.kind,
                    path = %path.display(),
                    "Removing a file at a secondary location that has no backup"
                );
            }
            fs::remove_file(path).map_err(|source| Rtd3Error::FileRemove {
                path: path.clone(),
                source,
            })?;
            info!(path = %path.display(), "Removed");
            outcome.removed.push(path.clone());
        }

        if backup.exists() {
            fs::rename(&backup, path).map_err(|source| Rtd3Error::FileRename {
                from: backup.clone(),
                to: path.clone(),
                source,
            })?;
            info!(path = %path.display(), "Restored backup");
            outcome.restored.push(path.clone());
        }
    }

    if outcome.is_noop() {
        debug!(kind = %file.kind, "Nothing to uninstall");
    }
    Ok(outcome)
}

/// Uninstall every file, continuing past per-file failures
pub fn uninstall_all(
    files: &[ManagedFile],
    backup_suffix: &str,
) -> Vec<(ManagedFileKind, Result<UninstallOutcome>)> {
    files
        .iter()
        .map(|file| {
            let result = uninstall_file(file, backup_suffix);
            if let Err(e) = &result {
                warn!(kind = %file.kind, "Uninstall failed: {}", e);
            }
            (file.kind, result)
        })
        .collect()
}
