//! Unified error handling for rtd3
//!
//! A single error type shared by the core library and the command line tool.
//! Uses thiserror for Display and Error trait impls.

use std::io;
use std::path::PathBuf;

/// Result type alias using Rtd3Error
pub type Result<T> = std::result::Result<T, Rtd3Error>;

/// Unified error type for all rtd3 operations
#[derive(thiserror::Error, Debug)]
pub enum Rtd3Error {
    // ============================================================================
    // I/O and File System Errors
    // ============================================================================
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Source unavailable {path}: {source}")]
    SourceUnavailable {
        path: PathBuf,
        source: io::Error,
    },

    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: io::Error,
    },

    #[error("Failed to move {from} to {to}: {source}")]
    FileRename {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },

    #[error("Failed to remove file {path}: {source}")]
    FileRemove {
        path: PathBuf,
        source: io::Error,
    },

    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: io::Error,
    },

    // ============================================================================
    // Parsing Errors
    // ============================================================================
    #[error("Failed to parse {fact} from {input:?}: {reason}")]
    ParseFailure {
        fact: String,
        input: String,
        reason: String,
    },

    #[error("Unknown PCI function code {code:?} in address {address}")]
    UnknownPciFunction {
        address: String,
        code: String,
    },

    // ============================================================================
    // Installation Errors
    // ============================================================================
    #[error("Cancelled: {path} exists and backup {backup} already exists, use --force to overwrite")]
    InstallConflict {
        path: PathBuf,
        backup: PathBuf,
    },

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidConfig {
        field: String,
        reason: String,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("{0}")]
    Generic(String),
}

impl Rtd3Error {
    /// Create a generic error from a string
    pub fn generic(msg: impl Into<String>) -> Self {
        Self::Generic(msg.into())
    }

    /// Create an invalid configuration error
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a parse failure for the named fact
    pub fn parse_failure(
        fact: impl Into<String>,
        input: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::ParseFailure {
            fact: fact.into(),
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// True for conditions that abort one managed file but not the whole command
    pub fn is_install_conflict(&self) -> bool {
        matches!(self, Self::InstallConflict { .. })
    }
}

impl From<String> for Rtd3Error {
    fn from(s: String) -> Self {
        Self::Generic(s)
    }
}

impl From<&str> for Rtd3Error {
    fn from(s: &str) -> Self {
        Self::Generic(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_conflict_message_mentions_force() {
        let err = Rtd3Error::InstallConflict {
            path: PathBuf::from("/etc/modprobe.d/nvidia-pm.conf"),
            backup: PathBuf::from("/etc/modprobe.d/nvidia-pm.conf.bak"),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("Cancelled"));
        assert!(msg.contains("--force"));
        assert!(err.is_install_conflict());
    }

    #[test]
    fn test_from_str() {
        let err: Rtd3Error = "boom".into();
        assert_eq!(err.to_string(), "boom");
        assert!(!err.is_install_conflict());
    }

    #[test]
    fn test_parse_failure_display() {
        let err = Rtd3Error::parse_failure("power_now", "abc", "invalid digit found in string");
        assert_eq!(
            err.to_string(),
            "Failed to parse power_now from \"abc\": invalid digit found in string"
        );
    }
}
