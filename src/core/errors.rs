//! SVS-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, SvsError>;

/// Top-level error type for the vaccine sweeper.
#[derive(Debug, Error)]
pub enum SvsError {
    #[error("[SVS-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[SVS-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[SVS-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[SVS-2001] cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[SVS-2002] cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[SVS-2003] cannot rename {from} -> {to}: {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[SVS-2004] cannot copy {from} -> {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[SVS-2005] cannot remove {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[SVS-2006] content mismatch after replacing {path}: expected {expected}, found {actual}")]
    Verify {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("[SVS-3001] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[SVS-3101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },
}

impl SvsError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "SVS-1001",
            Self::MissingConfig { .. } => "SVS-1002",
            Self::ConfigParse { .. } => "SVS-1003",
            Self::Read { .. } => "SVS-2001",
            Self::Write { .. } => "SVS-2002",
            Self::Rename { .. } => "SVS-2003",
            Self::Copy { .. } => "SVS-2004",
            Self::Remove { .. } => "SVS-2005",
            Self::Verify { .. } => "SVS-2006",
            Self::Io { .. } => "SVS-3001",
            Self::Serialization { .. } => "SVS-3101",
        }
    }

    /// Whether retrying might resolve the failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Read { .. } | Self::Write { .. } | Self::Copy { .. } | Self::Io { .. }
        )
    }

    /// The primary filesystem path involved, when there is one.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::MissingConfig { path }
            | Self::Read { path, .. }
            | Self::Write { path, .. }
            | Self::Remove { path, .. }
            | Self::Verify { path, .. }
            | Self::Io { path, .. } => Some(path),
            Self::Rename { from, .. } => Some(from),
            Self::Copy { to, .. } => Some(to),
            Self::InvalidConfig { .. } | Self::ConfigParse { .. } | Self::Serialization { .. } => {
                None
            }
        }
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    #[must_use]
    pub fn read(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    #[must_use]
    pub fn write(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    #[must_use]
    pub fn remove(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Remove {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for SvsError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for SvsError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
