use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Failures that abort the current run.
///
/// Declining a prompt is not represented here: it surfaces as
/// [`crate::prompt::Confirmation::Cancelled`] and ends the run cleanly.
#[derive(Debug, Error)]
pub enum PatchError {
    #[error("file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("download of {} incomplete: received {received} of {expected} bytes", path.display())]
    Incomplete {
        path: PathBuf,
        received: u64,
        expected: u64,
    },

    #[error("failed to parse {what}: {source}")]
    Parse {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("staged update at {} is empty", path.display())]
    EmptyUpdate { path: PathBuf },

    #[error("manifest path escapes the working tree: {path}")]
    UnsafePath { path: String },

    #[error("invalid filter pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("filesystem error at {}: {source}", path.display())]
    FileSystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, PatchError>;

impl PatchError {
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    pub fn parse(what: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Parse {
            what: what.into(),
            source,
        }
    }

    /// Wrap an I/O error, mapping `NotFound` to the dedicated variant.
    pub fn fs(path: impl AsRef<Path>, source: io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound { path }
        } else {
            Self::FileSystem { path, source }
        }
    }

    /// Transport, status and truncated-stream failures.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::HttpStatus { .. } | Self::Incomplete { .. }
        )
    }
}
