//! Error taxonomy shared across the crate.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Error type produced by a consumer-supplied callback.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Alias for `Result` with the crate's [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The path vanished between listing and access. For rotating logs
    /// this is ordinary churn, and the watcher treats it as a removal or
    /// a skipped candidate rather than a failure.
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// A zero tail window was requested.
    #[error("invalid tail window: {0}")]
    InvalidWindow(usize),

    /// The configured glob pattern failed to parse.
    #[error("invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// Any other I/O failure: permissions, exhausted descriptors, decode
    /// failures in an overridden open strategy. Never retried internally.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// The consumer callback returned an error. Propagated uncaught,
    /// which terminates the current polling pass.
    #[error("callback error: {0}")]
    Callback(#[source] CallbackError),
}

impl Error {
    /// Classifies an `io::Error` raised while accessing `path`, mapping
    /// `NotFound` to its dedicated variant.
    pub(crate) fn from_io(err: io::Error, path: &Path) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            Error::NotFound(path.to_path_buf())
        } else {
            Error::Io(err)
        }
    }

    pub(crate) fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
