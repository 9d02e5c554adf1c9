//! Source layer error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading the directory or a user namespace
#[derive(Error, Debug)]
pub enum SourceError {
    /// Reading a dump file failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A record could not be decoded into the expected shape
    #[error("Malformed record in {location}: {reason}")]
    Malformed { location: String, reason: String },

    /// The collection was not attached when the namespace was opened
    #[error("Collection '{collection}' is not attached to namespace {namespace}")]
    UnknownCollection {
        namespace: String,
        collection: String,
    },

    /// The store could not be reached
    #[error("Source unavailable: {0}")]
    Unavailable(String),
}

impl SourceError {
    pub(crate) fn malformed(location: impl Into<String>, reason: impl Into<String>) -> Self {
        SourceError::Malformed {
            location: location.into(),
            reason: reason.into(),
        }
    }
}
