//! Error types for the migration pipeline.
//!
//! Everything here is fatal to the run. Per-document write failures are not
//! errors at this level; they surface as
//! [`DocumentOutcome::Failed`](crate::DocumentOutcome::Failed).

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use plex_search::{HealthStatus, SearchError};
use plex_source::SourceError;

/// A post-run check that did not hold.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum ConsistencyFailure {
    /// Indices present differ from users that had documents
    IndexCount { expected: usize, actual: usize },
    /// Mapping types on the inspected index differ from the collection count
    MappingCount {
        index: String,
        expected: usize,
        actual: usize,
    },
}

impl fmt::Display for ConsistencyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsistencyFailure::IndexCount { expected, actual } => {
                write!(f, "bad index count: expected {expected}, found {actual}")
            }
            ConsistencyFailure::MappingCount {
                index,
                expected,
                actual,
            } => write!(
                f,
                "bad mapping count on index {index}: expected {expected}, found {actual}"
            ),
        }
    }
}

fn join_failures(failures: &[ConsistencyFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Fatal errors that abort a migration run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Users could not be enumerated
    #[error("Directory store unavailable: {0}")]
    Directory(#[source] SourceError),

    /// A user's namespace could not be opened
    #[error("Failed to open namespace {namespace}: {source}")]
    Namespace {
        namespace: String,
        #[source]
        source: SourceError,
    },

    /// A collection could not be enumerated
    #[error("Failed to enumerate {collection} for user {user_id}: {source}")]
    Enumerate {
        user_id: String,
        collection: String,
        #[source]
        source: SourceError,
    },

    /// Containment links could not be read; continuing would under-enrich
    #[error("Containment lookup failed for document {doc_id}: {source}")]
    Containment {
        doc_id: String,
        #[source]
        source: SourceError,
    },

    /// An admin call against the index store failed
    #[error("Index store {operation} failed: {source}")]
    IndexStore {
        operation: &'static str,
        #[source]
        source: SearchError,
    },

    /// The readiness gate found the cluster unusable
    #[error("Index store not ready: cluster {cluster} is {status}")]
    NotReady { cluster: String, status: HealthStatus },

    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    /// The run was cancelled, either by a fatal error elsewhere or by the caller
    #[error("Run cancelled")]
    Cancelled,

    /// All collections were joined but the user never reached a finished state
    #[error("User {user_id} ended with unfinished collections: {pending:?}")]
    Incomplete {
        user_id: String,
        pending: Vec<String>,
    },

    /// The post-run verification found a mismatch
    #[error("Consistency check failed: {}", join_failures(.0))]
    Consistency(Vec<ConsistencyFailure>),
}

impl PipelineError {
    pub fn is_cancellation(&self) -> bool {
        matches!(self, PipelineError::Cancelled)
    }

    /// Pick the error to report from a set of drained branches: the first
    /// real failure, or cancellation when nothing else failed.
    pub(crate) fn first_fatal(errors: impl IntoIterator<Item = PipelineError>) -> Option<PipelineError> {
        let mut cancelled = None;
        for error in errors {
            if error.is_cancellation() {
                cancelled.get_or_insert(error);
            } else {
                return Some(error);
            }
        }
        cancelled
    }
}
