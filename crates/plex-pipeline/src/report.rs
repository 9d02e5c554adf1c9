//! Run results: per-document tallies, per-user summaries and the final report.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::completion::UserClass;
use crate::error::{ConsistencyFailure, PipelineError};
use crate::ingestor::DocumentOutcome;

/// Count of document outcomes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DocumentTally {
    /// Written to the index store
    pub indexed: usize,
    /// Superseded revisions that were not written
    pub skipped: usize,
    /// Writes that failed after retries
    pub failed: usize,
}

impl DocumentTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: &DocumentOutcome) {
        match outcome {
            DocumentOutcome::Indexed => self.indexed += 1,
            DocumentOutcome::Skipped => self.skipped += 1,
            DocumentOutcome::Failed { .. } => self.failed += 1,
        }
    }

    pub fn merge(&mut self, other: &DocumentTally) {
        self.indexed += other.indexed;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }

    /// Total number of documents handled (indexed + skipped + failed).
    pub fn total(&self) -> usize {
        self.indexed + self.skipped + self.failed
    }
}

/// A document whose write failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedDocument {
    pub user_id: String,
    pub collection: String,
    pub doc_id: String,
    pub error: String,
}

/// Outcome of one user's pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub user_id: String,
    pub username: String,
    pub class: UserClass,
    pub tally: DocumentTally,
    pub failures: Vec<FailedDocument>,
}

/// Result of the post-run consistency check.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VerificationReport {
    pub expected_indices: usize,
    pub indices_present: usize,
    pub expected_mappings: usize,
    /// Index whose mappings were counted; `None` when no index exists
    pub mapping_index: Option<String>,
    pub mapping_count: Option<usize>,
    /// Index operations reported by the store
    pub indexed_total: u64,
    pub size_in_bytes: u64,
    pub failures: Vec<ConsistencyFailure>,
}

impl VerificationReport {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Final report of a migration run.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub users_processed: usize,
    /// Users whose every collection was blank
    pub empty_users: Vec<String>,
    pub tally: DocumentTally,
    pub failures: Vec<FailedDocument>,
    /// `None` when the directory had no users
    pub verification: Option<VerificationReport>,
}

impl MigrationReport {
    pub(crate) fn empty(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            finished_at: Utc::now(),
            users_processed: 0,
            empty_users: Vec::new(),
            tally: DocumentTally::new(),
            failures: Vec::new(),
            verification: None,
        }
    }

    /// Fold one finished user into the run totals.
    pub(crate) fn add_user(&mut self, summary: UserSummary) {
        self.users_processed += 1;
        if summary.class == UserClass::Empty {
            self.empty_users.push(summary.user_id);
        }
        self.tally.merge(&summary.tally);
        self.failures.extend(summary.failures);
    }

    /// Whether any document write failed.
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Users that had at least one document.
    pub fn non_empty_users(&self) -> usize {
        self.users_processed - self.empty_users.len()
    }

    pub fn elapsed_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }

    /// Turn a failed verification into an error.
    pub fn ensure_consistent(&self) -> Result<(), PipelineError> {
        match &self.verification {
            Some(v) if !v.passed() => Err(PipelineError::Consistency(v.failures.clone())),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(user_id: &str, class: UserClass, indexed: usize) -> UserSummary {
        UserSummary {
            user_id: user_id.to_string(),
            username: format!("{user_id}-name"),
            class,
            tally: DocumentTally {
                indexed,
                ..Default::default()
            },
            failures: Vec::new(),
        }
    }

    #[test]
    fn test_tally_record_and_merge() {
        let mut tally = DocumentTally::new();
        tally.record(&DocumentOutcome::Indexed);
        tally.record(&DocumentOutcome::Skipped);
        tally.record(&DocumentOutcome::Failed {
            error: "HTTP 500".to_string(),
        });

        let mut total = DocumentTally {
            indexed: 2,
            ..Default::default()
        };
        total.merge(&tally);
        assert_eq!(total.indexed, 3);
        assert_eq!(total.total(), 5);
    }

    #[test]
    fn test_report_aggregates_users() {
        let mut report = MigrationReport::empty(Utc::now());
        report.add_user(summary("u1", UserClass::Empty, 0));
        report.add_user(summary("u2", UserClass::NonEmpty, 4));
        report.add_user(summary("u3", UserClass::NonEmpty, 1));

        assert_eq!(report.users_processed, 3);
        assert_eq!(report.empty_users, vec!["u1".to_string()]);
        assert_eq!(report.non_empty_users(), 2);
        assert_eq!(report.tally.indexed, 5);
    }

    #[test]
    fn test_ensure_consistent() {
        let mut report = MigrationReport::empty(Utc::now());
        assert!(report.ensure_consistent().is_ok());

        report.verification = Some(VerificationReport {
            failures: vec![ConsistencyFailure::IndexCount {
                expected: 1,
                actual: 0,
            }],
            ..Default::default()
        });
        assert!(matches!(
            report.ensure_consistent(),
            Err(PipelineError::Consistency(_))
        ));
    }
}
