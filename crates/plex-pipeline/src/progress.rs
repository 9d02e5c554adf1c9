//! Progress reporting hooks.

use tracing::info;

use plex_types::User;

use crate::completion::{CollectionState, UserClass};
use crate::report::UserSummary;

/// Trait for receiving migration progress updates.
pub trait ProgressCallback: Send + Sync {
    /// Called when a user's pipeline starts.
    fn on_user_started(&self, _user: &User) {}

    /// Called once when a collection becomes done or blank.
    fn on_collection_finished(&self, user_id: &str, collection: &str, state: &CollectionState);

    /// Called once per user after all of its collections finished.
    fn on_user_finished(&self, summary: &UserSummary);
}

/// A no-op progress callback for when progress reporting isn't needed.
pub struct NoOpProgressCallback;

impl ProgressCallback for NoOpProgressCallback {
    fn on_collection_finished(&self, _user_id: &str, _collection: &str, _state: &CollectionState) {}

    fn on_user_finished(&self, _summary: &UserSummary) {}
}

/// A callback that logs progress at info level.
pub struct LoggingProgressCallback;

impl ProgressCallback for LoggingProgressCallback {
    fn on_user_started(&self, user: &User) {
        info!(user_id = %user.id, username = %user.username, "Starting ingest");
    }

    fn on_collection_finished(&self, user_id: &str, collection: &str, state: &CollectionState) {
        let blank = matches!(state, CollectionState::Blank);
        info!(user_id, collection, blank, "Finished collection");
    }

    fn on_user_finished(&self, summary: &UserSummary) {
        info!(
            user_id = %summary.user_id,
            username = %summary.username,
            empty = summary.class == UserClass::Empty,
            indexed = summary.tally.indexed,
            skipped = summary.tally.skipped,
            failed = summary.tally.failed,
            "Ended processing for user"
        );
    }
}
