//! Per-user completion bookkeeping.
//!
//! A [`CompletionMatrix`] belongs to one user's pipeline and is only ever
//! mutated behind that pipeline's lock. It answers two questions: has every
//! collection finished, and did the user have any documents at all.

use std::collections::HashSet;

use serde::Serialize;
use tracing::warn;

use plex_types::CollectionSet;

/// Progress of one collection for one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionState {
    NotStarted,
    InProgress {
        doc_total: usize,
        completed: HashSet<String>,
    },
    Done,
    /// Had no documents at enumeration time; counts as finished.
    Blank,
}

impl CollectionState {
    pub fn is_finished(&self) -> bool {
        matches!(self, CollectionState::Done | CollectionState::Blank)
    }
}

/// Effect of a completion signal on its collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Nothing changed, or the collection was already finished
    Unchanged,
    /// The collection just became `Done` or `Blank`
    CollectionFinished,
}

/// Classification of a finished user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UserClass {
    /// Every collection was blank
    Empty,
    NonEmpty,
}

/// Completion state of every target collection for one user.
#[derive(Debug, Clone)]
pub struct CompletionMatrix {
    user_id: String,
    states: Vec<(String, CollectionState)>,
    classification: Option<UserClass>,
}

impl CompletionMatrix {
    pub fn new(user_id: impl Into<String>, collections: &CollectionSet) -> Self {
        Self {
            user_id: user_id.into(),
            states: collections
                .names()
                .map(|name| (name.to_string(), CollectionState::NotStarted))
                .collect(),
            classification: None,
        }
    }

    pub fn state(&self, collection: &str) -> Option<&CollectionState> {
        self.states
            .iter()
            .find(|(name, _)| name == collection)
            .map(|(_, state)| state)
    }

    fn state_mut(&mut self, collection: &str) -> Option<&mut CollectionState> {
        self.states
            .iter_mut()
            .find(|(name, _)| name == collection)
            .map(|(_, state)| state)
    }

    /// Record the enumerated document count. Zero documents marks the
    /// collection blank immediately.
    pub fn start_collection(&mut self, collection: &str, doc_total: usize) -> Transition {
        let user_id = self.user_id.clone();
        let Some(state) = self.state_mut(collection) else {
            warn!(user_id = %user_id, collection, "Start for unknown collection ignored");
            return Transition::Unchanged;
        };
        if *state != CollectionState::NotStarted {
            warn!(user_id = %user_id, collection, "Collection started twice, ignoring");
            return Transition::Unchanged;
        }

        if doc_total == 0 {
            *state = CollectionState::Blank;
            Transition::CollectionFinished
        } else {
            *state = CollectionState::InProgress {
                doc_total,
                completed: HashSet::new(),
            };
            Transition::Unchanged
        }
    }

    /// Record that one document reached a final outcome. Repeated ids are
    /// counted once; the collection becomes `Done` exactly when the number
    /// of distinct ids reaches its document total.
    pub fn record_completion(&mut self, collection: &str, doc_id: &str) -> Transition {
        let user_id = self.user_id.clone();
        let Some(state) = self.state_mut(collection) else {
            warn!(user_id = %user_id, collection, doc_id, "Completion for unknown collection ignored");
            return Transition::Unchanged;
        };

        let finished = match state {
            CollectionState::InProgress {
                doc_total,
                completed,
            } => {
                completed.insert(doc_id.to_string());
                completed.len() >= *doc_total
            }
            CollectionState::NotStarted => {
                warn!(user_id = %user_id, collection, doc_id, "Completion before enumeration ignored");
                false
            }
            CollectionState::Done | CollectionState::Blank => false,
        };

        if finished {
            *state = CollectionState::Done;
            Transition::CollectionFinished
        } else {
            Transition::Unchanged
        }
    }

    /// True once every collection is done or blank.
    pub fn is_user_done(&self) -> bool {
        self.states.iter().all(|(_, state)| state.is_finished())
    }

    /// User-level completion check. Safe to call after every state change:
    /// returns the classification only on the call that first observes the
    /// user as finished, `None` before and after.
    pub fn check_user_finished(&mut self) -> Option<UserClass> {
        if self.classification.is_some() || !self.is_user_done() {
            return None;
        }
        let empty = self
            .states
            .iter()
            .all(|(_, state)| *state == CollectionState::Blank);
        let class = if empty {
            UserClass::Empty
        } else {
            UserClass::NonEmpty
        };
        self.classification = Some(class);
        Some(class)
    }

    /// Classification recorded by [`check_user_finished`](Self::check_user_finished).
    pub fn classification(&self) -> Option<UserClass> {
        self.classification
    }

    /// Collections not yet done or blank.
    pub fn pending(&self) -> Vec<String> {
        self.states
            .iter()
            .filter(|(_, state)| !state.is_finished())
            .map(|(name, _)| name.clone())
            .collect()
    }
}
