//! One user's pipeline: open the namespace, run every collection, classify.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Mutex;
use tracing::debug;

use plex_source::SourceStore;
use plex_types::User;

use crate::collection::CollectionProcessor;
use crate::completion::CompletionMatrix;
use crate::context::RunContext;
use crate::error::PipelineError;
use crate::report::{DocumentTally, UserSummary};

/// Runs all target collections of a single user concurrently.
pub struct UserPipeline {
    ctx: RunContext,
    source: Arc<dyn SourceStore>,
}

impl UserPipeline {
    pub fn new(ctx: RunContext, source: Arc<dyn SourceStore>) -> Self {
        Self { ctx, source }
    }

    /// Migrate `user` and report how it finished.
    ///
    /// Returns only after every collection branch has been joined, so no
    /// work for this user is still running when the result is observed.
    pub async fn run(&self, user: &User) -> Result<UserSummary, PipelineError> {
        if self.ctx.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        self.ctx.progress.on_user_started(user);

        let collections = &self.ctx.config.collections;
        let namespace = match self
            .ctx
            .bounded("namespace open", self.source.open_namespace(user, collections))
            .await
        {
            Ok(Ok(namespace)) => namespace,
            Ok(Err(source)) => {
                return Err(self.ctx.abort(PipelineError::Namespace {
                    namespace: user.namespace(),
                    source,
                }))
            }
            Err(e) => return Err(self.ctx.abort(e)),
        };
        debug!(user_id = %user.id, namespace = namespace.name(), "Opened namespace");

        let matrix = Arc::new(Mutex::new(CompletionMatrix::new(user.id.clone(), collections)));
        let processor = CollectionProcessor::new(
            self.ctx.clone(),
            user.clone(),
            namespace,
            Arc::clone(&matrix),
        );
        let results = join_all(collections.iter().map(|descriptor| processor.run(descriptor))).await;

        let mut tally = DocumentTally::new();
        let mut failures = Vec::new();
        let mut errors = Vec::new();
        for result in results {
            match result {
                Ok(summary) => {
                    tally.merge(&summary.tally);
                    failures.extend(summary.failures);
                }
                Err(e) => errors.push(e),
            }
        }
        if let Some(e) = PipelineError::first_fatal(errors) {
            return Err(e);
        }

        let matrix = matrix.lock().await;
        let class = match matrix.classification() {
            Some(class) => class,
            None => {
                return Err(self.ctx.abort(PipelineError::Incomplete {
                    user_id: user.id.clone(),
                    pending: matrix.pending(),
                }))
            }
        };

        let summary = UserSummary {
            user_id: user.id.clone(),
            username: user.username.clone(),
            class,
            tally,
            failures,
        };
        self.ctx.progress.on_user_finished(&summary);
        Ok(summary)
    }
}
