//! Top-level driver for a migration run.
//!
//! The run has four phases:
//!
//! 1. **Preflight**: gate on cluster health, then wipe existing indices when
//!    configured
//! 2. **Enumerate**: list every directory user
//! 3. **Migrate**: run a [`UserPipeline`] per user with bounded concurrency
//! 4. **Verify**: cross-check index and mapping counts against the store
//!
//! Any fatal error cancels the shared token, every in-flight branch drains,
//! and the first real error is returned.

use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use plex_search::IndexStore;
use plex_source::{DirectoryStore, SourceStore};

use crate::config::PipelineConfig;
use crate::context::RunContext;
use crate::error::PipelineError;
use crate::progress::ProgressCallback;
use crate::report::MigrationReport;
use crate::user::UserPipeline;
use crate::verifier::verify;

/// A configured migration, ready to run once.
pub struct Migration {
    directory: Arc<dyn DirectoryStore>,
    source: Arc<dyn SourceStore>,
    ctx: RunContext,
}

impl Migration {
    pub fn new(
        directory: Arc<dyn DirectoryStore>,
        source: Arc<dyn SourceStore>,
        index_store: Arc<dyn IndexStore>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            directory,
            source,
            ctx: RunContext::new(index_store, config),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.ctx = self.ctx.with_progress(progress);
        self
    }

    /// Token that aborts the run when cancelled, e.g. from a signal handler.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.ctx.cancellation_token()
    }

    /// Refuse to start against a red cluster, then reset the indices if
    /// configured to.
    pub async fn preflight(&self) -> Result<(), PipelineError> {
        let store = &self.ctx.index_store;

        let health = self
            .ctx
            .bounded("cluster health", store.cluster_health())
            .await?
            .map_err(|source| PipelineError::IndexStore {
                operation: "cluster health",
                source,
            })?;
        if !health.is_ready() {
            return Err(PipelineError::NotReady {
                cluster: health.cluster_name,
                status: health.status,
            });
        }
        info!(
            cluster = %health.cluster_name,
            status = %health.status,
            nodes = health.number_of_nodes,
            "Index store ready"
        );

        if self.ctx.config.wipe_indices {
            self.ctx
                .bounded("delete all indices", store.delete_all_indices())
                .await?
                .map_err(|source| PipelineError::IndexStore {
                    operation: "delete all indices",
                    source,
                })?;
            warn!("Deleted all existing indices");
        }
        Ok(())
    }

    /// Run preflight, migrate every user and verify the result.
    ///
    /// Consistency mismatches do not make this fail; they are recorded in
    /// the report. Call [`MigrationReport::ensure_consistent`] to enforce
    /// them.
    pub async fn run(&self) -> Result<MigrationReport, PipelineError> {
        let started_at = Utc::now();
        self.preflight().await?;

        let users = self
            .ctx
            .bounded("list users", self.directory.list_users())
            .await?
            .map_err(PipelineError::Directory)?;
        info!(users = users.len(), "Loaded user directory");

        let mut report = MigrationReport::empty(started_at);
        if users.is_empty() {
            info!("No users to migrate");
            report.finished_at = Utc::now();
            return Ok(report);
        }

        let pipeline = UserPipeline::new(self.ctx.clone(), Arc::clone(&self.source));
        let results: Vec<_> = stream::iter(users.iter())
            .map(|user| pipeline.run(user))
            .buffer_unordered(self.ctx.config.user_concurrency)
            .collect()
            .await;

        let mut errors = Vec::new();
        for result in results {
            match result {
                Ok(summary) => report.add_user(summary),
                Err(e) => errors.push(e),
            }
        }
        if let Some(e) = PipelineError::first_fatal(errors) {
            return Err(e);
        }

        let verification = verify(&self.ctx, report.users_processed, report.empty_users.len()).await?;
        report.verification = Some(verification);
        report.finished_at = Utc::now();

        info!(
            users_processed = report.users_processed,
            empty_users = report.empty_users.len(),
            indexed = report.tally.indexed,
            skipped = report.tally.skipped,
            failed = report.tally.failed,
            elapsed_ms = report.elapsed_ms(),
            "Migration finished"
        );
        Ok(report)
    }
}
