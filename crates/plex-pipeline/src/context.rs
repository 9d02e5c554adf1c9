//! Shared run state handed to every fan-out branch.

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use plex_search::IndexStore;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::progress::{NoOpProgressCallback, ProgressCallback};

/// Index store handle, configuration, progress sink and the run-level
/// cancellation token. Cheap to clone.
#[derive(Clone)]
pub struct RunContext {
    pub(crate) index_store: Arc<dyn IndexStore>,
    pub(crate) config: Arc<PipelineConfig>,
    pub(crate) progress: Arc<dyn ProgressCallback>,
    cancel: CancellationToken,
}

impl RunContext {
    pub fn new(index_store: Arc<dyn IndexStore>, config: PipelineConfig) -> Self {
        Self {
            index_store,
            config: Arc::new(config),
            progress: Arc::new(NoOpProgressCallback),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Token that cancels the whole run. Clones share state with the run.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancel the run on a fatal error and hand the error back.
    pub(crate) fn abort(&self, error: PipelineError) -> PipelineError {
        if !error.is_cancellation() {
            self.cancel.cancel();
        }
        error
    }

    /// Run one store operation bounded by the configured timeout and the run
    /// token.
    pub(crate) async fn bounded<F: Future>(
        &self,
        operation: &'static str,
        fut: F,
    ) -> Result<F::Output, PipelineError> {
        let timeout = self.config.op_timeout;
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(PipelineError::Cancelled),
            result = tokio::time::timeout(timeout, fut) => {
                result.map_err(|_| PipelineError::Timeout { operation, timeout })
            }
        }
    }
}
