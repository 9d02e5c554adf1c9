//! Per-document unit of work.

use std::sync::Arc;

use tracing::{debug, warn};

use plex_source::UserNamespace;
use plex_types::{CollectionDescriptor, SourceDocument, User};

use crate::context::RunContext;
use crate::error::PipelineError;
use crate::resolver::resolve_containment;
use crate::synthesizer::build_record;

/// Parent type marking a superseded content item revision.
pub const SUPERSEDED_PARENT_TYPE: &str = plex_types::CONTENT_ITEM;

/// How a document finished. Every variant counts toward its collection's
/// completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentOutcome {
    /// Record written to the index store
    Indexed,
    /// Superseded revision; neither resolved nor written
    Skipped,
    /// The write failed after the client's retries
    Failed { error: String },
}

/// Skip-filters, resolves, synthesizes and writes one document at a time for
/// one user.
#[derive(Clone)]
pub struct DocumentIngestor {
    ctx: RunContext,
    user_id: String,
    index: String,
    namespace: Arc<dyn UserNamespace>,
}

impl DocumentIngestor {
    pub fn new(ctx: RunContext, user: &User, namespace: Arc<dyn UserNamespace>) -> Self {
        Self {
            ctx,
            user_id: user.id.clone(),
            index: user.index_name().to_string(),
            namespace,
        }
    }

    /// Process one document.
    ///
    /// Returns an outcome for every document that was looked at, including
    /// failed writes. Errors are reserved for fatal conditions: a failed
    /// containment lookup or a cancelled run.
    pub async fn ingest(
        &self,
        descriptor: &CollectionDescriptor,
        doc: &SourceDocument,
    ) -> Result<DocumentOutcome, PipelineError> {
        if self.ctx.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        if doc.has_parent_type(SUPERSEDED_PARENT_TYPE) {
            debug!(
                user_id = %self.user_id,
                collection = %descriptor.name,
                doc_id = %doc.id,
                "Skipping superseded revision"
            );
            return Ok(DocumentOutcome::Skipped);
        }

        let children = resolve_containment(&self.ctx, self.namespace.as_ref(), &doc.id).await?;
        let record = build_record(&self.index, descriptor, doc, children);

        let written = self
            .ctx
            .bounded("index write", self.ctx.index_store.index(&record))
            .await;

        match written {
            Ok(Ok(ack)) => {
                debug!(
                    index = %ack.index,
                    doc_type = %ack.doc_type,
                    doc_id = %ack.id,
                    version = ?ack.version,
                    "Finished ingesting document"
                );
                Ok(DocumentOutcome::Indexed)
            }
            Ok(Err(e)) => {
                warn!(user_id = %self.user_id, doc_id = %doc.id, error = %e, "Index write failed");
                Ok(DocumentOutcome::Failed {
                    error: e.to_string(),
                })
            }
            Err(PipelineError::Cancelled) => Err(PipelineError::Cancelled),
            Err(e) => {
                warn!(user_id = %self.user_id, doc_id = %doc.id, error = %e, "Index write failed");
                Ok(DocumentOutcome::Failed {
                    error: e.to_string(),
                })
            }
        }
    }
}
