//! Per-collection fan-out.
//!
//! A [`CollectionProcessor`] enumerates one collection of one user's
//! namespace, starts its entry in the shared [`CompletionMatrix`], and runs
//! every document through a [`DocumentIngestor`] with bounded concurrency.
//! Each outcome is recorded as it arrives, so the collection flips to done the
//! moment its last document finishes.

use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use plex_source::UserNamespace;
use plex_types::{CollectionDescriptor, SourceDocument, User};

use crate::completion::{CompletionMatrix, Transition};
use crate::context::RunContext;
use crate::error::PipelineError;
use crate::ingestor::{DocumentIngestor, DocumentOutcome};
use crate::report::{DocumentTally, FailedDocument};

/// What one collection contributed to its user's run.
#[derive(Debug, Clone, Default)]
pub struct CollectionSummary {
    pub collection: String,
    /// Distinct documents found at enumeration time
    pub doc_total: usize,
    pub tally: DocumentTally,
    pub failures: Vec<FailedDocument>,
}

/// Drives one collection of one user.
pub struct CollectionProcessor {
    ctx: RunContext,
    user: User,
    namespace: Arc<dyn UserNamespace>,
    matrix: Arc<Mutex<CompletionMatrix>>,
}

impl CollectionProcessor {
    pub fn new(
        ctx: RunContext,
        user: User,
        namespace: Arc<dyn UserNamespace>,
        matrix: Arc<Mutex<CompletionMatrix>>,
    ) -> Self {
        Self {
            ctx,
            user,
            namespace,
            matrix,
        }
    }

    /// Enumerate and ingest every document of `descriptor`'s collection.
    ///
    /// On a fatal error the run token is cancelled, in-flight documents are
    /// drained, and the first non-cancellation error is returned.
    pub async fn run(&self, descriptor: &CollectionDescriptor) -> Result<CollectionSummary, PipelineError> {
        let collection = descriptor.name.as_str();
        let docs = self.enumerate(collection).await?;
        let doc_total = docs.len();
        debug!(user_id = %self.user.id, collection, doc_total, "Enumerated collection");

        let mut summary = CollectionSummary {
            collection: collection.to_string(),
            doc_total,
            ..Default::default()
        };

        let transition = self.matrix.lock().await.start_collection(collection, doc_total);
        if transition == Transition::CollectionFinished {
            self.collection_finished(collection).await;
        }
        if doc_total == 0 {
            return Ok(summary);
        }

        let ingestor = DocumentIngestor::new(self.ctx.clone(), &self.user, Arc::clone(&self.namespace));
        let outcomes = stream::iter(docs)
            .map(|doc| {
                let ingestor = &ingestor;
                async move {
                    let outcome = ingestor.ingest(descriptor, &doc).await;
                    (doc, outcome)
                }
            })
            .buffer_unordered(self.ctx.config.document_concurrency);
        let mut outcomes = std::pin::pin!(outcomes);

        let mut errors = Vec::new();
        while let Some((doc, outcome)) = outcomes.next().await {
            match outcome {
                Ok(outcome) => {
                    summary.tally.record(&outcome);
                    if let DocumentOutcome::Failed { error } = outcome {
                        summary.failures.push(FailedDocument {
                            user_id: self.user.id.clone(),
                            collection: collection.to_string(),
                            doc_id: doc.id.clone(),
                            error,
                        });
                    }
                    let transition = self.matrix.lock().await.record_completion(collection, &doc.id);
                    if transition == Transition::CollectionFinished {
                        self.collection_finished(collection).await;
                    }
                }
                Err(e) => errors.push(self.ctx.abort(e)),
            }
        }

        match PipelineError::first_fatal(errors) {
            Some(e) => Err(e),
            None => Ok(summary),
        }
    }

    async fn enumerate(&self, collection: &str) -> Result<Vec<SourceDocument>, PipelineError> {
        let docs = match self
            .ctx
            .bounded("collection enumeration", self.namespace.find_documents(collection))
            .await
        {
            Ok(Ok(docs)) => docs,
            Ok(Err(source)) => {
                return Err(self.ctx.abort(PipelineError::Enumerate {
                    user_id: self.user.id.clone(),
                    collection: collection.to_string(),
                    source,
                }))
            }
            Err(e) => return Err(self.ctx.abort(e)),
        };

        let mut seen = HashSet::with_capacity(docs.len());
        let total = docs.len();
        let unique: Vec<SourceDocument> = docs.into_iter().filter(|doc| seen.insert(doc.id.clone())).collect();
        if unique.len() != total {
            warn!(
                user_id = %self.user.id,
                collection,
                duplicates = total - unique.len(),
                "Dropped duplicate document ids"
            );
        }
        Ok(unique)
    }

    async fn collection_finished(&self, collection: &str) {
        let mut matrix = self.matrix.lock().await;
        if let Some(state) = matrix.state(collection) {
            self.ctx
                .progress
                .on_collection_finished(&self.user.id, collection, state);
        }
        if let Some(class) = matrix.check_user_finished() {
            info!(user_id = %self.user.id, username = %self.user.username, class = ?class, "All collections finished");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::time::Duration;

    use plex_search::{ClusterHealth, IndexAck, IndexStats, IndexStore, MemoryIndexStore, SearchError};
    use plex_source::{MemorySource, SourceStore};
    use plex_types::{CollectionSet, ContainmentLink, IndexRecord};

    use crate::completion::{CollectionState, UserClass};
    use crate::config::PipelineConfig;

    struct Fixture {
        store: Arc<MemoryIndexStore>,
        ctx: RunContext,
        matrix: Arc<Mutex<CompletionMatrix>>,
        processor: CollectionProcessor,
    }

    async fn fixture(source: MemorySource, store: MemoryIndexStore, collections: CollectionSet) -> Fixture {
        let user = User::new("u1", "ada");
        let namespace = source.open_namespace(&user, &collections).await.unwrap();
        let store = Arc::new(store);
        let ctx = RunContext::new(
            store.clone(),
            PipelineConfig::default()
                .with_collections(collections.clone())
                .with_document_concurrency(2)
                .with_op_timeout(Duration::from_secs(5)),
        );
        let matrix = Arc::new(Mutex::new(CompletionMatrix::new("u1", &collections)));
        let processor = CollectionProcessor::new(ctx.clone(), user, namespace, Arc::clone(&matrix));
        Fixture {
            store,
            ctx,
            matrix,
            processor,
        }
    }

    fn single(name: &str) -> CollectionSet {
        CollectionSet::new(vec![CollectionDescriptor::for_name(name)]).unwrap()
    }

    fn user_source() -> MemorySource {
        let mut source = MemorySource::new();
        source.add_user(User::new("u1", "ada"));
        source
    }

    #[tokio::test]
    async fn test_blank_collection_finishes_immediately() {
        let f = fixture(user_source(), MemoryIndexStore::new(), single("task")).await;

        let summary = f.processor.run(&CollectionDescriptor::for_name("task")).await.unwrap();
        assert_eq!(summary.doc_total, 0);

        let matrix = f.matrix.lock().await;
        assert_eq!(matrix.state("task"), Some(&CollectionState::Blank));
        assert_eq!(matrix.classification(), Some(UserClass::Empty));
    }

    #[tokio::test]
    async fn test_skipped_revision_counts_toward_done() {
        let mut source = user_source();
        source
            .add_document("u1", SourceDocument::new("c1", "contentitem").with_field("body", "v2"))
            .add_document(
                "u1",
                SourceDocument::new("c0", "contentitem").with_parent("c1", "contentitem"),
            );
        let f = fixture(source, MemoryIndexStore::new(), single("contentitem")).await;

        let summary = f
            .processor
            .run(&CollectionDescriptor::for_name("contentitem"))
            .await
            .unwrap();
        assert_eq!(summary.tally.indexed, 1);
        assert_eq!(summary.tally.skipped, 1);

        let matrix = f.matrix.lock().await;
        assert_eq!(matrix.state("contentitem"), Some(&CollectionState::Done));
        assert_eq!(matrix.classification(), Some(UserClass::NonEmpty));
        assert_eq!(f.store.document_count("u1"), 1);
    }

    #[tokio::test]
    async fn test_duplicate_ids_are_counted_once() {
        let mut source = user_source();
        source
            .add_document("u1", SourceDocument::new("t1", "task"))
            .add_document("u1", SourceDocument::new("t1", "task"))
            .add_document("u1", SourceDocument::new("t2", "task"));
        let f = fixture(source, MemoryIndexStore::new(), single("task")).await;

        let summary = f.processor.run(&CollectionDescriptor::for_name("task")).await.unwrap();
        assert_eq!(summary.doc_total, 2);
        assert_eq!(summary.tally.total(), 2);
        assert_eq!(
            f.matrix.lock().await.state("task"),
            Some(&CollectionState::Done)
        );
    }

    #[tokio::test]
    async fn test_failed_write_still_completes() {
        let mut source = user_source();
        source
            .add_document("u1", SourceDocument::new("t1", "task"))
            .add_document("u1", SourceDocument::new("t2", "task"));
        let f = fixture(source, MemoryIndexStore::new().fail_writes_for("t2"), single("task")).await;

        let summary = f.processor.run(&CollectionDescriptor::for_name("task")).await.unwrap();
        assert_eq!(summary.tally.indexed, 1);
        assert_eq!(summary.tally.failed, 1);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].doc_id, "t2");
        assert_eq!(
            f.matrix.lock().await.state("task"),
            Some(&CollectionState::Done)
        );
    }

    #[tokio::test]
    async fn test_enumeration_failure_cancels_run() {
        let mut source = user_source();
        source.fail_collection("u1", "task");
        let f = fixture(source, MemoryIndexStore::new(), single("task")).await;

        let err = f.processor.run(&CollectionDescriptor::for_name("task")).await.unwrap_err();
        assert!(matches!(err, PipelineError::Enumerate { .. }));
        assert!(f.ctx.is_cancelled());
        assert_eq!(
            f.matrix.lock().await.state("task"),
            Some(&CollectionState::NotStarted)
        );
    }

    #[tokio::test]
    async fn test_containment_failure_returns_first_error() {
        let mut source = user_source();
        source
            .add_document("u1", SourceDocument::new("d1", "document"))
            .add_document("u1", SourceDocument::new("d2", "document"))
            .add_document("u1", SourceDocument::new("d3", "document"))
            .add_link("u1", ContainmentLink::new("d3", "r1", "resource"))
            .fail_links_for("u1", "d2");
        let f = fixture(source, MemoryIndexStore::new(), single("document")).await;

        let err = f
            .processor
            .run(&CollectionDescriptor::for_name("document"))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Containment { doc_id, .. } if doc_id == "d2"));
        assert!(f.ctx.is_cancelled());
        assert!(!f.matrix.lock().await.is_user_done());
    }

    /// Index store whose writes of one id never answer.
    struct StalledStore {
        inner: MemoryIndexStore,
        stalled_id: &'static str,
    }

    #[async_trait::async_trait]
    impl IndexStore for StalledStore {
        async fn index(&self, record: &IndexRecord) -> Result<IndexAck, SearchError> {
            if record.id == self.stalled_id {
                std::future::pending::<()>().await;
            }
            self.inner.index(record).await
        }

        async fn delete_all_indices(&self) -> Result<(), SearchError> {
            self.inner.delete_all_indices().await
        }

        async fn cluster_health(&self) -> Result<ClusterHealth, SearchError> {
            self.inner.cluster_health().await
        }

        async fn mappings(&self) -> Result<BTreeMap<String, Vec<String>>, SearchError> {
            self.inner.mappings().await
        }

        async fn stats(&self) -> Result<IndexStats, SearchError> {
            self.inner.stats().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_write_times_out_and_completes() {
        let mut source = user_source();
        source
            .add_document("u1", SourceDocument::new("t1", "task"))
            .add_document("u1", SourceDocument::new("t2", "task"));
        let collections = single("task");
        let user = User::new("u1", "ada");
        let namespace = source.open_namespace(&user, &collections).await.unwrap();
        let ctx = RunContext::new(
            Arc::new(StalledStore {
                inner: MemoryIndexStore::new(),
                stalled_id: "t2",
            }),
            PipelineConfig::default()
                .with_collections(collections.clone())
                .with_op_timeout(Duration::from_secs(1)),
        );
        let matrix = Arc::new(Mutex::new(CompletionMatrix::new("u1", &collections)));
        let processor = CollectionProcessor::new(ctx.clone(), user, namespace, Arc::clone(&matrix));

        let summary = processor.run(&CollectionDescriptor::for_name("task")).await.unwrap();

        assert_eq!(summary.tally.indexed, 1);
        assert_eq!(summary.tally.failed, 1);
        assert_eq!(summary.failures[0].doc_id, "t2");
        assert!(summary.failures[0].error.contains("timed out"));
        assert!(!ctx.is_cancelled());

        let matrix = matrix.lock().await;
        assert_eq!(matrix.state("task"), Some(&CollectionState::Done));
        assert_eq!(matrix.classification(), Some(UserClass::NonEmpty));
    }
}
